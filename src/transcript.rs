//! Transcript parsing.
//!
//! A test file is a sequence of byte-lines. Lines prefixed with the command
//! sigil (`  $ `) start a new command, lines with the continuation sigil
//! (`  > `) extend the command before them, indented lines without a sigil
//! are the expected output of the most recent command, and everything else
//! is prose.
//!
//! Parsing never fails. A malformed transcript just produces expectations
//! that won't match anything.
use std::collections::HashMap;

/// One command taken from a transcript, ready to be fed to the shell.
#[derive(Debug,Clone,PartialEq)]
pub struct Command {
	/// Line index of the command line within the file. This is the number
	/// carried by the salt probe emitted just before the command runs.
	pub index: usize,
	/// Command bytes with the sigil stripped, newline-terminated.
	pub body: Vec<u8>,
	/// Continuation bodies in order, each newline-terminated.
	pub cont: Vec<Vec<u8>>,
}

/// A parsed test file.
///
/// `refout` holds every line of the file, newline-terminated, and is what
/// the reconstructed output gets diffed against. `buckets` maps a command
/// line index to the lines the reconstructor has to splice back in when
/// the shell moves past that command: the prose following it, plus the
/// next command's own line and continuations.
#[derive(Debug,Default)]
pub struct Transcript {
	pub refout: Vec<Vec<u8>>,
	pub commands: Vec<Command>,
	/// Continuation bodies that appeared before any command line. They are
	/// still fed to the shell, ahead of the first probe.
	pub preamble: Vec<Vec<u8>>,
	buckets: HashMap<i64, Vec<Vec<u8>>>,
}

impl Transcript {
	/// Parse a whole test file.
	///
	/// `indent` is the number of spaces in front of the `$ `/`> ` sigils
	/// and expected output lines.
	pub fn parse(input: &[u8], indent: usize) -> Self {
		let outline = b" ".repeat(indent);
		let cmdline = [outline.as_slice(), b"$ "].concat();
		let conline = [outline.as_slice(), b"> "].concat();

		let mut transcript = Self::default();
		// pos is the index of the last command line seen, prepos the one
		// before it. A command's own line lands in the bucket of the
		// command *preceding* it, which is exactly where the reconstructor
		// needs it: the probe that ends command N is what reintroduces
		// command N+1's text.
		let mut pos: i64 = -1;
		let mut prepos: i64 = -1;

		for (i, raw) in lines_keep_ends(input).enumerate() {
			let mut line = raw.to_vec();
			if !line.ends_with(b"\n") {
				line.push(b'\n');
			}
			transcript.refout.push(line.clone());

			if line.starts_with(&cmdline) {
				transcript.buckets.entry(pos).or_default().push(line.clone());
				prepos = pos;
				pos = i as i64;
				transcript.commands.push(Command {
					index: i,
					body: line[cmdline.len()..].to_vec(),
					cont: vec![],
				});
			} else if line.starts_with(&conline) {
				transcript.buckets.entry(prepos).or_default().push(line.clone());
				let body = line[conline.len()..].to_vec();
				match transcript.commands.last_mut() {
					Some(cmd) => cmd.cont.push(body),
					// A stray `> ` line before any command. The shell still
					// gets it, before the first probe.
					None => transcript.preamble.push(body),
				}
			} else if !line.starts_with(&outline) {
				transcript.buckets.entry(pos).or_default().push(line);
			}
			// Indented lines without a sigil are expected output. They live
			// only in refout; the reconstructor replaces them wholesale with
			// whatever the shell actually printed.
		}

		transcript
	}

	/// Remove and return the bucket for a command index. Used by the
	/// reconstructor as it walks probe to probe; each bucket is spliced in
	/// exactly once.
	pub fn take_bucket(&mut self, pos: i64) -> Vec<Vec<u8>> {
		self.buckets.remove(&pos).unwrap_or_default()
	}

	/// Line count of the original file. The trailing probe carries this as
	/// its index, one past the last line.
	pub fn line_count(&self) -> usize {
		self.refout.len()
	}
}

/// Split bytes into lines, keeping the `\n` terminators.
///
/// The final segment is yielded without a terminator if the input didn't
/// end in one. We split on `\n` only; carriage returns are ordinary bytes
/// here and get escaped downstream like any other control character.
pub fn lines_keep_ends(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
	let mut rest = bytes;
	std::iter::from_fn(move || {
		if rest.is_empty() {
			return None;
		}
		let split = match rest.iter().position(|&b| b == b'\n') {
			Some(at) => at + 1,
			None => rest.len(),
		};
		let (line, tail) = rest.split_at(split);
		rest = tail;
		Some(line)
	})
}
