//! Output reconstruction.
//!
//! Takes the bytes captured from the shell and rebuilds a transcript from
//! them: actual output replaces the expected output of each command, exit
//! codes become `[N]` annotations, and the prose and command lines of the
//! original are spliced back in between. The salt probes emitted by the
//! driver are what delimit one command's output from the next.
use log::trace;

use crate::escape::{escape_line, needs_escape};
use crate::transcript::{Transcript, lines_keep_ends};

/// Rebuild a transcript from one shell run.
///
/// Walks the captured bytes line by line. Lines without the salt are
/// output of the command currently in flight; they get the indent prefix,
/// a ` (no-eol)` marker when unterminated, and escaping when they hold
/// non-printable bytes. A line containing the salt is a probe: whatever
/// precedes the salt on it is a final unterminated output segment, and the
/// payload after it carries the next command's index and the previous
/// command's exit status.
pub fn reconstruct(
	transcript: &mut Transcript,
	output: &[u8],
	salt: &[u8],
	indent: usize,
) -> Result<Vec<Vec<u8>>, String> {
	let prefix = b" ".repeat(indent);
	let mut postout: Vec<Vec<u8>> = Vec::new();
	let mut pos: i64 = -1;

	// The last probe's own newline is shell noise, not output. Dropping
	// the final byte before splitting keeps it out of the line walk.
	let trimmed = &output[..output.len().saturating_sub(1)];

	for line in lines_keep_ends(trimmed) {
		let (out, probe) = match find_salt(line, salt) {
			Some(at) => (&line[..at], Some(&line[at + salt.len()..])),
			None => (line, None),
		};

		if !out.is_empty() {
			let mut out = out.to_vec();
			if !out.ends_with(b"\n") {
				out.extend_from_slice(b" (no-eol)\n");
			}
			if needs_escape(&out) {
				out = escape_line(&out);
			}
			postout.push([prefix.as_slice(), &out].concat());
		}

		if let Some(payload) = probe {
			let (index, code) = parse_probe(payload)?;
			trace!("probe: command {pos} done (exit {code}), command {index} next");
			if code != 0 {
				let tag = format!("[{code}]\n");
				postout.push([prefix.as_slice(), tag.as_bytes()].concat());
			}
			postout.extend(transcript.take_bucket(pos));
			pos = index;
		}
	}
	postout.extend(transcript.take_bucket(pos));

	Ok(postout)
}

/// Probe payload: `" <index> <exit-code>"`. A salted line whose payload
/// doesn't parse means something mangled the probe stream; that's an
/// engine error, not a test failure.
fn parse_probe(payload: &[u8]) -> Result<(i64, i32), String> {
	let text = str::from_utf8(payload).map_err(|_| "malformed probe".to_string())?;
	let mut fields = text.split_whitespace();
	let index = fields.next().and_then(|f| f.parse().ok());
	let code = fields.next().and_then(|f| f.parse().ok());
	match (index, code) {
		(Some(index), Some(code)) => Ok((index, code)),
		_ => Err("malformed probe".into()),
	}
}

/// First occurrence of the exact salt within a line, if any. Near misses
/// don't count; user output merely resembling a probe stays output.
fn find_salt(line: &[u8], salt: &[u8]) -> Option<usize> {
	if salt.is_empty() || line.len() < salt.len() {
		return None;
	}
	line.windows(salt.len()).position(|window| window == salt)
}
