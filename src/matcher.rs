//! Pattern-aware line equivalence.
//!
//! Expected output lines can carry one of three annotations that change
//! how they compare against actual output: `(re)` for regular expressions,
//! `(glob)` for shell-style globs, and `(esc)` for escaped byte content.
//! Everything else is a byte-for-byte literal.
//!
//! The regex dialect is the `regex` crate's bytes engine with Unicode
//! mode off: classes are ASCII, `.` matches any byte but `\n`, and the
//! pattern is anchored over the whole line (indent included) with an
//! optional trailing newline.
use regex::bytes::{Regex, RegexBuilder};

use crate::escape::unescape;

/// An expected output line, classified once so the diff can probe it
/// against many actual lines without recompiling anything.
#[derive(Debug)]
pub struct ExpectedLine {
	raw: Vec<u8>,
	kind: Kind,
}

#[derive(Debug)]
enum Kind {
	Literal,
	/// Unescaped bytes, trailing newline restored.
	Esc(Vec<u8>),
	/// `None` when the pattern failed to compile; such a line never
	/// matches, it only compares equal to itself.
	Re(Option<Regex>),
	Glob(Option<Regex>),
}

impl ExpectedLine {
	pub fn parse(line: &[u8]) -> Self {
		let kind = if let Some(pattern) = line.strip_suffix(b" (re)\n") {
			Kind::Re(compile(&String::from_utf8_lossy(pattern)))
		} else if let Some(pattern) = line.strip_suffix(b" (glob)\n") {
			Kind::Glob(compile(&glob_to_regex(pattern)))
		} else if let Some(content) = line.strip_suffix(b" (esc)\n") {
			let mut bytes = unescape(content);
			bytes.push(b'\n');
			Kind::Esc(bytes)
		} else {
			Kind::Literal
		};
		Self { raw: line.to_vec(), kind }
	}

	/// Does `actual` satisfy this expectation?
	///
	/// Byte equality is checked first, annotation and all, so an actual
	/// line that happens to literally end in ` (re)` still matches its own
	/// transcript rendering.
	pub fn matches(&self, actual: &[u8]) -> bool {
		if self.raw == actual {
			return true;
		}
		match &self.kind {
			Kind::Literal => false,
			Kind::Esc(bytes) => bytes == actual,
			Kind::Re(re) | Kind::Glob(re) => {
				re.as_ref().is_some_and(|re| re.is_match(actual))
			}
		}
	}

	pub fn raw(&self) -> &[u8] {
		&self.raw
	}
}

/// One-off comparison of an expected line against an actual line.
pub fn lines_match(expected: &[u8], actual: &[u8]) -> bool {
	ExpectedLine::parse(expected).matches(actual)
}

/// Anchor a pattern over the full line and compile it. The line's trailing
/// newline is optional so `foo$`-less patterns still close over it.
fn compile(pattern: &str) -> Option<Regex> {
	RegexBuilder::new(&format!(r"\A(?:{pattern})(?:\n)?\z"))
		.unicode(false)
		.multi_line(true)
		.build()
		.ok()
}

/// Translate a glob into a regex. `*` and `?` are the only metacharacters;
/// `\*`, `\?` and `\\` escape them. Every other byte is matched literally.
fn glob_to_regex(glob: &[u8]) -> String {
	let mut pattern = String::new();
	let mut i = 0;
	while i < glob.len() {
		let b = glob[i];
		i += 1;
		match b {
			b'\\' if i < glob.len() && matches!(glob[i], b'*' | b'?' | b'\\') => {
				literal_byte(&mut pattern, glob[i]);
				i += 1;
			}
			b'*' => pattern.push_str(".*"),
			b'?' => pattern.push('.'),
			_ => literal_byte(&mut pattern, b),
		}
	}
	pattern
}

fn literal_byte(pattern: &mut String, b: u8) {
	if b.is_ascii_alphanumeric() {
		pattern.push(b as char);
	} else {
		pattern.push_str(&format!(r"\x{b:02x}"));
	}
}
