//! Escaping of non-printable output.
//!
//! Captured shell output can contain arbitrary bytes, but transcripts have
//! to stay readable text. Lines holding control characters or high bytes
//! are rewritten to `\xNN` form and tagged with an ` (esc)` annotation;
//! the matcher undoes the rewrite when comparing such a line against raw
//! output.
use std::sync::LazyLock;

use regex::bytes::Regex;

/// Bytes that force a line into escaped form. Tab is deliberately absent:
/// a line containing only tabs and printable text stays as-is.
static NEEDS_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?-u)[\x00-\x08\x0b-\x1f\x7f-\xff]").unwrap()
});

/// Bytes rewritten once a line is being escaped. Backslash and tab join
/// the set so the result round-trips unambiguously.
static ESCAPE_SUB: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?-u)[\x00-\x09\x0b-\x1f\\\x7f-\xff]").unwrap()
});

/// Does this line need the ` (esc)` treatment?
pub fn needs_escape(line: &[u8]) -> bool {
	NEEDS_ESCAPE.is_match(line)
}

/// Rewrite a newline-terminated line into its escaped form, ` (esc)`
/// annotation included. Quotes are left alone.
pub fn escape_line(line: &[u8]) -> Vec<u8> {
	let body = line.strip_suffix(b"\n").unwrap_or(line);
	let mut escaped = ESCAPE_SUB
		.replace_all(body, |caps: &regex::bytes::Captures| {
			match caps[0][0] {
				b'\\' => b"\\\\".to_vec(),
				b'\r' => b"\\r".to_vec(),
				b'\t' => b"\\t".to_vec(),
				b => format!("\\x{b:02x}").into_bytes(),
			}
		})
		.into_owned();
	escaped.extend_from_slice(b" (esc)\n");
	escaped
}

/// Decode the escape forms produced by [`escape_line`]. `\n` is accepted
/// too, since test authors write it by hand. An escape we don't recognize
/// is kept literally, backslash and all.
pub fn unescape(bytes: &[u8]) -> Vec<u8> {
	let mut decoded = Vec::with_capacity(bytes.len());
	let mut iter = bytes.iter().copied().peekable();
	while let Some(b) = iter.next() {
		if b != b'\\' {
			decoded.push(b);
			continue;
		}
		match iter.next() {
			Some(b'\\') => decoded.push(b'\\'),
			Some(b'r') => decoded.push(b'\r'),
			Some(b't') => decoded.push(b'\t'),
			Some(b'n') => decoded.push(b'\n'),
			Some(b'x') => {
				let hi = iter.next();
				let lo = iter.next();
				match (hi.and_then(hex_val), lo.and_then(hex_val)) {
					(Some(hi), Some(lo)) => decoded.push(hi << 4 | lo),
					_ => {
						// Truncated \xNN. Emit what we consumed verbatim.
						decoded.extend_from_slice(b"\\x");
						if let Some(hi) = hi {
							decoded.push(hi);
						}
						if let Some(lo) = lo {
							decoded.push(lo);
						}
					}
				}
			}
			Some(other) => {
				decoded.push(b'\\');
				decoded.push(other);
			}
			None => decoded.push(b'\\'),
		}
	}
	decoded
}

fn hex_val(b: u8) -> Option<u8> {
	(b as char).to_digit(16).map(|v| v as u8)
}
