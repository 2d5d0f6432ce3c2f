use pretty_assertions::assert_eq;

use crate::escape::{escape_line, needs_escape, unescape};

#[test]
fn printable_lines_need_nothing() {
	assert!(!needs_escape(b"plain text with punctuation: []{}<>!\n"));
	// Tab alone doesn't force the escaped form.
	assert!(!needs_escape(b"col1\tcol2\n"));
	assert!(!needs_escape(b""));
}

#[test]
fn control_and_high_bytes_do() {
	assert!(needs_escape(b"\x01\n"));
	assert!(needs_escape(b"\x7f\n"));
	assert!(needs_escape(b"caf\xc3\xa9\n"));
	assert!(needs_escape(b"carriage\rreturn\n"));
}

#[test]
fn escaping_rewrites_and_annotates() {
	assert_eq!(escape_line(b"\x01\n"), b"\\x01 (esc)\n".to_vec());
	assert_eq!(escape_line(b"a\rb\tc\\d\x9f\n"), b"a\\rb\\tc\\\\d\\x9f (esc)\n".to_vec());
	// Quotes stay as they are.
	assert_eq!(escape_line(b"'\x02\"\n"), b"'\\x02\" (esc)\n".to_vec());
}

#[test]
fn unescape_inverts_escape() {
	let original = b"a\rb\tc\\d\x00\xff".to_vec();
	let mut line = original.clone();
	line.push(b'\n');
	let escaped = escape_line(&line);
	let stripped = escaped.strip_suffix(b" (esc)\n").unwrap();
	assert_eq!(unescape(stripped), original);
}

#[test]
fn unescape_handles_hand_written_forms() {
	assert_eq!(unescape(b"\\x41\\n"), b"A\n".to_vec());
	assert_eq!(unescape(b"nothing special"), b"nothing special".to_vec());
}

#[test]
fn unknown_escapes_pass_through() {
	assert_eq!(unescape(b"\\q"), b"\\q".to_vec());
	assert_eq!(unescape(b"\\x4"), b"\\x4".to_vec());
	assert_eq!(unescape(b"\\x4z"), b"\\x4z".to_vec());
	assert_eq!(unescape(b"trailing\\"), b"trailing\\".to_vec());
}
