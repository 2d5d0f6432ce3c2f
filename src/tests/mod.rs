use pretty_assertions::assert_eq;

pub mod discover;
pub mod escape;
pub mod events;
pub mod exec;
pub mod matcher;
pub mod transcript;

/// A transcript exercising literal output, multiple commands, and all
/// three pattern annotations. Expected to pass as-is.
pub const BASIC_T: &[u8] = include_bytes!("fixtures/basic.t");
/// A transcript that bails out through the skip sentinel.
pub const SKIP_T: &[u8] = include_bytes!("fixtures/skip.t");

/// Shorthand for building owned byte-line lists in assertions.
pub fn byte_lines(lines: &[&[u8]]) -> Vec<Vec<u8>> {
	lines.iter().map(|line| line.to_vec()).collect()
}

#[test]
fn fixtures_are_newline_terminated() {
	// The parser normalizes a missing final newline; the fixtures should
	// not depend on that.
	assert_eq!(BASIC_T.last(), Some(&b'\n'));
	assert_eq!(SKIP_T.last(), Some(&b'\n'));
}
