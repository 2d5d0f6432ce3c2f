use pretty_assertions::assert_eq;

use super::byte_lines;
use crate::transcript::{Transcript, lines_keep_ends};

#[test]
fn lines_keep_their_terminators() {
	let split: Vec<&[u8]> = lines_keep_ends(b"a\nb\n\nc").collect();
	assert_eq!(split, vec![b"a\n".as_slice(), b"b\n", b"\n", b"c"]);
	assert_eq!(lines_keep_ends(b"").count(), 0);
}

#[test]
fn commands_continuations_and_prose() {
	let input = b"Setup notes.\n  $ echo 'one\n  > two'\n  one\n  two\n";
	let transcript = Transcript::parse(input, 2);
	assert_eq!(
		transcript.refout,
		byte_lines(&[b"Setup notes.\n", b"  $ echo 'one\n", b"  > two'\n", b"  one\n", b"  two\n"])
	);
	assert_eq!(transcript.commands.len(), 1);
	assert_eq!(transcript.commands[0].index, 1);
	assert_eq!(transcript.commands[0].body, b"echo 'one\n");
	assert_eq!(transcript.commands[0].cont, byte_lines(&[b"two'\n"]));
	assert!(transcript.preamble.is_empty());
}

#[test]
fn final_line_without_newline_is_terminated() {
	let transcript = Transcript::parse(b"  $ true", 2);
	assert_eq!(transcript.refout, byte_lines(&[b"  $ true\n"]));
	assert_eq!(transcript.commands[0].body, b"true\n");
}

#[test]
fn buckets_carry_prose_and_the_next_command() {
	let input = b"intro\n  $ echo a\n  a\nbetween\n  $ echo b\n  b\ntail\n";
	let mut transcript = Transcript::parse(input, 2);
	// Everything up to and including the first command line is flushed
	// when the first probe arrives.
	assert_eq!(transcript.take_bucket(-1), byte_lines(&[b"intro\n", b"  $ echo a\n"]));
	// The first command's bucket holds the prose behind it plus the
	// second command's own line.
	assert_eq!(transcript.take_bucket(1), byte_lines(&[b"between\n", b"  $ echo b\n"]));
	assert_eq!(transcript.take_bucket(4), byte_lines(&[b"tail\n"]));
	assert_eq!(transcript.take_bucket(7), Vec::<Vec<u8>>::new());
}

#[test]
fn expected_output_stays_out_of_the_buckets() {
	let input = b"  $ echo hi\n  expected one\n  expected two\n";
	let mut transcript = Transcript::parse(input, 2);
	assert_eq!(transcript.take_bucket(-1), byte_lines(&[b"  $ echo hi\n"]));
	assert_eq!(transcript.take_bucket(0), Vec::<Vec<u8>>::new());
}

#[test]
fn stray_continuations_land_in_the_preamble() {
	let transcript = Transcript::parse(b"  > orphan\n  $ echo hi\n", 2);
	assert_eq!(transcript.preamble, byte_lines(&[b"orphan\n"]));
	assert_eq!(transcript.commands.len(), 1);
}

#[test]
fn indent_width_is_configurable() {
	let transcript = Transcript::parse(b"    $ echo hi\n    hi\n", 4);
	assert_eq!(transcript.commands.len(), 1);
	assert_eq!(transcript.commands[0].body, b"echo hi\n");
	// Under a four-space indent, a two-space line is just prose.
	let mut narrow = Transcript::parse(b"  $ echo hi\n", 4);
	assert!(narrow.commands.is_empty());
	assert_eq!(narrow.take_bucket(-1), byte_lines(&[b"  $ echo hi\n"]));
}
