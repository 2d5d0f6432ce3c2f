use crate::matcher::lines_match;

#[test]
fn literals_compare_byte_for_byte() {
	assert!(lines_match(b"  hi\n", b"  hi\n"));
	assert!(!lines_match(b"  hi\n", b"  hi \n"));
	assert!(!lines_match(b"  hi\n", b"  HI\n"));
}

#[test]
fn regex_lines_anchor_over_the_whole_line() {
	assert!(lines_match(b"  [a-z]{2} (re)\n", b"  hi\n"));
	assert!(!lines_match(b"  [a-z]{2} (re)\n", b"  hi there\n"));
	assert!(!lines_match(b"  [a-z]{2} (re)\n", b"x  hi\n"));
}

#[test]
fn regex_alternation_and_anchors() {
	assert!(lines_match(b"  (foo|bar)baz (re)\n", b"  barbaz\n"));
	assert!(lines_match(b"  hi$ (re)\n", b"  hi\n"));
	assert!(lines_match(b"^  hi (re)\n", b"  hi\n"));
}

#[test]
fn invalid_regex_never_matches() {
	assert!(!lines_match(b"  *** (re)\n", b"  anything\n"));
	// ...but still compares equal to its own rendering.
	assert!(lines_match(b"  *** (re)\n", b"  *** (re)\n"));
}

#[test]
fn globs_match_whole_lines() {
	assert!(lines_match(b"  h? w*d (glob)\n", b"  hi world\n"));
	assert!(!lines_match(b"  h? w*d (glob)\n", b"  hello world\n"));
	assert!(lines_match(b"  * (glob)\n", b"  anything at all, even [brackets]\n"));
	assert!(!lines_match(b"  *.t (glob)\n", b"  two\nlines\n"));
}

#[test]
fn glob_escapes() {
	assert!(lines_match(b"  2 \\* 3 (glob)\n", b"  2 * 3\n"));
	assert!(!lines_match(b"  2 \\* 3 (glob)\n", b"  2 x 3\n"));
	assert!(lines_match(b"  C:\\\\dir\\\\* (glob)\n", b"  C:\\dir\\thing\n"));
}

#[test]
fn esc_lines_match_raw_bytes() {
	assert!(lines_match(b"  a\\x01b (esc)\n", b"  a\x01b\n"));
	assert!(lines_match(b"  col1\\tcol2 (esc)\n", b"  col1\tcol2\n"));
	assert!(!lines_match(b"  a\\x01b (esc)\n", b"  axb\n"));
}

#[test]
fn annotations_only_count_at_the_end_of_a_line() {
	assert!(!lines_match(b"  mention of (re) mid-line\n", b"  anything\n"));
	assert!(lines_match(b"  mention of (re) mid-line\n", b"  mention of (re) mid-line\n"));
}
