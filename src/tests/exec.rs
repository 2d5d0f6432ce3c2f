use pretty_assertions::assert_eq;

use crate::exec::{build_debug_script, build_script, make_salt};
use crate::transcript::Transcript;

#[test]
fn script_interleaves_probes_and_commands() {
	let input = b"  $ echo 'a\n  > b'\n  ab\nprose\n  $ echo c\n";
	let transcript = Transcript::parse(input, 2);
	let script = build_script(&transcript, b"SALT");
	assert_eq!(
		script,
		b"echo SALT 0 $?\necho 'a\nb'\necho SALT 4 $?\necho c\necho SALT 5 $?\n".to_vec()
	);
}

#[test]
fn an_empty_transcript_still_probes_once() {
	let transcript = Transcript::parse(b"", 2);
	assert_eq!(build_script(&transcript, b"SALT"), b"echo SALT 0 $?\n".to_vec());
}

#[test]
fn debug_scripts_have_no_probes() {
	let transcript = Transcript::parse(b"  $ echo a\n  > more\n  output\n", 2);
	assert_eq!(build_debug_script(&transcript), b"echo a\nmore\n".to_vec());
}

#[test]
fn salt_shape() {
	let salt = make_salt();
	let text = str::from_utf8(&salt).unwrap();
	let rest = text.strip_prefix("PRYSK").unwrap();
	let (secs, frac) = rest.split_once('.').unwrap();
	assert!(!secs.is_empty());
	assert_eq!(frac.len(), 5);
	assert!(secs.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()));
}

#[cfg(unix)]
mod shell {
	use std::collections::HashMap;
	use std::ffi::OsString;

	use pretty_assertions::assert_eq;

	use crate::exec::run_shell;

	fn sh() -> Vec<String> {
		vec!["/bin/sh".into()]
	}

	fn ambient() -> HashMap<OsString, OsString> {
		std::env::vars_os().collect()
	}

	#[test]
	fn captures_stdout_and_stderr_in_order() {
		let script = b"echo out\necho err >&2\necho more\nexit 3\n".to_vec();
		let execution = run_shell(&sh(), script, &ambient()).unwrap();
		assert_eq!(execution.output, b"out\nerr\nmore\n".to_vec());
		assert_eq!(execution.exit_code, 3);
	}

	#[test]
	fn survives_early_shell_exit() {
		// Plenty of script left after the exit; the broken pipe on the
		// feeder side must not surface as an error.
		let mut script = b"exit 80\n".to_vec();
		script.extend(std::iter::repeat_n(b"echo filler\n".as_slice(), 50_000).flatten());
		let execution = run_shell(&sh(), script, &ambient()).unwrap();
		assert_eq!(execution.exit_code, 80);
	}

	#[test]
	fn spawn_failure_is_reported() {
		let err = run_shell(&[String::from("/no/such/shell")], vec![], &ambient()).unwrap_err();
		assert!(err.contains("failed to spawn shell"), "unexpected error: {err}");
	}
}
