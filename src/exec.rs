//! The shell driver.
//!
//! All of a transcript's commands run in one persistent shell process.
//! The driver interleaves the commands with salt-carrying `echo` probes so
//! the reconstructor can later tell which captured bytes belong to which
//! command, and with which exit status. The driver itself never looks at
//! the captured bytes.
use std::collections::HashMap;
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

use log::trace;

use crate::transcript::Transcript;

/// The reserved exit code that turns a whole run into a skip.
pub const SKIP_CODE: i32 = 80;

/// Captured output of one shell run, stderr folded in.
#[derive(Debug)]
pub struct Execution {
	pub output: Vec<u8>,
	pub exit_code: i32,
}

/// Fabricate the per-run salt: `PRYSK` plus the current unix time to five
/// decimals. Unlikely enough to ever collide with real test output.
pub fn make_salt() -> Vec<u8> {
	let now = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default();
	format!("PRYSK{:.5}", now.as_secs_f64()).into_bytes()
}

/// Assemble the stdin script for a captured run.
///
/// Before each command: `echo <salt> <index> $?`, reporting the exit code
/// of whatever ran before. One trailing probe picks up the last command's
/// exit code. Continuations follow the command they textually belong to.
pub fn build_script(transcript: &Transcript, salt: &[u8]) -> Vec<u8> {
	let mut script = Vec::new();
	for body in &transcript.preamble {
		script.extend_from_slice(body);
	}
	for cmd in &transcript.commands {
		push_probe(&mut script, salt, cmd.index);
		script.extend_from_slice(&cmd.body);
		for cont in &cmd.cont {
			script.extend_from_slice(cont);
		}
	}
	push_probe(&mut script, salt, transcript.line_count());
	script
}

/// Assemble the stdin script for a debug run: just the commands, no
/// probes, nothing captured.
pub fn build_debug_script(transcript: &Transcript) -> Vec<u8> {
	let mut script = Vec::new();
	for body in &transcript.preamble {
		script.extend_from_slice(body);
	}
	for cmd in &transcript.commands {
		script.extend_from_slice(&cmd.body);
		for cont in &cmd.cont {
			script.extend_from_slice(cont);
		}
	}
	script
}

fn push_probe(script: &mut Vec<u8>, salt: &[u8], index: usize) {
	script.extend_from_slice(b"echo ");
	script.extend_from_slice(salt);
	script.push(b' ');
	script.extend_from_slice(index.to_string().as_bytes());
	script.extend_from_slice(b" $?\n");
}

/// Run `<shell> -` with `script` on stdin and the given environment,
/// capturing stdout and stderr through one shared pipe so their
/// interleaving is the shell's own.
///
/// Stdin is written from a helper thread while this thread drains the
/// pipe to EOF; neither side can wedge on a full pipe buffer that way.
pub fn run_shell(
	shell: &[String],
	script: Vec<u8>,
	env: &HashMap<OsString, OsString>,
) -> Result<Execution, String> {
	trace!("spawning {shell:?} with a {} byte script", script.len());
	let (mut reader, writer) = io::pipe()
		.map_err(|e| format!("failed to set up capture pipe: {e}"))?;
	let writer_err = writer
		.try_clone()
		.map_err(|e| format!("failed to set up capture pipe: {e}"))?;

	// The chained temporary matters: the Command object holds our ends of
	// the capture pipe, and they have to be closed in this process before
	// read_to_end below can ever see EOF.
	let mut child = Command::new(&shell[0])
		.args(&shell[1..])
		.arg("-")
		.stdin(Stdio::piped())
		.stdout(Stdio::from(writer))
		.stderr(Stdio::from(writer_err))
		.env_clear()
		.envs(env)
		.spawn()
		.map_err(|e| format!("failed to spawn shell '{}': {e}", shell[0]))?;

	let mut stdin = child
		.stdin
		.take()
		.ok_or("shell child has no stdin handle")?;
	let feeder = std::thread::spawn(move || {
		// A shell that exits early (say, `exit 80` mid-file) closes its
		// stdin; the resulting broken pipe is expected, not an error.
		let _ = stdin.write_all(&script);
	});

	let mut output = Vec::new();
	reader
		.read_to_end(&mut output)
		.map_err(|e| format!("failed to read shell output: {e}"))?;
	let status = child
		.wait()
		.map_err(|e| format!("failed to wait for shell: {e}"))?;
	let _ = feeder.join();

	let exit_code = status.code().unwrap_or(-1);
	trace!("shell exited {exit_code} with {} bytes of output", output.len());
	Ok(Execution { output, exit_code })
}

/// Debug mode: run the shell with inherited stdout/stderr and capture
/// nothing. The caller gets empty results either way.
pub fn run_debug(
	shell: &[String],
	script: Vec<u8>,
	env: &HashMap<OsString, OsString>,
) -> Result<(), String> {
	let mut child = Command::new(&shell[0])
		.args(&shell[1..])
		.arg("-")
		.stdin(Stdio::piped())
		.env_clear()
		.envs(env)
		.spawn()
		.map_err(|e| format!("failed to spawn shell '{}': {e}", shell[0]))?;

	let mut stdin = child
		.stdin
		.take()
		.ok_or("shell child has no stdin handle")?;
	let feeder = std::thread::spawn(move || {
		let _ = stdin.write_all(&script);
	});
	child
		.wait()
		.map_err(|e| format!("failed to wait for shell: {e}"))?;
	let _ = feeder.join();
	Ok(())
}
