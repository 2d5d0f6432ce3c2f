//! `shtest` is a functional test runner for command-line programs.
//!
//! A test is a transcript: a text file interleaving shell commands (behind
//! an indented `$ ` sigil) with the output those commands are expected to
//! produce. `shtest` replays the commands in a real shell, rebuilds the
//! transcript from what actually happened, and diffs the two, with
//! `(re)`, `(glob)` and `(esc)` annotated lines matched as patterns
//! instead of literal bytes.
//!
//! ### High-level structure:
//! 1. Arguments are parsed and test files are discovered
//! 2. Each test runs in its own scratch directory through one shell process
//! 3. Reports (dots, verbose lines or JSON) are plugins observing run events
use std::fmt::{Display, Write};
use std::fs;
use std::io::{self, Write as IoWrite};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::events::Plugin;
use crate::runner::{Outcome, RunSummary, Runner, Settings, TestResult};

pub mod diff;
pub mod discover;
pub mod escape;
pub mod events;
pub mod exec;
pub mod matcher;
pub mod recon;
pub mod runner;
pub mod transcript;
#[cfg(test)]
pub mod tests;

#[cfg(target_os = "linux")]
#[global_allocator]
/// For linux we use Jemalloc, following the same setup the rest of our tools ship with.
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

/// Print the given error message and exit the program.
///
/// Despite the header, this function does not return anything. It always calls
/// `std::process::exit(2)`. Code 2 marks a hard error (bad usage, unreadable
/// file, unspawnable shell) as opposed to code 1, which means tests failed.
///
/// The error message will be prefixed with `shtest:` if it is not already.
pub fn complain_and_exit<T>(err: impl Display) -> T {
	let mut err = err.to_string();
	if !err.starts_with("shtest: ") {
		err = format!("shtest: {err}");
	}
	eprintln!("{err}");
	std::process::exit(2)
}

/// The arguments passed to the program by the user
#[derive(Default,Clone,Debug)]
pub struct Opts {
	shell: Option<String>,
	indent: Option<usize>,

	preserve_env: bool,
	keep_tmpdir: bool,
	debug: bool,
	quiet: bool,
	verbose: bool,
	json: bool,
	trace: bool,

	paths: Vec<PathBuf>,
}

impl Opts {
	/// Parse the user's arguments
	pub fn parse() -> Result<Self,String> {
		let mut new = Self::default();
		let mut args = std::env::args().skip(1);
		while let Some(arg) = args.next() {
			match arg.as_str() {
				"--shell" | "-s" => {
					let Some(next_arg) = args.next() else {
						return Err(format!("Expected a shell path after '{arg}'"))
					};
					if next_arg.starts_with('-') {
						return Err(format!("Expected a shell path after '{arg}', found {next_arg}"))
					}
					new.shell = Some(next_arg)
				}
				"--indent" | "-i" => {
					let Some(next_arg) = args.next() else {
						return Err(format!("Expected a number after '{arg}'"))
					};
					let indent = next_arg
						.parse::<usize>()
						.map_err(|_| format!("Expected a number after '{arg}', found {next_arg}"))?;
					if indent == 0 {
						return Err("Indent must be at least 1".into())
					}
					new.indent = Some(indent)
				}
				"-E" | "--preserve-env" => {
					new.preserve_env = true;
				}
				"--keep-tmpdir" => {
					new.keep_tmpdir = true;
				}
				"-d" | "--debug" => {
					new.debug = true;
				}
				"-q" | "--quiet" => {
					new.quiet = true;
				}
				"-v" | "--verbose" => {
					new.verbose = true;
				}
				"-j" | "--json" => {
					new.json = true;
				}
				"--trace" => {
					new.trace = true;
				}
				_ => {
					if arg.starts_with('-') {
						return Err(format!("Unrecognized option '{arg}'"))
					}
					new.paths.push(PathBuf::from(arg))
				}
			}
		}
		if new.quiet && new.verbose {
			return Err("--quiet and --verbose don't mix".into())
		}
		Ok(new)
	}
}

/// Prints out the help info for `shtest`
fn get_help() -> String {
	let mut help = String::new();
	writeln!(help).ok();
	writeln!(help, "\x1b[1mshtest\x1b[0m").ok();
	writeln!(help, "A functional test runner that replays shell-transcript test files against a real shell.").ok();
	writeln!(help).ok();
	writeln!(help).ok();
	writeln!(help, "\x1b[1;4mUSAGE:\x1b[0m").ok();
	writeln!(help, "\tshtest [OPTIONS] [TESTS]...").ok();
	writeln!(help).ok();
	writeln!(help, "\tTESTS are .t files, or directories searched recursively for them.").ok();
	writeln!(help).ok();
	writeln!(help).ok();
	writeln!(help, "\x1b[1;4mOPTIONS:\x1b[0m").ok();
	writeln!(help, "\t-s, --shell <SH>").ok();
	writeln!(help, "\t\tShell to run the tests with. Default is /bin/sh.").ok();
	writeln!(help).ok();
	writeln!(help, "\t-i, --indent <N>").ok();
	writeln!(help, "\t\tIndent of commands and expected output inside test files. Default is 2.").ok();
	writeln!(help).ok();
	writeln!(help, "\t-E, --preserve-env").ok();
	writeln!(help, "\t\tDon't sanitize the environment. By default tests run with LANG/LC_ALL/LANGUAGE=C,").ok();
	writeln!(help, "\t\tTZ=GMT, COLUMNS=80 and an empty CDPATH, so their output is reproducible.").ok();
	writeln!(help).ok();
	writeln!(help, "\t--keep-tmpdir").ok();
	writeln!(help, "\t\tKeep the per-test scratch directories around for inspection.").ok();
	writeln!(help).ok();
	writeln!(help, "\t-d, --debug").ok();
	writeln!(help, "\t\tFeed the commands to the shell with inherited stdout and stderr.").ok();
	writeln!(help, "\t\tNothing is captured and nothing is compared.").ok();
	writeln!(help).ok();
	writeln!(help, "\t-q, --quiet").ok();
	writeln!(help, "\t\tNo progress output. Failing diffs are still printed.").ok();
	writeln!(help).ok();
	writeln!(help, "\t-v, --verbose").ok();
	writeln!(help, "\t\tOne line per test instead of progress dots.").ok();
	writeln!(help).ok();
	writeln!(help, "\t-j, --json").ok();
	writeln!(help, "\t\tPrint a JSON report instead of the human-readable one.").ok();
	writeln!(help).ok();
	writeln!(help, "\t--trace").ok();
	writeln!(help, "\t\tPrint a debug trace of the run").ok();
	writeln!(help).ok();
	writeln!(help).ok();
	writeln!(help, "\x1b[1;4mTEST FORMAT:\x1b[0m").ok();
	writeln!(help, "\tEverything indented and behind '$ ' is a command; '> ' continues it.").ok();
	writeln!(help, "\tIndented lines without a sigil are the expected output. Lines ending in").ok();
	writeln!(help, "\t'(re)', '(glob)' or '(esc)' match as patterns. A command exiting N != 0").ok();
	writeln!(help, "\tis expected to say so with a '[N]' line. Exit code 80 skips the test.").ok();
	writeln!(help).ok();
	writeln!(help).ok();
	writeln!(help, "\x1b[1;4mEXAMPLE:\x1b[0m").ok();
	writeln!(help, "\t  $ echo hi").ok();
	writeln!(help, "\t  hi").ok();
	writeln!(help, "\t  $ echo bad").ok();
	writeln!(help, "\t  [a-z]{{3}} (re)").ok();
	writeln!(help).ok();
	writeln!(help, "For more info, see: https://github.com/km-clay/shtest").ok();
	help
}

/// Initialize the logger
///
/// This interacts with the `--trace` flag that can be passed in the arguments.
/// If `trace` is true, then trace!() calls always activate, with our custom formatting.
fn init_logger(trace: bool) {
	let mut builder = env_logger::builder();
	if trace {
		builder.filter(None, log::LevelFilter::Trace);
	}

	builder.format(move |buf, record| {
		let color = match record.level() {
			log::Level::Error => "\x1b[1;31m",
			log::Level::Warn => "\x1b[33m",
			log::Level::Info => "\x1b[32m",
			log::Level::Debug => "\x1b[34m",
			log::Level::Trace => "\x1b[36m"
		};
		writeln!(buf, "[{color}{}\x1b[0m] {}", record.level(), record.args())
	});

	builder.init();
}

/// Print help or version info and exit early if `--help` or `--version` are found
fn print_help_or_version() {
	if std::env::args().skip(1).count() == 0 {
		eprintln!("USAGE:");
		eprintln!("\tshtest [OPTIONS] [TESTS]...");
		eprintln!();
		eprintln!("use '--help' for more information");
		std::process::exit(2);
	}
	if std::env::args().any(|arg| arg == "--help" || arg == "-h") {
		print!("{}",get_help());
		std::process::exit(0);
	}
	if std::env::args().any(|arg| arg == "--version") {
		println!("shtest {}", env!("CARGO_PKG_VERSION"));
		std::process::exit(0);
	}
}

/// The path a failing test's reconstructed transcript is written to.
fn err_path(path: &Path) -> PathBuf {
	let mut err = path.as_os_str().to_os_string();
	err.push(".err");
	PathBuf::from(err)
}

/// The human-readable report: progress dots (or one line per test with
/// --verbose), failing diffs as they happen, a summary at the end.
struct CliReport {
	quiet: bool,
	verbose: bool,
	dots_pending: bool,
}

impl CliReport {
	fn new(quiet: bool, verbose: bool) -> Self {
		Self { quiet, verbose, dots_pending: false }
	}

	fn progress(&mut self, symbol: char, path: &Path, word: &str) {
		if self.verbose {
			println!("{}: {word}", path.display());
		} else if !self.quiet {
			print!("{symbol}");
			io::stdout().flush().ok();
			self.dots_pending = true;
		}
	}

	/// Dots and raw diff bytes share stdout; break the dot line first.
	fn flush_dots(&mut self) {
		if self.dots_pending {
			println!();
			self.dots_pending = false;
		}
	}
}

impl Plugin for CliReport {
	fn empty_test(&mut self, path: &Path) {
		self.progress('-', path, "empty");
	}

	fn skipped_test(&mut self, path: &Path) {
		self.progress('s', path, "skipped");
	}

	fn succeeded_test(&mut self, path: &Path) {
		self.progress('.', path, "passed");
		// A leftover .err from an earlier failing run is stale now.
		fs::remove_file(err_path(path)).ok();
	}

	fn failed_test(&mut self, path: &Path, result: &TestResult) {
		self.progress('!', path, "failed");
		if let Some(postout) = &result.postout {
			fs::write(err_path(path), postout.concat()).ok();
		}
		self.flush_dots();
		let mut stdout = io::stdout().lock();
		for line in &result.diff {
			stdout.write_all(line).ok();
		}
	}

	fn post_run(&mut self, summary: &RunSummary) {
		self.flush_dots();
		println!(
			"# Ran {} tests, {} skipped, {} failed.",
			summary.ran, summary.skipped, summary.failed
		);
	}
}

/// The machine-readable report: one JSON object per test, counts at the end.
#[derive(Default)]
struct JsonReport {
	entries: Vec<Value>,
}

impl JsonReport {
	fn push(&mut self, path: &Path, outcome: Outcome, failure: Option<&TestResult>) {
		let mut obj = Map::new();
		obj.insert("path".into(), Value::String(path.to_string_lossy().to_string()));
		obj.insert("outcome".into(), Value::String(outcome.name().to_string()));
		if let Some(result) = failure {
			let diff = result.diff.concat();
			obj.insert("diff".into(), Value::String(String::from_utf8_lossy(&diff).to_string()));
		}
		self.entries.push(Value::Object(obj));
	}
}

impl Plugin for JsonReport {
	fn empty_test(&mut self, path: &Path) {
		self.push(path, Outcome::Empty, None);
	}

	fn skipped_test(&mut self, path: &Path) {
		self.push(path, Outcome::Skipped, None);
	}

	fn succeeded_test(&mut self, path: &Path) {
		self.push(path, Outcome::Passed, None);
	}

	fn failed_test(&mut self, path: &Path, result: &TestResult) {
		self.push(path, Outcome::Failed, Some(result));
	}

	fn post_run(&mut self, summary: &RunSummary) {
		let mut report = Map::new();
		report.insert("tests".into(), Value::Array(std::mem::take(&mut self.entries)));
		report.insert("ran".into(), Value::from(summary.ran));
		report.insert("empty".into(), Value::from(summary.empty));
		report.insert("skipped".into(), Value::from(summary.skipped));
		report.insert("passed".into(), Value::from(summary.passed));
		report.insert("failed".into(), Value::from(summary.failed));
		let json = Value::Object(report);
		let pretty = serde_json::to_string_pretty(&json).unwrap_or_default();
		let mut stdout = io::stdout().lock();
		writeln!(stdout, "{pretty}").ok();
	}
}

fn main() {
	print_help_or_version();
	let opts = Opts::parse().unwrap_or_else(complain_and_exit);
	init_logger(opts.trace);

	if opts.paths.is_empty() {
		complain_and_exit::<()>("no tests given");
	}

	let mut settings = Settings::default();
	if let Some(shell) = opts.shell.clone() {
		settings.shell = vec![shell];
	}
	if let Some(indent) = opts.indent {
		settings.indent = indent;
	}
	settings.cleanenv = !opts.preserve_env;
	settings.debug = opts.debug;

	let tmpdir = tempfile::Builder::new()
		.prefix("shtest.")
		.tempdir()
		.unwrap_or_else(complain_and_exit);

	let mut runner = Runner::new(opts.paths.clone(), tmpdir.path().to_path_buf(), settings)
		.keep_scratch(opts.keep_tmpdir);
	if opts.json {
		runner.add_plugin(Box::new(JsonReport::default()));
	} else {
		runner.add_plugin(Box::new(CliReport::new(opts.quiet, opts.verbose)));
	}

	let summary = runner.run().unwrap_or_else(complain_and_exit);

	// process::exit runs no destructors, so the temp dir is dealt with by
	// hand: persisted on request, removed otherwise.
	if opts.keep_tmpdir {
		let kept = tmpdir.keep();
		eprintln!("# Kept temporary directory: {}", kept.display());
	} else {
		drop(tmpdir);
	}

	std::process::exit(if summary.failed > 0 { 1 } else { 0 })
}
