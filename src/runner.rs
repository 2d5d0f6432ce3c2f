//! Test orchestration.
//!
//! This module owns everything between "here is a test" and "here is what
//! happened": environment preparation, the scoped working directory, the
//! parse/drive/reconstruct/diff pipeline, and the [`Runner`] that walks a
//! whole set of test files while keeping observers informed.
use std::collections::HashMap;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::diff::Comparison;
use crate::discover::find_tests;
use crate::events::{Event, EventContext, EventRegistry, Plugin};
use crate::exec::{self, SKIP_CODE};
use crate::recon::reconstruct;
use crate::transcript::Transcript;

/// Knobs for a single test run.
#[derive(Clone,Debug)]
pub struct Settings {
	/// Shell argv. `-` is appended at spawn time.
	pub shell: Vec<String>,
	/// Indent of commands and expected output within the transcript.
	pub indent: usize,
	/// Base environment for the shell. `None` means the ambient one.
	pub env: Option<HashMap<OsString, OsString>>,
	/// Scrub locale, timezone and friends out of the environment.
	pub cleanenv: bool,
	/// Run uncaptured for debugging; results come back empty.
	pub debug: bool,
	/// Path used for the diff header labels.
	pub testname: Option<PathBuf>,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			shell: vec!["/bin/sh".into()],
			indent: 2,
			env: None,
			cleanenv: true,
			debug: false,
			testname: None,
		}
	}
}

/// How a test ended up.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Outcome {
	Empty,
	Skipped,
	Passed,
	Failed,
}

impl Outcome {
	pub fn name(self) -> &'static str {
		match self {
			Outcome::Empty => "empty",
			Outcome::Skipped => "skipped",
			Outcome::Passed => "passed",
			Outcome::Failed => "failed",
		}
	}
}

/// The three-part result of running one test: the transcript as written,
/// the transcript as the shell actually played it, and the diff between
/// the two. A `None` postout means the skip sentinel fired.
#[derive(Debug)]
pub struct TestResult {
	pub refout: Vec<Vec<u8>>,
	pub postout: Option<Vec<Vec<u8>>>,
	pub diff: Vec<Vec<u8>>,
}

impl TestResult {
	pub fn outcome(&self) -> Outcome {
		if self.postout.is_none() {
			Outcome::Skipped
		} else if self.diff.is_empty() {
			Outcome::Passed
		} else {
			Outcome::Failed
		}
	}
}

/// Build the child environment: the base mapping plus `TESTSHELL`, plus
/// the clean-mode overrides when asked for. The parent environment is
/// only ever read, never written.
fn prepare_env(settings: &Settings) -> HashMap<OsString, OsString> {
	let mut env = match &settings.env {
		Some(env) => env.clone(),
		None => env::vars_os().collect(),
	};
	env.insert("TESTSHELL".into(), settings.shell[0].clone().into());
	if settings.cleanenv {
		for key in ["LANG", "LC_ALL", "LANGUAGE"] {
			env.insert(key.into(), "C".into());
		}
		env.insert("TZ".into(), "GMT".into());
		env.insert("CDPATH".into(), "".into());
		env.insert("COLUMNS".into(), "80".into());
		env.insert("GREP_OPTIONS".into(), "".into());
	}
	env
}

/// Diff header labels: the test path and the path with `.err` tacked on,
/// or empty labels when the test came from raw lines.
fn diff_labels(testname: Option<&Path>) -> (Vec<u8>, Vec<u8>) {
	match testname {
		Some(path) => {
			let from = path.as_os_str().as_encoded_bytes().to_vec();
			let mut to = from.clone();
			to.extend_from_slice(b".err");
			(from, to)
		}
		None => (vec![], vec![]),
	}
}

/// Run test lines through the shell and compare.
///
/// This is the whole engine in one call: parse the lines, feed the
/// commands through a single shell, rebuild the transcript from the
/// captured output, and diff it against the original. A command exiting
/// with the skip sentinel (80) yields `postout = None` and no diff.
pub fn test(lines: &[u8], settings: &Settings) -> Result<TestResult,String> {
	let mut transcript = Transcript::parse(lines, settings.indent);
	let env = prepare_env(settings);

	if settings.debug {
		let script = exec::build_debug_script(&transcript);
		exec::run_debug(&settings.shell, script, &env)?;
		return Ok(TestResult { refout: vec![], postout: Some(vec![]), diff: vec![] });
	}

	let salt = exec::make_salt();
	let script = exec::build_script(&transcript, &salt);
	let exec::Execution { output, exit_code } = exec::run_shell(&settings.shell, script, &env)?;

	if exit_code == SKIP_CODE {
		trace!("skip sentinel seen, dropping the run");
		return Ok(TestResult {
			refout: transcript.refout,
			postout: None,
			diff: vec![],
		});
	}

	let raw_postout = reconstruct(&mut transcript, &output, &salt, settings.indent)?;
	let (from_label, to_label) = diff_labels(settings.testname.as_deref());
	// Matched expectations survive the merge with their annotations, so a
	// passing test reconstructs to its own source, patterns and all.
	let comparison = Comparison::new(&transcript.refout, &raw_postout);
	let diff = comparison.unified(&from_label, &to_label);
	let postout = comparison.merged();

	Ok(TestResult {
		refout: transcript.refout,
		postout: Some(postout),
		diff,
	})
}

/// Run a test file. Sets `TESTDIR` and `TESTFILE` on top of whatever
/// [`test`] would set, and defaults the diff labels to the file's path.
pub fn testfile(path: &Path, settings: &Settings) -> Result<TestResult,String> {
	let content = fs::read(path)
		.map_err(|e| format!("failed to read test '{}': {e}", path.display()))?;
	let abspath = path
		.canonicalize()
		.map_err(|e| format!("failed to resolve '{}': {e}", path.display()))?;

	let mut settings = settings.clone();
	let mut env = settings
		.env
		.take()
		.unwrap_or_else(|| env::vars_os().collect());
	if let Some(dir) = abspath.parent() {
		env.insert("TESTDIR".into(), dir.as_os_str().to_os_string());
	}
	if let Some(name) = abspath.file_name() {
		env.insert("TESTFILE".into(), name.to_os_string());
	}
	settings.env = Some(env);
	if settings.testname.is_none() {
		settings.testname = Some(path.to_path_buf());
	}

	test(&content, &settings)
}

/// Scoped change of the process working directory. The previous cwd comes
/// back on drop, unwinds included. Cwd is process-wide state; don't hold
/// two of these on different threads.
pub struct CwdGuard {
	prev: PathBuf,
}

impl CwdGuard {
	pub fn enter(path: &Path) -> Result<Self,String> {
		let prev = env::current_dir()
			.map_err(|e| format!("failed to read working directory: {e}"))?;
		env::set_current_dir(path)
			.map_err(|e| format!("failed to enter '{}': {e}", path.display()))?;
		Ok(Self { prev })
	}
}

impl Drop for CwdGuard {
	fn drop(&mut self) {
		let _ = env::set_current_dir(&self.prev);
	}
}

/// One discovered test file, bound to the scratch area it will run in.
#[derive(Debug,Clone)]
pub struct TestFile {
	path: PathBuf,
	tmpdir: PathBuf,
}

impl TestFile {
	pub fn new(path: PathBuf, tmpdir: PathBuf) -> Self {
		Self { path, tmpdir }
	}

	/// Run the test inside a fresh scratch directory. `Ok(None)` means the
	/// file was empty and nothing was spawned.
	pub fn run(&self, settings: &Settings, keep_scratch: bool) -> Result<Option<TestResult>,String> {
		let meta = fs::metadata(&self.path)
			.map_err(|e| format!("failed to stat '{}': {e}", self.path.display()))?;
		if meta.len() == 0 {
			return Ok(None);
		}

		let abspath = self.path
			.canonicalize()
			.map_err(|e| format!("failed to resolve '{}': {e}", self.path.display()))?;
		let name = self.path
			.file_name()
			.map(|n| n.to_string_lossy().into_owned())
			.unwrap_or_else(|| "test".into());
		let scratch = tempfile::Builder::new()
			.prefix(&format!("{name}."))
			.tempdir_in(&self.tmpdir)
			.map_err(|e| format!("failed to create scratch directory: {e}"))?;

		let mut settings = settings.clone();
		settings.testname = Some(self.path.clone());

		let result = {
			let _cwd = CwdGuard::enter(scratch.path())?;
			testfile(&abspath, &settings)
		};

		if keep_scratch {
			let kept = scratch.keep();
			debug!("kept scratch directory {}", kept.display());
		}
		result.map(Some)
	}
}

/// Counts for one whole run.
#[derive(Clone,Copy,Debug,Default,PartialEq,Eq)]
pub struct RunSummary {
	pub ran: usize,
	pub empty: usize,
	pub skipped: usize,
	pub passed: usize,
	pub failed: usize,
}

/// Walks a set of test paths, runs each test in turn, and keeps plugins
/// and named-event hooks in the loop. Tests run strictly one at a time;
/// the scoped cwd makes anything else a hazard.
pub struct Runner {
	paths: Vec<PathBuf>,
	tmpdir: PathBuf,
	settings: Settings,
	keep_scratch: bool,
	registry: EventRegistry,
	plugins: Vec<Box<dyn Plugin>>,
}

impl Runner {
	pub fn new(paths: Vec<PathBuf>, tmpdir: PathBuf, settings: Settings) -> Self {
		Self {
			paths,
			tmpdir,
			settings,
			keep_scratch: false,
			registry: EventRegistry::new(),
			plugins: vec![],
		}
	}

	pub fn keep_scratch(mut self, keep: bool) -> Self {
		self.keep_scratch = keep;
		self
	}

	pub fn add_plugin(&mut self, plugin: Box<dyn Plugin>) {
		self.plugins.push(plugin);
	}

	/// Closure hooks registered by event name land here.
	pub fn registry_mut(&mut self) -> &mut EventRegistry {
		&mut self.registry
	}

	/// Run everything. A hard error (unreadable file, unspawnable shell)
	/// aborts the run and surfaces to the caller; test failures don't.
	pub fn run(&mut self) -> Result<RunSummary,String> {
		let tests = find_tests(&self.paths)?;
		let mut summary = RunSummary::default();

		self.registry.trigger(Event::PreRun, &EventContext::default());
		for plugin in &mut self.plugins {
			plugin.pre_run();
		}

		for path in tests {
			debug!("running {}", path.display());
			let ctx = EventContext { path: Some(&path), ..Default::default() };
			self.registry.trigger(Event::PreTest, &ctx);
			for plugin in &mut self.plugins {
				plugin.pre_test(&path);
			}

			let file = TestFile::new(path.clone(), self.tmpdir.clone());
			let result = file.run(&self.settings, self.keep_scratch)?;
			summary.ran += 1;

			let outcome = match &result {
				None => Outcome::Empty,
				Some(result) => result.outcome(),
			};
			let ctx = EventContext {
				path: Some(&path),
				outcome: Some(outcome),
				result: result.as_ref(),
				..Default::default()
			};
			match outcome {
				Outcome::Empty => {
					summary.empty += 1;
					self.registry.trigger(Event::EmptyTest, &ctx);
					for plugin in &mut self.plugins {
						plugin.empty_test(&path);
					}
				}
				Outcome::Skipped => {
					summary.skipped += 1;
					self.registry.trigger(Event::SkippedTest, &ctx);
					for plugin in &mut self.plugins {
						plugin.skipped_test(&path);
					}
				}
				Outcome::Passed => {
					summary.passed += 1;
					self.registry.trigger(Event::SucceededTest, &ctx);
					for plugin in &mut self.plugins {
						plugin.succeeded_test(&path);
					}
				}
				Outcome::Failed => {
					summary.failed += 1;
					self.registry.trigger(Event::FailedTest, &ctx);
					// Outcome::Failed implies the result is there.
					if let Some(result) = &result {
						for plugin in &mut self.plugins {
							plugin.failed_test(&path, result);
						}
					}
				}
			}

			self.registry.trigger(Event::PostTest, &ctx);
			for plugin in &mut self.plugins {
				plugin.post_test(&path, outcome);
			}
		}

		let ctx = EventContext { summary: Some(&summary), ..Default::default() };
		self.registry.trigger(Event::PostRun, &ctx);
		for plugin in &mut self.plugins {
			plugin.post_run(&summary);
		}
		Ok(summary)
	}
}
