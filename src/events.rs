//! Run and test events.
//!
//! A run emits a fixed set of named events. Observers come in two shapes:
//! a [`Plugin`] implements the trait and overrides the phases it cares
//! about (everything defaults to a no-op), while ad-hoc hooks register a
//! closure against an event name through the [`EventRegistry`]. Asking
//! for a name outside the fixed set is rejected right at registration.
use std::collections::HashMap;
use std::path::Path;

use crate::runner::{Outcome, RunSummary, TestResult};

/// Every event a run can emit.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash)]
pub enum Event {
	PreRun,
	PostRun,
	PreTest,
	PostTest,
	EmptyTest,
	SkippedTest,
	SucceededTest,
	FailedTest,
}

impl Event {
	pub const ALL: [Event; 8] = [
		Event::PreRun,
		Event::PostRun,
		Event::PreTest,
		Event::PostTest,
		Event::EmptyTest,
		Event::SkippedTest,
		Event::SucceededTest,
		Event::FailedTest,
	];

	pub fn name(self) -> &'static str {
		match self {
			Event::PreRun => "pre-run",
			Event::PostRun => "post-run",
			Event::PreTest => "pre-test",
			Event::PostTest => "post-test",
			Event::EmptyTest => "empty-test",
			Event::SkippedTest => "skipped-test",
			Event::SucceededTest => "succeeded-test",
			Event::FailedTest => "failed-test",
		}
	}

	pub fn from_name(name: &str) -> Result<Self,String> {
		Event::ALL
			.into_iter()
			.find(|event| event.name() == name)
			.ok_or_else(|| format!("unknown event [{name}]"))
	}
}

/// What a hook gets to look at when its event fires. Fields are filled in
/// as far as the phase allows; `pre-run` has neither a path nor a result.
#[derive(Default)]
pub struct EventContext<'a> {
	pub path: Option<&'a Path>,
	pub outcome: Option<Outcome>,
	pub result: Option<&'a TestResult>,
	pub summary: Option<&'a RunSummary>,
}

pub type Hook = Box<dyn FnMut(&EventContext)>;

/// Closure observers, keyed by event.
#[derive(Default)]
pub struct EventRegistry {
	hooks: HashMap<Event, Vec<Hook>>,
}

impl EventRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Register a hook under an event name. Unknown names fail here, not
	/// at trigger time.
	pub fn register(&mut self, event: &str, hook: Hook) -> Result<(),String> {
		let event = Event::from_name(event)?;
		self.hooks.entry(event).or_default().push(hook);
		Ok(())
	}

	pub fn trigger(&mut self, event: Event, ctx: &EventContext) {
		if let Some(hooks) = self.hooks.get_mut(&event) {
			for hook in hooks {
				hook(ctx);
			}
		}
	}
}

/// A multi-event observer. Implement whichever phases matter; the rest
/// stay no-ops. The runner calls these directly, no name lookup involved.
#[allow(unused_variables)]
pub trait Plugin {
	fn pre_run(&mut self) {}
	fn post_run(&mut self, summary: &RunSummary) {}
	fn pre_test(&mut self, path: &Path) {}
	fn post_test(&mut self, path: &Path, outcome: Outcome) {}
	fn empty_test(&mut self, path: &Path) {}
	fn skipped_test(&mut self, path: &Path) {}
	fn succeeded_test(&mut self, path: &Path) {}
	fn failed_test(&mut self, path: &Path, result: &TestResult) {}
}
