use std::cell::Cell;
use std::rc::Rc;

use pretty_assertions::assert_eq;

use crate::events::{Event, EventContext, EventRegistry};

#[test]
fn names_round_trip() {
	for event in Event::ALL {
		assert_eq!(Event::from_name(event.name()).unwrap(), event);
	}
}

#[test]
fn unknown_events_are_rejected_at_registration() {
	let mut registry = EventRegistry::new();
	let err = registry.register("mid-test", Box::new(|_| {})).unwrap_err();
	assert!(err.contains("unknown event"), "unexpected error: {err}");
	assert!(Event::from_name("").is_err());
}

#[test]
fn hooks_fire_once_per_trigger() {
	let mut registry = EventRegistry::new();
	let count = Rc::new(Cell::new(0));
	let seen = Rc::clone(&count);
	registry
		.register("pre-test", Box::new(move |_| seen.set(seen.get() + 1)))
		.unwrap();

	registry.trigger(Event::PreTest, &EventContext::default());
	registry.trigger(Event::PreTest, &EventContext::default());
	// Other events leave the hook alone.
	registry.trigger(Event::PostTest, &EventContext::default());
	assert_eq!(count.get(), 2);
}

#[test]
fn hooks_see_the_context() {
	let mut registry = EventRegistry::new();
	let seen = Rc::new(Cell::new(false));
	let inner = Rc::clone(&seen);
	registry
		.register("pre-test", Box::new(move |ctx| {
			inner.set(ctx.path.is_some_and(|p| p.ends_with("demo.t")));
		}))
		.unwrap();

	let path = std::path::PathBuf::from("demo.t");
	let ctx = EventContext { path: Some(&path), ..Default::default() };
	registry.trigger(Event::PreTest, &ctx);
	assert!(seen.get());
}
