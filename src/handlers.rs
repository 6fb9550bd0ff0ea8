//! Position handlers: pure extract/insert operations over one container's
//! slots. Handlers carry no state of their own. Both operations return every
//! candidate slot worth considering, not just one — `start`/`end`/`stack`
//! only ever have one, but `any` considers every occupied or empty slot as a
//! distinct choice, which is what lets a single container-to-container
//! transition fan out into multiple successors.

use std::collections::HashMap;
use std::fmt;

use crate::model::{ElementId, InternalState, MoveContext, Slot};

/// Names a position handler. The four built-ins (`start`, `end`, `any`,
/// `stack`) are recognized by name; anything else must be registered in a
/// [`HandlerRegistry`] before a configuration using it can run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HandlerTag(pub String);

impl HandlerTag {
	pub fn built_in(&self) -> bool {
		matches!(self.0.as_str(), "start" | "top" | "end" | "bottom" | "any" | "middle" | "stack")
	}
}

impl fmt::Display for HandlerTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// A stateless pair of slot operations: `extract` lists every occupied slot
/// worth considering as a removal, `insert` lists every empty slot worth
/// considering as a placement for `element` (and may refuse `element`
/// outright by returning an empty list).
#[derive(Clone, Copy)]
pub struct PositionHandler {
	pub extract: fn(&InternalState) -> Vec<usize>,
	pub insert: fn(&InternalState, ElementId, &MoveContext) -> Vec<usize>,
}

impl fmt::Debug for PositionHandler {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PositionHandler").finish_non_exhaustive()
	}
}

fn start_extract(state: &InternalState) -> Vec<usize> {
	state.slots.iter().position(|s| !s.is_empty()).into_iter().collect()
}

fn start_insert(state: &InternalState, _element: ElementId, _ctx: &MoveContext) -> Vec<usize> {
	state.slots.iter().position(|s| s.is_empty()).into_iter().collect()
}

fn end_extract(state: &InternalState) -> Vec<usize> {
	state.slots.iter().rposition(|s| !s.is_empty()).into_iter().collect()
}

fn end_insert(state: &InternalState, _element: ElementId, _ctx: &MoveContext) -> Vec<usize> {
	state.slots.iter().rposition(|s| s.is_empty()).into_iter().collect()
}

fn any_extract(state: &InternalState) -> Vec<usize> {
	state.slots.iter().enumerate().filter(|(_, s)| !s.is_empty()).map(|(i, _)| i).collect()
}

fn any_insert(state: &InternalState, _element: ElementId, _ctx: &MoveContext) -> Vec<usize> {
	state.slots.iter().enumerate().filter(|(_, s)| s.is_empty()).map(|(i, _)| i).collect()
}

/// Last-in-first-out: extract from the end of the occupied run, insert right
/// after it. The two ends are fixed by definition, not configurable per binding.
/// Exposed so a custom insert rule (e.g. [`ordered_stack_insert`]) can be
/// paired with the same extraction behavior in a registered handler.
pub fn stack_extract(state: &InternalState) -> Vec<usize> {
	state.slots.iter().rposition(|s| !s.is_empty()).into_iter().collect()
}

fn stack_insert(state: &InternalState, _element: ElementId, _ctx: &MoveContext) -> Vec<usize> {
	let top_of_stack = match state.slots.iter().rposition(|s| !s.is_empty()) {
		Some(top) => Some(top + 1).filter(|&i| i < state.slots.len()),
		None if state.slots.is_empty() => None,
		None => Some(0),
	};
	top_of_stack.into_iter().collect()
}

/// Stack insertion that additionally refuses to place `element` on top of a
/// strictly smaller one, comparing raw [`ElementId`] ordering: a disk-style
/// constraint where the bank is declared smallest-id-first.
pub fn ordered_stack_insert(state: &InternalState, element: ElementId, _ctx: &MoveContext) -> Vec<usize> {
	match state.slots.iter().rposition(|s| !s.is_empty()) {
		Some(top) => {
			let top_element = state.slots[top].element().expect("rposition only matches occupied slots");
			if element > top_element {
				return Vec::new();
			}
			Some(top + 1).filter(|&i| i < state.slots.len()).into_iter().collect()
		}
		None => {
			if state.slots.is_empty() {
				Vec::new()
			} else {
				vec![0]
			}
		}
	}
}

/// Flat registry mapping handler names to their extract/insert pair. Holds
/// the four built-ins by default; custom handlers (e.g. [`ordered_stack_insert`])
/// are added with [`HandlerRegistry::register`].
#[derive(Clone)]
pub struct HandlerRegistry {
	handlers: HashMap<String, PositionHandler>,
}

impl fmt::Debug for HandlerRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HandlerRegistry").field("handlers", &self.handlers.keys().collect::<Vec<_>>()).finish()
	}
}

impl Default for HandlerRegistry {
	fn default() -> Self {
		let mut handlers = HashMap::new();
		handlers.insert("start".to_string(), PositionHandler { extract: start_extract, insert: start_insert });
		handlers.insert("top".to_string(), PositionHandler { extract: start_extract, insert: start_insert });
		handlers.insert("end".to_string(), PositionHandler { extract: end_extract, insert: end_insert });
		handlers.insert("bottom".to_string(), PositionHandler { extract: end_extract, insert: end_insert });
		handlers.insert("any".to_string(), PositionHandler { extract: any_extract, insert: any_insert });
		handlers.insert("middle".to_string(), PositionHandler { extract: any_extract, insert: any_insert });
		handlers.insert("stack".to_string(), PositionHandler { extract: stack_extract, insert: stack_insert });
		HandlerRegistry { handlers }
	}
}

impl HandlerRegistry {
	pub fn register(&mut self, tag: HandlerTag, handler: PositionHandler) {
		self.handlers.insert(tag.0, handler);
	}

	pub fn get(&self, tag: &HandlerTag) -> Option<&PositionHandler> {
		self.handlers.get(&tag.0)
	}
}

/// Every occupied slot `handler` considers a candidate removal, paired with
/// the element sitting there.
pub fn extract_candidates(handler: &PositionHandler, state: &InternalState) -> Vec<(usize, ElementId)> {
	(handler.extract)(state)
		.into_iter()
		.filter_map(|index| state.slots[index].element().map(|element| (index, element)))
		.collect()
}

/// Every empty slot `handler` is willing to place `element` into.
pub fn insert_candidates(handler: &PositionHandler, state: &InternalState, element: ElementId, ctx: &MoveContext) -> Vec<usize> {
	(handler.insert)(state, element, ctx)
}
