//! The data model: element bank, containers, allowed transitions, and the
//! validated [`Configuration`] built from a caller-supplied [`ConfigurationSpec`].

use std::collections::HashMap;
use std::fmt;

use crate::error::ConfigError;
use crate::handlers::HandlerTag;

/// Index into the element bank, `0..bank.len()`. Interned so the hot paths
/// (codec, transition enumeration) never compare strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ElementId(pub u32);

impl fmt::Display for ElementId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Index into `Configuration::containers`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContainerId(pub u32);

impl fmt::Display for ContainerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// One slot in the canonical permutation: either a present element, or the
/// empty marker. A distinct variant, not a sentinel value, so a slot can
/// never be confused with a real element id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Slot {
	Element(ElementId),
	Empty,
}

impl Slot {
	pub fn element(self) -> Option<ElementId> {
		match self {
			Slot::Element(id) => Some(id),
			Slot::Empty => None,
		}
	}

	pub fn is_empty(self) -> bool {
		matches!(self, Slot::Empty)
	}
}

/// Free-form tags attached to a configuration; not interpreted by this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metadata {
	pub tags: HashMap<String, String>,
}

/// One fixed-capacity container: a slice of the canonical permutation with a
/// single bound position handler and a set of transitions it may initiate.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Container {
	pub id: String,
	pub capacity: usize,
	pub handler: HandlerTag,
	pub transitions: Vec<AllowedTransition>,
	pub initial_fill: Vec<ElementId>,
}

/// A single legal move: from this container's `from_position` slot to a
/// named target container's `to_position` slot.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllowedTransition {
	pub target: String,
	pub from_position: HandlerTag,
	pub to_position: HandlerTag,
	pub move_type: Option<String>,
	/// Opaque to the engine; passed through to handlers via [`MoveContext`]
	/// and stamped onto the resulting [`crate::transitions::Move`].
	pub cost: Option<f64>,
	/// Opaque to the engine; passed through to handlers via [`MoveContext`]
	/// and stamped onto the resulting [`crate::transitions::Move`]. Each move
	/// owns its own copy, independent of the declaring container's own metadata.
	pub metadata: Option<Metadata>,
}

/// What an insertion handler is told about the move in progress, beyond the
/// element and the target container's own slots: the move-type tag it would
/// be stamped with, its opaque cost, and its metadata, so a custom handler
/// may gate a placement on any of them (e.g. rejecting a move whose cost
/// exceeds a budget, or whose metadata lacks a required tag).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MoveContext {
	pub move_type: Option<String>,
	pub cost: Option<f64>,
	pub metadata: Option<Metadata>,
}

/// Caller-supplied, unvalidated configuration. [`Configuration::build`] turns
/// this into a [`Configuration`] or reports every structural problem found.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfigurationSpec {
	pub bank: Vec<String>,
	pub containers: Vec<Container>,
	pub metadata: Metadata,
}

/// A validated configuration: the element bank is interned, every container's
/// handler binding and transitions are known-consistent, and the initial
/// fills partition (a subset of) the bank without exceeding any capacity.
#[derive(Debug, Clone)]
pub struct Configuration {
	pub(crate) bank_tags: Vec<String>,
	pub(crate) bank_index: HashMap<String, ElementId>,
	pub(crate) containers: Vec<Container>,
	pub(crate) container_index: HashMap<String, ContainerId>,
	pub metadata: Metadata,
}

impl Configuration {
	/// Validates `spec`, interning the bank and cross-checking every
	/// container/transition/handler reference. Collects every problem found
	/// rather than stopping at the first.
	pub fn build(spec: ConfigurationSpec) -> Result<Configuration, Vec<ConfigError>> {
		let mut errors = Vec::new();

		let mut bank_index = HashMap::with_capacity(spec.bank.len());
		for tag in &spec.bank {
			if bank_index.insert(tag.clone(), ElementId(bank_index.len() as u32)).is_some() {
				errors.push(ConfigError::DuplicateElementTag { tag: tag.clone() });
			}
		}

		let mut container_index = HashMap::with_capacity(spec.containers.len());
		for container in &spec.containers {
			if container_index.insert(container.id.clone(), ContainerId(container_index.len() as u32)).is_some() {
				errors.push(ConfigError::DuplicateContainerId { id: container.id.clone() });
			}
			if container.capacity == 0 {
				errors.push(ConfigError::ZeroCapacity { container: container.id.clone() });
			}
		}

		let total_capacity: usize = spec.containers.iter().map(|c| c.capacity).sum();
		if spec.bank.len() > total_capacity {
			errors.push(ConfigError::BankExceedsCapacity { bank_len: spec.bank.len(), total_capacity });
		}

		for container in &spec.containers {
			if !container.handler.built_in() && container.handler.0.is_empty() {
				errors.push(ConfigError::UnknownHandler { container: container.id.clone(), tag: container.handler.0.clone() });
			}

			if container.initial_fill.len() > container.capacity {
				errors.push(ConfigError::InitialFillExceedsCapacity { container: container.id.clone() });
			}
			for element in &container.initial_fill {
				if element.0 as usize >= spec.bank.len() {
					errors.push(ConfigError::InitialFillNotSubMultiset { container: container.id.clone() });
					break;
				}
			}

			for transition in &container.transitions {
				if transition.from_position != container.handler {
					errors.push(ConfigError::PositionMismatch {
						container: container.id.clone(),
						tag: transition.from_position.0.clone(),
					});
				}
				match container_index.get(&transition.target) {
					Some(target_id) => {
						let target = &spec.containers[target_id.0 as usize];
						if transition.to_position != target.handler {
							errors.push(ConfigError::PositionMismatch {
								container: target.id.clone(),
								tag: transition.to_position.0.clone(),
							});
						}
					}
					None => {
						errors.push(ConfigError::UnknownTarget {
							container: container.id.clone(),
							target: transition.target.clone(),
						});
					}
				}
			}
		}

		let mut seen_fill_counts = vec![0u32; spec.bank.len()];
		for container in &spec.containers {
			for element in &container.initial_fill {
				if (element.0 as usize) < seen_fill_counts.len() {
					seen_fill_counts[element.0 as usize] += 1;
				}
			}
		}
		if seen_fill_counts.iter().any(|&count| count > 1) {
			errors.push(ConfigError::InitialFillNotSubMultiset { container: "<bank>".to_string() });
		}

		if !errors.is_empty() {
			return Err(errors);
		}

		Ok(Configuration {
			bank_tags: spec.bank,
			bank_index,
			containers: spec.containers,
			container_index,
			metadata: spec.metadata,
		})
	}

	pub fn bank_len(&self) -> usize {
		self.bank_tags.len()
	}

	pub fn element_tag(&self, id: ElementId) -> &str {
		&self.bank_tags[id.0 as usize]
	}

	pub fn element_id(&self, tag: &str) -> Option<ElementId> {
		self.bank_index.get(tag).copied()
	}

	pub fn containers(&self) -> &[Container] {
		&self.containers
	}

	pub fn container(&self, id: ContainerId) -> &Container {
		&self.containers[id.0 as usize]
	}

	pub fn container_id(&self, name: &str) -> Option<ContainerId> {
		self.container_index.get(name).copied()
	}

	/// Per-container slot count in canonical order; capacity, in declaration order.
	pub fn slot_layout(&self) -> Vec<usize> {
		self.containers.iter().map(|c| c.capacity).collect()
	}

	/// Offset of `id`'s first slot within a flat [`Permutation`].
	pub fn container_offset(&self, id: ContainerId) -> usize {
		self.containers[..id.0 as usize].iter().map(|c| c.capacity).sum()
	}

	/// The canonical starting permutation implied by each container's `initial_fill`.
	pub fn initial_permutation(&self) -> Permutation {
		let mut slots = Vec::with_capacity(self.slot_layout().iter().sum());
		for container in &self.containers {
			for element in &container.initial_fill {
				slots.push(Slot::Element(*element));
			}
			for _ in container.initial_fill.len()..container.capacity {
				slots.push(Slot::Empty);
			}
		}
		Permutation { slots }
	}
}

/// One legal global state: a flat, canonically ordered sequence of slots,
/// container after container, each padded to its declared capacity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permutation {
	pub slots: Vec<Slot>,
}

impl Permutation {
	/// Re-slices the flat permutation into one [`InternalState`] per container.
	pub fn split(&self, config: &Configuration) -> Vec<InternalState> {
		let mut states = Vec::with_capacity(config.containers.len());
		let mut offset = 0;
		for container in &config.containers {
			let end = offset + container.capacity;
			states.push(InternalState { slots: self.slots[offset..end].to_vec() });
			offset = end;
		}
		states
	}

	/// Rebuilds a flat permutation from one [`InternalState`] per container,
	/// in configuration order. Panics if `states.len()` doesn't match.
	pub fn join(states: &[InternalState]) -> Permutation {
		let mut slots = Vec::new();
		for state in states {
			slots.extend_from_slice(&state.slots);
		}
		Permutation { slots }
	}
}

/// A single container's re-sliced view of a [`Permutation`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalState {
	pub slots: Vec<Slot>,
}

/// Resolves the `move_type` label attached to a transition once it actually
/// fires, given the concrete element being moved. Unifies what the
/// distilled spec described as two separate code paths (a declared label,
/// or a label derived from the element itself).
pub trait MoveTypeResolver: fmt::Debug {
	fn resolve(&self, transition: &AllowedTransition, element: ElementId, config: &Configuration) -> Option<String>;
}

/// Uses the transition's declared `move_type` verbatim; falls back to the
/// moved element's own tag when the transition leaves it unset.
#[derive(Debug, Clone, Default)]
pub struct DefaultMoveTypeResolver;

impl MoveTypeResolver for DefaultMoveTypeResolver {
	fn resolve(&self, transition: &AllowedTransition, element: ElementId, config: &Configuration) -> Option<String> {
		transition.move_type.clone().or_else(|| Some(config.element_tag(element).to_string()))
	}
}

/// Runtime knobs for [`crate::transitions::TransitionEngine`] that do not
/// affect what is legal, only how successors are produced and labeled.
pub struct TransitionEngineOptions {
	pub move_type_resolver: Box<dyn MoveTypeResolver>,
}

impl fmt::Debug for TransitionEngineOptions {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TransitionEngineOptions").field("move_type_resolver", &self.move_type_resolver).finish()
	}
}

impl Default for TransitionEngineOptions {
	fn default() -> Self {
		TransitionEngineOptions { move_type_resolver: Box::new(DefaultMoveTypeResolver) }
	}
}
