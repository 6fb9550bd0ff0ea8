//! Given one legal state, enumerates every legal successor. Successor
//! generation is pull-based: [`DfSuccessors`] is a plain [`Iterator`] driven
//! by explicit cursor state, so a caller can stop early (cycle detection,
//! budgeted search) without paying for moves it never asked for.

use num_bigint::BigUint;
use tracing::instrument;

use crate::codec::RankingCodec;
use crate::error::ConfigError;
use crate::handlers::{extract_candidates, insert_candidates, HandlerRegistry};
use crate::model::{Configuration, ContainerId, ElementId, InternalState, Metadata, MoveContext, Permutation, Slot, TransitionEngineOptions};

/// One legal move: an element leaving `from`'s extracted slot and landing in
/// `to`'s inserted slot, labeled by whatever the configured
/// [`crate::model::MoveTypeResolver`] resolves it to, carrying the lexical
/// index of the resulting state.
#[derive(Debug, Clone, PartialEq)]
pub struct Move {
	pub from: ContainerId,
	pub to: ContainerId,
	pub element: ElementId,
	pub(crate) from_slot: usize,
	pub(crate) to_slot: usize,
	pub move_type: Option<String>,
	pub cost: Option<f64>,
	pub successor_index: BigUint,
	/// Copied from the firing transition; independent of any container-level
	/// metadata and immutable once the move is produced.
	pub metadata: Option<Metadata>,
}

/// Borrowed engine references plus the one permutation successors are being
/// generated for, re-sliced once per container.
struct GenerationContext<'a> {
	config: &'a Configuration,
	handlers: &'a HandlerRegistry,
	options: &'a TransitionEngineOptions,
	codec: &'a RankingCodec,
	permutation: Permutation,
	states: Vec<InternalState>,
}

/// Depth-first, lazily pulled successor sequence. Cursors nest four levels
/// deep, outermost first: source container (declaration order), its
/// transitions (declaration order), the source container's extraction
/// candidates (handler enumeration order), and the target container's
/// insertion candidates for the element a given extraction candidate holds.
/// Each level's candidate list is computed once and cached until the level
/// above it advances.
pub struct DfSuccessors<'a> {
	ctx: GenerationContext<'a>,
	container_cursor: usize,
	transition_cursor: usize,
	extract_cache: Option<Vec<(usize, ElementId)>>,
	extract_cursor: usize,
	insert_cache: Option<Vec<usize>>,
	insert_cursor: usize,
}

impl<'a> Iterator for DfSuccessors<'a> {
	type Item = Move;

	fn next(&mut self) -> Option<Move> {
		loop {
			let container_count = self.ctx.config.containers().len();
			if self.container_cursor >= container_count {
				return None;
			}
			let from = ContainerId(self.container_cursor as u32);
			let from_container = self.ctx.config.container(from);

			if self.transition_cursor >= from_container.transitions.len() {
				self.container_cursor += 1;
				self.transition_cursor = 0;
				self.extract_cache = None;
				continue;
			}
			let transition = &from_container.transitions[self.transition_cursor];

			if self.extract_cache.is_none() {
				let candidates = match self.ctx.handlers.get(&from_container.handler) {
					Some(handler) => extract_candidates(handler, &self.ctx.states[from.0 as usize]),
					None => Vec::new(),
				};
				self.extract_cache = Some(candidates);
				self.extract_cursor = 0;
				self.insert_cache = None;
			}

			let extract_len = self.extract_cache.as_ref().unwrap().len();
			if self.extract_cursor >= extract_len {
				self.transition_cursor += 1;
				self.extract_cache = None;
				continue;
			}
			let (extract_local, element) = self.extract_cache.as_ref().unwrap()[self.extract_cursor];

			if self.insert_cache.is_none() {
				let move_ctx =
					MoveContext { move_type: transition.move_type.clone(), cost: transition.cost, metadata: transition.metadata.clone() };
				let candidates = self
					.ctx
					.config
					.container_id(&transition.target)
					.zip(self.ctx.handlers.get(&transition.to_position))
					.map(|(to, handler)| insert_candidates(handler, &self.ctx.states[to.0 as usize], element, &move_ctx))
					.unwrap_or_default();
				self.insert_cache = Some(candidates);
				self.insert_cursor = 0;
			}

			let insert_len = self.insert_cache.as_ref().unwrap().len();
			if self.insert_cursor >= insert_len {
				self.extract_cursor += 1;
				self.insert_cache = None;
				continue;
			}
			let insert_local = self.insert_cache.as_ref().unwrap()[self.insert_cursor];
			self.insert_cursor += 1;

			let Some(to) = self.ctx.config.container_id(&transition.target) else { continue };
			let from_slot = self.ctx.config.container_offset(from) + extract_local;
			let to_slot = self.ctx.config.container_offset(to) + insert_local;
			if from_slot == to_slot {
				continue;
			}

			let mut successor_slots = self.ctx.permutation.slots.clone();
			successor_slots[from_slot] = Slot::Empty;
			successor_slots[to_slot] = Slot::Element(element);
			let successor_index = self
				.ctx
				.codec
				.encode(&Permutation { slots: successor_slots })
				.expect("a move only ever relocates one element between a vacated and a filled slot, preserving the bank multiset");

			let move_type = self.ctx.options.move_type_resolver.resolve(transition, element, self.ctx.config);
			return Some(Move {
				from,
				to,
				element,
				from_slot,
				to_slot,
				move_type,
				cost: transition.cost,
				successor_index,
				metadata: transition.metadata.clone(),
			});
		}
	}
}

/// Owns the validated configuration, handler bindings, and codec a
/// state-space walk is run against.
#[derive(Debug)]
pub struct TransitionEngine<'a> {
	config: &'a Configuration,
	handlers: HandlerRegistry,
	options: TransitionEngineOptions,
	codec: &'a RankingCodec,
}

impl<'a> TransitionEngine<'a> {
	/// Builds an engine for `config`, failing if any container's bound
	/// handler or any transition's from/to position tag is not registered in
	/// `handlers`. Checking this once up front means [`DfSuccessors`] never
	/// has to silently treat an unregistered handler as "no candidates".
	pub fn new(
		config: &'a Configuration,
		codec: &'a RankingCodec,
		handlers: HandlerRegistry,
		options: TransitionEngineOptions,
	) -> Result<TransitionEngine<'a>, Vec<ConfigError>> {
		let mut errors = Vec::new();
		for container in config.containers() {
			if handlers.get(&container.handler).is_none() {
				errors.push(ConfigError::UnknownHandler { container: container.id.clone(), tag: container.handler.0.clone() });
			}
			for transition in &container.transitions {
				if handlers.get(&transition.from_position).is_none() {
					errors.push(ConfigError::UnknownHandler { container: container.id.clone(), tag: transition.from_position.0.clone() });
				}
				if handlers.get(&transition.to_position).is_none() {
					errors.push(ConfigError::UnknownHandler { container: transition.target.clone(), tag: transition.to_position.0.clone() });
				}
			}
		}
		if !errors.is_empty() {
			return Err(errors);
		}
		Ok(TransitionEngine { config, handlers, options, codec })
	}

	pub fn config(&self) -> &Configuration {
		self.config
	}

	/// Lazily pulled depth-first successor sequence for `permutation`.
	#[instrument(skip(self, permutation))]
	pub fn successors_df(&self, permutation: &Permutation) -> DfSuccessors<'_> {
		let states = permutation.split(self.config);
		DfSuccessors {
			ctx: GenerationContext {
				config: self.config,
				handlers: &self.handlers,
				options: &self.options,
				codec: self.codec,
				permutation: permutation.clone(),
				states,
			},
			container_cursor: 0,
			transition_cursor: 0,
			extract_cache: None,
			extract_cursor: 0,
			insert_cache: None,
			insert_cursor: 0,
		}
	}

	/// Eagerly collected breadth-first successor list for `permutation`.
	#[instrument(skip(self, permutation))]
	pub fn successors_bf(&self, permutation: &Permutation) -> Vec<Move> {
		self.successors_df(permutation).collect()
	}

	/// Applies `mv` to `permutation`, producing the resulting state. Does not
	/// re-validate legality; callers are expected to apply moves this engine
	/// itself produced.
	pub fn apply(&self, permutation: &Permutation, mv: &Move) -> Permutation {
		let mut slots = permutation.slots.clone();
		slots[mv.from_slot] = Slot::Empty;
		slots[mv.to_slot] = Slot::Element(mv.element);
		Permutation { slots }
	}
}
