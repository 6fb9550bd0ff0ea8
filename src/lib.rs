//! Models a discrete dynamical system of elements moving between fixed-capacity
//! containers.
//!
//! Three layers sit on top of each other and share one invariant: a canonical
//! permutation order and exactly one lexical index per legal state.
//!
//! - [`codec`] — a bijection between legal permutations and lexical indices.
//! - [`transitions`] — given one state, enumerates every legal successor.
//! - [`search`] — bounded reachability, path search, cycle detection, and
//!   level-by-level expansion over the graph the transition engine implies.
//!
//! Configuration (element bank, containers, allowed transitions, handler
//! bindings) is loaded by a caller, not by this crate; see [`model::ConfigurationSpec`].

pub mod codec;
pub mod error;
pub mod handlers;
pub mod model;
pub mod search;
pub mod transitions;

pub use codec::RankingCodec;
pub use error::{CodecError, ConfigError};
pub use handlers::{ordered_stack_insert, stack_extract, HandlerRegistry, HandlerTag, PositionHandler};
pub use model::{
	AllowedTransition, Configuration, ConfigurationSpec, Container, ContainerId, DefaultMoveTypeResolver,
	ElementId, InternalState, Metadata, MoveContext, MoveTypeResolver, Permutation, Slot, TransitionEngineOptions,
};
pub use search::{
	BudgetKind, Cycle, CycleResult, DiscoveredState, ExpansionResult, Limits, PathResult, PathStep,
	ReachabilityResult, Searcher,
};
pub use transitions::{DfSuccessors, Move, TransitionEngine};
