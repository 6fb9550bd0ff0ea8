//! Typed errors at the two fallible boundaries of the core: configuration
//! validation (C1) and codec misuse (C3). Everything else — transition
//! enumeration, search — is total once a [`crate::model::Configuration`] has
//! validated successfully; see section 7 of the design notes.

use num_bigint::BigUint;
use thiserror::Error;

/// A structural problem found while validating a [`crate::model::ConfigurationSpec`].
///
/// Fatal for the affected configuration: none of these are retried internally,
/// they simply surface to the caller with a machine-readable reason.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
	#[error("container `{container}` binds unknown position handler `{tag}`")]
	UnknownHandler { container: String, tag: String },

	#[error("container `{container}` declares a transition whose from/to position tag `{tag}` does not match its bound handler")]
	PositionMismatch { container: String, tag: String },

	#[error("container `{container}` declares a transition to unknown target `{target}`")]
	UnknownTarget { container: String, target: String },

	#[error("duplicate container id `{id}`")]
	DuplicateContainerId { id: String },

	#[error("container `{container}` has zero capacity")]
	ZeroCapacity { container: String },

	#[error("element bank declares duplicate tag `{tag}`")]
	DuplicateElementTag { tag: String },

	#[error("element bank has {bank_len} tags but containers only provide {total_capacity} slots")]
	BankExceedsCapacity { bank_len: usize, total_capacity: usize },

	#[error("initial fill of container `{container}` exceeds its capacity")]
	InitialFillExceedsCapacity { container: String },

	#[error("initial fill of container `{container}` is not a sub-multiset of the element bank")]
	InitialFillNotSubMultiset { container: String },
}

/// Misuse of the ranking codec: a permutation that doesn't match the
/// configured bank multiset, or a lexical index outside `[0, M)`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
	#[error("permutation has length {actual_len}, expected {expected_len}")]
	WrongLength { expected_len: usize, actual_len: usize },

	#[error("permutation's multiset does not match the configured element bank")]
	WrongMultiset,

	#[error("lexical index {index} is out of range [0, {bound})")]
	IndexOutOfRange { index: BigUint, bound: BigUint },
}
