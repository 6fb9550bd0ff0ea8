//! A bijection between legal permutations and lexical indices `0..M`, where
//! `M` is the number of distinct arrangements of the element bank plus empty
//! slots across all containers' capacity. Ranking is multinomial: the bank
//! contributes one of each distinct element, the remainder of each
//! container's capacity is filled by the empty marker, treated as one more
//! repeated symbol that sorts after every declared tag.

use std::cell::RefCell;
use std::collections::HashMap;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use tracing::instrument;

use crate::error::CodecError;
use crate::model::{Configuration, Permutation, Slot};

/// Built once from a [`Configuration`]; the multinomial cache it keeps is
/// valid for the codec's entire lifetime; `C(remaining)` is a pure function
/// of the remaining-counts vector, so entries are never invalidated.
#[derive(Debug)]
pub struct RankingCodec {
	bank_len: usize,
	total_slots: usize,
	cache: RefCell<HashMap<Vec<u32>, BigUint>>,
}

impl RankingCodec {
	pub fn new(config: &Configuration) -> RankingCodec {
		let total_slots = config.slot_layout().iter().sum();
		RankingCodec { bank_len: config.bank_len(), total_slots, cache: RefCell::new(HashMap::new()) }
	}

	/// Total number of distinct legal permutations, `M`.
	pub fn space_size(&self) -> BigUint {
		self.multinomial(&self.initial_counts())
	}

	fn initial_counts(&self) -> Vec<u32> {
		let mut counts = vec![1u32; self.bank_len];
		counts.push((self.total_slots - self.bank_len) as u32);
		counts
	}

	/// Number of distinct arrangements of the multiset described by `counts`,
	/// computed as a product of binomial coefficients peeling symbols off one
	/// at a time: `C(n, c_0) * C(n - c_0, c_1) * ...`.
	fn multinomial(&self, counts: &[u32]) -> BigUint {
		if let Some(cached) = self.cache.borrow().get(counts) {
			return cached.clone();
		}
		let mut remaining: u64 = counts.iter().map(|&c| c as u64).sum();
		let mut result = BigUint::one();
		for &c in counts {
			result *= binomial(remaining, c as u64);
			remaining -= c as u64;
		}
		self.cache.borrow_mut().insert(counts.to_vec(), result.clone());
		result
	}

	#[instrument(skip(self, permutation), fields(total_slots = self.total_slots))]
	pub fn encode(&self, permutation: &Permutation) -> Result<BigUint, CodecError> {
		if permutation.slots.len() != self.total_slots {
			return Err(CodecError::WrongLength { expected_len: self.total_slots, actual_len: permutation.slots.len() });
		}

		let mut remaining = self.initial_counts();
		let mut rank = BigUint::zero();
		for slot in &permutation.slots {
			let symbol = symbol_index(slot, self.bank_len);
			match remaining.get(symbol) {
				Some(&count) if count > 0 => {}
				_ => return Err(CodecError::WrongMultiset),
			}
			for lower in 0..symbol {
				if remaining[lower] > 0 {
					remaining[lower] -= 1;
					rank += self.multinomial(&remaining);
					remaining[lower] += 1;
				}
			}
			remaining[symbol] -= 1;
		}
		Ok(rank)
	}

	#[instrument(skip(self), fields(total_slots = self.total_slots))]
	pub fn decode(&self, index: &BigUint) -> Result<Permutation, CodecError> {
		let bound = self.space_size();
		if index >= &bound {
			return Err(CodecError::IndexOutOfRange { index: index.clone(), bound });
		}

		let mut remaining = self.initial_counts();
		let mut running = index.clone();
		let mut slots = Vec::with_capacity(self.total_slots);

		for _ in 0..self.total_slots {
			let mut chosen = None;
			for symbol in 0..remaining.len() {
				if remaining[symbol] == 0 {
					continue;
				}
				remaining[symbol] -= 1;
				let count = self.multinomial(&remaining);
				if running < count {
					chosen = Some(symbol);
					break;
				}
				remaining[symbol] += 1;
				running -= count;
			}
			let symbol = chosen.expect("bounds checked index must decode to a full permutation");
			slots.push(slot_from_index(symbol, self.bank_len));
		}

		Ok(Permutation { slots })
	}
}

fn symbol_index(slot: &Slot, bank_len: usize) -> usize {
	match slot {
		Slot::Element(id) => id.0 as usize,
		Slot::Empty => bank_len,
	}
}

fn slot_from_index(symbol: usize, bank_len: usize) -> Slot {
	if symbol == bank_len {
		Slot::Empty
	} else {
		Slot::Element(crate::model::ElementId(symbol as u32))
	}
}

/// `C(n, k)` via the standard multiplicative formula, using the smaller of
/// `k` and `n - k` to keep the number of factors down.
fn binomial(n: u64, k: u64) -> BigUint {
	let k = k.min(n - k);
	let mut result = BigUint::one();
	for i in 0..k {
		result *= BigUint::from(n - i);
		result /= BigUint::from(i + 1);
	}
	result
}
