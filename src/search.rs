//! Bounded reachability, path search, cycle detection, and level-by-level
//! expansion over the graph the transition engine implies. Every operation
//! shares one [`Limits`] record; budget exhaustion is reported on the result,
//! never as an error — running out of steps or time is an expected outcome
//! of bounding a search, not a failure of it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use tracing::instrument;

use crate::model::Permutation;
use crate::transitions::{Move, TransitionEngine};

/// Caps shared by every search operation. `None` means unbounded for that
/// dimension.
#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
	/// Maximum path length / search depth.
	pub step_limit: Option<u64>,
	/// Maximum number of states dequeued and expanded.
	pub visit_limit: Option<u64>,
	/// Wall-clock budget for the whole call.
	pub time_limit: Option<Duration>,
}

/// Which dimension of [`Limits`] caused a search to stop early, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetKind {
	Steps,
	Visits,
	Time,
}

struct Budget {
	limits: Limits,
	started: Instant,
	examined: u64,
}

impl Budget {
	fn new(limits: Limits) -> Budget {
		Budget { limits, started: Instant::now(), examined: 0 }
	}

	fn time_exhausted(&self) -> bool {
		matches!(self.limits.time_limit, Some(limit) if self.started.elapsed() >= limit)
	}

	fn depth_exhausted(&self, depth: u64) -> bool {
		matches!(self.limits.step_limit, Some(limit) if depth >= limit)
	}

	/// Call once per dequeued/expanded state, before processing it. Returns
	/// the budget kind that now forbids expanding it, if any.
	fn check_and_count(&mut self) -> Option<BudgetKind> {
		if self.time_exhausted() {
			return Some(BudgetKind::Time);
		}
		if matches!(self.limits.visit_limit, Some(limit) if self.examined >= limit) {
			return Some(BudgetKind::Visits);
		}
		self.examined += 1;
		None
	}
}

/// Result of [`Searcher::reachability`].
#[derive(Debug, Clone)]
pub struct ReachabilityResult {
	pub visited: HashSet<Permutation>,
	pub budget_exhausted: Option<BudgetKind>,
}

/// One step of a found path.
#[derive(Debug, Clone)]
pub struct PathStep {
	pub state: Permutation,
	pub mv: Option<Move>,
}

/// Result of [`Searcher::path_search`].
#[derive(Debug, Clone)]
pub struct PathResult {
	pub path: Option<Vec<PathStep>>,
	pub budget_exhausted: Option<BudgetKind>,
}

/// A single detected cycle, as the sequence of moves that returns to the
/// first repeated state.
#[derive(Debug, Clone)]
pub struct Cycle {
	pub states: Vec<Permutation>,
	pub moves: Vec<Move>,
}

/// Result of [`Searcher::detect_cycles`].
#[derive(Debug, Clone)]
pub struct CycleResult {
	pub cycles: Vec<Cycle>,
	pub budget_exhausted: Option<BudgetKind>,
}

/// A state discovered during [`Searcher::expand`], tagged with the depth it
/// was first reached at.
#[derive(Debug, Clone)]
pub struct DiscoveredState {
	pub state: Permutation,
	pub depth: u64,
}

/// Result of [`Searcher::expand`].
#[derive(Debug, Clone)]
pub struct ExpansionResult {
	pub levels: Vec<Vec<DiscoveredState>>,
	pub budget_exhausted: Option<BudgetKind>,
}

/// Runs the bounded graph algorithms over the state space one
/// [`TransitionEngine`] implies.
pub struct Searcher<'a> {
	engine: &'a TransitionEngine<'a>,
}

impl<'a> Searcher<'a> {
	pub fn new(engine: &'a TransitionEngine<'a>) -> Searcher<'a> {
		Searcher { engine }
	}

	/// Breadth-first set of every state reachable from `origin` within `limits`.
	#[instrument(skip(self, origin))]
	pub fn reachability(&self, origin: &Permutation, limits: Limits) -> ReachabilityResult {
		let mut budget = Budget::new(limits);
		let mut visited = HashSet::new();
		visited.insert(origin.clone());
		let mut queue = VecDeque::new();
		queue.push_back((origin.clone(), 0u64));
		let mut budget_exhausted = None;

		while let Some((state, depth)) = queue.pop_front() {
			if let Some(kind) = budget.check_and_count() {
				budget_exhausted = Some(kind);
				break;
			}
			if budget.depth_exhausted(depth) {
				budget_exhausted.get_or_insert(BudgetKind::Steps);
				continue;
			}
			for mv in self.engine.successors_df(&state) {
				let next = self.engine.apply(&state, &mv);
				if visited.insert(next.clone()) {
					queue.push_back((next, depth + 1));
				}
			}
		}

		ReachabilityResult { visited, budget_exhausted }
	}

	/// Shortest (fewest-moves) path from `origin` to a state satisfying
	/// `is_goal`, breadth-first, within `limits`.
	#[instrument(skip(self, origin, is_goal))]
	pub fn path_search(&self, origin: &Permutation, is_goal: impl Fn(&Permutation) -> bool, limits: Limits) -> PathResult {
		let mut budget = Budget::new(limits);
		let mut visited = HashSet::new();
		visited.insert(origin.clone());
		let mut predecessor: HashMap<Permutation, (Permutation, Move)> = HashMap::new();
		let mut queue = VecDeque::new();
		queue.push_back((origin.clone(), 0u64));
		let mut budget_exhausted = None;
		let mut found = None;

		if is_goal(origin) {
			return PathResult { path: Some(vec![PathStep { state: origin.clone(), mv: None }]), budget_exhausted: None };
		}

		'search: while let Some((state, depth)) = queue.pop_front() {
			if let Some(kind) = budget.check_and_count() {
				budget_exhausted = Some(kind);
				break;
			}
			if budget.depth_exhausted(depth) {
				budget_exhausted.get_or_insert(BudgetKind::Steps);
				continue;
			}
			for mv in self.engine.successors_df(&state) {
				let next = self.engine.apply(&state, &mv);
				if !visited.insert(next.clone()) {
					continue;
				}
				predecessor.insert(next.clone(), (state.clone(), mv));
				if is_goal(&next) {
					found = Some(next);
					break 'search;
				}
				queue.push_back((next, depth + 1));
			}
		}

		let path = found.map(|goal| {
			// each entry is pushed alongside the move that leaves it for the next
			// entry, so no re-pairing is needed after the reverse.
			let mut steps = vec![PathStep { state: goal.clone(), mv: None }];
			let mut cursor = goal;
			while let Some((prev, mv)) = predecessor.get(&cursor) {
				steps.push(PathStep { state: prev.clone(), mv: Some(mv.clone()) });
				cursor = prev.clone();
			}
			steps.reverse();
			steps
		});

		PathResult { path, budget_exhausted }
	}

	/// Depth-first cycle detection from `origin`, within `limits`. Uses an
	/// explicit stack of frames rather than recursion, so depth is bounded by
	/// heap, not call stack, and each frame's successors are drained eagerly
	/// into an owned list to avoid borrowing the transition engine across
	/// frames.
	#[instrument(skip(self, origin))]
	pub fn detect_cycles(&self, origin: &Permutation, limits: Limits) -> CycleResult {
		struct Frame {
			state: Permutation,
			moves: Vec<Move>,
			cursor: usize,
		}

		let mut budget = Budget::new(limits);
		let mut cycles = Vec::new();
		let mut budget_exhausted = None;

		let mut on_path: Vec<Permutation> = vec![origin.clone()];
		let mut on_path_moves: Vec<Move> = Vec::new();
		let mut stack = vec![Frame { state: origin.clone(), moves: self.engine.successors_df(origin).collect(), cursor: 0 }];

		'outer: while let Some(frame) = stack.last_mut() {
			if let Some(kind) = budget.check_and_count() {
				budget_exhausted = Some(kind);
				break;
			}
			if budget.depth_exhausted(stack.len() as u64) {
				budget_exhausted.get_or_insert(BudgetKind::Steps);
				stack.pop();
				on_path.pop();
				on_path_moves.pop();
				continue;
			}

			if frame.cursor >= frame.moves.len() {
				stack.pop();
				on_path.pop();
				on_path_moves.pop();
				continue;
			}

			let mv = frame.moves[frame.cursor].clone();
			frame.cursor += 1;
			let next = self.engine.apply(&frame.state, &mv);

			if let Some(start) = on_path.iter().position(|s| *s == next) {
				let mut states = on_path[start..].to_vec();
				states.push(next.clone());
				let moves = on_path_moves[start..].to_vec();
				cycles.push(Cycle { states, moves: { let mut m = moves; m.push(mv.clone()); m } });
				continue 'outer;
			}

			on_path.push(next.clone());
			on_path_moves.push(mv);
			stack.push(Frame { state: next.clone(), moves: self.engine.successors_df(&next).collect(), cursor: 0 });
		}

		CycleResult { cycles, budget_exhausted }
	}

	/// Breadth-first level-by-level expansion from `origin`, within `limits`.
	/// Unlike [`Searcher::reachability`], preserves the depth each state was
	/// first reached at.
	#[instrument(skip(self, origin))]
	pub fn expand(&self, origin: &Permutation, limits: Limits) -> ExpansionResult {
		let mut budget = Budget::new(limits);
		let mut visited = HashSet::new();
		visited.insert(origin.clone());
		let mut levels = vec![vec![DiscoveredState { state: origin.clone(), depth: 0 }]];
		let mut budget_exhausted = None;
		let mut frontier = vec![origin.clone()];
		let mut depth = 0u64;

		'levels: loop {
			if budget.depth_exhausted(depth) {
				budget_exhausted.get_or_insert(BudgetKind::Steps);
				break;
			}
			let mut next_frontier = Vec::new();
			for state in &frontier {
				if let Some(kind) = budget.check_and_count() {
					budget_exhausted = Some(kind);
					break 'levels;
				}
				for mv in self.engine.successors_df(state) {
					let next = self.engine.apply(state, &mv);
					if visited.insert(next.clone()) {
						next_frontier.push(next);
					}
				}
			}
			if next_frontier.is_empty() {
				break;
			}
			depth += 1;
			levels.push(next_frontier.iter().map(|s| DiscoveredState { state: s.clone(), depth }).collect());
			frontier = next_frontier;
		}

		ExpansionResult { levels, budget_exhausted }
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::handlers::HandlerRegistry;
	use crate::model::{AllowedTransition, Configuration, ConfigurationSpec, Container, ElementId, Metadata, TransitionEngineOptions};
	use crate::handlers::HandlerTag;
	use crate::codec::RankingCodec;

	fn two_peg_config() -> Configuration {
		let a = Container {
			id: "a".into(),
			capacity: 2,
			handler: HandlerTag("stack".into()),
			transitions: vec![AllowedTransition {
				target: "b".into(),
				from_position: HandlerTag("stack".into()),
				to_position: HandlerTag("stack".into()),
				move_type: None,
				cost: None,
				metadata: None,
			}],
			initial_fill: vec![ElementId(0), ElementId(1)],
		};
		let b = Container {
			id: "b".into(),
			capacity: 2,
			handler: HandlerTag("stack".into()),
			transitions: vec![AllowedTransition {
				target: "a".into(),
				from_position: HandlerTag("stack".into()),
				to_position: HandlerTag("stack".into()),
				move_type: None,
				cost: None,
				metadata: None,
			}],
			initial_fill: vec![],
		};
		let spec = ConfigurationSpec { bank: vec!["small".into(), "large".into()], containers: vec![a, b], metadata: Metadata::default() };
		Configuration::build(spec).unwrap()
	}

	#[test]
	fn reachability_visits_every_state_when_unbounded() {
		let config = two_peg_config();
		let codec = RankingCodec::new(&config);
		let engine = TransitionEngine::new(&config, &codec, HandlerRegistry::default(), TransitionEngineOptions::default()).unwrap();
		let searcher = Searcher::new(&engine);
		let origin = config.initial_permutation();
		let result = searcher.reachability(&origin, Limits::default());
		assert!(result.budget_exhausted.is_none());
		assert!(result.visited.len() >= 2);
	}

	#[test]
	fn reachability_with_zero_visit_limit_only_has_origin() {
		let config = two_peg_config();
		let codec = RankingCodec::new(&config);
		let engine = TransitionEngine::new(&config, &codec, HandlerRegistry::default(), TransitionEngineOptions::default()).unwrap();
		let searcher = Searcher::new(&engine);
		let origin = config.initial_permutation();
		let result = searcher.reachability(&origin, Limits { visit_limit: Some(0), ..Limits::default() });
		assert_eq!(result.visited.len(), 1);
		assert_eq!(result.budget_exhausted, Some(BudgetKind::Visits));
	}

	#[test]
	fn path_search_finds_shortest_route() {
		let config = two_peg_config();
		let codec = RankingCodec::new(&config);
		let engine = TransitionEngine::new(&config, &codec, HandlerRegistry::default(), TransitionEngineOptions::default()).unwrap();
		let searcher = Searcher::new(&engine);
		let origin = config.initial_permutation();
		let goal = origin.clone();
		let result = searcher.path_search(&origin, |p| p != &goal && p.slots.iter().filter(|s| !s.is_empty()).count() == 2 && p.slots[0].is_empty() && p.slots[1].is_empty(), Limits::default());
		let path = result.path.expect("goal reachable");
		assert!(path.len() >= 2);
		assert_eq!(path.last().unwrap().mv, None);
	}

	#[test]
	fn path_search_returns_single_step_when_origin_is_goal() {
		let config = two_peg_config();
		let codec = RankingCodec::new(&config);
		let engine = TransitionEngine::new(&config, &codec, HandlerRegistry::default(), TransitionEngineOptions::default()).unwrap();
		let searcher = Searcher::new(&engine);
		let origin = config.initial_permutation();
		let result = searcher.path_search(&origin, |_| true, Limits::default());
		let path = result.path.unwrap();
		assert_eq!(path.len(), 1);
	}

	#[test]
	fn detect_cycles_finds_back_and_forth_moves() {
		let config = two_peg_config();
		let codec = RankingCodec::new(&config);
		let engine = TransitionEngine::new(&config, &codec, HandlerRegistry::default(), TransitionEngineOptions::default()).unwrap();
		let searcher = Searcher::new(&engine);
		let origin = config.initial_permutation();
		let result = searcher.detect_cycles(&origin, Limits { step_limit: Some(6), ..Limits::default() });
		assert!(!result.cycles.is_empty());
	}

	#[test]
	fn expand_tracks_depth_per_level() {
		let config = two_peg_config();
		let codec = RankingCodec::new(&config);
		let engine = TransitionEngine::new(&config, &codec, HandlerRegistry::default(), TransitionEngineOptions::default()).unwrap();
		let searcher = Searcher::new(&engine);
		let origin = config.initial_permutation();
		let result = searcher.expand(&origin, Limits { step_limit: Some(2), ..Limits::default() });
		assert!(result.levels.len() >= 2);
		assert_eq!(result.levels[0][0].depth, 0);
	}
}
