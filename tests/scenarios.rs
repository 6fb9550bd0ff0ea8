//! End-to-end scenarios exercising the codec, transition engine, and bounded
//! search together against hand-built configurations.

use std::time::Duration;

use num_bigint::BigUint;

use statespace::{
	ordered_stack_insert, stack_extract, AllowedTransition, Configuration, ConfigurationSpec, Container, ContainerId,
	ElementId, HandlerRegistry, HandlerTag, Limits, Metadata, Permutation, PositionHandler, RankingCodec, Searcher,
	Slot, TransitionEngine, TransitionEngineOptions, BudgetKind,
};

fn peg(id: &str, targets: &[&str], handler: &str) -> Container {
	Container {
		id: id.to_string(),
		capacity: 3,
		handler: HandlerTag(handler.to_string()),
		transitions: targets
			.iter()
			.map(|t| AllowedTransition {
				target: t.to_string(),
				from_position: HandlerTag(handler.to_string()),
				to_position: HandlerTag(handler.to_string()),
				move_type: None,
				cost: None,
				metadata: None,
			})
			.collect(),
		initial_fill: Vec::new(),
	}
}

#[test]
fn hanoi_1_disk_optimal_path() {
	let mut a = peg("a", &["b", "c"], "top");
	a.initial_fill = vec![ElementId(0)];
	let b = peg("b", &["a", "c"], "top");
	let c = peg("c", &["a", "b"], "top");
	let spec = ConfigurationSpec { bank: vec!["disk".into()], containers: vec![a, b, c], metadata: Metadata::default() };
	let config = Configuration::build(spec).unwrap();
	let codec = RankingCodec::new(&config);
	let engine = TransitionEngine::new(&config, &codec, HandlerRegistry::default(), TransitionEngineOptions::default()).unwrap();
	let searcher = Searcher::new(&engine);

	let origin = config.initial_permutation();
	let c_first_slot = config.container_offset(ContainerId(2));
	let result = searcher.path_search(&origin, |p| p.slots[c_first_slot] == Slot::Element(ElementId(0)), Limits::default());

	let path = result.path.expect("disk can reach peg c in one move");
	assert_eq!(path.len(), 2);
	let mv = path[0].mv.as_ref().expect("a single move connects origin to the goal");
	assert_eq!(mv.from, ContainerId(0));
	assert_eq!(mv.to, ContainerId(2));
	assert!(path[1].mv.is_none());
}

#[test]
fn hanoi_3_disk_reachable_set() {
	let ordered = HandlerTag("ordered".into());
	let mut registry = HandlerRegistry::default();
	registry.register(ordered.clone(), PositionHandler { extract: stack_extract, insert: ordered_stack_insert });

	let mut a = peg("a", &["b", "c"], "ordered");
	// bottom to top: largest disk first, smallest on top, per "no larger on smaller".
	a.initial_fill = vec![ElementId(2), ElementId(1), ElementId(0)];
	let b = peg("b", &["a", "c"], "ordered");
	let c = peg("c", &["a", "b"], "ordered");
	let spec = ConfigurationSpec { bank: vec!["1".into(), "2".into(), "3".into()], containers: vec![a, b, c], metadata: Metadata::default() };
	let config = Configuration::build(spec).unwrap();
	let codec = RankingCodec::new(&config);
	let engine = TransitionEngine::new(&config, &codec, registry, TransitionEngineOptions::default()).unwrap();
	let searcher = Searcher::new(&engine);

	let origin = config.initial_permutation();
	let result = searcher.reachability(&origin, Limits::default());
	assert!(result.budget_exhausted.is_none());
	assert_eq!(result.visited.len(), 27);
}

#[test]
fn card_game_draw() {
	let deck = Container {
		id: "deck".into(),
		capacity: 5,
		handler: HandlerTag("top".into()),
		transitions: vec![AllowedTransition {
			target: "hand".into(),
			from_position: HandlerTag("top".into()),
			to_position: HandlerTag("middle".into()),
			move_type: Some("DRAW".into()),
			cost: None,
			metadata: None,
		}],
		initial_fill: vec![ElementId(0), ElementId(1), ElementId(2), ElementId(3), ElementId(4)],
	};
	let hand = Container { id: "hand".into(), capacity: 3, handler: HandlerTag("middle".into()), transitions: vec![], initial_fill: vec![] };
	let discard = Container { id: "discard".into(), capacity: 5, handler: HandlerTag("stack".into()), transitions: vec![], initial_fill: vec![] };
	let spec = ConfigurationSpec {
		bank: vec!["ace".into(), "king".into(), "queen".into(), "jack".into(), "ten".into()],
		containers: vec![deck, hand, discard],
		metadata: Metadata::default(),
	};
	let config = Configuration::build(spec).unwrap();
	let codec = RankingCodec::new(&config);
	let engine = TransitionEngine::new(&config, &codec, HandlerRegistry::default(), TransitionEngineOptions::default()).unwrap();

	let origin = config.initial_permutation();
	let moves = engine.successors_bf(&origin);
	assert_eq!(moves.len(), 3);
	assert!(moves.iter().all(|m| m.element == ElementId(0) && m.move_type.as_deref() == Some("DRAW")));
	let mut indices: Vec<BigUint> = moves.iter().map(|m| m.successor_index.clone()).collect();
	indices.sort();
	indices.dedup();
	assert_eq!(indices.len(), 3);
}

#[test]
fn cycle_detection_trivially_positive() {
	let mut a = peg("a", &["b"], "top");
	a.capacity = 1;
	a.initial_fill = vec![ElementId(0)];
	let mut b = peg("b", &["a"], "top");
	b.capacity = 1;
	let spec = ConfigurationSpec { bank: vec!["x".into()], containers: vec![a, b], metadata: Metadata::default() };
	let config = Configuration::build(spec).unwrap();
	let codec = RankingCodec::new(&config);
	let engine = TransitionEngine::new(&config, &codec, HandlerRegistry::default(), TransitionEngineOptions::default()).unwrap();
	let searcher = Searcher::new(&engine);

	let origin = config.initial_permutation();
	let result = searcher.detect_cycles(&origin, Limits { step_limit: Some(4), ..Limits::default() });
	assert!(result.cycles.iter().any(|c| c.moves.len() == 2));
}

#[test]
fn budget_exhaustion_on_vanishing_time_limit() {
	let mut a = peg("a", &["b"], "top");
	a.capacity = 1;
	a.initial_fill = vec![ElementId(0)];
	let mut b = peg("b", &["a"], "top");
	b.capacity = 1;
	let spec = ConfigurationSpec { bank: vec!["x".into()], containers: vec![a, b], metadata: Metadata::default() };
	let config = Configuration::build(spec).unwrap();
	let codec = RankingCodec::new(&config);
	let engine = TransitionEngine::new(&config, &codec, HandlerRegistry::default(), TransitionEngineOptions::default()).unwrap();
	let searcher = Searcher::new(&engine);

	let origin = config.initial_permutation();
	let result = searcher.reachability(&origin, Limits { time_limit: Some(Duration::from_nanos(1)), ..Limits::default() });
	assert_eq!(result.budget_exhausted, Some(BudgetKind::Time));
	assert_eq!(result.visited, std::iter::once(origin).collect::<std::collections::HashSet<_>>());
}

#[test]
fn bijection_on_small_configuration() {
	// 5 slots, 3 distinct elements, 2 empties: 5!/2! = 60.
	let container = Container { id: "only".into(), capacity: 5, handler: HandlerTag("any".into()), transitions: vec![], initial_fill: vec![] };
	let spec = ConfigurationSpec { bank: vec!["a".into(), "b".into(), "c".into()], containers: vec![container], metadata: Metadata::default() };
	let config = Configuration::build(spec).unwrap();
	let codec = RankingCodec::new(&config);
	assert_eq!(codec.space_size(), BigUint::from(60u32));

	let mut seen = std::collections::HashSet::new();
	let mut i = BigUint::from(0u32);
	while i < codec.space_size() {
		let perm: Permutation = codec.decode(&i).unwrap();
		assert_eq!(codec.encode(&perm).unwrap(), i);
		seen.insert(i.clone());
		i += BigUint::from(1u32);
	}
	assert_eq!(seen, (0u32..60).map(BigUint::from).collect::<std::collections::HashSet<_>>());
}
