use std::sync::Arc;

use luape::discovery::{
    BanditParams, DiscoveryParams, DiscoveryStop, FormulaDiscovery, NodeSearchProblem,
    Supervision, SupervisedSearchProblem,
};
use luape::{Problem, SampleCache, Type, Universe, Value};

fn column(values: &[f64]) -> Vec<Option<Value>> {
    values.iter().map(|&v| Some(Value::Double(v))).collect()
}

/// Labels are `x * y > 0`, which no other candidate of complexity 4 separates.
fn same_sign() -> SupervisedSearchProblem {
    let mut universe = Universe::new();
    let ops = universe.register_standard_operators();
    let universe = Arc::new(universe);
    let mut problem = Problem::new(universe.clone());
    problem.add_input("x", Type::Double);
    problem.add_input("y", Type::Double);
    problem.add_function(ops.add).unwrap();
    problem.add_function(ops.mul).unwrap();

    let xs = [1.0, -2.0, 3.0, -1.0, 2.0, -3.0, 0.5, -0.5];
    let ys = [2.0, 1.0, -1.0, -2.0, 3.0, 2.5, -1.0, 1.0];
    let labels = xs.iter().zip(&ys).map(|(x, y)| x * y > 0.0).collect();
    let cache = SampleCache::new(universe, vec![column(&xs), column(&ys)]).unwrap();
    SupervisedSearchProblem::new(problem, cache, Supervision::Binary(labels), 1).unwrap()
}

#[test]
fn discovers_the_product() {
    let params = DiscoveryParams {
        complexity: 4,
        iterations: 2,
        bandit: BanditParams {
            batch_size: 4,
            multithreading: true,
            ..BanditParams::default()
        },
        ..DiscoveryParams::default()
    };
    let mut discovery = FormulaDiscovery::new(same_sign(), params);
    let outcome = discovery.run();
    assert_eq!(outcome.stop, DiscoveryStop::IterationLimit);
    assert_eq!(outcome.reports.len(), 2);

    let first = &outcome.reports[0];
    // x, y, x + x, x + y, y + y, x * x, x * y, y * y
    assert_eq!(first.num_candidates, 8);
    assert_eq!(first.num_classes, 8);
    assert_eq!(first.best_formula.as_deref(), Some("x * y"));
    assert_eq!(first.best_objective, Some(1.0));
    assert!(first.new_active_variable.is_some());

    let second = &outcome.reports[1];
    assert!(second.num_candidates > first.num_candidates);
    assert!(second.num_classes >= first.num_classes);
    assert_eq!(second.best_objective, Some(1.0));

    let active = discovery.search().problem().active_variables();
    assert_eq!(active.len(), 2);
    assert_eq!(Some(active[0]), first.new_active_variable);
    assert_eq!(Some(active[1]), second.new_active_variable);
}

#[test]
fn equivalent_candidates_share_an_arm() {
    let mut universe = Universe::new();
    let ops = universe.register_standard_operators();
    let universe = Arc::new(universe);
    let mut problem = Problem::new(universe.clone());
    let x = problem.add_input("x", Type::Double);
    let one = problem.add_constant(Value::Double(1.0), Type::Double);
    problem.add_function(ops.mul).unwrap();
    let cache = SampleCache::new(universe.clone(), vec![column(&[1.0, 2.0, 3.0])]).unwrap();
    let search = SupervisedSearchProblem::new(
        problem,
        cache,
        Supervision::Regression(vec![1.0, 1.0, 4.0]),
        1,
    )
    .unwrap();
    let params = DiscoveryParams {
        complexity: 4,
        iterations: 1,
        ..DiscoveryParams::default()
    };
    let mut discovery = FormulaDiscovery::new(search, params);
    let report = discovery.iterate(0).unwrap();
    // x * x stands alone and x * 1.0 behaves like x; 1.0 and 1.0 * 1.0 use no input
    assert_eq!(report.num_candidates, 5);
    assert_eq!(report.num_classes, 2);
    assert_eq!(report.num_invalids, 2);
    assert_eq!(discovery.pool().num_arms(), 2);
    assert!(discovery.classes().invalids().contains(one));

    let mul = universe.make_function(ops.mul, vec![]);
    let times_one = universe.make_apply(mul, vec![x, one]);
    let class = discovery
        .classes()
        .iter()
        .find(|c| c.contains(times_one))
        .unwrap();
    assert_eq!(class.representative(), Some(x));
    assert_eq!(class.len(), 2);
    let arm = class.arm().unwrap();
    assert_eq!(discovery.pool().parameter(arm), &x);
    assert_eq!(
        discovery.pool().arm_mean_objective(arm),
        Some(discovery.search().compute_objective(x, 0))
    );
}

#[test]
fn evaluation_budget_is_shared_across_iterations() {
    let params = DiscoveryParams {
        complexity: 4,
        iterations: 5,
        bandit: BanditParams {
            max_evaluations: Some(3),
            ..BanditParams::default()
        },
        ..DiscoveryParams::default()
    };
    let mut discovery = FormulaDiscovery::new(same_sign(), params);
    discovery.run();
    assert_eq!(discovery.pool().num_evaluations(), 3);
}

#[test]
fn params_round_trip() {
    let params = DiscoveryParams {
        complexity: 6,
        iterations: 10,
        steps_per_iteration: 20,
        num_important_arms: 3,
        bandit: BanditParams {
            exploration_coefficient: 2.0,
            batch_size: 8,
            max_evaluations: Some(1000),
            max_cache_hits: None,
            multithreading: true,
        },
    };
    let json = serde_json::to_string(&params).unwrap();
    let back: DiscoveryParams = serde_json::from_str(&json).unwrap();
    assert_eq!(back, params);

    let defaults: DiscoveryParams = serde_json::from_str(
        &serde_json::to_string(&DiscoveryParams::default()).unwrap(),
    )
    .unwrap();
    assert_eq!(defaults.complexity, 5);
    assert_eq!(defaults.iterations, 100);
    assert_eq!(defaults.steps_per_iteration, 100);
    assert_eq!(defaults.bandit.exploration_coefficient, 5.0);
    assert!(!defaults.bandit.multithreading);
}
