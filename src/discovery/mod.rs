//! Formula discovery: grow a problem's set of active variables by repeatedly enumerating
//! candidates, grouping them by behavior and spending an evaluation budget on the groups with a
//! multi-armed bandit.
//!
//! A [`NodeSearchProblem`] says how candidates are scored and fingerprinted.
//! [`SupervisedSearchProblem`] scores them against labels or targets through the
//! [`objective`](../objective/index.html) module. [`FormulaDiscovery`] drives the loop.
//!
//! [`NodeSearchProblem`]: trait.NodeSearchProblem.html
//! [`SupervisedSearchProblem`]: struct.SupervisedSearchProblem.html
//! [`FormulaDiscovery`]: struct.FormulaDiscovery.html

mod bandit;
mod equivalence;

pub use self::bandit::{BanditObjective, BanditParams, BanditPool};
pub use self::equivalence::{representative_order, BinaryKey, EquivalenceClass, EquivalenceClasses};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::cache::SampleCache;
use crate::expression::{NodeId, Universe};
use crate::objective::{
    BinaryClassificationObjective, InformationGainObjective, LearningObjective, RegressionObjective,
};
use crate::problem::{Problem, ProblemError};

/// A search over nodes of a [`Problem`], with a way to score and fingerprint candidates.
///
/// [`Problem`]: ../struct.Problem.html
pub trait NodeSearchProblem: Sync {
    fn problem(&self) -> &Problem;
    fn problem_mut(&mut self) -> &mut Problem;
    /// The number of instances candidates are scored on, or `0` for infinitely many.
    fn num_instances(&self) -> usize;
    /// The worst and the best values of `compute_objective`.
    fn objective_range(&self) -> (f64, f64);
    fn compute_objective(&self, node: NodeId, instance: usize) -> f64;
    /// Nodes with equal keys are considered equivalent. `None` marks a node as invalid.
    fn make_binary_key(&self, node: NodeId) -> Option<BinaryKey>;
}

/// What candidates of a [`SupervisedSearchProblem`] must predict, indexed by example.
///
/// [`SupervisedSearchProblem`]: struct.SupervisedSearchProblem.html
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Supervision {
    /// Scored by [`BinaryClassificationObjective`](../objective/struct.BinaryClassificationObjective.html).
    Binary(Vec<bool>),
    /// Scored by normalized information gain.
    Multiclass { labels: Vec<usize>, num_labels: usize },
    /// Scored by negative within-branch variance.
    Regression(Vec<f64>),
}
impl Supervision {
    fn len(&self) -> usize {
        match *self {
            Supervision::Binary(ref labels) => labels.len(),
            Supervision::Multiclass { ref labels, .. } => labels.len(),
            Supervision::Regression(ref targets) => targets.len(),
        }
    }
}

/// Scores candidates by the learning objective of their eventual stump, on one fold of the
/// examples per instance.
///
/// Example `e` belongs to fold `e % num_folds`. Binary keys are computed on every example.
pub struct SupervisedSearchProblem {
    problem: Problem,
    cache: SampleCache,
    supervision: Supervision,
    folds: Vec<Vec<usize>>,
    all_examples: Vec<usize>,
    range: (f64, f64),
}
impl SupervisedSearchProblem {
    pub fn new(
        problem: Problem,
        cache: SampleCache,
        supervision: Supervision,
        num_folds: usize,
    ) -> Result<Self, ProblemError> {
        if !Arc::ptr_eq(problem.universe(), cache.universe()) {
            return Err(ProblemError::UniverseMismatch);
        }
        let num_examples = cache.num_examples();
        if supervision.len() != num_examples {
            return Err(ProblemError::SupervisionLength {
                expected: num_examples,
                found: supervision.len(),
            });
        }
        if let Supervision::Multiclass {
            ref labels,
            num_labels,
        } = supervision
        {
            let invalid = labels.iter().enumerate().find(|&(_, &l)| l >= num_labels);
            if let Some((example, &label)) = invalid {
                return Err(ProblemError::InvalidLabel { example, label });
            }
        }
        let num_folds = num_folds.min(num_examples).max(1);
        let mut folds = vec![Vec::new(); num_folds];
        for example in 0..num_examples {
            folds[example % num_folds].push(example);
        }
        let range = match supervision {
            Supervision::Binary(_) | Supervision::Multiclass { .. } => (0.0, 1.0),
            Supervision::Regression(ref targets) => (-variance(targets), 0.0),
        };
        Ok(SupervisedSearchProblem {
            problem,
            cache,
            supervision,
            folds,
            all_examples: (0..num_examples).collect(),
            range,
        })
    }
    pub fn cache(&self) -> &SampleCache {
        &self.cache
    }
    pub fn supervision(&self) -> &Supervision {
        &self.supervision
    }
    pub fn folds(&self) -> &[Vec<usize>] {
        &self.folds
    }
    /// A fresh objective over `examples`.
    pub fn make_objective(&self, examples: Vec<usize>) -> Box<dyn LearningObjective> {
        match self.supervision {
            Supervision::Binary(ref labels) => {
                Box::new(BinaryClassificationObjective::new(labels.clone(), examples))
            }
            Supervision::Multiclass {
                ref labels,
                num_labels,
            } => Box::new(InformationGainObjective::new(
                labels.clone(),
                num_labels,
                examples,
                true,
            )),
            Supervision::Regression(ref targets) => {
                Box::new(RegressionObjective::new(targets.clone(), examples))
            }
        }
    }
}
impl NodeSearchProblem for SupervisedSearchProblem {
    fn problem(&self) -> &Problem {
        &self.problem
    }
    fn problem_mut(&mut self) -> &mut Problem {
        &mut self.problem
    }
    fn num_instances(&self) -> usize {
        self.folds.len()
    }
    fn objective_range(&self) -> (f64, f64) {
        self.range
    }
    /// Nodes that can be neither thresholded nor evaluated score worst.
    fn compute_objective(&self, node: NodeId, instance: usize) -> f64 {
        let examples = self.folds[instance % self.folds.len()].clone();
        let mut objective = self.make_objective(examples);
        objective
            .compute_objective_with_eventual_stump(&self.cache, node)
            .map_or(self.range.0, |weak| weak.score)
    }
    /// Nodes that use no input are constant features and get no key.
    fn make_binary_key(&self, node: NodeId) -> Option<BinaryKey> {
        if !self.problem.universe().node(node).uses_inputs() {
            return None;
        }
        let samples = self.cache.samples(node, &self.all_examples)?;
        BinaryKey::from_samples(&samples)
    }
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}

/// Parameters for [`FormulaDiscovery`].
///
/// [`FormulaDiscovery`]: struct.FormulaDiscovery.html
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryParams {
    /// Complexity of the exhaustive enumeration, counting the final yield.
    ///
    /// Default: `5`
    pub complexity: usize,
    /// Default: `100`
    pub iterations: usize,
    /// Bandit steps played per iteration, after new arms were played once.
    ///
    /// Default: `100`
    pub steps_per_iteration: usize,
    /// How many of the best arms lend their reward to the importance of their elements.
    ///
    /// Default: `10`
    pub num_important_arms: usize,
    /// Default: [`BanditParams::default()`], an exploration coefficient of `5.0` without
    /// multithreading.
    ///
    /// [`BanditParams::default()`]: struct.BanditParams.html
    pub bandit: BanditParams,
}
impl Default for DiscoveryParams {
    fn default() -> Self {
        DiscoveryParams {
            complexity: 5,
            iterations: 100,
            steps_per_iteration: 100,
            num_important_arms: 10,
            bandit: BanditParams::default(),
        }
    }
}

/// What one iteration of [`FormulaDiscovery`] found.
///
/// [`FormulaDiscovery`]: struct.FormulaDiscovery.html
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryReport {
    pub iteration: usize,
    pub num_candidates: usize,
    pub num_classes: usize,
    pub num_invalids: usize,
    /// Objective evaluations spent during this iteration.
    pub num_evaluations: usize,
    /// The representative of the best arm.
    pub best: Option<NodeId>,
    pub best_objective: Option<f64>,
    pub best_formula: Option<String>,
    pub new_active_variable: Option<NodeId>,
}

/// Why [`FormulaDiscovery::run`] stopped.
///
/// [`FormulaDiscovery::run`]: struct.FormulaDiscovery.html#method.run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStop {
    NoCandidates,
    NoClasses,
    NoNewActiveVariable,
    IterationLimit,
}
impl fmt::Display for DiscoveryStop {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            DiscoveryStop::NoCandidates => write!(f, "no candidates"),
            DiscoveryStop::NoClasses => write!(f, "no valid equivalence class"),
            DiscoveryStop::NoNewActiveVariable => write!(f, "no new active variable"),
            DiscoveryStop::IterationLimit => write!(f, "iteration limit reached"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryOutcome {
    pub reports: Vec<DiscoveryReport>,
    pub stop: DiscoveryStop,
}

/// Plays the arms of a pool by scoring their representative.
struct ArmObjective<'a, P: ?Sized>(&'a P);
impl<'a, P: NodeSearchProblem + ?Sized> BanditObjective<NodeId> for ArmObjective<'a, P> {
    fn num_instances(&self) -> usize {
        self.0.num_instances()
    }
    fn objective_range(&self) -> (f64, f64) {
        self.0.objective_range()
    }
    fn compute_objective(&self, node: &NodeId, instance: usize) -> f64 {
        self.0.compute_objective(*node, instance)
    }
}

/// The formula discovery loop.
///
/// Each iteration enumerates every candidate up to the configured complexity, files them into
/// equivalence classes by binary key, plays the bandit arms of the classes, and promotes the
/// most important node that is not yet a leaf to an active variable, so that the next iteration
/// reaches larger formulas. Importance is the mean reward of the best arms, credited to the
/// smallest elements of their class and, recursively, to their sub-nodes.
///
/// Classes and arm statistics persist across iterations.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use luape::discovery::{DiscoveryParams, DiscoveryStop, FormulaDiscovery, Supervision,
///                        SupervisedSearchProblem};
/// use luape::{Problem, SampleCache, Type, Universe, Value};
///
/// let mut universe = Universe::new();
/// let ops = universe.register_standard_operators();
/// let universe = Arc::new(universe);
/// let mut problem = Problem::new(universe.clone());
/// problem.add_input("x", Type::Double);
/// problem.add_function(ops.mul).unwrap();
///
/// let xs = [-2.0, -1.0, 0.5, 1.0, 3.0];
/// let column = xs.iter().map(|&x| Some(Value::Double(x))).collect();
/// let cache = SampleCache::new(universe.clone(), vec![column]).unwrap();
/// // |x| > 1.5 is only a threshold away from x * x
/// let labels = xs.iter().map(|x: &f64| x.abs() > 1.5).collect();
/// let search = SupervisedSearchProblem::new(problem, cache, Supervision::Binary(labels), 1)
///     .unwrap();
///
/// let params = DiscoveryParams { complexity: 4, iterations: 1, ..DiscoveryParams::default() };
/// let mut discovery = FormulaDiscovery::new(search, params);
/// let outcome = discovery.run();
/// assert_eq!(outcome.stop, DiscoveryStop::IterationLimit);
/// assert_eq!(outcome.reports[0].best_formula.as_deref(), Some("x * x"));
/// assert_eq!(outcome.reports[0].best_objective, Some(1.0));
/// ```
pub struct FormulaDiscovery<P> {
    params: DiscoveryParams,
    search: P,
    classes: EquivalenceClasses,
    pool: BanditPool<NodeId>,
}
impl<P: NodeSearchProblem> FormulaDiscovery<P> {
    pub fn new(search: P, params: DiscoveryParams) -> Self {
        let pool = BanditPool::new(params.bandit.clone());
        FormulaDiscovery {
            params,
            search,
            classes: EquivalenceClasses::new(),
            pool,
        }
    }
    pub fn params(&self) -> &DiscoveryParams {
        &self.params
    }
    pub fn search(&self) -> &P {
        &self.search
    }
    pub fn classes(&self) -> &EquivalenceClasses {
        &self.classes
    }
    pub fn pool(&self) -> &BanditPool<NodeId> {
        &self.pool
    }
    pub fn into_search(self) -> P {
        self.search
    }

    /// Iterate until a stop condition or the iteration limit.
    pub fn run(&mut self) -> DiscoveryOutcome {
        let mut reports = Vec::new();
        for iteration in 0..self.params.iterations {
            match self.iterate(iteration) {
                Ok(report) => {
                    let finished = report.new_active_variable.is_none();
                    reports.push(report);
                    if finished {
                        return self.finish(reports, DiscoveryStop::NoNewActiveVariable);
                    }
                }
                Err(stop) => return self.finish(reports, stop),
            }
        }
        self.finish(reports, DiscoveryStop::IterationLimit)
    }

    fn finish(&self, reports: Vec<DiscoveryReport>, stop: DiscoveryStop) -> DiscoveryOutcome {
        info!("formula discovery stopped after {} iterations: {}", reports.len(), stop);
        DiscoveryOutcome { reports, stop }
    }

    /// One iteration. Fails when there is nothing to play.
    pub fn iterate(&mut self, iteration: usize) -> Result<DiscoveryReport, DiscoveryStop> {
        let universe = self.search.problem().universe().clone();
        let candidates = self
            .search
            .problem()
            .enumerate_nodes_exhaustively(self.params.complexity);
        if candidates.is_empty() {
            return Err(DiscoveryStop::NoCandidates);
        }

        let num_arms = self.pool.num_arms();
        for &node in &candidates {
            let key = self.search.make_binary_key(node);
            self.classes.add(&universe, node, key, &mut self.pool);
        }
        self.classes.log_summary();
        if self.classes.is_empty() {
            return Err(DiscoveryStop::NoClasses);
        }

        let num_new_arms = self.pool.num_arms() - num_arms;
        let num_evaluations = self.pool.play_iterations(
            &ArmObjective(&self.search),
            self.params.steps_per_iteration,
            num_new_arms,
        );

        let best = self.pool.best_arm();
        let best_node = best.map(|arm| *self.pool.parameter(arm));
        let best_objective = best.and_then(|arm| self.pool.arm_mean_objective(arm));
        let best_formula = best_node.map(|node| universe.display(node));
        if let (Some(formula), Some(objective)) = (&best_formula, best_objective) {
            info!("iteration {}: best formula {} ({})", iteration, formula, objective);
        }

        let new_active_variable = self.most_important_new_node(&universe);
        if let Some(node) = new_active_variable {
            debug!("new active variable: {}", universe.display(node));
            // the node comes from this universe, so it cannot be unknown
            let _ = self.search.problem_mut().add_active_variable(node);
        }

        Ok(DiscoveryReport {
            iteration,
            num_candidates: candidates.len(),
            num_classes: self.classes.len(),
            num_invalids: self.classes.invalids().len(),
            num_evaluations,
            best: best_node,
            best_objective,
            best_formula,
            new_active_variable,
        })
    }

    fn importances(&self, universe: &Universe) -> HashMap<NodeId, f64> {
        let mut importances = HashMap::new();
        let best_arms = self.pool.arms_order();
        for &arm in best_arms.iter().take(self.params.num_important_arms) {
            let reward = self.pool.arm_mean_reward(arm).unwrap_or(0.0);
            let class = match self.classes.by_arm(arm) {
                Some(class) => class,
                None => continue,
            };
            let size = match class.representative() {
                Some(node) => universe.node(node).tree_size(),
                None => continue,
            };
            for &element in class.elements() {
                if universe.node(element).tree_size() == size {
                    add_importance(universe, element, reward, &mut importances);
                }
            }
        }
        importances
    }

    /// The most important application node that is not active yet, ties broken by handle.
    fn most_important_new_node(&self, universe: &Universe) -> Option<NodeId> {
        let active = self.search.problem().active_variables();
        self.importances(universe)
            .into_iter()
            .filter(|&(node, _)| !universe.node(node).is_leaf() && !active.contains(&node))
            .max_by(|a, b| a.1.total_cmp(&b.1).then(b.0.cmp(&a.0)))
            .map(|(node, _)| node)
    }
}

fn add_importance(
    universe: &Universe,
    node: NodeId,
    importance: f64,
    importances: &mut HashMap<NodeId, f64>,
) {
    *importances.entry(node).or_insert(0.0) += importance;
    for &arg in universe.node(node).args() {
        add_importance(universe, arg, importance, importances);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::NodeKind;
    use crate::types::{Type, Value};
    use test_log::test;

    fn doubles(xs: &[f64]) -> Vec<Option<Value>> {
        xs.iter().map(|&x| Some(Value::Double(x))).collect()
    }

    /// x in 0..6, with `x > 2` as labels, two folds. With functions, the constant 1.0 and
    /// addition are available and `x + x` is returned.
    fn threshold_search(with_functions: bool) -> (SupervisedSearchProblem, NodeId, Option<NodeId>) {
        let mut universe = Universe::new();
        let ops = universe.register_standard_operators();
        let universe = Arc::new(universe);
        let mut problem = Problem::new(universe.clone());
        let x = problem.add_input("x", Type::Double);
        let mut x_plus_x = None;
        if with_functions {
            problem.add_constant(Value::Double(1.0), Type::Double);
            problem.add_function(ops.add).unwrap();
            let add = universe.make_function(ops.add, vec![]);
            x_plus_x = Some(universe.make_apply(add, vec![x, x]));
        }
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let cache = SampleCache::new(universe, vec![doubles(&xs)]).unwrap();
        let labels = xs.iter().map(|&x| x > 2.0).collect();
        let search =
            SupervisedSearchProblem::new(problem, cache, Supervision::Binary(labels), 2).unwrap();
        (search, x, x_plus_x)
    }

    #[test]
    fn folds_and_ranges() {
        let (search, x, _) = threshold_search(false);
        assert_eq!(search.folds(), &[vec![0, 2, 4], vec![1, 3, 5]]);
        assert_eq!(search.num_instances(), 2);
        assert_eq!(search.objective_range(), (0.0, 1.0));
        assert_eq!(search.compute_objective(x, 0), 1.0);
        assert_eq!(search.compute_objective(x, 1), 1.0);
        assert!(search.make_binary_key(x).is_some());
    }

    #[test]
    fn regression_range_is_the_target_variance() {
        let universe = Arc::new(Universe::new());
        let mut problem = Problem::new(universe.clone());
        let x = problem.add_input("x", Type::Double);
        let cache =
            SampleCache::new(universe.clone(), vec![doubles(&[1.0, 2.0, 3.0, 4.0])]).unwrap();
        let targets = Supervision::Regression(vec![0.0, 0.0, 2.0, 2.0]);
        let search = SupervisedSearchProblem::new(problem, cache, targets, 1).unwrap();
        assert_eq!(search.objective_range(), (-1.0, 0.0));
        assert_eq!(search.compute_objective(x, 0), 0.0);
    }

    #[test]
    fn supervision_is_checked() {
        let universe = Arc::new(Universe::new());
        let cache = || SampleCache::new(universe.clone(), vec![doubles(&[1.0, 2.0])]).unwrap();
        let short = SupervisedSearchProblem::new(
            Problem::new(universe.clone()),
            cache(),
            Supervision::Binary(vec![true]),
            1,
        );
        assert_eq!(
            short.err(),
            Some(ProblemError::SupervisionLength {
                expected: 2,
                found: 1
            })
        );
        let labels = Supervision::Multiclass {
            labels: vec![0, 3],
            num_labels: 3,
        };
        let bad_label = SupervisedSearchProblem::new(Problem::new(universe.clone()), cache(), labels, 1);
        assert_eq!(
            bad_label.err(),
            Some(ProblemError::InvalidLabel {
                example: 1,
                label: 3
            })
        );
        let elsewhere = Problem::new(Arc::new(Universe::new()));
        let mismatch =
            SupervisedSearchProblem::new(elsewhere, cache(), Supervision::Binary(vec![true; 2]), 1);
        assert_eq!(mismatch.err(), Some(ProblemError::UniverseMismatch));
    }

    #[test]
    fn single_leaf_has_nothing_to_promote() {
        let (search, x, _) = threshold_search(false);
        let params = DiscoveryParams {
            complexity: 2,
            ..DiscoveryParams::default()
        };
        let mut discovery = FormulaDiscovery::new(search, params);
        let outcome = discovery.run();
        assert_eq!(outcome.stop, DiscoveryStop::NoNewActiveVariable);
        assert_eq!(outcome.reports.len(), 1);
        let report = &outcome.reports[0];
        assert_eq!(report.num_candidates, 1);
        assert_eq!(report.num_classes, 1);
        assert_eq!(report.best, Some(x));
        assert_eq!(report.best_objective, Some(1.0));
        assert_eq!(report.new_active_variable, None);
    }

    #[test]
    fn promotes_the_first_perfect_application() {
        let (search, x, x_plus_x) = threshold_search(true);
        let params = DiscoveryParams {
            complexity: 4,
            iterations: 1,
            ..DiscoveryParams::default()
        };
        let mut discovery = FormulaDiscovery::new(search, params);
        let outcome = discovery.run();
        assert_eq!(outcome.stop, DiscoveryStop::IterationLimit);
        let report = &outcome.reports[0];
        // x, x + x and x + 1.0 behave differently; 1.0 and 1.0 + 1.0 use no input
        assert_eq!(report.num_candidates, 5);
        assert_eq!(report.num_classes, 3);
        assert_eq!(report.num_invalids, 2);
        assert_eq!(discovery.pool().num_arms(), 3);
        assert_eq!(report.best, x_plus_x);
        assert_eq!(report.best_objective, Some(1.0));
        assert_eq!(report.new_active_variable, x_plus_x);
        assert_eq!(
            discovery.search().problem().active_variables(),
            &[x_plus_x.unwrap()]
        );
        assert!(discovery
            .classes()
            .iter()
            .any(|c| c.representative() == Some(x)));
    }

    #[test]
    fn constants_are_invalid() {
        let (search, x, x_plus_x) = threshold_search(true);
        let universe = search.problem().universe().clone();
        let one = universe.make_constant(Value::Double(1.0), Type::Double);
        let add = universe.node(x_plus_x.unwrap()).kind().clone();
        let two = match add {
            NodeKind::Apply { function, .. } => universe.make_apply(function, vec![one, one]),
            _ => unreachable!(),
        };
        assert_eq!(search.make_binary_key(one), None);
        assert_eq!(search.make_binary_key(two), None);
        assert!(search.make_binary_key(x).is_some());

        let params = DiscoveryParams {
            complexity: 4,
            iterations: 1,
            ..DiscoveryParams::default()
        };
        let mut discovery = FormulaDiscovery::new(search, params);
        discovery.run();
        let invalids = discovery.classes().invalids();
        assert!(invalids.contains(one));
        assert!(invalids.contains(two));
        assert_eq!(invalids.arm(), None);
        assert!(discovery
            .classes()
            .iter()
            .all(|c| !c.contains(one) && !c.contains(two)));
    }

    #[test]
    fn invalid_and_empty_searches_stop() {
        let universe = Arc::new(Universe::new());
        let empty = SupervisedSearchProblem::new(
            Problem::new(universe.clone()),
            SampleCache::new(universe.clone(), vec![]).unwrap(),
            Supervision::Binary(vec![]),
            1,
        )
        .unwrap();
        let outcome = FormulaDiscovery::new(empty, DiscoveryParams::default()).run();
        assert_eq!(outcome.stop, DiscoveryStop::NoCandidates);
        assert!(outcome.reports.is_empty());

        let mut problem = Problem::new(universe.clone());
        problem.add_input("x", Type::Double);
        let column = vec![Some(Value::Double(1.0)), None];
        let cache = SampleCache::new(universe.clone(), vec![column]).unwrap();
        let missing =
            SupervisedSearchProblem::new(problem, cache, Supervision::Binary(vec![true, false]), 1)
                .unwrap();
        let mut discovery = FormulaDiscovery::new(missing, DiscoveryParams::default());
        assert_eq!(discovery.run().stop, DiscoveryStop::NoClasses);
        assert_eq!(discovery.classes().invalids().len(), 1);
    }
}
