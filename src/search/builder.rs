use crossbeam_channel::bounded;
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use super::{StateId, TypeSearchSpace, TypeState};
use crate::expression::{FunctionId, NodeId};
use crate::problem::Problem;

/// A single construction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Push(NodeId),
    Apply(FunctionId),
    Yield,
}

/// What is needed to undo one [`NodeBuilderState::perform_transition`].
///
/// [`NodeBuilderState::perform_transition`]: struct.NodeBuilderState.html#method.perform_transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    step: usize,
    state: Option<StateId>,
    stack: Vec<NodeId>,
    result: Option<NodeId>,
}

/// A partially built candidate: the node stack together with its position in the type search
/// space.
///
/// This is the state an outer sequential optimizer explores. Transitions can be undone, in
/// reverse order, with the [`Backup`] they return.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use luape::{Problem, Type, Universe};
/// use luape::search::{Action, NodeBuilderState};
///
/// let mut universe = Universe::new();
/// let ops = universe.register_standard_operators();
/// let mut problem = Problem::new(Arc::new(universe));
/// let x = problem.add_input("x", Type::Double);
/// problem.add_function(ops.mul).unwrap();
///
/// let mut state = NodeBuilderState::new(&problem, problem.search_space(4));
/// assert_eq!(state.available_actions(), vec![Action::Push(x)]);
/// state.perform_transition(Action::Push(x));
/// let backup = state.perform_transition(Action::Push(x));
/// state.undo_transition(backup);
/// assert_eq!(state.available_actions(), vec![Action::Push(x), Action::Yield]);
/// state.perform_transition(Action::Yield);
/// assert_eq!(state.result(), Some(x));
/// ```
///
/// [`Backup`]: struct.Backup.html
#[derive(Debug, Clone)]
pub struct NodeBuilderState<'a> {
    problem: &'a Problem,
    space: Arc<TypeSearchSpace>,
    leaves: Vec<NodeId>,
    stack: Vec<NodeId>,
    state: Option<StateId>,
    step: usize,
    result: Option<NodeId>,
}
impl<'a> NodeBuilderState<'a> {
    pub fn new(problem: &'a Problem, space: Arc<TypeSearchSpace>) -> Self {
        let state = space.initial_state_id();
        NodeBuilderState {
            problem,
            leaves: problem.leaves(),
            space,
            stack: Vec::new(),
            state,
            step: 0,
            result: None,
        }
    }
    pub fn stack(&self) -> &[NodeId] {
        &self.stack
    }
    pub fn step(&self) -> usize {
        self.step
    }
    pub fn state_id(&self) -> Option<StateId> {
        self.state
    }
    /// The current type state, `None` once final.
    pub fn type_state(&self) -> Option<&TypeState> {
        self.state.map(|id| self.space.get(id))
    }
    pub fn result(&self) -> Option<NodeId> {
        self.result
    }
    pub fn is_final(&self) -> bool {
        self.result.is_some() || self.state.is_none()
    }

    /// Whether `function` may be applied to the nodes on top of the stack.
    pub fn accepts_apply(&self, function: FunctionId) -> bool {
        let universe = self.problem.universe();
        let arity = universe.function_operator(function).arity();
        arity <= self.stack.len()
            && universe.accepts_arguments(function, &self.stack[self.stack.len() - arity..])
    }

    /// Every action allowed from here: pushes of leaves, then applications, then the yield.
    pub fn available_actions(&self) -> Vec<Action> {
        let state = match self.type_state() {
            Some(state) if self.result.is_none() => state,
            _ => return Vec::new(),
        };
        let universe = self.problem.universe();
        let mut actions = Vec::new();
        for &leaf in &self.leaves {
            if state.has_push_action(universe.node(leaf).tp()) {
                actions.push(Action::Push(leaf));
            }
        }
        for &(function, _) in state.apply_actions() {
            if self.accepts_apply(function) {
                actions.push(Action::Apply(function));
            }
        }
        if state.can_yield() {
            actions.push(Action::Yield);
        }
        actions
    }

    /// Perform an action. Panics if the action is not allowed by the type search space.
    pub fn perform_transition(&mut self, action: Action) -> Backup {
        let backup = Backup {
            step: self.step,
            state: self.state,
            stack: self.stack.clone(),
            result: self.result,
        };
        let current = match self.state {
            Some(id) if self.result.is_none() => self.space.get(id),
            _ => panic!("cannot perform {:?} from a final state", action),
        };
        let universe = self.problem.universe();
        let next = match action {
            Action::Push(node) => {
                let next = current.push_transition(universe.node(node).tp());
                self.stack.push(node);
                next
            }
            Action::Apply(function) => {
                let arity = universe.function_operator(function).arity();
                assert!(arity <= self.stack.len(), "stack underflow applying {:?}", function);
                let args = self.stack.split_off(self.stack.len() - arity);
                let next = current.apply_transition(function);
                self.stack.push(universe.make_apply(function, args));
                next
            }
            Action::Yield => {
                assert!(
                    current.can_yield() && self.stack.len() == 1,
                    "cannot yield from {}",
                    current
                );
                self.result = self.stack.last().copied();
                None
            }
        };
        assert!(
            action == Action::Yield || next.is_some(),
            "{:?} is not allowed from {}",
            action,
            current
        );
        self.state = next;
        self.step += 1;
        backup
    }

    /// Undo the most recent transition. Panics if `backup` does not come from it.
    pub fn undo_transition(&mut self, backup: Backup) {
        assert_eq!(
            self.step,
            backup.step + 1,
            "undo does not match the last transition"
        );
        self.step = backup.step;
        self.state = backup.state;
        self.stack = backup.stack;
        self.result = backup.result;
    }
}

/// Parameters of candidate generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildParams {
    /// Maximum number of construction steps, including the final yield.
    ///
    /// Default: `5`
    pub complexity: usize,
    /// Random draws attempted when choosing a leaf to push or a function to apply, before the
    /// sample is counted as a failure.
    ///
    /// Default: `100`
    pub max_draws: usize,
    /// The stochastic builder gives up after `failures_per_node` times the requested number of
    /// failed or duplicate samples.
    ///
    /// Default: `10`
    pub failures_per_node: usize,
}
impl Default for BuildParams {
    fn default() -> Self {
        BuildParams {
            complexity: 5,
            max_draws: 100,
            failures_per_node: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Distinct candidates, in the order they were found.
    pub nodes: Vec<NodeId>,
    pub num_failures: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Push,
    Apply,
    Yield,
}

/// Draws random candidates by walking the type search space.
///
/// At each step a category (push, apply or yield) is chosen uniformly among those the current
/// type state allows, then a leaf or function is drawn uniformly within it.
pub struct StochasticBuilder<'a> {
    problem: &'a Problem,
    params: BuildParams,
    space: Arc<TypeSearchSpace>,
}
impl<'a> StochasticBuilder<'a> {
    pub fn new(problem: &'a Problem, params: BuildParams) -> Self {
        let space = problem.search_space(params.complexity);
        StochasticBuilder {
            problem,
            params,
            space,
        }
    }

    /// Sample one candidate. `None` counts as a failure.
    pub fn sample_node<R: Rng>(&self, rng: &mut R) -> Option<NodeId> {
        let mut state = NodeBuilderState::new(self.problem, Arc::clone(&self.space));
        for _ in 0..self.params.complexity {
            let action = {
                let current = self.space.get(state.state_id()?);
                let mut categories = Vec::with_capacity(3);
                if current.has_push_actions() {
                    categories.push(Category::Push);
                }
                if current.has_apply_actions() {
                    categories.push(Category::Apply);
                }
                if current.can_yield() {
                    categories.push(Category::Yield);
                }
                match *categories.choose(rng)? {
                    Category::Push => self.sample_push(&state, current, rng)?,
                    Category::Apply => self.sample_apply(&state, current, rng)?,
                    Category::Yield => Action::Yield,
                }
            };
            state.perform_transition(action);
            if let Some(node) = state.result() {
                return Some(node);
            }
        }
        None
    }

    fn sample_push<R: Rng>(
        &self,
        state: &NodeBuilderState,
        current: &TypeState,
        rng: &mut R,
    ) -> Option<Action> {
        let universe = self.problem.universe();
        for _ in 0..self.params.max_draws {
            let &leaf = state.leaves.choose(rng)?;
            if current.has_push_action(universe.node(leaf).tp()) {
                return Some(Action::Push(leaf));
            }
        }
        None
    }

    fn sample_apply<R: Rng>(
        &self,
        state: &NodeBuilderState,
        current: &TypeState,
        rng: &mut R,
    ) -> Option<Action> {
        for _ in 0..self.params.max_draws {
            let &(function, _) = current.apply_actions().choose(rng)?;
            if state.accepts_apply(function) {
                return Some(Action::Apply(function));
            }
        }
        None
    }

    /// Sample up to `count` distinct candidates.
    ///
    /// Failed samples and duplicates consume a budget of `failures_per_node * count`; the
    /// outcome may hold fewer nodes than requested when the budget runs out.
    pub fn build_nodes<R: Rng>(&self, count: usize, rng: &mut R) -> BuildOutcome {
        let budget = self.params.failures_per_node * count;
        let mut seen = HashSet::new();
        let mut outcome = BuildOutcome::default();
        while outcome.nodes.len() < count && outcome.num_failures < budget {
            match self.sample_node(rng) {
                Some(node) if seen.insert(node) => outcome.nodes.push(node),
                _ => outcome.num_failures += 1,
            }
        }
        if outcome.nodes.len() < count {
            warn!(
                "built {} of {} requested nodes after {} failures",
                outcome.nodes.len(),
                count,
                outcome.num_failures
            );
        }
        outcome
    }
}

/// Enumerates every candidate of a complexity by depth-first search over the type search space.
pub struct ExhaustiveBuilder<'a> {
    problem: &'a Problem,
    complexity: usize,
}
impl<'a> ExhaustiveBuilder<'a> {
    pub fn new(problem: &'a Problem, complexity: usize) -> Self {
        ExhaustiveBuilder {
            problem,
            complexity,
        }
    }

    /// Every distinct candidate, in first-found order.
    pub fn build_nodes(&self) -> Vec<NodeId> {
        let mut seen = HashSet::new();
        let mut nodes = Vec::new();
        self.enumerate(&mut |node| {
            if seen.insert(node) {
                nodes.push(node);
            }
            false
        });
        debug!(
            "enumerated {} nodes of complexity {}",
            nodes.len(),
            self.complexity
        );
        nodes
    }

    /// Call `termination_condition` with every yielded node, duplicates included, until it
    /// returns `true`. Returns whether enumeration was terminated early.
    pub fn enumerate(&self, termination_condition: &mut dyn FnMut(NodeId) -> bool) -> bool {
        let space = self.problem.search_space(self.complexity);
        let mut state = NodeBuilderState::new(self.problem, space);
        descend(&mut state, termination_condition)
    }
}

fn descend(
    state: &mut NodeBuilderState,
    termination_condition: &mut dyn FnMut(NodeId) -> bool,
) -> bool {
    if let Some(node) = state.result() {
        return termination_condition(node);
    }
    for action in state.available_actions() {
        let backup = state.perform_transition(action);
        let terminated = descend(state, termination_condition);
        state.undo_transition(backup);
        if terminated {
            return true;
        }
    }
    false
}

/// Stream the distinct candidates of a complexity, as [`ExhaustiveBuilder::build_nodes`] would
/// return them, from a background thread.
///
/// Enumeration stops once the iterator is dropped.
///
/// [`ExhaustiveBuilder::build_nodes`]: struct.ExhaustiveBuilder.html#method.build_nodes
pub fn enumerate_iter(
    problem: Arc<Problem>,
    complexity: usize,
) -> Box<dyn Iterator<Item = NodeId> + Send> {
    let (tx, rx) = bounded(1);
    thread::spawn(move || {
        let mut seen = HashSet::new();
        ExhaustiveBuilder::new(&problem, complexity)
            .enumerate(&mut |node| seen.insert(node) && tx.send(node).is_err());
    });
    Box::new(rx.into_iter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::Universe;
    use crate::types::{Type, Value};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use test_log::test;

    fn products() -> Problem {
        let mut universe = Universe::new();
        let ops = universe.register_standard_operators();
        let mut problem = Problem::new(Arc::new(universe));
        problem.add_input("x", Type::Double);
        problem.add_constant(Value::Double(2.0), Type::Double);
        problem.add_function(ops.mul).unwrap();
        problem
    }

    #[test]
    fn undo_restores_state() {
        let problem = products();
        let leaves = problem.leaves();
        let mut state = NodeBuilderState::new(&problem, problem.search_space(4));
        state.perform_transition(Action::Push(leaves[0]));
        let before = state.clone();
        let backup = state.perform_transition(Action::Push(leaves[1]));
        let apply = state
            .available_actions()
            .into_iter()
            .find(|a| matches!(a, Action::Apply(_)))
            .unwrap();
        let inner = state.perform_transition(apply);
        assert_eq!(state.stack().len(), 1);
        state.undo_transition(inner);
        state.undo_transition(backup);
        assert_eq!(state.stack(), before.stack());
        assert_eq!(state.state_id(), before.state_id());
        assert_eq!(state.step(), 1);
    }

    #[test]
    #[should_panic(expected = "undo does not match")]
    fn undo_out_of_order_panics() {
        let problem = products();
        let leaves = problem.leaves();
        let mut state = NodeBuilderState::new(&problem, problem.search_space(4));
        let first = state.perform_transition(Action::Push(leaves[0]));
        state.perform_transition(Action::Push(leaves[1]));
        state.undo_transition(first);
    }

    #[test]
    fn commutative_orderings_are_not_offered() {
        let problem = products();
        let leaves = problem.leaves();
        let mut state = NodeBuilderState::new(&problem, problem.search_space(4));
        state.perform_transition(Action::Push(leaves[1]));
        state.perform_transition(Action::Push(leaves[0]));
        assert!(state.available_actions().is_empty());
    }

    #[test]
    fn exhaustive_products() {
        let problem = products();
        let universe = problem.universe();
        let nodes = ExhaustiveBuilder::new(&problem, 4).build_nodes();
        let printed: Vec<_> = nodes.iter().map(|&n| universe.display(n)).collect();
        // pushes are explored before yields
        assert_eq!(printed, vec!["x * x", "x * 2.0", "x", "2.0 * 2.0", "2.0"]);
    }

    #[test]
    fn streaming_matches_collected() {
        let problem = Arc::new(products());
        let collected = problem.enumerate_nodes_exhaustively(4);
        let streamed: Vec<_> = enumerate_iter(Arc::clone(&problem), 4).collect();
        assert_eq!(streamed, collected);
        let first_two: Vec<_> = enumerate_iter(problem, 4).take(2).collect();
        assert_eq!(first_two, collected[..2].to_vec());
    }

    #[test]
    fn stochastic_stays_within_exhaustive() {
        let problem = products();
        let all: HashSet<_> = problem.enumerate_nodes_exhaustively(4).into_iter().collect();
        let builder = StochasticBuilder::new(
            &problem,
            BuildParams {
                complexity: 4,
                ..BuildParams::default()
            },
        );
        let mut rng = SmallRng::seed_from_u64(7);
        let outcome = builder.build_nodes(100, &mut rng);
        assert_eq!(outcome.nodes.len(), all.len());
        assert_eq!(outcome.num_failures, 1000);
        for node in outcome.nodes {
            assert!(all.contains(&node));
        }
    }
}
