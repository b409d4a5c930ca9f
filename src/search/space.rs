//! The type search space: an automaton over stacks of types.
//!
//! A state is identified by its depth (the number of construction steps taken so far) and the
//! types of the nodes on the stack. Transitions push a leaf of some type, or apply a function
//! instance to the types on top of the stack. A state can yield when its stack holds exactly one
//! type accepted as a target. Every node the builders construct follows a path in this
//! automaton, so sampling and enumeration never produce ill-typed candidates.

use log::{debug, trace};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use crate::expression::{FunctionId, OperatorId, Universe};
use crate::problem::Problem;
use crate::types::{Type, Value};

/// Handle to a state of a [`TypeSearchSpace`].
///
/// [`TypeSearchSpace`]: struct.TypeSearchSpace.html
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(u32);
impl StateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeState {
    depth: usize,
    stack: Vec<Type>,
    push: Vec<(Type, StateId)>,
    apply: Vec<(FunctionId, StateId)>,
    yieldable: bool,
    index: Option<usize>,
    num_node_types_when_built: usize,
    prunable: Option<bool>,
}
impl TypeState {
    fn new(depth: usize, stack: Vec<Type>, yieldable: bool) -> Self {
        TypeState {
            depth,
            stack,
            push: Vec::new(),
            apply: Vec::new(),
            yieldable,
            index: None,
            num_node_types_when_built: 0,
            prunable: None,
        }
    }
    pub fn depth(&self) -> usize {
        self.depth
    }
    pub fn stack(&self) -> &[Type] {
        &self.stack
    }
    /// Dense index in key order, assigned by [`TypeSearchSpace::assign_state_indices`].
    ///
    /// [`TypeSearchSpace::assign_state_indices`]: struct.TypeSearchSpace.html#method.assign_state_indices
    pub fn index(&self) -> Option<usize> {
        self.index
    }
    pub fn push_actions(&self) -> &[(Type, StateId)] {
        &self.push
    }
    pub fn apply_actions(&self) -> &[(FunctionId, StateId)] {
        &self.apply
    }
    pub fn push_transition(&self, tp: Type) -> Option<StateId> {
        self.push.iter().find(|&&(t, _)| t == tp).map(|&(_, s)| s)
    }
    pub fn apply_transition(&self, function: FunctionId) -> Option<StateId> {
        self.apply
            .iter()
            .find(|&&(f, _)| f == function)
            .map(|&(_, s)| s)
    }
    pub fn has_push_action(&self, tp: Type) -> bool {
        self.push_transition(tp).is_some()
    }
    pub fn has_apply_action(&self, function: FunctionId) -> bool {
        self.apply_transition(function).is_some()
    }
    pub fn has_push_actions(&self) -> bool {
        !self.push.is_empty()
    }
    pub fn has_apply_actions(&self) -> bool {
        !self.apply.is_empty()
    }
    pub fn can_yield(&self) -> bool {
        self.yieldable
    }
    pub fn has_any_action(&self) -> bool {
        self.yieldable || !self.push.is_empty() || !self.apply.is_empty()
    }
}
impl fmt::Display for TypeState {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "[{}] {{", self.depth)?;
        for (i, tp) in self.stack.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", tp)?;
        }
        write!(
            f,
            "}} -> {} push actions, {} apply actions",
            self.push.len(),
            self.apply.len()
        )?;
        if self.yieldable {
            write!(f, ", yield action")?;
        }
        Ok(())
    }
}

/// The finite automaton of type stacks reachable within a maximum depth.
///
/// Building discovers the types that applications produce and keeps expanding until the set of
/// known types stops growing. [`prune`] then removes every state from which no yield is
/// reachable, so that any path a builder follows can be completed.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use luape::{Problem, Type, Universe};
/// use luape::search::TypeSearchSpace;
///
/// let mut universe = Universe::new();
/// let ops = universe.register_standard_operators();
/// let mut problem = Problem::new(Arc::new(universe));
/// problem.add_input("x", Type::Double);
/// problem.add_function(ops.greater).unwrap();
///
/// let mut space = TypeSearchSpace::new(&problem, &[], 4);
/// space.prune();
/// space.assign_state_indices();
/// let initial = space.initial_state().unwrap();
/// // booleans are produced by `>`, so they may be pushed as well
/// assert_eq!(initial.to_string(), "[0] {} -> 2 push actions, 0 apply actions");
/// // {}, {double}, {boolean}, {double, double}, {boolean} after `>`
/// assert_eq!(space.num_states(), 5);
/// ```
///
/// [`prune`]: #method.prune
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSearchSpace {
    states: Vec<TypeState>,
    keys: BTreeMap<(usize, Vec<Type>), StateId>,
    initial: StateId,
    max_depth: usize,
    node_types: Vec<Type>,
}
impl TypeSearchSpace {
    /// Build the automaton for the problem, starting from `initial_stack` at depth 0.
    pub fn new(problem: &Problem, initial_stack: &[Type], max_depth: usize) -> Self {
        let mut space = TypeSearchSpace {
            states: Vec::new(),
            keys: BTreeMap::new(),
            initial: StateId(0),
            max_depth,
            node_types: Vec::new(),
        };
        for tp in problem.leaf_types() {
            space.insert_type(tp);
        }
        for &tp in initial_stack {
            space.insert_type(tp);
        }
        space.initial = space.get_or_create(problem, 0, initial_stack.to_vec());
        while space.expand(problem) > 0 {}
        debug!(
            "type search space of depth {}: {} states, {} types",
            max_depth,
            space.keys.len(),
            space.node_types.len()
        );
        space
    }

    /// Run one expansion pass from the initial state. Returns the number of newly discovered
    /// node types; a space is complete when this is zero.
    pub fn expand(&mut self, problem: &Problem) -> usize {
        let before = self.node_types.len();
        self.build_successors(problem, self.initial);
        self.node_types.len() - before
    }

    fn insert_type(&mut self, tp: Type) {
        if !self.node_types.contains(&tp) {
            self.node_types.push(tp);
        }
    }

    fn get_or_create(&mut self, problem: &Problem, depth: usize, stack: Vec<Type>) -> StateId {
        match self.keys.entry((depth, stack)) {
            Entry::Occupied(e) => *e.get(),
            Entry::Vacant(e) => {
                let stack = e.key().1.clone();
                let yieldable = stack.len() == 1 && problem.is_target_type_accepted(stack[0]);
                let id = StateId(self.states.len() as u32);
                self.states.push(TypeState::new(depth, stack, yieldable));
                e.insert(id);
                id
            }
        }
    }

    fn build_successors(&mut self, problem: &Problem, id: StateId) {
        let depth = self.states[id.index()].depth;
        if depth == self.max_depth {
            let state = &mut self.states[id.index()];
            state.stack.clear();
            state.yieldable = false;
            return;
        }
        if self.states[id.index()].num_node_types_when_built == self.node_types.len() {
            return;
        }
        self.states[id.index()].num_node_types_when_built = self.node_types.len();

        // a push is only useful if enough steps remain to reduce the stack to one node and yield
        if self.max_depth - depth > self.states[id.index()].stack.len() {
            // types discovered by the recursion are pushed as well
            let mut i = 0;
            while i < self.node_types.len() {
                let tp = self.node_types[i];
                let next = match self.states[id.index()].push_transition(tp) {
                    Some(next) => next,
                    None => {
                        let mut stack = self.states[id.index()].stack.clone();
                        stack.push(tp);
                        let next = self.get_or_create(problem, depth + 1, stack);
                        self.states[id.index()].push.push((tp, next));
                        next
                    }
                };
                self.build_successors(problem, next);
                i += 1;
            }
        }

        let universe = problem.universe();
        for &op_id in problem.functions() {
            let op = universe.operator(op_id);
            let arity = op.arity();
            let stack = &self.states[id.index()].stack;
            if arity == 0 || arity > stack.len() {
                continue;
            }
            let input_types = stack[stack.len() - arity..].to_vec();
            if !input_types
                .iter()
                .enumerate()
                .all(|(i, &tp)| op.accepts(i, tp))
            {
                continue;
            }
            let mut instances = Vec::new();
            function_instances(universe, op_id, &input_types, &mut Vec::new(), &mut instances);
            for function in instances {
                self.apply_and_build_successor(problem, id, function, &input_types);
            }
        }
    }

    fn apply_and_build_successor(
        &mut self,
        problem: &Problem,
        id: StateId,
        function: FunctionId,
        input_types: &[Type],
    ) {
        let output = problem.universe().output_type(function, input_types);
        self.insert_type(output);
        let state = &self.states[id.index()];
        let depth = state.depth;
        let mut stack = state.stack[..state.stack.len() - input_types.len()].to_vec();
        stack.push(output);
        let next = self.get_or_create(problem, depth + 1, stack);
        self.set_apply_transition(id, function, next);
        self.build_successors(problem, next);
    }

    fn set_apply_transition(&mut self, id: StateId, function: FunctionId, next: StateId) {
        let state = &mut self.states[id.index()];
        match state.apply_transition(function) {
            Some(existing) => debug_assert_eq!(
                existing, next,
                "apply transition of {:?} redefined from {}",
                function, state
            ),
            None => state.apply.push((function, next)),
        }
    }

    /// Remove every state from which no yield is reachable, along with the transitions into it.
    pub fn prune(&mut self) {
        let before = self.keys.len();
        self.prune_state(self.initial);
        let states = &self.states;
        self.keys
            .retain(|_, id| states[id.index()].prunable == Some(false));
        debug!(
            "pruned type search space of depth {} from {} to {} states",
            self.max_depth,
            before,
            self.keys.len()
        );
        for &id in self.keys.values() {
            trace!("{}", self.states[id.index()]);
        }
    }

    fn prune_state(&mut self, id: StateId) -> bool {
        if let Some(prunable) = self.states[id.index()].prunable {
            return prunable;
        }
        let push = std::mem::take(&mut self.states[id.index()].push);
        let push: Vec<_> = push
            .into_iter()
            .filter(|&(_, next)| !self.prune_state(next))
            .collect();
        let apply = std::mem::take(&mut self.states[id.index()].apply);
        let apply: Vec<_> = apply
            .into_iter()
            .filter(|&(_, next)| !self.prune_state(next))
            .collect();
        let state = &mut self.states[id.index()];
        state.push = push;
        state.apply = apply;
        let prunable = !state.has_any_action();
        state.prunable = Some(prunable);
        prunable
    }

    /// Number the surviving states densely, in key order.
    pub fn assign_state_indices(&mut self) {
        for (i, &id) in self.keys.values().enumerate() {
            self.states[id.index()].index = Some(i);
        }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }
    /// Every type a node may take in this space: leaf types and discovered output types.
    pub fn node_types(&self) -> &[Type] {
        &self.node_types
    }
    pub fn num_states(&self) -> usize {
        self.keys.len()
    }
    /// `None` if pruning removed the initial state, i.e. no candidate can be built.
    pub fn initial_state_id(&self) -> Option<StateId> {
        if self.contains(self.initial) {
            Some(self.initial)
        } else {
            None
        }
    }
    pub fn initial_state(&self) -> Option<&TypeState> {
        self.initial_state_id().map(|id| self.get(id))
    }
    /// Whether the state survived pruning. Before pruning, every state is contained.
    pub fn contains(&self, id: StateId) -> bool {
        self.states[id.index()].prunable != Some(true)
    }
    pub fn get(&self, id: StateId) -> &TypeState {
        &self.states[id.index()]
    }
    pub fn state_id(&self, depth: usize, stack: &[Type]) -> Option<StateId> {
        self.keys.get(&(depth, stack.to_vec())).copied()
    }
    pub fn state(&self, depth: usize, stack: &[Type]) -> Option<&TypeState> {
        self.state_id(depth, stack).map(|id| self.get(id))
    }
    /// The surviving states in key order.
    pub fn states(&self) -> impl Iterator<Item = (StateId, &TypeState)> {
        self.keys
            .values()
            .map(move |&id| (id, &self.states[id.index()]))
    }
}

/// Enumerate every function instance of an operator for these argument types by backtracking
/// over its parameters' candidate values.
fn function_instances(
    universe: &Universe,
    op: OperatorId,
    input_types: &[Type],
    params: &mut Vec<Value>,
    out: &mut Vec<FunctionId>,
) {
    let operator = universe.operator(op);
    if params.len() == operator.num_parameters() {
        out.push(universe.make_function(op, params.clone()));
        return;
    }
    for value in operator.candidate_parameter_values(params.len(), input_types) {
        params.push(value);
        function_instances(universe, op, input_types, params, out);
        params.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use test_log::test;

    fn arithmetic() -> Problem {
        let mut universe = Universe::new();
        let ops = universe.register_standard_operators();
        let mut problem = Problem::new(Arc::new(universe));
        problem.add_input("x", Type::Double);
        problem.add_constant(Value::Double(1.0), Type::Double);
        for op in [ops.add, ops.sub, ops.mul, ops.div] {
            problem.add_function(op).unwrap();
        }
        problem
    }

    #[test]
    fn max_depth_states_cannot_yield() {
        let problem = arithmetic();
        let space = TypeSearchSpace::new(&problem, &[], 3);
        // {double} reached in three steps could only yield at step four
        let state = space.state(3, &[Type::Double]).unwrap();
        assert!(!state.can_yield());
        assert!(state.stack().is_empty());
        assert!(space.state(1, &[Type::Double]).unwrap().can_yield());
    }

    #[test]
    fn pushes_leave_room_to_reduce() {
        let problem = arithmetic();
        let space = TypeSearchSpace::new(&problem, &[], 4);
        let state = space.state(1, &[Type::Double]).unwrap();
        assert!(state.has_push_action(Type::Double));
        let state = space.state(2, &[Type::Double, Type::Double]).unwrap();
        assert!(!state.has_push_actions());
        assert_eq!(state.apply_actions().len(), 4);
    }

    #[test]
    fn pruning_keeps_completable_states() {
        let problem = arithmetic();
        let mut space = TypeSearchSpace::new(&problem, &[], 5);
        let unpruned = space.num_states();
        space.prune();
        assert!(space.num_states() < unpruned);
        for (_, state) in space.states() {
            assert!(state.has_any_action(), "{}", state);
        }
        // three doubles cannot be reduced to one in the two remaining steps
        assert!(space.state(3, &[Type::Double; 3]).is_none());
        assert!(space.state(4, &[Type::Double; 2]).is_none());
        let state = space.state(2, &[Type::Double; 2]).unwrap();
        assert!(!state.has_push_actions());
        assert!(space.state(3, &[Type::Double]).unwrap().can_yield());
    }

    #[test]
    fn discovers_output_types() {
        let mut universe = Universe::new();
        let ops = universe.register_standard_operators();
        let mut problem = Problem::new(Arc::new(universe));
        problem.add_input("x", Type::Double);
        problem.add_function(ops.greater).unwrap();
        problem.add_function(ops.and).unwrap();
        let space = TypeSearchSpace::new(&problem, &[], 8);
        assert_eq!(space.node_types(), &[Type::Double, Type::Boolean]);
        // (x > x) && (x > x) in types: push push > push push > && yield
        assert!(space
            .state(6, &[Type::Boolean, Type::Boolean])
            .unwrap()
            .has_apply_actions());
    }

    #[test]
    fn no_leaves_prunes_everything() {
        let mut universe = Universe::new();
        let ops = universe.register_standard_operators();
        let mut problem = Problem::new(Arc::new(universe));
        problem.add_function(ops.add).unwrap();
        let mut space = TypeSearchSpace::new(&problem, &[], 4);
        space.prune();
        assert!(space.initial_state().is_none());
        assert_eq!(space.num_states(), 0);
    }
}
