//! The leaves, operator library and target types that define a search.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::expression::{NodeId, OperatorId, Universe};
use crate::search::{ExhaustiveBuilder, TypeSearchSpace};
use crate::types::{Type, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProblemError {
    /// The operator is not registered in the problem's universe.
    UnknownOperator(OperatorId),
    /// Operators without arguments cannot be applied; leaves are pushed instead.
    ZeroArity(String),
    UnknownNode(NodeId),
    /// Input columns of a sample cache must all hold one value per example.
    InconsistentColumns {
        input: usize,
        expected: usize,
        found: usize,
    },
    /// Supervision must hold one label or target per example of the sample cache.
    SupervisionLength { expected: usize, found: usize },
    /// A class label is not below the number of labels.
    InvalidLabel { example: usize, label: usize },
    /// The problem and the sample cache were built over different universes.
    UniverseMismatch,
}
impl fmt::Display for ProblemError {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            ProblemError::UnknownOperator(op) => write!(f, "unknown operator {:?}", op),
            ProblemError::ZeroArity(ref name) => {
                write!(f, "operator {} takes no arguments and cannot be applied", name)
            }
            ProblemError::UnknownNode(node) => write!(f, "unknown node {}", node),
            ProblemError::InconsistentColumns {
                input,
                expected,
                found,
            } => write!(
                f,
                "input {} has {} values, expected one per example ({})",
                input, found, expected
            ),
            ProblemError::SupervisionLength { expected, found } => write!(
                f,
                "supervision has {} entries, expected one per example ({})",
                found, expected
            ),
            ProblemError::InvalidLabel { example, label } => {
                write!(f, "example {} has out-of-range label {}", example, label)
            }
            ProblemError::UniverseMismatch => {
                write!(f, "problem and sample cache use different universes")
            }
        }
    }
}
impl std::error::Error for ProblemError {}

/// A search problem: what can be pushed, what can be applied, and what can be yielded.
///
/// Leaves are the declared inputs, the constants, and the active variables: nodes promoted by
/// an outer loop (e.g. [`FormulaDiscovery`]) so that later searches can push them in one step.
///
/// The type search space of each complexity is built on first use and cached. Adding an active
/// variable invalidates the cache.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use luape::{Problem, Type, Universe, Value};
///
/// let mut universe = Universe::new();
/// let ops = universe.register_standard_operators();
/// let mut problem = Problem::new(Arc::new(universe));
/// problem.add_input("x", Type::Double);
/// problem.add_constant(Value::Double(1.0), Type::Double);
/// problem.add_function(ops.add).unwrap();
///
/// // x, 1.0, x + x, x + 1.0, 1.0 + 1.0
/// assert_eq!(problem.enumerate_nodes_exhaustively(4).len(), 5);
/// ```
///
/// [`FormulaDiscovery`]: discovery/struct.FormulaDiscovery.html
pub struct Problem {
    universe: Arc<Universe>,
    inputs: Vec<NodeId>,
    constants: Vec<NodeId>,
    functions: Vec<OperatorId>,
    target_types: Vec<Type>,
    active_variables: Vec<NodeId>,
    search_spaces: Mutex<HashMap<usize, Arc<TypeSearchSpace>>>,
}
impl fmt::Debug for Problem {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.debug_struct("Problem")
            .field("inputs", &self.inputs)
            .field("constants", &self.constants)
            .field("functions", &self.functions)
            .field("target_types", &self.target_types)
            .field("active_variables", &self.active_variables)
            .finish()
    }
}
impl Problem {
    pub fn new(universe: Arc<Universe>) -> Self {
        Problem {
            universe,
            inputs: Vec::new(),
            constants: Vec::new(),
            functions: Vec::new(),
            target_types: Vec::new(),
            active_variables: Vec::new(),
            search_spaces: Mutex::new(HashMap::new()),
        }
    }
    pub fn universe(&self) -> &Arc<Universe> {
        &self.universe
    }

    /// Declare the next input. Its index is the position of its column in a [`SampleCache`].
    ///
    /// [`SampleCache`]: struct.SampleCache.html
    pub fn add_input(&mut self, name: &str, tp: Type) -> NodeId {
        let node = self.universe.make_input(self.inputs.len(), name, tp);
        self.inputs.push(node);
        self.invalidate();
        node
    }
    pub fn add_constant(&mut self, value: Value, tp: Type) -> NodeId {
        let node = self.universe.make_constant(value, tp);
        if !self.constants.contains(&node) {
            self.constants.push(node);
            self.invalidate();
        }
        node
    }
    pub fn add_function(&mut self, op: OperatorId) -> Result<(), ProblemError> {
        if op.index() >= self.universe.num_operators() {
            return Err(ProblemError::UnknownOperator(op));
        }
        let operator = self.universe.operator(op);
        if operator.arity() == 0 {
            return Err(ProblemError::ZeroArity(operator.name().to_owned()));
        }
        if !self.functions.contains(&op) {
            self.functions.push(op);
            self.invalidate();
        }
        Ok(())
    }
    /// Restrict yieldable types. Without any target type, booleans, doubles and
    /// non-enumerated integers are accepted.
    pub fn add_target_type(&mut self, tp: Type) {
        if !self.target_types.contains(&tp) {
            self.target_types.push(tp);
            self.invalidate();
        }
    }
    /// Make an existing node pushable. Returns `Ok(false)` if it already was active.
    pub fn add_active_variable(&mut self, node: NodeId) -> Result<bool, ProblemError> {
        if node.index() >= self.universe.num_nodes() {
            return Err(ProblemError::UnknownNode(node));
        }
        if self.active_variables.contains(&node) {
            return Ok(false);
        }
        self.active_variables.push(node);
        self.invalidate();
        Ok(true)
    }
    fn invalidate(&mut self) {
        self.search_spaces
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn inputs(&self) -> &[NodeId] {
        &self.inputs
    }
    pub fn constants(&self) -> &[NodeId] {
        &self.constants
    }
    pub fn functions(&self) -> &[OperatorId] {
        &self.functions
    }
    pub fn active_variables(&self) -> &[NodeId] {
        &self.active_variables
    }
    /// Every pushable node: inputs, then constants, then active variables.
    pub fn leaves(&self) -> Vec<NodeId> {
        self.inputs
            .iter()
            .chain(&self.constants)
            .chain(&self.active_variables)
            .copied()
            .collect()
    }
    /// The distinct types of the leaves, in leaf order.
    pub fn leaf_types(&self) -> Vec<Type> {
        let mut types = Vec::new();
        for leaf in self.leaves() {
            let tp = self.universe.node(leaf).tp();
            if !types.contains(&tp) {
                types.push(tp);
            }
        }
        types
    }
    pub fn is_target_type_accepted(&self, tp: Type) -> bool {
        if self.target_types.is_empty() {
            tp.inherits_from(Type::Boolean)
                || tp.inherits_from(Type::Double)
                || (!tp.is_enumeration() && tp.inherits_from(Type::Integer))
        } else {
            self.target_types.iter().any(|&target| tp.inherits_from(target))
        }
    }

    /// The pruned, indexed type search space for candidates of the given complexity, starting
    /// from an empty stack.
    pub fn search_space(&self, complexity: usize) -> Arc<TypeSearchSpace> {
        let mut spaces = self
            .search_spaces
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(spaces.entry(complexity).or_insert_with(|| {
            let mut space = TypeSearchSpace::new(self, &[], complexity);
            space.prune();
            space.assign_state_indices();
            Arc::new(space)
        }))
    }

    /// Every distinct candidate of the given complexity, in deterministic order.
    pub fn enumerate_nodes_exhaustively(&self, complexity: usize) -> Vec<NodeId> {
        ExhaustiveBuilder::new(self, complexity).build_nodes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_target_types() {
        let problem = Problem::new(Arc::new(Universe::new()));
        assert!(problem.is_target_type_accepted(Type::Boolean));
        assert!(problem.is_target_type_accepted(Type::Probability));
        assert!(problem.is_target_type_accepted(Type::PositiveInteger));
        assert!(!problem.is_target_type_accepted(Type::Enumeration {
            id: 0,
            cardinality: 2
        }));
    }

    #[test]
    fn explicit_target_types() {
        let mut problem = Problem::new(Arc::new(Universe::new()));
        problem.add_target_type(Type::Double);
        assert!(problem.is_target_type_accepted(Type::Probability));
        assert!(!problem.is_target_type_accepted(Type::Boolean));
    }

    #[test]
    fn search_spaces_are_cached_until_leaves_change() {
        let mut universe = Universe::new();
        let ops = universe.register_standard_operators();
        let mut problem = Problem::new(Arc::new(universe));
        let x = problem.add_input("x", Type::Double);
        problem.add_function(ops.mul).unwrap();
        let a = problem.search_space(4);
        assert!(Arc::ptr_eq(&a, &problem.search_space(4)));

        let sq = problem.enumerate_nodes_exhaustively(4);
        assert_eq!(sq.len(), 2);
        assert_eq!(problem.add_active_variable(sq[1]), Ok(true));
        assert_eq!(problem.add_active_variable(sq[1]), Ok(false));
        assert!(!Arc::ptr_eq(&a, &problem.search_space(4)));
        assert_eq!(problem.leaves(), vec![x, sq[1]]);
    }

    #[test]
    fn rejects_bad_functions() {
        let mut other = Universe::new();
        let foreign = other.register_standard_operators().add;
        let universe = Universe::new();
        let stump = universe.stump_operator();
        let mut problem = Problem::new(Arc::new(universe));
        assert_eq!(
            problem.add_function(foreign),
            Err(ProblemError::UnknownOperator(foreign))
        );
        assert!(problem.add_function(stump).is_ok());
    }
}
