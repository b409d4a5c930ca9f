//! Hash-consed expression nodes.
//!
//! Nodes live in an arena owned by a [`Universe`] and are addressed by [`NodeId`] handles.
//! Structurally equal nodes are interned into a single handle, so handle equality implies
//! semantic equality and caches may key on handles.
//!
//! [`Universe`]: struct.Universe.html
//! [`NodeId`]: struct.NodeId.html

mod operators;
mod rewrite;
mod rpn;

pub use self::operators::{
    Add, And, Div, EqualBoolean, EqualsEnum, Greater, Mul, Operator, OperatorFlags, Stump, Sub,
};
pub use self::rewrite::{CommutativeOrdering, ConstantFolding, Rewrite, RewriteRule};
pub use self::rpn::{parse_rpn, ParseError, RpnSequence, RpnSymbol};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::types::{Type, Value};

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(u32);
        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

handle!(
    /// Handle to an interned node. Handles are allocated in creation order.
    NodeId
);
handle!(
    /// Handle to an interned [`Function`](struct.Function.html).
    FunctionId
);
handle!(
    /// Handle to an operator registered in a universe.
    OperatorId
);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Constant(Value),
    Input { index: usize, name: String },
    Apply { function: FunctionId, args: Vec<NodeId> },
}

/// An immutable expression node.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    kind: NodeKind,
    tp: Type,
    depth: usize,
    tree_size: usize,
    uses_inputs: bool,
}
impl Node {
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
    pub fn tp(&self) -> Type {
        self.tp
    }
    /// Height of the tree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        self.depth
    }
    pub fn tree_size(&self) -> usize {
        self.tree_size
    }
    /// Whether some leaf of the tree is an input.
    pub fn uses_inputs(&self) -> bool {
        self.uses_inputs
    }
    pub fn args(&self) -> &[NodeId] {
        match self.kind {
            NodeKind::Apply { ref args, .. } => args,
            _ => &[],
        }
    }
    pub fn is_leaf(&self) -> bool {
        !matches!(self.kind, NodeKind::Apply { .. })
    }
    pub fn constant_value(&self) -> Option<Value> {
        match self.kind {
            NodeKind::Constant(v) => Some(v),
            _ => None,
        }
    }
    pub fn input_index(&self) -> Option<usize> {
        match self.kind {
            NodeKind::Input { index, .. } => Some(index),
            _ => None,
        }
    }
    /// Constants rank before inputs, which rank before applications.
    pub fn kind_rank(&self) -> u8 {
        match self.kind {
            NodeKind::Constant(_) => 0,
            NodeKind::Input { .. } => 1,
            NodeKind::Apply { .. } => 2,
        }
    }
}

/// An operator together with fixed values for its internal parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Function {
    operator: OperatorId,
    params: Vec<Value>,
}
impl Function {
    pub fn operator(&self) -> OperatorId {
        self.operator
    }
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    Constant(Value, Type),
    Input(usize, String, Type),
    Apply(FunctionId, Vec<NodeId>),
}

#[derive(Default)]
struct Arena {
    nodes: Vec<Arc<Node>>,
    nodes_index: HashMap<NodeKey, NodeId>,
    functions: Vec<Arc<Function>>,
    functions_index: HashMap<Function, FunctionId>,
}

/// Handles of the operators added by [`Universe::register_standard_operators`].
///
/// [`Universe::register_standard_operators`]: struct.Universe.html#method.register_standard_operators
#[derive(Debug, Clone, Copy)]
pub struct StandardOperators {
    pub add: OperatorId,
    pub sub: OperatorId,
    pub mul: OperatorId,
    pub div: OperatorId,
    pub greater: OperatorId,
    pub and: OperatorId,
    pub equal_boolean: OperatorId,
    pub equals_enum: OperatorId,
}

/// The interning registry for nodes and function instances.
///
/// Operators and rewrite rules are registered up front through `&mut self`; nodes can then be
/// created through a shared reference, from any thread. Entries are only ever added.
///
/// # Examples
///
/// ```
/// use luape::{Type, Universe, Value};
///
/// let mut universe = Universe::new();
/// let ops = universe.register_standard_operators();
/// let x = universe.make_input(0, "x", Type::Double);
/// let one = universe.make_constant(Value::Double(1.0), Type::Double);
/// let add = universe.make_function(ops.add, vec![]);
///
/// let a = universe.make_apply(add, vec![x, one]);
/// let b = universe.make_apply(add, vec![one, x]);
/// assert_eq!(a, b);
/// assert_eq!(universe.display(a), "x + 1.0");
/// assert_eq!(universe.node(a).tree_size(), 3);
/// ```
pub struct Universe {
    operators: Vec<Arc<dyn Operator>>,
    rules: Vec<Box<dyn RewriteRule>>,
    arena: RwLock<Arena>,
    stump: OperatorId,
}
impl Default for Universe {
    fn default() -> Self {
        Self::new()
    }
}
impl fmt::Debug for Universe {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        let arena = self.read();
        f.debug_struct("Universe")
            .field("operators", &self.operators.iter().map(|o| o.name()).collect_vec())
            .field("rules", &self.rules.iter().map(|r| r.name()).collect_vec())
            .field("nodes", &arena.nodes.len())
            .field("functions", &arena.functions.len())
            .finish()
    }
}
impl Universe {
    /// A universe with the stump operator registered and commutative arguments canonicalised.
    pub fn new() -> Self {
        let mut universe = Universe {
            operators: Vec::new(),
            rules: Vec::new(),
            arena: RwLock::default(),
            stump: OperatorId(0),
        };
        universe.stump = universe.add_operator(Stump::default());
        universe.add_rule(CommutativeOrdering);
        universe
    }
    pub fn add_operator<O: Operator + 'static>(&mut self, op: O) -> OperatorId {
        let id = OperatorId(self.operators.len() as u32);
        self.operators.push(Arc::new(op));
        id
    }
    pub fn add_rule<R: RewriteRule + 'static>(&mut self, rule: R) {
        self.rules.push(Box::new(rule));
    }
    pub fn register_standard_operators(&mut self) -> StandardOperators {
        StandardOperators {
            add: self.add_operator(Add),
            sub: self.add_operator(Sub),
            mul: self.add_operator(Mul),
            div: self.add_operator(Div),
            greater: self.add_operator(Greater),
            and: self.add_operator(And),
            equal_boolean: self.add_operator(EqualBoolean),
            equals_enum: self.add_operator(EqualsEnum),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Arena> {
        self.arena.read().unwrap_or_else(PoisonError::into_inner)
    }
    fn write(&self) -> RwLockWriteGuard<'_, Arena> {
        self.arena.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn operator(&self, id: OperatorId) -> &dyn Operator {
        &*self.operators[id.index()]
    }
    pub fn num_operators(&self) -> usize {
        self.operators.len()
    }
    /// The first registered operator with this name.
    pub fn find_operator(&self, name: &str) -> Option<OperatorId> {
        self.operators
            .iter()
            .position(|op| op.name() == name)
            .map(|i| OperatorId(i as u32))
    }
    pub fn stump_operator(&self) -> OperatorId {
        self.stump
    }
    pub fn num_nodes(&self) -> usize {
        self.read().nodes.len()
    }
    pub fn node(&self, id: NodeId) -> Arc<Node> {
        Arc::clone(&self.read().nodes[id.index()])
    }
    pub fn function(&self, id: FunctionId) -> Arc<Function> {
        Arc::clone(&self.read().functions[id.index()])
    }
    pub fn function_operator(&self, id: FunctionId) -> &dyn Operator {
        let op = self.function(id).operator;
        self.operator(op)
    }
    /// The output type of `function` applied to arguments of the given types.
    pub fn output_type(&self, function: FunctionId, input_types: &[Type]) -> Type {
        let f = self.function(function);
        self.operator(f.operator)
            .output_type(&f.params, input_types)
    }

    fn intern(&self, key: NodeKey, make: impl FnOnce() -> Node) -> NodeId {
        if let Some(&id) = self.read().nodes_index.get(&key) {
            return id;
        }
        let node = make();
        let mut arena = self.write();
        if let Some(&id) = arena.nodes_index.get(&key) {
            return id;
        }
        let id = NodeId(arena.nodes.len() as u32);
        arena.nodes.push(Arc::new(node));
        arena.nodes_index.insert(key, id);
        id
    }

    pub fn make_constant(&self, value: Value, tp: Type) -> NodeId {
        self.intern(NodeKey::Constant(value, tp), || Node {
            kind: NodeKind::Constant(value),
            tp,
            depth: 1,
            tree_size: 1,
            uses_inputs: false,
        })
    }
    pub fn make_input(&self, index: usize, name: &str, tp: Type) -> NodeId {
        self.intern(NodeKey::Input(index, name.to_owned(), tp), || Node {
            kind: NodeKind::Input {
                index,
                name: name.to_owned(),
            },
            tp,
            depth: 1,
            tree_size: 1,
            uses_inputs: true,
        })
    }
    pub fn make_function(&self, operator: OperatorId, params: Vec<Value>) -> FunctionId {
        debug_assert_eq!(
            params.len(),
            self.operator(operator).num_parameters(),
            "wrong number of parameters for {}",
            self.operator(operator).name()
        );
        let key = Function { operator, params };
        if let Some(&id) = self.read().functions_index.get(&key) {
            return id;
        }
        let mut arena = self.write();
        if let Some(&id) = arena.functions_index.get(&key) {
            return id;
        }
        let id = FunctionId(arena.functions.len() as u32);
        arena.functions.push(Arc::new(key.clone()));
        arena.functions_index.insert(key, id);
        id
    }
    /// Apply `function` to `args`, running the rewrite rules first.
    ///
    /// The arguments must match the operator's arity and accepted types; this is checked in
    /// debug builds only.
    pub fn make_apply(&self, function: FunctionId, args: Vec<NodeId>) -> NodeId {
        self.check_application(function, &args);
        let (mut function, mut args) = (function, args);
        for rule in &self.rules {
            match rule.rewrite(self, function, &args) {
                Some(Rewrite::Node(node)) => return node,
                Some(Rewrite::Apply(f, a)) => {
                    self.check_application(f, &a);
                    function = f;
                    args = a;
                }
                None => (),
            }
        }
        self.intern(NodeKey::Apply(function, args.clone()), || {
            let children = args.iter().map(|&a| self.node(a)).collect_vec();
            let types = children.iter().map(|c| c.tp).collect_vec();
            Node {
                tp: self.output_type(function, &types),
                depth: 1 + children.iter().map(|c| c.depth).max().unwrap_or(0),
                tree_size: 1 + children.iter().map(|c| c.tree_size).sum::<usize>(),
                uses_inputs: children.iter().any(|c| c.uses_inputs),
                kind: NodeKind::Apply { function, args },
            }
        })
    }
    fn check_application(&self, function: FunctionId, args: &[NodeId]) {
        if cfg!(debug_assertions) {
            let op = self.function_operator(function);
            assert_eq!(args.len(), op.arity(), "arity mismatch for {}", op.name());
            for (i, &arg) in args.iter().enumerate() {
                let tp = self.node(arg).tp;
                assert!(
                    op.accepts(i, tp),
                    "{} does not accept {} as argument {}",
                    op.name(),
                    tp,
                    i
                );
            }
        }
    }
    /// `arg >= threshold`.
    pub fn make_stump(&self, arg: NodeId, threshold: f64) -> NodeId {
        let f = self.make_function(self.stump, vec![Value::Double(threshold)]);
        self.make_apply(f, vec![arg])
    }

    /// Whether applying `function` to these concrete nodes yields a useful, well-typed candidate.
    ///
    /// Beyond type acceptance, arguments of commutative operators must be in non-decreasing
    /// handle order, and operators for which identical arguments are irrelevant reject them.
    pub fn accepts_arguments(&self, function: FunctionId, args: &[NodeId]) -> bool {
        let op = self.function_operator(function);
        if args.len() != op.arity()
            || !args
                .iter()
                .enumerate()
                .all(|(i, &arg)| op.accepts(i, self.node(arg).tp))
        {
            return false;
        }
        let flags = op.flags();
        if flags.commutative && args.windows(2).any(|w| w[1] < w[0]) {
            return false;
        }
        !(flags.all_same_args_irrelevant && !args.is_empty() && args.iter().all_equal())
    }

    /// Print a node in infix form. Non-leaf arguments are parenthesised.
    pub fn display(&self, node: NodeId) -> String {
        let n = self.node(node);
        match n.kind {
            NodeKind::Constant(v) => v.to_string(),
            NodeKind::Input { ref name, .. } => name.clone(),
            NodeKind::Apply { function, ref args } => {
                let f = self.function(function);
                let printed = args
                    .iter()
                    .map(|&arg| {
                        let s = self.display(arg);
                        if self.node(arg).is_leaf() {
                            s
                        } else {
                            format!("({})", s)
                        }
                    })
                    .collect_vec();
                self.operator(f.operator).format(&f.params, &printed)
            }
        }
    }
    /// Print a function as an RPN token: its operator name, followed by its parameters in
    /// brackets if it has any.
    pub fn display_function(&self, function: FunctionId) -> String {
        let f = self.function(function);
        let name = self.operator(f.operator).name();
        if f.params.is_empty() {
            name.to_owned()
        } else {
            format!("{}[{}]", name, f.params.iter().join(","))
        }
    }

    /// Evaluate a node on one example, given the values of the problem inputs by index.
    pub fn eval(&self, node: NodeId, inputs: &[Option<Value>]) -> Option<Value> {
        let n = self.node(node);
        match n.kind {
            NodeKind::Constant(v) => Some(v),
            NodeKind::Input { index, .. } => inputs.get(index).copied().flatten(),
            NodeKind::Apply { function, ref args } => {
                let values = args.iter().map(|&a| self.eval(a, inputs)).collect_vec();
                let f = self.function(function);
                self.operator(f.operator).eval(&f.params, &values)
            }
        }
    }
}
