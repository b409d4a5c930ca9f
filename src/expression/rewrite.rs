//! Canonicalisation rules applied whenever an application node is constructed.

use super::{FunctionId, NodeId, Universe};

/// The outcome of a successful rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rewrite {
    /// Use this existing node instead.
    Node(NodeId),
    /// Construct this application instead.
    Apply(FunctionId, Vec<NodeId>),
}

/// A rewrite rule evaluated by [`Universe::make_apply`] before a node is interned.
///
/// Rules run in registration order; each rule sees the output of the previous one. A rule that
/// returns [`Rewrite::Node`] ends construction.
///
/// [`Universe::make_apply`]: ../struct.Universe.html#method.make_apply
/// [`Rewrite::Node`]: enum.Rewrite.html#variant.Node
pub trait RewriteRule: Send + Sync {
    fn name(&self) -> &str;
    fn rewrite(&self, universe: &Universe, function: FunctionId, args: &[NodeId])
        -> Option<Rewrite>;
}

/// Sorts the arguments of commutative operators by handle, so `1.0 + x` and `x + 1.0` are the
/// same node.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommutativeOrdering;
impl RewriteRule for CommutativeOrdering {
    fn name(&self) -> &str {
        "commutative-ordering"
    }
    fn rewrite(
        &self,
        universe: &Universe,
        function: FunctionId,
        args: &[NodeId],
    ) -> Option<Rewrite> {
        if !universe.function_operator(function).flags().commutative
            || args.windows(2).all(|w| w[0] <= w[1])
        {
            return None;
        }
        let mut sorted = args.to_vec();
        sorted.sort_unstable();
        Some(Rewrite::Apply(function, sorted))
    }
}

/// Replaces applications whose arguments are all constants by the constant they evaluate to.
/// Applications that evaluate to a missing value are left alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConstantFolding;
impl RewriteRule for ConstantFolding {
    fn name(&self) -> &str {
        "constant-folding"
    }
    fn rewrite(
        &self,
        universe: &Universe,
        function: FunctionId,
        args: &[NodeId],
    ) -> Option<Rewrite> {
        let values = args
            .iter()
            .map(|&arg| universe.node(arg).constant_value().map(Some))
            .collect::<Option<Vec<_>>>()?;
        let f = universe.function(function);
        let op = universe.operator(f.operator());
        let value = op.eval(f.params(), &values)?;
        let types: Vec<_> = args.iter().map(|&arg| universe.node(arg).tp()).collect();
        let tp = universe.output_type(function, &types);
        Some(Rewrite::Node(universe.make_constant(value, tp)))
    }
}
