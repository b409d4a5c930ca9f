//! Per-example values of nodes over a fixed set of training examples.

use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::expression::{NodeId, NodeKind, Universe};
use crate::problem::ProblemError;
use crate::types::Value;

/// The values of a node on a list of examples, in the order of that list.
pub type SampleVector = Vec<Option<Value>>;

struct Column {
    values: Vec<Option<Value>>,
    sorted: OnceCell<Vec<(usize, f64)>>,
}
impl Column {
    fn new(values: Vec<Option<Value>>) -> Self {
        Column {
            values,
            sorted: OnceCell::new(),
        }
    }
    /// `(example, value)` for every finite numeric value, ascending by value then example.
    fn sorted(&self) -> &[(usize, f64)] {
        self.sorted.get_or_init(|| {
            let mut sorted: Vec<_> = self
                .values
                .iter()
                .enumerate()
                .filter_map(|(i, v)| {
                    v.and_then(Value::to_f64)
                        .filter(|x| x.is_finite())
                        .map(|x| (i, x))
                })
                .collect();
            sorted.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
            sorted
        })
    }
}

/// Memoised node values over the examples of a data set.
///
/// Inputs are given column-wise. The column of any other node is computed once, bottom-up
/// through [`Operator::eval_batch`], and kept for the lifetime of the cache. Columns are only
/// ever inserted, so a cache may be shared between threads evaluating different candidates.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use luape::{SampleCache, Type, Universe, Value};
///
/// let mut universe = Universe::new();
/// let ops = universe.register_standard_operators();
/// let x = universe.make_input(0, "x", Type::Double);
/// let sq = universe.make_apply(universe.make_function(ops.mul, vec![]), vec![x, x]);
/// let universe = Arc::new(universe);
///
/// let column = vec![Some(Value::Double(3.0)), None, Some(Value::Double(-1.0))];
/// let cache = SampleCache::new(universe, vec![column]).unwrap();
/// assert_eq!(
///     cache.samples(sq, &[2, 1, 0]),
///     Some(vec![Some(Value::Double(1.0)), None, Some(Value::Double(9.0))])
/// );
/// // positions in the requested example list, ascending by value
/// assert_eq!(cache.sorted_double_values(x, &[0, 1, 2]), Some(vec![(2, -1.0), (0, 3.0)]));
/// ```
///
/// [`Operator::eval_batch`]: expression/trait.Operator.html#method.eval_batch
pub struct SampleCache {
    universe: Arc<Universe>,
    num_examples: usize,
    inputs: Vec<Arc<Column>>,
    columns: RwLock<HashMap<NodeId, Arc<Column>>>,
}
impl SampleCache {
    /// `inputs[i][e]` is the value of input `i` on example `e`.
    pub fn new(
        universe: Arc<Universe>,
        inputs: Vec<Vec<Option<Value>>>,
    ) -> Result<Self, ProblemError> {
        let num_examples = inputs.first().map_or(0, |c| c.len());
        if let Some((input, column)) = inputs
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != num_examples)
        {
            return Err(ProblemError::InconsistentColumns {
                input,
                expected: num_examples,
                found: column.len(),
            });
        }
        Ok(SampleCache {
            universe,
            num_examples,
            inputs: inputs.into_iter().map(|c| Arc::new(Column::new(c))).collect(),
            columns: RwLock::default(),
        })
    }
    pub fn universe(&self) -> &Arc<Universe> {
        &self.universe
    }
    pub fn num_examples(&self) -> usize {
        self.num_examples
    }
    /// Number of memoised non-input columns.
    pub fn num_cached_nodes(&self) -> usize {
        self.columns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn column(&self, node: NodeId) -> Option<Arc<Column>> {
        if node.index() >= self.universe.num_nodes() {
            return None;
        }
        if let Some(column) = self
            .columns
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&node)
        {
            return Some(Arc::clone(column));
        }
        let n = self.universe.node(node);
        let values = match *n.kind() {
            NodeKind::Input { index, .. } => return self.inputs.get(index).cloned(),
            NodeKind::Constant(value) => vec![Some(value); self.num_examples],
            NodeKind::Apply { function, ref args } => {
                let args = args
                    .iter()
                    .map(|&arg| self.column(arg))
                    .collect::<Option<Vec<_>>>()?;
                let columns: Vec<&[Option<Value>]> =
                    args.iter().map(|c| c.values.as_slice()).collect();
                let f = self.universe.function(function);
                self.universe
                    .operator(f.operator())
                    .eval_batch(f.params(), &columns)
            }
        };
        let mut cache = self
            .columns
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let column = cache
            .entry(node)
            .or_insert_with(|| Arc::new(Column::new(values)));
        Some(Arc::clone(column))
    }

    /// The values of `node` on `examples`. `None` if the node cannot be evaluated by this cache.
    pub fn samples(&self, node: NodeId, examples: &[usize]) -> Option<SampleVector> {
        let column = self.column(node)?;
        Some(
            examples
                .iter()
                .map(|&e| column.values.get(e).copied().flatten())
                .collect(),
        )
    }

    /// The numeric values of `node` on `examples` as `(position in examples, value)` pairs sorted
    /// by value, ties by example. Missing and non-finite values are left out. `None` if the
    /// node's type is not convertible to double or it cannot be evaluated.
    ///
    /// Example indices are expected to be distinct.
    pub fn sorted_double_values(
        &self,
        node: NodeId,
        examples: &[usize],
    ) -> Option<Vec<(usize, f64)>> {
        let column = self.column(node)?;
        if !self.universe.node(node).tp().is_convertible_to_double() {
            return None;
        }
        let mut positions = vec![None; self.num_examples];
        for (position, &e) in examples.iter().enumerate() {
            if let Some(slot) = positions.get_mut(e) {
                *slot = Some(position);
            }
        }
        Some(
            column
                .sorted()
                .iter()
                .filter_map(|&(e, x)| positions[e].map(|p| (p, x)))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn doubles(xs: &[f64]) -> Vec<Option<Value>> {
        xs.iter().map(|&x| Some(Value::Double(x))).collect()
    }

    #[test]
    fn columns_are_memoised() {
        let mut universe = Universe::new();
        let ops = universe.register_standard_operators();
        let x = universe.make_input(0, "x", Type::Double);
        let y = universe.make_input(1, "y", Type::Double);
        let add = universe.make_function(ops.add, vec![]);
        let greater = universe.make_function(ops.greater, vec![]);
        let sum = universe.make_apply(add, vec![x, y]);
        let cmp = universe.make_apply(greater, vec![sum, x]);
        let cache = SampleCache::new(
            Arc::new(universe),
            vec![doubles(&[1.0, 2.0]), doubles(&[-1.0, 1.0])],
        )
        .unwrap();
        assert_eq!(
            cache.samples(cmp, &[0, 1]),
            Some(vec![Some(Value::Boolean(false)), Some(Value::Boolean(true))])
        );
        assert_eq!(cache.num_cached_nodes(), 2);
        cache.samples(sum, &[1]);
        assert_eq!(cache.num_cached_nodes(), 2);
        assert_eq!(cache.sorted_double_values(cmp, &[0, 1]), None);
    }

    #[test]
    fn sorted_values_of_subsets() {
        let mut universe = Universe::new();
        let x = universe.make_input(0, "x", Type::Double);
        universe.register_standard_operators();
        let mut column = doubles(&[5.0, 2.0, 2.0, 1.0, f64::NAN]);
        column.push(None);
        let cache = SampleCache::new(Arc::new(universe), vec![column]).unwrap();
        assert_eq!(
            cache.sorted_double_values(x, &[0, 1, 2, 3, 4, 5]),
            Some(vec![(3, 1.0), (1, 2.0), (2, 2.0), (0, 5.0)])
        );
        assert_eq!(
            cache.sorted_double_values(x, &[2, 0, 5]),
            Some(vec![(0, 2.0), (1, 5.0)])
        );
    }

    #[test]
    fn inconsistent_columns() {
        let err = SampleCache::new(
            Arc::new(Universe::new()),
            vec![doubles(&[1.0, 2.0]), doubles(&[1.0])],
        )
        .err();
        assert_eq!(
            err,
            Some(ProblemError::InconsistentColumns {
                input: 1,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn foreign_nodes_are_not_computable() {
        let other = Universe::new();
        let a = other.make_input(0, "a", Type::Double);
        let b = other.make_input(1, "b", Type::Double);
        let cache = SampleCache::new(Arc::new(Universe::new()), vec![doubles(&[1.0])]).unwrap();
        assert_eq!(cache.samples(a, &[0]), None);
        assert_eq!(cache.samples(b, &[0]), None);
    }
}
