//! A library for searching typed expressions, scoring them as weak learners, and discovering
//! formulas.
//!
//! Expressions are hash-consed nodes of a [`Universe`]. A [`Problem`] declares which leaves can
//! be pushed and which operators applied; the [`search`] module derives a deterministic
//! automaton over stacks of types from it, and samples or enumerates well-typed candidates. The
//! [`objective`] module scores candidates against supervision using values memoised by a
//! [`SampleCache`], thresholding numeric ones into stumps. The [`discovery`] module spends an
//! evaluation budget over equivalence classes of candidates with a multi-armed bandit.
//!
//! Good places to look are [`Problem`], [`search::ExhaustiveBuilder`] and
//! [`discovery::FormulaDiscovery`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use luape::objective::{BinaryClassificationObjective, LearningObjective};
//! use luape::{Problem, SampleCache, Type, Universe, Value};
//!
//! let mut universe = Universe::new();
//! let ops = universe.register_standard_operators();
//! let universe = Arc::new(universe);
//!
//! let mut problem = Problem::new(universe.clone());
//! problem.add_input("x", Type::Double);
//! problem.add_input("y", Type::Double);
//! problem.add_function(ops.sub).unwrap();
//!
//! let xs = [1.0, 4.0, 5.0, 6.0];
//! let ys = [3.0, 1.0, 6.0, 5.0];
//! let columns = vec![
//!     xs.iter().map(|&v| Some(Value::Double(v))).collect(),
//!     ys.iter().map(|&v| Some(Value::Double(v))).collect(),
//! ];
//! let cache = SampleCache::new(universe.clone(), columns).unwrap();
//! // x > y, which neither x nor y alone can threshold
//! let labels = vec![false, true, false, true];
//!
//! let perfect = problem
//!     .enumerate_nodes_exhaustively(4)
//!     .into_iter()
//!     .filter_map(|node| {
//!         let mut objective = BinaryClassificationObjective::new(labels.clone(), vec![0, 1, 2, 3]);
//!         objective.compute_objective_with_eventual_stump(&cache, node)
//!     })
//!     .find(|weak| weak.score == 1.0)
//!     .unwrap();
//! assert_eq!(universe.display(perfect.node), "(x - y) >= 0.0");
//! ```
//!
//! [`Universe`]: struct.Universe.html
//! [`Problem`]: struct.Problem.html
//! [`SampleCache`]: struct.SampleCache.html
//! [`search`]: search/index.html
//! [`objective`]: objective/index.html
//! [`discovery`]: discovery/index.html
//! [`search::ExhaustiveBuilder`]: search/struct.ExhaustiveBuilder.html
//! [`discovery::FormulaDiscovery`]: discovery/struct.FormulaDiscovery.html

mod cache;
pub mod discovery;
pub mod expression;
pub mod objective;
mod problem;
pub mod search;
mod types;

pub use crate::cache::{SampleCache, SampleVector};
pub use crate::expression::{
    parse_rpn, FunctionId, Node, NodeId, NodeKind, OperatorId, ParseError, RpnSequence,
    StandardOperators, Universe,
};
pub use crate::problem::{Problem, ProblemError};
pub use crate::types::{Type, Value};
