//! Typed generation of candidate expressions.
//!
//! A candidate is built by a sequence of actions: push a leaf, apply a function to the nodes on
//! top of the stack, and finally yield the single remaining node. The number of actions,
//! including the yield, is the candidate's complexity. The [`TypeSearchSpace`] restricts the
//! sequences to well-typed ones; [`StochasticBuilder`] samples them and [`ExhaustiveBuilder`]
//! enumerates them.
//!
//! [`TypeSearchSpace`]: struct.TypeSearchSpace.html
//! [`StochasticBuilder`]: struct.StochasticBuilder.html
//! [`ExhaustiveBuilder`]: struct.ExhaustiveBuilder.html

mod builder;
mod space;

pub use self::builder::{
    enumerate_iter, Action, Backup, BuildOutcome, BuildParams, ExhaustiveBuilder,
    NodeBuilderState, StochasticBuilder,
};
pub use self::space::{StateId, TypeSearchSpace, TypeState};
