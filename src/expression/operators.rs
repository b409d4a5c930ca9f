//! The operator interface and the built-in operator library.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Type, Value};

/// Capabilities of an operator, used when deciding which applications are redundant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorFlags {
    /// `f(x1..xn) = f(x_p1..x_pn)` for any permutation `p`.
    pub commutative: bool,
    /// Applying the operator to `n` copies of the same argument is uninteresting (`x - x`,
    /// `x / x`, `x > x`, ...).
    pub all_same_args_irrelevant: bool,
}

/// A typed, fixed-arity primitive usable inside application nodes.
///
/// Operators may carry internal parameters (e.g. the threshold of a stump). Parameters are not
/// stored in the operator: an operator together with concrete parameter values forms a
/// [`Function`], which the [`Universe`] interns, so every method receives the parameters
/// explicitly.
///
/// [`Function`]: struct.Function.html
/// [`Universe`]: struct.Universe.html
pub trait Operator: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn arity(&self) -> usize;
    /// Whether argument `arg` may have type `tp`.
    fn accepts(&self, arg: usize, tp: Type) -> bool;
    /// The output type, given parameters and argument types that passed [`accepts`].
    ///
    /// [`accepts`]: #tymethod.accepts
    fn output_type(&self, params: &[Value], inputs: &[Type]) -> Type;
    fn eval(&self, params: &[Value], inputs: &[Option<Value>]) -> Option<Value>;

    fn num_parameters(&self) -> usize {
        0
    }
    /// Every value parameter `param` may take for these argument types. An empty list means the
    /// operator cannot be instantiated by enumeration.
    fn candidate_parameter_values(&self, _param: usize, _inputs: &[Type]) -> Vec<Value> {
        Vec::new()
    }
    fn flags(&self) -> OperatorFlags {
        OperatorFlags::default()
    }
    /// Evaluate over whole columns of examples. All columns have the same length.
    fn eval_batch(&self, params: &[Value], columns: &[&[Option<Value>]]) -> Vec<Option<Value>> {
        let n = columns.first().map_or(0, |c| c.len());
        let mut inputs = vec![None; columns.len()];
        (0..n)
            .map(|i| {
                for (slot, column) in inputs.iter_mut().zip(columns) {
                    *slot = column[i];
                }
                self.eval(params, &inputs)
            })
            .collect()
    }
    /// Print an application given its already printed arguments.
    fn format(&self, params: &[Value], args: &[String]) -> String {
        if params.is_empty() {
            format!("{}({})", self.name(), args.iter().join(", "))
        } else {
            format!(
                "{}[{}]({})",
                self.name(),
                params.iter().join(", "),
                args.iter().join(", ")
            )
        }
    }
}

fn binary_double(inputs: &[Option<Value>], f: impl Fn(f64, f64) -> f64) -> Option<Value> {
    let a = inputs[0]?.to_f64()?;
    let b = inputs[1]?.to_f64()?;
    Some(Value::Double(f(a, b)))
}

fn binary_boolean(inputs: &[Option<Value>], f: impl Fn(bool, bool) -> bool) -> Option<Value> {
    let a = inputs[0]?.as_bool()?;
    let b = inputs[1]?.as_bool()?;
    Some(Value::Boolean(f(a, b)))
}

macro_rules! double_operator {
    ($name:ident, $symbol:expr, $flags:expr, $f:expr) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;
        impl Operator for $name {
            fn name(&self) -> &str {
                $symbol
            }
            fn arity(&self) -> usize {
                2
            }
            fn accepts(&self, _arg: usize, tp: Type) -> bool {
                tp.inherits_from(Type::Double)
            }
            fn output_type(&self, _params: &[Value], _inputs: &[Type]) -> Type {
                Type::Double
            }
            fn eval(&self, _params: &[Value], inputs: &[Option<Value>]) -> Option<Value> {
                binary_double(inputs, $f)
            }
            fn flags(&self) -> OperatorFlags {
                $flags
            }
            fn format(&self, _params: &[Value], args: &[String]) -> String {
                format!("{} {} {}", args[0], $symbol, args[1])
            }
        }
    };
}

const COMMUTATIVE: OperatorFlags = OperatorFlags {
    commutative: true,
    all_same_args_irrelevant: false,
};
const SAME_ARGS_IRRELEVANT: OperatorFlags = OperatorFlags {
    commutative: false,
    all_same_args_irrelevant: true,
};
const BOTH: OperatorFlags = OperatorFlags {
    commutative: true,
    all_same_args_irrelevant: true,
};

double_operator!(Add, "+", COMMUTATIVE, |a, b| a + b);
double_operator!(Sub, "-", SAME_ARGS_IRRELEVANT, |a, b| a - b);
double_operator!(Mul, "*", COMMUTATIVE, |a, b| a * b);
double_operator!(Div, "/", SAME_ARGS_IRRELEVANT, |a, b| if b == 0.0 {
    0.0
} else {
    a / b
});

/// `a > b` over doubles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Greater;
impl Operator for Greater {
    fn name(&self) -> &str {
        ">"
    }
    fn arity(&self) -> usize {
        2
    }
    fn accepts(&self, _arg: usize, tp: Type) -> bool {
        tp.inherits_from(Type::Double)
    }
    fn output_type(&self, _params: &[Value], _inputs: &[Type]) -> Type {
        Type::Boolean
    }
    fn eval(&self, _params: &[Value], inputs: &[Option<Value>]) -> Option<Value> {
        let a = inputs[0]?.to_f64()?;
        let b = inputs[1]?.to_f64()?;
        Some(Value::Boolean(a > b))
    }
    fn flags(&self) -> OperatorFlags {
        SAME_ARGS_IRRELEVANT
    }
    fn format(&self, _params: &[Value], args: &[String]) -> String {
        format!("{} > {}", args[0], args[1])
    }
}

macro_rules! boolean_operator {
    ($name:ident, $symbol:expr, $f:expr) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;
        impl Operator for $name {
            fn name(&self) -> &str {
                $symbol
            }
            fn arity(&self) -> usize {
                2
            }
            fn accepts(&self, _arg: usize, tp: Type) -> bool {
                tp.inherits_from(Type::Boolean)
            }
            fn output_type(&self, _params: &[Value], _inputs: &[Type]) -> Type {
                Type::Boolean
            }
            fn eval(&self, _params: &[Value], inputs: &[Option<Value>]) -> Option<Value> {
                binary_boolean(inputs, $f)
            }
            fn flags(&self) -> OperatorFlags {
                BOTH
            }
            fn format(&self, _params: &[Value], args: &[String]) -> String {
                format!("{} {} {}", args[0], $symbol, args[1])
            }
        }
    };
}

boolean_operator!(And, "&&", |a, b| a && b);
boolean_operator!(EqualBoolean, "==", |a, b| a == b);

/// Tests an enumerated value against one fixed enumeration value, its single parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualsEnum;
impl Operator for EqualsEnum {
    fn name(&self) -> &str {
        "eqenum"
    }
    fn arity(&self) -> usize {
        1
    }
    fn accepts(&self, _arg: usize, tp: Type) -> bool {
        tp.is_enumeration()
    }
    fn output_type(&self, _params: &[Value], _inputs: &[Type]) -> Type {
        Type::Boolean
    }
    fn eval(&self, params: &[Value], inputs: &[Option<Value>]) -> Option<Value> {
        let x = inputs[0]?;
        Some(Value::Boolean(x == params[0]))
    }
    fn num_parameters(&self) -> usize {
        1
    }
    fn candidate_parameter_values(&self, _param: usize, inputs: &[Type]) -> Vec<Value> {
        match inputs.first() {
            Some(Type::Enumeration { cardinality, .. }) => (0..*cardinality).map(Value::Enum).collect(),
            _ => Vec::new(),
        }
    }
    fn format(&self, params: &[Value], args: &[String]) -> String {
        format!("{} == {}", args[0], params[0])
    }
}

/// A decision stump: `value >= threshold`, where the threshold is the single parameter.
///
/// Stumps are usually created by threshold search rather than enumerated. A stump with fixed
/// candidate thresholds can still be placed in an operator library, in which case one apply
/// action per threshold is offered.
#[derive(Debug, Clone, Default)]
pub struct Stump {
    pub candidate_thresholds: Vec<f64>,
}
impl Operator for Stump {
    fn name(&self) -> &str {
        "stump"
    }
    fn arity(&self) -> usize {
        1
    }
    fn accepts(&self, _arg: usize, tp: Type) -> bool {
        tp.is_convertible_to_double()
    }
    fn output_type(&self, _params: &[Value], _inputs: &[Type]) -> Type {
        Type::Boolean
    }
    fn eval(&self, params: &[Value], inputs: &[Option<Value>]) -> Option<Value> {
        let x = inputs[0]?.to_f64()?;
        let threshold = params[0].to_f64()?;
        Some(Value::Boolean(x >= threshold))
    }
    fn num_parameters(&self) -> usize {
        1
    }
    fn candidate_parameter_values(&self, _param: usize, _inputs: &[Type]) -> Vec<Value> {
        self.candidate_thresholds
            .iter()
            .map(|&t| Value::Double(t))
            .collect()
    }
    fn format(&self, params: &[Value], args: &[String]) -> String {
        format!("{} >= {}", args[0], params[0])
    }
}
