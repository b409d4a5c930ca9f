//! Reverse-polish views of expressions: the push/apply sequence that builds a node, and a parser
//! for the textual form of such sequences.

use itertools::Itertools;
use winnow::{
    ascii::{multispace0, multispace1},
    combinator::{delimited, opt, separated},
    prelude::*,
    token::take_while,
};

use super::{FunctionId, NodeId, NodeKind, Operator, Universe};
use crate::types::{Type, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpnSymbol {
    Push(NodeId),
    Apply(FunctionId),
}

/// A construction sequence in reverse-polish order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RpnSequence(Vec<RpnSymbol>);
impl RpnSequence {
    /// The post-order sequence that rebuilds `node` from its leaves.
    pub fn from_node(universe: &Universe, node: NodeId) -> Self {
        let mut symbols = Vec::new();
        push_symbols(universe, node, &mut symbols);
        RpnSequence(symbols)
    }
    pub fn symbols(&self) -> &[RpnSymbol] {
        &self.0
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn starts_with(&self, prefix: &RpnSequence) -> bool {
        self.0.starts_with(&prefix.0)
    }
    /// Replay the sequence. `None` if it does not leave exactly one node on the stack.
    pub fn to_node(&self, universe: &Universe) -> Option<NodeId> {
        let mut stack = Vec::new();
        for symbol in &self.0 {
            match *symbol {
                RpnSymbol::Push(node) => stack.push(node),
                RpnSymbol::Apply(function) => {
                    let arity = universe.function_operator(function).arity();
                    if stack.len() < arity {
                        return None;
                    }
                    let args = stack.split_off(stack.len() - arity);
                    stack.push(universe.make_apply(function, args));
                }
            }
        }
        if stack.len() == 1 {
            stack.pop()
        } else {
            None
        }
    }
    pub fn display(&self, universe: &Universe) -> String {
        self.0
            .iter()
            .map(|symbol| match *symbol {
                RpnSymbol::Push(node) => universe.display(node),
                RpnSymbol::Apply(function) => universe.display_function(function),
            })
            .join(" ")
    }
}

fn push_symbols(universe: &Universe, node: NodeId, symbols: &mut Vec<RpnSymbol>) {
    let n = universe.node(node);
    match n.kind() {
        NodeKind::Apply { function, args } => {
            for &arg in args {
                push_symbols(universe, arg, symbols);
            }
            symbols.push(RpnSymbol::Apply(*function));
        }
        _ => symbols.push(RpnSymbol::Push(node)),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParseError {
    UnknownSymbol(String),
    BadParameter(String, String),
    StackUnderflow(String),
    TypeRejected(String, Type),
    LeftoverStack(usize),
    Other(String),
}
impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match *self {
            ParseError::UnknownSymbol(ref s) => write!(f, "unknown symbol {}", s),
            ParseError::BadParameter(ref op, ref p) => {
                write!(f, "invalid parameters [{}] for {}", p, op)
            }
            ParseError::StackUnderflow(ref op) => write!(f, "not enough arguments for {}", op),
            ParseError::TypeRejected(ref op, tp) => write!(f, "{} does not accept {}", op, tp),
            ParseError::LeftoverStack(n) => {
                write!(f, "expression leaves {} values on the stack instead of 1", n)
            }
            ParseError::Other(ref err) => write!(f, "could not parse: {}", err),
        }
    }
}
impl std::error::Error for ParseError {}

#[derive(Debug)]
struct Token {
    name: String,
    params: Vec<String>,
}

fn is_symbol_char(c: char) -> bool {
    !c.is_whitespace() && c != '[' && c != ']' && c != ','
}

fn parse_param(input: &mut &str) -> PResult<String> {
    let param = take_while(1.., is_symbol_char).parse_next(input)?;
    Ok(param.to_owned())
}

fn parse_token(input: &mut &str) -> PResult<Token> {
    let name = take_while(1.., is_symbol_char).parse_next(input)?;
    let params: Option<Vec<String>> =
        opt(delimited('[', separated(1.., parse_param, ','), ']')).parse_next(input)?;
    Ok(Token {
        name: name.to_owned(),
        params: params.unwrap_or_default(),
    })
}

fn parse_tokens(input: &mut &str) -> PResult<Vec<Token>> {
    delimited(
        multispace0,
        separated(1.., parse_token, multispace1),
        multispace0,
    )
    .parse_next(input)
}

fn literal(text: &str) -> Option<(Value, Type)> {
    match text {
        "true" => Some((Value::Boolean(true), Type::Boolean)),
        "false" => Some((Value::Boolean(false), Type::Boolean)),
        _ => {
            if let Ok(i) = text.parse::<i64>() {
                Some((Value::Integer(i), Type::Integer))
            } else {
                text.parse::<f64>()
                    .ok()
                    .map(|x| (Value::Double(x), Type::Double))
            }
        }
    }
}

fn parameter(
    op: &dyn Operator,
    index: usize,
    input_types: &[Type],
    text: &str,
) -> Result<Value, ParseError> {
    let bad = || ParseError::BadParameter(op.name().to_owned(), text.to_owned());
    let candidates = op.candidate_parameter_values(index, input_types);
    if candidates.is_empty() {
        text.parse::<f64>().map(Value::Double).map_err(|_| bad())
    } else {
        candidates
            .into_iter()
            .find(|v| v.to_string() == text)
            .ok_or_else(bad)
    }
}

/// Parse a whitespace-separated RPN sequence into a node.
///
/// Each token is, in order of precedence: one of `leaves` (matched by printed form), an operator
/// name with optional bracketed parameters (`stump[2.5]`), or a literal (`true`, `3`, `1.5`).
///
/// # Examples
///
/// ```
/// use luape::{parse_rpn, Type, Universe, Value};
///
/// let mut universe = Universe::new();
/// universe.register_standard_operators();
/// let x = universe.make_input(0, "x", Type::Double);
/// let one = universe.make_constant(Value::Double(1.0), Type::Double);
///
/// let node = parse_rpn(&universe, &[x, one], "1.0 x + stump[2.5]").unwrap();
/// assert_eq!(universe.display(node), "(x + 1.0) >= 2.5");
/// ```
pub fn parse_rpn(universe: &Universe, leaves: &[NodeId], text: &str) -> Result<NodeId, ParseError> {
    let tokens = parse_tokens
        .parse(text)
        .map_err(|err| ParseError::Other(err.to_string()))?;
    let mut stack: Vec<NodeId> = Vec::new();
    for token in tokens {
        if token.params.is_empty() {
            if let Some(&leaf) = leaves.iter().find(|&&l| universe.display(l) == token.name) {
                stack.push(leaf);
                continue;
            }
        }
        if let Some(op_id) = universe.find_operator(&token.name) {
            let op = universe.operator(op_id);
            let arity = op.arity();
            if arity == 0 || stack.len() < arity {
                return Err(ParseError::StackUnderflow(token.name));
            }
            let args = stack.split_off(stack.len() - arity);
            let types = args.iter().map(|&a| universe.node(a).tp()).collect_vec();
            if let Some((_, &tp)) = types.iter().enumerate().find(|&(i, &tp)| !op.accepts(i, tp)) {
                return Err(ParseError::TypeRejected(token.name, tp));
            }
            if token.params.len() != op.num_parameters() {
                return Err(ParseError::BadParameter(
                    token.name,
                    token.params.join(","),
                ));
            }
            let params = token
                .params
                .iter()
                .enumerate()
                .map(|(i, text)| parameter(op, i, &types, text))
                .collect::<Result<Vec<_>, _>>()?;
            let function = universe.make_function(op_id, params);
            stack.push(universe.make_apply(function, args));
        } else {
            match literal(&token.name) {
                Some((value, tp)) if token.params.is_empty() => {
                    stack.push(universe.make_constant(value, tp))
                }
                _ => return Err(ParseError::UnknownSymbol(token.name)),
            }
        }
    }
    if stack.len() == 1 {
        Ok(stack[0])
    } else {
        Err(ParseError::LeftoverStack(stack.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Universe, Vec<NodeId>) {
        let mut universe = Universe::new();
        universe.register_standard_operators();
        let x = universe.make_input(0, "x", Type::Double);
        let e = universe.make_input(
            1,
            "e",
            Type::Enumeration {
                id: 0,
                cardinality: 4,
            },
        );
        let one = universe.make_constant(Value::Double(1.0), Type::Double);
        (universe, vec![x, e, one])
    }

    #[test]
    fn sequence_roundtrips_through_text() {
        let (universe, leaves) = setup();
        let node = parse_rpn(&universe, &leaves, "x 1.0 - x /").unwrap();
        let seq = RpnSequence::from_node(&universe, node);
        assert_eq!(seq.len(), 5);
        assert_eq!(seq.display(&universe), "x 1.0 - x /");
        assert_eq!(universe.display(node), "(x - 1.0) / x");

        let commuted = parse_rpn(&universe, &leaves, "x 1.0 - x *").unwrap();
        let seq = RpnSequence::from_node(&universe, commuted);
        assert_eq!(seq.display(&universe), "x x 1.0 - *");
        assert_eq!(seq.to_node(&universe), Some(node));
        assert_eq!(parse_rpn(&universe, &leaves, &seq.display(&universe)), Ok(node));
    }

    #[test]
    fn enum_parameters_use_candidates() {
        let (universe, leaves) = setup();
        let node = parse_rpn(&universe, &leaves, "e eqenum[3]").unwrap();
        assert_eq!(universe.display(node), "e == 3");
        assert_eq!(universe.node(node).tp(), Type::Boolean);
        assert_eq!(
            parse_rpn(&universe, &leaves, "e eqenum[9]"),
            Err(ParseError::BadParameter("eqenum".to_owned(), "9".to_owned()))
        );
    }

    #[test]
    fn malformed_sequences() {
        let (universe, leaves) = setup();
        assert_eq!(
            parse_rpn(&universe, &leaves, "x +"),
            Err(ParseError::StackUnderflow("+".to_owned()))
        );
        assert_eq!(
            parse_rpn(&universe, &leaves, "x x"),
            Err(ParseError::LeftoverStack(2))
        );
        assert_eq!(
            parse_rpn(&universe, &leaves, "x e +"),
            Err(ParseError::TypeRejected(
                "+".to_owned(),
                Type::Enumeration {
                    id: 0,
                    cardinality: 4
                }
            ))
        );
        assert_eq!(
            parse_rpn(&universe, &leaves, "y"),
            Err(ParseError::UnknownSymbol("y".to_owned()))
        );
    }
}
