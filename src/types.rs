//! Types and values of the expression language.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// The type of an expression node.
///
/// Types form a small nominal hierarchy: [`PositiveInteger`] inherits from [`Integer`] and
/// [`Probability`] inherits from [`Double`]. Types are plain values, so a stack of types can be
/// used directly as a map key.
///
/// [`PositiveInteger`]: #variant.PositiveInteger
/// [`Integer`]: #variant.Integer
/// [`Probability`]: #variant.Probability
/// [`Double`]: #variant.Double
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Type {
    Boolean,
    Integer,
    PositiveInteger,
    Double,
    Probability,
    /// A finite enumeration. Values are `0..cardinality`.
    Enumeration { id: u16, cardinality: u16 },
}
impl Type {
    /// Whether `self` is `base` or one of its subtypes.
    ///
    /// # Examples
    ///
    /// ```
    /// use luape::Type;
    ///
    /// assert!(Type::Probability.inherits_from(Type::Double));
    /// assert!(Type::PositiveInteger.inherits_from(Type::Integer));
    /// assert!(!Type::Double.inherits_from(Type::Probability));
    /// ```
    pub fn inherits_from(self, base: Type) -> bool {
        self == base
            || matches!(
                (self, base),
                (Type::PositiveInteger, Type::Integer) | (Type::Probability, Type::Double)
            )
    }
    pub fn is_convertible_to_double(self) -> bool {
        self.inherits_from(Type::Double) || self.inherits_from(Type::Integer)
    }
    pub fn is_enumeration(self) -> bool {
        matches!(self, Type::Enumeration { .. })
    }
    /// The type a literal gets when none is given explicitly. Enumeration values carry no
    /// enumeration, so they have no default type.
    pub fn of(value: &Value) -> Option<Type> {
        match *value {
            Value::Boolean(_) => Some(Type::Boolean),
            Value::Integer(_) => Some(Type::Integer),
            Value::Double(_) => Some(Type::Double),
            Value::Enum(_) => None,
        }
    }
}
impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Type::Boolean => write!(f, "boolean"),
            Type::Integer => write!(f, "integer"),
            Type::PositiveInteger => write!(f, "positiveInteger"),
            Type::Double => write!(f, "double"),
            Type::Probability => write!(f, "probability"),
            Type::Enumeration { id, cardinality } => write!(f, "enum{}[{}]", id, cardinality),
        }
    }
}

/// A literal value. Missing values are represented with `Option<Value>::None` wherever they can
/// occur.
///
/// Doubles compare and hash by their bit pattern, so values can be interned and used as operator
/// parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Integer(i64),
    Double(f64),
    Enum(u16),
}
impl Value {
    pub fn to_f64(self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(i as f64),
            Value::Double(x) => Some(x),
            Value::Boolean(_) | Value::Enum(_) => None,
        }
    }
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(b),
            _ => None,
        }
    }
    fn rank(&self) -> u8 {
        match self {
            Value::Boolean(_) => 0,
            Value::Integer(_) => 1,
            Value::Double(_) => 2,
            Value::Enum(_) => 3,
        }
    }
}
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::Enum(a), Value::Enum(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for Value {}
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match *self {
            Value::Boolean(b) => b.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Double(x) => x.to_bits().hash(state),
            Value::Enum(e) => e.hash(state),
        }
    }
}
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
            (Value::Enum(a), Value::Enum(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match *self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Double(x) => write!(f, "{:?}", x),
            Value::Enum(e) => write!(f, "{}", e),
        }
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}
impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}
impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn convertible_to_double() {
        assert!(Type::Double.is_convertible_to_double());
        assert!(Type::Probability.is_convertible_to_double());
        assert!(Type::PositiveInteger.is_convertible_to_double());
        assert!(!Type::Boolean.is_convertible_to_double());
        let e = Type::Enumeration {
            id: 1,
            cardinality: 3,
        };
        assert!(!e.is_convertible_to_double());
        assert!(e.is_enumeration());
    }

    #[test]
    fn doubles_hash_by_bits() {
        let mut set = HashSet::new();
        set.insert(Value::Double(1.0));
        set.insert(Value::Double(1.0));
        set.insert(Value::Double(f64::NAN));
        set.insert(Value::Double(f64::NAN));
        set.insert(Value::Integer(1));
        assert_eq!(set.len(), 3);
        assert_eq!(Value::Double(1.0).to_string(), "1.0");
    }
}
