use log::debug;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use super::BanditPool;
use crate::expression::{NodeId, RpnSequence, Universe};
use crate::types::Value;

/// A behavioral fingerprint of a node: its quantized values on a fixed list of examples.
///
/// # Examples
///
/// ```
/// use luape::Value;
/// use luape::discovery::BinaryKey;
///
/// let bits = [true, false, true].map(|b| Some(Value::Boolean(b)));
/// assert_eq!(BinaryKey::from_samples(&bits).unwrap().as_bytes(), &[0b101]);
/// // 0.1 and 0.1000001 are not told apart
/// let a = BinaryKey::from_samples(&[Some(Value::Double(0.1))]);
/// let b = BinaryKey::from_samples(&[Some(Value::Double(0.1000001))]);
/// assert_eq!(a, b);
/// let c = BinaryKey::from_samples(&[Some(Value::Double(0.10001))]);
/// assert_ne!(a, c);
/// assert!(BinaryKey::from_samples(&[Some(Value::Double(f64::NAN))]).is_none());
/// assert!(BinaryKey::from_samples(&[None]).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BinaryKey(Vec<u8>);
impl BinaryKey {
    /// `None` if any value is missing or not finite.
    pub fn from_samples(samples: &[Option<Value>]) -> Option<Self> {
        let mut bytes = Vec::new();
        let (mut bits, mut num_bits) = (0u8, 0);
        for value in samples {
            match (*value)? {
                Value::Boolean(b) => {
                    if b {
                        bits |= 1 << num_bits;
                    }
                    num_bits += 1;
                    if num_bits == 8 {
                        bytes.push(bits);
                        bits = 0;
                        num_bits = 0;
                    }
                }
                Value::Integer(i) => bytes.extend_from_slice(&quantize(i as f64)?),
                Value::Double(x) => bytes.extend_from_slice(&quantize(x)?),
                Value::Enum(e) => bytes.extend_from_slice(&e.to_le_bytes()),
            }
        }
        if num_bits > 0 {
            bytes.push(bits);
        }
        Some(BinaryKey(bytes))
    }
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Rounds to five decimals. Magnitudes beyond the range of `i64` are not keyed.
fn quantize(x: f64) -> Option<[u8; 8]> {
    let scaled = (x * 1e5).round();
    if scaled.is_finite() && scaled.abs() < i64::MAX as f64 {
        Some((scaled as i64).to_le_bytes())
    } else {
        None
    }
}

/// Orders candidate representatives: smaller trees first, then constants before inputs before
/// applications, then by constant value, then by printed form.
pub fn representative_order(universe: &Universe, a: NodeId, b: NodeId) -> Ordering {
    let (na, nb) = (universe.node(a), universe.node(b));
    na.tree_size()
        .cmp(&nb.tree_size())
        .then(na.kind_rank().cmp(&nb.kind_rank()))
        .then_with(|| na.constant_value().cmp(&nb.constant_value()))
        .then_with(|| universe.display(a).cmp(&universe.display(b)))
}

/// Nodes that behave identically on the key examples, with the RPN sequences that build them.
#[derive(Debug, Clone, PartialEq)]
pub struct EquivalenceClass {
    key: Option<BinaryKey>,
    elements: Vec<NodeId>,
    members: HashSet<NodeId>,
    sequences: Vec<RpnSequence>,
    representative: Option<NodeId>,
    arm: Option<usize>,
}
impl EquivalenceClass {
    fn new(key: Option<BinaryKey>) -> Self {
        EquivalenceClass {
            key,
            elements: Vec::new(),
            members: HashSet::new(),
            sequences: Vec::new(),
            representative: None,
            arm: None,
        }
    }
    /// `None` for the class of invalid nodes.
    pub fn key(&self) -> Option<&BinaryKey> {
        self.key.as_ref()
    }
    /// Elements in insertion order.
    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }
    /// The RPN sequence of each element, in the same order.
    pub fn sequences(&self) -> &[RpnSequence] {
        &self.sequences
    }
    pub fn representative(&self) -> Option<NodeId> {
        self.representative
    }
    /// The bandit arm playing this class.
    pub fn arm(&self) -> Option<usize> {
        self.arm
    }
    pub fn len(&self) -> usize {
        self.elements.len()
    }
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }
    /// Add an element. Returns whether the representative changed.
    pub fn add(&mut self, universe: &Universe, node: NodeId) -> bool {
        if !self.members.insert(node) {
            return false;
        }
        self.elements.push(node);
        self.sequences.push(RpnSequence::from_node(universe, node));
        match self.representative {
            Some(current) if representative_order(universe, node, current) != Ordering::Less => {
                false
            }
            _ => {
                self.representative = Some(node);
                true
            }
        }
    }
}

/// Candidates grouped by [`BinaryKey`]. Every valid class is played by one arm of a bandit pool,
/// whose parameter is the class representative.
///
/// [`BinaryKey`]: struct.BinaryKey.html
#[derive(Debug, Clone, PartialEq)]
pub struct EquivalenceClasses {
    classes: Vec<EquivalenceClass>,
    index: HashMap<BinaryKey, usize>,
    by_arm: HashMap<usize, usize>,
    invalids: EquivalenceClass,
}
impl Default for EquivalenceClasses {
    fn default() -> Self {
        EquivalenceClasses {
            classes: Vec::new(),
            index: HashMap::new(),
            by_arm: HashMap::new(),
            invalids: EquivalenceClass::new(None),
        }
    }
}
impl EquivalenceClasses {
    pub fn new() -> Self {
        Self::default()
    }

    /// File `node` under `key`. A node without key goes to the invalids. Creating a class
    /// creates its arm in `pool`, and a new representative becomes the arm's parameter.
    /// Returns the index of the class, if valid.
    pub fn add(
        &mut self,
        universe: &Universe,
        node: NodeId,
        key: Option<BinaryKey>,
        pool: &mut BanditPool<NodeId>,
    ) -> Option<usize> {
        let key = match key {
            Some(key) => key,
            None => {
                self.invalids.add(universe, node);
                return None;
            }
        };
        let index = match self.index.get(&key) {
            Some(&index) => index,
            None => {
                let index = self.classes.len();
                self.classes.push(EquivalenceClass::new(Some(key.clone())));
                self.index.insert(key, index);
                index
            }
        };
        let class = &mut self.classes[index];
        if class.add(universe, node) {
            if let Some(representative) = class.representative {
                match class.arm {
                    Some(arm) => pool.set_parameter(arm, representative),
                    None => {
                        let arm = pool.create_arm(representative);
                        class.arm = Some(arm);
                        self.by_arm.insert(arm, index);
                    }
                }
            }
        }
        Some(index)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
    pub fn get(&self, index: usize) -> Option<&EquivalenceClass> {
        self.classes.get(index)
    }
    pub fn iter(&self) -> impl Iterator<Item = &EquivalenceClass> {
        self.classes.iter()
    }
    pub fn by_arm(&self, arm: usize) -> Option<&EquivalenceClass> {
        self.by_arm.get(&arm).map(|&index| &self.classes[index])
    }
    pub fn invalids(&self) -> &EquivalenceClass {
        &self.invalids
    }
    pub fn log_summary(&self) {
        debug!(
            "{} equivalence classes over {} nodes, {} invalid nodes",
            self.classes.len(),
            self.classes.iter().map(|c| c.len()).sum::<usize>(),
            self.invalids.len()
        );
    }
}
