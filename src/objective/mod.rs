//! Scoring candidates as weak learners.
//!
//! A [`LearningObjective`] holds a fixed list of training examples with their supervision and
//! weights. Candidates are scored by loading one [`Prediction`] per example; numeric candidates
//! are first binarized by [`find_best_threshold`], which sweeps every threshold with one sort
//! and one O(1) statistics update per example.
//!
//! [`LearningObjective`]: trait.LearningObjective.html
//! [`Prediction`]: enum.Prediction.html
//! [`find_best_threshold`]: trait.LearningObjective.html#method.find_best_threshold

mod classification;
mod information_gain;
mod regression;

pub use self::classification::BinaryClassificationObjective;
pub use self::information_gain::InformationGainObjective;
pub use self::regression::RegressionObjective;

use log::trace;

use crate::cache::SampleCache;
use crate::expression::NodeId;
use crate::types::{Type, Value};

/// The ternary output of a boolean candidate on one example.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Prediction {
    Negative,
    Positive,
    Missing,
}
impl Prediction {
    /// Booleans map to their prediction; anything else, including a missing value, is
    /// `Missing`.
    pub fn from_sample(value: Option<Value>) -> Self {
        match value {
            Some(Value::Boolean(true)) => Prediction::Positive,
            Some(Value::Boolean(false)) => Prediction::Negative,
            _ => Prediction::Missing,
        }
    }
    fn index(self) -> usize {
        match self {
            Prediction::Negative => 0,
            Prediction::Positive => 1,
            Prediction::Missing => 2,
        }
    }
}

/// The output a leaf of a learned model would give for a set of examples.
#[derive(Debug, Clone, PartialEq)]
pub enum Vote {
    /// No example carried any weight.
    Missing,
    Scalar(f64),
    /// A distribution over labels.
    Distribution(Vec<f64>),
}

/// A scored weak learner. Numeric candidates are wrapped in a stump at `threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeakNode {
    pub node: NodeId,
    pub score: f64,
    pub threshold: Option<f64>,
}

/// A split-quality criterion over a fixed list of examples.
///
/// Implementors keep sufficient statistics of the current predictions. Loading predictions
/// marks them stale; they are recomputed in one pass on the next
/// [`compute_objective`](#method.compute_objective). [`flip_prediction`] then updates them in
/// constant time, which is what the threshold sweep relies on.
///
/// An objective is not meant to be shared between threads: each thread scoring candidates
/// uses its own.
///
/// [`flip_prediction`]: #tymethod.flip_prediction
pub trait LearningObjective: Send {
    /// Indices of the examples this objective scores, into the supervision and the sample
    /// cache. Positions in this list are what predictions and sorted values refer to.
    fn examples(&self) -> &[usize];
    fn predictions(&self) -> &[Prediction];
    /// Load one prediction per example position.
    fn set_predictions(&mut self, predictions: Vec<Prediction>);
    fn is_up_to_date(&self) -> bool;
    /// Recompute the statistics from scratch.
    fn update(&mut self);
    /// Move the example at `position` from negative to positive. The statistics must be up to
    /// date.
    fn flip_prediction(&mut self, position: usize);
    /// The score of the current, up-to-date statistics. Higher is better.
    fn objective(&self) -> f64;
    /// The vote of a model leaf holding these examples.
    fn compute_vote(&self, examples: &[usize]) -> Vote;

    fn ensure_up_to_date(&mut self) {
        if !self.is_up_to_date() {
            self.update();
        }
    }
    fn compute_objective(&mut self) -> f64 {
        self.ensure_up_to_date();
        self.objective()
    }
    fn compute(&mut self, predictions: Vec<Prediction>) -> f64 {
        self.set_predictions(predictions);
        self.compute_objective()
    }

    /// The best threshold for a numeric candidate and its score, as `(threshold, score)`.
    ///
    /// `sorted` holds `(position, value)` pairs ascending by value, as returned by
    /// [`SampleCache::sorted_double_values`]; positions absent from it are treated as missing.
    /// Thresholds are midpoints between consecutive distinct values; among equally good ones,
    /// the median is returned. With fewer than two distinct values, the threshold is `0` and
    /// the score is that of predicting negative everywhere.
    ///
    /// # Examples
    ///
    /// ```
    /// use luape::objective::{BinaryClassificationObjective, LearningObjective};
    ///
    /// let labels = vec![false, true, true, false];
    /// let mut objective = BinaryClassificationObjective::new(labels, vec![0, 1, 2, 3]);
    /// let sorted = [(0, 1.0), (1, 2.0), (2, 2.0), (3, 5.0)];
    /// let (threshold, score) = objective.find_best_threshold(&sorted);
    /// assert_eq!(threshold, 1.5);
    /// assert_eq!(score, 0.75);
    /// ```
    ///
    /// [`SampleCache::sorted_double_values`]: ../struct.SampleCache.html#method.sorted_double_values
    fn find_best_threshold(&mut self, sorted: &[(usize, f64)]) -> (f64, f64) {
        let mut predictions = vec![Prediction::Missing; self.examples().len()];
        for &(position, _) in sorted {
            predictions[position] = Prediction::Negative;
        }
        self.set_predictions(predictions);
        self.ensure_up_to_date();

        let (lowest, highest) = match (sorted.first(), sorted.last()) {
            (Some(&(_, lo)), Some(&(_, hi))) => (lo, hi),
            _ => return (0.0, self.objective()),
        };
        if lowest >= highest {
            return (0.0, self.objective());
        }

        let mut best_score = f64::NEG_INFINITY;
        let mut best_thresholds = Vec::new();
        let mut previous = highest;
        for &(position, value) in sorted.iter().rev() {
            if value < previous {
                let score = self.objective();
                let threshold = (value + previous) / 2.0;
                trace!("threshold {} scores {}", threshold, score);
                if score >= best_score {
                    if score > best_score {
                        best_thresholds.clear();
                        best_score = score;
                    }
                    best_thresholds.push(threshold);
                }
                previous = value;
            }
            self.flip_prediction(position);
        }
        let threshold = best_thresholds
            .get(best_thresholds.len() / 2)
            .copied()
            .unwrap_or(0.0);
        (threshold, best_score)
    }

    /// Score `node` on this objective's examples.
    ///
    /// Boolean nodes are scored as they are. Numeric nodes are thresholded with
    /// [`find_best_threshold`](#method.find_best_threshold) and returned wrapped in the
    /// corresponding stump. `None` if the node is of another type or the cache cannot evaluate
    /// it.
    fn compute_objective_with_eventual_stump(
        &mut self,
        cache: &SampleCache,
        node: NodeId,
    ) -> Option<WeakNode> {
        let universe = cache.universe();
        if node.index() >= universe.num_nodes() {
            return None;
        }
        let tp = universe.node(node).tp();
        if tp.inherits_from(Type::Boolean) {
            let samples = cache.samples(node, self.examples())?;
            let score = self.compute(samples.into_iter().map(Prediction::from_sample).collect());
            Some(WeakNode {
                node,
                score,
                threshold: None,
            })
        } else if tp.is_convertible_to_double() {
            let sorted = cache.sorted_double_values(node, self.examples())?;
            let (threshold, score) = self.find_best_threshold(&sorted);
            Some(WeakNode {
                node: universe.make_stump(node, threshold),
                score,
                threshold: Some(threshold),
            })
        } else {
            None
        }
    }
}

/// Examples, weights and current predictions shared by the objectives.
#[derive(Debug, Clone, PartialEq)]
struct ExampleSet {
    examples: Vec<usize>,
    /// Indexed by example, like the supervision.
    weights: Vec<f64>,
    predictions: Vec<Prediction>,
    up_to_date: bool,
}
impl ExampleSet {
    fn new(examples: Vec<usize>, weights: Vec<f64>) -> Self {
        debug_assert!(examples.iter().all(|&e| e < weights.len()));
        ExampleSet {
            predictions: vec![Prediction::Negative; examples.len()],
            examples,
            weights,
            up_to_date: false,
        }
    }
    fn set_predictions(&mut self, predictions: Vec<Prediction>) {
        assert_eq!(
            predictions.len(),
            self.examples.len(),
            "one prediction per example is required"
        );
        self.predictions = predictions;
        self.up_to_date = false;
    }
    fn set_weights(&mut self, weights: Vec<f64>) {
        debug_assert!(self.examples.iter().all(|&e| e < weights.len()));
        self.weights = weights;
        self.up_to_date = false;
    }
    /// `(example, weight, prediction)` for every position.
    fn iter(&self) -> impl Iterator<Item = (usize, f64, Prediction)> + '_ {
        self.examples
            .iter()
            .zip(&self.predictions)
            .map(move |(&e, &p)| (e, self.weights[e], p))
    }
    /// Mark `position` positive, returning its example and weight.
    fn flip(&mut self, position: usize) -> (usize, f64) {
        assert!(self.up_to_date, "statistics must be up to date to flip a prediction");
        debug_assert_eq!(self.predictions[position], Prediction::Negative);
        self.predictions[position] = Prediction::Positive;
        let example = self.examples[position];
        (example, self.weights[example])
    }
}
