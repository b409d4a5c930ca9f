use super::{ExampleSet, LearningObjective, Prediction, Vote};

/// Entropy in bits of a weight vector summing to `sum`.
fn entropy(weights: &[f64], sum: f64) -> f64 {
    if sum <= 0.0 {
        return 0.0;
    }
    weights
        .iter()
        .filter(|&&w| w > 0.0)
        .map(|&w| {
            let p = w / sum;
            -p * p.log2()
        })
        .sum()
}

/// Reduction of label entropy obtained by splitting examples into the negative, positive and
/// missing branches.
///
/// When normalized, the gain is divided by the mean of the label entropy and the split entropy
/// (`2 * IG / (H + H_split)`), which is 0 when both are 0.
#[derive(Debug, Clone, PartialEq)]
pub struct InformationGainObjective {
    set: ExampleSet,
    labels: Vec<usize>,
    num_labels: usize,
    normalize: bool,
    sum_of_weights: f64,
    split_weights: [f64; 3],
    label_weights: Vec<f64>,
    conditional_weights: [Vec<f64>; 3],
}
impl InformationGainObjective {
    /// `labels` is indexed by example and holds values in `0..num_labels`; every example
    /// weighs 1.
    pub fn new(labels: Vec<usize>, num_labels: usize, examples: Vec<usize>, normalize: bool) -> Self {
        let weights = vec![1.0; labels.len()];
        Self::with_weights(labels, num_labels, weights, examples, normalize)
    }
    pub fn with_weights(
        labels: Vec<usize>,
        num_labels: usize,
        weights: Vec<f64>,
        examples: Vec<usize>,
        normalize: bool,
    ) -> Self {
        debug_assert!(labels.iter().all(|&l| l < num_labels));
        InformationGainObjective {
            set: ExampleSet::new(examples, weights),
            labels,
            num_labels,
            normalize,
            sum_of_weights: 0.0,
            split_weights: [0.0; 3],
            label_weights: vec![0.0; num_labels],
            conditional_weights: [
                vec![0.0; num_labels],
                vec![0.0; num_labels],
                vec![0.0; num_labels],
            ],
        }
    }
    /// Two labels: `false` is label 0 and `true` is label 1.
    pub fn binary(labels: &[bool], examples: Vec<usize>, normalize: bool) -> Self {
        let labels = labels.iter().map(|&b| usize::from(b)).collect();
        Self::new(labels, 2, examples, normalize)
    }
    pub fn num_labels(&self) -> usize {
        self.num_labels
    }
    pub fn set_weights(&mut self, weights: Vec<f64>) {
        self.set.set_weights(weights);
    }
}
impl LearningObjective for InformationGainObjective {
    fn examples(&self) -> &[usize] {
        &self.set.examples
    }
    fn predictions(&self) -> &[Prediction] {
        &self.set.predictions
    }
    fn set_predictions(&mut self, predictions: Vec<Prediction>) {
        self.set.set_predictions(predictions)
    }
    fn is_up_to_date(&self) -> bool {
        self.set.up_to_date
    }
    fn update(&mut self) {
        let mut split_weights = [0.0; 3];
        let mut label_weights = vec![0.0; self.num_labels];
        let mut conditional_weights = [
            vec![0.0; self.num_labels],
            vec![0.0; self.num_labels],
            vec![0.0; self.num_labels],
        ];
        let mut sum_of_weights = 0.0;
        for (example, weight, prediction) in self.set.iter() {
            let label = self.labels[example];
            let branch = prediction.index();
            split_weights[branch] += weight;
            label_weights[label] += weight;
            conditional_weights[branch][label] += weight;
            sum_of_weights += weight;
        }
        self.split_weights = split_weights;
        self.label_weights = label_weights;
        self.conditional_weights = conditional_weights;
        self.sum_of_weights = sum_of_weights;
        self.set.up_to_date = true;
    }
    fn flip_prediction(&mut self, position: usize) {
        let (example, weight) = self.set.flip(position);
        let label = self.labels[example];
        let (negative, positive) = (Prediction::Negative.index(), Prediction::Positive.index());
        self.split_weights[negative] -= weight;
        self.conditional_weights[negative][label] -= weight;
        self.split_weights[positive] += weight;
        self.conditional_weights[positive][label] += weight;
    }
    fn objective(&self) -> f64 {
        if self.sum_of_weights <= 0.0 {
            return 0.0;
        }
        let label_entropy = entropy(&self.label_weights, self.sum_of_weights);
        let split_entropy = entropy(&self.split_weights, self.sum_of_weights);
        let expected_entropy: f64 = self
            .split_weights
            .iter()
            .zip(&self.conditional_weights)
            .filter(|&(&w, _)| w > 0.0)
            .map(|(&w, conditional)| w / self.sum_of_weights * entropy(conditional, w))
            .sum();
        let gain = label_entropy - expected_entropy;
        if !self.normalize {
            gain
        } else if label_entropy + split_entropy > 0.0 {
            2.0 * gain / (label_entropy + split_entropy)
        } else {
            0.0
        }
    }
    /// With two labels, the weighted probability of label 1; otherwise the weighted label
    /// distribution (all zeros without weight).
    fn compute_vote(&self, examples: &[usize]) -> Vote {
        let mut distribution = vec![0.0; self.num_labels];
        let mut total = 0.0;
        for &e in examples {
            let weight = self.set.weights[e];
            distribution[self.labels[e]] += weight;
            total += weight;
        }
        if self.num_labels == 2 {
            return if total > 0.0 {
                Vote::Scalar(distribution[1] / total)
            } else {
                Vote::Missing
            };
        }
        if total > 0.0 {
            for p in &mut distribution {
                *p /= total;
            }
        }
        Vote::Distribution(distribution)
    }
}
