use super::{ExampleSet, LearningObjective, Prediction, Vote};

/// Weighted accuracy of a boolean split against binary labels, in either orientation:
/// `max(correct, error) / total`, where missing predictions count in the total only.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryClassificationObjective {
    set: ExampleSet,
    labels: Vec<bool>,
    correct: f64,
    error: f64,
    missing: f64,
}
impl BinaryClassificationObjective {
    /// `labels` is indexed by example; every example weighs 1.
    pub fn new(labels: Vec<bool>, examples: Vec<usize>) -> Self {
        let weights = vec![1.0; labels.len()];
        Self::with_weights(labels, weights, examples)
    }
    pub fn with_weights(labels: Vec<bool>, weights: Vec<f64>, examples: Vec<usize>) -> Self {
        debug_assert_eq!(labels.len(), weights.len());
        BinaryClassificationObjective {
            set: ExampleSet::new(examples, weights),
            labels,
            correct: 0.0,
            error: 0.0,
            missing: 0.0,
        }
    }
    /// Replace the example weights, e.g. between boosting rounds.
    pub fn set_weights(&mut self, weights: Vec<f64>) {
        self.set.set_weights(weights);
    }
}
impl LearningObjective for BinaryClassificationObjective {
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
        let (mut correct, mut error, mut missing) = (0.0, 0.0, 0.0);
        for (example, weight, prediction) in self.set.iter() {
            match (prediction, self.labels[example]) {
                (Prediction::Missing, _) => missing += weight,
                (Prediction::Positive, true) | (Prediction::Negative, false) => correct += weight,
                _ => error += weight,
            }
        }
        self.correct = correct;
        self.error = error;
        self.missing = missing;
        self.set.up_to_date = true;
    }
    fn flip_prediction(&mut self, position: usize) {
        let (example, weight) = self.set.flip(position);
        if self.labels[example] {
            self.correct += weight;
            self.error -= weight;
        } else {
            self.error += weight;
            self.correct -= weight;
        }
    }
    fn objective(&self) -> f64 {
        let total = self.correct + self.error + self.missing;
        if total > 0.0 {
            self.correct.max(self.error) / total
        } else {
            0.0
        }
    }
    /// The weighted probability of a positive label.
    fn compute_vote(&self, examples: &[usize]) -> Vote {
        let (mut positive, mut total) = (0.0, 0.0);
        for &e in examples {
            let weight = self.set.weights[e];
            total += weight;
            if self.labels[e] {
                positive += weight;
            }
        }
        if total > 0.0 {
            Vote::Scalar(positive / total)
        } else {
            Vote::Missing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_agnostic() {
        let mut objective = BinaryClassificationObjective::new(vec![true, true, false], vec![0, 1, 2]);
        let all_right = objective.compute(vec![
            Prediction::Positive,
            Prediction::Positive,
            Prediction::Negative,
        ]);
        let all_wrong = objective.compute(vec![
            Prediction::Negative,
            Prediction::Negative,
            Prediction::Positive,
        ]);
        assert_eq!(all_right, 1.0);
        assert_eq!(all_wrong, 1.0);
        let half = objective.compute(vec![
            Prediction::Positive,
            Prediction::Missing,
            Prediction::Positive,
        ]);
        assert!((half - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn weights_and_votes() {
        let mut objective = BinaryClassificationObjective::with_weights(
            vec![true, false, false],
            vec![2.0, 1.0, 1.0],
            vec![0, 1, 2],
        );
        assert_eq!(objective.compute_vote(&[0, 1, 2]), Vote::Scalar(0.5));
        assert_eq!(objective.compute_vote(&[]), Vote::Missing);
        let all_positive = vec![Prediction::Positive; 3];
        assert_eq!(objective.compute(all_positive.clone()), 0.5);
        objective.set_weights(vec![3.0, 1.0, 0.0]);
        assert!(!objective.is_up_to_date());
        assert_eq!(objective.compute(all_positive), 0.75);
    }
}
