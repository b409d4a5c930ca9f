use super::{ExampleSet, LearningObjective, Prediction, Vote};

const EPSILON: f64 = 1e-12;

/// Weighted count, sum and sum of squares. Pushing a negative weight removes a value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Moments {
    count: f64,
    sum: f64,
    sum_of_squares: f64,
}
impl Moments {
    fn push(&mut self, value: f64, weight: f64) {
        self.count += weight;
        self.sum += weight * value;
        self.sum_of_squares += weight * value * value;
    }
    fn is_empty(&self) -> bool {
        self.count.abs() <= EPSILON
    }
    fn variance(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let mean = self.sum / self.count;
        (self.sum_of_squares / self.count - mean * mean).max(0.0)
    }
}

/// Negative weighted within-branch variance of real-valued targets: splits that separate low
/// targets from high ones score closer to 0.
///
/// The sum of branch weight times branch variance is divided by the total weight of the
/// examples, not by their count. With unit weights both agree; with boosting weights the score
/// stays on the scale of the target variance whatever the weights sum to.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionObjective {
    set: ExampleSet,
    targets: Vec<f64>,
    branches: [Moments; 3],
}
impl RegressionObjective {
    /// `targets` is indexed by example; every example weighs 1.
    pub fn new(targets: Vec<f64>, examples: Vec<usize>) -> Self {
        let weights = vec![1.0; targets.len()];
        Self::with_weights(targets, weights, examples)
    }
    pub fn with_weights(targets: Vec<f64>, weights: Vec<f64>, examples: Vec<usize>) -> Self {
        debug_assert_eq!(targets.len(), weights.len());
        RegressionObjective {
            set: ExampleSet::new(examples, weights),
            targets,
            branches: [Moments::default(); 3],
        }
    }
    pub fn set_weights(&mut self, weights: Vec<f64>) {
        self.set.set_weights(weights);
    }
}
impl LearningObjective for RegressionObjective {
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
        let mut branches = [Moments::default(); 3];
        for (example, weight, prediction) in self.set.iter() {
            branches[prediction.index()].push(self.targets[example], weight);
        }
        self.branches = branches;
        self.set.up_to_date = true;
    }
    fn flip_prediction(&mut self, position: usize) {
        let (example, weight) = self.set.flip(position);
        let value = self.targets[example];
        self.branches[Prediction::Negative.index()].push(value, -weight);
        self.branches[Prediction::Positive.index()].push(value, weight);
    }
    fn objective(&self) -> f64 {
        let total: f64 = self.branches.iter().map(|b| b.count).sum();
        if total <= EPSILON {
            return 0.0;
        }
        let spread: f64 = self
            .branches
            .iter()
            .filter(|b| !b.is_empty())
            .map(|b| b.count * b.variance())
            .sum();
        -spread / total
    }
    /// The weighted mean target.
    fn compute_vote(&self, examples: &[usize]) -> Vote {
        let mut moments = Moments::default();
        for &e in examples {
            moments.push(self.targets[e], self.set.weights[e]);
        }
        if moments.is_empty() {
            Vote::Missing
        } else {
            Vote::Scalar(moments.sum / moments.count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separating_split_has_no_variance() {
        let mut objective = RegressionObjective::new(vec![1.0, 1.0, 5.0, 5.0], vec![0, 1, 2, 3]);
        let separating = objective.compute(vec![
            Prediction::Negative,
            Prediction::Negative,
            Prediction::Positive,
            Prediction::Positive,
        ]);
        assert!(separating.abs() < 1e-12);
        let mixed = objective.compute(vec![
            Prediction::Negative,
            Prediction::Positive,
            Prediction::Negative,
            Prediction::Positive,
        ]);
        // both branches hold {1, 5}: variance 4
        assert!((mixed + 4.0).abs() < 1e-12);
    }

    #[test]
    fn flips_match_updates() {
        let targets = vec![0.5, -2.0, 3.0, 1.25];
        let mut objective = RegressionObjective::new(targets, vec![0, 1, 2, 3]);
        objective.set_predictions(vec![Prediction::Negative; 4]);
        objective.ensure_up_to_date();
        objective.flip_prediction(2);
        objective.flip_prediction(0);
        let incremental = objective.objective();
        let fresh = objective.compute(objective.predictions().to_vec());
        assert!((incremental - fresh).abs() < 1e-9);
    }

    #[test]
    fn variance_is_averaged_over_the_total_weight() {
        let targets = vec![1.0, 5.0, 1.0, 5.0];
        let predictions = vec![
            Prediction::Negative,
            Prediction::Negative,
            Prediction::Positive,
            Prediction::Positive,
        ];
        let mut unit = RegressionObjective::new(targets.clone(), vec![0, 1, 2, 3]);
        let mut scaled =
            RegressionObjective::with_weights(targets.clone(), vec![0.25; 4], vec![0, 1, 2, 3]);
        // each branch holds {1, 5}: variance 4, whatever the weights sum to
        assert!((unit.compute(predictions.clone()) + 4.0).abs() < 1e-12);
        assert!((scaled.compute(predictions.clone()) + 4.0).abs() < 1e-12);

        // weights 3 and 1 in the negative branch: mean 2, variance 3; total weight 6
        let mut skewed =
            RegressionObjective::with_weights(targets, vec![3.0, 1.0, 1.0, 1.0], vec![0, 1, 2, 3]);
        let expected = -(4.0 * 3.0 + 2.0 * 4.0) / 6.0;
        assert!((skewed.compute(predictions) - expected).abs() < 1e-12);
    }

    #[test]
    fn votes_are_weighted_means() {
        let objective =
            RegressionObjective::with_weights(vec![1.0, 4.0, 9.0], vec![3.0, 1.0, 0.0], vec![0, 1, 2]);
        assert_eq!(objective.compute_vote(&[0, 1, 2]), Vote::Scalar(1.75));
        assert_eq!(objective.compute_vote(&[2]), Vote::Missing);
    }
}
