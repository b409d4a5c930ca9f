use log::{debug, trace};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64;

/// Parameters for a [`BanditPool`].
///
/// [`BanditPool`]: struct.BanditPool.html
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BanditParams {
    /// Weight `c` of the exploration term `sqrt(c * ln t / n)` of the UCB index.
    ///
    /// Default: `5.0`
    pub exploration_coefficient: f64,
    /// How many distinct arms are played per step. Arms of one step are evaluated in parallel
    /// when `multithreading` is set.
    ///
    /// Default: `1`
    pub batch_size: usize,
    /// Stop playing after this many objective evaluations.
    ///
    /// Default: `None`
    pub max_evaluations: Option<usize>,
    /// Stop playing after this many plays of arms that were already evaluated on every instance.
    ///
    /// Default: `None`
    pub max_cache_hits: Option<usize>,
    /// Default: `false`
    pub multithreading: bool,
}
impl Default for BanditParams {
    fn default() -> Self {
        BanditParams {
            exploration_coefficient: 5.0,
            batch_size: 1,
            max_evaluations: None,
            max_cache_hits: None,
            multithreading: false,
        }
    }
}

/// What the arms of a [`BanditPool`] are played against.
///
/// An objective has a number of instances, e.g. cross-validation folds. Each play of an arm
/// evaluates it on its next instance. With finitely many instances, an arm evaluated on all of
/// them has an exact mean and is not evaluated again.
///
/// [`BanditPool`]: struct.BanditPool.html
pub trait BanditObjective<A>: Sync {
    /// The number of instances, or `0` for infinitely many.
    fn num_instances(&self) -> usize;
    /// The worst and the best objective values, used to scale rewards into `[0, 1]`.
    fn objective_range(&self) -> (f64, f64);
    fn compute_objective(&self, arm: &A, instance: usize) -> f64;
}

#[derive(Debug, Clone, PartialEq)]
struct Arm<A> {
    parameter: A,
    played: usize,
    reward_sum: f64,
    objective_sum: f64,
}
impl<A> Arm<A> {
    fn mean_reward(&self) -> Option<f64> {
        if self.played == 0 {
            None
        } else {
            Some(self.reward_sum / self.played as f64)
        }
    }
    fn is_exhausted(&self, num_instances: usize) -> bool {
        num_instances > 0 && self.played >= num_instances
    }
}

/// A pool of arms played with the UCB1 policy.
///
/// Unplayed arms are played first. Then, arms with the highest index
/// `mean reward + sqrt(c * ln t / n)` are played, where `t` is the total number of evaluations
/// and `n` the arm's number of evaluations. An arm evaluated on every instance scores its mean
/// reward alone; playing it again counts as a cache hit.
///
/// # Examples
///
/// ```
/// use luape::discovery::{BanditObjective, BanditParams, BanditPool};
///
/// struct Coins;
/// impl BanditObjective<f64> for Coins {
///     fn num_instances(&self) -> usize {
///         4
///     }
///     fn objective_range(&self) -> (f64, f64) {
///         (0.0, 1.0)
///     }
///     fn compute_objective(&self, p: &f64, instance: usize) -> f64 {
///         if (instance as f64) < 4.0 * p { 1.0 } else { 0.0 }
///     }
/// }
///
/// let mut pool = BanditPool::new(BanditParams::default());
/// for &p in &[0.25, 0.75, 0.5] {
///     pool.create_arm(p);
/// }
/// pool.play_iterations(&Coins, 50, 3);
/// assert_eq!(pool.best_arm(), Some(1));
/// assert_eq!(pool.arms_order(), vec![1, 2, 0]);
/// assert_eq!(pool.arm_mean_objective(1), Some(0.75));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BanditPool<A> {
    params: BanditParams,
    arms: Vec<Arm<A>>,
    num_evaluations: usize,
    num_cache_hits: usize,
}
impl<A: Send + Sync> BanditPool<A> {
    pub fn new(params: BanditParams) -> Self {
        BanditPool {
            params,
            arms: Vec::new(),
            num_evaluations: 0,
            num_cache_hits: 0,
        }
    }
    pub fn params(&self) -> &BanditParams {
        &self.params
    }
    /// Returns the index of the new arm.
    pub fn create_arm(&mut self, parameter: A) -> usize {
        self.arms.push(Arm {
            parameter,
            played: 0,
            reward_sum: 0.0,
            objective_sum: 0.0,
        });
        self.arms.len() - 1
    }
    /// Replace the parameter of an arm, keeping its statistics.
    pub fn set_parameter(&mut self, arm: usize, parameter: A) {
        self.arms[arm].parameter = parameter;
    }
    pub fn parameter(&self, arm: usize) -> &A {
        &self.arms[arm].parameter
    }
    pub fn num_arms(&self) -> usize {
        self.arms.len()
    }
    pub fn num_played(&self, arm: usize) -> usize {
        self.arms[arm].played
    }
    /// Mean reward in `[0, 1]`, if played.
    pub fn arm_mean_reward(&self, arm: usize) -> Option<f64> {
        self.arms[arm].mean_reward()
    }
    /// Mean raw objective value, if played.
    pub fn arm_mean_objective(&self, arm: usize) -> Option<f64> {
        let arm = &self.arms[arm];
        if arm.played == 0 {
            None
        } else {
            Some(arm.objective_sum / arm.played as f64)
        }
    }
    pub fn num_evaluations(&self) -> usize {
        self.num_evaluations
    }
    pub fn num_cache_hits(&self) -> usize {
        self.num_cache_hits
    }
    /// Whether an evaluation or cache-hit budget is spent.
    pub fn should_stop(&self) -> bool {
        self.params
            .max_evaluations
            .map_or(false, |max| self.num_evaluations >= max)
            || self
                .params
                .max_cache_hits
                .map_or(false, |max| self.num_cache_hits >= max)
    }

    /// Play the last `num_new_arms` arms once each if they were never played, then play
    /// `num_steps` steps of `batch_size` arms. Stops early once a budget is spent. Returns the
    /// number of evaluations done.
    pub fn play_iterations<O>(&mut self, objective: &O, num_steps: usize, num_new_arms: usize) -> usize
    where
        O: BanditObjective<A> + ?Sized,
    {
        let before = self.num_evaluations;
        let batch_size = self.params.batch_size.max(1);
        let first_new = self.arms.len().saturating_sub(num_new_arms);
        let new_arms: Vec<usize> = (first_new..self.arms.len())
            .filter(|&arm| self.arms[arm].played == 0)
            .collect();
        for batch in new_arms.chunks(batch_size) {
            if self.should_stop() {
                break;
            }
            self.play_batch(objective, batch);
        }
        for step in 0..num_steps {
            if self.should_stop() {
                debug!("bandit budget spent after {} steps", step);
                break;
            }
            let batch = self.select_arms(objective.num_instances(), batch_size);
            if batch.is_empty() {
                break;
            }
            self.play_batch(objective, &batch);
        }
        let evaluations = self.num_evaluations - before;
        debug!(
            "played {} evaluations over {} arms ({} cache hits so far)",
            evaluations,
            self.arms.len(),
            self.num_cache_hits
        );
        evaluations
    }

    /// The arms with the highest UCB index, ties broken by arm index.
    fn select_arms(&self, num_instances: usize, count: usize) -> Vec<usize> {
        let total = self.num_evaluations.max(1) as f64;
        let c = self.params.exploration_coefficient;
        let mut indices: Vec<(usize, f64)> = self
            .arms
            .iter()
            .enumerate()
            .map(|(i, arm)| {
                let index = match arm.mean_reward() {
                    None => f64::INFINITY,
                    Some(mean) if arm.is_exhausted(num_instances) => mean,
                    Some(mean) => mean + (c * total.ln() / arm.played as f64).sqrt(),
                };
                (i, index)
            })
            .collect();
        indices.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        indices.into_iter().take(count).map(|(i, _)| i).collect()
    }

    fn play_batch<O>(&mut self, objective: &O, batch: &[usize])
    where
        O: BanditObjective<A> + ?Sized,
    {
        let num_instances = objective.num_instances();
        let mut tasks = Vec::with_capacity(batch.len());
        for &arm in batch {
            if self.arms[arm].is_exhausted(num_instances) {
                self.num_cache_hits += 1;
            } else {
                tasks.push((arm, self.arms[arm].played));
            }
        }
        let arms = &self.arms;
        let evaluate = |&(arm, instance): &(usize, usize)| {
            objective.compute_objective(&arms[arm].parameter, instance)
        };
        let values: Vec<f64> = if self.params.multithreading {
            tasks.par_iter().map(evaluate).collect()
        } else {
            tasks.iter().map(evaluate).collect()
        };
        let (worst, best) = objective.objective_range();
        for (&(arm, instance), value) in tasks.iter().zip(values) {
            let reward = normalize(value, worst, best);
            trace!("arm {} on instance {}: {} (reward {})", arm, instance, value, reward);
            let arm = &mut self.arms[arm];
            arm.played += 1;
            arm.objective_sum += value;
            arm.reward_sum += reward;
            self.num_evaluations += 1;
        }
    }

    /// The played arm with the highest mean reward, ties broken by arm index.
    pub fn best_arm(&self) -> Option<usize> {
        self.arms_order().first().copied()
    }

    /// Played arms by decreasing mean reward, ties broken by arm index.
    pub fn arms_order(&self) -> Vec<usize> {
        let mut order: Vec<(usize, f64)> = self
            .arms
            .iter()
            .enumerate()
            .filter_map(|(i, arm)| arm.mean_reward().map(|mean| (i, mean)))
            .collect();
        order.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        order.into_iter().map(|(i, _)| i).collect()
    }
}

/// Scale an objective value into `[0, 1]`, where `worst` maps to 0 and `best` to 1. Values that
/// are not finite are worst.
fn normalize(value: f64, worst: f64, best: f64) -> f64 {
    if !value.is_finite() || best == worst {
        return 0.0;
    }
    ((value - worst) / (best - worst)).max(0.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    /// Rewards are the arm's parameter, with a small per-instance jitter.
    struct Fixed {
        instances: usize,
    }
    impl BanditObjective<f64> for Fixed {
        fn num_instances(&self) -> usize {
            self.instances
        }
        fn objective_range(&self) -> (f64, f64) {
            (-10.0, 10.0)
        }
        fn compute_objective(&self, arm: &f64, instance: usize) -> f64 {
            arm + if instance % 2 == 0 { 0.5 } else { -0.5 }
        }
    }

    #[test]
    fn rewards_are_scaled() {
        assert_eq!(normalize(0.0, -10.0, 10.0), 0.5);
        assert_eq!(normalize(20.0, -10.0, 10.0), 1.0);
        assert_eq!(normalize(f64::NAN, 0.0, 1.0), 0.0);
        // decreasing ranges, where smaller values are better
        assert_eq!(normalize(2.0, 10.0, 0.0), 0.8);
        assert_eq!(normalize(1.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn new_arms_are_played_first() {
        let mut pool = BanditPool::new(BanditParams::default());
        for p in 0..5 {
            pool.create_arm(p as f64);
        }
        let evaluations = pool.play_iterations(&Fixed { instances: 0 }, 0, 5);
        assert_eq!(evaluations, 5);
        assert!((0..5).all(|arm| pool.num_played(arm) == 1));
        assert_eq!(pool.arms_order(), vec![4, 3, 2, 1, 0]);
        assert_eq!(pool.arm_mean_objective(4), Some(4.5));
    }

    #[test]
    fn exhausted_arms_hit_the_cache() {
        let params = BanditParams {
            exploration_coefficient: 0.0,
            max_cache_hits: Some(3),
            ..BanditParams::default()
        };
        let mut pool = BanditPool::new(params);
        pool.create_arm(1.0);
        pool.create_arm(-1.0);
        let evaluations = pool.play_iterations(&Fixed { instances: 2 }, 100, 2);
        // without exploration the better arm is played until exhausted, then hit three times
        assert_eq!(evaluations, 3);
        assert_eq!(pool.num_played(0), 2);
        assert_eq!(pool.num_played(1), 1);
        assert_eq!(pool.num_cache_hits(), 3);
        assert!(pool.should_stop());
        assert_eq!(pool.arm_mean_objective(0), Some(1.0));
        assert_eq!(pool.play_iterations(&Fixed { instances: 2 }, 100, 0), 0);
    }

    #[test]
    fn evaluation_budget_and_parallel_batches() {
        let params = BanditParams {
            batch_size: 4,
            max_evaluations: Some(20),
            multithreading: true,
            ..BanditParams::default()
        };
        let mut pool = BanditPool::new(params);
        for p in 0..8 {
            pool.create_arm(p as f64);
        }
        pool.play_iterations(&Fixed { instances: 0 }, 1000, 8);
        assert_eq!(pool.num_evaluations(), 20);
        assert_eq!(pool.best_arm(), Some(7));

        let mut sequential = BanditPool::new(BanditParams {
            multithreading: false,
            ..pool.params().clone()
        });
        for p in 0..8 {
            sequential.create_arm(p as f64);
        }
        sequential.play_iterations(&Fixed { instances: 0 }, 1000, 8);
        assert_eq!(pool.arms, sequential.arms);
    }
}
