//! Rollout storage and batch flattening
//!
//! Transitions are collected time-major (`[num_steps][num_envs]`), which is
//! the order the environments produce them in. Training consumes them
//! environment-major: [`RolloutStorage::into_batch`] lays out every
//! environment's steps contiguously so that sample `env * num_steps + step`
//! is environment `env` at step `step`.

use super::advantage::AdvantageEstimator;

/// Rollout storage for one `run()`
///
/// Step `t` records the observation *before* the action, the action and the
/// policy outputs for that observation, and the reward the action produced.
/// `episode_starts[t]` is the done flag carried into step `t`: true when the
/// observation is the first of a new episode.
#[derive(Debug, Clone)]
pub struct RolloutStorage<A> {
    /// Number of steps per rollout
    num_steps: usize,

    /// Number of parallel environments
    num_envs: usize,

    /// Shape of one observation
    obs_shape: Vec<usize>,

    /// Observations [num_steps][num_envs * obs_len]
    observations: Vec<Vec<f32>>,

    /// Actions taken [num_steps][num_envs]
    actions: Vec<Vec<A>>,

    /// Value estimates [num_steps][num_envs]
    values: Vec<Vec<f32>>,

    /// Log probabilities [num_steps][num_envs]
    log_probs: Vec<Vec<f32>>,

    /// Rewards received [num_steps][num_envs]
    rewards: Vec<Vec<f32>>,

    /// Episode start flags [num_steps][num_envs]
    episode_starts: Vec<Vec<bool>>,
}

impl<A: Clone> RolloutStorage<A> {
    /// Create empty storage for a rollout
    ///
    /// # Arguments
    ///
    /// * `num_steps` - Number of timesteps per rollout
    /// * `num_envs` - Number of parallel environments
    /// * `obs_shape` - Shape of a single observation
    pub fn new(num_steps: usize, num_envs: usize, obs_shape: Vec<usize>) -> Self {
        Self {
            num_steps,
            num_envs,
            obs_shape,
            observations: Vec::with_capacity(num_steps),
            actions: Vec::with_capacity(num_steps),
            values: Vec::with_capacity(num_steps),
            log_probs: Vec::with_capacity(num_steps),
            rewards: Vec::with_capacity(num_steps),
            episode_starts: Vec::with_capacity(num_steps),
        }
    }

    /// Record the pre-step half of a transition for every environment
    ///
    /// # Arguments
    ///
    /// * `observations` - Contiguous `[num_envs, obs_len]` observations
    /// * `actions` - Actions about to be applied
    /// * `values` - Value estimates of `observations`
    /// * `log_probs` - Log probabilities of `actions`
    /// * `episode_starts` - Done flags carried into this step
    pub fn push_step(
        &mut self,
        observations: &[f32],
        actions: &[A],
        values: &[f32],
        log_probs: &[f32],
        episode_starts: &[bool],
    ) {
        debug_assert!(self.observations.len() < self.num_steps, "rollout storage is full");
        debug_assert_eq!(observations.len(), self.num_envs * self.obs_len());
        debug_assert_eq!(actions.len(), self.num_envs);
        debug_assert_eq!(values.len(), self.num_envs);
        debug_assert_eq!(log_probs.len(), self.num_envs);
        debug_assert_eq!(episode_starts.len(), self.num_envs);

        self.observations.push(observations.to_vec());
        self.actions.push(actions.to_vec());
        self.values.push(values.to_vec());
        self.log_probs.push(log_probs.to_vec());
        self.episode_starts.push(episode_starts.to_vec());
    }

    /// Record the rewards produced by the most recent step
    pub fn push_rewards(&mut self, rewards: &[f32]) {
        debug_assert_eq!(rewards.len(), self.num_envs);
        debug_assert_eq!(self.rewards.len() + 1, self.observations.len(), "rewards pushed out of order");
        self.rewards.push(rewards.to_vec());
    }

    /// Number of fully recorded steps
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Check if no step has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get storage shape (num_steps, num_envs, obs_len)
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.num_steps, self.num_envs, self.obs_len())
    }

    fn obs_len(&self) -> usize {
        self.obs_shape.iter().product()
    }

    /// Rewards recorded so far, `[step][env]`
    pub fn rewards(&self) -> &[Vec<f32>] {
        &self.rewards
    }

    /// Value estimates recorded so far, `[step][env]`
    pub fn values(&self) -> &[Vec<f32>] {
        &self.values
    }

    /// Episode start flags recorded so far, `[step][env]`
    pub fn episode_starts(&self) -> &[Vec<bool>] {
        &self.episode_starts
    }

    /// Estimate advantages and flatten into an environment-major batch
    ///
    /// # Arguments
    ///
    /// * `estimator` - Advantage strategy
    /// * `last_values` - Bootstrap values of the observations after the last step
    /// * `last_dones` - Done flags produced by the last step
    pub fn into_batch<E: AdvantageEstimator + ?Sized>(
        self,
        estimator: &E,
        last_values: &[f32],
        last_dones: &[bool],
    ) -> RolloutBatch<A> {
        debug_assert_eq!(self.len(), self.num_steps, "rollout is incomplete");
        debug_assert_eq!(last_values.len(), self.num_envs);
        debug_assert_eq!(last_dones.len(), self.num_envs);

        let (num_steps, num_envs) = (self.num_steps, self.num_envs);
        let obs_len = self.obs_len();
        let batch_size = num_steps * num_envs;

        let mut observations = Vec::with_capacity(batch_size * obs_len);
        let mut actions = Vec::with_capacity(batch_size);
        let mut values = Vec::with_capacity(batch_size);
        let mut log_probs = Vec::with_capacity(batch_size);
        let mut rewards = Vec::with_capacity(batch_size);
        let mut dones = Vec::with_capacity(batch_size);
        let mut advantages = vec![0.0; batch_size];
        let mut returns = vec![0.0; batch_size];

        let mut env_starts = vec![false; num_steps];

        for env in 0..num_envs {
            let offset = rewards.len();

            for step in 0..num_steps {
                observations
                    .extend_from_slice(&self.observations[step][env * obs_len..(env + 1) * obs_len]);
                actions.push(self.actions[step][env].clone());
                values.push(self.values[step][env]);
                log_probs.push(self.log_probs[step][env]);
                rewards.push(self.rewards[step][env]);
                env_starts[step] = self.episode_starts[step][env];

                // The done produced by this step is carried into the next one
                let done = if step + 1 == num_steps {
                    last_dones[env]
                } else {
                    self.episode_starts[step + 1][env]
                };
                dones.push(done);
            }

            let range = offset..offset + num_steps;
            estimator.estimate(
                &rewards[range.clone()],
                &values[range.clone()],
                &env_starts,
                last_values[env],
                last_dones[env],
                &mut advantages[range.clone()],
                &mut returns[range],
            );
        }

        RolloutBatch {
            num_steps,
            num_envs,
            obs_shape: self.obs_shape,
            observations,
            actions,
            values,
            log_probs,
            rewards,
            dones,
            advantages,
            returns,
        }
    }
}

/// Flattened rollout ready for a gradient update
///
/// Every per-sample vector has `num_envs * num_steps` entries in
/// environment-major order; `observations` has `obs_len` floats per sample.
#[derive(Debug, Clone)]
pub struct RolloutBatch<A> {
    /// Steps per environment
    pub num_steps: usize,

    /// Number of environments
    pub num_envs: usize,

    /// Shape of one observation
    pub obs_shape: Vec<usize>,

    /// Flattened observations [batch_size, obs_shape...]
    pub observations: Vec<f32>,

    /// Actions taken [batch_size]
    pub actions: Vec<A>,

    /// Value estimates at collection time [batch_size]
    pub values: Vec<f32>,

    /// Log probabilities (or negative log probabilities) [batch_size]
    pub log_probs: Vec<f32>,

    /// Rewards received [batch_size]
    pub rewards: Vec<f32>,

    /// Whether each step ended an episode [batch_size]
    pub dones: Vec<bool>,

    /// Estimated advantages [batch_size]
    pub advantages: Vec<f32>,

    /// Estimated returns [batch_size]
    pub returns: Vec<f32>,
}

impl<A> RolloutBatch<A> {
    /// Get batch size
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if batch is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index of environment `env` at step `step`
    pub fn index(&self, env: usize, step: usize) -> usize {
        env * self.num_steps + step
    }

    /// Observation of a single sample
    pub fn observation(&self, index: usize) -> &[f32] {
        let obs_len: usize = self.obs_shape.iter().product();
        &self.observations[index * obs_len..(index + 1) * obs_len]
    }

    /// Observation tensor shape, `[batch_size, obs_shape...]`
    pub fn obs_shape(&self) -> Vec<usize> {
        let mut shape = vec![self.len()];
        shape.extend_from_slice(&self.obs_shape);
        shape
    }

    /// Mean of the estimated returns
    pub fn mean_return(&self) -> f32 {
        if self.returns.is_empty() {
            return 0.0;
        }
        self.returns.iter().sum::<f32>() / self.returns.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::rollout::advantage::NStepReturn;

    #[test]
    fn test_storage_creation() {
        let storage = RolloutStorage::<i64>::new(10, 2, vec![4]);

        assert_eq!(storage.shape(), (10, 2, 4));
        assert!(storage.is_empty());
    }

    #[test]
    fn test_batch_is_environment_major() {
        let (num_steps, num_envs) = (3, 2);
        let mut storage = RolloutStorage::new(num_steps, num_envs, vec![1]);

        for step in 0..num_steps {
            // Observation encodes (env, step) as env * 10 + step
            let obs: Vec<f32> = (0..num_envs).map(|env| (env * 10 + step) as f32).collect();
            let actions: Vec<i64> = (0..num_envs).map(|env| (env * 10 + step) as i64).collect();
            storage.push_step(&obs, &actions, &obs, &[0.0; 2], &[false; 2]);
            storage.push_rewards(&obs);
        }
        assert_eq!(storage.len(), num_steps);

        let batch = storage.into_batch(&NStepReturn::new(0.0), &[0.0; 2], &[false; 2]);

        assert_eq!(batch.len(), 6);
        assert_eq!(batch.observations, vec![0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(batch.actions, vec![0, 1, 2, 10, 11, 12]);
        assert_eq!(batch.index(1, 2), 5);
        assert_eq!(batch.observation(4), &[11.0]);
        assert_eq!(batch.obs_shape(), vec![6, 1]);
        // γ = 0: returns are the rewards, advantages are reward - value = 0
        assert_eq!(batch.returns, batch.rewards);
        assert!(batch.advantages.iter().all(|&a| a == 0.0));
    }

    #[test]
    fn test_batch_dones_shift_episode_starts() {
        let mut storage = RolloutStorage::new(3, 1, vec![1]);
        storage.push_step(&[0.0], &[0_i64], &[0.0], &[0.0], &[true]);
        storage.push_rewards(&[1.0]);
        storage.push_step(&[0.0], &[0_i64], &[0.0], &[0.0], &[false]);
        storage.push_rewards(&[1.0]);
        storage.push_step(&[0.0], &[0_i64], &[0.0], &[0.0], &[true]);
        storage.push_rewards(&[1.0]);

        let batch = storage.into_batch(&NStepReturn::new(1.0), &[5.0], &[false]);

        // Step 1 ended an episode because step 2 starts one
        assert_eq!(batch.dones, vec![false, true, false]);
        assert_eq!(batch.returns, vec![2.0, 1.0, 6.0]);
        assert!((batch.mean_return() - 3.0).abs() < 1e-6);
    }
}
