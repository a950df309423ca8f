//! Episode statistics for monitoring
//!
//! Tracks the total reward and length of completed episodes over a rolling
//! window shared by all environments. These figures are reported only; they
//! never feed back into training.

use std::collections::VecDeque;

use anyhow::{Result, ensure};

/// Default capacity of the rolling windows
pub const DEFAULT_WINDOW: usize = 100;

/// Rolling statistics of completed episodes
///
/// An episode is counted when a later step shows its environment starting a
/// new episode. At that point the running totals are pushed into the windows
/// and restarted from the new episode's first step: the running reward
/// becomes that step's reward and the running length becomes 1.
#[derive(Debug, Clone)]
pub struct EpisodeStats {
    /// Running reward of each environment's current episode
    running_rewards: Vec<f32>,

    /// Running length of each environment's current episode
    running_lengths: Vec<usize>,

    /// Total rewards of recent episodes, oldest first
    reward_window: VecDeque<f32>,

    /// Lengths of recent episodes, oldest first
    length_window: VecDeque<usize>,

    /// Window capacity
    capacity: usize,

    /// Episodes completed since creation
    completed: usize,
}

impl EpisodeStats {
    /// Create statistics for `num_envs` environments with the default window
    pub fn new(num_envs: usize) -> Self {
        Self::empty(num_envs, DEFAULT_WINDOW)
    }

    /// Create statistics with a custom window capacity
    ///
    /// Fails if `capacity` is zero.
    pub fn with_window(num_envs: usize, capacity: usize) -> Result<Self> {
        ensure!(capacity > 0, "statistics window capacity must be positive");
        Ok(Self::empty(num_envs, capacity))
    }

    fn empty(num_envs: usize, capacity: usize) -> Self {
        Self {
            running_rewards: vec![0.0; num_envs],
            running_lengths: vec![0; num_envs],
            reward_window: VecDeque::with_capacity(capacity),
            length_window: VecDeque::with_capacity(capacity),
            capacity,
            completed: 0,
        }
    }

    /// Record a rollout
    ///
    /// # Arguments
    /// * `rewards` - Rewards, `[num_steps][num_envs]`
    /// * `episode_starts` - Whether each step began a new episode,
    ///   `[num_steps][num_envs]`
    pub fn record(&mut self, rewards: &[Vec<f32>], episode_starts: &[Vec<bool>]) {
        debug_assert_eq!(rewards.len(), episode_starts.len());

        for (step_rewards, step_starts) in rewards.iter().zip(episode_starts) {
            debug_assert_eq!(step_rewards.len(), self.running_rewards.len());
            debug_assert_eq!(step_starts.len(), self.running_rewards.len());

            for (env, (&reward, &start)) in step_rewards.iter().zip(step_starts).enumerate() {
                if start {
                    self.push(self.running_rewards[env], self.running_lengths[env]);
                    self.running_rewards[env] = reward;
                    self.running_lengths[env] = 1;
                } else {
                    self.running_rewards[env] += reward;
                    self.running_lengths[env] += 1;
                }
            }
        }
    }

    fn push(&mut self, total_reward: f32, length: usize) {
        if self.reward_window.len() == self.capacity {
            self.reward_window.pop_front();
            self.length_window.pop_front();
        }
        self.reward_window.push_back(total_reward);
        self.length_window.push_back(length);
        self.completed += 1;
        tracing::trace!(total_reward, length, "episode completed");
    }

    /// Mean total reward and mean length over the windows
    ///
    /// Returns `(0.0, 0.0)` before any episode has completed.
    pub fn get_performance(&self) -> (f32, f32) {
        if self.reward_window.is_empty() {
            return (0.0, 0.0);
        }
        let count = self.reward_window.len() as f32;
        let mean_reward = self.reward_window.iter().sum::<f32>() / count;
        let mean_length = self.length_window.iter().sum::<usize>() as f32 / count;
        (mean_reward, mean_length)
    }

    /// Running `(reward, length)` of an environment's current episode
    pub fn running(&self, env: usize) -> (f32, usize) {
        (self.running_rewards[env], self.running_lengths[env])
    }

    /// Episodes currently held in the windows
    pub fn len(&self) -> usize {
        self.reward_window.len()
    }

    /// Check if no episode is held in the windows
    pub fn is_empty(&self) -> bool {
        self.reward_window.is_empty()
    }

    /// Window capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Episodes completed since creation, including evicted ones
    pub fn completed_episodes(&self) -> usize {
        self.completed
    }

    /// Windowed episode rewards, oldest first
    pub fn rewards(&self) -> impl Iterator<Item = f32> + '_ {
        self.reward_window.iter().copied()
    }

    /// Windowed episode lengths, oldest first
    pub fn lengths(&self) -> impl Iterator<Item = usize> + '_ {
        self.length_window.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_performance_is_zero() {
        let stats = EpisodeStats::new(4);
        assert_eq!(stats.get_performance(), (0.0, 0.0));
        assert!(stats.is_empty());
    }

    #[test]
    fn test_carry_forward_accumulator() {
        let mut stats = EpisodeStats::new(1);

        // Episode ends after step 1 (reward 2), new episode's first reward is 5
        let rewards = vec![vec![1.0], vec![2.0], vec![5.0], vec![1.0]];
        let starts = vec![vec![false], vec![false], vec![true], vec![false]];
        stats.record(&rewards, &starts);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats.get_performance(), (3.0, 2.0));
        assert_eq!(stats.running(0), (6.0, 2));
    }

    #[test]
    fn test_carry_forward_across_rollouts() {
        let mut stats = EpisodeStats::new(2);

        stats.record(&[vec![1.0, 10.0], vec![2.0, 20.0]], &[vec![false, false], vec![false, false]]);
        assert!(stats.is_empty());

        // Env 0 starts a new episode on the first step of the next rollout
        stats.record(&[vec![7.0, 30.0]], &[vec![true, false]]);

        assert_eq!(stats.rewards().collect::<Vec<_>>(), vec![3.0]);
        assert_eq!(stats.lengths().collect::<Vec<_>>(), vec![2]);
        assert_eq!(stats.running(0), (7.0, 1));
        assert_eq!(stats.running(1), (60.0, 3));
    }

    #[test]
    fn test_window_evicts_oldest_first() {
        let mut stats = EpisodeStats::new(1);

        for episode in 0..DEFAULT_WINDOW {
            stats.push(episode as f32, episode + 1);
        }
        assert_eq!(stats.len(), DEFAULT_WINDOW);
        assert_eq!(stats.rewards().next(), Some(0.0));

        // The 101st episode evicts the first
        stats.push(1000.0, 1);
        assert_eq!(stats.len(), DEFAULT_WINDOW);
        assert_eq!(stats.completed_episodes(), DEFAULT_WINDOW + 1);
        assert_eq!(stats.rewards().next(), Some(1.0));
        assert_eq!(stats.rewards().last(), Some(1000.0));
        assert_eq!(stats.lengths().next(), Some(2));
    }

    #[test]
    fn test_window_never_exceeds_capacity() {
        let mut stats = EpisodeStats::with_window(3, 5).unwrap();
        let rewards = vec![vec![1.0; 3]; 10];
        let starts = vec![vec![true; 3]; 10];
        stats.record(&rewards, &starts);

        assert_eq!(stats.len(), 5);
        assert_eq!(stats.capacity(), 5);
        assert_eq!(stats.completed_episodes(), 30);
        // Every recorded episode after the first row has reward 1 and length 1
        assert_eq!(stats.get_performance(), (1.0, 1.0));
    }

    #[test]
    fn test_zero_capacity_window_is_rejected() {
        let err = EpisodeStats::with_window(1, 0).unwrap_err();
        assert!(err.to_string().contains("capacity must be positive"));

        let mut stats = EpisodeStats::with_window(1, 1).unwrap();
        stats.record(&[vec![1.0], vec![2.0], vec![3.0]], &[vec![true], vec![true], vec![true]]);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats.rewards().collect::<Vec<_>>(), vec![2.0]);
    }
}
