//! Deterministic scripted environment
//!
//! Replays a fixed reward schedule, one reward per step, and terminates when
//! the schedule is exhausted. Every element of the observation equals
//! `1 + step_in_episode`, so frames are never all-zero and successive frames
//! are distinguishable. Actions are accepted and ignored.
//!
//! Useful for verifying return and advantage computations against hand
//! calculations, and for exercising runners without a real simulator.

use std::marker::PhantomData;

use anyhow::{Result, ensure};

use super::{Environment, SpaceInfo, SpaceType, StepInfo, StepResult};

/// Environment that replays a fixed reward schedule
#[derive(Debug, Clone)]
pub struct ScriptedEnv<A = Vec<f32>> {
    obs_shape: Vec<usize>,
    rewards: Vec<f32>,
    steps: usize,
    action_space: SpaceInfo,
    _action: PhantomData<fn(&A)>,
}

impl<A> ScriptedEnv<A> {
    /// Create a scripted environment
    ///
    /// # Arguments
    ///
    /// * `obs_shape` - Shape of each observation (e.g. `[4]` or `[84, 84, 1]`)
    /// * `rewards` - Reward for each step of an episode; the episode length
    ///   is `rewards.len()`
    pub fn new(obs_shape: Vec<usize>, rewards: Vec<f32>) -> Self {
        Self {
            obs_shape,
            rewards,
            steps: 0,
            action_space: SpaceInfo {
                shape: vec![1],
                space_type: SpaceType::Continuous { low: -1.0, high: 1.0 },
            },
            _action: PhantomData,
        }
    }

    /// Override the reported action space
    pub fn with_action_space(mut self, action_space: SpaceInfo) -> Self {
        self.action_space = action_space;
        self
    }

    /// Number of steps in one episode
    pub fn episode_len(&self) -> usize {
        self.rewards.len()
    }

    fn observation(&self) -> Vec<f32> {
        let len = self.obs_shape.iter().product();
        vec![1.0 + self.steps as f32; len]
    }
}

impl<A> Environment for ScriptedEnv<A> {
    type Action = A;

    fn reset(&mut self) -> Result<Vec<f32>> {
        self.steps = 0;
        Ok(self.observation())
    }

    fn step(&mut self, _action: &A) -> Result<StepResult> {
        ensure!(!self.rewards.is_empty(), "scripted environment has an empty reward schedule");
        ensure!(self.steps < self.rewards.len(), "step called on a finished episode without reset");

        let reward = self.rewards[self.steps];
        self.steps += 1;

        Ok(StepResult {
            observation: self.observation(),
            reward,
            terminated: self.steps == self.rewards.len(),
            truncated: false,
            info: StepInfo::default(),
        })
    }

    fn observation_space(&self) -> SpaceInfo {
        SpaceInfo {
            shape: self.obs_shape.clone(),
            space_type: SpaceType::Continuous { low: 0.0, high: f32::MAX },
        }
    }

    fn action_space(&self) -> SpaceInfo {
        self.action_space.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_schedule() {
        let mut env = ScriptedEnv::<i64>::new(vec![2], vec![0.5, 1.5]);
        assert_eq!(env.reset().unwrap(), vec![1.0, 1.0]);

        let first = env.step(&0).unwrap();
        assert_eq!(first.reward, 0.5);
        assert!(!first.done());
        assert_eq!(first.observation, vec![2.0, 2.0]);

        let second = env.step(&0).unwrap();
        assert_eq!(second.reward, 1.5);
        assert!(second.terminated);

        // Stepping past the end without a reset is an error
        assert!(env.step(&0).is_err());
    }

    #[test]
    fn test_scripted_image_observation() {
        let mut env = ScriptedEnv::<i64>::new(vec![2, 3, 1], vec![1.0]);
        let obs = env.reset().unwrap();
        assert_eq!(obs.len(), 6);
        assert_eq!(env.observation_space().shape, vec![2, 3, 1]);
    }
}
