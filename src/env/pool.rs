//! Vectorized environment pool for parallel execution
//!
//! This module provides parallel environment execution using Rayon. Every
//! environment is stepped on the Rayon thread pool and the results are
//! gathered back in index order, so callers see a single synchronous
//! [`VecEnv::step`].
//!
//! Environments that finish an episode are reset inside the same step: the
//! returned observation is the first one of the new episode and the final
//! observation is kept in [`StepInfo::terminal_observation`].
//!
//! # Example
//!
//! ```rust
//! use lockstep_rl::env::{VecEnv, pool::EnvPool, scripted::ScriptedEnv};
//!
//! let mut pool = EnvPool::new(|_rank| ScriptedEnv::<i64>::new(vec![2], vec![1.0, 1.0]), 4);
//! let observations = pool.reset().unwrap();
//! assert_eq!(observations.len(), 4);
//!
//! let result = pool.step(&[0, 1, 0, 1]).unwrap();
//! assert_eq!(result.rewards.len(), 4);
//! ```

use anyhow::{Context, Result, ensure};
use rayon::prelude::*;

use crate::env::{Environment, SpaceInfo, StepInfo, VecEnv, VecStepResult};

/// A pool of environments for parallel execution
///
/// For N environments with average step time T, a pool step takes roughly
/// O(T) wall time when N does not exceed the number of cores.
pub struct EnvPool<E: Environment> {
    /// Vector of environment instances
    envs: Vec<E>,

    /// Number of environments
    num_envs: usize,
}

impl<E: Environment> EnvPool<E> {
    /// Create a new environment pool
    ///
    /// # Arguments
    ///
    /// * `env_fn` - Factory called with each environment's rank, so ranks can
    ///   be seeded independently
    /// * `num_envs` - Number of parallel environments
    pub fn new<F>(env_fn: F, num_envs: usize) -> Self
    where
        F: Fn(usize) -> E,
    {
        let envs = (0..num_envs).map(env_fn).collect();
        tracing::info!("EnvPool created with {} environments", num_envs);
        Self { envs, num_envs }
    }

    /// Borrow a single environment
    pub fn env(&self, env_id: usize) -> &E {
        &self.envs[env_id]
    }
}

impl<E> VecEnv for EnvPool<E>
where
    E: Environment + Send,
    E::Action: Clone + Sync,
{
    type Action = E::Action;

    fn num_envs(&self) -> usize {
        self.num_envs
    }

    fn reset(&mut self) -> Result<Vec<Vec<f32>>> {
        self.envs
            .par_iter_mut()
            .enumerate()
            .map(|(env_id, env)| env.reset().with_context(|| format!("reset of env {env_id} failed")))
            .collect()
    }

    fn step(&mut self, actions: &[Self::Action]) -> Result<VecStepResult> {
        ensure!(
            actions.len() == self.num_envs,
            "Number of actions ({}) must match number of environments ({})",
            actions.len(),
            self.num_envs
        );

        let results: Vec<(Vec<f32>, f32, bool, StepInfo)> = self
            .envs
            .par_iter_mut()
            .zip(actions.par_iter())
            .enumerate()
            .map(|(env_id, (env, action))| -> Result<(Vec<f32>, f32, bool, StepInfo)> {
                let result =
                    env.step(action).with_context(|| format!("step of env {env_id} failed"))?;
                let done = result.done();
                let mut info = result.info;
                let observation = if done {
                    info.terminal_observation = Some(result.observation);
                    env.reset().with_context(|| format!("auto-reset of env {env_id} failed"))?
                } else {
                    result.observation
                };
                Ok((observation, result.reward, done, info))
            })
            .collect::<Result<_>>()?;

        let mut observations = Vec::with_capacity(self.num_envs);
        let mut rewards = Vec::with_capacity(self.num_envs);
        let mut dones = Vec::with_capacity(self.num_envs);
        let mut infos = Vec::with_capacity(self.num_envs);

        for (observation, reward, done, info) in results {
            observations.push(observation);
            rewards.push(reward);
            dones.push(done);
            infos.push(info);
        }

        Ok(VecStepResult { observations, rewards, dones, infos })
    }

    fn render(&mut self) -> Result<()> {
        for env in &self.envs {
            env.render()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        for env in &mut self.envs {
            env.close()?;
        }
        tracing::debug!("EnvPool closed {} environments", self.num_envs);
        Ok(())
    }

    fn observation_space(&self) -> SpaceInfo {
        self.envs[0].observation_space()
    }

    fn action_space(&self) -> SpaceInfo {
        self.envs[0].action_space()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::scripted::ScriptedEnv;

    fn pool(num_envs: usize) -> EnvPool<ScriptedEnv<i64>> {
        EnvPool::new(|_| ScriptedEnv::new(vec![3], vec![1.0, 2.0, 3.0]), num_envs)
    }

    #[test]
    fn test_pool_creation() {
        let pool = pool(4);
        assert_eq!(pool.num_envs(), 4);
    }

    #[test]
    fn test_pool_reset() {
        let mut pool = pool(4);
        let observations = pool.reset().unwrap();

        assert_eq!(observations.len(), 4);
        for obs in observations {
            assert_eq!(obs.len(), 3);
        }
    }

    #[test]
    fn test_pool_step() {
        let mut pool = pool(4);
        pool.reset().unwrap();

        let result = pool.step(&[0, 1, 0, 1]).unwrap();

        assert_eq!(result.observations.len(), 4);
        assert_eq!(result.rewards, vec![1.0; 4]);
        assert_eq!(result.dones, vec![false; 4]);
        assert_eq!(result.infos.len(), 4);
        assert!(result.validate(4, 3).is_ok());
    }

    #[test]
    fn test_pool_step_wrong_action_count() {
        let mut pool = pool(4);
        pool.reset().unwrap();

        let err = pool.step(&[0, 1]).unwrap_err();
        assert!(err.to_string().contains("must match number of environments"));
    }

    #[test]
    fn test_pool_auto_reset() {
        let mut pool = pool(2);
        let initial = pool.reset().unwrap();

        pool.step(&[0, 0]).unwrap();
        pool.step(&[0, 0]).unwrap();
        let last = pool.step(&[0, 0]).unwrap();

        assert_eq!(last.rewards, vec![3.0, 3.0]);
        assert_eq!(last.dones, vec![true, true]);
        // Returned observation belongs to the new episode
        assert_eq!(last.observations, initial);
        for info in &last.infos {
            let terminal = info.terminal_observation.as_ref().unwrap();
            assert_eq!(terminal, &vec![4.0; 3]);
        }

        // The next step starts the schedule over
        let next = pool.step(&[0, 0]).unwrap();
        assert_eq!(next.rewards, vec![1.0, 1.0]);
        assert_eq!(next.dones, vec![false, false]);
    }

    #[test]
    fn test_pool_rank_aware_factory() {
        let pool = EnvPool::new(
            |rank| ScriptedEnv::<i64>::new(vec![1], vec![rank as f32; rank + 1]),
            3,
        );
        assert_eq!(pool.env(2).episode_len(), 3);
        assert_eq!(pool.env(0).episode_len(), 1);
    }

    #[test]
    fn test_pool_spaces() {
        let pool = pool(4);
        assert_eq!(pool.observation_space().shape, vec![3]);
        assert_eq!(pool.action_space().shape, vec![1]);
    }
}
