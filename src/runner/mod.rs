//! Lockstep rollout collection
//!
//! A [`Runner`] owns a vector of environments and drives it for `n_step`
//! synchronized steps per [`Runner::run`], producing a flattened
//! [`RolloutBatch`] with advantages and returns.
//!
//! # Collection Loop
//!
//! ```text
//! repeat n_step times:
//!   actions, values, log_probs = policy.step(obs)
//!   record obs, actions, values, log_probs, dones-so-far
//!   obs, rewards, dones = env.step(actions)
//!   record rewards
//! bootstrap = policy.value_step(obs)
//! update episode statistics
//! estimate advantages, flatten environment-major
//! ```
//!
//! The runner is generic over an [`ObservationAdapter`] (raw vectors or
//! stacked image frames) and an [`AdvantageEstimator`] (N-step return or
//! GAE). The two standard pairings have dedicated constructors:
//! [`Runner::vector`] and [`Runner::image`].

use anyhow::{Context, Result, ensure};

use crate::{
    buffer::{AdvantageEstimator, Gae, NStepReturn, RolloutBatch, RolloutStorage},
    env::VecEnv,
    policy::Policy,
};

pub mod config;
pub mod observation;
pub mod stats;

pub use config::RunnerConfig;
pub use observation::{ObservationAdapter, RawObservations, StackedFrames};
pub use stats::EpisodeStats;

/// Continuous-control runner: flat observations, N-step discounted returns
pub type VectorRunner<E> = Runner<E, RawObservations, NStepReturn>;

/// Pixel-based runner: stacked frames, GAE
pub type ImageRunner<E> = Runner<E, StackedFrames, Gae>;

/// Rollout collector over a vector of environments
pub struct Runner<E: VecEnv, O, A> {
    env: E,
    observations: O,
    estimator: A,
    n_step: usize,
    render: bool,

    /// Done flags produced by the most recent step
    dones: Vec<bool>,

    stats: EpisodeStats,
}

impl<E, O, A> Runner<E, O, A>
where
    E: VecEnv,
    O: ObservationAdapter,
    A: AdvantageEstimator,
{
    /// Create a runner from explicit parts
    ///
    /// Resets the environments and feeds the initial observations to the
    /// adapter.
    pub fn new(mut env: E, mut observations: O, estimator: A, config: &RunnerConfig) -> Result<Self> {
        config.validate()?;

        let num_envs = env.num_envs();
        ensure!(num_envs > 0, "runner needs at least one environment");

        let initial = env.reset().context("environment reset failed")?;
        ensure!(
            initial.len() == num_envs,
            "environment reset returned {} observations, expected {}",
            initial.len(),
            num_envs
        );
        observations.reset(&initial).context("initial observations rejected")?;

        tracing::info!(
            "Runner initialized: {} envs, {} steps per rollout, policy input {:?}",
            num_envs,
            config.n_step,
            observations.obs_shape()
        );

        Ok(Self {
            env,
            observations,
            estimator,
            n_step: config.n_step,
            render: config.render,
            dones: vec![false; num_envs],
            stats: EpisodeStats::with_window(num_envs, config.stats_window)?,
        })
    }

    /// Collect one rollout and estimate its advantages
    ///
    /// Every output has `num_envs * n_step` samples in environment-major
    /// order. Episode statistics are updated before returning.
    ///
    /// # Errors
    ///
    /// Fails if the policy or the environments return misshapen data, or if
    /// either collaborator itself fails. The runner's state is then
    /// unspecified and it should be discarded.
    pub fn run<P>(&mut self, policy: &mut P) -> Result<RolloutBatch<E::Action>>
    where
        P: Policy<Action = E::Action>,
    {
        if self.render {
            self.env.render().context("render failed")?;
        }

        let num_envs = self.num_envs();
        let obs_shape = self.observations.obs_shape().to_vec();
        let raw_len = self.env.observation_space().numel();
        let mut storage = RolloutStorage::new(self.n_step, num_envs, obs_shape);

        for step in 0..self.n_step {
            let current = self.observations.current();
            let output = policy.step(current).with_context(|| format!("policy step failed at step {step}"))?;
            output.validate(num_envs).context("policy step broke its contract")?;

            storage.push_step(current.data(), &output.actions, &output.values, &output.log_probs, &self.dones);

            let result = self
                .env
                .step(&output.actions)
                .with_context(|| format!("environment step failed at step {step}"))?;
            result.validate(num_envs, raw_len).context("environment step broke its contract")?;

            storage.push_rewards(&result.rewards);
            self.dones = result.dones;
            self.observations
                .observe(&result.observations, &self.dones)
                .with_context(|| format!("observations rejected at step {step}"))?;
        }

        let last_values = policy.value_step(self.observations.current()).context("policy value step failed")?;
        ensure!(
            last_values.len() == num_envs,
            "policy value step returned {} values, expected {}",
            last_values.len(),
            num_envs
        );

        let completed_before = self.stats.completed_episodes();
        self.stats.record(storage.rewards(), storage.episode_starts());

        let batch = storage.into_batch(&self.estimator, &last_values, &self.dones);

        let (mean_reward, mean_length) = self.stats.get_performance();
        tracing::debug!(
            samples = batch.len(),
            episodes = self.stats.completed_episodes() - completed_before,
            mean_return = batch.mean_return(),
            mean_reward,
            mean_length,
            "rollout collected"
        );

        Ok(batch)
    }
}

impl<E: VecEnv, O, A> Runner<E, O, A> {
    /// Mean total reward and mean length of recent completed episodes
    pub fn get_performance(&self) -> (f32, f32) {
        self.stats.get_performance()
    }

    /// Episode statistics
    pub fn stats(&self) -> &EpisodeStats {
        &self.stats
    }

    /// Number of environments
    pub fn num_envs(&self) -> usize {
        self.dones.len()
    }

    /// Steps per rollout
    pub fn n_step(&self) -> usize {
        self.n_step
    }

    /// Samples produced by each rollout
    pub fn batch_size(&self) -> usize {
        self.n_step * self.num_envs()
    }

    /// Observation adapter
    pub fn observations(&self) -> &O {
        &self.observations
    }

    /// Done flags produced by the most recent step
    pub fn dones(&self) -> &[bool] {
        &self.dones
    }

    /// Environment vector
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Mutable environment vector
    pub fn env_mut(&mut self) -> &mut E {
        &mut self.env
    }

    /// Render the environments
    pub fn render(&mut self) -> Result<()> {
        self.env.render()
    }

    /// Close the environments and return them
    pub fn close(mut self) -> Result<E> {
        self.env.close()?;
        Ok(self.env)
    }
}

impl<E: VecEnv> Runner<E, RawObservations, NStepReturn> {
    /// Build a continuous-control runner
    ///
    /// Observations are passed through unchanged and returns are N-step
    /// discounted with `config.gamma`.
    pub fn vector(env: E, config: &RunnerConfig) -> Result<Self> {
        ensure!(env.num_envs() > 0, "runner needs at least one environment");
        let adapter = RawObservations::new(env.num_envs(), env.observation_space().shape);
        Self::new(env, adapter, NStepReturn::new(config.gamma), config)
    }
}

impl<E: VecEnv> Runner<E, StackedFrames, Gae> {
    /// Build a pixel-based runner
    ///
    /// The environment must produce `[height, width, channels]` frames; the
    /// policy receives `[height, width, channels * n_stack]` stacks and
    /// advantages use GAE with `config.gamma` and `config.gae_lambda`.
    pub fn image(env: E, config: &RunnerConfig) -> Result<Self> {
        ensure!(env.num_envs() > 0, "runner needs at least one environment");
        let frame_shape = env.observation_space().shape;
        let adapter = StackedFrames::new(env.num_envs(), &frame_shape, config.n_stack)?;
        Self::new(env, adapter, Gae::new(config.gamma, config.gae_lambda), config)
    }
}
