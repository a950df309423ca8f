//! # Lockstep
//!
//! Rollout collection and advantage estimation for on-policy actor-critic
//! training.
//!
//! A [`Runner`](runner::Runner) steps a vector of environments in lockstep,
//! records short fixed-length trajectories, estimates advantages (N-step
//! discounted return or GAE) and hands back environment-major batches ready
//! for a gradient update. Rolling episode statistics are kept for
//! monitoring.
//!
//! ## Quick Start
//!
//! ```rust
//! use lockstep_rl::prelude::*;
//! use lockstep_rl::env::scripted::ScriptedEnv;
//!
//! let pool = EnvPool::new(|_rank| ScriptedEnv::<Vec<f32>>::new(vec![3], vec![1.0; 10]), 4);
//! let config = RunnerConfig::new().n_step(8).gamma(0.99);
//! let mut runner = Runner::vector(pool, &config).unwrap();
//! let mut policy = UniformContinuous::new(1, -1.0, 1.0, 0).unwrap();
//!
//! let batch = runner.run(&mut policy).unwrap();
//! assert_eq!(batch.len(), 4 * 8);
//! let (mean_reward, mean_length) = runner.get_performance();
//! # let _ = (mean_reward, mean_length);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Environment traits and implementations
pub mod env;

/// Policy interface and baseline policies
/// gaussian submodule requires the training feature
pub mod policy;

/// Rollout storage, advantage estimation and frame stacking
pub mod buffer;

/// Rollout collection
pub mod runner;

/// Prelude module for convenient imports
///
/// This module re-exports commonly used types and traits for convenience.
pub mod prelude {
    pub use crate::buffer::{AdvantageEstimator, Gae, NStepReturn, RolloutBatch};
    pub use crate::env::{Environment, SpaceInfo, SpaceType, VecEnv, pool::EnvPool};
    pub use crate::policy::{
        ObservationBatch, Policy, PolicyStep,
        random::{UniformContinuous, UniformDiscrete},
    };
    pub use crate::runner::{
        EpisodeStats, ImageRunner, ObservationAdapter, RawObservations, Runner, RunnerConfig,
        StackedFrames, VectorRunner,
    };
}

/// Current version of lockstep-rl
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, "0.1.0");
    }
}
