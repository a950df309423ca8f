//! Rollout storage for on-policy training
//!
//! This module implements experience storage for a single rollout:
//! - Time-major collection of observations, actions, values, rewards and
//!   episode boundaries
//! - Advantage estimation (N-step discounted return or GAE)
//! - Environment-major flattening for minibatch consumers
//!
//! # Buffer Layout
//!
//! Collection uses a `[num_steps, num_envs]` layout, matching the order in
//! which a vectorized environment produces transitions. The flattened
//! [`RolloutBatch`] uses `[num_envs, num_steps]` so that every environment's
//! trajectory is contiguous.

pub mod advantage;
pub mod storage;

#[cfg(test)]
mod tests;

pub use advantage::{AdvantageEstimator, Gae, NStepReturn, discounted_returns};
pub use storage::{RolloutBatch, RolloutStorage};
