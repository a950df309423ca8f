//! Rollout storage, advantage estimation and frame stacking

pub mod frame_stack;
pub mod rollout;

pub use frame_stack::FrameStack;
pub use rollout::{AdvantageEstimator, Gae, NStepReturn, RolloutBatch, RolloutStorage};
