//! Observation adapters
//!
//! An adapter turns the raw observations returned by the environment into
//! the batch the policy sees, and keeps whatever per-environment state that
//! requires across steps.

use anyhow::Result;

use crate::{buffer::FrameStack, policy::ObservationBatch};

/// Converts environment observations into policy input
pub trait ObservationAdapter {
    /// Shape of one environment's policy input
    fn obs_shape(&self) -> &[usize];

    /// Start from freshly reset observations
    fn reset(&mut self, observations: &[Vec<f32>]) -> Result<()>;

    /// Absorb the observations returned by one vectorized step
    ///
    /// `dones[i]` is true when environment `i` finished an episode during the
    /// step, in which case `observations[i]` is already the first observation
    /// of its next episode.
    fn observe(&mut self, observations: &[Vec<f32>], dones: &[bool]) -> Result<()>;

    /// Current policy input for every environment
    fn current(&self) -> &ObservationBatch;
}

/// Passes flat observations through unchanged
#[derive(Debug, Clone)]
pub struct RawObservations {
    batch: ObservationBatch,
}

impl RawObservations {
    /// Create an adapter for `num_envs` observations of shape `obs_shape`
    pub fn new(num_envs: usize, obs_shape: Vec<usize>) -> Self {
        Self { batch: ObservationBatch::zeros(num_envs, obs_shape) }
    }
}

impl ObservationAdapter for RawObservations {
    fn obs_shape(&self) -> &[usize] {
        self.batch.obs_shape()
    }

    fn reset(&mut self, observations: &[Vec<f32>]) -> Result<()> {
        self.batch.copy_rows(observations)
    }

    fn observe(&mut self, observations: &[Vec<f32>], _dones: &[bool]) -> Result<()> {
        self.batch.copy_rows(observations)
    }

    fn current(&self) -> &ObservationBatch {
        &self.batch
    }
}

/// Stacks the most recent image frames along the channel axis
///
/// An environment that finished an episode has its stack zeroed before the
/// new episode's first frame is appended, so frames never leak across
/// episodes.
#[derive(Debug, Clone)]
pub struct StackedFrames {
    stack: FrameStack,
}

impl StackedFrames {
    /// Create an adapter for `[height, width, channels]` frames
    pub fn new(num_envs: usize, frame_shape: &[usize], n_stack: usize) -> Result<Self> {
        Ok(Self { stack: FrameStack::new(num_envs, frame_shape, n_stack)? })
    }

    /// Underlying frame stack
    pub fn frames(&self) -> &FrameStack {
        &self.stack
    }
}

impl ObservationAdapter for StackedFrames {
    fn obs_shape(&self) -> &[usize] {
        self.stack.observations().obs_shape()
    }

    fn reset(&mut self, observations: &[Vec<f32>]) -> Result<()> {
        self.stack.clear_all();
        self.stack.push_all(observations)
    }

    fn observe(&mut self, observations: &[Vec<f32>], dones: &[bool]) -> Result<()> {
        for (env_id, &done) in dones.iter().enumerate() {
            if done {
                self.stack.clear(env_id);
            }
        }
        self.stack.push_all(observations)
    }

    fn current(&self) -> &ObservationBatch {
        self.stack.observations()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_passthrough() {
        let mut adapter = RawObservations::new(2, vec![2]);
        adapter.reset(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        adapter.observe(&[vec![5.0, 6.0], vec![7.0, 8.0]], &[true, false]).unwrap();

        assert_eq!(adapter.obs_shape(), &[2]);
        assert_eq!(adapter.current().data(), &[5.0, 6.0, 7.0, 8.0]);
        assert!(adapter.observe(&[vec![1.0]], &[false]).is_err());
    }

    #[test]
    fn test_stacked_zeroes_done_env_before_push() {
        let mut adapter = StackedFrames::new(2, &[1, 1, 1], 3).unwrap();
        adapter.reset(&[vec![1.0], vec![1.0]]).unwrap();
        adapter.observe(&[vec![2.0], vec![2.0]], &[false, false]).unwrap();
        adapter.observe(&[vec![9.0], vec![3.0]], &[true, false]).unwrap();

        assert_eq!(adapter.obs_shape(), &[1, 1, 3]);
        assert_eq!(adapter.current().row(0), &[0.0, 0.0, 9.0]);
        assert_eq!(adapter.current().row(1), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_stacked_reset_clears_history() {
        let mut adapter = StackedFrames::new(1, &[1, 1, 1], 2).unwrap();
        adapter.reset(&[vec![1.0]]).unwrap();
        adapter.observe(&[vec![2.0]], &[false]).unwrap();
        adapter.reset(&[vec![5.0]]).unwrap();

        assert_eq!(adapter.current().row(0), &[0.0, 5.0]);
    }
}
