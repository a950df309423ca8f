//! Fixed-depth frame stacking for image observations
//!
//! Each environment owns a `[height, width, channels * n_stack]` slot. A new
//! frame is inserted by dropping the oldest `channels` values of every pixel
//! and appending the newest ones at the end, so the last `channels` values of
//! each pixel always hold the most recent frame:
//!
//! ```text
//! pixel before push:  [f0 | f1 | f2 | f3]
//! pixel after push:   [f1 | f2 | f3 | new]
//! ```
//!
//! The backing array is allocated once; pushes and clears work in place.

use anyhow::{Result, ensure};

use crate::policy::ObservationBatch;

/// Stacked observation buffer for `num_envs` environments
#[derive(Debug, Clone)]
pub struct FrameStack {
    height: usize,
    width: usize,
    channels: usize,
    n_stack: usize,
    stacked: ObservationBatch,
}

impl FrameStack {
    /// Create a zeroed frame stack
    ///
    /// # Arguments
    ///
    /// * `num_envs` - Number of environments
    /// * `frame_shape` - `[height, width, channels]` of a single raw frame
    /// * `n_stack` - Number of frames kept per environment
    pub fn new(num_envs: usize, frame_shape: &[usize], n_stack: usize) -> Result<Self> {
        ensure!(
            frame_shape.len() == 3,
            "frame stacking needs [height, width, channels] frames, got shape {:?}",
            frame_shape
        );
        ensure!(n_stack > 0, "n_stack must be positive");

        let (height, width, channels) = (frame_shape[0], frame_shape[1], frame_shape[2]);
        ensure!(channels > 0, "frames must have at least one channel");

        let stacked = ObservationBatch::zeros(num_envs, vec![height, width, channels * n_stack]);
        Ok(Self { height, width, channels, n_stack, stacked })
    }

    /// Append a frame to one environment's stack, discarding its oldest frame
    pub fn push(&mut self, env_id: usize, frame: &[f32]) -> Result<()> {
        let frame_len = self.height * self.width * self.channels;
        ensure!(
            frame.len() == frame_len,
            "frame for env {} has length {}, expected {} ([{}, {}, {}])",
            env_id,
            frame.len(),
            frame_len,
            self.height,
            self.width,
            self.channels
        );

        let channels = self.channels;
        let depth = channels * self.n_stack;
        let slot = self.stacked.row_mut(env_id);

        for (pixel, new) in slot.chunks_exact_mut(depth).zip(frame.chunks_exact(channels)) {
            pixel.copy_within(channels.., 0);
            pixel[depth - channels..].copy_from_slice(new);
        }
        Ok(())
    }

    /// Append one frame per environment
    pub fn push_all(&mut self, frames: &[Vec<f32>]) -> Result<()> {
        ensure!(
            frames.len() == self.stacked.num_envs(),
            "got {} frames for {} environments",
            frames.len(),
            self.stacked.num_envs()
        );
        for (env_id, frame) in frames.iter().enumerate() {
            self.push(env_id, frame)?;
        }
        Ok(())
    }

    /// Zero one environment's stack
    pub fn clear(&mut self, env_id: usize) {
        self.stacked.row_mut(env_id).fill(0.0);
    }

    /// Zero every environment's stack
    pub fn clear_all(&mut self) {
        for env_id in 0..self.stacked.num_envs() {
            self.clear(env_id);
        }
    }

    /// Channels contributed by each frame
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames kept per environment
    pub fn n_stack(&self) -> usize {
        self.n_stack
    }

    /// Current stacked observations, `[num_envs, height, width, channels * n_stack]`
    pub fn observations(&self) -> &ObservationBatch {
        &self.stacked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape() {
        let stack = FrameStack::new(3, &[4, 5, 2], 4).unwrap();
        assert_eq!(stack.observations().shape(), vec![3, 4, 5, 8]);
        assert!(stack.observations().data().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_rejects_non_image_frames() {
        assert!(FrameStack::new(1, &[4], 4).is_err());
        assert!(FrameStack::new(1, &[2, 2, 1], 0).is_err());
    }

    #[test]
    fn test_push_shifts_oldest_out() {
        // One pixel, two channels, three frames deep
        let mut stack = FrameStack::new(1, &[1, 1, 2], 3).unwrap();

        stack.push(0, &[1.0, 1.5]).unwrap();
        assert_eq!(stack.observations().row(0), &[0.0, 0.0, 0.0, 0.0, 1.0, 1.5]);

        stack.push(0, &[2.0, 2.5]).unwrap();
        stack.push(0, &[3.0, 3.5]).unwrap();
        assert_eq!(stack.observations().row(0), &[1.0, 1.5, 2.0, 2.5, 3.0, 3.5]);

        stack.push(0, &[4.0, 4.5]).unwrap();
        assert_eq!(stack.observations().row(0), &[2.0, 2.5, 3.0, 3.5, 4.0, 4.5]);
    }

    #[test]
    fn test_push_is_per_pixel() {
        // Two pixels, one channel, two frames deep
        let mut stack = FrameStack::new(1, &[1, 2, 1], 2).unwrap();
        stack.push(0, &[1.0, 10.0]).unwrap();
        stack.push(0, &[2.0, 20.0]).unwrap();

        // Pixel-major layout: [p0_f0, p0_f1, p1_f0, p1_f1]
        assert_eq!(stack.observations().row(0), &[1.0, 2.0, 10.0, 20.0]);
    }

    #[test]
    fn test_clear_only_touches_one_env() {
        let mut stack = FrameStack::new(2, &[1, 1, 1], 2).unwrap();
        stack.push_all(&[vec![1.0], vec![2.0]]).unwrap();
        stack.clear(0);

        assert_eq!(stack.observations().row(0), &[0.0, 0.0]);
        assert_eq!(stack.observations().row(1), &[0.0, 2.0]);
    }

    #[test]
    fn test_push_rejects_wrong_frame_size() {
        let mut stack = FrameStack::new(2, &[2, 2, 1], 2).unwrap();
        assert!(stack.push(0, &[1.0; 3]).is_err());
        assert!(stack.push_all(&[vec![1.0; 4]]).is_err());
    }
}
