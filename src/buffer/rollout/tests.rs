//! Tests for estimators applied through rollout storage

#[cfg(test)]
mod estimator_tests {
    use crate::buffer::rollout::{Gae, NStepReturn, RolloutStorage};

    fn storage(rewards: &[[f32; 2]], values: &[[f32; 2]], starts: &[[bool; 2]]) -> RolloutStorage<i64> {
        let mut storage = RolloutStorage::new(rewards.len(), 2, vec![1]);
        for step in 0..rewards.len() {
            storage.push_step(&[0.0, 0.0], &[0, 0], &values[step], &[0.0, 0.0], &starts[step]);
            storage.push_rewards(&rewards[step]);
        }
        storage
    }

    #[test]
    fn test_environments_are_estimated_independently() {
        // Env 0 ends an episode after step 0, env 1 never does
        let rewards = [[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let values = [[0.0, 0.0]; 3];
        let starts = [[false, false], [true, false], [false, false]];

        let batch = storage(&rewards, &values, &starts)
            .into_batch(&NStepReturn::new(0.5), &[2.0, 2.0], &[false, false]);

        // Env 0: step 0 is terminal, steps 1-2 bootstrap from 2.0
        assert_eq!(&batch.returns[0..3], &[1.0, 2.0, 2.0]);
        // Env 1: 2.0 -> 2.0 -> 2.0 fixed point of R = 1 + 0.5 R
        assert_eq!(&batch.returns[3..6], &[2.0, 2.0, 2.0]);
        assert_eq!(&batch.dones[0..3], &[true, false, false]);
    }

    #[test]
    fn test_gae_uses_recorded_next_values() {
        let rewards = [[0.0, 0.0], [0.0, 0.0]];
        let values = [[1.0, 1.0], [3.0, 3.0]];
        let starts = [[false, false], [false, false]];

        // λ = 0 so each advantage is one TD error
        let batch = storage(&rewards, &values, &starts)
            .into_batch(&Gae::new(1.0, 0.0), &[10.0, 10.0], &[false, true]);

        // Step 0 bootstraps from the recorded value of step 1
        assert!((batch.advantages[0] - 2.0).abs() < 1e-6);
        assert!((batch.advantages[2] - 2.0).abs() < 1e-6);
        // Step 1 bootstraps from last_values unless the last step was terminal
        assert!((batch.advantages[1] - 7.0).abs() < 1e-6);
        assert!((batch.advantages[3] + 3.0).abs() < 1e-6);
        assert!((batch.returns[1] - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_gae_and_nstep_agree_at_lambda_one() {
        let rewards = [[1.0, -1.0], [0.5, 2.0], [3.0, 0.0], [1.0, 1.0]];
        let values = [[0.2, 0.4], [0.6, 0.8], [1.0, 1.2], [1.4, 1.6]];
        let starts = [[false, true], [false, false], [true, false], [false, true]];

        let gae = storage(&rewards, &values, &starts)
            .into_batch(&Gae::new(0.9, 1.0), &[0.5, -0.5], &[false, true]);
        let nstep = storage(&rewards, &values, &starts)
            .into_batch(&NStepReturn::new(0.9), &[0.5, -0.5], &[false, true]);

        for i in 0..gae.len() {
            assert!((gae.returns[i] - nstep.returns[i]).abs() < 1e-5, "sample {}", i);
        }
    }
}
