//! Diagonal Gaussian actor-critic for continuous control
//!
//! A thin tch-rs adapter exposing the [`Policy`] contract for vector
//! observations. The actor and critic are separate MLPs so that they can be
//! optimized with different learning rates.
//!
//! # Architecture
//!
//! ```text
//!        Input (observations)
//!          /            \
//!   [Dense(h)] Tanh   [Dense(h)] Tanh
//!   [Dense(h)] Tanh   [Dense(h)] Tanh
//!   [Dense(a)]        [Dense(1)]
//!        |                 |
//!      mean μ            value
//!
//!   action ~ N(μ, exp(log_std)), clipped to the action bounds
//! ```

use anyhow::{Result, bail, ensure};
use tch::{
    Device, Kind, Tensor,
    nn::{self, Init, Module},
};

use super::{ObservationBatch, Policy, PolicyStep};
use crate::env::{SpaceInfo, SpaceType};

/// ln(2π) / 2
const HALF_LOG_2PI: f64 = 0.918_938_533_204_672_7;

/// Gaussian policy with a separate value network
pub struct GaussianPolicy {
    vs: nn::VarStore,
    actor: nn::Sequential,
    critic: nn::Sequential,
    log_std: Tensor,
    obs_dim: i64,
    action_dim: i64,
    low: f64,
    high: f64,
    device: Device,
}

impl GaussianPolicy {
    /// Create a new Gaussian policy
    ///
    /// # Arguments
    ///
    /// * `obs_dim` - Observation dimensionality
    /// * `action_dim` - Action dimensionality
    /// * `hidden_dim` - Width of the hidden layers
    /// * `low` - Lower action bound
    /// * `high` - Upper action bound
    pub fn new(obs_dim: i64, action_dim: i64, hidden_dim: i64, low: f32, high: f32) -> Result<Self> {
        ensure!(obs_dim > 0 && action_dim > 0, "dimensions must be positive");
        ensure!(high > low, "action bounds must satisfy low < high");

        let device = Device::cuda_if_available();
        tracing::info!("GaussianPolicy using device: {:?}", device);
        let vs = nn::VarStore::new(device);
        let root = vs.root();

        let hidden_config = nn::LinearConfig {
            ws_init: Init::Orthogonal { gain: 2.0_f64.sqrt() },
            ..Default::default()
        };
        let output_config =
            nn::LinearConfig { ws_init: Init::Orthogonal { gain: 0.01 }, ..Default::default() };

        let actor_path = &root / "actor";
        let actor = nn::seq()
            .add(nn::linear(&actor_path / "fc1", obs_dim, hidden_dim, hidden_config))
            .add_fn(|x| x.tanh())
            .add(nn::linear(&actor_path / "fc2", hidden_dim, hidden_dim, hidden_config))
            .add_fn(|x| x.tanh())
            .add(nn::linear(&actor_path / "mean", hidden_dim, action_dim, output_config));
        let log_std = actor_path.var("log_std", &[action_dim], Init::Const(0.0));

        let critic_path = &root / "critic";
        let critic = nn::seq()
            .add(nn::linear(&critic_path / "fc1", obs_dim, hidden_dim, hidden_config))
            .add_fn(|x| x.tanh())
            .add(nn::linear(&critic_path / "fc2", hidden_dim, hidden_dim, hidden_config))
            .add_fn(|x| x.tanh())
            .add(nn::linear(&critic_path / "value", hidden_dim, 1, hidden_config));

        Ok(Self {
            vs,
            actor,
            critic,
            log_std,
            obs_dim,
            action_dim,
            low: low as f64,
            high: high as f64,
            device,
        })
    }

    /// Create a policy matching flat observation and continuous action spaces
    pub fn from_spaces(obs_space: &SpaceInfo, action_space: &SpaceInfo, hidden_dim: i64) -> Result<Self> {
        ensure!(obs_space.shape.len() == 1, "GaussianPolicy needs flat observations, got {:?}", obs_space.shape);
        let SpaceType::Continuous { low, high } = action_space.space_type else {
            bail!("GaussianPolicy needs a continuous action space");
        };
        Self::new(obs_space.numel() as i64, action_space.numel() as i64, hidden_dim, low, high)
    }

    /// Forward pass: compute action means and values
    pub fn forward(&self, obs: &Tensor) -> (Tensor, Tensor) {
        let mean = self.actor.forward(obs);
        let values = self.critic.forward(obs).squeeze_dim(-1);
        (mean, values)
    }

    /// Get the device this policy is on (CPU or CUDA)
    pub fn device(&self) -> Device {
        self.device
    }

    /// Get reference to variable store
    pub fn var_store(&self) -> &nn::VarStore {
        &self.vs
    }

    /// Get mutable reference to variable store (for optimizer creation)
    pub fn var_store_mut(&mut self) -> &mut nn::VarStore {
        &mut self.vs
    }

    fn to_tensor(&self, observations: &ObservationBatch) -> Result<Tensor> {
        ensure!(
            observations.obs_len() as i64 == self.obs_dim,
            "observation length {} does not match policy input {}",
            observations.obs_len(),
            self.obs_dim
        );
        Ok(Tensor::from_slice(observations.data())
            .view([observations.num_envs() as i64, self.obs_dim])
            .to_device(self.device))
    }
}

fn to_vec(tensor: &Tensor) -> Result<Vec<f32>> {
    let flat = tensor.to_device(Device::Cpu).to_kind(Kind::Float).contiguous().view([-1]);
    Ok(Vec::<f32>::try_from(flat)?)
}

impl Policy for GaussianPolicy {
    type Action = Vec<f32>;

    fn step(&mut self, observations: &ObservationBatch) -> Result<PolicyStep<Vec<f32>>> {
        let obs = self.to_tensor(observations)?;

        let (actions, values, log_probs) = tch::no_grad(|| {
            let (mean, values) = self.forward(&obs);
            let std = self.log_std.exp();
            let sampled = &mean + &std * mean.randn_like();

            let z = (&sampled - &mean) / &std;
            let log_probs = (z.square() * -0.5 - &self.log_std - HALF_LOG_2PI)
                .sum_dim_intlist(-1, false, Kind::Float);

            (sampled.clamp(self.low, self.high), values, log_probs)
        });

        let actions: Vec<Vec<f32>> = to_vec(&actions)?
            .chunks_exact(self.action_dim as usize)
            .map(|chunk| chunk.to_vec())
            .collect();

        Ok(PolicyStep { actions, values: to_vec(&values)?, log_probs: to_vec(&log_probs)? })
    }

    fn value_step(&mut self, observations: &ObservationBatch) -> Result<Vec<f32>> {
        let obs = self.to_tensor(observations)?;
        let values = tch::no_grad(|| self.critic.forward(&obs).squeeze_dim(-1));
        to_vec(&values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_step_shapes_and_bounds() {
        let mut policy = GaussianPolicy::new(3, 2, 16, -0.5, 0.5).unwrap();
        let obs = ObservationBatch::zeros(4, vec![3]);

        let step = policy.step(&obs).unwrap();
        assert!(step.validate(4).is_ok());
        for action in &step.actions {
            assert_eq!(action.len(), 2);
            assert!(action.iter().all(|a| (-0.5..=0.5).contains(a)));
        }
        assert_eq!(policy.value_step(&obs).unwrap().len(), 4);
    }

    #[test]
    fn test_gaussian_rejects_wrong_observation_size() {
        let mut policy = GaussianPolicy::new(3, 1, 8, -1.0, 1.0).unwrap();
        let obs = ObservationBatch::zeros(2, vec![5]);
        assert!(policy.step(&obs).is_err());
    }
}
