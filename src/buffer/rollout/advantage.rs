//! Advantage and return estimation
//!
//! Both estimators work on one environment at a time over a time-ordered
//! sequence of length `num_steps`. Episode boundaries are described by
//! `episode_starts`: `episode_starts[t]` is true when the observation at step
//! `t` is the first of a new episode, i.e. step `t - 1` ended an episode. The
//! end of step `num_steps - 1` is described by `last_done`.

/// Strategy for turning a rollout into advantages and returns
pub trait AdvantageEstimator {
    /// Compute advantages and returns for a single environment
    ///
    /// # Arguments
    /// * `rewards` - Reward of each step
    /// * `values` - Value estimate of each step's observation
    /// * `episode_starts` - Whether each step's observation began an episode
    /// * `last_value` - Bootstrap value of the observation after the last step
    /// * `last_done` - Whether the last step ended an episode
    /// * `advantages` - Output advantages
    /// * `returns` - Output returns
    #[allow(clippy::too_many_arguments)]
    fn estimate(
        &self,
        rewards: &[f32],
        values: &[f32],
        episode_starts: &[bool],
        last_value: f32,
        last_done: bool,
        advantages: &mut [f32],
        returns: &mut [f32],
    );
}

/// Whether the episode continues after step `t`, as a multiplicative mask
#[inline]
fn next_nonterminal(episode_starts: &[bool], last_done: bool, t: usize) -> f32 {
    let done = if t + 1 == episode_starts.len() { last_done } else { episode_starts[t + 1] };
    if done { 0.0 } else { 1.0 }
}

/// N-step bootstrapped discounted return
///
/// ```text
/// R = V_last * (1 - done_last)
/// R_t = r_t + γ * R_{t+1} * (1 - done_t)
/// A_t = R_t - V_t
/// ```
#[derive(Debug, Clone, Copy)]
pub struct NStepReturn {
    /// Discount factor
    pub gamma: f32,
}

impl NStepReturn {
    /// Create an N-step return estimator
    pub fn new(gamma: f32) -> Self {
        Self { gamma }
    }
}

impl AdvantageEstimator for NStepReturn {
    fn estimate(
        &self,
        rewards: &[f32],
        values: &[f32],
        episode_starts: &[bool],
        last_value: f32,
        last_done: bool,
        advantages: &mut [f32],
        returns: &mut [f32],
    ) {
        discounted_returns(rewards, episode_starts, last_value, last_done, self.gamma, returns);

        for t in 0..rewards.len() {
            advantages[t] = returns[t] - values[t];
        }
    }
}

/// Compute bootstrapped discounted returns for a single environment
pub fn discounted_returns(
    rewards: &[f32],
    episode_starts: &[bool],
    last_value: f32,
    last_done: bool,
    gamma: f32,
    returns: &mut [f32],
) {
    let num_steps = rewards.len();
    debug_assert_eq!(episode_starts.len(), num_steps);
    debug_assert_eq!(returns.len(), num_steps);

    let mut discounted = last_value;

    for t in (0..num_steps).rev() {
        discounted = rewards[t] + gamma * discounted * next_nonterminal(episode_starts, last_done, t);
        returns[t] = discounted;
    }
}

/// Generalized Advantage Estimation (GAE-λ)
///
/// ```text
/// δ_t = r_t + γ * V_{t+1} * (1 - done_t) - V_t
/// A_t = δ_t + γ * λ * (1 - done_t) * A_{t+1}
/// R_t = A_t + V_t
/// ```
///
/// λ = 1 recovers the discounted return minus the value baseline; λ = 0 is
/// the one-step TD error.
#[derive(Debug, Clone, Copy)]
pub struct Gae {
    /// Discount factor
    pub gamma: f32,

    /// Exponential weighting of multi-step TD errors
    pub lambda: f32,
}

impl Gae {
    /// Create a GAE estimator
    pub fn new(gamma: f32, lambda: f32) -> Self {
        Self { gamma, lambda }
    }
}

impl AdvantageEstimator for Gae {
    fn estimate(
        &self,
        rewards: &[f32],
        values: &[f32],
        episode_starts: &[bool],
        last_value: f32,
        last_done: bool,
        advantages: &mut [f32],
        returns: &mut [f32],
    ) {
        let num_steps = rewards.len();
        debug_assert_eq!(values.len(), num_steps);
        debug_assert_eq!(episode_starts.len(), num_steps);
        debug_assert_eq!(advantages.len(), num_steps);
        debug_assert_eq!(returns.len(), num_steps);

        let mut last_gae_lam = 0.0;

        for t in (0..num_steps).rev() {
            let nonterminal = next_nonterminal(episode_starts, last_done, t);
            let next_value = if t + 1 == num_steps { last_value } else { values[t + 1] };

            let delta = rewards[t] + self.gamma * next_value * nonterminal - values[t];
            last_gae_lam = delta + self.gamma * self.lambda * nonterminal * last_gae_lam;

            advantages[t] = last_gae_lam;
            returns[t] = last_gae_lam + values[t];
        }
    }
}
