//! Collect rollouts with both runner variants
//!
//! Drives a vector runner (N-step returns) and an image runner (frame
//! stacking + GAE) over scripted environments with uniform random policies,
//! and logs throughput and episode statistics.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example collect_rollouts --release
//! ```

use std::time::Instant;

use anyhow::Result;
use lockstep_rl::{
    env::scripted::ScriptedEnv,
    prelude::*,
};

const NUM_ENVS: usize = 8;
const NUM_ROLLOUTS: usize = 50;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    tracing::info!("lockstep-rl {}", lockstep_rl::VERSION);

    run_vector()?;
    run_image()?;

    Ok(())
}

/// Continuous control: flat observations, N-step returns
fn run_vector() -> Result<()> {
    let config = RunnerConfig::new().n_step(5).gamma(0.99);
    tracing::info!("Vector runner: {} envs, config {:?}", NUM_ENVS, config);

    // Episodes of varying length per environment
    let pool = EnvPool::new(|rank| ScriptedEnv::<Vec<f32>>::new(vec![4], vec![0.5; 7 + rank]), NUM_ENVS);
    let mut policy = UniformContinuous::from_space(&pool.action_space(), 42)?;
    let mut runner = Runner::vector(pool, &config)?;

    collect(&mut runner, &mut policy, "vector")
}

/// Pixel input: 8x8 RGB frames stacked 4 deep, GAE
fn run_image() -> Result<()> {
    let config = RunnerConfig::new().n_step(16).gamma(0.99).gae_lambda(0.95).n_stack(4);
    tracing::info!("Image runner: {} envs, config {:?}", NUM_ENVS, config);

    let action_space = SpaceInfo { shape: vec![], space_type: SpaceType::Discrete(6) };
    let pool = EnvPool::new(
        |rank| {
            let rewards = (0..20 + 3 * rank).map(|t| if t % 5 == 4 { 1.0 } else { 0.0 }).collect();
            ScriptedEnv::<i64>::new(vec![8, 8, 3], rewards).with_action_space(action_space.clone())
        },
        NUM_ENVS,
    );
    let mut policy = UniformDiscrete::from_space(&pool.action_space(), 7)?;
    let mut runner = Runner::image(pool, &config)?;
    tracing::info!("  Policy input shape: {:?}", runner.observations().obs_shape());

    collect(&mut runner, &mut policy, "image")
}

fn collect<E, O, A, P>(runner: &mut Runner<E, O, A>, policy: &mut P, label: &str) -> Result<()>
where
    E: VecEnv,
    O: ObservationAdapter,
    A: AdvantageEstimator,
    P: Policy<Action = E::Action>,
{
    let start = Instant::now();
    let mut mean_return = 0.0;

    for rollout in 0..NUM_ROLLOUTS {
        let batch = runner.run(policy)?;
        mean_return = batch.mean_return();

        if (rollout + 1) % 10 == 0 {
            let (mean_reward, mean_length) = runner.get_performance();
            tracing::info!(
                "[{}] rollout {:>3}: mean return {:.3}, episode reward {:.2}, episode length {:.1}",
                label,
                rollout + 1,
                mean_return,
                mean_reward,
                mean_length
            );
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    let steps = NUM_ROLLOUTS * runner.batch_size();
    tracing::info!(
        "[{}] {} steps in {:.2}s ({:.0} steps/s), {} episodes, final mean return {:.3}",
        label,
        steps,
        elapsed,
        steps as f64 / elapsed.max(1e-9),
        runner.stats().completed_episodes(),
        mean_return
    );

    Ok(())
}
