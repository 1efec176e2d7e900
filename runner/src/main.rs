use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use jaco_rmi::drivers::RobotClientConfig;
use reacher::{
    BackendConfig, Difficulty, Environment, EnvironmentConfig, FenceBounds, HardwareConfig,
};

/// Runs reacher episodes under a random bounded policy and reports returns.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON environment config; overrides the difficulty preset
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "easy")]
    difficulty: Difficulty,

    #[arg(short, long, default_value_t = 3)]
    episodes: u32,

    #[arg(short, long)]
    seed: Option<u64>,

    /// Largest per-tick joint change of the random policy, radians
    #[arg(long, default_value_t = 0.05)]
    max_delta: f64,

    /// Robot server address; runs on hardware instead of the simulator
    #[arg(long)]
    addr: Option<String>,

    #[arg(long, default_value_t = 9030)]
    port: u32,

    /// Print the resolved config and exit
    #[arg(long)]
    print_config: bool,
}

fn resolve_config(args: &Args) -> reacher::Result<EnvironmentConfig> {
    if let Some(path) = &args.config {
        return EnvironmentConfig::from_file(path);
    }

    let backend = match &args.addr {
        Some(addr) => BackendConfig::Hardware(HardwareConfig {
            client: RobotClientConfig {
                addr: addr.clone(),
                port: args.port,
                ..RobotClientConfig::default()
            },
            ..HardwareConfig::default()
        }),
        None => BackendConfig::default(),
    };
    let config = args
        .difficulty
        .environment_config(backend, FenceBounds::default(), args.seed);
    config.validate()?;
    Ok(config)
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("reacher=info".parse()?)
                .add_directive("runner=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = resolve_config(&args)?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let mut env = Environment::from_config(&config)?;
    let n_actions = env.action_spec().len();
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    info!(
        "{} episodes of {} steps, {} actions",
        args.episodes,
        env.step_limit(),
        n_actions
    );

    for episode in 0..args.episodes {
        let mut time_step = env.reset()?;
        let mut episode_return = 0.0;

        while !time_step.is_last() {
            let action: Vec<f64> = (0..n_actions)
                .map(|_| rng.gen_range(-args.max_delta..=args.max_delta))
                .collect();
            time_step = match env.step(&action) {
                Ok(ts) => ts,
                Err(e) => {
                    warn!("episode {} aborted: {}", episode, e);
                    break;
                }
            };
            episode_return += time_step.reward.unwrap_or(0.0);
        }

        let rejected = env
            .task()
            .state()
            .map(|s| s.rejected_steps)
            .unwrap_or_default();
        info!(
            "episode {}: return {:.3}, {} rejected steps, final distance {:.3}",
            episode,
            episode_return,
            rejected,
            env.task().distance().unwrap_or(f64::NAN)
        );
    }

    env.close()?;
    Ok(())
}
