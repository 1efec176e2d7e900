use clap::Parser;
use std::error::Error;
use tokio::net::TcpListener;

use sim::{serve, SimConfig};

/// Jaco robot-server simulator.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = 9030)]
    port: u16,

    /// Seconds of simulated time per step command
    #[arg(long, default_value_t = 0.02)]
    control_timestep: f64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let listener = TcpListener::bind((args.bind.as_str(), args.port)).await?;
    let config = SimConfig {
        control_timestep: args.control_timestep,
        ..SimConfig::default()
    };
    serve(listener, config).await
}
