use clap::{Parser, Subcommand};

mod commands;
mod pool;

use commands::{OptimizeArgs, SimulateArgs};

#[derive(Parser)]
#[command(name = "slate")]
#[command(about = "DFS lineup optimizer and contest simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate salary-capped, correlation-aware lineups from a pool CSV
    Optimize(OptimizeArgs),
    /// Optimize, then run Monte Carlo contest trials on the lineups
    Simulate(SimulateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Optimize(args) => commands::run_optimize(args).await,
        Commands::Simulate(args) => commands::run_simulate(args).await,
    }
}
