mod cli;
mod runner;

use clap::Parser;
use cli::{Cli, Commands};
use maildrain::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Drain(args) => {
            let config = Config::load(cli.config, &args.overrides())?;
            runner::run(config).await?;
        }
        Commands::Config(args) => {
            let config = Config::load(cli.config, &args.overrides())?;
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
