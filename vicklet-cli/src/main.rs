mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use vicklet::LogConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = vicklet::util::init_logging(&LogConfig::from_env());

    match cli.command {
        Commands::Check(args) => commands::check::execute(args, &cli.global).await,
        Commands::Run(args) => commands::run::execute(args, &cli.global).await,
    }
}
