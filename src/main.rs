mod commands;

use brixie::config::Config;
use brixie::logging;
use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "brixie")]
#[command(about = "An offline-first browser for the Rebrickable LEGO catalog")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/brixie/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: commands::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = logging::init(&config.logging)?;

  let ctx = commands::Context::build(&config)?;
  commands::run(&ctx, args.command).await
}
