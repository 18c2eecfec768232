mod api;
mod app;
mod cache;
mod commands;
mod config;
mod event;
mod logging;
mod query;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hearth")]
#[command(about = "A terminal board for your residential community")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/hearth/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Community to browse, overriding the config file
  #[arg(long)]
  community: Option<String>,

  /// Log debug output to the log file
  #[arg(short, long)]
  verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Flushes buffered log lines on drop
  let _log_guard = logging::init(args.verbose)?;

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(community) = args.community {
    config.community = Some(community);
  }
  info!(api = %config.api.url, community = ?config.community, "starting");

  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
