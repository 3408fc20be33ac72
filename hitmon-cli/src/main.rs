//! ## hitmon-cli
//! **Command line entrypoint for the access log monitor**
//!
//! `hitmon run` follows the access log, prints a traffic summary every report
//! interval and raises an alert while the average hit rate stays at or above
//! the threshold. `hitmon config` prints the effective configuration.

use clap::Parser;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    commands::run_command(cli).await
}
