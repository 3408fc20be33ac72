use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use hitmon_config::{ConfigError, HitmonConfig, Overrides};
use hitmon_engine::run_monitor;
use hitmon_telemetry::logging::EventLogger;

#[derive(Parser)]
#[command(name = "hitmon", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow the access log and monitor its traffic
    Run(MonitorArgs),
    /// Print the effective configuration as YAML and exit
    Config(MonitorArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct MonitorArgs {
    /// Configuration file; `hitmon.yaml` in the working directory is used when present
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Access log to follow
    #[arg(long, env = "LOGPATH")]
    pub logpath: Option<PathBuf>,
    /// Average req/s over the alert period that raises an alert (0 keeps the configured value)
    #[arg(long)]
    pub alert_threshold: Option<f64>,
}

impl MonitorArgs {
    fn load(&self) -> Result<HitmonConfig, ConfigError> {
        HitmonConfig::load(self.config.as_deref())?.with_overrides(&Overrides {
            log_path: self.logpath.clone(),
            alert_threshold: self.alert_threshold,
        })
    }
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run(&args).await,
        Commands::Config(args) => print_config(&args),
    }
}

async fn run(args: &MonitorArgs) -> anyhow::Result<()> {
    let config = args.load().context("failed to load configuration")?;
    EventLogger::init(&config.telemetry.log_level).map_err(|e| anyhow!(e))?;

    info!(
        "Monitor started: file={:?}, threshold={:.1}",
        config.input.log_path, config.alert.threshold
    );
    run_monitor(&config, CancellationToken::new()).await?;
    info!("finished clean");
    Ok(())
}

fn print_config(args: &MonitorArgs) -> anyhow::Result<()> {
    let config = args.load().context("failed to load configuration")?;
    print!("{}", serde_yaml::to_string(&config)?);
    Ok(())
}
