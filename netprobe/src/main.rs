use clap::{Args, Parser, Subcommand};
use netprobe::{
    config::{Configurable, FileConfig, MonitorSettings, ProbeSettings},
    observability, Monitor, MonitorOptions, Probe, ProbeError, ProbeStatus,
};
use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

const EXIT_SOFT_FAILURE: u8 = 1;
const EXIT_HARD_FAILURE: u8 = 2;
const EXIT_USAGE: u8 = 64;
// interrupted before the first probe finished
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(
    name = "netprobe",
    about = "Check internet connectivity: ICMP echo with an HTTP fallback",
    version,
    propagate_version = true
)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ProbeArgs {
    /// Host, IP or URL to probe (default: from config)
    address: Option<String>,
    /// YAML config file with `probe` / `monitor` sections
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Echo timeout in seconds
    #[arg(long)]
    echo_timeout: Option<u64>,
    /// HTTP fallback timeout in seconds
    #[arg(long)]
    fallback_timeout: Option<u64>,
    /// Print JSON instead of plain text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe once. Exit code: 0 reachable, 1 unreachable, 2 probe unavailable
    Check {
        #[command(flatten)]
        probe: ProbeArgs,
    },
    /// Probe periodically and print every result
    Watch {
        #[command(flatten)]
        probe: ProbeArgs,
        /// Seconds between probes (default: from config)
        #[arg(short, long)]
        interval: Option<u64>,
        /// Stop after this many probes
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

fn load_config(args: &ProbeArgs) -> anyhow::Result<FileConfig> {
    Ok(match &args.config {
        Some(path) => FileConfig::from_path(path)?,
        None => FileConfig::default(),
    })
}

fn probe_settings(
    config: &impl Configurable,
    args: &ProbeArgs,
) -> anyhow::Result<ProbeSettings> {
    let mut settings = ProbeSettings::from_config(config)?;
    if let Some(secs) = args.echo_timeout {
        settings.echo.timeout = secs;
    }
    if let Some(secs) = args.fallback_timeout {
        settings.fallback.timeout = secs;
    }
    settings.validate()?;
    Ok(settings)
}

fn exit_status(status: ProbeStatus) -> u8 {
    match status {
        ProbeStatus::Reachable => 0,
        ProbeStatus::UnreachableViaBothMethods => EXIT_SOFT_FAILURE,
        ProbeStatus::ProbeInfrastructureUnavailable => EXIT_HARD_FAILURE,
    }
}

/// `watch` exits with the last probe's status, if there was one.
fn watch_exit_status(last: Option<ProbeStatus>) -> u8 {
    last.map_or(EXIT_INTERRUPTED, exit_status)
}

fn usage_error(err: ProbeError) -> ExitCode {
    eprintln!("netprobe: {err}");
    ExitCode::from(EXIT_USAGE)
}

async fn check(args: ProbeArgs) -> anyhow::Result<ExitCode> {
    let config = load_config(&args)?;
    let settings = probe_settings(&config, &args)?;
    let probe = Arc::new(Probe::from_settings(&settings)?);

    let address = args
        .address
        .clone()
        .unwrap_or_else(|| settings.address.clone());
    let status = match probe.probe_async(Some(address.clone())).await {
        Ok(status) => status,
        Err(err) => return Ok(usage_error(err)),
    };

    if args.json {
        let out = serde_json::json!({
            "address": address,
            "status": status,
            "code": status.code(),
            "state": status.state(),
        });
        println!("{out}");
    } else {
        println!("{} {} ({})", address, status.state(), status.code());
    }
    Ok(ExitCode::from(exit_status(status)))
}

async fn watch(
    args: ProbeArgs,
    interval: Option<u64>,
    count: Option<usize>,
) -> anyhow::Result<ExitCode> {
    let config = load_config(&args)?;
    let settings = probe_settings(&config, &args)?;
    let mut monitor_settings = MonitorSettings::from_config(&config)?;
    if let Some(secs) = interval {
        monitor_settings.interval = secs;
    }
    monitor_settings.validate()?;

    let probe = Arc::new(Probe::from_settings(&settings)?);
    let options = MonitorOptions {
        interval: Duration::from_secs(monitor_settings.interval),
        address: args.address.clone(),
        ..MonitorOptions::default()
    };

    let monitor = match Monitor::start(probe, options) {
        Ok(monitor) => monitor,
        Err(err) => return Ok(usage_error(err)),
    };
    let mut events = monitor.subscribe();
    let mut seen = 0usize;
    let mut last: Option<ProbeStatus> = None;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Ctrl+C received, stopping monitor");
                break;
            }
            event = events.recv() => {
                let event = match event {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("Dropped {} events", n);
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                if args.json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    println!(
                        "{} {} ({})",
                        event.address,
                        event.state,
                        event.status.code()
                    );
                }
                last = Some(event.status);
                seen += 1;
                if count.is_some_and(|limit| seen >= limit) {
                    break;
                }
            }
        }
    }

    monitor.stop().await;
    Ok(ExitCode::from(watch_exit_status(last)))
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    observability::init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Check { probe } => check(probe).await,
        Commands::Watch {
            probe,
            interval,
            count,
        } => watch(probe, interval, count).await,
    }
}
