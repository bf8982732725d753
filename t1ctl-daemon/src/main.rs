// t1ctl -- keep a T1 antenna tuner on the band the rig is tuned to.
//
// Usage:
//   t1ctl                                   # Armbian wiring, rigctl per poll
//   t1ctl --board rpi
//   t1ctl --board rock4se --source rigctld
//   t1ctl --config /etc/t1ctl.toml --log-level debug
//   t1ctl --once                            # signal the current band and exit
//   t1ctl --list-bands
//
// Options given on the command line override the config file, which
// overrides the board preset.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use t1ctl::gpio::GpioController;
use t1ctl::rigctl::{DaemonRestart, RigctlProcess, RigctldClient};
use t1ctl::tuner::T1Signaler;
use t1ctl::watch::{WatchBuilder, Watcher};
use t1ctl::{SystemPacer, format_range_mhz};

use config::{ControllerConfig, Settings, Source};

/// Keep a T1 antenna tuner on the band the rig is tuned to.
#[derive(Parser)]
#[command(name = "t1ctl", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter (e.g. info, debug, t1ctl_tuner=trace). Overrides RUST_LOG.
    #[arg(long)]
    log_level: Option<String>,

    /// Poll once, signal the band if known, and exit.
    #[arg(long)]
    once: bool,

    /// Print the band table and exit.
    #[arg(long)]
    list_bands: bool,

    #[command(flatten)]
    settings: Settings,
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> Result<ControllerConfig> {
    let file = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Settings::from_toml(&text).with_context(|| format!("in {}", path.display()))?
        }
        None => Settings::default(),
    };

    let config = cli.settings.clone().or(file).resolve()?;
    config.validate()?;
    Ok(config)
}

fn cmd_list_bands() {
    println!("{:<5} {:<24} {:>4}  bits", "band", "range", "code");
    for (name, low, high, code) in t1ctl::band_rows() {
        println!(
            "{:<5} {:<24} {:>4}  {:04b}",
            name,
            format_range_mhz(low, high),
            code,
            code
        );
    }
}

/// Claim the lines, pick the source, and assemble the watcher.
fn build_watcher(config: &ControllerConfig) -> Result<Watcher> {
    let lines = GpioController::with_consumer(&config.consumer)
        .acquire_tuner_lines(&config.tune_line(), &config.data_line())
        .with_context(|| {
            format!(
                "failed to claim tune {} and data {}",
                config.tune_line(),
                config.data_line()
            )
        })?;
    let signaler = T1Signaler::from_lines(lines, config.signaling_variant(), SystemPacer::new())
        .context("tuner wiring does not match the signaling variant")?;

    let builder = WatchBuilder::new()
        .signaler(Box::new(signaler))
        .poll_interval(config.poll_interval)
        .max_consecutive_failures(config.max_consecutive_failures);

    let builder = match config.source {
        Source::Rigctl => builder.source(Box::new(
            RigctlProcess::new(&config.rig_model, &config.serial_port)
                .timeout(config.query_timeout),
        )),
        Source::Rigctld => builder
            .source(Box::new(
                RigctldClient::new(&config.rigctld_addr)
                    .max_attempts(config.query_attempts)
                    .retry_delay(config.query_retry_delay)
                    .attempt_timeout(config.query_timeout),
            ))
            .recovery(Box::new(
                DaemonRestart::new(&config.rig_model, &config.serial_port)
                    .tcp_port(config.rigctld_port()?)
                    .delays(config.kill_settle, config.startup_grace),
            )),
    };

    Ok(builder.build()?)
}

/// Cancel `cancel` on SIGINT or SIGTERM.
async fn wait_for_shutdown(cancel: CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGTERM");
            None
        }
    };

    let terminated = async {
        match sigterm.as_mut() {
            Some(s) => {
                s.recv().await;
            }
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("received SIGINT, shutting down"),
        _ = terminated => info!("received SIGTERM, shutting down"),
        _ = cancel.cancelled() => return,
    }
    cancel.cancel();
}

async fn run(config: ControllerConfig, once: bool) -> Result<()> {
    info!(
        board = ?config.board,
        tune = %config.tune_line(),
        data = %config.data_line(),
        variant = %config.signaling_variant(),
        source = ?config.source,
        rig_model = %config.rig_model,
        serial_port = %config.serial_port,
        "t1ctl starting"
    );

    let mut watcher = build_watcher(&config)?;

    if once {
        let outcome = watcher.poll_once().await?;
        info!(?outcome, "single poll complete");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    tokio::spawn(wait_for_shutdown(cancel.clone()));

    let summary = watcher.run(cancel).await?;
    info!(
        cycles = summary.cycles,
        signals_sent = summary.signals_sent,
        signal_failures = summary.signal_failures,
        unavailable_readings = summary.unavailable_readings,
        recoveries = summary.recoveries,
        "t1ctl stopped"
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    if cli.list_bands {
        cmd_list_bands();
        return Ok(());
    }

    let config = load_config(&cli)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    runtime.block_on(run(config, cli.once))
}
