use anyhow::Context;
use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use switch_poller::config::{AgentConfig, DeviceConfig};
use switch_poller::device::DeviceSession;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

fn init_logger() {
    // Use LOG_LEVEL env var (fall back to RUST_LOG for backwards compatibility)
    let filter = env::var("LOG_LEVEL")
        .or_else(|_| env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&filter))
        .with_target(false)
        .init();
}

#[derive(Parser)]
#[command(name = "switch-poller")]
#[command(about = "SNMP poller for network switches", long_about = None)]
struct Args {
    /// Path to the JSON device configuration
    #[arg(long, env = "SWITCH_POLLER_CONFIG", default_value = "switch-poller.json")]
    config: PathBuf,

    /// Initialize and poll every device once, print the caches as JSON and exit
    #[arg(long, default_value_t = false)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    let args = Args::parse();
    let config = AgentConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    tracing::info!(
        "Switch poller starting with {} device(s)",
        config.devices.len()
    );

    if args.once {
        return snapshot(config.devices).await;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        tracing::info!("Shutdown signal received, initiating graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    let interval = Duration::from_secs(config.poll_interval_secs.max(1));
    let mut tasks = JoinSet::new();
    for device in config.devices {
        tasks.spawn(run_device(device, interval, shutdown_rx.clone()));
    }

    while let Some(result) = tasks.join_next().await {
        if let Err(e) = result {
            tracing::error!("Device task panicked: {}", e);
        }
    }

    tracing::info!("Switch poller stopped");
    Ok(())
}

async fn snapshot(devices: Vec<DeviceConfig>) -> anyhow::Result<()> {
    let mut out = serde_json::Map::new();
    for device in devices {
        let label = device.label().to_string();
        let mut session = DeviceSession::connect(device)
            .await
            .with_context(|| format!("connecting to {}", label))?;
        session.initialize().await;
        let cache = session.poll().await;
        out.insert(label, serde_json::to_value(cache)?);
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

/// Poll one device until shutdown. Connection failures are retried with
/// exponential backoff.
async fn run_device(device: DeviceConfig, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let label = device.label().to_string();
    let mut retry_delay = Duration::from_secs(1);
    let max_retry_delay = Duration::from_secs(60);

    let mut session = loop {
        match DeviceSession::connect(device.clone()).await {
            Ok(session) => break session,
            Err(e) => {
                tracing::error!("Failed to open SNMP session to {}: {}", label, e);
                tokio::select! {
                    _ = tokio::time::sleep(retry_delay) => {}
                    _ = shutdown.changed() => return,
                }
                retry_delay = std::cmp::min(retry_delay * 2, max_retry_delay);
            }
        }
    };

    if !session.test_connection().await {
        tracing::warn!("{} did not answer sysName, polling anyway", label);
    }
    session.initialize().await;

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => {
                tracing::info!("Stopping poller for {}", label);
                return;
            }
        }

        let cache = session.poll().await;
        let up = cache
            .interfaces
            .values()
            .filter(|i| i.oper == Some(switch_poller::device::OperStatus::Up))
            .count();
        tracing::info!(
            "{}: {} interfaces ({} up), uptime {}, {} bandwidth readings",
            label,
            cache.interfaces.len(),
            up,
            cache.uptime_display().unwrap_or_else(|| "unknown".to_string()),
            cache.bandwidth.len()
        );
    }
}

/// Wait for SIGTERM or SIGINT shutdown signal.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                _ => {
                    tracing::warn!("Failed to register signal handlers, falling back to Ctrl+C");
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to register Ctrl+C handler: {}", e);
            return;
        }
        tracing::info!("Received Ctrl+C");
    }
}
