//! p2-bridge command line driver
//!
//! Runs one camera module with a `tracing`-backed host and feeds it action
//! invocations read from stdin, one JSON object per line:
//!
//! ```text
//! {"action": "set_tally", "options": {"color": "RED", "state": "ON"}}
//! {"action": "change_iris_step", "options": {"direction": -1}}
//! ```
//!
//! With `--simulate` the module talks to an in-process mock camera that
//! publishes its modelled state as telemetry.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use p2_bridge::actions::OptionValues;
use p2_bridge::app_actor::spawn_module;
use p2_bridge::config::{BridgeConfig, ConnectionSettings};
use p2_bridge::hardware::mock::MockConnectionFactory;
use p2_bridge::hardware::{ConnectionFactory, DeviceConnection, EventSink};
use p2_bridge::host::TracingHost;

#[derive(Parser)]
#[command(name = "p2-bridge")]
#[command(version)]
#[command(about = "Drive a P2 camera from JSON action lines and log its telemetry")]
struct Cli {
    /// TOML configuration file (P2BRIDGE_* environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the built-in simulated camera instead of a network connection
    #[arg(long)]
    simulate: bool,

    /// Telemetry period of the simulated camera in milliseconds
    #[arg(long, default_value_t = 1000)]
    telemetry_ms: u64,
}

#[derive(Debug, Deserialize)]
struct Invocation {
    action: String,
    #[serde(default)]
    options: OptionValues,
}

/// Stand-in used when no protocol session is linked into the binary.
struct NoProtocolFactory;

impl ConnectionFactory for NoProtocolFactory {
    fn create(&self, settings: &ConnectionSettings, _events: EventSink) -> Result<Arc<dyn DeviceConnection>> {
        bail!(
            "no P2 protocol session available for {}:{}; run with --simulate",
            settings.host,
            settings.port
        )
    }
}

fn load_config(cli: &Cli) -> Result<BridgeConfig> {
    let mut config = match &cli.config {
        Some(path) => BridgeConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => BridgeConfig::from_env()?,
    };
    if cli.simulate {
        config.host.get_or_insert_with(|| "127.0.0.1".to_string());
        config.port.get_or_insert(49153);
        config.username.get_or_insert_with(|| "simulator".to_string());
        config.password.get_or_insert_with(|| "simulator".to_string());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(simulate = cli.simulate, "Starting p2-bridge");

    let mock_factory = Arc::new(MockConnectionFactory::new());
    let factory: Arc<dyn ConnectionFactory> = if cli.simulate {
        mock_factory.clone()
    } else {
        Arc::new(NoProtocolFactory)
    };

    let (module, task) = spawn_module(Arc::new(TracingHost), factory);
    module.init(config).await?;

    let telemetry = if cli.simulate {
        mock_factory
            .latest()
            .map(|camera| camera.spawn_telemetry(Duration::from_millis(cli.telemetry_ms)))
    } else {
        None
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let invocation: Invocation = match serde_json::from_str(line) {
            Ok(invocation) => invocation,
            Err(err) => {
                warn!("Ignoring malformed line: {}", err);
                continue;
            }
        };
        let outcome = module
            .invoke_action(invocation.action, invocation.options)
            .await?;
        println!("{outcome}");
    }

    info!("stdin closed, shutting down");
    module.shutdown().await?;
    if let Some(telemetry) = telemetry {
        telemetry.abort();
    }
    task.await?;
    Ok(())
}
