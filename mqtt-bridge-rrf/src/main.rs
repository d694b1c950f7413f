//! MQTT bridge for RepRapFirmware 3D printers.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use mqtt_bridge_rrf::bridge;
use mqtt_bridge_rrf::config::BridgeConfig;
use rrf_api::{DeviceClient, StatusKind};
use rrf_mock::MockRrf;

/// Polls RepRapFirmware devices and publishes to MQTT.
#[derive(Parser, Debug)]
#[command(name = "mqtt-bridge-rrf")]
#[command(about = "Polls RepRapFirmware devices and publishes to MQTT")]
#[command(version)]
struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true, env = "RRF_DEBUG")]
    debug: bool,

    /// Password for the device(s).
    #[arg(short, long, global = true, env = "RRF_PASSWORD", default_value = "")]
    password: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch basic information about device(s) and exit.
    Info {
        /// Output format ("text" or "json").
        #[arg(short, long, default_value = "text")]
        output: String,

        /// Device hosts to query.
        #[arg(required = true)]
        hosts: Vec<String>,
    },

    /// Run a mock device server for testing.
    Mock {
        /// address:port to bind the mock server.
        #[arg(short, long, default_value = "127.0.0.1:8888")]
        bind: SocketAddr,
    },

    /// Run the bridge.
    Run {
        /// MQTT broker to connect to (mqtt://host[:port]).
        #[arg(long, env = "RRF_BROKER")]
        broker: String,

        /// MQTT client identifier.
        #[arg(long, env = "RRF_CLIENT_ID", default_value = "mqtt-bridge-rrf")]
        client_id: String,

        /// MQTT topic prefix for published data and availability.
        #[arg(long = "topic-prefix", env = "RRF_TOPIC_PREFIX", default_value = "mqtt-bridge-rrf")]
        topic_prefix: String,

        /// MQTT topic prefix for discovery.
        #[arg(
            long = "discovery-topic-prefix",
            env = "RRF_DISCOVERY_TOPIC_PREFIX",
            default_value = "homeassistant"
        )]
        discovery_topic_prefix: String,

        /// Seconds between polling a device.
        #[arg(short, long, env = "RRF_INTERVAL", default_value_t = 60)]
        interval: u64,

        /// Seconds between publishing discovery messages.
        #[arg(long = "discovery-interval", env = "RRF_DISCOVERY_INTERVAL", default_value_t = 3600)]
        discovery_interval: u64,

        /// Seconds between broker reconnection attempts.
        #[arg(long = "connect-retry-delay", default_value_t = 10)]
        connect_retry_delay: u64,

        /// MQTT keepalive, seconds.
        #[arg(long, default_value_t = 30)]
        keepalive: u64,

        /// Device hosts to poll.
        #[arg(required = true)]
        devices: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    match cli.command {
        Command::Info { output, hosts } => run_info(&hosts, &cli.password, &output).await,
        Command::Mock { bind } => run_mock(bind).await,
        Command::Run {
            broker,
            client_id,
            topic_prefix,
            discovery_topic_prefix,
            interval,
            discovery_interval,
            connect_retry_delay,
            keepalive,
            devices,
        } => {
            let config = BridgeConfig {
                devices,
                password: cli.password,
                broker,
                client_id,
                data_topic_prefix: topic_prefix,
                discovery_topic_prefix,
                poll_interval: Duration::from_secs(interval),
                discovery_interval: Duration::from_secs(discovery_interval),
                connect_retry_delay: Duration::from_secs(connect_retry_delay),
                keep_alive: Duration::from_secs(keepalive),
            };
            bridge::run(config).await.context("bridge failed")
        }
    }
}

fn init_tracing(debug: bool) -> anyhow::Result<()> {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))
}

async fn run_info(hosts: &[String], password: &str, output: &str) -> anyhow::Result<()> {
    for host in hosts {
        let mut client = DeviceClient::new(host.clone(), password);
        let config = client
            .fetch_config()
            .await
            .with_context(|| format!("fetching config from {host}"))?;
        let status = client
            .fetch_status(StatusKind::Extended)
            .await
            .with_context(|| format!("fetching status from {host}"))?;

        if output == "json" {
            let doc = serde_json::json!({
                "config": config,
                "status2": status,
            });
            println!("{}", serde_json::to_string_pretty(&doc)?);
            continue;
        }

        println!("{host}:");
        println!("  Name: {}", status.name);
        println!("  State: {}", status.status);
        println!(
            "  Firmware: {} v{} ({})",
            config.firmware_name, config.firmware_version, config.firmware_date
        );
        println!("  Electronics: {}", config.firmware_electronics);
        println!("  Geometry: {}", status.geometry);
        for axis in 0..status.axes {
            let position = status.coordinates.xyz.get(axis).copied().unwrap_or_default();
            let min = config.axis_mins.get(axis).copied().unwrap_or_default();
            let max = config.axis_maxes.get(axis).copied().unwrap_or_default();
            let homed = if status
                .coordinates
                .axes_homed
                .get(axis)
                .is_some_and(|h| h.0)
            {
                ""
            } else {
                " (not homed)"
            };
            println!("  Axis {axis}: {position:<7.2} (min={min:.2} max={max:.2}){homed}");
        }
    }
    Ok(())
}

async fn run_mock(bind: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    MockRrf::new()
        .serve(listener)
        .await
        .context("mock server failed")
}
