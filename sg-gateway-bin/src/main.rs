mod logger;

use clap::Parser;
use logger::Logger;
use sg_gateway_core::SGGateway;
use sg_gateway_models::settings::GatewaySettings;
use sg_gateway_repository::sqlite;
use std::path::PathBuf;
use std::process::exit;
use tracing::{error, info};

const DEVICE_REPOSITORY_PATH: &str = "deviceRepository.db";

/// SG Gateway - MQTT bridge between a cloud IoT platform and locally
/// connected subdevices.
#[derive(Parser)]
#[command(name = "sg-gateway")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "SG Gateway", long_about = None)]
struct Cli {
    /// Gateway configuration file (JSON)
    configuration: PathBuf,

    /// Console and file log level (TRACE, DEBUG, INFO, WARN, ERROR)
    log_level: Option<String>,

    /// Firmware version announced to the platform on connect
    firmware_version: Option<String>,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.log_level.as_deref().map(logger::parse_level).transpose() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{e}");
            exit(-1);
        }
    };

    let mut log = Logger::new(level);
    if let Err(e) = log.initialize() {
        eprintln!("{e}");
        exit(-1);
    }

    let config_path = cli.configuration.to_string_lossy();
    let settings = match GatewaySettings::new(&config_path) {
        Ok(settings) => settings,
        Err(e) => {
            error!(config = %config_path, error = %e, "Unable to parse gateway configuration");
            exit(-1);
        }
    };

    let db = match sqlite::init_db(&sqlite::file_url(DEVICE_REPOSITORY_PATH)).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Unable to open the device repository");
            exit(1);
        }
    };

    let gateway = SGGateway::new(settings, db, cli.firmware_version);
    gateway.connect().await;
    info!("Gateway running, press Ctrl-C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }

    gateway.stop().await;
}
