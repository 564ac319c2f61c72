//! shm-infer: shared-memory inference bridge
//!
//! Loads a predictor artifact, then polls the request slot on a RAM-backed
//! mount and answers each request through the response slot. Runs until
//! interrupted. Logs go to stderr; nothing is printed per tick by default.

use anyhow::{Context, Result};
use clap::Parser;
use shm_bridge::SlotConfig;
use shm_bridge::slot::{DEFAULT_SLOT_DIR, REQUEST_FILE_NAME, RESPONSE_FILE_NAME};
use shm_infer_core::{INPUT_SIZE, OUTPUT_SIZE, Shape};
use shm_infer_engine::Engine;
use shm_infer_server::{BridgeConfig, BridgeServer};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Parser)]
#[command(name = "shm-infer", version)]
#[command(about = "Serve predictions to a real-time application through shared-memory files")]
struct Args {
    /// Predictor artifact: a model JSON file or a directory containing model.json
    #[arg(env = "SHM_INFER_ARTIFACT")]
    artifact: PathBuf,

    /// Request slot written by the producer
    #[arg(long, env = "SHM_INFER_REQUEST_PATH", default_value_t = default_slot(REQUEST_FILE_NAME))]
    request_path: String,

    /// Response slot written by the bridge
    #[arg(long, env = "SHM_INFER_RESPONSE_PATH", default_value_t = default_slot(RESPONSE_FILE_NAME))]
    response_path: String,

    /// Values per request vector
    #[arg(long, env = "SHM_INFER_INPUT_SIZE", default_value_t = INPUT_SIZE)]
    input_size: usize,

    /// Values per response vector
    #[arg(long, env = "SHM_INFER_OUTPUT_SIZE", default_value_t = OUTPUT_SIZE)]
    output_size: usize,

    /// Sleep between polls in milliseconds
    #[arg(long, env = "SHM_INFER_POLL_INTERVAL_MS", default_value_t = 1)]
    poll_interval_ms: u64,

    /// Log filter (overrides RUST_LOG), e.g. "info" or "shm_infer_server=trace"
    #[arg(long, env = "SHM_INFER_LOG")]
    log_level: Option<String>,
}

fn default_slot(name: &str) -> String {
    format!("{}/{}", DEFAULT_SLOT_DIR, name)
}

impl Args {
    fn shape(&self) -> Shape {
        Shape::new(self.input_size, self.output_size)
    }

    fn bridge_config(&self) -> BridgeConfig {
        let channel = SlotConfig::with_paths(
            PathBuf::from(&self.request_path),
            PathBuf::from(&self.response_path),
        )
        .shape(self.shape());

        BridgeConfig::with_channel(channel)
            .poll_interval(Duration::from_millis(self.poll_interval_ms))
    }

    fn env_filter(&self) -> EnvFilter {
        match &self.log_level {
            Some(directives) => EnvFilter::new(directives),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(args.env_filter())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = args.bridge_config();
    info!(
        "shm-infer starting: artifact={:?} request={:?} response={:?}",
        args.artifact, config.channel.request_path, config.channel.response_path
    );

    // Loading is the only step allowed to stop the process
    let engine = Engine::load(&args.artifact, args.shape())
        .with_context(|| format!("Failed to load predictor artifact {:?}", args.artifact))?;

    let server = BridgeServer::new(engine, config).context("Invalid bridge configuration")?;

    let stats = server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
        })
        .await?;

    info!(
        "shm-infer exiting: ticks={} served={} dropped={}",
        stats.ticks, stats.served, stats.dropped
    );
    Ok(())
}
