//! Command-line front end for one request burst.
//!
//! Every flag can also be set through a `PING_*` environment variable. With
//! nothing set, the burst targets `127.0.0.1:10002` with 1000 iterations.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ping_core::{
    client, dispatch, run_burst, BurstConfig, BurstReport, ClientConfig, DispatchConfig,
    Dispatcher, HttpClient, PingApi,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
#[command(name = "ping-harness", version, about = "Fire bursts of ping requests at a test server")]
pub struct Cli {
    /// Test server host
    #[arg(long, env = "PING_HOST", default_value = client::DEFAULT_HOST)]
    pub host: String,

    /// Test server port
    #[arg(long, env = "PING_PORT", default_value_t = client::DEFAULT_PORT)]
    pub port: u16,

    /// Rounds of GET + POST + JSON requests
    #[arg(long, env = "PING_ITERATIONS", default_value_t = ping_core::burst::DEFAULT_ITERATIONS)]
    pub iterations: u32,

    /// Worker threads; caps concurrent requests
    #[arg(long, env = "PING_WORKERS", default_value_t = dispatch::DEFAULT_WORKERS,
          value_parser = parse_workers)]
    pub workers: usize,

    /// Requests queued before submission blocks
    #[arg(long, env = "PING_QUEUE_DEPTH", default_value_t = dispatch::DEFAULT_QUEUE_DEPTH)]
    pub queue_depth: usize,

    /// Per-request timeout in seconds; unset waits indefinitely
    #[arg(long, env = "PING_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,
}

fn parse_workers(s: &str) -> Result<usize, String> {
    let workers: usize = s.parse().map_err(|e| format!("`{s}` is not a worker count: {e}"))?;
    if workers == 0 {
        return Err("at least one worker is required".to_string());
    }
    Ok(workers)
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            host: self.host.clone(),
            port: self.port,
            timeout: self.timeout_secs.map(Duration::from_secs),
            ..ClientConfig::default()
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            workers: self.workers,
            queue_depth: self.queue_depth,
        }
    }

    pub fn burst_config(&self) -> BurstConfig {
        BurstConfig {
            iterations: self.iterations,
        }
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ping_harness=info,ping_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Run one burst as described by `cli`. Request failures are reported in the
/// returned counts; only setup failures are errors.
pub fn run(cli: &Cli) -> anyhow::Result<BurstReport> {
    let client_config = cli.client_config();
    let dispatch_config = cli.dispatch_config();
    info!(
        base_url = %client_config.base_url(),
        iterations = cli.iterations,
        workers = dispatch_config.workers,
        queue_depth = dispatch_config.queue_depth,
        "starting ping harness"
    );

    let api = PingApi::new(Arc::new(HttpClient::new(&client_config)));
    let dispatcher = Dispatcher::new(dispatch_config).context("failed to start dispatcher")?;

    let report = run_burst(&api, &dispatcher, &cli.burst_config()).context("burst aborted")?;
    if report.failed() > 0 || report.abandoned > 0 {
        warn!(%report, "ping harness finished with failures");
    } else {
        info!(%report, "ping harness finished");
    }
    Ok(report)
}
