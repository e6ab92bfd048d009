use std::process::ExitCode;

use clap::Parser;
use relaynet::{
    CancellationToken, EndpointSelector, FailureKind, HttpTransport, RandomSelector, Relay,
    RelayConfig, RelayError, RelayReceipt, SeededSelector, Transport, DEFAULT_METHOD,
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: RPCS=url1,url2 RAWTX=0x.. [ATTEMPTS=3] relaynet";

const EXIT_RELAYED: u8 = 0;
const EXIT_FAILED: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "relaynet")]
#[command(about = "Relay a pre-signed transaction to one of several JSON-RPC endpoints", long_about = None)]
struct Cli {
    /// Comma-separated endpoint URLs.
    #[arg(long, env = "RPCS")]
    rpcs: Option<String>,

    /// Pre-signed raw transaction.
    #[arg(long = "raw-tx", env = "RAWTX")]
    raw_tx: Option<String>,

    /// Maximum number of attempts.
    #[arg(long, env = "ATTEMPTS")]
    attempts: Option<usize>,

    /// Per-attempt timeout in milliseconds.
    #[arg(long = "timeout-ms", env = "RELAY_TIMEOUT_MS", default_value_t = 8_000)]
    timeout_ms: u64,

    /// Backoff unit in milliseconds.
    #[arg(long = "backoff-ms", env = "RELAY_BACKOFF_MS", default_value_t = 1_000)]
    backoff_ms: u64,

    /// JSON-RPC submission method.
    #[arg(long, env = "RELAY_METHOD", default_value = DEFAULT_METHOD)]
    method: String,

    /// Seed for reproducible endpoint selection.
    #[arg(long, env = "RELAY_SEED")]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current attempt");
            on_signal.cancel();
        }
    });

    ExitCode::from(run(cli, HttpTransport::new(), cancel).await)
}

/// Runs one relay and returns the process exit status.
async fn run<T: Transport>(cli: Cli, transport: T, cancel: CancellationToken) -> u8 {
    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            eprintln!("{USAGE}");
            return EXIT_USAGE;
        }
    };

    let selector: Box<dyn EndpointSelector> = match cli.seed {
        Some(seed) => Box::new(SeededSelector::new(seed)),
        None => Box::new(RandomSelector),
    };

    let relay = Relay::new(config.endpoints)
        .with_options(config.options)
        .with_transport(transport)
        .with_selector(selector)
        .with_cancellation(cancel);

    let outcome = relay.relay(&config.payload).await;
    let status = exit_status(&outcome);
    report(outcome);
    status
}

fn build_config(cli: &Cli) -> relaynet::Result<RelayConfig> {
    Ok(RelayConfig::from_inputs(
        cli.rpcs.as_deref(),
        cli.raw_tx.as_deref(),
        cli.attempts,
    )?
    .with_timeout_ms(cli.timeout_ms)?
    .with_backoff_unit_ms(cli.backoff_ms)
    .with_method(cli.method.clone()))
}

fn report(outcome: relaynet::Result<RelayReceipt>) {
    let err = match outcome {
        Ok(receipt) => {
            println!(
                "relayed successfully via {} after {} attempt(s): {}",
                receipt.endpoint, receipt.attempts, receipt.result
            );
            return;
        }
        Err(err @ RelayError::Exhausted { .. }) => {
            anyhow::Error::new(err).context("all relays failed")
        }
        Err(err) => anyhow::Error::new(err).context("relay aborted"),
    };
    eprintln!("{err:#}");
}

fn exit_status(outcome: &relaynet::Result<RelayReceipt>) -> u8 {
    match outcome {
        Ok(_) => EXIT_RELAYED,
        Err(err) if err.kind() == FailureKind::Config => EXIT_USAGE,
        Err(_) => EXIT_FAILED,
    }
}
