use anyhow::{anyhow, Result};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use pings_model::ClientInfo;
use pings_probe::{ProbeSettings, TcpProber};
use pings_worker::{ExponentialBackoff, FixedDelay, HttpCoordinator, PingsClient, RetryPolicy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "pings",
    version,
    about = "Pings worker: fetches addresses from the coordinator, measures latency to each and reports back. Only probe networks you have permission to test."
)]
struct Cli {
    #[arg(long, default_value = "localhost")]
    server_host: String,

    #[arg(long, default_value_t = 6543)]
    server_port: u16,

    #[arg(long, default_value = "")]
    nick: String,

    /// Stable worker id; a random one is generated when omitted.
    #[arg(long)]
    client_id: Option<String>,

    #[arg(long, default_value_t = 10)]
    probes: u32,

    #[arg(long, default_value_t = 80)]
    probe_port: u16,

    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    #[arg(long, default_value_t = 1000)]
    retry_delay_ms: u64,

    /// Enables exponential backoff capped at this delay.
    #[arg(long)]
    retry_max_delay_ms: Option<u64>,

    /// Gives up after this many fetch failures in a row.
    #[arg(long)]
    retry_max_attempts: Option<u32>,

    #[arg(long, default_value_t = 1000)]
    status_every_ms: u64,

    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.log_level.as_str())
        .init();

    if cli.probes == 0 {
        return Err(anyhow!("--probes must be at least 1"));
    }

    let settings = ProbeSettings {
        probes: cli.probes,
        port: cli.probe_port,
        timeout_ms: cli.timeout_ms,
        interval_ms: cli.interval_ms,
    };

    let coordinator = HttpCoordinator::new(&cli.server_host, cli.server_port)?;
    info!(coordinator = coordinator.base_url(), "using coordinator");

    let client_id = cli
        .client_id
        .clone()
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let mut identity = ClientInfo::new(client_id);
    identity.nickname = cli.nick.clone();

    let mut client = PingsClient::new(
        identity,
        coordinator,
        TcpProber::new(settings),
        retry_policy(&cli),
    );

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|err| anyhow!("failed to install Ctrl-C handler: {err}"))?;

    client.start()?;

    let every = Duration::from_millis(cli.status_every_ms.max(50));
    while !interrupted.load(Ordering::SeqCst) && client.is_running() {
        sleep(every);
        print_status(&client);
    }

    if interrupted.load(Ordering::SeqCst) {
        info!("interrupted, stopping worker");
    }

    match client.stop() {
        Ok(()) => Ok(()),
        Err(err) => {
            warn!(error = %err, "worker ended with an error");
            Err(err.into())
        }
    }
}

fn retry_policy(cli: &Cli) -> Box<dyn RetryPolicy> {
    let initial = Duration::from_millis(cli.retry_delay_ms);
    match (cli.retry_max_delay_ms, cli.retry_max_attempts) {
        (None, None) => Box::new(FixedDelay::new(initial)),
        (max_delay, attempts) => {
            let max_delay = max_delay.map(Duration::from_millis).unwrap_or(initial);
            let mut policy = ExponentialBackoff::new(initial, max_delay);
            if let Some(attempts) = attempts {
                policy = policy.with_max_attempts(attempts);
            }
            Box::new(policy)
        }
    }
}

fn print_status<C, P, R>(client: &PingsClient<C, P, R>)
where
    C: pings_worker::Coordinator + 'static,
    P: pings_probe::Prober + 'static,
    R: RetryPolicy + 'static,
{
    let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
    match client.current_ping_dest() {
        Some(dest) => {
            let place = client
                .current_dest_geoip()
                .and_then(|geoip| geoip.label())
                .unwrap_or_else(|| "unknown location".to_string());
            println!("{stamp} current ping dest: {dest} ({place})");
        }
        None => println!("{stamp} current ping dest: none"),
    }
}
