use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use loadgen_rs::produce::*;

/// Keep-alive HTTP load generator.
///
/// Opens `--connections` persistent connections across the given targets,
/// hammers them with a fixed GET request, and prints the aggregate rate of
/// 200 responses every reporting interval.
#[derive(Parser, Debug)]
#[command(name = "loadgen", version)]
struct Args {
    /// Number of concurrent connections
    #[arg(short = 'c', long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
    connections: u32,

    /// Request path
    #[arg(long, default_value = "/hello")]
    path: String,

    /// Reporting interval in seconds
    #[arg(long, default_value_t = 2.5)]
    interval: f64,

    /// Initial delay between reconnect attempts, in milliseconds.
    /// 0 retries immediately and forever (the default, intended for
    /// stress testing).
    #[arg(long, default_value_t = 0)]
    reconnect_delay_ms: u64,

    /// Cap for the reconnect delay under backoff, in milliseconds
    #[arg(long, default_value_t = 30_000)]
    reconnect_delay_max_ms: u64,

    /// Multiplier applied to the reconnect delay per consecutive failure
    #[arg(long, default_value_t = 2.0)]
    reconnect_backoff_factor: f64,

    /// Maximum random jitter added to each reconnect delay, in milliseconds
    #[arg(long, default_value_t = 0)]
    reconnect_jitter_ms: u64,

    /// Target addresses, host:port
    #[arg(required = true)]
    targets: Vec<String>,
}

impl Args {
    fn reconnect_policy(&self) -> ReconnectPolicy {
        if self.reconnect_delay_ms == 0 {
            ReconnectPolicy::immediate()
        } else {
            ReconnectPolicy::backoff(
                Duration::from_millis(self.reconnect_delay_ms),
                Duration::from_millis(self.reconnect_delay_max_ms),
                self.reconnect_backoff_factor,
                self.reconnect_jitter_ms,
            )
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let targets = args
        .targets
        .iter()
        .map(|s| TargetAddress::parse(s))
        .collect::<Result<Vec<_>>>()?;

    let config = ClientConfig {
        path: args.path.clone(),
        reconnect: args.reconnect_policy(),
        ..ClientConfig::default()
    };

    let counter = Arc::new(RequestCounter::new());
    let _reporter = Reporter::new(counter.clone(), Duration::from_secs_f64(args.interval)).spawn();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = tokio::task::LocalSet::new();
    Pool::build(&targets, args.connections as usize, counter, &config).spawn_on(&local);

    // runs until the process is terminated
    runtime.block_on(local);
    Ok(())
}
