mod cli;

pub use cli::{Cli, Command, CommonArgs, DiscoverArgs, ReplayArgs, Verbosity};

use anyhow::Context;
use mport_core::transcript::{DiscoveryFormat, DiscoveryWriter};
use mport_core::{
    discover, replay, PortalConfig, PortalSelectors, PortalSession, RunOptions, Session, Timing,
};
use mport_core::progress::LogObserver;
use mport_core::sequencer::Sequencer;
use std::fs::File;
use std::io::BufWriter;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    // Credentials and portal URLs live in the environment / a .env file
    dotenvy::dotenv().ok();

    let common = match &cli.command {
        Command::Discover(args) => &args.common,
        Command::Replay(args) => &args.common,
    };

    init_logging(common.verbosity);

    let config = PortalConfig::from_env()?;
    let options = run_options(common);

    let cancel = CancellationToken::new();
    let ctrlc_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing current step and shutting down");
            ctrlc_cancel.cancel();
        }
    });

    match cli.command {
        Command::Discover(args) => run_discover(args, &config, &options, &cancel).await,
        Command::Replay(args) => run_replay(args, &config, &options, &cancel).await,
    }
}

fn init_logging(verbosity: Verbosity) {
    let default_level = verbosity.default_filter();
    let _ = tracing_subscriber::fmt()
        // Fallback to the verbosity flag if RUST_LOG is not set _or_
        // contains an invalid value
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_options(common: &CommonArgs) -> RunOptions {
    let mut timing = Timing::default();
    if let Some(ms) = common.type_delay_ms {
        timing.type_delay = Duration::from_millis(ms);
    }
    if let Some(secs) = common.wait_timeout_secs {
        let window = Duration::from_secs(secs);
        timing.lookup_timeout = window;
        timing.indicator_timeout = window;
        timing.navigation_timeout = window;
    }
    timing.run_deadline = common.run_deadline_secs.map(Duration::from_secs);

    RunOptions {
        interactive: common.interactive,
        user_data_dir: common.user_data_dir.clone(),
        screenshot_dir: common.screenshot_dir.clone(),
        timing,
    }
}

async fn run_discover(
    args: DiscoverArgs,
    config: &PortalConfig,
    options: &RunOptions,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let format = if args.json {
        DiscoveryFormat::Json
    } else {
        DiscoveryFormat::Delimited
    };
    let out = File::create(&args.output)
        .with_context(|| format!("creating output transcript {}", args.output.display()))?;
    let mut writer = DiscoveryWriter::new(BufWriter::new(out), format)?;

    let session = Session::open(config, options, cancel).await?;
    let mut portal = PortalSession::new(
        Sequencer::new(session.page(), options.timing.clone(), cancel.clone()),
        PortalSelectors::default(),
        options.screenshot_dir.clone(),
    );

    let mut observer = LogObserver::default();
    let run = discover::run_discovery(&mut portal, &mut writer, &mut observer, cancel);
    let result = with_deadline(options.timing.run_deadline, run).await;

    session.close().await;

    let visited = result?;
    let written = writer.finish()?;
    info!(
        "Discovery finished: {visited} project(s) visited, {written} record(s) written to {}",
        args.output.display()
    );
    Ok(())
}

async fn run_replay(
    args: ReplayArgs,
    config: &PortalConfig,
    options: &RunOptions,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    // Pre-flight: the whole transcript must parse before a browser spawns
    let input = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading transcript {}", args.input.display()))?;
    let records = mport_core::transcript::parse_bookings(&input)?;
    info!("Parsed {} booking record(s) from {}", records.len(), args.input.display());

    let session = Session::open(config, options, cancel).await?;
    let mut portal = PortalSession::new(
        Sequencer::new(session.page(), options.timing.clone(), cancel.clone()),
        PortalSelectors::default(),
        options.screenshot_dir.clone(),
    );

    let mut observer = LogObserver::default();
    let run = replay::run_replay(&mut portal, &records, &mut observer, cancel);
    let result = with_deadline(options.timing.run_deadline, run).await;

    session.close().await;

    let booked = result?;
    info!("Replay finished: {booked} record(s) booked");
    Ok(())
}

async fn with_deadline<T>(
    deadline: Option<Duration>,
    run: impl Future<Output = mport_core::Result<T>>,
) -> mport_core::Result<T> {
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, run).await {
            Ok(result) => result,
            Err(_) => Err(mport_core::Error::DeadlineExceeded),
        },
        None => run.await,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn deadline_cuts_off_a_stalled_run() {
        let stalled = std::future::pending::<mport_core::Result<usize>>();
        let err = with_deadline(Some(Duration::from_millis(10)), stalled)
            .await
            .unwrap_err();
        assert!(matches!(err, mport_core::Error::DeadlineExceeded));
    }

    #[tokio::test]
    async fn deadline_leaves_a_finished_run_untouched() {
        let result = with_deadline(Some(Duration::from_secs(5)), async { Ok(3usize) }).await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn no_deadline_means_no_ceiling() {
        let result = with_deadline(None, async { Ok(7usize) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
