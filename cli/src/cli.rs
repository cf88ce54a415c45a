use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Command-line interface for the portal time-booking automation.
#[derive(Parser, Debug)]
#[command(name = "mport", version, about = "Export the portal's project list or replay booking records into it")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Walk every project in the portal and write its registration
    /// categories to a transcript file.
    Discover(DiscoverArgs),

    /// Replay a transcript of booking records into the portal's form,
    /// one submit per row.
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Where the discovery transcript is written.
    pub output: PathBuf,

    /// Emit a JSON array instead of the streaming delimited format.
    /// JSON keeps projects without registrations but is buffered until the
    /// run completes.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Booking transcript to replay (`Project;Registration;Date;Duration;Comment`).
    pub input: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct CommonArgs {
    /// How chatty the run log is. `RUST_LOG` overrides this when set.
    #[arg(long, short = 'v', value_enum, default_value_t = Verbosity::Info)]
    pub verbosity: Verbosity,

    /// Show the browser window instead of running headless.
    #[arg(long)]
    pub interactive: bool,

    /// Persistent browser profile directory, kept across runs.
    #[arg(long, value_name = "DIR")]
    pub user_data_dir: Option<PathBuf>,

    /// Capture a checkpoint screenshot into this directory at run start,
    /// after every item, and at run end.
    #[arg(long, value_name = "DIR")]
    pub screenshot_dir: Option<PathBuf>,

    /// Inter-keystroke delay while typing into portal fields.
    #[arg(long, value_name = "MS")]
    pub type_delay_ms: Option<u64>,

    /// Bounded window for every indicator/navigation wait.
    #[arg(long, value_name = "SECS")]
    pub wait_timeout_secs: Option<u64>,

    /// Abort the whole run after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub run_deadline_secs: Option<u64>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Off,
    Info,
    Trace,
}

impl Verbosity {
    pub fn default_filter(self) -> &'static str {
        match self {
            Verbosity::Off => "off",
            Verbosity::Info => "info",
            Verbosity::Trace => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_discover_with_flags() {
        let cli = Cli::try_parse_from([
            "mport",
            "discover",
            "out.csv",
            "--json",
            "--interactive",
            "--screenshot-dir",
            "/tmp/shots",
            "-v",
            "trace",
        ])
        .unwrap();

        match cli.command {
            Command::Discover(args) => {
                assert_eq!(args.output, PathBuf::from("out.csv"));
                assert!(args.json);
                assert!(args.common.interactive);
                assert_eq!(args.common.verbosity, Verbosity::Trace);
                assert_eq!(
                    args.common.screenshot_dir,
                    Some(PathBuf::from("/tmp/shots"))
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_replay_with_defaults() {
        let cli = Cli::try_parse_from(["mport", "replay", "bookings.csv"]).unwrap();
        match cli.command {
            Command::Replay(args) => {
                assert_eq!(args.input, PathBuf::from("bookings.csv"));
                assert_eq!(args.common.verbosity, Verbosity::Info);
                assert!(!args.common.interactive);
                assert!(args.common.user_data_dir.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_path_argument() {
        assert!(Cli::try_parse_from(["mport", "discover"]).is_err());
    }
}
