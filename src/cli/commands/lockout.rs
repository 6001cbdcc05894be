use anyhow::Context;
use clap::{Arg, ArgMatches, Command};

pub const ARG_LOCKOUT_WINDOW_SECONDS: &str = "lockout-window-seconds";
pub const ARG_LOCKOUT_THRESHOLD: &str = "lockout-threshold";

#[derive(Debug, Clone)]
pub struct Options {
    pub window_seconds: u64,
    pub threshold: usize,
}

impl Options {
    /// Parse lockout arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the threshold does not fit the platform's `usize`.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let window_seconds = matches
            .get_one::<u64>(ARG_LOCKOUT_WINDOW_SECONDS)
            .copied()
            .unwrap_or(1800);
        let threshold = matches
            .get_one::<u32>(ARG_LOCKOUT_THRESHOLD)
            .copied()
            .unwrap_or(5);

        Ok(Self {
            window_seconds,
            threshold: usize::try_from(threshold)
                .with_context(|| format!("invalid --{ARG_LOCKOUT_THRESHOLD}: {threshold}"))?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_LOCKOUT_WINDOW_SECONDS)
                .long(ARG_LOCKOUT_WINDOW_SECONDS)
                .help("Failed logins younger than this many seconds count toward the lockout")
                .env("AUTHGATE_LOCKOUT_WINDOW_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_LOCKOUT_THRESHOLD)
                .long(ARG_LOCKOUT_THRESHOLD)
                .help("Recent failures that lock an address and email pair")
                .env("AUTHGATE_LOCKOUT_THRESHOLD")
                .default_value("5")
                .value_parser(clap::value_parser!(u32).range(1..=10)),
        )
}
