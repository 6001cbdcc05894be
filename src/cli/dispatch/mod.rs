//! Map validated CLI matches to an [`Action`].

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{ARG_PORT, lockout, provider};
use anyhow::Result;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if an argument is out of range.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let provider_opts = provider::Options::parse(matches);
    let lockout_opts = lockout::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        provider_url: provider_opts.url,
        provider_service_key: provider_opts.service_key,
        provider_timeout_seconds: provider_opts.timeout_seconds,
        lockout_window_seconds: lockout_opts.window_seconds,
        lockout_threshold: lockout_opts.threshold,
    }))
}
