use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_PROVIDER_URL: &str = "provider-url";
pub const ARG_PROVIDER_SERVICE_KEY: &str = "provider-service-key";
pub const ARG_PROVIDER_TIMEOUT_SECONDS: &str = "provider-timeout-seconds";

/// Identity provider endpoint and credential. Both are optional at startup; requests
/// that need the provider fail with 500 when either is missing.
#[derive(Clone)]
pub struct Options {
    pub url: Option<String>,
    pub service_key: Option<SecretString>,
    pub timeout_seconds: u64,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        let read_optional = |id: &str| -> Option<String> {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            url: read_optional(ARG_PROVIDER_URL),
            service_key: read_optional(ARG_PROVIDER_SERVICE_KEY).map(SecretString::from),
            timeout_seconds: matches
                .get_one::<u64>(ARG_PROVIDER_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(10),
        }
    }
}

impl std::fmt::Debug for Options {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Options")
            .field("url", &self.url)
            .field("service_key", &self.service_key.as_ref().map(|_| "***"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PROVIDER_URL)
                .long(ARG_PROVIDER_URL)
                .help("Identity provider base URL, example: https://project.supabase.co")
                .env("AUTHGATE_PROVIDER_URL"),
        )
        .arg(
            Arg::new(ARG_PROVIDER_SERVICE_KEY)
                .long(ARG_PROVIDER_SERVICE_KEY)
                .help("Identity provider service key")
                .env("AUTHGATE_PROVIDER_SERVICE_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_PROVIDER_TIMEOUT_SECONDS)
                .long(ARG_PROVIDER_TIMEOUT_SECONDS)
                .help("Timeout in seconds for each identity provider or store call")
                .env("AUTHGATE_PROVIDER_TIMEOUT_SECONDS")
                .default_value("10")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
