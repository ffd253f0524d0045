use clap::{Arg, ArgMatches, Command};

pub const ARG_SESSION_MAX_AGE_DAYS: &str = "session-max-age-days";
pub const ARG_REAPER_INTERVAL_SECONDS: &str = "reaper-interval-seconds";

#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub max_age_days: i64,
    pub reaper_interval_seconds: u64,
}

impl Options {
    /// Parse session arguments from matches.
    ///
    /// # Errors
    /// Returns an error if a value is present but out of range.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let max_age_days = matches
            .get_one::<i64>(ARG_SESSION_MAX_AGE_DAYS)
            .copied()
            .unwrap_or(7);
        if max_age_days < 1 {
            anyhow::bail!("--{ARG_SESSION_MAX_AGE_DAYS} must be at least 1");
        }

        let reaper_interval_seconds = matches
            .get_one::<u64>(ARG_REAPER_INTERVAL_SECONDS)
            .copied()
            .unwrap_or(3600);

        Ok(Self {
            max_age_days,
            reaper_interval_seconds,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_MAX_AGE_DAYS)
                .long(ARG_SESSION_MAX_AGE_DAYS)
                .help("Sliding-window session expiry in days")
                .long_help(
                    "Sliding-window session expiry in days. A token is valid while its last \
                     use is more recent than this window; every authenticated request resets \
                     the window.",
                )
                .env("PORDISTO_SESSION_MAX_AGE_DAYS")
                .default_value("7")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_REAPER_INTERVAL_SECONDS)
                .long(ARG_REAPER_INTERVAL_SECONDS)
                .help("Seconds between stale-session sweeps")
                .env("PORDISTO_REAPER_INTERVAL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64)),
        )
}
