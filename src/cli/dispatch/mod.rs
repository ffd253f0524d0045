//! Command-line argument dispatch.
//!
//! Maps validated CLI arguments to the action to execute, currently only
//! starting the API server with its session configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::session;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let session_opts = session::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        session_max_age_days: session_opts.max_age_days,
        reaper_interval_seconds: session_opts.reaper_interval_seconds,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dsn_required() {
        temp_env::with_vars([("PORDISTO_DSN", None::<&str>)], || {
            let command = crate::cli::commands::new();
            let matches = command.get_matches_from(vec!["pordisto"]);
            let result = handler(&matches);
            assert!(result.is_err());
            if let Err(err) = result {
                assert!(
                    err.to_string()
                        .contains("missing required argument: --dsn")
                );
            }
        });
    }

    #[test]
    fn server_args_from_matches() {
        temp_env::with_vars(
            [
                ("PORDISTO_DSN", None::<&str>),
                ("PORDISTO_PORT", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "pordisto",
                    "--dsn",
                    "postgres://user@localhost:5432/pordisto",
                    "--port",
                    "9090",
                    "--session-max-age-days",
                    "14",
                    "--reaper-interval-seconds",
                    "600",
                ]);
                let action = handler(&matches).unwrap();
                let Action::Server(args) = action;
                assert_eq!(args.port, 9090);
                assert_eq!(args.dsn, "postgres://user@localhost:5432/pordisto");
                assert_eq!(args.session_max_age_days, 14);
                assert_eq!(args.reaper_interval_seconds, 600);
            },
        );
    }

    #[test]
    fn server_args_defaults() {
        temp_env::with_vars(
            [
                ("PORDISTO_DSN", None::<&str>),
                ("PORDISTO_PORT", None::<&str>),
                ("PORDISTO_SESSION_MAX_AGE_DAYS", None::<&str>),
                ("PORDISTO_REAPER_INTERVAL_SECONDS", None::<&str>),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec![
                    "pordisto",
                    "--dsn",
                    "postgres://user@localhost:5432/pordisto",
                ]);
                let action = handler(&matches).unwrap();
                let Action::Server(args) = action;
                assert_eq!(args.port, 8080);
                assert_eq!(args.session_max_age_days, 7);
                assert_eq!(args.reaper_interval_seconds, 3600);
            },
        );
    }
}
