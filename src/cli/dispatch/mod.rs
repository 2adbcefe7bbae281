//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{server::Args, Action};
use crate::cli::commands::{auth, bot_check, external};
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

    let auth_opts = auth::Options::parse(matches)?;
    let external_opts = external::Options::parse(matches)?;
    let bot_check_opts = bot_check::Options::parse(matches);

    Ok(Action::Server(Args {
        port,
        dsn,
        token_secret: auth_opts.token_secret,
        frontend_base_url: auth_opts.frontend_base_url,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        reset_ttl_seconds: auth_opts.reset_ttl_seconds,
        allow_registration: auth_opts.allow_registration,
        external_auth_enabled: external_opts.enabled,
        google_client_id: external_opts.google_client_id,
        google_client_secret: external_opts.google_client_secret,
        google_redirect_url: external_opts.google_redirect_url,
        bot_check_secret: bot_check_opts.secret,
        bot_check_url: bot_check_opts.verify_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_secret_required() {
        temp_env::with_vars(
            [
                ("ZAGUAN_TOKEN_SECRET", None::<&str>),
                ("ZAGUAN_DSN", Some("postgres://user@localhost:5432/zaguan")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["zaguan"]);
                let result = handler(&matches);
                assert!(result.is_err());
                if let Err(err) = result {
                    assert!(err
                        .to_string()
                        .contains("missing required argument: --token-secret"));
                }
            },
        );
    }

    #[test]
    fn builds_server_action() {
        temp_env::with_vars(
            [
                ("ZAGUAN_TOKEN_SECRET", Some("hmac-secret")),
                ("ZAGUAN_DSN", Some("postgres://user@localhost:5432/zaguan")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["zaguan", "--port", "9090"]);
                let action = handler(&matches).expect("server action");
                let Action::Server(args) = action;
                assert_eq!(args.port, 9090);
                assert!(args.allow_registration);
                assert!(!args.external_auth_enabled);
                assert!(args.bot_check_secret.is_none());
            },
        );
    }
}
