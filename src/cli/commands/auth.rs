use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_RESET_TTL_SECONDS: &str = "reset-ttl-seconds";
pub const ARG_DISABLE_REGISTRATION: &str = "disable-registration";

#[derive(Debug)]
pub struct Options {
    pub token_secret: SecretString,
    pub frontend_base_url: String,
    pub session_ttl_seconds: i64,
    pub reset_ttl_seconds: i64,
    pub allow_registration: bool,
}

impl Options {
    /// Parse auth arguments from matches.
    ///
    /// # Errors
    /// Returns an error if required arguments are missing.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let token_secret = matches.get_one::<String>(ARG_TOKEN_SECRET).cloned();
        let token_secret = match token_secret {
            Some(value) if !value.trim().is_empty() => SecretString::from(value),
            _ => anyhow::bail!("missing required argument: --{ARG_TOKEN_SECRET}"),
        };

        Ok(Self {
            token_secret,
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .unwrap_or_else(|| "https://portal.zaguan.dev".to_string()),
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(86_400),
            reset_ttl_seconds: matches
                .get_one::<i64>(ARG_RESET_TTL_SECONDS)
                .copied()
                .unwrap_or(3_600),
            allow_registration: !matches.get_flag(ARG_DISABLE_REGISTRATION),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("Secret key used to sign session tokens (HMAC-SHA256)")
                .env("ZAGUAN_TOKEN_SECRET"),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL used for reset links, redirects and CORS")
                .env("ZAGUAN_FRONTEND_BASE_URL")
                .default_value("https://portal.zaguan.dev"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Session token TTL in seconds")
                .env("ZAGUAN_SESSION_TTL_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_RESET_TTL_SECONDS)
                .long(ARG_RESET_TTL_SECONDS)
                .help("Password reset token TTL in seconds")
                .env("ZAGUAN_RESET_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_DISABLE_REGISTRATION)
                .long(ARG_DISABLE_REGISTRATION)
                .help("Refuse self-service registration")
                .env("ZAGUAN_DISABLE_REGISTRATION")
                .action(ArgAction::SetTrue),
        )
}
