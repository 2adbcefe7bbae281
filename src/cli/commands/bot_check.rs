use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::api::handlers::auth::bot_check::DEFAULT_VERIFY_URL;

pub const ARG_BOT_CHECK_SECRET: &str = "bot-check-secret";
pub const ARG_BOT_CHECK_URL: &str = "bot-check-url";

#[derive(Debug)]
pub struct Options {
    pub secret: Option<SecretString>,
    pub verify_url: String,
}

impl Options {
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            secret: matches
                .get_one::<String>(ARG_BOT_CHECK_SECRET)
                .cloned()
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from),
            verify_url: matches
                .get_one::<String>(ARG_BOT_CHECK_URL)
                .cloned()
                .unwrap_or_else(|| DEFAULT_VERIFY_URL.to_string()),
        }
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_BOT_CHECK_SECRET)
                .long(ARG_BOT_CHECK_SECRET)
                .help("Server-side secret for the bot-check verifier; enables the login bot check")
                .env("ZAGUAN_BOT_CHECK_SECRET"),
        )
        .arg(
            Arg::new(ARG_BOT_CHECK_URL)
                .long(ARG_BOT_CHECK_URL)
                .help("Bot-check siteverify endpoint")
                .env("ZAGUAN_BOT_CHECK_URL")
                .default_value(DEFAULT_VERIFY_URL),
        )
}
