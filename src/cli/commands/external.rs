use clap::{Arg, ArgAction, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_EXTERNAL_AUTH: &str = "external-auth";
pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";
pub const ARG_GOOGLE_CLIENT_SECRET: &str = "google-client-secret";
pub const ARG_GOOGLE_REDIRECT_URL: &str = "google-redirect-url";

#[derive(Debug)]
pub struct Options {
    pub enabled: bool,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<SecretString>,
    pub google_redirect_url: Option<String>,
}

impl Options {
    /// Parse external-identity arguments from matches.
    ///
    /// # Errors
    /// Returns an error if external auth is enabled without provider credentials.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .cloned()
                .filter(|v| !v.trim().is_empty())
        };

        let enabled = matches.get_flag(ARG_EXTERNAL_AUTH);
        let client_id = get_non_empty(ARG_GOOGLE_CLIENT_ID);
        let client_secret = get_non_empty(ARG_GOOGLE_CLIENT_SECRET);
        let redirect_url = get_non_empty(ARG_GOOGLE_REDIRECT_URL);

        if enabled && (client_id.is_none() || client_secret.is_none() || redirect_url.is_none()) {
            anyhow::bail!(
                "--{ARG_EXTERNAL_AUTH} requires --{ARG_GOOGLE_CLIENT_ID}, \
                 --{ARG_GOOGLE_CLIENT_SECRET} and --{ARG_GOOGLE_REDIRECT_URL}"
            );
        }

        Ok(Self {
            enabled,
            google_client_id: client_id,
            google_client_secret: client_secret.map(SecretString::from),
            google_redirect_url: redirect_url,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_EXTERNAL_AUTH)
                .long(ARG_EXTERNAL_AUTH)
                .help("Enable Google-linked external login at startup")
                .env("ZAGUAN_EXTERNAL_AUTH")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Google OAuth client id")
                .env("ZAGUAN_GOOGLE_CLIENT_ID"),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_SECRET)
                .long(ARG_GOOGLE_CLIENT_SECRET)
                .help("Google OAuth client secret")
                .env("ZAGUAN_GOOGLE_CLIENT_SECRET"),
        )
        .arg(
            Arg::new(ARG_GOOGLE_REDIRECT_URL)
                .long(ARG_GOOGLE_REDIRECT_URL)
                .help("Redirect URL registered with the OAuth provider")
                .env("ZAGUAN_GOOGLE_REDIRECT_URL"),
        )
}
