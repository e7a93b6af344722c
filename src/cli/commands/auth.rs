//! Token and provider arguments.

use anyhow::{Context, Result};
use clap::{Arg, Command};

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_ACCESS_TTL_MINUTES: &str = "access-ttl-minutes";
pub const ARG_REFRESH_TTL_MINUTES: &str = "refresh-ttl-minutes";
pub const ARG_FRONTEND_URL: &str = "frontend-url";
pub const ARG_GOOGLE_CLIENT_ID: &str = "google-client-id";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long(ARG_TOKEN_SECRET)
                .help("Symmetric secret used to sign access and refresh tokens")
                .env("LUNA_AUTH_TOKEN_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TTL_MINUTES)
                .long(ARG_ACCESS_TTL_MINUTES)
                .help("Access token lifetime in minutes")
                .env("LUNA_AUTH_ACCESS_TTL_MINUTES")
                .default_value("60")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TTL_MINUTES)
                .long(ARG_REFRESH_TTL_MINUTES)
                .help("Refresh token lifetime in minutes")
                .env("LUNA_AUTH_REFRESH_TTL_MINUTES")
                .default_value("10080")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_FRONTEND_URL)
                .long(ARG_FRONTEND_URL)
                .help("Frontend origin allowed by CORS")
                .env("LUNA_AUTH_FRONTEND_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_GOOGLE_CLIENT_ID)
                .long(ARG_GOOGLE_CLIENT_ID)
                .help("Google OAuth client ID accepted in the token audience (repeatable)")
                .env("LUNA_AUTH_GOOGLE_CLIENT_IDS")
                .value_delimiter(',')
                .action(clap::ArgAction::Append),
        )
}

#[derive(Debug)]
pub struct Options {
    pub token_secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    pub frontend_base_url: String,
    pub google_client_ids: Vec<String>,
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let token_secret = matches
            .get_one::<String>(ARG_TOKEN_SECRET)
            .cloned()
            .context("missing required argument: --token-secret")?;
        let access_ttl_minutes = matches
            .get_one::<i64>(ARG_ACCESS_TTL_MINUTES)
            .copied()
            .unwrap_or(60);
        let refresh_ttl_minutes = matches
            .get_one::<i64>(ARG_REFRESH_TTL_MINUTES)
            .copied()
            .unwrap_or(10080);
        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_URL)
            .cloned()
            .unwrap_or_else(|| "http://localhost:3000".to_string());
        let google_client_ids = matches
            .get_many::<String>(ARG_GOOGLE_CLIENT_ID)
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        Ok(Self {
            token_secret,
            access_ttl_minutes,
            refresh_ttl_minutes,
            frontend_base_url,
            google_client_ids,
        })
    }
}
