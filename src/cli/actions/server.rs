use crate::{api, cli::globals::GlobalArgs};
use anyhow::Result;
use secrecy::SecretString;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub token_secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    pub frontend_base_url: String,
    pub google_client_ids: Vec<String>,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let mut globals = GlobalArgs::new(SecretString::from(args.token_secret));
    globals.access_ttl_minutes = args.access_ttl_minutes;
    globals.refresh_ttl_minutes = args.refresh_ttl_minutes;
    globals.frontend_base_url = args.frontend_base_url;
    globals.google_client_ids = args.google_client_ids;

    debug!("Global args: {:?}", globals);

    api::new(args.port, args.dsn, &globals).await
}
