use secrecy::SecretString;

/// Settings shared by the server wiring, resolved once at startup.
#[derive(Clone)]
pub struct GlobalArgs {
    pub token_secret: SecretString,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    pub frontend_base_url: String,
    /// Google OAuth client IDs accepted in the token audience. Empty skips
    /// the audience check.
    pub google_client_ids: Vec<String>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(token_secret: SecretString) -> Self {
        Self {
            token_secret,
            access_ttl_minutes: 60,
            refresh_ttl_minutes: 7 * 24 * 60,
            frontend_base_url: "http://localhost:3000".to_string(),
            google_client_ids: Vec::new(),
        }
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("token_secret", &"***")
            .field("access_ttl_minutes", &self.access_ttl_minutes)
            .field("refresh_ttl_minutes", &self.refresh_ttl_minutes)
            .field("frontend_base_url", &self.frontend_base_url)
            .field("google_client_ids", &self.google_client_ids)
            .finish()
    }
}
