//! External identity providers.
//!
//! Each provider turns an opaque client-supplied credential into a verified
//! `(provider, subject)` identity by calling the provider's verification
//! endpoint. A credential the provider rejects is an authentication failure;
//! a provider we cannot reach is an upstream failure.

use crate::error::AuthError;
use crate::identity::models::SocialProvider;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const FACEBOOK_GRAPH_ME_URL: &str = "https://graph.facebook.com/me";

const VERIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Profile attributes returned by a provider for a valid credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Provider-scoped stable subject identifier.
    pub subject_id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn provider(&self) -> SocialProvider;

    /// Verify a credential with the provider and return the identity it
    /// attests to.
    ///
    /// # Errors
    ///
    /// `Authentication` when the provider rejects the credential, `Upstream`
    /// when the provider cannot be reached or answers unintelligibly.
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, AuthError>;
}

fn verification_client() -> Result<reqwest::Client, AuthError> {
    reqwest::Client::builder()
        .user_agent(crate::APP_USER_AGENT)
        .timeout(VERIFY_TIMEOUT)
        .build()
        .map_err(|err| AuthError::Internal(err.into()))
}

/// Verifies Google ID tokens against the tokeninfo endpoint.
pub struct GoogleProvider {
    client: reqwest::Client,
    /// OAuth client IDs allowed in the token audience. Empty skips the
    /// audience check, which only makes sense in development.
    client_ids: Vec<String>,
}

#[derive(Deserialize)]
struct GoogleTokenInfo {
    sub: String,
    aud: String,
    email: Option<String>,
    name: Option<String>,
}

impl GoogleProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(client_ids: Vec<String>) -> Result<Self, AuthError> {
        Ok(Self {
            client: verification_client()?,
            client_ids,
        })
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    fn provider(&self) -> SocialProvider {
        SocialProvider::Google
    }

    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, AuthError> {
        let response = self
            .client
            .get(GOOGLE_TOKENINFO_URL)
            .query(&[("id_token", credential)])
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "google tokeninfo request failed");
                AuthError::Upstream("Could not verify Google token".to_string())
            })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "google rejected id token");
            return Err(AuthError::Authentication("Invalid Google token".to_string()));
        }

        let info: GoogleTokenInfo = response.json().await.map_err(|err| {
            warn!(error = %err, "google tokeninfo response unreadable");
            AuthError::Upstream("Could not verify Google token".to_string())
        })?;

        if !self.client_ids.is_empty() && !self.client_ids.contains(&info.aud) {
            warn!(aud = %info.aud, "google token audience mismatch");
            return Err(AuthError::Authentication("Invalid Google token".to_string()));
        }

        info!(subject = %info.sub, "verified google identity");
        Ok(VerifiedIdentity {
            subject_id: info.sub,
            email: info.email,
            display_name: info.name,
        })
    }
}

/// Verifies Facebook access tokens against the Graph API.
pub struct FacebookProvider {
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct FacebookProfile {
    id: String,
    email: Option<String>,
    name: Option<String>,
}

impl FacebookProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, AuthError> {
        Ok(Self {
            client: verification_client()?,
        })
    }
}

#[async_trait]
impl IdentityProvider for FacebookProvider {
    fn provider(&self) -> SocialProvider {
        SocialProvider::Facebook
    }

    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, AuthError> {
        let response = self
            .client
            .get(FACEBOOK_GRAPH_ME_URL)
            .query(&[("fields", "id,name,email"), ("access_token", credential)])
            .send()
            .await
            .map_err(|err| {
                warn!(error = %err, "facebook graph request failed");
                AuthError::Upstream("Could not verify Facebook token".to_string())
            })?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "facebook rejected access token");
            return Err(AuthError::Authentication(
                "Invalid Facebook token".to_string(),
            ));
        }

        let profile: FacebookProfile = response.json().await.map_err(|err| {
            warn!(error = %err, "facebook graph response unreadable");
            AuthError::Upstream("Could not verify Facebook token".to_string())
        })?;

        info!(subject = %profile.id, "verified facebook identity");
        Ok(VerifiedIdentity {
            subject_id: profile.id,
            email: profile.email,
            display_name: profile.name,
        })
    }
}
