//! Access tokens for the Google Drive API using a service account.
//!
//! `yup_oauth2` signs the assertion with the service account's private key, exchanges it at the
//! key's `token_uri`, and caches the resulting bearer token in memory, refreshing it shortly
//! before it expires.

use crate::api::DRIVE_SCOPE;
use crate::error::Res;
use anyhow::Context;
use tracing::trace;
use yup_oauth2::authenticator::DefaultAuthenticator;
use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};

/// Hands out valid access tokens for the Drive scope.
pub(crate) struct TokenProvider {
    auth: DefaultAuthenticator,
}

impl TokenProvider {
    /// Creates the authenticator. Fails if the private key cannot be used for signing.
    pub(crate) async fn new(key: ServiceAccountKey) -> Res<Self> {
        let auth = ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .context("Failed to create the service account authenticator")?;
        Ok(Self { auth })
    }

    /// Returns a valid access token.
    pub(crate) async fn token(&self) -> Res<String> {
        let token = self
            .auth
            .token(&[DRIVE_SCOPE])
            .await
            .context("Failed to obtain an access token for Google Drive")?;
        trace!("Access token expires at {:?}", token.expiration_time());
        token
            .token()
            .map(str::to_string)
            .context("Google returned an empty access token")
    }
}
