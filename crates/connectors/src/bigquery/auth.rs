//! Service-account credentials and OAuth token exchange.
//!
//! A signed RS256 assertion is exchanged at the key's token endpoint for a
//! short-lived bearer token, which is cached until shortly before it expires.

use crate::{bigquery::models::TokenResponse, error::WarehouseError};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

pub const BIGQUERY_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

/// The fields of a service-account JSON key this client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

impl ServiceAccountKey {
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, WarehouseError> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, WarehouseError> {
        serde_json::from_str(raw)
            .map_err(|e| WarehouseError::Auth(format!("invalid service account key: {e}")))
    }

    fn token_uri(&self) -> &str {
        self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

pub struct TokenProvider {
    http: reqwest::Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, key: ServiceAccountKey) -> Result<Self, WarehouseError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| WarehouseError::Auth(format!("invalid private key: {e}")))?;
        Ok(Self {
            http,
            key,
            encoding_key,
            cached: Mutex::new(None),
        })
    }

    /// A valid bearer token, minting a new one when the cached token is
    /// missing or about to expire.
    pub async fn token(&self) -> Result<String, WarehouseError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now();

        if let Some(current) = cached.as_ref() {
            if current.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                return Ok(current.token.clone());
            }
        }

        let fresh = self.exchange(now).await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String, WarehouseError> {
        let claims = Claims {
            iss: &self.key.client_email,
            scope: BIGQUERY_SCOPE,
            aud: self.key.token_uri(),
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| WarehouseError::Auth(format!("failed to sign assertion: {e}")))
    }

    async fn exchange(&self, now: DateTime<Utc>) -> Result<CachedToken, WarehouseError> {
        let assertion = self.assertion(now)?;
        debug!(account = %self.key.client_email, "Requesting access token");

        let response = self
            .http
            .post(self.key.token_uri())
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WarehouseError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(CachedToken {
            token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}
