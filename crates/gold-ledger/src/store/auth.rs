//! Google service-account authentication.
//!
//! The key is read as raw JSON from an environment variable and kept in
//! memory only. A signed RS256 assertion is exchanged at the key's
//! `token_uri` for a short-lived bearer token.

use crate::error::AuthConfigError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// Environment variable holding the service-account JSON (not a path).
pub const CREDENTIALS_ENV: &str = "GCP_SERVICE_ACCOUNT_JSON";

/// OAuth scope for reading and appending spreadsheet values.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The fields of a service-account key file this program uses.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .field("project_id", &self.project_id)
            .finish()
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

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl ServiceAccountKey {
    /// Load the key from the JSON blob in environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self, AuthConfigError> {
        let raw = std::env::var(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AuthConfigError::MissingCredential(var.to_string()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, AuthConfigError> {
        let key: Self = serde_json::from_str(raw)
            .map_err(|e| AuthConfigError::InvalidCredential(e.to_string()))?;

        if key.client_email.trim().is_empty() {
            return Err(AuthConfigError::InvalidCredential(
                "client_email is empty".into(),
            ));
        }
        if !key.private_key.contains("PRIVATE KEY") {
            return Err(AuthConfigError::InvalidCredential(
                "private_key is not a PEM key".into(),
            ));
        }
        Ok(key)
    }

    /// Signed JWT asserting this account for `scope`, issued at `issued_at`.
    pub fn assertion(&self, scope: &str, issued_at: DateTime<Utc>) -> Result<String, AuthConfigError> {
        let iat = issued_at.timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| AuthConfigError::InvalidCredential(format!("private_key: {e}")))?;
        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| AuthConfigError::InvalidCredential(format!("signing assertion: {e}")))
    }
}

/// A bearer token for the Sheets API.
#[derive(Clone)]
pub struct AccessToken {
    token: String,
    /// When the token stops being accepted, if the issuer said.
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    /// Wrap an already issued token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expires_at: None,
        }
    }

    pub fn secret(&self) -> &str {
        &self.token
    }

    /// Check whether this token has expired. `false` if no expiry is known.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }
}

/// Exchange a signed assertion for an access token.
pub async fn fetch_access_token(
    client: &reqwest::Client,
    key: &ServiceAccountKey,
    scope: &str,
) -> Result<AccessToken, AuthConfigError> {
    let now = Utc::now();
    let assertion = key.assertion(scope, now)?;
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("grant_type", JWT_BEARER_GRANT)
        .append_pair("assertion", &assertion)
        .finish();

    debug!(client_email = %key.client_email, token_uri = %key.token_uri, "requesting access token");
    let resp = client
        .post(&key.token_uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(body)
        .send()
        .await
        .map_err(|e| AuthConfigError::TokenExchange(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let text = resp.text().await.unwrap_or_default();
        return Err(AuthConfigError::TokenExchange(format!(
            "HTTP {}: {}",
            status.as_u16(),
            text.trim()
        )));
    }

    let token: TokenResponse = resp
        .json()
        .await
        .map_err(|e| AuthConfigError::TokenExchange(format!("invalid token response: {e}")))?;

    info!(client_email = %key.client_email, "authenticated service account");
    Ok(AccessToken {
        token: token.access_token,
        expires_at: token.expires_in.map(|secs| now + Duration::seconds(secs)),
    })
}
