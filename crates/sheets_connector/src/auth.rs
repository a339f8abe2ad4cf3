use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::{STANDARD as base64_engine, URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use ring::rand::SystemRandom;
use ring::signature::{RSA_PKCS1_SHA256, RsaKeyPair};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{Result, SheetsError};
use crate::req::{SheetsClient, parse_response};

pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
pub const CREDENTIALS_ENV_VAR: &str = "GSHEETS_CREDENTIALS";
pub const DEFAULT_CREDENTIALS_PATH: &str = "config/credentials.json";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Tokens are refreshed this long before they actually expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Credentials file path from `GSHEETS_CREDENTIALS`, falling back to
/// `config/credentials.json` relative to the working directory.
pub fn credentials_path_from_env() -> PathBuf {
    std::env::var_os(CREDENTIALS_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH))
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The subset of a service account json key we need.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl ServiceAccountKey {
    pub fn from_json(s: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(s)?;
        if key.client_email.is_empty() {
            return Err(SheetsError::InvalidCredentials(
                "client_email cannot be empty".to_string(),
            ));
        }
        Ok(key)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "reading service account key");
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    value: String,
    validity: Duration,
    created_at: DateTime<Utc>,
}

impl Token {
    pub fn new(value: String, validity_in_seconds: i64, created_at: DateTime<Utc>) -> Self {
        Self {
            value,
            validity: Duration::seconds(validity_in_seconds),
            created_at,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at)
            < self.validity - Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

#[derive(Debug)]
pub enum Authenticator {
    /// Exchange a signed JWT for short lived access tokens.
    ServiceAccount(ServiceAccountAuthenticator),
    /// A pre-issued bearer token, used as is.
    Static(String),
}

impl Authenticator {
    /// A token valid right now, reusing `cached` when it hasn't expired.
    pub(crate) async fn token(
        &self,
        client: &SheetsClient,
        cached: &mut Option<Token>,
    ) -> Result<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ServiceAccount(auth) => {
                if let Some(token) = cached.as_ref().filter(|t| t.is_valid()) {
                    return Ok(token.value().to_string());
                }
                let token = auth.request_token(client).await?;
                let value = token.value().to_string();
                *cached = Some(token);
                Ok(value)
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct JwtHeader<'a> {
    alg: &'static str,
    typ: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kid: Option<&'a str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug)]
pub struct ServiceAccountAuthenticator {
    key: ServiceAccountKey,
    key_pair: RsaKeyPair,
    scope: String,
    rng: SystemRandom,
}

impl ServiceAccountAuthenticator {
    pub fn try_new(key: ServiceAccountKey, scope: impl Into<String>) -> Result<Self> {
        let der = pem_to_der(&key.private_key)?;
        let key_pair =
            RsaKeyPair::from_pkcs8(&der).map_err(|e| SheetsError::KeyRejected(e.to_string()))?;

        Ok(Self {
            key,
            key_pair,
            scope: scope.into(),
            rng: SystemRandom::new(),
        })
    }

    /// Signed RS256 JWT asserting the service account's identity.
    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let header = JwtHeader {
            alg: "RS256",
            typ: "JWT",
            kid: self.key.private_key_id.as_deref(),
        };
        let iat = now.timestamp();
        let claims = JwtClaims {
            iss: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri.clone(),
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };

        let message = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?),
        );

        let mut signature = vec![0; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(
                &RSA_PKCS1_SHA256,
                &self.rng,
                message.as_bytes(),
                &mut signature,
            )
            .map_err(|_| SheetsError::SigningFailed)?;

        Ok(format!("{message}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    async fn request_token(&self, client: &SheetsClient) -> Result<Token> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;

        debug!(client_email = %self.key.client_email, "requesting access token");
        let res = client
            .http()
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let res: TokenResponse = parse_response(res).await?;
        Ok(Token::new(
            res.access_token,
            res.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS),
            now,
        ))
    }
}

/// DER bytes of a PEM encoded key.
fn pem_to_der(pem: &str) -> Result<Vec<u8>> {
    let body: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("-----"))
        .collect();

    if body.is_empty() {
        return Err(SheetsError::InvalidCredentials(
            "private_key is empty".to_string(),
        ));
    }

    Ok(base64_engine.decode(body)?)
}
