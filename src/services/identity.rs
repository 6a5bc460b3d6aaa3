//! Bearer token verification
//!
//! Production deployments verify Firebase ID tokens against Google's published
//! signing keys. A shared-secret verifier is available for development setups
//! without a Firebase project.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use jsonwebtoken::{
    decode, decode_header, encode,
    jwk::{Jwk, JwkSet},
    Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    config::{AuthConfig, AuthProvider},
    error::{AppError, AppResult},
};

/// Identity established from a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify a bearer token and return the identity it carries
    async fn verify(&self, token: &str) -> AppResult<Identity>;
}

/// Claims read from ID tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
}

impl TokenClaims {
    fn into_identity(self) -> AppResult<Identity> {
        if self.sub.is_empty() {
            return Err(AppError::Authentication("Token has no subject".to_string()));
        }
        let email = self
            .email
            .filter(|email| !email.is_empty())
            .ok_or_else(|| AppError::Authentication("Token has no email".to_string()))?;
        Ok(Identity {
            uid: self.sub,
            email,
        })
    }
}

/// Build the verifier selected by configuration
pub fn from_config(config: &AuthConfig) -> AppResult<Arc<dyn IdentityVerifier>> {
    match config.provider {
        AuthProvider::Firebase => {
            if config.firebase_service_key.is_empty() {
                return Err(AppError::Internal(
                    "auth.firebase_service_key (FB_SERVICE_KEY) is not set".to_string(),
                ));
            }
            let verifier = FirebaseVerifier::from_service_key(
                &config.firebase_service_key,
                &config.jwks_url,
                Duration::from_secs(config.keys_ttl_secs),
            )?;
            tracing::info!("Verifying tokens for Firebase project {}", verifier.project_id);
            Ok(Arc::new(verifier))
        }
        AuthProvider::Secret => {
            if config.jwt_secret.is_empty() {
                return Err(AppError::Internal(
                    "auth.jwt_secret (JWT_SECRET) is not set".to_string(),
                ));
            }
            tracing::warn!("Verifying tokens with a shared secret");
            Ok(Arc::new(SecretVerifier::new(&config.jwt_secret)))
        }
    }
}

/// HS256 tokens signed with a shared secret
pub struct SecretVerifier {
    secret: String,
}

impl SecretVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    /// Issue a token for `email`, valid for `ttl`
    pub fn create_token(&self, uid: &str, email: &str, ttl: chrono::Duration) -> AppResult<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: uid.to_string(),
            email: Some(email.to_string()),
            exp: (now + ttl).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))
    }
}

#[async_trait]
impl IdentityVerifier for SecretVerifier {
    async fn verify(&self, token: &str) -> AppResult<Identity> {
        let data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::Authentication(e.to_string()))?;
        data.claims.into_identity()
    }
}

#[derive(Deserialize)]
struct ServiceAccount {
    project_id: String,
}

/// Shortest time between two fetches triggered by an unknown key id
const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(60);

struct CachedKeys {
    keys: JwkSet,
    fetched_at: Instant,
}

/// Verifies Firebase ID tokens (RS256, keys from Google's JWKS endpoint)
pub struct FirebaseVerifier {
    project_id: String,
    jwks_url: String,
    keys_ttl: Duration,
    min_refetch_interval: Duration,
    http: reqwest::Client,
    cache: RwLock<Option<CachedKeys>>,
}

impl FirebaseVerifier {
    pub fn new(project_id: &str, jwks_url: &str, keys_ttl: Duration) -> Self {
        Self {
            project_id: project_id.to_string(),
            jwks_url: jwks_url.to_string(),
            keys_ttl,
            min_refetch_interval: MIN_REFETCH_INTERVAL.min(keys_ttl),
            http: reqwest::Client::new(),
            cache: RwLock::new(None),
        }
    }

    /// Build a verifier from a base64-encoded service account JSON
    pub fn from_service_key(encoded: &str, jwks_url: &str, keys_ttl: Duration) -> AppResult<Self> {
        let raw = STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::Internal(format!("Invalid service key encoding: {}", e)))?;
        let account: ServiceAccount = serde_json::from_slice(&raw)
            .map_err(|e| AppError::Internal(format!("Invalid service key: {}", e)))?;
        Ok(Self::new(&account.project_id, jwks_url, keys_ttl))
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    async fn fetch_keys(&self) -> AppResult<JwkSet> {
        tracing::debug!("Fetching signing keys from {}", self.jwks_url);
        let response = self
            .http
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::Internal(format!("Failed to fetch signing keys: {}", e)))?;
        response
            .json::<JwkSet>()
            .await
            .map_err(|e| AppError::Internal(format!("Invalid signing keys: {}", e)))
    }

    /// Decoding key for `kid`, refreshing the cache when stale or when the key is unknown.
    ///
    /// Unknown key ids refetch at most once per `min_refetch_interval`. When a
    /// refresh fails, keys from the previous set are still accepted.
    async fn decoding_key(&self, kid: &str) -> AppResult<DecodingKey> {
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                let age = cached.fetched_at.elapsed();
                if age < self.keys_ttl {
                    if let Some(jwk) = cached.keys.find(kid) {
                        return to_decoding_key(jwk);
                    }
                    if age < self.min_refetch_interval {
                        return Err(unknown_key(kid));
                    }
                }
            }
        }

        let keys = match self.fetch_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                let cache = self.cache.read().await;
                return match cache.as_ref().and_then(|cached| cached.keys.find(kid)) {
                    Some(jwk) => {
                        tracing::warn!("Using previously fetched signing keys: {}", e);
                        to_decoding_key(jwk)
                    }
                    None => Err(e),
                };
            }
        };
        let key = keys.find(kid).map(to_decoding_key).transpose()?;

        *self.cache.write().await = Some(CachedKeys {
            keys,
            fetched_at: Instant::now(),
        });

        key.ok_or_else(|| unknown_key(kid))
    }
}

fn to_decoding_key(jwk: &Jwk) -> AppResult<DecodingKey> {
    DecodingKey::from_jwk(jwk).map_err(|e| AppError::Internal(format!("Invalid signing key: {}", e)))
}

fn unknown_key(kid: &str) -> AppError {
    AppError::Authentication(format!("Unknown signing key {}", kid))
}

#[async_trait]
impl IdentityVerifier for FirebaseVerifier {
    async fn verify(&self, token: &str) -> AppResult<Identity> {
        let header =
            decode_header(token).map_err(|e| AppError::Authentication(e.to_string()))?;
        if header.alg != Algorithm::RS256 {
            return Err(AppError::Authentication(format!(
                "Unexpected token algorithm {:?}",
                header.alg
            )));
        }
        let kid = header
            .kid
            .ok_or_else(|| AppError::Authentication("Token has no key id".to_string()))?;

        let key = self.decoding_key(&kid).await?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[format!("https://securetoken.google.com/{}", self.project_id)]);

        let data = decode::<TokenClaims>(token, &key, &validation)
            .map_err(|e| AppError::Authentication(e.to_string()))?;
        data.claims.into_identity()
    }
}
