use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use vidlens_common::{Credential, Result, VidlensError, DEFAULT_TOKEN_LIFETIME_SECS};

/// Source of fresh access tokens (the identity endpoint).
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self) -> Result<String>;
}

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Reads the `exp` claim from a JWT payload without verifying its signature.
pub fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    DateTime::from_timestamp(data.claims.exp, 0)
}

/// Holds at most one live credential and refreshes it lazily.
///
/// Readers holding a still-valid credential only take the read lock. Callers
/// that need a refresh serialise on `refresh_lock` and re-check after
/// acquiring it, so a burst of concurrent misses issues a single
/// authentication call.
pub struct CredentialCache {
    issuer: Arc<dyn TokenIssuer>,
    current: RwLock<Option<Credential>>,
    refresh_lock: Mutex<()>,
    clock: Clock,
}

impl CredentialCache {
    pub fn new(issuer: Arc<dyn TokenIssuer>) -> Self {
        Self::with_clock(issuer, Arc::new(Utc::now))
    }

    pub fn with_clock(issuer: Arc<dyn TokenIssuer>, clock: Clock) -> Self {
        Self {
            issuer,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            clock,
        }
    }

    async fn cached(&self) -> Option<Credential> {
        let now = (self.clock)();
        self.current
            .read()
            .await
            .as_ref()
            .filter(|c| c.is_usable_at(now))
            .cloned()
    }

    pub async fn acquire(&self, force_refresh: bool) -> Result<Credential> {
        if !force_refresh {
            if let Some(cred) = self.cached().await {
                return Ok(cred);
            }
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited.
        if !force_refresh {
            if let Some(cred) = self.cached().await {
                return Ok(cred);
            }
        }

        let token = self.issuer.issue_token().await.map_err(|e| match e {
            VidlensError::Auth(_) => e,
            other => VidlensError::Auth(other.to_string()),
        })?;
        if token.trim().is_empty() {
            return Err(VidlensError::Auth("identity endpoint returned an empty token".into()));
        }

        let acquired_at = (self.clock)();
        let expires_at = token_expiry(&token).unwrap_or_else(|| {
            tracing::warn!("Could not parse token expiration, assuming {}s lifetime", DEFAULT_TOKEN_LIFETIME_SECS);
            acquired_at + Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS)
        });

        let cred = Credential::new(token, expires_at);
        *self.current.write().await = Some(cred.clone());
        tracing::info!("Retrieved access token, expires: {}", expires_at);
        Ok(cred)
    }

    /// Drops the held credential so the next `acquire` re-authenticates.
    pub async fn invalidate(&self) {
        *self.current.write().await = None;
    }
}
