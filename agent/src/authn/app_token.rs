//! GitHub App JSON web tokens

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::errors::AgentError;

/// GitHub rejects app tokens valid for longer than 10 minutes
const APP_TOKEN_LIFETIME_SECS: i64 = 9 * 60;

/// Backdated to tolerate clock drift between us and GitHub
const CLOCK_DRIFT_SECS: i64 = 60;

/// App token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppTokenClaims {
    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// Issuer (the app id)
    pub iss: String,
}

impl AppTokenClaims {
    pub fn new(app_id: u64, now: DateTime<Utc>) -> Self {
        let now = now.timestamp();
        Self {
            iat: now - CLOCK_DRIFT_SECS,
            exp: now + APP_TOKEN_LIFETIME_SECS,
            iss: app_id.to_string(),
        }
    }
}

/// Sign an RS256 app token with the app's PEM private key
pub fn create_app_token(
    app_id: u64,
    private_key_pem: &str,
    now: DateTime<Utc>,
) -> Result<String, AgentError> {
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
        .map_err(|e| AgentError::AuthError(format!("Invalid GitHub App private key: {}", e)))?;
    let claims = AppTokenClaims::new(app_id, now);
    Ok(encode(&Header::new(Algorithm::RS256), &claims, &key)?)
}

/// Whether a token expiring at `expires_at` can still be handed out
pub fn is_fresh(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at - Duration::seconds(CLOCK_DRIFT_SECS) > now
}
