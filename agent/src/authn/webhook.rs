//! GitHub webhook delivery signatures

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::errors::AgentError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the HMAC-SHA256 of the delivery body
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

const SIGNATURE_PREFIX: &str = "sha256=";

fn mac(secret: &SecretString) -> Result<HmacSha256, AgentError> {
    HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| AgentError::Internal(format!("Invalid webhook secret: {}", e)))
}

/// Signature GitHub sends for `body`, formatted as `sha256=<hex>`
pub fn sign_payload(secret: &SecretString, body: &[u8]) -> Result<String, AgentError> {
    let mut mac = mac(secret)?;
    mac.update(body);
    Ok(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Check the `X-Hub-Signature-256` value of a delivery against its raw body.
///
/// The digest comparison is constant time.
pub fn verify_signature(
    secret: &SecretString,
    signature: Option<&str>,
    body: &[u8],
) -> Result<(), AgentError> {
    let signature = signature
        .ok_or_else(|| AgentError::AuthError("Missing X-Hub-Signature-256 header".to_string()))?;
    let digest = signature
        .strip_prefix(SIGNATURE_PREFIX)
        .ok_or_else(|| AgentError::AuthError("Unsupported signature format".to_string()))?;
    let expected = hex::decode(digest)
        .map_err(|e| AgentError::AuthError(format!("Malformed signature: {}", e)))?;

    let mut mac = mac(secret)?;
    mac.update(body);
    mac.verify_slice(&expected)
        .map_err(|_| AgentError::AuthError("Webhook signature mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("It's a Secret to Everybody".to_string())
    }

    #[test]
    fn test_github_reference_signature() {
        // Example delivery from GitHub's webhook validation docs
        let signature = sign_payload(&secret(), b"Hello, World!").unwrap();
        assert_eq!(
            signature,
            "sha256=757107ea0eb2509fc211221cce984b8a37570b6d7586c22c46f4379c8b043e17"
        );
        assert!(verify_signature(&secret(), Some(&signature), b"Hello, World!").is_ok());
    }

    #[test]
    fn test_tampered_body_rejected() {
        let signature = sign_payload(&secret(), b"{\"ref\":\"refs/heads/main\"}").unwrap();
        let tampered = b"{\"ref\":\"refs/heads/evil\"}";
        let result = verify_signature(&secret(), Some(&signature), tampered);
        assert!(matches!(result, Err(AgentError::AuthError(_))));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = SecretString::from("not the secret".to_string());
        let signature = sign_payload(&other, b"payload").unwrap();
        assert!(verify_signature(&secret(), Some(&signature), b"payload").is_err());
    }

    #[test]
    fn test_missing_or_malformed_signature_rejected() {
        assert!(verify_signature(&secret(), None, b"payload").is_err());
        assert!(verify_signature(&secret(), Some("sha1=abcdef"), b"payload").is_err());
        assert!(verify_signature(&secret(), Some("sha256=not-hex"), b"payload").is_err());
        assert!(verify_signature(&secret(), Some("sha256="), b"payload").is_err());
    }
}
