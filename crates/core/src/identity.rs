//! Caller identities and shared-secret access tokens.
//!
//! A token is `base64url(claims).base64url(hmac_sha256(secret, base64url(claims)))`.
//! The claims carry the identity and an optional expiry in Unix seconds.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use time::{Duration, OffsetDateTime};

type HmacSha256 = Hmac<Sha256>;

/// A verified caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Login name; matches the last segment of the user's home directory.
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub display_name: String,
}

impl Identity {
    /// Create an identity with only a username.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: String::new(),
            display_name: String::new(),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.username)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    #[serde(flatten)]
    identity: Identity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    exp: Option<i64>,
}

fn keyed_mac(secret: &str, payload: &[u8]) -> crate::Result<HmacSha256> {
    if secret.is_empty() {
        return Err(crate::Error::InvalidToken(
            "shared secret is empty".to_string(),
        ));
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| crate::Error::InvalidToken(format!("invalid shared secret: {e}")))?;
    mac.update(payload);
    Ok(mac)
}

/// Sign a token for `identity`. A `ttl` of `None` never expires.
pub fn issue(identity: &Identity, secret: &str, ttl: Option<Duration>) -> crate::Result<String> {
    if identity.username.is_empty() {
        return Err(crate::Error::InvalidToken(
            "username cannot be empty".to_string(),
        ));
    }

    let claims = Claims {
        identity: identity.clone(),
        exp: ttl.map(|ttl| (OffsetDateTime::now_utc() + ttl).unix_timestamp()),
    };
    let payload =
        serde_json::to_vec(&claims).map_err(|e| crate::Error::Serialization(e.to_string()))?;
    let payload_b64 = URL_SAFE_NO_PAD.encode(payload);

    let signature = keyed_mac(secret, payload_b64.as_bytes())?
        .finalize()
        .into_bytes();
    Ok(format!("{payload_b64}.{}", URL_SAFE_NO_PAD.encode(signature)))
}

/// Verify a token against the shared secret and return its identity.
pub fn verify(token: &str, secret: &str) -> crate::Result<Identity> {
    let (payload_b64, signature_b64) = token
        .split_once('.')
        .ok_or_else(|| crate::Error::InvalidToken("malformed token".to_string()))?;

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|e| crate::Error::InvalidToken(format!("bad signature encoding: {e}")))?;
    keyed_mac(secret, payload_b64.as_bytes())?
        .verify_slice(&signature)
        .map_err(|_| crate::Error::InvalidToken("signature mismatch".to_string()))?;

    let payload = URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|e| crate::Error::InvalidToken(format!("bad payload encoding: {e}")))?;
    let claims: Claims = serde_json::from_slice(&payload)
        .map_err(|e| crate::Error::InvalidToken(format!("bad claims: {e}")))?;

    if let Some(exp) = claims.exp
        && OffsetDateTime::now_utc().unix_timestamp() >= exp
    {
        return Err(crate::Error::TokenExpired);
    }

    if claims.identity.username.is_empty() {
        return Err(crate::Error::InvalidToken(
            "token has no username".to_string(),
        ));
    }

    Ok(claims.identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-shared-secret";

    #[test]
    fn test_issue_then_verify() {
        let mut identity = Identity::new("demo");
        identity.email = "demo@example.com".to_string();
        let token = issue(&identity, SECRET, Some(Duration::hours(1))).unwrap();
        assert_eq!(verify(&token, SECRET).unwrap(), identity);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue(&Identity::new("demo"), SECRET, None).unwrap();
        assert!(matches!(
            verify(&token, "another-secret"),
            Err(crate::Error::InvalidToken(_))
        ));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let token = issue(&Identity::new("demo"), SECRET, None).unwrap();
        let (_, signature) = token.split_once('.').unwrap();
        let forged = URL_SAFE_NO_PAD.encode(br#"{"username":"root"}"#);
        assert!(verify(&format!("{forged}.{signature}"), SECRET).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let token = issue(&Identity::new("demo"), SECRET, Some(Duration::seconds(-5))).unwrap();
        assert!(matches!(
            verify(&token, SECRET),
            Err(crate::Error::TokenExpired)
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(verify("", SECRET).is_err());
        assert!(verify("not-a-token", SECRET).is_err());
        assert!(verify("a.b", SECRET).is_err());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(issue(&Identity::new("demo"), "", None).is_err());
    }
}
