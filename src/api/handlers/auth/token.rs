//! Session token issuing and verification (HS256 JWT).
//!
//! Tokens are stateless and self-contained: subject id, role, issued-at, and
//! expiry, signed with a server-held secret. Verification is pure; there is
//! no revocation store. A deactivated account is still blocked immediately
//! because the authorization gate re-checks the active flag on every request,
//! while role and password changes only take effect once the token expires.

use base64ct::{Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::storage::Role;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct TokenHeader {
    alg: String,
    typ: String,
}

impl TokenHeader {
    fn hs256() -> Self {
        Self {
            alg: "HS256".to_string(),
            typ: "JWT".to_string(),
        }
    }
}

/// Decoded session token payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format")]
    TokenFormat,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlg(String),
    #[error("invalid signing key")]
    Key,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid token ttl")]
    InvalidTtl,
    #[error("token expired")]
    Expired,
}

fn b64e_json<T: Serialize>(value: &T) -> Result<String, TokenError> {
    let json = serde_json::to_vec(value)?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

fn b64d_json<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, TokenError> {
    let bytes = Base64UrlUnpadded::decode_vec(segment).map_err(|_| TokenError::Base64)?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Issues and verifies session tokens with a single shared secret.
pub struct TokenSigner {
    secret: SecretString,
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn mac(&self) -> Result<HmacSha256, TokenError> {
        HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| TokenError::Key)
    }

    /// Issue a signed token for the subject that expires after `ttl`.
    ///
    /// # Errors
    /// Returns an error when the ttl does not fit in whole seconds or the
    /// claims cannot be encoded.
    pub fn issue(&self, subject: Uuid, role: Role, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(subject, role, ttl, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        subject: Uuid,
        role: Role,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if ttl <= Duration::zero() {
            return Err(TokenError::InvalidTtl);
        }
        let claims = Claims {
            sub: subject,
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        let header_b64 = b64e_json(&TokenHeader::hs256())?;
        let claims_b64 = b64e_json(&claims)?;
        let signing_input = format!("{header_b64}.{claims_b64}");

        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        let signature_b64 = Base64UrlUnpadded::encode_string(&mac.finalize().into_bytes());

        Ok(format!("{signing_input}.{signature_b64}"))
    }

    /// Verify signature, structure, and expiry; return the decoded claims.
    ///
    /// # Errors
    /// Returns `Expired` past the expiry instant, and a structural or
    /// signature error for any other invalid token.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now())
    }

    pub(crate) fn verify_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let mut parts = token.split('.');
        let header_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let claims_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        let sig_b64 = parts.next().ok_or(TokenError::TokenFormat)?;
        if parts.next().is_some() {
            return Err(TokenError::TokenFormat);
        }

        let header: TokenHeader = b64d_json(header_b64)?;
        if header.alg != "HS256" {
            return Err(TokenError::UnsupportedAlg(header.alg));
        }

        let signing_input = format!("{header_b64}.{claims_b64}");
        let signature = Base64UrlUnpadded::decode_vec(sig_b64).map_err(|_| TokenError::Base64)?;
        let mut mac = self.mac()?;
        mac.update(signing_input.as_bytes());
        // Mac::verify_slice compares in constant time.
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let claims: Claims = b64d_json(claims_b64)?;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(SecretString::from("test-secret-key"))
    }

    #[test]
    fn issue_then_verify_returns_same_claims() {
        let signer = signer();
        let subject = Uuid::new_v4();
        let token = signer
            .issue(subject, Role::Admin, Duration::hours(1))
            .expect("issue should succeed");

        let claims = signer.verify(&token).expect("verify should succeed");
        assert_eq!(claims.sub, subject);
        assert_eq!(claims.role, Role::Admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let signer = signer();
        let now = Utc::now();
        let token = signer
            .issue_at(Uuid::new_v4(), Role::User, Duration::seconds(60), now)
            .expect("issue should succeed");

        let later = now + Duration::seconds(61);
        assert!(matches!(
            signer.verify_at(&token, later),
            Err(TokenError::Expired)
        ));
        // Still valid one second before expiry.
        let just_before = now + Duration::seconds(59);
        assert!(signer.verify_at(&token, just_before).is_ok());
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let signer = signer();
        let token = signer
            .issue(Uuid::new_v4(), Role::User, Duration::hours(1))
            .expect("issue should succeed");

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_claims = Claims {
            sub: Uuid::new_v4(),
            role: Role::Admin,
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let forged = b64e_json(&forged_claims).expect("encode forged claims");
        parts[1] = &forged;
        let forged_token = parts.join(".");

        assert!(matches!(
            signer.verify(&forged_token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let token = signer()
            .issue(Uuid::new_v4(), Role::User, Duration::hours(1))
            .expect("issue should succeed");
        let other = TokenSigner::new(SecretString::from("another-secret"));
        assert!(matches!(
            other.verify(&token),
            Err(TokenError::InvalidSignature)
        ));
    }

    #[test]
    fn verify_rejects_malformed_tokens() {
        let signer = signer();
        assert!(matches!(
            signer.verify("only-one-part"),
            Err(TokenError::TokenFormat)
        ));
        assert!(matches!(
            signer.verify("a.b.c.d"),
            Err(TokenError::TokenFormat)
        ));
        assert!(signer.verify("!!.!!.!!").is_err());
    }

    #[test]
    fn issue_rejects_non_positive_ttl() {
        let signer = signer();
        assert!(matches!(
            signer.issue(Uuid::new_v4(), Role::User, Duration::zero()),
            Err(TokenError::InvalidTtl)
        ));
    }
}
