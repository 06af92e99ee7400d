//! Stateless authentication: password hashing, JWT issuance/verification,
//! and the fingerprint cookie that binds a token to the browser that
//! received it (see `middleware::fingerprint_auth`).

use bcrypt::{DEFAULT_COST, hash, verify};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Number of random bytes used to build the raw fingerprint. Hex-encoded,
/// this becomes the `__Secure-Fgp` cookie value.
const FINGERPRINT_BYTES: usize = 50;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iss: String,
    pub fgp_hash: String,
}

pub struct Auth {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    expiration_ms: i64,
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("issuer", &self.issuer)
            .field("expiration_ms", &self.expiration_ms)
            .finish()
    }
}

/// The two pieces produced by a successful login: the bearer token and the
/// raw fingerprint that must be set as the `__Secure-Fgp` cookie value.
pub struct LoginCredential {
    pub token: String,
    pub raw_fingerprint: String,
}

impl Auth {
    pub fn new(jwt_secret: &[u8], issuer: impl Into<String>, expiration_ms: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret),
            decoding_key: DecodingKey::from_secret(jwt_secret),
            issuer: issuer.into(),
            expiration_ms,
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        Ok(hash(password, DEFAULT_COST)?)
    }

    pub fn verify_password(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        Ok(verify(password, password_hash)?)
    }

    /// Generates a fresh fingerprint, mints a token whose `fgp_hash` claim is
    /// SHA-256(fingerprint), and returns both. The caller is responsible for
    /// putting the raw fingerprint in the hardened cookie and the token in
    /// the `Authorization` header.
    pub fn issue_login_credential(&self, subject: &str) -> Result<LoginCredential, AppError> {
        let mut raw = [0u8; FINGERPRINT_BYTES];
        rand::thread_rng().fill_bytes(&mut raw);
        let raw_fingerprint = hex::encode(raw);
        let fgp_hash = sha256_hex(raw_fingerprint.as_bytes());

        let token = self.create_token(subject, &fgp_hash)?;
        Ok(LoginCredential {
            token,
            raw_fingerprint,
        })
    }

    fn create_token(&self, subject: &str, fgp_hash: &str) -> Result<String, AppError> {
        let exp = chrono::Utc::now().timestamp_millis() + self.expiration_ms;
        let claims = Claims {
            sub: subject.to_string(),
            exp: exp / 1000,
            iss: self.issuer.clone(),
            fgp_hash: fgp_hash.to_string(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding_key)?)
    }

    /// Decodes and validates signature, issuer, and expiration. Does not
    /// check the fingerprint — that's the middleware's job, since it also
    /// needs the raw cookie value.
    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[self.issuer.as_str()]);
        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }

    /// Byte-level constant-time comparison of SHA-256(raw cookie value)
    /// against the token's `fgp_hash` claim.
    pub fn fingerprint_matches(raw_fingerprint: &str, fgp_hash_claim: &str) -> bool {
        let computed = sha256_hex(raw_fingerprint.as_bytes());
        if computed.len() != fgp_hash_claim.len() {
            return false;
        }
        computed.as_bytes().ct_eq(fgp_hash_claim.as_bytes()).into()
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> Auth {
        Auth::new(b"01234567890123456789012345678901", "clipcraft-test", 60_000)
    }

    #[test]
    fn round_trips_token_and_fingerprint() {
        let auth = auth();
        let cred = auth.issue_login_credential("alice").unwrap();
        let claims = auth.decode_token(&cred.token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(Auth::fingerprint_matches(
            &cred.raw_fingerprint,
            &claims.fgp_hash
        ));
    }

    #[test]
    fn rejects_mismatched_fingerprint() {
        let auth = auth();
        let cred = auth.issue_login_credential("alice").unwrap();
        let claims = auth.decode_token(&cred.token).unwrap();
        assert!(!Auth::fingerprint_matches("not-the-right-value", &claims.fgp_hash));
    }

    #[test]
    fn rejects_expired_token() {
        let auth = Auth::new(b"01234567890123456789012345678901", "clipcraft-test", -1000);
        let cred = auth.issue_login_credential("alice").unwrap();
        assert!(auth.decode_token(&cred.token).is_err());
    }

    #[test]
    fn password_hash_round_trips() {
        let auth = auth();
        let hashed = auth.hash_password("correct horse battery staple").unwrap();
        assert!(auth.verify_password("correct horse battery staple", &hashed).unwrap());
        assert!(!auth.verify_password("wrong", &hashed).unwrap());
    }
}
