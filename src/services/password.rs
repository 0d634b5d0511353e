// src/services/password.rs

use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac, digest::InvalidLength};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const PREFIX: &str = "v1$";

/// Deterministic keyed encoding of `(username, password)`.
///
/// Sign-in filters the registry on the encoded value, so the same pair must always encode
/// to the same string. The username acts as the salt.
#[derive(Clone)]
pub struct PasswordEncoder {
    keyed: HmacSha256,
}

impl PasswordEncoder {
    pub fn new(secret: &str) -> Result<Self, InvalidLength> {
        Ok(Self {
            keyed: <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())?,
        })
    }

    fn mac(&self, password: &str, username: &str) -> HmacSha256 {
        let mut mac = self.keyed.clone();
        mac.update(username.as_bytes());
        mac.update(&[0]);
        mac.update(password.as_bytes());
        mac
    }

    pub fn encode(&self, password: &str, username: &str) -> String {
        let digest = self.mac(password, username).finalize().into_bytes();
        format!("{PREFIX}{}", STANDARD.encode(digest))
    }

    /// Constant-time comparison against a stored encoding.
    pub fn verify(&self, password: &str, encoded: &str, username: &str) -> bool {
        let Some(raw) = encoded.strip_prefix(PREFIX) else {
            return false;
        };
        let Ok(expected) = STANDARD.decode(raw) else {
            return false;
        };
        self.mac(password, username).verify_slice(&expected).is_ok()
    }
}

/// Basic-auth credential for the e-invoice provider.
pub fn invoice_token(username: &str, password: &str) -> String {
    STANDARD.encode(format!("{username}:{password}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder() -> PasswordEncoder {
        PasswordEncoder::new("test-secret").unwrap()
    }

    #[test]
    fn encoding_is_deterministic() {
        let enc = encoder();
        assert_eq!(
            enc.encode("cubable2025", "0316316874"),
            enc.encode("cubable2025", "0316316874")
        );
        assert!(enc.encode("cubable2025", "0316316874").starts_with("v1$"));
    }

    #[test]
    fn verify_accepts_only_the_original_password() {
        let enc = encoder();
        let stored = enc.encode("cubable2025", "0316316874");
        assert!(enc.verify("cubable2025", &stored, "0316316874"));
        assert!(!enc.verify("cubable2026", &stored, "0316316874"));
        assert!(!enc.verify("cubable2025", &stored, "0316316875"));
    }

    #[test]
    fn username_salts_the_encoding() {
        let enc = encoder();
        assert_ne!(enc.encode("same", "alice"), enc.encode("same", "bob"));
        // the separator keeps ("ab","c") and ("a","bc") apart
        assert_ne!(enc.encode("c", "ab"), enc.encode("bc", "a"));
    }

    #[test]
    fn secret_changes_the_encoding() {
        let other = PasswordEncoder::new("other-secret").unwrap();
        assert_ne!(encoder().encode("p", "u"), other.encode("p", "u"));
    }

    #[test]
    fn malformed_stored_values_never_verify() {
        let enc = encoder();
        assert!(!enc.verify("p", "plain-text", "u"));
        assert!(!enc.verify("p", "v1$not base64!", "u"));
    }

    #[test]
    fn invoice_token_is_basic_auth_pair() {
        assert_eq!(invoice_token("user", "pass"), "dXNlcjpwYXNz");
    }
}
