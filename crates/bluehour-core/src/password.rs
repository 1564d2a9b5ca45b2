//! Password hashing (PBKDF2-HMAC-SHA256)
//!
//! Encoded form: `pbkdf2-sha256$<iterations>$<salt hex>$<hash hex>`. The
//! iteration count travels with the hash, so raising the configured count
//! only affects new passwords.

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use tracing::warn;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Hashes and verifies account passwords
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    iterations: u32,
}

impl PasswordHasher {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> String {
        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);

        let mut out = [0u8; HASH_LEN];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, self.iterations, &mut out);

        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            hex::encode(salt),
            hex::encode(out)
        )
    }

    /// Check a password against an encoded hash. Malformed hashes never match.
    pub fn verify(&self, password: &str, encoded: &str) -> bool {
        let Some((iterations, salt, expected)) = decode(encoded) else {
            warn!("Stored password hash is malformed");
            return false;
        };

        let mut out = vec![0u8; expected.len()];
        pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut out);

        constant_time_eq(&out, &expected)
    }
}

fn decode(encoded: &str) -> Option<(u32, Vec<u8>, Vec<u8>)> {
    let mut parts = encoded.split('$');
    if parts.next()? != SCHEME {
        return None;
    }
    let iterations: u32 = parts.next()?.parse().ok().filter(|n| *n > 0)?;
    let salt = hex::decode(parts.next()?).ok()?;
    let hash = hex::decode(parts.next()?).ok().filter(|h| !h.is_empty())?;
    if parts.next().is_some() {
        return None;
    }
    Some((iterations, salt, hash))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let hasher = PasswordHasher::new(1_000);
        let encoded = hasher.hash("correct horse");

        assert!(encoded.starts_with("pbkdf2-sha256$1000$"));
        assert!(hasher.verify("correct horse", &encoded));
        assert!(!hasher.verify("wrong horse", &encoded));
    }

    #[test]
    fn salts_differ() {
        let hasher = PasswordHasher::new(1_000);
        assert_ne!(hasher.hash("same"), hasher.hash("same"));
    }

    #[test]
    fn verify_uses_stored_iterations() {
        let old = PasswordHasher::new(1_000).hash("secret123");
        assert!(PasswordHasher::new(5_000).verify("secret123", &old));
    }

    #[test]
    fn malformed_hashes_never_match() {
        let hasher = PasswordHasher::new(1_000);
        for bad in [
            "",
            "plain",
            "bcrypt$10$00$00",
            "pbkdf2-sha256$0$00$00",
            "pbkdf2-sha256$1000$zz$00",
            "pbkdf2-sha256$1000$00$",
            "pbkdf2-sha256$1000$00$00$extra",
        ] {
            assert!(!hasher.verify("anything", bad), "{bad}");
        }
    }
}
