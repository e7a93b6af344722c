//! Password hashing and verification.
//!
//! Argon2id with a random per-hash salt. Two hashes of the same password are
//! never byte-identical; the only supported comparison is [`verify`]. A
//! corrupt or unparsable stored hash verifies as `false` rather than
//! surfacing a distinguishable error to the caller.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, SaltString},
    Argon2, PasswordVerifier,
};

/// Hash a password into a PHC-format string.
///
/// # Errors
///
/// Returns an error if the hashing backend fails (effectively never for
/// valid parameters).
pub fn hash(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hashed = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("failed to hash password: {err}"))?;
    Ok(hashed.to_string())
}

/// Verify a password against a stored PHC-format hash.
///
/// Any internal failure (corrupt blob, unknown parameters) is treated as a
/// mismatch, never an error.
#[must_use]
pub fn verify(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[test]
    fn hash_and_verify_round_trip() -> Result<()> {
        let blob = hash("secret1")?;
        assert!(verify("secret1", &blob));
        assert!(!verify("secret2", &blob));
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let first = hash("secret1")?;
        let second = hash("secret1")?;
        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn corrupt_blob_verifies_false() {
        assert!(!verify("secret1", "not-a-phc-string"));
        assert!(!verify("secret1", ""));
    }

    #[test]
    fn hash_is_phc_format() -> Result<()> {
        let blob = hash("secret1")?;
        assert!(blob.starts_with("$argon2id$"));
        Ok(())
    }
}
