//! Passcode generation, hashing, and delivery-target masking.

use rand::{rngs::OsRng, Rng};
use sha2::{Digest, Sha256};

/// Passcodes are fixed-length numeric strings.
pub const PASSCODE_LENGTH: usize = 6;

/// Generate a passcode of [`PASSCODE_LENGTH`] digits.
///
/// Each digit is drawn independently from the OS CSPRNG, uniform over 0-9,
/// so leading zeros are as likely as any other digit.
#[must_use]
pub fn generate_passcode() -> String {
    (0..PASSCODE_LENGTH)
        .map(|_| char::from(b'0' + OsRng.gen_range(0..10u8)))
        .collect()
}

/// Hash a passcode with the owning user id as a per-user salt.
///
/// A plain Sha256 digest is weaker than a dedicated password hash; accepted
/// here because the secret is six digits, lives five minutes, and burns after
/// one use or five guesses.
#[must_use]
pub fn hash_passcode(passcode: &str, user_id: i64) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(passcode.as_bytes());
    hasher.update(user_id.to_string().as_bytes());
    hasher.finalize().to_vec()
}

/// Mask an email for display, e.g. `k***g@gmail.com`.
#[must_use]
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return email.to_string();
    };
    let chars: Vec<char> = local.chars().collect();
    let masked = match chars.as_slice() {
        [] => "***".to_string(),
        [first] | [first, _] => format!("{first}***"),
        [first, .., last] => format!("{first}***{last}"),
    };
    format!("{masked}@{domain}")
}

/// Mask a phone number for display, e.g. `+84***4567`.
#[must_use]
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() < 6 {
        return phone.to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}***{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passcode_is_six_digits() {
        for _ in 0..100 {
            let passcode = generate_passcode();
            assert_eq!(passcode.len(), PASSCODE_LENGTH);
            assert!(passcode.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn passcodes_vary() {
        // 1000 draws colliding into one value would mean a broken generator.
        let first = generate_passcode();
        let all_same = (0..1000).all(|_| generate_passcode() == first);
        assert!(!all_same);
    }

    #[test]
    fn hash_is_salted_by_user_id() {
        let a = hash_passcode("123456", 1);
        let b = hash_passcode("123456", 2);
        assert_ne!(a, b);
        assert_eq!(a, hash_passcode("123456", 1));
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn mask_email_formats() {
        assert_eq!(mask_email("khang@gmail.com"), "k***g@gmail.com");
        assert_eq!(mask_email("ab@x.io"), "a***@x.io");
        assert_eq!(mask_email("a@x.io"), "a***@x.io");
        assert_eq!(mask_email("not-an-email"), "not-an-email");
    }

    #[test]
    fn mask_phone_formats() {
        assert_eq!(mask_phone("+841234567"), "+84***4567");
        assert_eq!(mask_phone("12345"), "12345");
    }
}
