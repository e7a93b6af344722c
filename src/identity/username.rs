//! Username generation for accounts created from a provider profile.

use rand::{rngs::OsRng, Rng};

/// Longest slug we derive from a display name. Suffixed candidates may be
/// longer; the column allows for that.
const MAX_SLUG_LEN: usize = 15;

const SUFFIX_DIGITS: usize = 4;

/// Reduce a display name to a username base: lowercase ASCII alphanumerics
/// only, truncated, with a fixed fallback when nothing survives.
#[must_use]
pub fn slugify(display_name: &str) -> String {
    let slug: String = display_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .take(MAX_SLUG_LEN)
        .collect();
    if slug.is_empty() {
        "user".to_string()
    } else {
        slug
    }
}

/// Produce a collision-avoiding candidate: the bare slug on the first try,
/// then slug plus a fresh 4-digit random suffix on every retry.
#[must_use]
pub fn candidate(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        return base.to_string();
    }
    let suffix: String = (0..SUFFIX_DIGITS)
        .map(|_| char::from(b'0' + OsRng.gen_range(0..10u8)))
        .collect();
    format!("{base}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_strips_and_lowercases() {
        assert_eq!(slugify("Trần Văn Khang"), "trnvnkhang");
        assert_eq!(slugify("Jane O'Neill-42"), "janeoneill42");
    }

    #[test]
    fn slugify_truncates() {
        assert_eq!(slugify("abcdefghijklmnopqrstuvwxyz").len(), MAX_SLUG_LEN);
    }

    #[test]
    fn slugify_falls_back_when_empty() {
        assert_eq!(slugify(""), "user");
        assert_eq!(slugify("電話番号"), "user");
        assert_eq!(slugify("   "), "user");
    }

    #[test]
    fn first_candidate_is_bare_slug() {
        assert_eq!(candidate("khang", 0), "khang");
    }

    #[test]
    fn retries_append_four_digits() {
        let c = candidate("khang", 1);
        assert_eq!(c.len(), "khang".len() + SUFFIX_DIGITS);
        assert!(c.starts_with("khang"));
        assert!(c["khang".len()..].chars().all(|c| c.is_ascii_digit()));
    }
}
