use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

use crate::error::RaffleError;
use crate::state::SignupRecord;

/// One (email, intent time) pair feeding the seed digest.
///
/// The intent time is non-optional by construction; signups without a
/// declared intent must be filtered out before building entries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeedEntry {
    pub email: String,
    pub intent_time: DateTime<Utc>,
}

impl TryFrom<&SignupRecord> for SeedEntry {
    type Error = RaffleError;

    fn try_from(signup: &SignupRecord) -> Result<Self, Self::Error> {
        let intent_time = signup
            .registration_intent
            .ok_or_else(|| RaffleError::MissingIntent(signup.id.clone()))?;
        Ok(SeedEntry {
            email: signup.email.clone(),
            intent_time,
        })
    }
}

/// Derive the raffle seed from the eligible entries.
///
/// Entries are sorted ascending by intent time, ties broken by email, so
/// the digest is independent of input ordering. Each sorted entry
/// contributes `email + intent epoch millis` with no separator; the result
/// is the lowercase hex SHA-256 of the UTF-8 concatenation.
pub fn derive_seed(entries: &[SeedEntry]) -> String {
    let mut sorted: Vec<&SeedEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| {
        a.intent_time
            .cmp(&b.intent_time)
            .then_with(|| a.email.cmp(&b.email))
    });

    let mut hasher = Sha256::new();
    for entry in sorted {
        hasher.update(entry.email.as_bytes());
        hasher.update(entry.intent_time.timestamp_millis().to_string().as_bytes());
    }

    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(email: &str, millis: i64) -> SeedEntry {
        SeedEntry {
            email: email.to_string(),
            intent_time: Utc.timestamp_millis_opt(millis).unwrap(),
        }
    }

    #[test]
    fn digest_is_64_lowercase_hex_chars() {
        let seed = derive_seed(&[entry("a@example.com", 1_700_000_000_000)]);
        assert_eq!(seed.len(), 64);
        assert!(seed.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn reordering_entries_does_not_change_digest() {
        let a = entry("a@example.com", 1_700_000_000_000);
        let b = entry("b@example.com", 1_700_000_001_000);
        let c = entry("c@example.com", 1_700_000_002_000);
        let forward = derive_seed(&[a.clone(), b.clone(), c.clone()]);
        let reversed = derive_seed(&[c, b, a]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn changing_one_email_changes_digest() {
        let base = derive_seed(&[entry("a@example.com", 1_700_000_000_000)]);
        let other = derive_seed(&[entry("b@example.com", 1_700_000_000_000)]);
        assert_ne!(base, other);
    }

    #[test]
    fn changing_one_timestamp_changes_digest() {
        let base = derive_seed(&[entry("a@example.com", 1_700_000_000_000)]);
        let other = derive_seed(&[entry("a@example.com", 1_700_000_000_001)]);
        assert_ne!(base, other);
    }

    #[test]
    fn equal_timestamps_tie_break_by_email() {
        let a = entry("a@example.com", 1_700_000_000_000);
        let b = entry("b@example.com", 1_700_000_000_000);
        let forward = derive_seed(&[a.clone(), b.clone()]);
        let reversed = derive_seed(&[b, a]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn empty_entry_set_hashes_empty_string() {
        // SHA-256("")
        assert_eq!(
            derive_seed(&[]),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn entry_from_signup_requires_intent() {
        let signup = SignupRecord {
            id: "s1".into(),
            quota_id: "q1".into(),
            email: "a@example.com".into(),
            display_name: "A".into(),
            status: crate::state::SignupStatus::Pending,
            registration_intent: None,
            confirmed_at: None,
            edit_url: "https://example.com/s1".into(),
        };
        assert!(matches!(
            SeedEntry::try_from(&signup),
            Err(RaffleError::MissingIntent(_))
        ));
    }
}
