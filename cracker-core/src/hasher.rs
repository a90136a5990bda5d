//! Keyed-hash derivation for candidate verification
//!
//! Implements the published provably-fair convention: the server seed keys an
//! HMAC-SHA512 over `"{client_seed}:{nonce}"`, and the dice roll is read out
//! of the digest in 5-hex-digit windows. The formula must stay byte-for-byte
//! identical to the public verification algorithm.

use crate::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Length of a hex-rendered HMAC-SHA512 digest
pub const TARGET_HASH_LEN: usize = 128;

/// Derive the lowercase-hex digest for one candidate seed
///
/// The candidate keys the MAC; the client seed and nonce form the message.
/// Pure and stateless, safe to call concurrently without coordination.
pub fn derive_hash(candidate: &str, client_seed: &str, nonce: u64) -> Result<String> {
    let mut mac = HmacSha512::new_from_slice(candidate.as_bytes())
        .map_err(|e| Error::Internal(format!("Invalid HMAC key: {}", e)))?;
    mac.update(format!("{}:{}", client_seed, nonce).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check one candidate against the target hash
///
/// Ordinary equality is fine here: the target hash is public, so this is not
/// a secret-comparison context.
pub fn matches(candidate: &str, client_seed: &str, nonce: u64, target_hash: &str) -> Result<bool> {
    let derived = derive_hash(candidate, client_seed, nonce)?;
    Ok(derived == target_hash.to_ascii_lowercase())
}

/// Extract the dice roll a server seed would have produced
///
/// Walks the digest in consecutive 5-hex-digit windows while the window value
/// is >= 10000, then maps the final window onto 0.00..=99.99.
pub fn dice_roll(server_seed: &str, client_seed: &str, nonce: u64) -> Result<f64> {
    let digest = derive_hash(server_seed, client_seed, nonce)?;
    let mut pos = 0;
    let mut roll: u64 = 10_001;
    while roll >= 10_000 && pos + 5 <= digest.len() {
        roll = u64::from_str_radix(&digest[pos..pos + 5], 16)
            .map_err(|e| Error::Internal(format!("Non-hex digest window: {}", e)))?;
        pos += 5;
    }
    Ok((roll % 10_000) as f64 / 100.0)
}

/// Validate a submitted target hash before any job is created
pub fn validate_target_hash(target: &str) -> Result<()> {
    if target.len() != TARGET_HASH_LEN {
        return Err(Error::Config(format!(
            "Target hash must be {} hex characters, got {}",
            TARGET_HASH_LEN,
            target.len()
        )));
    }
    if !target.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::Config(
            "Target hash must be hexadecimal".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_derive_is_deterministic() {
        let a = derive_hash("beta", "c1", 0).unwrap();
        let b = derive_hash("beta", "c1", 0).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), TARGET_HASH_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_inputs_change_digest() {
        let base = derive_hash("beta", "c1", 0).unwrap();
        assert_ne!(base, derive_hash("alpha", "c1", 0).unwrap());
        assert_ne!(base, derive_hash("beta", "c2", 0).unwrap());
        assert_ne!(base, derive_hash("beta", "c1", 1).unwrap());
    }

    #[test]
    fn test_matches_round_trip() {
        let target = derive_hash("beta", "c1", 7).unwrap();
        assert!(matches("beta", "c1", 7, &target).unwrap());
        assert!(!matches("gamma", "c1", 7, &target).unwrap());
        // Target comparison is case-insensitive
        assert!(matches("beta", "c1", 7, &target.to_uppercase()).unwrap());
    }

    #[test]
    fn test_dice_roll_range() {
        for nonce in 0..50 {
            let roll = dice_roll("server-seed", "client", nonce).unwrap();
            assert!((0.0..100.0).contains(&roll), "roll {} out of range", roll);
        }
    }

    #[test]
    fn test_dice_roll_deterministic() {
        let a = dice_roll("s", "c", 3).unwrap();
        let b = dice_roll("s", "c", 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_target_hash_validation() {
        let valid = derive_hash("x", "y", 0).unwrap();
        assert!(validate_target_hash(&valid).is_ok());
        assert!(validate_target_hash("abc123").is_err());
        assert!(validate_target_hash(&"g".repeat(TARGET_HASH_LEN)).is_err());
        assert!(validate_target_hash("").is_err());
    }

    proptest! {
        #[test]
        fn prop_derive_hash_idempotent(
            candidate in ".{0,64}",
            client_seed in ".{0,32}",
            nonce in any::<u64>(),
        ) {
            let a = derive_hash(&candidate, &client_seed, nonce).unwrap();
            let b = derive_hash(&candidate, &client_seed, nonce).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.len(), TARGET_HASH_LEN);
            prop_assert!(matches(&candidate, &client_seed, nonce, &a).unwrap());
        }
    }
}
