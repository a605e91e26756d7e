//! Storage key derivation.
//!
//! A stored file is renamed to `<timeToken>-<contentToken>.<ext>`: the upload
//! time in base-36 (so keys sort by time) followed by the first 16 hex
//! characters of a SHA-256 over the original name, the time and a random
//! token. The directory part of the original key is kept as-is.
//!
//! The token is a uniqueness aid, not a security boundary.

use std::sync::Arc;

use chrono::Utc;
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::{Digest, Sha256};

/// Hex characters of the digest kept in the key.
pub const CONTENT_TOKEN_LEN: usize = 16;

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("clock unavailable: {0}")]
    Clock(String),

    #[error("entropy source unavailable: {0}")]
    Entropy(String),
}

/// Millisecond timestamps for `timeToken`.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> Result<u64, KeyError>;
}

/// Random token mixed into the digest seed.
pub trait EntropySource: Send + Sync {
    fn token(&self) -> Result<String, KeyError>;
}

/// Wall clock. Not monotonic: keys follow clock adjustments.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Result<u64, KeyError> {
        let millis = Utc::now().timestamp_millis();
        u64::try_from(millis).map_err(|_| {
            KeyError::Clock(format!(
                "system time is {} ms, before the Unix epoch",
                millis
            ))
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_millis(&self) -> Result<u64, KeyError> {
        Ok(self.0)
    }
}

/// Eight bytes from the operating system RNG, rendered in base-36.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn token(&self) -> Result<String, KeyError> {
        let mut buf = [0u8; 8];
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| KeyError::Entropy(e.to_string()))?;
        Ok(to_base36(u64::from_be_bytes(buf)))
    }
}

#[derive(Debug, Clone)]
pub struct FixedEntropy(pub String);

impl EntropySource for FixedEntropy {
    fn token(&self) -> Result<String, KeyError> {
        Ok(self.0.clone())
    }
}

/// Lowercase base-36 rendering of `value`.
pub fn to_base36(mut value: u64) -> String {
    let mut digits = Vec::with_capacity(13);
    loop {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
        if value == 0 {
            break;
        }
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

/// Text after the last `.`, lowercased; empty when the name has no `.`.
pub fn file_extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// First [`CONTENT_TOKEN_LEN`] lowercase hex characters of SHA-256(`seed`).
pub fn content_token(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let mut token = hex::encode(digest);
    token.truncate(CONTENT_TOKEN_LEN);
    token
}

/// Replacement file name for `file_name`.
///
/// The same timestamp feeds the digest seed and the time token. The `.` is
/// emitted even when there is no extension, so extensionless names end in `.`.
pub fn derive_key(
    file_name: &str,
    clock: &dyn Clock,
    entropy: &dyn EntropySource,
) -> Result<String, KeyError> {
    let timestamp = clock.now_millis()?;
    let random = entropy.token()?;

    let seed = format!("{}-{}-{}", file_name, timestamp, random);
    let token = content_token(&seed);
    let ext = file_extension(file_name);

    Ok(format!("{}-{}.{}", to_base36(timestamp), token, ext))
}

/// Keep every `/`-separated segment of `original_key` but the last, and
/// replace the last with [`derive_key`] of it.
pub fn derive_storage_key(
    original_key: &str,
    clock: &dyn Clock,
    entropy: &dyn EntropySource,
) -> Result<String, KeyError> {
    let (prefix, file_name) = match original_key.rsplit_once('/') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, original_key),
    };

    let derived = derive_key(file_name, clock, entropy)?;
    Ok(match prefix {
        Some(prefix) => format!("{}/{}", prefix, derived),
        None => derived,
    })
}

/// A clock and entropy source bundled for the pipeline.
#[derive(Clone)]
pub struct KeyDeriver {
    clock: Arc<dyn Clock>,
    entropy: Arc<dyn EntropySource>,
}

impl KeyDeriver {
    pub fn new(clock: Arc<dyn Clock>, entropy: Arc<dyn EntropySource>) -> Self {
        Self { clock, entropy }
    }

    /// Wall clock and OS randomness.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(OsEntropy))
    }

    /// Fixed sources; every call yields the same key for the same input.
    pub fn fixed(timestamp_ms: u64, token: impl Into<String>) -> Self {
        Self::new(
            Arc::new(FixedClock(timestamp_ms)),
            Arc::new(FixedEntropy(token.into())),
        )
    }

    pub fn derive_file_name(&self, file_name: &str) -> Result<String, KeyError> {
        derive_key(file_name, self.clock.as_ref(), self.entropy.as_ref())
    }

    pub fn derive_storage_key(&self, original_key: &str) -> Result<String, KeyError> {
        derive_storage_key(original_key, self.clock.as_ref(), self.entropy.as_ref())
    }
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::system()
    }
}

impl std::fmt::Debug for KeyDeriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyDeriver").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: u64 = 1_700_000_000_000;

    struct BrokenEntropy;

    impl EntropySource for BrokenEntropy {
        fn token(&self) -> Result<String, KeyError> {
            Err(KeyError::Entropy("no entropy".to_string()))
        }
    }

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(TS), "loyw3v28");
        assert_eq!(to_base36(u64::MAX), "3w5e11264sgsf");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("photo.JPG"), "jpg");
        assert_eq!(file_extension("archive.tar.GZ"), "gz");
        assert_eq!(file_extension(".bashrc"), "bashrc");
        assert_eq!(file_extension("trailing."), "");
        assert_eq!(file_extension("README"), "");
        assert_eq!(file_extension(""), "");
    }

    #[test]
    fn test_derive_key_known_value() {
        let key = derive_key(
            "photo.JPG",
            &FixedClock(TS),
            &FixedEntropy("k3x9q2".to_string()),
        )
        .unwrap();
        // sha256("photo.JPG-1700000000000-k3x9q2") = aa316d98308f7614...
        assert_eq!(key, "loyw3v28-aa316d98308f7614.jpg");
    }

    #[test]
    fn test_derive_key_without_extension_keeps_dot() {
        let key = derive_key("README", &FixedClock(TS), &FixedEntropy("k3x9q2".to_string()))
            .unwrap();
        assert_eq!(key, "loyw3v28-dc1a93f00e607be2.");
    }

    #[test]
    fn test_derive_key_is_deterministic() {
        let deriver = KeyDeriver::fixed(TS, "abc");
        assert_eq!(
            deriver.derive_file_name("a.png").unwrap(),
            deriver.derive_file_name("a.png").unwrap()
        );
    }

    #[test]
    fn test_different_timestamps_give_different_time_tokens() {
        let entropy = FixedEntropy("same".to_string());
        let first = derive_key("a.png", &FixedClock(TS), &entropy).unwrap();
        let second = derive_key("a.png", &FixedClock(TS + 1), &entropy).unwrap();
        let time_token = |key: &str| key.split('-').next().unwrap().to_string();
        assert_ne!(time_token(&first), time_token(&second));
        assert!(time_token(&first) < time_token(&second));
    }

    #[test]
    fn test_random_token_changes_content_token() {
        let a = derive_key("a.png", &FixedClock(TS), &FixedEntropy("x".to_string())).unwrap();
        let b = derive_key("a.png", &FixedClock(TS), &FixedEntropy("y".to_string())).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.split('-').next(), b.split('-').next());
    }

    #[test]
    fn test_derive_storage_key_keeps_prefix() {
        let deriver = KeyDeriver::fixed(TS, "k3x9q2");
        assert_eq!(
            deriver.derive_storage_key("media/u123/photo.JPG").unwrap(),
            "media/u123/loyw3v28-aa316d98308f7614.jpg"
        );

        let key = deriver.derive_storage_key("a//b/photo.JPG").unwrap();
        assert!(key.starts_with("a//b/"));
        assert_eq!(key.split('/').count(), 4);

        assert_eq!(
            deriver.derive_storage_key("photo.JPG").unwrap(),
            "loyw3v28-aa316d98308f7614.jpg"
        );
    }

    #[test]
    fn test_derive_storage_key_with_trailing_slash() {
        let deriver = KeyDeriver::fixed(TS, "k3x9q2");
        let key = deriver.derive_storage_key("media/u123/").unwrap();
        // sha256("-1700000000000-k3x9q2") = 9cf7b99200f98616...
        assert_eq!(key, "media/u123/loyw3v28-9cf7b99200f98616.");
    }

    #[test]
    fn test_os_sources_produce_well_formed_keys() {
        let key = KeyDeriver::system().derive_file_name("IMG_0001.HEIC").unwrap();
        let (time, rest) = key.split_once('-').unwrap();
        let (token, ext) = rest.split_once('.').unwrap();
        assert!(time.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_eq!(token.len(), CONTENT_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(ext, "heic");
    }

    #[test]
    fn test_entropy_failure_propagates() {
        let result = derive_key("a.png", &FixedClock(TS), &BrokenEntropy);
        assert_eq!(result, Err(KeyError::Entropy("no entropy".to_string())));
    }

    #[test]
    fn test_os_entropy_tokens_differ() {
        let a = OsEntropy.token().unwrap();
        let b = OsEntropy.token().unwrap();
        assert_ne!(a, b);
    }
}
