//! Payload compression and encryption.
//!
//! A stored payload is framed as:
//!
//! ```text
//! [ "hubenc1\n" | nonce (12) | AES-256-GCM( gzip(data)? ) | tag (16) ]   encrypted
//! [ 1f 8b ... ]                                                      gzip only
//! [ ... ]                                                            raw
//! ```
//!
//! Readers look for the encryption marker first, then for the gzip magic, so
//! any mix of past write policies decodes transparently.

use std::fmt;
use std::io::{Read, Write};

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};

use crate::constants::{ENCRYPTION_MARKER, GZIP_MAGIC, NONCE_LEN, TAG_LEN};
use crate::core::HubError;

/// A 256-bit payload encryption key.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey([u8; 32]);

impl EncryptionKey {
    /// Key from a secret string: 64 hex characters are used as raw key bytes,
    /// anything else is treated as a passphrase and hashed with SHA-256.
    #[must_use]
    pub fn from_secret(secret: &str) -> Self {
        let secret = secret.trim();
        if secret.len() == 64 {
            if let Ok(bytes) = hex::decode(secret) {
                let mut key = [0u8; 32];
                key.copy_from_slice(&bytes);
                return Self(key);
            }
        }
        Self(Sha256::digest(secret.as_bytes()).into())
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Encoder/decoder for stored payloads.
#[derive(Debug, Clone)]
pub struct Codec {
    gzip: bool,
    key: Option<EncryptionKey>,
}

impl Codec {
    #[must_use]
    pub const fn new(gzip: bool, key: Option<EncryptionKey>) -> Self {
        Self { gzip, key }
    }

    /// Codec that stores payloads untouched.
    #[must_use]
    pub const fn plain() -> Self {
        Self::new(false, None)
    }

    #[must_use]
    pub const fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Encode `data` for storage, gzipping first when enabled and then encrypting
    /// when `encrypt` is set.
    ///
    /// # Errors
    ///
    /// [`HubError::Codec`] when encryption is requested without a key, or when
    /// compression or encryption fails.
    pub fn encode(&self, data: &[u8], encrypt: bool) -> Result<Vec<u8>, HubError> {
        let mut payload = if self.gzip { gzip(data)? } else { data.to_vec() };

        if encrypt {
            let key = self.key.as_ref().ok_or_else(|| HubError::Codec {
                message: "encryption is required for remote replicas but no key is configured"
                    .to_string(),
            })?;
            payload = encrypt_payload(key, &payload)?;
        }
        Ok(payload)
    }

    /// Decode a stored payload, whatever combination of encryption and
    /// compression it was written with.
    ///
    /// # Errors
    ///
    /// [`HubError::Codec`] for an encrypted payload without a key, a failed
    /// authentication, or corrupt gzip data.
    pub fn decode(&self, data: &[u8]) -> Result<Vec<u8>, HubError> {
        let decrypted;
        let mut payload = data;

        if payload.starts_with(ENCRYPTION_MARKER) {
            let key = self.key.as_ref().ok_or_else(|| HubError::Codec {
                message: "payload is encrypted but no key is configured".to_string(),
            })?;
            decrypted = decrypt_payload(key, &payload[ENCRYPTION_MARKER.len()..])?;
            payload = &decrypted;
        }

        if payload.starts_with(&GZIP_MAGIC) {
            return gunzip(payload);
        }
        Ok(payload.to_vec())
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::plain()
    }
}

fn codec_error(action: &str, e: impl fmt::Display) -> HubError {
    HubError::Codec {
        message: format!("{action}: {e}"),
    }
}

fn gzip(data: &[u8]) -> Result<Vec<u8>, HubError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(|e| codec_error("gzip failed", e))?;
    encoder.finish().map_err(|e| codec_error("gzip failed", e))
}

fn gunzip(data: &[u8]) -> Result<Vec<u8>, HubError> {
    let mut out = Vec::new();
    GzDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| codec_error("gunzip failed", e))?;
    Ok(out)
}

fn encrypt_payload(key: &EncryptionKey, data: &[u8]) -> Result<Vec<u8>, HubError> {
    let cipher = Aes256Gcm::new_from_slice(&key.0).map_err(|e| codec_error("bad key", e))?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let sealed = cipher
        .encrypt(&nonce, data)
        .map_err(|e| codec_error("encryption failed", e))?;

    let mut out = Vec::with_capacity(ENCRYPTION_MARKER.len() + NONCE_LEN + sealed.len());
    out.extend_from_slice(ENCRYPTION_MARKER);
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

fn decrypt_payload(key: &EncryptionKey, framed: &[u8]) -> Result<Vec<u8>, HubError> {
    if framed.len() < NONCE_LEN + TAG_LEN {
        return Err(codec_error("decryption failed", "payload truncated"));
    }
    let cipher = Aes256Gcm::new_from_slice(&key.0).map_err(|e| codec_error("bad key", e))?;
    let (nonce, sealed) = framed.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| codec_error("decryption failed", "wrong key or corrupt payload"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ENCRYPTION_OVERHEAD;

    const DATA: &[u8] = b"kind: stack\nparameters:\n  - name: dns.domain\n    value: example.com\n";

    fn key() -> EncryptionKey {
        EncryptionKey::from_secret("correct horse battery staple")
    }

    #[test]
    fn test_plain_is_identity() {
        let codec = Codec::plain();
        assert_eq!(codec.encode(DATA, false).unwrap(), DATA);
        assert_eq!(codec.decode(DATA).unwrap(), DATA);
    }

    #[test]
    fn test_gzip_and_encrypt() {
        let codec = Codec::new(true, Some(key()));
        let stored = codec.encode(DATA, true).unwrap();

        assert!(stored.starts_with(ENCRYPTION_MARKER));
        assert_eq!(codec.decode(&stored).unwrap(), DATA);
    }

    #[test]
    fn test_encryption_overhead_is_exact() {
        let codec = Codec::new(false, Some(key()));
        let stored = codec.encode(DATA, true).unwrap();
        assert_eq!(stored.len() as u64, DATA.len() as u64 + ENCRYPTION_OVERHEAD);
    }

    #[test]
    fn test_reader_handles_any_past_policy() {
        let reader = Codec::new(false, Some(key()));
        let gzipped = Codec::new(true, None).encode(DATA, false).unwrap();
        assert!(gzipped.starts_with(&GZIP_MAGIC));
        assert_eq!(reader.decode(&gzipped).unwrap(), DATA);

        let encrypted_only = Codec::new(false, Some(key())).encode(DATA, true).unwrap();
        assert_eq!(reader.decode(&encrypted_only).unwrap(), DATA);
    }

    #[test]
    fn test_encrypt_without_key_fails() {
        let err = Codec::new(true, None).encode(DATA, true).unwrap_err();
        assert!(matches!(err, HubError::Codec { .. }));
    }

    #[test]
    fn test_wrong_key_fails() {
        let stored = Codec::new(false, Some(key())).encode(DATA, true).unwrap();
        let other = Codec::new(false, Some(EncryptionKey::from_secret("other")));
        assert!(matches!(other.decode(&stored), Err(HubError::Codec { .. })));
        assert!(matches!(Codec::plain().decode(&stored), Err(HubError::Codec { .. })));
    }

    #[test]
    fn test_hex_key() {
        let hex_secret = "00".repeat(32);
        assert_eq!(EncryptionKey::from_secret(&hex_secret), EncryptionKey([0u8; 32]));
        assert_ne!(EncryptionKey::from_secret("short"), EncryptionKey([0u8; 32]));
    }

    #[test]
    fn test_truncated_payload() {
        let mut stored = ENCRYPTION_MARKER.to_vec();
        stored.extend_from_slice(&[0u8; 4]);
        assert!(Codec::new(false, Some(key())).decode(&stored).is_err());
    }
}
