//! Encrypted upload results.

use super::ContentId;

/// Length of the AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// Length of the GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Result of encrypting and publishing a document.
///
/// The key and nonce are handed to the caller and never stored here.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionArtifact {
    /// Content id of the encrypted payload
    pub content_id: ContentId,
    /// AES-256 key
    pub key: [u8; KEY_LEN],
    /// GCM nonce (also prefixed to the payload)
    pub iv: [u8; NONCE_LEN],
}

impl EncryptionArtifact {
    /// Key as lowercase hex.
    pub fn key_hex(&self) -> String {
        hex::encode(self.key)
    }

    /// Nonce as lowercase hex.
    pub fn iv_hex(&self) -> String {
        hex::encode(self.iv)
    }
}

// Key material stays out of logs.
impl std::fmt::Debug for EncryptionArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionArtifact")
            .field("content_id", &self.content_id)
            .field("key", &"<redacted>")
            .field("iv", &self.iv_hex())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_key() {
        let artifact = EncryptionArtifact {
            content_id: ContentId::from("cid"),
            key: [0xab; KEY_LEN],
            iv: [0x01; NONCE_LEN],
        };
        let debug = format!("{:?}", artifact);
        assert!(!debug.contains("abab"));
        assert!(debug.contains("<redacted>"));
        assert_eq!(artifact.key_hex().len(), 64);
        assert_eq!(artifact.iv_hex(), "010101010101010101010101");
    }
}
