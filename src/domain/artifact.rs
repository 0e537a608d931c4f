//! Uploaded artifact identity.
//!
//! The client-supplied filename is display metadata only. Every upload gets a
//! fresh server-generated storage key, so two concurrent uploads with the same
//! filename can never race on one storage path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of one uploaded photograph for the duration of one request.
///
/// Created on receipt, exclusively owned by the pipeline, and deleted from
/// storage exactly once before the request completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadArtifact {
    /// Server-generated unique storage key.
    key: String,

    /// Client-supplied filename, kept for responses only.
    display_name: String,

    /// Timestamp of receipt.
    pub received_at: DateTime<Utc>,
}

impl UploadArtifact {
    /// Create an artifact identity for an upload with the given display name.
    ///
    /// The storage key is a fresh UUIDv4 with the display name's extension
    /// appended, so stored files remain recognizable on disk.
    #[must_use]
    pub fn for_upload(display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        let key = match extension_of(&display_name) {
            Some(ext) => format!("{}.{ext}", uuid_v4()),
            None => uuid_v4(),
        };
        Self {
            key,
            display_name,
            received_at: Utc::now(),
        }
    }

    /// The unique storage key under which the bytes are persisted.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The client-supplied filename for user-facing responses.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Extract a plain alphanumeric extension from a filename, if any.
///
/// Anything else (empty, dotted tricks, path separators) is dropped so the
/// storage key stays a single safe path component.
fn extension_of(name: &str) -> Option<&str> {
    let ext = name.rsplit('.').next()?;
    if ext.is_empty()
        || ext.len() > 8
        || ext == name
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext)
}

/// Generate a UUID v4 (random) using a CSPRNG.
///
/// Uses ChaCha20Rng seeded from OS entropy so storage keys are unpredictable
/// on all platforms.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}
