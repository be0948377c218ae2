//! Stable identifiers for relocated files
//!
//! Paired captures (a still and its motion clip) carry the same embedded
//! content identifier, so they are named alike. Everything else gets an
//! identifier derived from its bytes.

use crate::hash::digest_file;
use crate::media::ClassifiedFile;
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Where an identifier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    /// Collection identifier embedded in the container
    Embedded,
    /// First 16 bytes of the content's SHA-256 digest
    ContentHash,
    /// All-zero fallback when the content could not be read
    Sentinel,
}

/// Identifier used in the final file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    text: String,
    source: IdentitySource,
}

impl Identifier {
    /// The all-zero identifier
    pub fn sentinel() -> Self {
        Self {
            text: uuid_text(Uuid::nil()),
            source: IdentitySource::Sentinel,
        }
    }

    /// Identifier from the leading 16 bytes of a 256-bit digest
    pub fn from_digest(digest: &[u8; 32]) -> Self {
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        Self {
            text: uuid_text(Uuid::from_bytes(bytes)),
            source: IdentitySource::ContentHash,
        }
    }

    /// Embedded identifier, used verbatim
    pub fn embedded(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: IdentitySource::Embedded,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> IdentitySource {
        self.source
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Canonical hyphenated form, upper-case like embedded camera identifiers
fn uuid_text(uuid: Uuid) -> String {
    let mut buffer = Uuid::encode_buffer();
    uuid.hyphenated().encode_upper(&mut buffer).to_string()
}

/// Resolve the identifier of a classified file. Never fails.
pub fn resolve_identity(file: &ClassifiedFile) -> Identifier {
    let path = &file.path;

    if let Some(id) = file.container.collection_identifier() {
        debug!(?path, id, "Using embedded collection identifier");
        return Identifier::embedded(id);
    }

    match digest_file(path) {
        Ok(digest) => Identifier::from_digest(&digest),
        Err(e) => {
            warn!(?path, error = %e, "Falling back to sentinel identifier");
            Identifier::sentinel()
        }
    }
}
