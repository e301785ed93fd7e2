//! Catalog file record and quality tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::MediaPayload;

/// Video quality tag derived from a file name and caption.
///
/// Ordering is by resolution, highest first, so sorting records by quality
/// puts the best transfer at the top.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quality {
    #[serde(rename = "2160p")]
    P2160,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Quality {
    /// Stable string form used in the store and on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::P2160 => "2160p",
            Quality::P1080 => "1080p",
            Quality::P720 => "720p",
            Quality::P480 => "480p",
            Quality::Unknown => "unknown",
        }
    }

    /// Parse the stable string form; anything unrecognized is `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "2160p" => Quality::P2160,
            "1080p" => Quality::P1080,
            "720p" => Quality::P720,
            "480p" => Quality::P480,
            _ => Quality::Unknown,
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One indexed media file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    /// Content-derived identifier, unique per physical file
    pub id: String,

    /// Normalized display name
    pub name: String,

    /// Normalized lower-cased text the ranked index is built over
    #[serde(rename = "searchTokens")]
    pub search_tokens: String,

    /// Free-text caption, may be empty
    pub caption: String,

    /// File size in bytes
    #[serde(rename = "sizeBytes")]
    pub size_bytes: u64,

    /// Detected quality tag
    pub quality: Quality,

    /// When the record was first saved
    #[serde(rename = "indexedAt")]
    pub indexed_at: DateTime<Utc>,

    /// When the record was last touched by a re-index or edit
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Derive the stable record id from a media payload's intrinsic identity.
///
/// The id must never depend on the file name: the same physical file
/// forwarded under ten different names is still one catalog row. The
/// identity quad (kind, dc, media id, access hash) is packed little-endian
/// and hashed, so the id survives restarts and re-crawls byte-for-byte.
pub fn derive_record_id(media: &MediaPayload) -> String {
    let mut packed = Vec::with_capacity(24);
    packed.extend_from_slice(&(media.kind.discriminant()).to_le_bytes());
    packed.extend_from_slice(&media.dc_id.to_le_bytes());
    packed.extend_from_slice(&media.media_id.to_le_bytes());
    packed.extend_from_slice(&media.access_hash.to_le_bytes());

    let digest = Sha256::digest(&packed);
    hex::encode(&digest[..16])
}
