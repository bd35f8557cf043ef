//! Media payloads (photos, videos, signatures).
//!
//! Payloads travel as base64 inside JSON and can be rendered as `data:`
//! URLs for display.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::error::MediaError;

/// Kind of door media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaKind {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo" => Ok(MediaKind::Photo),
            "video" => Ok(MediaKind::Video),
            other => Err(MediaError::UnknownKind(other.to_string())),
        }
    }
}

/// Opaque encoded media bytes with their content type.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPayload {
    pub content_type: String,
    #[serde(serialize_with = "to_base64", deserialize_with = "from_base64")]
    pub data: Vec<u8>,
}

impl fmt::Debug for MediaPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaPayload")
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl MediaPayload {
    pub fn new(content_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            content_type: content_type.into(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// SHA-256 hex digest of the raw bytes.
    pub fn sha256(&self) -> String {
        hex::encode(Sha256::digest(&self.data))
    }

    /// Render as `data:<type>;base64,<bytes>`.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.content_type, STANDARD.encode(&self.data))
    }

    /// Size of the data URL form, which is what a browser-style store
    /// would have to hold.
    pub fn data_url_len(&self) -> usize {
        "data:;base64,".len() + self.content_type.len() + self.data.len().div_ceil(3) * 4
    }

    /// Parse a base64 `data:` URL.
    pub fn from_data_url(url: &str) -> Result<Self, MediaError> {
        let rest = url.strip_prefix("data:").ok_or(MediaError::NotDataUrl)?;
        let (meta, encoded) = rest.split_once(',').ok_or(MediaError::NotDataUrl)?;
        let content_type = meta
            .strip_suffix(";base64")
            .ok_or(MediaError::NotBase64)?;
        let data = STANDARD
            .decode(encoded.trim())
            .map_err(|e| MediaError::Decode(e.to_string()))?;
        Ok(Self::new(content_type, data))
    }
}

fn to_base64<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&STANDARD.encode(data))
}

fn from_base64<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded = String::deserialize(deserializer)?;
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}
