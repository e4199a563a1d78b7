use crate::host::{NowPlaying, TrackTags};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Object-path prefix every derived track id lives under.
pub const TRACK_ID_PREFIX: &str = "/org/musicbee/track/";

/// Stable identifier for a track, derived from its file locator.
///
/// The peer uses this as an MPRIS object path, so it must stay identical for
/// the same file across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub String);

impl TrackId {
    /// Wraps an id received from the peer as-is.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Hashes `locator` with SHA-256 and namespaces the lowercase hex digest.
    pub fn from_locator(locator: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(locator.as_bytes());
        Self(format!("{TRACK_ID_PREFIX}{:x}", hasher.finalize()))
    }

    /// The id as an object path string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for TrackId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrackId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for TrackId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Playback status as the peer understands it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Play,
    Pause,
    Stop,
}

/// MPRIS loop status. Serialized with its capitalized variant name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LoopStatus {
    #[default]
    None,
    Track,
    Playlist,
}

impl LoopStatus {
    /// Parses a status name, ignoring ASCII case.
    pub fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("none") {
            Some(Self::None)
        } else if name.eq_ignore_ascii_case("track") {
            Some(Self::Track)
        } else if name.eq_ignore_ascii_case("playlist") {
            Some(Self::Playlist)
        } else {
            None
        }
    }
}

/// Now-playing metadata sent to the peer on every track change.
///
/// Optional fields are left out of the JSON entirely when unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackMetadata {
    #[serde(rename = "trackid")]
    pub track_id: TrackId,
    pub title: String,
    /// Duration in milliseconds.
    pub length: i64,
    #[serde(rename = "artist")]
    pub artists: Vec<String>,
    pub album: String,
    pub file_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disc_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_artist: Option<Vec<String>>,
    #[serde(rename = "composer", default, skip_serializing_if = "Option::is_none")]
    pub composers: Option<Vec<String>>,
    #[serde(rename = "lyricist", default, skip_serializing_if = "Option::is_none")]
    pub lyricists: Option<Vec<String>>,
    #[serde(rename = "genre", default, skip_serializing_if = "Option::is_none")]
    pub genres: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bpm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_rating: Option<String>,
    #[serde(rename = "comment", default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<String>>,
    #[serde(rename = "art_url", default, skip_serializing_if = "Option::is_none")]
    pub art_path: Option<String>,
}

impl TrackMetadata {
    /// Builds the metadata for the host's current track. Empty host tags
    /// become absent optional fields; multi-valued tags are split on
    /// `separator`.
    pub fn from_now_playing(now: &NowPlaying, separator: &str) -> Self {
        let tags: &TrackTags = &now.tags;
        Self {
            track_id: TrackId::from_locator(&now.file_url),
            title: tags.title.clone(),
            length: now.duration_ms,
            artists: split_multi(&tags.artist, separator),
            album: tags.album.clone(),
            file_url: now.file_url.clone(),
            disc_number: non_empty(&tags.disc_number),
            track_number: non_empty(&tags.track_number),
            album_artist: split_optional(&tags.album_artist, separator),
            composers: split_optional(&tags.composer, separator),
            lyricists: split_optional(&tags.lyricist, separator),
            genres: split_optional(&tags.genres, separator),
            audio_bpm: non_empty(&tags.bpm),
            content_created: non_empty(&tags.year),
            user_rating: non_empty(&tags.rating),
            comments: split_optional(&tags.comment, separator),
            art_path: now.artwork_path.as_deref().and_then(non_empty),
        }
    }
}

/// Splits a host multi-value string into trimmed, non-empty parts.
pub fn split_multi(value: &str, separator: &str) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}

fn split_optional(value: &str, separator: &str) -> Option<Vec<String>> {
    let parts = split_multi(value, separator);
    (!parts.is_empty()).then_some(parts)
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}
