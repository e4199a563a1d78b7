//! Capability interface the bridge consumes from the host media player.
//!
//! The bridge never owns player state; it queries the host when it needs to
//! describe something to the peer and issues controls when the peer asks.

use crate::models::{LoopStatus, PlaybackStatus};

/// Player state as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostPlayState {
    #[default]
    Undefined,
    Loading,
    Playing,
    Paused,
    Stopped,
}

impl HostPlayState {
    /// Collapses host states onto the three the peer knows about.
    pub fn to_status(self) -> PlaybackStatus {
        match self {
            HostPlayState::Playing => PlaybackStatus::Play,
            HostPlayState::Paused | HostPlayState::Loading => PlaybackStatus::Pause,
            HostPlayState::Stopped | HostPlayState::Undefined => PlaybackStatus::Stop,
        }
    }
}

/// Host repeat setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatMode {
    #[default]
    None,
    One,
    All,
}

impl From<RepeatMode> for LoopStatus {
    fn from(mode: RepeatMode) -> Self {
        match mode {
            RepeatMode::None => LoopStatus::None,
            RepeatMode::One => LoopStatus::Track,
            RepeatMode::All => LoopStatus::Playlist,
        }
    }
}

impl From<LoopStatus> for RepeatMode {
    fn from(status: LoopStatus) -> Self {
        match status {
            LoopStatus::None => RepeatMode::None,
            LoopStatus::Track => RepeatMode::One,
            LoopStatus::Playlist => RepeatMode::All,
        }
    }
}

/// Raw tag strings for the now-playing track. Missing tags are empty
/// strings; multi-valued tags keep the host's embedded separator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub disc_number: String,
    pub track_number: String,
    pub album_artist: String,
    pub composer: String,
    pub lyricist: String,
    pub genres: String,
    pub bpm: String,
    pub year: String,
    pub rating: String,
    pub comment: String,
}

/// Snapshot of the track the host currently has loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NowPlaying {
    pub tags: TrackTags,
    pub duration_ms: i64,
    pub file_url: String,
    pub artwork_path: Option<String>,
}

/// Queries and controls the bridge needs from the host player.
///
/// Implementations are called from the host's notification thread, the
/// bridge's listen thread and the artwork task, so they must be `Sync`.
pub trait PlayerHost: Send + Sync + 'static {
    fn play_state(&self) -> HostPlayState;

    /// Current position in milliseconds.
    fn position_ms(&self) -> i32;

    /// Volume in `0.0..=1.0`, independent of the mute flag.
    fn volume(&self) -> f32;

    fn is_muted(&self) -> bool;

    fn shuffle(&self) -> bool;

    /// Whether an auto-continuation mode (auto-DJ) is picking tracks.
    fn auto_dj_enabled(&self) -> bool {
        false
    }

    fn repeat_mode(&self) -> RepeatMode;

    /// `None` when nothing is loaded.
    fn now_playing(&self) -> Option<NowPlaying>;

    /// Artwork for the current track; hosts may only have it some time
    /// after the track change.
    fn artwork_path(&self) -> Option<String>;

    fn play_pause(&self);

    fn stop(&self);

    fn next(&self);

    fn previous(&self);

    fn set_position(&self, position_ms: i32);

    fn set_volume(&self, volume: f32);

    fn set_shuffle(&self, enabled: bool);

    fn set_repeat(&self, mode: RepeatMode);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_collapses_to_pause_and_undefined_to_stop() {
        assert_eq!(HostPlayState::Playing.to_status(), PlaybackStatus::Play);
        assert_eq!(HostPlayState::Loading.to_status(), PlaybackStatus::Pause);
        assert_eq!(HostPlayState::Paused.to_status(), PlaybackStatus::Pause);
        assert_eq!(HostPlayState::Undefined.to_status(), PlaybackStatus::Stop);
        assert_eq!(HostPlayState::Stopped.to_status(), PlaybackStatus::Stop);
    }

    #[test]
    fn repeat_and_loop_status_map_both_ways() {
        for mode in [RepeatMode::None, RepeatMode::One, RepeatMode::All] {
            let status: LoopStatus = mode.into();
            assert_eq!(RepeatMode::from(status), mode);
        }
        assert_eq!(LoopStatus::from(RepeatMode::One), LoopStatus::Track);
    }
}
