//! Host → peer events.

use crate::error::ProtocolError;
use mprisbee_core::{LoopStatus, PlaybackStatus, TrackId, TrackMetadata};
use serde::Serialize;

/// Every event the bridge can send to the peer.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    /// The host is going away; the peer should drop the player.
    Exit,
    PlayStateChanged { state: PlaybackStatus },
    TrackChanged { metadata: TrackMetadata },
    ArtworkReady { track_id: TrackId, art_path: String },
    PositionReport { position_ms: i64 },
    VolumeChanged { volume: f64 },
    ShuffleChanged { enabled: bool },
    LoopStatusChanged { status: LoopStatus },
}

impl OutboundMessage {
    /// Value of the `event` field for this message.
    pub fn event_name(&self) -> &'static str {
        match self {
            OutboundMessage::Exit => "exit",
            OutboundMessage::PlayStateChanged { state } => match state {
                PlaybackStatus::Play => "play",
                PlaybackStatus::Pause => "pause",
                PlaybackStatus::Stop => "stop",
            },
            OutboundMessage::TrackChanged { .. } => "trackchange",
            OutboundMessage::ArtworkReady { .. } => "artupdate",
            OutboundMessage::PositionReport { .. } => "position",
            OutboundMessage::VolumeChanged { .. } => "volume",
            OutboundMessage::ShuffleChanged { .. } => "shuffle",
            OutboundMessage::LoopStatusChanged { .. } => "loopstatus",
        }
    }
}

// Wire shape: the variant name lands in `"event"` next to the payload.
#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum WireEvent<'a> {
    Exit,
    Play,
    Pause,
    Stop,
    TrackChange {
        metadata: &'a TrackMetadata,
    },
    ArtUpdate {
        trackid: &'a TrackId,
        albumartpath: &'a str,
    },
    Position {
        position: i64,
    },
    Volume {
        volume: f64,
    },
    Shuffle {
        shuffle: bool,
    },
    LoopStatus {
        status: LoopStatus,
    },
}

impl<'a> From<&'a OutboundMessage> for WireEvent<'a> {
    fn from(message: &'a OutboundMessage) -> Self {
        match message {
            OutboundMessage::Exit => WireEvent::Exit,
            OutboundMessage::PlayStateChanged { state } => match state {
                PlaybackStatus::Play => WireEvent::Play,
                PlaybackStatus::Pause => WireEvent::Pause,
                PlaybackStatus::Stop => WireEvent::Stop,
            },
            OutboundMessage::TrackChanged { metadata } => WireEvent::TrackChange { metadata },
            OutboundMessage::ArtworkReady {
                track_id,
                art_path,
            } => WireEvent::ArtUpdate {
                trackid: track_id,
                albumartpath: art_path,
            },
            OutboundMessage::PositionReport { position_ms } => WireEvent::Position {
                position: *position_ms,
            },
            OutboundMessage::VolumeChanged { volume } => WireEvent::Volume { volume: *volume },
            OutboundMessage::ShuffleChanged { enabled } => WireEvent::Shuffle { shuffle: *enabled },
            OutboundMessage::LoopStatusChanged { status } => {
                WireEvent::LoopStatus { status: *status }
            }
        }
    }
}

/// Serializes `message` as a single-line JSON object.
pub fn encode(message: &OutboundMessage) -> Result<String, ProtocolError> {
    serde_json::to_string(&WireEvent::from(message)).map_err(ProtocolError::Encode)
}
