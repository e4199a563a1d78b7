//! Peer → host commands.

use crate::error::ProtocolError;
use mprisbee_core::{LoopStatus, TrackId};
use serde_json::{Map, Value};

/// Every command the peer can send.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundCommand {
    Next,
    Previous,
    Pause,
    PlayPause,
    Stop,
    Play,
    /// Relative seek in milliseconds; negative seeks backwards.
    Seek { offset_ms: i64 },
    SetPosition { track_id: TrackId, position_ms: i64 },
    GetPosition,
    SetLoopStatus { status: LoopStatus },
    SetShuffle { enabled: bool },
    SetVolume { volume: f64 },
}

impl InboundCommand {
    /// Value of the `event` field for this command.
    pub fn event_name(&self) -> &'static str {
        match self {
            InboundCommand::Next => "next",
            InboundCommand::Previous => "previous",
            InboundCommand::Pause => "pause",
            InboundCommand::PlayPause => "playpause",
            InboundCommand::Stop => "stop",
            InboundCommand::Play => "play",
            InboundCommand::Seek { .. } => "seek",
            InboundCommand::SetPosition { .. } => "position",
            InboundCommand::GetPosition => "getposition",
            InboundCommand::SetLoopStatus { .. } => "loop_status",
            InboundCommand::SetShuffle { .. } => "shuffle",
            InboundCommand::SetVolume { .. } => "volume",
        }
    }
}

/// Parses one line from the peer.
///
/// The `event` field picks the command; the command's own fields must all be
/// present with the right JSON type. Field order does not matter and unknown
/// fields are ignored.
pub fn decode(text: &str) -> Result<InboundCommand, ProtocolError> {
    let value: Value = serde_json::from_str(text)
        .map_err(|err| ProtocolError::malformed(format!("invalid JSON: {err}")))?;
    let Value::Object(fields) = value else {
        return Err(ProtocolError::malformed("expected a JSON object"));
    };

    let event = match fields.get("event") {
        Some(Value::String(event)) => event.as_str(),
        Some(_) => return Err(ProtocolError::malformed("`event` must be a string")),
        None => return Err(ProtocolError::malformed("missing `event`")),
    };

    let command = match event {
        "next" => InboundCommand::Next,
        "previous" => InboundCommand::Previous,
        "pause" => InboundCommand::Pause,
        "playpause" => InboundCommand::PlayPause,
        "stop" => InboundCommand::Stop,
        "play" => InboundCommand::Play,
        "seek" => InboundCommand::Seek {
            offset_ms: integer(&fields, "offset")?,
        },
        "position" => InboundCommand::SetPosition {
            track_id: TrackId::new(string(&fields, "trackid")?),
            position_ms: integer(&fields, "position")?,
        },
        "getposition" => InboundCommand::GetPosition,
        "loop_status" => {
            let name = string(&fields, "status")?;
            let status = LoopStatus::parse(name).ok_or_else(|| {
                ProtocolError::malformed(format!("unknown loop status `{name}`"))
            })?;
            InboundCommand::SetLoopStatus { status }
        }
        "shuffle" => InboundCommand::SetShuffle {
            enabled: boolean(&fields, "shuffle")?,
        },
        "volume" => InboundCommand::SetVolume {
            volume: number(&fields, "volume")?,
        },
        other => return Err(ProtocolError::UnknownEvent(other.to_owned())),
    };
    Ok(command)
}

fn field<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<&'a Value, ProtocolError> {
    fields
        .get(name)
        .ok_or_else(|| ProtocolError::malformed(format!("missing `{name}`")))
}

fn wrong_type(name: &str, expected: &str) -> ProtocolError {
    ProtocolError::malformed(format!("`{name}` must be {expected}"))
}

// 2^63, the first float past `i64::MAX`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// Accepts JSON integers and floats with no fractional part, as long as the
/// value fits in an `i64`.
fn integer(fields: &Map<String, Value>, name: &str) -> Result<i64, ProtocolError> {
    let value = field(fields, name)?;
    if let Some(whole) = value.as_i64() {
        return Ok(whole);
    }
    value
        .as_f64()
        .filter(|n| n.fract() == 0.0 && *n >= -I64_BOUND && *n < I64_BOUND)
        .map(|n| n as i64)
        .ok_or_else(|| wrong_type(name, "a signed 64-bit integer"))
}

fn number(fields: &Map<String, Value>, name: &str) -> Result<f64, ProtocolError> {
    field(fields, name)?
        .as_f64()
        .ok_or_else(|| wrong_type(name, "a number"))
}

fn boolean(fields: &Map<String, Value>, name: &str) -> Result<bool, ProtocolError> {
    field(fields, name)?
        .as_bool()
        .ok_or_else(|| wrong_type(name, "a boolean"))
}

fn string<'a>(fields: &'a Map<String, Value>, name: &str) -> Result<&'a str, ProtocolError> {
    field(fields, name)?
        .as_str()
        .ok_or_else(|| wrong_type(name, "a string"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_commands() {
        for (text, expected) in [
            (r#"{"event":"next"}"#, InboundCommand::Next),
            (r#"{"event":"previous"}"#, InboundCommand::Previous),
            (r#"{"event":"pause"}"#, InboundCommand::Pause),
            (r#"{"event":"playpause"}"#, InboundCommand::PlayPause),
            (r#"{"event":"stop"}"#, InboundCommand::Stop),
            (r#"{"event":"play"}"#, InboundCommand::Play),
            (r#"{"event":"getposition"}"#, InboundCommand::GetPosition),
        ] {
            let command = decode(text).unwrap();
            assert_eq!(command.event_name(), &text[10..text.len() - 2]);
            assert_eq!(command, expected);
        }
    }

    #[test]
    fn seek_keeps_sign_and_width() {
        assert_eq!(
            decode(r#"{"event":"seek","offset":-5000000000}"#).unwrap(),
            InboundCommand::Seek {
                offset_ms: -5_000_000_000
            }
        );
    }

    #[test]
    fn whole_floats_count_as_integers() {
        assert_eq!(
            decode(r#"{"event":"seek","offset":1500.0}"#).unwrap(),
            InboundCommand::Seek { offset_ms: 1500 }
        );
        assert_eq!(
            decode(r#"{"event":"position","trackid":"t","position":-2e3}"#).unwrap(),
            InboundCommand::SetPosition {
                track_id: TrackId::new("t"),
                position_ms: -2000,
            }
        );
        assert!(matches!(
            decode(r#"{"event":"seek","offset":1e19}"#),
            Err(ProtocolError::Malformed { .. })
        ));
    }

    #[test]
    fn set_position_fields_any_order() {
        let command =
            decode(r#"{"position":3000000000,"trackid":"/org/musicbee/track/ff","event":"position"}"#)
                .unwrap();
        assert_eq!(
            command,
            InboundCommand::SetPosition {
                track_id: TrackId::new("/org/musicbee/track/ff"),
                position_ms: 3_000_000_000,
            }
        );
    }

    #[test]
    fn property_commands() {
        assert_eq!(
            decode(r#"{"event":"loop_status","status":"Playlist"}"#).unwrap(),
            InboundCommand::SetLoopStatus {
                status: LoopStatus::Playlist
            }
        );
        assert_eq!(
            decode(r#"{"event":"loop_status","status":"track"}"#).unwrap(),
            InboundCommand::SetLoopStatus {
                status: LoopStatus::Track
            }
        );
        assert_eq!(
            decode(r#"{"event":"shuffle","shuffle":false}"#).unwrap(),
            InboundCommand::SetShuffle { enabled: false }
        );
        assert_eq!(
            decode(r#"{"event":"volume","volume":0.42}"#).unwrap(),
            InboundCommand::SetVolume { volume: 0.42 }
        );
        assert_eq!(
            decode(r#"{"event":"volume","volume":1}"#).unwrap(),
            InboundCommand::SetVolume { volume: 1.0 }
        );
    }

    #[test]
    fn extra_fields_are_ignored() {
        assert_eq!(
            decode(r#"{"event":"shuffle","shuffle":true,"sender":"mpris","v":2}"#).unwrap(),
            InboundCommand::SetShuffle { enabled: true }
        );
    }

    #[test]
    fn unknown_event_is_named() {
        match decode(r#"{"event":"frobnicate"}"#) {
            Err(ProtocolError::UnknownEvent(name)) => assert_eq!(name, "frobnicate"),
            other => panic!("expected unknown event, got {other:?}"),
        }
    }

    #[test]
    fn missing_field_is_malformed() {
        assert!(matches!(
            decode(r#"{"event":"seek"}"#),
            Err(ProtocolError::Malformed { .. })
        ));
        assert!(matches!(
            decode(r#"{"event":"position","position":5}"#),
            Err(ProtocolError::Malformed { .. })
        ));
    }

    #[test]
    fn wrong_types_are_malformed() {
        for text in [
            r#"{"event":"seek","offset":"10"}"#,
            r#"{"event":"seek","offset":1.5}"#,
            r#"{"event":"seek","offset":18446744073709551615}"#,
            r#"{"event":"shuffle","shuffle":"yes"}"#,
            r#"{"event":"volume","volume":null}"#,
            r#"{"event":"loop_status","status":"Forever"}"#,
            r#"{"event":"loop_status","status":1}"#,
            r#"{"event":7}"#,
        ] {
            assert!(
                matches!(decode(text), Err(ProtocolError::Malformed { .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn non_objects_are_malformed() {
        for text in ["", "not json", "[1,2]", r#""next""#, "{}", r#"{"event":"next""#] {
            assert!(
                matches!(decode(text), Err(ProtocolError::Malformed { .. })),
                "{text:?}"
            );
        }
    }
}
