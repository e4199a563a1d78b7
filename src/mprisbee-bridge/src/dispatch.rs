//! Applies peer commands to the host.

use crate::error::CommandError;
use crate::outbox::Outbox;
use mprisbee_core::{HostPlayState, PlayerHost, RepeatMode};
use mprisbee_protocol::{InboundCommand, OutboundMessage};

pub(crate) fn apply<H: PlayerHost>(
    host: &H,
    outbox: &Outbox,
    command: InboundCommand,
) -> Result<(), CommandError> {
    match command {
        InboundCommand::Next => host.next(),
        InboundCommand::Previous => host.previous(),
        InboundCommand::PlayPause => host.play_pause(),
        InboundCommand::Stop => host.stop(),
        InboundCommand::Pause => {
            if host.play_state() == HostPlayState::Playing {
                host.play_pause();
            }
        }
        InboundCommand::Play => {
            if matches!(
                host.play_state(),
                HostPlayState::Paused | HostPlayState::Stopped
            ) {
                host.play_pause();
            }
        }
        InboundCommand::Seek { offset_ms } => {
            let offset = to_i32("offset", offset_ms)?;
            let current = host.position_ms();
            let target = current
                .checked_add(offset)
                .ok_or(CommandError::OutOfRange {
                    field: "position",
                    value: i64::from(current) + offset_ms,
                })?;
            host.set_position(target.max(0));
        }
        InboundCommand::SetPosition {
            track_id,
            position_ms,
        } => {
            let position = to_i32("position", position_ms)?;
            tracing::trace!(%track_id, position, "absolute seek");
            host.set_position(position);
        }
        InboundCommand::GetPosition => outbox.send(&OutboundMessage::PositionReport {
            position_ms: i64::from(host.position_ms()),
        })?,
        InboundCommand::SetLoopStatus { status } => host.set_repeat(RepeatMode::from(status)),
        InboundCommand::SetShuffle { enabled } => host.set_shuffle(enabled),
        InboundCommand::SetVolume { volume } => {
            if !volume.is_finite() || !(0.0..=1.0).contains(&volume) {
                return Err(CommandError::InvalidVolume(volume));
            }
            host.set_volume(volume as f32);
        }
    }
    Ok(())
}

fn to_i32(field: &'static str, value: i64) -> Result<i32, CommandError> {
    i32::try_from(value).map_err(|_| CommandError::OutOfRange { field, value })
}
