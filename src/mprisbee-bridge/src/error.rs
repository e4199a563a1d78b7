use mprisbee_protocol::ProtocolError;
use mprisbee_transport::ChannelError;
use thiserror::Error;

/// Why an outbound message did not reach the peer.
#[derive(Debug, Error)]
pub enum SendError {
    #[error(transparent)]
    Encode(#[from] ProtocolError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error("session already sent exit")]
    Sealed,
}

/// Why a decoded peer command was not applied to the host.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{field} {value} does not fit in a 32-bit signed integer")]
    OutOfRange { field: &'static str, value: i64 },
    #[error("volume {0} is outside 0.0..=1.0")]
    InvalidVolume(f64),
    #[error("failed to reply to peer: {0}")]
    Reply(#[from] SendError),
}
