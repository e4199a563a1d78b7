//! Event bridge between a host media player and its MPRIS peer.
//!
//! [`EventBridge`] owns one socket session. Host notifications become
//! outbound messages; a listen thread applies peer commands to the
//! [`PlayerHost`](mprisbee_core::PlayerHost). All writes share one
//! [`Outbox`] so replies, notifications and artwork updates never interleave.

mod artwork;
mod bridge;
mod cancel;
mod dispatch;
mod error;
mod listener;
mod memory;
mod outbox;

pub use bridge::{BridgeState, EventBridge, Notification};
pub use cancel::CancellationToken;
pub use error::{CommandError, SendError};
pub use memory::{HostCall, MemoryHost, MemoryState};
pub use outbox::Outbox;
