//! Local transport for the MPRISBee bridge.
//!
//! One Unix stream socket per session, carrying UTF-8 text messages
//! delimited by a single `\n`. The peer lives at a per-user path (see
//! [`SocketAddress::for_current_user`]).

mod address;
mod channel;
mod error;
pub mod framing;

pub use address::{SocketAddress, SUN_PATH_CAPACITY};
pub use channel::{Channel, ChannelCloser};
pub use error::{ChannelError, ConnectionError};
pub use framing::{FrameReader, FrameWriter, ReadSettings};
