//! Message protocol between the host bridge and the MPRIS peer.
//!
//! Each message is one JSON object on its own line. The `event` field names
//! the message; the remaining fields are its payload.
//!
//! # Host → peer
//!
//! | Event         | Fields                      |
//! |---------------|-----------------------------|
//! | `exit`        | –                           |
//! | `play`        | –                           |
//! | `pause`       | –                           |
//! | `stop`        | –                           |
//! | `trackchange` | `metadata`                  |
//! | `artupdate`   | `trackid`, `albumartpath`   |
//! | `position`    | `position`                  |
//! | `volume`      | `volume`                    |
//! | `shuffle`     | `shuffle`                   |
//! | `loopstatus`  | `status`                    |
//!
//! # Peer → host
//!
//! | Event         | Fields                      |
//! |---------------|-----------------------------|
//! | `next`, `previous`, `pause`, `playpause`, `stop`, `play`, `getposition` | – |
//! | `seek`        | `offset`                    |
//! | `position`    | `trackid`, `position`       |
//! | `loop_status` | `status`                    |
//! | `shuffle`     | `shuffle`                   |
//! | `volume`      | `volume`                    |

mod error;
mod inbound;
mod outbound;

pub use error::ProtocolError;
pub use inbound::{decode, InboundCommand};
pub use outbound::{encode, OutboundMessage};
