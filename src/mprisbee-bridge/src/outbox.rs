use crate::error::SendError;
use mprisbee_protocol::{encode, OutboundMessage};
use mprisbee_transport::FrameWriter;
use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};

type BoxedWriter = FrameWriter<Box<dyn Write + Send>>;

struct OutboxInner {
    writer: BoxedWriter,
    sealed: bool,
}

/// The single write path to the peer.
///
/// The notification thread, the listener (for position replies) and artwork
/// tasks all send through clones of one outbox; the lock keeps each message
/// contiguous on the wire.
#[derive(Clone)]
pub struct Outbox {
    inner: Arc<Mutex<OutboxInner>>,
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("sealed", &self.lock().sealed)
            .finish_non_exhaustive()
    }
}

impl Outbox {
    /// Wraps `writer` in newline framing.
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(OutboxInner {
                writer: FrameWriter::new(Box::new(writer)),
                sealed: false,
            })),
        }
    }

    /// Encodes and writes one message while holding the lock.
    pub fn send(&self, message: &OutboundMessage) -> Result<(), SendError> {
        let text = encode(message)?;
        let mut inner = self.lock();
        if inner.sealed {
            return Err(SendError::Sealed);
        }
        inner.writer.write_message(&text)?;
        tracing::trace!(event = message.event_name(), "sent message to peer");
        Ok(())
    }

    /// Sends `last` and refuses every later message, even if the write fails.
    pub fn seal_with(&self, last: &OutboundMessage) -> Result<(), SendError> {
        let text = encode(last)?;
        let mut inner = self.lock();
        if inner.sealed {
            return Err(SendError::Sealed);
        }
        inner.sealed = true;
        inner.writer.write_message(&text)?;
        Ok(())
    }

    /// Whether the final message has been sent.
    pub fn is_sealed(&self) -> bool {
        self.lock().sealed
    }

    // A writer that panicked mid-message cannot leave the framing in a
    // worse state than a failed write, so a poisoned lock is reused.
    fn lock(&self) -> MutexGuard<'_, OutboxInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
