//! A connected Unix stream socket with newline framing in both directions.

use crate::address::SocketAddress;
use crate::error::{ChannelError, ConnectionError};
use crate::framing::{FrameReader, FrameWriter, ReadSettings};
use std::io::ErrorKind;
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One connection to the peer.
///
/// The read and write directions are independent and can be split apart
/// with [`Channel::into_split`] so a listener thread reads while another
/// thread writes.
#[derive(Debug)]
pub struct Channel {
    reader: FrameReader<UnixStream>,
    writer: FrameWriter<UnixStream>,
    closer: ChannelCloser,
}

impl Channel {
    /// Connects to the peer listening at `address`.
    pub fn connect(
        address: &SocketAddress,
        settings: ReadSettings,
    ) -> Result<Self, ConnectionError> {
        let path = address.path();
        let stream = UnixStream::connect(path).map_err(|source| match source.kind() {
            ErrorKind::NotFound | ErrorKind::ConnectionRefused => ConnectionError::Refused {
                path: path.to_path_buf(),
                source,
            },
            _ => ConnectionError::Endpoint {
                path: path.to_path_buf(),
                source,
            },
        })?;
        tracing::debug!(path = %address, "connected to peer socket");

        Self::from_stream(stream, settings).map_err(|source| ConnectionError::Endpoint {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Wraps an already connected stream, e.g. one half of
    /// `UnixStream::pair()`.
    pub fn from_stream(stream: UnixStream, settings: ReadSettings) -> std::io::Result<Self> {
        // A bounded blocking read lets the reader notice its deadline and
        // cancellation without busy-polling a non-blocking descriptor.
        stream.set_read_timeout(Some(settings.retry_interval.max(MIN_POLL)))?;
        let reader = stream.try_clone()?;
        let closer = ChannelCloser::new(stream.try_clone()?);
        Ok(Self {
            reader: FrameReader::new(reader, settings),
            writer: FrameWriter::new(stream),
            closer,
        })
    }

    /// Blocks for the next line, up to the read deadline.
    pub fn read_message(&mut self) -> Result<String, ChannelError> {
        self.reader.read_message()
    }

    /// Writes one line; `text` must not contain a newline.
    pub fn write_message(&mut self, text: &str) -> Result<(), ChannelError> {
        self.writer.write_message(text)
    }

    /// Shuts down both directions of the socket.
    pub fn close(&self) {
        self.closer.close();
    }

    /// A handle that can close this channel from another thread.
    pub fn closer(&self) -> ChannelCloser {
        self.closer.clone()
    }

    /// Separates the channel into its reader, writer and closer.
    pub fn into_split(self) -> (FrameReader<UnixStream>, FrameWriter<UnixStream>, ChannelCloser) {
        (self.reader, self.writer, self.closer)
    }
}

// `set_read_timeout` rejects a zero duration.
const MIN_POLL: std::time::Duration = std::time::Duration::from_millis(1);

/// Shuts the socket down from any thread. Only the first call has an effect;
/// a reader blocked on the socket wakes up and sees end-of-stream.
#[derive(Debug, Clone)]
pub struct ChannelCloser {
    stream: Arc<UnixStream>,
    closed: Arc<AtomicBool>,
}

impl ChannelCloser {
    fn new(stream: UnixStream) -> Self {
        Self {
            stream: Arc::new(stream),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shuts the socket down; later calls do nothing.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => tracing::debug!("peer socket closed"),
            Err(err) if err.kind() == ErrorKind::NotConnected => {}
            Err(err) => tracing::warn!(error = %err, "failed to shut down peer socket"),
        }
    }

    /// Whether `close` has been called on any clone.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
