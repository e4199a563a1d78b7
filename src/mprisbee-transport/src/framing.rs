//! Newline framing over a partial-I/O byte stream.
//!
//! The underlying stream may hand back any number of bytes per call, or
//! none at all for a while. [`FrameReader`] reassembles lines across chunk
//! boundaries and keeps whatever it read past a delimiter for the next call;
//! [`FrameWriter`] keeps writing until every byte of a message is accepted.

use crate::error::ChannelError;
use mprisbee_core::BridgeConfig;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

const DELIMITER: u8 = b'\n';

/// Timing and buffer sizes for [`FrameReader::read_message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadSettings {
    pub chunk_size: usize,
    /// Deadline for one `read_message` call, measured from its start.
    pub timeout: Duration,
    /// Pause between polls of an idle stream.
    pub retry_interval: Duration,
}

impl Default for ReadSettings {
    fn default() -> Self {
        Self::from(&BridgeConfig::default())
    }
}

impl From<&BridgeConfig> for ReadSettings {
    fn from(config: &BridgeConfig) -> Self {
        Self {
            chunk_size: config.read_chunk_size.max(1),
            timeout: config.read_timeout(),
            retry_interval: config.read_retry(),
        }
    }
}

/// Reads `\n`-terminated messages from `R`.
///
/// `Ok(0)` and would-block/timed-out errors from `R` mean "no data yet" and
/// are polled until the deadline; every other error is reported at once.
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    leftover: VecDeque<u8>,
    settings: ReadSettings,
}

impl<R: Read> FrameReader<R> {
    /// Reads from `inner` with an empty leftover buffer.
    pub fn new(inner: R, settings: ReadSettings) -> Self {
        Self {
            inner,
            leftover: VecDeque::new(),
            settings,
        }
    }

    /// Returns the next line without its delimiter.
    ///
    /// On timeout or read failure the partial line is put back into the
    /// leftover buffer, so a later call picks up where this one stopped.
    pub fn read_message(&mut self) -> Result<String, ChannelError> {
        let mut line = Vec::new();
        if self.drain_leftover(&mut line) {
            return finish_line(line);
        }

        let started = Instant::now();
        let mut chunk = vec![0u8; self.settings.chunk_size];
        loop {
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if is_transient(err.kind()) => 0,
                Err(source) => {
                    let collected = line.len();
                    self.stash(line);
                    return Err(ChannelError::Read { collected, source });
                }
            };

            if read == 0 {
                let waited = started.elapsed();
                if waited >= self.settings.timeout {
                    let collected = line.len();
                    self.stash(line);
                    return Err(ChannelError::TimedOut { collected, waited });
                }
                thread::sleep(self.settings.retry_interval);
                continue;
            }

            let data = &chunk[..read];
            match data.iter().position(|b| *b == DELIMITER) {
                Some(at) => {
                    line.extend_from_slice(&data[..at]);
                    self.leftover.extend(&data[at + 1..]);
                    return finish_line(line);
                }
                None => line.extend_from_slice(data),
            }
        }
    }

    /// Bytes received past the last returned line.
    pub fn buffered(&self) -> usize {
        self.leftover.len()
    }

    /// The underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    // Moves leftover bytes into `line` up to the first delimiter. Returns
    // true when a whole line was found.
    fn drain_leftover(&mut self, line: &mut Vec<u8>) -> bool {
        match self.leftover.iter().position(|b| *b == DELIMITER) {
            Some(at) => {
                line.extend(self.leftover.drain(..at));
                self.leftover.pop_front();
                true
            }
            None => {
                line.extend(self.leftover.drain(..));
                false
            }
        }
    }

    // The leftover buffer was drained before `line` started accumulating,
    // so the fragment goes back to the front unchanged.
    fn stash(&mut self, line: Vec<u8>) {
        for byte in line.into_iter().rev() {
            self.leftover.push_front(byte);
        }
    }
}

/// Writes `\n`-terminated messages to `W`, looping over partial writes.
#[derive(Debug)]
pub struct FrameWriter<W> {
    inner: W,
}

impl<W: Write> FrameWriter<W> {
    /// Frames messages written to `inner`.
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes `text` plus one delimiter. Returns only once every byte was
    /// accepted, or with the count written before the failure.
    pub fn write_message(&mut self, text: &str) -> Result<(), ChannelError> {
        if text.as_bytes().contains(&DELIMITER) {
            return Err(ChannelError::EmbeddedNewline);
        }

        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(DELIMITER);

        let total = bytes.len();
        let mut written = 0;
        while written < total {
            match self.inner.write(&bytes[written..]) {
                Ok(0) => {
                    return Err(ChannelError::Write {
                        written,
                        total,
                        source: ErrorKind::WriteZero.into(),
                    })
                }
                Ok(n) => written += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(source) => {
                    return Err(ChannelError::Write {
                        written,
                        total,
                        source,
                    })
                }
            }
        }

        self.inner.flush().map_err(|source| ChannelError::Write {
            written,
            total,
            source,
        })
    }

    /// The underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwraps the writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

fn is_transient(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

fn finish_line(line: Vec<u8>) -> Result<String, ChannelError> {
    String::from_utf8(line).map_err(|err| ChannelError::InvalidUtf8(err.utf8_error()))
}
