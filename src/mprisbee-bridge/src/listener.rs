//! The listen loop: reads peer lines, decodes them and applies them.

use crate::cancel::CancellationToken;
use crate::dispatch;
use crate::outbox::Outbox;
use mprisbee_core::PlayerHost;
use mprisbee_protocol::decode;
use mprisbee_transport::{ChannelError, FrameReader};
use std::io::Read;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub(crate) struct Listener<H, R> {
    pub reader: FrameReader<R>,
    pub host: Arc<H>,
    pub outbox: Outbox,
    pub cancel: CancellationToken,
    /// Pause after a hard read error before trying again.
    pub error_backoff: Duration,
}

impl<H, R> Listener<H, R>
where
    H: PlayerHost,
    R: Read + Send + 'static,
{
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("mprisbee-listen".into())
            .spawn(move || self.run())
    }

    pub fn run(mut self) {
        tracing::debug!("listen loop started");
        while !self.cancel.is_cancelled() {
            match self.reader.read_message() {
                Ok(line) => self.handle_line(&line),
                Err(err) if err.is_timeout() => {
                    tracing::trace!("no message from peer within deadline");
                }
                Err(err @ (ChannelError::InvalidUtf8(_) | ChannelError::EmbeddedNewline)) => {
                    tracing::warn!(error = %err, "discarding unreadable line");
                }
                Err(err) => {
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    tracing::warn!(error = %err, "read from peer failed");
                    self.cancel.sleep(self.error_backoff);
                }
            }
        }
        tracing::debug!("listen loop stopped");
    }

    fn handle_line(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let command = match decode(line) {
            Ok(command) => command,
            Err(err) => {
                tracing::warn!(error = %err, line, "discarding peer message");
                return;
            }
        };
        let event = command.event_name();
        tracing::debug!(event, "peer command");
        if let Err(err) = dispatch::apply(self.host.as_ref(), &self.outbox, command) {
            tracing::warn!(event, error = %err, "peer command rejected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{HostCall, MemoryHost};
    use mprisbee_transport::ReadSettings;
    use std::io::{self, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Serves `lines` once, then reports no data until cancelled.
    struct Feed {
        data: io::Cursor<Vec<u8>>,
        idle_reads: Arc<AtomicUsize>,
    }

    impl Read for Feed {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.data.read(buf)?;
            if n == 0 {
                self.idle_reads.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(1));
            }
            Ok(n)
        }
    }

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn skips_bad_lines_and_survives_timeouts() {
        let text = concat!(
            "{\"event\":\"next\"}\n",
            "\n",
            "{\"event\":\"frobnicate\"}\n",
            "{\"event\":\"seek\"}\n",
            "{\"event\":\"volume\",\"volume\":7}\n",
            "{\"event\":\"getposition\"}\n",
            "{\"event\":\"previous\"}\n",
        );
        let idle_reads = Arc::new(AtomicUsize::new(0));
        let host = Arc::new(MemoryHost::default());
        let sink = Sink::default();
        let cancel = CancellationToken::new();
        let listener = Listener {
            reader: FrameReader::new(
                Feed {
                    data: io::Cursor::new(text.as_bytes().to_vec()),
                    idle_reads: Arc::clone(&idle_reads),
                },
                ReadSettings {
                    chunk_size: 7,
                    timeout: Duration::from_millis(20),
                    retry_interval: Duration::from_millis(2),
                },
            ),
            host: Arc::clone(&host),
            outbox: Outbox::new(sink.clone()),
            cancel: cancel.clone(),
            error_backoff: Duration::from_millis(5),
        };
        let handle = listener.spawn().unwrap();

        // Wait until the loop has gone through several empty deadlines.
        while idle_reads.load(Ordering::SeqCst) < 30 {
            thread::sleep(Duration::from_millis(5));
        }
        cancel.cancel();
        handle.join().unwrap();

        assert_eq!(host.take_calls(), vec![HostCall::Next, HostCall::Previous]);
        assert_eq!(
            sink.0.lock().unwrap().as_slice(),
            b"{\"event\":\"position\",\"position\":0}\n"
        );
    }
}
