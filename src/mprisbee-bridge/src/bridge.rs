//! Session lifecycle and host notification handling.

use crate::artwork::{self, ArtworkPolicy};
use crate::cancel::CancellationToken;
use crate::listener::Listener;
use crate::outbox::Outbox;
use mprisbee_core::{BridgeConfig, HostPlayState, PlayerHost, TrackId, TrackMetadata};
use mprisbee_protocol::OutboundMessage;
use mprisbee_transport::{Channel, ChannelCloser, ConnectionError, ReadSettings, SocketAddress};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// Lifecycle of one bridge session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Uninitialized,
    Active,
    Closing,
    Closed,
    /// Connecting failed; everything is dropped for the rest of the session.
    Suspended,
}

/// Host events the embedding code forwards with [`EventBridge::notify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    PlayStateChanged,
    TrackChanged,
    ShuffleChanged,
    RepeatChanged,
    VolumeLevelChanged,
    VolumeMuteChanged,
}

struct Session {
    outbox: Outbox,
    cancel: CancellationToken,
    closer: ChannelCloser,
    listener: Option<JoinHandle<()>>,
}

struct Inner {
    state: BridgeState,
    session: Option<Session>,
}

/// Connects a host player to its MPRIS peer over a local socket.
///
/// `start`, `notify` and `shutdown` never fail: connection problems suspend
/// the bridge and I/O problems are logged. Dropping an active bridge shuts
/// it down.
pub struct EventBridge<H: PlayerHost> {
    host: Arc<H>,
    config: BridgeConfig,
    inner: Mutex<Inner>,
}

impl<H: PlayerHost> EventBridge<H> {
    /// Creates an unstarted bridge for `host`.
    pub fn new(host: Arc<H>, config: BridgeConfig) -> Self {
        Self {
            host,
            config,
            inner: Mutex::new(Inner {
                state: BridgeState::Uninitialized,
                session: None,
            }),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> BridgeState {
        self.lock().state
    }

    /// The host this bridge drives.
    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    /// Connects to the current user's socket and starts the session.
    pub fn start(&self) {
        let connection = SocketAddress::for_current_user(&self.config).and_then(|address| {
            tracing::info!(path = %address, "connecting to MPRIS peer");
            Channel::connect(&address, ReadSettings::from(&self.config))
        });
        self.start_with(connection);
    }

    /// Starts the session on an already established (or failed) connection.
    pub fn start_with(&self, connection: Result<Channel, ConnectionError>) {
        let mut inner = self.lock();
        if inner.state != BridgeState::Uninitialized {
            tracing::debug!(state = ?inner.state, "bridge already started");
            return;
        }

        let channel = match connection {
            Ok(channel) => channel,
            Err(err) => {
                tracing::warn!(error = %err, "MPRIS peer unavailable; bridge suspended");
                inner.state = BridgeState::Suspended;
                return;
            }
        };

        let (reader, writer, closer) = channel.into_split();
        let outbox = Outbox::new(writer.into_inner());
        let cancel = CancellationToken::new();
        let listener = Listener {
            reader,
            host: Arc::clone(&self.host),
            outbox: outbox.clone(),
            cancel: cancel.clone(),
            error_backoff: self.config.read_timeout(),
        };
        let listener = match listener.spawn() {
            Ok(handle) => handle,
            Err(err) => {
                tracing::warn!(error = %err, "failed to spawn listen thread; bridge suspended");
                closer.close();
                inner.state = BridgeState::Suspended;
                return;
            }
        };

        inner.session = Some(Session {
            outbox: outbox.clone(),
            cancel: cancel.clone(),
            closer,
            listener: Some(listener),
        });
        inner.state = BridgeState::Active;
        drop(inner);
        tracing::info!("bridge active");

        self.publish(&outbox, &cancel, Notification::PlayStateChanged);
        self.publish(&outbox, &cancel, Notification::ShuffleChanged);
        self.publish(&outbox, &cancel, Notification::RepeatChanged);
        if matches!(
            self.host.play_state(),
            HostPlayState::Playing | HostPlayState::Paused
        ) {
            self.publish(&outbox, &cancel, Notification::TrackChanged);
        }
    }

    /// Translates a host event into at most one message for the peer.
    /// Ignored unless the bridge is active.
    pub fn notify(&self, notification: Notification) {
        let (outbox, cancel) = {
            let inner = self.lock();
            match (&inner.state, &inner.session) {
                (BridgeState::Active, Some(session)) => {
                    (session.outbox.clone(), session.cancel.clone())
                }
                _ => return,
            }
        };
        self.publish(&outbox, &cancel, notification);
    }

    /// Sends `exit`, stops the listen loop and closes the socket.
    pub fn shutdown(&self) {
        let session = {
            let mut inner = self.lock();
            match inner.state {
                BridgeState::Active => {
                    inner.state = BridgeState::Closing;
                    inner.session.take()
                }
                BridgeState::Uninitialized => {
                    inner.state = BridgeState::Closed;
                    return;
                }
                BridgeState::Closing | BridgeState::Closed | BridgeState::Suspended => return,
            }
        };

        if let Some(mut session) = session {
            if let Err(err) = session.outbox.seal_with(&OutboundMessage::Exit) {
                tracing::warn!(error = %err, "failed to send exit to peer");
            }
            session.cancel.cancel();
            session.closer.close();
            if let Some(listener) = session.listener.take() {
                // Shutdown triggered from a host callback on the listen
                // thread itself; that thread exits once this call returns.
                if listener.thread().id() == thread::current().id() {
                    tracing::debug!("shutdown requested from listen thread");
                } else if listener.join().is_err() {
                    tracing::error!("listen thread panicked");
                }
            }
        }

        self.lock().state = BridgeState::Closed;
        tracing::info!("bridge closed");
    }

    fn publish(&self, outbox: &Outbox, cancel: &CancellationToken, notification: Notification) {
        let host = self.host.as_ref();
        let message = match notification {
            Notification::PlayStateChanged => OutboundMessage::PlayStateChanged {
                state: host.play_state().to_status(),
            },
            Notification::TrackChanged => {
                let Some(now) = host.now_playing() else {
                    tracing::debug!("track change with nothing loaded");
                    return;
                };
                let metadata =
                    TrackMetadata::from_now_playing(&now, &self.config.multi_value_separator);
                let track_id = metadata.track_id.clone();
                self.send(outbox, &OutboundMessage::TrackChanged { metadata });
                self.lookup_artwork(outbox, cancel, track_id);
                return;
            }
            Notification::ShuffleChanged => OutboundMessage::ShuffleChanged {
                enabled: host.shuffle() || host.auto_dj_enabled(),
            },
            Notification::RepeatChanged => OutboundMessage::LoopStatusChanged {
                status: host.repeat_mode().into(),
            },
            Notification::VolumeLevelChanged => {
                if host.is_muted() {
                    return;
                }
                OutboundMessage::VolumeChanged {
                    volume: widen_volume(host.volume()),
                }
            }
            Notification::VolumeMuteChanged => OutboundMessage::VolumeChanged {
                volume: if host.is_muted() {
                    0.0
                } else {
                    widen_volume(host.volume())
                },
            },
        };
        self.send(outbox, &message);
    }

    fn send(&self, outbox: &Outbox, message: &OutboundMessage) {
        if let Err(err) = outbox.send(message) {
            tracing::warn!(event = message.event_name(), error = %err, "failed to notify peer");
        }
    }

    fn lookup_artwork(
        &self,
        outbox: &Outbox,
        cancel: &CancellationToken,
        track_id: TrackId,
    ) {
        let policy = ArtworkPolicy {
            retries: self.config.artwork_attempts,
            backoff: self.config.artwork_backoff(),
        };
        let spawned = artwork::spawn(
            Arc::clone(&self.host),
            outbox.clone(),
            cancel.clone(),
            track_id,
            policy,
        );
        if let Err(err) = spawned {
            tracing::warn!(error = %err, "failed to spawn artwork lookup");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<H: PlayerHost> Drop for EventBridge<H> {
    fn drop(&mut self) {
        if self.state() == BridgeState::Active {
            self.shutdown();
        }
    }
}

impl<H: PlayerHost> std::fmt::Debug for EventBridge<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBridge")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Host volumes are `f32`; rounding to six places keeps `0.7` from reaching
/// the peer as `0.699999988079071`.
fn widen_volume(volume: f32) -> f64 {
    (f64::from(volume) * 1e6).round() / 1e6
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryHost;
    use std::io;

    #[test]
    fn widened_volume_keeps_short_decimals() {
        assert_eq!(widen_volume(0.7), 0.7);
        assert_eq!(widen_volume(1.0), 1.0);
        assert_eq!(widen_volume(0.0), 0.0);
    }

    #[test]
    fn failed_connection_suspends() {
        let bridge = EventBridge::new(Arc::new(MemoryHost::default()), BridgeConfig::default());
        bridge.start_with(Err(ConnectionError::Refused {
            path: "/tmp/nowhere.sock".into(),
            source: io::ErrorKind::NotFound.into(),
        }));
        assert_eq!(bridge.state(), BridgeState::Suspended);

        bridge.notify(Notification::PlayStateChanged);
        bridge.shutdown();
        assert_eq!(bridge.state(), BridgeState::Suspended);
    }

    #[test]
    fn shutdown_before_start_closes() {
        let bridge = EventBridge::new(Arc::new(MemoryHost::default()), BridgeConfig::default());
        bridge.shutdown();
        assert_eq!(bridge.state(), BridgeState::Closed);
        bridge.notify(Notification::TrackChanged);
        assert_eq!(bridge.state(), BridgeState::Closed);
    }

    #[test]
    fn start_on_missing_socket_suspends() {
        let tmp = tempfile::tempdir().unwrap();
        let config = BridgeConfig {
            socket_prefix: format!("{}/absent", tmp.path().display()),
            ..BridgeConfig::default()
        };
        // `<tmpdir>/absent<uid>/wine.sock` never exists.
        let bridge = EventBridge::new(Arc::new(MemoryHost::default()), config);
        bridge.start();
        assert_eq!(bridge.state(), BridgeState::Suspended);
    }
}
