//! Best-effort artwork lookup after a track change.
//!
//! Hosts often publish artwork some time after announcing the track, so the
//! lookup polls with a linearly growing delay on its own thread.

use crate::cancel::CancellationToken;
use crate::outbox::Outbox;
use mprisbee_core::{PlayerHost, TrackId};
use mprisbee_protocol::OutboundMessage;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub(crate) struct ArtworkPolicy {
    /// Retries after the initial check.
    pub retries: u32,
    /// Retry `n` waits `n * backoff`.
    pub backoff: Duration,
}

pub(crate) fn spawn<H: PlayerHost>(
    host: Arc<H>,
    outbox: Outbox,
    cancel: CancellationToken,
    track_id: TrackId,
    policy: ArtworkPolicy,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("mprisbee-artwork".into())
        .spawn(move || {
            let Some(art_path) = wait_for_artwork(host.as_ref(), &cancel, policy) else {
                return;
            };
            if cancel.is_cancelled() {
                return;
            }
            let current = host
                .now_playing()
                .map(|now| TrackId::from_locator(&now.file_url));
            if current.as_ref() != Some(&track_id) {
                tracing::debug!(%track_id, "track changed before artwork arrived");
                return;
            }
            let message = OutboundMessage::ArtworkReady { track_id, art_path };
            if let Err(err) = outbox.send(&message) {
                tracing::warn!(error = %err, "failed to send artwork update");
            }
        })
}

/// Polls the host until it reports artwork, the retries run out or the
/// session is cancelled.
pub(crate) fn wait_for_artwork<H: PlayerHost + ?Sized>(
    host: &H,
    cancel: &CancellationToken,
    policy: ArtworkPolicy,
) -> Option<String> {
    let mut attempt = 0;
    loop {
        if let Some(path) = host.artwork_path().filter(|path| !path.trim().is_empty()) {
            tracing::debug!(attempt, path = %path, "artwork found");
            return Some(path);
        }
        if attempt >= policy.retries {
            tracing::debug!(attempt, "no artwork for track");
            return None;
        }
        attempt += 1;
        if !cancel.sleep(policy.backoff * attempt) {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryHost, MemoryState};
    use std::time::Instant;

    fn policy() -> ArtworkPolicy {
        ArtworkPolicy {
            retries: 3,
            backoff: Duration::from_millis(5),
        }
    }

    #[test]
    fn immediate_artwork_needs_no_wait() {
        let host = MemoryHost::new(MemoryState {
            artwork_path: Some("/tmp/cover.jpg".into()),
            ..MemoryState::default()
        });
        assert_eq!(
            wait_for_artwork(&host, &CancellationToken::new(), policy()).as_deref(),
            Some("/tmp/cover.jpg")
        );
    }

    #[test]
    fn gives_up_after_retries() {
        let host = MemoryHost::new(MemoryState {
            artwork_path: Some("   ".into()),
            ..MemoryState::default()
        });
        let started = Instant::now();
        assert!(wait_for_artwork(&host, &CancellationToken::new(), policy()).is_none());
        // 5 + 10 + 15 ms of backoff.
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn late_artwork_is_picked_up() {
        let host = Arc::new(MemoryHost::default());
        let writer = Arc::clone(&host);
        let publisher = thread::spawn(move || {
            thread::sleep(Duration::from_millis(8));
            writer.update(|state| state.artwork_path = Some("/tmp/late.png".into()));
        });
        let found = wait_for_artwork(
            host.as_ref(),
            &CancellationToken::new(),
            ArtworkPolicy {
                retries: 3,
                backoff: Duration::from_millis(20),
            },
        );
        publisher.join().unwrap();
        assert_eq!(found.as_deref(), Some("/tmp/late.png"));
    }

    #[test]
    fn cancellation_stops_the_wait() {
        let host = MemoryHost::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let started = Instant::now();
        let found = wait_for_artwork(
            &host,
            &cancel,
            ArtworkPolicy {
                retries: 3,
                backoff: Duration::from_secs(10),
            },
        );
        assert!(found.is_none());
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
