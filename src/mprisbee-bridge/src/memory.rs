//! In-memory player used by the `simulate` command and the tests.

use crate::bridge::Notification;
use mprisbee_core::{HostPlayState, NowPlaying, PlayerHost, RepeatMode};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};

/// A control call the bridge issued against the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    PlayPause,
    Stop,
    Next,
    Previous,
    SetPosition(i32),
    SetVolume(f32),
    SetShuffle(bool),
    SetRepeat(RepeatMode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryState {
    pub play_state: HostPlayState,
    pub position_ms: i32,
    pub volume: f32,
    pub muted: bool,
    pub shuffle: bool,
    pub auto_dj: bool,
    pub repeat: RepeatMode,
    pub now_playing: Option<NowPlaying>,
    /// What [`PlayerHost::artwork_path`] returns; kept apart from
    /// `now_playing` so tests can make artwork show up late.
    pub artwork_path: Option<String>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            play_state: HostPlayState::Stopped,
            position_ms: 0,
            volume: 1.0,
            muted: false,
            shuffle: false,
            auto_dj: false,
            repeat: RepeatMode::None,
            now_playing: None,
            artwork_path: None,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    state: MemoryState,
    calls: Vec<HostCall>,
    subscriber: Option<Sender<Notification>>,
}

/// Player state behind a mutex. Every control call is recorded, applied to
/// the state and, if someone subscribed, echoed as the notification a real
/// host would raise.
#[derive(Debug, Default)]
pub struct MemoryHost {
    inner: Mutex<Inner>,
}

impl MemoryHost {
    /// Starts from `state` with no recorded calls.
    pub fn new(state: MemoryState) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                ..Inner::default()
            }),
        }
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> MemoryState {
        self.lock().state.clone()
    }

    /// Mutates the state directly, without recording a call or notifying.
    pub fn update<R>(&self, change: impl FnOnce(&mut MemoryState) -> R) -> R {
        change(&mut self.lock().state)
    }

    /// Drains the recorded control calls.
    pub fn take_calls(&self) -> Vec<HostCall> {
        std::mem::take(&mut self.lock().calls)
    }

    /// Replaces any earlier subscriber.
    pub fn subscribe(&self) -> Receiver<Notification> {
        let (tx, rx) = mpsc::channel();
        self.lock().subscriber = Some(tx);
        rx
    }

    fn control(&self, call: HostCall, apply: impl FnOnce(&mut MemoryState) -> Option<Notification>) {
        let mut inner = self.lock();
        inner.calls.push(call);
        let Some(notification) = apply(&mut inner.state) else {
            return;
        };
        let delivered = inner
            .subscriber
            .as_ref()
            .map(|subscriber| subscriber.send(notification).is_ok());
        if delivered == Some(false) {
            inner.subscriber = None;
        }
    }

    fn read<R>(&self, query: impl FnOnce(&MemoryState) -> R) -> R {
        query(&self.lock().state)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PlayerHost for MemoryHost {
    fn play_state(&self) -> HostPlayState {
        self.read(|state| state.play_state)
    }

    fn position_ms(&self) -> i32 {
        self.read(|state| state.position_ms)
    }

    fn volume(&self) -> f32 {
        self.read(|state| state.volume)
    }

    fn is_muted(&self) -> bool {
        self.read(|state| state.muted)
    }

    fn shuffle(&self) -> bool {
        self.read(|state| state.shuffle)
    }

    fn auto_dj_enabled(&self) -> bool {
        self.read(|state| state.auto_dj)
    }

    fn repeat_mode(&self) -> RepeatMode {
        self.read(|state| state.repeat)
    }

    fn now_playing(&self) -> Option<NowPlaying> {
        self.read(|state| state.now_playing.clone())
    }

    fn artwork_path(&self) -> Option<String> {
        self.read(|state| state.artwork_path.clone())
    }

    fn play_pause(&self) {
        self.control(HostCall::PlayPause, |state| {
            state.play_state = match state.play_state {
                HostPlayState::Playing => HostPlayState::Paused,
                _ => HostPlayState::Playing,
            };
            Some(Notification::PlayStateChanged)
        });
    }

    fn stop(&self) {
        self.control(HostCall::Stop, |state| {
            state.play_state = HostPlayState::Stopped;
            state.position_ms = 0;
            Some(Notification::PlayStateChanged)
        });
    }

    // No queue to move through; the calls are only recorded.
    fn next(&self) {
        self.control(HostCall::Next, |_| None);
    }

    fn previous(&self) {
        self.control(HostCall::Previous, |_| None);
    }

    fn set_position(&self, position_ms: i32) {
        self.control(HostCall::SetPosition(position_ms), |state| {
            state.position_ms = position_ms;
            None
        });
    }

    fn set_volume(&self, volume: f32) {
        self.control(HostCall::SetVolume(volume), |state| {
            state.volume = volume;
            Some(Notification::VolumeLevelChanged)
        });
    }

    fn set_shuffle(&self, enabled: bool) {
        self.control(HostCall::SetShuffle(enabled), |state| {
            state.shuffle = enabled;
            Some(Notification::ShuffleChanged)
        });
    }

    fn set_repeat(&self, mode: RepeatMode) {
        self.control(HostCall::SetRepeat(mode), |state| {
            state.repeat = mode;
            Some(Notification::RepeatChanged)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_pause_toggles_and_records() {
        let host = MemoryHost::default();
        host.play_pause();
        assert_eq!(host.play_state(), HostPlayState::Playing);
        host.play_pause();
        assert_eq!(host.play_state(), HostPlayState::Paused);
        assert_eq!(
            host.take_calls(),
            vec![HostCall::PlayPause, HostCall::PlayPause]
        );
        assert!(host.take_calls().is_empty());
    }

    #[test]
    fn update_does_not_record_calls() {
        let host = MemoryHost::default();
        host.update(|state| {
            state.volume = 0.25;
            state.muted = true;
        });
        assert_eq!(host.volume(), 0.25);
        assert!(host.is_muted());
        assert!(host.take_calls().is_empty());
    }

    #[test]
    fn subscriber_sees_raised_notifications() {
        let host = MemoryHost::default();
        let events = host.subscribe();
        host.set_shuffle(true);
        host.next();
        host.stop();
        let raised: Vec<_> = events.try_iter().collect();
        assert_eq!(
            raised,
            vec![Notification::ShuffleChanged, Notification::PlayStateChanged]
        );
    }

    #[test]
    fn dropped_subscriber_is_forgotten() {
        let host = MemoryHost::default();
        drop(host.subscribe());
        host.set_volume(0.5);
        host.set_volume(0.6);
        assert_eq!(host.volume(), 0.6);
    }
}
