//! Player events
//!
//! State changes are announced rather than returned: observers subscribe with a
//! callback, or the host drains the pending queue after each call (the pattern
//! the wasm wrapper uses to forward events to JavaScript).

use crate::media::PlayRequestId;
use crate::types::{RepeatMode, TransportPhase};
use aria_core::{BookmarkId, PlaylistId, SongId};
use serde::{Deserialize, Serialize};

/// Events emitted by the transport controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum PlayerEvent {
    /// Phase or play intent changed
    StateChanged {
        phase: TransportPhase,
        is_playing: bool,
    },

    /// A different song was selected (or the selection was cleared)
    SongChanged {
        playlist_id: PlaylistId,
        index: Option<usize>,
        song_id: Option<SongId>,
    },

    /// Playback of a newly loaded song actually started
    PlaybackStarted { song_id: SongId },

    /// Media clock moved
    TimeUpdated { current_time: f64, duration: f64 },

    VolumeChanged { volume: f32, is_muted: bool },

    RepeatChanged { mode: RepeatMode },

    ShuffleChanged { enabled: bool, order: Vec<usize> },

    /// The error slot changed; `None` means cleared
    ErrorChanged { message: Option<String> },

    /// Playlists or songs were added, removed or edited
    PlaylistsChanged,

    BookmarksChanged,

    /// Audio settings changed
    SettingsChanged,

    /// A rejected play request should be retried after `delay_ms`
    ///
    /// The host must call `on_retry_timer(token)` when the delay elapses.
    RetryScheduled {
        token: PlayRequestId,
        delay_ms: u32,
    },

    /// A bookmark jump is waiting for the song to load
    SeekPending { bookmark: BookmarkId, position: f64 },

    SleepTimerChanged {
        enabled: bool,
        remaining_seconds: f64,
    },

    /// The sleep timer ran out and paused playback
    SleepTimerExpired,
}

/// Handle returned by [`EventBus::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&PlayerEvent)>;

/// Pending-event queue plus synchronous subscribers
#[derive(Default)]
pub struct EventBus {
    pending: Vec<PlayerEvent>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("pending", &self.pending.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener called for every event, in emission order
    ///
    /// Listeners run while the controller is mid-call and must not call back
    /// into it.
    pub fn subscribe(&mut self, listener: impl FnMut(&PlayerEvent) + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    /// Deliver an event to listeners and queue it for draining
    pub fn emit(&mut self, event: PlayerEvent) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
        self.pending.push(event);
    }

    /// Take every event emitted since the last drain
    pub fn drain(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn listeners_see_events_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let sink = Rc::clone(&seen);
        bus.subscribe(move |event| sink.borrow_mut().push(event.clone()));

        bus.emit(PlayerEvent::PlaylistsChanged);
        bus.emit(PlayerEvent::SettingsChanged);

        assert_eq!(
            *seen.borrow(),
            vec![PlayerEvent::PlaylistsChanged, PlayerEvent::SettingsChanged]
        );
        assert_eq!(bus.drain().len(), 2);
        assert!(!bus.has_pending());
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        let counter = Rc::clone(&count);
        let id = bus.subscribe(move |_| *counter.borrow_mut() += 1);

        bus.emit(PlayerEvent::BookmarksChanged);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(PlayerEvent::BookmarksChanged);

        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let json = serde_json::to_value(PlayerEvent::VolumeChanged {
            volume: 0.5,
            is_muted: false,
        })
        .unwrap();
        assert_eq!(json["type"], "volumeChanged");
        assert_eq!(json["isMuted"], false);
    }
}
