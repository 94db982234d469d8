//! Transport controller
//!
//! Single authority over the media element, the processing graph and the
//! transport state. Every user intent and every media event is one synchronous
//! call that runs to completion; asynchronous platform work (play requests, the
//! retry delay) reports back through the `on_*` handlers with the id it was
//! issued under, so late outcomes can be checked against current intent.

use crate::config::PlayerConfig;
use crate::error::{PlaybackError, Result, SelectionError};
use crate::events::{EventBus, PlayerEvent, SubscriptionId};
use crate::media::{MediaElement, MediaErrorKind, PlayRejection, PlayRequestId};
use crate::shuffle;
use crate::types::{RepeatMode, SleepTimer, TransportPhase, TransportState};
use crate::volume::Volume;
use aria_audio::{AnalysisHandle, EngineFactory, EqPreset, GraphError, ProcessingGraph};
use aria_core::{
    format_time, AudioEffects, AudioSettings, AudioSettingsUpdate, Bookmark, BookmarkId, CoreError,
    Playlist, PlaylistId, PlaylistStore, ResourceLedger, ResourceReleaser, SettingsDelta,
    SmartCriteria, Song, SongId,
};
use aria_importer::{LocatorFactory, UploadImporter, UploadedFile};
use chrono::Utc;

/// Play request awaiting its outcome
#[derive(Debug, Clone, Copy)]
struct PendingPlay {
    id: PlayRequestId,

    /// Issued before the element had buffered enough; one retry is allowed
    retry_allowed: bool,
}

/// Orchestrates the playlist store, transport state and processing graph
pub struct TransportController {
    config: PlayerConfig,
    store: PlaylistStore,
    state: TransportState,
    settings: AudioSettings,
    volume: Volume,
    sleep_timer: SleepTimer,

    media: Box<dyn MediaElement>,
    graph: ProcessingGraph,
    importer: UploadImporter,
    ledger: ResourceLedger,
    releaser: Box<dyn ResourceReleaser>,
    events: EventBus,

    /// User intent to be playing; `state.is_playing` follows the platform
    wants_play: bool,
    /// Start playback once the loading source is ready
    autoplay_pending: bool,
    pending_play: Option<PendingPlay>,
    retry_token: Option<PlayRequestId>,
    next_request: u64,
    /// Position to seek to once the loading source is ready
    pending_seek: Option<f64>,

    /// Song whose resource the media element holds
    loaded_song: Option<SongId>,
    play_recorded: bool,
    /// The loaded song was removed and another song moved into its slot
    slot_replaced: bool,
}

impl TransportController {
    /// Create a controller with an empty default playlist
    ///
    /// No audio engine is created until the first source is ready to play.
    pub fn new(
        config: PlayerConfig,
        media: Box<dyn MediaElement>,
        engines: Box<dyn EngineFactory>,
        releaser: Box<dyn ResourceReleaser>,
    ) -> Result<Self> {
        config.validate()?;

        let volume = Volume::new(config.initial_volume);
        let mut controller = Self {
            store: PlaylistStore::new(config.default_playlist_name.clone()),
            state: TransportState::new(volume.level()),
            settings: AudioSettings::default(),
            volume,
            sleep_timer: SleepTimer::default(),
            media,
            graph: ProcessingGraph::new(engines, config.graph_config()),
            importer: UploadImporter::new(),
            ledger: ResourceLedger::new(),
            releaser,
            events: EventBus::new(),
            wants_play: false,
            autoplay_pending: false,
            pending_play: None,
            retry_token: None,
            next_request: 0,
            pending_seek: None,
            loaded_song: None,
            play_recorded: false,
            slot_replaced: false,
            config,
        };
        controller.sync_volume();
        controller.events.drain();
        Ok(controller)
    }

    // ===== Queries =====

    pub fn state(&self) -> &TransportState {
        &self.state
    }

    pub fn store(&self) -> &PlaylistStore {
        &self.store
    }

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn sleep_timer(&self) -> &SleepTimer {
        &self.sleep_timer
    }

    pub fn graph(&self) -> &ProcessingGraph {
        &self.graph
    }

    /// Playlist the transport is browsing (always resolves)
    pub fn current_playlist(&self) -> &Playlist {
        self.store.resolve(&self.state.current_playlist_id)
    }

    /// Song at the current index, if any
    pub fn current_song(&self) -> Option<&Song> {
        let index = self.state.current_song_index?;
        self.current_playlist().songs.get(index)
    }

    /// Whether the user currently intends playback
    pub fn wants_play(&self) -> bool {
        self.wants_play
    }

    /// Read-only analysis feed for visualizers
    pub fn analysis(&self) -> AnalysisHandle {
        self.graph.tap_analysis()
    }

    // ===== Events =====

    pub fn subscribe(&mut self, listener: impl FnMut(&PlayerEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Take every event emitted since the last drain
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        self.events.drain()
    }

    // ===== Selection =====

    /// Select a song without starting playback
    ///
    /// An invalid selection sets the error slot and leaves the transport as it was.
    pub fn select_song(&mut self, playlist_id: &PlaylistId, index: usize) -> Result<()> {
        self.load(playlist_id.clone(), index, false, true)
    }

    /// Select a song and start playing it once it is ready
    pub fn play_song(&mut self, playlist_id: &PlaylistId, index: usize) -> Result<()> {
        self.load(playlist_id.clone(), index, true, true)
    }

    /// Skip forward, wrapping; keeps playing
    pub fn next(&mut self) -> Result<()> {
        self.advance(true)
    }

    /// Skip backward, wrapping; keeps playing
    pub fn previous(&mut self) -> Result<()> {
        self.advance(false)
    }

    /// Browse another playlist without selecting a song
    pub fn set_current_playlist(&mut self, playlist_id: &PlaylistId) {
        if !self.store.contains_playlist(playlist_id) {
            tracing::warn!("Ignoring switch to unknown playlist {}", playlist_id);
            return;
        }
        if &self.state.current_playlist_id == playlist_id {
            return;
        }

        self.state.current_playlist_id = playlist_id.clone();
        self.clear_selection();
        if self.state.is_shuffle {
            self.regenerate_shuffle();
        }
    }

    fn validate_selection(
        &self,
        playlist_id: &PlaylistId,
        index: usize,
    ) -> std::result::Result<(SongId, String), SelectionError> {
        let playlist = self
            .store
            .playlist(playlist_id)
            .ok_or_else(|| SelectionError::PlaylistNotFound(playlist_id.clone()))?;
        let song = playlist
            .songs
            .get(index)
            .ok_or(SelectionError::IndexOutOfRange {
                index,
                len: playlist.len(),
            })?;
        if song.url.is_empty() {
            return Err(SelectionError::SongUnavailable(song.id.clone()));
        }
        Ok((song.id.clone(), song.url.clone()))
    }

    /// Point the transport at a song and assign its source
    fn load(
        &mut self,
        playlist_id: PlaylistId,
        index: usize,
        autoplay: bool,
        reshuffle: bool,
    ) -> Result<()> {
        let (song_id, url) = match self.validate_selection(&playlist_id, index) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Rejected selection of {}[{}]: {}", playlist_id, index, e);
                let error = PlaybackError::from(e);
                self.set_error(&error);
                return Err(error);
            }
        };

        let playlist_changed = self.state.current_playlist_id != playlist_id;
        self.state.current_playlist_id = playlist_id;
        self.state.current_song_index = Some(index);
        self.slot_replaced = false;
        self.clear_error();

        if self.state.is_shuffle && (reshuffle || playlist_changed) {
            self.regenerate_shuffle();
        }

        self.cancel_pending_play();
        self.state.is_playing = false;
        self.wants_play = autoplay;
        self.autoplay_pending = autoplay;
        self.pending_seek = None;
        self.state.current_time = 0.0;
        self.state.duration = 0.0;
        self.loaded_song = Some(song_id.clone());
        self.play_recorded = false;

        let store = &self.store;
        let released = self.ledger.set_in_flight(
            Some(&url),
            |locator| store.references_url(locator),
            self.releaser.as_mut(),
        );
        if released > 0 {
            tracing::debug!("Released {} deferred media resources", released);
        }

        self.events.emit(PlayerEvent::SongChanged {
            playlist_id: self.state.current_playlist_id.clone(),
            index: Some(index),
            song_id: Some(song_id),
        });

        if let Err(e) = self.media.set_source(&url) {
            tracing::error!("Failed to assign source {}: {}", url, e);
            self.wants_play = false;
            self.autoplay_pending = false;
            let error = PlaybackError::LoadFailed;
            self.set_error(&error);
            self.set_phase(TransportPhase::Error);
            return Err(error);
        }

        self.set_phase(TransportPhase::Loading);
        Ok(())
    }

    fn advance(&mut self, forward: bool) -> Result<()> {
        let playlist = self.current_playlist();
        let playlist_id = playlist.id.clone();
        let len = playlist.len();
        if len == 0 {
            return Ok(());
        }

        let current = self.state.current_song_index;
        let target = if self.state.is_shuffle && !self.state.shuffle_order.is_empty() {
            shuffle::step(&self.state.shuffle_order, current, forward)
        } else if self.slot_replaced && forward {
            current.filter(|&index| index < len)
        } else {
            Some(match (current, forward) {
                (Some(index), true) => (index + 1) % len,
                (Some(index), false) => (index + len - 1) % len,
                (None, true) => 0,
                (None, false) => len - 1,
            })
        };

        match target {
            Some(index) => self.load(playlist_id, index, true, false),
            None => Ok(()),
        }
    }

    fn regenerate_shuffle(&mut self) {
        let len = self.current_playlist().len();
        self.state.shuffle_order = shuffle::shuffle_order(len, self.state.current_song_index);
        self.events.emit(PlayerEvent::ShuffleChanged {
            enabled: self.state.is_shuffle,
            order: self.state.shuffle_order.clone(),
        });
    }

    fn clear_selection(&mut self) {
        self.state.current_song_index = None;
        self.slot_replaced = false;
        self.stop_intent();
        self.media.pause();
        self.state.phase = TransportPhase::Idle;

        self.events.emit(PlayerEvent::SongChanged {
            playlist_id: self.state.current_playlist_id.clone(),
            index: None,
            song_id: None,
        });
        self.emit_state();
    }

    // ===== Transport =====

    /// Play when paused, pause when playing
    ///
    /// With nothing selected, selects the first song of the current playlist
    /// without starting it.
    pub fn toggle_play_pause(&mut self) {
        if self.state.current_song_index.is_none() {
            let playlist = self.current_playlist();
            if playlist.songs.is_empty() {
                return;
            }
            let playlist_id = playlist.id.clone();
            // A failed selection is already in the error slot
            let _ = self.load(playlist_id, 0, false, true);
            return;
        }

        if self.wants_play {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Start or resume playback of the loaded song
    pub fn play(&mut self) {
        if self.loaded_song.is_none() || self.state.current_song_index.is_none() {
            return;
        }
        self.clear_error();
        self.graph.resume();
        self.autoplay_pending = false;
        self.start_play();
    }

    pub fn pause(&mut self) {
        self.stop_intent();
        self.media.pause();
        if self.state.phase == TransportPhase::Playing {
            self.state.phase = TransportPhase::Ready;
        }
        self.emit_state();
    }

    /// Move the playback position
    ///
    /// No-op while nothing is selected, even if the element still holds a
    /// source. Out-of-range positions are passed through for the platform to clamp.
    pub fn seek(&mut self, seconds: f64) -> Result<()> {
        if self.loaded_song.is_none() || self.state.current_song_index.is_none() {
            return Ok(());
        }

        match self.media.set_current_time(seconds) {
            Ok(()) => {
                self.state.current_time = seconds;
                if self.state.audio_error.as_deref() == Some(&PlaybackError::SeekFailed.to_string())
                {
                    self.clear_error();
                }
                self.emit_time();
                Ok(())
            }
            Err(e) => {
                tracing::error!("Seek to {} failed: {}", seconds, e);
                let error = PlaybackError::SeekFailed;
                self.set_error(&error);
                Err(error)
            }
        }
    }

    fn start_play(&mut self) {
        let duration = self.media.duration();
        let at_end = self.media.is_ended()
            || (duration.is_finite() && duration > 0.0 && self.media.current_time() >= duration);
        if at_end {
            match self.media.set_current_time(0.0) {
                Ok(()) => self.state.current_time = 0.0,
                Err(e) => tracing::warn!("Failed to rewind before replay: {}", e),
            }
        }

        let retry_allowed = !self.media.ready_state().is_buffered();
        let id = self.next_request_id();
        self.pending_play = Some(PendingPlay { id, retry_allowed });
        self.retry_token = None;
        self.wants_play = true;
        self.media.play(id);
        self.emit_state();
    }

    fn stop_intent(&mut self) {
        self.wants_play = false;
        self.autoplay_pending = false;
        self.cancel_pending_play();
        self.state.is_playing = false;
    }

    fn cancel_pending_play(&mut self) {
        self.pending_play = None;
        self.retry_token = None;
    }

    fn next_request_id(&mut self) -> PlayRequestId {
        self.next_request += 1;
        PlayRequestId(self.next_request)
    }

    // ===== Media events =====

    /// The element started loading a new source
    pub fn on_load_start(&mut self) {
        if self.graph.has_graph() {
            tracing::debug!("New source loading; tearing down the previous graph");
            self.graph.teardown();
        }
    }

    /// The element has decoded enough to start
    pub fn on_can_play(&mut self) {
        if self.loaded_song.is_none() {
            return;
        }

        if self.state.phase == TransportPhase::Loading {
            self.set_phase(TransportPhase::Ready);
        }

        if !self.graph.has_graph() {
            let handle = self.graph.build(self.media.id(), &self.settings);
            if let Some(reason) = handle.init_error() {
                tracing::info!("Playing without audio processing: {}", reason);
            }
        }
        self.push_settings();
        self.media.set_playback_rate(self.settings.playback_speed);

        if let Some(position) = self.pending_seek.take() {
            // Failure is already in the error slot
            let _ = self.seek(position);
        }

        if self.autoplay_pending {
            self.autoplay_pending = false;
            self.start_play();
        }
    }

    /// A play request succeeded
    pub fn on_play_resolved(&mut self, request: PlayRequestId) {
        let current = self.pending_play.is_some_and(|pending| pending.id == request);
        if !current || !self.wants_play {
            tracing::debug!("Ignoring stale play resolution {:?}", request);
            if !self.wants_play {
                self.media.pause();
            }
            return;
        }

        self.pending_play = None;
        self.state.is_playing = true;
        self.clear_error();
        self.set_phase(TransportPhase::Playing);

        if !self.play_recorded {
            if let Some(song_id) = self.loaded_song.clone() {
                self.play_recorded = true;
                if self.store.record_play(&song_id, Utc::now()) {
                    self.events.emit(PlayerEvent::PlaybackStarted { song_id });
                }
            }
        }
    }

    /// A play request was declined by the platform
    pub fn on_play_rejected(&mut self, request: PlayRequestId, rejection: PlayRejection) {
        let Some(pending) = self.pending_play.filter(|pending| pending.id == request) else {
            tracing::debug!("Ignoring stale play rejection {:?}: {}", request, rejection);
            return;
        };
        self.pending_play = None;

        if !self.wants_play {
            return;
        }

        if pending.retry_allowed {
            let token = self.next_request_id();
            self.retry_token = Some(token);
            tracing::debug!(
                "Play rejected while buffering ({}); retrying in {} ms",
                rejection,
                self.config.play_retry_delay_ms
            );
            self.events.emit(PlayerEvent::RetryScheduled {
                token,
                delay_ms: self.config.play_retry_delay_ms,
            });
            return;
        }

        self.stop_intent();
        if self.state.phase == TransportPhase::Playing {
            self.state.phase = TransportPhase::Ready;
        }
        if rejection.is_benign() {
            tracing::info!("Playback deferred until user interaction: {}", rejection);
        } else {
            tracing::error!("Playback failed: {}", rejection);
            self.set_error(&PlaybackError::PlaybackRejected(rejection));
        }
        self.emit_state();
    }

    /// The retry delay scheduled by a `RetryScheduled` event elapsed
    pub fn on_retry_timer(&mut self, token: PlayRequestId) {
        if self.retry_token != Some(token) {
            return;
        }
        self.retry_token = None;
        if !self.wants_play {
            return;
        }

        let id = self.next_request_id();
        self.pending_play = Some(PendingPlay {
            id,
            retry_allowed: false,
        });
        self.media.play(id);
    }

    /// The element reached the end of the source
    pub fn on_ended(&mut self) {
        let Some(index) = self.state.current_song_index else {
            self.stop_intent();
            self.emit_state();
            return;
        };
        self.state.phase = TransportPhase::Ended;

        if self.state.repeat_mode == RepeatMode::One && !self.slot_replaced {
            match self.media.set_current_time(0.0) {
                Ok(()) => self.state.current_time = 0.0,
                Err(e) => tracing::warn!("Failed to rewind for repeat: {}", e),
            }
            self.start_play();
            return;
        }

        // Playlist position, even when shuffled
        let is_last = index + 1 >= self.current_playlist().len();

        if self.state.repeat_mode == RepeatMode::All || !is_last || self.slot_replaced {
            // Failure is already in the error slot
            let _ = self.advance(true);
            return;
        }

        self.stop_intent();
        self.set_phase(TransportPhase::Ready);
    }

    /// The element failed to load or decode
    pub fn on_error(&mut self, code: u16) {
        let kind = MediaErrorKind::from_code(code);
        tracing::error!("Media error {}: {}", code, kind.message());

        self.stop_intent();
        self.set_error(&PlaybackError::Media(kind));
        self.set_phase(TransportPhase::Error);
    }

    /// The media clock advanced
    pub fn on_time_update(&mut self, current_time: f64) {
        if !current_time.is_finite() {
            return;
        }
        self.state.current_time = current_time;
        let duration = self.media.duration();
        if duration.is_finite() {
            self.state.duration = duration;
        }
        self.emit_time();
    }

    /// The element learned the source's duration
    pub fn on_loaded_metadata(&mut self, duration: f64) {
        if !duration.is_finite() || duration < 0.0 {
            return;
        }
        self.state.duration = duration;
        if let Some(song_id) = self.loaded_song.clone() {
            if self.store.set_song_duration(&song_id, duration) {
                self.events.emit(PlayerEvent::PlaylistsChanged);
            }
        }
        self.emit_time();
    }

    /// The platform paused the element on its own
    pub fn on_pause(&mut self) {
        if self.media.is_ended() || self.state.phase == TransportPhase::Loading {
            return;
        }
        if !self.wants_play && !self.state.is_playing {
            return;
        }

        tracing::debug!("Media element paused externally");
        self.stop_intent();
        if self.state.phase == TransportPhase::Playing {
            self.state.phase = TransportPhase::Ready;
        }
        self.emit_state();
    }

    // ===== Volume, repeat, shuffle =====

    /// Set the volume (0-1); zero mutes
    pub fn set_volume(&mut self, level: f32) {
        self.volume.set_level(level);
        self.sync_volume();
    }

    pub fn toggle_mute(&mut self) {
        self.volume.toggle_mute();
        self.sync_volume();
    }

    fn sync_volume(&mut self) {
        self.media.set_volume(self.volume.effective());
        self.state.volume = self.volume.level();
        self.state.is_muted = self.volume.is_muted();
        self.events.emit(PlayerEvent::VolumeChanged {
            volume: self.state.volume,
            is_muted: self.state.is_muted,
        });
    }

    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.state.repeat_mode = mode;
        self.events.emit(PlayerEvent::RepeatChanged { mode });
    }

    /// off -> all -> one -> off
    pub fn cycle_repeat_mode(&mut self) -> RepeatMode {
        let mode = self.state.repeat_mode.cycle();
        self.set_repeat_mode(mode);
        mode
    }

    /// Turn shuffle on or off
    ///
    /// Turning it on pins the current song first; with nothing selected every
    /// index is shuffled.
    pub fn toggle_shuffle(&mut self) {
        self.state.is_shuffle = !self.state.is_shuffle;
        if self.state.is_shuffle {
            self.regenerate_shuffle();
        } else {
            self.state.shuffle_order.clear();
            self.events.emit(PlayerEvent::ShuffleChanged {
                enabled: false,
                order: Vec::new(),
            });
        }
    }

    // ===== Playlists =====

    pub fn create_playlist(&mut self, name: impl Into<String>) -> PlaylistId {
        let id = self.store.create_playlist(name);
        self.events.emit(PlayerEvent::PlaylistsChanged);
        id
    }

    pub fn rename_playlist(&mut self, id: &PlaylistId, name: impl Into<String>) -> Result<()> {
        self.store.rename_playlist(id, name)?;
        self.events.emit(PlayerEvent::PlaylistsChanged);
        Ok(())
    }

    /// Delete a playlist; the default playlist is protected
    pub fn delete_playlist(&mut self, id: &PlaylistId) -> Result<()> {
        let removed = self.store.delete_playlist(id)?;
        for song in &removed.songs {
            self.release_locator(&song.url);
        }
        self.events.emit(PlayerEvent::PlaylistsChanged);
        self.reconcile();
        Ok(())
    }

    pub fn add_song(&mut self, playlist_id: &PlaylistId, song: Song) -> Result<()> {
        self.store.add_song(playlist_id, song)?;
        self.events.emit(PlayerEvent::PlaylistsChanged);
        self.reconcile();
        Ok(())
    }

    /// Remove a song; a song that is playing keeps playing until the source changes
    pub fn remove_song(&mut self, playlist_id: &PlaylistId, song_id: &SongId) -> Result<()> {
        let removed = self.store.remove_song(playlist_id, song_id)?;
        self.release_locator(&removed.url);
        self.events.emit(PlayerEvent::PlaylistsChanged);
        self.reconcile();
        Ok(())
    }

    /// Materialize a smart playlist from the whole corpus
    pub fn create_smart_playlist(&mut self, criteria: SmartCriteria) -> PlaylistId {
        let id = self
            .store
            .create_smart_playlist(criteria, self.config.smart_playlist_limit);
        self.events.emit(PlayerEvent::PlaylistsChanged);
        id
    }

    /// Flip the favorite flag; `None` when the song is unknown
    pub fn toggle_favorite(&mut self, song_id: &SongId) -> Option<bool> {
        let favorite = self.store.toggle_favorite(song_id)?;
        self.events.emit(PlayerEvent::PlaylistsChanged);
        Some(favorite)
    }

    pub fn update_lyrics(&mut self, song_id: &SongId, lyrics: impl Into<String>) -> bool {
        let updated = self.store.update_lyrics(song_id, lyrics);
        if updated {
            self.events.emit(PlayerEvent::PlaylistsChanged);
        }
        updated
    }

    /// Import uploaded files into a playlist (the default one when `None`)
    ///
    /// Returns how many songs were added. Non-audio files are skipped.
    pub fn upload(
        &mut self,
        files: &[UploadedFile],
        playlist_id: Option<&PlaylistId>,
        locators: &mut dyn LocatorFactory,
    ) -> Result<usize> {
        let target = playlist_id
            .cloned()
            .unwrap_or_else(|| self.store.default_playlist().id.clone());
        if !self.store.contains_playlist(&target) {
            return Err(CoreError::PlaylistNotFound(target).into());
        }

        let report = self.importer.import(files, locators);
        if !report.has_songs() {
            return Ok(0);
        }

        let added = self.store.add_songs(&target, report.songs)?;
        self.clear_error();
        self.events.emit(PlayerEvent::PlaylistsChanged);
        self.reconcile();
        Ok(added)
    }

    fn release_locator(&mut self, url: &str) {
        if url.is_empty() {
            return;
        }
        let referenced = self.store.references_url(url);
        let outcome = self
            .ledger
            .request_release(url, referenced, self.releaser.as_mut());
        tracing::debug!("Release of {}: {:?}", url, outcome);
    }

    /// Bring the transport back in line with the store after a mutation
    fn reconcile(&mut self) {
        if !self.store.contains_playlist(&self.state.current_playlist_id) {
            tracing::info!(
                "Playlist {} is gone; falling back to the default playlist",
                self.state.current_playlist_id
            );
            self.state.current_playlist_id = self.store.default_playlist().id.clone();
            self.clear_selection();
        }

        let playlist = self.store.resolve(&self.state.current_playlist_id);
        let len = playlist.len();

        if let Some(index) = self.state.current_song_index {
            let loaded = self.loaded_song.as_ref();
            let in_place = playlist.songs.get(index).map(|s| &s.id) == loaded;
            let moved_to = loaded.and_then(|id| playlist.position_of(id));

            if in_place {
                // Still where it was
            } else if let Some(position) = moved_to {
                self.state.current_song_index = Some(position);
                self.slot_replaced = false;
                self.emit_song_changed();
            } else if index < len {
                tracing::debug!("Loaded song removed; slot {} now holds another song", index);
                self.slot_replaced = true;
                self.emit_song_changed();
            } else {
                tracing::debug!("Current index {} is out of range; clearing selection", index);
                self.clear_selection();
            }
        }

        if self.state.is_shuffle && self.state.shuffle_order.len() != len {
            self.regenerate_shuffle();
        }
    }

    // ===== Bookmarks =====

    pub fn bookmarks(&self) -> &[Bookmark] {
        self.store.bookmarks()
    }

    /// Bookmark the current position; `None` when nothing is selected
    ///
    /// The mark points at the song the element is actually playing, which
    /// differs from the selected slot after the playing song was removed.
    /// An empty name falls back to `"<song> - M:SS"`.
    pub fn create_bookmark(&mut self, name: Option<String>) -> Option<BookmarkId> {
        let song = if self.slot_replaced {
            let loaded = self.loaded_song.as_ref()?;
            self.store.find_song(loaded)?
        } else {
            self.current_song()?
        };
        let song_id = song.id.clone();
        let position = self.state.current_time;
        let name = name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("{} - {}", song.name, format_time(position)));

        let id = self
            .store
            .add_bookmark(Bookmark::new(song_id, position, name));
        self.events.emit(PlayerEvent::BookmarksChanged);
        Some(id)
    }

    pub fn remove_bookmark(&mut self, id: &BookmarkId) -> Result<()> {
        self.store.remove_bookmark(id)?;
        self.events.emit(PlayerEvent::BookmarksChanged);
        Ok(())
    }

    /// Select the bookmarked song and seek to the mark once it is ready
    ///
    /// The current playlist is searched first. Returns false when the song is gone.
    pub fn jump_to_bookmark(&mut self, id: &BookmarkId) -> bool {
        let Some((song, position)) = self.store.resolve_bookmark(id) else {
            tracing::debug!("Bookmark {} no longer resolves", id);
            return false;
        };
        let song_id = song.id.clone();

        let current = self.current_playlist();
        let target = current
            .position_of(&song_id)
            .map(|index| (current.id.clone(), index))
            .or_else(|| {
                self.store.playlists().iter().find_map(|playlist| {
                    playlist
                        .position_of(&song_id)
                        .map(|index| (playlist.id.clone(), index))
                })
            });
        let Some((playlist_id, index)) = target else {
            return false;
        };

        if self.load(playlist_id, index, false, true).is_err() {
            return false;
        }
        self.pending_seek = Some(position);
        self.events.emit(PlayerEvent::SeekPending {
            bookmark: id.clone(),
            position,
        });
        true
    }

    // ===== Audio settings =====

    /// Apply a partial settings update; the graph is updated in place
    pub fn update_audio_settings(&mut self, update: AudioSettingsUpdate) -> SettingsDelta {
        let delta = self.settings.apply(update);
        if delta.equalizer || delta.effects {
            self.push_settings();
        }
        if delta.playback_speed {
            self.media.set_playback_rate(self.settings.playback_speed);
        }
        self.events.emit(PlayerEvent::SettingsChanged);
        delta
    }

    /// Overwrite the equalizer bands with a preset
    pub fn set_equalizer_preset(&mut self, preset: EqPreset) {
        preset.apply_to(&mut self.settings.equalizer);
        self.push_settings();
        self.events.emit(PlayerEvent::SettingsChanged);
    }

    /// Return the equalizer to flat
    pub fn reset_equalizer(&mut self) {
        self.set_equalizer_preset(EqPreset::Flat);
    }

    /// Set one band's gain; the preset becomes custom
    pub fn set_equalizer_band(&mut self, index: usize, gain_db: f32) -> bool {
        if !self.settings.equalizer.set_band(index, gain_db) {
            tracing::warn!("Ignoring gain for nonexistent equalizer band {}", index);
            return false;
        }
        let gain = self.settings.equalizer.bands[index];
        log_failures(self.graph.set_equalizer_band(index, gain));
        self.events.emit(PlayerEvent::SettingsChanged);
        true
    }

    pub fn set_equalizer_enabled(&mut self, enabled: bool) {
        self.settings.equalizer.enabled = enabled;
        log_failures(self.graph.set_equalizer_enabled(enabled));
        self.events.emit(PlayerEvent::SettingsChanged);
    }

    pub fn set_effects(&mut self, effects: AudioEffects) -> SettingsDelta {
        self.update_audio_settings(AudioSettingsUpdate {
            effects: Some(effects),
            ..AudioSettingsUpdate::default()
        })
    }

    /// Playback rate (clamped to 0.5-2.0), applied on the media element
    pub fn set_playback_speed(&mut self, speed: f32) -> SettingsDelta {
        self.update_audio_settings(AudioSettingsUpdate {
            playback_speed: Some(speed),
            ..AudioSettingsUpdate::default()
        })
    }

    fn push_settings(&mut self) {
        log_failures(self.graph.apply_settings(&self.settings));
    }

    // ===== Sleep timer =====

    pub fn start_sleep_timer(&mut self, minutes: f64, fade_out: bool) {
        self.sleep_timer.start(minutes, fade_out);
        tracing::info!("Sleep timer set for {} minutes", self.sleep_timer.duration_minutes);
        self.emit_sleep_timer();
    }

    pub fn cancel_sleep_timer(&mut self) {
        self.sleep_timer.cancel();
        self.emit_sleep_timer();
    }

    /// Count the timer down by the host clock; pauses playback on expiry
    ///
    /// Returns true when the timer expired during this call.
    pub fn advance_sleep_timer(&mut self, elapsed_seconds: f64) -> bool {
        if !self.sleep_timer.enabled {
            return false;
        }
        let expired = self.sleep_timer.advance(elapsed_seconds);
        self.emit_sleep_timer();
        if expired {
            tracing::info!("Sleep timer expired; pausing playback");
            self.pause();
            self.events.emit(PlayerEvent::SleepTimerExpired);
        }
        expired
    }

    // ===== Session =====

    /// End the session: tear down the graph, close the engine, release every locator
    pub fn shutdown(&mut self) {
        self.stop_intent();
        self.media.pause();
        self.graph.shutdown();

        let remaining: Vec<String> = self
            .store
            .songs()
            .map(|song| song.url.clone())
            .filter(|url| !url.is_empty())
            .collect();
        let released = self
            .ledger
            .release_all(remaining.iter().map(String::as_str), self.releaser.as_mut());
        tracing::info!("Session ended; released {} media resources", released);
    }

    // ===== Internal =====

    fn set_error(&mut self, error: &PlaybackError) {
        let message = error.to_string();
        self.state.audio_error = Some(message.clone());
        self.events.emit(PlayerEvent::ErrorChanged {
            message: Some(message),
        });
    }

    fn clear_error(&mut self) {
        if self.state.audio_error.take().is_some() {
            self.events.emit(PlayerEvent::ErrorChanged { message: None });
        }
    }

    fn set_phase(&mut self, phase: TransportPhase) {
        self.state.phase = phase;
        self.emit_state();
    }

    fn emit_state(&mut self) {
        self.events.emit(PlayerEvent::StateChanged {
            phase: self.state.phase,
            is_playing: self.state.is_playing,
        });
    }

    fn emit_time(&mut self) {
        self.events.emit(PlayerEvent::TimeUpdated {
            current_time: self.state.current_time,
            duration: self.state.duration,
        });
    }

    fn emit_song_changed(&mut self) {
        let song_id = self.current_song().map(|song| song.id.clone());
        self.events.emit(PlayerEvent::SongChanged {
            playlist_id: self.state.current_playlist_id.clone(),
            index: self.state.current_song_index,
            song_id,
        });
    }

    fn emit_sleep_timer(&mut self) {
        self.events.emit(PlayerEvent::SleepTimerChanged {
            enabled: self.sleep_timer.enabled,
            remaining_seconds: self.sleep_timer.remaining_seconds,
        });
    }
}

fn log_failures(failures: Vec<GraphError>) {
    if !failures.is_empty() {
        tracing::debug!("{} audio parameter updates failed; playback continues", failures.len());
    }
}
