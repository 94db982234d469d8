//! WASM-compatible transport controller wrapper

use super::media::{js_message, UrlReleaser, WebMediaElement};
use super::session::{deliver, dispatch, Session, SessionSlot};
use crate::config::PlayerConfig;
use crate::controller::TransportController;
use crate::error::PlaybackError;
use crate::media::PlayRequestId;
use crate::types::RepeatMode;
use aria_audio::web::WebEngineFactory;
use aria_audio::{ElementId, EqPreset};
use aria_core::{
    AudioEffects, AudioSettingsUpdate, BookmarkId, PlaylistId, SmartCriteria, Song, SongId,
};
use aria_importer::{ImportError, UploadedFile};
use js_sys::{Array, Function};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{File, HtmlAudioElement, HtmlMediaElement, Url};

thread_local! {
    static NEXT_ELEMENT: Cell<u64> = const { Cell::new(1) };
}

type MediaHandler = fn(&mut TransportController, &HtmlAudioElement);

/// Media events routed into the controller
const MEDIA_EVENTS: [(&str, MediaHandler); 7] = [
    ("loadstart", |c, _| c.on_load_start()),
    ("canplay", |c, _| c.on_can_play()),
    ("ended", |c, _| c.on_ended()),
    ("error", |c, el| c.on_error(el.error().map_or(0, |e| e.code()))),
    ("timeupdate", |c, el| c.on_time_update(el.current_time())),
    ("loadedmetadata", |c, el| c.on_loaded_metadata(el.duration())),
    ("pause", |c, _| c.on_pause()),
];

/// Audio player bound to one `<audio>` element
#[wasm_bindgen]
pub struct WasmPlayer {
    session: Rc<Session>,
    element: HtmlAudioElement,
    listeners: Vec<(&'static str, Closure<dyn FnMut()>)>,
}

#[wasm_bindgen]
impl WasmPlayer {
    /// Create a player for `element`
    ///
    /// `config_json` is an optional JSON document of `PlayerConfig` fields.
    #[wasm_bindgen(constructor)]
    pub fn new(element: HtmlAudioElement, config_json: Option<String>) -> Result<WasmPlayer, JsValue> {
        console_error_panic_hook::set_once();

        let config = PlayerConfig::load(config_json.as_deref()).map_err(to_js)?;

        let id = ElementId(NEXT_ELEMENT.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        }));
        let engines = WebEngineFactory::new();
        let media_element: &HtmlMediaElement = &element;
        engines.register_element(id, media_element.clone());

        let slot = SessionSlot::default();
        let media = WebMediaElement::new(id, element.clone(), Rc::clone(&slot));
        let controller = TransportController::new(
            config,
            Box::new(media),
            Box::new(engines),
            Box::new(UrlReleaser),
        )
        .map_err(to_js)?;

        let session = Session::new(controller);
        *slot.borrow_mut() = Rc::downgrade(&session);

        let mut player = Self {
            session,
            element,
            listeners: Vec::new(),
        };
        player.attach_listeners()?;
        Ok(player)
    }

    // ===== Transport =====

    #[wasm_bindgen(js_name = togglePlayPause)]
    pub fn toggle_play_pause(&self) -> Result<(), JsValue> {
        self.run(TransportController::toggle_play_pause)
    }

    pub fn play(&self) -> Result<(), JsValue> {
        self.run(TransportController::play)
    }

    pub fn pause(&self) -> Result<(), JsValue> {
        self.run(TransportController::pause)
    }

    /// Seek to a position in seconds
    pub fn seek(&self, seconds: f64) -> Result<(), JsValue> {
        self.run(|c| c.seek(seconds))?.map_err(to_js)
    }

    #[wasm_bindgen(js_name = playNext)]
    pub fn next(&self) -> Result<(), JsValue> {
        self.run(TransportController::next)?.map_err(to_js)
    }

    #[wasm_bindgen(js_name = playPrevious)]
    pub fn previous(&self) -> Result<(), JsValue> {
        self.run(TransportController::previous)?.map_err(to_js)
    }

    #[wasm_bindgen(js_name = selectSong)]
    pub fn select_song(&self, playlist_id: &str, index: usize) -> Result<(), JsValue> {
        let playlist_id = PlaylistId::new(playlist_id);
        self.run(|c| c.select_song(&playlist_id, index))?
            .map_err(to_js)
    }

    /// Select a song and start it once it can play
    #[wasm_bindgen(js_name = playSong)]
    pub fn play_song(&self, playlist_id: &str, index: usize) -> Result<(), JsValue> {
        let playlist_id = PlaylistId::new(playlist_id);
        self.run(|c| c.play_song(&playlist_id, index))?
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = setCurrentPlaylist)]
    pub fn set_current_playlist(&self, playlist_id: &str) -> Result<(), JsValue> {
        let playlist_id = PlaylistId::new(playlist_id);
        self.run(|c| c.set_current_playlist(&playlist_id))
    }

    // ===== Volume, repeat, shuffle =====

    /// Set volume (0-1)
    #[wasm_bindgen(js_name = setVolume)]
    pub fn set_volume(&self, level: f32) -> Result<(), JsValue> {
        self.run(|c| c.set_volume(level))
    }

    #[wasm_bindgen(js_name = toggleMute)]
    pub fn toggle_mute(&self) -> Result<(), JsValue> {
        self.run(TransportController::toggle_mute)
    }

    /// Set repeat mode ("off", "all" or "one")
    #[wasm_bindgen(js_name = setRepeatMode)]
    pub fn set_repeat_mode(&self, mode: &str) -> Result<(), JsValue> {
        let mode = RepeatMode::from_name(mode)
            .ok_or_else(|| JsValue::from_str("Invalid repeat mode. Use 'off', 'all', or 'one'"))?;
        self.run(|c| c.set_repeat_mode(mode))
    }

    /// Advance the repeat mode and return the new one
    #[wasm_bindgen(js_name = cycleRepeatMode)]
    pub fn cycle_repeat_mode(&self) -> Result<String, JsValue> {
        let mode = self.run(TransportController::cycle_repeat_mode)?;
        Ok(mode.as_str().to_string())
    }

    #[wasm_bindgen(js_name = toggleShuffle)]
    pub fn toggle_shuffle(&self) -> Result<(), JsValue> {
        self.run(TransportController::toggle_shuffle)
    }

    // ===== Playlists =====

    #[wasm_bindgen(js_name = createPlaylist)]
    pub fn create_playlist(&self, name: String) -> Result<String, JsValue> {
        let id = self.run(|c| c.create_playlist(name))?;
        Ok(id.to_string())
    }

    #[wasm_bindgen(js_name = renamePlaylist)]
    pub fn rename_playlist(&self, playlist_id: &str, name: String) -> Result<(), JsValue> {
        let playlist_id = PlaylistId::new(playlist_id);
        self.run(|c| c.rename_playlist(&playlist_id, name))?
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = deletePlaylist)]
    pub fn delete_playlist(&self, playlist_id: &str) -> Result<(), JsValue> {
        let playlist_id = PlaylistId::new(playlist_id);
        self.run(|c| c.delete_playlist(&playlist_id))?
            .map_err(to_js)
    }

    /// Add a song object (`{ id, name, artist, url, ... }`) to a playlist
    #[wasm_bindgen(js_name = addSong)]
    pub fn add_song(&self, playlist_id: &str, song: JsValue) -> Result<(), JsValue> {
        let song: Song = serde_wasm_bindgen::from_value(song)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse song: {}", e)))?;
        let playlist_id = PlaylistId::new(playlist_id);
        self.run(|c| c.add_song(&playlist_id, song))?
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = removeSong)]
    pub fn remove_song(&self, playlist_id: &str, song_id: &str) -> Result<(), JsValue> {
        let playlist_id = PlaylistId::new(playlist_id);
        let song_id = SongId::new(song_id);
        self.run(|c| c.remove_song(&playlist_id, &song_id))?
            .map_err(to_js)
    }

    /// Create a smart playlist from criteria like `{ type: "genre", value: "jazz" }`
    #[wasm_bindgen(js_name = createSmartPlaylist)]
    pub fn create_smart_playlist(&self, criteria: JsValue) -> Result<String, JsValue> {
        let criteria: SmartCriteria = serde_wasm_bindgen::from_value(criteria)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse criteria: {}", e)))?;
        let id = self.run(|c| c.create_smart_playlist(criteria))?;
        Ok(id.to_string())
    }

    #[wasm_bindgen(js_name = toggleFavorite)]
    pub fn toggle_favorite(&self, song_id: &str) -> Result<Option<bool>, JsValue> {
        let song_id = SongId::new(song_id);
        self.run(|c| c.toggle_favorite(&song_id))
    }

    #[wasm_bindgen(js_name = updateLyrics)]
    pub fn update_lyrics(&self, song_id: &str, lyrics: String) -> Result<bool, JsValue> {
        let song_id = SongId::new(song_id);
        self.run(|c| c.update_lyrics(&song_id, lyrics))
    }

    /// Import `File` objects; returns how many songs were added
    #[wasm_bindgen(js_name = handleFileUpload)]
    pub fn handle_file_upload(
        &self,
        files: Array,
        playlist_id: Option<String>,
    ) -> Result<usize, JsValue> {
        let files: Vec<File> = files
            .iter()
            .filter_map(|value| value.dyn_into::<File>().ok())
            .collect();
        let uploads: Vec<UploadedFile> = files
            .iter()
            .map(|file| UploadedFile::new(file.name(), file.type_()))
            .collect();
        let playlist_id = playlist_id.map(PlaylistId::new);

        let mut object_urls = |index: usize, upload: &UploadedFile| -> aria_importer::Result<String> {
            let file = files
                .get(index)
                .ok_or_else(|| ImportError::locator(upload.name.clone(), "file handle missing"))?;
            Url::create_object_url_with_blob(file)
                .map_err(|e| ImportError::locator(upload.name.clone(), js_message(&e)))
        };

        self.run(|c| c.upload(&uploads, playlist_id.as_ref(), &mut object_urls))?
            .map_err(to_js)
    }

    // ===== Bookmarks =====

    /// Bookmark the current position; returns the bookmark id
    #[wasm_bindgen(js_name = createBookmark)]
    pub fn create_bookmark(&self, name: Option<String>) -> Result<Option<String>, JsValue> {
        let id = self.run(|c| c.create_bookmark(name))?;
        Ok(id.map(|id| id.to_string()))
    }

    #[wasm_bindgen(js_name = removeBookmark)]
    pub fn remove_bookmark(&self, bookmark_id: &str) -> Result<(), JsValue> {
        let bookmark_id = BookmarkId::new(bookmark_id);
        self.run(|c| c.remove_bookmark(&bookmark_id))?
            .map_err(to_js)
    }

    #[wasm_bindgen(js_name = jumpToBookmark)]
    pub fn jump_to_bookmark(&self, bookmark_id: &str) -> Result<bool, JsValue> {
        let bookmark_id = BookmarkId::new(bookmark_id);
        self.run(|c| c.jump_to_bookmark(&bookmark_id))
    }

    // ===== Audio settings =====

    /// Apply a partial `AudioSettings` object
    #[wasm_bindgen(js_name = updateAudioSettings)]
    pub fn update_audio_settings(&self, update: JsValue) -> Result<(), JsValue> {
        let update: AudioSettingsUpdate = serde_wasm_bindgen::from_value(update)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse settings: {}", e)))?;
        self.run(|c| {
            c.update_audio_settings(update);
        })
    }

    #[wasm_bindgen(js_name = setEqualizerPreset)]
    pub fn set_equalizer_preset(&self, name: &str) -> Result<(), JsValue> {
        let preset = EqPreset::from_name(name)
            .ok_or_else(|| JsValue::from_str(&format!("Unknown equalizer preset: {}", name)))?;
        self.run(|c| c.set_equalizer_preset(preset))
    }

    #[wasm_bindgen(js_name = setEqualizerBand)]
    pub fn set_equalizer_band(&self, index: usize, gain_db: f32) -> Result<bool, JsValue> {
        self.run(|c| c.set_equalizer_band(index, gain_db))
    }

    #[wasm_bindgen(js_name = setEqualizerEnabled)]
    pub fn set_equalizer_enabled(&self, enabled: bool) -> Result<(), JsValue> {
        self.run(|c| c.set_equalizer_enabled(enabled))
    }

    /// Replace the reverb/echo/bass/spatial effect settings
    #[wasm_bindgen(js_name = setEffects)]
    pub fn set_effects(&self, effects: JsValue) -> Result<(), JsValue> {
        let effects: AudioEffects = serde_wasm_bindgen::from_value(effects)
            .map_err(|e| JsValue::from_str(&format!("Failed to parse effects: {}", e)))?;
        self.run(|c| {
            c.set_effects(effects);
        })
    }

    #[wasm_bindgen(js_name = setPlaybackSpeed)]
    pub fn set_playback_speed(&self, speed: f32) -> Result<(), JsValue> {
        self.run(|c| {
            c.set_playback_speed(speed);
        })
    }

    #[wasm_bindgen(js_name = resetEqualizer)]
    pub fn reset_equalizer(&self) -> Result<(), JsValue> {
        self.run(TransportController::reset_equalizer)
    }

    // ===== Sleep timer =====

    #[wasm_bindgen(js_name = startSleepTimer)]
    pub fn start_sleep_timer(&self, minutes: f64, fade_out: bool) -> Result<(), JsValue> {
        self.run(|c| c.start_sleep_timer(minutes, fade_out))
    }

    #[wasm_bindgen(js_name = cancelSleepTimer)]
    pub fn cancel_sleep_timer(&self) -> Result<(), JsValue> {
        self.run(TransportController::cancel_sleep_timer)
    }

    /// Count the sleep timer down; call from the host clock
    #[wasm_bindgen(js_name = advanceSleepTimer)]
    pub fn advance_sleep_timer(&self, elapsed_seconds: f64) -> Result<bool, JsValue> {
        self.run(|c| c.advance_sleep_timer(elapsed_seconds))
    }

    // ===== Queries =====

    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> Result<JsValue, JsValue> {
        self.session
            .with_controller(|c| serde_wasm_bindgen::to_value(c.state()))?
            .map_err(serialize_error)
    }

    #[wasm_bindgen(js_name = getPlaylists)]
    pub fn get_playlists(&self) -> Result<JsValue, JsValue> {
        self.session
            .with_controller(|c| serde_wasm_bindgen::to_value(c.store().playlists()))?
            .map_err(serialize_error)
    }

    #[wasm_bindgen(js_name = getBookmarks)]
    pub fn get_bookmarks(&self) -> Result<JsValue, JsValue> {
        self.session
            .with_controller(|c| serde_wasm_bindgen::to_value(c.bookmarks()))?
            .map_err(serialize_error)
    }

    #[wasm_bindgen(js_name = getSettings)]
    pub fn get_settings(&self) -> Result<JsValue, JsValue> {
        self.session
            .with_controller(|c| serde_wasm_bindgen::to_value(c.settings()))?
            .map_err(serialize_error)
    }

    /// Frequency-bin magnitudes for visualizers; empty when no graph is built
    #[wasm_bindgen(js_name = frequencyData)]
    pub fn frequency_data(&self) -> Result<Vec<u8>, JsValue> {
        self.session.with_controller(|c| c.analysis().spectrum())
    }

    // ===== Events =====

    /// Register the event callback; it receives one event object per call
    #[wasm_bindgen(js_name = onEvent)]
    pub fn on_event(&self, callback: Function) {
        self.session.set_callback(Some(callback));
    }

    /// Retry a play request now (hosts that run their own timers)
    #[wasm_bindgen(js_name = retryPlay)]
    pub fn retry_play(&self, token: f64) -> Result<(), JsValue> {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let token = PlayRequestId(token as u64);
        self.run(|c| c.on_retry_timer(token))
    }

    /// End the session and release every object URL
    pub fn shutdown(&mut self) -> Result<(), JsValue> {
        self.detach_listeners();
        self.run(TransportController::shutdown)
    }
}

impl WasmPlayer {
    fn run<T>(&self, f: impl FnOnce(&mut TransportController) -> T) -> Result<T, JsValue> {
        let result = self.session.with_controller(f)?;
        dispatch(&self.session);
        Ok(result)
    }

    fn attach_listeners(&mut self) -> Result<(), JsValue> {
        for (name, handler) in MEDIA_EVENTS {
            let weak = Rc::downgrade(&self.session);
            let element = self.element.clone();
            let closure = Closure::<dyn FnMut()>::new(move || {
                if let Some(session) = weak.upgrade() {
                    deliver(&session, |controller| handler(controller, &element));
                }
            });
            self.element
                .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
            self.listeners.push((name, closure));
        }
        Ok(())
    }

    fn detach_listeners(&mut self) {
        for (name, closure) in self.listeners.drain(..) {
            if let Err(e) = self
                .element
                .remove_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
            {
                web_sys::console::warn_1(&e);
            }
        }
    }
}

impl Drop for WasmPlayer {
    fn drop(&mut self) {
        self.detach_listeners();
    }
}

fn to_js(error: PlaybackError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn serialize_error(error: serde_wasm_bindgen::Error) -> JsValue {
    JsValue::from_str(&format!("Serialization error: {}", error))
}
