//! Test doubles for the transport
//!
//! [`FakeMediaElement`] performs no decoding; it records every command and lets
//! tests script what the element reports back (ready state, duration, ended,
//! failing seeks). Play outcomes are delivered by the test itself through the
//! controller's `on_play_resolved` / `on_play_rejected`, exactly as a host would.
//!
//! Clones share state: keep one clone for inspection and give another to the
//! controller.

use crate::error::{PlaybackError, Result};
use crate::media::{MediaElement, PlayRequestId, ReadyState};
use aria_audio::ElementId;
use aria_core::ResourceReleaser;
use std::cell::RefCell;
use std::rc::Rc;

/// One recorded media element command
#[derive(Debug, Clone, PartialEq)]
pub enum MediaCall {
    SetSource(String),
    Play(PlayRequestId),
    Pause,
    Seek(f64),
    Volume(f32),
    PlaybackRate(f32),
}

#[derive(Debug)]
struct FakeState {
    calls: Vec<MediaCall>,
    source: Option<String>,
    current_time: f64,
    duration: f64,
    ready_state: ReadyState,
    ended: bool,
    paused: bool,
    volume: f32,
    playback_rate: f32,
    fail_seeks: bool,
    fail_sources: bool,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            source: None,
            current_time: 0.0,
            duration: f64::NAN,
            ready_state: ReadyState::HaveEnoughData,
            ended: false,
            paused: true,
            volume: 1.0,
            playback_rate: 1.0,
            fail_seeks: false,
            fail_sources: false,
        }
    }
}

/// Scriptable media element
#[derive(Debug, Clone)]
pub struct FakeMediaElement {
    id: ElementId,
    state: Rc<RefCell<FakeState>>,
}

impl Default for FakeMediaElement {
    fn default() -> Self {
        Self::new(1)
    }
}

impl FakeMediaElement {
    pub fn new(id: u64) -> Self {
        Self {
            id: ElementId(id),
            state: Rc::default(),
        }
    }

    // ===== Inspection =====

    pub fn calls(&self) -> Vec<MediaCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Every play request issued so far, oldest first
    pub fn play_requests(&self) -> Vec<PlayRequestId> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|call| match call {
                MediaCall::Play(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn last_play_request(&self) -> Option<PlayRequestId> {
        self.play_requests().last().copied()
    }

    pub fn source(&self) -> Option<String> {
        self.state.borrow().source.clone()
    }

    pub fn volume(&self) -> f32 {
        self.state.borrow().volume
    }

    pub fn playback_rate(&self) -> f32 {
        self.state.borrow().playback_rate
    }

    pub fn is_paused(&self) -> bool {
        self.state.borrow().paused
    }

    pub fn position(&self) -> f64 {
        self.state.borrow().current_time
    }

    // ===== Scripting =====

    pub fn set_ready_state(&self, ready_state: ReadyState) {
        self.state.borrow_mut().ready_state = ready_state;
    }

    pub fn set_duration(&self, duration: f64) {
        self.state.borrow_mut().duration = duration;
    }

    /// Move the media clock without recording a seek
    pub fn set_position(&self, seconds: f64) {
        self.state.borrow_mut().current_time = seconds;
    }

    pub fn set_ended(&self, ended: bool) {
        self.state.borrow_mut().ended = ended;
    }

    pub fn fail_seeks(&self, fail: bool) {
        self.state.borrow_mut().fail_seeks = fail;
    }

    pub fn fail_sources(&self, fail: bool) {
        self.state.borrow_mut().fail_sources = fail;
    }
}

impl MediaElement for FakeMediaElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn set_source(&mut self, url: &str) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(MediaCall::SetSource(url.to_string()));
        if state.fail_sources {
            return Err(PlaybackError::element("source rejected"));
        }
        state.source = Some(url.to_string());
        state.current_time = 0.0;
        state.duration = f64::NAN;
        state.ended = false;
        state.paused = true;
        Ok(())
    }

    fn play(&mut self, request: PlayRequestId) {
        let mut state = self.state.borrow_mut();
        state.calls.push(MediaCall::Play(request));
        state.paused = false;
        state.ended = false;
    }

    fn pause(&mut self) {
        let mut state = self.state.borrow_mut();
        state.calls.push(MediaCall::Pause);
        state.paused = true;
    }

    fn set_current_time(&mut self, seconds: f64) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(MediaCall::Seek(seconds));
        if state.fail_seeks {
            return Err(PlaybackError::element("seek rejected"));
        }
        state.current_time = seconds;
        state.ended = false;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.state.borrow().current_time
    }

    fn duration(&self) -> f64 {
        self.state.borrow().duration
    }

    fn ready_state(&self) -> ReadyState {
        self.state.borrow().ready_state
    }

    fn is_ended(&self) -> bool {
        self.state.borrow().ended
    }

    fn set_volume(&mut self, volume: f32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(MediaCall::Volume(volume));
        state.volume = volume;
    }

    fn set_playback_rate(&mut self, rate: f32) {
        let mut state = self.state.borrow_mut();
        state.calls.push(MediaCall::PlaybackRate(rate));
        state.playback_rate = rate;
    }
}

/// Releaser that remembers what it was asked to release
#[derive(Debug, Clone, Default)]
pub struct RecordingReleaser {
    released: Rc<RefCell<Vec<String>>>,
}

impl RecordingReleaser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn released(&self) -> Vec<String> {
        self.released.borrow().clone()
    }

    /// How many times `locator` was released
    pub fn count(&self, locator: &str) -> usize {
        self.released
            .borrow()
            .iter()
            .filter(|released| released.as_str() == locator)
            .count()
    }
}

impl ResourceReleaser for RecordingReleaser {
    fn release(&mut self, locator: &str) {
        self.released.borrow_mut().push(locator.to_string());
    }
}
