//! `HTMLAudioElement` adapter

use super::session::{deliver, SessionSlot};
use crate::error::{PlaybackError, Result};
use crate::media::{MediaElement, PlayRejection, PlayRequestId, ReadyState};
use aria_audio::ElementId;
use aria_core::ResourceReleaser;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{HtmlAudioElement, Url};

/// Media element backed by an `<audio>` element
///
/// Play promises are awaited on the local executor and their outcome is fed
/// back to the controller under the request id.
pub struct WebMediaElement {
    id: ElementId,
    element: HtmlAudioElement,
    session: SessionSlot,
}

impl WebMediaElement {
    pub(crate) fn new(id: ElementId, element: HtmlAudioElement, session: SessionSlot) -> Self {
        Self {
            id,
            element,
            session,
        }
    }
}

impl MediaElement for WebMediaElement {
    fn id(&self) -> ElementId {
        self.id
    }

    fn set_source(&mut self, url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(PlaybackError::element("empty source"));
        }
        self.element.set_src(url);
        Ok(())
    }

    fn play(&mut self, request: PlayRequestId) {
        let started = self.element.play();
        let slot = self.session.clone();
        spawn_local(async move {
            let outcome = match started {
                Ok(promise) => JsFuture::from(promise).await.map(|_| ()),
                Err(e) => Err(e),
            };
            let Some(session) = slot.borrow().upgrade() else {
                return;
            };
            deliver(&session, |controller| match outcome {
                Ok(()) => controller.on_play_resolved(request),
                Err(e) => controller.on_play_rejected(request, rejection_from_js(&e)),
            });
        });
    }

    fn pause(&mut self) {
        if let Err(e) = self.element.pause() {
            tracing::warn!("pause() failed: {}", js_message(&e));
        }
    }

    fn set_current_time(&mut self, seconds: f64) -> Result<()> {
        // The DOM setter throws on non-finite values
        if !seconds.is_finite() {
            return Err(PlaybackError::element(format!(
                "cannot seek to {}",
                seconds
            )));
        }
        self.element.set_current_time(seconds);
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.element.current_time()
    }

    fn duration(&self) -> f64 {
        self.element.duration()
    }

    fn ready_state(&self) -> ReadyState {
        ReadyState::from_code(self.element.ready_state())
    }

    fn is_ended(&self) -> bool {
        self.element.ended()
    }

    fn set_volume(&mut self, volume: f32) {
        self.element.set_volume(f64::from(volume));
    }

    fn set_playback_rate(&mut self, rate: f32) {
        self.element.set_playback_rate(f64::from(rate));
    }
}

/// Revokes object URLs created for uploads
#[derive(Debug, Default)]
pub struct UrlReleaser;

impl ResourceReleaser for UrlReleaser {
    fn release(&mut self, locator: &str) {
        if !locator.starts_with("blob:") {
            return;
        }
        if let Err(e) = Url::revoke_object_url(locator) {
            tracing::warn!("Failed to revoke {}: {}", locator, js_message(&e));
        }
    }
}

fn rejection_from_js(error: &JsValue) -> PlayRejection {
    PlayRejection::from_dom(&js_field(error, "name"), &js_message(error))
}

pub(crate) fn js_message(error: &JsValue) -> String {
    error
        .as_string()
        .unwrap_or_else(|| js_field(error, "message"))
}

fn js_field(value: &JsValue, field: &str) -> String {
    js_sys::Reflect::get(value, &JsValue::from_str(field))
        .ok()
        .and_then(|v| v.as_string())
        .unwrap_or_default()
}
