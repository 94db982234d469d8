//! Shared controller cell and event forwarding

use crate::controller::TransportController;
use crate::events::PlayerEvent;
use crate::media::PlayRequestId;
use js_sys::Function;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

/// Filled in once the session exists; media callbacks hold a clone
pub(crate) type SessionSlot = Rc<RefCell<Weak<Session>>>;

pub(crate) struct Session {
    controller: RefCell<TransportController>,
    on_event: RefCell<Option<Function>>,
}

impl Session {
    pub(crate) fn new(controller: TransportController) -> Rc<Self> {
        Rc::new(Self {
            controller: RefCell::new(controller),
            on_event: RefCell::new(None),
        })
    }

    pub(crate) fn set_callback(&self, callback: Option<Function>) {
        *self.on_event.borrow_mut() = callback;
    }

    /// Run `f` against the controller
    ///
    /// Re-entrant calls (a JS callback calling back in mid-update) are refused.
    pub(crate) fn with_controller<T>(
        &self,
        f: impl FnOnce(&mut TransportController) -> T,
    ) -> Result<T, JsValue> {
        let mut controller = self
            .controller
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("Player is busy"))?;
        Ok(f(&mut controller))
    }
}

/// Run `f` and forward the resulting events; failures are logged
pub(crate) fn deliver(session: &Rc<Session>, f: impl FnOnce(&mut TransportController)) {
    if session.with_controller(f).is_err() {
        tracing::warn!("Player busy; dropping media callback");
    }
    dispatch(session);
}

/// Forward pending events to JavaScript
///
/// The controller borrow is released before any JS runs.
pub(crate) fn dispatch(session: &Rc<Session>) {
    let Ok(events) = session.with_controller(TransportController::drain_events) else {
        return;
    };
    let callback = session.on_event.borrow().clone();

    for event in events {
        if let PlayerEvent::RetryScheduled { token, delay_ms } = event {
            schedule_retry(session, token, delay_ms);
        }

        let Some(callback) = &callback else {
            continue;
        };
        match serde_wasm_bindgen::to_value(&event) {
            Ok(value) => {
                if let Err(e) = callback.call1(&JsValue::NULL, &value) {
                    web_sys::console::warn_1(&e);
                }
            }
            Err(e) => tracing::warn!("Failed to serialize player event: {}", e),
        }
    }
}

fn schedule_retry(session: &Rc<Session>, token: PlayRequestId, delay_ms: u32) {
    let weak = Rc::downgrade(session);
    let callback = Closure::once_into_js(move || {
        if let Some(session) = weak.upgrade() {
            deliver(&session, |controller| controller.on_retry_timer(token));
        }
    });

    let Some(window) = web_sys::window() else {
        tracing::warn!("No window; play retry dropped");
        return;
    };
    let delay = i32::try_from(delay_ms).unwrap_or(i32::MAX);
    if let Err(e) = window
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), delay)
    {
        web_sys::console::warn_1(&e);
    }
}
