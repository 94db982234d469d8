//! WASM bindings for aria-playback
//!
//! Binds the transport controller to an `HTMLAudioElement` and the Web Audio
//! engine, and exposes it to JavaScript as `WasmPlayer`. Media events and play
//! promise outcomes are routed back into the controller; player events are
//! forwarded to a single JS callback after every call.

mod media;
mod player;
mod session;

pub use media::{UrlReleaser, WebMediaElement};
pub use player::WasmPlayer;
