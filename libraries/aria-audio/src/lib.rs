//! Aria Player Audio
//!
//! Processing graph management for Aria Player: a ten-band equalizer, bass
//! shelf, reverb and echo sends, an optional spatial panner, and an analysis tap
//! that feeds visualizers.
//!
//! # Architecture
//!
//! - **Engine abstraction**: [`AudioEngine`] hides the platform API; the graph is
//!   described as data ([`graph::GraphDescription`]) and applied to an engine
//! - **Graph manager**: [`ProcessingGraph`] owns the engine and one graph
//!   session; parameters update in place, rebuilds only happen per element
//! - **Visualizer feed**: [`AnalysisHandle`] reads spectrum/waveform snapshots
//!   and goes stale when its graph is torn down
//! - **Web backend**: behind the `web` feature, [`web::WebAudioEngine`]
//!
//! # Example
//!
//! ```rust,ignore
//! use aria_audio::{ElementId, GraphConfig, ProcessingGraph};
//! use aria_core::AudioSettings;
//!
//! let mut graph = ProcessingGraph::new(Box::new(factory), GraphConfig::default());
//! let handle = graph.build(ElementId(1), &AudioSettings::default());
//! if !handle.is_processing() {
//!     // Playback continues unprocessed
//! }
//! let spectrum = graph.tap_analysis().spectrum();
//! ```

#![forbid(unsafe_code)]

pub mod analysis;
pub mod engine;
pub mod error;
pub mod graph;
pub mod impulse;
pub mod manager;
pub mod presets;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

#[cfg(feature = "web")]
pub mod web;

pub use analysis::{AnalysisHandle, SharedEngine};
pub use engine::{
    AudioEngine, DistanceModel, ElementId, Endpoint, EngineFactory, FilterKind, NodeId, NodeSpec,
    PannerOptions, PanningModel, Param,
};
pub use error::{GraphError, GraphInitError, Result};
pub use graph::{GraphConfig, NodeRole};
pub use impulse::ImpulseResponse;
pub use manager::{GraphHandle, ProcessingGraph};
pub use presets::{EqPreset, EQ_FREQUENCIES};
