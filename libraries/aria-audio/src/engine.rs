//! Audio engine abstraction
//!
//! The graph manager never talks to a platform audio API directly. It describes
//! nodes with [`NodeSpec`], wires them by [`NodeId`], and lets an [`AudioEngine`]
//! implementation do the real work (Web Audio in the browser, a recording fake
//! in tests).

use crate::error::Result;
use crate::impulse::ImpulseResponse;

/// Identity of a playable media element
///
/// Assigned by the host. Two ids compare equal only if they name the same element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u64);

/// Engine-assigned node handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// Biquad filter response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowShelf,
    Peaking,
    HighShelf,
}

/// Spatial panning algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanningModel {
    EqualPower,
    Hrtf,
}

/// Attenuation curve over distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceModel {
    Linear,
    Inverse,
    Exponential,
}

/// Spatial panner configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PannerOptions {
    pub panning_model: PanningModel,
    pub distance_model: DistanceModel,
    pub ref_distance: f64,
    pub max_distance: f64,
    pub rolloff_factor: f64,
    pub cone_inner_angle: f64,
    pub cone_outer_angle: f64,
    pub cone_outer_gain: f64,
    pub position: [f32; 3],
}

impl Default for PannerOptions {
    fn default() -> Self {
        Self {
            panning_model: PanningModel::Hrtf,
            distance_model: DistanceModel::Inverse,
            ref_distance: 1.0,
            max_distance: 10000.0,
            rolloff_factor: 1.0,
            cone_inner_angle: 360.0,
            cone_outer_angle: 0.0,
            cone_outer_gain: 0.0,
            position: [0.0, 0.0, 1.0],
        }
    }
}

/// Node to create
#[derive(Debug, Clone, PartialEq)]
pub enum NodeSpec {
    /// Capture point on a media element (at most one live per element)
    MediaSource { element: ElementId },

    /// Second-order filter; `gain_db` is ignored by responses without gain
    Biquad {
        kind: FilterKind,
        frequency: f32,
        q: f32,
        gain_db: f32,
    },

    /// Linear gain stage
    Gain { gain: f32 },

    /// Convolution reverb
    Convolver { impulse: ImpulseResponse },

    /// Delay line
    Delay { max_delay: f64, delay_time: f32 },

    /// Spatial panner
    Panner(PannerOptions),

    /// Frequency/time-domain analysis point
    Analyser { fft_size: u32 },
}

impl NodeSpec {
    /// Short kind name for logs
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::MediaSource { .. } => "media-source",
            Self::Biquad { .. } => "biquad",
            Self::Gain { .. } => "gain",
            Self::Convolver { .. } => "convolver",
            Self::Delay { .. } => "delay",
            Self::Panner(_) => "panner",
            Self::Analyser { .. } => "analyser",
        }
    }
}

/// Live-tunable node parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    /// Linear gain on a gain node, dB on a biquad
    Gain(f32),
    /// Delay time in seconds
    DelayTime(f32),
    /// Filter centre/corner frequency in Hz
    Frequency(f32),
}

impl Param {
    /// Parameter name for logs and errors
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gain(_) => "gain",
            Self::DelayTime(_) => "delayTime",
            Self::Frequency(_) => "frequency",
        }
    }
}

/// Connection target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Node(NodeId),
    /// The engine's output device
    Destination,
}

/// Platform audio engine
///
/// One engine lives for the whole session and may host several graphs over
/// time, one per media element.
pub trait AudioEngine {
    /// Engine sample rate in Hz
    fn sample_rate(&self) -> f32;

    /// Create a node
    fn create_node(&mut self, spec: &NodeSpec) -> Result<NodeId>;

    /// Connect a node output to another node or the destination
    fn connect(&mut self, from: NodeId, to: Endpoint) -> Result<()>;

    /// Remove every outgoing connection of a node
    fn disconnect(&mut self, node: NodeId) -> Result<()>;

    /// Update a parameter in place
    fn set_param(&mut self, node: NodeId, param: Param) -> Result<()>;

    /// Forget a node; it must not be used afterwards
    fn release(&mut self, node: NodeId);

    /// Copy the current magnitude spectrum (0-255 per bin) into `out`
    ///
    /// Returns the number of bins written.
    fn frequency_data(&self, node: NodeId, out: &mut [u8]) -> Result<usize>;

    /// Copy the current waveform (128 = silence) into `out`
    fn time_domain_data(&self, node: NodeId, out: &mut [u8]) -> Result<usize>;

    /// Resume a suspended engine
    fn resume(&mut self) -> Result<()>;

    /// Shut the engine down for good
    fn close(&mut self) -> Result<()>;
}

/// Creates the engine lazily on first graph build
pub trait EngineFactory {
    fn create(&mut self) -> Result<Box<dyn AudioEngine>>;
}
