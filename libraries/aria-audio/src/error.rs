//! Processing graph errors

use crate::engine::{ElementId, NodeId};
use thiserror::Error;

/// Result type alias using `GraphError`
pub type Result<T> = std::result::Result<T, GraphError>;

/// Failure of a single engine operation
///
/// These are local to parameter application and wiring; the graph manager logs
/// them and carries on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// The engine refused an operation
    #[error("Audio engine error: {0}")]
    Engine(String),

    /// The node id does not belong to this engine
    #[error("Unknown audio node: {0:?}")]
    UnknownNode(NodeId),

    /// A parameter does not apply to this kind of node
    #[error("Parameter {param} not supported by node {node:?}")]
    UnsupportedParam { node: NodeId, param: &'static str },

    /// The element already feeds a live source tap
    #[error("Media element {0:?} already has a source tap")]
    TapExists(ElementId),

    /// The engine was closed
    #[error("Audio engine is closed")]
    Closed,
}

impl GraphError {
    /// Create an engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }
}

/// Why the processing graph could not be built
///
/// Never fatal: playback continues without processing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphInitError {
    /// The platform allows one capture point per element
    #[error("Media element {0:?} is already routed through a processing graph")]
    SourceTapExists(ElementId),

    /// The audio engine could not be created or resumed
    #[error("Audio engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Wiring the graph failed part way; everything created was released
    #[error("Failed to build processing graph: {0}")]
    Build(#[from] GraphError),
}
