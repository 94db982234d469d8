//! Visualizer feed
//!
//! A read-only, pull-based view of the analysis node. The handle holds a weak
//! reference to the live tap, so it goes quiet on its own once the graph it was
//! taken from is torn down.

use crate::engine::{AudioEngine, NodeId};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Engine shared between the graph manager and analysis readers
pub type SharedEngine = Rc<RefCell<Box<dyn AudioEngine>>>;

/// Live analysis point owned by a graph session
pub(crate) struct AnalysisTap {
    engine: SharedEngine,
    node: NodeId,
    fft_size: u32,
}

impl AnalysisTap {
    pub(crate) fn new(engine: SharedEngine, node: NodeId, fft_size: u32) -> Self {
        Self {
            engine,
            node,
            fft_size,
        }
    }
}

/// Reader for the current analysis snapshot
#[derive(Clone, Default)]
pub struct AnalysisHandle {
    tap: Weak<AnalysisTap>,
}

impl std::fmt::Debug for AnalysisHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisHandle")
            .field("live", &self.is_live())
            .finish()
    }
}

impl AnalysisHandle {
    pub(crate) fn new(tap: &Rc<AnalysisTap>) -> Self {
        Self {
            tap: Rc::downgrade(tap),
        }
    }

    /// A handle that never yields data (no graph, or passthrough)
    pub fn detached() -> Self {
        Self::default()
    }

    /// Whether the graph this handle was taken from still exists
    pub fn is_live(&self) -> bool {
        self.tap.strong_count() > 0
    }

    /// Number of frequency bins (half the transform size), 0 when detached
    pub fn frequency_bin_count(&self) -> usize {
        self.tap
            .upgrade()
            .map_or(0, |tap| (tap.fft_size / 2) as usize)
    }

    /// Copy the current magnitude spectrum into `out`
    ///
    /// Returns the number of bins written; 0 when detached or when the engine
    /// is busy.
    pub fn frequency_data(&self, out: &mut [u8]) -> usize {
        self.read(out, |engine, node, out| engine.frequency_data(node, out))
    }

    /// Copy the current waveform into `out`
    pub fn time_domain_data(&self, out: &mut [u8]) -> usize {
        self.read(out, |engine, node, out| engine.time_domain_data(node, out))
    }

    /// Convenience: a freshly allocated spectrum snapshot
    pub fn spectrum(&self) -> Vec<u8> {
        let mut bins = vec![0; self.frequency_bin_count()];
        let written = self.frequency_data(&mut bins);
        bins.truncate(written);
        bins
    }

    fn read(
        &self,
        out: &mut [u8],
        f: impl FnOnce(&dyn AudioEngine, NodeId, &mut [u8]) -> crate::Result<usize>,
    ) -> usize {
        let Some(tap) = self.tap.upgrade() else {
            return 0;
        };
        let Ok(engine) = tap.engine.try_borrow() else {
            return 0;
        };

        match f(engine.as_ref(), tap.node, out) {
            Ok(written) => written,
            Err(e) => {
                tracing::debug!("Analysis read failed: {}", e);
                0
            }
        }
    }
}
