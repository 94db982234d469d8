//! Processing graph manager
//!
//! Owns the audio engine (created lazily on first build) and at most one graph
//! session, bound to one media element. Parameter updates are applied in place
//! and never rebuild; rebuilding only happens when the element is replaced.

use crate::analysis::{AnalysisHandle, AnalysisTap, SharedEngine};
use crate::engine::{AudioEngine, ElementId, EngineFactory, Endpoint, NodeId, Param};
use crate::error::{GraphError, GraphInitError};
use crate::graph::{
    apply_graph, connect_edges, equalizer_gains, output_edges, send_gains, teardown_graph,
    BuiltGraph, GraphConfig, GraphDescription, NodeRole,
};
use crate::impulse::ImpulseResponse;
use aria_core::{AudioEffects, AudioSettings, EqualizerSettings, EQ_BAND_COUNT};
use std::cell::RefCell;
use std::rc::Rc;

/// Outcome of a build
#[derive(Debug, Clone, PartialEq)]
pub enum GraphHandle {
    /// Audio flows through the processing graph
    Processing { element: ElementId },

    /// No processing; the element plays raw
    Passthrough {
        element: ElementId,
        reason: GraphInitError,
    },
}

impl GraphHandle {
    /// Element the handle belongs to
    pub fn element(&self) -> ElementId {
        match self {
            Self::Processing { element } | Self::Passthrough { element, .. } => *element,
        }
    }

    /// Whether processing is active
    pub fn is_processing(&self) -> bool {
        matches!(self, Self::Processing { .. })
    }

    /// Why the graph was not built, if it wasn't
    pub fn init_error(&self) -> Option<&GraphInitError> {
        match self {
            Self::Passthrough { reason, .. } => Some(reason),
            Self::Processing { .. } => None,
        }
    }
}

struct Session {
    element: ElementId,
    built: BuiltGraph,
    tap: Rc<AnalysisTap>,
    spatial: bool,
}

/// Lifecycle and live parameters of the processing graph
pub struct ProcessingGraph {
    factory: Box<dyn EngineFactory>,
    engine: Option<SharedEngine>,
    config: GraphConfig,
    session: Option<Session>,
    equalizer: EqualizerSettings,
    effects: AudioEffects,
}

impl ProcessingGraph {
    /// Create a manager; no engine exists until the first build
    pub fn new(factory: Box<dyn EngineFactory>, config: GraphConfig) -> Self {
        Self {
            factory,
            engine: None,
            config,
            session: None,
            equalizer: EqualizerSettings::default(),
            effects: AudioEffects::default(),
        }
    }

    // ===== Lifecycle =====

    /// Build the graph for `element` and seed it with `settings`
    ///
    /// Never fails outright: when the graph cannot be built the returned handle
    /// is `Passthrough` and playback carries on unprocessed.
    pub fn build(&mut self, element: ElementId, settings: &AudioSettings) -> GraphHandle {
        self.equalizer = settings.equalizer.clone();
        self.effects = settings.effects.clone();

        match self.try_build(element, settings) {
            Ok(()) => {
                tracing::info!("Processing graph active for element {:?}", element);
                GraphHandle::Processing { element }
            }
            Err(reason) => {
                tracing::warn!("Falling back to passthrough playback: {}", reason);
                GraphHandle::Passthrough { element, reason }
            }
        }
    }

    fn try_build(
        &mut self,
        element: ElementId,
        settings: &AudioSettings,
    ) -> Result<(), GraphInitError> {
        match self.session.as_ref().map(|s| s.element) {
            Some(current) if current == element => {
                return Err(GraphInitError::SourceTapExists(element));
            }
            Some(previous) => {
                tracing::warn!(
                    "Building for element {:?} while element {:?} still has a graph; tearing it down",
                    element,
                    previous
                );
                self.teardown();
            }
            None => {}
        }

        let engine = self.ensure_engine()?;
        let mut guard = engine
            .try_borrow_mut()
            .map_err(|_| GraphInitError::EngineUnavailable("engine is busy".to_string()))?;
        let engine_ref: &mut dyn AudioEngine = &mut **guard;

        engine_ref
            .resume()
            .map_err(|e| GraphInitError::EngineUnavailable(e.to_string()))?;

        let impulse = ImpulseResponse::synthetic(
            engine_ref.sample_rate(),
            self.config.impulse_seconds,
            2,
            &mut rand::thread_rng(),
        );
        let description = GraphDescription::standard(element, settings, &self.config, impulse);

        let mut built = apply_graph(engine_ref, &description).map_err(|e| match e {
            GraphError::TapExists(element) => GraphInitError::SourceTapExists(element),
            other => GraphInitError::Build(other),
        })?;

        let Some(analyser) = built.node(NodeRole::Analyser) else {
            teardown_graph(engine_ref, &mut built);
            return Err(GraphInitError::Build(GraphError::engine(
                "analysis node missing from graph",
            )));
        };
        drop(guard);

        let tap = Rc::new(AnalysisTap::new(
            Rc::clone(&engine),
            analyser,
            self.config.fft_size,
        ));
        self.session = Some(Session {
            element,
            built,
            tap,
            spatial: settings.effects.spatial_audio,
        });
        Ok(())
    }

    fn ensure_engine(&mut self) -> Result<SharedEngine, GraphInitError> {
        if let Some(engine) = &self.engine {
            return Ok(Rc::clone(engine));
        }

        let engine = self
            .factory
            .create()
            .map_err(|e| GraphInitError::EngineUnavailable(e.to_string()))?;
        tracing::debug!("Audio engine created at {} Hz", engine.sample_rate());

        let engine = Rc::new(RefCell::new(engine));
        self.engine = Some(Rc::clone(&engine));
        Ok(engine)
    }

    /// Disconnect and release every node of the current graph
    ///
    /// No-op when nothing is built. Outstanding analysis handles go stale.
    pub fn teardown(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };

        let released = session.built.len();
        let torn_down = self.with_engine(|engine| teardown_graph(engine, &mut session.built));
        if torn_down.is_none() {
            tracing::error!(
                "Audio engine unavailable during teardown of element {:?}",
                session.element
            );
        } else {
            tracing::debug!(
                "Processing graph for element {:?} torn down ({} nodes)",
                session.element,
                released
            );
        }
    }

    /// Resume a suspended engine (needs a user gesture on the web)
    ///
    /// No-op before the first build.
    pub fn resume(&mut self) {
        if let Some(Err(e)) = self.with_engine(|engine| engine.resume()) {
            tracing::warn!("Failed to resume audio engine: {}", e);
        }
    }

    /// Tear down the graph and close the engine
    pub fn shutdown(&mut self) {
        self.teardown();
        if let Some(engine) = self.engine.take() {
            match engine.try_borrow_mut() {
                Ok(mut engine) => {
                    if let Err(e) = engine.close() {
                        tracing::warn!("Failed to close audio engine: {}", e);
                    }
                }
                Err(_) => tracing::warn!("Audio engine busy at shutdown; dropping it"),
            }
        }
    }

    // ===== Queries =====

    /// Whether a graph is currently built
    pub fn has_graph(&self) -> bool {
        self.session.is_some()
    }

    /// Element the current graph is bound to
    pub fn element(&self) -> Option<ElementId> {
        self.session.as_ref().map(|s| s.element)
    }

    /// Engine node for a role in the current graph
    pub fn node(&self, role: NodeRole) -> Option<NodeId> {
        self.session.as_ref().and_then(|s| s.built.node(role))
    }

    /// Whether the panner is currently spliced into the output path
    pub fn is_spatial_routed(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.spatial)
    }

    /// Whether the engine has been created
    pub fn has_engine(&self) -> bool {
        self.engine.is_some()
    }

    /// Fixed graph parameters
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    /// Equalizer state last applied
    pub fn equalizer(&self) -> &EqualizerSettings {
        &self.equalizer
    }

    /// Effect state last applied
    pub fn effects(&self) -> &AudioEffects {
        &self.effects
    }

    /// Reader for the analysis node; detached when no graph is built
    pub fn tap_analysis(&self) -> AnalysisHandle {
        self.session
            .as_ref()
            .map_or_else(AnalysisHandle::detached, |s| AnalysisHandle::new(&s.tap))
    }

    // ===== Live parameters =====

    /// Push every equalizer and effect value to the graph
    ///
    /// Idempotent. Individual failures are logged and returned; the rest still apply.
    pub fn apply_settings(&mut self, settings: &AudioSettings) -> Vec<GraphError> {
        self.equalizer = settings.equalizer.clone();
        self.effects = settings.effects.clone();

        let mut failures = self.push_equalizer();
        failures.extend(self.push_effects());
        failures
    }

    /// Set one band's gain
    pub fn set_equalizer_band(&mut self, index: usize, gain_db: f32) -> Vec<GraphError> {
        if !self.equalizer.set_band(index, gain_db) {
            tracing::warn!("Ignoring gain for nonexistent equalizer band {}", index);
            return Vec::new();
        }
        let gain = self.equalizer.effective_gain(index);
        self.set_param(NodeRole::EqBand(index), Param::Gain(gain))
            .err()
            .into_iter()
            .collect()
    }

    /// Enable or bypass the equalizer without removing nodes
    pub fn set_equalizer_enabled(&mut self, enabled: bool) -> Vec<GraphError> {
        self.equalizer.enabled = enabled;
        self.push_equalizer()
    }

    /// Update effect amounts, splicing the panner in or out as needed
    pub fn set_effects(&mut self, effects: &AudioEffects) -> Vec<GraphError> {
        self.effects = effects.clone();
        self.push_effects()
    }

    fn push_equalizer(&self) -> Vec<GraphError> {
        let gains = equalizer_gains(&self.equalizer);
        (0..EQ_BAND_COUNT)
            .filter_map(|index| {
                self.set_param(NodeRole::EqBand(index), Param::Gain(gains[index]))
                    .err()
            })
            .collect()
    }

    fn push_effects(&mut self) -> Vec<GraphError> {
        let (reverb, echo) = send_gains(&self.effects);
        let bass = self.config.bass_gain_db(self.effects.bass_boost);

        let mut failures: Vec<GraphError> = [
            (NodeRole::ReverbSend, Param::Gain(reverb)),
            (NodeRole::EchoSend, Param::Gain(echo)),
            (NodeRole::BassShelf, Param::Gain(bass)),
        ]
        .into_iter()
        .filter_map(|(role, param)| self.set_param(role, param).err())
        .collect();

        if let Err(e) = self.route_spatial(self.effects.spatial_audio) {
            failures.push(e);
        }
        failures
    }

    fn set_param(&self, role: NodeRole, param: Param) -> Result<(), GraphError> {
        let Some(node) = self.node(role) else {
            return Ok(());
        };

        let result = self
            .with_engine(|engine| engine.set_param(node, param))
            .unwrap_or_else(|| Err(GraphError::engine("engine is busy")));

        if let Err(e) = &result {
            tracing::warn!("Failed to set {} on {:?}: {}", param.name(), role, e);
        }
        result
    }

    fn route_spatial(&mut self, spatial: bool) -> Result<(), GraphError> {
        let Some(session) = self.session.as_ref() else {
            return Ok(());
        };
        if session.spatial == spatial {
            return Ok(());
        }

        let (Some(master), Some(panner)) = (
            session.built.node(NodeRole::Master),
            session.built.node(NodeRole::Panner),
        ) else {
            return Ok(());
        };

        let built = session.built.clone();
        let result = self
            .with_engine(|engine| {
                engine.disconnect(master)?;
                engine.disconnect(panner)?;
                connect_edges(engine, &built, &output_edges(spatial))
            })
            .unwrap_or_else(|| Err(GraphError::engine("engine is busy")));

        match &result {
            Ok(()) => {
                tracing::debug!(
                    "Spatial panner {}",
                    if spatial { "spliced in" } else { "removed" }
                );
                if let Some(session) = self.session.as_mut() {
                    session.spatial = spatial;
                }
            }
            Err(e) => {
                tracing::warn!("Failed to reroute output: {}; restoring direct output", e);
                self.with_engine(|engine| {
                    let _ = engine.disconnect(master);
                    engine.connect(master, Endpoint::Destination)
                });
                if let Some(session) = self.session.as_mut() {
                    session.spatial = false;
                }
            }
        }
        result
    }

    fn with_engine<T>(&self, f: impl FnOnce(&mut dyn AudioEngine) -> T) -> Option<T> {
        let engine = self.engine.as_ref()?;
        let mut guard = engine.try_borrow_mut().ok()?;
        Some(f(&mut **guard))
    }
}

impl Drop for ProcessingGraph {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingEngine, RecordingFactory};

    fn manager() -> (ProcessingGraph, RecordingEngine) {
        let engine = RecordingEngine::new();
        let graph = ProcessingGraph::new(
            Box::new(RecordingFactory::new(engine.clone())),
            GraphConfig::default(),
        );
        (graph, engine)
    }

    #[test]
    fn engine_is_created_lazily() {
        let (mut graph, engine) = manager();
        assert!(!graph.has_engine());
        assert_eq!(engine.created_count(), 0);

        graph.build(ElementId(1), &AudioSettings::default());
        assert!(graph.has_engine());
        assert_eq!(engine.live_node_count(), EQ_BAND_COUNT + 10);
    }

    #[test]
    fn teardown_without_graph_is_noop() {
        let (mut graph, engine) = manager();
        graph.teardown();
        graph.teardown();
        assert!(engine.ops().is_empty());
    }

    #[test]
    fn second_build_for_same_element_is_passthrough() {
        let (mut graph, engine) = manager();
        let settings = AudioSettings::default();

        assert!(graph.build(ElementId(1), &settings).is_processing());
        let handle = graph.build(ElementId(1), &settings);

        assert_eq!(
            handle.init_error(),
            Some(&GraphInitError::SourceTapExists(ElementId(1)))
        );
        assert_eq!(engine.tap_count(), 1);
        assert!(graph.has_graph());
    }

    #[test]
    fn unavailable_engine_degrades() {
        let mut graph = ProcessingGraph::new(
            Box::new(RecordingFactory::unavailable("blocked")),
            GraphConfig::default(),
        );
        let handle = graph.build(ElementId(1), &AudioSettings::default());

        assert!(!handle.is_processing());
        assert!(matches!(
            handle.init_error(),
            Some(GraphInitError::EngineUnavailable(_))
        ));
        assert!(!graph.tap_analysis().is_live());
    }

    #[test]
    fn disabled_equalizer_is_flat_on_the_wire() {
        let (mut graph, engine) = manager();
        let mut settings = AudioSettings::default();
        settings.equalizer.bands = [6.0; EQ_BAND_COUNT];
        settings.equalizer.enabled = true;
        graph.build(ElementId(1), &settings);

        let band = graph.node(NodeRole::EqBand(2)).unwrap();
        assert_eq!(engine.param(band, "gain"), Some(6.0));

        assert!(graph.set_equalizer_enabled(false).is_empty());
        assert_eq!(engine.param(band, "gain"), Some(0.0));
        assert_eq!(engine.live_node_count(), EQ_BAND_COUNT + 10);
    }
}
