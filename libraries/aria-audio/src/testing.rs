//! Recording engine for tests
//!
//! An [`AudioEngine`] that performs no audio work but records every operation
//! and tracks the resulting topology, so tests can assert on wiring, parameter
//! values, and resource hygiene. It enforces the platform rule of one live
//! source tap per media element.
//!
//! Clones share state: keep one clone for inspection and hand another to the
//! graph manager through [`RecordingFactory`].

use crate::engine::{AudioEngine, ElementId, EngineFactory, Endpoint, NodeId, NodeSpec, Param};
use crate::error::{GraphError, Result};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::rc::Rc;

/// One recorded engine call
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOp {
    Create { node: NodeId, kind: &'static str },
    Connect { from: NodeId, to: Endpoint },
    Disconnect(NodeId),
    SetParam { node: NodeId, param: Param },
    Release(NodeId),
    Resume,
    Close,
}

#[derive(Default)]
struct RecordingState {
    next_id: u32,
    sample_rate: f32,
    ops: Vec<EngineOp>,
    live: BTreeMap<NodeId, NodeSpec>,
    connections: HashSet<(NodeId, Endpoint)>,
    params: HashMap<(NodeId, &'static str), f32>,
    taps: HashMap<ElementId, NodeId>,
    failing_params: HashSet<NodeId>,
    failing_kind: Option<&'static str>,
    resume_fails: bool,
    closed: bool,
}

/// Engine that records instead of rendering
#[derive(Clone)]
pub struct RecordingEngine {
    state: Rc<RefCell<RecordingState>>,
}

impl Default for RecordingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingEngine {
    /// Create a recording engine at 48 kHz
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(RecordingState {
                sample_rate: 48000.0,
                ..Default::default()
            })),
        }
    }

    // ===== Failure injection =====

    /// Make every `set_param` on `node` fail
    pub fn fail_params_on(&self, node: NodeId) {
        self.state.borrow_mut().failing_params.insert(node);
    }

    /// Make creation of nodes of this kind fail (see `NodeSpec::kind_name`)
    pub fn fail_create(&self, kind: &'static str) {
        self.state.borrow_mut().failing_kind = Some(kind);
    }

    /// Make `resume` fail
    pub fn set_resume_fails(&self, fails: bool) {
        self.state.borrow_mut().resume_fails = fails;
    }

    // ===== Inspection =====

    /// Every recorded operation
    pub fn ops(&self) -> Vec<EngineOp> {
        self.state.borrow().ops.clone()
    }

    /// Forget recorded operations (topology is kept)
    pub fn clear_ops(&self) {
        self.state.borrow_mut().ops.clear();
    }

    /// Number of nodes not yet released
    pub fn live_node_count(&self) -> usize {
        self.state.borrow().live.len()
    }

    /// Spec of a live node
    pub fn node_spec(&self, node: NodeId) -> Option<NodeSpec> {
        self.state.borrow().live.get(&node).cloned()
    }

    /// Number of live connections
    pub fn connection_count(&self) -> usize {
        self.state.borrow().connections.len()
    }

    /// Whether `from` currently feeds `to`
    pub fn is_connected(&self, from: NodeId, to: Endpoint) -> bool {
        self.state.borrow().connections.contains(&(from, to))
    }

    /// Current value of a parameter ("gain", "delayTime", "frequency")
    pub fn param(&self, node: NodeId, name: &str) -> Option<f32> {
        self.state
            .borrow()
            .params
            .iter()
            .find(|((n, p), _)| *n == node && *p == name)
            .map(|(_, v)| *v)
    }

    /// Number of live source taps
    pub fn tap_count(&self) -> usize {
        self.state.borrow().taps.len()
    }

    /// Whether `element` has a live source tap
    pub fn has_tap(&self, element: ElementId) -> bool {
        self.state.borrow().taps.contains_key(&element)
    }

    /// How many times `node` was disconnected
    pub fn disconnect_count(&self, node: NodeId) -> usize {
        self.count(|op| *op == EngineOp::Disconnect(node))
    }

    /// How many times `node` was released
    pub fn release_count(&self, node: NodeId) -> usize {
        self.count(|op| *op == EngineOp::Release(node))
    }

    /// How many nodes were ever created
    pub fn created_count(&self) -> usize {
        self.count(|op| matches!(op, EngineOp::Create { .. }))
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.state.borrow().closed
    }

    fn count(&self, pred: impl Fn(&EngineOp) -> bool) -> usize {
        self.state.borrow().ops.iter().filter(|op| pred(op)).count()
    }
}

fn initial_params(spec: &NodeSpec) -> Vec<(&'static str, f32)> {
    match spec {
        NodeSpec::Gain { gain } => vec![("gain", *gain)],
        NodeSpec::Biquad {
            frequency, gain_db, ..
        } => vec![("gain", *gain_db), ("frequency", *frequency)],
        NodeSpec::Delay { delay_time, .. } => vec![("delayTime", *delay_time)],
        _ => Vec::new(),
    }
}

fn accepts(spec: &NodeSpec, param: &Param) -> bool {
    matches!(
        (spec, param),
        (NodeSpec::Gain { .. } | NodeSpec::Biquad { .. }, Param::Gain(_))
            | (NodeSpec::Biquad { .. }, Param::Frequency(_))
            | (NodeSpec::Delay { .. }, Param::DelayTime(_))
    )
}

impl AudioEngine for RecordingEngine {
    fn sample_rate(&self) -> f32 {
        self.state.borrow().sample_rate
    }

    fn create_node(&mut self, spec: &NodeSpec) -> Result<NodeId> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(GraphError::Closed);
        }
        if state.failing_kind == Some(spec.kind_name()) {
            return Err(GraphError::engine(format!(
                "injected failure creating {}",
                spec.kind_name()
            )));
        }
        if let NodeSpec::MediaSource { element } = spec {
            if state.taps.contains_key(element) {
                return Err(GraphError::TapExists(*element));
            }
        }

        state.next_id += 1;
        let id = NodeId(state.next_id);

        if let NodeSpec::MediaSource { element } = spec {
            state.taps.insert(*element, id);
        }
        for (name, value) in initial_params(spec) {
            state.params.insert((id, name), value);
        }
        state.live.insert(id, spec.clone());
        state.ops.push(EngineOp::Create {
            node: id,
            kind: spec.kind_name(),
        });
        Ok(id)
    }

    fn connect(&mut self, from: NodeId, to: Endpoint) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.live.contains_key(&from) {
            return Err(GraphError::UnknownNode(from));
        }
        if let Endpoint::Node(target) = to {
            if !state.live.contains_key(&target) {
                return Err(GraphError::UnknownNode(target));
            }
        }
        state.connections.insert((from, to));
        state.ops.push(EngineOp::Connect { from, to });
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if !state.live.contains_key(&node) {
            return Err(GraphError::UnknownNode(node));
        }
        state.connections.retain(|(from, _)| *from != node);
        state.ops.push(EngineOp::Disconnect(node));
        Ok(())
    }

    fn set_param(&mut self, node: NodeId, param: Param) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let Some(spec) = state.live.get(&node) else {
            return Err(GraphError::UnknownNode(node));
        };
        if !accepts(spec, &param) {
            return Err(GraphError::UnsupportedParam {
                node,
                param: param.name(),
            });
        }
        if state.failing_params.contains(&node) {
            return Err(GraphError::engine("injected parameter failure"));
        }

        let value = match param {
            Param::Gain(v) | Param::DelayTime(v) | Param::Frequency(v) => v,
        };
        state.params.insert((node, param.name()), value);
        state.ops.push(EngineOp::SetParam { node, param });
        Ok(())
    }

    fn release(&mut self, node: NodeId) {
        let mut state = self.state.borrow_mut();
        if let Some(NodeSpec::MediaSource { element }) = state.live.remove(&node) {
            state.taps.remove(&element);
        }
        state.params.retain(|(n, _), _| *n != node);
        state.connections.retain(|(_, to)| *to != Endpoint::Node(node));
        state.ops.push(EngineOp::Release(node));
    }

    fn frequency_data(&self, node: NodeId, out: &mut [u8]) -> Result<usize> {
        let state = self.state.borrow();
        let Some(NodeSpec::Analyser { fft_size }) = state.live.get(&node) else {
            return Err(GraphError::UnknownNode(node));
        };
        let bins = out.len().min((*fft_size / 2) as usize);
        for (i, bin) in out.iter_mut().take(bins).enumerate() {
            *bin = ((i * 7) % 256) as u8;
        }
        Ok(bins)
    }

    fn time_domain_data(&self, node: NodeId, out: &mut [u8]) -> Result<usize> {
        let state = self.state.borrow();
        let Some(NodeSpec::Analyser { fft_size }) = state.live.get(&node) else {
            return Err(GraphError::UnknownNode(node));
        };
        let samples = out.len().min(*fft_size as usize);
        out[..samples].fill(128);
        Ok(samples)
    }

    fn resume(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.ops.push(EngineOp::Resume);
        if state.resume_fails {
            return Err(GraphError::engine("context is suspended"));
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state.borrow_mut();
        state.closed = true;
        state.ops.push(EngineOp::Close);
        Ok(())
    }
}

/// Factory handing out clones of one [`RecordingEngine`]
#[derive(Clone, Default)]
pub struct RecordingFactory {
    engine: RecordingEngine,
    unavailable: Option<String>,
    created: Rc<RefCell<usize>>,
}

impl RecordingFactory {
    /// Factory over `engine`
    pub fn new(engine: RecordingEngine) -> Self {
        Self {
            engine,
            unavailable: None,
            created: Rc::default(),
        }
    }

    /// Factory that always fails, as when the platform blocks audio
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            unavailable: Some(reason.into()),
            ..Self::default()
        }
    }

    /// How many engines were handed out
    pub fn created(&self) -> usize {
        *self.created.borrow()
    }
}

impl EngineFactory for RecordingFactory {
    fn create(&mut self) -> Result<Box<dyn AudioEngine>> {
        if let Some(reason) = &self.unavailable {
            return Err(GraphError::engine(reason.clone()));
        }
        *self.created.borrow_mut() += 1;
        Ok(Box::new(self.engine.clone()))
    }
}
