//! Web Audio backend
//!
//! Implements [`AudioEngine`] on a browser `AudioContext`. Media elements are
//! registered with the factory under the [`ElementId`] the host uses for them.
//!
//! The browser never lets an element be captured twice, even after its source
//! node is disconnected, so source nodes are cached per element and reused by
//! later graphs. A released source is wired straight to the destination so the
//! element stays audible without processing.

use crate::engine::{
    AudioEngine, DistanceModel, ElementId, Endpoint, EngineFactory, FilterKind, NodeId, NodeSpec,
    PannerOptions, PanningModel, Param,
};
use crate::error::{GraphError, Result};
use crate::impulse::ImpulseResponse;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use wasm_bindgen::JsValue;
use web_sys::{
    AnalyserNode, AudioContext, AudioContextState, AudioNode, BiquadFilterNode, BiquadFilterType,
    ConvolverNode, DelayNode, DistanceModelType, GainNode, HtmlMediaElement,
    MediaElementAudioSourceNode, PannerNode, PanningModelType,
};

fn js_err(e: JsValue) -> GraphError {
    GraphError::engine(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
}

enum WebNode {
    Source {
        element: ElementId,
        node: MediaElementAudioSourceNode,
    },
    Biquad(BiquadFilterNode),
    Gain(GainNode),
    Convolver(ConvolverNode),
    Delay(DelayNode),
    Panner(PannerNode),
    Analyser(AnalyserNode),
}

impl WebNode {
    fn audio_node(&self) -> &AudioNode {
        match self {
            Self::Source { node, .. } => node,
            Self::Biquad(n) => n,
            Self::Gain(n) => n,
            Self::Convolver(n) => n,
            Self::Delay(n) => n,
            Self::Panner(n) => n,
            Self::Analyser(n) => n,
        }
    }
}

/// Registry of media elements the engine may capture
pub type ElementRegistry = Rc<RefCell<HashMap<ElementId, HtmlMediaElement>>>;

/// [`AudioEngine`] over a browser `AudioContext`
pub struct WebAudioEngine {
    context: AudioContext,
    elements: ElementRegistry,
    sources: HashMap<ElementId, MediaElementAudioSourceNode>,
    nodes: HashMap<NodeId, WebNode>,
    next_id: u32,
}

impl WebAudioEngine {
    /// Create a new context
    pub fn new(elements: ElementRegistry) -> Result<Self> {
        let context = AudioContext::new().map_err(js_err)?;
        Ok(Self {
            context,
            elements,
            sources: HashMap::new(),
            nodes: HashMap::new(),
            next_id: 0,
        })
    }

    fn node(&self, id: NodeId) -> Result<&WebNode> {
        self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))
    }

    fn source_for(&mut self, element: ElementId) -> Result<MediaElementAudioSourceNode> {
        let live = self.nodes.values().any(
            |n| matches!(n, WebNode::Source { element: e, .. } if *e == element),
        );
        if live {
            return Err(GraphError::TapExists(element));
        }

        if let Some(source) = self.sources.get(&element) {
            // Cached from an earlier graph; drop its passthrough wiring
            source.disconnect().map_err(js_err)?;
            return Ok(source.clone());
        }

        let media = self
            .elements
            .borrow()
            .get(&element)
            .cloned()
            .ok_or_else(|| GraphError::engine(format!("element {:?} not registered", element)))?;
        let source = self
            .context
            .create_media_element_source(&media)
            .map_err(js_err)?;
        self.sources.insert(element, source.clone());
        Ok(source)
    }

    fn create_biquad(&self, kind: FilterKind, frequency: f32, q: f32, gain_db: f32) -> Result<BiquadFilterNode> {
        let filter = self.context.create_biquad_filter().map_err(js_err)?;
        filter.set_type(match kind {
            FilterKind::LowShelf => BiquadFilterType::Lowshelf,
            FilterKind::Peaking => BiquadFilterType::Peaking,
            FilterKind::HighShelf => BiquadFilterType::Highshelf,
        });
        filter.frequency().set_value(frequency);
        filter.q().set_value(q);
        filter.gain().set_value(gain_db);
        Ok(filter)
    }

    fn create_convolver(&self, impulse: &ImpulseResponse) -> Result<ConvolverNode> {
        let convolver = self.context.create_convolver().map_err(js_err)?;
        let buffer = self
            .context
            .create_buffer(
                impulse.channel_count() as u32,
                impulse.len() as u32,
                self.context.sample_rate(),
            )
            .map_err(js_err)?;
        for channel in 0..impulse.channel_count() {
            if let Some(samples) = impulse.channel(channel) {
                buffer
                    .copy_to_channel(samples, channel as i32)
                    .map_err(js_err)?;
            }
        }
        convolver.set_buffer(Some(&buffer));
        Ok(convolver)
    }

    fn create_panner(&self, options: &PannerOptions) -> Result<PannerNode> {
        let panner = self.context.create_panner().map_err(js_err)?;
        panner.set_panning_model(match options.panning_model {
            PanningModel::EqualPower => PanningModelType::Equalpower,
            PanningModel::Hrtf => PanningModelType::Hrtf,
        });
        panner.set_distance_model(match options.distance_model {
            DistanceModel::Linear => DistanceModelType::Linear,
            DistanceModel::Inverse => DistanceModelType::Inverse,
            DistanceModel::Exponential => DistanceModelType::Exponential,
        });
        panner.set_ref_distance(options.ref_distance);
        panner.set_max_distance(options.max_distance);
        panner.set_rolloff_factor(options.rolloff_factor);
        panner.set_cone_inner_angle(options.cone_inner_angle);
        panner.set_cone_outer_angle(options.cone_outer_angle);
        panner.set_cone_outer_gain(options.cone_outer_gain);
        let [x, y, z] = options.position;
        panner.position_x().set_value(x);
        panner.position_y().set_value(y);
        panner.position_z().set_value(z);
        Ok(panner)
    }
}

impl AudioEngine for WebAudioEngine {
    fn sample_rate(&self) -> f32 {
        self.context.sample_rate()
    }

    fn create_node(&mut self, spec: &NodeSpec) -> Result<NodeId> {
        let node = match spec {
            NodeSpec::MediaSource { element } => WebNode::Source {
                element: *element,
                node: self.source_for(*element)?,
            },
            NodeSpec::Biquad {
                kind,
                frequency,
                q,
                gain_db,
            } => WebNode::Biquad(self.create_biquad(*kind, *frequency, *q, *gain_db)?),
            NodeSpec::Gain { gain } => {
                let node = self.context.create_gain().map_err(js_err)?;
                node.gain().set_value(*gain);
                WebNode::Gain(node)
            }
            NodeSpec::Convolver { impulse } => WebNode::Convolver(self.create_convolver(impulse)?),
            NodeSpec::Delay {
                max_delay,
                delay_time,
            } => {
                let node = self
                    .context
                    .create_delay_with_max_delay_time(*max_delay)
                    .map_err(js_err)?;
                node.delay_time().set_value(*delay_time);
                WebNode::Delay(node)
            }
            NodeSpec::Panner(options) => WebNode::Panner(self.create_panner(options)?),
            NodeSpec::Analyser { fft_size } => {
                let node = self.context.create_analyser().map_err(js_err)?;
                node.set_fft_size(*fft_size);
                WebNode::Analyser(node)
            }
        };

        self.next_id += 1;
        let id = NodeId(self.next_id);
        self.nodes.insert(id, node);
        Ok(id)
    }

    fn connect(&mut self, from: NodeId, to: Endpoint) -> Result<()> {
        let source = self.node(from)?.audio_node();
        match to {
            Endpoint::Destination => {
                source
                    .connect_with_audio_node(&self.context.destination())
                    .map_err(js_err)?;
            }
            Endpoint::Node(target) => {
                source
                    .connect_with_audio_node(self.node(target)?.audio_node())
                    .map_err(js_err)?;
            }
        }
        Ok(())
    }

    fn disconnect(&mut self, node: NodeId) -> Result<()> {
        self.node(node)?.audio_node().disconnect().map_err(js_err)
    }

    fn set_param(&mut self, node: NodeId, param: Param) -> Result<()> {
        match (self.node(node)?, param) {
            (WebNode::Gain(n), Param::Gain(v)) => n.gain().set_value(v),
            (WebNode::Biquad(n), Param::Gain(v)) => n.gain().set_value(v),
            (WebNode::Biquad(n), Param::Frequency(v)) => n.frequency().set_value(v),
            (WebNode::Delay(n), Param::DelayTime(v)) => n.delay_time().set_value(v),
            (_, param) => {
                return Err(GraphError::UnsupportedParam {
                    node,
                    param: param.name(),
                })
            }
        }
        Ok(())
    }

    fn release(&mut self, node: NodeId) {
        if let Some(WebNode::Source { element, node }) = self.nodes.remove(&node) {
            if let Err(e) = node.connect_with_audio_node(&self.context.destination()) {
                tracing::warn!(
                    "Failed to restore direct output for element {:?}: {:?}",
                    element,
                    e
                );
            }
        }
    }

    fn frequency_data(&self, node: NodeId, out: &mut [u8]) -> Result<usize> {
        let WebNode::Analyser(analyser) = self.node(node)? else {
            return Err(GraphError::UnsupportedParam {
                node,
                param: "frequencyData",
            });
        };
        let bins = out.len().min(analyser.frequency_bin_count() as usize);
        analyser.get_byte_frequency_data(&mut out[..bins]);
        Ok(bins)
    }

    fn time_domain_data(&self, node: NodeId, out: &mut [u8]) -> Result<usize> {
        let WebNode::Analyser(analyser) = self.node(node)? else {
            return Err(GraphError::UnsupportedParam {
                node,
                param: "timeDomainData",
            });
        };
        let samples = out.len().min(analyser.fft_size() as usize);
        analyser.get_byte_time_domain_data(&mut out[..samples]);
        Ok(samples)
    }

    fn resume(&mut self) -> Result<()> {
        match self.context.state() {
            AudioContextState::Closed => Err(GraphError::Closed),
            AudioContextState::Suspended => {
                // Resolves asynchronously once the page has had a user gesture
                let _ = self.context.resume().map_err(js_err)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn close(&mut self) -> Result<()> {
        self.nodes.clear();
        self.sources.clear();
        let _ = self.context.close().map_err(js_err)?;
        Ok(())
    }
}

/// Creates a [`WebAudioEngine`] on first use
#[derive(Clone, Default)]
pub struct WebEngineFactory {
    elements: ElementRegistry,
}

impl WebEngineFactory {
    /// Create a factory with an empty element registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `element` available to graphs built for `id`
    pub fn register_element(&self, id: ElementId, element: HtmlMediaElement) {
        self.elements.borrow_mut().insert(id, element);
    }
}

impl EngineFactory for WebEngineFactory {
    fn create(&mut self) -> Result<Box<dyn AudioEngine>> {
        Ok(Box::new(WebAudioEngine::new(Rc::clone(&self.elements))?))
    }
}
