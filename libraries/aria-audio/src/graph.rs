//! Declarative processing graph
//!
//! The graph is described as data (nodes keyed by role plus edges between
//! roles) and realized by [`apply_graph`]. [`teardown_graph`] walks the same
//! node list, so every node created by a build gets exactly one disconnect and
//! one release.
//!
//! Topology:
//!
//! ```text
//! source -> eq[0..10] -> bass -> analyser -> master -> (panner) -> destination
//!                         |                    ^
//!                         +-> reverbSend -> reverb
//!                         |                    |
//!                         +-> echoSend -> delay +
//!                                        ^   |
//!                                        +-- feedback
//! ```

use crate::engine::{AudioEngine, ElementId, Endpoint, FilterKind, NodeId, NodeSpec, PannerOptions};
use crate::error::Result;
use crate::impulse::ImpulseResponse;
use crate::presets::{band_kind, EQ_FREQUENCIES, EQ_Q};
use aria_core::{AudioEffects, AudioSettings, EqualizerSettings, EQ_BAND_COUNT};

/// Position of a node in the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRole {
    Source,
    EqBand(usize),
    BassShelf,
    Analyser,
    Master,
    ReverbSend,
    Reverb,
    EchoSend,
    Delay,
    DelayFeedback,
    Panner,
}

/// Fixed graph parameters
#[derive(Debug, Clone, PartialEq)]
pub struct GraphConfig {
    /// Length of the synthetic reverb tail (seconds)
    pub impulse_seconds: f32,

    /// Echo delay time (seconds)
    pub echo_delay: f32,

    /// Echo feedback gain (0-1)
    pub echo_feedback: f32,

    /// Bass shelf corner frequency (Hz)
    pub bass_frequency: f32,

    /// Bass shelf gain per percent of bass boost (dB)
    pub bass_db_per_percent: f32,

    /// Analysis transform size
    pub fft_size: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            impulse_seconds: 2.0,
            echo_delay: 0.3,
            echo_feedback: 0.3,
            bass_frequency: 200.0,
            bass_db_per_percent: 0.2,
            fft_size: 256,
        }
    }
}

impl GraphConfig {
    /// Bass shelf gain for a bass-boost amount (0-100)
    pub fn bass_gain_db(&self, bass_boost: f32) -> f32 {
        bass_boost * self.bass_db_per_percent
    }
}

/// Linear send gain for an effect amount (0-100)
pub fn send_gain(amount: f32) -> f32 {
    (amount / 100.0).clamp(0.0, 1.0)
}

/// A node to create
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDecl {
    pub role: NodeRole,
    pub spec: NodeSpec,
}

/// Connection target in a description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Role(NodeRole),
    Destination,
}

/// A connection to make
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeRole,
    pub to: Target,
}

impl Edge {
    fn new(from: NodeRole, to: NodeRole) -> Self {
        Self {
            from,
            to: Target::Role(to),
        }
    }
}

/// Nodes and edges of one graph
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDescription {
    nodes: Vec<NodeDecl>,
    edges: Vec<Edge>,
}

impl GraphDescription {
    /// The standard player graph for `element`, seeded with `settings`
    pub fn standard(
        element: ElementId,
        settings: &AudioSettings,
        config: &GraphConfig,
        impulse: ImpulseResponse,
    ) -> Self {
        let effects = &settings.effects;
        let mut nodes = Vec::with_capacity(EQ_BAND_COUNT + 10);

        nodes.push(NodeDecl {
            role: NodeRole::Source,
            spec: NodeSpec::MediaSource { element },
        });

        for (index, frequency) in EQ_FREQUENCIES.iter().enumerate() {
            nodes.push(NodeDecl {
                role: NodeRole::EqBand(index),
                spec: NodeSpec::Biquad {
                    kind: band_kind(index),
                    frequency: *frequency,
                    q: EQ_Q,
                    gain_db: settings.equalizer.effective_gain(index),
                },
            });
        }

        nodes.extend([
            NodeDecl {
                role: NodeRole::BassShelf,
                spec: NodeSpec::Biquad {
                    kind: FilterKind::LowShelf,
                    frequency: config.bass_frequency,
                    q: EQ_Q,
                    gain_db: config.bass_gain_db(effects.bass_boost),
                },
            },
            NodeDecl {
                role: NodeRole::Analyser,
                spec: NodeSpec::Analyser {
                    fft_size: config.fft_size,
                },
            },
            NodeDecl {
                role: NodeRole::Master,
                spec: NodeSpec::Gain { gain: 1.0 },
            },
            NodeDecl {
                role: NodeRole::ReverbSend,
                spec: NodeSpec::Gain {
                    gain: send_gain(effects.reverb),
                },
            },
            NodeDecl {
                role: NodeRole::Reverb,
                spec: NodeSpec::Convolver { impulse },
            },
            NodeDecl {
                role: NodeRole::EchoSend,
                spec: NodeSpec::Gain {
                    gain: send_gain(effects.echo),
                },
            },
            NodeDecl {
                role: NodeRole::Delay,
                spec: NodeSpec::Delay {
                    max_delay: f64::from(config.echo_delay.max(1.0)),
                    delay_time: config.echo_delay,
                },
            },
            NodeDecl {
                role: NodeRole::DelayFeedback,
                spec: NodeSpec::Gain {
                    gain: config.echo_feedback,
                },
            },
            NodeDecl {
                role: NodeRole::Panner,
                spec: NodeSpec::Panner(PannerOptions::default()),
            },
        ]);

        // Series chain
        let mut edges = Vec::new();
        let mut previous = NodeRole::Source;
        for index in 0..EQ_BAND_COUNT {
            edges.push(Edge::new(previous, NodeRole::EqBand(index)));
            previous = NodeRole::EqBand(index);
        }
        edges.push(Edge::new(previous, NodeRole::BassShelf));
        edges.push(Edge::new(NodeRole::BassShelf, NodeRole::Analyser));
        edges.push(Edge::new(NodeRole::Analyser, NodeRole::Master));

        // Reverb send/return
        edges.push(Edge::new(NodeRole::BassShelf, NodeRole::ReverbSend));
        edges.push(Edge::new(NodeRole::ReverbSend, NodeRole::Reverb));
        edges.push(Edge::new(NodeRole::Reverb, NodeRole::Master));

        // Echo send/return with feedback loop
        edges.push(Edge::new(NodeRole::BassShelf, NodeRole::EchoSend));
        edges.push(Edge::new(NodeRole::EchoSend, NodeRole::Delay));
        edges.push(Edge::new(NodeRole::Delay, NodeRole::DelayFeedback));
        edges.push(Edge::new(NodeRole::DelayFeedback, NodeRole::Delay));
        edges.push(Edge::new(NodeRole::Delay, NodeRole::Master));

        edges.extend(output_edges(effects.spatial_audio));

        Self { nodes, edges }
    }

    /// Nodes in creation order
    pub fn nodes(&self) -> &[NodeDecl] {
        &self.nodes
    }

    /// Edges in connection order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
}

/// Edges from the master bus to the output, with or without the panner spliced in
pub fn output_edges(spatial: bool) -> Vec<Edge> {
    if spatial {
        vec![
            Edge::new(NodeRole::Master, NodeRole::Panner),
            Edge {
                from: NodeRole::Panner,
                to: Target::Destination,
            },
        ]
    } else {
        vec![Edge {
            from: NodeRole::Master,
            to: Target::Destination,
        }]
    }
}

/// Engine node ids of a realized graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltGraph {
    nodes: Vec<(NodeRole, NodeId)>,
}

impl BuiltGraph {
    /// Node id for a role
    pub fn node(&self, role: NodeRole) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, id)| *id)
    }

    /// Every node in creation order
    pub fn nodes(&self) -> &[(NodeRole, NodeId)] {
        &self.nodes
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing was created
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn endpoint(&self, target: Target) -> Option<Endpoint> {
        match target {
            Target::Destination => Some(Endpoint::Destination),
            Target::Role(role) => self.node(role).map(Endpoint::Node),
        }
    }
}

/// Create every node and make every connection of `description`
///
/// On failure everything created so far is torn down before the error is returned.
pub fn apply_graph(
    engine: &mut dyn AudioEngine,
    description: &GraphDescription,
) -> Result<BuiltGraph> {
    let mut built = BuiltGraph::default();

    for decl in description.nodes() {
        match engine.create_node(&decl.spec) {
            Ok(id) => built.nodes.push((decl.role, id)),
            Err(e) => {
                tracing::warn!(
                    "Failed to create {} node for {:?}: {}",
                    decl.spec.kind_name(),
                    decl.role,
                    e
                );
                teardown_graph(engine, &mut built);
                return Err(e);
            }
        }
    }

    if let Err(e) = connect_edges(engine, &built, description.edges()) {
        teardown_graph(engine, &mut built);
        return Err(e);
    }

    tracing::debug!(
        "Processing graph built: {} nodes, {} connections",
        built.len(),
        description.edges().len()
    );
    Ok(built)
}

/// Make a list of connections on an existing graph
pub fn connect_edges(engine: &mut dyn AudioEngine, built: &BuiltGraph, edges: &[Edge]) -> Result<()> {
    for edge in edges {
        let (Some(from), Some(to)) = (built.node(edge.from), built.endpoint(edge.to)) else {
            tracing::warn!("Skipping edge with unbuilt endpoint: {:?}", edge);
            continue;
        };
        engine.connect(from, to)?;
    }
    Ok(())
}

/// Disconnect and release every node of a graph, leaving it empty
///
/// Each node is disconnected exactly once. Safe on an empty graph.
pub fn teardown_graph(engine: &mut dyn AudioEngine, built: &mut BuiltGraph) {
    for (role, id) in built.nodes.drain(..).rev() {
        if let Err(e) = engine.disconnect(id) {
            tracing::warn!("Failed to disconnect {:?} node: {}", role, e);
        }
        engine.release(id);
    }
}

/// Gain every equalizer band should currently have
pub fn equalizer_gains(settings: &EqualizerSettings) -> [f32; EQ_BAND_COUNT] {
    std::array::from_fn(|index| settings.effective_gain(index))
}

/// Reverb and echo send gains for a set of effect amounts
pub fn send_gains(effects: &AudioEffects) -> (f32, f32) {
    (send_gain(effects.reverb), send_gain(effects.echo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn description(settings: &AudioSettings) -> GraphDescription {
        let mut rng = StdRng::seed_from_u64(0);
        let ir = ImpulseResponse::synthetic(8000.0, 0.1, 2, &mut rng);
        GraphDescription::standard(ElementId(1), settings, &GraphConfig::default(), ir)
    }

    #[test]
    fn every_role_is_declared_once() {
        let desc = description(&AudioSettings::default());
        let roles: HashSet<NodeRole> = desc.nodes().iter().map(|n| n.role).collect();

        assert_eq!(roles.len(), desc.nodes().len());
        assert_eq!(desc.nodes().len(), EQ_BAND_COUNT + 10);
        assert_eq!(desc.nodes()[0].role, NodeRole::Source);
    }

    #[test]
    fn every_edge_names_declared_roles() {
        let desc = description(&AudioSettings::default());
        let roles: HashSet<NodeRole> = desc.nodes().iter().map(|n| n.role).collect();

        for edge in desc.edges() {
            assert!(roles.contains(&edge.from));
            if let Target::Role(to) = edge.to {
                assert!(roles.contains(&to));
            }
        }
    }

    #[test]
    fn panner_only_routed_when_spatial() {
        let mut settings = AudioSettings::default();
        let desc = description(&settings);
        assert!(desc
            .edges()
            .contains(&Edge { from: NodeRole::Master, to: Target::Destination }));
        assert!(!desc.edges().iter().any(|e| e.from == NodeRole::Panner));

        settings.effects.spatial_audio = true;
        let desc = description(&settings);
        assert!(desc.edges().contains(&Edge::new(NodeRole::Master, NodeRole::Panner)));
        assert!(!desc
            .edges()
            .contains(&Edge { from: NodeRole::Master, to: Target::Destination }));
    }

    #[test]
    fn initial_values_follow_settings() {
        let mut settings = AudioSettings::default();
        settings.effects.reverb = 50.0;
        settings.effects.bass_boost = 60.0;
        settings.equalizer.enabled = true;
        settings.equalizer.bands[4] = 3.0;

        let desc = description(&settings);
        let spec = |role| {
            desc.nodes()
                .iter()
                .find(|n| n.role == role)
                .map(|n| n.spec.clone())
                .unwrap()
        };

        assert_eq!(spec(NodeRole::ReverbSend), NodeSpec::Gain { gain: 0.5 });
        assert_eq!(spec(NodeRole::EchoSend), NodeSpec::Gain { gain: 0.0 });
        assert!(matches!(
            spec(NodeRole::BassShelf),
            NodeSpec::Biquad { gain_db, frequency, .. } if (gain_db - 12.0).abs() < 1e-6 && frequency == 200.0
        ));
        assert!(matches!(
            spec(NodeRole::EqBand(4)),
            NodeSpec::Biquad { gain_db, kind: FilterKind::Peaking, .. } if gain_db == 3.0
        ));
    }

    #[test]
    fn send_gain_maps_percent() {
        assert_eq!(send_gain(0.0), 0.0);
        assert_eq!(send_gain(25.0), 0.25);
        assert_eq!(send_gain(100.0), 1.0);
        assert_eq!(send_gain(250.0), 1.0);
    }
}
