//! Processing graph lifecycle tests against the recording engine

use aria_audio::testing::{EngineOp, RecordingEngine, RecordingFactory};
use aria_audio::{
    ElementId, Endpoint, EqPreset, GraphConfig, GraphInitError, NodeRole, ProcessingGraph,
};
use aria_core::{AudioEffects, AudioSettings, EQ_BAND_COUNT};
use proptest::prelude::*;

// ===== Helpers =====

fn setup() -> (ProcessingGraph, RecordingEngine) {
    let engine = RecordingEngine::new();
    let graph = ProcessingGraph::new(
        Box::new(RecordingFactory::new(engine.clone())),
        GraphConfig::default(),
    );
    (graph, engine)
}

fn effects(reverb: f32, echo: f32, bass_boost: f32, spatial_audio: bool) -> AudioEffects {
    AudioEffects {
        reverb,
        echo,
        bass_boost,
        spatial_audio,
    }
}

fn gain_of(graph: &ProcessingGraph, engine: &RecordingEngine, role: NodeRole) -> Option<f32> {
    engine.param(graph.node(role)?, "gain")
}

// ===== Build =====

#[test]
fn build_wires_series_chain_and_sends() {
    let (mut graph, engine) = setup();
    assert!(graph.build(ElementId(1), &AudioSettings::default()).is_processing());

    let node = |role| graph.node(role).unwrap();
    assert!(engine.is_connected(node(NodeRole::Source), Endpoint::Node(node(NodeRole::EqBand(0)))));
    for band in 1..EQ_BAND_COUNT {
        assert!(engine.is_connected(
            node(NodeRole::EqBand(band - 1)),
            Endpoint::Node(node(NodeRole::EqBand(band)))
        ));
    }
    assert!(engine.is_connected(
        node(NodeRole::EqBand(EQ_BAND_COUNT - 1)),
        Endpoint::Node(node(NodeRole::BassShelf))
    ));
    assert!(engine.is_connected(node(NodeRole::BassShelf), Endpoint::Node(node(NodeRole::Analyser))));
    assert!(engine.is_connected(node(NodeRole::Analyser), Endpoint::Node(node(NodeRole::Master))));

    // Sends are parallel to the dry path
    assert!(engine.is_connected(node(NodeRole::BassShelf), Endpoint::Node(node(NodeRole::ReverbSend))));
    assert!(engine.is_connected(node(NodeRole::Reverb), Endpoint::Node(node(NodeRole::Master))));
    assert!(engine.is_connected(node(NodeRole::Delay), Endpoint::Node(node(NodeRole::DelayFeedback))));
    assert!(engine.is_connected(node(NodeRole::DelayFeedback), Endpoint::Node(node(NodeRole::Delay))));

    // Panner exists but is not on the output path
    assert!(engine.is_connected(node(NodeRole::Master), Endpoint::Destination));
    assert!(!engine.is_connected(node(NodeRole::Master), Endpoint::Node(node(NodeRole::Panner))));
}

#[test]
fn build_seeds_parameters_from_settings() {
    let (mut graph, engine) = setup();
    let mut settings = AudioSettings::default();
    settings.equalizer.enabled = true;
    EqPreset::Rock.apply_to(&mut settings.equalizer);
    settings.effects = effects(50.0, 20.0, 40.0, false);

    graph.build(ElementId(1), &settings);

    let rock = EqPreset::Rock.gains();
    for (band, expected) in rock.iter().enumerate() {
        assert_eq!(gain_of(&graph, &engine, NodeRole::EqBand(band)), Some(*expected));
    }
    assert_eq!(gain_of(&graph, &engine, NodeRole::ReverbSend), Some(0.5));
    assert_eq!(gain_of(&graph, &engine, NodeRole::EchoSend), Some(0.2));
    assert_eq!(gain_of(&graph, &engine, NodeRole::BassShelf), Some(8.0));
    assert_eq!(gain_of(&graph, &engine, NodeRole::Master), Some(1.0));
}

#[test]
fn failed_build_releases_partial_graph() {
    let (mut graph, engine) = setup();
    engine.fail_create("panner");

    let handle = graph.build(ElementId(1), &AudioSettings::default());

    assert!(matches!(handle.init_error(), Some(GraphInitError::Build(_))));
    assert!(!graph.has_graph());
    assert_eq!(engine.live_node_count(), 0);
    assert_eq!(engine.tap_count(), 0);
}

#[test]
fn suspended_engine_falls_back_to_passthrough() {
    let (mut graph, engine) = setup();
    engine.set_resume_fails(true);

    let handle = graph.build(ElementId(1), &AudioSettings::default());

    assert!(matches!(
        handle.init_error(),
        Some(GraphInitError::EngineUnavailable(_))
    ));
    assert_eq!(engine.created_count(), 0);
}

// ===== Teardown =====

#[test]
fn teardown_disconnects_each_node_exactly_once() {
    let (mut graph, engine) = setup();
    graph.build(ElementId(1), &AudioSettings::default());

    let nodes: Vec<_> = (0..EQ_BAND_COUNT)
        .map(NodeRole::EqBand)
        .chain([
            NodeRole::Source,
            NodeRole::BassShelf,
            NodeRole::Analyser,
            NodeRole::Master,
            NodeRole::ReverbSend,
            NodeRole::Reverb,
            NodeRole::EchoSend,
            NodeRole::Delay,
            NodeRole::DelayFeedback,
            NodeRole::Panner,
        ])
        .map(|role| graph.node(role).unwrap())
        .collect();

    graph.teardown();
    graph.teardown();

    for node in nodes {
        assert_eq!(engine.disconnect_count(node), 1, "node {:?}", node);
        assert_eq!(engine.release_count(node), 1, "node {:?}", node);
    }
    assert_eq!(engine.live_node_count(), 0);
    assert_eq!(engine.connection_count(), 0);
    assert!(!graph.has_graph());
}

#[test]
fn rebuild_for_new_element_leaves_single_tap() {
    let (mut graph, engine) = setup();
    let settings = AudioSettings::default();

    assert!(graph.build(ElementId(1), &settings).is_processing());
    assert!(graph.build(ElementId(2), &settings).is_processing());

    assert_eq!(engine.tap_count(), 1);
    assert!(engine.has_tap(ElementId(2)));
    assert!(!engine.has_tap(ElementId(1)));
    assert_eq!(graph.element(), Some(ElementId(2)));
    assert_eq!(engine.live_node_count(), EQ_BAND_COUNT + 10);
}

#[test]
fn element_can_be_rebuilt_after_teardown() {
    let (mut graph, engine) = setup();
    let settings = AudioSettings::default();

    graph.build(ElementId(1), &settings);
    graph.teardown();
    assert!(graph.build(ElementId(1), &settings).is_processing());
    assert_eq!(engine.tap_count(), 1);
}

#[test]
fn shutdown_closes_engine_once() {
    let (mut graph, engine) = setup();
    graph.build(ElementId(1), &AudioSettings::default());

    graph.shutdown();
    graph.shutdown();

    let closes = engine.ops().iter().filter(|op| **op == EngineOp::Close).count();
    assert_eq!(closes, 1);
    assert!(engine.is_closed());
    assert_eq!(engine.live_node_count(), 0);
}

#[test]
fn dropping_manager_releases_graph() {
    let (mut graph, engine) = setup();
    graph.build(ElementId(1), &AudioSettings::default());
    drop(graph);

    assert_eq!(engine.live_node_count(), 0);
    assert_eq!(engine.tap_count(), 0);
}

// ===== Analysis =====

#[test]
fn analysis_handle_reads_while_graph_lives() {
    let (mut graph, _engine) = setup();
    graph.build(ElementId(1), &AudioSettings::default());

    let handle = graph.tap_analysis();
    assert!(handle.is_live());
    assert_eq!(handle.frequency_bin_count(), 128);

    let spectrum = handle.spectrum();
    assert_eq!(spectrum.len(), 128);
    assert_eq!(spectrum[1], 7);

    let mut waveform = [0u8; 256];
    assert_eq!(handle.time_domain_data(&mut waveform), 256);
    assert!(waveform.iter().all(|&s| s == 128));
}

#[test]
fn analysis_handle_goes_stale_after_teardown() {
    let (mut graph, _engine) = setup();
    graph.build(ElementId(1), &AudioSettings::default());
    let handle = graph.tap_analysis();

    graph.teardown();

    assert!(!handle.is_live());
    assert_eq!(handle.frequency_bin_count(), 0);
    assert!(handle.spectrum().is_empty());
    let mut out = [9u8; 16];
    assert_eq!(handle.frequency_data(&mut out), 0);
    assert_eq!(out, [9u8; 16]);
}

#[test]
fn analysis_handle_from_old_graph_does_not_follow_rebuild() {
    let (mut graph, _engine) = setup();
    let settings = AudioSettings::default();
    graph.build(ElementId(1), &settings);
    let old = graph.tap_analysis();

    graph.build(ElementId(2), &settings);

    assert!(!old.is_live());
    assert!(graph.tap_analysis().is_live());
}

// ===== Live parameters =====

#[test]
fn parameter_failure_does_not_abort_the_rest() {
    let (mut graph, engine) = setup();
    graph.build(ElementId(1), &AudioSettings::default());
    engine.fail_params_on(graph.node(NodeRole::ReverbSend).unwrap());

    let failures = graph.set_effects(&effects(80.0, 60.0, 50.0, false));

    assert_eq!(failures.len(), 1);
    assert_eq!(gain_of(&graph, &engine, NodeRole::ReverbSend), Some(0.0));
    assert_eq!(gain_of(&graph, &engine, NodeRole::EchoSend), Some(0.6));
    assert_eq!(gain_of(&graph, &engine, NodeRole::BassShelf), Some(10.0));
}

#[test]
fn send_gains_update_in_place() {
    let (mut graph, engine) = setup();
    graph.build(ElementId(1), &AudioSettings::default());
    let created = engine.created_count();
    let reverb_send = graph.node(NodeRole::ReverbSend);

    for amount in [10.0, 40.0, 0.0, 100.0] {
        assert!(graph.set_effects(&effects(amount, amount, 0.0, false)).is_empty());
    }

    assert_eq!(engine.created_count(), created);
    assert_eq!(graph.node(NodeRole::ReverbSend), reverb_send);
    assert_eq!(gain_of(&graph, &engine, NodeRole::ReverbSend), Some(1.0));
    assert_eq!(gain_of(&graph, &engine, NodeRole::EchoSend), Some(1.0));
}

#[test]
fn equalizer_band_change_touches_one_node() {
    let (mut graph, engine) = setup();
    let mut settings = AudioSettings::default();
    settings.equalizer.enabled = true;
    graph.build(ElementId(1), &settings);
    engine.clear_ops();

    assert!(graph.set_equalizer_band(4, 3.5).is_empty());

    let band = graph.node(NodeRole::EqBand(4)).unwrap();
    let ops = engine.ops();
    assert_eq!(ops.len(), 1);
    assert!(matches!(ops[0], EngineOp::SetParam { node, .. } if node == band));
    assert_eq!(engine.param(band, "gain"), Some(3.5));
}

#[test]
fn out_of_range_band_is_ignored() {
    let (mut graph, engine) = setup();
    graph.build(ElementId(1), &AudioSettings::default());
    engine.clear_ops();

    assert!(graph.set_equalizer_band(EQ_BAND_COUNT, 6.0).is_empty());
    assert!(engine.ops().is_empty());
}

#[test]
fn parameters_without_graph_are_remembered() {
    let (mut graph, engine) = setup();
    assert!(graph.set_effects(&effects(30.0, 0.0, 0.0, false)).is_empty());
    assert_eq!(graph.effects().reverb, 30.0);
    assert!(engine.ops().is_empty());
}

// ===== Spatial routing =====

#[test]
fn spatial_toggle_splices_panner() {
    let (mut graph, engine) = setup();
    graph.build(ElementId(1), &AudioSettings::default());
    let master = graph.node(NodeRole::Master).unwrap();
    let panner = graph.node(NodeRole::Panner).unwrap();

    assert!(graph.set_effects(&effects(0.0, 0.0, 0.0, true)).is_empty());
    assert!(graph.is_spatial_routed());
    assert!(engine.is_connected(master, Endpoint::Node(panner)));
    assert!(engine.is_connected(panner, Endpoint::Destination));
    assert!(!engine.is_connected(master, Endpoint::Destination));

    assert!(graph.set_effects(&effects(0.0, 0.0, 0.0, false)).is_empty());
    assert!(!graph.is_spatial_routed());
    assert!(engine.is_connected(master, Endpoint::Destination));
    assert!(!engine.is_connected(master, Endpoint::Node(panner)));
    assert!(!engine.is_connected(panner, Endpoint::Destination));
}

#[test]
fn spatial_build_starts_spliced() {
    let (mut graph, engine) = setup();
    let mut settings = AudioSettings::default();
    settings.effects.spatial_audio = true;
    graph.build(ElementId(1), &settings);

    let master = graph.node(NodeRole::Master).unwrap();
    let panner = graph.node(NodeRole::Panner).unwrap();
    assert!(graph.is_spatial_routed());
    assert!(engine.is_connected(master, Endpoint::Node(panner)));
    assert!(!engine.is_connected(master, Endpoint::Destination));
}

#[test]
fn repeating_spatial_setting_does_not_rewire() {
    let (mut graph, engine) = setup();
    graph.build(ElementId(1), &AudioSettings::default());
    graph.set_effects(&effects(0.0, 0.0, 0.0, true));
    engine.clear_ops();

    graph.set_effects(&effects(0.0, 0.0, 0.0, true));

    assert!(!engine
        .ops()
        .iter()
        .any(|op| matches!(op, EngineOp::Connect { .. } | EngineOp::Disconnect(_))));
}

// ===== Properties =====

fn arb_settings() -> impl Strategy<Value = AudioSettings> {
    (
        any::<bool>(),
        prop::array::uniform10(-12.0f32..=12.0),
        0.0f32..=100.0,
        0.0f32..=100.0,
        0.0f32..=100.0,
        any::<bool>(),
    )
        .prop_map(|(enabled, bands, reverb, echo, bass, spatial)| {
            let mut settings = AudioSettings::default();
            settings.equalizer.enabled = enabled;
            settings.equalizer.bands = bands;
            settings.effects = effects(reverb, echo, bass, spatial);
            settings
        })
}

proptest! {
    #[test]
    fn apply_settings_is_idempotent(first in arb_settings(), second in arb_settings()) {
        let (mut graph, engine) = setup();
        graph.build(ElementId(1), &first);

        prop_assert!(graph.apply_settings(&second).is_empty());
        let once: Vec<_> = (0..EQ_BAND_COUNT)
            .map(|band| gain_of(&graph, &engine, NodeRole::EqBand(band)))
            .collect();
        let connections = engine.connection_count();

        prop_assert!(graph.apply_settings(&second).is_empty());
        let twice: Vec<_> = (0..EQ_BAND_COUNT)
            .map(|band| gain_of(&graph, &engine, NodeRole::EqBand(band)))
            .collect();

        prop_assert_eq!(once, twice);
        prop_assert_eq!(engine.connection_count(), connections);
        prop_assert_eq!(engine.live_node_count(), EQ_BAND_COUNT + 10);
        prop_assert_eq!(graph.is_spatial_routed(), second.effects.spatial_audio);
    }

    #[test]
    fn band_gains_follow_enable_flag(settings in arb_settings()) {
        let (mut graph, engine) = setup();
        graph.build(ElementId(1), &settings);

        for band in 0..EQ_BAND_COUNT {
            let expected = if settings.equalizer.enabled {
                settings.equalizer.bands[band]
            } else {
                0.0
            };
            prop_assert_eq!(gain_of(&graph, &engine, NodeRole::EqBand(band)), Some(expected));
        }
    }
}
