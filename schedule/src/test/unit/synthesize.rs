//! Cross-strategy properties of a synthesis call.

use test_case::test_case;
use tessera_device::{Error as DeviceError, HardwareDescriptor, Unbound};
use tessera_ir::{Graph, OpTag};

use crate::config::{SynthesisConfig, TuneContext};
use crate::error::Error;
use crate::knob::FALLBACK_THREADS;
use crate::synth::{SynthesisRequest, knob_space_for, synthesize};
use crate::test::helpers::{RecordingTiler, assert_each_node_once, cuda};

#[test_case(&[128]; "rank1")]
#[test_case(&[1, 128]; "rank2")]
#[test_case(&[4, 100]; "rank2_ragged")]
#[test_case(&[2, 3, 5]; "rank3")]
#[test_case(&[2, 3, 4, 5]; "rank4")]
fn test_every_node_scheduled_once(shape: &[usize]) {
    let hardware = cuda(1024);
    for graph in [Graph::softmax(shape, -1).unwrap(), Graph::log_softmax(shape, -1).unwrap()] {
        for tune in [TuneContext::Fallback, TuneContext::Selected(32), TuneContext::Selected(1024)] {
            let request = SynthesisRequest::new(&graph, &hardware).with_tune(tune);
            let schedule = synthesize(&request).unwrap();
            assert_each_node_once(&schedule, &graph);
        }
    }
}

#[test_case(1024; "large_target")]
#[test_case(50; "odd_target")]
#[test_case(16; "tiny_target")]
fn test_fallback_forces_64(max_threads: usize) {
    let graph = Graph::softmax(&[2, 256], -1).unwrap();
    let hardware = cuda(max_threads);
    let schedule = synthesize(&SynthesisRequest::new(&graph, &hardware)).unwrap();

    assert_eq!(schedule.num_threads(), FALLBACK_THREADS);
    assert!(schedule.used_fallback());
}

#[test]
fn test_selection_outside_space() {
    let graph = Graph::softmax(&[2, 256], -1).unwrap();
    let hardware = cuda(1024);

    for value in [48, 16, 2048] {
        let request = SynthesisRequest::new(&graph, &hardware).with_tune(TuneContext::Selected(value));
        assert_eq!(synthesize(&request).unwrap_err(), Error::InvalidKnob { value, minimum: 32, maximum: 1024 });
    }
}

#[test]
fn test_selection_from_odd_target() {
    let graph = Graph::softmax(&[2, 256], -1).unwrap();
    let hardware = cuda(50);
    let request = SynthesisRequest::new(&graph, &hardware).with_tune(TuneContext::Selected(50));
    assert_eq!(synthesize(&request).unwrap().num_threads(), 50);
}

#[test]
fn test_custom_floor() {
    let graph = Graph::softmax(&[2, 256], -1).unwrap();
    let hardware = cuda(1024);
    let config = SynthesisConfig::builder().min_threads(8).build();
    let request = SynthesisRequest::new(&graph, &hardware).with_tune(TuneContext::Selected(16)).with_config(config);
    assert_eq!(synthesize(&request).unwrap().num_threads(), 16);
}

#[test_case(&[1, 128]; "reduction_path")]
#[test_case(&[8, 128, 768]; "elementwise_path")]
fn test_unsupported_tag_builds_nothing(shape: &[usize]) {
    let graph = Graph::softmax(shape, -1).unwrap().with_tag(OpTag::parse("relu_output"));
    let hardware = cuda(1024);
    let tiler = RecordingTiler::default();
    let request = SynthesisRequest::new(&graph, &hardware).with_tiler(&tiler);

    assert_eq!(synthesize(&request).unwrap_err(), Error::UnsupportedOperator { tag: "relu_output".into() });
    assert!(tiler.calls.borrow().is_empty());
}

#[test]
fn test_unsupported_tag_reported_before_hardware() {
    let graph = Graph::softmax(&[1, 128], -1).unwrap().with_tag(OpTag::parse("relu_output"));
    let request = SynthesisRequest::new(&graph, &Unbound);
    assert!(matches!(synthesize(&request), Err(Error::UnsupportedOperator { .. })));
}

#[test]
fn test_unbound_target() {
    let graph = Graph::softmax(&[1, 128], -1).unwrap();
    let unbound: Option<HardwareDescriptor> = None;

    for request in [SynthesisRequest::new(&graph, &Unbound), SynthesisRequest::new(&graph, &unbound)] {
        assert_eq!(synthesize(&request).unwrap_err(), Error::HardwareQuery { source: DeviceError::NoTargetBound });
    }
}

#[test]
fn test_knob_space_for_target() {
    let config = SynthesisConfig::default();
    assert_eq!(knob_space_for(&cuda(1024), &config).unwrap().candidates(), &[1024, 512, 256, 128, 64, 32]);
    assert_eq!(knob_space_for(&cuda(50), &config).unwrap().candidates(), &[50]);
    assert!(matches!(knob_space_for(&Unbound, &config), Err(Error::HardwareQuery { .. })));
}

#[test]
fn test_synthesis_is_deterministic() {
    let graph = Graph::softmax(&[16, 300], -1).unwrap();
    let hardware = cuda(1024);
    let request = SynthesisRequest::new(&graph, &hardware).with_tune(TuneContext::Selected(128));
    assert_eq!(synthesize(&request).unwrap(), synthesize(&request).unwrap());
}

#[test]
fn test_tree_rendering() {
    let graph = Graph::softmax(&[1, 128], -1).unwrap();
    let hardware = cuda(1024);
    let request = SynthesisRequest::new(&graph, &hardware).with_tune(TuneContext::Selected(128));
    let tree = synthesize(&request).unwrap().tree();

    assert!(tree.starts_with("schedule num_threads=128"));
    assert!(tree.contains("blockIdx.x"));
    assert!(tree.contains("threadIdx.x @partial"));
    assert!(tree.contains("store if threadIdx.x == 0"));
}
