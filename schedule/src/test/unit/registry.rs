use strum::VariantArray;
use tessera_device::{HardwareDescriptor, TargetKind, Unbound};
use tessera_ir::{Graph, OpTag};

use crate::classify::ScheduleOp;
use crate::config::TuneContext;
use crate::error::{Error, Result};
use crate::plan::Schedule;
use crate::registry::{ScheduleRegistry, registry, schedule_softmax};
use crate::synth::SynthesisRequest;

#[test]
fn test_default_entries() {
    let registry = ScheduleRegistry::with_defaults();
    for &op in ScheduleOp::VARIANTS {
        for &target in TargetKind::VARIANTS {
            let expected = matches!(target, TargetKind::Cuda | TargetKind::Gpu);
            assert_eq!(registry.contains(op, target), expected, "{op} on {target}");
        }
    }
}

#[test]
fn test_lookup_miss() {
    let registry = ScheduleRegistry::new();
    assert!(matches!(
        registry.lookup(ScheduleOp::Softmax, TargetKind::Cuda),
        Err(Error::NoScheduleRegistered { op: ScheduleOp::Softmax, target: TargetKind::Cuda })
    ));
}

#[test]
fn test_dispatch_on_cuda_and_gpu() {
    let graph = Graph::log_softmax(&[4, 64], -1).unwrap();
    for spec in ["cuda", "gpu:512"] {
        let hardware = HardwareDescriptor::parse(spec).unwrap();
        let request = SynthesisRequest::new(&graph, &hardware).with_tune(TuneContext::Selected(32));
        assert_eq!(schedule_softmax(&request).unwrap().num_threads(), 32);
    }
}

#[test]
fn test_dispatch_unregistered_target() {
    let graph = Graph::softmax(&[4, 64], -1).unwrap();
    let hardware = HardwareDescriptor::parse("cpu").unwrap();
    let request = SynthesisRequest::new(&graph, &hardware);
    assert_eq!(
        registry().dispatch(&request).unwrap_err(),
        Error::NoScheduleRegistered { op: ScheduleOp::Softmax, target: TargetKind::Cpu }
    );
}

#[test]
fn test_dispatch_errors_are_ordered() {
    let unsupported = Graph::softmax(&[4, 64], -1).unwrap().with_tag(OpTag::parse("relu_output"));
    let request = SynthesisRequest::new(&unsupported, &Unbound);
    assert!(matches!(registry().dispatch(&request), Err(Error::UnsupportedOperator { .. })));

    let graph = Graph::softmax(&[4, 64], -1).unwrap();
    let request = SynthesisRequest::new(&graph, &Unbound);
    assert!(matches!(registry().dispatch(&request), Err(Error::HardwareQuery { .. })));
}

fn fixed_rocm_schedule(request: &SynthesisRequest<'_>) -> Result<Schedule> {
    crate::synth::synthesize(&request.with_tune(TuneContext::Selected(128)))
}

#[test]
fn test_register_custom_entry() {
    let registry = ScheduleRegistry::with_defaults();
    assert!(registry.register(ScheduleOp::Softmax, TargetKind::Rocm, fixed_rocm_schedule).is_none());
    assert!(registry.register(ScheduleOp::Softmax, TargetKind::Rocm, fixed_rocm_schedule).is_some());

    let graph = Graph::softmax(&[4, 64], -1).unwrap();
    let hardware = HardwareDescriptor::parse("rocm").unwrap();
    let schedule = registry.dispatch(&SynthesisRequest::new(&graph, &hardware)).unwrap();
    assert_eq!(schedule.num_threads(), 128);
}
