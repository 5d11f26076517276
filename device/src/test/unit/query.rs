use crate::{Error, HardwareDescriptor, HardwareQuery, Unbound};

#[test]
fn test_descriptor_is_always_bound() {
    let descriptor = HardwareDescriptor::parse("cuda:512").unwrap();
    assert_eq!(descriptor.max_num_threads(), 512);
    assert_eq!(HardwareQuery::max_num_threads(&descriptor), Ok(512));
}

#[test]
fn test_unbound_query_fails() {
    assert_eq!(Unbound.max_num_threads(), Err(Error::NoTargetBound));
    assert_eq!(Unbound.descriptor(), Err(Error::NoTargetBound));
}

#[test]
fn test_optional_descriptor() {
    let bound = Some(HardwareDescriptor::cuda());
    let unbound: Option<HardwareDescriptor> = None;

    assert_eq!(bound.max_num_threads(), Ok(1024));
    assert_eq!(unbound.max_num_threads(), Err(Error::NoTargetBound));
}

#[test]
fn test_query_through_trait_object() {
    let descriptor = HardwareDescriptor::cuda();
    let queries: [&dyn HardwareQuery; 2] = [&descriptor, &Unbound];
    assert!(queries[0].descriptor().is_ok());
    assert!(queries[1].descriptor().is_err());
}
