pub mod registry;
pub mod synthesize;
