pub mod engine;
pub mod statements;
pub mod types;

pub use engine::CapabilityGrantEngine;
pub use types::{
    AccessStatement, Capability, CapabilitySet, ConsumerName, Effect, GrantResult,
    PolicyStatement, ResourceExports,
};
