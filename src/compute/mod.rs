pub mod factory;
pub mod types;

pub use factory::ComputeUnitFactory;
pub use types::{
    CodeLocation, ComputeLimits, ComputeUnitDescriptor, ComputeUnitName, ComputeUnitSpec,
    EnvironmentValue, ResourceDependency, Runtime, SecretBinding,
};
