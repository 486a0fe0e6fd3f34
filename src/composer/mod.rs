#[allow(clippy::module_inception)]
pub mod composer;
pub mod declarations;
pub mod stack;

pub use composer::{StackComposer, verify_configuration};
pub use declarations::{
    AuthorizerDeclaration, ComputeUnitDeclaration, CorsPreflight, DependencyDeclaration,
    GatewaySettings, RouteAuth, RouteDeclaration, StackDeclarations, TriggerDeclaration,
    TriggerEvent,
};
pub use stack::{ComposedStack, TriggerBinding};
