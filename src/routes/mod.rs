pub mod builder;
pub mod types;

pub use builder::{RouteTreeBuilder, parse_path};
pub use types::{
    Authorizer, DEFAULT_IDENTITY_SOURCE, MethodBinding, RouteNode, RouteNodeState, RouteTree,
};
