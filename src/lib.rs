// Library surface for the binary and the integration tests.
pub mod cli;
pub mod composer;
pub mod compute;
pub mod config;
pub mod error;
pub mod grants;
pub mod logging;
pub mod resources;
pub mod routes;
pub mod secrets;
pub mod types;
