//! Ethereum infrastructure - Alloy backend implementations

mod provider;

pub use provider::{connect, AlloyBackend, EndpointKind};
