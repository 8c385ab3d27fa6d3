//! Session ownership and routing

pub mod registry;

pub use registry::SessionRegistry;
