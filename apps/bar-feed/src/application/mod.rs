//! Application layer - Port definitions.

/// Port interfaces implemented by infrastructure adapters.
pub mod ports;
