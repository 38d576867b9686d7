//! Domain layer - Core feed types with no external integrations.

/// Price bar wire types and data-quality rules.
pub mod bar;

/// OAuth credential value objects.
pub mod credential;

/// Instrument identifiers.
pub mod instrument;
