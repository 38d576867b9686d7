//! Barchart Stream Consumption
//!
//! The streaming side of the feed: line classification, bounded line
//! reads over the chunked HTTP body, the per-instrument session state
//! machine, and the supervisor that fans sessions out.

pub mod classify;
pub mod lines;
pub mod session;
pub mod supervisor;

pub use classify::{LineKind, classify};
pub use lines::{LineStream, ReadOutcome};
pub use session::{
    FeedEvent, SessionConfig, SessionError, SessionEvent, SessionState, StreamSession,
};
pub use supervisor::{SessionHandle, SessionSupervisor};
