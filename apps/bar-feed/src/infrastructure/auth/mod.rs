//! OAuth Token Lifecycle
//!
//! Initial acquisition (cached refresh token or interactive
//! authorization-code flow), the shared atomic token store, and the
//! background refresh loop. Only this module writes the store; the
//! streaming sessions are read-only consumers.

pub mod bootstrap;
pub mod cache;
pub mod client;
pub mod redirect;
pub mod refresh;
pub mod token_store;

pub use bootstrap::{BootstrapError, bootstrap};
pub use cache::FileTokenCache;
pub use client::{AuthError, TokenClient};
pub use redirect::LoopbackCodeListener;
pub use refresh::RefreshScheduler;
pub use token_store::TokenStore;
