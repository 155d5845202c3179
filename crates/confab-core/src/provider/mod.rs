//! Third-party provider connections.

mod model;
mod state_store;

pub use model::{AuthType, HandshakePhase, OAuthStart, ProviderConnection};
pub use state_store::OAuthStateStore;
