//! Domain layer for confab.
//!
//! Models, the session state container and the collaborator traits
//! (`RemoteGateway`, `MessageCache`, `OAuthStateStore`). Nothing in this
//! crate performs I/O.

pub mod conversation;
pub mod error;
pub mod gateway;
pub mod location;
pub mod provider;
pub mod session;

// Re-export common error type
pub use error::{ConfabError, Result};
pub use gateway::{RemoteGateway, SendMessageRequest};
pub use location::LocationFix;
