pub mod config;
mod dto;
pub mod http_gateway;
pub mod message_cache;
pub mod oauth_state_store;
pub mod paths;
pub mod storage;

pub use crate::config::ClientConfig;
pub use crate::http_gateway::HttpRemoteGateway;
pub use crate::message_cache::{InMemoryMessageCache, TomlMessageCache};
pub use crate::oauth_state_store::FileOAuthStateStore;
pub use crate::paths::ConfabPaths;
