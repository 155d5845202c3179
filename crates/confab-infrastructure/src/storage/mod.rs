//! Storage layer for atomic file operations and local secrets.

pub(crate) mod atomic_toml;
mod secret_storage;

pub use atomic_toml::{AtomicTomlError, AtomicTomlFile};
pub use secret_storage::{API_TOKEN_ENV, SecretConfig, SecretStorage, SecretStorageError};
