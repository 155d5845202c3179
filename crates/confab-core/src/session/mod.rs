//! Session state module.
//!
//! # Module Structure
//!
//! - `store`: The in-memory state of the active conversation (`SessionStore`)
//! - `cursor`: Backward pagination position (`PaginationCursor`)

mod cursor;
mod store;

pub use cursor::PaginationCursor;
pub use store::{SessionStore, SharedSessionStore};
