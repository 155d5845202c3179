//! Conversation domain module.
//!
//! # Module Structure
//!
//! - `model`: Conversation entity (`Conversation`)
//! - `message`: Message types (`Message`, `MessageRole`, `MessageMetadata`)
//! - `cache`: Local message cache trait (`MessageCache`)

mod cache;
mod message;
mod model;

pub use cache::MessageCache;
pub use message::{Message, MessageMetadata, MessageRole, ToolInvocation};
pub use model::{Conversation, title_from_text};
