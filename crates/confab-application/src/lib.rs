pub mod chat_session;
pub mod handshake;
pub mod location;
pub mod pager;
pub mod send;

pub use chat_session::ChatSession;
pub use handshake::ProviderHandshake;
pub use location::{GateState, LocationGate, PendingLocationRequest};
pub use pager::{HistoryPager, PageOutcome};
pub use send::{MessageSendOrchestrator, SendError, SendOutcome, SendStage};
