pub mod chat;
pub mod conversations;
pub mod login;
pub mod providers;
pub mod utils;
