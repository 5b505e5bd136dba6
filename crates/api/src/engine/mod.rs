//! Request-scoped orchestration that spans several collaborators.

pub mod chat;

pub use chat::{ChatDispatcher, ChatReply, ChatRequest};
