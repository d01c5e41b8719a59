//! Conversations and the session that carries them between questions.

pub mod conversation;
pub mod session;

pub use conversation::{Conversation, ConversationState, Turn, TurnKind};
pub use session::Session;
