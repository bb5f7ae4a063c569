//! Conversation store: the state machine over [`ConversationState`].

pub mod conversation_store;
pub mod state;

pub use conversation_store::ConversationStore;
pub use state::{ConversationState, MessageLoad, StateError};
