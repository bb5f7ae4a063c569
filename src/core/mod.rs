//! Core conversation types, identifiers, configuration and errors.

pub mod config;
pub mod errors;
pub mod ids;
pub mod types;

pub use config::{ConversationConfig, EndpointTemplates};
pub use errors::{ConversationError, ConversationResult};
pub use ids::{ConversationId, MessageId};
pub use types::{
    Conversation, ConversationPatch, NewConversation, NewWireMessage, Role, WireMessage,
};
