//! Persistence client: the request layer between the store and the backend.
//!
//! [`ConversationBackend`] is the seam the store depends on;
//! [`HttpConversationClient`] is the production implementation.

pub mod http;

use std::future::Future;
use std::pin::Pin;

use crate::core::errors::ConversationResult;
use crate::core::ids::ConversationId;
use crate::core::types::{Conversation, ConversationPatch, WireMessage};

pub use http::{HttpConversationClient, default_title};

/// Boxed future type for backend operations.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Remote persistence for conversations and their messages.
///
/// Every call is a single attempt; retry policy belongs to the caller.
pub trait ConversationBackend: Send + Sync {
    /// List the owner's conversations. An empty result is not an error.
    fn list_conversations(&self) -> BackendFuture<'_, ConversationResult<Vec<Conversation>>>;

    /// List the messages of a conversation.
    fn list_messages(
        &self,
        id: ConversationId,
    ) -> BackendFuture<'_, ConversationResult<Vec<WireMessage>>>;

    /// Create a conversation and return its backend-assigned id.
    ///
    /// A missing title is replaced by a timestamped default.
    fn create_conversation(
        &self,
        title: Option<String>,
    ) -> BackendFuture<'_, ConversationResult<ConversationId>>;

    /// Delete a conversation.
    fn delete_conversation(&self, id: ConversationId) -> BackendFuture<'_, ConversationResult<()>>;

    /// Persist one message into `id`.
    fn save_message(
        &self,
        message: WireMessage,
        id: ConversationId,
    ) -> BackendFuture<'_, ConversationResult<()>>;

    /// Apply a partial update to a conversation.
    fn update_conversation(
        &self,
        id: ConversationId,
        patch: ConversationPatch,
    ) -> BackendFuture<'_, ConversationResult<()>>;
}
