//! In-memory storage shared across all request handlers.

use chrono::Utc;
use dashmap::DashMap;

use crate::core::ids::{ConversationId, MessageId};
use crate::core::types::{Conversation, ConversationPatch, NewWireMessage, WireMessage};

/// Maximum preview length, in characters.
const PREVIEW_CHARS: usize = 100;

/// Shared backend state.
#[derive(Default)]
pub struct BackendState {
    conversations: DashMap<ConversationId, Conversation>,
    messages: DashMap<ConversationId, Vec<WireMessage>>,
    required_authorization: Option<String>,
}

impl BackendState {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require this exact `Authorization` header on every request.
    #[must_use]
    pub fn with_required_authorization(mut self, value: impl Into<String>) -> Self {
        self.required_authorization = Some(value.into());
        self
    }

    /// Check a request's `Authorization` header.
    #[must_use]
    pub fn is_authorized(&self, presented: Option<&str>) -> bool {
        self.required_authorization
            .as_deref()
            .is_none_or(|required| presented == Some(required))
    }

    /// Conversations of `user_id`, most recently updated first.
    #[must_use]
    pub fn list_conversations(&self, user_id: Option<&str>) -> Vec<Conversation> {
        let mut listed: Vec<Conversation> = self
            .conversations
            .iter()
            .filter(|entry| user_id.is_none_or(|owner| entry.owner == owner))
            .map(|entry| entry.value().clone())
            .collect();
        listed.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        listed
    }

    /// Create a conversation and return its id.
    pub fn create_conversation(&self, owner: &str, title: &str) -> ConversationId {
        let id = ConversationId::generate();
        let conversation = Conversation::new(id.clone(), owner, title, Utc::now());
        self.messages.insert(id.clone(), Vec::new());
        self.conversations.insert(id.clone(), conversation);
        id
    }

    /// Messages of a conversation, or `None` if it does not exist.
    #[must_use]
    pub fn list_messages(&self, id: &ConversationId) -> Option<Vec<WireMessage>> {
        if !self.conversations.contains_key(id) {
            return None;
        }
        Some(
            self.messages
                .get(id)
                .map(|entry| entry.value().clone())
                .unwrap_or_default(),
        )
    }

    /// Append a message; returns `None` if the conversation does not exist.
    pub fn append_message(&self, id: &ConversationId, message: NewWireMessage) -> Option<MessageId> {
        let now = Utc::now();
        let mut conversation = self.conversations.get_mut(id)?;

        let stored = WireMessage {
            id: MessageId::generate(),
            conversation_id: id.clone(),
            owner: message.owner,
            role: message.role,
            content: message.content,
            created_at: now,
            updated_at: now,
            metadata: message.metadata,
        };
        let message_id = stored.id.clone();

        conversation.touch(now);
        conversation.last_message_preview = Some(stored.content.chars().take(PREVIEW_CHARS).collect());
        conversation.message_count = Some(conversation.message_count.unwrap_or(0) + 1);
        drop(conversation);

        self.messages.entry(id.clone()).or_default().push(stored);
        Some(message_id)
    }

    /// Apply a partial update; returns `false` if the conversation does not exist.
    pub fn update_conversation(&self, id: &ConversationId, patch: ConversationPatch) -> bool {
        let Some(mut conversation) = self.conversations.get_mut(id) else {
            return false;
        };
        conversation.apply(patch);
        conversation.touch(Utc::now());
        true
    }

    /// Delete a conversation and its messages; returns `false` if unknown.
    pub fn delete_conversation(&self, id: &ConversationId) -> bool {
        self.messages.remove(id);
        self.conversations.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::Map;

    use crate::core::types::Role;

    fn new_message(id: &ConversationId, content: &str) -> NewWireMessage {
        NewWireMessage {
            conversation_id: id.clone(),
            owner: "alice".to_string(),
            role: Role::User,
            content: content.to_string(),
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_listing_is_scoped_to_owner() {
        let state = BackendState::new();
        state.create_conversation("alice", "Trip Planning");
        state.create_conversation("bob", "Budget Review");

        let listed = state.list_conversations(Some("alice"));
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Trip Planning");
        assert_eq!(state.list_conversations(None).len(), 2);
    }

    #[test]
    fn test_append_updates_denormalized_fields() {
        let state = BackendState::new();
        let id = state.create_conversation("alice", "Trip");
        assert!(state.append_message(&id, new_message(&id, "hello")).is_some());

        let listed = state.list_conversations(Some("alice"));
        assert_eq!(listed[0].message_count, Some(1));
        assert_eq!(listed[0].last_message_preview.as_deref(), Some("hello"));
        assert!(listed[0].updated_at >= listed[0].created_at);
    }

    #[test]
    fn test_unknown_conversation_is_reported() {
        let state = BackendState::new();
        let missing = ConversationId::new("nope");
        assert!(state.list_messages(&missing).is_none());
        assert!(state.append_message(&missing, new_message(&missing, "x")).is_none());
        assert!(!state.update_conversation(&missing, ConversationPatch::title("t")));
        assert!(!state.delete_conversation(&missing));
    }

    #[test]
    fn test_update_stores_metadata() {
        let state = BackendState::new();
        let id = state.create_conversation("alice", "Trip");
        let mut metadata = Map::new();
        metadata.insert("pinned".to_string(), serde_json::Value::Bool(true));

        assert!(state.update_conversation(
            &id,
            ConversationPatch {
                title: None,
                metadata: Some(metadata),
            }
        ));

        let listed = state.list_conversations(Some("alice"));
        assert_eq!(listed[0].title, "Trip");
        assert_eq!(
            listed[0].metadata.as_ref().and_then(|m| m.get("pinned")),
            Some(&serde_json::Value::Bool(true))
        );
    }

    #[test]
    fn test_authorization_check() {
        let open = BackendState::new();
        assert!(open.is_authorized(None));

        let locked = BackendState::new().with_required_authorization("Bearer t");
        assert!(locked.is_authorized(Some("Bearer t")));
        assert!(!locked.is_authorized(Some("Bearer x")));
        assert!(!locked.is_authorized(None));
    }
}
