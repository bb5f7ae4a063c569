//! In-memory conversation state observed by hosts and the sync bridge.

use serde::Serialize;

use crate::core::errors::ConversationError;
use crate::core::ids::ConversationId;
use crate::core::types::Conversation;
use crate::message::host::HostMessage;

/// Error surfaced to the host for rendering (dismissible, with retry hint).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateError {
    /// Human-readable description.
    pub message: String,
    /// HTTP status, when the backend answered.
    pub status: Option<u16>,
    /// Whether offering a retry makes sense.
    pub retryable: bool,
}

impl From<&ConversationError> for StateError {
    fn from(err: &ConversationError) -> Self {
        Self {
            message: err.to_string(),
            status: err.status(),
            retryable: err.is_retryable(),
        }
    }
}

/// Conversation state owned by a single store.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationState {
    /// Known conversations, unique by id, most recently updated first.
    pub conversations: Vec<Conversation>,
    /// Active conversation; may name an id that is not loaded yet.
    pub current_conversation_id: Option<ConversationId>,
    /// A conversation list load is in flight.
    pub is_loading: bool,
    /// Last listing/loading failure.
    pub error: Option<StateError>,
    /// At least one list load has succeeded.
    pub initialized: bool,
    /// Bumped on every change of `current_conversation_id`.
    pub selection: u64,
}

impl ConversationState {
    /// Metadata of the active conversation, if loaded.
    #[must_use]
    pub fn current_conversation(&self) -> Option<&Conversation> {
        self.find(self.current_conversation_id.as_ref()?)
    }

    /// Look up a conversation by id.
    #[must_use]
    pub fn find(&self, id: &ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| &c.id == id)
    }
}

/// Outcome of loading a conversation's messages.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageLoad {
    /// Messages of the most recent load request.
    Current(Vec<HostMessage>),
    /// A newer load was issued while this one was in flight; discard it.
    Superseded,
}

impl MessageLoad {
    /// Messages, unless the load was superseded.
    #[must_use]
    pub fn into_messages(self) -> Option<Vec<HostMessage>> {
        match self {
            Self::Current(messages) => Some(messages),
            Self::Superseded => None,
        }
    }
}
