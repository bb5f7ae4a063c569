//! Wire-level data model shared by the client, codec and store.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::ids::{ConversationId, MessageId};

/// Metadata for a conversation as listed by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Backend-assigned identifier.
    #[serde(alias = "_id")]
    pub id: ConversationId,
    /// Owner identity scope.
    #[serde(rename = "userId", alias = "owner", default)]
    pub owner: String,
    /// Display title.
    #[serde(default)]
    pub title: String,
    /// Creation timestamp.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Last activity timestamp, never earlier than `created_at`.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    /// Denormalized preview of the newest message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message_preview: Option<String>,
    /// Denormalized message count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_count: Option<u32>,
    /// Free-form host metadata, merged key by key on update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl Conversation {
    /// Build a fresh conversation record.
    #[must_use]
    pub fn new(
        id: ConversationId,
        owner: impl Into<String>,
        title: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner: owner.into(),
            title: title.into(),
            created_at: now,
            updated_at: now,
            last_message_preview: None,
            message_count: None,
            metadata: None,
        }
    }

    /// Apply a patch's fields; `updated_at` is left to the caller.
    pub fn apply(&mut self, patch: ConversationPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(metadata) = patch.metadata {
            self.metadata.get_or_insert_with(Map::new).extend(metadata);
        }
    }

    /// Advance `updated_at`, never moving it backwards.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.updated_at {
            self.updated_at = at;
        }
    }

    /// Clamp timestamps coming from a backend that broke the ordering.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.updated_at < self.created_at {
            self.updated_at = self.created_at;
        }
        self
    }

    /// Case-insensitive title match.
    #[must_use]
    pub fn title_matches(&self, needle_lowercase: &str) -> bool {
        self.title.to_lowercase().contains(needle_lowercase)
    }
}

/// Partial update of mutable conversation fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free-form metadata merged by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl ConversationPatch {
    /// Patch that only renames.
    #[must_use]
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            metadata: None,
        }
    }

    /// Whether the patch carries no change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.metadata.is_none()
    }
}

/// Role of a persisted message.
///
/// Unrecognized wire roles decode as [`Role::User`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    /// User input.
    #[default]
    User,
    /// Assistant response.
    Assistant,
    /// System message.
    System,
}

impl Role {
    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    /// Parse leniently, defaulting to `User`.
    #[must_use]
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "assistant" => Self::Assistant,
            "system" => Self::System,
            _ => Self::User,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Self::parse_lenient(&value)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message as persisted by the backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Message identifier.
    #[serde(alias = "_id")]
    pub id: MessageId,
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Owner identity scope.
    #[serde(rename = "userId", alias = "owner", default)]
    pub owner: String,
    /// Message role.
    #[serde(default)]
    pub role: Role,
    /// Human-readable content.
    #[serde(default)]
    pub content: String,
    /// Creation timestamp.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Update timestamp.
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    /// Original message shape; `type` selects how it is rebuilt.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl WireMessage {
    /// Request body for saving this message (identity and timestamps are
    /// assigned by the backend).
    #[must_use]
    pub fn to_new(&self) -> NewWireMessage {
        NewWireMessage {
            conversation_id: self.conversation_id.clone(),
            owner: self.owner.clone(),
            role: self.role,
            content: self.content.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Body of a save-message request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWireMessage {
    /// Owning conversation.
    pub conversation_id: ConversationId,
    /// Owner identity scope.
    #[serde(rename = "userId", alias = "owner", default)]
    pub owner: String,
    /// Message role.
    #[serde(default)]
    pub role: Role,
    /// Human-readable content.
    #[serde(default)]
    pub content: String,
    /// Original message shape.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Body of a create-conversation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewConversation {
    /// Owner identity scope.
    pub user_id: String,
    /// Initial title.
    #[serde(default)]
    pub title: String,
}
