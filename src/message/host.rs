//! Host framework message model.
//!
//! The live chat list holds [`HostMessage`] values. Each variant mirrors one
//! message kind the chat runtime produces; the codec matches on them
//! exhaustively.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::ids::MessageId;
use crate::core::types::Role;

/// Plain text exchanged between user, assistant and system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    /// Message identifier.
    pub id: MessageId,
    /// Author role.
    pub role: Role,
    /// Text content.
    pub content: String,
}

/// A tool/action invocation requested by the assistant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionExecutionMessage {
    /// Message identifier.
    pub id: MessageId,
    /// Action name.
    pub name: String,
    /// Action arguments.
    #[serde(default)]
    pub arguments: Value,
    /// Assistant message that triggered the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_message_id: Option<MessageId>,
}

/// Output of an action execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultMessage {
    /// Message identifier.
    pub id: MessageId,
    /// Execution this result answers.
    pub action_execution_id: MessageId,
    /// Action name.
    pub action_name: String,
    /// Action output.
    #[serde(default)]
    pub result: Value,
}

/// Snapshot of an agent's state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStateMessage {
    /// Message identifier.
    pub id: MessageId,
    /// Agent name.
    pub agent_name: String,
    /// Graph node the agent is in, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Agent state payload.
    #[serde(default)]
    pub state: Value,
    /// Whether the agent is still running.
    #[serde(default)]
    pub running: bool,
}

/// Inline image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMessage {
    /// Message identifier.
    pub id: MessageId,
    /// Author role.
    pub role: Role,
    /// Image format (`png`, `jpeg`, ...).
    pub format: String,
    /// Base64-encoded image bytes.
    pub bytes: String,
}

/// A message in the host's live message list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostMessage {
    /// Plain text.
    Text(TextMessage),
    /// Action invocation.
    ActionExecution(ActionExecutionMessage),
    /// Action output.
    Result(ResultMessage),
    /// Agent state snapshot.
    AgentState(AgentStateMessage),
    /// Inline image.
    Image(ImageMessage),
}

impl HostMessage {
    /// Build a text message with a fresh identifier.
    #[must_use]
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self::Text(TextMessage {
            id: MessageId::generate(),
            role,
            content: content.into(),
        })
    }

    /// Message identifier.
    #[must_use]
    pub const fn id(&self) -> &MessageId {
        match self {
            Self::Text(m) => &m.id,
            Self::ActionExecution(m) => &m.id,
            Self::Result(m) => &m.id,
            Self::AgentState(m) => &m.id,
            Self::Image(m) => &m.id,
        }
    }

    /// Role this message is persisted under.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Text(m) => m.role,
            Self::Image(m) => m.role,
            Self::ActionExecution(_) | Self::Result(_) | Self::AgentState(_) => Role::Assistant,
        }
    }

    /// Stable kind tag, stored as `metadata.type`.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::ActionExecution(_) => "action_execution",
            Self::Result(_) => "result",
            Self::AgentState(_) => "agent_state",
            Self::Image(_) => "image",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_for_structured_kinds() {
        let action = HostMessage::ActionExecution(ActionExecutionMessage {
            id: MessageId::new("a1"),
            name: "search".to_string(),
            arguments: serde_json::json!({ "q": "rust" }),
            parent_message_id: None,
        });
        assert_eq!(action.role(), Role::Assistant);
        assert_eq!(action.kind(), "action_execution");
        assert_eq!(action.id().as_str(), "a1");
    }

    #[test]
    fn test_text_constructor_assigns_id() {
        let msg = HostMessage::text(Role::User, "hello");
        assert!(!msg.id().is_empty());
        assert_eq!(msg.role(), Role::User);
        assert_eq!(msg.kind(), "text");
    }
}
