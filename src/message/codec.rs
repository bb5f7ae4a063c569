//! Bidirectional mapping between host messages and wire messages.
//!
//! `metadata.type` records the host kind, `metadata.hostId` the host
//! identifier, and `metadata.payload` the structured body of non-text kinds.
//! Decoding never fails: malformed structured payloads fall back to a text
//! message built from the stored content.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::errors::{ConversationError, ConversationResult};
use crate::core::ids::{ConversationId, MessageId};
use crate::core::types::{Role, WireMessage};
use crate::message::host::{
    ActionExecutionMessage, AgentStateMessage, HostMessage, ImageMessage, ResultMessage,
    TextMessage,
};

/// Content used when nothing readable can be recovered.
pub const PLACEHOLDER_CONTENT: &str = "[unsupported message]";

const TYPE_KEY: &str = "type";
const HOST_ID_KEY: &str = "hostId";
const PAYLOAD_KEY: &str = "payload";

/// Human-readable content for any host message.
#[must_use]
pub fn content_text(message: &HostMessage) -> String {
    match message {
        HostMessage::Text(m) => m.content.clone(),
        HostMessage::ActionExecution(m) => format!("Action: {}({})", m.name, m.arguments),
        HostMessage::Result(m) => {
            format!("Result of {}: {}", m.action_name, value_text(&m.result))
        }
        HostMessage::AgentState(m) => format!("Agent {} state: {}", m.agent_name, m.state),
        HostMessage::Image(m) => format!("[image: {}]", m.format),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Encode a host message for persistence in `conversation_id`.
#[must_use]
pub fn to_wire(message: &HostMessage, conversation_id: &ConversationId, owner: &str) -> WireMessage {
    let mut metadata = Map::new();
    metadata.insert(TYPE_KEY.to_string(), Value::from(message.kind()));
    metadata.insert(HOST_ID_KEY.to_string(), Value::from(message.id().as_str()));

    let payload = match message {
        HostMessage::Text(_) => None,
        HostMessage::ActionExecution(m) => serde_json::to_value(m).ok(),
        HostMessage::Result(m) => serde_json::to_value(m).ok(),
        HostMessage::AgentState(m) => serde_json::to_value(m).ok(),
        HostMessage::Image(m) => serde_json::to_value(m).ok(),
    };
    if let Some(payload) = payload {
        metadata.insert(PAYLOAD_KEY.to_string(), payload);
    }

    let now = Utc::now();
    WireMessage {
        id: message.id().clone(),
        conversation_id: conversation_id.clone(),
        owner: owner.to_string(),
        role: message.role(),
        content: content_text(message),
        created_at: now,
        updated_at: now,
        metadata,
    }
}

/// Decode a persisted message back into the host representation.
#[must_use]
pub fn to_host(message: &WireMessage) -> HostMessage {
    let id = message
        .metadata
        .get(HOST_ID_KEY)
        .and_then(Value::as_str)
        .filter(|raw| !raw.trim().is_empty())
        .map_or_else(|| message.id.clone(), MessageId::from);

    match message.metadata.get(TYPE_KEY).and_then(Value::as_str) {
        None | Some("text") => HostMessage::Text(TextMessage {
            id,
            role: message.role,
            content: message.content.clone(),
        }),
        Some(kind) => decode_structured(kind, message, id.clone()).unwrap_or_else(|err| {
            debug!(message_id = %id, kind, %err, "Falling back to text for stored message");
            fallback_text(id, message.role, &message.content)
        }),
    }
}

fn fallback_text(id: MessageId, role: Role, content: &str) -> HostMessage {
    let content = if content.is_empty() {
        PLACEHOLDER_CONTENT.to_string()
    } else {
        content.to_string()
    };
    HostMessage::Text(TextMessage { id, role, content })
}

fn decode_structured(
    kind: &str,
    message: &WireMessage,
    id: MessageId,
) -> ConversationResult<HostMessage> {
    let payload = message
        .metadata
        .get(PAYLOAD_KEY)
        .cloned()
        .ok_or_else(|| ConversationError::Decode(format!("{kind} message has no payload")))?;

    let decoded = match kind {
        "action_execution" => {
            let mut m: ActionExecutionMessage = payload_as(payload)?;
            m.id = id;
            HostMessage::ActionExecution(m)
        }
        "result" => {
            let mut m: ResultMessage = payload_as(payload)?;
            m.id = id;
            HostMessage::Result(m)
        }
        "agent_state" => {
            let mut m: AgentStateMessage = payload_as(payload)?;
            m.id = id;
            HostMessage::AgentState(m)
        }
        "image" => {
            let mut m: ImageMessage = payload_as(payload)?;
            m.id = id;
            m.role = message.role;
            HostMessage::Image(m)
        }
        other => {
            return Err(ConversationError::Decode(format!(
                "unknown message type {other:?}"
            )));
        }
    };
    Ok(decoded)
}

fn payload_as<T: DeserializeOwned>(payload: Value) -> ConversationResult<T> {
    serde_json::from_value(payload).map_err(|err| ConversationError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn conv() -> ConversationId {
        ConversationId::new("conv-1")
    }

    fn samples() -> Vec<HostMessage> {
        vec![
            HostMessage::Text(TextMessage {
                id: MessageId::new("t1"),
                role: Role::System,
                content: "You are helpful.".to_string(),
            }),
            HostMessage::ActionExecution(ActionExecutionMessage {
                id: MessageId::new("a1"),
                name: "lookup_flights".to_string(),
                arguments: json!({ "from": "CDG", "to": "NRT" }),
                parent_message_id: Some(MessageId::new("t1")),
            }),
            HostMessage::Result(ResultMessage {
                id: MessageId::new("r1"),
                action_execution_id: MessageId::new("a1"),
                action_name: "lookup_flights".to_string(),
                result: json!("3 flights found"),
            }),
            HostMessage::AgentState(AgentStateMessage {
                id: MessageId::new("s1"),
                agent_name: "planner".to_string(),
                node_name: Some("draft".to_string()),
                state: json!({ "step": 2 }),
                running: true,
            }),
            HostMessage::Image(ImageMessage {
                id: MessageId::new("i1"),
                role: Role::User,
                format: "png".to_string(),
                bytes: "iVBORw0KGgo=".to_string(),
            }),
        ]
    }

    #[test]
    fn test_round_trip_preserves_every_kind() {
        for message in samples() {
            let wire = to_wire(&message, &conv(), "alice");
            assert_eq!(wire.conversation_id, conv());
            assert_eq!(wire.owner, "alice");
            assert_eq!(to_host(&wire), message);
        }
    }

    #[test]
    fn test_round_trip_through_backend_assigned_id() {
        let message = HostMessage::text(Role::Assistant, "Sure, let's plan the trip.");
        let mut wire = to_wire(&message, &conv(), "alice");
        wire.id = MessageId::new("db-42");

        let back = to_host(&wire);
        assert_eq!(back.id(), message.id());
        assert_eq!(back.role(), Role::Assistant);
        assert_eq!(content_text(&back), "Sure, let's plan the trip.");
    }

    #[test]
    fn test_metadata_records_kind() {
        let wire = to_wire(&samples()[1], &conv(), "alice");
        assert_eq!(wire.metadata.get("type"), Some(&json!("action_execution")));
        assert!(wire.metadata.contains_key("payload"));
        assert_eq!(wire.content, r#"Action: lookup_flights({"from":"CDG","to":"NRT"})"#);
    }

    #[test]
    fn test_content_text_for_structured_kinds() {
        let all = samples();
        assert_eq!(content_text(&all[2]), "Result of lookup_flights: 3 flights found");
        assert_eq!(content_text(&all[3]), r#"Agent planner state: {"step":2}"#);
        assert_eq!(content_text(&all[4]), "[image: png]");
    }

    #[test]
    fn test_wire_without_metadata_decodes_as_text() {
        let wire: WireMessage = serde_json::from_value(json!({
            "id": "m9",
            "conversationId": "conv-1",
            "role": "tool",
            "content": "legacy row"
        }))
        .expect("legacy row decodes");

        let host = to_host(&wire);
        assert_eq!(host.id().as_str(), "m9");
        assert_eq!(host.role(), Role::User);
        assert_eq!(content_text(&host), "legacy row");
    }

    #[test]
    fn test_malformed_payload_falls_back_to_content() {
        let mut wire = to_wire(&samples()[1], &conv(), "alice");
        wire.metadata.insert("payload".to_string(), json!(17));

        let host = to_host(&wire);
        assert!(matches!(host, HostMessage::Text(_)));
        assert_eq!(host.id().as_str(), "a1");
        assert!(content_text(&host).starts_with("Action: lookup_flights"));
    }

    #[test]
    fn test_empty_text_round_trips_exactly() {
        let message = HostMessage::text(Role::User, "");
        let back = to_host(&to_wire(&message, &conv(), "alice"));
        assert_eq!(back, message);
    }

    #[test]
    fn test_unknown_kind_with_empty_content_uses_placeholder() {
        let mut wire = to_wire(&samples()[0], &conv(), "alice");
        wire.metadata.insert("type".to_string(), json!("hologram"));
        wire.content = String::new();

        let host = to_host(&wire);
        assert_eq!(content_text(&host), PLACEHOLDER_CONTENT);
    }
}
