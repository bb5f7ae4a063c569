//! Host message model and the codec to and from the wire format.

pub mod codec;
pub mod host;

pub use codec::{PLACEHOLDER_CONTENT, content_text, to_host, to_wire};
pub use host::{
    ActionExecutionMessage, AgentStateMessage, HostMessage, ImageMessage, ResultMessage,
    TextMessage,
};
