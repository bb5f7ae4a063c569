//! Configuration for the conversation subsystem.
//!
//! The host supplies an `Option<ConversationConfig>`; `None` keeps every
//! conversation feature inert.

use std::collections::BTreeMap;

use reqwest::header::{HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::errors::{ConversationError, ConversationResult};
use crate::core::ids::ConversationId;

/// Environment variable holding the backend base URL. Unset means disabled.
pub const API_URL_ENV: &str = "CONVO_SYNC_API_URL";
/// Environment variable holding the owner identity.
pub const USER_ID_ENV: &str = "CONVO_SYNC_USER_ID";
/// Environment variable toggling auto-save (`true`/`false`/`1`/`0`).
pub const AUTO_SAVE_ENV: &str = "CONVO_SYNC_AUTO_SAVE";
/// Environment variable holding an `Authorization` header value.
pub const AUTHORIZATION_ENV: &str = "CONVO_SYNC_AUTHORIZATION";

/// Placeholder for the conversation id in endpoint templates.
const ID_PLACEHOLDER: &str = "{id}";
/// Placeholder for the owner in endpoint templates.
const USER_ID_PLACEHOLDER: &str = "{userId}";

/// Top-level configuration for conversation persistence.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationConfig {
    /// Base URL every endpoint path is resolved against.
    pub api_base_url: String,
    /// Owner identity scoping every conversation.
    pub user_id: String,
    /// Extra headers attached to every request (e.g. authorization).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Persist every new live message automatically.
    #[serde(default = "default_auto_save")]
    pub auto_save: bool,
    /// Endpoint path templates.
    #[serde(default)]
    pub endpoints: EndpointTemplates,
}

const fn default_auto_save() -> bool {
    true
}

impl ConversationConfig {
    /// Create a config with default headers, auto-save and endpoints.
    #[must_use]
    pub fn new(api_base_url: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            user_id: user_id.into(),
            headers: BTreeMap::new(),
            auto_save: default_auto_save(),
            endpoints: EndpointTemplates::default(),
        }
    }

    /// Add a header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Enable or disable auto-save.
    #[must_use]
    pub const fn with_auto_save(mut self, auto_save: bool) -> Self {
        self.auto_save = auto_save;
        self
    }

    /// Replace the endpoint templates.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: EndpointTemplates) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Read the configuration from the environment.
    ///
    /// Returns `Ok(None)` when [`API_URL_ENV`] is unset, which is the
    /// supported "feature disabled" state.
    ///
    /// # Errors
    /// Returns an error if a variable is present but malformed, or if the
    /// resulting configuration fails validation.
    pub fn from_env() -> ConversationResult<Option<Self>> {
        let Ok(api_base_url) = std::env::var(API_URL_ENV) else {
            return Ok(None);
        };
        let user_id = std::env::var(USER_ID_ENV).map_err(|_| {
            ConversationError::InvalidConfig(format!("{USER_ID_ENV} must be set"))
        })?;

        let mut config = Self::new(api_base_url, user_id);
        if let Ok(raw) = std::env::var(AUTO_SAVE_ENV) {
            config.auto_save = parse_flag(&raw).ok_or_else(|| {
                ConversationError::InvalidConfig(format!("{AUTO_SAVE_ENV} must be a boolean"))
            })?;
        }
        if let Ok(auth) = std::env::var(AUTHORIZATION_ENV) {
            config = config.with_header("Authorization", auth);
        }

        config.validate()?;
        Ok(Some(config))
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ConversationResult<()> {
        if self.user_id.trim().is_empty() {
            return Err(ConversationError::InvalidConfig(
                "user_id must not be empty".to_string(),
            ));
        }

        let base = Url::parse(&self.api_base_url)?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConversationError::InvalidConfig(format!(
                "api_base_url must be http(s), got {}",
                base.scheme()
            )));
        }

        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
                ConversationError::InvalidConfig(format!("invalid header name {name:?}"))
            })?;
            HeaderValue::from_str(value).map_err(|_| {
                ConversationError::InvalidConfig(format!("invalid value for header {name:?}"))
            })?;
        }

        Ok(())
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Endpoint path templates, relative to the base URL.
///
/// `{id}` expands to the conversation id and `{userId}` to the owner; both
/// are percent-encoded on substitution.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointTemplates {
    /// `GET` listing conversations of an owner.
    pub list_conversations: String,
    /// `GET` listing messages of a conversation.
    pub list_messages: String,
    /// `POST` creating a conversation.
    pub create_conversation: String,
    /// `POST` appending a message.
    pub save_message: String,
    /// `PATCH` updating conversation fields.
    pub update_conversation: String,
    /// `DELETE` removing a conversation.
    pub delete_conversation: String,
}

impl Default for EndpointTemplates {
    fn default() -> Self {
        Self {
            list_conversations: "/conversations?userId={userId}".to_string(),
            list_messages: "/conversations/{id}/messages".to_string(),
            create_conversation: "/conversations".to_string(),
            save_message: "/conversations/{id}/messages".to_string(),
            update_conversation: "/conversations/{id}".to_string(),
            delete_conversation: "/conversations/{id}".to_string(),
        }
    }
}

impl EndpointTemplates {
    /// Expand a template for the given conversation and owner.
    #[must_use]
    pub fn render(template: &str, id: Option<&ConversationId>, user_id: &str) -> String {
        let mut path = template.replace(USER_ID_PLACEHOLDER, &urlencoding::encode(user_id));
        if let Some(id) = id {
            path = path.replace(ID_PLACEHOLDER, &urlencoding::encode(id.as_str()));
        }
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ConversationConfig::new("http://localhost:4000/api", "user-1");
        assert!(config.auto_save);
        assert!(config.headers.is_empty());
        assert_eq!(config.endpoints, EndpointTemplates::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ConversationConfig::new("https://chat.example.com", "alice")
            .with_header("Authorization", "Bearer abc")
            .with_auto_save(false);

        assert!(!config.auto_save);
        assert_eq!(
            config.headers.get("Authorization").map(String::as_str),
            Some("Bearer abc")
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ConversationConfig::new("not a url", "u").validate().is_err());
        assert!(ConversationConfig::new("ftp://host", "u").validate().is_err());
        assert!(ConversationConfig::new("http://host", "  ").validate().is_err());
        assert!(
            ConversationConfig::new("http://host", "u")
                .with_header("bad header", "x")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_deserialize_camel_case_with_defaults() {
        let raw = r#"{"apiBaseUrl":"http://localhost:4000","userId":"bob"}"#;
        let config: ConversationConfig = serde_json::from_str(raw).expect("valid config json");
        assert_eq!(config.user_id, "bob");
        assert!(config.auto_save);
        assert_eq!(config.endpoints.list_messages, "/conversations/{id}/messages");
    }

    #[test]
    fn test_render_encodes_values() {
        let id = ConversationId::new("a/b c");
        let path = EndpointTemplates::render("/conversations/{id}/messages", Some(&id), "u");
        assert_eq!(path, "/conversations/a%2Fb%20c/messages");

        let list = EndpointTemplates::render("/conversations?userId={userId}", None, "jo@x");
        assert_eq!(list, "/conversations?userId=jo%40x");
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
