//! HTTP implementation of the conversation backend.

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::client::{BackendFuture, ConversationBackend};
use crate::core::config::{ConversationConfig, EndpointTemplates};
use crate::core::errors::{ConversationError, ConversationResult};
use crate::core::ids::ConversationId;
use crate::core::types::{Conversation, ConversationPatch, NewConversation, WireMessage};

/// Keys a create response may carry the new id under, in priority order.
const CREATED_ID_KEYS: [&str; 3] = ["id", "conversationId", "_id"];

/// Timestamped title used when the caller gives none.
#[must_use]
pub fn default_title(now: DateTime<Utc>) -> String {
    format!("New Conversation {}", now.format("%Y-%m-%d %H:%M:%S"))
}

/// Conversation backend speaking the JSON-over-HTTP contract.
pub struct HttpConversationClient {
    client: reqwest::Client,
    base_url: String,
    user_id: String,
    endpoints: EndpointTemplates,
}

impl HttpConversationClient {
    /// Create a client for the given configuration.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &ConversationConfig) -> ConversationResult<Self> {
        config.validate()?;
        let client = Self::build_client(config)?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            user_id: config.user_id.clone(),
            endpoints: config.endpoints.clone(),
        })
    }

    /// Build an HTTP client carrying the configured headers.
    fn build_client(config: &ConversationConfig) -> ConversationResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ConversationError::InvalidConfig(format!("invalid header name: {e}"))
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                ConversationError::InvalidConfig(format!("invalid header value: {e}"))
            })?;
            headers.insert(name, value);
        }

        Ok(reqwest::Client::builder()
            .default_headers(headers)
            .gzip(true)
            .build()?)
    }

    /// Resolve an endpoint template against the base URL.
    fn url(&self, template: &str, id: Option<&ConversationId>) -> ConversationResult<Url> {
        let path = EndpointTemplates::render(template, id, &self.user_id);
        let joined = if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        };
        Ok(Url::parse(&joined)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "Sending conversation request");
        self.client.request(method, url)
    }

    /// Send a request and map non-2xx statuses to [`ConversationError::Api`].
    async fn send(request: RequestBuilder) -> ConversationResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(ConversationError::Api {
            status: status.as_u16(),
            message,
        })
    }

    /// Read a JSON list, treating an empty or `null` body as no items.
    async fn read_list<T: DeserializeOwned>(response: Response) -> ConversationResult<Vec<T>> {
        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let items: Option<Vec<T>> = serde_json::from_slice(&body)
            .map_err(|e| ConversationError::Decode(e.to_string()))?;
        Ok(items.unwrap_or_default())
    }

    async fn list_conversations_inner(&self) -> ConversationResult<Vec<Conversation>> {
        let url = self.url(&self.endpoints.list_conversations, None)?;
        let response = Self::send(self.request(Method::GET, url)).await?;
        let conversations: Vec<Conversation> = Self::read_list(response).await?;
        Ok(conversations
            .into_iter()
            .map(Conversation::normalized)
            .collect())
    }

    async fn list_messages_inner(&self, id: ConversationId) -> ConversationResult<Vec<WireMessage>> {
        let url = self.url(&self.endpoints.list_messages, Some(&id))?;
        let response = Self::send(self.request(Method::GET, url)).await?;
        Self::read_list(response).await
    }

    async fn create_conversation_inner(
        &self,
        title: Option<String>,
    ) -> ConversationResult<ConversationId> {
        let url = self.url(&self.endpoints.create_conversation, None)?;
        let body = NewConversation {
            user_id: self.user_id.clone(),
            title: title.unwrap_or_else(|| default_title(Utc::now())),
        };

        let response = Self::send(self.request(Method::POST, url).json(&body)).await?;
        let created: Value = response
            .json()
            .await
            .map_err(|e| ConversationError::Decode(e.to_string()))?;
        extract_created_id(&created).ok_or_else(|| {
            ConversationError::Decode("create response carries no conversation id".to_string())
        })
    }

    async fn delete_conversation_inner(&self, id: ConversationId) -> ConversationResult<()> {
        let url = self.url(&self.endpoints.delete_conversation, Some(&id))?;
        Self::send(self.request(Method::DELETE, url)).await?;
        Ok(())
    }

    async fn save_message_inner(
        &self,
        message: WireMessage,
        id: ConversationId,
    ) -> ConversationResult<()> {
        let url = self.url(&self.endpoints.save_message, Some(&id))?;
        let mut body = message.to_new();
        body.conversation_id = id;
        Self::send(self.request(Method::POST, url).json(&body)).await?;
        Ok(())
    }

    async fn update_conversation_inner(
        &self,
        id: ConversationId,
        patch: ConversationPatch,
    ) -> ConversationResult<()> {
        let url = self.url(&self.endpoints.update_conversation, Some(&id))?;
        Self::send(self.request(Method::PATCH, url).json(&patch)).await?;
        Ok(())
    }
}

/// Pick the new conversation id out of a create response.
fn extract_created_id(body: &Value) -> Option<ConversationId> {
    CREATED_ID_KEYS.iter().find_map(|key| match body.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(ConversationId::new(s.clone())),
        Some(Value::Number(n)) => Some(ConversationId::new(n.to_string())),
        _ => None,
    })
}

impl ConversationBackend for HttpConversationClient {
    fn list_conversations(&self) -> BackendFuture<'_, ConversationResult<Vec<Conversation>>> {
        Box::pin(self.list_conversations_inner())
    }

    fn list_messages(
        &self,
        id: ConversationId,
    ) -> BackendFuture<'_, ConversationResult<Vec<WireMessage>>> {
        Box::pin(self.list_messages_inner(id))
    }

    fn create_conversation(
        &self,
        title: Option<String>,
    ) -> BackendFuture<'_, ConversationResult<ConversationId>> {
        Box::pin(self.create_conversation_inner(title))
    }

    fn delete_conversation(&self, id: ConversationId) -> BackendFuture<'_, ConversationResult<()>> {
        Box::pin(self.delete_conversation_inner(id))
    }

    fn save_message(
        &self,
        message: WireMessage,
        id: ConversationId,
    ) -> BackendFuture<'_, ConversationResult<()>> {
        Box::pin(self.save_message_inner(message, id))
    }

    fn update_conversation(
        &self,
        id: ConversationId,
        patch: ConversationPatch,
    ) -> BackendFuture<'_, ConversationResult<()>> {
        Box::pin(self.update_conversation_inner(id, patch))
    }
}
