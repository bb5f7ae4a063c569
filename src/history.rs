//! Host-facing entry point that may or may not be configured.
//!
//! Without configuration every operation is inert: reads return empty
//! defaults, writes succeed without doing anything and no request is sent.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::client::{ConversationBackend, HttpConversationClient};
use crate::core::config::ConversationConfig;
use crate::core::errors::ConversationResult;
use crate::core::ids::ConversationId;
use crate::core::types::{Conversation, ConversationPatch};
use crate::message::host::HostMessage;
use crate::store::{ConversationState, ConversationStore, MessageLoad};
use crate::sync::{BridgeHandle, LiveMessages, SyncBridge};

struct Enabled {
    store: Arc<ConversationStore>,
    auto_save: bool,
}

/// Conversation history for one host, enabled only when configured.
pub struct ConversationHistory {
    live: Arc<LiveMessages>,
    enabled: Option<Enabled>,
}

impl ConversationHistory {
    /// History with every feature turned off.
    #[must_use]
    pub fn disabled(live: Arc<LiveMessages>) -> Self {
        Self { live, enabled: None }
    }

    /// Build from optional configuration; `None` yields a disabled history.
    ///
    /// # Errors
    /// Returns `InvalidConfig` (or a URL error) when a present configuration
    /// does not validate.
    pub fn from_config(
        config: Option<ConversationConfig>,
        live: Arc<LiveMessages>,
    ) -> ConversationResult<Self> {
        let Some(config) = config else {
            debug!("No conversation configuration, history disabled");
            return Ok(Self::disabled(live));
        };
        let client = HttpConversationClient::new(&config)?;
        info!(api = %config.api_base_url, auto_save = config.auto_save, "Conversation history enabled");
        Ok(Self::with_backend(Arc::new(client), config.user_id, config.auto_save, live))
    }

    /// Build from `CONVO_SYNC_*` environment variables.
    ///
    /// # Errors
    /// Returns an error when the variables are present but invalid.
    pub fn from_env(live: Arc<LiveMessages>) -> ConversationResult<Self> {
        Self::from_config(ConversationConfig::from_env()?, live)
    }

    /// Enabled history over any backend.
    #[must_use]
    pub fn with_backend(
        backend: Arc<dyn ConversationBackend>,
        owner: impl Into<String>,
        auto_save: bool,
        live: Arc<LiveMessages>,
    ) -> Self {
        Self {
            live,
            enabled: Some(Enabled {
                store: Arc::new(ConversationStore::new(backend, owner)),
                auto_save,
            }),
        }
    }

    /// Whether conversation features are active.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled.is_some()
    }

    /// Underlying store, when enabled.
    #[must_use]
    pub fn store(&self) -> Option<&Arc<ConversationStore>> {
        self.enabled.as_ref().map(|enabled| &enabled.store)
    }

    /// The host's live message list.
    #[must_use]
    pub fn live(&self) -> &Arc<LiveMessages> {
        &self.live
    }

    /// Start keeping the live list in sync. `None` when disabled.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn start_sync(&self) -> Option<BridgeHandle> {
        let enabled = self.enabled.as_ref()?;
        let bridge = SyncBridge::new(Arc::clone(&enabled.store), Arc::clone(&self.live), enabled.auto_save);
        Some(bridge.spawn())
    }

    /// Current state; the initial state when disabled.
    #[must_use]
    pub fn state(&self) -> ConversationState {
        self.store().map(|store| store.snapshot()).unwrap_or_default()
    }

    /// Observe state changes. `None` when disabled.
    #[must_use]
    pub fn subscribe(&self) -> Option<watch::Receiver<ConversationState>> {
        self.store().map(|store| store.subscribe())
    }

    /// Known conversations.
    #[must_use]
    pub fn conversations(&self) -> Vec<Conversation> {
        self.store().map(|store| store.conversations()).unwrap_or_default()
    }

    /// Active conversation id.
    #[must_use]
    pub fn current_conversation_id(&self) -> Option<ConversationId> {
        self.store().and_then(|store| store.current_conversation_id())
    }

    /// Metadata of the active conversation.
    #[must_use]
    pub fn current_conversation(&self) -> Option<Conversation> {
        self.store().and_then(|store| store.current_conversation())
    }

    /// See [`ConversationStore::load_conversations`].
    pub async fn load_conversations(&self) {
        if let Some(store) = self.store() {
            store.load_conversations().await;
        }
    }

    /// See [`ConversationStore::refresh_conversations`].
    pub async fn refresh_conversations(&self) {
        if let Some(store) = self.store() {
            store.refresh_conversations().await;
        }
    }

    /// See [`ConversationStore::load_conversation`]; no messages when disabled.
    pub async fn load_conversation(&self, id: &ConversationId) -> MessageLoad {
        match self.store() {
            Some(store) => store.load_conversation(id).await,
            None => MessageLoad::Current(Vec::new()),
        }
    }

    /// Create a conversation. `Ok(None)` when disabled.
    ///
    /// # Errors
    /// Propagates backend failures.
    pub async fn create_conversation(&self, title: Option<String>) -> ConversationResult<Option<ConversationId>> {
        match self.store() {
            Some(store) => store.create_conversation(title).await.map(Some),
            None => Ok(None),
        }
    }

    /// Create a conversation, make it active and refresh the list.
    ///
    /// # Errors
    /// Propagates a create failure; nothing is switched in that case.
    pub async fn start_conversation(&self, title: Option<String>) -> ConversationResult<Option<ConversationId>> {
        let Some(store) = self.store() else {
            return Ok(None);
        };
        let id = store.create_conversation(title).await?;
        store.set_current_conversation(Some(id.clone()));
        store.refresh_conversations().await;
        Ok(Some(id))
    }

    /// Delete a conversation.
    ///
    /// # Errors
    /// Propagates backend failures other than 404.
    pub async fn delete_conversation(&self, id: &ConversationId) -> ConversationResult<()> {
        match self.store() {
            Some(store) => store.delete_conversation(id).await,
            None => Ok(()),
        }
    }

    /// Apply a partial update.
    ///
    /// # Errors
    /// Propagates backend failures.
    pub async fn update_conversation(&self, id: &ConversationId, patch: ConversationPatch) -> ConversationResult<()> {
        match self.store() {
            Some(store) => store.update_conversation(id, patch).await,
            None => Ok(()),
        }
    }

    /// Rename a conversation.
    ///
    /// # Errors
    /// Propagates backend failures.
    pub async fn rename_conversation(&self, id: &ConversationId, title: impl Into<String>) -> ConversationResult<()> {
        self.update_conversation(id, ConversationPatch::title(title)).await
    }

    /// Select the active conversation.
    pub fn set_current_conversation(&self, id: Option<ConversationId>) {
        if let Some(store) = self.store() {
            store.set_current_conversation(id);
        }
    }

    /// Save into the active conversation; never fails.
    pub async fn save_message(&self, message: &HostMessage) {
        if let Some(store) = self.store() {
            store.save_message(message).await;
        }
    }

    /// Case-insensitive title search.
    #[must_use]
    pub fn search_conversations(&self, query: &str) -> Vec<Conversation> {
        self.store()
            .map(|store| store.search_conversations(query))
            .unwrap_or_default()
    }

    /// Dismiss the current error.
    pub fn clear_error(&self) {
        if let Some(store) = self.store() {
            store.clear_error();
        }
    }
}
