//! Conversation state container and its mutation operations.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashSet;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::client::ConversationBackend;
use crate::core::errors::ConversationResult;
use crate::core::ids::ConversationId;
use crate::core::types::{Conversation, ConversationPatch};
use crate::message::codec::{to_host, to_wire};
use crate::message::host::HostMessage;
use crate::store::state::{ConversationState, MessageLoad, StateError};

/// Maximum preview length kept locally, in characters.
const PREVIEW_CHARS: usize = 100;

/// Owns [`ConversationState`] and mediates every change to it.
///
/// Asynchronous completions may arrive out of order. Each list load takes a
/// request token and only the latest one is applied. A message load is stale
/// once the active conversation has changed since it was issued.
pub struct ConversationStore {
    backend: Arc<dyn ConversationBackend>,
    owner: String,
    state: watch::Sender<ConversationState>,
    list_requests: AtomicU64,
    deleted: DashSet<ConversationId>,
}

impl ConversationStore {
    /// Create a store over `backend` for `owner`.
    #[must_use]
    pub fn new(backend: Arc<dyn ConversationBackend>, owner: impl Into<String>) -> Self {
        Self {
            backend,
            owner: owner.into(),
            state: watch::Sender::new(ConversationState::default()),
            list_requests: AtomicU64::new(0),
            deleted: DashSet::new(),
        }
    }

    /// Owner identity this store persists under.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Observe state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> ConversationState {
        self.state.borrow().clone()
    }

    /// Known conversations.
    #[must_use]
    pub fn conversations(&self) -> Vec<Conversation> {
        self.state.borrow().conversations.clone()
    }

    /// Active conversation id.
    #[must_use]
    pub fn current_conversation_id(&self) -> Option<ConversationId> {
        self.state.borrow().current_conversation_id.clone()
    }

    /// Metadata of the active conversation, if loaded.
    #[must_use]
    pub fn current_conversation(&self) -> Option<Conversation> {
        self.state.borrow().current_conversation().cloned()
    }

    /// Selection counter; changes whenever the active conversation changes.
    #[must_use]
    pub fn selection(&self) -> u64 {
        self.state.borrow().selection
    }

    /// Fetch the conversation list.
    ///
    /// Failures land in `state.error` and keep the previous list. A response
    /// overtaken by a newer call is dropped without touching the state.
    pub async fn load_conversations(&self) {
        let token = self.list_requests.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|state| state.is_loading = true);

        let result = self.backend.list_conversations().await;

        if self.list_requests.load(Ordering::SeqCst) != token {
            debug!(token, "Discarding superseded conversation list");
            return;
        }

        match result {
            Ok(listed) => {
                let conversations = self.prepare_listing(listed);
                debug!(count = conversations.len(), "Loaded conversations");
                self.state.send_modify(|state| {
                    state.conversations = conversations;
                    state.initialized = true;
                    state.error = None;
                    state.is_loading = false;
                });
            }
            Err(err) => {
                warn!(%err, "Failed to load conversations");
                let error = StateError::from(&err);
                self.state.send_modify(|state| {
                    state.error = Some(error);
                    state.is_loading = false;
                });
            }
        }
    }

    /// Re-fetch the conversation list.
    pub async fn refresh_conversations(&self) {
        self.load_conversations().await;
    }

    /// Dedupe by id, drop locally deleted entries and order by recency.
    ///
    /// A deleted id the backend no longer lists is forgotten.
    fn prepare_listing(&self, listed: Vec<Conversation>) -> Vec<Conversation> {
        self.deleted.retain(|id| listed.iter().any(|c| &c.id == id));

        let mut seen = HashSet::new();
        let mut conversations: Vec<Conversation> = listed
            .into_iter()
            .filter(|c| !self.deleted.contains(&c.id))
            .filter(|c| seen.insert(c.id.clone()))
            .map(Conversation::normalized)
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        conversations
    }

    /// Fetch and decode the messages of `id`.
    ///
    /// The live message list is left alone; the caller applies the result.
    /// A missing conversation yields no messages. Other failures are recorded
    /// in `state.error` and also yield no messages.
    ///
    /// Loads of other conversations never interfere with each other; only a
    /// change of the active conversation while in flight makes the result
    /// [`MessageLoad::Superseded`].
    pub async fn load_conversation(&self, id: &ConversationId) -> MessageLoad {
        let selection = self.selection();
        let result = self.backend.list_messages(id.clone()).await;

        if self.selection() != selection {
            debug!(conversation_id = %id, selection, "Discarding superseded message load");
            return MessageLoad::Superseded;
        }

        match result {
            Ok(wire) => {
                debug!(conversation_id = %id, count = wire.len(), "Loaded messages");
                MessageLoad::Current(wire.iter().map(to_host).collect())
            }
            Err(err) if err.is_not_found() => {
                debug!(conversation_id = %id, "Conversation has no messages on the backend");
                MessageLoad::Current(Vec::new())
            }
            Err(err) => {
                warn!(conversation_id = %id, %err, "Failed to load messages");
                let error = StateError::from(&err);
                self.state.send_modify(|state| state.error = Some(error));
                MessageLoad::Current(Vec::new())
            }
        }
    }

    /// Create a conversation and return its id.
    ///
    /// Neither switches to it nor refreshes the list; compose with
    /// [`Self::set_current_conversation`] and [`Self::refresh_conversations`].
    ///
    /// # Errors
    /// Returns the backend error unchanged; the state is not modified.
    pub async fn create_conversation(
        &self,
        title: Option<String>,
    ) -> ConversationResult<ConversationId> {
        let id = self
            .backend
            .create_conversation(title)
            .await
            .inspect_err(|err| warn!(%err, "Failed to create conversation"))?;
        info!(conversation_id = %id, "Created conversation");
        Ok(id)
    }

    /// Delete a conversation, removing it locally once the backend agrees.
    ///
    /// A backend 404 counts as already deleted. Deleting the active
    /// conversation clears the selection.
    ///
    /// # Errors
    /// Returns any other backend error; the local list is left untouched.
    pub async fn delete_conversation(&self, id: &ConversationId) -> ConversationResult<()> {
        match self.backend.delete_conversation(id.clone()).await {
            Ok(()) => {}
            Err(err) if err.is_not_found() => {
                debug!(conversation_id = %id, "Conversation already deleted on the backend");
            }
            Err(err) => {
                warn!(conversation_id = %id, %err, "Failed to delete conversation");
                return Err(err);
            }
        }

        self.deleted.insert(id.clone());
        self.state.send_modify(|state| {
            state.conversations.retain(|c| &c.id != id);
            if state.current_conversation_id.as_ref() == Some(id) {
                state.current_conversation_id = None;
                state.selection = state.selection.wrapping_add(1);
            }
        });
        info!(conversation_id = %id, "Deleted conversation");
        Ok(())
    }

    /// Apply a partial update, mirroring it locally on success.
    ///
    /// # Errors
    /// Returns the backend error unchanged; the state is not modified.
    pub async fn update_conversation(
        &self,
        id: &ConversationId,
        patch: ConversationPatch,
    ) -> ConversationResult<()> {
        if patch.is_empty() {
            return Ok(());
        }

        self.backend
            .update_conversation(id.clone(), patch.clone())
            .await
            .inspect_err(|err| {
                warn!(conversation_id = %id, %err, "Failed to update conversation");
            })?;

        let now = Utc::now();
        self.state.send_if_modified(|state| {
            let Some(conversation) = state.conversations.iter_mut().find(|c| &c.id == id) else {
                return false;
            };
            conversation.apply(patch);
            conversation.touch(now);
            true
        });
        debug!(conversation_id = %id, "Updated conversation");
        Ok(())
    }

    /// Rename a conversation.
    ///
    /// # Errors
    /// Returns the backend error unchanged.
    pub async fn rename_conversation(
        &self,
        id: &ConversationId,
        title: impl Into<String>,
    ) -> ConversationResult<()> {
        self.update_conversation(id, ConversationPatch::title(title)).await
    }

    /// Select the active conversation. No I/O; observers react on their own.
    pub fn set_current_conversation(&self, id: Option<ConversationId>) {
        let changed = self.state.send_if_modified(|state| {
            if state.current_conversation_id == id {
                return false;
            }
            state.current_conversation_id = id;
            state.selection = state.selection.wrapping_add(1);
            true
        });
        if changed {
            debug!(current = ?self.current_conversation_id(), "Active conversation changed");
        }
    }

    /// Persist `message` into the active conversation, if any.
    ///
    /// Never fails: errors are logged and swallowed.
    pub async fn save_message(&self, message: &HostMessage) {
        let Some(id) = self.current_conversation_id() else {
            debug!(message_id = %message.id(), "No active conversation, message not saved");
            return;
        };
        self.save_message_to(message, id).await;
    }

    /// Persist `message` into `conversation_id`.
    ///
    /// Never fails and never touches `state.error`. On success the local
    /// preview, count and `updated_at` are refreshed best-effort.
    pub async fn save_message_to(&self, message: &HostMessage, conversation_id: ConversationId) {
        let wire = to_wire(message, &conversation_id, &self.owner);
        let preview: String = wire.content.chars().take(PREVIEW_CHARS).collect();

        if let Err(err) = self.backend.save_message(wire, conversation_id.clone()).await {
            warn!(
                conversation_id = %conversation_id,
                message_id = %message.id(),
                %err,
                "Failed to save message"
            );
            return;
        }

        let now = Utc::now();
        self.state.send_if_modified(|state| {
            let Some(conversation) = state
                .conversations
                .iter_mut()
                .find(|c| c.id == conversation_id)
            else {
                return false;
            };
            conversation.last_message_preview = Some(preview);
            conversation.message_count = Some(conversation.message_count.unwrap_or(0) + 1);
            conversation.touch(now);
            true
        });
        debug!(conversation_id = %conversation_id, message_id = %message.id(), "Saved message");
    }

    /// Save in a detached task, tagged with the conversation active *now*.
    ///
    /// Returns `None` when no conversation is active.
    pub fn spawn_save(self: &Arc<Self>, message: HostMessage) -> Option<JoinHandle<()>> {
        let conversation_id = self.current_conversation_id()?;
        let store = Arc::clone(self);
        Some(tokio::spawn(async move {
            store.save_message_to(&message, conversation_id).await;
        }))
    }

    /// Conversations whose title contains `query`, ignoring case.
    #[must_use]
    pub fn search_conversations(&self, query: &str) -> Vec<Conversation> {
        let needle = query.trim().to_lowercase();
        let state = self.state.borrow();
        if needle.is_empty() {
            return state.conversations.clone();
        }
        state
            .conversations
            .iter()
            .filter(|c| c.title_matches(&needle))
            .cloned()
            .collect()
    }

    /// Dismiss the current error.
    pub fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    /// Return to the initial state; in-flight loads are discarded.
    pub fn reset(&self) {
        self.list_requests.fetch_add(1, Ordering::SeqCst);
        self.deleted.clear();
        self.state.send_modify(|state| {
            let selection = state.selection.wrapping_add(1);
            *state = ConversationState {
                selection,
                ..ConversationState::default()
            };
        });
    }
}
