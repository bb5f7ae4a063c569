//! Test doubles shared by the unit tests of several modules.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::client::{BackendFuture, ConversationBackend, default_title};
use crate::core::errors::{ConversationError, ConversationResult};
use crate::core::ids::ConversationId;
use crate::core::types::{Conversation, ConversationPatch, WireMessage};
use crate::message::codec::to_wire;
use crate::message::host::HostMessage;
use crate::server::routes::create_router;
use crate::server::state::BackendState;

/// In-memory backend with call counters, failure injection and gates.
///
/// A gate holds a call after it has been counted until its sender fires or
/// is dropped, which lets tests force out-of-order completions.
pub(crate) struct ScriptedBackend {
    pub state: BackendState,
    owner: String,
    calls: DashMap<&'static str, usize>,
    failures: DashMap<&'static str, u16>,
    list_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    message_gates: DashMap<ConversationId, oneshot::Receiver<()>>,
}

impl ScriptedBackend {
    pub fn new(owner: &str) -> Self {
        Self {
            state: BackendState::new(),
            owner: owner.to_string(),
            calls: DashMap::new(),
            failures: DashMap::new(),
            list_gates: Mutex::new(VecDeque::new()),
            message_gates: DashMap::new(),
        }
    }

    pub fn seed_conversation(&self, title: &str) -> ConversationId {
        self.state.create_conversation(&self.owner, title)
    }

    pub fn seed_message(&self, id: &ConversationId, message: &HostMessage) {
        let wire = to_wire(message, id, &self.owner);
        let _ = self.state.append_message(id, wire.to_new());
    }

    pub fn saved_messages(&self, id: &ConversationId) -> Vec<WireMessage> {
        self.state.list_messages(id).unwrap_or_default()
    }

    /// Make every later call to `op` fail with `status`.
    pub fn fail(&self, op: &'static str, status: u16) {
        self.failures.insert(op, status);
    }

    pub fn recover(&self, op: &'static str) {
        self.failures.remove(op);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.calls.get(op).map_or(0, |entry| *entry)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    /// Hold the next `list_conversations` call until the sender fires.
    pub fn gate_next_list(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.list_gates
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(rx);
        tx
    }

    /// Hold the next `list_messages` call for `id` until the sender fires.
    pub fn gate_messages(&self, id: &ConversationId) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.message_gates.insert(id.clone(), rx);
        tx
    }

    fn enter(&self, op: &'static str) {
        *self.calls.entry(op).or_insert(0) += 1;
    }

    fn check(&self, op: &'static str) -> ConversationResult<()> {
        match self.failures.get(op).map(|entry| *entry) {
            Some(status) => Err(ConversationError::Api {
                status,
                message: format!("injected {op} failure"),
            }),
            None => Ok(()),
        }
    }

    fn not_found(id: &ConversationId) -> ConversationError {
        ConversationError::Api {
            status: 404,
            message: format!("conversation {id} not found"),
        }
    }
}

impl ConversationBackend for ScriptedBackend {
    fn list_conversations(&self) -> BackendFuture<'_, ConversationResult<Vec<Conversation>>> {
        Box::pin(async move {
            self.enter("list_conversations");
            let gate = self
                .list_gates
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.check("list_conversations")?;
            Ok(self.state.list_conversations(Some(&self.owner)))
        })
    }

    fn list_messages(
        &self,
        id: ConversationId,
    ) -> BackendFuture<'_, ConversationResult<Vec<WireMessage>>> {
        Box::pin(async move {
            self.enter("list_messages");
            let gate = self.message_gates.remove(&id).map(|(_, rx)| rx);
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            self.check("list_messages")?;
            self.state
                .list_messages(&id)
                .ok_or_else(|| Self::not_found(&id))
        })
    }

    fn create_conversation(
        &self,
        title: Option<String>,
    ) -> BackendFuture<'_, ConversationResult<ConversationId>> {
        Box::pin(async move {
            self.enter("create_conversation");
            self.check("create_conversation")?;
            let title = title.unwrap_or_else(|| default_title(Utc::now()));
            Ok(self.state.create_conversation(&self.owner, &title))
        })
    }

    fn delete_conversation(&self, id: ConversationId) -> BackendFuture<'_, ConversationResult<()>> {
        Box::pin(async move {
            self.enter("delete_conversation");
            self.check("delete_conversation")?;
            if self.state.delete_conversation(&id) {
                Ok(())
            } else {
                Err(Self::not_found(&id))
            }
        })
    }

    fn save_message(
        &self,
        message: WireMessage,
        id: ConversationId,
    ) -> BackendFuture<'_, ConversationResult<()>> {
        Box::pin(async move {
            self.enter("save_message");
            self.check("save_message")?;
            self.state
                .append_message(&id, message.to_new())
                .map(|_| ())
                .ok_or_else(|| Self::not_found(&id))
        })
    }

    fn update_conversation(
        &self,
        id: ConversationId,
        patch: ConversationPatch,
    ) -> BackendFuture<'_, ConversationResult<()>> {
        Box::pin(async move {
            self.enter("update_conversation");
            self.check("update_conversation")?;
            if self.state.update_conversation(&id, patch) {
                Ok(())
            } else {
                Err(Self::not_found(&id))
            }
        })
    }
}

/// Reference backend served on an ephemeral local port.
pub(crate) struct TestBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

pub(crate) async fn spawn_backend(required_authorization: Option<&str>) -> TestBackend {
    let mut state = BackendState::new();
    if let Some(value) = required_authorization {
        state = state.with_required_authorization(value);
    }
    let state = Arc::new(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let app = create_router(Arc::clone(&state));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestBackend {
        base_url: format!("http://{addr}"),
        state,
    }
}

/// Poll `condition` for up to two seconds.
pub(crate) async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..400 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
