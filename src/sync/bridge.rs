//! Background worker keeping the live message list in step with the store.

use std::sync::Arc;

use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::ids::ConversationId;
use crate::message::host::HostMessage;
use crate::store::{ConversationState, ConversationStore, MessageLoad};
use crate::sync::live::{AppendObserver, LiveMessages, ObserverId};

type SaveRequest = (HostMessage, ConversationId);

/// Connects a [`ConversationStore`] to the host's [`LiveMessages`].
///
/// - every change of the active conversation loads it and replaces the live
///   list with the result (a change to none clears it);
/// - with auto-save on, every append is saved into the conversation that was
///   active at append time, in a detached task.
pub struct SyncBridge {
    store: Arc<ConversationStore>,
    live: Arc<LiveMessages>,
    auto_save: bool,
    shutdown: Arc<Notify>,
}

/// Running bridge; shut it down to stop syncing.
pub struct BridgeHandle {
    task: JoinHandle<()>,
    shutdown: Arc<Notify>,
    live: Arc<LiveMessages>,
    observer: Option<ObserverId>,
}

impl SyncBridge {
    /// Create a bridge; nothing happens until [`Self::spawn`].
    #[must_use]
    pub fn new(store: Arc<ConversationStore>, live: Arc<LiveMessages>, auto_save: bool) -> Self {
        Self {
            store,
            live,
            auto_save,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Start the bridge as a tokio task.
    ///
    /// If a conversation is already active it is loaded right away.
    #[must_use]
    pub fn spawn(self) -> BridgeHandle {
        let (saves_tx, saves_rx) = mpsc::unbounded_channel();

        let observer = self.auto_save.then(|| {
            let store = Arc::clone(&self.store);
            let saves_tx = saves_tx.clone();
            let observer: AppendObserver = Arc::new(move |message: &HostMessage| {
                // Tag with the conversation active now, not at completion.
                let Some(id) = store.current_conversation_id() else {
                    debug!(message_id = %message.id(), "No active conversation, skipping auto-save");
                    return;
                };
                if saves_tx.send((message.clone(), id)).is_err() {
                    debug!("Bridge stopped, auto-save dropped");
                }
            });
            self.live.on_append(observer)
        });

        let shutdown = Arc::clone(&self.shutdown);
        let live = Arc::clone(&self.live);
        let task = tokio::spawn(async move {
            self.run(saves_tx, saves_rx).await;
        });

        BridgeHandle {
            task,
            shutdown,
            live,
            observer,
        }
    }

    async fn run(
        &self,
        // Held so the receiver never observes a closed channel.
        _saves_tx: mpsc::UnboundedSender<SaveRequest>,
        mut saves: mpsc::UnboundedReceiver<SaveRequest>,
    ) {
        let mut states = self.store.subscribe();
        let (mut seen, initial) = {
            let state = states.borrow_and_update();
            (state.selection, state.current_conversation_id.clone())
        };
        info!(auto_save = self.auto_save, "Starting conversation sync bridge");
        if let Some(id) = initial {
            self.spawn_load(id, seen);
        }

        loop {
            tokio::select! {
                changed = states.changed() => {
                    if changed.is_err() {
                        debug!("Conversation store dropped, stopping bridge");
                        break;
                    }
                    seen = self.on_state_change(&mut states, seen);
                }
                Some((message, id)) = saves.recv() => {
                    let store = Arc::clone(&self.store);
                    tokio::spawn(async move {
                        store.save_message_to(&message, id).await;
                    });
                }
                () = self.shutdown.notified() => {
                    info!("Conversation sync bridge shutting down");
                    break;
                }
            }
        }
    }

    /// React to a state change; returns the selection now handled.
    fn on_state_change(&self, states: &mut watch::Receiver<ConversationState>, seen: u64) -> u64 {
        let (selection, current) = {
            let state = states.borrow_and_update();
            (state.selection, state.current_conversation_id.clone())
        };
        if selection == seen {
            return seen;
        }

        match current {
            Some(id) => self.spawn_load(id, selection),
            None => {
                debug!("No active conversation, clearing live messages");
                self.live.clear();
            }
        }
        selection
    }

    /// Load `id` and apply it only if `selection` is still current on arrival.
    fn spawn_load(&self, id: ConversationId, selection: u64) {
        let store = Arc::clone(&self.store);
        let live = Arc::clone(&self.live);
        tokio::spawn(async move {
            let MessageLoad::Current(messages) = store.load_conversation(&id).await else {
                return;
            };
            let count = messages.len();
            // Checked under the list lock so a later switch always wins.
            if live.replace_if(messages, || store.selection() == selection) {
                debug!(conversation_id = %id, count, "Replaced live messages");
            } else {
                debug!(conversation_id = %id, "Selection moved on, discarding loaded messages");
            }
        });
    }
}

impl BridgeHandle {
    /// Stop syncing and wait for the worker to exit.
    ///
    /// Saves already handed to detached tasks still complete.
    pub async fn shutdown(self) {
        if let Some(observer) = self.observer {
            self.live.remove_observer(observer);
        }
        self.shutdown.notify_one();
        if let Err(err) = self.task.await {
            warn!(%err, "Conversation sync bridge task failed");
        }
    }

    /// Whether the worker has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
