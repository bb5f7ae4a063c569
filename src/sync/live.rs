//! The host's live message list.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::message::host::HostMessage;

/// Callback invoked synchronously after each append.
pub type AppendObserver = Arc<dyn Fn(&HostMessage) + Send + Sync>;

/// Registration handle returned by [`LiveMessages::on_append`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Ordered list of the messages currently shown by the host.
///
/// The host appends as the chat progresses. Only appends reach observers;
/// [`replace`](Self::replace) and [`clear`](Self::clear) are silent so that
/// loading a conversation never looks like new chat activity.
#[derive(Default)]
pub struct LiveMessages {
    messages: RwLock<Vec<HostMessage>>,
    observers: RwLock<Vec<(ObserverId, AppendObserver)>>,
    next_observer: AtomicU64,
}

impl LiveMessages {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message at the end and notify observers.
    pub fn append(&self, message: HostMessage) {
        self.messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());

        // Observers run without holding either lock.
        let observers: Vec<AppendObserver> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(&message);
        }
    }

    /// Swap in a whole new sequence without notifying observers.
    pub fn replace(&self, messages: Vec<HostMessage>) {
        *self.messages.write().unwrap_or_else(PoisonError::into_inner) = messages;
    }

    /// Like [`replace`](Self::replace), but only if `still_current` holds
    /// while the list is locked. Returns whether the list was replaced.
    pub fn replace_if(&self, messages: Vec<HostMessage>, still_current: impl FnOnce() -> bool) -> bool {
        let mut current = self.messages.write().unwrap_or_else(PoisonError::into_inner);
        if !still_current() {
            return false;
        }
        *current = messages;
        true
    }

    /// Drop every message without notifying observers.
    pub fn clear(&self) {
        self.messages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Copy of the current sequence.
    #[must_use]
    pub fn snapshot(&self) -> Vec<HostMessage> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Newest message, if any.
    #[must_use]
    pub fn last(&self) -> Option<HostMessage> {
        self.messages
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Register `observer` to run after every append.
    pub fn on_append(&self, observer: AppendObserver) -> ObserverId {
        let id = ObserverId(self.next_observer.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, observer));
        id
    }

    /// Unregister an observer. Returns whether it was registered.
    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|(registered, _)| *registered != id);
        observers.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::AtomicUsize;

    use crate::core::types::Role;

    fn counting_observer(counter: &Arc<AtomicUsize>) -> AppendObserver {
        let counter = Arc::clone(counter);
        Arc::new(move |_message: &HostMessage| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_append_notifies_observers() {
        let live = LiveMessages::new();
        let counter = Arc::new(AtomicUsize::new(0));
        live.on_append(counting_observer(&counter));

        live.append(HostMessage::text(Role::User, "one"));
        live.append(HostMessage::text(Role::Assistant, "two"));

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(live.len(), 2);
        assert_eq!(live.last().map(|m| m.role()), Some(Role::Assistant));
    }

    #[test]
    fn test_replace_and_clear_are_silent() {
        let live = LiveMessages::new();
        let counter = Arc::new(AtomicUsize::new(0));
        live.on_append(counting_observer(&counter));

        live.replace(vec![
            HostMessage::text(Role::User, "a"),
            HostMessage::text(Role::Assistant, "b"),
        ]);
        assert_eq!(live.len(), 2);
        live.clear();
        assert!(live.is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_replace_if_checks_condition() {
        let live = LiveMessages::new();
        live.append(HostMessage::text(Role::User, "kept"));

        assert!(!live.replace_if(Vec::new(), || false));
        assert_eq!(live.len(), 1);
        assert!(live.replace_if(Vec::new(), || true));
        assert!(live.is_empty());
    }

    #[test]
    fn test_removed_observer_stops_receiving() {
        let live = LiveMessages::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let id = live.on_append(counting_observer(&counter));

        assert!(live.remove_observer(id));
        assert!(!live.remove_observer(id));
        live.append(HostMessage::text(Role::User, "ignored"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_observer_may_read_the_list() {
        let live = Arc::new(LiveMessages::new());
        let seen = Arc::new(AtomicUsize::new(0));
        let observer: AppendObserver = {
            let live = Arc::downgrade(&live);
            let seen = Arc::clone(&seen);
            Arc::new(move |_message: &HostMessage| {
                if let Some(live) = live.upgrade() {
                    seen.store(live.len(), Ordering::SeqCst);
                }
            })
        };
        live.on_append(observer);

        live.append(HostMessage::text(Role::User, "x"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }
}
