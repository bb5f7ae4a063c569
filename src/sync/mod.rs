//! Synchronization between the active conversation and the host's live
//! message list.

pub mod bridge;
pub mod live;

pub use bridge::{BridgeHandle, SyncBridge};
pub use live::{AppendObserver, LiveMessages, ObserverId};
