//! Conversation history persistence and live message synchronization for chat hosts.
//!
//! - [`client`]: HTTP persistence client behind the [`client::ConversationBackend`] seam
//! - [`message`]: host message model and the codec to and from wire messages
//! - [`store`]: the conversation state machine
//! - [`sync`]: the bridge keeping the live message list in step with the store
//! - [`history`]: the host-facing handle, inert when unconfigured
//! - [`server`]: an in-memory reference backend

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(unsafe_code)] // Le code unsafe est interdit
#![deny(missing_docs)] // Toute fonction, struct, enum ou module public doit être documenté
#![deny(non_camel_case_types)] // Les types doivent suivre la convention CamelCase
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option
#![deny(nonstandard_style)] // Empêche tout style de code non standard

// Clippy pour stricte discipline
#![deny(clippy::all)] // Active toutes les lints Clippy standard
#![warn(clippy::pedantic)] // Lints très strictes de Clippy
#![deny(clippy::unwrap_used)] // Interdit unwrap()
#![deny(clippy::expect_used)] // Interdit expect()
#![deny(clippy::panic)] // Interdit panic!()
#![deny(clippy::print_stdout)] // Interdit println!() en production
#![deny(clippy::todo)] // Interdit les TODO dans le code
#![deny(clippy::unimplemented)] // Interdit les fonctions non implémentées
#![deny(clippy::redundant_clone)] // Interdit les clones inutiles
// Les tests peuvent échouer bruyamment
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

/// Persistence client for the conversation backend.
pub mod client;
/// Identifiers, errors, configuration and wire types.
pub mod core;
/// Host-facing conversation history handle.
pub mod history;
/// Host messages and the wire codec.
pub mod message;
/// In-memory reference backend and its HTTP routes.
#[allow(clippy::missing_errors_doc)]
pub mod server;
/// Entry helpers for the reference backend binary.
pub mod start;
/// Conversation state and its operations.
pub mod store;
/// Live message list synchronization.
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::client::{ConversationBackend, HttpConversationClient};
pub use crate::core::config::{ConversationConfig, EndpointTemplates};
pub use crate::core::errors::{ConversationError, ConversationResult};
pub use crate::core::ids::{ConversationId, MessageId};
pub use crate::core::types::{Conversation, ConversationPatch, Role, WireMessage};
pub use crate::history::ConversationHistory;
pub use crate::message::HostMessage;
pub use crate::store::{ConversationState, ConversationStore, MessageLoad};
pub use crate::sync::{BridgeHandle, LiveMessages, SyncBridge};

/// Install the `tracing` fmt subscriber, filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
