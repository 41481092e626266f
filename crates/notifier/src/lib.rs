//! Notifier crate - Business logic for the unread-mail notifier
//!
//! This crate provides the platform-independent engine behind the notifier:
//! - Domain models (MessageId, MessageDisplayData, slot table)
//! - Gmail API client and OAuth credential handling
//! - Slot reconciliation with a per-message display cache
//! - A background poll worker driven by UI events
//!
//! This crate has zero UI dependencies. Hosts drive it through
//! [`NotifierService`] and receive [`Notification`]s on a channel.

pub mod auth;
pub mod config;
pub mod error;
pub mod gmail;
pub mod models;
pub mod provider;
pub mod service;
pub mod sync;

pub use auth::{OAuthSession, TokenStore, extract_auth_code};
pub use config::{GmailCredentials, NotifierConfig};
pub use error::{AuthRequired, ProviderError, SyncError};
pub use gmail::GmailClient;
pub use models::{Credential, EmailAddress, MessageDisplayData, MessageHeaders, MessageId, Slot, SlotAssignment};
pub use provider::{MailProvider, TokenGrant};
pub use service::{Notification, NotificationSink, NotifierService, UiEvent, parse_event};
pub use sync::{
    CycleOutcome, MessageCache, MessageSource, PollScheduler, PollWorker, ReconcileStats,
    SlotReconciler, SlotUpdate,
};
