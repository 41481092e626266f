//! Domain models for the notifier engine

mod credential;
mod message;
mod slot;

pub use credential::Credential;
pub use message::{ERROR_SUBJECT, EmailAddress, MessageDisplayData, MessageHeaders, MessageId};
pub use slot::{Slot, SlotAssignment};
