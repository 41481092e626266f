//! Polling engine
//!
//! [`SlotReconciler`] diffs each unread listing against the slot table,
//! [`PollWorker`] owns the Stopped/Running state machine around it and
//! [`PollScheduler`] runs the worker on a background thread.

mod cache;
mod reconcile;
mod scheduler;
mod worker;

pub use cache::MessageCache;
pub use reconcile::{CycleOutcome, MessageSource, ReconcileStats, SlotReconciler, SlotUpdate};
pub use scheduler::PollScheduler;
pub use worker::PollWorker;
