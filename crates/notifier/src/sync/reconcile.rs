//! Slot reconciliation
//!
//! One cycle lists the current unread ids, diffs them position by position
//! against the slot table, resolves display data for the slots that changed
//! and emits one [`SlotUpdate`] per changed slot. Unchanged slots emit
//! nothing, so repeated cycles over an unchanged inbox are silent.

use chrono::Local;
use log::{debug, warn};

use super::MessageCache;
use crate::auth::OAuthSession;
use crate::error::{AuthRequired, SyncError};
use crate::models::{MessageDisplayData, MessageId, Slot, SlotAssignment};
use crate::provider::MailProvider;

/// What the reconciler needs from the provider side
pub trait MessageSource {
    /// Up to `max_results` unread ids, most recent first
    fn list_unread(&mut self, max_results: usize) -> Result<Vec<MessageId>, SyncError>;

    /// Display data for one message
    fn fetch_display_data(&mut self, id: &MessageId) -> Result<MessageDisplayData, SyncError>;
}

impl<P: MailProvider> MessageSource for OAuthSession<P> {
    fn list_unread(&mut self, max_results: usize) -> Result<Vec<MessageId>, SyncError> {
        OAuthSession::list_unread(self, max_results)
    }

    fn fetch_display_data(&mut self, id: &MessageId) -> Result<MessageDisplayData, SyncError> {
        match self.get_message_headers(id) {
            Ok(headers) => Ok(MessageDisplayData::from_headers(&headers, &Local)),
            Err(SyncError::Transient(message)) => Err(SyncError::Data {
                id: id.clone(),
                message,
            }),
            Err(e) => Err(e),
        }
    }
}

/// New content for one display row; `data: None` means the row is empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotUpdate {
    pub index: usize,
    pub data: Option<MessageDisplayData>,
}

impl SlotUpdate {
    pub fn empty(index: usize) -> Self {
        Self { index, data: None }
    }

    pub fn filled(index: usize, data: MessageDisplayData) -> Self {
        Self {
            index,
            data: Some(data),
        }
    }
}

/// Counters from one reconciliation pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Ids returned by the provider (before truncation to the slot count)
    pub listed: usize,
    /// Slots that now show a different message
    pub updated: usize,
    /// Slots that became empty
    pub cleared: usize,
    pub cache_hits: usize,
    pub fetched: usize,
    pub fetch_errors: usize,
}

impl ReconcileStats {
    pub fn emitted(&self) -> usize {
        self.updated + self.cleared
    }
}

/// Result of a cycle that did not hit an authorization failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed(ReconcileStats),
    /// The unread list could not be fetched; nothing changed
    Skipped(String),
}

/// Owns the slot table and the display-data cache
#[derive(Debug)]
pub struct SlotReconciler {
    slots: SlotAssignment,
    cache: MessageCache,
}

impl SlotReconciler {
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: SlotAssignment::new(slot_count),
            cache: MessageCache::new(),
        }
    }

    pub fn slots(&self) -> &SlotAssignment {
        &self.slots
    }

    pub fn cache(&self) -> &MessageCache {
        &self.cache
    }

    /// Run one reconciliation cycle
    ///
    /// Only authorization failures are returned as errors. A failed unread
    /// listing skips the cycle; a failed metadata fetch shows the error
    /// placeholder in that slot only.
    ///
    /// `emit` returns whether the update was delivered. A slot is only
    /// committed once its update is delivered, so a dropped update is sent
    /// again on the next cycle.
    pub fn reconcile<S>(
        &mut self,
        source: &mut S,
        emit: &mut dyn FnMut(SlotUpdate) -> bool,
    ) -> Result<CycleOutcome, AuthRequired>
    where
        S: MessageSource + ?Sized,
    {
        let listed = match source.list_unread(self.slots.len()) {
            Ok(ids) => ids,
            Err(SyncError::Auth(e)) => return Err(e),
            Err(e) => {
                debug!("Skipping cycle: {}", e);
                return Ok(CycleOutcome::Skipped(e.to_string()));
            }
        };

        let mut stats = ReconcileStats {
            listed: listed.len(),
            ..Default::default()
        };
        let result = self.apply(listed, source, emit, &mut stats);

        // Runs even when a fetch hit an auth failure part way through
        self.cache.retain_only(&self.slots.message_ids());

        result.map(|()| {
            debug!("Cycle complete: {:?}", stats);
            CycleOutcome::Completed(stats)
        })
    }

    fn apply<S>(
        &mut self,
        listed: Vec<MessageId>,
        source: &mut S,
        emit: &mut dyn FnMut(SlotUpdate) -> bool,
        stats: &mut ReconcileStats,
    ) -> Result<(), AuthRequired>
    where
        S: MessageSource + ?Sized,
    {
        let mut listed = listed.into_iter();

        for index in 0..self.slots.len() {
            let current = self.slots.get(index).message_id().cloned();

            match (listed.next(), current) {
                (None, None) => {}
                (None, Some(old)) => {
                    if emit(SlotUpdate::empty(index)) {
                        debug!("Slot {} now empty (was {})", index, old);
                        self.slots.set(index, Slot::Empty);
                        stats.cleared += 1;
                    }
                }
                (Some(id), Some(old)) if id == old => {}
                (Some(id), _) => {
                    let data = self.resolve(&id, source, stats)?;
                    if emit(SlotUpdate::filled(index, data)) {
                        debug!("Slot {} is now {}", index, id);
                        self.slots.set(index, Slot::Occupied(id));
                        stats.updated += 1;
                    }
                }
            }
        }

        Ok(())
    }

    /// Cached display data for `id`, fetching it on a miss
    fn resolve<S>(
        &mut self,
        id: &MessageId,
        source: &mut S,
        stats: &mut ReconcileStats,
    ) -> Result<MessageDisplayData, AuthRequired>
    where
        S: MessageSource + ?Sized,
    {
        if let Some(data) = self.cache.get(id) {
            stats.cache_hits += 1;
            return Ok(data.clone());
        }

        stats.fetched += 1;
        match source.fetch_display_data(id) {
            Ok(data) => {
                self.cache.put(id.clone(), data.clone());
                Ok(data)
            }
            Err(SyncError::Auth(e)) => Err(e),
            Err(e) => {
                warn!("{}", e);
                stats.fetch_errors += 1;
                Ok(MessageDisplayData::error_placeholder())
            }
        }
    }
}
