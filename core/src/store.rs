//! The optimistic state store - the locally-rendered view.
//!
//! The store holds an insertion-ordered log of records. Local sends are
//! applied optimistically and become visible to the very next
//! `snapshot()`; authoritative pushes and polls are merged in through
//! `reconcile()`, which promotes matching optimistic records to
//! confirmed and appends the rest.
//!
//! Reconciliation is idempotent: duplicated or reordered delivery of
//! the same message leaves the store unchanged after the first apply.
//! It also never fails - an unusable payload is reported as
//! [`ReconcileOutcome::Dropped`] and the session carries on, because a
//! single bad push must not corrupt the whole view.

use crate::{
    error::Result, ChatEntry, Error, LocalId, LocalRecord, MessageKind, Origin, SyncMessage,
    Timestamp,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// What `reconcile` did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// A pending optimistic record was confirmed
    Promoted(LocalId),
    /// A new confirmed record was appended
    Appended(LocalId),
    /// The message was already reconciled; store unchanged
    Duplicate,
    /// Envelope kind this store does not interpret; store unchanged
    Skipped,
    /// Payload unusable; store unchanged, caller should log
    Dropped,
}

/// The locally-rendered view of server-owned state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimisticStore {
    /// Records in insertion order (append-only, chat-log style)
    entries: Vec<LocalRecord>,
    /// Server identity keys already merged, for de-duplication
    seen_ids: HashSet<String>,
    /// Counter backing local id assignment
    next_local: u64,
}

impl OptimisticStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn next_local_id(&mut self) -> LocalId {
        self.next_local += 1;
        format!("local-{}", self.next_local)
    }

    /// Replace contents with authoritative history, in the given order.
    ///
    /// Called with the result of the initial seed fetch. Any previous
    /// contents - including pending optimistic records - are discarded;
    /// the seed is the server's full truth for this view.
    pub fn seed(&mut self, history: Vec<ChatEntry>) {
        self.entries.clear();
        self.seen_ids.clear();

        for entry in history {
            let local_id = self.next_local_id();
            if let Some(id) = &entry.id {
                self.seen_ids.insert(id.clone());
            }
            let applied_at = entry.timestamp;
            self.entries.push(LocalRecord {
                local_id,
                data: entry,
                origin: Origin::Confirmed,
                applied_at,
            });
        }
    }

    /// Insert an optimistic record and return its local id.
    ///
    /// The record is visible to the immediately following `snapshot()`.
    pub fn apply_optimistic(&mut self, entry: ChatEntry) -> LocalId {
        let local_id = self.next_local_id();
        let applied_at = entry.timestamp;
        self.entries.push(LocalRecord {
            local_id: local_id.clone(),
            data: entry,
            origin: Origin::Optimistic,
            applied_at,
        });
        local_id
    }

    /// Merge an authoritative push into the view.
    ///
    /// Matching order:
    /// 1. identity key, when the payload carries one (duplicates are
    ///    no-ops)
    /// 2. a pending optimistic record with the same sender and content
    ///    (the confirmation of a local send), earliest first
    /// 3. otherwise the entry is appended as a new confirmed record
    ///
    /// Never returns an error: unusable payloads yield `Dropped`.
    pub fn reconcile(&mut self, message: &SyncMessage) -> ReconcileOutcome {
        if message.kind != MessageKind::ChatUpdated {
            return ReconcileOutcome::Skipped;
        }

        if let Some(id) = message.identity() {
            if self.seen_ids.contains(id) {
                return ReconcileOutcome::Duplicate;
            }
        }

        let entry = match message.chat_entry() {
            Ok(entry) => entry,
            Err(_) => return ReconcileOutcome::Dropped,
        };

        if entry.id.is_none() && self.has_confirmed_copy(&entry) {
            return ReconcileOutcome::Duplicate;
        }

        // Confirmation of a local send: promote the earliest pending
        // optimistic record with matching content.
        if let Some(record) = self
            .entries
            .iter_mut()
            .find(|r| r.is_pending() && r.data.same_content(&entry))
        {
            let local_id = record.local_id.clone();
            record.confirm(entry.clone());
            if let Some(id) = &entry.id {
                self.seen_ids.insert(id.clone());
            }
            return ReconcileOutcome::Promoted(local_id);
        }

        // New server-side entry: append.
        let local_id = self.next_local_id();
        if let Some(id) = &entry.id {
            self.seen_ids.insert(id.clone());
        }
        let applied_at = entry.timestamp;
        self.entries.push(LocalRecord {
            local_id: local_id.clone(),
            data: entry,
            origin: Origin::Confirmed,
            applied_at,
        });
        ReconcileOutcome::Appended(local_id)
    }

    /// Duplicate check for payloads without an identity key: a
    /// confirmed record with the same sender, content, and timestamp
    /// already exists.
    fn has_confirmed_copy(&self, entry: &ChatEntry) -> bool {
        self.entries.iter().any(|r| {
            r.origin == Origin::Confirmed
                && r.data.same_content(entry)
                && r.data.timestamp == entry.timestamp
        })
    }

    /// The current ordered view for rendering.
    pub fn snapshot(&self) -> &[LocalRecord] {
        &self.entries
    }

    /// Look up a record by local id.
    pub fn get(&self, local_id: &str) -> Option<&LocalRecord> {
        self.entries.iter().find(|r| r.local_id == local_id)
    }

    /// Mark an optimistic record as failed (send not delivered).
    /// The record stays visible so the UI can offer a retry.
    pub fn mark_failed(&mut self, local_id: &str) -> Result<()> {
        let record = self
            .entries
            .iter_mut()
            .find(|r| r.local_id == local_id)
            .ok_or_else(|| Error::RecordNotFound(local_id.to_string()))?;
        record.origin = Origin::Failed;
        Ok(())
    }

    /// Return a failed record to pending, ahead of a retry.
    pub fn mark_pending(&mut self, local_id: &str) -> Result<()> {
        let record = self
            .entries
            .iter_mut()
            .find(|r| r.local_id == local_id)
            .ok_or_else(|| Error::RecordNotFound(local_id.to_string()))?;
        record.origin = Origin::Optimistic;
        Ok(())
    }

    /// Count of records still awaiting confirmation.
    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|r| r.is_pending()).count()
    }

    /// Optimistic records unconfirmed for longer than `window`.
    ///
    /// These are reconciliation conflicts: reported for logging, never
    /// rolled back automatically.
    pub fn stale_pending(&self, now: Timestamp, window: Timestamp) -> Vec<&LocalRecord> {
        self.entries
            .iter()
            .filter(|r| r.is_pending() && now.saturating_sub(r.applied_at) > window)
            .collect()
    }

    /// Number of records in the view.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the view holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
