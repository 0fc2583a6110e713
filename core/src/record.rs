//! Locally held records and their confirmation state.

use crate::{ChatEntry, Timestamp};
use serde::{Deserialize, Serialize};

/// Identifier assigned to a record when it enters the local store.
/// Stable for the lifetime of the store, independent of any server id.
pub type LocalId = String;

/// Confirmation state of a locally held record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Applied locally, not yet acknowledged by the server
    Optimistic,
    /// Matches authoritative server state
    Confirmed,
    /// A send that could not be delivered; retryable
    Failed,
}

/// A locally held item as rendered by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalRecord {
    /// Store-assigned identifier
    pub local_id: LocalId,
    /// The entry data
    pub data: ChatEntry,
    /// Confirmation state
    pub origin: Origin,
    /// When the record entered the store (milliseconds since epoch)
    pub applied_at: Timestamp,
}

impl LocalRecord {
    /// Whether this record is still awaiting server confirmation.
    pub fn is_pending(&self) -> bool {
        self.origin == Origin::Optimistic
    }

    /// Promote an optimistic record to confirmed, adopting the
    /// authoritative entry (the server copy may carry an id or an
    /// adjusted timestamp).
    pub fn confirm(&mut self, authoritative: ChatEntry) {
        self.data = authoritative;
        self.origin = Origin::Confirmed;
    }
}
