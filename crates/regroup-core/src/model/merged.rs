//! Fingerprints merged into the current issue.
//!
//! The `hashes` endpoint returns one row per fingerprint, or one row per
//! (fingerprint, child) pair when hierarchical grouping is enabled. Rows that
//! share an `id` describe the same fingerprint and are coalesced here.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row state value marking a fingerprint that cannot be touched.
pub const LOCKED_STATE: &str = "locked";

/// Reference to the most recent event seen for a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestEvent {
    pub id: String,
    #[serde(rename = "eventID", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
}

/// One raw row of the `merged` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRow {
    pub id: String,
    #[serde(default)]
    pub event_count: Option<u64>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub latest_event: Option<LatestEvent>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub child_id: Option<String>,
    #[serde(default)]
    pub child_label: Option<String>,
}

impl MergedRow {
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.as_deref() == Some(LOCKED_STATE)
    }
}

/// A child sub-cluster listed under a merged fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedChild {
    pub child_id: String,
    pub child_label: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub latest_event: Option<LatestEvent>,
    pub event_count: Option<u64>,
}

/// A fingerprint merged into the current issue, after coalescing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedItem {
    pub id: String,
    pub event_count: u64,
    pub last_seen: Option<DateTime<Utc>>,
    pub latest_event: Option<LatestEvent>,
    pub state: Option<String>,
    pub children: Vec<MergedChild>,
}

impl MergedItem {
    fn seeded_from(row: &MergedRow) -> Self {
        Self {
            id: row.id.clone(),
            event_count: 0,
            last_seen: row.last_seen,
            latest_event: row.latest_event.clone(),
            state: row.state.clone(),
            children: Vec::new(),
        }
    }

    /// Only fingerprints with a latest event can be selected for unmerge.
    #[must_use]
    pub const fn is_selectable(&self) -> bool {
        self.latest_event.is_some()
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.as_deref() == Some(LOCKED_STATE)
    }
}

/// Result of coalescing a `merged` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoalescedMerged {
    /// Items in first-seen order.
    pub items: Vec<MergedItem>,
    /// `(id, locked)` for the first row of every id, in first-seen order.
    pub lock_states: Vec<(String, bool)>,
}

/// Coalesce raw rows sharing an `id` into one [`MergedItem`].
///
/// Event counts are summed across rows and a child is appended for every row
/// that carries a `child_id`. The first row of an id supplies `last_seen`,
/// `latest_event` and `state`; the service sorts rows by descending
/// `last_seen`, so the first row is the freshest.
#[must_use]
pub fn coalesce_merged_rows(rows: Vec<MergedRow>) -> CoalescedMerged {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out = CoalescedMerged::default();

    for row in rows {
        let slot = match index.get(&row.id) {
            Some(&slot) => slot,
            None => {
                out.lock_states.push((row.id.clone(), row.is_locked()));
                out.items.push(MergedItem::seeded_from(&row));
                index.insert(row.id.clone(), out.items.len() - 1);
                out.items.len() - 1
            }
        };

        let item = &mut out.items[slot];
        if let Some(count) = row.event_count {
            item.event_count = item.event_count.saturating_add(count);
        }
        if let Some(child_id) = row.child_id {
            item.children.push(MergedChild {
                child_id,
                child_label: row.child_label,
                last_seen: row.last_seen,
                latest_event: row.latest_event,
                event_count: row.event_count,
            });
        }
    }

    out
}
