//! Notifications emitted by the grouping store.
//!
//! Each operation publishes only the slice of state it touched. Subscribers
//! keep whatever they last received for each slice; the only full snapshot is
//! [`FetchState`], sent when a fetch starts and when it settles.

use serde::Serialize;

use crate::model::merged::MergedItem;
use crate::model::similar::SimilarItem;
use crate::selection::{SelectionMap, UnmergeList};

/// Published when a fetch starts (`loading = true`) and when it settles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchState {
    /// Similar issues with at least one score at or above the threshold.
    pub similar_items: Vec<SimilarItem>,
    /// Similar issues hidden by default.
    pub filtered_similar_items: Vec<SimilarItem>,
    pub merged_items: Vec<MergedItem>,
    pub merged_links: Option<String>,
    pub similar_links: Option<String>,
    pub merge_state: SelectionMap,
    pub unmerge_state: SelectionMap,
    pub loading: bool,
    pub error: bool,
    pub enable_fingerprint_compare: bool,
    pub unmerge_list: UnmergeList,
}

/// Published by `toggle_merge` and around `merge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeSnapshot {
    pub merge_disabled: bool,
    pub merge_state: SelectionMap,
    pub merge_list: Vec<String>,
}

/// Published by `toggle_unmerge` and around `unmerge`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmergeSnapshot {
    pub unmerge_disabled: bool,
    pub unmerge_state: SelectionMap,
    pub unmerge_list: UnmergeList,
    pub enable_fingerprint_compare: bool,
    pub unmerge_last_collapsed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEvent {
    Fetch(FetchState),
    Merge(MergeSnapshot),
    Unmerge(UnmergeSnapshot),
    CollapseAll {
        unmerge_last_collapsed: bool,
        unmerge_state: SelectionMap,
    },
    CollapseOne {
        unmerge_state: SelectionMap,
    },
    /// One-off signal after a merge that reported its surviving issue.
    MergedParent {
        merged_parent: String,
    },
    ShowAllSimilar,
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Listeners in registration order.
#[derive(Default)]
pub(crate) struct Listeners {
    next_id: u64,
    entries: Vec<(ListenerId, Listener)>,
}

impl Listeners {
    pub(crate) fn add(&mut self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, listener));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub(crate) fn emit(&mut self, event: &StoreEvent) {
        for (_, listener) in &mut self.entries {
            listener(event);
        }
    }
}
