//! Per-row interaction state for the merge and unmerge lists.

use std::collections::BTreeMap;

use serde::Serialize;

/// Interaction flags of one row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RowState {
    pub checked: bool,
    pub busy: bool,
    pub collapsed: bool,
}

/// A partial update applied on top of a [`RowState`]; `None` keeps the field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RowPatch {
    pub checked: Option<bool>,
    pub busy: Option<bool>,
    pub collapsed: Option<bool>,
}

impl RowPatch {
    #[must_use]
    pub const fn checked(mut self, value: bool) -> Self {
        self.checked = Some(value);
        self
    }

    #[must_use]
    pub const fn busy(mut self, value: bool) -> Self {
        self.busy = Some(value);
        self
    }

    #[must_use]
    pub const fn collapsed(mut self, value: bool) -> Self {
        self.collapsed = Some(value);
        self
    }

    fn apply(self, state: &mut RowState) {
        if let Some(checked) = self.checked {
            state.checked = checked;
        }
        if let Some(busy) = self.busy {
            state.busy = busy;
        }
        if let Some(collapsed) = self.collapsed {
            state.collapsed = collapsed;
        }
    }
}

/// Row id → [`RowState`].
///
/// Entries appear on first update and are only dropped by [`SelectionMap::clear`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectionMap {
    rows: BTreeMap<String, RowState>,
}

impl SelectionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RowState> {
        self.rows.get(id)
    }

    /// Current state of `id`, or the all-false default when untouched.
    #[must_use]
    pub fn state_of(&self, id: &str) -> RowState {
        self.rows.get(id).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn is_busy(&self, id: &str) -> bool {
        self.rows.get(id).is_some_and(|state| state.busy)
    }

    /// Merge `patch` into the entry for `id`, creating it if needed.
    pub fn update(&mut self, id: &str, patch: RowPatch) -> RowState {
        let state = self.rows.entry(id.to_string()).or_default();
        patch.apply(state);
        *state
    }

    /// Apply the same `patch` to every id in `ids`.
    pub fn update_all<'a, I>(&mut self, ids: I, patch: RowPatch)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for id in ids {
            self.update(id, patch);
        }
    }

    /// Number of entries currently flagged busy, whether or not they are
    /// still listed in the fetched collection.
    #[must_use]
    pub fn busy_count(&self) -> usize {
        self.rows.values().filter(|state| state.busy).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowState)> {
        self.rows.iter().map(|(id, state)| (id.as_str(), state))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }
}

/// One fingerprint picked for unmerge with the event that represents it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmergeEntry {
    pub fingerprint: String,
    pub event_id: String,
}

/// Fingerprints selected for unmerge, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UnmergeList {
    entries: Vec<UnmergeEntry>,
}

impl UnmergeList {
    #[must_use]
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.iter().any(|e| e.fingerprint == fingerprint)
    }

    /// Insert or replace the event id for `fingerprint`.
    pub fn insert(&mut self, fingerprint: &str, event_id: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.fingerprint == fingerprint) {
            entry.event_id = event_id.to_string();
        } else {
            self.entries.push(UnmergeEntry {
                fingerprint: fingerprint.to_string(),
                event_id: event_id.to_string(),
            });
        }
    }

    /// Remove `fingerprint`; returns whether it was present.
    pub fn remove(&mut self, fingerprint: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.fingerprint != fingerprint);
        self.entries.len() != before
    }

    #[must_use]
    pub fn event_id(&self, fingerprint: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.fingerprint == fingerprint)
            .map(|e| e.event_id.as_str())
    }

    #[must_use]
    pub fn fingerprints(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.fingerprint.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UnmergeEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
