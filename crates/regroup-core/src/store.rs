//! The grouping selection store.
//!
//! One store backs one issue's grouping page. It owns the fetched collections
//! (fingerprints merged into the issue, similar issues), the merge and unmerge
//! selection state, and runs the three network operations against them.
//!
//! # Fetch lifecycle
//!
//! A fetch is three steps so hosts with their own event loop can run the
//! network part elsewhere:
//!
//! 1. [`GroupingStore::begin_fetch`] resets all state, publishes a loading
//!    [`FetchState`], and returns a [`FetchTicket`].
//! 2. [`fetch_all`] issues the ticket's requests in parallel.
//! 3. [`GroupingStore::complete_fetch`] applies the outcome. A ticket from a
//!    fetch that has since been superseded is dropped without touching state.
//!
//! [`GroupingStore::fetch`] runs all three in place.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::descriptor::{DataKey, FetchDescriptor};
use crate::error::GroupingError;
use crate::event::{
    FetchState, ListenerId, Listeners, MergeSnapshot, StoreEvent, UnmergeSnapshot,
};
use crate::indicator::Indicator;
use crate::merge::{ApiGroupMerger, GroupMerger, MergeGroupsRequest};
use crate::model::merged::{MergedItem, MergedRow, coalesce_merged_rows};
use crate::model::similar::{SimilarItem, SimilarRow, partition_by_threshold};
use crate::selection::{RowPatch, SelectionMap, UnmergeList};

/// Everything the grouping page shows, replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingState {
    pub merged_items: Vec<MergedItem>,
    pub merged_links: Option<String>,
    pub similar_items: Vec<SimilarItem>,
    pub similar_links: Option<String>,
    /// Fingerprint → event id picked for unmerge.
    pub unmerge_list: UnmergeList,
    pub unmerge_state: SelectionMap,
    pub unmerge_disabled: bool,
    /// Value last applied by "collapse all".
    pub unmerge_last_collapsed: bool,
    pub enable_fingerprint_compare: bool,
    pub merge_list: Vec<String>,
    pub merge_state: SelectionMap,
    pub merge_disabled: bool,
    pub loading: bool,
    pub error: bool,
}

impl GroupingState {
    #[must_use]
    pub fn initial() -> Self {
        Self {
            merged_items: Vec::new(),
            merged_links: None,
            similar_items: Vec::new(),
            similar_links: None,
            unmerge_list: UnmergeList::default(),
            unmerge_state: SelectionMap::new(),
            unmerge_disabled: true,
            unmerge_last_collapsed: false,
            enable_fingerprint_compare: false,
            merge_list: Vec::new(),
            merge_state: SelectionMap::new(),
            merge_disabled: false,
            loading: true,
            error: false,
        }
    }
}

impl Default for GroupingState {
    fn default() -> Self {
        Self::initial()
    }
}

/// Route parameters of the page a merge is started from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParams {
    pub org_id: String,
    pub group_id: String,
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeArgs {
    /// `None` makes `merge` a no-op.
    pub params: Option<RouteParams>,
    pub query: Option<String>,
    /// Overrides `params.project_id` when set.
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmergeArgs {
    pub group_id: String,
    pub loading_message: String,
    pub success_message: String,
    pub error_message: String,
}

impl UnmergeArgs {
    /// Arguments with the stock indicator messages.
    #[must_use]
    pub fn for_group(group_id: impl Into<String>) -> Self {
        Self {
            group_id: group_id.into(),
            loading_message: "Unmerging events\u{2026}".to_string(),
            success_message: "Events successfully queued for unmerging.".to_string(),
            error_message: "Unable to queue events for unmerging.".to_string(),
        }
    }
}

/// Identifies one fetch; see the module docs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    requests: Vec<FetchDescriptor>,
}

impl FetchTicket {
    #[must_use]
    pub fn requests(&self) -> &[FetchDescriptor] {
        &self.requests
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

/// Raw result of one descriptor's request.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub data_key: DataKey,
    pub body: Value,
    pub link: Option<String>,
}

enum Decoded {
    Merged {
        items: Vec<MergedItem>,
        lock_states: Vec<(String, bool)>,
        link: Option<String>,
    },
    Similar {
        items: Vec<SimilarItem>,
        link: Option<String>,
    },
}

fn decode(response: FetchResponse) -> Result<Decoded, ApiError> {
    let FetchResponse {
        data_key,
        body,
        link,
    } = response;
    match data_key {
        DataKey::Merged => {
            let rows: Vec<MergedRow> = serde_json::from_value(body)
                .map_err(|err| ApiError::Decode(format!("merged rows: {err}")))?;
            let coalesced = coalesce_merged_rows(rows);
            Ok(Decoded::Merged {
                items: coalesced.items,
                lock_states: coalesced.lock_states,
                link,
            })
        }
        DataKey::Similar => {
            let rows: Vec<SimilarRow> = serde_json::from_value(body)
                .map_err(|err| ApiError::Decode(format!("similar rows: {err}")))?;
            Ok(Decoded::Similar {
                items: rows.into_iter().map(SimilarItem::from_row).collect(),
                link,
            })
        }
    }
}

/// Issue every request in parallel, one worker thread each.
///
/// Returns as soon as any request fails; workers still running finish on
/// their own and their results are dropped. Successful responses come back in
/// completion order.
///
/// # Errors
///
/// Returns the first [`ApiError`] reported by any worker.
pub fn fetch_all(
    api: &Arc<dyn ApiClient>,
    requests: &[FetchDescriptor],
) -> Result<Vec<FetchResponse>, ApiError> {
    let (tx, rx) = mpsc::channel();

    for descriptor in requests {
        let tx = tx.clone();
        let api = Arc::clone(api);
        let descriptor = descriptor.clone();
        thread::Builder::new()
            .name(format!("regroup-fetch-{}", descriptor.data_key))
            .spawn(move || {
                let result = api
                    .request(&descriptor.to_request())
                    .map(|response| FetchResponse {
                        data_key: descriptor.data_key,
                        body: response.body,
                        link: response.link,
                    });
                if tx.send(result).is_err() {
                    debug!(
                        endpoint = %descriptor.endpoint,
                        "fetch already settled; dropping late response"
                    );
                }
            })
            .map_err(|err| ApiError::Transport(format!("failed to start fetch worker: {err}")))?;
    }
    drop(tx);

    let mut responses = Vec::with_capacity(requests.len());
    for _ in 0..requests.len() {
        match rx.recv() {
            Ok(Ok(response)) => responses.push(response),
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(ApiError::Transport(
                    "fetch worker exited without a result".to_string(),
                ));
            }
        }
    }
    Ok(responses)
}

fn signed(count: usize) -> i64 {
    i64::try_from(count).unwrap_or(i64::MAX)
}

/// Page-scoped state container for merge and unmerge of one issue.
pub struct GroupingStore {
    api: Arc<dyn ApiClient>,
    merger: Box<dyn GroupMerger>,
    indicator: Box<dyn Indicator>,
    state: GroupingState,
    requests: Vec<FetchDescriptor>,
    generation: u64,
    last_fetch_error: Option<ApiError>,
    listeners: Listeners,
}

impl GroupingStore {
    /// Create a store merging through `api` as well.
    #[must_use]
    pub fn new(api: Arc<dyn ApiClient>, indicator: Box<dyn Indicator>) -> Self {
        let merger = Box::new(ApiGroupMerger::new(Arc::clone(&api)));
        Self {
            api,
            merger,
            indicator,
            state: GroupingState::initial(),
            requests: Vec::new(),
            generation: 0,
            last_fetch_error: None,
            listeners: Listeners::default(),
        }
    }

    /// Replace the merge collaborator.
    #[must_use]
    pub fn with_merger(mut self, merger: Box<dyn GroupMerger>) -> Self {
        self.merger = merger;
        self
    }

    // ---------------------------------------------------------------------
    // Subscription
    // ---------------------------------------------------------------------

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> ListenerId {
        self.listeners.add(Box::new(listener))
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    fn emit(&mut self, event: &StoreEvent) {
        self.listeners.emit(event);
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    #[must_use]
    pub const fn state(&self) -> &GroupingState {
        &self.state
    }

    /// Descriptors reused by `fetch(None)`.
    #[must_use]
    pub fn requests(&self) -> &[FetchDescriptor] {
        &self.requests
    }

    /// The error that ended the last fetch, if it failed.
    #[must_use]
    pub const fn last_fetch_error(&self) -> Option<&ApiError> {
        self.last_fetch_error.as_ref()
    }

    #[must_use]
    pub fn merged_item(&self, id: &str) -> Option<&MergedItem> {
        self.state.merged_items.iter().find(|item| item.id == id)
    }

    #[must_use]
    pub fn similar_item(&self, id: &str) -> Option<&SimilarItem> {
        self.state.similar_items.iter().find(|item| item.issue.id == id)
    }

    #[must_use]
    pub fn fetch_state(&self) -> FetchState {
        let (similar_items, filtered_similar_items) =
            partition_by_threshold(&self.state.similar_items);
        FetchState {
            similar_items,
            filtered_similar_items,
            merged_items: self.state.merged_items.clone(),
            merged_links: self.state.merged_links.clone(),
            similar_links: self.state.similar_links.clone(),
            merge_state: self.state.merge_state.clone(),
            unmerge_state: self.state.unmerge_state.clone(),
            loading: self.state.loading,
            error: self.state.error,
            enable_fingerprint_compare: self.state.enable_fingerprint_compare,
            unmerge_list: self.state.unmerge_list.clone(),
        }
    }

    #[must_use]
    pub fn merge_snapshot(&self) -> MergeSnapshot {
        MergeSnapshot {
            merge_disabled: self.state.merge_disabled,
            merge_state: self.state.merge_state.clone(),
            merge_list: self.state.merge_list.clone(),
        }
    }

    #[must_use]
    pub fn unmerge_snapshot(&self) -> UnmergeSnapshot {
        UnmergeSnapshot {
            unmerge_disabled: self.state.unmerge_disabled,
            unmerge_state: self.state.unmerge_state.clone(),
            unmerge_list: self.state.unmerge_list.clone(),
            enable_fingerprint_compare: self.state.enable_fingerprint_compare,
            unmerge_last_collapsed: self.state.unmerge_last_collapsed,
        }
    }

    fn trigger_fetch_state(&mut self) -> FetchState {
        let state = self.fetch_state();
        self.emit(&StoreEvent::Fetch(state.clone()));
        state
    }

    fn trigger_merge_state(&mut self) -> MergeSnapshot {
        let snapshot = self.merge_snapshot();
        self.emit(&StoreEvent::Merge(snapshot.clone()));
        snapshot
    }

    fn trigger_unmerge_state(&mut self) -> UnmergeSnapshot {
        let snapshot = self.unmerge_snapshot();
        self.emit(&StoreEvent::Unmerge(snapshot.clone()));
        snapshot
    }

    // ---------------------------------------------------------------------
    // Fetch
    // ---------------------------------------------------------------------

    /// Reset the page and fetch every descriptor; `None` reuses the last list.
    pub fn fetch(&mut self, requests: Option<Vec<FetchDescriptor>>) -> FetchState {
        let ticket = self.begin_fetch(requests);
        let outcome = fetch_all(&self.api, ticket.requests());
        self.complete_fetch(&ticket, outcome)
            .unwrap_or_else(|| self.fetch_state())
    }

    /// Reset all state and publish the loading notification.
    pub fn begin_fetch(&mut self, requests: Option<Vec<FetchDescriptor>>) -> FetchTicket {
        let requests = requests.unwrap_or_else(|| self.requests.clone());
        self.state = GroupingState::initial();
        self.requests.clone_from(&requests);
        self.generation += 1;
        self.last_fetch_error = None;
        debug!(
            generation = self.generation,
            requests = requests.len(),
            "starting grouping fetch"
        );
        self.trigger_fetch_state();
        FetchTicket {
            generation: self.generation,
            requests,
        }
    }

    /// Apply the outcome of `ticket`'s requests.
    ///
    /// Returns `None`, leaving state untouched, when a newer fetch has begun
    /// since `ticket` was issued.
    pub fn complete_fetch(
        &mut self,
        ticket: &FetchTicket,
        outcome: Result<Vec<FetchResponse>, ApiError>,
    ) -> Option<FetchState> {
        if ticket.generation != self.generation {
            debug!(
                stale = ticket.generation,
                current = self.generation,
                "discarding superseded fetch"
            );
            return None;
        }

        let decoded = outcome.and_then(|responses| {
            responses
                .into_iter()
                .map(decode)
                .collect::<Result<Vec<_>, _>>()
        });

        match decoded {
            Ok(collections) => {
                for collection in collections {
                    self.apply(collection);
                }
                self.state.loading = false;
                self.state.error = false;
                info!(
                    merged = self.state.merged_items.len(),
                    similar = self.state.similar_items.len(),
                    "grouping fetch complete"
                );
            }
            Err(err) => {
                warn!(error = %err, "grouping fetch failed");
                self.state.loading = false;
                self.state.error = true;
                self.last_fetch_error = Some(err);
            }
        }

        Some(self.trigger_fetch_state())
    }

    fn apply(&mut self, collection: Decoded) {
        match collection {
            Decoded::Merged {
                items,
                lock_states,
                link,
            } => {
                for (id, locked) in lock_states {
                    self.state
                        .unmerge_state
                        .update(&id, RowPatch::default().busy(locked));
                }
                self.state.merged_items = items;
                self.state.merged_links = link;
            }
            Decoded::Similar { items, link } => {
                self.state.similar_items = items;
                self.state.similar_links = link;
            }
        }
    }

    // ---------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------

    /// Merged fingerprints that have a latest event.
    fn eligible_count(&self) -> usize {
        self.state
            .merged_items
            .iter()
            .filter(|item| item.is_selectable())
            .count()
    }

    /// Eligible fingerprints minus every busy unmerge row. May be negative
    /// when busy rows are not in the current page.
    #[must_use]
    pub fn selectable_count(&self) -> i64 {
        signed(self.eligible_count()) - signed(self.state.unmerge_state.busy_count())
    }

    /// Whether the unmerge selection covers every fingerprint that could be
    /// unmerged. Unmerging in that state is refused.
    #[must_use]
    pub fn is_all_unmerged_selected(&self) -> bool {
        signed(self.state.unmerge_list.len()) == self.selectable_count()
    }

    fn compute_unmerge_disabled(&self) -> bool {
        self.state.unmerge_list.is_empty()
            || self.is_all_unmerged_selected()
            || self.selectable_count() == 1
    }

    /// Flip `id` in the merge selection. Returns `None` (and publishes
    /// nothing) while the row is busy.
    pub fn toggle_merge(&mut self, id: &str) -> Option<MergeSnapshot> {
        if self.state.merge_state.is_busy(id) {
            debug!(id, "ignoring merge toggle on busy row");
            return None;
        }

        let checked = if let Some(pos) = self.state.merge_list.iter().position(|x| x == id) {
            self.state.merge_list.remove(pos);
            false
        } else {
            self.state.merge_list.push(id.to_string());
            true
        };
        self.state
            .merge_state
            .update(id, RowPatch::default().checked(checked));

        Some(self.trigger_merge_state())
    }

    /// Flip `fingerprint` in the unmerge selection. Returns `None` (and
    /// publishes nothing) while the row is busy.
    pub fn toggle_unmerge(&mut self, fingerprint: &str, event_id: &str) -> Option<UnmergeSnapshot> {
        if self.state.unmerge_state.is_busy(fingerprint) {
            debug!(fingerprint, "ignoring unmerge toggle on busy row");
            return None;
        }

        let checked = if self.state.unmerge_list.remove(fingerprint) {
            false
        } else {
            self.state.unmerge_list.insert(fingerprint, event_id);
            true
        };
        self.state
            .unmerge_state
            .update(fingerprint, RowPatch::default().checked(checked));

        self.state.unmerge_disabled = self.compute_unmerge_disabled();
        self.state.enable_fingerprint_compare = self.state.unmerge_list.len() == 2;

        Some(self.trigger_unmerge_state())
    }

    /// Collapse or expand every merged fingerprint at once.
    pub fn toggle_collapse_fingerprints(&mut self) {
        let collapsed = !self.state.unmerge_last_collapsed;
        let ids: Vec<String> = self
            .state
            .merged_items
            .iter()
            .map(|item| item.id.clone())
            .collect();
        self.state.unmerge_state.update_all(
            ids.iter().map(String::as_str),
            RowPatch::default().collapsed(collapsed),
        );
        self.state.unmerge_last_collapsed = collapsed;

        let event = StoreEvent::CollapseAll {
            unmerge_last_collapsed: collapsed,
            unmerge_state: self.state.unmerge_state.clone(),
        };
        self.emit(&event);
    }

    pub fn toggle_collapse_fingerprint(&mut self, fingerprint: &str) {
        let collapsed = self.state.unmerge_state.state_of(fingerprint).collapsed;
        self.state
            .unmerge_state
            .update(fingerprint, RowPatch::default().collapsed(!collapsed));

        let event = StoreEvent::CollapseOne {
            unmerge_state: self.state.unmerge_state.clone(),
        };
        self.emit(&event);
    }

    /// Signal views to reveal similar issues hidden by the threshold.
    pub fn show_all_similar_items(&mut self) {
        self.emit(&StoreEvent::ShowAllSimilar);
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Split the selected fingerprints out of `args.group_id`.
    ///
    /// Request failures are reported through the indicator and reverted in
    /// the selection state; the final snapshot is returned either way.
    ///
    /// # Errors
    ///
    /// Returns [`GroupingError::UnmergeAllRefused`] without sending anything
    /// when every selectable fingerprint is selected.
    pub fn unmerge(&mut self, args: &UnmergeArgs) -> Result<UnmergeSnapshot, GroupingError> {
        if self.is_all_unmerged_selected() {
            warn!(group = %args.group_id, "refusing to unmerge every fingerprint");
            return Err(GroupingError::UnmergeAllRefused);
        }

        let ids = self.state.unmerge_list.fingerprints();

        self.state.unmerge_disabled = true;
        self.state.unmerge_state.update_all(
            ids.iter().map(String::as_str),
            RowPatch::default().checked(false).busy(true),
        );
        self.trigger_unmerge_state();
        self.indicator.add_loading_message(&args.loading_message);

        let request = ApiRequest::delete(format!("/issues/{}/hashes/", args.group_id))
            .query_list("id", ids.iter().cloned());

        match self.api.request(&request) {
            Ok(_) => {
                info!(group = %args.group_id, fingerprints = ids.len(), "unmerge queued");
                self.indicator.add_success_message(&args.success_message);
                self.state.unmerge_state.update_all(
                    ids.iter().map(String::as_str),
                    RowPatch::default().checked(false).busy(true),
                );
                self.state.unmerge_list.clear();
            }
            Err(err) => {
                warn!(group = %args.group_id, error = %err, "unmerge failed");
                self.indicator.add_error_message(&args.error_message);
                self.state.unmerge_state.update_all(
                    ids.iter().map(String::as_str),
                    RowPatch::default().checked(true).busy(false),
                );
            }
        }

        self.state.unmerge_disabled = false;
        Ok(self.trigger_unmerge_state())
    }

    /// Merge the selected issues into the page's issue.
    ///
    /// Returns `None` when `args.params` is `None`; otherwise the final merge
    /// snapshot, whether the request succeeded or not.
    pub fn merge(&mut self, args: MergeArgs) -> Option<MergeSnapshot> {
        let params = args.params?;
        let ids = self.state.merge_list.clone();

        self.state.merge_disabled = true;
        self.state
            .merge_state
            .update_all(ids.iter().map(String::as_str), RowPatch::default().busy(true));
        self.trigger_merge_state();

        let mut item_ids = ids.clone();
        item_ids.push(params.group_id.clone());
        let request = MergeGroupsRequest {
            org_id: params.org_id,
            project_id: args.project_id.or(params.project_id),
            item_ids,
            query: args.query,
        };

        match self.merger.merge_groups(&request) {
            Ok(response) => {
                if let Some(parent) = response.parent() {
                    info!(parent, merged = ids.len(), "issues merged");
                    let event = StoreEvent::MergedParent {
                        merged_parent: parent.to_string(),
                    };
                    self.emit(&event);
                }
                self.state.merge_state.update_all(
                    ids.iter().map(String::as_str),
                    RowPatch::default().checked(false).busy(true),
                );
                self.state.merge_list.clear();
            }
            Err(err) => {
                warn!(group = %params.group_id, error = %err, "merge failed");
                self.state.merge_state.update_all(
                    ids.iter().map(String::as_str),
                    RowPatch::default().checked(true).busy(false),
                );
            }
        }

        self.state.merge_disabled = false;
        Some(self.trigger_merge_state())
    }
}
