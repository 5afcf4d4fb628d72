#![forbid(unsafe_code)]
//! regroup-core library.
//!
//! State and seams for the issue-grouping workflow: the fingerprints merged
//! into an issue, the issues the service considers similar to it, and the
//! selection state used to merge or unmerge them.
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums at module seams, `anyhow::Result` for
//!   configuration loading.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod api;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod indicator;
pub mod links;
pub mod merge;
pub mod model;
pub mod selection;
pub mod store;

pub use api::{ApiClient, ApiError, ApiRequest, ApiResponse, Method};
pub use descriptor::{DataKey, FetchDescriptor};
pub use error::{ErrorCode, GroupingError};
pub use event::{ListenerId, StoreEvent};
pub use indicator::Indicator;
pub use merge::{ApiGroupMerger, GroupMerger, MergeGroupsRequest, MergeGroupsResponse};
pub use model::merged::{MergedChild, MergedItem, MergedRow};
pub use model::similar::{IssueSummary, ScoreMap, SimilarItem, SimilarRow};
pub use selection::{RowPatch, RowState, SelectionMap, UnmergeList};
pub use store::{GroupingStore, MergeArgs, RouteParams, UnmergeArgs};
