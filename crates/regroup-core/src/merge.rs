//! The cross-issue merge call.
//!
//! Merging is a bulk mutation on the project's issue list rather than an
//! operation on the current issue, so it sits behind its own seam.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::api::{ApiClient, ApiError, ApiRequest};

/// Input for a merge of several issues into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeGroupsRequest {
    pub org_id: String,
    pub project_id: Option<String>,
    /// Every issue taking part, including the current one.
    pub item_ids: Vec<String>,
    /// Search query, used only when `item_ids` is empty.
    pub query: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MergeResult {
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MergeGroupsResponse {
    #[serde(default)]
    pub merge: Option<MergeResult>,
}

impl MergeGroupsResponse {
    /// Id of the issue the others were merged into, if reported.
    #[must_use]
    pub fn parent(&self) -> Option<&str> {
        self.merge.as_ref().and_then(|m| m.parent.as_deref())
    }
}

/// Performs the merge network call on behalf of the store.
pub trait GroupMerger {
    /// # Errors
    ///
    /// Returns [`ApiError`] when the request fails or cannot be built.
    fn merge_groups(&self, request: &MergeGroupsRequest) -> Result<MergeGroupsResponse, ApiError>;
}

/// [`GroupMerger`] issuing `PUT /projects/{org}/{project}/issues/` with
/// `{"merge": 1}` through an [`ApiClient`].
#[derive(Clone)]
pub struct ApiGroupMerger {
    api: Arc<dyn ApiClient>,
}

impl ApiGroupMerger {
    #[must_use]
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self { api }
    }
}

/// Build the bulk-update request that merges `request.item_ids`.
///
/// # Errors
///
/// Returns [`ApiError::MissingParameter`] when no project id is known.
pub fn build_merge_request(request: &MergeGroupsRequest) -> Result<ApiRequest, ApiError> {
    let project_id = request
        .project_id
        .as_deref()
        .ok_or(ApiError::MissingParameter("project_id"))?;

    let mut api_request = ApiRequest::put(format!(
        "/projects/{}/{project_id}/issues/",
        request.org_id
    ))
    .json(json!({ "merge": 1 }));

    if request.item_ids.is_empty() {
        if let Some(query) = &request.query {
            api_request = api_request.query("query", query.clone());
        }
    } else {
        api_request = api_request.query_list("id", request.item_ids.iter().cloned());
    }

    Ok(api_request)
}

impl GroupMerger for ApiGroupMerger {
    fn merge_groups(&self, request: &MergeGroupsRequest) -> Result<MergeGroupsResponse, ApiError> {
        let api_request = build_merge_request(request)?;
        debug!(
            path = %api_request.path,
            items = request.item_ids.len(),
            "merging issues"
        );
        let response = self.api.request(&api_request)?;
        if response.body.is_null() {
            return Ok(MergeGroupsResponse::default());
        }
        serde_json::from_value(response.body).map_err(|err| ApiError::Decode(err.to_string()))
    }
}
