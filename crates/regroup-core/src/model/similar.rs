//! Issues the service considers similar to the current one.
//!
//! Each row of the `similar` response is a `[issue, scores]` pair. Score keys
//! use the legacy `<interface>:<feature>` layout, e.g. `exception:message:
//! character-shingles`; a `null` score means the feature was absent from one
//! of the two issues.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A candidate is shown by default only if at least one score reaches this.
pub const MIN_SCORE: f64 = 0.6;

/// Feature key → score in `0.0..=1.0`, or `None` when not comparable.
///
/// Keys are kept sorted, not in the order the service sent them; everything
/// derived from the map (interface grouping, aggregates, output) follows key
/// order.
pub type ScoreMap = BTreeMap<String, Option<f64>>;

/// Interface name → `(feature key, score)` pairs in key order.
pub type ScoresByInterface = BTreeMap<String, Vec<(String, Option<f64>)>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    pub slug: String,
}

/// The subset of an issue payload the grouping workflow reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueSummary {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub culprit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectRef>,
}

/// One raw `[issue, scores]` row of the `similar` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SimilarRow(pub IssueSummary, pub ScoreMap);

/// A similar issue with its scores grouped and averaged per interface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarItem {
    pub issue: IssueSummary,
    pub score: ScoreMap,
    pub scores_by_interface: ScoresByInterface,
    /// Mean of the non-null scores per interface; `None` when every score of
    /// the interface is null.
    pub aggregate: BTreeMap<String, Option<f64>>,
    pub is_below_threshold: bool,
}

impl SimilarItem {
    #[must_use]
    pub fn from_row(row: SimilarRow) -> Self {
        let SimilarRow(issue, score) = row;
        let scores_by_interface = scores_by_interface(&score);
        let aggregate = aggregate_scores(&scores_by_interface);
        let is_below_threshold = is_below_threshold(&score);
        Self {
            issue,
            score,
            scores_by_interface,
            aggregate,
            is_below_threshold,
        }
    }
}

/// True when no score reaches [`MIN_SCORE`]. An empty map is below threshold.
#[must_use]
pub fn is_below_threshold(scores: &ScoreMap) -> bool {
    !scores.values().flatten().any(|score| *score >= MIN_SCORE)
}

/// The interface part of a score key: everything before the first `:`.
#[must_use]
pub fn interface_name(score_key: &str) -> &str {
    score_key.split(':').next().unwrap_or(score_key)
}

#[must_use]
pub fn scores_by_interface(scores: &ScoreMap) -> ScoresByInterface {
    let mut grouped = ScoresByInterface::new();
    for (key, score) in scores {
        grouped
            .entry(interface_name(key).to_string())
            .or_default()
            .push((key.clone(), *score));
    }
    grouped
}

/// Average the non-null scores of each interface.
#[must_use]
pub fn aggregate_scores(grouped: &ScoresByInterface) -> BTreeMap<String, Option<f64>> {
    grouped
        .iter()
        .map(|(interface, pairs)| {
            let present: Vec<f64> = pairs.iter().filter_map(|(_, score)| *score).collect();
            let mean = if present.is_empty() {
                None
            } else {
                #[allow(clippy::cast_precision_loss)]
                let len = present.len() as f64;
                Some(present.iter().sum::<f64>() / len)
            };
            (interface.clone(), mean)
        })
        .collect()
}

/// Split items into `(above threshold, below threshold)`, keeping order.
#[must_use]
pub fn partition_by_threshold(items: &[SimilarItem]) -> (Vec<SimilarItem>, Vec<SimilarItem>) {
    items.iter().cloned().partition(|item| !item.is_below_threshold)
}
