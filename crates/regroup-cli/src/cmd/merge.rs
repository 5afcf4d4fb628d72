//! `regroup merge`: merge similar issues into an issue.

use clap::Args;
use regroup_core::{GroupingError, MergeArgs as MergeRequest, RouteParams, StoreEvent};
use serde::Serialize;
use std::cell::RefCell;
use std::rc::Rc;

use crate::cmd::Session;
use crate::output::{field, section};

#[derive(Args, Debug)]
pub struct MergeArgs {
    /// Issue to merge into.
    pub group: String,

    /// Similar issues to merge, as listed by `regroup similar`.
    #[arg(required = true, num_args = 1..)]
    pub issues: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MergeOutput {
    pub group_id: String,
    pub merged: Vec<String>,
    /// Issue the others were merged into, when the service reports it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

/// Execute `regroup merge <group> <issue>...`.
///
/// # Errors
///
/// Returns an error if organization or project are not configured, an issue
/// is not among the similar issues, or the merge request fails.
pub fn run_merge(args: &MergeArgs, session: &Session) -> anyhow::Result<()> {
    let org_id = session.require(session.config.require_organization())?.to_string();
    let project_id = session.require(session.config.require_project())?.to_string();

    let mut store = session.open_store()?;
    let parent = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&parent);
    store.subscribe(move |event| {
        if let StoreEvent::MergedParent { merged_parent } = event {
            *sink.borrow_mut() = Some(merged_parent.clone());
        }
    });

    session.fetch(&mut store, vec![session.similar_descriptor(&args.group)])?;

    for issue in &args.issues {
        if store.state().merge_list.contains(issue) {
            continue;
        }
        let known = store.similar_item(issue).is_some();
        if !known || store.toggle_merge(issue).is_none() {
            return Err(session.fail(GroupingError::UnknownSelection {
                kind: "similar issue",
                id: issue.clone(),
            })?);
        }
    }

    let merged = store.state().merge_list.clone();
    let snapshot = store.merge(MergeRequest {
        params: Some(RouteParams {
            org_id,
            group_id: args.group.clone(),
            project_id: Some(project_id),
        }),
        query: None,
        project_id: None,
    });

    // success clears the selection; failure restores it
    if snapshot.is_none_or(|s| !s.merge_list.is_empty()) {
        return Err(session.fail_request("merge request failed")?);
    }

    let output = MergeOutput {
        group_id: args.group.clone(),
        merged,
        parent: parent.borrow().clone(),
    };

    session.render(
        &output,
        |out, w| {
            writeln!(w, "merged  {}", out.merged.join(" "))?;
            if let Some(parent) = &out.parent {
                writeln!(w, "parent  {parent}")?;
            }
            Ok(())
        },
        |out, w| {
            section(w, &format!("Merged into issue {}", out.group_id))?;
            field(w, "issues", out.merged.join(", "))?;
            if let Some(parent) = &out.parent {
                field(w, "parent", parent)?;
            }
            Ok(())
        },
    )
}
