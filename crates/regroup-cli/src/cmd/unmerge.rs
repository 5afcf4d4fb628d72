//! `regroup unmerge`: split fingerprints out of an issue.

use clap::Args;
use regroup_core::GroupingError;
use regroup_core::store::UnmergeArgs as UnmergeRequest;
use serde::Serialize;
use tracing::info;

use crate::cmd::Session;
use crate::output::{field, section};

#[derive(Args, Debug)]
pub struct UnmergeArgs {
    /// Issue to split.
    pub group: String,

    /// Fingerprints to move into a new issue.
    #[arg(required = true, num_args = 1..)]
    pub fingerprints: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UnmergeOutput {
    pub group_id: String,
    pub fingerprints: Vec<String>,
    pub queued: bool,
}

/// Execute `regroup unmerge <group> <fingerprint>...`.
///
/// Loads the issue's merged fingerprints, selects the requested ones, and
/// queues them for unmerging.
///
/// # Errors
///
/// Returns an error if a fingerprint is unknown or locked, if every
/// selectable fingerprint was requested, or if the request fails.
pub fn run_unmerge(args: &UnmergeArgs, session: &Session) -> anyhow::Result<()> {
    let mut store = session.open_store()?;
    session.fetch(&mut store, vec![session.merged_descriptor(&args.group)])?;

    for fingerprint in &args.fingerprints {
        if store.state().unmerge_list.contains(fingerprint) {
            continue;
        }
        let event_id = store
            .merged_item(fingerprint)
            .and_then(|item| item.latest_event.as_ref())
            .map(|event| event.id.clone());
        let selected = event_id.and_then(|event_id| store.toggle_unmerge(fingerprint, &event_id));
        if selected.is_none() {
            return Err(session.fail(GroupingError::UnknownSelection {
                kind: "selectable fingerprint",
                id: fingerprint.clone(),
            })?);
        }
    }

    let fingerprints = store.state().unmerge_list.fingerprints();
    let snapshot = match store.unmerge(&UnmergeRequest::for_group(&args.group)) {
        Ok(snapshot) => snapshot,
        Err(err) => return Err(session.fail(err)?),
    };

    // success clears the selection; failure restores it
    if !snapshot.unmerge_list.is_empty() {
        return Err(session.fail_request("unmerge request failed")?);
    }
    info!(group = %args.group, count = fingerprints.len(), "unmerge queued");

    let output = UnmergeOutput {
        group_id: args.group.clone(),
        fingerprints,
        queued: true,
    };
    session.render(
        &output,
        |out, w| writeln!(w, "queued  {}", out.fingerprints.join(" ")),
        |out, w| {
            section(w, &format!("Unmerge queued for issue {}", out.group_id))?;
            field(w, "fingerprints", out.fingerprints.join(", "))
        },
    )
}
