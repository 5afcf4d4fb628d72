//! `regroup merged`: list the fingerprints merged into an issue.

use chrono::{DateTime, Local, Utc};
use clap::Args;
use regroup_core::MergedItem;
use serde::Serialize;
use std::io::Write;

use crate::cmd::{Session, next_cursor};
use crate::output::{field, rule, section};

#[derive(Args, Debug)]
pub struct MergedArgs {
    /// Issue whose merged fingerprints to list.
    pub group: String,
}

#[derive(Debug, Serialize)]
pub struct MergedRowView {
    pub id: String,
    pub event_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_event_id: Option<String>,
    pub locked: bool,
    pub children: Vec<String>,
}

impl MergedRowView {
    fn from_item(item: &MergedItem, busy: bool) -> Self {
        Self {
            id: item.id.clone(),
            event_count: item.event_count,
            last_seen: item.last_seen,
            latest_event_id: item.latest_event.as_ref().map(|e| e.id.clone()),
            locked: busy,
            children: item.children.iter().map(|c| c.child_id.clone()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MergedOutput {
    pub group_id: String,
    pub count: usize,
    pub fingerprints: Vec<MergedRowView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

pub fn format_last_seen(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(
        || "-".to_string(),
        |ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
    )
}

/// Execute `regroup merged <group>`.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, the fetch fails, or
/// output rendering fails.
pub fn run_merged(args: &MergedArgs, session: &Session) -> anyhow::Result<()> {
    let mut store = session.open_store()?;
    let state = session.fetch(&mut store, vec![session.merged_descriptor(&args.group)])?;

    let fingerprints: Vec<MergedRowView> = state
        .merged_items
        .iter()
        .map(|item| MergedRowView::from_item(item, state.unmerge_state.is_busy(&item.id)))
        .collect();

    let output = MergedOutput {
        group_id: args.group.clone(),
        count: fingerprints.len(),
        fingerprints,
        next_cursor: next_cursor(state.merged_links.as_deref()),
    };

    session.render(&output, render_merged_text, render_merged_human)
}

fn render_merged_text(out: &MergedOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "ID  EVENTS  LAST_SEEN  LATEST_EVENT  STATE")?;
    for row in &out.fingerprints {
        writeln!(
            w,
            "{}  {}  {}  {}  {}",
            row.id,
            row.event_count,
            row.last_seen.map_or_else(|| "-".to_string(), |ts| ts.to_rfc3339()),
            row.latest_event_id.as_deref().unwrap_or("-"),
            if row.locked { "locked" } else { "open" }
        )?;
    }
    if let Some(cursor) = &out.next_cursor {
        writeln!(w, "next_cursor  {cursor}")?;
    }
    Ok(())
}

fn render_merged_human(out: &MergedOutput, w: &mut dyn Write) -> std::io::Result<()> {
    section(
        w,
        &format!("Merged fingerprints for issue {} ({})", out.group_id, out.count),
    )?;
    if out.fingerprints.is_empty() {
        writeln!(w, "No fingerprints merged into this issue.")?;
        return Ok(());
    }
    for row in &out.fingerprints {
        writeln!(w, "{}{}", row.id, if row.locked { "  [locked]" } else { "" })?;
        field(w, "  events", row.event_count.to_string())?;
        field(w, "  last seen", format_last_seen(row.last_seen))?;
        field(w, "  latest", row.latest_event_id.as_deref().unwrap_or("-"))?;
        if !row.children.is_empty() {
            field(w, "  children", row.children.join(", "))?;
        }
    }
    rule(w)?;
    if let Some(cursor) = &out.next_cursor {
        writeln!(w, "More fingerprints: --cursor {cursor}")?;
    }
    Ok(())
}
