//! `regroup similar`: list issues the service considers similar.
//!
//! Issues with no feature score at or above the threshold are hidden unless
//! `--all` is given.

use clap::Args;
use regroup_core::{SimilarItem, StoreEvent};
use serde::Serialize;
use std::cell::Cell;
use std::collections::BTreeMap;
use std::io::Write;
use std::rc::Rc;

use crate::cmd::{Session, next_cursor};
use crate::output::{rule, section};

#[derive(Args, Debug)]
pub struct SimilarArgs {
    /// Issue to compare against.
    pub group: String,

    /// Include issues below the similarity threshold.
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
pub struct SimilarRowView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Mean score per interface; `null` when the interface had no data.
    pub aggregate: BTreeMap<String, Option<f64>>,
    pub below_threshold: bool,
}

impl From<&SimilarItem> for SimilarRowView {
    fn from(item: &SimilarItem) -> Self {
        Self {
            id: item.issue.id.clone(),
            short_id: item.issue.short_id.clone(),
            title: item.issue.title.clone(),
            aggregate: item.aggregate.clone(),
            below_threshold: item.is_below_threshold,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SimilarOutput {
    pub group_id: String,
    pub issues: Vec<SimilarRowView>,
    /// Below-threshold issues left out of `issues`.
    pub hidden: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "n/a".to_string(), |s| format!("{s:.2}"))
}

fn format_aggregate(aggregate: &BTreeMap<String, Option<f64>>) -> String {
    aggregate
        .iter()
        .map(|(interface, score)| format!("{interface}={}", format_score(*score)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Execute `regroup similar <group>`.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, the fetch fails, or
/// output rendering fails.
pub fn run_similar(args: &SimilarArgs, session: &Session) -> anyhow::Result<()> {
    let mut store = session.open_store()?;

    let show_all = Rc::new(Cell::new(false));
    let flag = Rc::clone(&show_all);
    store.subscribe(move |event| {
        if matches!(event, StoreEvent::ShowAllSimilar) {
            flag.set(true);
        }
    });

    let state = session.fetch(&mut store, vec![session.similar_descriptor(&args.group)])?;
    if args.all {
        store.show_all_similar_items();
    }

    let mut issues: Vec<SimilarRowView> = state.similar_items.iter().map(Into::into).collect();
    let hidden = if show_all.get() {
        issues.extend(state.filtered_similar_items.iter().map(SimilarRowView::from));
        0
    } else {
        state.filtered_similar_items.len()
    };

    let output = SimilarOutput {
        group_id: args.group.clone(),
        issues,
        hidden,
        next_cursor: next_cursor(state.similar_links.as_deref()),
    };

    session.render(&output, render_similar_text, render_similar_human)
}

fn render_similar_text(out: &SimilarOutput, w: &mut dyn Write) -> std::io::Result<()> {
    writeln!(w, "ID  SHORT_ID  SCORES  TITLE")?;
    for row in &out.issues {
        writeln!(
            w,
            "{}  {}  {}  {}",
            row.id,
            row.short_id.as_deref().unwrap_or("-"),
            format_aggregate(&row.aggregate),
            row.title.as_deref().unwrap_or("")
        )?;
    }
    if out.hidden > 0 {
        writeln!(w, "hidden  {}", out.hidden)?;
    }
    if let Some(cursor) = &out.next_cursor {
        writeln!(w, "next_cursor  {cursor}")?;
    }
    Ok(())
}

fn render_similar_human(out: &SimilarOutput, w: &mut dyn Write) -> std::io::Result<()> {
    section(w, &format!("Issues similar to {}", out.group_id))?;
    if out.issues.is_empty() {
        writeln!(w, "No similar issues above the threshold.")?;
    }
    for row in &out.issues {
        let marker = if row.below_threshold { " (below threshold)" } else { "" };
        writeln!(
            w,
            "{:<10} {}{marker}",
            row.short_id.as_deref().unwrap_or(&row.id),
            row.title.as_deref().unwrap_or("(untitled)")
        )?;
        writeln!(w, "           {}", format_aggregate(&row.aggregate))?;
    }
    rule(w)?;
    if out.hidden > 0 {
        writeln!(
            w,
            "{} more below the threshold; rerun with --all to show them.",
            out.hidden
        )?;
    }
    if let Some(cursor) = &out.next_cursor {
        writeln!(w, "More issues: --cursor {cursor}")?;
    }
    Ok(())
}
