//! How `regroup` prints results and failures.
//!
//! Results go to stdout as a pretty report on a terminal, as plain
//! space-separated lines when piped, or as JSON. Failures go to stderr as a
//! `CliError` carrying a stable `E####` code.
//!
//! The mode comes from `--format` (or the hidden `--json`), then the `FORMAT`
//! variable, then whether stdout is a terminal.

use clap::ValueEnum;
use regroup_core::GroupingError;
use regroup_core::config::ConfigError;
use regroup_core::error::ErrorCode;
use serde::Serialize;
use std::io::{self, IsTerminal, Write};

const RULE_WIDTH: usize = 72;
const FIELD_WIDTH: usize = 14;

pub fn rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}", "-".repeat(RULE_WIDTH))
}

/// Heading line underlined by a [`rule`].
pub fn section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}")?;
    rule(w)
}

/// `label:` padded to a fixed column, then the value.
pub fn field(w: &mut dyn Write, label: &str, value: impl AsRef<str>) -> io::Result<()> {
    let label = format!("{label}:");
    writeln!(w, "{label:<width$} {}", value.as_ref(), width = FIELD_WIDTH)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Report layout for terminals.
    Pretty,
    /// One record per line, for pipes and scripts.
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputMode {
    /// Parse a `FORMAT` value; unrecognised values yield `None`.
    fn from_env_value(value: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(value.trim(), true).ok()
    }
}

fn pick_mode(
    format_flag: Option<OutputMode>,
    json_flag: bool,
    format_env: Option<&str>,
    stdout_is_tty: bool,
) -> OutputMode {
    format_flag
        .or_else(|| json_flag.then_some(OutputMode::Json))
        .or_else(|| format_env.and_then(OutputMode::from_env_value))
        .unwrap_or(if stdout_is_tty {
            OutputMode::Pretty
        } else {
            OutputMode::Text
        })
}

pub fn resolve_output_mode(format_flag: Option<OutputMode>, json_flag: bool) -> OutputMode {
    let format_env = std::env::var("FORMAT").ok();
    pick_mode(
        format_flag,
        json_flag,
        format_env.as_deref(),
        io::stdout().is_terminal(),
    )
}

/// Write `value` to `out` as JSON or through the renderer for `mode`.
pub fn render<T: Serialize>(
    out: &mut dyn Write,
    mode: OutputMode,
    value: &T,
    text: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            serde_json::to_writer_pretty(&mut *out, value)?;
            writeln!(out)?;
        }
        OutputMode::Text => text(value, out)?,
        OutputMode::Pretty => pretty(value, out)?,
    }
    Ok(())
}

/// A structured error with optional suggestion and error code.
#[derive(Debug, Serialize)]
pub struct CliError {
    /// Human-readable error message.
    pub message: String,
    /// Optional suggestion for how to fix the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Machine-readable error code (e.g. "E2010").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    /// Build from a stable code, using its hint as the suggestion.
    pub fn from_code(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

impl From<&GroupingError> for CliError {
    fn from(err: &GroupingError) -> Self {
        Self::from_code(err.to_string(), err.error_code())
    }
}

impl From<&ConfigError> for CliError {
    fn from(err: &ConfigError) -> Self {
        Self::from_code(err.to_string(), err.error_code())
    }
}

/// Render an error to stderr in the requested format.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    write_error(&mut out, mode, error)
}

fn write_error(out: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({
                "error": error,
            });
            serde_json::to_writer_pretty(&mut *out, &wrapper)?;
            writeln!(out)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            writeln!(out, "error: {}", error.message)?;
            if let Some(ref suggestion) = error.suggestion {
                writeln!(out, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}
