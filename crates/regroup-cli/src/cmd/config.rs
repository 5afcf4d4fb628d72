use regroup_core::config::EffectiveConfig;
use serde::Serialize;
use std::io::Write;

use crate::cmd::Session;
use crate::output::{field, section};

#[derive(Debug, Serialize)]
struct ConfigView<'a> {
    #[serde(flatten)]
    config: &'a EffectiveConfig,
    has_auth_token: bool,
}

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("(unset)")
}

/// Show the resolved configuration. The auth token is reported only as present or absent.
pub fn run_config(session: &Session) -> anyhow::Result<()> {
    let view = ConfigView {
        config: &session.config,
        has_auth_token: session.config.has_auth_token(),
    };
    session.render(&view, render_config_text, render_config_human)
}

fn render_config_text(view: &ConfigView<'_>, w: &mut dyn Write) -> std::io::Result<()> {
    let c = view.config;
    writeln!(w, "base_url  {}", or_unset(c.base_url.as_deref()))?;
    writeln!(w, "organization  {}", or_unset(c.organization.as_deref()))?;
    writeln!(w, "project  {}", or_unset(c.project.as_deref()))?;
    writeln!(w, "timeout_secs  {}", c.timeout_secs)?;
    writeln!(w, "merged_limit  {}", c.merged_limit)?;
    writeln!(w, "similar_limit  {}", c.similar_limit)?;
    writeln!(w, "has_auth_token  {}", view.has_auth_token)
}

fn render_config_human(view: &ConfigView<'_>, w: &mut dyn Write) -> std::io::Result<()> {
    let c = view.config;
    section(w, "Effective configuration")?;
    field(w, "api url", or_unset(c.base_url.as_deref()))?;
    field(w, "organization", or_unset(c.organization.as_deref()))?;
    field(w, "project", or_unset(c.project.as_deref()))?;
    field(w, "timeout", format!("{}s", c.timeout_secs))?;
    field(w, "merged limit", c.merged_limit.to_string())?;
    field(w, "similar limit", c.similar_limit.to_string())?;
    field(
        w,
        "auth token",
        if view.has_auth_token { "set" } else { "not set" },
    )
}
