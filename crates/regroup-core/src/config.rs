use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::descriptor::DEFAULT_LIMIT;
use crate::error::ErrorCode;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "REGROUP_API_URL";
pub const ENV_ORG: &str = "REGROUP_ORG";
pub const ENV_PROJECT: &str = "REGROUP_PROJECT";
pub const ENV_AUTH_TOKEN: &str = "REGROUP_AUTH_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Honored only in the user file.
    #[serde(default, skip_serializing)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingConfig {
    #[serde(default)]
    pub merged_limit: Option<u32>,
    #[serde(default)]
    pub similar_limit: Option<u32>,
}

/// `.regroup/config.toml` and `<config_dir>/regroup/config.toml` share this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub grouping: GroupingConfig,
}

/// Values given on the command line; each beats every other source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    pub base_url: Option<String>,
    pub organization: Option<String>,
    pub project: Option<String>,
    #[serde(skip)]
    pub auth_token: Option<String>,
    pub timeout_secs: u64,
    pub merged_limit: u32,
    pub similar_limit: u32,
}

impl EffectiveConfig {
    /// Whether a token was found; the token itself is never printed.
    #[must_use]
    pub const fn has_auth_token(&self) -> bool {
        self.auth_token.is_some()
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when no base URL was configured.
    pub fn require_base_url(&self) -> Result<&str, ConfigError> {
        self.base_url
            .as_deref()
            .ok_or(ConfigError::Missing(ErrorCode::MissingApiUrl))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when no organization was configured.
    pub fn require_organization(&self) -> Result<&str, ConfigError> {
        self.organization
            .as_deref()
            .ok_or(ConfigError::Missing(ErrorCode::MissingOrganization))
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when no project was configured.
    pub fn require_project(&self) -> Result<&str, ConfigError> {
        self.project
            .as_deref()
            .ok_or(ConfigError::Missing(ErrorCode::MissingProject))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{}", .0.message())]
    Missing(ErrorCode),
}

impl ConfigError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Missing(code) => *code,
        }
    }
}

fn load_file(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<FileConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_project_config(project_root: &Path) -> Result<FileConfig> {
    load_file(&project_root.join(".regroup/config.toml"))
}

pub fn load_user_config() -> Result<FileConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(FileConfig::default());
    };
    load_file(&config_dir.join("regroup/config.toml"))
}

pub fn resolve_config(project_root: &Path, overrides: &ConfigOverrides) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;
    Ok(resolve_with(
        &project,
        &user,
        overrides,
        |key| env::var(key).ok().filter(|v| !v.trim().is_empty()),
    ))
}

/// Merge every source: flag > env > project file > user file > default.
pub fn resolve_with(
    project: &FileConfig,
    user: &FileConfig,
    overrides: &ConfigOverrides,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> EffectiveConfig {
    fn pick<T>(candidates: [Option<T>; 4]) -> Option<T> {
        candidates.into_iter().flatten().next()
    }

    if project.api.auth_token.is_some() {
        tracing::warn!("ignoring api.auth_token in project config; use the user config or {ENV_AUTH_TOKEN}");
    }

    let base_url = pick([
        overrides.api_url.clone(),
        env_lookup(ENV_API_URL),
        project.api.base_url.clone(),
        user.api.base_url.clone(),
    ])
    .map(|url| url.trim_end_matches('/').to_string());

    EffectiveConfig {
        base_url,
        organization: pick([
            overrides.organization.clone(),
            env_lookup(ENV_ORG),
            project.api.organization.clone(),
            user.api.organization.clone(),
        ]),
        project: pick([
            overrides.project.clone(),
            env_lookup(ENV_PROJECT),
            project.api.project.clone(),
            user.api.project.clone(),
        ]),
        auth_token: env_lookup(ENV_AUTH_TOKEN).or_else(|| user.api.auth_token.clone()),
        timeout_secs: project
            .api
            .timeout_secs
            .or(user.api.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
        merged_limit: overrides
            .limit
            .or(project.grouping.merged_limit)
            .or(user.grouping.merged_limit)
            .unwrap_or(DEFAULT_LIMIT),
        similar_limit: overrides
            .limit
            .or(project.grouping.similar_limit)
            .or(user.grouping.similar_limit)
            .unwrap_or(DEFAULT_LIMIT),
    }
}
