pub mod config;
pub mod merge;
pub mod merged;
pub mod similar;
pub mod unmerge;

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use regroup_core::config::{ConfigError, EffectiveConfig};
use regroup_core::descriptor::{merged_for, similar_for};
use regroup_core::error::ErrorCode;
use regroup_core::event::FetchState;
use regroup_core::links::parse_link_header;
use regroup_core::{ApiError, FetchDescriptor, GroupingError, GroupingStore};
use serde::Serialize;

use crate::http::UreqClient;
use crate::indicator::StderrIndicator;
use crate::output::{CliError, OutputMode, render, render_error};

/// Everything a command needs besides its own arguments.
pub struct Session {
    pub config: EffectiveConfig,
    pub output: OutputMode,
    pub quiet: bool,
    pub cursor: Option<String>,
}

impl Session {
    /// Unwrap a required setting, reporting it in the output format on failure.
    pub fn require<'a>(&self, value: Result<&'a str, ConfigError>) -> anyhow::Result<&'a str> {
        match value {
            Ok(value) => Ok(value),
            Err(err) => {
                render_error(self.output, &CliError::from(&err))?;
                anyhow::bail!(err)
            }
        }
    }

    /// Report a store error and turn it into the command's failure.
    pub fn fail(&self, err: GroupingError) -> anyhow::Result<anyhow::Error> {
        render_error(self.output, &CliError::from(&err))?;
        Ok(anyhow::Error::new(err))
    }

    /// Report a failed merge or unmerge request.
    pub fn fail_request(&self, message: &str) -> anyhow::Result<anyhow::Error> {
        render_error(
            self.output,
            &CliError::from_code(message, ErrorCode::RequestFailed),
        )?;
        Ok(anyhow::anyhow!("{message}"))
    }

    /// Print a command result to stdout in the session's output mode.
    pub fn render<T: Serialize>(
        &self,
        value: &T,
        text: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
        pretty: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    ) -> anyhow::Result<()> {
        render(&mut io::stdout().lock(), self.output, value, text, pretty)
    }

    pub fn open_store(&self) -> anyhow::Result<GroupingStore> {
        let base_url = self.require(self.config.require_base_url())?;
        let client = UreqClient::new(
            base_url,
            self.config.auth_token.clone(),
            Duration::from_secs(self.config.timeout_secs),
        );
        Ok(GroupingStore::new(
            Arc::new(client),
            Box::new(StderrIndicator::new(self.quiet)),
        ))
    }

    pub fn merged_descriptor(&self, group_id: &str) -> FetchDescriptor {
        merged_for(group_id, self.config.merged_limit).with_cursor(self.cursor.as_deref())
    }

    pub fn similar_descriptor(&self, group_id: &str) -> FetchDescriptor {
        similar_for(group_id, self.config.similar_limit).with_cursor(self.cursor.as_deref())
    }

    /// Fetch `descriptors`, failing the command when the fetch ends in error.
    pub fn fetch(
        &self,
        store: &mut GroupingStore,
        descriptors: Vec<FetchDescriptor>,
    ) -> anyhow::Result<FetchState> {
        let state = store.fetch(Some(descriptors));
        if state.error {
            let cause = store
                .last_fetch_error()
                .cloned()
                .unwrap_or_else(|| ApiError::Transport("fetch failed".to_string()));
            return Err(self.fail(GroupingError::Fetch(cause))?);
        }
        Ok(state)
    }
}

/// Cursor of the next non-empty page, if the `Link` header advertises one.
pub fn next_cursor(link: Option<&str>) -> Option<String> {
    link.map(parse_link_header)
        .and_then(|links| links.next_cursor().map(str::to_string))
}
