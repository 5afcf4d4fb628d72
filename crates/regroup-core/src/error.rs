use std::fmt;

use crate::api::ApiError;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    MissingApiUrl,
    MissingOrganization,
    MissingProject,
    UnknownSelection,
    UnmergeAllRefused,
    FetchFailed,
    RequestFailed,
    ResponseDecodeFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::MissingApiUrl => "E1010",
            Self::MissingOrganization => "E1011",
            Self::MissingProject => "E1012",
            Self::UnknownSelection => "E2001",
            Self::UnmergeAllRefused => "E2010",
            Self::FetchFailed => "E4001",
            Self::RequestFailed => "E4002",
            Self::ResponseDecodeFailed => "E4003",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::MissingApiUrl => "API base URL not configured",
            Self::MissingOrganization => "Organization not configured",
            Self::MissingProject => "Project not configured",
            Self::UnknownSelection => "Selection id not found",
            Self::UnmergeAllRefused => "Cannot unmerge every fingerprint",
            Self::FetchFailed => "Fetching grouping data failed",
            Self::RequestFailed => "API request failed",
            Self::ResponseDecodeFailed => "API response could not be decoded",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .regroup/config.toml and retry."),
            Self::MissingApiUrl => {
                Some("Pass --api-url, set REGROUP_API_URL, or set api.base_url in config.")
            }
            Self::MissingOrganization => {
                Some("Pass --org, set REGROUP_ORG, or set api.organization in config.")
            }
            Self::MissingProject => {
                Some("Pass --project, set REGROUP_PROJECT, or set api.project in config.")
            }
            Self::UnknownSelection => Some("Use `regroup merged` or `regroup similar` to list ids."),
            Self::UnmergeAllRefused => Some("Leave at least one fingerprint in the issue."),
            Self::FetchFailed | Self::RequestFailed => {
                Some("Check the API URL and auth token, then retry.")
            }
            Self::ResponseDecodeFailed => None,
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures surfaced by the grouping store to its caller.
///
/// Network failures during merge and unmerge are not returned here; they are
/// folded into selection state and reported through the indicator.
#[derive(Debug, thiserror::Error)]
pub enum GroupingError {
    #[error("not allowed to unmerge all fingerprints of an issue")]
    UnmergeAllRefused,

    #[error("'{id}' is not a known {kind}")]
    UnknownSelection { kind: &'static str, id: String },

    #[error("fetch failed: {0}")]
    Fetch(#[source] ApiError),
}

impl GroupingError {
    /// Stable error code for structured output.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::UnmergeAllRefused => ErrorCode::UnmergeAllRefused,
            Self::UnknownSelection { .. } => ErrorCode::UnknownSelection,
            Self::Fetch(ApiError::Decode(_)) => ErrorCode::ResponseDecodeFailed,
            Self::Fetch(_) => ErrorCode::FetchFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, GroupingError};
    use crate::api::ApiError;
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::MissingApiUrl,
            ErrorCode::MissingOrganization,
            ErrorCode::MissingProject,
            ErrorCode::UnknownSelection,
            ErrorCode::UnmergeAllRefused,
            ErrorCode::FetchFailed,
            ErrorCode::RequestFailed,
            ErrorCode::ResponseDecodeFailed,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::UnmergeAllRefused.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn grouping_errors_map_to_codes() {
        assert_eq!(
            GroupingError::UnmergeAllRefused.error_code(),
            ErrorCode::UnmergeAllRefused
        );
        assert_eq!(
            GroupingError::Fetch(ApiError::Decode("bad".into())).error_code(),
            ErrorCode::ResponseDecodeFailed
        );
        assert_eq!(
            GroupingError::Fetch(ApiError::Transport("refused".into())).error_code(),
            ErrorCode::FetchFailed
        );
    }
}
