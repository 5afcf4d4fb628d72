//! Cursor pagination from the `Link` response header.
//!
//! The service sends both directions on every page:
//!
//! ```text
//! <https://host/api/0/issues/1/hashes/?cursor=0:0:1>; rel="previous"; results="false"; cursor="0:0:1",
//! <https://host/api/0/issues/1/hashes/?cursor=0:100:0>; rel="next"; results="true"; cursor="0:100:0"
//! ```
//!
//! `results="false"` means the link exists but the page behind it is empty.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub href: String,
    pub results: bool,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    pub previous: Option<PageLink>,
    pub next: Option<PageLink>,
}

impl PageLinks {
    /// Cursor for the next page, only when that page has results.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.next
            .as_ref()
            .filter(|link| link.results)
            .and_then(|link| link.cursor.as_deref())
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next_cursor().is_some()
    }
}

/// Parse a `Link` header. Segments without a URL or a known `rel` are skipped.
#[must_use]
pub fn parse_link_header(header: &str) -> PageLinks {
    let mut links = PageLinks::default();

    for segment in split_segments(header) {
        let mut parts = segment.split(';').map(str::trim);
        let Some(target) = parts.next() else {
            continue;
        };
        let Some(href) = target
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
        else {
            continue;
        };

        let mut rel = None;
        let mut results = false;
        let mut cursor = None;
        for param in parts {
            let Some((key, value)) = param.split_once('=') else {
                continue;
            };
            let value = value.trim().trim_matches('"');
            match key.trim() {
                "rel" => rel = Some(value.to_string()),
                "results" => results = value == "true",
                "cursor" => cursor = Some(value.to_string()),
                _ => {}
            }
        }

        let link = PageLink {
            href: href.to_string(),
            results,
            cursor,
        };
        match rel.as_deref() {
            Some("previous") => links.previous = Some(link),
            Some("next") => links.next = Some(link),
            _ => {}
        }
    }

    links
}

/// Split on commas that separate links, not commas inside `<...>` or quotes.
fn split_segments(header: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth_angle = false;
    let mut in_quotes = false;
    let mut start = 0;

    for (idx, ch) in header.char_indices() {
        match ch {
            '<' if !in_quotes => depth_angle = true,
            '>' if !in_quotes => depth_angle = false,
            '"' if !depth_angle => in_quotes = !in_quotes,
            ',' if !depth_angle && !in_quotes => {
                segments.push(header[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    let tail = header[start..].trim();
    if !tail.is_empty() {
        segments.push(tail);
    }
    segments.retain(|s| !s.is_empty());
    segments
}
