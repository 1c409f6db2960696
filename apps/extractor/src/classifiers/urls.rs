use std::collections::HashSet;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::platforms::{host_of, PlatformTable};
use crate::models::LinkRecord;

/// `scheme://host...` or `www.host...`. Brackets are allowed inside so that
/// balanced ones survive; unbalanced trailing ones are trimmed afterwards.
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b[a-z][a-z0-9+.\-]*://[\w\-][^\s<>"'`{}|\\^]*|\bwww\.[\w\-][^\s<>"'`{}|\\^]*"#,
    )
    .unwrap()
});

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', '\'', '"'];

/// A URL found in free text. `span` covers the trimmed match in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct UrlMatch {
    pub span: Range<usize>,
    pub url: String,
}

/// Finds, normalizes and labels links. Bare platform hosts such as
/// `github.com/alice` are recognized only for hosts present in the table.
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    table: PlatformTable,
    bare_hosts: Option<Regex>,
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self::new(PlatformTable::default())
    }
}

impl UrlClassifier {
    pub fn new(table: PlatformTable) -> Self {
        let bare_hosts = bare_host_pattern(&table);
        Self { table, bare_hosts }
    }

    /// Labels `found` (from `scan`) followed by the structural links not seen
    /// in the text. Duplicates compare scheme and host case-insensitively; the
    /// first spelling seen is kept.
    pub fn label(&self, found: &[UrlMatch], structural: &[String]) -> Vec<LinkRecord> {
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        let found = found.iter().map(|m| m.url.clone());
        let linked = structural.iter().filter_map(|link| normalize_structural(link));

        for url in found.chain(linked) {
            if seen.insert(dedup_key(&url)) {
                records.push(LinkRecord {
                    platform: self.table.classify(&url),
                    url,
                });
            }
        }
        records
    }

    /// All URL candidates in `text`, ordered by position. Their spans are what
    /// the email and phone scanners skip.
    pub fn scan(&self, text: &str) -> Vec<UrlMatch> {
        let mut matches = scan_explicit(text);

        if let Some(bare) = &self.bare_hosts {
            let mut extra = Vec::new();
            for m in bare.find_iter(text) {
                if !accepts_bare(text, m.start())
                    || matches.iter().any(|e| overlaps(&e.span, &m.range()))
                {
                    continue;
                }
                let (end, trimmed) = trim_candidate(text, m.start(), m.end());
                if !is_profile_like(trimmed) {
                    continue;
                }
                extra.push(UrlMatch {
                    span: m.start()..end,
                    url: format!("https://{trimmed}"),
                });
            }
            matches.extend(extra);
            matches.sort_by_key(|m| m.span.start);
        }
        matches
    }
}

fn scan_explicit(text: &str) -> Vec<UrlMatch> {
    let mut matches = Vec::new();
    for m in URL_RE.find_iter(text) {
        let (end, trimmed) = trim_candidate(text, m.start(), m.end());
        let is_www = trimmed
            .get(..4)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("www."));

        let url = if is_www {
            if !accepts_bare(text, m.start()) || trimmed.len() <= 4 {
                continue;
            }
            format!("https://{trimmed}")
        } else {
            if host_of(trimmed).is_empty() {
                continue;
            }
            trimmed.to_string()
        };
        matches.push(UrlMatch {
            span: m.start()..end,
            url,
        });
    }
    matches
}

/// Trailing punctuation and unbalanced closing brackets belong to the prose.
fn trim_candidate(text: &str, start: usize, end: usize) -> (usize, &str) {
    let mut candidate = &text[start..end];
    loop {
        let before = candidate.len();
        candidate = candidate.trim_end_matches(TRAILING_PUNCTUATION);
        for (open, close) in [('(', ')'), ('[', ']')] {
            if candidate.ends_with(close)
                && candidate.matches(close).count() > candidate.matches(open).count()
            {
                candidate = &candidate[..candidate.len() - 1];
            }
        }
        if candidate.len() == before {
            break;
        }
    }
    (start + candidate.len(), candidate)
}

/// A host without a scheme must not continue an email, path, scheme or longer
/// domain. A label colon as in `Website:www.a.com` is fine.
fn accepts_bare(text: &str, start: usize) -> bool {
    let before = &text[..start];
    if before.ends_with("://") {
        return false;
    }
    match before.chars().next_back() {
        None => true,
        Some(c) => !(c.is_alphanumeric() || matches!(c, '.' | '@' | '/' | '-' | '_')),
    }
}

/// `github.com/alice` and `alice.github.io` name someone; a bare `github.com`
/// mention does not.
fn is_profile_like(bare: &str) -> bool {
    let host = host_of(bare);
    let has_path = !bare[host.len()..].trim_start_matches('/').is_empty();
    has_path || host.matches('.').count() >= 2
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn bare_host_pattern(table: &PlatformTable) -> Option<Regex> {
    if table.rules().is_empty() {
        return None;
    }
    let hosts = table
        .rules()
        .iter()
        .map(|r| regex::escape(&r.host))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = format!(r#"(?i)\b(?:[a-z0-9\-]+\.)*(?:{hosts})\b(?:[/?#][^\s<>"'`{{}}|\\^]*)?"#);
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!("Failed to build bare host pattern: {}", e);
            None
        }
    }
}

/// Structural targets are already whole URLs; only web links are kept.
fn normalize_structural(link: &str) -> Option<String> {
    let link = link.trim();
    let lower = link.to_ascii_lowercase();
    if lower.starts_with("www.") && link.len() > 4 {
        return Some(format!("https://{link}"));
    }
    let (scheme, _) = lower.split_once("://")?;
    if scheme.is_empty() || host_of(link).is_empty() {
        return None;
    }
    Some(link.to_string())
}

fn dedup_key(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_ascii_lowercase();
    };
    let host_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    format!(
        "{}://{}{}",
        scheme.to_ascii_lowercase(),
        rest[..host_end].to_ascii_lowercase(),
        &rest[host_end..]
    )
}
