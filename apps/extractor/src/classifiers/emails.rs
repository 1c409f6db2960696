use std::collections::HashSet;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b").unwrap()
});

static EMAIL_EXACT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").unwrap()
});

/// Insertion-ordered set of addresses, unique ignoring case.
#[derive(Debug, Clone, Default)]
pub struct EmailSet {
    seen: HashSet<String>,
    ordered: Vec<String>,
}

impl EmailSet {
    /// Returns false when an address equal ignoring case is already present.
    pub fn insert(&mut self, email: &str) -> bool {
        if !self.seen.insert(email.to_lowercase()) {
            return false;
        }
        self.ordered.push(email.to_string());
        true
    }

    /// Adds the addresses behind `mailto:` links. Other links are ignored.
    pub fn extend_from_mailto(&mut self, links: &[String]) {
        for link in links {
            for address in mailto_addresses(link) {
                self.insert(&address);
            }
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        self.ordered
    }
}

/// Addresses in `transcript`, in order of first appearance. Matches inside one
/// of `url_spans` or touching a `/` are path segments, not addresses.
pub fn classify(transcript: &str, url_spans: &[Range<usize>]) -> EmailSet {
    let mut set = EmailSet::default();

    for m in EMAIL_RE.find_iter(transcript) {
        if url_spans.iter().any(|s| s.start <= m.start() && m.end() <= s.end) {
            continue;
        }
        let touches_slash = transcript[..m.start()].ends_with('/')
            || transcript[m.end()..].starts_with('/');
        if touches_slash {
            continue;
        }
        set.insert(m.as_str());
    }
    set
}

fn mailto_addresses(link: &str) -> Vec<String> {
    let link = link.trim();
    let Some(rest) = link
        .get(..7)
        .filter(|scheme| scheme.eq_ignore_ascii_case("mailto:"))
        .map(|_| &link[7..])
    else {
        return vec![];
    };
    let recipients = rest.split('?').next().unwrap_or_default();

    recipients
        .split(',')
        .map(|r| r.trim().replace("%40", "@").replace("%2B", "+"))
        .filter(|r| EMAIL_EXACT_RE.is_match(r))
        .collect()
}
