use crate::models::Platform;

/// One host → platform mapping. `host` matches the URL host itself and any of
/// its subdomains.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformRule {
    pub host: String,
    pub platform: Platform,
}

/// Ordered lookup table used to label links. The first matching rule wins, so
/// list order encodes precedence.
///
/// URLs that match no rule are labelled `Portfolio` when they look like a
/// personal site (a portfolio keyword anywhere in the URL, or a personal-site
/// TLD), and `Other` otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformTable {
    rules: Vec<PlatformRule>,
    portfolio_keywords: Vec<String>,
    portfolio_tlds: Vec<String>,
}

const DEFAULT_RULES: &[(&str, Platform)] = &[
    ("linkedin.com", Platform::LinkedIn),
    ("lnkd.in", Platform::LinkedIn),
    ("github.com", Platform::GitHub),
    ("twitter.com", Platform::TwitterX),
    ("x.com", Platform::TwitterX),
    ("medium.com", Platform::Medium),
    ("stackoverflow.com", Platform::StackOverflow),
    ("behance.net", Platform::Behance),
    ("dribbble.com", Platform::Dribbble),
    // personal hosting
    ("github.io", Platform::Portfolio),
    ("gitlab.io", Platform::Portfolio),
    ("netlify.app", Platform::Portfolio),
    ("vercel.app", Platform::Portfolio),
    ("pages.dev", Platform::Portfolio),
    ("about.me", Platform::Portfolio),
    ("carrd.co", Platform::Portfolio),
    ("wixsite.com", Platform::Portfolio),
    ("webflow.io", Platform::Portfolio),
];

const DEFAULT_PORTFOLIO_KEYWORDS: &[&str] = &["portfolio", "personal"];

const DEFAULT_PORTFOLIO_TLDS: &[&str] = &[
    "dev", "me", "io", "page", "site", "design", "tech", "art", "website", "portfolio",
];

impl Default for PlatformTable {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.iter().copied()).with_portfolio_hints(
            DEFAULT_PORTFOLIO_KEYWORDS.iter().copied(),
            DEFAULT_PORTFOLIO_TLDS.iter().copied(),
        )
    }
}

impl PlatformTable {
    /// A table with only the given rules and no portfolio heuristics.
    pub fn new<H: Into<String>>(rules: impl IntoIterator<Item = (H, Platform)>) -> Self {
        Self {
            rules: rules
                .into_iter()
                .map(|(host, platform)| PlatformRule {
                    host: host.into().to_ascii_lowercase(),
                    platform,
                })
                .collect(),
            portfolio_keywords: Vec::new(),
            portfolio_tlds: Vec::new(),
        }
    }

    pub fn with_portfolio_hints<K: Into<String>, T: Into<String>>(
        mut self,
        keywords: impl IntoIterator<Item = K>,
        tlds: impl IntoIterator<Item = T>,
    ) -> Self {
        self.portfolio_keywords = keywords
            .into_iter()
            .map(|k| k.into().to_ascii_lowercase())
            .collect();
        self.portfolio_tlds = tlds
            .into_iter()
            .map(|t| t.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn rules(&self) -> &[PlatformRule] {
        &self.rules
    }

    pub fn classify(&self, url: &str) -> Platform {
        let host = host_of(url).to_ascii_lowercase();

        if let Some(rule) = self.rules.iter().find(|r| host_matches(&host, &r.host)) {
            return rule.platform;
        }
        if self.looks_personal(url, &host) {
            Platform::Portfolio
        } else {
            Platform::Other
        }
    }

    fn looks_personal(&self, url: &str, host: &str) -> bool {
        let lower = url.to_ascii_lowercase();
        if self.portfolio_keywords.iter().any(|k| lower.contains(k.as_str())) {
            return true;
        }
        host.rsplit('.')
            .next()
            .is_some_and(|tld| self.portfolio_tlds.iter().any(|t| t == tld))
    }
}

fn host_matches(host: &str, rule_host: &str) -> bool {
    host == rule_host
        || host
            .strip_suffix(rule_host)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Host part of an absolute URL: no scheme, credentials, port, path, query or
/// fragment. Case is preserved.
pub fn host_of(url: &str) -> &str {
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = after_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    host_port.split(':').next().unwrap_or_default()
}
