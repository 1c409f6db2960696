use std::collections::HashSet;
use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

/// A run of digit groups: `+cc`, `(area)` or plain digits, each joined to the
/// next by at most one space, dot or hyphen. A run may hold several numbers;
/// `split_numbers` cuts it apart.
static RUN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+\d{1,3}|\(\d{1,4}\)|\d+)(?:[ .\-]?(?:\+\d{1,3}|\(\d{1,4}\)|\d+))*")
        .unwrap()
});

static YEAR_RANGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:19|20)\d{2}[ .\-]+(?:19|20)\d{2}$").unwrap());

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{1,2}[./\-]\d{1,2}[./\-](?:\d{2}|\d{4})|\d{4}[./\-]\d{1,2}[./\-]\d{1,2})$")
        .unwrap()
});

const MIN_DIGITS: usize = 7;
const MAX_DIGITS: usize = 15;

/// Phone numbers in `transcript`, formatting preserved, in order of first
/// appearance. Only exact duplicates collapse. Candidates overlapping any of
/// `url_spans` belong to a link and are skipped.
pub fn classify(transcript: &str, url_spans: &[Range<usize>]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut phones = Vec::new();

    for run in RUN_RE.find_iter(transcript) {
        for part in split_numbers(run.as_str()) {
            let (start, end) = (run.start() + part.start, run.start() + part.end);
            if url_spans.iter().any(|s| s.start < end && start < s.end) {
                continue;
            }
            if !standalone(transcript, start, end) {
                continue;
            }
            let candidate = &transcript[start..end];
            if !is_phone_number(candidate) {
                continue;
            }
            if seen.insert(candidate.to_string()) {
                phones.push(candidate.to_string());
            }
        }
    }
    phones
}

/// Cuts a run at spaces into separate numbers. A number ends after a
/// space-delimited chunk that is punctuated (`123-4567`) or long (`1234567`)
/// once it holds at least `MIN_DIGITS` digits. A chunk opening with `+` always
/// starts a new number. Whatever is left over is judged on its own, so an
/// unbroken run of short groups past `MAX_DIGITS` is rejected whole.
fn split_numbers(run: &str) -> Vec<Range<usize>> {
    let mut numbers = Vec::new();
    let mut current: Option<Range<usize>> = None;
    let mut digits = 0;
    let mut offset = 0;

    for chunk in run.split(' ') {
        let span = offset..offset + chunk.len();
        offset = span.end + 1;

        if chunk.starts_with('+') {
            if let Some(done) = current.take() {
                numbers.push(done);
            }
            digits = 0;
        }
        let number = current.get_or_insert(span.clone());
        number.end = span.end;

        let chunk_digits = digit_count(chunk);
        digits += chunk_digits;
        let closes = chunk.contains(['-', '.']) || chunk_digits >= MIN_DIGITS;
        if closes && digits >= MIN_DIGITS {
            numbers.extend(current.take());
            digits = 0;
        }
    }
    numbers.extend(current);
    numbers
}

/// Appends numbers from `tel:` links that the text did not already yield.
pub fn extend_from_tel(phones: &mut Vec<String>, links: &[String]) {
    for link in links {
        let Some(number) = tel_number(link) else {
            continue;
        };
        if !phones.contains(&number) {
            phones.push(number);
        }
    }
}

fn tel_number(link: &str) -> Option<String> {
    let link = link.trim();
    let rest = link
        .get(..4)
        .filter(|scheme| scheme.eq_ignore_ascii_case("tel:"))
        .map(|_| &link[4..])?;
    let number = rest
        .split(';')
        .next()
        .unwrap_or_default()
        .replace("%20", " ")
        .trim()
        .to_string();
    let digits = digit_count(&number);
    (MIN_DIGITS..=MAX_DIGITS).contains(&digits).then_some(number)
}

fn is_phone_number(candidate: &str) -> bool {
    let digits = digit_count(candidate);
    (MIN_DIGITS..=MAX_DIGITS).contains(&digits)
        && !YEAR_RANGE_RE.is_match(candidate)
        && !DATE_RE.is_match(candidate)
}

/// The match must not be glued to surrounding letters, digits or identifiers.
fn standalone(text: &str, start: usize, end: usize) -> bool {
    let before_ok = match text[..start].chars().next_back() {
        None => true,
        Some(c) => !(c.is_alphanumeric() || matches!(c, '-' | '_' | '/' | '.' | '+' | '@')),
    };
    let mut after = text[end..].chars();
    let after_ok = match after.next() {
        None => true,
        Some(c) if c.is_alphanumeric() || matches!(c, '_' | '@' | '/') => false,
        Some('-' | '.') => !after.next().is_some_and(|c| c.is_ascii_digit()),
        Some(_) => true,
    };
    before_ok && after_ok
}

fn digit_count(s: &str) -> usize {
    s.chars().filter(char::is_ascii_digit).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifiers::UrlClassifier;

    fn find(text: &str) -> Vec<String> {
        let spans: Vec<_> = UrlClassifier::default()
            .scan(text)
            .into_iter()
            .map(|m| m.span)
            .collect();
        classify(text, &spans)
    }

    #[test]
    fn test_common_formats_preserved() {
        let phones = find(
            "Call +1 (555) 123-4567 or 555.987.6543\nUK: +44 20 7946 0958, home 5551234567",
        );
        assert_eq!(
            phones,
            vec![
                "+1 (555) 123-4567",
                "555.987.6543",
                "+44 20 7946 0958",
                "5551234567"
            ]
        );
    }

    #[test]
    fn test_adjacent_numbers_stay_separate() {
        let phones = find("2019-2021 555-123-4567 555-987-6543");
        assert_eq!(phones, vec!["555-123-4567", "555-987-6543"]);
    }

    #[test]
    fn test_groups_of_any_length() {
        assert_eq!(find("Mobile: +44 7911 123456"), vec!["+44 7911 123456"]);
        assert_eq!(find("+91 98765 43210"), vec!["+91 98765 43210"]);
        assert_eq!(find("Tel +49 30 1234567"), vec!["+49 30 1234567"]);
    }

    #[test]
    fn test_mixed_separators() {
        assert_eq!(find("+1 555 123-4567"), vec!["+1 555 123-4567"]);
        assert_eq!(find("Office: 555 123-4567."), vec!["555 123-4567"]);
        assert_eq!(find("+33 1.23.45.67.89"), vec!["+33 1.23.45.67.89"]);
    }

    #[test]
    fn test_plus_starts_a_new_number() {
        let phones = find("+44 20 7946 0958 +1 555 123 4567");
        assert_eq!(phones, vec!["+44 20 7946 0958", "+1 555 123 4567"]);
    }

    #[test]
    fn test_unpunctuated_numbers_side_by_side() {
        let phones = find("5551234567 5559876543");
        assert_eq!(phones, vec!["5551234567", "5559876543"]);
    }

    #[test]
    fn test_year_range_rejected() {
        assert!(find("Acme Corp, 2019-2021").is_empty());
        assert!(find("Worked there 2015 - 2018").is_empty());
    }

    #[test]
    fn test_dates_rejected() {
        assert!(find("Graduated 01.02.2020").is_empty());
        assert!(find("Started 2020-01-15").is_empty());
    }

    #[test]
    fn test_too_few_or_too_many_digits() {
        assert!(find("Room 12-34").is_empty());
        assert!(find("id 1234 5678 9012 3456 7890").is_empty());
    }

    #[test]
    fn test_exact_duplicates_collapse_only() {
        let phones = find("555-123-4567 555-123-4567 (555) 123-4567");
        assert_eq!(phones, vec!["555-123-4567", "(555) 123-4567"]);
    }

    #[test]
    fn test_digits_inside_url_ignored() {
        assert!(find("https://linkedin.com/in/jane-5551234567").is_empty());
        assert!(find("profile id: jane-5551234567").is_empty());
    }

    #[test]
    fn test_tel_links_appended() {
        let mut phones = find("Phone: 555-123-4567");
        extend_from_tel(
            &mut phones,
            &[
                "tel:555-123-4567".to_string(),
                "TEL:+44%2020%207946%200958".to_string(),
                "tel:123".to_string(),
                "mailto:a@b.co".to_string(),
            ],
        );
        assert_eq!(phones, vec!["555-123-4567", "+44 20 7946 0958"]);
    }
}
