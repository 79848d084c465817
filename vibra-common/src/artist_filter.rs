//! Artist-name redaction for generation prompts
//!
//! The upstream generation service rejects prompts that mention real artists.
//! Before any free-text field leaves the proxy it is passed through an
//! [`ArtistFilter`], which runs two independent matchers:
//!
//! 1. A [`DenyList`]: exact artist names, matched case-insensitively on word
//!    boundaries, with any run of whitespace inside a name accepted.
//! 2. A [`CreditHeuristic`]: strips credit clauses such as
//!    `feat. Some Person` or `inspired by Some Band`, where the credited name
//!    is a sequence of capitalized words.
//!
//! After both matchers the residual punctuation and whitespace are
//! normalized so removals do not leave `, ,` or dangling separators behind.
//!
//! The heuristic matcher can remove capitalized phrases that are not artist
//! names (e.g. "by Night Drive"). This is accepted behaviour.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Error, Result};

/// Built-in deny list of well-known artists
pub const BUILTIN_ARTISTS: &[&str] = &[
    "kygo", "avicii", "calvin harris", "david guetta", "zedd", "the chainsmokers",
    "chainsmokers", "marshmello", "skrillex", "diplo", "steve aoki", "hardwell",
    "tiesto", "tiësto", "armin van buuren", "deadmau5", "porter robinson", "flume",
    "illenium", "galantis", "alan walker", "kshmr", "oliver heldens", "don diablo",
    "sam feldt", "robin schulz", "lost frequencies", "matoma", "martin garrix",
    "daft punk", "swedish house mafia", "eric prydz", "above & beyond", "kaskade",
    "above and beyond", "drake", "taylor swift", "beyonce", "eminem", "kanye west",
    "ed sheeran", "the weeknd", "billie eilish", "post malone", "dua lipa",
    "bruno mars", "lady gaga", "rihanna", "adele", "coldplay", "imagine dragons",
    "twenty one pilots", "linkin park", "metallica", "nirvana",
];

/// Lead-in phrases that introduce a credited name.
///
/// A trailing `.` marks an abbreviation whose period is optional.
pub const BUILTIN_CREDIT_LEAD_INS: &[&str] = &["inspired by", "by", "feat.", "ft.", "featuring"];

static REPEATED_COMMAS: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*,").expect("valid regex"));
static REPEATED_PERIODS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.\s*\.").expect("valid regex"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));
static EDGE_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[,.\s]+|[,.\s]+$").expect("valid regex"));

static DEFAULT_FILTER: Lazy<ArtistFilter> = Lazy::new(ArtistFilter::builtin);

/// Process-wide filter built from the built-in deny list and lead-ins
pub fn default_filter() -> &'static ArtistFilter {
    &DEFAULT_FILTER
}

/// Dictionary of artist names to remove
#[derive(Debug, Clone)]
pub struct DenyList {
    names: Vec<String>,
    pattern: Option<Regex>,
}

impl DenyList {
    /// Build a deny list from arbitrary names.
    ///
    /// Names are lowercased and their internal whitespace collapsed; blank
    /// entries are ignored.
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = names
            .into_iter()
            .map(|name| normalize_name(name.as_ref()))
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        names.dedup();

        // Longest first so overlapping names remove the widest match
        let mut ordered: Vec<&String> = names.iter().collect();
        ordered.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let pattern = if ordered.is_empty() {
            None
        } else {
            let alternatives: Vec<String> = ordered.iter().map(|name| name_pattern(name)).collect();
            Some(Regex::new(&format!("(?i)(?:{})", alternatives.join("|")))?)
        };

        Ok(Self { names, pattern })
    }

    /// Deny list containing [`BUILTIN_ARTISTS`]
    pub fn builtin() -> Self {
        Self::new(BUILTIN_ARTISTS).expect("built-in deny list compiles")
    }

    /// Normalized names in this list
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether `name` (any case, any internal whitespace) is denied
    pub fn contains(&self, name: &str) -> bool {
        let normalized = normalize_name(name);
        self.names.binary_search(&normalized).is_ok()
    }

    /// Remove every denied name, repeating until nothing matches.
    ///
    /// Repetition catches names that only become adjacent once an inner
    /// match is removed ("daft daft punk punk").
    fn strip(&self, text: String, removed: &mut Vec<String>) -> String {
        let Some(pattern) = &self.pattern else {
            return text;
        };

        let mut current = text;
        loop {
            let before = removed.len();
            removed.extend(pattern.find_iter(&current).map(|m| normalize_name(m.as_str())));
            if removed.len() == before {
                return current;
            }
            current = pattern.replace_all(&current, "").into_owned();
        }
    }
}

/// Heuristic remover for `by <Capitalized Name>`-style credit clauses
#[derive(Debug, Clone)]
pub struct CreditHeuristic {
    lead_ins: Vec<String>,
    pattern: Regex,
}

impl CreditHeuristic {
    /// Build a heuristic from lead-in phrases (matched case-sensitively)
    pub fn new<I, S>(lead_ins: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lead_ins: Vec<String> = lead_ins
            .into_iter()
            .map(|phrase| phrase.as_ref().trim().to_string())
            .filter(|phrase| !phrase.is_empty())
            .collect();
        if lead_ins.is_empty() {
            return Err(Error::InvalidInput(
                "credit heuristic needs at least one lead-in phrase".to_string(),
            ));
        }

        let alternatives: Vec<String> = lead_ins.iter().map(|phrase| lead_in_pattern(phrase)).collect();
        let pattern = Regex::new(&format!(
            r"\b(?:{})\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*",
            alternatives.join("|")
        ))?;

        Ok(Self { lead_ins, pattern })
    }

    /// Heuristic using [`BUILTIN_CREDIT_LEAD_INS`]
    pub fn builtin() -> Self {
        Self::new(BUILTIN_CREDIT_LEAD_INS).expect("built-in credit lead-ins compile")
    }

    pub fn lead_ins(&self) -> &[String] {
        &self.lead_ins
    }

    fn strip(&self, text: String, removed: &mut Vec<String>) -> String {
        removed.extend(self.pattern.find_iter(&text).map(|m| m.as_str().to_string()));
        self.pattern.replace_all(&text, "").into_owned()
    }
}

/// Result of a redaction with what was removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redaction {
    /// Cleaned text
    pub text: String,
    /// Denied names that were removed (normalized, one entry per occurrence)
    pub removed_names: Vec<String>,
    /// Credit clauses removed by the heuristic, as they appeared
    pub removed_credits: Vec<String>,
}

impl Redaction {
    /// True when neither matcher removed anything
    pub fn is_clean(&self) -> bool {
        self.removed_names.is_empty() && self.removed_credits.is_empty()
    }
}

/// Artist-name filter combining a deny list and an optional credit heuristic
#[derive(Debug, Clone)]
pub struct ArtistFilter {
    deny_list: DenyList,
    credits: Option<CreditHeuristic>,
}

impl ArtistFilter {
    pub fn new(deny_list: DenyList, credits: Option<CreditHeuristic>) -> Self {
        Self { deny_list, credits }
    }

    /// Filter with the built-in deny list and credit heuristic
    pub fn builtin() -> Self {
        Self::new(DenyList::builtin(), Some(CreditHeuristic::builtin()))
    }

    pub fn deny_list(&self) -> &DenyList {
        &self.deny_list
    }

    pub fn credits(&self) -> Option<&CreditHeuristic> {
        self.credits.as_ref()
    }

    /// Redact `text`; empty input is returned unchanged
    pub fn redact(&self, text: &str) -> String {
        self.redact_with_report(text).text
    }

    /// Redact an optional field; `None` stays `None`
    pub fn redact_opt(&self, text: Option<&str>) -> Option<String> {
        text.map(|t| self.redact(t))
    }

    /// Redact `text` and report which names and credits were removed
    pub fn redact_with_report(&self, text: &str) -> Redaction {
        if text.is_empty() {
            return Redaction::default();
        }

        let mut removed_names = Vec::new();
        let mut removed_credits = Vec::new();

        let mut cleaned = self.deny_list.strip(text.to_string(), &mut removed_names);
        if let Some(credits) = &self.credits {
            cleaned = credits.strip(cleaned, &mut removed_credits);
        }

        Redaction {
            text: tidy(cleaned),
            removed_names,
            removed_credits,
        }
    }
}

impl Default for ArtistFilter {
    fn default() -> Self {
        default_filter().clone()
    }
}

/// Normalize leftover punctuation and whitespace after removals
fn tidy(text: String) -> String {
    let text = replace_until_stable(&REPEATED_COMMAS, text, ",");
    let text = replace_until_stable(&REPEATED_PERIODS, text, ".");
    let collapsed = WHITESPACE_RUN.replace_all(&text, " ");
    EDGE_PUNCTUATION.replace_all(collapsed.trim(), "").into_owned()
}

fn replace_until_stable(pattern: &Regex, text: String, replacement: &str) -> String {
    let mut current = text;
    while pattern.is_match(&current) {
        current = pattern.replace_all(&current, replacement).into_owned();
    }
    current
}

fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whole-word pattern for one normalized name; inner spaces accept any whitespace run
fn name_pattern(name: &str) -> String {
    let body = name
        .split(' ')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");

    let starts_word = name.chars().next().is_some_and(is_word_char);
    let ends_word = name.chars().last().is_some_and(is_word_char);

    format!(
        "{}{}{}",
        if starts_word { r"\b" } else { "" },
        body,
        if ends_word { r"\b" } else { "" }
    )
}

fn lead_in_pattern(phrase: &str) -> String {
    let (words, optional_period) = match phrase.strip_suffix('.') {
        Some(stem) => (stem, true),
        None => (phrase, false),
    };

    let mut fragment = words
        .split_whitespace()
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"\s+");
    if optional_period {
        fragment.push_str(r"\.?");
    }
    fragment
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(text: &str) -> String {
        default_filter().redact(text)
    }

    #[test]
    fn test_removes_single_artist() {
        assert_eq!(filter("tropical house like Kygo"), "tropical house like");
    }

    #[test]
    fn test_case_insensitive_and_whitespace_tolerant() {
        assert_eq!(filter("melodic DAFT   PUNK groove"), "melodic groove");
        assert_eq!(filter("anthem in the style of Swedish\tHouse\nMafia"), "anthem in the style of");
    }

    #[test]
    fn test_whole_word_only() {
        // "adele" must not be removed from inside "Adelestra"
        assert_eq!(filter("Adelestra ambient"), "Adelestra ambient");
        assert_eq!(filter("drakes and dragons"), "drakes and dragons");
    }

    #[test]
    fn test_accented_and_symbol_names() {
        assert_eq!(filter("TIËSTO trance"), "trance");
        assert_eq!(filter("uplifting Above & Beyond vibes"), "uplifting vibes");
    }

    #[test]
    fn test_credit_clauses_removed() {
        assert_eq!(filter("summer track feat. John Doe"), "summer track");
        assert_eq!(filter("summer track ft Jane Roe, warm pads"), "summer track , warm pads");
        assert_eq!(filter("deep house inspired by Some Famous Band"), "deep house");
    }

    #[test]
    fn test_credit_lead_in_is_case_sensitive() {
        // Only the lowercase lead-in triggers the heuristic
        assert_eq!(filter("By Night"), "By Night");
        assert_eq!(filter("written by Night"), "written");
    }

    #[test]
    fn test_punctuation_cleanup() {
        assert_eq!(filter("Kygo, Avicii, tropical"), "tropical");
        assert_eq!(filter("calm. Zedd. . outro."), "calm. outro");
        assert_eq!(filter(", , Drake ,"), "");
    }

    #[test]
    fn test_adjacent_after_removal() {
        let out = filter("daft daft punk punk");
        assert!(!out.to_lowercase().contains("daft punk"), "got {:?}", out);
    }

    #[test]
    fn test_empty_and_none() {
        assert_eq!(filter(""), "");
        assert_eq!(default_filter().redact_opt(None), None);
        assert_eq!(default_filter().redact_opt(Some("")), Some(String::new()));
    }

    #[test]
    fn test_report_lists_removals() {
        let report = default_filter().redact_with_report("Calvin  Harris meets Dua Lipa feat. Someone Else");
        assert_eq!(report.text, "meets");
        assert_eq!(report.removed_names, vec!["calvin harris", "dua lipa"]);
        assert_eq!(report.removed_credits, vec!["feat. Someone Else"]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_custom_deny_list_without_heuristic() {
        let filter = ArtistFilter::new(DenyList::new(["Night Owl"]).unwrap(), None);
        assert_eq!(filter.redact("chill by Night Owl"), "chill by");
        assert_eq!(filter.redact("Kygo"), "Kygo");
        assert!(filter.deny_list().contains("NIGHT   owl"));
    }

    #[test]
    fn test_empty_deny_list_only_tidies() {
        let filter = ArtistFilter::new(DenyList::new(Vec::<String>::new()).unwrap(), None);
        assert!(filter.deny_list().is_empty());
        assert_eq!(filter.redact("  a ,, b  "), "a , b");
    }

    #[test]
    fn test_credit_heuristic_requires_lead_ins() {
        assert!(CreditHeuristic::new(Vec::<String>::new()).is_err());
        let heuristic = CreditHeuristic::new(["remix of"]).unwrap();
        let filter = ArtistFilter::new(DenyList::new(["kygo"]).unwrap(), Some(heuristic));
        assert_eq!(filter.redact("remix of Paper Moon, by Night"), "by Night");
    }

    #[test]
    fn test_builtin_list_covers_every_name() {
        let deny = DenyList::builtin();
        for name in BUILTIN_ARTISTS {
            assert!(deny.contains(name), "{} missing", name);
        }
    }
}
