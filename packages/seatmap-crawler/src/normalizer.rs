//! Aircraft model normalization and filename matching.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use crate::types::CrawlRecord;

/// Label returned when the input carries nothing usable.
pub const UNKNOWN_MODEL: &str = "UNKNOWN";

lazy_static! {
    static ref DIGIT_RUN: Regex = Regex::new(r"\d+").unwrap();
}

/// Built-in keyword table, in match order.
///
/// Order matters: the first family with a keyword contained in the input
/// wins, so narrower families must not be shadowed by broader ones.
const BUILTIN_KEYWORDS: &[(&str, &[&str])] = &[
    ("A320", &["A320", "A319", "A321", "A318"]),
    ("A330", &["A330", "A332", "A333"]),
    ("A340", &["A340", "A342", "A343", "A345"]),
    ("A350", &["A350", "A359"]),
    ("A380", &["A380"]),
    ("B737", &["B737", "737", "B738", "B739"]),
    ("B747", &["B747", "747", "B744", "B748"]),
    ("B757", &["B757", "757"]),
    ("B767", &["B767", "767"]),
    ("B777", &["B777", "777", "B772", "B773", "B77W"]),
    ("B787", &["B787", "787", "B788", "B789"]),
];

/// Ordered mapping of canonical model codes to surface-form keywords.
///
/// Keywords are stored upper-cased; matching is case-insensitive.
#[derive(Debug, Clone)]
pub struct KeywordTable {
    entries: Vec<(String, Vec<String>)>,
}

impl KeywordTable {
    pub fn new<C, K>(entries: impl IntoIterator<Item = (C, Vec<K>)>) -> Self
    where
        C: Into<String>,
        K: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|(code, keywords)| {
                let code: String = code.into();
                let keywords = keywords
                    .iter()
                    .map(|k| k.as_ref().trim().to_uppercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (code.to_uppercase(), keywords)
            })
            .collect();
        Self { entries }
    }

    /// The Airbus and Boeing families the catalog lists.
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_KEYWORDS
                .iter()
                .map(|(code, keywords)| (*code, keywords.to_vec())),
        )
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(code, _)| code.as_str())
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .flat_map(|(_, keywords)| keywords.iter().map(String::as_str))
    }

    /// First family with a keyword contained in `upper`.
    fn family_of(&self, upper: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| upper.contains(k.as_str())))
            .map(|(code, _)| code.as_str())
    }
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Maps free-form aircraft text to canonical model codes.
///
/// Never fails: unknown text falls back to a best-effort label.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    table: KeywordTable,
}

impl Normalizer {
    pub fn new(table: KeywordTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    /// Canonical model code for `raw_label`.
    ///
    /// Falls back to the upper-cased alphanumerics of the input, then to the
    /// trimmed upper-cased input, then to [`UNKNOWN_MODEL`].
    pub fn canonicalize(&self, raw_label: &str) -> String {
        let upper = raw_label.trim().to_uppercase();

        if let Some(code) = self.table.family_of(&upper) {
            return code.to_string();
        }

        let stripped: String = upper.chars().filter(|c| c.is_alphanumeric()).collect();
        if !stripped.is_empty() {
            return stripped;
        }
        if !upper.is_empty() {
            return upper;
        }
        UNKNOWN_MODEL.to_string()
    }

    /// Keyword family of `raw_label`, if the table knows one.
    pub fn family(&self, raw_label: &str) -> Option<&str> {
        self.table.family_of(&raw_label.trim().to_uppercase())
    }

    /// Whether a listing label belongs to `requested_model`.
    ///
    /// Labels and requests that both resolve to a keyword family must name
    /// the same family. Anything else goes through [`Normalizer::matches`],
    /// since slugs outside the table keep their carrier prefix.
    pub fn label_matches(&self, raw_label: &str, requested_model: &str) -> bool {
        match (self.family(raw_label), self.family(requested_model)) {
            (Some(label), Some(wanted)) => label == wanted,
            _ => self.matches(raw_label, requested_model),
        }
    }

    /// Whether `filename` looks like an image of `requested_model`.
    ///
    /// Tries a direct substring match, then a keyword present in both, then
    /// any shared digit run. The digit fallback is loose: "320" in an
    /// unrelated filename still matches A320.
    pub fn matches(&self, filename: &str, requested_model: &str) -> bool {
        let filename = filename.trim().to_uppercase();
        let model = requested_model.trim().to_uppercase();
        if filename.is_empty() || model.is_empty() {
            return false;
        }

        if filename.contains(&model) {
            return true;
        }

        if self
            .table
            .keywords()
            .any(|k| model.contains(k) && filename.contains(k))
        {
            return true;
        }

        let model_digits: HashSet<&str> = DIGIT_RUN.find_iter(&model).map(|m| m.as_str()).collect();
        DIGIT_RUN
            .find_iter(&filename)
            .any(|m| model_digits.contains(m.as_str()))
    }

    /// Records whose image filename matches `requested_model`.
    pub fn filter_records<'a>(
        &self,
        records: &'a [CrawlRecord],
        requested_model: &str,
    ) -> Vec<&'a CrawlRecord> {
        records
            .iter()
            .filter(|r| self.matches(&r.image.filename, requested_model))
            .collect()
    }
}
