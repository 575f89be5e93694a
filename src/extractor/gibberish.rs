//! Readability verdicts for extracted text.
//!
//! No single statistic separates prose from PDF noise, so the classifier runs
//! several independent checks and treats any failure as disqualifying.

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::LazyLock;

const COMMON_WORDS: [&str; 10] = ["the", "and", "to", "of", "in", "for", "is", "on", "that", "by"];

const PDF_KEYWORDS: [&str; 11] = [
    "obj",
    "endobj",
    "stream",
    "endstream",
    "xref",
    "trailer",
    "Filter",
    "FlateDecode",
    "Length",
    "Type",
    "Page",
];

// A keyword counts only in structural position: after `/`, or next to `<<` / `>>`.
static PDF_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    PDF_KEYWORDS
        .iter()
        .map(|kw| {
            Regex::new(&format!(r"(?:/|<<|>>)\s*{kw}\b|\b{kw}\s*(?:<<|>>)")).unwrap()
        })
        .collect()
});

static SENTENCE_SPLIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

static COMMON_WORD_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    COMMON_WORDS
        .iter()
        .map(|w| Regex::new(&format!(r"(?i)\b{w}\b")).unwrap())
        .collect()
});

/// Tunable limits for each check.
#[derive(Debug, Clone, PartialEq)]
pub struct Thresholds {
    pub min_length: usize,
    pub max_binary_ratio: f64,
    pub max_special_ratio: f64,
    pub max_structural_markers: usize,
    pub max_mean_word_length: f64,
    pub min_words_per_sentence: f64,
    pub max_words_per_sentence: f64,
    pub min_common_words: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_length: 50,
            max_binary_ratio: 0.05,
            max_special_ratio: 0.30,
            max_structural_markers: 3,
            max_mean_word_length: 15.0,
            min_words_per_sentence: 1.0,
            max_words_per_sentence: 50.0,
            min_common_words: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    TooShort,
    BinaryDensity,
    SpecialCharDensity,
    PdfStructure,
    WordLength,
    SentenceLength,
    CommonWords,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub is_gibberish: bool,
    pub failed_checks: BTreeSet<Check>,
}

impl Verdict {
    fn from_failures(failed_checks: BTreeSet<Check>) -> Self {
        Self {
            is_gibberish: !failed_checks.is_empty(),
            failed_checks,
        }
    }

    pub fn failed(&self, check: Check) -> bool {
        self.failed_checks.contains(&check)
    }
}

/// `classify` with the default thresholds, reduced to a boolean.
pub fn is_gibberish(text: Option<&str>) -> bool {
    classify(text, &Thresholds::default()).is_gibberish
}

/// Evaluates every check and reports which ones failed.
pub fn classify(text: Option<&str>, thresholds: &Thresholds) -> Verdict {
    let mut failed = BTreeSet::new();

    let Some(text) = text else {
        failed.insert(Check::TooShort);
        return Verdict::from_failures(failed);
    };

    let length = text.chars().count();
    if length < thresholds.min_length {
        failed.insert(Check::TooShort);
    }
    if length == 0 {
        return Verdict::from_failures(failed);
    }

    if ratio(binary_chars(text), length) > thresholds.max_binary_ratio {
        failed.insert(Check::BinaryDensity);
    }
    if ratio(special_chars(text), length) > thresholds.max_special_ratio {
        failed.insert(Check::SpecialCharDensity);
    }
    if structural_markers(text) > thresholds.max_structural_markers {
        failed.insert(Check::PdfStructure);
    }
    if mean_word_length(text) > thresholds.max_mean_word_length {
        failed.insert(Check::WordLength);
    }

    let per_sentence = mean_words_per_sentence(text);
    if per_sentence > thresholds.max_words_per_sentence
        || per_sentence < thresholds.min_words_per_sentence
    {
        failed.insert(Check::SentenceLength);
    }

    if common_words(text) < thresholds.min_common_words {
        failed.insert(Check::CommonWords);
    }

    Verdict::from_failures(failed)
}

fn ratio(count: usize, total: usize) -> f64 {
    count as f64 / total as f64
}

fn binary_chars(text: &str) -> usize {
    text.chars()
        .filter(|c| matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}'))
        .count()
}

fn is_common_char(c: char) -> bool {
    c.is_alphanumeric()
        || c == '_'
        || c.is_whitespace()
        || matches!(
            c,
            '.' | ','
                | ';'
                | ':'
                | '!'
                | '?'
                | '\''
                | '"'
                | '('
                | ')'
                | '['
                | ']'
                | '-'
                | '–'
                | '—'
                | '‘'
                | '’'
                | '“'
                | '”'
                | '…'
                | '/'
                | '&'
                | '%'
                | '$'
                | '@'
        )
}

fn special_chars(text: &str) -> usize {
    text.chars().filter(|c| !is_common_char(*c)).count()
}

/// Number of distinct PDF keywords found in structural position.
fn structural_markers(text: &str) -> usize {
    PDF_MARKERS.iter().filter(|re| re.is_match(text)).count()
}

fn mean_word_length(text: &str) -> f64 {
    let (words, chars) = text
        .split_whitespace()
        .fold((0usize, 0usize), |(w, c), word| (w + 1, c + word.chars().count()));
    if words == 0 {
        return 0.0;
    }
    ratio(chars, words)
}

fn mean_words_per_sentence(text: &str) -> f64 {
    let (sentences, words) = SENTENCE_SPLIT
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .fold((0usize, 0usize), |(s, w), sentence| {
            (s + 1, w + sentence.split_whitespace().count())
        });
    if sentences == 0 {
        return 0.0;
    }
    ratio(words, sentences)
}

fn common_words(text: &str) -> usize {
    COMMON_WORD_PATTERNS
        .iter()
        .filter(|re| re.is_match(text))
        .count()
}
