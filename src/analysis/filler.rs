use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default filler lexicon; phrases are matched as contiguous words.
pub const DEFAULT_LEXICON: &[&str] = &[
    "um",
    "uh",
    "like",
    "you know",
    "so",
    "actually",
    "basically",
    "literally",
    "hmm",
    "er",
    "ah",
    "huh",
    "i mean",
    "well",
    "sort of",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FillerConfig {
    /// Minimum similarity (0-100) for a token to count as a misheard filler.
    pub fuzzy_threshold: f64,
    pub lexicon: Vec<String>,
}

impl Default for FillerConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 85.0,
            lexicon: DEFAULT_LEXICON.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl FillerConfig {
    pub fn with_threshold(mut self, fuzzy_threshold: f64) -> Self {
        self.fuzzy_threshold = fuzzy_threshold;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Fuzzy,
}

/// One filler hit in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillerOccurrence {
    /// Lexicon term that matched.
    pub term: String,
    /// Transcript text that produced the match.
    pub matched: String,
    /// Byte offset into the lower-cased transcript.
    pub offset: usize,
    pub kind: MatchKind,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FillerResult {
    #[serde(flatten)]
    pub counts: BTreeMap<String, usize>,
    pub total_count: usize,
    pub transcription: String,
    pub occurrences: Vec<FillerOccurrence>,
}

impl FillerResult {
    pub fn count(&self, term: &str) -> usize {
        self.counts.get(term).copied().unwrap_or(0)
    }
}

/// Count filler words in a transcript.
///
/// Two passes feed one tally. The exact pass matches every lexicon term on
/// word boundaries. The fuzzy pass compares each transcript token with every
/// single-word term and counts scores at or above `fuzzy_threshold`. A token
/// that is an exact single-word filler scores 100 in the fuzzy pass as well,
/// so it is counted by both passes.
pub fn detect_fillers(transcript: &str, config: &FillerConfig) -> FillerResult {
    let mut result = FillerResult {
        transcription: transcript.to_string(),
        ..FillerResult::default()
    };

    if transcript.trim().is_empty() {
        return result;
    }

    let text = transcript.to_lowercase();
    let terms: Vec<String> = config
        .lexicon
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let mut occurrences = Vec::new();

    for term in &terms {
        let pattern = match term_pattern(term) {
            Ok(p) => p,
            Err(e) => {
                warn!("Skipping filler term {:?}: {}", term, e);
                continue;
            }
        };
        for m in pattern.find_iter(&text) {
            occurrences.push(FillerOccurrence {
                term: term.clone(),
                matched: m.as_str().to_string(),
                offset: m.start(),
                kind: MatchKind::Exact,
                score: 100.0,
            });
        }
    }

    let single_words: Vec<&String> = terms.iter().filter(|t| !t.contains(char::is_whitespace)).collect();
    for token in token_pattern().find_iter(&text) {
        for term in &single_words {
            let score = similarity_ratio(token.as_str(), term);
            if score >= config.fuzzy_threshold {
                occurrences.push(FillerOccurrence {
                    term: (*term).clone(),
                    matched: token.as_str().to_string(),
                    offset: token.start(),
                    kind: MatchKind::Fuzzy,
                    score,
                });
            }
        }
    }

    // Stable: at a shared offset exact hits stay ahead of fuzzy ones.
    occurrences.sort_by_key(|o| o.offset);

    for occurrence in &occurrences {
        *result.counts.entry(occurrence.term.clone()).or_insert(0) += 1;
    }
    result.total_count = occurrences.len();
    result.occurrences = occurrences;

    debug!(
        "Found {} filler occurrences across {} terms",
        result.total_count,
        result.counts.len()
    );

    result
}

fn term_pattern(term: &str) -> std::result::Result<Regex, regex::Error> {
    let words: Vec<String> = term.split_whitespace().map(regex::escape).collect();
    Regex::new(&format!(r"\b{}\b", words.join(r"\s+")))
}

fn token_pattern() -> Regex {
    Regex::new(r"\w+").expect("static token regex is valid")
}

/// Normalized indel similarity on a 0-100 scale.
///
/// `100 * 2 * lcs(a, b) / (|a| + |b|)`, measured in characters.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    100.0 * (2 * lcs_len(&a, &b)) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_similarity_ratio() {
        assert_eq!(similarity_ratio("uh", "uh"), 100.0);
        assert_eq!(similarity_ratio("uhh", "uh"), 80.0);
        assert_eq!(similarity_ratio("um", "uh"), 50.0);
        assert_eq!(similarity_ratio("", ""), 100.0);
        assert_eq!(similarity_ratio("abc", ""), 0.0);
        assert!(similarity_ratio("basicaly", "basically") > 94.0);
    }

    #[test]
    fn test_term_pattern_phrase_spans_whitespace() {
        let pattern = term_pattern("you know").unwrap();
        assert!(pattern.is_match("well you  know it"));
        assert!(!pattern.is_match("youknow"));
    }

    #[test]
    fn test_empty_transcript() {
        let result = detect_fillers("", &FillerConfig::default());
        assert!(result.counts.is_empty());
        assert_eq!(result.total_count, 0);
        assert!(result.occurrences.is_empty());

        let result = detect_fillers("   ", &FillerConfig::default());
        assert_eq!(result.total_count, 0);
    }

    #[test]
    fn test_exact_hits_are_double_counted() {
        let result = detect_fillers("Um", &FillerConfig::default());
        assert_eq!(result.count("um"), 2);
        assert_eq!(result.total_count, 2);
        assert_eq!(result.occurrences[0].kind, MatchKind::Exact);
        assert_eq!(result.occurrences[1].kind, MatchKind::Fuzzy);
    }

    #[test]
    fn test_phrases_only_match_exactly() {
        let result = detect_fillers("I mean, you know", &FillerConfig::default());
        assert_eq!(result.count("i mean"), 1);
        assert_eq!(result.count("you know"), 1);
        assert!(result
            .occurrences
            .iter()
            .filter(|o| o.term.contains(' '))
            .all(|o| o.kind == MatchKind::Exact));
    }

    #[test]
    fn test_occurrences_in_transcript_order() {
        let result = detect_fillers("so basically uh", &FillerConfig::default());
        let offsets: Vec<usize> = result.occurrences.iter().map(|o| o.offset).collect();
        let mut sorted = offsets.clone();
        sorted.sort();
        assert_eq!(offsets, sorted);
        assert_eq!(result.occurrences.first().map(|o| o.term.as_str()), Some("so"));
    }

    #[test]
    fn test_total_is_sum_of_counts() {
        let result = detect_fillers(
            "Well, um, I was like, basically literally sort of done, hmm.",
            &FillerConfig::default(),
        );
        assert_eq!(result.total_count, result.counts.values().sum::<usize>());
        assert!(result.total_count > 0);
    }

    #[test]
    fn test_custom_lexicon() {
        let config = FillerConfig {
            fuzzy_threshold: 100.0,
            lexicon: vec!["Right".to_string()],
        };
        let result = detect_fillers("right, RIGHT, righteous", &config);
        assert_eq!(result.count("right"), 4);
    }
}
