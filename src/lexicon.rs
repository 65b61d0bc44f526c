//! The scored word dictionary.
//!
//! Words are stored upper-case with everything but letters stripped, bucketed by length, and kept
//! sorted by score (best first) so pattern queries come back in quality order. A `Lexicon` is
//! read-only once built and is shared by reference across concurrent fills.
//!
//! Entry lists are plain text, one entry per line, as `word;score`, `word,score`, or a bare
//! `word` (which gets [`DEFAULT_SCORE`]). Blank lines and lines starting with `#` are skipped.

use std::collections::{HashMap, HashSet};
use std::fmt::{Debug, Formatter};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::LexiconError;

/// Score given to words the lexicon has never seen. Unknown words are average, not invalid.
pub const DEFAULT_SCORE: i32 = 40;

/// Highest score a word can carry; scores are clamped to `0..=MAX_SCORE`.
pub const MAX_SCORE: i32 = 100;

/// Pattern character matching any letter.
pub const WILDCARD: char = '.';

const BUILTIN_WORDS: &str = include_str!("../data/curated.txt");

/// Tired crossword fill that the quality scorer downstream penalizes.
const BUILTIN_OVERUSED: &[&str] = &[
    "ALAE", "ALOE", "AREA", "ARIA", "ASEA", "EPEE", "ERA", "ERNE", "ESNE", "ETUI", "ORE",
    "OREO", "OLEO", "SSE", "ENE", "ESE", "NNE", "TSE", "ERE", "EEL", "ETA", "RES", "IRE",
];

/// A word with its quality score in `0..=100`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoredWord {
    pub text: String,
    pub score: i32,
}

/// Lookup of synonyms/definitions for finished answers, used by the downstream clue step.
///
/// Implementations may hit the network; the filler itself never calls this.
pub trait DefinitionSource: Send + Sync {
    fn definitions(&self, word: &str) -> Vec<String>;
}

#[derive(Clone, Default)]
pub struct Lexicon {
    scores: HashMap<String, i32>,
    /// Indexed by length in chars; each bucket sorted by score descending, then alphabetically.
    by_length: Vec<Vec<ScoredWord>>,
    overused: HashSet<String>,
    definition_source: Option<Arc<dyn DefinitionSource>>,
}

impl Debug for Lexicon {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexicon")
            .field("words", &self.scores.len())
            .field("overused", &self.overused.len())
            .field("definition_source", &self.definition_source.is_some())
            .finish()
    }
}

/// Upper-case a word and drop anything that isn't a letter ("ice cream" -> "ICECREAM").
pub fn canonicalize(word: &str) -> String {
    word.chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Parse entry-list text into canonical `(word, score)` pairs.
pub fn parse_entries(contents: &str) -> Result<Vec<(String, i32)>, LexiconError> {
    let mut entries = Vec::new();

    for (idx, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (word_raw, score) = match line.split_once(&[';', ','][..]) {
            Some((word_raw, score_raw)) => {
                let score_raw = score_raw.trim();
                let score: i32 = score_raw.parse().map_err(|_| LexiconError::InvalidScore {
                    line_number: idx + 1,
                    score: score_raw.to_string(),
                })?;
                (word_raw, score)
            }
            None => (line, DEFAULT_SCORE),
        };

        let word = canonicalize(word_raw);
        if word.is_empty() {
            return Err(LexiconError::MalformedLine {
                line_number: idx + 1,
                line: line.to_string(),
            });
        }

        entries.push((word, score.clamp(0, MAX_SCORE)));
    }

    Ok(entries)
}

impl Lexicon {
    pub fn new() -> Lexicon {
        Lexicon::default()
    }

    /// Build a lexicon from `(word, score)` pairs. Later duplicates override earlier ones.
    pub fn from_entries<I, S>(entries: I) -> Lexicon
    where
        I: IntoIterator<Item = (S, i32)>,
        S: AsRef<str>,
    {
        let mut lexicon = Lexicon::new();
        lexicon.extend(entries);
        lexicon
    }

    /// The curated word/score table compiled into the crate, with the built-in overused list.
    pub fn builtin() -> Lexicon {
        let mut lexicon = match Lexicon::parse_from_str(BUILTIN_WORDS) {
            Ok(lexicon) => lexicon,
            Err(err) => {
                log::error!("built-in word table is malformed: {err}");
                Lexicon::new()
            }
        };
        lexicon.mark_overused(BUILTIN_OVERUSED.iter().copied());
        lexicon
    }

    pub fn parse_from_str(contents: &str) -> Result<Lexicon, LexiconError> {
        Ok(Lexicon::from_entries(parse_entries(contents)?))
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Lexicon, LexiconError> {
        let contents = fs::read_to_string(path)?;
        Lexicon::parse_from_str(&contents)
    }

    /// Merge an external word list, keeping the existing score for any word already present.
    /// Returns how many new words were added.
    pub fn merge_word_list(&mut self, contents: &str) -> Result<usize, LexiconError> {
        let fresh: Vec<(String, i32)> = parse_entries(contents)?
            .into_iter()
            .filter(|(word, _)| !self.scores.contains_key(word))
            .collect();
        let added = fresh.iter().map(|(word, _)| word).collect::<HashSet<_>>().len();

        self.extend(fresh);
        Ok(added)
    }

    /// Insert or overwrite scores, then rebuild the length buckets once. Prefer this over
    /// repeated [`Lexicon::insert`] when loading many words.
    pub fn extend<I, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (S, i32)>,
        S: AsRef<str>,
    {
        for (word, score) in entries {
            let word = canonicalize(word.as_ref());
            if !word.is_empty() {
                self.scores.insert(word, score.clamp(0, MAX_SCORE));
            }
        }
        self.reindex();
    }

    /// Insert or overwrite one word, keeping its length bucket sorted without a rebuild.
    pub fn insert(&mut self, word: &str, score: i32) {
        let text = canonicalize(word);
        if text.is_empty() {
            return;
        }
        let score = score.clamp(0, MAX_SCORE);
        let length = text.chars().count();
        if self.by_length.len() <= length {
            self.by_length.resize_with(length + 1, Vec::new);
        }
        let bucket = &mut self.by_length[length];

        if let Some(old_score) = self.scores.insert(text.clone(), score) {
            let idx = bucket.partition_point(|w| w.score > old_score || (w.score == old_score && w.text < text));
            bucket.remove(idx);
        }
        let idx = bucket.partition_point(|w| w.score > score || (w.score == score && w.text < text));
        bucket.insert(idx, ScoredWord { text, score });
    }

    fn reindex(&mut self) {
        let max_length = self.scores.keys().map(|word| word.chars().count()).max().unwrap_or(0);
        let mut by_length: Vec<Vec<ScoredWord>> = (0..=max_length).map(|_| vec![]).collect();

        for (word, &score) in &self.scores {
            by_length[word.chars().count()].push(ScoredWord { text: word.clone(), score });
        }
        for bucket in &mut by_length {
            bucket.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.text.cmp(&b.text)));
        }

        self.by_length = by_length;
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.scores.contains_key(&canonicalize(word))
    }

    /// Score for `word`, or [`DEFAULT_SCORE`] if the lexicon has never seen it.
    pub fn score(&self, word: &str) -> i32 {
        self.scores.get(&canonicalize(word)).copied().unwrap_or(DEFAULT_SCORE)
    }

    /// All words of the pattern's length scoring at least `min_score` whose letters agree with
    /// every non-wildcard position, best score first.
    pub fn match_pattern(&self, pattern: &str, min_score: i32) -> Vec<ScoredWord> {
        let pattern: Vec<char> = pattern
            .chars()
            .flat_map(char::to_uppercase)
            .collect();

        let Some(bucket) = self.by_length.get(pattern.len()) else {
            return vec![];
        };

        bucket
            .iter()
            .filter(|word| word.score >= min_score)
            .filter(|word| {
                word.text
                    .chars()
                    .zip(&pattern)
                    .all(|(letter, &wanted)| wanted == WILDCARD || letter == wanted)
            })
            .cloned()
            .collect()
    }

    /// Count of words of each length, indexed by length.
    pub fn length_histogram(&self) -> Vec<usize> {
        self.by_length.iter().map(Vec::len).collect()
    }

    pub fn mark_overused<I, S>(&mut self, words: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.overused.extend(words.into_iter().map(|word| canonicalize(word.as_ref())));
    }

    /// Is this stale, over-familiar fill? Only the downstream quality scorer asks.
    pub fn is_overused(&self, word: &str) -> bool {
        self.overused.contains(&canonicalize(word))
    }

    pub fn with_definition_source(mut self, source: Arc<dyn DefinitionSource>) -> Lexicon {
        self.definition_source = Some(source);
        self
    }

    /// Definitions from the injected source, or nothing if none was injected.
    pub fn definitions(&self, word: &str) -> Vec<String> {
        match &self.definition_source {
            Some(source) => source.definitions(&canonicalize(word)),
            None => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_lexicon() -> Lexicon {
        Lexicon::from_entries([("cat", 80), ("Cot", 60), ("cut", 30), ("dog", 90), ("cats", 70)])
    }

    #[test]
    fn test_words_are_stored_upper_case() {
        let lexicon = small_lexicon();
        assert!(lexicon.contains("COT"));
        assert!(lexicon.contains("cot"));
        assert_eq!(lexicon.score("Cat"), 80);
        assert_eq!(canonicalize("ice cream!"), "ICECREAM");
    }

    #[test]
    fn test_unknown_words_get_default_score() {
        assert_eq!(small_lexicon().score("zebra"), DEFAULT_SCORE);
    }

    #[test]
    fn test_match_pattern_filters_and_sorts() {
        let lexicon = small_lexicon();

        let texts: Vec<String> =
            lexicon.match_pattern("c.t", 0).into_iter().map(|w| w.text).collect();
        assert_eq!(texts, vec!["CAT", "COT", "CUT"]);

        let texts: Vec<String> =
            lexicon.match_pattern("C.T", 50).into_iter().map(|w| w.text).collect();
        assert_eq!(texts, vec!["CAT", "COT"]);

        assert_eq!(lexicon.match_pattern("...", 85), vec![ScoredWord { text: "DOG".into(), score: 90 }]);
        assert!(lexicon.match_pattern(".....", 0).is_empty());
        assert!(lexicon.match_pattern("x..", 0).is_empty());
    }

    #[test]
    fn test_insert_keeps_buckets_sorted() {
        let entries = [("cot", 60), ("cat", 80), ("cut", 60), ("dog", 90), ("ox", 10), ("heron", 70)];
        let bulk = Lexicon::from_entries(entries.iter().copied().chain([("cot", 95)]));

        let mut one_by_one = Lexicon::default();
        for (word, score) in entries {
            one_by_one.insert(word, score);
        }
        one_by_one.insert("COT", 95);
        one_by_one.insert("", 50);

        for pattern in ["...", "c.t", "..", ".....", "...."] {
            assert_eq!(one_by_one.match_pattern(pattern, 0), bulk.match_pattern(pattern, 0), "{pattern}");
        }
        assert_eq!(one_by_one.length_histogram(), bulk.length_histogram());
        assert_eq!(one_by_one.len(), 6);
        assert_eq!(one_by_one.score("cot"), 95);
    }

    #[test]
    fn test_parse_entry_list_formats() {
        let lexicon = Lexicon::parse_from_str(
            "
            # comment
            apple;70
            pear,150
            fig
            ",
        )
        .unwrap();

        assert_eq!(lexicon.len(), 3);
        assert_eq!(lexicon.score("APPLE"), 70);
        assert_eq!(lexicon.score("PEAR"), MAX_SCORE);
        assert_eq!(lexicon.score("FIG"), DEFAULT_SCORE);
    }

    #[test]
    fn test_parse_rejects_bad_scores() {
        let err = Lexicon::parse_from_str("apple;70\nbanana;lots\n").unwrap_err();
        assert!(matches!(err, LexiconError::InvalidScore { line_number: 2, .. }));

        let err = Lexicon::parse_from_str("123;50\n").unwrap_err();
        assert!(matches!(err, LexiconError::MalformedLine { line_number: 1, .. }));
    }

    #[test]
    fn test_merge_keeps_existing_scores() {
        let mut lexicon = small_lexicon();
        let added = lexicon.merge_word_list("cat;5\nemu;55\nemu;20\n").unwrap();

        assert_eq!(added, 1);
        assert_eq!(lexicon.score("CAT"), 80);
        assert!(lexicon.contains("EMU"));
    }

    #[test]
    fn test_overused_words() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.is_overused("epee"));
        assert!(!lexicon.is_overused("zebra"));
    }

    #[test]
    fn test_builtin_table_parses() {
        let lexicon = Lexicon::builtin();
        assert!(lexicon.len() > 100);
        let histogram = lexicon.length_histogram();
        assert!(histogram[3] > 0 && histogram[4] > 0 && histogram[5] > 0);
    }

    #[test]
    fn test_definitions_come_from_injected_source() {
        struct Canned;
        impl DefinitionSource for Canned {
            fn definitions(&self, word: &str) -> Vec<String> {
                vec![format!("definition of {word}")]
            }
        }

        let plain = small_lexicon();
        assert!(plain.definitions("cat").is_empty());

        let with_source = small_lexicon().with_definition_source(Arc::new(Canned));
        assert_eq!(with_source.definitions("cat"), vec!["definition of CAT"]);
    }
}
