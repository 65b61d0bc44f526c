//! Per-slot candidate lists.
//!
//! Candidates are interned into a [`WordTable`] once per fill so that domains are plain lists of
//! [`WordId`]s and the same text always has the same id, which makes duplicate detection during
//! search an id comparison.

use std::collections::{HashMap, HashSet, VecDeque};

use rand::seq::SliceRandom;
use rand::Rng;
use smallvec::SmallVec;

use crate::constraints::ConstraintGraph;
use crate::errors::FillFailure;
use crate::grid::{Grid, Slot};
use crate::lexicon::Lexicon;
use crate::{SlotId, WordId, MAX_SLOT_LENGTH};

/// The words still allowed in one slot, in the order search will try them.
pub type Domain = Vec<WordId>;

/// A word that can be chosen for some slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub text: String,
    pub letters: SmallVec<[char; MAX_SLOT_LENGTH]>,
    pub score: i32,
}

#[derive(Debug, Clone, Default)]
pub struct WordTable {
    words: Vec<Candidate>,
    ids: HashMap<String, WordId>,
}

impl WordTable {
    pub fn intern(&mut self, text: &str, score: i32) -> WordId {
        if let Some(&id) = self.ids.get(text) {
            return id;
        }

        let id = self.words.len();
        self.words.push(Candidate {
            text: text.to_string(),
            letters: text.chars().collect(),
            score,
        });
        self.ids.insert(text.to_string(), id);
        id
    }

    pub fn get(&self, word_id: WordId) -> &Candidate {
        &self.words[word_id]
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Compute each slot's candidates from its current pattern.
///
/// Slots listed in `pinned` get exactly their pinned word, whether or not the lexicon knows it.
/// Everything else asks the lexicon for words matching the slot's letters at `min_score`, and
/// retries at score 0 if that comes back empty; only a pattern with no match at any score is a
/// [`FillFailure::PreconditionFailure`]. Domains come back in lexicon order (best first).
pub fn initialize_domains(
    grid: &Grid,
    slots: &[Slot],
    pinned: &[(SlotId, String)],
    lexicon: &Lexicon,
    min_score: i32,
) -> Result<(WordTable, Vec<Domain>), FillFailure> {
    let mut table = WordTable::default();
    let mut domains: Vec<Domain> = Vec::with_capacity(slots.len());

    for slot in slots {
        if let Some((_, word)) = pinned.iter().find(|(slot_id, _)| *slot_id == slot.id) {
            domains.push(vec![table.intern(word, lexicon.score(word))]);
            continue;
        }

        let pattern = grid.pattern(slot);
        let mut matches = lexicon.match_pattern(&pattern, min_score);

        if matches.is_empty() && min_score > 0 {
            matches = lexicon.match_pattern(&pattern, 0);
            if !matches.is_empty() {
                log::warn!(
                    "slot {} ({pattern}) has nothing at score {min_score}; falling back to {} lower-scored words",
                    slot.id,
                    matches.len()
                );
            }
        }

        if matches.is_empty() {
            return Err(FillFailure::PreconditionFailure { slot_id: slot.id, pattern });
        }

        domains.push(matches.iter().map(|word| table.intern(&word.text, word.score)).collect());
    }

    Ok((table, domains))
}

/// Shuffle every domain so repeated fills of the same grid come out different.
pub fn shuffle_domains<R: Rng + ?Sized>(domains: &mut [Domain], rng: &mut R) {
    for domain in domains {
        domain.shuffle(rng);
    }
}

/// Make the domains arc-consistent: drop every word whose letter at a crossing has no support
/// among the crossing slot's remaining words, and repeat until nothing changes.
///
/// Returns the number of words removed, or the id of a slot left with no words at all.
pub fn enforce_arc_consistency(
    table: &WordTable,
    graph: &ConstraintGraph,
    domains: &mut [Domain],
) -> Result<usize, SlotId> {
    // The queue holds (slot, cell) arcs: check the slot's words against the slot crossing that
    // cell.
    let mut queue: VecDeque<(SlotId, usize)> = VecDeque::new();
    let mut queued: HashSet<(SlotId, usize)> = HashSet::new();

    for slot_id in 0..graph.slot_count() {
        for (cell_idx, crossing) in graph.crossings(slot_id).iter().enumerate() {
            if crossing.is_some() && queued.insert((slot_id, cell_idx)) {
                queue.push_back((slot_id, cell_idx));
            }
        }
    }

    let mut removed = 0;

    while let Some((slot_id, cell_idx)) = queue.pop_front() {
        queued.remove(&(slot_id, cell_idx));

        let Some(crossing) = graph.crossings(slot_id)[cell_idx] else {
            continue;
        };

        let supported: HashSet<char> = domains[crossing.other_slot_id]
            .iter()
            .map(|&word_id| table.get(word_id).letters[crossing.other_slot_cell])
            .collect();

        let before = domains[slot_id].len();
        domains[slot_id].retain(|&word_id| supported.contains(&table.get(word_id).letters[cell_idx]));
        let eliminated = before - domains[slot_id].len();

        if eliminated == 0 {
            continue;
        }
        removed += eliminated;

        if domains[slot_id].is_empty() {
            return Err(slot_id);
        }

        // This slot lost words, so every other slot crossing it may have lost support.
        for (other_idx, other) in graph.crossings(slot_id).iter().enumerate() {
            if other_idx == cell_idx {
                continue;
            }
            if let Some(other) = other {
                let arc = (other.other_slot_id, other.other_slot_cell);
                if queued.insert(arc) {
                    queue.push_back(arc);
                }
            }
        }
    }

    Ok(removed)
}
