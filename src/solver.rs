//! The backtracking fill search.
//!
//! One attempt is a depth-first search over slot assignments. At each node we pick the unfilled
//! slot with the fewest remaining candidates, try its candidates in shuffled order, and after
//! placing a word narrow the domains of every unfilled crossing slot to words agreeing on the shared
//! letter. A crossing left with nothing means the word is rejected without recursing. Backtracking
//! restores the cell arena from a copy taken before placement; narrowed domains are per-node copies
//! (cheap, since untouched domains are shared `Rc`s) and are simply dropped.
//!
//! Attempts are retried with a freshly seeded RNG until one succeeds or the attempt budget runs
//! out. Each attempt is single-threaded and owns all of its mutable state; only the [`Lexicon`] is
//! shared, which is what lets [`fill_batch`] run independent fills on separate threads.

use std::cmp::Reverse;
use std::collections::HashSet;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use bit_set::BitSet;
use instant::{Duration, Instant};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::constraints::ConstraintGraph;
use crate::domains::{enforce_arc_consistency, initialize_domains, shuffle_domains, Domain, WordTable};
use crate::errors::{FillFailure, GridError};
use crate::grid::{Cell, FilledEntry, FilledGrid, Grid, GridSpec, Slot};
use crate::lexicon::Lexicon;
use crate::pattern::{generate_pattern, BlockLayout};
use crate::validator::{check_layout, validate};
use crate::{SlotId, WordId, MAX_SLOT_COUNT};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillOptions {
    /// Wall-clock budget for a single attempt.
    pub timeout: Duration,
    /// How many reseeded attempts to make before giving up.
    pub max_attempts: usize,
    /// Run an arc-consistency pass over all domains before searching.
    pub arc_consistency: bool,
}

impl Default for FillOptions {
    fn default() -> FillOptions {
        FillOptions {
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            arc_consistency: true,
        }
    }
}

/// A struct tracking statistics about the filling process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Statistics {
    pub attempts: usize,
    pub states: u64,
    pub backtracks: u64,
    pub duration: Duration,
}

/// A struct representing the results of a fill operation.
#[derive(Debug, Clone, Serialize)]
pub struct FillSuccess {
    pub grid: FilledGrid,
    pub statistics: Statistics,
}

/// One independent fill for [`fill_batch`].
#[derive(Debug, Clone)]
pub struct FillJob {
    pub spec: GridSpec,
    pub seed: u64,
}

#[derive(Debug)]
enum AttemptFailure {
    Exhausted,
    TimedOut { elapsed: Duration },
}

/// Raised from deep inside the search when the deadline passes.
#[derive(Debug)]
struct TimedOut;

/// The parts of a fill that don't change between attempts.
struct Prepared {
    grid: Grid,
    slots: Vec<Slot>,
    graph: ConstraintGraph,
    table: WordTable,
    domains: Vec<Domain>,
    pinned: Vec<(SlotId, WordId)>,
}

impl Prepared {
    /// `Ok(None)` means arc consistency already proved there is no fill.
    fn new(spec: &GridSpec, lexicon: &Lexicon, options: &FillOptions) -> Result<Option<Prepared>, FillFailure> {
        let mut grid = Grid::new(spec.width, spec.height, &spec.black_squares)?;

        let layout = BlockLayout::from_cells(grid.width(), grid.height(), grid.cells());
        let problems = check_layout(&layout);
        if !problems.is_empty() {
            return Err(GridError::InvalidLayout {
                problems: problems.iter().map(|problem| problem.to_string()).collect(),
            }
            .into());
        }

        let slots = grid.slots();
        if slots.len() > MAX_SLOT_COUNT {
            log::warn!("grid has {} slots; expected at most {MAX_SLOT_COUNT}", slots.len());
        }
        let graph = ConstraintGraph::build(&grid, &slots)?;

        let pinned_words = grid.apply_theme_entries(&slots, &spec.theme_entries)?;
        let mut seen: HashSet<&str> = HashSet::new();
        for (_, word) in &pinned_words {
            if !seen.insert(word.as_str()) {
                return Err(GridError::DuplicatePin { word: word.clone() }.into());
            }
        }

        let (table, mut domains) =
            initialize_domains(&grid, &slots, &pinned_words, lexicon, spec.min_word_score)?;

        if options.arc_consistency {
            match enforce_arc_consistency(&table, &graph, &mut domains) {
                Ok(removed) => log::debug!("arc consistency removed {removed} candidate(s)"),
                Err(slot_id) => {
                    log::debug!(
                        "arc consistency emptied slot {slot_id} ({}); no fill exists",
                        grid.pattern(&slots[slot_id])
                    );
                    return Ok(None);
                }
            }
        }

        // A pinned slot's domain is exactly its pinned word.
        let pinned = pinned_words.iter().map(|&(slot_id, _)| (slot_id, domains[slot_id][0])).collect();

        Ok(Some(Prepared { grid, slots, graph, table, domains, pinned }))
    }

    /// Tie-break order for slot selection: shuffled, then edge slots first, then slots with more
    /// crossings, then slots with fewer initial candidates.
    fn slot_order<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<SlotId> {
        let mut order: Vec<SlotId> = (0..self.slots.len()).collect();
        order.shuffle(rng);
        order.sort_by_key(|&slot_id| {
            (
                !self.slots[slot_id].touches_edge(self.grid.width(), self.grid.height()),
                Reverse(self.graph.crossing_count(slot_id)),
                self.domains[slot_id].len(),
            )
        });
        order
    }
}

/// Live state of one attempt.
struct Search<'a> {
    prepared: &'a Prepared,
    order: Vec<SlotId>,
    cells: Vec<Cell>,
    assignment: Vec<Option<WordId>>,
    filled: BitSet,
    used: HashSet<WordId>,
    deadline: Instant,
    states: u64,
    backtracks: u64,
}

impl<'a> Search<'a> {
    fn new(prepared: &'a Prepared, order: Vec<SlotId>, deadline: Instant) -> Search<'a> {
        let mut search = Search {
            prepared,
            order,
            cells: prepared.grid.cells().to_vec(),
            assignment: vec![None; prepared.slots.len()],
            filled: BitSet::with_capacity(prepared.slots.len()),
            used: HashSet::new(),
            deadline,
            states: 0,
            backtracks: 0,
        };

        // Pinned letters are already in the grid; just record the assignments.
        for &(slot_id, word_id) in &prepared.pinned {
            search.assign(slot_id, word_id);
        }

        search
    }

    fn assign(&mut self, slot_id: SlotId, word_id: WordId) {
        self.assignment[slot_id] = Some(word_id);
        self.filled.insert(slot_id);
        self.used.insert(word_id);
    }

    fn unassign(&mut self, slot_id: SlotId, word_id: WordId) {
        self.assignment[slot_id] = None;
        self.filled.remove(slot_id);
        self.used.remove(&word_id);
    }

    /// The unfilled slot with the smallest domain; ties go to whichever comes first in `order`.
    fn select(&self, domains: &[Rc<Domain>]) -> Option<SlotId> {
        self.order
            .iter()
            .copied()
            .filter(|&slot_id| !self.filled.contains(slot_id))
            .min_by_key(|&slot_id| domains[slot_id].len())
    }

    /// Can `word_id` go in `slot_id` given the letters already placed and the words already used?
    fn fits(&self, slot_id: SlotId, word_id: WordId) -> bool {
        let slot = &self.prepared.slots[slot_id];
        let word = self.prepared.table.get(word_id);

        word.letters.len() == slot.length
            && !self.used.contains(&word_id)
            && slot.cells.iter().zip(&word.letters).all(|(&idx, &letter)| match self.cells[idx] {
                Cell::Letter(existing) => existing == letter,
                _ => true,
            })
    }

    fn place(&mut self, slot_id: SlotId, word_id: WordId) {
        let slot = &self.prepared.slots[slot_id];
        let word = self.prepared.table.get(word_id);

        for (&idx, &letter) in slot.cells.iter().zip(&word.letters) {
            self.cells[idx] = Cell::Letter(letter);
        }
    }

    /// Narrow each unfilled crossing slot to words that agree with the letter just placed and
    /// aren't used yet. Returns `None` if any of them ends up empty.
    fn forward_check(&self, slot_id: SlotId, domains: &[Rc<Domain>]) -> Option<Vec<Rc<Domain>>> {
        let slot = &self.prepared.slots[slot_id];
        let mut narrowed = domains.to_vec();

        for (cell_idx, crossing) in self.prepared.graph.crossings(slot_id).iter().enumerate() {
            let Some(crossing) = crossing else {
                continue;
            };
            if self.filled.contains(crossing.other_slot_id) {
                continue;
            }
            let Some(letter) = self.cells[slot.cells[cell_idx]].letter() else {
                continue;
            };

            let filtered: Domain = narrowed[crossing.other_slot_id]
                .iter()
                .copied()
                .filter(|word_id| {
                    self.prepared.table.get(*word_id).letters[crossing.other_slot_cell] == letter
                        && !self.used.contains(word_id)
                })
                .collect();

            if filtered.is_empty() {
                return None;
            }
            narrowed[crossing.other_slot_id] = Rc::new(filtered);
        }

        Some(narrowed)
    }

    fn search(&mut self, domains: &[Rc<Domain>]) -> Result<bool, TimedOut> {
        if Instant::now() >= self.deadline {
            return Err(TimedOut);
        }
        self.states += 1;

        let Some(slot_id) = self.select(domains) else {
            return Ok(true);
        };

        let domain = Rc::clone(&domains[slot_id]);
        for &word_id in domain.iter() {
            if !self.fits(slot_id, word_id) {
                continue;
            }

            let snapshot = self.cells.clone();
            self.place(slot_id, word_id);
            self.assign(slot_id, word_id);

            if let Some(narrowed) = self.forward_check(slot_id, domains) {
                if self.search(&narrowed)? {
                    return Ok(true);
                }
            }

            self.backtracks += 1;
            self.unassign(slot_id, word_id);
            self.cells = snapshot;
        }

        Ok(false)
    }

    fn into_filled_grid(self, lexicon: &Lexicon) -> FilledGrid {
        let prepared = self.prepared;

        let entries = prepared
            .slots
            .iter()
            .filter_map(|slot| {
                let word = &prepared.table.get(self.assignment[slot.id]?).text;
                Some(FilledEntry { slot: slot.clone(), word: word.clone(), score: lexicon.score(word) })
            })
            .collect();

        FilledGrid {
            width: prepared.grid.width(),
            height: prepared.grid.height(),
            cells: self.cells,
            entries,
        }
    }
}

fn run_attempt<R: Rng + ?Sized>(
    prepared: &Prepared,
    lexicon: &Lexicon,
    options: &FillOptions,
    rng: &mut R,
    statistics: &mut Statistics,
) -> Result<FilledGrid, AttemptFailure> {
    let start = Instant::now();

    let mut domains = prepared.domains.clone();
    shuffle_domains(&mut domains, rng);
    let domains: Vec<Rc<Domain>> = domains.into_iter().map(Rc::new).collect();

    let mut search = Search::new(prepared, prepared.slot_order(rng), start + options.timeout);
    let outcome = search.search(&domains);

    statistics.states += search.states;
    statistics.backtracks += search.backtracks;

    match outcome {
        Ok(true) => Ok(search.into_filled_grid(lexicon)),
        Ok(false) => Err(AttemptFailure::Exhausted),
        Err(TimedOut) => Err(AttemptFailure::TimedOut { elapsed: start.elapsed() }),
    }
}

/// Fill `spec` from `lexicon`, retrying up to `options.max_attempts` times with seeds drawn from
/// `rng`.
///
/// Structural problems with `spec` and slots with no matching word fail immediately. If arc
/// consistency shows no fill exists, that is reported as [`FillFailure::SearchExhausted`] without
/// searching. Otherwise the last attempt's outcome is reported once every attempt has failed. A
/// grid is only returned if it passes [`validate`].
pub fn fill<R: Rng + ?Sized>(
    spec: &GridSpec,
    lexicon: &Lexicon,
    options: &FillOptions,
    rng: &mut R,
) -> Result<FillSuccess, FillFailure> {
    let start = Instant::now();
    let Some(prepared) = Prepared::new(spec, lexicon, options)? else {
        log::warn!("no fill exists for this {}x{} grid", spec.width, spec.height);
        return Err(FillFailure::SearchExhausted { attempts: 1 });
    };

    let attempts = options.max_attempts.max(1);
    let mut statistics = Statistics::default();
    let mut last_failure = FillFailure::SearchExhausted { attempts: 0 };

    for attempt in 1..=attempts {
        let seed: u64 = rng.gen();
        let mut attempt_rng = StdRng::seed_from_u64(seed);
        statistics.attempts = attempt;
        log::debug!("attempt {attempt}/{attempts} with seed {seed}");

        match run_attempt(&prepared, lexicon, options, &mut attempt_rng, &mut statistics) {
            Ok(grid) => {
                statistics.duration = start.elapsed();

                let problems = validate(&grid);
                if !problems.is_empty() {
                    log::error!(
                        "filled grid failed validation with {} problem(s):\n{}",
                        problems.len(),
                        grid.render()
                    );
                    for problem in &problems {
                        log::error!("  {problem}");
                    }
                    return Err(FillFailure::ValidationFailure { problems });
                }

                log::info!(
                    "filled {}x{} grid: {} attempt(s), {} states, {} backtracks, {:?}",
                    grid.width,
                    grid.height,
                    statistics.attempts,
                    statistics.states,
                    statistics.backtracks,
                    statistics.duration
                );
                return Ok(FillSuccess { grid, statistics });
            }
            Err(AttemptFailure::Exhausted) => {
                log::debug!("attempt {attempt} exhausted the search space");
                last_failure = FillFailure::SearchExhausted { attempts: attempt };
            }
            Err(AttemptFailure::TimedOut { elapsed }) => {
                log::warn!("attempt {attempt} timed out after {elapsed:?}");
                last_failure = FillFailure::Timeout { elapsed };
            }
        }
    }

    log::warn!("giving up after {attempts} attempt(s): {last_failure}");
    Err(last_failure)
}

/// [`fill`] with a fixed seed; the same seed, spec, and lexicon always give the same grid.
pub fn fill_with_seed(
    spec: &GridSpec,
    lexicon: &Lexicon,
    options: &FillOptions,
    seed: u64,
) -> Result<FillSuccess, FillFailure> {
    fill(spec, lexicon, options, &mut StdRng::seed_from_u64(seed))
}

/// Generate a black-square pattern and fill it, with a new pattern for every attempt.
pub fn fill_generated<R: Rng + ?Sized>(
    width: usize,
    height: usize,
    min_word_score: i32,
    lexicon: &Lexicon,
    options: &FillOptions,
    rng: &mut R,
) -> Result<FillSuccess, FillFailure> {
    let attempts = options.max_attempts.max(1);
    let single = FillOptions { max_attempts: 1, ..options.clone() };
    let mut last_failure = FillFailure::SearchExhausted { attempts: 0 };

    for attempt in 1..=attempts {
        let spec = generate_pattern(width, height, rng).to_spec(min_word_score);

        match fill(&spec, lexicon, &single, rng) {
            Ok(mut success) => {
                success.statistics.attempts = attempt;
                return Ok(success);
            }
            Err(FillFailure::SearchExhausted { .. }) => {
                last_failure = FillFailure::SearchExhausted { attempts: attempt };
            }
            Err(failure @ (FillFailure::Timeout { .. } | FillFailure::PreconditionFailure { .. })) => {
                log::debug!("pattern attempt {attempt} failed: {failure}");
                last_failure = failure;
            }
            Err(failure) => return Err(failure),
        }
    }

    Err(last_failure)
}

/// Run independent fills on worker threads sharing one lexicon. Results come back in job order.
pub fn fill_batch(
    jobs: &[FillJob],
    lexicon: &Lexicon,
    options: &FillOptions,
) -> Vec<Result<FillSuccess, FillFailure>> {
    let workers = thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
        .min(jobs.len())
        .max(1);
    let next_job = &AtomicUsize::new(0);

    let mut finished: Vec<(usize, Result<FillSuccess, FillFailure>)> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                scope.spawn(move || {
                    let mut done = vec![];
                    loop {
                        let idx = next_job.fetch_add(1, Ordering::Relaxed);
                        let Some(job) = jobs.get(idx) else {
                            break;
                        };
                        done.push((idx, fill_with_seed(&job.spec, lexicon, options, job.seed)));
                    }
                    done
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| match handle.join() {
                Ok(done) => done,
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    finished.sort_by_key(|(idx, _)| *idx);
    finished.into_iter().map(|(_, result)| result).collect()
}
