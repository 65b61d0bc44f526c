//! The cell grid and the word slots derived from it.
//!
//! Cells live in a flat row-major arena and slots refer to them by index, so a cell shared by an
//! across and a down slot is a single value that both read, and a whole grid state can be saved and
//! restored with one `Vec` copy.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::GridError;
use crate::lexicon::WILDCARD;
use crate::{SlotId, MAX_SLOT_LENGTH, MIN_SLOT_LENGTH};

/// Character used for black squares in templates and rendered grids.
pub const BLOCK: char = '#';

/// Zero-indexed x and y coords for a cell in the grid, where y = 0 in the top row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Position {
        Position { x, y }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Direction that a slot is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Across,
    Down,
}

impl Direction {
    /// Position `offset` cells along this direction from `start`.
    pub fn step(self, start: Position, offset: usize) -> Position {
        match self {
            Direction::Across => Position::new(start.x + offset, start.y),
            Direction::Down => Position::new(start.x, start.y + offset),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Across => write!(f, "across"),
            Direction::Down => write!(f, "down"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    Block,
    /// A white cell with no letter yet.
    Empty,
    Letter(char),
}

impl Cell {
    pub fn is_block(self) -> bool {
        self == Cell::Block
    }

    pub fn letter(self) -> Option<char> {
        match self {
            Cell::Letter(letter) => Some(letter),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Cell::Block => BLOCK,
            Cell::Empty => WILDCARD,
            Cell::Letter(letter) => letter,
        }
    }
}

/// A maximal run of at least [`MIN_SLOT_LENGTH`] white cells needing one word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub start: Position,
    pub direction: Direction,
    pub length: usize,
    /// Arena indices of the slot's cells, in reading order.
    pub cells: SmallVec<[usize; MAX_SLOT_LENGTH]>,
}

impl Slot {
    pub fn position(&self, offset: usize) -> Position {
        self.direction.step(self.start, offset)
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.length).map(|offset| self.position(offset))
    }

    /// Does this slot touch the outer border of a `width` x `height` grid?
    pub fn touches_edge(&self, width: usize, height: usize) -> bool {
        let end = self.position(self.length - 1);
        self.start.x == 0 || self.start.y == 0 || end.x + 1 == width || end.y + 1 == height
    }
}

/// A theme entry pinned to the slot starting at `start` in `direction`. `word` may contain
/// [`WILDCARD`]s to pin only some letters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeEntry {
    pub start: Position,
    pub direction: Direction,
    pub word: String,
}

/// Everything needed to fill one grid: its shape, any pinned theme entries, and the score floor
/// for candidate words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    pub width: usize,
    pub height: usize,
    #[serde(default)]
    pub black_squares: Vec<Position>,
    #[serde(default)]
    pub theme_entries: Vec<ThemeEntry>,
    #[serde(default)]
    pub min_word_score: i32,
}

impl GridSpec {
    pub fn new(width: usize, height: usize, black_squares: Vec<Position>) -> GridSpec {
        GridSpec {
            width,
            height,
            black_squares,
            theme_entries: vec![],
            min_word_score: 0,
        }
    }

    pub fn with_min_word_score(mut self, min_word_score: i32) -> GridSpec {
        self.min_word_score = min_word_score;
        self
    }

    pub fn with_theme_entry(mut self, start: Position, direction: Direction, word: &str) -> GridSpec {
        self.theme_entries.push(ThemeEntry { start, direction, word: word.to_string() });
        self
    }

    /// Build a spec from a template string with `#` for blocks, `.` for open cells, and letters
    /// for pinned letters. Every slot containing a letter becomes a theme entry.
    pub fn from_template(template: &str) -> Result<GridSpec, GridError> {
        let grid = Grid::from_template(template)?;

        let theme_entries = grid
            .slots()
            .iter()
            .filter(|slot| slot.cells.iter().any(|&idx| grid.cells[idx].letter().is_some()))
            .map(|slot| ThemeEntry {
                start: slot.start,
                direction: slot.direction,
                word: grid.pattern(slot),
            })
            .collect();

        Ok(GridSpec {
            width: grid.width,
            height: grid.height,
            black_squares: grid.black_squares(),
            theme_entries,
            min_word_score: 0,
        })
    }
}

/// A rectangular grid of cells stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: usize, height: usize, black_squares: &[Position]) -> Result<Grid, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::InvalidDimensions { width, height });
        }

        let mut grid = Grid { width, height, cells: vec![Cell::Empty; width * height] };
        for &position in black_squares {
            if !grid.in_bounds(position) {
                return Err(GridError::BlackSquareOutOfBounds { position });
            }
            let idx = grid.index(position);
            grid.cells[idx] = Cell::Block;
        }

        Ok(grid)
    }

    /// Parse a template with `#` for blocks, `.` for open cells, and letters standing for
    /// themselves. Blank lines and surrounding whitespace are ignored.
    pub fn from_template(template: &str) -> Result<Grid, GridError> {
        let rows: Vec<Vec<char>> = template
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().collect())
            .collect();

        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Err(GridError::InvalidDimensions { width, height });
        }

        let mut cells = Vec::with_capacity(width * height);
        for (row_idx, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(GridError::RaggedTemplate { row: row_idx });
            }
            cells.extend(row.iter().map(|&c| match c {
                BLOCK => Cell::Block,
                WILDCARD => Cell::Empty,
                letter => Cell::Letter(to_upper(letter)),
            }));
        }

        Ok(Grid { width, height, cells })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }

    pub fn index(&self, position: Position) -> usize {
        position.y * self.width + position.x
    }

    pub fn position(&self, idx: usize) -> Position {
        Position::new(idx % self.width, idx / self.width)
    }

    pub fn cell(&self, position: Position) -> Cell {
        self.cells[self.index(position)]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn black_squares(&self) -> Vec<Position> {
        (0..self.cells.len())
            .filter(|&idx| self.cells[idx].is_block())
            .map(|idx| self.position(idx))
            .collect()
    }

    /// Extract every slot: maximal runs of at least [`MIN_SLOT_LENGTH`] white cells. Across slots
    /// come first in row-major order, then down slots in column-major order. Shorter runs are
    /// skipped rather than reported.
    pub fn slots(&self) -> Vec<Slot> {
        let mut slots: Vec<Slot> = vec![];

        for y in 0..self.height {
            let line: Vec<Position> = (0..self.width).map(|x| Position::new(x, y)).collect();
            self.collect_runs(&line, Direction::Across, &mut slots);
        }
        for x in 0..self.width {
            let line: Vec<Position> = (0..self.height).map(|y| Position::new(x, y)).collect();
            self.collect_runs(&line, Direction::Down, &mut slots);
        }

        slots
    }

    fn collect_runs(&self, line: &[Position], direction: Direction, slots: &mut Vec<Slot>) {
        let mut run: Vec<Position> = vec![];

        for &position in line {
            if self.cell(position).is_block() {
                self.push_run(&mut run, direction, slots);
            } else {
                run.push(position);
            }
        }
        self.push_run(&mut run, direction, slots);
    }

    fn push_run(&self, run: &mut Vec<Position>, direction: Direction, slots: &mut Vec<Slot>) {
        if run.len() >= MIN_SLOT_LENGTH {
            slots.push(Slot {
                id: slots.len(),
                start: run[0],
                direction,
                length: run.len(),
                cells: run.iter().map(|&position| self.index(position)).collect(),
            });
        }
        run.clear();
    }

    /// The slot's current contents, with [`WILDCARD`] for cells without a letter.
    pub fn pattern(&self, slot: &Slot) -> String {
        pattern_of(&self.cells, slot)
    }

    /// Pin theme entries into the grid. Returns the slots whose entry was a complete word, along
    /// with that word.
    pub fn apply_theme_entries(
        &mut self,
        slots: &[Slot],
        entries: &[ThemeEntry],
    ) -> Result<Vec<(SlotId, String)>, GridError> {
        let mut pinned_words = vec![];

        for entry in entries {
            let slot = slots
                .iter()
                .find(|slot| slot.start == entry.start && slot.direction == entry.direction)
                .ok_or(GridError::UnknownPinnedSlot {
                    start: entry.start,
                    direction: entry.direction,
                })?;

            let letters: Vec<char> = entry.word.chars().flat_map(char::to_uppercase).collect();
            if letters.len() != slot.length {
                return Err(GridError::PinnedLengthMismatch {
                    start: slot.start,
                    word: entry.word.clone(),
                    length: slot.length,
                });
            }
            if let Some(&letter) = letters.iter().find(|&&c| c != WILDCARD && !c.is_alphabetic()) {
                return Err(GridError::InvalidPinnedLetter { start: slot.start, word: entry.word.clone(), letter });
            }

            for (&idx, &incoming) in slot.cells.iter().zip(&letters) {
                if incoming == WILDCARD {
                    continue;
                }
                match self.cells[idx] {
                    Cell::Letter(existing) if existing != incoming => {
                        return Err(GridError::ConflictingPin {
                            position: self.position(idx),
                            existing,
                            incoming,
                        });
                    }
                    _ => self.cells[idx] = Cell::Letter(incoming),
                }
            }

            if !letters.contains(&WILDCARD) {
                pinned_words.push((slot.id, letters.into_iter().collect()));
            }
        }

        Ok(pinned_words)
    }

    pub fn render(&self) -> String {
        render_cells(&self.cells, self.width)
    }
}

fn pattern_of(cells: &[Cell], slot: &Slot) -> String {
    slot.cells.iter().map(|&idx| cells[idx].to_char()).collect()
}

fn render_cells(cells: &[Cell], width: usize) -> String {
    cells
        .chunks(width)
        .map(|row| row.iter().map(|cell| cell.to_char()).collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

fn to_upper(letter: char) -> char {
    letter.to_uppercase().next().unwrap_or(letter)
}

/// One slot of a finished fill with its word and lexicon score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledEntry {
    pub slot: Slot,
    pub word: String,
    pub score: i32,
}

/// A completely filled grid: every white cell holds a letter and every slot has its word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilledGrid {
    pub width: usize,
    pub height: usize,
    /// Row-major cells; black squares stay [`Cell::Block`].
    pub cells: Vec<Cell>,
    pub entries: Vec<FilledEntry>,
}

impl FilledGrid {
    pub fn cell(&self, position: Position) -> Cell {
        self.cells[position.y * self.width + position.x]
    }

    /// The letter matrix, with [`BLOCK`] for black squares.
    pub fn letters(&self) -> Vec<Vec<char>> {
        self.cells
            .chunks(self.width)
            .map(|row| row.iter().map(|cell| cell.to_char()).collect())
            .collect()
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.word.as_str())
    }

    pub fn render(&self) -> String {
        render_cells(&self.cells, self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_ids_across_then_down() {
        let grid = Grid::from_template(
            "
            #...#
            .....
            .....
            .....
            #...#
            ",
        )
        .unwrap();
        let slots = grid.slots();

        let summary: Vec<(Direction, Position, usize)> =
            slots.iter().map(|slot| (slot.direction, slot.start, slot.length)).collect();
        assert_eq!(
            summary,
            vec![
                (Direction::Across, Position::new(1, 0), 3),
                (Direction::Across, Position::new(0, 1), 5),
                (Direction::Across, Position::new(0, 2), 5),
                (Direction::Across, Position::new(0, 3), 5),
                (Direction::Across, Position::new(1, 4), 3),
                (Direction::Down, Position::new(0, 1), 3),
                (Direction::Down, Position::new(1, 0), 5),
                (Direction::Down, Position::new(2, 0), 5),
                (Direction::Down, Position::new(3, 0), 5),
                (Direction::Down, Position::new(4, 1), 3),
            ]
        );
        assert!(slots.iter().enumerate().all(|(idx, slot)| slot.id == idx));
        assert_eq!(slots[6].cells.as_slice(), &[1, 6, 11, 16, 21]);
    }

    #[test]
    fn test_short_runs_are_not_slots() {
        let grid = Grid::from_template(
            "
            ...#.
            .....
            .....
            ",
        )
        .unwrap();
        let slots = grid.slots();

        assert!(slots.iter().all(|slot| slot.length >= MIN_SLOT_LENGTH));
        // Row 0 yields one across slot; column 3's two-cell run yields nothing.
        assert_eq!(slots.iter().filter(|slot| slot.direction == Direction::Across).count(), 3);
        assert_eq!(slots.iter().filter(|slot| slot.direction == Direction::Down).count(), 4);
        assert!(!slots.iter().any(|slot| slot.start == Position::new(3, 1)));
    }

    #[test]
    fn test_template_letters_and_render() {
        let template = "#.s\n.I.\n...";
        let grid = Grid::from_template(template).unwrap();

        assert_eq!(grid.cell(Position::new(2, 0)), Cell::Letter('S'));
        assert_eq!(grid.cell(Position::new(0, 0)), Cell::Block);
        assert_eq!(grid.render(), "#.S\n.I.\n...");
        assert_eq!(grid.black_squares(), vec![Position::new(0, 0)]);
    }

    #[test]
    fn test_ragged_template_is_rejected() {
        assert_eq!(
            Grid::from_template("....\n...\n....").unwrap_err(),
            GridError::RaggedTemplate { row: 1 }
        );
        assert!(matches!(Grid::from_template("\n\n"), Err(GridError::InvalidDimensions { .. })));
    }

    #[test]
    fn test_black_square_bounds() {
        assert_eq!(
            Grid::new(3, 3, &[Position::new(3, 0)]).unwrap_err(),
            GridError::BlackSquareOutOfBounds { position: Position::new(3, 0) }
        );
    }

    #[test]
    fn test_theme_entries_pin_letters() {
        let mut grid = Grid::new(3, 3, &[]).unwrap();
        let slots = grid.slots();

        let pinned = grid
            .apply_theme_entries(
                &slots,
                &[
                    ThemeEntry { start: Position::new(0, 0), direction: Direction::Across, word: "sap".into() },
                    ThemeEntry { start: Position::new(2, 0), direction: Direction::Down, word: "P.N".into() },
                ],
            )
            .unwrap();

        assert_eq!(pinned, vec![(0, "SAP".to_string())]);
        assert_eq!(grid.pattern(&slots[5]), "P.N");
        assert_eq!(grid.pattern(&slots[2]), "..N");
    }

    #[test]
    fn test_theme_entry_conflicts() {
        let mut grid = Grid::new(3, 3, &[]).unwrap();
        let slots = grid.slots();

        let err = grid
            .apply_theme_entries(
                &slots,
                &[
                    ThemeEntry { start: Position::new(0, 0), direction: Direction::Across, word: "SAP".into() },
                    ThemeEntry { start: Position::new(0, 0), direction: Direction::Down, word: "TOO".into() },
                ],
            )
            .unwrap_err();
        assert_eq!(
            err,
            GridError::ConflictingPin { position: Position::new(0, 0), existing: 'S', incoming: 'T' }
        );

        let err = grid
            .apply_theme_entries(
                &slots,
                &[ThemeEntry { start: Position::new(1, 1), direction: Direction::Across, word: "AB".into() }],
            )
            .unwrap_err();
        assert!(matches!(err, GridError::UnknownPinnedSlot { .. }));
    }

    #[test]
    fn test_theme_entry_must_be_letters() {
        let mut grid = Grid::new(3, 3, &[]).unwrap();
        let slots = grid.slots();

        let err = grid
            .apply_theme_entries(
                &slots,
                &[ThemeEntry { start: Position::new(0, 0), direction: Direction::Down, word: "s-p".into() }],
            )
            .unwrap_err();
        assert_eq!(
            err,
            GridError::InvalidPinnedLetter { start: Position::new(0, 0), word: "s-p".into(), letter: '-' }
        );
        assert!(grid.cells().iter().all(|cell| *cell == Cell::Empty));

        // Wildcards and non-ASCII letters are still fine.
        let pinned = grid
            .apply_theme_entries(
                &slots,
                &[ThemeEntry { start: Position::new(0, 0), direction: Direction::Down, word: "é.a".into() }],
            )
            .unwrap();
        assert!(pinned.is_empty());
        assert_eq!(grid.cells()[0], Cell::Letter('É'));
    }

    #[test]
    fn test_spec_from_template() {
        let spec = GridSpec::from_template(
            "
            SAP
            ...
            ...
            ",
        )
        .unwrap();

        assert_eq!((spec.width, spec.height), (3, 3));
        assert!(spec.black_squares.is_empty());
        assert_eq!(spec.theme_entries.len(), 4);
        assert_eq!(spec.theme_entries[0].word, "SAP");
        assert_eq!(spec.theme_entries[1].word, "S..");
    }

    #[test]
    fn test_slot_edges() {
        let grid = Grid::from_template(
            "
            .....
            .#...
            .....
            ...#.
            .....
            ",
        )
        .unwrap();
        let slots = grid.slots();
        assert!(slots.iter().all(|slot| slot.touches_edge(5, 5)));

        let big = Grid::from_template(
            "
            .......
            #.....#
            .......
            .......
            .......
            #.....#
            .......
            ",
        )
        .unwrap();
        let inner = big
            .slots()
            .into_iter()
            .find(|slot| slot.start == Position::new(1, 1) && slot.direction == Direction::Across);
        assert_eq!(inner.as_ref().map(|slot| slot.length), Some(5));
        assert!(!inner.map(|slot| slot.touches_edge(7, 7)).unwrap_or(true));
        assert!(!big.slots().iter().all(|slot| slot.touches_edge(7, 7)));
    }
}
