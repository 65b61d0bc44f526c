//! Post-fill structural checks.
//!
//! [`validate`] re-derives everything from the finished cells rather than trusting the search's
//! bookkeeping, so a problem here means the filler has a bug. It is pure: the same grid always
//! yields the same problems in the same order.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use bit_set::BitSet;
use serde::Serialize;

use crate::grid::{Cell, Direction, FilledGrid, Position};
use crate::pattern::BlockLayout;

/// One way a grid breaks the construction rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Problem {
    /// The cell arena doesn't match the stated dimensions; nothing else can be checked.
    WrongCellCount { expected: usize, found: usize },
    NoWhiteCells,
    /// A black square whose 180° twin is white. Reported once per pair.
    AsymmetricBlock { position: Position, twin: Position },
    ShortRun { start: Position, direction: Direction, length: usize },
    Disconnected { reachable: usize, total: usize },
    EmptyCell { position: Position },
    UncoveredCell { position: Position, direction: Direction },
    WordMismatch { start: Position, direction: Direction, word: String, found: String },
    DuplicateWord { word: String },
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Problem::WrongCellCount { expected, found } => {
                write!(f, "expected {expected} cells, found {found}")
            }
            Problem::NoWhiteCells => write!(f, "grid has no white cells"),
            Problem::AsymmetricBlock { position, twin } => {
                write!(f, "black square {position} has a white twin at {twin}")
            }
            Problem::ShortRun { start, direction, length } => {
                write!(f, "{direction} run at {start} is only {length} cell(s) long")
            }
            Problem::Disconnected { reachable, total } => {
                write!(f, "only {reachable} of {total} white cells are connected")
            }
            Problem::EmptyCell { position } => write!(f, "white cell {position} has no letter"),
            Problem::UncoveredCell { position, direction } => {
                write!(f, "cell {position} is not covered by any {direction} entry")
            }
            Problem::WordMismatch { start, direction, word, found } => {
                write!(f, "{direction} entry at {start} is \"{word}\" but the grid reads \"{found}\"")
            }
            Problem::DuplicateWord { word } => write!(f, "\"{word}\" appears more than once"),
        }
    }
}

/// Checks that only depend on where the black squares are: 180° symmetry, no white run shorter
/// than a word, and a single connected white region.
pub fn check_layout(layout: &BlockLayout) -> Vec<Problem> {
    let mut problems = vec![];

    let total = layout.white_count();
    if total == 0 {
        problems.push(Problem::NoWhiteCells);
        return problems;
    }

    problems.extend(
        layout
            .asymmetric_cells()
            .into_iter()
            .filter(|&position| layout.is_block(position))
            .map(|position| Problem::AsymmetricBlock { position, twin: layout.twin(position) }),
    );

    problems.extend(layout.short_runs().into_iter().map(|run| Problem::ShortRun {
        start: run.start,
        direction: run.direction,
        length: run.length,
    }));

    let reachable = layout.reachable_white_count();
    if reachable != total {
        problems.push(Problem::Disconnected { reachable, total });
    }

    problems
}

/// Every rule a finished grid must satisfy. An empty result means the grid is good.
pub fn validate(grid: &FilledGrid) -> Vec<Problem> {
    let expected = grid.width * grid.height;
    if grid.cells.len() != expected {
        return vec![Problem::WrongCellCount { expected, found: grid.cells.len() }];
    }

    let position = |idx: usize| Position::new(idx % grid.width, idx / grid.width);

    let mut problems = check_layout(&BlockLayout::from_cells(grid.width, grid.height, &grid.cells));

    problems.extend(
        grid.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| **cell == Cell::Empty)
            .map(|(idx, _)| Problem::EmptyCell { position: position(idx) }),
    );

    let mut across = BitSet::with_capacity(expected);
    let mut down = BitSet::with_capacity(expected);
    for entry in &grid.entries {
        let covered = match entry.slot.direction {
            Direction::Across => &mut across,
            Direction::Down => &mut down,
        };
        for &idx in &entry.slot.cells {
            covered.insert(idx);
        }
    }

    for (idx, cell) in grid.cells.iter().enumerate() {
        if cell.is_block() {
            continue;
        }
        for (direction, covered) in [(Direction::Across, &across), (Direction::Down, &down)] {
            if !covered.contains(idx) {
                problems.push(Problem::UncoveredCell { position: position(idx), direction });
            }
        }
    }

    for entry in &grid.entries {
        let found: String = entry
            .slot
            .cells
            .iter()
            .map(|&idx| grid.cells.get(idx).map_or('?', |cell| cell.to_char()))
            .collect();
        if found != entry.word {
            problems.push(Problem::WordMismatch {
                start: entry.slot.start,
                direction: entry.slot.direction,
                word: entry.word.clone(),
                found,
            });
        }
    }

    // Words compare case-insensitively, matching the lexicon.
    let mut seen: HashSet<String> = HashSet::new();
    let mut reported: HashSet<String> = HashSet::new();
    for word in grid.words() {
        let word = word.to_uppercase();
        if !seen.insert(word.clone()) && reported.insert(word.clone()) {
            problems.push(Problem::DuplicateWord { word });
        }
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{FilledEntry, Grid};

    /// Fill a template's slots straight from its letters.
    fn filled(template: &str) -> FilledGrid {
        let rows: Vec<&str> = template.split_whitespace().collect();
        let blanked: String = rows
            .iter()
            .map(|row| row.chars().map(|c| if c == '#' { '#' } else { '.' }).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n");
        let grid = Grid::from_template(&blanked).unwrap();
        let width = grid.width();

        let cells: Vec<Cell> = rows
            .iter()
            .flat_map(|row| row.chars())
            .map(|c| match c {
                '#' => Cell::Block,
                '.' => Cell::Empty,
                letter => Cell::Letter(letter),
            })
            .collect();

        let entries = grid
            .slots()
            .into_iter()
            .map(|slot| {
                let word = slot.cells.iter().map(|&idx| cells[idx].to_char()).collect();
                FilledEntry { slot, word, score: 50 }
            })
            .collect();

        FilledGrid { width, height: grid.height(), cells, entries }
    }

    #[test]
    fn test_good_grid_has_no_problems() {
        let grid = filled(
            "
            SAP
            ORE
            DEN
            ",
        );
        assert!(validate(&grid).is_empty());
    }

    #[test]
    fn test_validation_is_idempotent() {
        let grid = filled(
            "
            SAP
            OR.
            DEN
            ",
        );
        let first = validate(&grid);
        assert_eq!(first, validate(&grid));
        assert_eq!(first, vec![Problem::EmptyCell { position: Position::new(2, 1) }]);
    }

    #[test]
    fn test_asymmetry_is_reported_once_per_pair() {
        let layout = BlockLayout::from_positions(5, 5, &[Position::new(0, 0)]);
        let problems = check_layout(&layout);

        assert_eq!(
            problems
                .iter()
                .filter(|problem| matches!(problem, Problem::AsymmetricBlock { .. }))
                .collect::<Vec<_>>(),
            vec![&Problem::AsymmetricBlock { position: Position::new(0, 0), twin: Position::new(4, 4) }]
        );
    }

    #[test]
    fn test_short_runs_and_disconnection() {
        let wall: Vec<Position> = (0..7).map(|y| Position::new(3, y)).collect();
        let layout = BlockLayout::from_positions(7, 7, &wall);

        assert_eq!(check_layout(&layout), vec![Problem::Disconnected { reachable: 21, total: 42 }]);

        let layout = BlockLayout::from_positions(5, 5, &[Position::new(2, 0), Position::new(2, 4)]);
        let problems = check_layout(&layout);

        assert_eq!(problems.len(), 4);
        assert!(problems.contains(&Problem::ShortRun {
            start: Position::new(3, 4),
            direction: Direction::Across,
            length: 2,
        }));
    }

    #[test]
    fn test_duplicates_and_mismatches() {
        let mut grid = filled(
            "
            ABA
            BAB
            ABA
            ",
        );
        let problems = validate(&grid);
        assert_eq!(
            problems,
            vec![Problem::DuplicateWord { word: "ABA".into() }, Problem::DuplicateWord { word: "BAB".into() }]
        );

        grid.entries[1].word = "XYZ".into();
        assert!(validate(&grid).contains(&Problem::WordMismatch {
            start: Position::new(0, 1),
            direction: Direction::Across,
            word: "XYZ".into(),
            found: "BAB".into(),
        }));
    }

    #[test]
    fn test_duplicates_ignore_case() {
        let mut grid = filled(
            "
            sap
            ORE
            DEN
            ",
        );
        assert!(validate(&grid).is_empty());

        // The down entry at (0, 0) now repeats the across one in different case.
        let down = grid
            .entries
            .iter()
            .position(|entry| entry.slot.direction == Direction::Down && entry.slot.start == Position::new(0, 0))
            .unwrap();
        for (&idx, letter) in grid.entries[down].slot.cells.iter().zip("SAP".chars()) {
            grid.cells[idx] = Cell::Letter(letter);
        }
        grid.entries[down].word = "SAP".into();

        assert!(validate(&grid).contains(&Problem::DuplicateWord { word: "SAP".into() }));
    }

    #[test]
    fn test_missing_entry_leaves_cells_uncovered() {
        let mut grid = filled(
            "
            SAP
            ORE
            DEN
            ",
        );
        grid.entries.retain(|entry| !(entry.slot.direction == Direction::Down && entry.slot.start.x == 0));

        assert_eq!(
            validate(&grid),
            (0..3)
                .map(|y| Problem::UncoveredCell { position: Position::new(0, y), direction: Direction::Down })
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_wrong_cell_count_stops_early() {
        let mut grid = filled("SAP ORE DEN");
        grid.cells.pop();

        assert_eq!(validate(&grid), vec![Problem::WrongCellCount { expected: 9, found: 8 }]);
    }
}
