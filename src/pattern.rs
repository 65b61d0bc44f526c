//! Black-square layouts: curated ones for the common sizes, randomized ones otherwise, and the
//! structural checks every layout has to pass.
//!
//! A layout is valid when its blocks are 180°-symmetric, no row or column has a white run shorter
//! than [`MIN_SLOT_LENGTH`], and a single flood fill reaches every white cell.

use std::collections::VecDeque;

use bit_set::BitSet;
use rand::Rng;

use crate::grid::{Cell, Direction, GridSpec, Position, BLOCK};
use crate::MIN_SLOT_LENGTH;

/// How many random candidates to try before settling for an open grid.
pub const MAX_PATTERN_CANDIDATES: usize = 100;

/// Grids whose shorter side is at most this keep their corners white.
const SMALL_GRID_SIZE: usize = 7;

/// Roughly one cell in this many is black in a generated layout.
const BLOCK_DENSITY_DIVISOR: usize = 6;

const CURATED_7: &[&str] = &[
    "#...###",
    "#....##",
    ".......",
    ".......",
    ".......",
    "##....#",
    "###...#",
];

const CURATED_9: &[&str] = &[
    "...#.....",
    "...#.....",
    ".........",
    ".....#...",
    "###...###",
    "...#.....",
    ".........",
    ".....#...",
    ".....#...",
];

const CURATED_11: &[&str] = &[
    "....#......",
    "....#......",
    "....#......",
    "...#...#...",
    "......#....",
    "###.....###",
    "....#......",
    "...#...#...",
    "......#....",
    "......#....",
    "......#....",
];

const CURATED_13: &[&str] = &[
    "....#....#...",
    "....#....#...",
    ".............",
    "...#...#.....",
    "###...#...###",
    ".....#.......",
    "....#...#....",
    ".......#.....",
    "###...#...###",
    ".....#...#...",
    ".............",
    "...#....#....",
    "...#....#....",
];

const CURATED_15: &[&str] = &[
    "....#.....#....",
    "....#.....#....",
    "...............",
    "......##.......",
    "###.....#......",
    "............###",
    ".....#.....#...",
    "....#.....#....",
    "...#.....#.....",
    "###............",
    "......#.....###",
    ".......##......",
    "...............",
    "....#.....#....",
    "....#.....#....",
];

/// A maximal run of white cells in one row or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub start: Position,
    pub direction: Direction,
    pub length: usize,
}

/// Which cells of a `width` x `height` grid are black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLayout {
    width: usize,
    height: usize,
    blocks: BitSet,
}

impl BlockLayout {
    /// A layout with no black squares at all.
    pub fn open(width: usize, height: usize) -> BlockLayout {
        BlockLayout { width, height, blocks: BitSet::with_capacity(width * height) }
    }

    /// Out-of-bounds positions are ignored.
    pub fn from_positions(width: usize, height: usize, positions: &[Position]) -> BlockLayout {
        let mut layout = BlockLayout::open(width, height);
        for &position in positions {
            if position.x < width && position.y < height {
                layout.blocks.insert(layout.index(position));
            }
        }
        layout
    }

    pub fn from_cells(width: usize, height: usize, cells: &[Cell]) -> BlockLayout {
        let mut layout = BlockLayout::open(width, height);
        for (idx, cell) in cells.iter().enumerate() {
            if cell.is_block() {
                layout.blocks.insert(idx);
            }
        }
        layout
    }

    fn from_rows(rows: &[&str]) -> BlockLayout {
        let height = rows.len();
        let width = rows.first().map(|row| row.chars().count()).unwrap_or(0);
        let mut layout = BlockLayout::open(width, height);

        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                if c == BLOCK {
                    layout.blocks.insert(y * width + x);
                }
            }
        }
        layout
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, position: Position) -> usize {
        position.y * self.width + position.x
    }

    pub fn is_block(&self, position: Position) -> bool {
        self.blocks.contains(self.index(position))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn white_count(&self) -> usize {
        self.width * self.height - self.block_count()
    }

    /// The cell a position maps to under 180° rotation.
    pub fn twin(&self, position: Position) -> Position {
        Position::new(self.width - 1 - position.x, self.height - 1 - position.y)
    }

    /// Blacken a cell together with its rotational twin.
    pub fn set_block_pair(&mut self, position: Position) {
        let twin = self.twin(position);
        self.blocks.insert(self.index(position));
        self.blocks.insert(self.index(twin));
    }

    pub fn clear_block_pair(&mut self, position: Position) {
        let twin = self.twin(position);
        self.blocks.remove(self.index(position));
        self.blocks.remove(self.index(twin));
    }

    pub fn positions(&self) -> Vec<Position> {
        self.blocks
            .iter()
            .map(|idx| Position::new(idx % self.width, idx / self.width))
            .collect()
    }

    pub fn to_spec(&self, min_word_score: i32) -> GridSpec {
        GridSpec::new(self.width, self.height, self.positions()).with_min_word_score(min_word_score)
    }

    pub fn render(&self) -> String {
        (0..self.height)
            .map(|y| {
                (0..self.width)
                    .map(|x| if self.is_block(Position::new(x, y)) { BLOCK } else { '.' })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Cells whose black/white state differs from their 180° twin. Each mismatched pair shows up
    /// twice, once from each side.
    pub fn asymmetric_cells(&self) -> Vec<Position> {
        self.all_positions()
            .filter(|&position| self.is_block(position) != self.is_block(self.twin(position)))
            .collect()
    }

    pub fn is_symmetric(&self) -> bool {
        self.asymmetric_cells().is_empty()
    }

    fn all_positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Position::new(x, y)))
    }

    fn row(&self, y: usize) -> Vec<Position> {
        (0..self.width).map(|x| Position::new(x, y)).collect()
    }

    fn column(&self, x: usize) -> Vec<Position> {
        (0..self.height).map(|y| Position::new(x, y)).collect()
    }

    fn runs_in_line(&self, line: &[Position], direction: Direction) -> Vec<Run> {
        let mut runs = vec![];
        let mut start: Option<Position> = None;
        let mut length = 0;

        for &position in line {
            if self.is_block(position) {
                if let Some(start) = start.take() {
                    runs.push(Run { start, direction, length });
                }
                length = 0;
            } else {
                start.get_or_insert(position);
                length += 1;
            }
        }
        if let Some(start) = start {
            runs.push(Run { start, direction, length });
        }

        runs
    }

    /// Every maximal white run, across runs row by row, then down runs column by column.
    pub fn runs(&self) -> Vec<Run> {
        let across = (0..self.height).flat_map(|y| self.runs_in_line(&self.row(y), Direction::Across));
        let down = (0..self.width).flat_map(|x| self.runs_in_line(&self.column(x), Direction::Down));
        across.chain(down).collect()
    }

    /// White runs too short to hold a word.
    pub fn short_runs(&self) -> Vec<Run> {
        self.runs().into_iter().filter(|run| run.length < MIN_SLOT_LENGTH).collect()
    }

    fn line_has_short_run(&self, line: &[Position], direction: Direction) -> bool {
        self.runs_in_line(line, direction).iter().any(|run| run.length < MIN_SLOT_LENGTH)
    }

    /// Do the row and column through `position` (and through its twin) still have only
    /// word-sized runs?
    fn lines_ok_around(&self, position: Position) -> bool {
        [position, self.twin(position)].iter().all(|p| {
            !self.line_has_short_run(&self.row(p.y), Direction::Across)
                && !self.line_has_short_run(&self.column(p.x), Direction::Down)
        })
    }

    /// Number of white cells a flood fill from the first white cell reaches.
    pub fn reachable_white_count(&self) -> usize {
        let Some(origin) = self.all_positions().find(|&p| !self.is_block(p)) else {
            return 0;
        };

        let mut visited = BitSet::with_capacity(self.width * self.height);
        let mut queue: VecDeque<Position> = VecDeque::new();
        visited.insert(self.index(origin));
        queue.push_back(origin);

        while let Some(position) = queue.pop_front() {
            let neighbors = [
                (position.x > 0).then(|| Position::new(position.x - 1, position.y)),
                (position.x + 1 < self.width).then(|| Position::new(position.x + 1, position.y)),
                (position.y > 0).then(|| Position::new(position.x, position.y - 1)),
                (position.y + 1 < self.height).then(|| Position::new(position.x, position.y + 1)),
            ];
            for neighbor in neighbors.into_iter().flatten() {
                if !self.is_block(neighbor) && visited.insert(self.index(neighbor)) {
                    queue.push_back(neighbor);
                }
            }
        }

        visited.len()
    }

    pub fn is_connected(&self) -> bool {
        self.reachable_white_count() == self.white_count()
    }

    /// Symmetric, word-sized runs only, one connected white region, and at least one white cell.
    pub fn is_valid(&self) -> bool {
        self.white_count() > 0 && self.is_symmetric() && self.short_runs().is_empty() && self.is_connected()
    }
}

/// The hand-tuned layout for a common square size, if there is one.
pub fn curated_layout(width: usize, height: usize) -> Option<BlockLayout> {
    if width != height {
        return None;
    }

    let rows = match width {
        7 => CURATED_7,
        9 => CURATED_9,
        11 => CURATED_11,
        13 => CURATED_13,
        15 => CURATED_15,
        _ => return None,
    };
    Some(BlockLayout::from_rows(rows))
}

/// Produce a valid black-square layout for a `width` x `height` grid.
///
/// Curated sizes return their fixed layout and 5x5 is left open. Anything else gets up to
/// [`MAX_PATTERN_CANDIDATES`] random symmetric candidates; if none validates the grid is left open.
pub fn generate_pattern<R: Rng + ?Sized>(width: usize, height: usize, rng: &mut R) -> BlockLayout {
    if let Some(layout) = curated_layout(width, height) {
        log::debug!("using curated {width}x{height} layout");
        return layout;
    }

    if (width == 5 && height == 5) || width < MIN_SLOT_LENGTH || height < MIN_SLOT_LENGTH {
        return BlockLayout::open(width, height);
    }

    let target = width * height / BLOCK_DENSITY_DIVISOR;
    for candidate_idx in 0..MAX_PATTERN_CANDIDATES {
        let layout = random_candidate(width, height, target, rng);
        if layout.is_valid() {
            log::debug!(
                "generated {width}x{height} layout with {} blocks on candidate {}",
                layout.block_count(),
                candidate_idx + 1
            );
            return layout;
        }
    }

    log::warn!("no valid {width}x{height} layout in {MAX_PATTERN_CANDIDATES} candidates; using an open grid");
    BlockLayout::open(width, height)
}

fn random_candidate<R: Rng + ?Sized>(width: usize, height: usize, target: usize, rng: &mut R) -> BlockLayout {
    let mut layout = BlockLayout::open(width, height);
    let small = width.min(height) <= SMALL_GRID_SIZE;
    let max_tries = width * height * 4;

    for _ in 0..max_tries {
        if layout.block_count() >= target {
            break;
        }

        // Top half only (including the middle row of an odd grid); the twin covers the rest.
        let position = Position::new(rng.gen_range(0..width), rng.gen_range(0..(height + 1) / 2));
        if layout.is_block(position) || (small && is_corner(position, width, height)) {
            continue;
        }

        layout.set_block_pair(position);
        if !layout.lines_ok_around(position) {
            layout.clear_block_pair(position);
        }
    }

    layout
}

fn is_corner(position: Position, width: usize, height: usize) -> bool {
    (position.x == 0 || position.x + 1 == width) && (position.y == 0 || position.y + 1 == height)
}
