//! Error types for loading word lists, building grids, and filling them.
//!
//! Of the fill outcomes, only [`FillFailure::InvalidGrid`] and
//! [`FillFailure::ValidationFailure`] point at a real defect. The other three are expected
//! results of a hard or over-constrained grid, and the caller handles them by retrying with a new
//! seed, a smaller grid, or a lower score floor.

use std::io;
use std::time::Duration;

use crate::grid::{Direction, Position};
use crate::validator::Problem;
use crate::SlotId;

/// Errors raised while reading an entry list into a [`crate::Lexicon`].
#[derive(Debug, thiserror::Error)]
pub enum LexiconError {
    #[error("failed to read word list: {0}")]
    Io(#[from] io::Error),

    #[error("line {line_number}: no word in \"{line}\"")]
    MalformedLine { line_number: usize, line: String },

    #[error("line {line_number}: score \"{score}\" is not an integer")]
    InvalidScore { line_number: usize, score: String },
}

/// Errors raised while turning a grid specification into a cell grid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("invalid grid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("black square {position} lies outside the grid")]
    BlackSquareOutOfBounds { position: Position },

    #[error("template row {row} has a different width than the first row")]
    RaggedTemplate { row: usize },

    #[error("no {direction} slot starts at {start}")]
    UnknownPinnedSlot { start: Position, direction: Direction },

    #[error("pinned entry \"{word}\" does not fit the {length}-cell slot at {start}")]
    PinnedLengthMismatch { start: Position, word: String, length: usize },

    #[error("conflicting letters at {position}: '{existing}' vs '{incoming}'")]
    ConflictingPin { position: Position, existing: char, incoming: char },

    #[error("white cell {position} is not part of any slot")]
    OrphanCell { position: Position },

    #[error("pinned entry \"{word}\" at {start} contains '{letter}', which is not a letter")]
    InvalidPinnedLetter { start: Position, word: String, letter: char },

    #[error("\"{word}\" is pinned to more than one slot")]
    DuplicatePin { word: String },

    #[error("black-square layout is not fillable: {}", .problems.join("; "))]
    InvalidLayout { problems: Vec<String> },
}

/// The typed failure of a fill. The engine never hands back a partially-filled grid.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FillFailure {
    #[error("grid specification rejected: {0}")]
    InvalidGrid(#[from] GridError),

    #[error("slot {slot_id} has no candidates for pattern {pattern}")]
    PreconditionFailure { slot_id: SlotId, pattern: String },

    #[error("search exhausted without a fill after {attempts} attempt(s)")]
    SearchExhausted { attempts: usize },

    #[error("search timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("filled grid failed validation: {}", format_problems(.problems))]
    ValidationFailure { problems: Vec<Problem> },
}

impl FillFailure {
    /// Could another attempt with a fresh seed plausibly succeed?
    pub fn is_retryable(&self) -> bool {
        matches!(self, FillFailure::SearchExhausted { .. } | FillFailure::Timeout { .. })
    }
}

fn format_problems(problems: &[Problem]) -> String {
    problems.iter().map(|problem| problem.to_string()).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_outcomes() {
        assert!(FillFailure::SearchExhausted { attempts: 3 }.is_retryable());
        assert!(FillFailure::Timeout { elapsed: Duration::from_millis(5) }.is_retryable());
        assert!(!FillFailure::PreconditionFailure { slot_id: 0, pattern: "A..".into() }.is_retryable());
        assert!(!FillFailure::InvalidGrid(GridError::InvalidDimensions { width: 0, height: 3 }).is_retryable());
    }

    #[test]
    fn test_messages_name_the_offending_cell() {
        let err = GridError::ConflictingPin {
            position: Position::new(2, 1),
            existing: 'A',
            incoming: 'B',
        };
        assert_eq!(err.to_string(), "conflicting letters at (2, 1): 'A' vs 'B'");
    }
}
