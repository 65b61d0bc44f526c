//! Crossword grid filling.
//!
//! The pieces, leaves first: a scored [`lexicon::Lexicon`], the cell [`grid::Grid`] and its
//! derived slots, the symmetric black-square [`pattern`] generator, the crossing
//! [`constraints::ConstraintGraph`], the per-slot [`domains`], the backtracking [`solver`], and
//! the post-hoc structural [`validator`].

pub mod constraints;
pub mod domains;
pub mod errors;
pub mod grid;
pub mod lexicon;
pub mod log;
pub mod pattern;
pub mod solver;
pub mod validator;

pub use errors::{FillFailure, GridError, LexiconError};
pub use grid::{Cell, Direction, FilledEntry, FilledGrid, Grid, GridSpec, Position, Slot, ThemeEntry};
pub use lexicon::{DefinitionSource, Lexicon, ScoredWord};
pub use solver::{fill, fill_batch, fill_generated, fill_with_seed, FillJob, FillOptions, FillSuccess, Statistics};
pub use validator::{validate, Problem};

/// The expected maximum number of slots appearing in a grid.
pub const MAX_SLOT_COUNT: usize = 256;

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

/// The shortest run of white cells that counts as a slot.
pub const MIN_SLOT_LENGTH: usize = 3;

/// An identifier for a given slot, based on its index in the grid's extracted slot list.
pub type SlotId = usize;

/// An identifier for a candidate word, based on its index in a fill's word table.
pub type WordId = usize;
