//! Crossings between slots.
//!
//! Every white cell should be owned by exactly one across and one down slot; each such cell
//! yields a [`Constraint`] tying the two slots' letters together.

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::errors::GridError;
use crate::grid::{Grid, Position, Slot};
use crate::{SlotId, MAX_SLOT_LENGTH};

/// Two slots sharing one cell: letter `index_a` of `slot_a` must equal letter `index_b` of
/// `slot_b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    pub slot_a: SlotId,
    pub index_a: usize,
    pub slot_b: SlotId,
    pub index_b: usize,
}

/// A crossing seen from one slot, referencing the other slot's id and the location of the
/// intersection within the other slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crossing {
    pub other_slot_id: SlotId,
    pub other_slot_cell: usize,
}

#[derive(Debug, Clone)]
pub struct ConstraintGraph {
    pub constraints: Vec<Constraint>,
    /// Per slot, per cell: the crossing slot at that cell, if any.
    crossings: Vec<SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]>>,
    /// White cells owned by a single slot. Only a force-fed grid with short runs has these.
    pub unchecked_cells: Vec<Position>,
}

impl ConstraintGraph {
    /// Record which slots own each cell and at what index, then pair them up.
    ///
    /// A white cell with no owning slot can never receive a letter and fails the build; a cell
    /// with a single owner is kept but logged.
    pub fn build(grid: &Grid, slots: &[Slot]) -> Result<ConstraintGraph, GridError> {
        let mut owners: Vec<SmallVec<[(SlotId, usize); 2]>> = vec![smallvec![]; grid.cells().len()];

        for slot in slots {
            for (cell_idx, &idx) in slot.cells.iter().enumerate() {
                owners[idx].push((slot.id, cell_idx));
            }
        }

        let mut constraints = vec![];
        let mut crossings: Vec<SmallVec<[Option<Crossing>; MAX_SLOT_LENGTH]>> =
            slots.iter().map(|slot| smallvec![None; slot.length]).collect();
        let mut unchecked_cells = vec![];

        for (idx, cell_owners) in owners.iter().enumerate() {
            if grid.cells()[idx].is_block() {
                continue;
            }

            match cell_owners.as_slice() {
                [] => return Err(GridError::OrphanCell { position: grid.position(idx) }),
                [_] => unchecked_cells.push(grid.position(idx)),
                &[(slot_a, index_a), (slot_b, index_b)] => {
                    constraints.push(Constraint { slot_a, index_a, slot_b, index_b });
                    crossings[slot_a][index_a] = Some(Crossing { other_slot_id: slot_b, other_slot_cell: index_b });
                    crossings[slot_b][index_b] = Some(Crossing { other_slot_id: slot_a, other_slot_cell: index_a });
                }
                _ => unreachable!("a cell lies in at most one across and one down run"),
            }
        }

        if !unchecked_cells.is_empty() {
            log::warn!("{} white cell(s) belong to only one slot", unchecked_cells.len());
        }

        Ok(ConstraintGraph { constraints, crossings, unchecked_cells })
    }

    pub fn crossings(&self, slot_id: SlotId) -> &[Option<Crossing>] {
        &self.crossings[slot_id]
    }

    pub fn crossing_count(&self, slot_id: SlotId) -> usize {
        self.crossings[slot_id].iter().flatten().count()
    }

    pub fn slot_count(&self) -> usize {
        self.crossings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_grid_crosses_everywhere() {
        let grid = Grid::new(3, 3, &[]).unwrap();
        let slots = grid.slots();
        let graph = ConstraintGraph::build(&grid, &slots).unwrap();

        assert_eq!(graph.constraints.len(), 9);
        assert!(graph.unchecked_cells.is_empty());
        assert!((0..6).all(|slot_id| graph.crossing_count(slot_id) == 3));

        // Middle cell: across slot 1 at index 1 meets down slot 4 at index 1.
        assert!(graph.constraints.contains(&Constraint { slot_a: 1, index_a: 1, slot_b: 4, index_b: 1 }));
        assert_eq!(graph.crossings(1)[1], Some(Crossing { other_slot_id: 4, other_slot_cell: 1 }));
        assert_eq!(graph.crossings(4)[1], Some(Crossing { other_slot_id: 1, other_slot_cell: 1 }));
    }

    #[test]
    fn test_cells_in_short_runs_are_unchecked() {
        let grid = Grid::from_template(
            "
            ...#.
            .....
            .....
            ",
        )
        .unwrap();
        let slots = grid.slots();
        let graph = ConstraintGraph::build(&grid, &slots).unwrap();

        // (4, 0) sits in a one-cell across run; column 3 below the block is a two-cell run.
        assert_eq!(
            graph.unchecked_cells,
            vec![Position::new(4, 0), Position::new(3, 1), Position::new(3, 2)]
        );
        assert_eq!(graph.constraints.len(), 11);
    }

    #[test]
    fn test_orphan_cell_is_an_error() {
        let grid = Grid::from_template(
            "
            .....
            .....
            ..#..
            .#.#.
            .....
            ",
        )
        .unwrap();
        let slots = grid.slots();

        assert_eq!(
            ConstraintGraph::build(&grid, &slots).unwrap_err(),
            GridError::OrphanCell { position: Position::new(2, 3) }
        );
    }
}
