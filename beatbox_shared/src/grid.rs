use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Instrument rows in a pattern
pub const ROWS: usize = 16;
/// Steps per row
pub const STEPS: usize = 16;
/// Total cells, also the length of a flattened pattern on the wire
pub const CELLS: usize = ROWS * STEPS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("pattern has {actual} cells, expected {expected}")]
pub struct ShapeError {
    pub expected: usize,
    pub actual: usize,
}

/// The ROWS x STEPS hit matrix.
///
/// Cells are stored row-major: `(row, step)` lives at `row * STEPS + step`.
/// Cloning gives a fully independent copy, so a grid handed to the track
/// builder or parked in the remote store can't be changed by later edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternGrid {
    cells: Vec<bool>,
}

impl Default for PatternGrid {
    fn default() -> Self {
        Self {
            cells: vec![false; CELLS],
        }
    }
}

impl PatternGrid {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(row: usize, step: usize) -> Option<usize> {
        if row < ROWS && step < STEPS {
            Some(row * STEPS + step)
        } else {
            None
        }
    }

    pub fn get(&self, row: usize, step: usize) -> bool {
        Self::index(row, step)
            .map(|i| self.cells[i])
            .unwrap_or(false)
    }

    /// Out-of-range coordinates are ignored.
    pub fn set(&mut self, row: usize, step: usize, value: bool) {
        if let Some(i) = Self::index(row, step) {
            self.cells[i] = value;
        }
    }

    pub fn toggle(&mut self, row: usize, step: usize) {
        let current = self.get(row, step);
        self.set(row, step, !current);
    }

    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    pub fn hit_count(&self) -> usize {
        self.cells.iter().filter(|&&hit| hit).count()
    }

    /// Steps of one row, in order. Empty for an out-of-range row.
    pub fn row(&self, row: usize) -> &[bool] {
        if row < ROWS {
            &self.cells[row * STEPS..(row + 1) * STEPS]
        } else {
            &[]
        }
    }

    pub fn to_flat(&self) -> Vec<bool> {
        self.cells.clone()
    }

    pub fn from_flat(cells: &[bool]) -> Result<Self, ShapeError> {
        if cells.len() != CELLS {
            return Err(ShapeError {
                expected: CELLS,
                actual: cells.len(),
            });
        }
        Ok(Self {
            cells: cells.to_vec(),
        })
    }
}

impl TryFrom<Vec<bool>> for PatternGrid {
    type Error = ShapeError;

    fn try_from(cells: Vec<bool>) -> Result<Self, Self::Error> {
        if cells.len() != CELLS {
            return Err(ShapeError {
                expected: CELLS,
                actual: cells.len(),
            });
        }
        Ok(Self { cells })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_round_trip() {
        let mut grid = PatternGrid::new();
        grid.set(0, 0, true);
        grid.set(3, 7, true);
        grid.set(15, 15, true);

        let restored = PatternGrid::from_flat(&grid.to_flat()).unwrap();
        assert_eq!(restored, grid);
        assert_eq!(restored.hit_count(), 3);
    }

    #[test]
    fn test_flat_layout_is_row_major() {
        let mut grid = PatternGrid::new();
        grid.set(2, 5, true);
        let flat = grid.to_flat();
        assert_eq!(flat.len(), CELLS);
        assert!(flat[2 * STEPS + 5]);
        assert_eq!(flat.iter().filter(|&&c| c).count(), 1);
    }

    #[test]
    fn test_from_flat_rejects_wrong_length() {
        for len in [0, 1, CELLS - 1, CELLS + 1, 1024] {
            let err = PatternGrid::from_flat(&vec![false; len]).unwrap_err();
            assert_eq!(err, ShapeError { expected: CELLS, actual: len });
        }
        assert!(PatternGrid::try_from(vec![true; 17]).is_err());
    }

    #[test]
    fn test_from_flat_replaces_every_cell() {
        let mut all_on = vec![true; CELLS];
        all_on[0] = false;
        let grid = PatternGrid::from_flat(&all_on).unwrap();
        assert!(!grid.get(0, 0));
        assert_eq!(grid.hit_count(), CELLS - 1);
    }

    #[test]
    fn test_copies_are_independent() {
        let mut live = PatternGrid::new();
        let snapshot = live.clone();
        live.toggle(4, 4);
        assert!(live.get(4, 4));
        assert!(!snapshot.get(4, 4));
    }

    #[test]
    fn test_out_of_range_is_ignored() {
        let mut grid = PatternGrid::new();
        grid.set(ROWS, 0, true);
        grid.set(0, STEPS, true);
        assert_eq!(grid.hit_count(), 0);
        assert!(!grid.get(99, 99));
        assert!(grid.row(ROWS).is_empty());
    }
}
