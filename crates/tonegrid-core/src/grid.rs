use serde::{Deserialize, Serialize};

/// A cell position in a grid (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}c{}", self.row + 1, self.col + 1)
    }
}

/// Dimensions of a rectangular grid, with row-major cell indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    pub rows: usize,
    pub columns: usize,
}

impl GridShape {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns }
    }

    pub fn len(&self) -> usize {
        self.rows * self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.len()
    }

    pub fn contains_cell(&self, cell: Cell) -> bool {
        cell.row < self.rows && cell.col < self.columns
    }

    /// Row-major index of a cell
    pub fn index_of(&self, cell: Cell) -> usize {
        cell.row * self.columns + cell.col
    }

    pub fn cell_at(&self, index: usize) -> Cell {
        Cell::new(index / self.columns, index % self.columns)
    }

    /// Up, down, left and right neighbours that lie inside the grid
    pub fn neighbors(&self, index: usize) -> Vec<usize> {
        if !self.contains(index) {
            return Vec::new();
        }
        let Cell { row, col } = self.cell_at(index);
        let mut out = Vec::with_capacity(4);
        if row > 0 {
            out.push(index - self.columns);
        }
        if row + 1 < self.rows {
            out.push(index + self.columns);
        }
        if col > 0 {
            out.push(index - 1);
        }
        if col + 1 < self.columns {
            out.push(index + 1);
        }
        out
    }

    pub fn are_adjacent(&self, a: usize, b: usize) -> bool {
        if !self.contains(a) || !self.contains(b) {
            return false;
        }
        let (ca, cb) = (self.cell_at(a), self.cell_at(b));
        ca.row.abs_diff(cb.row) + ca.col.abs_diff(cb.col) == 1
    }

    pub fn indices(&self) -> std::ops::Range<usize> {
        0..self.len()
    }
}

/// Number of positions where two equal-length sequences differ
pub fn mismatch_count<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    a.iter().zip(b).filter(|(x, y)| x != y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corner_of_two_by_two_has_two_neighbors() {
        let shape = GridShape::new(2, 2);
        for idx in shape.indices() {
            assert_eq!(shape.neighbors(idx).len(), 2);
        }
    }

    #[test]
    fn test_neighbors_are_one_step_and_in_bounds() {
        for (rows, cols) in [(1, 5), (3, 3), (4, 6), (7, 2)] {
            let shape = GridShape::new(rows, cols);
            for idx in shape.indices() {
                let here = shape.cell_at(idx);
                for n in shape.neighbors(idx) {
                    assert!(shape.contains(n));
                    let there = shape.cell_at(n);
                    assert_eq!(here.row.abs_diff(there.row) + here.col.abs_diff(there.col), 1);
                }
            }
        }
    }

    #[test]
    fn test_center_and_edge_counts() {
        let shape = GridShape::new(3, 3);
        assert_eq!(shape.neighbors(4).len(), 4);
        assert_eq!(shape.neighbors(1).len(), 3);
        assert_eq!(shape.neighbors(0).len(), 2);
        assert!(shape.neighbors(9).is_empty());
    }

    #[test]
    fn test_row_wrap_is_not_adjacent() {
        let shape = GridShape::new(3, 3);
        assert!(!shape.are_adjacent(2, 3));
        assert!(shape.are_adjacent(2, 5));
        assert!(!shape.are_adjacent(4, 4));
    }

    #[test]
    fn test_index_round_trip() {
        let shape = GridShape::new(4, 5);
        for idx in shape.indices() {
            assert_eq!(shape.index_of(shape.cell_at(idx)), idx);
        }
    }

    #[test]
    fn test_mismatch_count() {
        assert_eq!(mismatch_count(&[1, 2, 3], &[1, 3, 2]), 2);
        assert_eq!(mismatch_count::<u8>(&[], &[]), 0);
    }
}
