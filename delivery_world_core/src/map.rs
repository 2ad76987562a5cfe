use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Position {position} is out of bounds for grid shape ({height}, {width})")]
    OutOfBounds {
        position: Position,
        height: usize,
        width: usize,
    },
}

/// A fixed-shape 2D grid.
///
/// Stores elements of type `T` in a flat vector using row-major order and is
/// addressed by [`Position`] (`row`, `col`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    height: usize,
    width: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a grid of the given shape filled by a generator function.
    ///
    /// The generator receives each position in row-major order.
    ///
    /// # Panics
    ///
    /// Panics if `height * width` overflows `usize`.
    pub fn from_generator<F>(height: usize, width: usize, mut f: F) -> Self
    where
        F: FnMut(Position) -> T,
    {
        let size = height.checked_mul(width).expect("Grid size overflow");
        let mut cells = Vec::with_capacity(size);
        for row in 0..height {
            for col in 0..width {
                cells.push(f(Position { row, col }));
            }
        }
        Grid {
            height,
            width,
            cells,
        }
    }

    /// Creates a grid of the given shape with every cell set to `value`.
    pub fn filled(height: usize, width: usize, value: T) -> Self
    where
        T: Clone,
    {
        Self::from_generator(height, width, |_| value.clone())
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Converts a position to a flat vector index, or `None` if out of bounds.
    #[inline]
    fn position_to_index(&self, position: Position) -> Option<usize> {
        if self.contains(position) {
            Some(position.row * self.width + position.col)
        } else {
            None
        }
    }

    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        position.row < self.height && position.col < self.width
    }

    /// True if the position lies on the outermost ring of the grid.
    pub fn is_border(&self, position: Position) -> bool {
        self.contains(position)
            && (position.row == 0
                || position.col == 0
                || position.row + 1 == self.height
                || position.col + 1 == self.width)
    }

    pub fn get(&self, position: Position) -> Option<&T> {
        let index = self.position_to_index(position)?;
        self.cells.get(index)
    }

    pub fn get_mut(&mut self, position: Position) -> Option<&mut T> {
        let index = self.position_to_index(position)?;
        self.cells.get_mut(index)
    }

    /// Sets the value of the cell at `position`.
    pub fn set(&mut self, position: Position, value: T) -> Result<(), GridError> {
        let index = self
            .position_to_index(position)
            .ok_or(GridError::OutOfBounds {
                position,
                height: self.height,
                width: self.width,
            })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Iterates over every position in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = Position> + use<T> {
        let (height, width) = (self.height, self.width);
        (0..height).flat_map(move |row| (0..width).map(move |col| Position { row, col }))
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let width = self.width;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            (
                Position {
                    row: index / width,
                    col: index % width,
                },
                cell,
            )
        })
    }

    /// Positions of all cells matching `predicate`, in row-major order.
    pub fn find_positions<P>(&self, mut predicate: P) -> Vec<Position>
    where
        P: FnMut(&T) -> bool,
    {
        self.enumerate()
            .filter_map(|(position, cell)| predicate(cell).then_some(position))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, position: Position) -> &Self::Output {
        match self.position_to_index(position) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid shape ({}, {})",
                position, self.height, self.width
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        let (height, width) = (self.height, self.width);
        match self.position_to_index(position) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid shape ({}, {})",
                position, height, width
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_layout() {
        let grid = Grid::from_generator(2, 3, |p| p.row * 10 + p.col);
        assert_eq!(grid.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 10, 11, 12]);
        assert_eq!(grid[Position::new(1, 2)], 12);
        assert_eq!(grid.positions().count(), 6);
    }

    #[test]
    fn set_out_of_bounds_fails() {
        let mut grid = Grid::filled(2, 2, 0u8);
        let err = grid.set(Position::new(2, 0), 1).unwrap_err();
        assert_eq!(
            err,
            GridError::OutOfBounds {
                position: Position::new(2, 0),
                height: 2,
                width: 2
            }
        );
        assert!(grid.get(Position::new(0, 5)).is_none());
    }

    #[test]
    fn border_detection() {
        let grid = Grid::filled(3, 4, ());
        assert!(grid.is_border(Position::new(0, 1)));
        assert!(grid.is_border(Position::new(2, 3)));
        assert!(grid.is_border(Position::new(1, 0)));
        assert!(!grid.is_border(Position::new(1, 1)));
        assert!(!grid.is_border(Position::new(5, 5)));
    }
}
