use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error(
        "Coordinates ({x}, {y}) are out of bounds for grid at ({min_x}, {min_y}) of size ({width}, {height})"
    )]
    OutOfBounds {
        x: i32,
        y: i32,
        min_x: i32,
        min_y: i32,
        width: usize,
        height: usize,
    },
}

/// A generic 2D grid addressed by signed world coordinates.
///
/// Stores elements of type `T` in a flat vector using row-major order,
/// covering the rectangle that starts at `origin`. The rectangle can be
/// grown on demand with [`Grid::insert`], so callers never need to know
/// the final extent of the world up front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    origin: Position,
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid covering `width` x `height` cells from `origin`,
    /// filled with default values.
    pub fn new(origin: Position, width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        Grid {
            origin,
            width,
            height,
            cells: vec![T::default(); width * height],
        }
    }

    /// Creates a new grid from `origin`, filled by a generator function.
    ///
    /// The generator function `f` takes the world position of each cell and
    /// returns the value for that cell.
    pub fn from_generator<F>(origin: Position, width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(Position) -> T,
    {
        let mut cells = Vec::with_capacity(width * height);
        for row in 0..height {
            for column in 0..width {
                cells.push(f(Position {
                    x: origin.x + column as i32,
                    y: origin.y + row as i32,
                }));
            }
        }
        Grid {
            origin,
            width,
            height,
            cells,
        }
    }

    /// The top-left corner of the covered rectangle.
    #[inline]
    pub fn origin(&self) -> Position {
        self.origin
    }

    /// Returns the width of the grid.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the grid.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Converts a world position to a flat vector index.
    ///
    /// Returns `None` if the position is outside the covered rectangle.
    #[inline]
    pub fn position_to_index(&self, position: Position) -> Option<usize> {
        let column = usize::try_from(position.x - self.origin.x).ok()?;
        let row = usize::try_from(position.y - self.origin.y).ok()?;
        if column < self.width && row < self.height {
            Some(row * self.width + column)
        } else {
            None
        }
    }

    /// Converts a flat vector index back to a world position.
    #[inline]
    pub fn index_to_position(&self, index: usize) -> Option<Position> {
        if index < self.cells.len() {
            Some(Position {
                x: self.origin.x + (index % self.width) as i32,
                y: self.origin.y + (index / self.width) as i32,
            })
        } else {
            None
        }
    }

    /// Checks if the position lies inside the covered rectangle.
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        self.position_to_index(position).is_some()
    }

    /// Gets an immutable reference to the cell at the given position.
    pub fn get(&self, position: Position) -> Option<&T> {
        self.position_to_index(position)
            .and_then(|index| self.cells.get(index))
    }

    /// Gets a mutable reference to the cell at the given position.
    pub fn get_mut(&mut self, position: Position) -> Option<&mut T> {
        self.position_to_index(position)
            .and_then(|index| self.cells.get_mut(index))
    }

    /// Sets the value of the cell at the given position.
    ///
    /// Returns `Err(GridError::OutOfBounds)` if the position is outside the
    /// covered rectangle; use [`Grid::insert`] to grow instead.
    pub fn set(&mut self, position: Position, value: T) -> Result<(), GridError> {
        match self.position_to_index(position) {
            Some(index) => {
                self.cells[index] = value;
                Ok(())
            }
            None => Err(GridError::OutOfBounds {
                x: position.x,
                y: position.y,
                min_x: self.origin.x,
                min_y: self.origin.y,
                width: self.width,
                height: self.height,
            }),
        }
    }

    /// Sets the value of the cell at the given position, growing the grid
    /// first if needed.
    pub fn insert(&mut self, position: Position, value: T)
    where
        T: Default + Clone,
    {
        self.grow_to_include(position);
        if let Some(cell) = self.get_mut(position) {
            *cell = value;
        }
    }

    /// Extends the covered rectangle so that it contains `position`.
    ///
    /// Growth is by at least the current size in the growing direction so
    /// that a walk outwards costs amortised constant time per cell.
    pub fn grow_to_include(&mut self, position: Position)
    where
        T: Default + Clone,
    {
        if self.contains(position) {
            return;
        }
        if self.cells.is_empty() {
            *self = Grid::new(position, 1, 1);
            return;
        }

        let max_x = self.origin.x + self.width as i32 - 1;
        let max_y = self.origin.y + self.height as i32 - 1;
        let pad_x = self.width.max(4) as i32;
        let pad_y = self.height.max(4) as i32;

        let new_min_x = if position.x < self.origin.x {
            position.x.min(self.origin.x - pad_x)
        } else {
            self.origin.x
        };
        let new_min_y = if position.y < self.origin.y {
            position.y.min(self.origin.y - pad_y)
        } else {
            self.origin.y
        };
        let new_max_x = if position.x > max_x {
            position.x.max(max_x + pad_x)
        } else {
            max_x
        };
        let new_max_y = if position.y > max_y {
            position.y.max(max_y + pad_y)
        } else {
            max_y
        };

        let origin = Position::new(new_min_x, new_min_y);
        let width = (new_max_x - new_min_x + 1) as usize;
        let height = (new_max_y - new_min_y + 1) as usize;
        let old = std::mem::replace(self, Grid::new(origin, width, height));
        for (position, value) in old.into_enumerated() {
            if let Some(cell) = self.get_mut(position) {
                *cell = value;
            }
        }
    }

    /// Returns an iterator over the cells of the grid in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.iter()
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let origin = self.origin;
        let width = self.width;
        self.cells.iter().enumerate().map(move |(index, cell)| {
            (
                Position {
                    x: origin.x + (index % width) as i32,
                    y: origin.y + (index / width) as i32,
                },
                cell,
            )
        })
    }

    fn into_enumerated(self) -> impl Iterator<Item = (Position, T)> {
        let origin = self.origin;
        let width = self.width;
        self.cells.into_iter().enumerate().map(move |(index, cell)| {
            (
                Position {
                    x: origin.x + (index % width) as i32,
                    y: origin.y + (index / width) as i32,
                },
                cell,
            )
        })
    }

    /// Returns a slice containing all cells in the grid.
    pub fn as_slice(&self) -> &[T] {
        &self.cells
    }
}

/// Indexing using Position coordinates for access
impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, index: Position) -> &Self::Output {
        match self.position_to_index(index) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid at ({}, {}) of size ({}, {})",
                index.x, index.y, self.origin.x, self.origin.y, self.width, self.height
            ),
        }
    }
}

/// Indexing using Position coordinates for mutable access
impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, index: Position) -> &mut Self::Output {
        let (origin, width, height) = (self.origin, self.width, self.height);
        match self.position_to_index(index) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index ({}, {}) out of bounds for grid at ({}, {}) of size ({}, {})",
                index.x, index.y, origin.x, origin.y, width, height
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_outside_bounds_fails() {
        let mut grid: Grid<u8> = Grid::new(Position::new(0, 0), 3, 2);
        assert!(grid.set(Position::new(2, 1), 7).is_ok());
        assert_eq!(grid[Position::new(2, 1)], 7);
        assert!(matches!(
            grid.set(Position::new(3, 0), 1),
            Err(GridError::OutOfBounds { x: 3, y: 0, .. })
        ));
        assert_eq!(grid.get(Position::new(-1, 0)), None);
    }

    #[test]
    fn insert_grows_and_keeps_existing_cells() {
        let mut grid: Grid<u8> = Grid::new(Position::new(0, 0), 2, 2);
        grid.insert(Position::new(1, 1), 5);
        grid.insert(Position::new(-3, 9), 6);
        grid.insert(Position::new(10, -4), 8);

        assert_eq!(grid.get(Position::new(1, 1)), Some(&5));
        assert_eq!(grid.get(Position::new(-3, 9)), Some(&6));
        assert_eq!(grid.get(Position::new(10, -4)), Some(&8));
        assert_eq!(grid.get(Position::new(0, 0)), Some(&0));
        assert!(grid.origin().x <= -3 && grid.origin().y <= -4);
    }

    #[test]
    fn enumerate_matches_index_conversion() {
        let grid = Grid::from_generator(Position::new(-1, -1), 3, 3, |p| p.x * 10 + p.y);
        for (index, (position, value)) in grid.enumerate().enumerate() {
            assert_eq!(grid.index_to_position(index), Some(position));
            assert_eq!(*value, position.x * 10 + position.y);
        }
    }
}
