//! Square grids of terrain samples.

use thiserror::Error;

/// Shape problems detected when a grid is built or bound to a session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid has no cells")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged { row: usize, expected: usize, found: usize },
    #[error("grid is {width}x{height}, expected a square grid")]
    NotSquare { width: usize, height: usize },
    #[error("grid is {found:?}, expected {expected:?} to match the heightmap")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
}

/// A 2D row-major grid addressed by `(x, y)`. Edges do not wrap.
#[derive(Clone, Debug, PartialEq)]
pub struct Tilemap<T> {
    pub width: usize,
    pub height: usize,
    data: Vec<T>,
}

impl<T: Clone> Tilemap<T> {
    pub fn new_with(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Build a grid from nested rows (`rows[y][x]`), rejecting empty or ragged input.
    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(GridError::Empty);
        }

        let mut data = Vec::with_capacity(width * height);
        for (row, cells) in rows.into_iter().enumerate() {
            if cells.len() != width {
                return Err(GridError::Ragged {
                    row,
                    expected: width,
                    found: cells.len(),
                });
            }
            data.extend(cells);
        }

        Ok(Self { width, height, data })
    }

    /// Build a square grid by evaluating `f(x, y)` for every cell.
    pub fn from_fn(resolution: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(resolution * resolution);
        for y in 0..resolution {
            for x in 0..resolution {
                data.push(f(x, y));
            }
        }
        Self {
            width: resolution,
            height: resolution,
            data,
        }
    }

    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(
            x < self.width && y < self.height,
            "({x}, {y}) outside {}x{}",
            self.width,
            self.height
        );
        y * self.width + x
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.index(x, y);
        &mut self.data[idx]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Fill the entire map with a value.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Side length of a square grid.
    pub fn resolution(&self) -> usize {
        self.width
    }

    /// Check that this grid is a non-empty square.
    pub fn ensure_square(&self) -> Result<(), GridError> {
        if self.width == 0 || self.height == 0 {
            return Err(GridError::Empty);
        }
        if !self.is_square() {
            return Err(GridError::NotSquare {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Whether `(x, y)` has all four orthogonal neighbours.
    pub fn is_interior(&self, x: usize, y: usize) -> bool {
        x >= 1 && y >= 1 && x + 1 < self.width && y + 1 < self.height
    }

    /// Iterate over all cells with their coordinates.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        let width = self.width;
        self.data.iter().enumerate().map(move |(idx, val)| {
            (idx % width, idx / width, val)
        })
    }

    /// Iterate mutably over all cells with their coordinates.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, usize, &mut T)> {
        let width = self.width;
        self.data.iter_mut().enumerate().map(move |(idx, val)| {
            (idx % width, idx / width, val)
        })
    }

    /// Produce a same-shaped grid by mapping every cell.
    pub fn map<U>(&self, mut f: impl FnMut(usize, usize, &T) -> U) -> Tilemap<U> {
        let data = self.iter().map(|(x, y, v)| f(x, y, v)).collect();
        Tilemap {
            width: self.width,
            height: self.height,
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rows_row_major() {
        let map = Tilemap::from_rows(vec![vec![1, 2, 3], vec![4, 5, 6]]).unwrap();
        assert_eq!(map.shape(), (3, 2));
        assert_eq!(*map.get(2, 0), 3);
        assert_eq!(*map.get(0, 1), 4);
        assert!(!map.is_square());
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        let err =
            Tilemap::from_rows(vec![vec![0.0f32; 3], vec![0.0; 2], vec![0.0; 3]]).unwrap_err();
        assert_eq!(err, GridError::Ragged { row: 1, expected: 3, found: 2 });
    }

    #[test]
    fn test_from_rows_rejects_empty() {
        assert_eq!(Tilemap::<f32>::from_rows(vec![]).unwrap_err(), GridError::Empty);
        assert_eq!(Tilemap::<f32>::from_rows(vec![vec![]]).unwrap_err(), GridError::Empty);
    }

    #[test]
    fn test_ensure_square() {
        assert!(Tilemap::new_with(4, 4, 0u8).ensure_square().is_ok());
        assert_eq!(
            Tilemap::new_with(4, 3, 0u8).ensure_square(),
            Err(GridError::NotSquare { width: 4, height: 3 })
        );
        assert_eq!(Tilemap::new_with(0, 0, 0u8).ensure_square(), Err(GridError::Empty));
    }

    #[test]
    fn test_is_interior() {
        let map = Tilemap::new_with(4, 4, 0u8);
        assert!(map.is_interior(1, 2));
        assert!(!map.is_interior(0, 1));
        assert!(!map.is_interior(3, 2));
    }

    #[test]
    fn test_from_fn_and_map() {
        let map = Tilemap::from_fn(3, |x, y| (x + 10 * y) as f32);
        assert_eq!(*map.get(2, 1), 12.0);
        let doubled = map.map(|_, _, v| v * 2.0);
        assert_eq!(*doubled.get(2, 1), 24.0);
    }
}
