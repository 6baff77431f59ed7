//! The shared grid holding both sides' flags.

use core::fmt;
use rand::Rng;

use crate::cell::{Cell, CellFlag};
use crate::common::GameError;
use crate::ship::{Footprint, Orientation};

/// Attempts made by [`Grid::random_placement`] before giving up.
const PLACEMENT_ATTEMPTS: usize = 1000;

/// A `width` × `height` field of [`Cell`]s, stored row by row.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl Grid {
    /// Create an empty grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::EMPTY; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    fn index(&self, x: i32, y: i32) -> Result<usize, GameError> {
        if !self.contains(x, y) {
            return Err(GameError::OutOfBounds { x, y });
        }
        Ok(y as usize * self.width as usize + x as usize)
    }

    /// Cell at (`x`, `y`).
    pub fn get(&self, x: i32, y: i32) -> Result<Cell, GameError> {
        self.index(x, y).map(|i| self.cells[i])
    }

    /// Set `flag` on (`x`, `y`), failing if it is out of bounds or the flag is
    /// already set. Returns the previous cell value.
    pub fn set(&mut self, x: i32, y: i32, flag: CellFlag) -> Result<Cell, GameError> {
        let idx = self.index(x, y)?;
        let previous = self.cells[idx];
        if !self.cells[idx].set(flag) {
            return Err(GameError::FlagAlreadySet { x, y, flag });
        }
        Ok(previous)
    }

    /// Reset every cell to empty.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    /// Every coordinate, row by row.
    pub fn coordinates(&self) -> impl Iterator<Item = (i32, i32)> {
        let (w, h) = (self.width as i32, self.height as i32);
        (0..h).flat_map(move |y| (0..w).map(move |x| (x, y)))
    }

    /// Number of cells on which all `flags` are set.
    pub fn count(&self, flags: &[CellFlag]) -> usize {
        self.cells
            .iter()
            .filter(|c| flags.iter().all(|f| c.has(*f)))
            .count()
    }

    /// Check that `footprint` lies on the grid and does not touch another of
    /// the player's ships.
    pub fn check_placement(&self, footprint: &Footprint) -> Result<(), GameError> {
        if !footprint.fits(self.width, self.height) {
            let (x, y) = footprint.origin();
            return Err(GameError::ShipOutOfBounds {
                length: footprint.length(),
                x,
                y,
            });
        }
        for (x, y) in footprint.cells() {
            if self.get(x, y)?.has(CellFlag::PlayerShip) {
                return Err(GameError::ShipOverlaps { x, y });
            }
        }
        Ok(())
    }

    /// Returns a random non-overlapping footprint for a ship of `length`.
    pub fn random_placement<R: Rng>(
        &self,
        rng: &mut R,
        length: u32,
    ) -> Result<Footprint, GameError> {
        for _ in 0..PLACEMENT_ATTEMPTS {
            let orientation = if rng.random() {
                Orientation::Horizontal
            } else {
                Orientation::Vertical
            };
            let (max_x, max_y) = match orientation {
                Orientation::Horizontal => {
                    (self.width.checked_sub(length), self.height.checked_sub(1))
                }
                Orientation::Vertical => (self.width.checked_sub(1), self.height.checked_sub(length)),
            };
            let (Some(max_x), Some(max_y)) = (max_x, max_y) else {
                continue;
            };
            let x = rng.random_range(0..=max_x) as i32;
            let y = rng.random_range(0..=max_y) as i32;
            let footprint = Footprint::new(length, x, y, orientation);
            if self.check_placement(&footprint).is_ok() {
                return Ok(footprint);
            }
        }
        Err(GameError::InvalidConfig("unable to find room for a ship"))
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid {}x{} {{", self.width, self.height)?;
        for row in self.cells.chunks(self.width.max(1) as usize) {
            write!(f, "  ")?;
            for cell in row {
                write!(f, "{:x}", cell.bits())?;
            }
            writeln!(f)?;
        }
        write!(f, "}}")
    }
}
