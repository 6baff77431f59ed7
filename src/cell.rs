//! Per-cell flag set.
//!
//! A single grid stores both sides' knowledge, so every cell carries four
//! independent flags packed into the low bits of a `u8`. Flags only ever go
//! from unset to set; [`Cell::set`] refuses to set a flag twice.

use core::fmt;

use crate::common::GameError;

/// One independent fact about a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellFlag {
    /// One of the player's ships occupies the cell.
    PlayerShip,
    /// The player has fired at (viewed) this cell of the enemy field.
    PlayerHasSeen,
    /// The enemy revealed one of its ships in this cell.
    EnemyShip,
    /// The enemy has fired at (viewed) this cell of the player's field.
    EnemyHasSeen,
}

impl CellFlag {
    pub const ALL: [CellFlag; 4] = [
        CellFlag::PlayerShip,
        CellFlag::PlayerHasSeen,
        CellFlag::EnemyShip,
        CellFlag::EnemyHasSeen,
    ];

    /// Bit used for this flag inside a [`Cell`].
    pub const fn bit(self) -> u8 {
        match self {
            CellFlag::PlayerShip => 0b0001,
            CellFlag::PlayerHasSeen => 0b0010,
            CellFlag::EnemyShip => 0b0100,
            CellFlag::EnemyHasSeen => 0b1000,
        }
    }
}

impl TryFrom<u8> for CellFlag {
    type Error = GameError;

    /// Accepts exactly one known flag bit.
    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        CellFlag::ALL
            .into_iter()
            .find(|flag| flag.bit() == bits)
            .ok_or(GameError::InvalidFlag(bits))
    }
}

/// Flags currently set on one cell. `Cell::default()` is the empty cell.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Cell(u8);

impl Cell {
    pub const EMPTY: Cell = Cell(0);

    /// Build a cell from raw bits, rejecting unknown bits.
    pub fn from_bits(bits: u8) -> Result<Self, GameError> {
        if bits & !0b1111 != 0 {
            return Err(GameError::InvalidFlag(bits));
        }
        Ok(Cell(bits))
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn has(self, flag: CellFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    /// Copy of this cell with `flag` set, or `None` if it was already set.
    pub fn with(self, flag: CellFlag) -> Option<Cell> {
        if self.has(flag) {
            None
        } else {
            Some(Cell(self.0 | flag.bit()))
        }
    }

    /// Set `flag` in place. Returns `false` and leaves the cell alone if the
    /// flag was already set.
    pub fn set(&mut self, flag: CellFlag) -> bool {
        match self.with(flag) {
            Some(next) => {
                *self = next;
                true
            }
            None => false,
        }
    }

    /// Flags set in `self` but not in `earlier`.
    pub fn added_since(self, earlier: Cell) -> Cell {
        Cell(self.0 & !earlier.0)
    }

    /// Iterate over the flags that are set.
    pub fn flags(self) -> impl Iterator<Item = CellFlag> {
        CellFlag::ALL.into_iter().filter(move |f| self.has(*f))
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.flags()).finish()
    }
}
