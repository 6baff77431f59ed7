//! Common types for the session: sides, winners and rule violations.

use crate::cell::CellFlag;
use crate::game::Phase;

/// One of the two participants, seen from the local process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The local player.
    Player,
    /// The remote opponent.
    Enemy,
}

/// Outcome of a finished game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winner {
    Player,
    Enemy,
    /// The game was aborted without a winner.
    Nobody,
}

impl Winner {
    /// Integer code used at the edges of the system: -1 player, 1 enemy, 0 nobody.
    pub fn code(self) -> i32 {
        match self {
            Winner::Player => -1,
            Winner::Enemy => 1,
            Winner::Nobody => 0,
        }
    }
}

impl From<Side> for Winner {
    fn from(side: Side) -> Self {
        match side {
            Side::Player => Winner::Player,
            Side::Enemy => Winner::Enemy,
        }
    }
}

impl TryFrom<i32> for Winner {
    type Error = GameError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            -1 => Ok(Winner::Player),
            1 => Ok(Winner::Enemy),
            0 => Ok(Winner::Nobody),
            other => Err(GameError::InvalidWinner(other)),
        }
    }
}

/// Rule violations reported by the state machine.
///
/// Every operation that returns one of these leaves the session untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    /// The operation is not allowed in the current phase.
    WrongPhase { operation: &'static str, phase: Phase },
    /// Cell coordinates lie outside the grid.
    OutOfBounds { x: i32, y: i32 },
    /// The ship footprint leaves the grid.
    ShipOutOfBounds { length: u32, x: i32, y: i32 },
    /// No ship of this length is left to place.
    UnknownShipLength(u32),
    /// The ship would overlap one of the player's ships at (x, y).
    ShipOverlaps { x: i32, y: i32 },
    /// The flag is already set on this cell.
    FlagAlreadySet { x: i32, y: i32, flag: CellFlag },
    /// This side viewed the last cell and must wait for the other side.
    OutOfTurn(Side),
    /// An enemy ship was revealed on a cell the player has not seen.
    RevealBeforeSeen { x: i32, y: i32 },
    /// The game already ended with a different winner.
    WinnerConflict { current: Winner, requested: Winner },
    /// Integer winner code outside {-1, 0, 1}.
    InvalidWinner(i32),
    /// Raw cell flag bits that are not exactly one known flag.
    InvalidFlag(u8),
    /// Rejected session configuration.
    InvalidConfig(&'static str),
}

impl core::fmt::Display for GameError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GameError::WrongPhase { operation, phase } => {
                write!(f, "{} is not allowed while the game is {:?}", operation, phase)
            }
            GameError::OutOfBounds { x, y } => write!(f, "Cell ({}, {}) is out of bounds", x, y),
            GameError::ShipOutOfBounds { length, x, y } => write!(
                f,
                "Ship of length {} at ({}, {}) exceeds the field",
                length, x, y
            ),
            GameError::UnknownShipLength(length) => {
                write!(f, "No ship of length {} can be placed now", length)
            }
            GameError::ShipOverlaps { x, y } => {
                write!(f, "Ship intersects another ship at ({}, {})", x, y)
            }
            GameError::FlagAlreadySet { x, y, flag } => {
                write!(f, "Cell ({}, {}) already has {:?}", x, y, flag)
            }
            GameError::OutOfTurn(Side::Player) => {
                write!(f, "You need to wait for the enemy before viewing another cell")
            }
            GameError::OutOfTurn(Side::Enemy) => {
                write!(f, "The enemy needs to wait for you before viewing another cell")
            }
            GameError::RevealBeforeSeen { x, y } => write!(
                f,
                "Enemy ship at ({}, {}) cannot become visible without being seen first",
                x, y
            ),
            GameError::WinnerConflict { current, requested } => write!(
                f,
                "Game already finished with winner {:?}, cannot end with {:?}",
                current, requested
            ),
            GameError::InvalidWinner(code) => {
                write!(f, "Winner must be -1, 0 or 1, got {}", code)
            }
            GameError::InvalidFlag(bits) => write!(f, "Invalid cell flag bits {:#06b}", bits),
            GameError::InvalidConfig(reason) => write!(f, "Invalid session config: {}", reason),
        }
    }
}

impl std::error::Error for GameError {}
