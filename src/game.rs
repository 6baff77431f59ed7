//! The game state machine.
//!
//! [`GameState`] owns the grid, the inventory and the turn bookkeeping of one
//! game. Each transition validates everything before it writes anything, so a
//! rejected call leaves the state exactly as it was. Successful transitions
//! return the [`ChangeEvent`]s they caused, in order; publishing them is the
//! job of [`crate::session::GameSession`].

use rand::Rng;

use crate::board::Grid;
use crate::cell::{Cell, CellFlag};
use crate::common::{GameError, Side, Winner};
use crate::config::SessionConfig;
use crate::event::ChangeEvent;
use crate::ship::{Footprint, Orientation, ShipInventory};

/// Lifecycle stage of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Uninitialized,
    /// Ships are being placed.
    Initialized,
    /// All own ships are placed, waiting for the enemy.
    PlayerReady,
    /// Both sides are ready and shots are being exchanged.
    Playing,
    Ended,
}

/// Result of a successful transition: the events it produced, in order.
pub type Changes = Vec<ChangeEvent>;

/// Complete state of one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    config: SessionConfig,
    phase: Phase,
    grid: Grid,
    inventory: ShipInventory,
    own_ship_cells: u32,
    enemy_ship_cells: u32,
    enemy_ready: bool,
    last_actor: Option<Side>,
    winner: Option<Winner>,
}

impl GameState {
    /// Create an uninitialized game for `config`.
    pub fn new(config: SessionConfig) -> Self {
        let grid = Grid::new(config.width(), config.height());
        let max = config.max_ship_cells();
        Self {
            config,
            phase: Phase::Uninitialized,
            grid,
            inventory: ShipInventory::default(),
            own_ship_cells: max,
            enemy_ship_cells: max,
            enemy_ready: false,
            last_actor: None,
            winner: None,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Winner of the game, set once the game has ended.
    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn width(&self) -> u32 {
        self.grid.width()
    }

    pub fn height(&self) -> u32 {
        self.grid.height()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn cell(&self, x: i32, y: i32) -> Result<Cell, GameError> {
        self.grid.get(x, y)
    }

    pub fn max_ship_cells(&self) -> u32 {
        self.config.max_ship_cells()
    }

    /// Own ship cells the enemy has not found yet.
    pub fn remaining_own_ship_cells(&self) -> u32 {
        self.own_ship_cells
    }

    /// Enemy ship cells the player has not found yet.
    pub fn remaining_enemy_ship_cells(&self) -> u32 {
        self.enemy_ship_cells
    }

    pub fn enemy_ready(&self) -> bool {
        self.enemy_ready
    }

    /// Side that viewed a cell most recently.
    pub fn last_actor(&self) -> Option<Side> {
        self.last_actor
    }

    /// Ships still waiting to be placed.
    pub fn remaining_ships(&self) -> &ShipInventory {
        &self.inventory
    }

    /// Length of the ship to place next, only while placing ships.
    pub fn next_ship_length_to_place(&self) -> Option<u32> {
        if self.phase == Phase::Initialized {
            self.inventory.next_length()
        } else {
            None
        }
    }

    /// Start a game: empty grid, full inventory, fresh counters.
    pub fn initialize(&mut self) -> Result<Changes, GameError> {
        let previous = self.phase;
        if previous != Phase::Uninitialized {
            return Err(GameError::WrongPhase {
                operation: "initialize",
                phase: previous,
            });
        }

        let max = self.config.max_ship_cells();
        self.grid.clear();
        self.inventory = ShipInventory::new(self.config.fleet());
        self.own_ship_cells = max;
        self.enemy_ship_cells = max;
        self.enemy_ready = false;
        self.last_actor = None;
        self.winner = None;
        self.phase = Phase::Initialized;

        let mut events = Vec::with_capacity(1 + self.grid.coordinates().count());
        events.push(ChangeEvent::Phase { previous });
        events.extend(self.grid.coordinates().map(|(x, y)| ChangeEvent::Cell {
            x,
            y,
            previous: Cell::EMPTY,
        }));
        Ok(events)
    }

    /// Place one of the player's ships with its top-left cell at (`x`, `y`).
    pub fn place_ship(
        &mut self,
        length: u32,
        x: i32,
        y: i32,
        orientation: Orientation,
    ) -> Result<Changes, GameError> {
        let previous = self.phase;
        if previous != Phase::Initialized {
            return Err(GameError::WrongPhase {
                operation: "place ship",
                phase: previous,
            });
        }
        let index = self
            .inventory
            .find(length)
            .ok_or(GameError::UnknownShipLength(length))?;
        let footprint = Footprint::new(length, x, y, orientation);
        self.grid.check_placement(&footprint)?;

        self.inventory.take(index);
        let mut events = Vec::with_capacity(length as usize + 1);
        for (cx, cy) in footprint.cells() {
            let cell = self.grid.set(cx, cy, CellFlag::PlayerShip)?;
            events.push(ChangeEvent::Cell {
                x: cx,
                y: cy,
                previous: cell,
            });
        }

        if self.inventory.is_empty() {
            self.phase = if self.enemy_ready {
                Phase::Playing
            } else {
                Phase::PlayerReady
            };
            events.push(ChangeEvent::Phase { previous });
        }
        Ok(events)
    }

    /// Place every remaining ship at random. Either all ships are placed or
    /// none is.
    pub fn place_fleet_randomly<R: Rng>(&mut self, rng: &mut R) -> Result<Changes, GameError> {
        let mut draft = self.clone();
        let mut events = Vec::new();
        while let Some(length) = draft.next_ship_length_to_place() {
            let footprint = draft.grid.random_placement(rng, length)?;
            let (x, y) = footprint.origin();
            events.extend(draft.place_ship(length, x, y, footprint.orientation())?);
        }
        if events.is_empty() {
            return Err(GameError::WrongPhase {
                operation: "place ship",
                phase: self.phase,
            });
        }
        *self = draft;
        Ok(events)
    }

    /// The enemy has placed all of its ships.
    pub fn enemy_is_ready(&mut self) -> Result<Changes, GameError> {
        let previous = self.phase;
        if previous != Phase::Initialized && previous != Phase::PlayerReady {
            return Err(GameError::WrongPhase {
                operation: "enemy ready",
                phase: previous,
            });
        }
        self.enemy_ready = true;
        if previous == Phase::PlayerReady {
            self.phase = Phase::Playing;
            return Ok(vec![ChangeEvent::Phase { previous }]);
        }
        Ok(Vec::new())
    }

    /// Finish the game. Ending an ended game again with the same winner is a
    /// no-op; with another winner it fails.
    pub fn end_game(&mut self, winner: Winner) -> Result<Changes, GameError> {
        let previous = self.phase;
        if previous == Phase::Ended {
            return match self.winner {
                Some(current) if current != winner => Err(GameError::WinnerConflict {
                    current,
                    requested: winner,
                }),
                _ => Ok(Vec::new()),
            };
        }
        self.phase = Phase::Ended;
        self.winner = Some(winner);
        self.inventory.clear();
        Ok(vec![ChangeEvent::Phase { previous }])
    }

    /// The enemy fired at (`x`, `y`) on the player's field.
    pub fn enemy_has_seen(&mut self, x: i32, y: i32) -> Result<Changes, GameError> {
        self.apply_cell_flag(x, y, CellFlag::EnemyHasSeen)
    }

    /// The player fired at (`x`, `y`) on the enemy's field.
    pub fn player_has_seen(&mut self, x: i32, y: i32) -> Result<Changes, GameError> {
        self.apply_cell_flag(x, y, CellFlag::PlayerHasSeen)
    }

    /// The enemy revealed that the player's shot at (`x`, `y`) hit a ship.
    pub fn enemy_has_ship(&mut self, x: i32, y: i32) -> Result<Changes, GameError> {
        self.apply_cell_flag(x, y, CellFlag::EnemyShip)
    }

    fn apply_cell_flag(&mut self, x: i32, y: i32, flag: CellFlag) -> Result<Changes, GameError> {
        let cell = self.grid.get(x, y)?;
        let previous = self.phase;
        if previous != Phase::Playing {
            return Err(GameError::WrongPhase {
                operation: operation_name(flag),
                phase: previous,
            });
        }
        let updated = cell
            .with(flag)
            .ok_or(GameError::FlagAlreadySet { x, y, flag })?;

        match (flag, self.last_actor) {
            (CellFlag::PlayerHasSeen, Some(Side::Player)) => {
                return Err(GameError::OutOfTurn(Side::Player));
            }
            (CellFlag::EnemyHasSeen, Some(Side::Enemy)) => {
                return Err(GameError::OutOfTurn(Side::Enemy));
            }
            _ => {}
        }

        if flag == CellFlag::EnemyShip && !updated.has(CellFlag::PlayerHasSeen) {
            return Err(GameError::RevealBeforeSeen { x, y });
        }

        // A single flag scores for at most one side.
        let scorer = match flag {
            CellFlag::EnemyHasSeen if updated.has(CellFlag::PlayerShip) => Some(Side::Enemy),
            CellFlag::EnemyShip => Some(Side::Player),
            _ => None,
        };

        self.grid.set(x, y, flag)?;
        match scorer {
            Some(Side::Enemy) => {
                self.own_ship_cells = self.own_ship_cells.saturating_sub(1);
                if self.own_ship_cells == 0 {
                    self.finish(Winner::Enemy);
                }
            }
            Some(Side::Player) => {
                self.enemy_ship_cells = self.enemy_ship_cells.saturating_sub(1);
                if self.enemy_ship_cells == 0 {
                    self.finish(Winner::Player);
                }
            }
            None => {}
        }
        match flag {
            CellFlag::PlayerHasSeen => self.last_actor = Some(Side::Player),
            CellFlag::EnemyHasSeen => self.last_actor = Some(Side::Enemy),
            _ => {}
        }

        let mut events = vec![ChangeEvent::Cell {
            x,
            y,
            previous: cell,
        }];
        if self.phase != previous {
            events.push(ChangeEvent::Phase { previous });
        }
        Ok(events)
    }

    fn finish(&mut self, winner: Winner) {
        self.phase = Phase::Ended;
        self.winner = Some(winner);
        self.inventory.clear();
    }
}

fn operation_name(flag: CellFlag) -> &'static str {
    match flag {
        CellFlag::PlayerShip => "place ship",
        CellFlag::PlayerHasSeen => "player has seen",
        CellFlag::EnemyShip => "enemy has ship",
        CellFlag::EnemyHasSeen => "enemy has seen",
    }
}
