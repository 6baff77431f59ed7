//! Thread-safe game session.
//!
//! [`GameSession`] is the only way to mutate a game once it is shared. Each
//! call takes the session lock, runs the check-then-act transition on the
//! inner [`GameState`] and publishes the resulting events before releasing
//! the lock, so no caller ever observes a half-applied transition.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::Rng;

use crate::cell::Cell;
use crate::common::{GameError, Side, Winner};
use crate::config::SessionConfig;
use crate::event::{EventDispatcher, Observer};
use crate::game::{Changes, GameState, Phase};
use crate::ship::{Orientation, ShipInventory};

pub struct GameSession {
    state: Mutex<GameState>,
    dispatcher: Arc<EventDispatcher>,
}

impl GameSession {
    /// Session whose observers are notified inline.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_dispatcher(config, EventDispatcher::inline())
    }

    pub fn with_dispatcher(config: SessionConfig, dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            state: Mutex::new(GameState::new(config)),
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn add_observer(&self, observer: Arc<dyn Observer>) -> bool {
        self.dispatcher.add_observer(observer)
    }

    pub fn remove_observer(&self, observer: &Arc<dyn Observer>) -> bool {
        self.dispatcher.remove_observer(observer)
    }

    fn lock(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply<F>(&self, transition: F) -> Result<(), GameError>
    where
        F: FnOnce(&mut GameState) -> Result<Changes, GameError>,
    {
        let mut state = self.lock();
        let events = transition(&mut state)?;
        self.dispatcher.publish(&events, &state);
        Ok(())
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> GameState {
        self.lock().clone()
    }

    /// Run `f` against the current state under the session lock.
    pub fn inspect<R>(&self, f: impl FnOnce(&GameState) -> R) -> R {
        f(&self.lock())
    }

    pub fn phase(&self) -> Phase {
        self.lock().phase()
    }

    pub fn winner(&self) -> Option<Winner> {
        self.lock().winner()
    }

    pub fn cell(&self, x: i32, y: i32) -> Result<Cell, GameError> {
        self.lock().cell(x, y)
    }

    pub fn width(&self) -> u32 {
        self.lock().width()
    }

    pub fn height(&self) -> u32 {
        self.lock().height()
    }

    pub fn max_ship_cells(&self) -> u32 {
        self.lock().max_ship_cells()
    }

    pub fn remaining_own_ship_cells(&self) -> u32 {
        self.lock().remaining_own_ship_cells()
    }

    pub fn remaining_enemy_ship_cells(&self) -> u32 {
        self.lock().remaining_enemy_ship_cells()
    }

    pub fn last_actor(&self) -> Option<Side> {
        self.lock().last_actor()
    }

    pub fn enemy_ready(&self) -> bool {
        self.lock().enemy_ready()
    }

    /// Copy of the ships still to place.
    pub fn remaining_ships(&self) -> ShipInventory {
        self.lock().remaining_ships().clone()
    }

    pub fn next_ship_length_to_place(&self) -> Option<u32> {
        self.lock().next_ship_length_to_place()
    }

    pub fn initialize(&self) -> Result<(), GameError> {
        self.apply(GameState::initialize)
    }

    pub fn place_ship(
        &self,
        length: u32,
        x: i32,
        y: i32,
        orientation: Orientation,
    ) -> Result<(), GameError> {
        self.apply(|state| state.place_ship(length, x, y, orientation))
    }

    pub fn place_fleet_randomly<R: Rng>(&self, rng: &mut R) -> Result<(), GameError> {
        self.apply(|state| state.place_fleet_randomly(rng))
    }

    pub fn enemy_is_ready(&self) -> Result<(), GameError> {
        self.apply(GameState::enemy_is_ready)
    }

    pub fn end_game(&self, winner: Winner) -> Result<(), GameError> {
        self.apply(|state| state.end_game(winner))
    }

    pub fn enemy_has_seen(&self, x: i32, y: i32) -> Result<(), GameError> {
        self.apply(|state| state.enemy_has_seen(x, y))
    }

    pub fn player_has_seen(&self, x: i32, y: i32) -> Result<(), GameError> {
        self.apply(|state| state.player_has_seen(x, y))
    }

    pub fn enemy_has_ship(&self, x: i32, y: i32) -> Result<(), GameError> {
        self.apply(|state| state.enemy_has_ship(x, y))
    }
}
