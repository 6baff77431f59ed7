//! Plain-text rendering of a session for the console front-end.

use std::fmt::Write as _;
use std::io::Write;
use std::sync::{Mutex, PoisonError};

use crate::cell::{Cell, CellFlag};
use crate::common::{Side, Winner};
use crate::event::{ChangeEvent, Observer};
use crate::game::{GameState, Phase};

fn header(out: &mut String, width: u32) {
    out.push_str("    ");
    for x in 0..width {
        let _ = write!(out, "{:>3}", x);
    }
    out.push('\n');
}

fn render_grid(out: &mut String, state: &GameState, glyph: fn(Cell) -> char) {
    header(out, state.width());
    for y in 0..state.height() as i32 {
        let _ = write!(out, "  {:>2}", y);
        for x in 0..state.width() as i32 {
            let ch = state.cell(x, y).map(glyph).unwrap_or('?');
            let _ = write!(out, "  {}", ch);
        }
        out.push('\n');
    }
}

/// The player's knowledge of the enemy field.
fn enemy_glyph(cell: Cell) -> char {
    if cell.has(CellFlag::EnemyShip) {
        'X'
    } else if cell.has(CellFlag::PlayerHasSeen) {
        'o'
    } else {
        '.'
    }
}

/// The player's own field with the enemy's shots on it.
fn own_glyph(cell: Cell) -> char {
    match (cell.has(CellFlag::PlayerShip), cell.has(CellFlag::EnemyHasSeen)) {
        (true, true) => 'X',
        (true, false) => 'S',
        (false, true) => 'o',
        (false, false) => '.',
    }
}

/// Render the enemy field (top) and the player's own field (bottom).
pub fn render_board(state: &GameState) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Enemy field ({} of {} ship cells left):",
        state.remaining_enemy_ship_cells(),
        state.max_ship_cells()
    );
    render_grid(&mut out, state, enemy_glyph);
    out.push_str("    Legend: X=Hit  o=Miss  .=Unknown\n\n");
    let _ = writeln!(
        out,
        "Your field ({} of {} ship cells left):",
        state.remaining_own_ship_cells(),
        state.max_ship_cells()
    );
    render_grid(&mut out, state, own_glyph);
    out.push_str("    Legend: S=Ship  X=Hit  o=Miss  .=Water\n");
    out
}

/// One-line description of where the game stands.
pub fn describe_phase(state: &GameState) -> String {
    match state.phase() {
        Phase::Uninitialized => "Game not started.".to_string(),
        Phase::Initialized => match state.next_ship_length_to_place() {
            Some(length) => format!("Place your ship of length {}.", length),
            None => "Place your ships.".to_string(),
        },
        Phase::PlayerReady => "All ships placed. Waiting for the enemy...".to_string(),
        Phase::Playing => match state.last_actor() {
            Some(Side::Player) => "Waiting for the enemy to fire...".to_string(),
            _ => "Your turn: fire <x> <y>".to_string(),
        },
        Phase::Ended => match state.winner() {
            Some(Winner::Player) => "Game over: you won!".to_string(),
            Some(Winner::Enemy) => "Game over: the enemy won.".to_string(),
            _ => "Game over: no winner.".to_string(),
        },
    }
}

/// Advice to show after a failed send. `Ready` goes out once, when the
/// last ship is placed; if it was lost the peer waits forever.
pub fn transport_hint(state: &GameState) -> Option<&'static str> {
    match state.phase() {
        Phase::PlayerReady => {}
        Phase::Playing if state.last_actor().is_none() => {}
        _ => return None,
    }
    Some(
        "The peer may not know you are ready. It is not re-sent: start the \
         peer first, then restart this side.",
    )
}

/// Observer that redraws the boards on every phase change and on every shot.
pub struct ConsoleView<W> {
    out: Mutex<W>,
}

impl ConsoleView<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Observer for ConsoleView<W> {
    fn on_change(&self, event: &ChangeEvent, state: &GameState) -> anyhow::Result<()> {
        let redraw = match event {
            ChangeEvent::Phase { .. } => true,
            // Setup fills the grid cell by cell; only shots are worth a redraw.
            ChangeEvent::Cell { .. } => state.phase() == Phase::Playing,
        };
        if !redraw {
            return Ok(());
        }
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "\n{}{}", render_board(state), describe_phase(state))?;
        out.flush()?;
        Ok(())
    }
}
