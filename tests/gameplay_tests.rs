use peerfleet::{
    CellFlag, GameError, GameSession, Orientation, Phase, SessionConfig, Side, Winner,
};

/// Own ship cells of the fleet placed by [`playing`].
const FLEET_CELLS: [(i32, i32); 11] = [
    (0, 0),
    (1, 0),
    (2, 0),
    (3, 0),
    (4, 0),
    (0, 1),
    (1, 1),
    (2, 1),
    (0, 2),
    (1, 2),
    (0, 3),
];

fn playing() -> GameSession {
    let session = GameSession::new(SessionConfig::default());
    session.initialize().unwrap();
    session.enemy_is_ready().unwrap();
    session.place_ship(5, 0, 0, Orientation::Horizontal).unwrap();
    session.place_ship(3, 0, 1, Orientation::Horizontal).unwrap();
    session.place_ship(2, 0, 2, Orientation::Horizontal).unwrap();
    session.place_ship(1, 0, 3, Orientation::Horizontal).unwrap();
    assert_eq!(session.phase(), Phase::Playing);
    session
}

#[test]
fn shots_alternate() {
    let session = playing();
    assert_eq!(session.last_actor(), None);
    session.player_has_seen(5, 5).unwrap();
    assert_eq!(session.last_actor(), Some(Side::Player));
    assert_eq!(
        session.player_has_seen(6, 6),
        Err(GameError::OutOfTurn(Side::Player))
    );
    session.enemy_has_seen(6, 6).unwrap();
    assert_eq!(session.last_actor(), Some(Side::Enemy));
    assert_eq!(
        session.enemy_has_seen(7, 7),
        Err(GameError::OutOfTurn(Side::Enemy))
    );
    session.player_has_seen(6, 6).unwrap();
}

#[test]
fn enemy_may_fire_first() {
    let session = playing();
    session.enemy_has_seen(9, 9).unwrap();
    assert!(session.cell(9, 9).unwrap().has(CellFlag::EnemyHasSeen));
    assert_eq!(session.remaining_own_ship_cells(), 11);
}

#[test]
fn reveal_requires_a_shot() {
    let session = playing();
    assert_eq!(
        session.enemy_has_ship(4, 4),
        Err(GameError::RevealBeforeSeen { x: 4, y: 4 })
    );
    session.player_has_seen(4, 4).unwrap();
    session.enemy_has_ship(4, 4).unwrap();
    assert_eq!(session.remaining_enemy_ship_cells(), 10);
    // Reveals are not turns.
    assert_eq!(session.last_actor(), Some(Side::Player));
    assert_eq!(
        session.player_has_seen(5, 4),
        Err(GameError::OutOfTurn(Side::Player))
    );
}

#[test]
fn flags_are_set_once() {
    let session = playing();
    session.player_has_seen(4, 4).unwrap();
    // The repeated flag is reported before the turn violation.
    assert_eq!(
        session.player_has_seen(4, 4),
        Err(GameError::FlagAlreadySet {
            x: 4,
            y: 4,
            flag: CellFlag::PlayerHasSeen
        })
    );
    session.enemy_has_seen(4, 4).unwrap();
    session.enemy_has_ship(4, 4).unwrap();
    assert_eq!(
        session.enemy_has_ship(4, 4),
        Err(GameError::FlagAlreadySet {
            x: 4,
            y: 4,
            flag: CellFlag::EnemyShip
        })
    );
    assert_eq!(session.remaining_enemy_ship_cells(), 10);
}

#[test]
fn out_of_bounds_before_phase() {
    let session = GameSession::new(SessionConfig::default());
    session.initialize().unwrap();
    assert_eq!(
        session.player_has_seen(12, 0),
        Err(GameError::OutOfBounds { x: 12, y: 0 })
    );
    assert!(matches!(
        session.player_has_seen(0, 0),
        Err(GameError::WrongPhase { phase: Phase::Initialized, .. })
    ));

    let session = playing();
    assert_eq!(
        session.enemy_has_seen(-1, 3),
        Err(GameError::OutOfBounds { x: -1, y: 3 })
    );
    assert_eq!(
        session.enemy_has_ship(0, 12),
        Err(GameError::OutOfBounds { x: 0, y: 12 })
    );
    assert_eq!(session.cell(3, -2), Err(GameError::OutOfBounds { x: 3, y: -2 }));
}

#[test]
fn enemy_sinks_fleet() {
    let session = playing();
    for (i, &(x, y)) in FLEET_CELLS.iter().enumerate() {
        session.enemy_has_seen(x, y).unwrap();
        assert_eq!(session.remaining_own_ship_cells(), 10 - i as u32);
        if i + 1 < FLEET_CELLS.len() {
            session.player_has_seen(i as i32, 11).unwrap();
        }
    }
    assert_eq!(session.phase(), Phase::Ended);
    assert_eq!(session.winner(), Some(Winner::Enemy));
    assert_eq!(session.snapshot().grid().count(&[CellFlag::PlayerShip, CellFlag::EnemyHasSeen]), 11);

    assert!(matches!(
        session.player_has_seen(11, 11),
        Err(GameError::WrongPhase { phase: Phase::Ended, .. })
    ));
}

#[test]
fn misses_do_not_count() {
    let session = playing();
    session.enemy_has_seen(11, 11).unwrap();
    session.player_has_seen(0, 0).unwrap();
    session.enemy_has_seen(0, 0).unwrap();
    assert_eq!(session.remaining_own_ship_cells(), 10);
    assert_eq!(session.remaining_enemy_ship_cells(), 11);
}

#[test]
fn player_sinks_enemy_fleet() {
    let session = playing();
    for x in 0..11 {
        session.player_has_seen(x, 6).unwrap();
        session.enemy_has_ship(x, 6).unwrap();
        if x < 10 {
            session.enemy_has_seen(x, 11).unwrap();
        }
    }
    assert_eq!(session.remaining_enemy_ship_cells(), 0);
    assert_eq!(session.phase(), Phase::Ended);
    assert_eq!(session.winner(), Some(Winner::Player));
    assert_eq!(session.remaining_own_ship_cells(), 11);
}

#[test]
fn end_game_is_idempotent_per_winner() {
    let session = playing();
    session.end_game(Winner::Player).unwrap();
    let ended = session.snapshot();
    session.end_game(Winner::Player).unwrap();
    assert_eq!(session.snapshot(), ended);
    assert_eq!(
        session.end_game(Winner::Enemy),
        Err(GameError::WinnerConflict {
            current: Winner::Player,
            requested: Winner::Enemy
        })
    );
    assert_eq!(session.winner(), Some(Winner::Player));
}

#[test]
fn end_game_from_any_phase() {
    let session = GameSession::new(SessionConfig::default());
    session.end_game(Winner::Nobody).unwrap();
    assert_eq!(session.phase(), Phase::Ended);
    assert_eq!(session.winner(), Some(Winner::Nobody));
    assert!(matches!(
        session.initialize(),
        Err(GameError::WrongPhase { phase: Phase::Ended, .. })
    ));
}

#[test]
fn winner_codes() {
    assert_eq!(Winner::Player.code(), -1);
    assert_eq!(Winner::Enemy.code(), 1);
    assert_eq!(Winner::Nobody.code(), 0);
    assert_eq!(Winner::try_from(-1), Ok(Winner::Player));
    assert_eq!(Winner::try_from(1), Ok(Winner::Enemy));
    assert_eq!(Winner::try_from(0), Ok(Winner::Nobody));
    assert_eq!(Winner::try_from(2), Err(GameError::InvalidWinner(2)));
    assert_eq!(Winner::from(Side::Enemy), Winner::Enemy);
}

#[test]
fn errors_read_well() {
    let msg = GameError::OutOfTurn(Side::Player).to_string();
    assert!(msg.contains("wait for the enemy"));
    let msg = GameError::ShipOutOfBounds { length: 5, x: 8, y: 0 }.to_string();
    assert!(msg.contains("exceeds the field"));
}
