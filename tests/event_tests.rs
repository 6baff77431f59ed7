use std::sync::{Arc, Mutex};

use peerfleet::{
    Cell, CellFlag, ChangeEvent, ChangeKind, EventDispatcher, GameSession, GameState, Observer,
    Orientation, Phase, SessionConfig, Winner,
};

type Log = Arc<Mutex<Vec<(ChangeEvent, Phase)>>>;

/// Observer recording every event with the phase it observed.
fn recorder() -> (Arc<dyn Observer>, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let observer = move |event: &ChangeEvent, state: &GameState| -> anyhow::Result<()> {
        sink.lock().unwrap().push((*event, state.phase()));
        Ok(())
    };
    let observer: Arc<dyn Observer> = Arc::new(observer);
    (observer, log)
}

fn small() -> SessionConfig {
    SessionConfig::new(3, 3, &[2, 1]).unwrap()
}

#[test]
fn initialize_announces_every_cell() {
    let session = GameSession::new(SessionConfig::default());
    let (observer, log) = recorder();
    session.add_observer(observer);
    session.initialize().unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1 + 144);
    assert_eq!(
        log[0],
        (ChangeEvent::Phase { previous: Phase::Uninitialized }, Phase::Initialized)
    );
    assert_eq!(
        log[1].0,
        ChangeEvent::Cell { x: 0, y: 0, previous: Cell::EMPTY }
    );
    assert_eq!(log[13].0.coordinates(), Some((0, 1)));
    assert!(log[1..].iter().all(|(e, _)| e.kind() == ChangeKind::CELL));
}

#[test]
fn placement_events_precede_phase_change() {
    let session = GameSession::new(small());
    session.initialize().unwrap();
    let (observer, log) = recorder();
    session.add_observer(observer);

    session.place_ship(2, 0, 0, Orientation::Vertical).unwrap();
    session.place_ship(1, 2, 2, Orientation::Horizontal).unwrap();

    let log = log.lock().unwrap();
    let events: Vec<ChangeEvent> = log.iter().map(|(e, _)| *e).collect();
    assert_eq!(
        events,
        vec![
            ChangeEvent::Cell { x: 0, y: 0, previous: Cell::EMPTY },
            ChangeEvent::Cell { x: 0, y: 1, previous: Cell::EMPTY },
            ChangeEvent::Cell { x: 2, y: 2, previous: Cell::EMPTY },
            ChangeEvent::Phase { previous: Phase::Initialized },
        ]
    );
    // Observers see the state after the whole transition.
    assert!(log.iter().skip(2).all(|(_, phase)| *phase == Phase::PlayerReady));
}

#[test]
fn winning_shot_emits_cell_then_phase() {
    let session = GameSession::new(SessionConfig::new(2, 2, &[1]).unwrap());
    session.initialize().unwrap();
    session.place_ship(1, 0, 0, Orientation::Horizontal).unwrap();
    session.enemy_is_ready().unwrap();
    let (observer, log) = recorder();
    session.add_observer(observer);

    session.enemy_has_seen(0, 0).unwrap();

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(
        log[0],
        (
            ChangeEvent::Cell {
                x: 0,
                y: 0,
                previous: Cell::from_bits(CellFlag::PlayerShip.bit()).unwrap()
            },
            Phase::Ended
        )
    );
    assert_eq!(log[1].0, ChangeEvent::Phase { previous: Phase::Playing });
    assert_eq!(session.winner(), Some(Winner::Enemy));
}

#[test]
fn rejected_and_silent_transitions_emit_nothing() {
    let session = GameSession::new(small());
    session.initialize().unwrap();
    let (observer, log) = recorder();
    session.add_observer(observer);

    assert!(session.place_ship(3, 0, 0, Orientation::Horizontal).is_err());
    assert!(session.player_has_seen(0, 0).is_err());
    // Enemy readiness during setup only sets a flag.
    session.enemy_is_ready().unwrap();
    assert!(log.lock().unwrap().is_empty());

    session.end_game(Winner::Nobody).unwrap();
    session.end_game(Winner::Nobody).unwrap();
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn failing_observers_do_not_stop_delivery() {
    let session = GameSession::new(small());
    let failing = |_: &ChangeEvent, _: &GameState| -> anyhow::Result<()> {
        anyhow::bail!("observer failure")
    };
    let panicking = |_: &ChangeEvent, _: &GameState| -> anyhow::Result<()> {
        panic!("observer panic")
    };
    session.add_observer(Arc::new(failing));
    session.add_observer(Arc::new(panicking));
    let (observer, log) = recorder();
    session.add_observer(observer);

    session.initialize().unwrap();
    assert_eq!(log.lock().unwrap().len(), 1 + 9);
    assert_eq!(session.phase(), Phase::Initialized);
    // The session lock survived the panic.
    session.place_ship(1, 0, 0, Orientation::Horizontal).unwrap();
}

#[test]
fn registration_is_by_identity() {
    let session = GameSession::new(small());
    let (observer, log) = recorder();
    assert!(session.add_observer(Arc::clone(&observer)));
    assert!(!session.add_observer(Arc::clone(&observer)));
    assert_eq!(session.dispatcher().observer_count(), 1);

    session.initialize().unwrap();
    assert_eq!(log.lock().unwrap().len(), 10);

    assert!(session.remove_observer(&observer));
    assert!(!session.remove_observer(&observer));
    session.place_ship(1, 0, 0, Orientation::Horizontal).unwrap();
    assert_eq!(log.lock().unwrap().len(), 10);
}

#[test]
fn posted_dispatcher_delivers_on_pump() {
    let (dispatcher, mut pump) = EventDispatcher::posted();
    let session = GameSession::with_dispatcher(small(), dispatcher);
    let (observer, log) = recorder();
    session.add_observer(observer);

    session.initialize().unwrap();
    session.place_ship(1, 1, 1, Orientation::Horizontal).unwrap();
    assert!(log.lock().unwrap().is_empty());

    assert_eq!(pump.pump(), 11);
    let log = log.lock().unwrap();
    assert_eq!(log[0].0, ChangeEvent::Phase { previous: Phase::Uninitialized });
    assert_eq!(log[10].0, ChangeEvent::Cell { x: 1, y: 1, previous: Cell::EMPTY });
    // Each event comes with the state right after its own transition.
    assert!(log[10].1 == Phase::Initialized);
    assert_eq!(pump.pump(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn posted_observer_may_use_the_session() -> anyhow::Result<()> {
    let (dispatcher, pump) = EventDispatcher::posted();
    let session = Arc::new(GameSession::with_dispatcher(small(), dispatcher));
    let seen = Arc::new(Mutex::new(Vec::new()));

    // Weak, or the session would keep its own dispatcher alive.
    let weak = Arc::downgrade(&session);
    let sink = Arc::clone(&seen);
    let observer = move |event: &ChangeEvent, _: &GameState| -> anyhow::Result<()> {
        if let (ChangeEvent::Phase { .. }, Some(session)) = (event, weak.upgrade()) {
            sink.lock().unwrap().push(session.phase());
        }
        Ok(())
    };
    session.add_observer(Arc::new(observer));
    let pump_task = tokio::spawn(pump.run());

    session.initialize()?;
    session.place_ship(2, 0, 0, Orientation::Horizontal)?;
    session.place_ship(1, 2, 2, Orientation::Horizontal)?;

    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while seen.lock().unwrap().len() < 2 {
            tokio::task::yield_now().await;
        }
    })
    .await?;
    assert_eq!(seen.lock().unwrap().last(), Some(&Phase::PlayerReady));

    drop(session);
    pump_task.await?;
    Ok(())
}
