//! Peer protocol: keeps two sessions in step.
//!
//! [`PeerProtocol::start`] registers an observer on the local session that
//! turns relevant changes into outbound [`Message`]s, and spawns two tasks:
//! a send loop draining those messages into a [`MessageSink`] in order, and
//! a receive loop applying messages from a [`MessageSource`] to the session
//! as enemy actions.
//!
//! The observer runs under the session lock, so it only queues work; the
//! send loop does the actual network I/O. A message from the peer that the
//! local session rejects means the two games have diverged: the local game
//! ends without a winner, networking is torn down, and
//! [`SessionSignal::Ended`] followed by [`SessionSignal::Desynchronized`]
//! is raised.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::cell::CellFlag;
use crate::common::{GameError, Winner};
use crate::event::{ChangeEvent, Observer};
use crate::game::{GameState, Phase};
use crate::protocol::Message;
use crate::session::GameSession;
use crate::transport::{MessageSink, MessageSource};

/// Notifications for the application hosting a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionSignal {
    /// The game reached its end. Raised after every message produced before
    /// the end has been handed to the transport; on desynchronization it is
    /// raised directly, just before [`SessionSignal::Desynchronized`].
    Ended(Winner),
    /// A message from the peer could not be applied; the game was aborted.
    Desynchronized(GameError),
    /// A send or receive failed. The protocol keeps running.
    TransportFailure(String),
}

/// Work queued by the protocol observer for the send loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Message(Message),
    Signal(SessionSignal),
}

/// Translate one change into the work it causes for the peer.
pub fn outgoing_for(event: &ChangeEvent, state: &GameState) -> Vec<Outgoing> {
    let mut out = Vec::new();
    match *event {
        ChangeEvent::Phase { previous } => match state.phase() {
            Phase::PlayerReady if previous != Phase::PlayerReady => {
                out.push(Outgoing::Message(Message::Ready));
            }
            // Reached play directly: the enemy was ready before our last ship.
            Phase::Playing if previous != Phase::PlayerReady => {
                out.push(Outgoing::Message(Message::Ready));
            }
            Phase::Ended => {
                let winner = state.winner().unwrap_or(Winner::Nobody);
                out.push(Outgoing::Signal(SessionSignal::Ended(winner)));
            }
            _ => {}
        },
        ChangeEvent::Cell { x, y, previous } => {
            let Ok(current) = state.cell(x, y) else {
                return out;
            };
            let added = current.added_since(previous);
            if added.has(CellFlag::PlayerHasSeen) {
                out.push(Outgoing::Message(Message::Seen { x, y }));
            }
            if added.has(CellFlag::EnemyHasSeen) && current.has(CellFlag::PlayerShip) {
                out.push(Outgoing::Message(Message::ShipDiscovered { x, y }));
            }
        }
    }
    out
}

/// Apply a message from the peer to the local session.
pub fn apply_remote(session: &GameSession, msg: Message) -> Result<(), GameError> {
    match msg {
        Message::Ready => session.enemy_is_ready(),
        Message::Seen { x, y } => session.enemy_has_seen(x, y),
        Message::ShipDiscovered { x, y } => session.enemy_has_ship(x, y),
    }
}

struct ProtocolObserver {
    outbound: mpsc::UnboundedSender<Outgoing>,
}

impl Observer for ProtocolObserver {
    fn on_change(&self, event: &ChangeEvent, state: &GameState) -> anyhow::Result<()> {
        for item in outgoing_for(event, state) {
            self.outbound
                .send(item)
                .map_err(|_| anyhow::anyhow!("peer protocol has stopped"))?;
        }
        Ok(())
    }
}

/// Entry point of the peer protocol.
pub struct PeerProtocol;

impl PeerProtocol {
    /// Connect `session` to a peer. Must be called from within a Tokio
    /// runtime, before the session is initialized so that no outbound
    /// change is missed.
    pub fn start<S, R>(session: Arc<GameSession>, sink: S, source: R) -> PeerHandle
    where
        S: MessageSink + 'static,
        R: MessageSource + 'static,
    {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = watch::channel(false);

        let observer: Arc<dyn Observer> = Arc::new(ProtocolObserver {
            outbound: outbound_tx,
        });
        session.add_observer(Arc::clone(&observer));
        let teardown = Arc::new(Teardown {
            session: Arc::clone(&session),
            observer,
            stop: stop_tx,
        });

        let sender = tokio::spawn(send_loop(
            Box::new(sink),
            outbound_rx,
            stop_rx.clone(),
            signal_tx.clone(),
        ));
        let receiver = tokio::spawn(receive_loop(
            Arc::clone(&session),
            Box::new(source),
            stop_rx,
            Arc::clone(&teardown),
            signal_tx,
        ));
        log::info!("peer protocol started");

        PeerHandle {
            session,
            teardown,
            signals: signal_rx,
            sender: Some(sender),
            receiver: Some(receiver),
        }
    }
}

/// Stops both loops and detaches the protocol observer from the session.
struct Teardown {
    session: Arc<GameSession>,
    observer: Arc<dyn Observer>,
    stop: watch::Sender<bool>,
}

impl Teardown {
    /// Returns `true` for the call that actually stopped the protocol.
    fn run(&self) -> bool {
        let already_stopped = self.stop.send_replace(true);
        self.session.remove_observer(&self.observer);
        !already_stopped
    }

    fn is_stopped(&self) -> bool {
        *self.stop.borrow()
    }
}

/// Handle to a running peer protocol. Dropping it stops the protocol.
pub struct PeerHandle {
    session: Arc<GameSession>,
    teardown: Arc<Teardown>,
    signals: mpsc::UnboundedReceiver<SessionSignal>,
    sender: Option<JoinHandle<()>>,
    receiver: Option<JoinHandle<()>>,
}

impl PeerHandle {
    pub fn session(&self) -> &Arc<GameSession> {
        &self.session
    }

    /// Close the acceptor and any in-flight connection. Idempotent.
    pub fn stop(&self) {
        if self.teardown.run() {
            log::info!("stopping peer protocol");
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.teardown.is_stopped()
    }

    /// Wait for the next signal. `None` once both loops have exited and all
    /// signals were consumed.
    pub async fn next_signal(&mut self) -> Option<SessionSignal> {
        self.signals.recv().await
    }

    /// Signal already waiting, if any.
    pub fn try_signal(&mut self) -> Option<SessionSignal> {
        self.signals.try_recv().ok()
    }

    /// Stop and wait for both loops to finish.
    pub async fn shutdown(&mut self) {
        self.stop();
        for task in [self.sender.take(), self.receiver.take()].into_iter().flatten() {
            if let Err(e) = task.await {
                log::warn!("peer task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for PeerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn send_loop(
    sink: Box<dyn MessageSink>,
    mut outbound: mpsc::UnboundedReceiver<Outgoing>,
    mut stop: watch::Receiver<bool>,
    signals: mpsc::UnboundedSender<SessionSignal>,
) {
    loop {
        if *stop.borrow_and_update() {
            break;
        }
        let next = tokio::select! {
            biased;
            _ = stop.changed() => break,
            next = outbound.recv() => next,
        };
        match next {
            None => break,
            Some(Outgoing::Signal(signal)) => {
                let _ = signals.send(signal);
            }
            Some(Outgoing::Message(msg)) => {
                log::debug!("sending {:?}", msg);
                let sent = tokio::select! {
                    biased;
                    _ = stop.changed() => break,
                    sent = sink.send(msg) => sent,
                };
                if let Err(e) = sent {
                    log::error!("failed to send {:?}: {:#}", msg, e);
                    let _ = signals.send(SessionSignal::TransportFailure(format!(
                        "failed to send {:?}: {:#}",
                        msg, e
                    )));
                }
            }
        }
    }
    log::debug!("send loop finished");
}

async fn receive_loop(
    session: Arc<GameSession>,
    mut source: Box<dyn MessageSource>,
    mut stop: watch::Receiver<bool>,
    teardown: Arc<Teardown>,
    signals: mpsc::UnboundedSender<SessionSignal>,
) {
    loop {
        if *stop.borrow_and_update() {
            break;
        }
        let received = tokio::select! {
            biased;
            _ = stop.changed() => break,
            received = source.recv() => received,
        };
        match received {
            Ok(Some(msg)) => {
                log::debug!("applying {:?}", msg);
                if let Err(e) = apply_remote(&session, msg) {
                    log::error!("desynchronized by {:?}: {}", msg, e);
                    // Detach before ending; the send loop no longer runs.
                    teardown.run();
                    let ended_here = session.phase() != Phase::Ended;
                    match session.end_game(Winner::Nobody) {
                        Ok(()) if ended_here => {
                            let _ = signals.send(SessionSignal::Ended(Winner::Nobody));
                        }
                        Ok(()) => {}
                        Err(end) => log::warn!("could not abort game: {}", end),
                    }
                    let _ = signals.send(SessionSignal::Desynchronized(e));
                    break;
                }
            }
            Ok(None) => {
                log::info!("peer channel closed");
                break;
            }
            Err(e) => {
                if *stop.borrow() {
                    break;
                }
                log::warn!("receive failed: {:#}", e);
                let _ = signals.send(SessionSignal::TransportFailure(format!(
                    "receive failed: {:#}",
                    e
                )));
            }
        }
    }
    // Dropping the source closes the acceptor.
    drop(source);
    log::debug!("receive loop finished");
}
