//! Change notification.
//!
//! Every successful transition produces [`ChangeEvent`]s that the
//! [`EventDispatcher`] fans out to registered [`Observer`]s. Events carry the
//! *previous* value; observers read the current value from the [`GameState`]
//! handed to them alongside the event.
//!
//! Delivery runs on one notification context. An inline dispatcher calls the
//! observers on the mutating thread while the session lock is held, so an
//! observer must never call back into the session that notified it. A posted
//! dispatcher hands each event, once, to a [`NotificationPump`] that delivers
//! it wherever the pump is driven.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::mpsc;

use crate::cell::Cell;
use crate::game::{GameState, Phase};

/// What kind of change an event describes, as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChangeKind(u8);

impl ChangeKind {
    pub const PHASE: ChangeKind = ChangeKind(0b01);
    pub const CELL: ChangeKind = ChangeKind(0b10);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: ChangeKind) -> bool {
        self.0 & other.0 == other.0
    }
}

/// A single change to a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The phase changed; carries the phase before the change.
    Phase { previous: Phase },
    /// A cell changed; carries its value before the change.
    Cell { x: i32, y: i32, previous: Cell },
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Phase { .. } => ChangeKind::PHASE,
            ChangeEvent::Cell { .. } => ChangeKind::CELL,
        }
    }

    /// Coordinates of a cell event.
    pub fn coordinates(&self) -> Option<(i32, i32)> {
        match *self {
            ChangeEvent::Cell { x, y, .. } => Some((x, y)),
            ChangeEvent::Phase { .. } => None,
        }
    }
}

/// Receives change notifications.
pub trait Observer: Send + Sync {
    /// Called once per event. `state` is the session state after the
    /// transition that produced the event. Errors are logged and dropped.
    fn on_change(&self, event: &ChangeEvent, state: &GameState) -> anyhow::Result<()>;
}

impl<F> Observer for F
where
    F: Fn(&ChangeEvent, &GameState) -> anyhow::Result<()> + Send + Sync,
{
    fn on_change(&self, event: &ChangeEvent, state: &GameState) -> anyhow::Result<()> {
        self(event, state)
    }
}

/// An event waiting on the notification context, with the state it refers to.
#[derive(Debug)]
pub struct Notification {
    pub event: ChangeEvent,
    pub state: Arc<GameState>,
}

enum Context {
    Inline,
    Posted(mpsc::UnboundedSender<Notification>),
}

/// Fans events out to observers.
pub struct EventDispatcher {
    observers: Mutex<Vec<Arc<dyn Observer>>>,
    context: Context,
}

impl EventDispatcher {
    /// Dispatcher that notifies observers on the mutating thread.
    pub fn inline() -> Arc<Self> {
        Arc::new(Self {
            observers: Mutex::new(Vec::new()),
            context: Context::Inline,
        })
    }

    /// Dispatcher that posts every event to the returned pump.
    pub fn posted() -> (Arc<Self>, NotificationPump) {
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = Arc::new(Self {
            observers: Mutex::new(Vec::new()),
            context: Context::Posted(tx),
        });
        let pump = NotificationPump {
            rx,
            dispatcher: Arc::downgrade(&dispatcher),
        };
        (dispatcher, pump)
    }

    /// Register `observer`. Returns `false` if it was already registered.
    pub fn add_observer(&self, observer: Arc<dyn Observer>) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        if observers.iter().any(|o| same_observer(o, &observer)) {
            return false;
        }
        observers.push(observer);
        true
    }

    /// Unregister `observer`. Returns `false` if it was not registered.
    pub fn remove_observer(&self, observer: &Arc<dyn Observer>) -> bool {
        let mut observers = self.observers.lock().unwrap_or_else(PoisonError::into_inner);
        let before = observers.len();
        observers.retain(|o| !same_observer(o, observer));
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Publish the events of one transition. Called with the session lock
    /// held so events leave in mutation order.
    pub(crate) fn publish(&self, events: &[ChangeEvent], state: &GameState) {
        if events.is_empty() {
            return;
        }
        match &self.context {
            Context::Inline => {
                for event in events {
                    self.deliver(event, state);
                }
            }
            Context::Posted(tx) => {
                let snapshot = Arc::new(state.clone());
                for event in events {
                    let notification = Notification {
                        event: *event,
                        state: Arc::clone(&snapshot),
                    };
                    if tx.send(notification).is_err() {
                        log::debug!("notification pump is gone, dropping {:?}", event);
                    }
                }
            }
        }
    }

    fn deliver(&self, event: &ChangeEvent, state: &GameState) {
        // Snapshot so observers may (un)register while being notified.
        let observers = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            match panic::catch_unwind(AssertUnwindSafe(|| observer.on_change(event, state))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => log::warn!("observer failed on {:?}: {:#}", event, e),
                Err(_) => log::warn!("observer panicked on {:?}", event),
            }
        }
    }
}

fn same_observer(a: &Arc<dyn Observer>, b: &Arc<dyn Observer>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// Drives delivery for a posted [`EventDispatcher`].
pub struct NotificationPump {
    rx: mpsc::UnboundedReceiver<Notification>,
    dispatcher: Weak<EventDispatcher>,
}

impl NotificationPump {
    /// Deliver everything queued so far without waiting. Returns the number
    /// of events delivered.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(notification) = self.rx.try_recv() {
            if self.deliver(notification) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Deliver events until the dispatcher is dropped.
    pub async fn run(mut self) {
        while let Some(notification) = self.rx.recv().await {
            self.deliver(notification);
        }
    }

    /// Blocking variant of [`NotificationPump::run`] for a dedicated thread.
    /// Must not be called from within an async runtime.
    pub fn run_blocking(mut self) {
        while let Some(notification) = self.rx.blocking_recv() {
            self.deliver(notification);
        }
    }

    fn deliver(&self, notification: Notification) -> bool {
        match self.dispatcher.upgrade() {
            Some(dispatcher) => {
                dispatcher.deliver(&notification.event, &notification.state);
                true
            }
            None => false,
        }
    }
}
