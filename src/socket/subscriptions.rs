use super::message::SocketMessage;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};

pub type EventCallback = Arc<dyn Fn(&Value) + Send + Sync>;
pub type StateCallback = Arc<dyn Fn(ConnectionState) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Open,
    Closed,
}

#[derive(Default)]
struct Tables {
    next_id: u64,
    events: HashMap<String, Vec<(u64, EventCallback)>>,
    observers: Vec<(u64, StateCallback)>,
}

impl Tables {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Named-event fan-out plus connection-state observers.
///
/// Callbacks are cloned out of the table before they run, so a callback may
/// subscribe or unsubscribe without deadlocking.
#[derive(Clone, Default)]
pub struct EventBus {
    tables: Arc<RwLock<Tables>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, event: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let event = event.into();
        let mut tables = self.write();
        let id = tables.next_id();
        tables
            .events
            .entry(event.clone())
            .or_default()
            .push((id, Arc::new(callback)));
        Subscription {
            tables: Arc::downgrade(&self.tables),
            target: Target::Event(event),
            id,
        }
    }

    pub fn on_state_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        let mut tables = self.write();
        let id = tables.next_id();
        tables.observers.push((id, Arc::new(callback)));
        Subscription {
            tables: Arc::downgrade(&self.tables),
            target: Target::State,
            id,
        }
    }

    /// Deliver `message` to every callback registered for its event; returns how many ran.
    pub fn dispatch(&self, message: &SocketMessage) -> usize {
        let callbacks: Vec<EventCallback> = self
            .read()
            .events
            .get(&message.event)
            .map(|subs| subs.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default();
        for cb in &callbacks {
            cb(&message.data);
        }
        callbacks.len()
    }

    pub fn notify_state(&self, state: ConnectionState) {
        let observers: Vec<StateCallback> =
            self.read().observers.iter().map(|(_, cb)| cb.clone()).collect();
        for cb in observers {
            cb(state);
        }
    }

    pub fn subscriber_count(&self, event: &str) -> usize {
        self.read().events.get(event).map(Vec::len).unwrap_or(0)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Target {
    Event(String),
    State,
}

/// Handle returned by a subscription. Dropping it keeps the callback registered;
/// call [`Subscription::unsubscribe`] to remove it.
#[must_use = "keep the handle to be able to unsubscribe"]
pub struct Subscription {
    tables: Weak<RwLock<Tables>>,
    target: Target,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        let Some(tables) = self.tables.upgrade() else {
            return;
        };
        let mut tables = tables.write().unwrap_or_else(PoisonError::into_inner);
        match &self.target {
            Target::Event(event) => {
                if let Some(subs) = tables.events.get_mut(event) {
                    subs.retain(|(id, _)| *id != self.id);
                    if subs.is_empty() {
                        tables.events.remove(event);
                    }
                }
            }
            Target::State => tables.observers.retain(|(id, _)| *id != self.id),
        }
    }
}
