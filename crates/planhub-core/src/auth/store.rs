//! Process-wide session state, observable with replay-of-one semantics.

use std::sync::{Arc, Mutex};

use crate::types::Session;

/// Tracing target for session store operations.
pub const TRACING_TARGET: &str = "planhub_core::auth::store";

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A single observable value: the building block behind [`SessionStore`]
/// and the coordinator's phase reporting.
///
/// Listeners are invoked synchronously, in subscription order, on every
/// `set`. A late subscriber immediately receives the value current at
/// subscription time, so components mounted after a transition still
/// observe it.
pub(crate) struct ObservableCell<T> {
    inner: Arc<Mutex<CellInner<T>>>,
}

struct CellInner<T> {
    current: T,
    listeners: Vec<(u64, Listener<T>)>,
    next_id: u64,
}

impl<T: Clone> ObservableCell<T> {
    pub(crate) fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CellInner {
                current: initial,
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Returns a snapshot of the current value.
    pub(crate) fn current(&self) -> T {
        self.inner.lock().expect("session store lock").current.clone()
    }

    /// Replaces the value and notifies every listener in subscription
    /// order. Listeners run outside the lock so a listener may read the
    /// cell without deadlocking.
    pub(crate) fn set(&self, value: T) {
        let listeners: Vec<Listener<T>> = {
            let mut inner = self.inner.lock().expect("session store lock");
            inner.current = value.clone();
            inner.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            listener(&value);
        }
    }

    /// Registers a listener and immediately replays the current value to
    /// it. The returned handle unsubscribes on drop.
    pub(crate) fn subscribe<F>(&self, listener: F) -> CellSubscription<T>
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener: Listener<T> = Arc::new(listener);
        let (id, replay) = {
            let mut inner = self.inner.lock().expect("session store lock");
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.push((id, Arc::clone(&listener)));
            (id, inner.current.clone())
        };
        listener(&replay);
        CellSubscription {
            id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Clone for ObservableCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Subscription handle for an [`ObservableCell`]; unsubscribes on drop.
pub(crate) struct CellSubscription<T> {
    id: u64,
    inner: Arc<Mutex<CellInner<T>>>,
}

impl<T> CellSubscription<T> {
    fn remove(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

impl<T> Drop for CellSubscription<T> {
    fn drop(&mut self) {
        self.remove();
    }
}

/// The single process-wide holder of "current authenticated identity or
/// none".
///
/// Cheap to clone; all clones observe the same value. Only the auth
/// coordinator mutates the store — every other component subscribes
/// read-only. The store performs no persistence of its own: a restart
/// starts from `None`, and rehydration (where a deployment supports it)
/// goes through [`AuthCoordinator::rehydrate`].
///
/// [`AuthCoordinator::rehydrate`]: super::AuthCoordinator::rehydrate
#[derive(Clone)]
pub struct SessionStore {
    cell: ObservableCell<Option<Session>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("logged_in", &self.current().is_some())
            .finish()
    }
}

impl SessionStore {
    /// Creates an empty store (no authenticated identity).
    pub fn new() -> Self {
        Self {
            cell: ObservableCell::new(None),
        }
    }

    /// Returns a snapshot of the current session. Synchronous; never
    /// triggers network activity.
    pub fn current(&self) -> Option<Session> {
        self.cell.current()
    }

    /// Registers a listener for session transitions.
    ///
    /// The listener immediately receives the last known value
    /// (replay-of-one), then every subsequent `set` in issue order.
    /// Dropping the returned [`Subscription`] unsubscribes, guaranteeing
    /// no callback fires against a torn-down component.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&Option<Session>) + Send + Sync + 'static,
    {
        Subscription {
            _inner: self.cell.subscribe(listener),
        }
    }

    /// Replaces the session and notifies subscribers.
    ///
    /// Crate-private: the auth coordinator is the only mutator.
    pub(crate) fn set(&self, session: Option<Session>) {
        tracing::debug!(
            target: TRACING_TARGET,
            logged_in = session.is_some(),
            "Session store updated"
        );
        self.cell.set(session);
    }
}

/// Subscription handle returned by [`SessionStore::subscribe`];
/// unsubscribes on drop.
pub struct Subscription {
    _inner: CellSubscription<Option<Session>>,
}

impl Subscription {
    /// Explicitly unsubscribes. Equivalent to dropping the handle.
    pub fn unsubscribe(self) {}
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::types::Identity;

    fn session(id: &str) -> Session {
        Session::new(Identity::new(id))
    }

    #[test]
    fn test_subscribe_before_any_set_replays_none() {
        let store = SessionStore::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_by_listener = Arc::clone(&seen);

        let _sub = store.subscribe(move |value| {
            seen_by_listener.lock().unwrap().push(value.is_some());
        });

        assert_eq!(seen.lock().unwrap().as_slice(), &[false]);
    }

    #[test]
    fn test_late_subscriber_replays_last_value() {
        let store = SessionStore::new();
        store.set(Some(session("u1")));

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_by_listener = Arc::clone(&seen);
        let _sub = store.subscribe(move |value| {
            seen_by_listener
                .lock()
                .unwrap()
                .push(value.as_ref().map(|s| s.identity.id.clone()));
        });

        assert_eq!(
            seen.lock().unwrap().as_slice(),
            &[Some("u1".to_string())]
        );
    }

    #[test]
    fn test_emits_in_subscription_order() {
        let store = SessionStore::new();
        let order = Arc::new(StdMutex::new(Vec::new()));

        let order_a = Arc::clone(&order);
        let _first = store.subscribe(move |_| order_a.lock().unwrap().push("a"));
        let order_b = Arc::clone(&order);
        let _second = store.subscribe(move |_| order_b.lock().unwrap().push("b"));

        order.lock().unwrap().clear();
        store.set(Some(session("u1")));

        assert_eq!(order.lock().unwrap().as_slice(), &["a", "b"]);
    }

    #[test]
    fn test_second_set_fully_replaces_first() {
        let store = SessionStore::new();
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_by_listener = Arc::clone(&seen);
        let _sub = store.subscribe(move |value| {
            seen_by_listener.lock().unwrap().push(value.clone());
        });

        store.set(Some(session("u1")));
        store.set(Some(session("u2")));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[1].as_ref().unwrap().identity.id, "u1");
        assert_eq!(seen[2].as_ref().unwrap().identity.id, "u2");
        assert_eq!(store.current().unwrap().identity.id, "u2");
    }

    #[test]
    fn test_dropped_subscription_stops_receiving() {
        let store = SessionStore::new();
        let count = Arc::new(AtomicUsize::new(0));

        let count_by_listener = Arc::clone(&count);
        let sub = store.subscribe(move |_| {
            count_by_listener.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(count.load(Ordering::SeqCst), 1); // replay

        drop(sub);
        store.set(Some(session("u1")));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_transition_to_none_is_emitted() {
        let store = SessionStore::new();
        store.set(Some(session("u1")));

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_by_listener = Arc::clone(&seen);
        let _sub = store.subscribe(move |value| {
            seen_by_listener.lock().unwrap().push(value.is_some());
        });

        store.set(None);
        assert_eq!(seen.lock().unwrap().as_slice(), &[true, false]);
    }
}
