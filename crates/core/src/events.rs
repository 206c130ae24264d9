//! Typed notifications.

use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Handle returned by [`Event::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A list of listeners for one kind of notification.
///
/// Listeners are called synchronously in subscription order. The list is
/// copied before dispatch, so a listener may subscribe or unsubscribe while
/// being notified; the change takes effect from the next emit.
pub struct Event<T> {
    listeners: Mutex<Vec<(SubscriptionId, Listener<T>)>>,
    next_id: AtomicU64,
}

impl<T> Event<T> {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(listener)));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    pub fn emit(&self, payload: &T) {
        let listeners: Vec<Listener<T>> = self.lock().iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(payload);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Listener<T>)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for Event<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for Event<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Event")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_in_subscription_order() {
        let event: Event<u32> = Event::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = seen.clone();
        event.subscribe(move |n| first.lock().unwrap().push(("first", *n)));
        let second = seen.clone();
        event.subscribe(move |n| second.lock().unwrap().push(("second", *n)));

        event.emit(&7);
        assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_unsubscribe() {
        let event: Event<()> = Event::new();
        let id = event.subscribe(|_| panic!("unsubscribed listener called"));
        assert!(event.unsubscribe(id));
        assert!(!event.unsubscribe(id));
        event.emit(&());
        assert_eq!(event.listener_count(), 0);
    }
}
