//! Observable state holder shared by the session and notes layers.
//!
//! # Responsibility
//! - Hold one value and notify subscribers after every change.
//! - Provide explicit subscribe/unsubscribe handles for UI surfaces.
//!
//! # Invariants
//! - A new subscriber receives the current value once, synchronously, before
//!   `subscribe` returns.
//! - Notifications are dispatched one change at a time; a subscriber never
//!   observes a value older than one it already received from another thread.
//! - Subscribers are invoked outside the value lock, so they may call `get`.
//!
//! # Lifecycle
//! Created with an initial value by its owner; `clear_subscribers` detaches
//! every subscriber at teardown.

use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle returned by `Observable::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Value holder with synchronous change notification.
pub struct Observable<T> {
    value: RwLock<T>,
    subscribers: Mutex<BTreeMap<SubscriptionId, Subscriber<T>>>,
    next_id: AtomicU64,
    dispatch: ReentrantMutex<()>,
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        Self {
            value: RwLock::new(initial),
            subscribers: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            dispatch: ReentrantMutex::new(()),
        }
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Reads the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.read())
    }

    /// Replaces the value and notifies subscribers.
    pub fn set(&self, value: T) {
        self.update(|current| *current = value);
    }

    /// Mutates the value in place and notifies subscribers.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let _dispatch = self.dispatch.lock();
        let (result, snapshot) = {
            let mut value = self.value.write();
            let result = f(&mut value);
            (result, value.clone())
        };
        self.notify(&snapshot);
        result
    }

    /// Mutates the value in place; notifies only when `f` reports a change.
    pub fn update_if(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        let _dispatch = self.dispatch.lock();
        let snapshot = {
            let mut value = self.value.write();
            if !f(&mut value) {
                return false;
            }
            value.clone()
        };
        self.notify(&snapshot);
        true
    }

    /// Registers `subscriber` and immediately delivers the current value.
    pub fn subscribe(&self, subscriber: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let _dispatch = self.dispatch.lock();
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscriber: Subscriber<T> = Arc::new(subscriber);
        self.subscribers.lock().insert(id, subscriber.clone());
        let snapshot = self.get();
        subscriber(&snapshot);
        id
    }

    /// Detaches one subscriber; returns `false` when it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.lock().remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Detaches every subscriber.
    pub fn clear_subscribers(&self) {
        self.subscribers.lock().clear();
    }

    fn notify(&self, snapshot: &T) {
        let subscribers = self
            .subscribers
            .lock()
            .values()
            .cloned()
            .collect::<Vec<_>>();
        for subscriber in subscribers {
            subscriber(snapshot);
        }
    }
}

impl<T: Clone + Default + Send + Sync + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::Observable;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<i32>>>, impl Fn(&i32) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |value: &i32| sink.lock().push(*value))
    }

    #[test]
    fn subscribe_delivers_current_value_then_changes() {
        let observable = Observable::new(1);
        let (seen, subscriber) = recorder();
        observable.subscribe(subscriber);
        observable.set(2);
        observable.update(|value| *value += 10);
        assert_eq!(*seen.lock(), vec![1, 2, 12]);
        assert_eq!(observable.get(), 12);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let observable = Observable::new(0);
        let (seen, subscriber) = recorder();
        let id = observable.subscribe(subscriber);
        assert!(observable.unsubscribe(id));
        assert!(!observable.unsubscribe(id));
        observable.set(5);
        assert_eq!(*seen.lock(), vec![0]);
        assert_eq!(observable.subscriber_count(), 0);
    }

    #[test]
    fn subscribers_may_read_the_value_during_notification() {
        let observable = Arc::new(Observable::new(String::from("a")));
        let inner = observable.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        observable.subscribe(move |_| sink.lock().push(inner.get()));
        observable.set("b".to_string());
        assert_eq!(*seen.lock(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn update_if_skips_notification_without_change() {
        let observable = Observable::new(4);
        let (seen, subscriber) = recorder();
        observable.subscribe(subscriber);
        assert!(!observable.update_if(|value| *value > 10));
        assert!(observable.update_if(|value| {
            *value = 7;
            true
        }));
        assert_eq!(*seen.lock(), vec![4, 7]);
    }

    #[test]
    fn clear_subscribers_detaches_everyone() {
        let observable = Observable::new(0);
        let (seen, subscriber) = recorder();
        observable.subscribe(subscriber);
        let (_, other) = recorder();
        observable.subscribe(other);
        observable.clear_subscribers();
        observable.set(3);
        assert_eq!(*seen.lock(), vec![0]);
    }
}
