//! Replaying broadcast channel for published session state.
//!
//! DESIGN
//! ======
//! Each channel holds its latest value. Subscribing registers a listener and
//! immediately replays the current value to it; publishing stores the new
//! value and then calls every listener synchronously, in subscription order.
//! The lock is never held while listeners run, so a listener may publish or
//! subscribe again without deadlocking.

#[cfg(test)]
#[path = "channel_test.rs"]
mod channel_test;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

/// Handle returned by [`Channel::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Inner<T> {
    value: T,
    listeners: Vec<(SubscriptionId, Listener<T>)>,
    next_id: u64,
}

/// Publish-on-write value with replay-to-new-subscribers.
///
/// Clones share the same underlying channel.
pub struct Channel<T> {
    inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Channel")
            .field("value", &inner.value)
            .field("listeners", &inner.listeners.len())
            .finish()
    }
}

impl<T> Channel<T> {
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove a listener. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(existing, _)| *existing != id);
        inner.listeners.len() != before
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

impl<T: Clone + Send + 'static> Channel<T> {
    #[must_use]
    pub fn new(initial: T) -> Self {
        Self { inner: Arc::new(Mutex::new(Inner { value: initial, listeners: Vec::new(), next_id: 0 })) }
    }

    /// Latest published value.
    #[must_use]
    pub fn get(&self) -> T {
        self.lock().value.clone()
    }

    /// Store `value` and notify every listener, even if the value is unchanged.
    pub fn publish(&self, value: T) {
        let listeners: Vec<Listener<T>> = {
            let mut inner = self.lock();
            inner.value = value.clone();
            inner.listeners.iter().map(|(_, listener)| Arc::clone(listener)).collect()
        };
        for listener in listeners {
            listener(&value);
        }
    }

    /// Register `listener` and replay the current value to it.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let listener: Listener<T> = Arc::new(listener);
        let (id, current) = {
            let mut inner = self.lock();
            let id = SubscriptionId(inner.next_id);
            inner.next_id += 1;
            inner.listeners.push((id, Arc::clone(&listener)));
            (id, inner.value.clone())
        };
        listener(&current);
        id
    }

    /// Resolve with the first value (current or future) matching `predicate`.
    ///
    /// Dropping the returned future removes its listener.
    pub async fn wait_for<P>(&self, predicate: P) -> T
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel::<T>();
        let tx = Mutex::new(Some(tx));
        let id = self.subscribe(move |value| {
            if predicate(value) {
                if let Some(tx) = tx.lock().unwrap_or_else(PoisonError::into_inner).take() {
                    let _ = tx.send(value.clone());
                }
            }
        });
        let _guard = ListenerGuard { channel: self, id };
        match rx.await {
            Ok(value) => value,
            Err(_) => self.get(),
        }
    }
}

struct ListenerGuard<'a, T> {
    channel: &'a Channel<T>,
    id: SubscriptionId,
}

impl<T> Drop for ListenerGuard<'_, T> {
    fn drop(&mut self) {
        self.channel.unsubscribe(self.id);
    }
}
