use crate::prelude::{HashMap, VecDeque};
use std::{
    hash::Hash,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

static NEXT_LISTENER_KEY: AtomicU64 = AtomicU64::new(1);

/// Handle returned by `on`/`once`, used to remove the listener again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerKey(u64);

/// Event listener callback type
pub type EventCallback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Listener<E> {
    key: ListenerKey,
    callback: EventCallback<E>,
    once: bool,
}

impl<E> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            callback: self.callback.clone(),
            once: self.once,
        }
    }
}

/// Listener registry keyed by event type.
///
/// Callbacks are invoked after the registry lock is released, so a listener
/// may register or remove listeners, or trigger further events.
pub struct EventManager<K, E> {
    /// Event listeners by event type
    listeners: Mutex<HashMap<K, Vec<Listener<E>>>>,
    /// Event queue for processing
    event_queue: Mutex<VecDeque<(K, E)>>,
}

impl<K, E> Default for EventManager<K, E> {
    fn default() -> Self {
        Self {
            listeners: Mutex::new(HashMap::default()),
            event_queue: Mutex::new(VecDeque::new()),
        }
    }
}

impl<K: Copy + Eq + Hash, E> EventManager<K, E> {
    pub fn new() -> Self {
        Self::default()
    }

    fn listeners(&self) -> MutexGuard<'_, HashMap<K, Vec<Listener<E>>>> {
        self.listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<(K, E)>> {
        self.event_queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn register(&self, event_type: K, callback: EventCallback<E>, once: bool) -> ListenerKey {
        let key = ListenerKey(NEXT_LISTENER_KEY.fetch_add(1, Ordering::Relaxed));
        self.listeners().entry(event_type).or_default().push(Listener {
            key,
            callback,
            once,
        });
        key
    }

    /// Register an event listener
    pub fn on<F>(&self, event_type: K, callback: F) -> ListenerKey
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(event_type, Arc::new(callback), false)
    }

    /// Register a listener that is removed after its first call
    pub fn once<F>(&self, event_type: K, callback: F) -> ListenerKey
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.register(event_type, Arc::new(callback), true)
    }

    /// Removes a listener; returns whether it was registered
    pub fn un(&self, key: ListenerKey) -> bool {
        let mut listeners = self.listeners();
        let mut removed = false;
        for entries in listeners.values_mut() {
            let before = entries.len();
            entries.retain(|listener| listener.key != key);
            removed |= entries.len() != before;
        }
        removed
    }

    pub fn has_listeners(&self, event_type: K) -> bool {
        self.listener_count(event_type) > 0
    }

    pub fn listener_count(&self, event_type: K) -> usize {
        self.listeners().get(&event_type).map_or(0, Vec::len)
    }

    /// Calls every listener of `event_type` now; returns how many were called
    pub fn dispatch(&self, event_type: K, event: &E) -> usize {
        let callbacks: Vec<EventCallback<E>> = {
            let mut listeners = self.listeners();
            let Some(entries) = listeners.get_mut(&event_type) else {
                return 0;
            };
            let callbacks = entries.iter().map(|l| l.callback.clone()).collect();
            entries.retain(|listener| !listener.once);
            callbacks
        };

        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    /// Emit an event to the queue
    pub fn emit(&self, event_type: K, event: E) {
        self.queue().push_back((event_type, event));
    }

    /// Dispatches all queued events in order and returns them
    pub fn process_events(&self) -> Vec<(K, E)> {
        let events: Vec<_> = self.queue().drain(..).collect();

        for (event_type, event) in &events {
            self.dispatch(*event_type, event);
        }

        events
    }

    /// Clear all events from the queue
    pub fn clear_events(&self) {
        self.queue().clear();
    }

    /// Get number of pending events
    pub fn pending_events(&self) -> usize {
        self.queue().len()
    }

    pub fn clear_listeners(&self) {
        self.listeners().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        A,
        B,
    }

    #[test]
    fn test_on_and_un() {
        let manager: EventManager<Kind, u32> = EventManager::new();
        let total = Arc::new(AtomicUsize::new(0));

        let counter = total.clone();
        let key = manager.on(Kind::A, move |value| {
            counter.fetch_add(*value as usize, Ordering::SeqCst);
        });

        assert_eq!(manager.dispatch(Kind::A, &2), 1);
        assert_eq!(manager.dispatch(Kind::B, &5), 0);
        assert_eq!(total.load(Ordering::SeqCst), 2);

        assert!(manager.un(key));
        assert!(!manager.un(key));
        assert_eq!(manager.dispatch(Kind::A, &2), 0);
    }

    #[test]
    fn test_once_listener_fires_once() {
        let manager: EventManager<Kind, ()> = EventManager::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        manager.once(Kind::A, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        manager.dispatch(Kind::A, &());
        manager.dispatch(Kind::A, &());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!manager.has_listeners(Kind::A));
    }

    #[test]
    fn test_queue_processing_preserves_order() {
        let manager: EventManager<Kind, u32> = EventManager::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        manager.on(Kind::B, move |value| sink.lock().unwrap().push(*value));

        manager.emit(Kind::B, 1);
        manager.emit(Kind::A, 2);
        manager.emit(Kind::B, 3);
        assert_eq!(manager.pending_events(), 3);

        let processed = manager.process_events();
        assert_eq!(processed.len(), 3);
        assert_eq!(*seen.lock().unwrap(), vec![1, 3]);
        assert_eq!(manager.pending_events(), 0);
    }

    #[test]
    fn test_listener_may_register_listeners() {
        let manager: Arc<EventManager<Kind, ()>> = Arc::new(EventManager::new());
        let inner = manager.clone();
        manager.on(Kind::A, move |_| {
            inner.on(Kind::B, |_| {});
        });
        manager.dispatch(Kind::A, &());
        assert_eq!(manager.listener_count(Kind::B), 1);
    }
}
