use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::error;

use super::event::{EventCategory, RecognitionEvent};

/// Observer callback. Runs on the dispatch context; long-running work must
/// be handed off by the observer itself.
pub type Observer = Arc<dyn Fn(&RecognitionEvent) + Send + Sync>;

/// Handle returned by `subscribe`, used to revoke the registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionHandle {
    category: EventCategory,
    id: u64,
}

struct Registration {
    id: u64,
    observer: Observer,
}

const CATEGORIES: usize = 5;

thread_local! {
    /// Bitmask of categories this thread is currently dispatching.
    static DISPATCHING: Cell<u8> = const { Cell::new(0) };
}

struct DispatchMark {
    mask: u8,
}

impl DispatchMark {
    fn set(category: EventCategory) -> Self {
        let mask = 1u8 << category_index(category);
        DISPATCHING.with(|d| d.set(d.get() | mask));
        Self { mask }
    }

    fn is_set(category: EventCategory) -> bool {
        DISPATCHING.with(|d| d.get()) & (1u8 << category_index(category)) != 0
    }
}

impl Drop for DispatchMark {
    fn drop(&mut self) {
        DISPATCHING.with(|d| d.set(d.get() & !self.mask));
    }
}

fn category_index(category: EventCategory) -> usize {
    match category {
        EventCategory::Connection => 0,
        EventCategory::Session => 1,
        EventCategory::Recognizing => 2,
        EventCategory::Recognized => 3,
        EventCategory::Canceled => 4,
    }
}

/// Fan-out of typed events to registered observers.
///
/// Delivery guarantees:
/// - observers for a category are invoked in registration order;
/// - events of the same category are never reordered or interleaved with
///   each other (per-category delivery lock); different categories may be
///   delivered concurrently;
/// - an observer removed via `unsubscribe` is never invoked after the call
///   returns, even if a dispatch of its category is in flight;
/// - a panicking observer is isolated: it is logged and counted, and
///   delivery continues with the remaining observers.
///
/// `subscribe` and `unsubscribe` are safe to call from within an observer
/// callback. Dispatching a new event of the same category from within a
/// callback is not supported.
pub struct EventDispatcher {
    registry: Mutex<HashMap<EventCategory, Vec<Registration>>>,
    delivery: [Mutex<()>; CATEGORIES],
    next_id: AtomicU64,
    failures: AtomicUsize,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            delivery: Default::default(),
            next_id: AtomicU64::new(1),
            failures: AtomicUsize::new(0),
        }
    }

    /// Register an observer for one event category. Observers are invoked in
    /// registration order.
    pub fn subscribe<F>(&self, category: EventCategory, observer: F) -> SubscriptionHandle
    where
        F: Fn(&RecognitionEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut registry = lock(&self.registry);
        registry.entry(category).or_default().push(Registration {
            id,
            observer: Arc::new(observer),
        });
        SubscriptionHandle { category, id }
    }

    /// Revoke a registration. Once this returns, the observer will not be
    /// invoked again: a call from outside a dispatch waits out any in-flight
    /// delivery of the category. Revoking an already-removed handle is a
    /// no-op.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        {
            let mut registry = lock(&self.registry);
            if let Some(list) = registry.get_mut(&handle.category) {
                list.retain(|r| r.id != handle.id);
            }
        }
        // From inside a callback of this category the live recheck already
        // covers the rest of the dispatch; taking the delivery lock here
        // would deadlock.
        if !DispatchMark::is_set(handle.category) {
            drop(lock(&self.delivery[category_index(handle.category)]));
        }
    }

    /// Deliver one event to every observer registered for its category.
    pub fn dispatch(&self, event: &RecognitionEvent) {
        let category = event.category();
        let _order = lock(&self.delivery[category_index(category)]);
        let _mark = DispatchMark::set(category);

        // Snapshot the registration order, then recheck liveness before each
        // invocation so an unsubscribe from inside a callback takes effect
        // within the same dispatch.
        let snapshot: Vec<u64> = {
            let registry = lock(&self.registry);
            registry
                .get(&category)
                .map(|list| list.iter().map(|r| r.id).collect())
                .unwrap_or_default()
        };

        for id in snapshot {
            let observer = {
                let registry = lock(&self.registry);
                registry
                    .get(&category)
                    .and_then(|list| list.iter().find(|r| r.id == id))
                    .map(|r| Arc::clone(&r.observer))
            };
            let Some(observer) = observer else { continue };

            if catch_unwind(AssertUnwindSafe(|| observer(event))).is_err() {
                self.failures.fetch_add(1, Ordering::Relaxed);
                error!(?category, "observer panicked during dispatch");
            }
        }
    }

    /// Number of observers registered for a category.
    pub fn observer_count(&self, category: EventCategory) -> usize {
        lock(&self.registry)
            .get(&category)
            .map(|list| list.len())
            .unwrap_or(0)
    }

    /// Number of observer callbacks that have panicked.
    pub fn observer_failures(&self) -> usize {
        self.failures.load(Ordering::Relaxed)
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

// A poisoned lock only means an observer panicked while we held it; the
// registration list itself is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> RecognitionEvent {
        RecognitionEvent::Connected {
            session_id: "test".into(),
        }
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b", "c"] {
            let seen = Arc::clone(&seen);
            dispatcher.subscribe(EventCategory::Connection, move |_| {
                seen.lock().unwrap().push(tag);
            });
        }

        dispatcher.dispatch(&connected());
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));

        let handle = {
            let count = Arc::clone(&count);
            dispatcher.subscribe(EventCategory::Connection, move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };

        dispatcher.dispatch(&connected());
        dispatcher.unsubscribe(&handle);
        dispatcher.dispatch(&connected());

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panicking_observer_does_not_block_others() {
        let dispatcher = EventDispatcher::new();
        let count = Arc::new(AtomicUsize::new(0));

        dispatcher.subscribe(EventCategory::Connection, |_| {
            panic!("observer failure");
        });
        {
            let count = Arc::clone(&count);
            dispatcher.subscribe(EventCategory::Connection, move |_| {
                count.fetch_add(1, Ordering::SeqCst);
            });
        }

        dispatcher.dispatch(&connected());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(dispatcher.observer_failures(), 1);
    }
}
