// Tests for the event dispatcher's delivery guarantees: registration-order
// delivery, exactly-once semantics under subscribe/unsubscribe interleaving,
// and observer failure isolation.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use speechflow::{EventCategory, EventDispatcher, RecognitionEvent, SubscriptionHandle};

fn connection_event(n: u32) -> RecognitionEvent {
    RecognitionEvent::Connected {
        session_id: format!("session-{}", n),
    }
}

#[test]
fn test_every_registered_observer_sees_every_event_in_order() {
    let dispatcher = EventDispatcher::new();
    let log: Arc<Mutex<Vec<(&str, String)>>> = Arc::new(Mutex::new(Vec::new()));

    for tag in ["first", "second", "third"] {
        let log = Arc::clone(&log);
        dispatcher.subscribe(EventCategory::Connection, move |event| {
            log.lock()
                .unwrap()
                .push((tag, event.session_id().to_string()));
        });
    }

    dispatcher.dispatch(&connection_event(1));
    dispatcher.dispatch(&connection_event(2));

    let log = log.lock().unwrap();
    assert_eq!(
        *log,
        vec![
            ("first", "session-1".to_string()),
            ("second", "session-1".to_string()),
            ("third", "session-1".to_string()),
            ("first", "session-2".to_string()),
            ("second", "session-2".to_string()),
            ("third", "session-2".to_string()),
        ]
    );
}

#[test]
fn test_interleaved_subscribe_unsubscribe_exactly_once() {
    let dispatcher = EventDispatcher::new();
    let a_count = Arc::new(AtomicUsize::new(0));
    let b_count = Arc::new(AtomicUsize::new(0));

    let a = {
        let a_count = Arc::clone(&a_count);
        dispatcher.subscribe(EventCategory::Connection, move |_| {
            a_count.fetch_add(1, Ordering::SeqCst);
        })
    };
    dispatcher.dispatch(&connection_event(1));

    let _b = {
        let b_count = Arc::clone(&b_count);
        dispatcher.subscribe(EventCategory::Connection, move |_| {
            b_count.fetch_add(1, Ordering::SeqCst);
        })
    };
    dispatcher.dispatch(&connection_event(2));

    dispatcher.unsubscribe(&a);
    dispatcher.dispatch(&connection_event(3));

    assert_eq!(a_count.load(Ordering::SeqCst), 2);
    assert_eq!(b_count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_observer_can_unsubscribe_itself_mid_callback() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let self_count = Arc::new(AtomicUsize::new(0));
    let other_count = Arc::new(AtomicUsize::new(0));
    let own_handle: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));

    let handle = {
        let dispatcher = Arc::clone(&dispatcher);
        let self_count = Arc::clone(&self_count);
        let own_handle = Arc::clone(&own_handle);
        dispatcher.clone().subscribe(EventCategory::Connection, move |_| {
            self_count.fetch_add(1, Ordering::SeqCst);
            if let Some(handle) = own_handle.lock().unwrap().take() {
                dispatcher.unsubscribe(&handle);
            }
        })
    };
    *own_handle.lock().unwrap() = Some(handle);

    {
        let other_count = Arc::clone(&other_count);
        dispatcher.subscribe(EventCategory::Connection, move |_| {
            other_count.fetch_add(1, Ordering::SeqCst);
        });
    }

    dispatcher.dispatch(&connection_event(1));
    dispatcher.dispatch(&connection_event(2));

    // The self-unsubscriber ran once; the unrelated observer was not skipped.
    assert_eq!(self_count.load(Ordering::SeqCst), 1);
    assert_eq!(other_count.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unsubscribing_a_later_observer_mid_dispatch_skips_it() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let b_count = Arc::new(AtomicUsize::new(0));
    let b_handle: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));

    {
        let dispatcher = Arc::clone(&dispatcher);
        let b_handle = Arc::clone(&b_handle);
        dispatcher.clone().subscribe(EventCategory::Connection, move |_| {
            if let Some(handle) = b_handle.lock().unwrap().take() {
                dispatcher.unsubscribe(&handle);
            }
        });
    }
    let handle = {
        let b_count = Arc::clone(&b_count);
        dispatcher.subscribe(EventCategory::Connection, move |_| {
            b_count.fetch_add(1, Ordering::SeqCst);
        })
    };
    *b_handle.lock().unwrap() = Some(handle);

    dispatcher.dispatch(&connection_event(1));

    // B was removed by A before its turn came; it must not fire at all.
    assert_eq!(b_count.load(Ordering::SeqCst), 0);
}

#[test]
fn test_subscribe_during_dispatch_applies_to_next_event() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let late_count = Arc::new(AtomicUsize::new(0));
    let registered = Arc::new(AtomicUsize::new(0));

    {
        let dispatcher = Arc::clone(&dispatcher);
        let late_count = Arc::clone(&late_count);
        let registered = Arc::clone(&registered);
        dispatcher.clone().subscribe(EventCategory::Connection, move |_| {
            if registered.fetch_add(1, Ordering::SeqCst) == 0 {
                let late_count = Arc::clone(&late_count);
                dispatcher.subscribe(EventCategory::Connection, move |_| {
                    late_count.fetch_add(1, Ordering::SeqCst);
                });
            }
        });
    }

    dispatcher.dispatch(&connection_event(1));
    assert_eq!(late_count.load(Ordering::SeqCst), 0);

    dispatcher.dispatch(&connection_event(2));
    assert_eq!(late_count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_categories_are_independent() {
    let dispatcher = EventDispatcher::new();
    let connection_count = Arc::new(AtomicUsize::new(0));

    {
        let connection_count = Arc::clone(&connection_count);
        dispatcher.subscribe(EventCategory::Connection, move |_| {
            connection_count.fetch_add(1, Ordering::SeqCst);
        });
    }

    dispatcher.dispatch(&RecognitionEvent::SessionStarted {
        session_id: "s".into(),
    });
    assert_eq!(connection_count.load(Ordering::SeqCst), 0);

    dispatcher.dispatch(&connection_event(1));
    assert_eq!(connection_count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unsubscribe_from_another_thread_waits_for_inflight_delivery() {
    let dispatcher = Arc::new(EventDispatcher::new());
    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let running = Arc::new(AtomicBool::new(false));

    let handle = {
        let running = Arc::clone(&running);
        let release_rx = Mutex::new(release_rx);
        dispatcher.subscribe(EventCategory::Connection, move |_| {
            running.store(true, Ordering::SeqCst);
            entered_tx.send(()).unwrap();
            release_rx.lock().unwrap().recv().unwrap();
            running.store(false, Ordering::SeqCst);
        })
    };

    let delivering = {
        let dispatcher = Arc::clone(&dispatcher);
        std::thread::spawn(move || dispatcher.dispatch(&connection_event(1)))
    };
    entered_rx.recv().unwrap();

    // The observer is mid-callback; unsubscribe must not return yet.
    let unsubscriber = {
        let dispatcher = Arc::clone(&dispatcher);
        std::thread::spawn(move || dispatcher.unsubscribe(&handle))
    };
    std::thread::sleep(Duration::from_millis(100));
    assert!(!unsubscriber.is_finished());

    release_tx.send(()).unwrap();
    unsubscriber.join().unwrap();
    assert!(!running.load(Ordering::SeqCst));
    delivering.join().unwrap();
}

#[test]
fn test_panicking_observer_is_counted_and_isolated() {
    let dispatcher = EventDispatcher::new();
    let after_count = Arc::new(AtomicUsize::new(0));

    dispatcher.subscribe(EventCategory::Connection, |_| {
        panic!("deliberate observer failure");
    });
    {
        let after_count = Arc::clone(&after_count);
        dispatcher.subscribe(EventCategory::Connection, move |_| {
            after_count.fetch_add(1, Ordering::SeqCst);
        });
    }

    dispatcher.dispatch(&connection_event(1));
    dispatcher.dispatch(&connection_event(2));

    assert_eq!(after_count.load(Ordering::SeqCst), 2);
    assert_eq!(dispatcher.observer_failures(), 2);
}
