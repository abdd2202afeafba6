#![forbid(unsafe_code)]

//! Property-based invariant tests for the stream runtime.
//!
//! 1. A subject's subscriber sees exactly the values pushed while it was
//!    subscribed and before the stream terminated, then at most one
//!    terminal notification.
//! 2. `distinct_until_changed` equals `Vec::dedup` over the pushed values.
//! 3. `combine_latest` emits once per input after both sides have a value,
//!    always combining the latest pair.
//! 4. A ref-counted stream holds exactly one upstream subscription while it
//!    has subscribers, and none otherwise.

use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use rxbind_core::sync::lock;
use rxbind_core::{Notification, Observable, StreamError, Subject, Subscription};

type Log<T> = Arc<Mutex<Vec<Notification<T>>>>;

fn record<T: Clone + Send + Sync + 'static>(stream: &Observable<T>) -> (Log<T>, Subscription) {
    let log: Log<T> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let sub = stream.subscribe_notifications(move |n| lock(&sink).push(n));
    (log, sub)
}

fn values<T: Clone>(log: &Log<T>) -> Vec<T> {
    lock(log)
        .iter()
        .filter_map(|n| match n {
            Notification::Next(v) => Some(v.clone()),
            _ => None,
        })
        .collect()
}

fn terminals<T>(log: &Log<T>) -> usize {
    lock(log).iter().filter(|n| n.is_terminal()).count()
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Subject delivery grammar
// ═════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
enum Event {
    Next(u8),
    Complete,
    Error,
    Unsubscribe,
}

fn event() -> impl Strategy<Value = Event> {
    prop_oneof![
        8 => any::<u8>().prop_map(Event::Next),
        1 => Just(Event::Complete),
        1 => Just(Event::Error),
        1 => Just(Event::Unsubscribe),
    ]
}

proptest! {
    #[test]
    fn subject_delivers_values_then_one_terminal(
        events in proptest::collection::vec(event(), 0..60)
    ) {
        let subject = Subject::new();
        let (log, sub) = record(&subject.observable());
        let mut sub = Some(sub);
        let mut expected = Vec::new();
        let mut subscribed = true;
        let mut terminated = false;
        let mut saw_terminal = false;

        for event in &events {
            match event {
                Event::Next(v) => {
                    if subscribed && !terminated {
                        expected.push(*v);
                    }
                    subject.next(*v);
                }
                Event::Complete => {
                    saw_terminal |= subscribed && !terminated;
                    terminated = true;
                    subject.complete();
                }
                Event::Error => {
                    saw_terminal |= subscribed && !terminated;
                    terminated = true;
                    subject.error(StreamError::msg("boom"));
                }
                Event::Unsubscribe => {
                    subscribed = false;
                    sub.take();
                }
            }
        }

        prop_assert_eq!(values(&log), expected);
        prop_assert_eq!(terminals(&log), usize::from(saw_terminal));
        prop_assert_eq!(subject.has_observers(), subscribed && !terminated);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. distinct_until_changed
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn distinct_until_changed_is_dedup(pushed in proptest::collection::vec(0u8..4, 0..80)) {
        let subject = Subject::new();
        let (log, _sub) = record(&subject.observable().distinct_until_changed());
        for v in &pushed {
            subject.next(*v);
        }
        let mut expected = pushed.clone();
        expected.dedup();
        prop_assert_eq!(values(&log), expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. combine_latest
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn combine_latest_tracks_latest_pair(
        pushes in proptest::collection::vec((any::<bool>(), any::<u8>()), 0..60)
    ) {
        let left = Subject::<u8>::new();
        let right = Subject::<u8>::new();
        let combined = left
            .observable()
            .combine_latest(&right.observable(), |a, b| (*a, *b));
        let (log, _sub) = record(&combined);

        let (mut a, mut b) = (None, None);
        let mut expected = Vec::new();
        for (to_left, v) in &pushes {
            if *to_left {
                a = Some(*v);
                left.next(*v);
            } else {
                b = Some(*v);
                right.next(*v);
            }
            if let (Some(a), Some(b)) = (a, b) {
                expected.push((a, b));
            }
        }
        prop_assert_eq!(values(&log), expected);
        prop_assert_eq!(terminals(&log), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. ref_count connection lifetime
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn ref_count_holds_one_upstream_while_observed(
        steps in proptest::collection::vec(any::<bool>(), 0..60)
    ) {
        let upstream = Subject::<u8>::new();
        let shared = upstream.observable().share();
        let mut live: Vec<Subscription> = Vec::new();

        for subscribe in &steps {
            if *subscribe {
                live.push(shared.subscribe(|_| {}));
            } else {
                live.pop();
            }
            let expected = usize::from(!live.is_empty());
            prop_assert_eq!(upstream.observer_count(), expected);
        }
    }
}
