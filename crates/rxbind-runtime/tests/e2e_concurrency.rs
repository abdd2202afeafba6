//! E2E integration test: commands and lists under concurrent callers.
//!
//! Validates:
//! 1. Overlapping invocations from several threads flip the busy state once
//!    each way, and `false` only after the last one completes.
//! 2. Under a burst of short invocations the busy edges strictly alternate
//!    and the in-flight count returns to zero.
//! 3. Concurrent pushes of shared tracked items keep the watcher refcounts
//!    equal to the occurrence counts and the notification pairs balanced.
//! 4. No panics, no deadlocks, no unsafe code.

#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use rxbind_core::sync::lock;
use rxbind_core::{
    IgnoreErrors, Observable, PropertyChange, PropertyNotifier, ReactiveObject, Subject,
    Subscription,
};
use rxbind_runtime::{CommandConfig, ListConfig, ReactiveCommand, ReactiveList};

const THREADS: usize = 8;

fn quiet() -> CommandConfig {
    CommandConfig::default().with_error_policy(Arc::new(IgnoreErrors))
}

// ── Commands ────────────────────────────────────────────────────────────

#[test]
fn two_threads_overlap_one_busy_window() {
    let works: Vec<Subject<u32>> = (0..2).map(|_| Subject::new()).collect();
    let factory_works = works.clone();
    let command = ReactiveCommand::new(
        Observable::just(true),
        move |i: usize| Ok(factory_works[i].observable()),
        quiet(),
    );

    // Each busy edge records the in-flight count it observed.
    let edges = Arc::new(Mutex::new(Vec::new()));
    let e = Arc::clone(&edges);
    let observer = command.clone();
    let _busy = command
        .is_executing()
        .subscribe(move |busy| lock(&e).push((busy, observer.in_flight())));

    let barrier = Arc::new(Barrier::new(2));
    let runs: Vec<Subscription> = thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|i| {
                let barrier = Arc::clone(&barrier);
                let command = command.clone();
                s.spawn(move || {
                    barrier.wait();
                    command.execute(i).subscribe(|_| {})
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("invoker thread panicked"))
            .collect()
    });
    assert_eq!(command.in_flight(), 2);

    thread::scope(|s| {
        for work in &works {
            s.spawn(move || work.complete());
        }
    });

    let edges = lock(&edges).clone();
    let values: Vec<bool> = edges.iter().map(|(busy, _)| *busy).collect();
    assert_eq!(values, vec![false, true, false]);
    assert_eq!(edges.last().map(|(_, in_flight)| *in_flight), Some(0));
    assert_eq!(command.in_flight(), 0);
    drop(runs);
}

#[test]
fn burst_of_invocations_settles_idle() {
    const PER_THREAD: usize = 200;

    let command = ReactiveCommand::from_fn(Observable::just(true), |n: usize| Ok(n), quiet());
    let results = Arc::new(AtomicUsize::new(0));
    let r = Arc::clone(&results);
    let _results = command.results().subscribe(move |_| {
        r.fetch_add(1, Ordering::SeqCst);
    });
    let edges = Arc::new(Mutex::new(Vec::new()));
    let e = Arc::clone(&edges);
    let _busy = command
        .is_executing()
        .subscribe(move |busy| lock(&e).push(busy));

    let barrier = Arc::new(Barrier::new(THREADS));
    thread::scope(|s| {
        for t in 0..THREADS {
            let barrier = Arc::clone(&barrier);
            let command = command.clone();
            s.spawn(move || {
                barrier.wait();
                for i in 0..PER_THREAD {
                    command.invoke(t * PER_THREAD + i);
                }
            });
        }
    });

    assert_eq!(results.load(Ordering::SeqCst), THREADS * PER_THREAD);
    assert_eq!(command.in_flight(), 0);
    // Replay first, then strictly alternating edges ending idle.
    let edges = lock(&edges).clone();
    assert_eq!(edges.first(), Some(&false));
    assert_eq!(edges.last(), Some(&false));
    assert!(edges.windows(2).all(|pair| pair[0] != pair[1]));
}

// ── Lists ───────────────────────────────────────────────────────────────

struct Tile {
    notifier: PropertyNotifier,
}

impl ReactiveObject for Tile {
    fn property_changed(&self) -> Observable<PropertyChange> {
        self.notifier.changed()
    }
}

#[test]
fn concurrent_pushes_keep_refcounts_exact() {
    const PER_THREAD: usize = 100;

    let tiles: Vec<Arc<Tile>> = (0..4)
        .map(|_| {
            Arc::new(Tile {
                notifier: PropertyNotifier::new(),
            })
        })
        .collect();
    let list = ReactiveList::with_config(ListConfig::default().with_change_tracking(true));
    let changing = Arc::new(AtomicUsize::new(0));
    let changed = Arc::new(AtomicUsize::new(0));
    let (a, b) = (Arc::clone(&changing), Arc::clone(&changed));
    let _changing = list.changing().subscribe(move |_| {
        a.fetch_add(1, Ordering::SeqCst);
    });
    let _changed = list.changed().subscribe(move |_| {
        b.fetch_add(1, Ordering::SeqCst);
    });

    let barrier = Arc::new(Barrier::new(THREADS));
    thread::scope(|s| {
        for t in 0..THREADS {
            let barrier = Arc::clone(&barrier);
            let list = list.clone();
            let tiles = &tiles;
            s.spawn(move || {
                barrier.wait();
                for i in 0..PER_THREAD {
                    list.push(Arc::clone(&tiles[(t + i) % tiles.len()]));
                }
            });
        }
    });

    assert_eq!(list.len(), THREADS * PER_THREAD);
    assert_eq!(changing.load(Ordering::SeqCst), THREADS * PER_THREAD);
    assert_eq!(changed.load(Ordering::SeqCst), THREADS * PER_THREAD);
    for tile in &tiles {
        let occurrences = list.with(|items| items.iter().filter(|x| Arc::ptr_eq(x, tile)).count());
        assert_eq!(list.watcher_refcount(tile), occurrences);
    }
    assert_eq!(list.watched_items(), tiles.len());

    // One subscription per distinct tile, however often it occurs.
    let forwarded = Arc::new(AtomicUsize::new(0));
    let f = Arc::clone(&forwarded);
    let _items = list.item_changed().subscribe(move |_| {
        f.fetch_add(1, Ordering::SeqCst);
    });
    for tile in &tiles {
        tile.notifier.raise("Color");
    }
    assert_eq!(forwarded.load(Ordering::SeqCst), tiles.len());
}
