#![no_main]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rxbind_runtime::{ListConfig, ReactiveList};

#[derive(Arbitrary, Debug)]
enum ListOp {
    Push(u8),
    Insert(u8, u8),
    RemoveAt(u8),
    Remove(u8),
    Set(u8, u8),
    Move(u8, u8),
    AddRange(Vec<u8>),
    InsertRange(u8, Vec<u8>),
    RemoveRange(u8, u8),
    RemoveAll(Vec<u8>),
    Clear,
    Reset,
    Sort,
    Suppress(Vec<ListOp>),
}

struct Counters {
    changing: Arc<AtomicUsize>,
    changed: Arc<AtomicUsize>,
}

fn apply(list: &ReactiveList<u8>, model: &mut Vec<u8>, op: &ListOp, depth: usize) {
    let len = model.len();
    match op {
        ListOp::Push(v) => {
            list.push(*v);
            model.push(*v);
        }
        ListOp::Insert(i, v) => {
            let i = usize::from(*i);
            assert_eq!(list.insert(i, *v).is_ok(), i <= len);
            if i <= len {
                model.insert(i, *v);
            }
        }
        ListOp::RemoveAt(i) => {
            let i = usize::from(*i);
            assert_eq!(list.remove_at(i).ok(), model.get(i).copied());
            if i < len {
                model.remove(i);
            }
        }
        ListOp::Remove(v) => {
            let found = model.iter().position(|x| x == v);
            assert_eq!(list.remove(v), found.is_some());
            if let Some(at) = found {
                model.remove(at);
            }
        }
        ListOp::Set(i, v) => {
            let i = usize::from(*i);
            assert_eq!(list.set(i, *v).ok(), model.get(i).copied());
            if i < len {
                model[i] = *v;
            }
        }
        ListOp::Move(a, b) => {
            let (a, b) = (usize::from(*a), usize::from(*b));
            let ok = a < len && b < len;
            assert_eq!(list.move_item(a, b).is_ok(), ok);
            if ok {
                let x = model.remove(a);
                model.insert(b, x);
            }
        }
        ListOp::AddRange(items) => {
            list.add_range(items.iter().copied());
            model.extend_from_slice(items);
        }
        ListOp::InsertRange(i, items) => {
            let i = usize::from(*i);
            assert_eq!(list.insert_range(i, items.iter().copied()).is_ok(), i <= len);
            if i <= len {
                model.splice(i..i, items.iter().copied());
            }
        }
        ListOp::RemoveRange(i, c) => {
            let (i, c) = (usize::from(*i), usize::from(*c));
            let ok = i + c <= len;
            assert_eq!(list.remove_range(i, c).is_ok(), ok);
            if ok {
                model.drain(i..i + c);
            }
        }
        ListOp::RemoveAll(items) => {
            let mut removed = 0;
            for v in items {
                if let Some(at) = model.iter().position(|x| x == v) {
                    model.remove(at);
                    removed += 1;
                }
            }
            assert_eq!(list.remove_all(items), removed);
        }
        ListOp::Clear => {
            list.clear();
            model.clear();
        }
        ListOp::Reset => list.reset(),
        ListOp::Sort => {
            list.sort();
            model.sort_unstable();
        }
        ListOp::Suppress(inner) => {
            if depth > 4 {
                return;
            }
            let _guard = list.suppress_change_notifications();
            for op in inner {
                apply(list, model, op, depth + 1);
            }
        }
    }
}

fuzz_target!(|input: (Vec<ListOp>, bool)| {
    let (ops, range_notifications) = input;
    let list = ReactiveList::with_config(
        ListConfig::default().with_range_notifications(range_notifications),
    );
    let counters = Counters {
        changing: Arc::new(AtomicUsize::new(0)),
        changed: Arc::new(AtomicUsize::new(0)),
    };
    let c = Arc::clone(&counters.changing);
    let _changing = list.changing().subscribe(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });
    let c = Arc::clone(&counters.changed);
    let _changed = list.changed().subscribe(move |_| {
        c.fetch_add(1, Ordering::SeqCst);
    });

    let mut model = Vec::new();
    for op in ops.iter().take(256) {
        apply(&list, &mut model, op, 0);
        assert_eq!(list.to_vec(), model);
        assert_eq!(list.suppression_depth(), 0);
        assert_eq!(
            counters.changing.load(Ordering::SeqCst),
            counters.changed.load(Ordering::SeqCst)
        );
    }
});
