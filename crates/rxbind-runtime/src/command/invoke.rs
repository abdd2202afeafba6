//! Driving a command from a value stream.

use std::sync::{Arc, Mutex};

use rxbind_core::sync::lock;
use rxbind_core::{Observable, Subscription};

use super::Command;

struct Pending<V> {
    latest: Mutex<Option<V>>,
}

impl<V> Pending<V> {
    /// Invoke with the held value if the command allows it right now.
    fn try_fire(&self, command: &dyn Command<V>) {
        let Some(value) = lock(&self.latest).take() else {
            return;
        };
        if command.can_execute(&value) {
            command.invoke(value);
            return;
        }
        // Put it back unless something newer arrived meanwhile.
        let mut slot = lock(&self.latest);
        if slot.is_none() {
            *slot = Some(value);
        }
    }
}

/// Invoke `command` with each value of `source`.
///
/// A value that arrives while the command is disabled is held; a newer value
/// replaces it. The held value runs as soon as the command becomes enabled.
/// Dropping the returned subscription stops both.
pub fn invoke_command<V>(source: &Observable<V>, command: Arc<dyn Command<V>>) -> Subscription
where
    V: Clone + Send + Sync + 'static,
{
    let pending = Arc::new(Pending {
        latest: Mutex::new(None),
    });

    let enabled = {
        let pending = Arc::clone(&pending);
        let command = Arc::clone(&command);
        command
            .can_execute_observable()
            .filter(|&enabled| enabled)
            .subscribe(move |_| pending.try_fire(command.as_ref()))
    };
    let values = source.subscribe(move |value| {
        *lock(&pending.latest) = Some(value);
        pending.try_fire(command.as_ref());
    });

    Subscription::from_many(vec![values, enabled])
}
