//! A command that fans out to several others.

use std::sync::Arc;

use rxbind_core::Observable;

use super::{Command, CommandConfig, ReactiveCommand};

impl<P> ReactiveCommand<P, P>
where
    P: Clone + Send + Sync + 'static,
{
    /// A parent command that invokes every child with the same parameter.
    ///
    /// Enabled while `can_execute` (assumed `true` until it says otherwise)
    /// and every child are enabled. Child failures stay on the children's
    /// error channels; the parent only reports its own parameter echo.
    ///
    /// Children are invoked from the parent's [`results`](Self::results)
    /// stream, which is delivered on `config.scheduler`. With the default
    /// immediate scheduler the fan-out happens inside `invoke`; with a
    /// queued or threaded one it happens when that scheduler runs the job.
    pub fn combined(
        can_execute: Observable<bool>,
        children: Vec<Arc<dyn Command<P>>>,
        config: CommandConfig,
    ) -> Self {
        let children_ready = Observable::combine_latest_all(
            children
                .iter()
                .map(|child| child.can_execute_observable())
                .collect(),
        )
        .map(|states| states.iter().all(|&ready| ready));
        let gate = can_execute
            .start_with(true)
            .combine_latest(&children_ready, |parent, children| *parent && *children);

        let command = Self::create(gate, config);
        command
            .results()
            .subscribe(move |param| {
                for child in &children {
                    child.invoke(param.clone());
                }
            })
            .detach();
        command
    }
}
