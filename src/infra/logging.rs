//! Process-wide log setup.
//!
//! The severity threshold sits behind a `reload` layer so it can be
//! lowered while a shadow dry-run is being parsed and restored after.

use tracing_subscriber::{Registry, filter::LevelFilter, fmt, prelude::*, reload};

/// Handle on the global severity threshold
#[derive(Clone, Default)]
pub struct LogControl {
    handle: Option<reload::Handle<LevelFilter, Registry>>,
}

/// Restores the previous threshold on drop
pub struct QuietGuard<'a> {
    control: &'a LogControl,
    previous: Option<LevelFilter>,
}

/// Install the stderr subscriber. Warnings by default, debug with `verbose`.
pub fn init(verbose: bool) -> LogControl {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    let (filter, handle) = reload::Layer::new(level);

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init()
        .is_ok();

    LogControl {
        handle: installed.then_some(handle),
    }
}

impl LogControl {
    /// A control that owns no subscriber; `quiet` is a no-op
    pub fn detached() -> Self {
        Self { handle: None }
    }

    /// Current threshold, if a subscriber is attached
    pub fn level(&self) -> Option<LevelFilter> {
        self.handle
            .as_ref()
            .and_then(|h| h.clone_current())
    }

    /// Drop everything below ERROR until the guard goes away
    pub fn quiet(&self) -> QuietGuard<'_> {
        let previous = self.handle.as_ref().and_then(|h| {
            let prev = h.clone_current()?;
            h.modify(|f| *f = LevelFilter::ERROR).ok()?;
            Some(prev)
        });

        QuietGuard {
            control: self,
            previous,
        }
    }
}

impl Drop for QuietGuard<'_> {
    fn drop(&mut self) {
        if let (Some(handle), Some(prev)) = (self.control.handle.as_ref(), self.previous) {
            let _ = handle.modify(|f| *f = prev);
        }
    }
}
