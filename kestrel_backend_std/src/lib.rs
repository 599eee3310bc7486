// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hosted operating-system backend for kestrel.
//!
//! [`StdSys`] implements [`Sys`] on `std`: an [`Instant`]-based millisecond
//! clock, a recursive mutex and binary semaphore built on
//! `Mutex`/`Condvar`, a bounded mailbox shared between threads, and named
//! threads. [`launch`] runs a [`Gui`](kestrel_core::gui::Gui) on its own
//! tick thread and returns a [`GuiHandle`] for posting input.
//!
//! [`Instant`]: std::time::Instant

mod launch;
mod sync;
mod time;

use std::thread;

use kestrel_core::sys::Sys;
use kestrel_core::time::Millis;

pub use launch::{Finished, GuiHandle, InputSender, LaunchError, TICK_THREAD_NAME, launch};
pub use sync::{StdMailbox, StdMutex, StdSemaphore};
pub use time::{Clock, to_duration};

/// [`Sys`] for hosted targets.
///
/// Clones share the clock origin.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdSys {
    clock: Clock,
}

impl StdSys {
    /// Creates a backend whose clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sys for StdSys {
    type Mutex = StdMutex;
    type Semaphore = StdSemaphore;
    type Mailbox = StdMailbox;

    fn now(&self) -> Millis {
        self.clock.now()
    }

    fn mutex(&self) -> Option<StdMutex> {
        Some(StdMutex::new())
    }

    fn semaphore(&self) -> Option<StdSemaphore> {
        Some(StdSemaphore::new())
    }

    fn mailbox(&self, capacity: usize) -> Option<StdMailbox> {
        Some(StdMailbox::new(capacity))
    }

    fn spawn(&self, name: &str, f: Box<dyn FnOnce() + Send + 'static>) -> bool {
        thread::Builder::new()
            .name(name.to_owned())
            .spawn(f)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;

    #[test]
    fn spawned_threads_carry_their_name() {
        let (tx, rx) = mpsc::channel();
        assert!(StdSys::new().spawn(
            "worker",
            Box::new(move || {
                let _ = tx.send(thread::current().name().map(str::to_owned));
            })
        ));
        assert_eq!(rx.recv().unwrap().as_deref(), Some("worker"));
    }

    #[test]
    fn copies_share_the_clock_origin() {
        let a = StdSys::new();
        let b = a;
        thread::sleep(std::time::Duration::from_millis(2));
        assert!(b.now().get() >= 2);
        assert!(a.now().get() >= b.now().get().saturating_sub(1));
    }
}
