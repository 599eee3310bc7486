// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Operating-system primitives.
//!
//! The runtime needs very little from an OS: a monotonic millisecond clock,
//! a recursive mutex held for the whole tick, a bounded mailbox the tick
//! thread waits on, and a way to start that thread. [`Sys`] bundles these as
//! associated types so a backend is chosen by composition.
//!
//! [`NoSys`] is the single-threaded implementation used on bare-metal
//! targets and in tests: its clock is advanced by hand, the mutex is a
//! no-op, and waiting on an empty mailbox simply lets the clock run for the
//! requested timeout.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use core::fmt;

use crate::input::{KeySample, TouchSample};
use crate::time::Millis;

/// A recursive mutex: the owning thread may lock it again without
/// deadlocking, and must unlock it as many times.
pub trait SysMutex {
    /// Blocks until the mutex is held by the calling thread.
    fn lock(&self);
    /// Releases one level of ownership.
    fn unlock(&self);
}

/// A binary semaphore.
pub trait SysSemaphore {
    /// Waits for the semaphore. `None` waits forever. Returns `false` on
    /// timeout.
    fn acquire(&self, timeout: Option<Millis>) -> bool;
    /// Signals the semaphore.
    fn release(&self);
}

/// A bounded multi-producer mailbox.
pub trait SysMailbox<T> {
    /// Posts a message without blocking. Returns `false` when full.
    fn put(&self, msg: T) -> bool;
    /// Waits for a message. `None` waits forever; `Some(Millis::ZERO)`
    /// polls.
    fn get(&self, timeout: Option<Millis>) -> Option<T>;
}

/// A message for the tick thread.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Message {
    /// Work is pending; run a tick.
    Wake,
    /// A raw touch sample from a producer.
    Touch(TouchSample),
    /// A raw key sample from a producer.
    Key(KeySample),
    /// Leave the run loop.
    Shutdown,
}

/// The OS services the runtime is built on.
pub trait Sys {
    /// Recursive mutex type.
    type Mutex: SysMutex;
    /// Binary semaphore type.
    type Semaphore: SysSemaphore;
    /// Mailbox type carrying [`Message`]s to the tick thread.
    type Mailbox: SysMailbox<Message>;

    /// Reads the monotonic millisecond clock.
    fn now(&self) -> Millis;

    /// Creates a recursive mutex.
    fn mutex(&self) -> Option<Self::Mutex>;

    /// Creates a binary semaphore, initially unavailable.
    fn semaphore(&self) -> Option<Self::Semaphore>;

    /// Creates a mailbox holding at most `capacity` messages.
    fn mailbox(&self, capacity: usize) -> Option<Self::Mailbox>;

    /// Starts a named thread running `f`. Returns `false` when threads are
    /// unsupported or creation failed.
    fn spawn(&self, name: &str, f: Box<dyn FnOnce() + Send + 'static>) -> bool {
        _ = (name, f);
        false
    }
}

/// Holds a [`SysMutex`] until dropped.
pub struct LockGuard<'a, M: SysMutex + ?Sized> {
    mutex: &'a M,
}

impl<'a, M: SysMutex + ?Sized> LockGuard<'a, M> {
    /// Locks `mutex` and returns a guard that unlocks it on drop.
    #[must_use]
    pub fn new(mutex: &'a M) -> Self {
        mutex.lock();
        Self { mutex }
    }
}

impl<M: SysMutex + ?Sized> Drop for LockGuard<'_, M> {
    fn drop(&mut self) {
        self.mutex.unlock();
    }
}

impl<M: SysMutex + ?Sized> fmt::Debug for LockGuard<'_, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// NoSys
// ---------------------------------------------------------------------------

/// Single-threaded OS layer with a manually advanced clock.
///
/// Clones share the same clock, so a test can keep one handle while the
/// runtime owns another.
#[derive(Clone, Debug, Default)]
pub struct NoSys {
    clock: Rc<Cell<u32>>,
}

impl NoSys {
    /// Creates a clock starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock forward by `span`.
    pub fn advance(&self, span: Millis) {
        self.clock.set(self.clock.get().wrapping_add(span.0));
    }

    /// Sets the clock to `now`.
    pub fn set_now(&self, now: Millis) {
        self.clock.set(now.0);
    }
}

/// The no-op mutex of [`NoSys`]. Tracks depth so unbalanced use is caught
/// in debug builds.
#[derive(Debug, Default)]
pub struct NoMutex {
    depth: Cell<u32>,
}

impl NoMutex {
    /// Current recursion depth.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth.get()
    }
}

impl SysMutex for NoMutex {
    fn lock(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    fn unlock(&self) {
        debug_assert!(self.depth.get() > 0, "unlock without lock");
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

/// The semaphore of [`NoSys`]. Waiting on an unavailable semaphore
/// advances the clock by the timeout.
#[derive(Debug)]
pub struct NoSemaphore {
    available: Cell<bool>,
    clock: NoSys,
}

impl SysSemaphore for NoSemaphore {
    fn acquire(&self, timeout: Option<Millis>) -> bool {
        if self.available.replace(false) {
            return true;
        }
        if let Some(t) = timeout {
            self.clock.advance(t);
        }
        false
    }

    fn release(&self) {
        self.available.set(true);
    }
}

/// The mailbox of [`NoSys`]. Waiting on an empty mailbox advances the
/// clock by the timeout; an unbounded wait returns immediately.
#[derive(Debug)]
pub struct NoMailbox {
    queue: RefCell<VecDeque<Message>>,
    capacity: usize,
    clock: NoSys,
}

impl SysMailbox<Message> for NoMailbox {
    fn put(&self, msg: Message) -> bool {
        let mut queue = self.queue.borrow_mut();
        if queue.len() >= self.capacity {
            return false;
        }
        queue.push_back(msg);
        true
    }

    fn get(&self, timeout: Option<Millis>) -> Option<Message> {
        let msg = self.queue.borrow_mut().pop_front();
        if msg.is_none() {
            if let Some(t) = timeout {
                self.clock.advance(t);
            }
        }
        msg
    }
}

impl Sys for NoSys {
    type Mutex = NoMutex;
    type Semaphore = NoSemaphore;
    type Mailbox = NoMailbox;

    fn now(&self) -> Millis {
        Millis(self.clock.get())
    }

    fn mutex(&self) -> Option<NoMutex> {
        Some(NoMutex::default())
    }

    fn semaphore(&self) -> Option<NoSemaphore> {
        Some(NoSemaphore {
            available: Cell::new(false),
            clock: self.clone(),
        })
    }

    fn mailbox(&self, capacity: usize) -> Option<NoMailbox> {
        Some(NoMailbox {
            queue: RefCell::new(VecDeque::new()),
            capacity: capacity.max(1),
            clock: self.clone(),
        })
    }
}
