// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Thread primitives built on `std::sync`.
//!
//! Poisoned locks are recovered rather than propagated: the protected state
//! is plain bookkeeping that stays consistent even if a holder panicked.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use kestrel_core::sys::{Message, SysMailbox, SysMutex, SysSemaphore};
use kestrel_core::time::Millis;

use crate::time::to_duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ---------------------------------------------------------------------------
// Recursive mutex
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Owner {
    thread: Option<ThreadId>,
    depth: u32,
}

/// A recursive mutex.
#[derive(Debug, Default)]
pub struct StdMutex {
    owner: Mutex<Owner>,
    released: Condvar,
}

impl StdMutex {
    /// Creates an unlocked mutex.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the calling thread holds the mutex.
    #[must_use]
    pub fn is_held_by_current_thread(&self) -> bool {
        lock(&self.owner).thread == Some(thread::current().id())
    }
}

impl SysMutex for StdMutex {
    fn lock(&self) {
        let me = thread::current().id();
        let mut owner = lock(&self.owner);
        loop {
            match owner.thread {
                None => {
                    owner.thread = Some(me);
                    owner.depth = 1;
                    return;
                }
                Some(t) if t == me => {
                    owner.depth += 1;
                    return;
                }
                Some(_) => {
                    owner = self
                        .released
                        .wait(owner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
        }
    }

    fn unlock(&self) {
        let mut owner = lock(&self.owner);
        debug_assert_eq!(
            owner.thread,
            Some(thread::current().id()),
            "unlock from a thread that does not hold the mutex"
        );
        owner.depth = owner.depth.saturating_sub(1);
        if owner.depth == 0 {
            owner.thread = None;
            drop(owner);
            self.released.notify_one();
        }
    }
}

// ---------------------------------------------------------------------------
// Binary semaphore
// ---------------------------------------------------------------------------

/// A binary semaphore, initially unavailable.
#[derive(Debug, Default)]
pub struct StdSemaphore {
    available: Mutex<bool>,
    signal: Condvar,
}

impl StdSemaphore {
    /// Creates an unavailable semaphore.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SysSemaphore for StdSemaphore {
    fn acquire(&self, timeout: Option<Millis>) -> bool {
        let guard = lock(&self.available);
        let mut available = match timeout {
            None => self
                .signal
                .wait_while(guard, |a| !*a)
                .unwrap_or_else(PoisonError::into_inner),
            Some(t) => {
                self.signal
                    .wait_timeout_while(guard, to_duration(t), |a| !*a)
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
        std::mem::replace(&mut *available, false)
    }

    fn release(&self) {
        *lock(&self.available) = true;
        self.signal.notify_one();
    }
}

// ---------------------------------------------------------------------------
// Mailbox
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Shared {
    queue: Mutex<VecDeque<Message>>,
    ready: Condvar,
    capacity: usize,
}

/// A bounded multi-producer mailbox.
///
/// Clones are handles to the same queue, so producer threads keep a clone
/// while the tick thread owns the original.
#[derive(Clone, Debug)]
pub struct StdMailbox {
    shared: Arc<Shared>,
}

impl StdMailbox {
    /// Creates a mailbox holding at most `capacity` messages (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::with_capacity(capacity)),
                ready: Condvar::new(),
                capacity,
            }),
        }
    }

    /// Messages currently waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.shared.queue).len()
    }

    /// Whether no message is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SysMailbox<Message> for StdMailbox {
    fn put(&self, msg: Message) -> bool {
        let mut queue = lock(&self.shared.queue);
        if queue.len() >= self.shared.capacity {
            return false;
        }
        queue.push_back(msg);
        drop(queue);
        self.shared.ready.notify_one();
        true
    }

    fn get(&self, timeout: Option<Millis>) -> Option<Message> {
        let queue = lock(&self.shared.queue);
        let mut queue = match timeout {
            Some(Millis::ZERO) => queue,
            None => self
                .shared
                .ready
                .wait_while(queue, |q| q.is_empty())
                .unwrap_or_else(PoisonError::into_inner),
            Some(t) => {
                self.shared
                    .ready
                    .wait_timeout_while(queue, to_duration(t), |q| q.is_empty())
                    .unwrap_or_else(PoisonError::into_inner)
                    .0
            }
        };
        queue.pop_front()
    }
}
