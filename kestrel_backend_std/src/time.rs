// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic millisecond clock.

use std::time::{Duration, Instant};

use kestrel_core::time::Millis;

/// A millisecond clock counting from its creation.
///
/// Readings wrap after roughly 49.7 days, like the runtime's [`Millis`].
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    origin: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    /// Starts a clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Milliseconds since the clock was created, modulo 2^32.
    #[must_use]
    pub fn now(&self) -> Millis {
        elapsed_to_millis(self.origin.elapsed())
    }
}

fn elapsed_to_millis(elapsed: Duration) -> Millis {
    let wrapped = elapsed.as_millis() & u128::from(u32::MAX);
    Millis(u32::try_from(wrapped).unwrap_or(0))
}

/// Converts a runtime timeout to a [`Duration`].
#[must_use]
pub fn to_duration(span: Millis) -> Duration {
    Duration::from_millis(u64::from(span.get()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic_non_decreasing() {
        let clock = Clock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second.get() >= first.get(), "clock went backwards");
    }

    #[test]
    fn readings_wrap_at_32_bits() {
        let past_wrap = Duration::from_millis(u64::from(u32::MAX) + 11);
        assert_eq!(elapsed_to_millis(past_wrap), Millis(10));
    }

    #[test]
    fn timeouts_convert_to_durations() {
        assert_eq!(to_duration(Millis(1_500)), Duration::from_millis(1_500));
    }
}
