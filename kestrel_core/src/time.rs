// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic millisecond time.
//!
//! [`Millis`] is a point on the runtime's monotonic millisecond counter, as
//! read from [`Sys::now`](crate::sys::Sys::now). The counter is 32 bits wide
//! and wraps roughly every 49.7 days, so all comparisons go through
//! [`Millis::elapsed_since`], which uses wrapping subtraction.

use core::fmt;
use core::ops::Add;

/// A point on the monotonic millisecond counter, or a span of milliseconds.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Millis(pub u32);

impl Millis {
    /// The zero instant / empty span.
    pub const ZERO: Self = Self(0);

    /// Returns the raw millisecond value.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the milliseconds elapsed from `earlier` to `self`.
    ///
    /// Wraps around the 32-bit counter, so a later instant read just after
    /// the counter overflowed still yields a small positive span.
    #[inline]
    #[must_use]
    pub const fn elapsed_since(self, earlier: Self) -> Self {
        Self(self.0.wrapping_sub(earlier.0))
    }

    /// Returns `true` if strictly more than `span` has elapsed between
    /// `earlier` and `self`.
    #[inline]
    #[must_use]
    pub const fn exceeds(self, earlier: Self, span: Self) -> bool {
        self.elapsed_since(earlier).0 > span.0
    }

    /// Saturating subtraction of a span.
    #[inline]
    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Add for Millis {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }
}

impl fmt::Debug for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_handles_counter_wrap() {
        let before = Millis(u32::MAX - 4);
        let after = Millis(5);
        assert_eq!(after.elapsed_since(before), Millis(10), "wrap is transparent");
    }

    #[test]
    fn exceeds_is_strict() {
        let start = Millis(1_000);
        assert!(!Millis(1_300).exceeds(start, Millis(300)), "equal is not over");
        assert!(Millis(1_301).exceeds(start, Millis(300)));
    }

    #[test]
    fn saturating_sub_never_underflows() {
        assert_eq!(Millis(5).saturating_sub(Millis(9)), Millis::ZERO);
        assert_eq!(Millis(9).saturating_sub(Millis(5)), Millis(4));
    }
}
