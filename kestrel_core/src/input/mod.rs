// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raw input samples and the records delivered to widgets.
//!
//! Producers (drivers, interrupt handlers, other threads) only ever create
//! [`TouchSample`]s and [`KeySample`]s and hand them to the runtime's
//! bounded queues. The tick thread turns them into widget events:
//!
//! - [`touch`]: hit-testing, active/focus tracking, drag routing.
//! - [`click`]: the click / double-click / long-click state machine.
//! - [`keyboard`]: routing to the focused widget and Tab focus cycling.

pub mod click;
pub mod keyboard;
pub mod touch;

use kurbo::{Point, Size, Vec2};

use crate::buffer::{Slot, field};
use crate::time::Millis;

/// Maximum number of simultaneous touch contacts tracked.
pub const MAX_TOUCHES: usize = 2;

/// One raw touch-controller reading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TouchSample {
    /// Whether any contact is down.
    pub pressed: bool,
    /// Contact positions in absolute screen coordinates. Only the first
    /// `count` entries are meaningful.
    pub points: [Point; MAX_TOUCHES],
    /// Number of contacts.
    pub count: u8,
    /// When the sample was taken.
    pub time: Millis,
}

impl TouchSample {
    /// A single contact pressed at `at`.
    #[must_use]
    pub fn press(at: Point, time: Millis) -> Self {
        Self {
            pressed: true,
            points: [at, Point::ZERO],
            count: 1,
            time,
        }
    }

    /// A release reported at `at`.
    #[must_use]
    pub fn release(at: Point, time: Millis) -> Self {
        Self {
            pressed: false,
            points: [at, Point::ZERO],
            count: 1,
            time,
        }
    }

    /// Two contacts pressed at `a` and `b`.
    #[must_use]
    pub fn pinch(a: Point, b: Point, time: Millis) -> Self {
        Self {
            pressed: true,
            points: [a, b],
            count: 2,
            time,
        }
    }

    /// The contacts actually present.
    #[must_use]
    pub fn contacts(&self) -> &[Point] {
        &self.points[..usize::from(self.count).min(MAX_TOUCHES)]
    }
}

/// One raw key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeySample {
    /// The key, as a character. Control keys use the constants in
    /// [`keyboard`].
    pub key: char,
    /// When the key was pressed.
    pub time: Millis,
}

impl Slot for TouchSample {
    const SIZE: usize = 2 + 4 + MAX_TOUCHES * 16;

    fn write(&self, out: &mut [u8]) {
        out[0] = u8::from(self.pressed);
        out[1] = self.count;
        out[2..6].copy_from_slice(&self.time.get().to_le_bytes());
        for (i, p) in self.points.iter().enumerate() {
            let at = 6 + i * 16;
            out[at..at + 8].copy_from_slice(&p.x.to_le_bytes());
            out[at + 8..at + 16].copy_from_slice(&p.y.to_le_bytes());
        }
    }

    fn read(bytes: &[u8]) -> Self {
        let mut points = [Point::ZERO; MAX_TOUCHES];
        for (i, p) in points.iter_mut().enumerate() {
            let at = 6 + i * 16;
            *p = Point::new(
                f64::from_le_bytes(field(bytes, at)),
                f64::from_le_bytes(field(bytes, at + 8)),
            );
        }
        Self {
            pressed: bytes[0] != 0,
            count: bytes[1],
            time: Millis(u32::from_le_bytes(field(bytes, 2))),
            points,
        }
    }
}

impl Slot for KeySample {
    const SIZE: usize = 8;

    fn write(&self, out: &mut [u8]) {
        out[..4].copy_from_slice(&u32::from(self.key).to_le_bytes());
        out[4..8].copy_from_slice(&self.time.get().to_le_bytes());
    }

    fn read(bytes: &[u8]) -> Self {
        let key = u32::from_le_bytes(field(bytes, 0));
        Self {
            key: char::from_u32(key).unwrap_or(char::REPLACEMENT_CHARACTER),
            time: Millis(u32::from_le_bytes(field(bytes, 4))),
        }
    }
}

/// A touch, as seen by the widget receiving it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Touch {
    /// Number of contacts.
    pub count: u8,
    /// Contact positions in absolute screen coordinates.
    pub abs: [Point; MAX_TOUCHES],
    /// Contact positions relative to the receiving widget.
    pub rel: [Point; MAX_TOUCHES],
    /// Relative positions of the previous dispatch to the same widget.
    pub rel_old: [Point; MAX_TOUCHES],
    /// Distance between the first two contacts (zero with one contact).
    pub distance: f64,
    /// `distance` at the previous dispatch.
    pub distance_old: f64,
    /// Size of the receiving widget.
    pub widget_size: Size,
    /// Sample time.
    pub time: Millis,
}

impl Default for Touch {
    fn default() -> Self {
        Self {
            count: 0,
            abs: [Point::ZERO; MAX_TOUCHES],
            rel: [Point::ZERO; MAX_TOUCHES],
            rel_old: [Point::ZERO; MAX_TOUCHES],
            distance: 0.0,
            distance_old: 0.0,
            widget_size: Size::ZERO,
            time: Millis::ZERO,
        }
    }
}

impl Touch {
    /// The first contact, relative to the receiving widget.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Point {
        self.rel[0]
    }

    /// Movement of the first contact since the previous dispatch.
    #[inline]
    #[must_use]
    pub fn delta(&self) -> Vec2 {
        self.rel[0] - self.rel_old[0]
    }

    /// Re-expresses the touch relative to a widget at `origin` of `size`.
    ///
    /// The previous relative positions are carried over from `rel`, so
    /// [`delta`](Self::delta) reports movement since the last dispatch.
    pub(crate) fn relate(&mut self, origin: Point, size: Size) {
        self.rel_old = self.rel;
        self.distance_old = self.distance;
        for i in 0..MAX_TOUCHES {
            self.rel[i] = self.abs[i] - origin.to_vec2();
        }
        self.widget_size = size;
    }

    /// Loads fresh absolute positions from a raw sample.
    pub(crate) fn load(&mut self, sample: &TouchSample) {
        self.count = sample.count;
        self.abs = sample.points;
        self.time = sample.time;
        self.distance = if sample.count >= 2 {
            sample.points[0].distance(sample.points[1])
        } else {
            0.0
        };
    }
}
