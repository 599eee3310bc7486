// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry helpers shared by the widget tree and the display boundary.
//!
//! Widget geometry is expressed in [`kurbo`] types. Pixel-aligned integer
//! rectangles ([`PixelRect`]) only appear where the core talks to a
//! [`Display`](crate::display::Display).

use kurbo::{Point, Rect};

/// An integer rectangle in framebuffer pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl PixelRect {
    /// Creates a pixel rectangle.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Snaps `rect` outward to whole pixels and clamps it to a
    /// `screen_width` x `screen_height` framebuffer.
    ///
    /// Returns `None` if nothing of `rect` is on screen.
    #[must_use]
    pub fn from_rect(rect: Rect, screen_width: u32, screen_height: u32) -> Option<Self> {
        let screen = Rect::new(0.0, 0.0, f64::from(screen_width), f64::from(screen_height));
        let r = rect.abs().expand().intersect(screen);
        if r.is_zero_area() {
            return None;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "values are whole numbers clamped to a u32-sized framebuffer"
        )]
        let px = Self {
            x: r.x0 as i32,
            y: r.y0 as i32,
            width: r.width() as u32,
            height: r.height() as u32,
        };
        Some(px)
    }

    /// Converts back to a [`Rect`].
    #[must_use]
    pub fn to_rect(self) -> Rect {
        Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.x) + f64::from(self.width),
            f64::from(self.y) + f64::from(self.height),
        )
    }

    /// Returns the overlap of two rectangles, or `None` if they are disjoint.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        let (x0_wide, y0_wide) = (i64::from(x0), i64::from(y0));
        if x1 <= x0_wide || y1 <= y0_wide {
            return None;
        }
        #[expect(
            clippy::cast_possible_truncation,
            reason = "the extent is bounded by both input widths"
        )]
        let px = Self::new(x0, y0, (x1 - x0_wide) as u32, (y1 - y0_wide) as u32);
        Some(px)
    }

    /// Returns `true` if the pixel `(x, y)` lies inside.
    #[inline]
    #[must_use]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        i64::from(x) >= i64::from(self.x)
            && i64::from(x) < self.right()
            && i64::from(y) >= i64::from(self.y)
            && i64::from(y) < self.bottom()
    }

    /// One past the right-most column.
    #[inline]
    #[must_use]
    pub fn right(&self) -> i64 {
        i64::from(self.x) + i64::from(self.width)
    }

    /// One past the bottom-most row.
    #[inline]
    #[must_use]
    pub fn bottom(&self) -> i64 {
        i64::from(self.y) + i64::from(self.height)
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    #[inline]
    #[must_use]
    pub const fn area(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Returns `true` if `a` and `b` share a region of non-zero area.
#[inline]
#[must_use]
pub fn overlaps(a: Rect, b: Rect) -> bool {
    !a.intersect(b).is_zero_area()
}

/// Returns `true` if `p` lies in the half-open rectangle `r`.
#[inline]
#[must_use]
pub fn contains(r: Rect, p: Point) -> bool {
    p.x >= r.x0 && p.x < r.x1 && p.y >= r.y0 && p.y < r.y1
}

/// Grows an optional accumulated rectangle to include `r`.
#[must_use]
pub fn union_into(acc: Option<Rect>, r: Rect) -> Option<Rect> {
    if r.is_zero_area() {
        return acc;
    }
    Some(match acc {
        Some(a) => a.union(r),
        None => r,
    })
}
