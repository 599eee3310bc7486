// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clipped drawing surfaces handed to widget draw functions.

use core::fmt;

use kurbo::{Rect, Size};

use super::{Color, Display};
use crate::geometry::PixelRect;

/// Something pixels can be written to, in absolute framebuffer coordinates.
pub trait PixelTarget {
    /// Fills an already-clipped rectangle.
    fn fill_rect(&mut self, area: PixelRect, color: Color);
    /// Reads one pixel.
    fn pixel(&self, x: i32, y: i32) -> Color;
    /// Writes one pixel.
    fn set_pixel(&mut self, x: i32, y: i32, color: Color);
}

/// Draws into one layer of a [`Display`].
pub struct LayerTarget<'a> {
    display: &'a mut dyn Display,
    layer: u8,
}

impl<'a> LayerTarget<'a> {
    /// Targets `layer` of `display`.
    #[must_use]
    pub fn new(display: &'a mut dyn Display, layer: u8) -> Self {
        Self { display, layer }
    }
}

impl fmt::Debug for LayerTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayerTarget")
            .field("layer", &self.layer)
            .finish_non_exhaustive()
    }
}

impl PixelTarget for LayerTarget<'_> {
    fn fill_rect(&mut self, area: PixelRect, color: Color) {
        self.display.fill_rect(self.layer, area, color);
    }

    fn pixel(&self, x: i32, y: i32) -> Color {
        self.display.pixel(self.layer, x, y)
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        self.display.set_pixel(self.layer, x, y, color);
    }
}

/// Draws into an off-screen ARGB8888 buffer covering `area` of the screen.
///
/// Pixels are stored row-major as little-endian `u32` words. Writes outside
/// `area` are dropped.
#[derive(Debug)]
pub struct ScratchTarget<'a> {
    pixels: &'a mut [u8],
    area: PixelRect,
}

impl<'a> ScratchTarget<'a> {
    /// Wraps `pixels`, which must hold at least `area.area() * 4` bytes.
    #[must_use]
    pub fn new(pixels: &'a mut [u8], area: PixelRect) -> Self {
        Self { pixels, area }
    }

    /// The screen area this buffer covers.
    #[must_use]
    pub fn area(&self) -> PixelRect {
        self.area
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if !self.area.contains(x, y) {
            return None;
        }
        let col = x.abs_diff(self.area.x) as usize;
        let row = y.abs_diff(self.area.y) as usize;
        let i = (row * self.area.width as usize + col) * 4;
        (i + 4 <= self.pixels.len()).then_some(i)
    }
}

impl PixelTarget for ScratchTarget<'_> {
    fn fill_rect(&mut self, area: PixelRect, color: Color) {
        let Some(r) = area.intersect(self.area) else {
            return;
        };
        let word = color.0.to_le_bytes();
        for y in r.y..i32::try_from(r.bottom()).unwrap_or(i32::MAX) {
            let Some(start) = self.offset(r.x, y) else {
                continue;
            };
            let end = (start + r.width as usize * 4).min(self.pixels.len());
            for px in self.pixels[start..end].chunks_exact_mut(4) {
                px.copy_from_slice(&word);
            }
        }
    }

    fn pixel(&self, x: i32, y: i32) -> Color {
        match self.offset(x, y) {
            Some(i) => Color(u32::from_le_bytes([
                self.pixels[i],
                self.pixels[i + 1],
                self.pixels[i + 2],
                self.pixels[i + 3],
            ])),
            None => Color(0),
        }
    }

    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(i) = self.offset(x, y) {
            self.pixels[i..i + 4].copy_from_slice(&color.0.to_le_bytes());
        }
    }
}

/// A widget's view of the surface it draws on.
///
/// Coordinates passed to the drawing methods are relative to the widget's
/// top-left corner. Everything is clipped to the widget's clip rectangle:
/// its bounds intersected with every ancestor's inner bounds and the screen.
pub struct Canvas<'a> {
    target: &'a mut dyn PixelTarget,
    clip: PixelRect,
    bounds: Rect,
}

impl<'a> Canvas<'a> {
    /// Creates a canvas for a widget at absolute `bounds`, clipped to `clip`.
    #[must_use]
    pub fn new(target: &'a mut dyn PixelTarget, bounds: Rect, clip: PixelRect) -> Self {
        Self {
            target,
            clip,
            bounds,
        }
    }

    /// The widget's absolute bounds.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// The widget's size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.bounds.size()
    }

    /// The clip rectangle in absolute pixels.
    #[must_use]
    pub fn clip(&self) -> PixelRect {
        self.clip
    }

    /// Fills the whole visible part of the widget.
    pub fn fill(&mut self, color: Color) {
        self.target.fill_rect(self.clip, color);
    }

    /// Fills a rectangle given relative to the widget origin.
    pub fn fill_rect(&mut self, rect: Rect, color: Color) {
        let abs = rect + self.bounds.origin().to_vec2();
        #[expect(
            clippy::cast_possible_truncation,
            reason = "the clip rectangle lies inside the framebuffer"
        )]
        let (w, h) = (self.clip.right().max(0) as u32, self.clip.bottom().max(0) as u32);
        let Some(px) = PixelRect::from_rect(abs, w, h) else {
            return;
        };
        if let Some(area) = px.intersect(self.clip) {
            self.target.fill_rect(area, color);
        }
    }

    /// Reads a pixel at a widget-relative position.
    #[must_use]
    pub fn pixel(&self, x: i32, y: i32) -> Color {
        let (ax, ay) = self.to_abs(x, y);
        self.target.pixel(ax, ay)
    }

    /// Writes a pixel at a widget-relative position, if it is inside the clip.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        let (ax, ay) = self.to_abs(x, y);
        if self.clip.contains(ax, ay) {
            self.target.set_pixel(ax, ay, color);
        }
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "widget origins are whole pixel positions"
    )]
    fn to_abs(&self, x: i32, y: i32) -> (i32, i32) {
        (
            x.saturating_add(self.bounds.x0 as i32),
            y.saturating_add(self.bounds.y0 as i32),
        )
    }
}

impl fmt::Debug for Canvas<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("clip", &self.clip)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}
