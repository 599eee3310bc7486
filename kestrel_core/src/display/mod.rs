// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The display driver contract.
//!
//! A [`Display`] owns one or more full-screen pixel layers. The core only
//! needs rectangle fills, layer-to-layer copies, single-pixel access for the
//! software blend fallback, and an asynchronous "show this layer" request
//! whose completion it polls through
//! [`take_layer_confirmation`](Display::take_layer_confirmation).
//!
//! Colors cross this boundary as ARGB8888 ([`Color`]); drivers with another
//! native format convert at the edge.

mod canvas;
mod memory;

pub use canvas::{Canvas, LayerTarget, PixelTarget, ScratchTarget};
pub use memory::{ConfirmMode, MemoryDisplay};

use core::fmt;

use crate::geometry::PixelRect;

/// A 32-bit ARGB8888 color.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color(pub u32);

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self(0xFF00_0000);
    /// Opaque white.
    pub const WHITE: Self = Self(0xFFFF_FFFF);
    /// Light gray, the default desktop background.
    pub const LIGHT_GRAY: Self = Self(0xFFCC_CCCC);

    /// Builds an opaque color from its channels.
    #[inline]
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(0xFF00_0000 | ((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    /// Red channel.
    #[inline]
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "channel extraction")]
    pub const fn r(self) -> u8 {
        (self.0 >> 16) as u8
    }

    /// Green channel.
    #[inline]
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "channel extraction")]
    pub const fn g(self) -> u8 {
        (self.0 >> 8) as u8
    }

    /// Blue channel.
    #[inline]
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "channel extraction")]
    pub const fn b(self) -> u8 {
        self.0 as u8
    }

    /// Blends `self` over `bg` with coverage `alpha` (0 = only `bg`,
    /// 255 = only `self`). The result is opaque.
    #[must_use]
    pub fn blend_over(self, bg: Self, alpha: u8) -> Self {
        let a = f32::from(alpha) / 255.0;
        let mix = |fg: u8, bg: u8| -> u8 {
            let v = f32::from(fg) * a + (1.0 - a) * f32::from(bg);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "a convex mix of two u8 values stays within u8"
            )]
            let v = v as u8;
            v
        };
        Self::rgb(
            mix(self.r(), bg.r()),
            mix(self.g(), bg.g()),
            mix(self.b(), bg.b()),
        )
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Color(#{:08X})", self.0)
    }
}

/// Static properties reported by a driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayInfo {
    /// Framebuffer width in pixels.
    pub width: u32,
    /// Framebuffer height in pixels.
    pub height: u32,
    /// Number of full-screen layers. The runtime double-buffers when there
    /// are at least two and draws straight into layer 0 otherwise.
    pub layer_count: u8,
}

/// The display driver consumed by the runtime.
///
/// All coordinates are absolute framebuffer pixels; callers clip before
/// calling.
pub trait Display {
    /// Returns the framebuffer geometry and layer count.
    fn info(&self) -> DisplayInfo;

    /// Prepares the hardware. Returns `false` on failure.
    fn init(&mut self) -> bool {
        true
    }

    /// Fills `area` of `layer` with a solid color.
    fn fill_rect(&mut self, layer: u8, area: PixelRect, color: Color);

    /// Copies a `width` x `height` block from `src_layer` at `(src_x, src_y)`
    /// to `dst_layer` at `(dst_x, dst_y)`.
    fn copy_rect(
        &mut self,
        dst_layer: u8,
        dst_x: i32,
        dst_y: i32,
        src_layer: u8,
        src_x: i32,
        src_y: i32,
        width: u32,
        height: u32,
    );

    /// Reads one pixel.
    fn pixel(&self, layer: u8, x: i32, y: i32) -> Color;

    /// Writes one pixel.
    fn set_pixel(&mut self, layer: u8, x: i32, y: i32, color: Color);

    /// Asks the hardware to show `layer`. Completion is reported later
    /// through [`take_layer_confirmation`](Self::take_layer_confirmation).
    fn set_active_layer(&mut self, layer: u8);

    /// Returns `true` once the last [`set_active_layer`](Self::set_active_layer)
    /// request has taken effect, consuming the confirmation.
    fn take_layer_confirmation(&mut self) -> bool;

    /// Optional hardware blend of an ARGB8888 `src` block (row-major,
    /// `area.width * area.height * 4` bytes, little-endian words) onto
    /// `area` of `layer` with coverage `alpha`.
    ///
    /// Returns `false` when unsupported; the runtime then blends pixel by
    /// pixel through [`pixel`](Self::pixel) and [`set_pixel`](Self::set_pixel).
    fn blend(&mut self, layer: u8, area: PixelRect, src: &[u8], alpha: u8) -> bool {
        _ = (layer, area, src, alpha);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channels_round_trip() {
        let c = Color::rgb(0x12, 0x34, 0x56);
        assert_eq!(c.0, 0xFF12_3456);
        assert_eq!((c.r(), c.g(), c.b()), (0x12, 0x34, 0x56));
    }

    #[test]
    fn blend_extremes() {
        let fg = Color::rgb(200, 100, 0);
        let bg = Color::rgb(0, 100, 200);
        assert_eq!(fg.blend_over(bg, 255), fg, "opaque keeps foreground");
        assert_eq!(fg.blend_over(bg, 0), bg, "transparent keeps background");
    }

    #[test]
    fn blend_half() {
        let out = Color::WHITE.blend_over(Color::BLACK, 128);
        assert!(
            (127..=128).contains(&out.r()),
            "about half of white over black, got {}",
            out.r()
        );
        assert_eq!(out.0 >> 24, 0xFF, "result is opaque");
    }
}
