// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory display driver for tests, simulators, and headless runs.

use alloc::vec;
use alloc::vec::Vec;

use super::{Color, Display, DisplayInfo};
use crate::geometry::PixelRect;

/// How a [`MemoryDisplay`] confirms layer switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmMode {
    /// The switch takes effect inside `set_active_layer`.
    Immediate,
    /// The switch waits for [`MemoryDisplay::confirm`], like a panel that
    /// flips on the next vertical blank.
    Manual,
}

/// A [`Display`] backed by plain pixel vectors.
#[derive(Clone, Debug)]
pub struct MemoryDisplay {
    width: u32,
    height: u32,
    layers: Vec<Vec<Color>>,
    shown: u8,
    requested: Option<u8>,
    confirmed: bool,
    mode: ConfirmMode,
    fail_init: bool,
    activations: u32,
    copied_pixels: u64,
}

impl MemoryDisplay {
    /// Creates a display with `layer_count` black layers and immediate
    /// layer confirmation.
    #[must_use]
    pub fn new(width: u32, height: u32, layer_count: u8) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            layers: vec![vec![Color::BLACK; size]; usize::from(layer_count)],
            shown: 0,
            requested: None,
            confirmed: false,
            mode: ConfirmMode::Immediate,
            fail_init: false,
            activations: 0,
            copied_pixels: 0,
        }
    }

    /// Sets the confirmation mode.
    #[must_use]
    pub fn with_confirm(mut self, mode: ConfirmMode) -> Self {
        self.mode = mode;
        self
    }

    /// Makes [`Display::init`] report failure.
    #[must_use]
    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Completes a pending layer switch in [`ConfirmMode::Manual`].
    pub fn confirm(&mut self) {
        if let Some(layer) = self.requested.take() {
            self.shown = layer;
            self.confirmed = true;
        }
    }

    /// The layer currently on screen.
    #[must_use]
    pub fn shown_layer(&self) -> u8 {
        self.shown
    }

    /// Number of `set_active_layer` calls so far.
    #[must_use]
    pub fn activations(&self) -> u32 {
        self.activations
    }

    /// Total pixels moved by `copy_rect`.
    #[must_use]
    pub fn copied_pixels(&self) -> u64 {
        self.copied_pixels
    }

    /// Reads a pixel of the layer currently on screen.
    #[must_use]
    pub fn shown_pixel(&self, x: i32, y: i32) -> Color {
        self.pixel(self.shown, x, y)
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = u32::try_from(x).ok()?;
        let y = u32::try_from(y).ok()?;
        (x < self.width && y < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }
}

impl Display for MemoryDisplay {
    fn info(&self) -> DisplayInfo {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "constructed from a u8 layer count"
        )]
        let layer_count = self.layers.len() as u8;
        DisplayInfo {
            width: self.width,
            height: self.height,
            layer_count,
        }
    }

    fn init(&mut self) -> bool {
        !self.fail_init
    }

    fn fill_rect(&mut self, layer: u8, area: PixelRect, color: Color) {
        let Some(r) = PixelRect::from_rect(area.to_rect(), self.width, self.height) else {
            return;
        };
        let width = self.width as usize;
        let Some(pixels) = self.layers.get_mut(usize::from(layer)) else {
            return;
        };
        for y in r.y..r.y + r.height as i32 {
            let row = y as usize * width;
            let start = row + r.x as usize;
            pixels[start..start + r.width as usize].fill(color);
        }
    }

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
    ) {
        let mut row = Vec::with_capacity(width as usize);
        for dy in 0..height as i32 {
            row.clear();
            row.extend((0..width as i32).map(|dx| self.pixel(src_layer, src_x + dx, src_y + dy)));
            for (dx, color) in row.iter().enumerate() {
                self.set_pixel(dst_layer, dst_x + dx as i32, dst_y + dy, *color);
            }
        }
        self.copied_pixels += u64::from(width) * u64::from(height);
    }

    fn pixel(&self, layer: u8, x: i32, y: i32) -> Color {
        match (self.layers.get(usize::from(layer)), self.index(x, y)) {
            (Some(pixels), Some(i)) => pixels[i],
            _ => Color(0),
        }
    }

    fn set_pixel(&mut self, layer: u8, x: i32, y: i32, color: Color) {
        if let Some(i) = self.index(x, y) {
            if let Some(pixels) = self.layers.get_mut(usize::from(layer)) {
                pixels[i] = color;
            }
        }
    }

    fn set_active_layer(&mut self, layer: u8) {
        self.activations += 1;
        self.requested = Some(layer);
        if self.mode == ConfirmMode::Immediate {
            self.confirm();
        }
    }

    fn take_layer_confirmation(&mut self) -> bool {
        core::mem::take(&mut self.confirmed)
    }
}
