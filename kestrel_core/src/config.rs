// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Runtime configuration.

use crate::display::Color;
use crate::time::Millis;

/// Click, double-click, and long-click detection parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClickConfig {
    /// How long a press must be held, without release, to count as a long
    /// click.
    pub long_click: Millis,
    /// How long after a click a second press may start to form a double
    /// click.
    pub double_click_window: Millis,
    /// Maximum distance in pixels, per axis, between the two presses of a
    /// double click.
    pub tolerance: f64,
}

impl ClickConfig {
    /// Embedded defaults: 2 s long click, 300 ms window, 30 px tolerance.
    pub const DEFAULT: Self = Self {
        long_click: Millis(2000),
        double_click_window: Millis(300),
        tolerance: 30.0,
    };
}

impl Default for ClickConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Configuration for a [`Gui`](crate::gui::Gui).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GuiConfig {
    /// Click detection parameters.
    pub click: ClickConfig,
    /// Capacity of the raw touch-sample queue.
    pub touch_queue: usize,
    /// Capacity of the raw key-sample queue.
    pub key_queue: usize,
    /// Desktop background color.
    pub background: Color,
    /// Bounded wait used by `run_once` while timers, click windows, or a
    /// layer confirmation are pending.
    pub timer_poll: Millis,
    /// Wait used by `run_once` when nothing is pending. `None` blocks until
    /// a message arrives.
    pub idle_wait: Option<Millis>,
    /// Whether translucent widgets are composited. When off they draw
    /// opaque.
    pub alpha_compositing: bool,
}

impl GuiConfig {
    /// Defaults tuned for a microcontroller target.
    pub const DEFAULT: Self = Self {
        click: ClickConfig::DEFAULT,
        touch_queue: 10,
        key_queue: 10,
        background: Color::LIGHT_GRAY,
        timer_poll: Millis(1),
        idle_wait: None,
        alpha_compositing: true,
    };

    /// Defaults for a desktop simulator: coarser polling and an idle wake-up
    /// so a host window stays responsive.
    #[must_use]
    pub const fn simulator() -> Self {
        Self {
            timer_poll: Millis(10),
            idle_wait: Some(Millis(100)),
            touch_queue: 64,
            key_queue: 64,
            ..Self::DEFAULT
        }
    }

    /// Sets the click detection parameters.
    #[must_use]
    pub const fn with_click(mut self, click: ClickConfig) -> Self {
        self.click = click;
        self
    }

    /// Sets both input queue capacities.
    #[must_use]
    pub const fn with_queue_capacity(mut self, touch: usize, key: usize) -> Self {
        self.touch_queue = touch;
        self.key_queue = key;
        self
    }

    /// Sets the desktop background color.
    #[must_use]
    pub const fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Sets the pending-work and idle waits.
    #[must_use]
    pub const fn with_waits(mut self, timer_poll: Millis, idle_wait: Option<Millis>) -> Self {
        self.timer_poll = timer_poll;
        self.idle_wait = idle_wait;
        self
    }

    /// Enables or disables alpha compositing.
    #[must_use]
    pub const fn with_alpha_compositing(mut self, enabled: bool) -> Self {
        self.alpha_compositing = enabled;
        self
    }
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
