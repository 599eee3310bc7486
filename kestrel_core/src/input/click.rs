// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Click, double-click, and long-click detection.
//!
//! [`ClickDetector`] is a resumable state machine advanced once per touch
//! sample and once per tick without samples, so its timeouts fire even when
//! the touch controller is silent. It never blocks; "waiting" just means
//! staying in a state until a later call.
//!
//! ```text
//!  Idle ──fresh single press──► Tracking(first)
//!  Tracking ──held past long_click──► LongClick, Idle      (first press only)
//!  Tracking ──release──► Click, AwaitSecond
//!  AwaitSecond ──fresh press within window──► Tracking(second)
//!  AwaitSecond ──window elapsed──► Idle
//!  Tracking(second) ──release, within tolerance──► DblClick, Idle
//! ```
//!
//! Any saved press position outside the active widget's bounds at release
//! cancels the pending click silently.

use kurbo::{Point, Size};

use crate::config::ClickConfig;
use crate::time::Millis;

/// A semantic event recognised from raw presses and releases.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClickEvent {
    /// Press and release on the same widget.
    Click,
    /// Two clicks close together in time and space.
    DblClick,
    /// A press held without release.
    LongClick,
}

/// One touch sample, as seen by the click detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClickInput {
    /// Whether the contact is down.
    pub pressed: bool,
    /// Whether this sample is a press edge (previous sample was released).
    pub fresh: bool,
    /// Number of contacts.
    pub count: u8,
    /// First contact, relative to the active widget.
    pub position: Point,
    /// Sample time.
    pub time: Millis,
    /// Whether the active widget consumed movement of this press as a drag.
    pub drag_consumed: bool,
    /// Current size of the active widget.
    pub bounds: Size,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    Idle,
    Tracking {
        second: bool,
        since: Millis,
        pos: [Point; 2],
    },
    AwaitSecond {
        since: Millis,
        first: Point,
    },
}

/// The per-stream click state machine.
#[derive(Clone, Debug)]
pub struct ClickDetector {
    config: ClickConfig,
    state: State,
}

impl ClickDetector {
    /// Creates an idle detector.
    #[must_use]
    pub fn new(config: ClickConfig) -> Self {
        Self {
            config,
            state: State::Idle,
        }
    }

    /// Returns `true` when no press sequence is in progress.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self.state, State::Idle)
    }

    /// Abandons any sequence in progress.
    pub fn reset(&mut self) {
        self.state = State::Idle;
    }

    /// Advances the machine with a new sample, or with `None` when a tick
    /// passes without samples.
    pub fn advance(&mut self, input: Option<&ClickInput>, now: Millis) -> Option<ClickEvent> {
        match self.state {
            State::Idle => {
                if let Some(i) = input.filter(|i| is_fresh_single(i)) {
                    self.state = State::Tracking {
                        second: false,
                        since: i.time,
                        pos: [i.position, Point::ZERO],
                    };
                }
                None
            }
            State::Tracking {
                second,
                since,
                mut pos,
            } => {
                let Some(i) = input else {
                    if now.exceeds(since, self.config.long_click) {
                        self.state = State::Idle;
                        return (!second).then_some(ClickEvent::LongClick);
                    }
                    return None;
                };
                let slot = usize::from(second);
                if i.pressed {
                    if i.drag_consumed {
                        self.state = State::Idle;
                    } else {
                        pos[slot] = i.position;
                        self.state = State::Tracking {
                            second,
                            since: i.time,
                            pos,
                        };
                    }
                    return None;
                }
                self.release(second, pos, i)
            }
            State::AwaitSecond { since, first } => {
                if now.exceeds(since, self.config.double_click_window) {
                    self.state = State::Idle;
                    return self.advance(input, now);
                }
                if let Some(i) = input.filter(|i| is_fresh_single(i)) {
                    self.state = State::Tracking {
                        second: true,
                        since: i.time,
                        pos: [first, i.position],
                    };
                }
                None
            }
        }
    }

    fn release(&mut self, second: bool, pos: [Point; 2], i: &ClickInput) -> Option<ClickEvent> {
        let tol = self.config.tolerance;
        let latest = pos[usize::from(second)];
        let within = |d: f64| -tol <= d && d <= tol;
        let second = second && within(pos[0].x - pos[1].x) && within(pos[0].y - pos[1].y);

        let inside = |p: Point| {
            p.x >= 0.0 && p.x <= i.bounds.width && p.y >= 0.0 && p.y <= i.bounds.height
        };
        if !pos.iter().all(|p| inside(*p)) {
            self.state = State::Idle;
            return None;
        }

        if second {
            self.state = State::Idle;
            Some(ClickEvent::DblClick)
        } else {
            self.state = State::AwaitSecond {
                since: i.time,
                first: latest,
            };
            Some(ClickEvent::Click)
        }
    }
}

fn is_fresh_single(i: &ClickInput) -> bool {
    i.pressed && i.fresh && i.count == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIZE: Size = Size::new(100.0, 50.0);

    fn press(x: f64, y: f64, t: u32) -> ClickInput {
        ClickInput {
            pressed: true,
            fresh: true,
            count: 1,
            position: Point::new(x, y),
            time: Millis(t),
            drag_consumed: false,
            bounds: SIZE,
        }
    }

    fn hold(x: f64, y: f64, t: u32) -> ClickInput {
        ClickInput {
            fresh: false,
            ..press(x, y, t)
        }
    }

    fn release(t: u32) -> ClickInput {
        ClickInput {
            pressed: false,
            fresh: false,
            ..press(0.0, 0.0, t)
        }
    }

    fn feed(d: &mut ClickDetector, i: &ClickInput) -> Option<ClickEvent> {
        d.advance(Some(i), i.time)
    }

    #[test]
    fn press_release_is_one_click() {
        let mut d = ClickDetector::new(ClickConfig::DEFAULT);
        assert_eq!(feed(&mut d, &press(10.0, 10.0, 0)), None);
        assert_eq!(feed(&mut d, &release(50)), Some(ClickEvent::Click));
        assert_eq!(d.advance(None, Millis(400)), None, "window expires quietly");
        assert!(d.is_idle());
    }

    #[test]
    fn two_quick_clicks_make_a_double_click() {
        let mut d = ClickDetector::new(ClickConfig::DEFAULT);
        feed(&mut d, &press(10.0, 10.0, 0));
        assert_eq!(feed(&mut d, &release(50)), Some(ClickEvent::Click));
        assert_eq!(feed(&mut d, &press(12.0, 11.0, 200)), None);
        assert_eq!(feed(&mut d, &release(250)), Some(ClickEvent::DblClick));
        assert!(d.is_idle());
    }

    #[test]
    fn distant_second_press_is_a_plain_click() {
        let mut d = ClickDetector::new(ClickConfig::DEFAULT);
        feed(&mut d, &press(0.0, 0.0, 0));
        feed(&mut d, &release(50));
        feed(&mut d, &press(80.0, 0.0, 100));
        assert_eq!(
            feed(&mut d, &release(150)),
            Some(ClickEvent::Click),
            "beyond tolerance"
        );
    }

    #[test]
    fn held_press_is_a_long_click() {
        let mut d = ClickDetector::new(ClickConfig::DEFAULT);
        feed(&mut d, &press(10.0, 10.0, 0));
        assert_eq!(d.advance(None, Millis(2000)), None, "not strictly past");
        assert_eq!(d.advance(None, Millis(2001)), Some(ClickEvent::LongClick));
        assert!(d.is_idle());
        assert_eq!(feed(&mut d, &release(2100)), None, "no click after long click");
    }

    #[test]
    fn hold_updates_refresh_the_long_click_timer() {
        let mut d = ClickDetector::new(ClickConfig::DEFAULT);
        feed(&mut d, &press(10.0, 10.0, 0));
        feed(&mut d, &hold(11.0, 10.0, 1500));
        assert_eq!(d.advance(None, Millis(2500)), None, "timer restarted at 1500");
        assert_eq!(d.advance(None, Millis(3501)), Some(ClickEvent::LongClick));
    }

    #[test]
    fn second_press_never_long_clicks() {
        let mut d = ClickDetector::new(ClickConfig::DEFAULT);
        feed(&mut d, &press(10.0, 10.0, 0));
        feed(&mut d, &release(10));
        feed(&mut d, &press(10.0, 10.0, 100));
        assert_eq!(d.advance(None, Millis(5000)), None);
        assert!(d.is_idle());
    }

    #[test]
    fn consumed_drag_cancels_the_click() {
        let mut d = ClickDetector::new(ClickConfig::DEFAULT);
        feed(&mut d, &press(10.0, 10.0, 0));
        let drag = ClickInput {
            drag_consumed: true,
            ..hold(40.0, 10.0, 20)
        };
        feed(&mut d, &drag);
        assert_eq!(feed(&mut d, &release(40)), None);
    }

    #[test]
    fn press_outside_bounds_cancels() {
        let mut d = ClickDetector::new(ClickConfig::DEFAULT);
        feed(&mut d, &press(10.0, 10.0, 0));
        feed(&mut d, &hold(150.0, 10.0, 10));
        assert_eq!(feed(&mut d, &release(20)), None, "last position off the widget");
        assert!(d.is_idle());
    }

    #[test]
    fn late_second_press_starts_a_new_sequence() {
        let mut d = ClickDetector::new(ClickConfig::DEFAULT);
        feed(&mut d, &press(10.0, 10.0, 0));
        feed(&mut d, &release(10));
        feed(&mut d, &press(10.0, 10.0, 500));
        assert_eq!(
            feed(&mut d, &release(520)),
            Some(ClickEvent::Click),
            "a click, not a double click"
        );
    }

    #[test]
    fn multi_touch_press_does_not_start_tracking() {
        let mut d = ClickDetector::new(ClickConfig::DEFAULT);
        let pinch = ClickInput {
            count: 2,
            ..press(10.0, 10.0, 0)
        };
        feed(&mut d, &pinch);
        assert!(d.is_idle());
    }
}
