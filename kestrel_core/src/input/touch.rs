// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Touch routing.
//!
//! [`TouchRouter`] turns raw [`TouchSample`]s into widget events:
//!
//! - A fresh press with no active widget is hit-tested front to back,
//!   children before their container. The first widget that handles
//!   [`Event::TouchStart`] is brought to the front and becomes active
//!   (and focused, unless the press landed in an on-screen keyboard).
//! - While pressed with an unchanged contact count, [`Event::TouchMove`]
//!   goes to the active widget; an ignored move is offered to each ancestor
//!   in turn, and the first ancestor accepting it becomes active.
//! - A change in contact count re-sends [`Event::TouchStart`] to the active
//!   widget.
//! - A release first settles click recognition, then sends
//!   [`Event::TouchEnd`] and clears the active widget.
//!
//! Click, double-click and long-click recognition runs alongside through a
//! [`ClickDetector`], advanced with every sample and once per tick.
//!
//! Hit-testing walks the desktop's children front to back. Once it passes a
//! visible dialog, only dialog subtrees take part; presses that miss them
//! are dropped.

use alloc::vec::Vec;

use super::click::{ClickDetector, ClickEvent, ClickInput};
use super::{Touch, TouchSample};
use crate::config::ClickConfig;
use crate::geometry::contains;
use crate::time::Millis;
use crate::ui::Ui;
use crate::widget::{ClassFlags, Event, Reply, WidgetFlags, WidgetId};

/// What one sample did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TouchOutcome {
    /// The widget that became active through hit-testing, if any.
    pub hit: Option<WidgetId>,
    /// A click-family event delivered by this sample.
    pub click: Option<ClickEvent>,
}

/// The touch state machine for one touch stream.
#[derive(Clone, Debug)]
pub struct TouchRouter {
    touch: Touch,
    pressed: bool,
    count: u8,
    click: ClickDetector,
    /// The widget click events are delivered to.
    target: Option<WidgetId>,
}

impl TouchRouter {
    /// Creates an idle router.
    #[must_use]
    pub fn new(config: ClickConfig) -> Self {
        Self {
            touch: Touch::default(),
            pressed: false,
            count: 0,
            click: ClickDetector::new(config),
            target: None,
        }
    }

    /// Returns `true` when no press is held and no click window is open.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        !self.pressed && self.click.is_idle()
    }

    /// Whether a contact is currently down.
    #[must_use]
    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Applies one raw sample.
    pub fn process(&mut self, ui: &mut Ui, sample: &TouchSample) -> TouchOutcome {
        self.touch.load(sample);
        let fresh = sample.pressed && !self.pressed;
        let mut outcome = TouchOutcome::default();

        if sample.pressed {
            if fresh && ui.active().is_none() {
                outcome.hit = self.press(ui);
            } else if let Some(active) = ui.active() {
                if sample.count == self.count {
                    self.drag(ui, active);
                    self.follow_active(ui);
                } else {
                    self.relate_to(ui, active);
                    ui.send(active, Event::TouchStart(self.touch));
                }
            }
        }

        if let Some(target) = self.live_target(ui) {
            let bounds = ui.abs_rect(target);
            let input = ClickInput {
                pressed: sample.pressed,
                fresh,
                count: sample.count,
                position: sample.points[0] - bounds.origin().to_vec2(),
                time: sample.time,
                drag_consumed: ui.flags(target).contains(WidgetFlags::TOUCH_MOVE),
                bounds: bounds.size(),
            };
            outcome.click = self.click.advance(Some(&input), sample.time);
            if let Some(event) = outcome.click {
                self.deliver(ui, target, event);
            }
        }

        if !sample.pressed && self.pressed {
            if let Some(active) = ui.active() {
                self.relate_to(ui, active);
                ui.send(active, Event::TouchEnd(self.touch));
                ui.clear_active();
            }
        }

        self.pressed = sample.pressed;
        self.count = sample.count;
        outcome
    }

    /// Advances the click machine when no sample arrived, so long-click and
    /// double-click timeouts fire on time.
    pub fn tick(&mut self, ui: &mut Ui, now: Millis) -> Option<ClickEvent> {
        let target = self.live_target(ui)?;
        let event = self.click.advance(None, now)?;
        self.deliver(ui, target, event);
        Some(event)
    }

    fn live_target(&mut self, ui: &Ui) -> Option<WidgetId> {
        match self.target {
            Some(t) if ui.is_alive(t) => Some(t),
            Some(_) => {
                self.target = None;
                self.click.reset();
                None
            }
            None => None,
        }
    }

    /// Moves click tracking to the active widget when a drag handed the
    /// touch to an ancestor. The press sequence restarts with it.
    fn follow_active(&mut self, ui: &Ui) {
        let active = ui.active();
        if active.is_some() && active != self.target {
            self.target = active;
            self.click.reset();
        }
    }

    fn relate_to(&mut self, ui: &Ui, w: WidgetId) {
        let r = ui.abs_rect(w);
        self.touch.relate(r.origin(), r.size());
    }

    fn related(&self, ui: &Ui, w: WidgetId) -> Touch {
        let mut t = self.touch;
        let r = ui.abs_rect(w);
        t.relate(r.origin(), r.size());
        t
    }

    fn deliver(&mut self, ui: &mut Ui, target: WidgetId, event: ClickEvent) {
        let touch = self.related(ui, target);
        match event {
            ClickEvent::Click => {
                ui.send(target, Event::Click(touch));
            }
            ClickEvent::DblClick => {
                if !ui.send(target, Event::DblClick(touch)).is_handled() && ui.is_alive(target) {
                    ui.send(target, Event::Click(touch));
                }
            }
            ClickEvent::LongClick => {
                ui.send(target, Event::LongClick(touch));
            }
        }
    }

    /// Hit-tests a fresh press and updates focus and active state.
    ///
    /// The desktop's children are walked front to back. Once a visible
    /// dialog has been passed, only dialogs are considered, and the desktop
    /// itself no longer takes the press.
    fn press(&mut self, ui: &mut Ui) -> Option<WidgetId> {
        let root = ui.root();
        let mut dialog_only = false;
        let mut found = None;
        let top: Vec<WidgetId> = ui.widgets().children_rev(root).collect();
        for c in top {
            if !ui.is_alive(c) || ui.flags(c).contains(WidgetFlags::HIDDEN) {
                continue;
            }
            if ui.widgets().class(c).is_dialog() {
                dialog_only = true;
            } else if dialog_only {
                continue;
            }
            found = self.try_widget(ui, c);
            if found.is_some() {
                break;
            }
        }
        if found.is_none() && !dialog_only {
            let t = self.related(ui, root);
            let reply = ui.send(root, Event::TouchStart(t));
            if reply.is_handled() {
                self.touch = t;
                found = Some((root, reply));
            }
        }
        let (hit, reply) = found?;

        let in_keyboard = core::iter::once(hit)
            .chain(ui.widgets().ancestors(hit))
            .any(|w| ui.widgets().class(w).flags.contains(ClassFlags::KEYBOARD_BASE));

        ui.bring_to_front(hit);
        if reply == Reply::Handled {
            if !in_keyboard {
                ui.set_focus(hit);
            }
            ui.set_active(hit);
        } else {
            if !in_keyboard {
                ui.clear_focus();
            }
            ui.clear_active();
        }

        let active = ui.active();
        if active != self.target {
            self.click.reset();
        }
        self.target = active;
        Some(hit)
    }

    /// Searches the children of `parent`, frontmost first.
    fn search(&mut self, ui: &mut Ui, parent: WidgetId) -> Option<(WidgetId, Reply)> {
        let children: Vec<WidgetId> = ui.widgets().children_rev(parent).collect();
        for c in children {
            if !ui.is_alive(c) || ui.flags(c).contains(WidgetFlags::HIDDEN) {
                continue;
            }
            if let Some(hit) = self.try_widget(ui, c) {
                return Some(hit);
            }
        }
        None
    }

    /// Offers the press to `w` if it lies inside, descending into a
    /// container's children before testing the container itself.
    fn try_widget(&mut self, ui: &mut Ui, w: WidgetId) -> Option<(WidgetId, Reply)> {
        let at = self.touch.abs[0];
        let inside = ui
            .widgets()
            .visible_rect(w)
            .is_some_and(|r| contains(r, at));
        if !inside {
            return None;
        }
        if ui.widgets().class(w).allows_children() {
            if let Some(hit) = self.search(ui, w) {
                return Some(hit);
            }
        }
        if !ui.is_alive(w) {
            return None;
        }
        let t = self.related(ui, w);
        let reply = ui.send(w, Event::TouchStart(t));
        if reply.is_handled() {
            self.touch = t;
            return Some((w, reply));
        }
        None
    }

    /// Sends a move to the active widget, bubbling it up the ancestors
    /// until one accepts it.
    fn drag(&mut self, ui: &mut Ui, active: WidgetId) {
        self.relate_to(ui, active);
        let mut w = active;
        let mut touch = self.touch;
        loop {
            match ui.send(w, Event::TouchMove(touch)) {
                Reply::Handled => {
                    if w != active {
                        ui.set_active(w);
                        self.touch = touch;
                    }
                    if ui.is_alive(w) {
                        ui.widgets.flags[w.index() as usize].insert(WidgetFlags::TOUCH_MOVE);
                    }
                    return;
                }
                Reply::HandledNoFocus => {
                    if w != active {
                        ui.set_active(w);
                        self.touch = touch;
                    }
                    return;
                }
                Reply::Ignored | Reply::Refuse => {
                    let Some(p) = ui.is_alive(w).then(|| ui.parent(w)).flatten() else {
                        return;
                    };
                    w = p;
                    touch = self.related(ui, w);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::{Point, Rect};

    use super::*;
    use crate::display::Color;
    use crate::ui::test_support::{
        self, DIALOG, LEAF, Log, PANEL, count, kinds, new_log, record,
    };
    use crate::widget::{EventKind, WidgetClass, draw_nothing, ignore_events};

    static KEYBOARD: WidgetClass = WidgetClass {
        name: "keyboard",
        instance_size: 4,
        flags: ClassFlags::ALLOW_CHILDREN.union(ClassFlags::KEYBOARD_BASE),
        colors: &[Color::BLACK],
        event: ignore_events,
        draw: draw_nothing,
    };

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(x, y, x + w, y + h)
    }

    fn press(x: f64, y: f64, t: u32) -> TouchSample {
        TouchSample::press(Point::new(x, y), Millis(t))
    }

    fn release(x: f64, y: f64, t: u32) -> TouchSample {
        TouchSample::release(Point::new(x, y), Millis(t))
    }

    struct Rig {
        ui: Ui,
        router: TouchRouter,
        log: Log,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                ui: test_support::ui(100.0, 100.0),
                router: TouchRouter::new(ClickConfig::DEFAULT),
                log: new_log(),
            }
        }

        fn widget(&mut self, r: Rect, answers: &[(EventKind, Reply)]) -> WidgetId {
            let w = self
                .ui
                .create(&LEAF, r, None, WidgetFlags::empty())
                .expect("widget");
            record(&mut self.ui, w, &self.log, answers);
            w
        }

        fn feed(&mut self, s: TouchSample) -> TouchOutcome {
            self.router.process(&mut self.ui, &s)
        }

        fn tick(&mut self, t: u32) {
            self.router.tick(&mut self.ui, Millis(t));
        }

        fn count(&self, w: WidgetId, kind: EventKind) -> usize {
            count(&self.log, w, kind)
        }
    }

    const TAKES_TOUCH: &[(EventKind, Reply)] = &[(EventKind::TouchStart, Reply::Handled)];

    #[test]
    fn press_and_release_is_exactly_one_click() {
        let mut rig = Rig::new();
        let w = rig.widget(rect(0.0, 0.0, 50.0, 50.0), TAKES_TOUCH);
        let hit = rig.feed(press(10.0, 10.0, 0)).hit;
        assert_eq!(hit, Some(w));
        assert_eq!(rig.ui.active(), Some(w));
        assert_eq!(rig.ui.focused(), Some(w));
        rig.feed(release(10.0, 10.0, 100));
        rig.tick(500);
        assert_eq!(rig.count(w, EventKind::Click), 1);
        assert_eq!(rig.count(w, EventKind::DblClick), 0);
        assert_eq!(rig.count(w, EventKind::LongClick), 0);
        assert_eq!(rig.count(w, EventKind::TouchEnd), 1);
        assert_eq!(rig.ui.active(), None);
        assert!(rig.router.is_idle());
    }

    #[test]
    fn quick_double_tap_is_one_double_click_with_fallback_click() {
        let mut rig = Rig::new();
        let w = rig.widget(rect(0.0, 0.0, 50.0, 50.0), TAKES_TOUCH);
        rig.feed(press(10.0, 10.0, 0));
        rig.feed(release(10.0, 10.0, 50));
        rig.feed(press(12.0, 12.0, 150));
        rig.feed(release(12.0, 12.0, 200));
        rig.tick(600);
        assert_eq!(rig.count(w, EventKind::DblClick), 1);
        assert_eq!(
            rig.count(w, EventKind::Click),
            2,
            "speculative first click plus the fallback for the ignored double click"
        );
    }

    #[test]
    fn handled_double_click_needs_no_fallback() {
        let mut rig = Rig::new();
        let w = rig.widget(
            rect(0.0, 0.0, 50.0, 50.0),
            &[
                (EventKind::TouchStart, Reply::Handled),
                (EventKind::DblClick, Reply::Handled),
            ],
        );
        rig.feed(press(10.0, 10.0, 0));
        rig.feed(release(10.0, 10.0, 50));
        rig.feed(press(10.0, 10.0, 150));
        rig.feed(release(10.0, 10.0, 200));
        assert_eq!(rig.count(w, EventKind::DblClick), 1);
        assert_eq!(rig.count(w, EventKind::Click), 1);
    }

    #[test]
    fn held_press_is_one_long_click_and_no_click() {
        let mut rig = Rig::new();
        let w = rig.widget(rect(0.0, 0.0, 50.0, 50.0), TAKES_TOUCH);
        rig.feed(press(10.0, 10.0, 0));
        for t in (100..=2100).step_by(100) {
            rig.tick(t);
        }
        rig.feed(release(10.0, 10.0, 2200));
        rig.tick(2600);
        assert_eq!(rig.count(w, EventKind::LongClick), 1);
        assert_eq!(rig.count(w, EventKind::Click), 0);
    }

    #[test]
    fn drag_stays_with_the_pressed_widget() {
        let mut rig = Rig::new();
        let moves = &[
            (EventKind::TouchStart, Reply::Handled),
            (EventKind::TouchMove, Reply::Handled),
        ];
        let a = rig.widget(rect(0.0, 0.0, 20.0, 20.0), moves);
        let b = rig.widget(rect(40.0, 0.0, 20.0, 20.0), moves);

        rig.feed(press(10.0, 10.0, 0));
        for (x, t) in [(20.0, 10), (30.0, 20), (45.0, 30), (50.0, 40)] {
            rig.feed(press(x, 10.0, t));
        }
        assert_eq!(rig.count(a, EventKind::TouchMove), 4);
        assert_eq!(rig.count(b, EventKind::TouchMove), 0);
        assert_eq!(rig.count(b, EventKind::TouchStart), 0);
        assert!(rig.ui.flags(a).contains(WidgetFlags::TOUCH_MOVE));

        rig.feed(release(50.0, 10.0, 60));
        assert_eq!(rig.count(a, EventKind::TouchEnd), 1);
        assert_eq!(rig.count(a, EventKind::Click), 0, "a drag is not a click");

        assert_eq!(rig.feed(press(50.0, 10.0, 500)).hit, Some(b));
        assert_eq!(rig.count(b, EventKind::TouchStart), 1);
    }

    #[test]
    fn ignored_move_bubbles_to_an_accepting_ancestor() {
        let mut rig = Rig::new();
        let panel = rig
            .ui
            .create(&PANEL, rect(0.0, 0.0, 80.0, 80.0), None, WidgetFlags::empty())
            .expect("panel");
        record(
            &mut rig.ui,
            panel,
            &rig.log,
            &[(EventKind::TouchMove, Reply::Handled)],
        );
        let child = rig
            .ui
            .create(&LEAF, rect(10.0, 10.0, 20.0, 20.0), Some(panel), WidgetFlags::empty())
            .expect("child");
        record(&mut rig.ui, child, &rig.log, TAKES_TOUCH);

        rig.feed(press(15.0, 15.0, 0));
        assert_eq!(rig.ui.active(), Some(child));
        rig.feed(press(25.0, 15.0, 10));
        assert_eq!(rig.count(child, EventKind::TouchMove), 1, "offered first");
        assert_eq!(rig.count(panel, EventKind::TouchMove), 1);
        assert_eq!(rig.ui.active(), Some(panel), "the container took over");
        rig.feed(press(35.0, 15.0, 20));
        assert_eq!(rig.count(child, EventKind::TouchMove), 1, "child no longer asked");
        assert_eq!(rig.count(panel, EventKind::TouchMove), 2);
    }

    #[test]
    fn drag_taken_over_by_the_container_is_not_a_click() {
        let mut rig = Rig::new();
        let panel = rig
            .ui
            .create(&PANEL, rect(0.0, 0.0, 80.0, 80.0), None, WidgetFlags::empty())
            .expect("panel");
        record(
            &mut rig.ui,
            panel,
            &rig.log,
            &[(EventKind::TouchMove, Reply::Handled)],
        );
        let child = rig
            .ui
            .create(&LEAF, rect(10.0, 10.0, 20.0, 20.0), Some(panel), WidgetFlags::empty())
            .expect("child");
        record(&mut rig.ui, child, &rig.log, TAKES_TOUCH);

        rig.feed(press(15.0, 15.0, 0));
        rig.feed(press(16.0, 15.0, 10));
        assert_eq!(rig.ui.active(), Some(panel));
        assert!(rig.ui.flags(panel).contains(WidgetFlags::TOUCH_MOVE));
        rig.feed(release(16.0, 15.0, 20));
        rig.tick(500);
        assert_eq!(rig.count(child, EventKind::Click), 0, "the container dragged");
        assert_eq!(rig.count(panel, EventKind::Click), 0);
        assert_eq!(rig.count(panel, EventKind::TouchEnd), 1);
        assert!(rig.router.is_idle());
    }

    #[test]
    fn click_arrives_while_the_widget_is_still_active() {
        let mut rig = Rig::new();
        let w = rig.widget(rect(0.0, 0.0, 50.0, 50.0), TAKES_TOUCH);
        rig.feed(press(10.0, 10.0, 0));
        rig.feed(release(10.0, 10.0, 50));
        let tail: Vec<EventKind> = kinds(&rig.log, w)
            .into_iter()
            .skip_while(|k| *k != EventKind::Click)
            .collect();
        assert_eq!(
            tail,
            vec![EventKind::Click, EventKind::TouchEnd, EventKind::ActiveOut]
        );
    }

    #[test]
    fn children_are_tested_before_their_container() {
        let mut rig = Rig::new();
        let panel = rig
            .ui
            .create(&PANEL, rect(0.0, 0.0, 80.0, 80.0), None, WidgetFlags::empty())
            .expect("panel");
        record(&mut rig.ui, panel, &rig.log, TAKES_TOUCH);
        let child = rig
            .ui
            .create(&LEAF, rect(10.0, 10.0, 20.0, 20.0), Some(panel), WidgetFlags::empty())
            .expect("child");
        record(&mut rig.ui, child, &rig.log, TAKES_TOUCH);
        assert_eq!(rig.feed(press(15.0, 15.0, 0)).hit, Some(child));
        assert_eq!(rig.count(panel, EventKind::TouchStart), 0);
        assert_eq!(rig.ui.focused(), Some(child));
        assert!(rig.ui.flags(panel).contains(WidgetFlags::FOCUSED), "focus chain");
    }

    #[test]
    fn hit_widget_is_brought_to_front() {
        let mut rig = Rig::new();
        let a = rig.widget(rect(0.0, 0.0, 50.0, 50.0), TAKES_TOUCH);
        let _b = rig.widget(rect(60.0, 0.0, 20.0, 20.0), TAKES_TOUCH);
        rig.feed(press(10.0, 10.0, 0));
        let root = rig.ui.root();
        assert_eq!(rig.ui.widgets().children_rev(root).next(), Some(a));
    }

    #[test]
    fn dialog_blocks_touches_to_widgets_beneath() {
        let mut rig = Rig::new();
        let below = rig.widget(rect(0.0, 0.0, 100.0, 100.0), TAKES_TOUCH);
        let dialog = rig
            .ui
            .create(&DIALOG, rect(30.0, 30.0, 40.0, 40.0), None, WidgetFlags::empty())
            .expect("dialog");
        record(&mut rig.ui, dialog, &rig.log, TAKES_TOUCH);

        assert_eq!(rig.feed(press(5.0, 5.0, 0)).hit, None);
        rig.feed(release(5.0, 5.0, 10));
        assert_eq!(rig.count(below, EventKind::TouchStart), 0);

        assert_eq!(rig.feed(press(40.0, 40.0, 500)).hit, Some(dialog));

        rig.feed(release(40.0, 40.0, 510));
        rig.ui.hide(dialog);
        assert_eq!(
            rig.feed(press(5.0, 5.0, 2000)).hit,
            Some(below),
            "hidden dialogs are not modal"
        );
    }

    #[test]
    fn widgets_in_front_of_a_dialog_still_take_presses() {
        let mut rig = Rig::new();
        let below = rig.widget(rect(0.0, 0.0, 100.0, 100.0), TAKES_TOUCH);
        let dialog = rig
            .ui
            .create(&DIALOG, rect(0.0, 0.0, 60.0, 60.0), None, WidgetFlags::empty())
            .expect("dialog");
        record(&mut rig.ui, dialog, &rig.log, TAKES_TOUCH);
        let front = rig.widget(rect(10.0, 10.0, 20.0, 20.0), TAKES_TOUCH);
        let root = rig.ui.root();
        assert_eq!(rig.ui.widgets().children_rev(root).next(), Some(front));

        assert_eq!(rig.feed(press(15.0, 15.0, 0)).hit, Some(front));
        rig.feed(release(15.0, 15.0, 10));
        assert_eq!(rig.count(dialog, EventKind::TouchStart), 0);

        assert_eq!(rig.feed(press(45.0, 45.0, 1000)).hit, Some(dialog));
        rig.feed(release(45.0, 45.0, 1010));
        assert_eq!(rig.feed(press(80.0, 80.0, 2000)).hit, None, "behind the dialog");
        assert_eq!(rig.count(below, EventKind::TouchStart), 0);
    }

    #[test]
    fn handled_no_focus_clears_focus_and_active() {
        let mut rig = Rig::new();
        let a = rig.widget(rect(0.0, 0.0, 20.0, 20.0), TAKES_TOUCH);
        let b = rig.widget(
            rect(40.0, 0.0, 20.0, 20.0),
            &[(EventKind::TouchStart, Reply::HandledNoFocus)],
        );
        rig.feed(press(5.0, 5.0, 0));
        rig.feed(release(5.0, 5.0, 10));
        assert_eq!(rig.ui.focused(), Some(a));
        assert_eq!(rig.feed(press(45.0, 5.0, 1000)).hit, Some(b));
        assert_eq!(rig.ui.focused(), None);
        assert_eq!(rig.ui.active(), None);
    }

    #[test]
    fn keyboard_presses_keep_focus() {
        let mut rig = Rig::new();
        let field = rig.widget(rect(0.0, 0.0, 100.0, 20.0), TAKES_TOUCH);
        let kb = rig
            .ui
            .create(&KEYBOARD, rect(0.0, 50.0, 100.0, 50.0), None, WidgetFlags::empty())
            .expect("keyboard");
        let key = rig
            .ui
            .create(&LEAF, rect(0.0, 0.0, 20.0, 20.0), Some(kb), WidgetFlags::empty())
            .expect("key");
        record(&mut rig.ui, key, &rig.log, TAKES_TOUCH);

        rig.feed(press(5.0, 5.0, 0));
        rig.feed(release(5.0, 5.0, 10));
        assert_eq!(rig.ui.focused(), Some(field));
        assert_eq!(rig.feed(press(5.0, 55.0, 1000)).hit, Some(key));
        assert_eq!(rig.ui.focused(), Some(field), "typing target keeps focus");
        assert_eq!(rig.ui.active(), Some(key));
    }

    #[test]
    fn contact_count_change_restarts_the_touch() {
        let mut rig = Rig::new();
        let w = rig.widget(rect(0.0, 0.0, 50.0, 50.0), TAKES_TOUCH);
        rig.feed(press(10.0, 10.0, 0));
        rig.feed(TouchSample::pinch(
            Point::new(10.0, 10.0),
            Point::new(30.0, 10.0),
            Millis(10),
        ));
        assert_eq!(rig.count(w, EventKind::TouchStart), 2);
        assert_eq!(rig.count(w, EventKind::TouchMove), 0);
    }

    #[test]
    fn desktop_takes_presses_on_empty_space() {
        let mut rig = Rig::new();
        let a = rig.widget(rect(0.0, 0.0, 20.0, 20.0), TAKES_TOUCH);
        rig.feed(press(5.0, 5.0, 0));
        rig.feed(release(5.0, 5.0, 10));
        let root = rig.ui.root();
        assert_eq!(rig.feed(press(80.0, 80.0, 1000)).hit, Some(root));
        assert_eq!(rig.ui.focused(), None, "the desktop never holds focus");
        assert!(!rig.ui.flags(a).contains(WidgetFlags::FOCUSED));
    }

    #[test]
    fn removed_target_cancels_pending_clicks() {
        let mut rig = Rig::new();
        let w = rig.widget(rect(0.0, 0.0, 50.0, 50.0), TAKES_TOUCH);
        rig.feed(press(10.0, 10.0, 0));
        assert!(rig.ui.remove(w));
        rig.ui.execute_removals();
        rig.feed(release(10.0, 10.0, 50));
        rig.tick(3000);
        assert!(rig.router.is_idle());
    }
}
