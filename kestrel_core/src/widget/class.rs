// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Widget classes, events, and the callback contract.

use bitflags::bitflags;

use super::id::WidgetId;
use super::view::WidgetView;
use crate::display::{Canvas, Color};
use crate::input::{KeySample, Touch};
use crate::ui::Ui;

bitflags! {
    /// Per-widget state flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct WidgetFlags: u16 {
        /// The widget and its subtree are not drawn and receive no touches.
        const HIDDEN = 1 << 0;
        /// The widget must be repainted on the next present.
        const DIRTY = 1 << 1;
        /// The widget has keyboard focus.
        const FOCUSED = 1 << 2;
        /// The widget owns the touch sequence in progress.
        const ACTIVE = 1 << 3;
        /// The active widget consumed the current press as a drag.
        const TOUCH_MOVE = 1 << 4;
        /// The widget is queued for removal at the next tick.
        const REMOVE = 1 << 5;
        /// Invalidation requests for this widget are ignored.
        const IGNORE_INVALIDATE = 1 << 6;
    }
}

bitflags! {
    /// Capabilities of a widget class.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ClassFlags: u8 {
        /// Instances may have children.
        const ALLOW_CHILDREN = 1 << 0;
        /// Instances are modal dialogs: always parented to the desktop, and
        /// while one is present only dialog subtrees receive touches.
        const DIALOG_BASE = 1 << 1;
        /// Instances are on-screen keyboards: pressing inside them never
        /// moves keyboard focus.
        const KEYBOARD_BASE = 1 << 2;
    }
}

/// An event delivered to a widget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Event {
    /// Sent before the widget is linked into the tree. Reply
    /// [`Reply::Refuse`] to cancel creation.
    PreInit,
    /// Sent once the widget is linked into the tree.
    Init,
    /// Sent when removal is requested. Reply [`Reply::Refuse`] to veto.
    Remove,
    /// Sent to a parent after a child finished initializing.
    ChildCreated(WidgetId),
    /// A press landed on the widget during hit-testing, or the number of
    /// contacts changed while it was active.
    TouchStart(Touch),
    /// The active press moved.
    TouchMove(Touch),
    /// The active press was released.
    TouchEnd(Touch),
    /// Press and release on the widget.
    Click(Touch),
    /// Two quick clicks.
    DblClick(Touch),
    /// A press held without release.
    LongClick(Touch),
    /// A key press while the widget has focus.
    KeyPress(KeySample),
    /// The widget gained keyboard focus.
    FocusIn,
    /// The widget lost keyboard focus.
    FocusOut,
    /// The widget became the active (touch-owning) widget.
    ActiveIn,
    /// The widget stopped being active.
    ActiveOut,
    /// The widget's text buffer was edited.
    TextChanged,
}

impl Event {
    /// The event's kind, without payload.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::PreInit => EventKind::PreInit,
            Self::Init => EventKind::Init,
            Self::Remove => EventKind::Remove,
            Self::ChildCreated(_) => EventKind::ChildCreated,
            Self::TouchStart(_) => EventKind::TouchStart,
            Self::TouchMove(_) => EventKind::TouchMove,
            Self::TouchEnd(_) => EventKind::TouchEnd,
            Self::Click(_) => EventKind::Click,
            Self::DblClick(_) => EventKind::DblClick,
            Self::LongClick(_) => EventKind::LongClick,
            Self::KeyPress(_) => EventKind::KeyPress,
            Self::FocusIn => EventKind::FocusIn,
            Self::FocusOut => EventKind::FocusOut,
            Self::ActiveIn => EventKind::ActiveIn,
            Self::ActiveOut => EventKind::ActiveOut,
            Self::TextChanged => EventKind::TextChanged,
        }
    }
}

/// Payload-free discriminant of an [`Event`], used in diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    /// [`Event::PreInit`].
    PreInit = 0,
    /// [`Event::Init`].
    Init = 1,
    /// [`Event::Remove`].
    Remove = 2,
    /// [`Event::ChildCreated`].
    ChildCreated = 3,
    /// [`Event::TouchStart`].
    TouchStart = 4,
    /// [`Event::TouchMove`].
    TouchMove = 5,
    /// [`Event::TouchEnd`].
    TouchEnd = 6,
    /// [`Event::Click`].
    Click = 7,
    /// [`Event::DblClick`].
    DblClick = 8,
    /// [`Event::LongClick`].
    LongClick = 9,
    /// [`Event::KeyPress`].
    KeyPress = 10,
    /// [`Event::FocusIn`].
    FocusIn = 11,
    /// [`Event::FocusOut`].
    FocusOut = 12,
    /// [`Event::ActiveIn`].
    ActiveIn = 13,
    /// [`Event::ActiveOut`].
    ActiveOut = 14,
    /// [`Event::TextChanged`].
    TextChanged = 15,
}

impl EventKind {
    /// Decodes a discriminant written with `kind as u8`.
    #[must_use]
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::PreInit,
            1 => Self::Init,
            2 => Self::Remove,
            3 => Self::ChildCreated,
            4 => Self::TouchStart,
            5 => Self::TouchMove,
            6 => Self::TouchEnd,
            7 => Self::Click,
            8 => Self::DblClick,
            9 => Self::LongClick,
            10 => Self::KeyPress,
            11 => Self::FocusIn,
            12 => Self::FocusOut,
            13 => Self::ActiveIn,
            14 => Self::ActiveOut,
            15 => Self::TextChanged,
            _ => return None,
        })
    }
}

/// A widget's answer to an [`Event`].
///
/// The meaning depends on the event:
///
/// | Event | `Ignored` | `Handled` | `HandledNoFocus` | `Refuse` |
/// |---|---|---|---|---|
/// | `TouchStart` (hit-test) | keep searching | take touch and focus | take touch, clear focus | keep searching |
/// | `TouchMove` | offer to parent | consumed as a drag | stop, not a drag | offer to parent |
/// | `DblClick` | also send `Click` | done | done | also send `Click` |
/// | `KeyPress` | Tab cycles focus | done | done | Tab cycles focus |
/// | `PreInit` / `Remove` | allow | allow | allow | veto |
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Reply {
    /// The event was not handled.
    Ignored,
    /// The event was handled.
    Handled,
    /// The event was handled, but focus should not move to this widget.
    HandledNoFocus,
    /// Veto for [`Event::PreInit`] and [`Event::Remove`].
    Refuse,
}

impl Reply {
    /// Returns `true` for [`Handled`](Self::Handled) and
    /// [`HandledNoFocus`](Self::HandledNoFocus).
    #[inline]
    #[must_use]
    pub fn is_handled(self) -> bool {
        matches!(self, Self::Handled | Self::HandledNoFocus)
    }
}

/// Which half of a widget's paint is requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawPhase {
    /// Paint the widget itself, before its children.
    Draw,
    /// Paint overlays on top of the children.
    DrawAfter,
}

/// A class-level event handler.
pub type EventFn = fn(&mut Ui, WidgetId, Event) -> Reply;

/// A draw function. Draw functions only see a read-only [`WidgetView`];
/// they cannot mutate the tree.
pub type DrawFn = fn(&mut Canvas<'_>, &WidgetView<'_>, DrawPhase);

/// A per-instance event handler, consulted before the class handler.
/// Returning [`Reply::Ignored`] falls through to the class.
pub type Handler = alloc::boxed::Box<dyn FnMut(&mut Ui, WidgetId, Event) -> Reply>;

/// An immutable description of a kind of widget.
#[derive(Clone, Copy, Debug)]
pub struct WidgetClass {
    /// Class name, for diagnostics.
    pub name: &'static str,
    /// Bytes of zeroed per-instance memory taken from the runtime heap.
    pub instance_size: usize,
    /// Class capabilities.
    pub flags: ClassFlags,
    /// Default colors, indexed by the class's own convention.
    pub colors: &'static [Color],
    /// Default event handler.
    pub event: EventFn,
    /// Default draw function.
    pub draw: DrawFn,
}

impl WidgetClass {
    /// Returns `true` if instances may have children.
    #[inline]
    #[must_use]
    pub fn allows_children(&self) -> bool {
        self.flags.contains(ClassFlags::ALLOW_CHILDREN)
    }

    /// Returns `true` if instances are modal dialogs.
    #[inline]
    #[must_use]
    pub fn is_dialog(&self) -> bool {
        self.flags.contains(ClassFlags::DIALOG_BASE)
    }
}

/// An [`EventFn`] that ignores everything.
pub fn ignore_events(_: &mut Ui, _: WidgetId, _: Event) -> Reply {
    Reply::Ignored
}

/// A [`DrawFn`] that paints nothing.
pub fn draw_nothing(_: &mut Canvas<'_>, _: &WidgetView<'_>, _: DrawPhase) {}

/// A [`DrawFn`] that fills the widget with color 0.
pub fn fill_background(canvas: &mut Canvas<'_>, view: &WidgetView<'_>, phase: DrawPhase) {
    if phase == DrawPhase::Draw {
        canvas.fill(view.color(0));
    }
}

fn desktop_event(_: &mut Ui, _: WidgetId, event: Event) -> Reply {
    match event {
        Event::TouchStart(_) => Reply::Handled,
        Event::Remove => Reply::Refuse,
        _ => Reply::Ignored,
    }
}

/// The desktop: the root of every widget tree. It fills the screen with
/// the configured background and swallows touches nothing else took.
pub static DESKTOP: WidgetClass = WidgetClass {
    name: "desktop",
    instance_size: 0,
    flags: ClassFlags::ALLOW_CHILDREN,
    colors: &[Color::LIGHT_GRAY],
    event: desktop_event,
    draw: fill_background,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_round_trips_through_u8() {
        for v in 0..=15_u8 {
            let kind = EventKind::from_u8(v).expect("valid discriminant");
            assert_eq!(kind as u8, v);
        }
        assert_eq!(EventKind::from_u8(16), None);
    }

    #[test]
    fn desktop_takes_touches_and_refuses_removal() {
        let mut ui = crate::ui::test_support::ui(64.0, 64.0);
        let root = ui.root();
        let touch = Touch::default();
        assert!(DESKTOP.allows_children());
        assert!(!DESKTOP.is_dialog());
        assert_eq!(
            desktop_event(&mut ui, root, Event::TouchStart(touch)),
            Reply::Handled
        );
        assert_eq!(desktop_event(&mut ui, root, Event::Remove), Reply::Refuse);
        assert_eq!(desktop_event(&mut ui, root, Event::FocusIn), Reply::Ignored);
    }

    #[test]
    fn kind_strips_the_payload() {
        let touch = Touch::default();
        assert_eq!(Event::TouchStart(touch).kind(), EventKind::TouchStart);
        assert!(Reply::HandledNoFocus.is_handled());
        assert!(!Reply::Refuse.is_handled());
    }
}
