// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Key routing.
//!
//! Keys travel as plain `char`s. Navigation and editing keys use the control
//! codes below so a driver can produce them from any keypad.

use super::KeySample;
use crate::ui::Ui;
use crate::widget::{Event, Reply, WidgetFlags, WidgetId};

/// Cursor up.
pub const UP: char = '\u{1}';
/// Cursor down.
pub const DOWN: char = '\u{2}';
/// Cursor left.
pub const LEFT: char = '\u{3}';
/// Cursor right.
pub const RIGHT: char = '\u{4}';
/// Escape.
pub const ESC: char = '\u{5}';
/// Page up.
pub const PG_UP: char = '\u{6}';
/// Page down.
pub const PG_DOWN: char = '\u{7}';
/// Delete the character before the cursor.
pub const BACKSPACE: char = '\u{8}';
/// Move focus to the next sibling unless the focused widget takes it.
pub const TAB: char = '\t';
/// Line feed, sent by the enter key.
pub const LF: char = '\n';

/// Delivers a key to the focused widget.
///
/// A Tab the focused widget ignores moves focus to its next visible
/// sibling, wrapping to the first visible sibling.
pub fn route_key(ui: &mut Ui, key: KeySample) -> Reply {
    let Some(focused) = ui.focused() else {
        return Reply::Ignored;
    };
    let reply = ui.send(focused, Event::KeyPress(key));
    if reply.is_handled() || key.key != TAB || !ui.is_alive(focused) {
        return reply;
    }
    match next_focus(ui, focused) {
        Some(next) => {
            ui.bring_to_front(next);
            ui.set_focus(next);
            Reply::Handled
        }
        None => reply,
    }
}

fn next_focus(ui: &Ui, current: WidgetId) -> Option<WidgetId> {
    let parent = ui.parent(current)?;
    let visible = |w: &WidgetId| !ui.flags(*w).contains(WidgetFlags::HIDDEN);
    ui.widgets()
        .children(parent)
        .skip_while(|w| *w != current)
        .skip(1)
        .find(visible)
        .or_else(|| ui.widgets().children(parent).find(visible))
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::*;
    use crate::time::Millis;
    use crate::ui::test_support::{LEAF, count, new_log, record, ui};
    use crate::widget::EventKind;

    fn key(c: char) -> KeySample {
        KeySample {
            key: c,
            time: Millis::ZERO,
        }
    }

    fn leaf(ui: &mut Ui, x: f64) -> WidgetId {
        ui.create(&LEAF, Rect::new(x, 0.0, x + 10.0, 10.0), None, WidgetFlags::empty())
            .expect("leaf")
    }

    #[test]
    fn keys_go_to_the_focused_widget() {
        let mut ui = ui(100.0, 100.0);
        let log = new_log();
        let a = leaf(&mut ui, 0.0);
        let b = leaf(&mut ui, 20.0);
        record(&mut ui, a, &log, &[(EventKind::KeyPress, Reply::Handled)]);
        record(&mut ui, b, &log, &[]);
        assert_eq!(route_key(&mut ui, key('x')), Reply::Ignored, "nothing focused");
        ui.set_focus(a);
        assert_eq!(route_key(&mut ui, key('x')), Reply::Handled);
        assert_eq!(count(&log, a, EventKind::KeyPress), 1);
        assert_eq!(count(&log, b, EventKind::KeyPress), 0);
    }

    #[test]
    fn unhandled_tab_cycles_visible_siblings() {
        let mut ui = ui(100.0, 100.0);
        let a = leaf(&mut ui, 0.0);
        let b = leaf(&mut ui, 20.0);
        let c = leaf(&mut ui, 40.0);
        ui.hide(b);
        ui.set_focus(a);
        assert_eq!(route_key(&mut ui, key(TAB)), Reply::Handled);
        assert_eq!(ui.focused(), Some(c), "hidden sibling skipped");
        let root = ui.root();
        assert_eq!(ui.widgets().children_rev(root).next(), Some(c));

        route_key(&mut ui, key(TAB));
        assert_eq!(ui.focused(), Some(a), "wraps to the first visible sibling");
    }

    #[test]
    fn handled_tab_keeps_focus() {
        let mut ui = ui(100.0, 100.0);
        let log = new_log();
        let a = leaf(&mut ui, 0.0);
        let _b = leaf(&mut ui, 20.0);
        record(&mut ui, a, &log, &[(EventKind::KeyPress, Reply::Handled)]);
        ui.set_focus(a);
        route_key(&mut ui, key(TAB));
        assert_eq!(ui.focused(), Some(a));
    }

    #[test]
    fn text_widgets_edit_through_their_handler() {
        let mut ui = ui(100.0, 100.0);
        let field = leaf(&mut ui, 0.0);
        assert!(ui.alloc_text(field, 8));
        ui.set_handler(field, |ui, w, event| match event {
            Event::KeyPress(k) => ui.process_text_key(w, k),
            _ => Reply::Ignored,
        });
        ui.set_focus(field);
        for c in ['h', 'i', 'x', BACKSPACE, '!'] {
            route_key(&mut ui, key(c));
        }
        assert_eq!(ui.text(field), Some("hi!"));
    }
}
