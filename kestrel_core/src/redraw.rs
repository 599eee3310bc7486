// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Redraw and present.
//!
//! A redraw pass repaints the accumulated damage rectangle:
//!
//! 1. Dirty marks are drained from the tracker into `DIRTY` flags.
//! 2. The tree is walked back to front. A widget (with its subtree) is
//!    skipped when hidden or when its clip rectangle misses the damage.
//! 3. A widget is painted when dirty or when its parent was painted; the
//!    children of a painted container are always repainted as a group.
//! 4. Translucent widgets are painted into a scratch buffer taken from the
//!    runtime heap and blended onto what is already in the layer. If the
//!    scratch allocation fails they are painted opaque instead.
//!
//! [`Layers`] wraps the pass in double buffering. The drawing layer is first
//! brought up to date by copying the *previous* frame's damage from the
//! shown layer, the pass paints the current damage, and the drawing layer is
//! handed to the driver. No new frame starts until the driver confirms the
//! switch.

use core::ops::Range;

use crate::display::{Canvas, Color, Display, LayerTarget, PixelTarget, ScratchTarget};
use crate::geometry::PixelRect;
use crate::heap::{Heap, HeapView};
use crate::ui::Ui;
use crate::widget::{DrawPhase, INVALID, WidgetFlags, WidgetStore, WidgetView};

/// What one redraw pass did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RedrawReport {
    /// Widgets painted, including those painted into scratch buffers.
    pub drawn: u32,
    /// Translucent subtrees blended through a scratch buffer.
    pub composited: u32,
    /// Translucent subtrees painted opaque because no scratch memory was
    /// available.
    pub fallbacks: u32,
    /// The repainted area.
    pub damage: Option<PixelRect>,
}

/// What one present did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentReport {
    /// Frame number, starting at 1.
    pub frame: u64,
    /// The layer painted and handed to the driver.
    pub layer: u8,
    /// Area copied from the shown layer before painting.
    pub copied: Option<PixelRect>,
    /// The redraw pass.
    pub redraw: RedrawReport,
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    area: PixelRect,
    width: u32,
    height: u32,
}

impl Frame {
    fn clip(&self, store: &WidgetStore, idx: u32) -> Option<PixelRect> {
        let visible = store.visible_rect_at(idx)?;
        PixelRect::from_rect(visible, self.width, self.height)?.intersect(self.area)
    }
}

struct Pass<'a> {
    store: &'a WidgetStore,
    heap: &'a mut Heap,
    display: &'a mut dyn Display,
    layer: u8,
    frame: Frame,
    composite: bool,
    report: RedrawReport,
}

impl Pass<'_> {
    fn walk(&mut self, idx: u32, force: bool) {
        let store = self.store;
        let i = idx as usize;
        if store.flags[i].contains(WidgetFlags::HIDDEN) {
            return;
        }
        let Some(clip) = self.frame.clip(store, idx) else {
            return;
        };
        let draw = force || store.flags[i].contains(WidgetFlags::DIRTY);

        if draw && self.composite && store.alpha[i] < u8::MAX {
            if self.composite_subtree(idx, clip) {
                return;
            }
            self.report.fallbacks += 1;
        }

        if draw {
            let mut target = LayerTarget::new(&mut *self.display, self.layer);
            paint_one(store, self.heap.view(), &mut target, idx, clip, DrawPhase::Draw);
        }
        let mut c = store.first_child[i];
        while c != INVALID {
            self.walk(c, draw);
            c = store.next_sibling[c as usize];
        }
        if draw {
            let mut target = LayerTarget::new(&mut *self.display, self.layer);
            paint_one(store, self.heap.view(), &mut target, idx, clip, DrawPhase::DrawAfter);
            self.report.drawn += 1;
        }
    }

    /// Paints a translucent subtree through a scratch buffer. Returns
    /// `false`, having changed nothing, if no scratch memory is available.
    fn composite_subtree(&mut self, idx: u32, clip: PixelRect) -> bool {
        let Some(ptr) = self.heap.alloc(clip.area() * 4) else {
            return false;
        };
        let alpha = self.store.alpha[idx as usize];
        let blended = match self.heap.split_mut(ptr) {
            Some((pixels, heap)) => {
                let drawn = {
                    let mut scratch = ScratchTarget::new(&mut *pixels, clip);
                    for y in rows(clip) {
                        for x in cols(clip) {
                            scratch.set_pixel(x, y, self.display.pixel(self.layer, x, y));
                        }
                    }
                    paint_subtree(self.store, heap, &mut scratch, self.frame, idx)
                };
                if !self.display.blend(self.layer, clip, pixels, alpha) {
                    software_blend(&mut *self.display, self.layer, clip, pixels, alpha);
                }
                self.report.drawn += drawn;
                true
            }
            None => false,
        };
        self.heap.free(ptr);
        if blended {
            self.report.composited += 1;
        }
        blended
    }
}

fn paint_one(
    store: &WidgetStore,
    heap: HeapView<'_>,
    target: &mut dyn PixelTarget,
    idx: u32,
    clip: PixelRect,
    phase: DrawPhase,
) {
    let view = WidgetView::new(store, heap, store.id_at(idx));
    let draw = store.painter[idx as usize].unwrap_or(store.class_at(idx).draw);
    let mut canvas = Canvas::new(target, view.bounds(), clip);
    draw(&mut canvas, &view, phase);
}

/// Force-paints `idx` and its visible descendants. Nested translucency is
/// painted opaque.
fn paint_subtree(
    store: &WidgetStore,
    heap: HeapView<'_>,
    target: &mut dyn PixelTarget,
    frame: Frame,
    idx: u32,
) -> u32 {
    let i = idx as usize;
    if store.flags[i].contains(WidgetFlags::HIDDEN) {
        return 0;
    }
    let Some(clip) = frame.clip(store, idx) else {
        return 0;
    };
    paint_one(store, heap, target, idx, clip, DrawPhase::Draw);
    let mut drawn = 1;
    let mut c = store.first_child[i];
    while c != INVALID {
        drawn += paint_subtree(store, heap, target, frame, c);
        c = store.next_sibling[c as usize];
    }
    paint_one(store, heap, target, idx, clip, DrawPhase::DrawAfter);
    drawn
}

/// Blends an ARGB8888 block onto a layer one pixel at a time, row-major:
/// `out = alpha * fg + (1 - alpha) * bg`.
fn software_blend(display: &mut dyn Display, layer: u8, area: PixelRect, src: &[u8], alpha: u8) {
    let mut words = src.chunks_exact(4);
    for y in rows(area) {
        for x in cols(area) {
            let Some(w) = words.next() else {
                return;
            };
            let fg = Color(u32::from_le_bytes([w[0], w[1], w[2], w[3]]));
            let bg = display.pixel(layer, x, y);
            display.set_pixel(layer, x, y, fg.blend_over(bg, alpha));
        }
    }
}

fn rows(r: PixelRect) -> Range<i32> {
    r.y..i32::try_from(r.bottom()).unwrap_or(i32::MAX)
}

fn cols(r: PixelRect) -> Range<i32> {
    r.x..i32::try_from(r.right()).unwrap_or(i32::MAX)
}

/// Repaints the damage accumulated in `ui` into `layer`.
///
/// A pass with no damage paints nothing. Dirty flags and the damage
/// rectangle are cleared either way.
pub fn redraw(ui: &mut Ui, display: &mut dyn Display, layer: u8) -> RedrawReport {
    let info = display.info();
    let Ui {
        heap,
        widgets,
        config,
        damage,
        redraw_requested,
        root,
        ..
    } = ui;
    widgets.sync_dirty();
    *redraw_requested = false;

    let mut report = RedrawReport::default();
    let Some(area) = damage
        .take()
        .and_then(|d| PixelRect::from_rect(d, info.width, info.height))
    else {
        widgets.clear_dirty();
        return report;
    };
    report.damage = Some(area);

    let mut pass = Pass {
        store: widgets,
        heap,
        display,
        layer,
        frame: Frame {
            area,
            width: info.width,
            height: info.height,
        },
        composite: config.alpha_compositing,
        report,
    };
    pass.walk(root.idx, false);
    let report = pass.report;
    widgets.clear_dirty();
    report
}

/// Layer roles and the present protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layers {
    count: u8,
    shown: u8,
    drawing: u8,
    pending: bool,
    prev_damage: Option<PixelRect>,
    frame: u64,
}

impl Layers {
    /// Sets up roles for a display with `count` layers. With fewer than two
    /// layers everything is drawn straight into layer 0.
    #[must_use]
    pub fn new(count: u8) -> Self {
        Self {
            count,
            shown: 0,
            drawing: u8::from(count >= 2),
            pending: false,
            prev_damage: None,
            frame: 0,
        }
    }

    /// Whether frames are composed off screen.
    #[must_use]
    pub fn is_double_buffered(&self) -> bool {
        self.count >= 2
    }

    /// The layer on screen (or requested to be).
    #[must_use]
    pub fn shown_layer(&self) -> u8 {
        self.shown
    }

    /// The layer the next frame is composed in.
    #[must_use]
    pub fn drawing_layer(&self) -> u8 {
        self.drawing
    }

    /// Whether the last hand-off is still unconfirmed.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Frames presented so far.
    #[must_use]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Consumes a layer-switch confirmation from the driver, if one is due.
    pub fn poll_confirmation(&mut self, display: &mut dyn Display) {
        if self.pending && display.take_layer_confirmation() {
            self.pending = false;
        }
    }

    /// Redraws and presents, if anything was invalidated and the previous
    /// hand-off has been confirmed.
    pub fn present(&mut self, ui: &mut Ui, display: &mut dyn Display) -> Option<PresentReport> {
        self.poll_confirmation(display);
        if self.pending || !ui.redraw_requested {
            return None;
        }

        if !self.is_double_buffered() {
            let redraw = redraw(ui, display, 0);
            if redraw.damage.is_none() {
                return None;
            }
            self.frame += 1;
            return Some(PresentReport {
                frame: self.frame,
                layer: 0,
                copied: None,
                redraw,
            });
        }

        let copied = self.prev_damage.take();
        if let Some(c) = copied {
            display.copy_rect(self.drawing, c.x, c.y, self.shown, c.x, c.y, c.width, c.height);
        }
        let redraw = redraw(ui, display, self.drawing);
        if redraw.damage.is_none() {
            return None;
        }

        let layer = self.drawing;
        display.set_active_layer(layer);
        self.pending = true;
        self.drawing = self.shown;
        self.shown = layer;
        self.prev_damage = redraw.damage;
        self.frame += 1;
        Some(PresentReport {
            frame: self.frame,
            layer,
            copied,
            redraw,
        })
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Rect, Size};

    use super::*;
    use crate::config::GuiConfig;
    use crate::display::{ConfirmMode, MemoryDisplay};
    use crate::ui::test_support::{self, LEAF, PANEL};
    use crate::widget::WidgetId;

    const RED: Color = Color(0xFF00_00FF);

    fn rect(x: f64, y: f64, w: f64, h: f64) -> Rect {
        Rect::new(x, y, x + w, y + h)
    }

    fn leaf(ui: &mut Ui, r: Rect) -> WidgetId {
        ui.create(&LEAF, r, None, WidgetFlags::empty()).expect("leaf")
    }

    fn settled(ui: &mut Ui, display: &mut MemoryDisplay) {
        redraw(ui, display, 0);
    }

    #[test]
    fn first_pass_paints_the_desktop() {
        let mut ui = test_support::ui(20.0, 20.0);
        let mut display = MemoryDisplay::new(20, 20, 1);
        let report = redraw(&mut ui, &mut display, 0);
        assert_eq!(report.drawn, 1);
        assert_eq!(report.damage, Some(PixelRect::new(0, 0, 20, 20)));
        assert_eq!(display.pixel(0, 19, 19), Color::LIGHT_GRAY);
    }

    #[test]
    fn pass_without_invalidation_draws_nothing() {
        let mut ui = test_support::ui(20.0, 20.0);
        let mut display = MemoryDisplay::new(20, 20, 1);
        settled(&mut ui, &mut display);
        let report = redraw(&mut ui, &mut display, 0);
        assert_eq!(report, RedrawReport::default());
        assert_eq!(ui.widgets().dirty_count(), 0);
    }

    #[test]
    fn invalidated_widget_is_drawn_next_pass() {
        let mut ui = test_support::ui(20.0, 20.0);
        let mut display = MemoryDisplay::new(20, 20, 1);
        let w = leaf(&mut ui, rect(2.0, 2.0, 4.0, 4.0));
        settled(&mut ui, &mut display);
        assert_eq!(display.pixel(0, 3, 3), RED);

        ui.set_color(w, 0, Some(Color::WHITE));
        let report = redraw(&mut ui, &mut display, 0);
        assert_eq!(report.drawn, 1, "only the changed widget");
        assert_eq!(report.damage, Some(PixelRect::new(2, 2, 4, 4)));
        assert_eq!(display.pixel(0, 3, 3), Color::WHITE);
    }

    #[test]
    fn overlapping_higher_sibling_stays_on_top() {
        let mut ui = test_support::ui(20.0, 20.0);
        let mut display = MemoryDisplay::new(20, 20, 1);
        let below = leaf(&mut ui, rect(0.0, 0.0, 10.0, 10.0));
        let above = leaf(&mut ui, rect(5.0, 5.0, 10.0, 10.0));
        ui.set_color(above, 0, Some(Color::BLACK));
        settled(&mut ui, &mut display);

        ui.set_color(below, 0, Some(Color::WHITE));
        let report = redraw(&mut ui, &mut display, 0);
        assert_eq!(report.drawn, 2, "the sibling above was repainted too");
        assert_eq!(display.pixel(0, 7, 7), Color::BLACK, "overlap shows the top widget");
        assert_eq!(display.pixel(0, 2, 2), Color::WHITE);
    }

    #[test]
    fn container_repaints_its_children() {
        let mut ui = test_support::ui(20.0, 20.0);
        let mut display = MemoryDisplay::new(20, 20, 1);
        let panel = ui
            .create(&PANEL, rect(0.0, 0.0, 10.0, 10.0), None, WidgetFlags::empty())
            .expect("panel");
        ui.create(&LEAF, rect(1.0, 1.0, 2.0, 2.0), Some(panel), WidgetFlags::empty())
            .expect("child");
        settled(&mut ui, &mut display);
        ui.invalidate(panel);
        let report = redraw(&mut ui, &mut display, 0);
        assert_eq!(report.drawn, 2);
        assert_eq!(display.pixel(0, 1, 1), RED, "child painted over the panel");
    }

    #[test]
    fn hidden_widgets_are_not_drawn() {
        let mut ui = test_support::ui(20.0, 20.0);
        let mut display = MemoryDisplay::new(20, 20, 1);
        let w = leaf(&mut ui, rect(0.0, 0.0, 5.0, 5.0));
        settled(&mut ui, &mut display);
        ui.hide(w);
        redraw(&mut ui, &mut display, 0);
        assert_eq!(display.pixel(0, 1, 1), Color::LIGHT_GRAY, "desktop shows through");
    }

    #[test]
    fn translucent_widget_is_blended() {
        let mut ui = test_support::ui(10.0, 10.0);
        ui.set_color(ui.root(), 0, Some(Color::BLACK));
        let mut display = MemoryDisplay::new(10, 10, 1);
        let w = leaf(&mut ui, rect(0.0, 0.0, 4.0, 4.0));
        ui.set_color(w, 0, Some(Color::WHITE));
        ui.set_alpha(w, 128);
        let used = ui.heap().used_bytes();
        let report = redraw(&mut ui, &mut display, 0);
        assert_eq!(report.composited, 1);
        assert_eq!(report.fallbacks, 0);
        let px = display.pixel(0, 1, 1);
        assert!((127..=128).contains(&px.r()), "half white over black, got {px:?}");
        assert_eq!(display.pixel(0, 6, 6), Color::BLACK);
        assert_eq!(ui.heap().used_bytes(), used, "scratch memory returned");
    }

    #[test]
    fn scratch_exhaustion_falls_back_to_opaque() {
        let mut ui = Ui::new(
            GuiConfig::DEFAULT,
            Size::new(10.0, 10.0),
            test_support::heap(256),
        )
        .expect("runtime");
        let mut display = MemoryDisplay::new(10, 10, 1);
        let w = leaf(&mut ui, rect(0.0, 0.0, 10.0, 10.0));
        ui.set_color(w, 0, Some(Color::WHITE));
        ui.set_alpha(w, 10);
        let used = ui.heap().used_bytes();
        let report = redraw(&mut ui, &mut display, 0);
        assert_eq!(report.fallbacks, 1);
        assert_eq!(report.composited, 0);
        assert_eq!(display.pixel(0, 5, 5), Color::WHITE, "painted opaque");
        assert_eq!(ui.heap().used_bytes(), used, "nothing leaked");
    }

    #[test]
    fn disabled_compositing_draws_opaque() {
        let mut ui = Ui::new(
            GuiConfig::DEFAULT.with_alpha_compositing(false),
            Size::new(10.0, 10.0),
            test_support::heap(16 * 1024),
        )
        .expect("runtime");
        let mut display = MemoryDisplay::new(10, 10, 1);
        let w = leaf(&mut ui, rect(0.0, 0.0, 4.0, 4.0));
        ui.set_alpha(w, 50);
        let report = redraw(&mut ui, &mut display, 0);
        assert_eq!(report.composited, 0);
        assert_eq!(report.fallbacks, 0);
        assert_eq!(display.pixel(0, 1, 1), RED);
    }

    #[test]
    fn double_buffering_swaps_and_catches_up() {
        let mut ui = test_support::ui(10.0, 10.0);
        let mut display = MemoryDisplay::new(10, 10, 2);
        let mut layers = Layers::new(2);

        let first = layers.present(&mut ui, &mut display).expect("first frame");
        assert_eq!(first.layer, 1);
        assert_eq!(display.shown_layer(), 1);

        let w = leaf(&mut ui, rect(0.0, 0.0, 3.0, 3.0));
        let second = layers.present(&mut ui, &mut display).expect("second frame");
        assert_eq!(second.layer, 0);
        assert_eq!(
            second.copied,
            Some(PixelRect::new(0, 0, 10, 10)),
            "previous frame's damage copied first"
        );
        assert_eq!(display.shown_pixel(8, 8), Color::LIGHT_GRAY);
        assert_eq!(display.shown_pixel(1, 1), RED);

        ui.set_position(w, Point::new(5.0, 5.0));
        layers.present(&mut ui, &mut display).expect("third frame");
        assert_eq!(display.shown_layer(), 1);
        assert_eq!(display.shown_pixel(6, 6), RED);
        assert_eq!(display.shown_pixel(1, 1), Color::LIGHT_GRAY, "old spot cleared");
        assert_eq!(layers.frame(), 3);
    }

    #[test]
    fn present_waits_for_confirmation() {
        let mut ui = test_support::ui(10.0, 10.0);
        let mut display = MemoryDisplay::new(10, 10, 2).with_confirm(ConfirmMode::Manual);
        let mut layers = Layers::new(2);
        assert!(layers.present(&mut ui, &mut display).is_some());
        assert!(layers.is_pending());

        let w = leaf(&mut ui, rect(0.0, 0.0, 3.0, 3.0));
        assert!(layers.present(&mut ui, &mut display).is_none(), "still unconfirmed");
        assert_eq!(display.activations(), 1, "no double submission");
        assert!(ui.redraw_requested(), "damage is kept for later");

        display.confirm();
        let report = layers.present(&mut ui, &mut display).expect("confirmed");
        assert_eq!(report.layer, 0);
        assert!(ui.is_alive(w));
    }

    #[test]
    fn single_layer_draws_in_place() {
        let mut ui = test_support::ui(10.0, 10.0);
        let mut display = MemoryDisplay::new(10, 10, 1);
        let mut layers = Layers::new(1);
        let report = layers.present(&mut ui, &mut display).expect("frame");
        assert_eq!(report.layer, 0);
        assert_eq!(display.activations(), 0);
        assert!(!layers.is_pending());
        assert!(layers.present(&mut ui, &mut display).is_none(), "nothing new");
    }
}
