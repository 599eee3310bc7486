// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays widget storage with allocation, topology, and geometry.

use alloc::vec::Vec;
use core::fmt;

use kurbo::{Insets, Rect, Size, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::class::{DrawFn, Handler, WidgetClass, WidgetFlags};
use super::id::{INVALID, WidgetId};
use super::traverse::{Ancestors, Children, ChildrenRev};
use crate::dirty;
use crate::display::Color;
use crate::heap::HeapPtr;

/// Number of per-instance color overrides a widget can carry.
pub const COLOR_SLOTS: usize = 4;

/// A heap-backed, UTF-8 text buffer owned by a widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct TextBuf {
    pub(crate) ptr: HeapPtr,
    pub(crate) len: usize,
    pub(crate) cap: usize,
    /// Byte offset of the edit cursor, always on a char boundary.
    pub(crate) cursor: usize,
}

/// Struct-of-arrays storage for all widgets.
///
/// Widgets are addressed by [`WidgetId`] handles. Each widget occupies a slot
/// in parallel arrays; removed widgets are recycled via a free list and
/// generation counters catch stale handles.
///
/// Sibling order is z-order: the first child is drawn first, the last child
/// is frontmost.
pub struct WidgetStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) last_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Class (None marks a free slot) --
    pub(crate) class: Vec<Option<&'static WidgetClass>>,

    // -- Geometry --
    /// Bounds relative to the parent's inner (padding-shrunk) origin.
    pub(crate) rect: Vec<Rect>,
    pub(crate) padding: Vec<Insets>,

    // -- State --
    pub(crate) flags: Vec<WidgetFlags>,
    pub(crate) alpha: Vec<u8>,
    pub(crate) colors: Vec<[Option<Color>; COLOR_SLOTS]>,
    pub(crate) instance: Vec<Option<HeapPtr>>,
    pub(crate) text: Vec<Option<TextBuf>>,
    pub(crate) user_data: Vec<usize>,

    // -- Instance overrides --
    pub(crate) handler: Vec<Option<Handler>>,
    pub(crate) painter: Vec<Option<DrawFn>>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    screen: Rect,
}

impl fmt::Debug for WidgetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetStore")
            .field("len", &self.len)
            .field("free", &self.free_list.len())
            .field("screen", &self.screen)
            .finish_non_exhaustive()
    }
}

impl WidgetStore {
    /// Creates an empty store for a `screen`-sized framebuffer.
    #[must_use]
    pub fn new(screen: Size) -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            last_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            class: Vec::new(),
            rect: Vec::new(),
            padding: Vec::new(),
            flags: Vec::new(),
            alpha: Vec::new(),
            colors: Vec::new(),
            instance: Vec::new(),
            text: Vec::new(),
            user_data: Vec::new(),
            handler: Vec::new(),
            painter: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            screen: screen.to_rect(),
        }
    }

    /// The framebuffer rectangle every widget is clipped to.
    #[must_use]
    pub fn screen(&self) -> Rect {
        self.screen
    }

    /// Number of live widgets.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.class.iter().filter(|c| c.is_some()).count()
    }

    // -- Allocation --

    /// Claims a slot for a new, unlinked widget.
    pub(crate) fn alloc(
        &mut self,
        class: &'static WidgetClass,
        rect: Rect,
        flags: WidgetFlags,
    ) -> WidgetId {
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.last_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.class[i] = Some(class);
            self.rect[i] = rect;
            self.padding[i] = Insets::ZERO;
            self.flags[i] = flags;
            self.alpha[i] = u8::MAX;
            self.colors[i] = [None; COLOR_SLOTS];
            self.instance[i] = None;
            self.text[i] = None;
            self.user_data[i] = 0;
            self.handler[i] = None;
            self.painter[i] = None;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.last_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.class.push(Some(class));
            self.rect.push(rect);
            self.padding.push(Insets::ZERO);
            self.flags.push(flags);
            self.alpha.push(u8::MAX);
            self.colors.push([None; COLOR_SLOTS]);
            self.instance.push(None);
            self.text.push(None);
            self.user_data.push(0);
            self.handler.push(None);
            self.painter.push(None);
            self.generation.push(0);
            idx
        };
        self.id_at(idx)
    }

    /// Releases a slot. The widget must have no children; it is unlinked
    /// from its parent if needed. Heap blocks it referenced must already
    /// have been freed by the caller.
    pub(crate) fn release(&mut self, id: WidgetId) {
        self.validate(id);
        let i = id.idx as usize;
        assert!(
            self.first_child[i] == INVALID,
            "cannot release a widget with children"
        );
        if self.parent[i] != INVALID {
            self.unlink(id.idx);
        }
        self.dirty.remove_key(id.idx);
        self.class[i] = None;
        self.handler[i] = None;
        self.painter[i] = None;
        self.instance[i] = None;
        self.text[i] = None;
        self.flags[i] = WidgetFlags::empty();
        self.generation[i] = self.generation[i].wrapping_add(1);
        self.free_list.push(id.idx);
    }

    /// Returns whether the handle refers to a live widget.
    #[must_use]
    pub fn is_alive(&self, id: WidgetId) -> bool {
        id.idx < self.len
            && self.generation[id.idx as usize] == id.generation
            && self.class[id.idx as usize].is_some()
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: WidgetId) {
        assert!(
            self.is_alive(id),
            "stale WidgetId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    pub(crate) fn id_at(&self, idx: u32) -> WidgetId {
        WidgetId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    // -- Topology --

    /// Appends `child` as the frontmost child of `parent`.
    pub(crate) fn link_last(&mut self, parent: u32, child: u32) {
        let (p, c) = (parent as usize, child as usize);
        debug_assert!(self.parent[c] == INVALID, "child already has a parent");
        self.parent[c] = parent;
        self.next_sibling[c] = INVALID;
        self.prev_sibling[c] = self.last_child[p];
        if self.last_child[p] == INVALID {
            self.first_child[p] = child;
        } else {
            self.next_sibling[self.last_child[p] as usize] = child;
        }
        self.last_child[p] = child;
        let added = self.dirty.add_dependency(child, parent, dirty::REDRAW);
        debug_assert!(added.is_ok(), "tree edges never form a cycle");
    }

    /// Detaches `idx` from its parent.
    pub(crate) fn unlink(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        if p == INVALID {
            return;
        }
        self.splice_out(idx);
        self.parent[idx as usize] = INVALID;
        self.dirty.remove_dependency(idx, p, dirty::REDRAW);
    }

    /// Moves `idx` to the end of its sibling list. Returns `false` if it was
    /// already frontmost (or has no parent).
    pub(crate) fn move_to_back(&mut self, idx: u32) -> bool {
        let p = self.parent[idx as usize];
        if p == INVALID || self.next_sibling[idx as usize] == INVALID {
            return false;
        }
        self.splice_out(idx);
        let last = self.last_child[p as usize];
        self.prev_sibling[idx as usize] = last;
        self.next_sibling[idx as usize] = INVALID;
        if last == INVALID {
            self.first_child[p as usize] = idx;
        } else {
            self.next_sibling[last as usize] = idx;
        }
        self.last_child[p as usize] = idx;
        true
    }

    /// Removes `idx` from its parent's sibling list, leaving `parent` set.
    fn splice_out(&mut self, idx: u32) {
        let i = idx as usize;
        let p = self.parent[i] as usize;
        let prev = self.prev_sibling[i];
        let next = self.next_sibling[i];
        if prev == INVALID {
            self.first_child[p] = next;
        } else {
            self.next_sibling[prev as usize] = next;
        }
        if next == INVALID {
            self.last_child[p] = prev;
        } else {
            self.prev_sibling[next as usize] = prev;
        }
        self.prev_sibling[i] = INVALID;
        self.next_sibling[i] = INVALID;
    }

    /// Returns the parent of a widget, if any.
    #[must_use]
    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        (p != INVALID).then(|| self.id_at(p))
    }

    /// Returns an iterator over the direct children, back to front.
    #[must_use]
    pub fn children(&self, id: WidgetId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns an iterator over the direct children, front to back.
    #[must_use]
    pub fn children_rev(&self, id: WidgetId) -> ChildrenRev<'_> {
        self.validate(id);
        ChildrenRev::new(self, self.last_child[id.idx as usize])
    }

    /// Returns an iterator over the strict ancestors, nearest first.
    #[must_use]
    pub fn ancestors(&self, id: WidgetId) -> Ancestors<'_> {
        self.validate(id);
        Ancestors::new(self, self.parent[id.idx as usize])
    }

    /// Returns `true` if `ancestor` is `id` or one of its ancestors.
    #[must_use]
    pub fn is_within(&self, id: WidgetId, ancestor: WidgetId) -> bool {
        id == ancestor || self.ancestors(id).any(|a| a == ancestor)
    }

    // -- Property getters --

    /// Returns the widget's class.
    #[must_use]
    pub fn class(&self, id: WidgetId) -> &'static WidgetClass {
        self.validate(id);
        self.class_at(id.idx)
    }

    pub(crate) fn class_at(&self, idx: u32) -> &'static WidgetClass {
        match self.class[idx as usize] {
            Some(class) => class,
            None => panic!("slot {idx} is free"),
        }
    }

    /// Returns the widget's flags.
    #[must_use]
    pub fn flags(&self, id: WidgetId) -> WidgetFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns the widget's bounds relative to its parent's inner origin.
    #[must_use]
    pub fn rect(&self, id: WidgetId) -> Rect {
        self.validate(id);
        self.rect[id.idx as usize]
    }

    /// Returns the widget's padding.
    #[must_use]
    pub fn padding(&self, id: WidgetId) -> Insets {
        self.validate(id);
        self.padding[id.idx as usize]
    }

    /// Returns the widget's opacity, 255 meaning opaque.
    #[must_use]
    pub fn alpha(&self, id: WidgetId) -> u8 {
        self.validate(id);
        self.alpha[id.idx as usize]
    }

    /// Returns color slot `index`: the instance override if set, else the
    /// class default, else black.
    #[must_use]
    pub fn color(&self, id: WidgetId, index: usize) -> Color {
        self.validate(id);
        self.color_at(id.idx, index)
    }

    pub(crate) fn color_at(&self, idx: u32, index: usize) -> Color {
        self.colors[idx as usize]
            .get(index)
            .copied()
            .flatten()
            .or_else(|| self.class_at(idx).colors.get(index).copied())
            .unwrap_or(Color::BLACK)
    }

    /// Returns the opaque value attached with `Ui::set_user_data`.
    #[must_use]
    pub fn user_data(&self, id: WidgetId) -> usize {
        self.validate(id);
        self.user_data[id.idx as usize]
    }

    // -- Geometry --

    /// Returns the widget's bounds in screen coordinates.
    #[must_use]
    pub fn abs_rect(&self, id: WidgetId) -> Rect {
        self.validate(id);
        self.abs_rect_at(id.idx)
    }

    pub(crate) fn abs_rect_at(&self, idx: u32) -> Rect {
        let mut offset = Vec2::ZERO;
        let mut p = self.parent[idx as usize];
        while p != INVALID {
            let pad = self.padding[p as usize];
            offset += self.rect[p as usize].origin().to_vec2() + Vec2::new(pad.x0, pad.y0);
            p = self.parent[p as usize];
        }
        self.rect[idx as usize] + offset
    }

    /// Returns the widget's padding-shrunk bounds in screen coordinates:
    /// the area its children are positioned and clipped in.
    #[must_use]
    pub fn inner_rect(&self, id: WidgetId) -> Rect {
        self.validate(id);
        self.inner_rect_at(id.idx)
    }

    pub(crate) fn inner_rect_at(&self, idx: u32) -> Rect {
        self.abs_rect_at(idx) - self.padding[idx as usize]
    }

    /// Returns the on-screen part of the widget: its bounds intersected with
    /// every ancestor's inner bounds and the screen. `None` when nothing is
    /// left.
    #[must_use]
    pub fn visible_rect(&self, id: WidgetId) -> Option<Rect> {
        self.validate(id);
        self.visible_rect_at(id.idx)
    }

    pub(crate) fn visible_rect_at(&self, idx: u32) -> Option<Rect> {
        let mut r = self.abs_rect_at(idx).intersect(self.screen);
        let mut p = self.parent[idx as usize];
        while p != INVALID {
            r = r.intersect(self.inner_rect_at(p));
            p = self.parent[p as usize];
        }
        (r.width() > 0.0 && r.height() > 0.0).then_some(r)
    }

    /// Returns `true` if neither the widget nor any ancestor is hidden.
    #[must_use]
    pub fn is_visible(&self, id: WidgetId) -> bool {
        self.validate(id);
        !self.hidden_in_chain(id.idx)
    }

    pub(crate) fn hidden_in_chain(&self, idx: u32) -> bool {
        let mut i = idx;
        while i != INVALID {
            if self.flags[i as usize].contains(WidgetFlags::HIDDEN) {
                return true;
            }
            i = self.parent[i as usize];
        }
        false
    }

    // -- Dirty tracking --

    /// Flags `idx` dirty and marks its subtree in the tracker.
    pub(crate) fn mark_dirty(&mut self, idx: u32) {
        self.flags[idx as usize].insert(WidgetFlags::DIRTY);
        self.dirty.mark_with(idx, dirty::REDRAW, &EagerPolicy);
    }

    /// Drains the tracker into per-widget `DIRTY` flags.
    pub(crate) fn sync_dirty(&mut self) {
        let affected: Vec<u32> = self
            .dirty
            .drain(dirty::REDRAW)
            .affected()
            .deterministic()
            .run()
            .collect();
        for idx in affected {
            if self.class.get(idx as usize).is_some_and(Option::is_some) {
                self.flags[idx as usize].insert(WidgetFlags::DIRTY);
            }
        }
    }

    /// Clears every `DIRTY` flag.
    pub(crate) fn clear_dirty(&mut self) {
        for f in &mut self.flags {
            f.remove(WidgetFlags::DIRTY);
        }
    }

    /// Returns the number of widgets currently flagged dirty.
    #[must_use]
    pub fn dirty_count(&self) -> usize {
        self.flags
            .iter()
            .filter(|f| f.contains(WidgetFlags::DIRTY))
            .count()
    }
}
