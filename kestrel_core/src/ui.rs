// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The widget runtime context.
//!
//! [`Ui`] owns everything a widget callback may touch: the runtime
//! [`Heap`], the [`WidgetStore`], the [`Timers`] list, focus and active
//! state, and the accumulated damage rectangle. Every tree mutation goes
//! through it so invalidation stays consistent with geometry.
//!
//! # Invalidation
//!
//! [`invalidate`](Ui::invalidate) flags a widget dirty and grows the damage
//! rectangle to its visible bounds. Siblings overlapping it (in any z-order)
//! are flagged too, and so is the parent when the parent is itself overlapped
//! by later siblings. Translucent widgets pull their parent in, and the
//! nearest translucent ancestor is always repainted. Widgets whose ancestors
//! are hidden are never invalidated.
//!
//! # Removal
//!
//! [`remove`](Ui::remove) only *queues* a widget (and its subtree) for
//! deletion, so a widget may remove itself from inside its own callback.
//! The orchestrator frees queued widgets at the next tick through
//! [`execute_removals`](Ui::execute_removals).

use alloc::boxed::Box;
use alloc::vec::Vec;

use kurbo::{Insets, Point, Rect, Size};

use crate::config::GuiConfig;
use crate::display::Color;
use crate::error::InitError;
use crate::geometry::{overlaps, union_into};
use crate::heap::{Heap, HeapError, HeapStats};
use crate::input::KeySample;
use crate::input::keyboard;
use crate::time::Millis;
use crate::timer::{TimerId, Timers};
#[cfg(feature = "trace-rich")]
use crate::trace::DispatchRecord;
use crate::widget::{
    DESKTOP, DrawFn, Event, INVALID, Reply, TextBuf, WidgetClass, WidgetFlags,
    WidgetId, WidgetStore,
};

/// Bytes reserved in the runtime heap for each timer record.
pub const TIMER_RECORD_SIZE: usize = 16;

/// Where an allocation failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AllocSite {
    /// Widget instance memory in [`Ui::create`].
    Widget = 0,
    /// A timer record.
    Timer = 1,
    /// A widget text buffer.
    Text = 2,
    /// An input queue reservation.
    Queue = 3,
}

impl AllocSite {
    /// Decodes a discriminant written with `site as u8`.
    #[must_use]
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Widget),
            1 => Some(Self::Timer),
            2 => Some(Self::Text),
            3 => Some(Self::Queue),
            _ => None,
        }
    }
}

/// A recorded allocation failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocFailure {
    /// Call site.
    pub site: AllocSite,
    /// Requested size in bytes.
    pub size: usize,
}

/// The widget runtime.
pub struct Ui {
    pub(crate) heap: Heap,
    pub(crate) widgets: WidgetStore,
    pub(crate) timers: Timers,
    pub(crate) root: WidgetId,
    pub(crate) focused: Option<WidgetId>,
    pub(crate) active: Option<WidgetId>,
    pub(crate) active_prev: Option<WidgetId>,
    pub(crate) damage: Option<Rect>,
    pub(crate) redraw_requested: bool,
    pub(crate) now: Millis,
    pub(crate) config: GuiConfig,
    pub(crate) alloc_failures: Vec<AllocFailure>,
    pub(crate) removals_pending: bool,
    #[cfg(feature = "trace-rich")]
    pub(crate) dispatches: Vec<DispatchRecord>,
}

impl core::fmt::Debug for Ui {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Ui")
            .field("widgets", &self.widgets)
            .field("root", &self.root)
            .field("focused", &self.focused)
            .field("active", &self.active)
            .field("damage", &self.damage)
            .field("now", &self.now)
            .finish_non_exhaustive()
    }
}

impl Ui {
    /// Creates a runtime over an already registered `heap`, with a desktop
    /// widget covering a `screen`-sized framebuffer.
    ///
    /// The desktop starts dirty, so the first present paints the whole
    /// screen.
    pub fn new(config: GuiConfig, screen: Size, mut heap: Heap) -> Result<Self, InitError> {
        if !heap.is_registered() {
            return Err(InitError::Heap(HeapError::NoUsableRegion));
        }
        let mut widgets = WidgetStore::new(screen);
        let instance = heap.calloc(1, 1).ok_or(InitError::OutOfMemory)?;
        let root = widgets.alloc(&DESKTOP, screen.to_rect(), WidgetFlags::empty());
        widgets.instance[root.idx as usize] = Some(instance);
        widgets.colors[root.idx as usize][0] = Some(config.background);

        let mut ui = Self {
            heap,
            widgets,
            timers: Timers::new(),
            root,
            focused: None,
            active: None,
            active_prev: None,
            damage: None,
            redraw_requested: false,
            now: Millis::ZERO,
            config,
            alloc_failures: Vec::new(),
            removals_pending: false,
            #[cfg(feature = "trace-rich")]
            dispatches: Vec::new(),
        };
        ui.invalidate(root);
        Ok(ui)
    }

    // -- Accessors --

    /// The desktop widget.
    #[must_use]
    pub fn root(&self) -> WidgetId {
        self.root
    }

    /// The widget store, for read-only queries.
    #[must_use]
    pub fn widgets(&self) -> &WidgetStore {
        &self.widgets
    }

    /// The timer list, for read-only queries.
    #[must_use]
    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    /// The runtime heap.
    #[must_use]
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Mutable access to the runtime heap, for widget-owned allocations.
    pub fn heap_mut(&mut self) -> &mut Heap {
        &mut self.heap
    }

    /// Heap statistics.
    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// The configuration the runtime was built with.
    #[must_use]
    pub fn config(&self) -> &GuiConfig {
        &self.config
    }

    /// Time of the current tick.
    #[must_use]
    pub fn now(&self) -> Millis {
        self.now
    }

    /// The widget with keyboard focus, if any.
    #[must_use]
    pub fn focused(&self) -> Option<WidgetId> {
        self.focused
    }

    /// The widget owning the current touch, if any.
    #[must_use]
    pub fn active(&self) -> Option<WidgetId> {
        self.active
    }

    /// The most recent widget that stopped being active.
    #[must_use]
    pub fn active_prev(&self) -> Option<WidgetId> {
        self.active_prev
    }

    /// The accumulated damage rectangle since the last redraw.
    #[must_use]
    pub fn damage(&self) -> Option<Rect> {
        self.damage
    }

    /// Whether anything was invalidated since the last redraw.
    #[must_use]
    pub fn redraw_requested(&self) -> bool {
        self.redraw_requested
    }

    /// Whether `id` refers to a live widget.
    #[must_use]
    pub fn is_alive(&self, id: WidgetId) -> bool {
        self.widgets.is_alive(id)
    }

    /// The widget's parent.
    #[must_use]
    pub fn parent(&self, id: WidgetId) -> Option<WidgetId> {
        self.widgets.parent(id)
    }

    /// The widget's flags.
    #[must_use]
    pub fn flags(&self, id: WidgetId) -> WidgetFlags {
        self.widgets.flags(id)
    }

    /// The widget's absolute bounds.
    #[must_use]
    pub fn abs_rect(&self, id: WidgetId) -> Rect {
        self.widgets.abs_rect(id)
    }

    /// The widget's per-instance memory.
    pub fn instance_mut(&mut self, id: WidgetId) -> Option<&mut [u8]> {
        self.widgets.validate(id);
        let ptr = self.widgets.instance[id.idx as usize]?;
        self.heap.bytes_mut(ptr)
    }

    pub(crate) fn record_failure(&mut self, site: AllocSite, size: usize) {
        self.alloc_failures.push(AllocFailure { site, size });
    }

    /// Takes the allocation failures recorded since the last call.
    pub fn take_alloc_failures(&mut self) -> Vec<AllocFailure> {
        core::mem::take(&mut self.alloc_failures)
    }

    // -- Dispatch --

    /// Delivers `event` to a widget: the instance handler first, then the
    /// class handler if the instance handler ignored it.
    pub fn send(&mut self, id: WidgetId, event: Event) -> Reply {
        self.widgets.validate(id);
        #[cfg(feature = "trace-rich")]
        self.dispatches.push(DispatchRecord {
            widget: id.idx,
            kind: event.kind(),
        });
        let i = id.idx as usize;
        if let Some(mut handler) = self.widgets.handler[i].take() {
            let reply = handler(self, id, event);
            if self.widgets.is_alive(id) && self.widgets.handler[i].is_none() {
                self.widgets.handler[i] = Some(handler);
            }
            if reply != Reply::Ignored {
                return reply;
            }
        }
        if !self.widgets.is_alive(id) {
            return Reply::Ignored;
        }
        let class = self.widgets.class_at(id.idx);
        (class.event)(self, id, event)
    }

    // -- Lifecycle --

    /// Creates a widget of `class` at `rect` (relative to the parent's inner
    /// origin) as the frontmost child of `parent` (the desktop if `None`).
    ///
    /// Dialog classes are always parented to the desktop, and a parent whose
    /// class does not allow children is replaced by the desktop. Returns
    /// `None` when instance memory is exhausted or the class refuses
    /// [`Event::PreInit`]; nothing is left behind in either case.
    pub fn create(
        &mut self,
        class: &'static WidgetClass,
        rect: Rect,
        parent: Option<WidgetId>,
        flags: WidgetFlags,
    ) -> Option<WidgetId> {
        let size = class.instance_size.max(1);
        let Some(instance) = self.heap.calloc(1, size) else {
            self.record_failure(AllocSite::Widget, size);
            return None;
        };
        let parent = match parent {
            Some(p) if !class.is_dialog() => {
                self.widgets.validate(p);
                if self.widgets.class_at(p.idx).allows_children() {
                    p
                } else {
                    self.root
                }
            }
            _ => self.root,
        };

        let flags = flags - (WidgetFlags::DIRTY | WidgetFlags::FOCUSED | WidgetFlags::ACTIVE);
        let id = self.widgets.alloc(class, rect, flags);
        self.widgets.instance[id.idx as usize] = Some(instance);

        if self.send(id, Event::PreInit) == Reply::Refuse {
            self.heap.free(instance);
            self.widgets.release(id);
            return None;
        }

        self.widgets.link_last(parent.idx, id.idx);
        self.send(id, Event::Init);
        self.invalidate(id);
        self.send(parent, Event::ChildCreated(id));
        Some(id)
    }

    /// Queues a widget and its subtree for removal at the next tick.
    ///
    /// Every widget in the subtree is asked with [`Event::Remove`] first; a
    /// single [`Reply::Refuse`] vetoes the whole removal. The desktop can
    /// never be removed. Returns `true` if the removal was queued.
    pub fn remove(&mut self, id: WidgetId) -> bool {
        self.widgets.validate(id);
        if id == self.root || !self.can_remove(id) {
            return false;
        }
        self.widgets.flags[id.idx as usize].insert(WidgetFlags::REMOVE);
        self.removals_pending = true;
        if self.focused.is_some_and(|f| self.widgets.is_within(f, id)) {
            match self.widgets.parent(id) {
                Some(p) => self.set_focus(p),
                None => self.clear_focus(),
            }
        }
        if self.active.is_some_and(|a| self.widgets.is_within(a, id)) {
            self.clear_active();
        }
        true
    }

    fn can_remove(&mut self, id: WidgetId) -> bool {
        if self.send(id, Event::Remove) == Reply::Refuse {
            return false;
        }
        let children: Vec<WidgetId> = self.widgets.children(id).collect();
        children.into_iter().all(|c| self.can_remove(c))
    }

    /// Frees every widget queued by [`remove`](Self::remove), children
    /// first. Returns the number of widgets freed.
    pub fn execute_removals(&mut self) -> u32 {
        if !self.removals_pending {
            return 0;
        }
        self.removals_pending = false;
        self.remove_marked(self.root)
    }

    fn remove_marked(&mut self, parent: WidgetId) -> u32 {
        let children: Vec<WidgetId> = self.widgets.children(parent).collect();
        let mut count = 0;
        for c in children {
            if self.widgets.flags[c.idx as usize].contains(WidgetFlags::REMOVE) {
                count += self.destroy_subtree(c);
            } else if self.widgets.class_at(c.idx).allows_children() {
                count += self.remove_marked(c);
            }
        }
        count
    }

    fn destroy_subtree(&mut self, id: WidgetId) -> u32 {
        let children: Vec<WidgetId> = self.widgets.children(id).collect();
        let mut count = 0;
        for c in children {
            count += self.destroy_subtree(c);
        }
        self.destroy_one(id);
        count + 1
    }

    fn destroy_one(&mut self, id: WidgetId) {
        let parent = self.widgets.parent(id);
        if self.focused == Some(id) {
            self.focused = parent.filter(|p| *p != self.root);
        }
        if self.active == Some(id) {
            self.active = None;
        }
        if self.active_prev == Some(id) {
            self.active_prev = parent;
        }
        self.invalidate_with_parent(id);

        self.free_text(id);
        for t in self.timers.owned_by(id) {
            self.remove_timer(t);
        }
        if let Some(instance) = self.widgets.instance[id.idx as usize].take() {
            self.heap.free(instance);
        }
        self.widgets.release(id);
    }

    /// Tears down the whole tree, ignoring vetoes, and every timer.
    pub(crate) fn teardown(&mut self) {
        let children: Vec<WidgetId> = self.widgets.children(self.root).collect();
        for c in children {
            self.destroy_subtree(c);
        }
        for t in self.timers.ids() {
            self.remove_timer(t);
        }
        let root = self.root;
        self.free_text(root);
        if let Some(instance) = self.widgets.instance[root.idx as usize].take() {
            self.heap.free(instance);
        }
    }

    // -- Geometry and appearance --

    /// Moves a widget, relative to its parent's inner origin.
    pub fn set_position(&mut self, id: WidgetId, origin: Point) {
        let rect = self.widgets.rect(id);
        if rect.origin() != origin {
            self.invalidate_with_parent(id);
            self.widgets.rect[id.idx as usize] = rect.with_origin(origin);
            self.invalidate_with_parent(id);
        }
    }

    /// Resizes a widget.
    pub fn set_size(&mut self, id: WidgetId, size: Size) {
        let rect = self.widgets.rect(id);
        if rect.size() != size {
            self.invalidate_with_parent(id);
            self.widgets.rect[id.idx as usize] = rect.with_size(size);
            self.invalidate_with_parent(id);
        }
    }

    /// Sets the padding that shrinks the area children live in.
    pub fn set_padding(&mut self, id: WidgetId, padding: Insets) {
        if self.widgets.padding(id) != padding {
            self.invalidate_with_parent(id);
            self.widgets.padding[id.idx as usize] = padding;
            self.invalidate_with_parent(id);
        }
    }

    /// Sets a widget's opacity (255 = opaque).
    pub fn set_alpha(&mut self, id: WidgetId, alpha: u8) {
        if self.widgets.alpha(id) != alpha {
            self.widgets.alpha[id.idx as usize] = alpha;
            self.invalidate_with_parent(id);
        }
    }

    /// Overrides color slot `index`, or restores the class default with
    /// `None`. Returns `false` if `index` is out of range.
    pub fn set_color(&mut self, id: WidgetId, index: usize, color: Option<Color>) -> bool {
        self.widgets.validate(id);
        let Some(slot) = self.widgets.colors[id.idx as usize].get_mut(index) else {
            return false;
        };
        if *slot != color {
            *slot = color;
            self.invalidate(id);
        }
        true
    }

    /// Attaches an opaque value to a widget.
    pub fn set_user_data(&mut self, id: WidgetId, data: usize) {
        self.widgets.validate(id);
        self.widgets.user_data[id.idx as usize] = data;
    }

    /// Installs an instance event handler that runs before the class
    /// handler.
    pub fn set_handler<F>(&mut self, id: WidgetId, handler: F)
    where
        F: FnMut(&mut Self, WidgetId, Event) -> Reply + 'static,
    {
        self.widgets.validate(id);
        self.widgets.handler[id.idx as usize] = Some(Box::new(handler));
    }

    /// Removes the instance event handler.
    pub fn clear_handler(&mut self, id: WidgetId) {
        self.widgets.validate(id);
        self.widgets.handler[id.idx as usize] = None;
    }

    /// Replaces the class draw function for one widget, or restores it with
    /// `None`.
    pub fn set_painter(&mut self, id: WidgetId, painter: Option<DrawFn>) {
        self.widgets.validate(id);
        self.widgets.painter[id.idx as usize] = painter;
        self.invalidate(id);
    }

    /// Enables or disables invalidation for a widget, typically around a
    /// batch of geometry changes.
    pub fn set_ignore_invalidate(&mut self, id: WidgetId, ignore: bool) {
        self.widgets.validate(id);
        self.widgets.flags[id.idx as usize].set(WidgetFlags::IGNORE_INVALIDATE, ignore);
    }

    /// Shows a hidden widget.
    pub fn show(&mut self, id: WidgetId) {
        if self.widgets.flags(id).contains(WidgetFlags::HIDDEN) {
            self.widgets.flags[id.idx as usize].remove(WidgetFlags::HIDDEN);
            self.invalidate_with_parent(id);
        }
    }

    /// Hides a widget and its subtree. Focus and touch ownership inside the
    /// subtree are given up.
    pub fn hide(&mut self, id: WidgetId) {
        if !self.widgets.flags(id).contains(WidgetFlags::HIDDEN) {
            self.widgets.flags[id.idx as usize].insert(WidgetFlags::HIDDEN);
            self.invalidate_with_parent(id);
        }
        if self.focused.is_some_and(|f| self.widgets.is_within(f, id)) {
            match self.widgets.parent(id) {
                Some(p) => self.set_focus(p),
                None => self.clear_focus(),
            }
        }
        if self.active.is_some_and(|a| self.widgets.is_within(a, id)) {
            self.clear_active();
        }
    }

    /// Moves a widget and all its ancestors to the front of their sibling
    /// lists, invalidating each one that moved.
    pub fn bring_to_front(&mut self, id: WidgetId) {
        self.widgets.validate(id);
        let mut idx = id.idx;
        while idx != INVALID {
            if self.widgets.move_to_back(idx) {
                let w = self.widgets.id_at(idx);
                self.invalidate(w);
            }
            idx = self.widgets.parent[idx as usize];
        }
    }

    // -- Invalidation --

    /// Marks a widget for redraw and grows the damage rectangle to cover it.
    pub fn invalidate(&mut self, id: WidgetId) {
        self.widgets.validate(id);
        self.invalidate_inner(id.idx, true);
    }

    /// Like [`invalidate`](Self::invalidate), and also repaints the parent
    /// within the widget's area. Used when a widget does not paint all of
    /// its bounds, or when its bounds change.
    pub fn invalidate_with_parent(&mut self, id: WidgetId) {
        self.widgets.validate(id);
        self.invalidate_inner(id.idx, true);
        let p = self.widgets.parent[id.idx as usize];
        if p != INVALID {
            self.invalidate_inner(p, false);
        }
    }

    fn invalidate_inner(&mut self, idx: u32, grow_damage: bool) {
        let i = idx as usize;
        if self.widgets.flags[i].contains(WidgetFlags::IGNORE_INVALIDATE) {
            return;
        }
        let parent = self.widgets.parent[i];
        if parent != INVALID && self.widgets.hidden_in_chain(parent) {
            return;
        }

        self.widgets.mark_dirty(idx);
        self.redraw_requested = true;
        let visible = self.widgets.visible_rect_at(idx);
        if grow_damage {
            if let Some(r) = visible {
                self.damage = union_into(self.damage, r);
            }
        }
        if parent == INVALID {
            return;
        }

        if self.widgets.alpha[i] < u8::MAX {
            self.invalidate_inner(parent, false);
        }

        if let Some(r) = visible {
            let mut s = self.widgets.first_child[parent as usize];
            while s != INVALID {
                let dirty = self.widgets.flags[s as usize].contains(WidgetFlags::DIRTY);
                if s != idx
                    && !dirty
                    && self
                        .widgets
                        .visible_rect_at(s)
                        .is_some_and(|other| overlaps(r, other))
                {
                    self.widgets.mark_dirty(s);
                }
                s = self.widgets.next_sibling[s as usize];
            }
        }

        if visible.is_some_and(|r| self.covered_from_above(parent, r)) {
            self.invalidate_inner(parent, false);
        }

        let mut a = parent;
        while a != INVALID {
            if self.widgets.alpha[a as usize] < u8::MAX {
                self.invalidate_inner(a, false);
                break;
            }
            a = self.widgets.parent[a as usize];
        }
    }

    /// Returns `true` if a later sibling of `parent` or of one of its
    /// ancestors overlaps `r`.
    fn covered_from_above(&self, parent: u32, r: Rect) -> bool {
        let mut a = parent;
        while a != INVALID {
            let mut s = self.widgets.next_sibling[a as usize];
            while s != INVALID {
                if self
                    .widgets
                    .visible_rect_at(s)
                    .is_some_and(|other| overlaps(r, other))
                {
                    return true;
                }
                s = self.widgets.next_sibling[s as usize];
            }
            a = self.widgets.parent[a as usize];
        }
        false
    }

    // -- Focus and active --

    /// Gives keyboard focus to `id`.
    ///
    /// Focus is a chain: the focused widget and all its ancestors below the
    /// desktop carry [`WidgetFlags::FOCUSED`]. Widgets leaving the chain get
    /// [`Event::FocusOut`]; widgets joining it get [`Event::FocusIn`]. The
    /// desktop never holds focus, so focusing it clears focus.
    pub fn set_focus(&mut self, id: WidgetId) {
        self.widgets.validate(id);
        if id == self.root {
            self.clear_focus();
            return;
        }
        if self.focused == Some(id) {
            return;
        }

        let mut common = self.root;
        if let Some(old) = self.focused {
            let mut cur = old;
            loop {
                if cur == self.root || self.widgets.is_within(id, cur) {
                    common = cur;
                    break;
                }
                self.widgets.flags[cur.idx as usize].remove(WidgetFlags::FOCUSED);
                self.send(cur, Event::FocusOut);
                self.invalidate(cur);
                match self.widgets.parent(cur) {
                    Some(p) => cur = p,
                    None => break,
                }
            }
        }

        self.focused = Some(id);
        let mut cur = id;
        while cur != common && cur != self.root {
            self.widgets.flags[cur.idx as usize].insert(WidgetFlags::FOCUSED);
            self.send(cur, Event::FocusIn);
            self.invalidate(cur);
            match self.widgets.parent(cur) {
                Some(p) => cur = p,
                None => break,
            }
        }
    }

    /// Removes keyboard focus from every widget.
    pub fn clear_focus(&mut self) {
        let Some(mut cur) = self.focused.take() else {
            return;
        };
        while cur != self.root {
            self.widgets.flags[cur.idx as usize].remove(WidgetFlags::FOCUSED);
            self.send(cur, Event::FocusOut);
            self.invalidate(cur);
            match self.widgets.parent(cur) {
                Some(p) => cur = p,
                None => break,
            }
        }
    }

    /// Makes `id` the widget owning the current touch.
    pub fn set_active(&mut self, id: WidgetId) {
        self.widgets.validate(id);
        self.clear_active();
        self.active = Some(id);
        self.widgets.flags[id.idx as usize].insert(WidgetFlags::ACTIVE);
        self.send(id, Event::ActiveIn);
    }

    /// Clears the active widget, remembering it as the previous one.
    pub fn clear_active(&mut self) {
        let Some(a) = self.active else {
            return;
        };
        self.send(a, Event::ActiveOut);
        if self.widgets.is_alive(a) {
            self.widgets.flags[a.idx as usize]
                .remove(WidgetFlags::ACTIVE | WidgetFlags::TOUCH_MOVE);
        }
        self.active_prev = Some(a);
        self.active = None;
    }

    // -- Text --

    /// Gives a widget an empty text buffer of `capacity` bytes, replacing
    /// any existing one. Returns `false` if the heap is exhausted.
    pub fn alloc_text(&mut self, id: WidgetId, capacity: usize) -> bool {
        self.widgets.validate(id);
        self.free_text(id);
        let capacity = capacity.max(1);
        let Some(ptr) = self.heap.alloc(capacity) else {
            self.record_failure(AllocSite::Text, capacity);
            return false;
        };
        self.widgets.text[id.idx as usize] = Some(TextBuf {
            ptr,
            len: 0,
            cap: capacity,
            cursor: 0,
        });
        self.invalidate(id);
        true
    }

    /// Releases a widget's text buffer.
    pub fn free_text(&mut self, id: WidgetId) {
        self.widgets.validate(id);
        if let Some(buf) = self.widgets.text[id.idx as usize].take() {
            self.heap.free(buf.ptr);
            self.invalidate(id);
        }
    }

    /// Replaces a widget's text. A buffer sized to fit is allocated if the
    /// widget has none; an existing buffer keeps its capacity and the text
    /// is truncated on a character boundary. Returns `false` if no buffer
    /// could be allocated.
    pub fn set_text(&mut self, id: WidgetId, text: &str) -> bool {
        self.widgets.validate(id);
        if self.widgets.text[id.idx as usize].is_none() && !self.alloc_text(id, text.len()) {
            return false;
        }
        let Some(mut buf) = self.widgets.text[id.idx as usize] else {
            return false;
        };
        let mut len = text.len().min(buf.cap);
        while !text.is_char_boundary(len) {
            len -= 1;
        }
        let Some(bytes) = self.heap.bytes_mut(buf.ptr) else {
            return false;
        };
        bytes[..len].copy_from_slice(&text.as_bytes()[..len]);
        buf.len = len;
        buf.cursor = len;
        self.widgets.text[id.idx as usize] = Some(buf);
        self.send(id, Event::TextChanged);
        self.invalidate(id);
        true
    }

    /// The widget's text, if it has a buffer.
    #[must_use]
    pub fn text(&self, id: WidgetId) -> Option<&str> {
        self.widgets.validate(id);
        let buf = self.widgets.text[id.idx as usize]?;
        let bytes = self.heap.bytes(buf.ptr)?.get(..buf.len)?;
        core::str::from_utf8(bytes).ok()
    }

    /// The edit cursor of the widget's text, in bytes.
    #[must_use]
    pub fn text_cursor(&self, id: WidgetId) -> Option<usize> {
        self.widgets.validate(id);
        self.widgets.text[id.idx as usize].map(|t| t.cursor)
    }

    /// Applies a key press to a widget's text buffer: printable characters
    /// are inserted at the cursor, backspace deletes before it, and left and
    /// right move it.
    ///
    /// Returns [`Reply::Handled`] if the key was consumed. Editable widget
    /// classes call this from their [`Event::KeyPress`] handler.
    pub fn process_text_key(&mut self, id: WidgetId, key: KeySample) -> Reply {
        self.widgets.validate(id);
        let Some(mut buf) = self.widgets.text[id.idx as usize] else {
            return Reply::Ignored;
        };
        let Some(bytes) = self.heap.bytes_mut(buf.ptr) else {
            return Reply::Ignored;
        };
        let Ok(current) = core::str::from_utf8(&bytes[..buf.len]) else {
            return Reply::Ignored;
        };
        let before = current[..buf.cursor].chars().next_back().map(char::len_utf8);
        let after = current[buf.cursor..].chars().next().map(char::len_utf8);

        let changed = match key.key {
            keyboard::BACKSPACE => {
                let Some(n) = before else {
                    return Reply::Handled;
                };
                bytes.copy_within(buf.cursor..buf.len, buf.cursor - n);
                buf.cursor -= n;
                buf.len -= n;
                true
            }
            keyboard::LEFT => {
                buf.cursor -= before.unwrap_or(0);
                false
            }
            keyboard::RIGHT => {
                buf.cursor += after.unwrap_or(0);
                false
            }
            c if !c.is_control() => {
                let mut enc = [0_u8; 4];
                let s = c.encode_utf8(&mut enc);
                let n = s.len();
                if buf.len + n > buf.cap {
                    return Reply::Handled;
                }
                bytes.copy_within(buf.cursor..buf.len, buf.cursor + n);
                bytes[buf.cursor..buf.cursor + n].copy_from_slice(s.as_bytes());
                buf.cursor += n;
                buf.len += n;
                true
            }
            _ => return Reply::Ignored,
        };
        self.widgets.text[id.idx as usize] = Some(buf);
        if changed {
            self.send(id, Event::TextChanged);
        }
        self.invalidate(id);
        Reply::Handled
    }

    // -- Timers --

    /// Creates a stopped timer. Returns `None` if the heap is exhausted.
    pub fn create_timer<F>(&mut self, period: Millis, callback: F) -> Option<TimerId>
    where
        F: FnMut(&mut Self, TimerId) + 'static,
    {
        self.create_timer_inner(period, None, Box::new(callback))
    }

    /// Creates a stopped timer owned by `owner`: it is removed together with
    /// the widget.
    pub fn create_widget_timer<F>(
        &mut self,
        owner: WidgetId,
        period: Millis,
        callback: F,
    ) -> Option<TimerId>
    where
        F: FnMut(&mut Self, TimerId) + 'static,
    {
        self.widgets.validate(owner);
        self.create_timer_inner(period, Some(owner), Box::new(callback))
    }

    fn create_timer_inner(
        &mut self,
        period: Millis,
        owner: Option<WidgetId>,
        callback: crate::timer::TimerCallback,
    ) -> Option<TimerId> {
        let Some(block) = self.heap.calloc(1, TIMER_RECORD_SIZE) else {
            self.record_failure(AllocSite::Timer, TIMER_RECORD_SIZE);
            return None;
        };
        Some(self.timers.insert(period, callback, owner, block))
    }

    /// Starts a one-shot timer from its full period.
    pub fn start_timer(&mut self, id: TimerId) {
        self.timers.start(id, false);
    }

    /// Starts a periodic timer from its full period.
    pub fn start_periodic_timer(&mut self, id: TimerId) {
        self.timers.start(id, true);
    }

    /// Stops a timer and rewinds it.
    pub fn stop_timer(&mut self, id: TimerId) {
        self.timers.stop(id);
    }

    /// Rewinds a timer without changing whether it runs.
    pub fn reset_timer(&mut self, id: TimerId) {
        self.timers.reset(id);
    }

    /// Changes a timer's period; takes effect at the next (re)start.
    pub fn set_timer_period(&mut self, id: TimerId, period: Millis) {
        self.timers.set_period(id, period);
    }

    /// Deletes a timer. Safe to call from the timer's own callback.
    pub fn remove_timer(&mut self, id: TimerId) {
        if let Some(block) = self.timers.remove(id) {
            self.heap.free(block);
        }
    }

    /// Number of running timers.
    #[must_use]
    pub fn active_timer_count(&self) -> usize {
        self.timers.active_count()
    }
}
