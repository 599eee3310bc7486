// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Read-only widget access for draw functions.

use kurbo::{Rect, Size};

use super::class::{WidgetClass, WidgetFlags};
use super::id::WidgetId;
use super::store::WidgetStore;
use crate::display::Color;
use crate::heap::HeapView;

/// What a draw function may know about the widget it paints.
#[derive(Clone, Copy, Debug)]
pub struct WidgetView<'a> {
    store: &'a WidgetStore,
    heap: HeapView<'a>,
    id: WidgetId,
    bounds: Rect,
}

impl<'a> WidgetView<'a> {
    pub(crate) fn new(store: &'a WidgetStore, heap: HeapView<'a>, id: WidgetId) -> Self {
        Self {
            store,
            heap,
            id,
            bounds: store.abs_rect_at(id.idx),
        }
    }

    /// The widget being drawn.
    #[must_use]
    pub fn id(&self) -> WidgetId {
        self.id
    }

    /// Its class.
    #[must_use]
    pub fn class(&self) -> &'static WidgetClass {
        self.store.class_at(self.id.idx)
    }

    /// Its flags.
    #[must_use]
    pub fn flags(&self) -> WidgetFlags {
        self.store.flags[self.id.idx as usize]
    }

    /// Whether it has keyboard focus.
    #[must_use]
    pub fn is_focused(&self) -> bool {
        self.flags().contains(WidgetFlags::FOCUSED)
    }

    /// Whether it owns the current touch.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.flags().contains(WidgetFlags::ACTIVE)
    }

    /// Its opacity.
    #[must_use]
    pub fn alpha(&self) -> u8 {
        self.store.alpha[self.id.idx as usize]
    }

    /// Color slot `index`, resolved against the class defaults.
    #[must_use]
    pub fn color(&self, index: usize) -> Color {
        self.store.color_at(self.id.idx, index)
    }

    /// Absolute bounds.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Size.
    #[must_use]
    pub fn size(&self) -> Size {
        self.bounds.size()
    }

    /// The widget's text, if it has a buffer.
    #[must_use]
    pub fn text(&self) -> Option<&'a str> {
        let buf = self.store.text[self.id.idx as usize]?;
        let bytes = self.heap.bytes(buf.ptr)?.get(..buf.len)?;
        core::str::from_utf8(bytes).ok()
    }

    /// The cursor position within [`text`](Self::text), in bytes.
    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.store.text[self.id.idx as usize].map(|t| t.cursor)
    }

    /// The class's per-instance memory.
    #[must_use]
    pub fn instance(&self) -> Option<&'a [u8]> {
        self.heap.bytes(self.store.instance[self.id.idx as usize]?)
    }

    /// The opaque user value.
    #[must_use]
    pub fn user_data(&self) -> usize {
        self.store.user_data[self.id.idx as usize]
    }
}
