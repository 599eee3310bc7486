// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, WidgetId};
use super::store::WidgetStore;

/// An iterator over the direct children of a widget, back to front.
///
/// Created by [`WidgetStore::children`].
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a WidgetStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a WidgetStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl Iterator for Children<'_> {
    type Item = WidgetId;

    fn next(&mut self) -> Option<WidgetId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(self.store.id_at(idx))
    }
}

/// An iterator over the direct children of a widget, front to back.
///
/// This is hit-testing order. Created by [`WidgetStore::children_rev`].
#[derive(Debug)]
pub struct ChildrenRev<'a> {
    store: &'a WidgetStore,
    current: u32,
}

impl<'a> ChildrenRev<'a> {
    pub(crate) fn new(store: &'a WidgetStore, last: u32) -> Self {
        Self {
            store,
            current: last,
        }
    }
}

impl Iterator for ChildrenRev<'_> {
    type Item = WidgetId;

    fn next(&mut self) -> Option<WidgetId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.prev_sibling[idx as usize];
        Some(self.store.id_at(idx))
    }
}

/// An iterator over the strict ancestors of a widget, nearest first.
///
/// Created by [`WidgetStore::ancestors`].
#[derive(Debug)]
pub struct Ancestors<'a> {
    store: &'a WidgetStore,
    current: u32,
}

impl<'a> Ancestors<'a> {
    pub(crate) fn new(store: &'a WidgetStore, parent: u32) -> Self {
        Self {
            store,
            current: parent,
        }
    }
}

impl Iterator for Ancestors<'_> {
    type Item = WidgetId;

    fn next(&mut self) -> Option<WidgetId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.parent[idx as usize];
        Some(self.store.id_at(idx))
    }
}
