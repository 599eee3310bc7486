// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Widget tree data model.
//!
//! A *widget* is a node in the on-screen tree. Each widget has:
//!
//! - An identity ([`WidgetId`]): a generational handle that becomes stale
//!   when the widget is removed.
//! - Topology: parent, first/last child, and sibling links. Sibling order is
//!   z-order, so the last child is frontmost.
//! - A [`WidgetClass`]: an immutable descriptor with the default event
//!   handler, draw function, colors, and per-instance memory size.
//! - Geometry relative to the parent's padding-shrunk origin, flags, an
//!   opacity, color overrides, optional text, and an optional instance
//!   handler and painter that take precedence over the class.
//!
//! Widgets are stored in struct-of-arrays layout ([`WidgetStore`]).
//! Mutations go through [`Ui`](crate::ui::Ui), which keeps invalidation,
//! focus, and the runtime heap consistent.

mod class;
mod id;
mod store;
mod traverse;
mod view;

pub use class::{
    ClassFlags, DESKTOP, DrawFn, DrawPhase, Event, EventFn, EventKind, Handler, Reply,
    WidgetClass, WidgetFlags, draw_nothing, fill_background, ignore_events,
};
pub use id::{INVALID, WidgetId};
pub(crate) use store::TextBuf;
pub use store::{COLOR_SLOTS, WidgetStore};
pub use traverse::{Ancestors, Children, ChildrenRev};
pub use view::WidgetView;
