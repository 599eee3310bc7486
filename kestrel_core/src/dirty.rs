// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Kestrel tracks redraw dirtiness with [`understory_dirty`]. Every widget
//! has a dependency edge from itself to its parent, and invalidation marks
//! with [`EagerPolicy`](understory_dirty::EagerPolicy), so marking a
//! container dirty also marks its whole subtree: a redrawn container always
//! repaints its children as a group.
//!
//! The redraw pass drains the channel into per-widget
//! [`DIRTY`](crate::widget::WidgetFlags::DIRTY) flags before walking the
//! tree.

use understory_dirty::Channel;

/// Widget pixels are stale and must be repainted on the next present.
pub const REDRAW: Channel = Channel::new(0);
