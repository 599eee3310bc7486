// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained-mode widget runtime for microcontroller-class displays.
//!
//! `kestrel_core` keeps a tree of widgets, turns raw touch and key samples
//! into widget events, runs cooperative timers, and repaints only what
//! changed into double-buffered display layers. It is `no_std` compatible
//! (with `alloc`); every piece of runtime state lives in one [`Gui`] value
//! owned by the embedding application.
//!
//! # Architecture
//!
//! ```text
//!   producers (drivers, ISRs, threads)
//!       │  Message::{Touch, Key, Wake}
//!       ▼
//!   Gui::run_once ──► Gui::process
//!                        │
//!       timers ──► removals ──► touch ──► keyboard ──► redraw/present
//!                                                          │
//!                                                          ▼
//!                                                   Display driver
//! ```
//!
//! **[`heap`]**: first-fit, coalescing free-list allocator over registered
//! memory regions. Widget instances, text, timers, and compositing scratch
//! buffers come from it, so exhaustion is visible and never fatal.
//!
//! **[`widget`]**: struct-of-arrays widget tree with generational handles,
//! class descriptors, events, and per-instance overrides.
//!
//! **[`ui`]**: the mutation API ([`Ui`](ui::Ui)): creation, deferred
//! removal, geometry, invalidation, focus and active tracking, text, and
//! timers.
//!
//! **[`redraw`]**: damage-driven redraw with clipping, alpha compositing, and
//! layer presentation gated on driver confirmation.
//!
//! **[`input`]**: touch hit-testing and routing, click recognition, and key
//! routing.
//!
//! **[`timer`]**: cooperative timers whose callbacks run one tick after
//! expiry.
//!
//! **[`sys`]**: OS primitive traits with a single-threaded [`NoSys`]
//! implementation.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! tick instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-event
//!   dispatch records and damage-rect events.
//!
//! [`Gui`]: gui::Gui
//! [`NoSys`]: sys::NoSys

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod buffer;
pub mod config;
pub mod dirty;
pub mod display;
pub mod error;
pub mod geometry;
pub mod gui;
pub mod heap;
pub mod input;
pub mod redraw;
pub mod sys;
pub mod time;
pub mod timer;
pub mod trace;
pub mod ui;
pub mod widget;
