// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the tick loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! orchestrator calls at each stage of a tick. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! [`SummaryBuilder`] collects phase timestamps during a tick and produces a
//! [`TickSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) gates [`DispatchRecord`] and
//!   [`DamageRect`] events plus the corresponding `TraceSink` methods.

use crate::geometry::PixelRect;
use crate::heap::HeapStats;
use crate::redraw::PresentReport;
use crate::time::Millis;
use crate::ui::{AllocFailure, AllocSite};
#[cfg(feature = "trace-rich")]
use crate::widget::EventKind;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a tick is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PhaseKind {
    /// Timer accounting and callbacks.
    Timers = 0,
    /// Deferred widget removals.
    Removals = 1,
    /// Draining the touch queue.
    Touch = 2,
    /// Draining the key queue.
    Keyboard = 3,
    /// Redraw and present.
    Redraw = 4,
}

impl PhaseKind {
    /// Every phase, in tick order.
    pub const ALL: [Self; PHASE_COUNT] = [
        Self::Timers,
        Self::Removals,
        Self::Touch,
        Self::Keyboard,
        Self::Redraw,
    ];

    /// Short lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Timers => "timers",
            Self::Removals => "removals",
            Self::Touch => "touch",
            Self::Keyboard => "keyboard",
            Self::Redraw => "redraw",
        }
    }

    /// Decodes a discriminant written with `phase as u8`.
    #[must_use]
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Timers),
            1 => Some(Self::Removals),
            2 => Some(Self::Touch),
            3 => Some(Self::Keyboard),
            4 => Some(Self::Redraw),
            _ => None,
        }
    }
}

/// Number of [`PhaseKind`] variants.
pub const PHASE_COUNT: usize = 5;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a tick starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickEvent {
    /// Monotonic tick counter.
    pub tick: u64,
    /// Runtime clock at the start of the tick.
    pub now: Millis,
    /// Touch samples waiting in the queue.
    pub touch_queued: u32,
    /// Key samples waiting in the queue.
    pub key_queued: u32,
}

/// Marks the beginning of a tick phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseBeginEvent {
    /// Tick counter.
    pub tick: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Clock at the start of the phase.
    pub timestamp: Millis,
}

/// Marks the end of a tick phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PhaseEndEvent {
    /// Tick counter.
    pub tick: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Clock at the end of the phase.
    pub timestamp: Millis,
    /// Units of work done: callbacks fired, widgets removed, samples
    /// consumed, or widgets drawn.
    pub work: u32,
}

/// Emitted when a frame is handed to the display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentEvent {
    /// Tick counter.
    pub tick: u64,
    /// Frame counter.
    pub frame: u64,
    /// Layer made visible.
    pub layer: u8,
    /// Widgets drawn.
    pub drawn: u32,
    /// Translucent subtrees blended through scratch memory.
    pub composited: u32,
    /// Translucent subtrees painted opaque for lack of scratch memory.
    pub fallbacks: u32,
    /// Area repainted this frame.
    pub damage: Option<PixelRect>,
    /// Area copied forward from the previously shown layer.
    pub copied: Option<PixelRect>,
}

impl PresentEvent {
    /// Creates a `PresentEvent` from a [`PresentReport`].
    #[must_use]
    pub fn new(tick: u64, report: &PresentReport) -> Self {
        Self {
            tick,
            frame: report.frame,
            layer: report.layer,
            drawn: report.redraw.drawn,
            composited: report.redraw.composited,
            fallbacks: report.redraw.fallbacks,
            damage: report.redraw.damage,
            copied: report.copied,
        }
    }
}

/// Emitted for every allocation that failed since the previous tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocFailureEvent {
    /// Tick counter.
    pub tick: u64,
    /// What was being allocated.
    pub site: AllocSite,
    /// Requested size in bytes.
    pub size: u32,
}

impl AllocFailureEvent {
    /// Creates an event from a recorded [`AllocFailure`].
    #[must_use]
    pub fn new(tick: u64, failure: &AllocFailure) -> Self {
        Self {
            tick,
            site: failure.site,
            size: u32::try_from(failure.size).unwrap_or(u32::MAX),
        }
    }
}

/// Per-tick summary produced by [`SummaryBuilder`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickSummary {
    /// Tick counter.
    pub tick: u64,
    /// Clock at the start of the tick.
    pub now: Millis,
    /// Phase durations, indexed by `PhaseKind as usize` (0 if not measured).
    pub phase_ms: [u32; PHASE_COUNT],
    /// Work done per phase, indexed like `phase_ms`.
    pub work: [u32; PHASE_COUNT],
    /// Frame presented this tick, if any.
    pub frame: Option<u64>,
    /// Samples rejected by full input queues so far.
    pub dropped_samples: u64,
    /// Heap usage at the end of the tick.
    pub heap: HeapStats,
}

impl TickSummary {
    /// Duration of one phase.
    #[must_use]
    pub fn phase(&self, phase: PhaseKind) -> u32 {
        self.phase_ms[phase_index(phase)]
    }

    /// Work done in one phase.
    #[must_use]
    pub fn work(&self, phase: PhaseKind) -> u32 {
        self.work[phase_index(phase)]
    }
}

/// One event delivered to a widget.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DispatchRecord {
    /// Arena index of the receiving widget.
    pub widget: u32,
    /// What was delivered.
    pub kind: EventKind,
}

/// An axis-aligned damage rectangle.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DamageRect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

#[cfg(feature = "trace-rich")]
impl From<PixelRect> for DamageRect {
    fn from(r: PixelRect) -> Self {
        Self {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the tick loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a tick starts.
    fn on_tick(&mut self, e: &TickEvent) {
        _ = e;
    }

    /// Called at the beginning of a tick phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a tick phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a frame is presented.
    fn on_present(&mut self, e: &PresentEvent) {
        _ = e;
    }

    /// Called once per allocation failure.
    fn on_alloc_failure(&mut self, e: &AllocFailureEvent) {
        _ = e;
    }

    /// Called with a per-tick summary.
    fn on_tick_summary(&mut self, s: &TickSummary) {
        _ = s;
    }

    /// Called with every event delivered this tick (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_dispatches(&mut self, tick: u64, records: &[DispatchRecord]) {
        _ = (tick, records);
    }

    /// Called with this tick's damage rectangles (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_damage_rects(&mut self, tick: u64, rects: &[DamageRect]) {
        _ = (tick, rects);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Returns `true` if events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Emits a [`TickEvent`].
    #[inline]
    pub fn tick(&mut self, e: &TickEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_tick(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PresentEvent`].
    #[inline]
    pub fn present(&mut self, e: &PresentEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_present(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`AllocFailureEvent`].
    #[inline]
    pub fn alloc_failure(&mut self, e: &AllocFailureEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_alloc_failure(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TickSummary`].
    #[inline]
    pub fn tick_summary(&mut self, s: &TickSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_tick_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits this tick's dispatches (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn dispatches(&mut self, tick: u64, records: &[DispatchRecord]) {
        if let Some(s) = &mut self.sink {
            s.on_dispatches(tick, records);
        }
    }

    /// Emits damage rectangles (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn damage_rects(&mut self, tick: u64, rects: &[DamageRect]) {
        if let Some(s) = &mut self.sink {
            s.on_damage_rects(tick, rects);
        }
    }
}

// ---------------------------------------------------------------------------
// SummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a tick and produces a [`TickSummary`].
#[derive(Debug)]
pub struct SummaryBuilder {
    tick: TickEvent,
    starts: [Option<Millis>; PHASE_COUNT],
    ends: [Option<Millis>; PHASE_COUNT],
    work: [u32; PHASE_COUNT],
    frame: Option<u64>,
    dropped_samples: u64,
}

impl SummaryBuilder {
    /// Starts building a summary for the given tick.
    #[must_use]
    pub fn new(tick: &TickEvent) -> Self {
        Self {
            tick: *tick,
            starts: [None; PHASE_COUNT],
            ends: [None; PHASE_COUNT],
            work: [0; PHASE_COUNT],
            frame: None,
            dropped_samples: 0,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: Millis) {
        self.starts[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase and the work it did.
    pub fn phase_end(&mut self, phase: PhaseKind, t: Millis, work: u32) {
        let idx = phase_index(phase);
        self.ends[idx] = Some(t);
        self.work[idx] = work;
    }

    /// Records the frame presented this tick.
    pub fn set_frame(&mut self, frame: u64) {
        self.frame = Some(frame);
    }

    /// Records the running count of rejected input samples.
    pub fn set_dropped_samples(&mut self, dropped: u64) {
        self.dropped_samples = dropped;
    }

    /// Consumes the builder and produces the final [`TickSummary`].
    #[must_use]
    pub fn finish(self, heap: HeapStats) -> TickSummary {
        let mut phase_ms = [0; PHASE_COUNT];
        for phase in PhaseKind::ALL {
            phase_ms[phase_index(phase)] = self.phase_duration(phase);
        }
        TickSummary {
            tick: self.tick.tick,
            now: self.tick.now,
            phase_ms,
            work: self.work,
            frame: self.frame,
            dropped_samples: self.dropped_samples,
            heap,
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> u32 {
        let idx = phase_index(phase);
        match (self.starts[idx], self.ends[idx]) {
            (Some(start), Some(end)) => end.elapsed_since(start).get(),
            _ => 0,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Timers => 0,
        PhaseKind::Removals => 1,
        PhaseKind::Touch => 2,
        PhaseKind::Keyboard => 3,
        PhaseKind::Redraw => 4,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
