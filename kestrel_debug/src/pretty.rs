// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Times are
//! the GUI clock in milliseconds.

use std::io::Write;

use kestrel_core::geometry::PixelRect;
use kestrel_core::trace::{
    AllocFailureEvent, DamageRect, DispatchRecord, PhaseBeginEvent, PhaseEndEvent, PhaseKind,
    PresentEvent, TickEvent, TickSummary, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    verbose: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    ///
    /// Only tick summaries, presents, and allocation failures are printed
    /// until [`verbose`](Self::verbose) is enabled.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }

    /// Also prints tick starts, phase boundaries, and dispatch counts.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

struct Area(Option<PixelRect>);

impl std::fmt::Display for Area {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(r) => write!(f, "{}x{}@{},{}", r.width, r.height, r.x, r.y),
            None => f.write_str("-"),
        }
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_tick(&mut self, e: &TickEvent) {
        if !self.verbose {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[tick] #{} now={}ms touches={} keys={}",
            e.tick,
            e.now.get(),
            e.touch_queued,
            e.key_queued,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        if !self.verbose {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[phase:begin] #{} {} at {}ms",
            e.tick,
            e.phase.name(),
            e.timestamp.get(),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        if !self.verbose {
            return;
        }
        let _ = writeln!(
            self.writer,
            "[phase:end] #{} {} at {}ms work={}",
            e.tick,
            e.phase.name(),
            e.timestamp.get(),
            e.work,
        );
    }

    fn on_present(&mut self, e: &PresentEvent) {
        let _ = writeln!(
            self.writer,
            "[present] #{} frame={} layer={} drawn={} composited={} fallbacks={} damage={} copied={}",
            e.tick,
            e.frame,
            e.layer,
            e.drawn,
            e.composited,
            e.fallbacks,
            Area(e.damage),
            Area(e.copied),
        );
    }

    fn on_alloc_failure(&mut self, e: &AllocFailureEvent) {
        let _ = writeln!(
            self.writer,
            "[alloc] #{} FAILED site={:?} size={}",
            e.tick, e.site, e.size,
        );
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        let frame = s
            .frame
            .map_or_else(|| "-".to_owned(), |f| f.to_string());
        let _ = write!(self.writer, "[summary] #{} frame={frame}", s.tick);
        for phase in PhaseKind::ALL {
            let _ = write!(
                self.writer,
                " {}={}ms/{}",
                phase.name(),
                s.phase(phase),
                s.work(phase),
            );
        }
        let _ = writeln!(
            self.writer,
            " heap={}/{} low={} dropped={}",
            s.heap.used(),
            s.heap.total,
            s.heap.min_ever_free,
            s.dropped_samples,
        );
    }

    fn on_dispatches(&mut self, tick: u64, records: &[DispatchRecord]) {
        if !self.verbose {
            return;
        }
        let _ = writeln!(self.writer, "[dispatch] #{tick} events={}", records.len());
    }

    fn on_damage_rects(&mut self, tick: u64, rects: &[DamageRect]) {
        if !self.verbose {
            return;
        }
        let _ = writeln!(self.writer, "[damage] #{tick} rects={}", rects.len());
    }
}
