// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][spec] JSON to the given writer.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use kestrel_core::time::Millis;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Events without their own timestamp (presents, allocation failures, and
/// the per-tick counts) are placed at the start of their tick. Heap usage
/// from each tick summary is emitted as a counter track.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut tick_start = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Tick(e) => {
                tick_start = ms_to_us(e.now);
                events.push(json!({
                    "ph": "i",
                    "name": "Tick",
                    "cat": "Orchestrator",
                    "ts": tick_start,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "tick": e.tick,
                        "touch_queued": e.touch_queued,
                        "key_queued": e.key_queued,
                    }
                }));
            }
            RecordedEvent::PhaseBegin(e) => {
                events.push(json!({
                    "ph": "B",
                    "name": e.phase.name(),
                    "cat": "Tick",
                    "ts": ms_to_us(e.timestamp),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "tick": e.tick,
                    }
                }));
            }
            RecordedEvent::PhaseEnd(e) => {
                events.push(json!({
                    "ph": "E",
                    "name": e.phase.name(),
                    "cat": "Tick",
                    "ts": ms_to_us(e.timestamp),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "tick": e.tick,
                        "work": e.work,
                    }
                }));
            }
            RecordedEvent::Present(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Present",
                    "cat": "Display",
                    "ts": tick_start,
                    "pid": 0,
                    "tid": 1,
                    "s": "t",
                    "args": {
                        "tick": e.tick,
                        "frame": e.frame,
                        "layer": e.layer,
                        "drawn": e.drawn,
                        "composited": e.composited,
                        "fallbacks": e.fallbacks,
                        "damage": e.damage.map(|r| json!({
                            "x": r.x,
                            "y": r.y,
                            "w": r.width,
                            "h": r.height,
                        })),
                    }
                }));
            }
            RecordedEvent::AllocFailure(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "AllocFailure",
                    "cat": "Heap",
                    "ts": tick_start,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "tick": e.tick,
                        "site": format!("{:?}", e.site),
                        "size": e.size,
                    }
                }));
            }
            RecordedEvent::TickSummary(s) => {
                events.push(json!({
                    "ph": "C",
                    "name": "Heap",
                    "cat": "Summary",
                    "ts": ms_to_us(s.now),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "used": s.heap.used(),
                        "free": s.heap.free,
                    }
                }));
                if s.dropped_samples > 0 {
                    events.push(json!({
                        "ph": "C",
                        "name": "DroppedSamples",
                        "cat": "Summary",
                        "ts": ms_to_us(s.now),
                        "pid": 0,
                        "tid": 0,
                        "args": {
                            "dropped": s.dropped_samples,
                        }
                    }));
                }
            }
            RecordedEvent::DispatchCount { tick, count } => {
                events.push(json!({
                    "ph": "i",
                    "name": "Dispatches",
                    "cat": "Rich",
                    "ts": tick_start,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "tick": tick,
                        "count": count,
                    }
                }));
            }
            RecordedEvent::DamageRects { tick, rects } => {
                events.push(json!({
                    "ph": "i",
                    "name": "DamageRects",
                    "cat": "Rich",
                    "ts": tick_start,
                    "pid": 0,
                    "tid": 1,
                    "s": "p",
                    "args": {
                        "tick": tick,
                        "count": rects.len(),
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ms_to_us(t: Millis) -> f64 {
    f64::from(t.get()) * 1000.0
}
