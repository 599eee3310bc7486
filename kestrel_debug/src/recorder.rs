// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Dispatch lists ([`on_dispatches`](TraceSink::on_dispatches)) store only
//! the count; damage rectangles are stored in full.

use kestrel_core::geometry::PixelRect;
use kestrel_core::heap::HeapStats;
use kestrel_core::time::Millis;
use kestrel_core::trace::{
    AllocFailureEvent, DamageRect, DispatchRecord, PHASE_COUNT, PhaseBeginEvent, PhaseEndEvent,
    PhaseKind, PresentEvent, TickEvent, TickSummary, TraceSink,
};
use kestrel_core::ui::AllocSite;

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_TICK: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_PRESENT: u8 = 4;
const TAG_ALLOC_FAILURE: u8 = 5;
const TAG_TICK_SUMMARY: u8 = 6;
const TAG_DISPATCH_COUNT: u8 = 7;
const TAG_DAMAGE_RECTS: u8 = 8;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_option_u64(&mut self, v: Option<u64>) {
        self.write_u8(u8::from(v.is_some()));
        self.write_u64(v.unwrap_or(0));
    }

    fn write_rect(&mut self, r: PixelRect) {
        self.write_i32(r.x);
        self.write_i32(r.y);
        self.write_u32(r.width);
        self.write_u32(r.height);
    }

    fn write_option_rect(&mut self, r: Option<PixelRect>) {
        self.write_u8(u8::from(r.is_some()));
        self.write_rect(r.unwrap_or_default());
    }

    fn write_count(&mut self, len: usize) {
        self.write_u32(u32::try_from(len).unwrap_or(u32::MAX));
    }
}

impl TraceSink for RecorderSink {
    fn on_tick(&mut self, e: &TickEvent) {
        self.write_u8(TAG_TICK);
        self.write_u64(e.tick);
        self.write_u32(e.now.get());
        self.write_u32(e.touch_queued);
        self.write_u32(e.key_queued);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.tick);
        self.write_u8(e.phase as u8);
        self.write_u32(e.timestamp.get());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.tick);
        self.write_u8(e.phase as u8);
        self.write_u32(e.timestamp.get());
        self.write_u32(e.work);
    }

    fn on_present(&mut self, e: &PresentEvent) {
        self.write_u8(TAG_PRESENT);
        self.write_u64(e.tick);
        self.write_u64(e.frame);
        self.write_u8(e.layer);
        self.write_u32(e.drawn);
        self.write_u32(e.composited);
        self.write_u32(e.fallbacks);
        self.write_option_rect(e.damage);
        self.write_option_rect(e.copied);
    }

    fn on_alloc_failure(&mut self, e: &AllocFailureEvent) {
        self.write_u8(TAG_ALLOC_FAILURE);
        self.write_u64(e.tick);
        self.write_u8(e.site as u8);
        self.write_u32(e.size);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.write_u8(TAG_TICK_SUMMARY);
        self.write_u64(s.tick);
        self.write_u32(s.now.get());
        for ms in s.phase_ms {
            self.write_u32(ms);
        }
        for work in s.work {
            self.write_u32(work);
        }
        self.write_option_u64(s.frame);
        self.write_u64(s.dropped_samples);
        self.write_u32(s.heap.total);
        self.write_u32(s.heap.free);
        self.write_u32(s.heap.min_ever_free);
    }

    fn on_dispatches(&mut self, tick: u64, records: &[DispatchRecord]) {
        self.write_u8(TAG_DISPATCH_COUNT);
        self.write_u64(tick);
        self.write_count(records.len());
    }

    fn on_damage_rects(&mut self, tick: u64, rects: &[DamageRect]) {
        self.write_u8(TAG_DAMAGE_RECTS);
        self.write_u64(tick);
        self.write_count(rects.len());
        for r in rects {
            self.write_rect(PixelRect::new(r.x, r.y, r.width, r.height));
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordedEvent {
    /// A [`TickEvent`].
    Tick(TickEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`PresentEvent`].
    Present(PresentEvent),
    /// An [`AllocFailureEvent`].
    AllocFailure(AllocFailureEvent),
    /// A [`TickSummary`].
    TickSummary(TickSummary),
    /// Number of events delivered to widgets in a tick.
    DispatchCount {
        /// Tick counter.
        tick: u64,
        /// Number of dispatches.
        count: u32,
    },
    /// Damage rectangles of a tick.
    DamageRects {
        /// Tick counter.
        tick: u64,
        /// The rectangles.
        rects: Vec<DamageRect>,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_i32(&mut self) -> Option<i32> {
        self.take().map(i32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_millis(&mut self) -> Option<Millis> {
        self.read_u32().map(Millis)
    }

    fn read_option_u64(&mut self) -> Option<Option<u64>> {
        let present = self.read_u8()?;
        let val = self.read_u64()?;
        Some((present != 0).then_some(val))
    }

    fn read_rect(&mut self) -> Option<PixelRect> {
        Some(PixelRect::new(
            self.read_i32()?,
            self.read_i32()?,
            self.read_u32()?,
            self.read_u32()?,
        ))
    }

    fn read_option_rect(&mut self) -> Option<Option<PixelRect>> {
        let present = self.read_u8()?;
        let rect = self.read_rect()?;
        Some((present != 0).then_some(rect))
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        PhaseKind::from_u8(self.read_u8()?)
    }

    fn read_array(&mut self) -> Option<[u32; PHASE_COUNT]> {
        let mut out = [0; PHASE_COUNT];
        for v in &mut out {
            *v = self.read_u32()?;
        }
        Some(out)
    }

    fn decode_tick(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Tick(TickEvent {
            tick: self.read_u64()?,
            now: self.read_millis()?,
            touch_queued: self.read_u32()?,
            key_queued: self.read_u32()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            tick: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_millis()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            tick: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_millis()?,
            work: self.read_u32()?,
        }))
    }

    fn decode_present(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Present(PresentEvent {
            tick: self.read_u64()?,
            frame: self.read_u64()?,
            layer: self.read_u8()?,
            drawn: self.read_u32()?,
            composited: self.read_u32()?,
            fallbacks: self.read_u32()?,
            damage: self.read_option_rect()?,
            copied: self.read_option_rect()?,
        }))
    }

    fn decode_alloc_failure(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::AllocFailure(AllocFailureEvent {
            tick: self.read_u64()?,
            site: AllocSite::from_u8(self.read_u8()?)?,
            size: self.read_u32()?,
        }))
    }

    fn decode_tick_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TickSummary(TickSummary {
            tick: self.read_u64()?,
            now: self.read_millis()?,
            phase_ms: self.read_array()?,
            work: self.read_array()?,
            frame: self.read_option_u64()?,
            dropped_samples: self.read_u64()?,
            heap: HeapStats {
                total: self.read_u32()?,
                free: self.read_u32()?,
                min_ever_free: self.read_u32()?,
            },
        }))
    }

    fn decode_dispatch_count(&mut self) -> Option<RecordedEvent> {
        let tick = self.read_u64()?;
        let count = self.read_u32()?;
        Some(RecordedEvent::DispatchCount { tick, count })
    }

    fn decode_damage_rects(&mut self) -> Option<RecordedEvent> {
        let tick = self.read_u64()?;
        let count = self.read_u32()?;
        let rects = (0..count)
            .map(|_| self.read_rect().map(DamageRect::from))
            .collect::<Option<Vec<_>>>()?;
        Some(RecordedEvent::DamageRects { tick, rects })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_TICK => self.decode_tick(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_PRESENT => self.decode_present(),
            TAG_ALLOC_FAILURE => self.decode_alloc_failure(),
            TAG_TICK_SUMMARY => self.decode_tick_summary(),
            TAG_DISPATCH_COUNT => self.decode_dispatch_count(),
            TAG_DAMAGE_RECTS => self.decode_damage_rects(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use kestrel_core::widget::EventKind;

    use super::*;

    fn sample_present() -> PresentEvent {
        PresentEvent {
            tick: 7,
            frame: 3,
            layer: 1,
            drawn: 4,
            composited: 1,
            fallbacks: 0,
            damage: Some(PixelRect::new(10, 20, 30, 40)),
            copied: None,
        }
    }

    fn sample_summary() -> TickSummary {
        TickSummary {
            tick: 7,
            now: Millis(1_234),
            phase_ms: [1, 0, 2, 0, 9],
            work: [1, 0, 3, 0, 4],
            frame: Some(3),
            dropped_samples: 2,
            heap: HeapStats {
                total: 4096,
                free: 1024,
                min_ever_free: 512,
            },
        }
    }

    fn decode_all(rec: &RecorderSink) -> Vec<RecordedEvent> {
        decode(rec.as_bytes()).collect()
    }

    #[test]
    fn present_keeps_optional_rects_apart() {
        let mut rec = RecorderSink::new();
        let orig = sample_present();
        rec.on_present(&orig);
        assert_eq!(decode_all(&rec), [RecordedEvent::Present(orig)]);
    }

    #[test]
    fn tick_summary_survives_recording() {
        let mut rec = RecorderSink::new();
        rec.on_tick_summary(&sample_summary());
        match &decode_all(&rec)[..] {
            [RecordedEvent::TickSummary(s)] => {
                assert_eq!(s.phase(PhaseKind::Redraw), 9);
                assert_eq!(s.work(PhaseKind::Touch), 3);
                assert_eq!(s.heap.used(), 3072);
                assert_eq!(*s, sample_summary());
            }
            other => panic!("expected one TickSummary, got {other:?}"),
        }
    }

    #[test]
    fn sequence_of_tick_events() {
        let mut rec = RecorderSink::new();
        rec.on_tick(&TickEvent {
            tick: 7,
            now: Millis(1_000),
            touch_queued: 3,
            key_queued: 1,
        });
        rec.on_phase_begin(&PhaseBeginEvent {
            tick: 7,
            phase: PhaseKind::Touch,
            timestamp: Millis(1_000),
        });
        rec.on_phase_end(&PhaseEndEvent {
            tick: 7,
            phase: PhaseKind::Touch,
            timestamp: Millis(1_002),
            work: 3,
        });
        rec.on_alloc_failure(&AllocFailureEvent {
            tick: 7,
            site: AllocSite::Text,
            size: 200,
        });
        rec.on_dispatches(
            7,
            &[
                DispatchRecord {
                    widget: 1,
                    kind: EventKind::TouchStart,
                },
                DispatchRecord {
                    widget: 1,
                    kind: EventKind::FocusIn,
                },
            ],
        );
        rec.on_damage_rects(
            7,
            &[DamageRect {
                x: 0,
                y: 0,
                width: 5,
                height: 5,
            }],
        );

        let events = decode_all(&rec);
        assert_eq!(events.len(), 6);
        assert!(matches!(events[0], RecordedEvent::Tick(t) if t.touch_queued == 3));
        assert!(matches!(events[1], RecordedEvent::PhaseBegin(_)));
        assert!(matches!(events[2], RecordedEvent::PhaseEnd(e) if e.work == 3));
        assert!(matches!(
            events[3],
            RecordedEvent::AllocFailure(AllocFailureEvent {
                site: AllocSite::Text,
                size: 200,
                ..
            })
        ));
        assert_eq!(events[4], RecordedEvent::DispatchCount { tick: 7, count: 2 });
        match &events[5] {
            RecordedEvent::DamageRects { tick, rects } => {
                assert_eq!(*tick, 7);
                assert_eq!(rects.len(), 1);
                assert_eq!(rects[0].width, 5);
            }
            other => panic!("expected DamageRects, got {other:?}"),
        }
    }

    #[test]
    fn empty_buffer_decodes_to_nothing() {
        let events: Vec<_> = decode(&[]).collect();
        assert!(events.is_empty());
    }

    #[test]
    fn truncated_record_stops_decoding() {
        let mut rec = RecorderSink::new();
        rec.on_present(&sample_present());
        let bytes = rec.into_bytes();
        assert_eq!(decode(&bytes[..bytes.len() - 1]).count(), 0);
    }
}
