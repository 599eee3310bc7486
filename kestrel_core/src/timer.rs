// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cooperative software timers.
//!
//! Timers live in one list, in creation order, and are advanced once per
//! tick by [`process`]. A timer that reaches zero is only flagged
//! [`PENDING`](TimerFlags::PENDING); its callback runs at the start of the
//! *next* [`process`] call. That one-tick lag means callbacks never run
//! while the countdown loop is iterating, so a callback may freely create,
//! stop, or remove timers (including itself).
//!
//! Each timer reserves a small record in the runtime heap, so timer creation
//! fails cleanly when the heap is exhausted.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use bitflags::bitflags;

use crate::heap::HeapPtr;
use crate::time::Millis;
use crate::ui::Ui;
use crate::widget::WidgetId;

bitflags! {
    /// Timer state.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct TimerFlags: u8 {
        /// The countdown is running.
        const ACTIVE = 1 << 0;
        /// The timer restarts itself after firing.
        const PERIODIC = 1 << 1;
        /// The countdown reached zero; the callback runs on the next tick.
        const PENDING = 1 << 2;
    }
}

/// A timer callback.
pub type TimerCallback = Box<dyn FnMut(&mut Ui, TimerId)>;

/// A handle to a timer.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    idx: u32,
    generation: u32,
}

impl fmt::Debug for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimerId({}@gen{})", self.idx, self.generation)
    }
}

struct Entry {
    period: Millis,
    counter: Millis,
    flags: TimerFlags,
    callback: Option<TimerCallback>,
    owner: Option<WidgetId>,
    block: HeapPtr,
}

/// The timer list.
pub struct Timers {
    slots: Vec<Option<Entry>>,
    generation: Vec<u32>,
    free_list: Vec<u32>,
    /// Live slot indices in creation order.
    order: Vec<u32>,
    pub(crate) last_tick: Millis,
}

impl fmt::Debug for Timers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timers")
            .field("len", &self.order.len())
            .field("active", &self.active_count())
            .field("last_tick", &self.last_tick)
            .finish_non_exhaustive()
    }
}

impl Timers {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            order: Vec::new(),
            last_tick: Millis::ZERO,
        }
    }

    /// Number of timers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if there are no timers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns whether `id` refers to a live timer.
    #[must_use]
    pub fn is_alive(&self, id: TimerId) -> bool {
        self.generation.get(id.idx as usize) == Some(&id.generation)
            && self.slots[id.idx as usize].is_some()
    }

    /// The timer's flags.
    #[must_use]
    pub fn flags(&self, id: TimerId) -> TimerFlags {
        self.entry(id).flags
    }

    /// Time left before the timer fires.
    #[must_use]
    pub fn remaining(&self, id: TimerId) -> Millis {
        self.entry(id).counter
    }

    /// Number of running timers.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots
            .iter()
            .flatten()
            .filter(|e| e.flags.contains(TimerFlags::ACTIVE))
            .count()
    }

    /// Returns `true` if any timer is running or has a callback waiting.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.slots
            .iter()
            .flatten()
            .any(|e| e.flags.intersects(TimerFlags::ACTIVE | TimerFlags::PENDING))
    }

    pub(crate) fn ids(&self) -> Vec<TimerId> {
        self.order.iter().map(|&i| self.id_at(i)).collect()
    }

    pub(crate) fn owned_by(&self, owner: WidgetId) -> Vec<TimerId> {
        self.order
            .iter()
            .filter(|&&i| {
                self.slots[i as usize]
                    .as_ref()
                    .is_some_and(|e| e.owner == Some(owner))
            })
            .map(|&i| self.id_at(i))
            .collect()
    }

    fn id_at(&self, idx: u32) -> TimerId {
        TimerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    fn entry(&self, id: TimerId) -> &Entry {
        match self.slots.get(id.idx as usize).and_then(Option::as_ref) {
            Some(e) if self.generation[id.idx as usize] == id.generation => e,
            _ => panic!("stale TimerId: {id:?}"),
        }
    }

    fn entry_mut(&mut self, id: TimerId) -> &mut Entry {
        let live = self.is_alive(id);
        assert!(live, "stale TimerId: {id:?}");
        match self.slots[id.idx as usize].as_mut() {
            Some(e) => e,
            None => unreachable!("checked live above"),
        }
    }

    pub(crate) fn insert(
        &mut self,
        period: Millis,
        callback: TimerCallback,
        owner: Option<WidgetId>,
        block: HeapPtr,
    ) -> TimerId {
        let entry = Entry {
            period,
            counter: period,
            flags: TimerFlags::empty(),
            callback: Some(callback),
            owner,
            block,
        };
        let idx = if let Some(idx) = self.free_list.pop() {
            self.slots[idx as usize] = Some(entry);
            idx
        } else {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "timer counts are far below u32::MAX"
            )]
            let idx = self.slots.len() as u32;
            self.slots.push(Some(entry));
            self.generation.push(0);
            idx
        };
        self.order.push(idx);
        self.id_at(idx)
    }

    /// Removes a timer and returns its heap record. Stale ids are ignored.
    pub(crate) fn remove(&mut self, id: TimerId) -> Option<HeapPtr> {
        if !self.is_alive(id) {
            return None;
        }
        let entry = self.slots[id.idx as usize].take()?;
        self.generation[id.idx as usize] = self.generation[id.idx as usize].wrapping_add(1);
        self.free_list.push(id.idx);
        self.order.retain(|&i| i != id.idx);
        Some(entry.block)
    }

    pub(crate) fn start(&mut self, id: TimerId, periodic: bool) {
        let e = self.entry_mut(id);
        e.counter = e.period;
        e.flags.set(TimerFlags::PERIODIC, periodic);
        e.flags.insert(TimerFlags::ACTIVE);
    }

    pub(crate) fn stop(&mut self, id: TimerId) {
        let e = self.entry_mut(id);
        e.counter = e.period;
        e.flags.remove(TimerFlags::ACTIVE | TimerFlags::PENDING);
    }

    pub(crate) fn reset(&mut self, id: TimerId) {
        let e = self.entry_mut(id);
        e.counter = e.period;
    }

    pub(crate) fn set_period(&mut self, id: TimerId, period: Millis) {
        self.entry_mut(id).period = period;
    }
}

/// Advances every timer to `now` and runs the callbacks flagged on the
/// previous call. Returns the number of callbacks run.
///
/// Several calls within the same millisecond are coalesced: only the first
/// does anything.
pub fn process(ui: &mut Ui, now: Millis) -> u32 {
    let diff = now.elapsed_since(ui.timers.last_tick);
    if diff == Millis::ZERO {
        return 0;
    }
    ui.timers.last_tick = now;

    let mut fired = 0;
    for idx in ui.timers.order.clone() {
        let id = ui.timers.id_at(idx);
        if !ui.timers.is_alive(id) {
            continue;
        }

        let pending = ui.timers.entry(id).flags.contains(TimerFlags::PENDING);
        if pending {
            let e = ui.timers.entry_mut(id);
            e.flags.remove(TimerFlags::PENDING);
            if !e.flags.contains(TimerFlags::PERIODIC) {
                e.flags.remove(TimerFlags::ACTIVE);
            }
            if let Some(mut cb) = e.callback.take() {
                cb(ui, id);
                fired += 1;
                if ui.timers.is_alive(id) {
                    let e = ui.timers.entry_mut(id);
                    if e.callback.is_none() {
                        e.callback = Some(cb);
                    }
                }
            }
            if !ui.timers.is_alive(id) {
                continue;
            }
        }

        let e = ui.timers.entry_mut(id);
        if e.flags.contains(TimerFlags::ACTIVE) {
            e.counter = e.counter.saturating_sub(diff);
            if e.counter == Millis::ZERO {
                e.counter = e.period;
                e.flags.insert(TimerFlags::PENDING);
            }
        }
    }
    fired
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use core::cell::Cell;

    use super::*;
    use crate::ui::test_support;

    fn counter() -> Rc<Cell<u32>> {
        Rc::new(Cell::new(0))
    }

    fn counting(hits: &Rc<Cell<u32>>) -> impl FnMut(&mut Ui, TimerId) + 'static {
        let hits = Rc::clone(hits);
        move |_, _| hits.set(hits.get() + 1)
    }

    #[test]
    fn periodic_timer_fires_once_per_period() {
        let mut ui = test_support::ui(10.0, 10.0);
        let hits = counter();
        let t = ui.create_timer(Millis(10), counting(&hits)).expect("timer");
        ui.start_periodic_timer(t);

        let mut now = 0;
        for _ in 0..50 {
            now += 2;
            process(&mut ui, Millis(now));
        }
        // 100 ms elapsed: ten periods elapsed, the tenth callback runs on
        // the tick after its countdown hit zero.
        assert_eq!(hits.get(), 9);
        process(&mut ui, Millis(now + 1));
        assert_eq!(hits.get(), 10, "flushed on the following tick");
        assert!(ui.timers().flags(t).contains(TimerFlags::ACTIVE));
    }

    #[test]
    fn one_shot_fires_once_then_stops() {
        let mut ui = test_support::ui(10.0, 10.0);
        let hits = counter();
        let t = ui.create_timer(Millis(5), counting(&hits)).expect("timer");
        ui.start_timer(t);
        for now in 1..=40 {
            process(&mut ui, Millis(now));
        }
        assert_eq!(hits.get(), 1);
        assert!(!ui.timers().flags(t).contains(TimerFlags::ACTIVE));
        assert_eq!(ui.active_timer_count(), 0);
    }

    #[test]
    fn same_millisecond_ticks_are_coalesced() {
        let mut ui = test_support::ui(10.0, 10.0);
        let t = ui.create_timer(Millis(5), |_, _| {}).expect("timer");
        ui.start_timer(t);
        process(&mut ui, Millis(2));
        process(&mut ui, Millis(2));
        assert_eq!(ui.timers().remaining(t), Millis(3), "second call was a no-op");
    }

    #[test]
    fn counter_saturates_on_large_jumps() {
        let mut ui = test_support::ui(10.0, 10.0);
        let hits = counter();
        let t = ui.create_timer(Millis(5), counting(&hits)).expect("timer");
        ui.start_periodic_timer(t);
        process(&mut ui, Millis(1_000));
        process(&mut ui, Millis(1_001));
        assert_eq!(hits.get(), 1, "a long stall fires once, not 200 times");
        assert_eq!(ui.timers().remaining(t), Millis(4));
    }

    #[test]
    fn callback_may_remove_its_own_timer() {
        let mut ui = test_support::ui(10.0, 10.0);
        let hits = counter();
        let h = Rc::clone(&hits);
        let t = ui
            .create_timer(Millis(3), move |ui, me| {
                h.set(h.get() + 1);
                ui.remove_timer(me);
            })
            .expect("timer");
        let other_hits = counter();
        let other = ui.create_timer(Millis(3), counting(&other_hits)).expect("timer");
        ui.start_periodic_timer(t);
        ui.start_periodic_timer(other);
        let baseline = ui.heap().used_bytes();

        for now in 1..=10 {
            process(&mut ui, Millis(now));
        }
        assert_eq!(hits.get(), 1);
        assert!(!ui.timers().is_alive(t));
        assert!(other_hits.get() >= 2, "the list kept iterating");
        assert!(ui.heap().used_bytes() < baseline, "record freed");
    }

    #[test]
    fn callback_may_create_timers() {
        let mut ui = test_support::ui(10.0, 10.0);
        let spawned = counter();
        let s = Rc::clone(&spawned);
        let t = ui
            .create_timer(Millis(2), move |ui, _| {
                let s = Rc::clone(&s);
                if let Some(child) = ui.create_timer(Millis(2), move |_, _| s.set(s.get() + 1)) {
                    ui.start_timer(child);
                }
            })
            .expect("timer");
        ui.start_timer(t);
        for now in 1..=10 {
            process(&mut ui, Millis(now));
        }
        assert_eq!(ui.timers().len(), 2);
        assert_eq!(spawned.get(), 1);
    }

    #[test]
    fn stop_cancels_a_pending_callback() {
        let mut ui = test_support::ui(10.0, 10.0);
        let hits = counter();
        let t = ui.create_timer(Millis(2), counting(&hits)).expect("timer");
        ui.start_timer(t);
        process(&mut ui, Millis(2));
        assert!(ui.timers().flags(t).contains(TimerFlags::PENDING));
        ui.stop_timer(t);
        process(&mut ui, Millis(3));
        assert_eq!(hits.get(), 0);
    }

    #[test]
    fn reset_rewinds_without_changing_state() {
        let mut ui = test_support::ui(10.0, 10.0);
        let t = ui.create_timer(Millis(10), |_, _| {}).expect("timer");
        ui.start_timer(t);
        process(&mut ui, Millis(4));
        ui.reset_timer(t);
        assert_eq!(ui.timers().remaining(t), Millis(10));
        assert!(ui.timers().flags(t).contains(TimerFlags::ACTIVE));
    }

    #[test]
    #[should_panic(expected = "stale TimerId")]
    fn stale_timer_handle_panics() {
        let mut ui = test_support::ui(10.0, 10.0);
        let t = ui.create_timer(Millis(10), |_, _| {}).expect("timer");
        ui.remove_timer(t);
        ui.start_timer(t);
    }
}
