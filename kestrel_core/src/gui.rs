// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-tick orchestrator.
//!
//! [`Gui`] owns every piece of runtime state: the widget tree and heap
//! ([`Ui`]), the display driver, the layer bookkeeping, the touch state
//! machine, and the raw input queues. One tick, under the runtime lock, runs:
//!
//! 1. timer accounting and callbacks,
//! 2. deferred widget removals,
//! 3. every queued touch sample, in arrival order, then one click-timeout
//!    check,
//! 4. every queued key sample,
//! 5. redraw and present.
//!
//! Because timers run before redraw, anything a timer invalidates is on
//! screen in the same frame.
//!
//! With an OS, one thread loops on [`Gui::run_once`], which blocks on the
//! mailbox (bounded while timers, click windows, or a layer confirmation
//! are pending) and then ticks. Producers only ever post [`Message`]s.

use crate::buffer::RingBuffer;
use crate::config::GuiConfig;
use crate::display::Display;
use crate::error::InitError;
use crate::heap::{Heap, Region};
use crate::input::touch::TouchRouter;
use crate::input::{KeySample, TouchSample, keyboard};
use crate::redraw::{Layers, PresentReport};
use crate::sys::{LockGuard, Message, Sys, SysMailbox};
use crate::time::Millis;
use crate::timer;
use crate::trace::{
    AllocFailureEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, PresentEvent, SummaryBuilder,
    TickEvent, Tracer,
};
#[cfg(feature = "trace-rich")]
use crate::trace::DamageRect;
use crate::ui::Ui;

/// Capacity of the wake-up mailbox.
const MAILBOX_CAPACITY: usize = 32;

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tick counter, starting at 1.
    pub tick: u64,
    /// Timer callbacks invoked.
    pub timers_fired: u32,
    /// Widgets destroyed.
    pub removed: u32,
    /// Touch samples consumed.
    pub touches: u32,
    /// Key samples consumed.
    pub keys: u32,
    /// The frame presented, if any.
    pub present: Option<PresentReport>,
}

/// Everything handed back by [`Gui::shutdown`].
#[derive(Debug)]
pub struct Parts<S, D> {
    /// The OS backend.
    pub sys: S,
    /// The display driver.
    pub display: D,
    /// Heap bytes still allocated after every widget and timer was freed.
    pub leaked: u32,
}

/// The runtime: widget tree, display, input, and the tick loop.
pub struct Gui<S: Sys, D: Display> {
    sys: S,
    display: D,
    ui: Ui,
    layers: Layers,
    router: TouchRouter,
    touch_queue: RingBuffer<TouchSample>,
    key_queue: RingBuffer<KeySample>,
    lock: Option<S::Mutex>,
    mailbox: Option<S::Mailbox>,
    ticks: u64,
    shutdown_requested: bool,
}

impl<S: Sys, D: Display> core::fmt::Debug for Gui<S, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Gui")
            .field("ui", &self.ui)
            .field("layers", &self.layers)
            .field("router", &self.router)
            .field("touch_queued", &self.touch_queue.len())
            .field("key_queued", &self.key_queue.len())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl<S: Sys, D: Display> Gui<S, D> {
    /// Initializes the display, registers the heap regions, reserves the
    /// input queues, and builds the desktop.
    ///
    /// OS primitives the backend cannot provide are simply not used: without
    /// a mutex ticks run unlocked, and without a mailbox [`run_once`] never
    /// waits.
    ///
    /// [`run_once`]: Self::run_once
    pub fn new(
        sys: S,
        mut display: D,
        regions: &[Region],
        config: GuiConfig,
    ) -> Result<Self, InitError> {
        let info = display.info();
        if info.layer_count == 0 {
            return Err(InitError::NoDisplayLayers);
        }
        if !display.init() {
            return Err(InitError::DisplayInit);
        }

        let mut heap = Heap::new();
        heap.register(regions)?;
        let screen = kurbo::Size::new(f64::from(info.width), f64::from(info.height));
        let mut ui = Ui::new(config, screen, heap)?;

        let Some(mut touch_queue) = RingBuffer::new(ui.heap_mut(), config.touch_queue) else {
            ui.teardown();
            return Err(InitError::OutOfMemory);
        };
        let Some(key_queue) = RingBuffer::new(ui.heap_mut(), config.key_queue) else {
            touch_queue.release(ui.heap_mut());
            ui.teardown();
            return Err(InitError::OutOfMemory);
        };

        let now = sys.now();
        ui.now = now;
        ui.timers.last_tick = now;

        Ok(Self {
            lock: sys.mutex(),
            mailbox: sys.mailbox(MAILBOX_CAPACITY),
            sys,
            display,
            ui,
            layers: Layers::new(info.layer_count),
            router: TouchRouter::new(config.click),
            touch_queue,
            key_queue,
            ticks: 0,
            shutdown_requested: false,
        })
    }

    /// The widget runtime.
    #[must_use]
    pub fn ui(&self) -> &Ui {
        &self.ui
    }

    /// The widget runtime, for building and mutating the tree.
    pub fn ui_mut(&mut self) -> &mut Ui {
        &mut self.ui
    }

    /// The display driver.
    #[must_use]
    pub fn display(&self) -> &D {
        &self.display
    }

    /// The display driver, mutably.
    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    /// The OS backend.
    #[must_use]
    pub fn sys(&self) -> &S {
        &self.sys
    }

    /// The wake-up mailbox, if the backend provided one. Backends whose
    /// mailbox is a shared handle clone it for producer threads.
    #[must_use]
    pub fn mailbox(&self) -> Option<&S::Mailbox> {
        self.mailbox.as_ref()
    }

    /// Layer roles and the frame counter.
    #[must_use]
    pub fn layers(&self) -> &Layers {
        &self.layers
    }

    /// Ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Whether a [`Message::Shutdown`] has been received.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// Samples rejected because a queue was full.
    #[must_use]
    pub fn dropped_samples(&self) -> u64 {
        self.touch_queue.dropped_count() + self.key_queue.dropped_count()
    }

    /// Queues a touch sample. Returns `false` if the queue was full.
    pub fn push_touch(&mut self, sample: TouchSample) -> bool {
        self.touch_queue.push(&mut self.ui.heap, &sample)
    }

    /// Queues a key sample. Returns `false` if the queue was full.
    pub fn push_key(&mut self, sample: KeySample) -> bool {
        self.key_queue.push(&mut self.ui.heap, &sample)
    }

    /// Posts a message to the mailbox, or applies it directly when the
    /// backend has no mailbox. Returns `false` if it was dropped.
    pub fn post(&mut self, msg: Message) -> bool {
        if let Some(mailbox) = &self.mailbox {
            return mailbox.put(msg);
        }
        self.intake(msg)
    }

    /// Whether a tick soon would have something to do without new input.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.ui.timers().has_pending_work()
            || !self.router.is_idle()
            || self.layers.is_pending()
            || self.ui.redraw_requested()
            || self.ui.removals_pending
            || !self.touch_queue.is_empty()
            || !self.key_queue.is_empty()
    }

    /// Waits for work, drains the mailbox, and runs one tick.
    ///
    /// The wait is bounded by [`GuiConfig::timer_poll`] while
    /// [`has_pending_work`](Self::has_pending_work) holds, and by
    /// [`GuiConfig::idle_wait`] otherwise. Returns `false` once shutdown
    /// was requested; no tick runs then.
    pub fn run_once(&mut self) -> bool {
        let wait = if self.has_pending_work() {
            Some(self.ui.config().timer_poll)
        } else {
            self.ui.config().idle_wait
        };
        let mut next = self.mailbox.as_ref().and_then(|m| m.get(wait));
        while let Some(msg) = next {
            self.intake(msg);
            next = self.mailbox.as_ref().and_then(|m| m.get(Some(Millis::ZERO)));
        }
        if self.shutdown_requested {
            return false;
        }
        self.process();
        true
    }

    fn intake(&mut self, msg: Message) -> bool {
        match msg {
            Message::Touch(s) => self.touch_queue.push(&mut self.ui.heap, &s),
            Message::Key(k) => self.key_queue.push(&mut self.ui.heap, &k),
            Message::Wake => true,
            Message::Shutdown => {
                self.shutdown_requested = true;
                true
            }
        }
    }

    /// Runs one tick without tracing.
    pub fn process(&mut self) -> TickReport {
        self.process_traced(&mut Tracer::none())
    }

    /// Runs one tick, reporting phases, presents, and allocation failures to
    /// `tracer`.
    pub fn process_traced(&mut self, tracer: &mut Tracer<'_>) -> TickReport {
        let _guard = self.lock.as_ref().map(LockGuard::new);

        self.ticks += 1;
        let tick = self.ticks;
        let now = self.sys.now();
        self.ui.now = now;

        let event = TickEvent {
            tick,
            now,
            touch_queued: u32::try_from(self.touch_queue.len()).unwrap_or(u32::MAX),
            key_queued: u32::try_from(self.key_queue.len()).unwrap_or(u32::MAX),
        };
        tracer.tick(&event);
        let mut phases = Phases {
            tick,
            summary: tracer.is_enabled().then(|| SummaryBuilder::new(&event)),
        };
        let mut report = TickReport {
            tick,
            ..TickReport::default()
        };

        phases.begin(tracer, PhaseKind::Timers, now);
        report.timers_fired = timer::process(&mut self.ui, now);
        phases.end(tracer, PhaseKind::Timers, self.sys.now(), report.timers_fired);

        phases.begin(tracer, PhaseKind::Removals, self.sys.now());
        report.removed = self.ui.execute_removals();
        phases.end(tracer, PhaseKind::Removals, self.sys.now(), report.removed);

        phases.begin(tracer, PhaseKind::Touch, self.sys.now());
        while let Some(sample) = self.touch_queue.pop(&self.ui.heap) {
            self.router.process(&mut self.ui, &sample);
            report.touches += 1;
        }
        self.router.tick(&mut self.ui, now);
        phases.end(tracer, PhaseKind::Touch, self.sys.now(), report.touches);

        phases.begin(tracer, PhaseKind::Keyboard, self.sys.now());
        while let Some(key) = self.key_queue.pop(&self.ui.heap) {
            keyboard::route_key(&mut self.ui, key);
            report.keys += 1;
        }
        phases.end(tracer, PhaseKind::Keyboard, self.sys.now(), report.keys);

        phases.begin(tracer, PhaseKind::Redraw, self.sys.now());
        report.present = self.layers.present(&mut self.ui, &mut self.display);
        self.layers.poll_confirmation(&mut self.display);
        let drawn = report.present.map_or(0, |p| p.redraw.drawn);
        phases.end(tracer, PhaseKind::Redraw, self.sys.now(), drawn);

        if let Some(present) = &report.present {
            tracer.present(&PresentEvent::new(tick, present));
            if let Some(summary) = &mut phases.summary {
                summary.set_frame(present.frame);
            }
        }

        #[cfg(feature = "trace-rich")]
        {
            let dispatches = core::mem::take(&mut self.ui.dispatches);
            tracer.dispatches(tick, &dispatches);
            if let Some(damage) = report.present.and_then(|p| p.redraw.damage) {
                tracer.damage_rects(tick, &[DamageRect::from(damage)]);
            }
        }

        for failure in self.ui.take_alloc_failures() {
            tracer.alloc_failure(&AllocFailureEvent::new(tick, &failure));
        }

        if let Some(mut summary) = phases.summary {
            summary.set_dropped_samples(self.dropped_samples());
            tracer.tick_summary(&summary.finish(self.ui.heap_stats()));
        }
        report
    }

    /// Destroys every widget and timer, releases the queues, and hands back
    /// the driver and backend.
    pub fn shutdown(mut self) -> Parts<S, D> {
        {
            let _guard = self.lock.as_ref().map(LockGuard::new);
            self.ui.teardown();
            self.touch_queue.release(&mut self.ui.heap);
            self.key_queue.release(&mut self.ui.heap);
        }
        Parts {
            leaked: self.ui.heap().used_bytes(),
            sys: self.sys,
            display: self.display,
        }
    }
}

/// Phase bookkeeping for one tick.
struct Phases {
    tick: u64,
    summary: Option<SummaryBuilder>,
}

impl Phases {
    fn begin(&mut self, tracer: &mut Tracer<'_>, phase: PhaseKind, timestamp: Millis) {
        tracer.phase_begin(&PhaseBeginEvent {
            tick: self.tick,
            phase,
            timestamp,
        });
        if let Some(s) = &mut self.summary {
            s.phase_begin(phase, timestamp);
        }
    }

    fn end(&mut self, tracer: &mut Tracer<'_>, phase: PhaseKind, timestamp: Millis, work: u32) {
        tracer.phase_end(&PhaseEndEvent {
            tick: self.tick,
            phase,
            timestamp,
            work,
        });
        if let Some(s) = &mut self.summary {
            s.phase_end(phase, timestamp, work);
        }
    }
}
