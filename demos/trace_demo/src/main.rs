// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated touch session that exercises the tracing and diagnostics
//! pipeline.
//!
//! Builds a small widget tree on an in-memory display, replays a scripted
//! second of touches, keys, and timers through the real tick loop, and
//! records every tick to both a
//! [`PrettyPrintSink`](kestrel_debug::pretty::PrettyPrintSink) and a
//! [`RecorderSink`](kestrel_debug::recorder::RecorderSink). The recording is
//! then exported as a Chrome trace.
//!
//! Run with: `cargo run -p trace_demo [-- <output.json>]`

use std::cell::Cell;
use std::fs::File;
use std::io::BufWriter;
use std::rc::Rc;

use kurbo::{Point, Rect};

use kestrel_core::config::GuiConfig;
use kestrel_core::display::{Color, MemoryDisplay};
use kestrel_core::gui::Gui;
use kestrel_core::heap::Region;
use kestrel_core::input::{KeySample, TouchSample, keyboard};
use kestrel_core::sys::NoSys;
use kestrel_core::time::Millis;
use kestrel_core::trace::{
    AllocFailureEvent, DamageRect, DispatchRecord, PhaseBeginEvent, PhaseEndEvent, PresentEvent,
    TickEvent, TickSummary, TraceSink, Tracer,
};
use kestrel_core::widget::{
    ClassFlags, Event, Reply, WidgetClass, WidgetFlags, draw_nothing, fill_background,
    ignore_events,
};

use kestrel_debug::pretty::PrettyPrintSink;
use kestrel_debug::recorder::RecorderSink;

const SCREEN_W: u32 = 320;
const SCREEN_H: u32 = 240;
const TICK_MS: u32 = 10;
const TICK_COUNT: u32 = 100;
const HEAP: [Region; 2] = [
    Region::new(0x2000_0000, 16 * 1024),
    Region::new(0x2400_0000, 16 * 1024),
];

static PANEL: WidgetClass = WidgetClass {
    name: "panel",
    instance_size: 0,
    flags: ClassFlags::ALLOW_CHILDREN,
    colors: &[Color(0xFF30_3040)],
    event: ignore_events,
    draw: fill_background,
};

static BUTTON: WidgetClass = WidgetClass {
    name: "button",
    instance_size: 8,
    flags: ClassFlags::empty(),
    colors: &[Color(0xFF20_60C0)],
    event: ignore_events,
    draw: fill_background,
};

static FIELD: WidgetClass = WidgetClass {
    name: "field",
    instance_size: 0,
    flags: ClassFlags::empty(),
    colors: &[Color::WHITE],
    event: ignore_events,
    draw: fill_background,
};

static SPACER: WidgetClass = WidgetClass {
    name: "spacer",
    instance_size: 0,
    flags: ClassFlags::empty(),
    colors: &[],
    event: ignore_events,
    draw: draw_nothing,
};

/// Forwards every event to a pretty printer and a recorder.
struct FanOut {
    pretty: PrettyPrintSink,
    recorder: RecorderSink,
}

impl TraceSink for FanOut {
    fn on_tick(&mut self, e: &TickEvent) {
        self.pretty.on_tick(e);
        self.recorder.on_tick(e);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.pretty.on_phase_begin(e);
        self.recorder.on_phase_begin(e);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.pretty.on_phase_end(e);
        self.recorder.on_phase_end(e);
    }

    fn on_present(&mut self, e: &PresentEvent) {
        self.pretty.on_present(e);
        self.recorder.on_present(e);
    }

    fn on_alloc_failure(&mut self, e: &AllocFailureEvent) {
        self.pretty.on_alloc_failure(e);
        self.recorder.on_alloc_failure(e);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.pretty.on_tick_summary(s);
        self.recorder.on_tick_summary(s);
    }

    fn on_dispatches(&mut self, tick: u64, records: &[DispatchRecord]) {
        self.pretty.on_dispatches(tick, records);
        self.recorder.on_dispatches(tick, records);
    }

    fn on_damage_rects(&mut self, tick: u64, rects: &[DamageRect]) {
        self.pretty.on_damage_rects(tick, rects);
        self.recorder.on_damage_rects(tick, rects);
    }
}

/// Scripted input, keyed by the tick it is queued before.
fn script(tick: u32, gui: &mut Gui<NoSys, MemoryDisplay>) {
    let now = Millis(tick * TICK_MS);
    let button = Point::new(40.0, 40.0);
    let field = Point::new(200.0, 40.0);
    match tick {
        5 | 50 => {
            gui.push_touch(TouchSample::press(button, now));
        }
        8 => {
            gui.push_touch(TouchSample::release(button, now));
        }
        20 => {
            gui.push_touch(TouchSample::press(field, now));
        }
        22 => {
            gui.push_touch(TouchSample::release(field, now));
        }
        30..=36 => {
            let key = "kestrel".chars().nth((tick - 30) as usize).unwrap_or(' ');
            gui.push_key(KeySample { key, time: now });
        }
        37 => {
            gui.push_key(KeySample {
                key: keyboard::BACKSPACE,
                time: now,
            });
        }
        52 => {
            let second = Point::new(60.0, 60.0);
            gui.push_touch(TouchSample::pinch(button, second, now));
        }
        56 => {
            gui.push_touch(TouchSample::release(button, now));
        }
        _ => {}
    }
}

fn main() {
    let out_path = std::env::args().nth(1).unwrap_or_else(|| "trace.json".to_owned());

    let sys = NoSys::new();
    let clock = sys.clone();
    let display = MemoryDisplay::new(SCREEN_W, SCREEN_H, 2);
    let config = GuiConfig::simulator().with_alpha_compositing(true);
    let mut gui = Gui::new(sys, display, &HEAP, config).expect("runtime setup");

    // -- widget tree -------------------------------------------------------
    let clicks = Rc::new(Cell::new(0_u32));
    let ui = gui.ui_mut();
    let none = WidgetFlags::empty();
    let panel = ui
        .create(&PANEL, Rect::new(10.0, 10.0, 310.0, 230.0), None, none)
        .expect("panel");
    let button = ui
        .create(&BUTTON, Rect::new(10.0, 10.0, 90.0, 60.0), Some(panel), none)
        .expect("button");
    let field = ui
        .create(&FIELD, Rect::new(120.0, 10.0, 290.0, 60.0), Some(panel), none)
        .expect("field");
    let blinker = ui
        .create(&BUTTON, Rect::new(10.0, 100.0, 40.0, 130.0), Some(panel), none)
        .expect("blinker");
    let overlay = ui
        .create(&FIELD, Rect::new(60.0, 80.0, 200.0, 180.0), Some(panel), none)
        .expect("overlay");
    ui.create(&SPACER, Rect::new(0.0, 200.0, 300.0, 220.0), Some(panel), none)
        .expect("spacer");
    ui.set_alpha(overlay, 128);

    let seen = Rc::clone(&clicks);
    ui.set_handler(button, move |ui, id, event| match event {
        Event::TouchStart(_) => Reply::Handled,
        Event::Click(_) => {
            seen.set(seen.get() + 1);
            let color = if seen.get() % 2 == 1 {
                Color(0xFFC0_4020)
            } else {
                Color(0xFF20_60C0)
            };
            ui.set_color(id, 0, Some(color));
            Reply::Handled
        }
        _ => Reply::Ignored,
    });

    ui.alloc_text(field, 32);
    ui.set_handler(field, |ui, id, event| match event {
        Event::TouchStart(_) => Reply::Handled,
        Event::KeyPress(k) => ui.process_text_key(id, k),
        _ => Reply::Ignored,
    });

    let on = Rc::new(Cell::new(false));
    let blink = ui
        .create_widget_timer(blinker, Millis(100), move |ui, _| {
            on.set(!on.get());
            let color = on.get().then_some(Color(0xFFF0_D020));
            ui.set_color(blinker, 0, color);
        })
        .expect("blink timer");
    ui.start_periodic_timer(blink);

    let fade = ui
        .create_timer(Millis(600), move |ui, _| {
            ui.remove(overlay);
        })
        .expect("fade timer");
    ui.start_timer(fade);

    // A buffer the heap cannot hold; shows up as an allocation failure.
    let _ = ui.alloc_text(blinker, 64 * 1024);

    // -- simulated session -------------------------------------------------
    let mut sink = FanOut {
        pretty: PrettyPrintSink::new(Box::new(std::io::stdout())),
        recorder: RecorderSink::new(),
    };

    for tick in 0..TICK_COUNT {
        script(tick, &mut gui);
        let mut tracer = Tracer::new(&mut sink);
        gui.process_traced(&mut tracer);
        clock.advance(Millis(TICK_MS));
    }

    println!(
        "clicks={} text={:?} frames={} dropped={}",
        clicks.get(),
        gui.ui().text(field).unwrap_or(""),
        gui.layers().frame(),
        gui.dropped_samples(),
    );

    let parts = gui.shutdown();
    println!("leaked={} bytes", parts.leaked);

    // -- export Chrome trace -----------------------------------------------
    let file = File::create(&out_path).expect("failed to create trace file");
    let mut writer = BufWriter::new(file);
    kestrel_debug::chrome::export(sink.recorder.as_bytes(), &mut writer)
        .expect("failed to write Chrome trace");

    println!("Wrote {out_path} ({TICK_COUNT} ticks)");
}
