// Copyright 2026 the Kestrel Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Running the tick loop on its own thread.
//!
//! Widget handlers are not `Send`, so the [`Gui`] is built on the tick
//! thread itself. The caller hands over the display driver and a build
//! closure, and keeps a [`GuiHandle`] that posts [`Message`]s.

use std::fmt;
use std::sync::mpsc;
use std::thread;

use kestrel_core::config::GuiConfig;
use kestrel_core::display::Display;
use kestrel_core::error::InitError;
use kestrel_core::gui::Gui;
use kestrel_core::heap::Region;
use kestrel_core::input::{KeySample, TouchSample};
use kestrel_core::sys::{Message, Sys, SysMailbox};
use kestrel_core::ui::Ui;

use crate::StdSys;
use crate::sync::StdMailbox;

/// Name of the tick thread.
pub const TICK_THREAD_NAME: &str = "kestrel-tick";

/// Why [`launch`] failed.
#[derive(Debug)]
pub enum LaunchError {
    /// [`Gui::new`] rejected the setup.
    Init(InitError),
    /// The tick thread could not be started.
    Spawn,
    /// The tick thread exited before reporting its setup result.
    Exited,
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(e) => write!(f, "runtime setup failed: {e}"),
            Self::Spawn => f.write_str("could not start the tick thread"),
            Self::Exited => f.write_str("tick thread exited during setup"),
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Init(e) => Some(e),
            _ => None,
        }
    }
}

impl From<InitError> for LaunchError {
    fn from(e: InitError) -> Self {
        Self::Init(e)
    }
}

/// What the tick thread hands back when it stops.
#[derive(Debug)]
pub struct Finished<D> {
    /// The display driver.
    pub display: D,
    /// Ticks run.
    pub ticks: u64,
    /// Heap bytes still allocated after teardown. Zero unless something
    /// leaked.
    pub leaked: u32,
}

/// Starts the runtime on a new thread.
///
/// `build` runs on the tick thread after setup, before the first tick, and
/// creates the application's widgets and timers.
pub fn launch<D, B>(
    sys: StdSys,
    display: D,
    regions: Vec<Region>,
    config: GuiConfig,
    build: B,
) -> Result<GuiHandle<D>, LaunchError>
where
    D: Display + Send + 'static,
    B: FnOnce(&mut Ui) + Send + 'static,
{
    let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<StdMailbox, InitError>>(1);
    let (done_tx, done_rx) = mpsc::sync_channel::<Finished<D>>(1);

    let tick_sys = sys.clone();
    let started = sys.spawn(
        TICK_THREAD_NAME,
        Box::new(move || {
            let mut gui = match Gui::new(tick_sys, display, &regions, config) {
                Ok(gui) => gui,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };
            build(gui.ui_mut());
            let Some(mailbox) = gui.mailbox().cloned() else {
                return;
            };
            if ready_tx.send(Ok(mailbox)).is_err() {
                return;
            }
            while gui.run_once() {}
            let ticks = gui.ticks();
            let parts = gui.shutdown();
            let _ = done_tx.send(Finished {
                display: parts.display,
                ticks,
                leaked: parts.leaked,
            });
        }),
    );
    if !started {
        return Err(LaunchError::Spawn);
    }
    let mailbox = ready_rx.recv().map_err(|_| LaunchError::Exited)??;
    Ok(GuiHandle {
        sender: InputSender { mailbox },
        done: done_rx,
    })
}

/// A cloneable, `Send` handle for posting input from any thread.
#[derive(Clone, Debug)]
pub struct InputSender {
    mailbox: StdMailbox,
}

impl InputSender {
    /// Posts a touch sample. Returns `false` if the mailbox was full.
    pub fn touch(&self, sample: TouchSample) -> bool {
        self.mailbox.put(Message::Touch(sample))
    }

    /// Posts a key. Returns `false` if the mailbox was full.
    pub fn key(&self, sample: KeySample) -> bool {
        self.mailbox.put(Message::Key(sample))
    }

    /// Asks for a tick without input.
    pub fn wake(&self) -> bool {
        self.mailbox.put(Message::Wake)
    }
}

/// Owner's handle to a launched runtime.
pub struct GuiHandle<D> {
    sender: InputSender,
    done: mpsc::Receiver<Finished<D>>,
}

impl<D> fmt::Debug for GuiHandle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuiHandle")
            .field("queued", &self.sender.mailbox.len())
            .finish_non_exhaustive()
    }
}

impl<D> GuiHandle<D> {
    /// A producer handle for other threads.
    #[must_use]
    pub fn sender(&self) -> InputSender {
        self.sender.clone()
    }

    /// Posts a touch sample. Returns `false` if the mailbox was full.
    pub fn touch(&self, sample: TouchSample) -> bool {
        self.sender.touch(sample)
    }

    /// Posts a key. Returns `false` if the mailbox was full.
    pub fn key(&self, sample: KeySample) -> bool {
        self.sender.key(sample)
    }

    /// Asks for a tick without input.
    pub fn wake(&self) -> bool {
        self.sender.wake()
    }

    /// Stops the tick loop after the messages already posted, tears the
    /// runtime down, and returns the driver. `None` if the tick thread
    /// panicked.
    pub fn shutdown(self) -> Option<Finished<D>> {
        while !self.sender.mailbox.put(Message::Shutdown) {
            thread::yield_now();
        }
        self.done.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use kestrel_core::display::{Color, MemoryDisplay};
    use kestrel_core::time::Millis;
    use kestrel_core::widget::{
        ClassFlags, Event, Reply, WidgetClass, WidgetFlags, fill_background, ignore_events,
    };
    use kurbo::{Point, Rect};

    use super::*;

    static BUTTON: WidgetClass = WidgetClass {
        name: "button",
        instance_size: 0,
        flags: ClassFlags::empty(),
        colors: &[Color(0xFF20_40C0)],
        event: ignore_events,
        draw: fill_background,
    };

    const REGIONS: [Region; 1] = [Region::new(0x1000_0000, 64 * 1024)];

    fn config() -> GuiConfig {
        GuiConfig::simulator().with_waits(Millis(5), Some(Millis(20)))
    }

    #[test]
    fn setup_errors_come_back_to_the_caller() {
        let err = launch(
            StdSys::new(),
            MemoryDisplay::new(32, 32, 0),
            REGIONS.to_vec(),
            config(),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, LaunchError::Init(InitError::NoDisplayLayers)));
    }

    #[test]
    fn clicks_posted_from_another_thread_reach_the_widget() {
        let clicks = Arc::new(AtomicU32::new(0));
        let seen = Arc::clone(&clicks);
        let handle = launch(
            StdSys::new(),
            MemoryDisplay::new(64, 64, 2),
            REGIONS.to_vec(),
            config(),
            move |ui| {
                let button = ui
                    .create(
                        &BUTTON,
                        Rect::new(0.0, 0.0, 32.0, 32.0),
                        None,
                        WidgetFlags::empty(),
                    )
                    .unwrap();
                ui.set_handler(button, move |_, _, event| match event {
                    Event::TouchStart(_) => Reply::Handled,
                    Event::Click(_) => {
                        seen.fetch_add(1, Ordering::SeqCst);
                        Reply::Handled
                    }
                    _ => Reply::Ignored,
                });
            },
        )
        .unwrap();

        let at = Point::new(8.0, 8.0);
        let producer = handle.sender();
        std::thread::spawn(move || {
            assert!(producer.touch(TouchSample::press(at, Millis(0))));
            assert!(producer.touch(TouchSample::release(at, Millis(30))));
        })
        .join()
        .unwrap();

        for _ in 0..200 {
            if clicks.load(Ordering::SeqCst) > 0 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(clicks.load(Ordering::SeqCst), 1);

        let finished = handle.shutdown().expect("tick thread finished");
        assert!(finished.ticks > 0);
        assert_eq!(finished.leaked, 0);
        assert_eq!(finished.display.shown_pixel(4, 4), Color(0xFF20_40C0));
    }

    #[test]
    fn shutdown_without_input_returns_the_display() {
        let handle = launch(
            StdSys::new(),
            MemoryDisplay::new(16, 16, 1),
            REGIONS.to_vec(),
            config(),
            |_| {},
        )
        .unwrap();
        assert!(handle.wake());
        let finished = handle.shutdown().unwrap();
        assert_eq!(finished.leaked, 0);
    }
}
