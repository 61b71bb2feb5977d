// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    error::Error,
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use parking_lot::Mutex;
use tokio::sync::mpsc::Sender;
use tracing::{info, span, warn, Level};

use super::Event;

/// The pins and channel the keyboard currently reports to.
#[derive(Default)]
struct Bindings {
    pins: Vec<u8>,
    events_tx: Option<Sender<Event>>,
}

/// A trigger driver that simulates button presses by reading pin numbers from
/// stdin.
pub struct Driver {
    bindings: Arc<Mutex<Bindings>>,
    started: AtomicBool,
}

impl Driver {
    pub fn new() -> Driver {
        Driver {
            bindings: Arc::new(Mutex::new(Bindings::default())),
            started: AtomicBool::new(false),
        }
    }

    /// Reads one line and reports a press if it names a bound pin. Returns false
    /// once the reader is exhausted.
    fn monitor_io<R, W>(
        bindings: &Mutex<Bindings>,
        mut reader: R,
        mut writer: W,
    ) -> Result<bool, io::Error>
    where
        R: io::BufRead,
        W: io::Write,
    {
        let (pins, events_tx) = {
            let bindings = bindings.lock();
            (bindings.pins.clone(), bindings.events_tx.clone())
        };

        write!(writer, "Pin {:?}: ", pins)?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }

        let pin = match input.trim().parse::<u8>() {
            Ok(pin) if pins.contains(&pin) => pin,
            _ => {
                warn!(input = input.trim(), "Unrecognized input");
                return Ok(true);
            }
        };

        if let Some(events_tx) = events_tx {
            events_tx
                .blocking_send(Event::Pressed(pin))
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        }
        Ok(true)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Self::new()
    }
}

impl super::Driver for Driver {
    fn bind(&self, pins: &[u8], events_tx: Sender<Event>) -> Result<(), Box<dyn Error>> {
        {
            let mut bindings = self.bindings.lock();
            bindings.pins = pins.to_vec();
            bindings.events_tx = Some(events_tx);
        }

        // The stdin reader outlives rebinds, so only one is ever started.
        if self.started.swap(true, Ordering::Relaxed) {
            return Ok(());
        }

        let bindings = self.bindings.clone();
        thread::Builder::new()
            .name("keyboard trigger".to_string())
            .spawn(move || {
                let span = span!(Level::INFO, "keyboard driver");
                let _enter = span.enter();

                info!("Keyboard driver started.");
                loop {
                    match Self::monitor_io(&bindings, io::stdin().lock(), io::stdout()) {
                        Ok(true) => continue,
                        Ok(false) => {
                            info!("Stdin closed, keyboard driver stopping.");
                            return;
                        }
                        Err(e) => {
                            warn!(err = e.to_string(), "Keyboard driver stopping.");
                            return;
                        }
                    }
                }
            })?;
        Ok(())
    }

    fn release(&self) {
        let mut bindings = self.bindings.lock();
        bindings.pins.clear();
        bindings.events_tx = None;
    }

    fn name(&self) -> &str {
        "keyboard"
    }
}
