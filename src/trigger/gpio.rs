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
use std::{error::Error, time::Duration};

use parking_lot::Mutex;
use rppal::gpio::{Gpio, InputPin, Trigger as Edge};
use tokio::sync::mpsc::Sender;
use tracing::{debug, info, warn};

use crate::config::trigger::Numbering;

use super::Event;

/// A trigger driver for buttons wired to the Raspberry Pi GPIO header. Pins are
/// pulled down and fire on the rising edge. Pin numbers follow the configured
/// numbering and are mapped to BCM lines.
pub struct Driver {
    gpio: Gpio,
    debounce: Option<Duration>,
    numbering: Numbering,
    /// Pins with an active interrupt. Dropping a pin resets it.
    pins: Mutex<Vec<InputPin>>,
}

impl Driver {
    pub fn new(debounce: Option<Duration>, numbering: Numbering) -> Result<Driver, Box<dyn Error>> {
        Ok(Driver {
            gpio: Gpio::new()?,
            debounce,
            numbering,
            pins: Mutex::new(Vec::new()),
        })
    }
}

impl super::Driver for Driver {
    fn bind(&self, pins: &[u8], events_tx: Sender<Event>) -> Result<(), Box<dyn Error>> {
        let mut bound = self.pins.lock();
        for &pin in pins {
            let line = super::gpio_line(self.numbering, pin).ok_or_else(|| {
                format!("pin {} is not a GPIO pin ({:?} numbering)", pin, self.numbering)
            })?;
            let mut input = self.gpio.get(line)?.into_input_pulldown();
            let events_tx = events_tx.clone();
            input.set_async_interrupt(Edge::RisingEdge, self.debounce, move |_| {
                debug!(pin, "GPIO rising edge.");
                if let Err(e) = events_tx.try_send(Event::Pressed(pin)) {
                    warn!(pin, err = e.to_string(), "Dropping button press.");
                }
            })?;
            info!(pin, line, "Bound GPIO pin.");
            bound.push(input);
        }
        Ok(())
    }

    fn release(&self) {
        for mut pin in self.pins.lock().drain(..) {
            if let Err(e) = pin.clear_async_interrupt() {
                warn!(
                    pin = pin.pin(),
                    err = e.to_string(),
                    "Unable to clear GPIO interrupt."
                );
            }
        }
    }

    fn name(&self) -> &str {
        "gpio"
    }
}
