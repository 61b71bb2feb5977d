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
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::{
    sync::mpsc::{self, Sender},
    task::JoinHandle,
};
use tracing::{error, info, span, Instrument, Level};

use crate::{config, config::trigger::Numbering, player::Player};

#[cfg(feature = "gpio")]
pub mod gpio;
pub mod keyboard;
pub mod mock;

/// The number of presses that may be waiting on the trigger task.
const EVENT_BUFFER: usize = 32;

/// Trigger events that will start playback.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Event {
    /// The button wired to the given pin was pressed.
    Pressed(u8),
}

/// A source of trigger events, such as GPIO pins.
pub trait Driver: Send + Sync + 'static {
    /// Starts watching the given pins. Each press is sent on the events channel and
    /// must never block the caller.
    fn bind(&self, pins: &[u8], events_tx: Sender<Event>) -> Result<(), Box<dyn Error>>;

    /// Stops watching every bound pin.
    fn release(&self);

    /// The name of the driver.
    fn name(&self) -> &str;
}

/// Gets the trigger driver described by the configuration, if any.
pub fn get_driver(
    config: &config::trigger::Trigger,
) -> Result<Option<Arc<dyn Driver>>, Box<dyn Error>> {
    let driver = config.driver();
    if driver.starts_with("mock") {
        return Ok(Some(Arc::new(mock::Driver::get(driver))));
    }

    match driver {
        config::trigger::NO_DRIVER => Ok(None),
        config::trigger::KEYBOARD_DRIVER => Ok(Some(Arc::new(keyboard::Driver::new()))),
        #[cfg(feature = "gpio")]
        config::trigger::GPIO_DRIVER => {
            Ok(Some(Arc::new(gpio::Driver::new(
                config.debounce()?,
                config.numbering(),
            )?)))
        }
        #[cfg(not(feature = "gpio"))]
        config::trigger::GPIO_DRIVER => {
            Err("the gpio trigger driver requires building with the gpio feature".into())
        }
        _ => Err(format!("unknown trigger driver '{}'", driver).into()),
    }
}

/// The BCM line behind each physical pin of the 40 pin header, indexed by pin
/// number. Power and ground pins have no line.
#[rustfmt::skip]
const BOARD_TO_BCM: [Option<u8>; 41] = [
    None, // 0
    None, None, // 1, 2
    Some(2), None, // 3, 4
    Some(3), None, // 5, 6
    Some(4), Some(14), // 7, 8
    None, Some(15), // 9, 10
    Some(17), Some(18), // 11, 12
    Some(27), None, // 13, 14
    Some(22), Some(23), // 15, 16
    None, Some(24), // 17, 18
    Some(10), None, // 19, 20
    Some(9), Some(25), // 21, 22
    Some(11), Some(8), // 23, 24
    None, Some(7), // 25, 26
    Some(0), Some(1), // 27, 28
    Some(5), None, // 29, 30
    Some(6), Some(12), // 31, 32
    Some(13), None, // 33, 34
    Some(19), Some(16), // 35, 36
    Some(26), Some(20), // 37, 38
    None, Some(21), // 39, 40
];

/// Maps a pin number from the sound config to its BCM GPIO line.
pub fn gpio_line(numbering: Numbering, pin: u8) -> Option<u8> {
    match numbering {
        Numbering::Board => BOARD_TO_BCM.get(pin as usize).copied().flatten(),
        Numbering::Bcm => Some(pin),
    }
}

/// Binds pins to sounds. Presses reported by the driver are played through the
/// player.
pub struct Trigger {
    driver: Arc<dyn Driver>,
    events_tx: Sender<Event>,
    handle: JoinHandle<()>,
    released: AtomicBool,
}

impl Trigger {
    /// Creates a new trigger with the given driver. Must be called from within a
    /// tokio runtime.
    pub fn new(driver: Arc<dyn Driver>, player: Arc<Player>) -> Trigger {
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let driver_name = driver.name().to_string();
        Trigger {
            driver,
            events_tx,
            handle: tokio::spawn(
                Trigger::play_events(player, events_rx)
                    .instrument(span!(Level::INFO, "trigger", driver = driver_name)),
            ),
            released: AtomicBool::new(true),
        }
    }

    /// Binds every given pin.
    pub fn bind(&self, pins: &[u8]) -> Result<(), Box<dyn Error>> {
        info!(
            driver = self.driver.name(),
            pins = format!("{:?}", pins),
            "Binding trigger pins."
        );
        self.released.store(false, Ordering::Relaxed);
        self.driver.bind(pins, self.events_tx.clone())
    }

    /// Releases all current bindings, then binds the given pins.
    pub fn rebind(&self, pins: &[u8]) -> Result<(), Box<dyn Error>> {
        self.shutdown();
        self.bind(pins)
    }

    /// Releases every binding. Safe to call more than once.
    pub fn shutdown(&self) {
        if self.released.swap(true, Ordering::Relaxed) {
            return;
        }
        info!(driver = self.driver.name(), "Releasing trigger pins.");
        self.driver.release();
    }

    /// Plays the sound for every press received from the driver.
    async fn play_events(player: Arc<Player>, mut events_rx: mpsc::Receiver<Event>) {
        info!("Trigger started.");
        while let Some(event) = events_rx.recv().await {
            info!(event = format!("{:?}", event), "Received event.");
            match event {
                Event::Pressed(pin) => player.play_by_pin(pin),
            }
        }
        error!("Trigger event channel closed.");
    }
}

impl Drop for Trigger {
    fn drop(&mut self) {
        self.shutdown();
        self.handle.abort();
    }
}
