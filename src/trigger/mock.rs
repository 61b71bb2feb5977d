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
use std::{error::Error, sync::Arc};

use parking_lot::Mutex;
use tokio::sync::mpsc::Sender;
use tracing::info;

use super::Event;

#[derive(Default)]
struct State {
    pins: Vec<u8>,
    events_tx: Option<Sender<Event>>,
    releases: usize,
}

/// A mock trigger driver. Presses are simulated with [Driver::press].
#[derive(Clone)]
pub struct Driver {
    name: String,
    state: Arc<Mutex<State>>,
}

impl Driver {
    /// Gets the given mock driver.
    pub fn get(name: &str) -> Driver {
        Driver {
            name: name.to_string(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Simulates a press of the given pin. Returns true if the pin is bound and the
    /// press was delivered.
    pub fn press(&self, pin: u8) -> bool {
        let state = self.state.lock();
        if !state.pins.contains(&pin) {
            return false;
        }
        state
            .events_tx
            .as_ref()
            .is_some_and(|events_tx| events_tx.try_send(Event::Pressed(pin)).is_ok())
    }

    /// The currently bound pins.
    pub fn bound_pins(&self) -> Vec<u8> {
        self.state.lock().pins.clone()
    }

    /// The number of times the bindings have been released.
    pub fn releases(&self) -> usize {
        self.state.lock().releases
    }
}

impl super::Driver for Driver {
    fn bind(&self, pins: &[u8], events_tx: Sender<Event>) -> Result<(), Box<dyn Error>> {
        info!(driver = self.name, pins = format!("{:?}", pins), "Binding pins (mock).");
        let mut state = self.state.lock();
        state.pins.extend_from_slice(pins);
        state.events_tx = Some(events_tx);
        Ok(())
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.pins.clear();
        state.events_tx = None;
        state.releases += 1;
    }

    fn name(&self) -> &str {
        &self.name
    }
}
