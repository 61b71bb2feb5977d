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

use duration_string::DurationString;
use serde::Deserialize;

/// No trigger driver. Sounds only play through the web interface.
pub const NO_DRIVER: &str = "none";

/// Buttons wired to GPIO pins.
pub const GPIO_DRIVER: &str = "gpio";

/// Pin numbers typed on stdin.
pub const KEYBOARD_DRIVER: &str = "keyboard";

/// How pin numbers in the sound config map onto GPIO lines.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Numbering {
    /// Physical pin numbers on the 40 pin header.
    #[default]
    Board,
    /// Broadcom GPIO line numbers.
    Bcm,
}

/// A YAML representation of the trigger configuration.
#[derive(Deserialize, Clone, Default)]
pub struct Trigger {
    /// The trigger driver: "none", "gpio", "keyboard", or a name starting with "mock".
    driver: Option<String>,

    /// How long a GPIO pin must settle before another press is accepted.
    debounce: Option<String>,

    /// The pin numbering used by the sound config (default: board).
    numbering: Option<Numbering>,
}

impl Trigger {
    /// New will create a new Trigger configuration.
    pub fn new(driver: &str) -> Trigger {
        Trigger {
            driver: Some(driver.to_string()),
            debounce: None,
            numbering: None,
        }
    }

    /// Returns the trigger driver (default: none).
    pub fn driver(&self) -> &str {
        self.driver.as_deref().unwrap_or(NO_DRIVER)
    }

    /// Returns the pin numbering (default: board).
    pub fn numbering(&self) -> Numbering {
        self.numbering.unwrap_or_default()
    }

    /// Returns the debounce period, if any.
    pub fn debounce(&self) -> Result<Option<Duration>, Box<dyn Error>> {
        match &self.debounce {
            Some(debounce) => Ok(Some(DurationString::from_string(debounce.clone())?.into())),
            None => Ok(None),
        }
    }
}
