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
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use parking_lot::Mutex;
use tracing::{info, span, Level};

/// A mock device. Doesn't actually play anything, but remembers what it was asked
/// to play.
#[derive(Clone)]
pub struct Device {
    name: String,
    played: Arc<Mutex<Vec<PathBuf>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            played: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns every path played so far, in order.
    pub fn played(&self) -> Vec<PathBuf> {
        self.played.lock().clone()
    }
}

impl super::Device for Device {
    fn play(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let span = span!(Level::INFO, "play sound (mock)");
        let _enter = span.enter();

        info!(
            device = self.name,
            path = path.display().to_string(),
            "Playing sound."
        );
        self.played.lock().push(path.to_path_buf());
        Ok(())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}
