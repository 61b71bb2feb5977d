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
use std::{error::Error, fmt, path::Path, sync::Arc};

use crate::config;

pub mod command;
pub mod cpal;
mod decode;
pub mod mock;

/// An audio backend that can play a sound file.
pub trait Device: fmt::Display + std::marker::Send + std::marker::Sync {
    /// Plays the file at the given path, blocking until playback has finished.
    fn play(&self, path: &Path) -> Result<(), Box<dyn Error>>;
}

/// Lists output devices known to cpal.
pub fn list_devices() -> Result<Vec<String>, Box<dyn Error>> {
    cpal::Device::list()
}

/// Gets the playback backend described by the configuration.
pub fn get_device(config: &config::audio::Audio) -> Result<Arc<dyn Device>, Box<dyn Error>> {
    let device = config.device();
    if device.starts_with("mock") {
        return Ok(Arc::new(mock::Device::get(device)));
    };

    match device {
        config::audio::COMMAND_DEVICE => Ok(Arc::new(command::Device::new(&config.command())?)),
        config::audio::CPAL_DEVICE => Ok(Arc::new(cpal::Device::get(config.output())?)),
        _ => Err(format!("unknown audio device '{}'", device).into()),
    }
}
