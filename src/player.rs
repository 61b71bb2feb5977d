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
    path::{Component, Path, PathBuf},
    sync::Arc,
    thread,
};

use tracing::{error, info, span, warn, Level};

use crate::{audio, sounds::Registry};

/// Resolves sounds and hands them to the audio device. Playback is fire and forget:
/// every sound plays on its own thread, and sounds may overlap freely.
pub struct Player {
    /// The registry sounds are resolved against.
    registry: Arc<Registry>,
    /// The device to play sounds through.
    device: Arc<dyn audio::Device>,
    /// The directory holding the sound files.
    sounds_dir: PathBuf,
}

impl Player {
    /// Creates a new player.
    pub fn new(
        registry: Arc<Registry>,
        device: Arc<dyn audio::Device>,
        sounds_dir: PathBuf,
    ) -> Player {
        info!(
            device = device.to_string(),
            sounds_dir = sounds_dir.display().to_string(),
            "Player created."
        );
        Player {
            registry,
            device,
            sounds_dir,
        }
    }

    /// The sound registry.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The directory holding the sound files.
    pub fn sounds_dir(&self) -> &Path {
        &self.sounds_dir
    }

    /// Plays the sound with the given name. Returns true if playback was started.
    pub fn play_by_name(&self, name: &str) -> bool {
        match self.registry.find_by_name(name) {
            Some(sound) => self.play_file(sound.file()),
            None => {
                warn!(name, "No sound found with the given name.");
                false
            }
        }
    }

    /// Plays the sound bound to the given trigger pin, if any.
    pub fn play_by_pin(&self, pin: u8) {
        match self.registry.find_by_pin(pin) {
            Some(sound) => {
                self.play_file(sound.file());
            }
            None => warn!(pin, "No sound bound to pin."),
        }
    }

    /// Plays the given file from the sounds directory on a background thread.
    /// Returns true once playback has been dispatched, not when it finishes.
    pub fn play_file(&self, file: &str) -> bool {
        let path = match self.resolve(file) {
            Some(path) => path,
            None => return false,
        };

        let device = self.device.clone();
        let file_name = file.to_string();
        let result = thread::Builder::new()
            .name(format!("play {}", file))
            .spawn(move || {
                let span = span!(Level::INFO, "playback", file = file_name);
                let _enter = span.enter();

                if let Err(e) = device.play(&path) {
                    error!(err = e.as_ref(), "Error playing sound.");
                }
            });

        match result {
            Ok(_) => true,
            Err(e) => {
                error!(file, err = e.to_string(), "Unable to start playback thread.");
                false
            }
        }
    }

    /// Plays the sound with the given name and waits for it to finish.
    pub fn play_blocking(&self, name: &str) -> Result<(), Box<dyn Error>> {
        let sound = self
            .registry
            .find_by_name(name)
            .ok_or_else(|| format!("no sound found with name {}", name))?;
        let path = self
            .resolve(sound.file())
            .ok_or_else(|| format!("sound file {} is not available", sound.file()))?;

        self.device.play(&path)
    }

    /// Resolves a file against the sounds directory. Only plain file names are
    /// accepted, and the file must exist.
    fn resolve(&self, file: &str) -> Option<PathBuf> {
        let relative = Path::new(file);
        if file.is_empty()
            || !relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)))
        {
            warn!(file, "Refusing to play a path outside the sounds directory.");
            return None;
        }

        let path = self.sounds_dir.join(relative);
        if !path.is_file() {
            warn!(
                path = path.display().to_string(),
                "Sound file does not exist."
            );
            return None;
        }
        Some(path)
    }
}
