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

//! The sound registry.
//!
//! The registry is an ordered list of sound entries backed by a JSON file. The
//! file is the source of truth: every mutation is written back to it, and a
//! reload replaces the in-memory list wholesale.

use std::{
    collections::HashSet,
    fmt, fs,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// A single playable sound.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundEntry {
    /// The file name of the sound within the sounds directory, including its extension.
    file: String,

    /// Alternative names the sound can be played by.
    #[serde(default)]
    aliases: Vec<String>,

    /// The GPIO pin that triggers this sound.
    #[serde(
        rename = "GPIO_pin",
        alias = "gpio_pin",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    trigger_pin: Option<u8>,
}

impl SoundEntry {
    /// Creates a new sound entry.
    pub fn new(file: &str, aliases: Vec<String>, trigger_pin: Option<u8>) -> SoundEntry {
        SoundEntry {
            file: file.to_string(),
            aliases,
            trigger_pin,
        }
    }

    /// The file name of the sound.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The file name of the sound with its extension removed.
    pub fn stem(&self) -> &str {
        Path::new(&self.file)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.file)
    }

    /// The aliases of the sound.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// The trigger pin of the sound, if any.
    pub fn trigger_pin(&self) -> Option<u8> {
        self.trigger_pin
    }

    /// Every name the sound answers to: the file name, the stem, then the aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        [self.file(), self.stem()]
            .into_iter()
            .chain(self.aliases.iter().map(String::as_str))
    }
}

impl fmt::Display for SoundEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file)?;
        if !self.aliases.is_empty() {
            write!(f, " (aliases: {})", self.aliases.join(", "))?;
        }
        if let Some(pin) = self.trigger_pin {
            write!(f, " (pin: {})", pin)?;
        }
        Ok(())
    }
}

struct State {
    /// The path the sounds were last loaded from. Mutations are written here.
    path: PathBuf,
    sounds: Vec<SoundEntry>,
}

/// The registry of all known sounds.
///
/// Every operation holds the registry lock for its full duration, including the
/// write back to disk, so concurrent requests never observe a partial update and
/// writes to the backing file never interleave.
pub struct Registry {
    state: Mutex<State>,
}

impl Registry {
    /// Loads a registry from the given sound config file.
    pub fn load(path: &Path) -> Result<Registry> {
        let sounds = read_sounds(path)?;
        info!(
            path = path.display().to_string(),
            sounds = sounds.len(),
            "Loaded sound config."
        );

        Ok(Registry {
            state: Mutex::new(State {
                path: path.to_path_buf(),
                sounds,
            }),
        })
    }

    /// Replaces the registry contents with the sounds in the given file. On failure
    /// the current contents are kept.
    pub fn load_from(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock();
        let sounds = read_sounds(path)?;
        info!(
            path = path.display().to_string(),
            sounds = sounds.len(),
            "Loaded sound config."
        );
        state.path = path.to_path_buf();
        state.sounds = sounds;
        Ok(())
    }

    /// Reloads the registry from the file it was last loaded from. Any change that
    /// has not been written to disk is lost.
    pub fn reload(&self) -> Result<()> {
        let path = self.path();
        info!(path = path.display().to_string(), "Reloading sound config.");
        self.load_from(&path)
    }

    /// The path of the backing sound config file.
    pub fn path(&self) -> PathBuf {
        self.state.lock().path.clone()
    }

    /// A snapshot of every registered sound, in registry order.
    pub fn sounds(&self) -> Vec<SoundEntry> {
        self.state.lock().sounds.clone()
    }

    /// Every bound trigger pin, in registry order.
    pub fn pins(&self) -> Vec<u8> {
        self.state
            .lock()
            .sounds
            .iter()
            .filter_map(SoundEntry::trigger_pin)
            .collect()
    }

    /// Finds a sound by name. An exact file name match wins over a match on the file
    /// name without its extension, which in turn wins over an alias match.
    pub fn find_by_name(&self, name: &str) -> Option<SoundEntry> {
        let state = self.state.lock();
        let sounds = &state.sounds;

        sounds
            .iter()
            .find(|sound| sound.file == name)
            .or_else(|| sounds.iter().find(|sound| sound.stem() == name))
            .or_else(|| {
                sounds
                    .iter()
                    .find(|sound| sound.aliases.iter().any(|alias| alias == name))
            })
            .cloned()
    }

    /// Finds the sound bound to the given trigger pin.
    pub fn find_by_pin(&self, pin: u8) -> Option<SoundEntry> {
        self.state
            .lock()
            .sounds
            .iter()
            .find(|sound| sound.trigger_pin == Some(pin))
            .cloned()
    }

    /// Returns true if a sound with exactly this file name is registered.
    pub fn contains_file(&self, file: &str) -> bool {
        self.state.lock().sounds.iter().any(|sound| sound.file == file)
    }

    /// Registers a new sound and writes the registry to disk. Adding a file that is
    /// already registered does nothing.
    pub fn add(&self, file: &str, aliases: Vec<String>, trigger_pin: Option<u8>) -> Result<()> {
        let mut state = self.state.lock();
        if state.sounds.iter().any(|sound| sound.file == file) {
            warn!(file, "Sound file already registered, not adding it again.");
            return Ok(());
        }
        check_pin(&state.sounds, file, trigger_pin)?;

        info!(file, aliases = aliases.join(","), pin = ?trigger_pin, "Adding sound.");
        state.sounds.push(SoundEntry::new(file, aliases, trigger_pin));
        if let Err(e) = write_sounds(&state.path, &state.sounds) {
            state.sounds.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Moves an uploaded file to `dest` and registers it under `file`. The duplicate
    /// and pin checks, the move, and the write to disk all happen under the registry
    /// lock, so concurrent uploads of the same file or pin cannot both succeed. On any
    /// failure the registry is unchanged and no file is left at `dest`.
    pub fn add_upload(
        &self,
        file: &str,
        aliases: Vec<String>,
        trigger_pin: Option<u8>,
        upload: NamedTempFile,
        dest: &Path,
    ) -> Result<()> {
        let mut state = self.state.lock();
        if state.sounds.iter().any(|sound| sound.file == file) {
            return Err(Error::Duplicate(file.to_string()));
        }
        check_pin(&state.sounds, file, trigger_pin)?;

        info!(
            file,
            path = dest.display().to_string(),
            aliases = aliases.join(","),
            pin = ?trigger_pin,
            "Adding uploaded sound."
        );
        upload.persist(dest).map_err(|e| Error::Io(e.error))?;

        state.sounds.push(SoundEntry::new(file, aliases, trigger_pin));
        if let Err(e) = write_sounds(&state.path, &state.sounds) {
            state.sounds.pop();
            if let Err(remove_err) = fs::remove_file(dest) {
                warn!(
                    path = dest.display().to_string(),
                    err = remove_err.to_string(),
                    "Unable to remove unregistered upload."
                );
            }
            return Err(e);
        }
        Ok(())
    }

    /// Replaces the aliases and trigger pin of a registered sound and writes the
    /// registry to disk. A missing trigger pin clears the existing one.
    pub fn update(&self, file: &str, aliases: Vec<String>, trigger_pin: Option<u8>) -> Result<()> {
        let mut state = self.state.lock();
        let index = state
            .sounds
            .iter()
            .position(|sound| sound.file == file)
            .ok_or_else(|| Error::NotFound(file.to_string()))?;
        check_pin(&state.sounds, file, trigger_pin)?;

        info!(file, aliases = aliases.join(","), pin = ?trigger_pin, "Updating sound.");
        let previous = std::mem::replace(
            &mut state.sounds[index],
            SoundEntry::new(file, aliases, trigger_pin),
        );
        if let Err(e) = write_sounds(&state.path, &state.sounds) {
            state.sounds[index] = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Writes the registry to its backing file, replacing the file's contents.
    pub fn persist(&self) -> Result<()> {
        let state = self.state.lock();
        write_sounds(&state.path, &state.sounds)
    }

    /// Replaces an entry in memory without writing it to disk.
    #[cfg(test)]
    fn update_in_memory(&self, entry: SoundEntry) {
        let mut state = self.state.lock();
        if let Some(existing) = state.sounds.iter_mut().find(|s| s.file == entry.file) {
            *existing = entry;
        }
    }
}

/// Fails if the pin is bound to a sound other than the given file.
fn check_pin(sounds: &[SoundEntry], file: &str, trigger_pin: Option<u8>) -> Result<()> {
    let Some(pin) = trigger_pin else {
        return Ok(());
    };

    match sounds
        .iter()
        .find(|sound| sound.trigger_pin == Some(pin) && sound.file != file)
    {
        Some(owner) => Err(Error::PinInUse {
            pin,
            file: owner.file.clone(),
        }),
        None => Ok(()),
    }
}

/// Reads and validates the sounds in the given file.
fn read_sounds(path: &Path) -> Result<Vec<SoundEntry>> {
    debug!(path = path.display().to_string(), "Reading sound config.");
    let contents = fs::read_to_string(path).map_err(|e| Error::config(path, e))?;
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(&contents).map_err(|e| Error::config(path, e))?;

    // Entries are parsed one at a time so errors can name the offending sound.
    let mut sounds = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        let name = entry
            .get("file")
            .and_then(|file| file.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("#{}", index + 1));
        let sound: SoundEntry = serde_json::from_value(entry)
            .map_err(|e| Error::config(path, format!("sound '{}': {}", name, e)))?;
        sounds.push(sound);
    }

    let mut files = HashSet::new();
    let mut pins = HashSet::new();
    for sound in sounds.iter() {
        if !files.insert(sound.file.as_str()) {
            return Err(Error::config(
                path,
                format!("sound file '{}' is listed more than once", sound.file),
            ));
        }
        if let Some(pin) = sound.trigger_pin {
            if !pins.insert(pin) {
                return Err(Error::config(
                    path,
                    format!("GPIO pin {} is bound to more than one sound", pin),
                ));
            }
        }
    }

    Ok(sounds)
}

/// Writes the sounds to the given file as pretty printed JSON.
fn write_sounds(path: &Path, sounds: &[SoundEntry]) -> Result<()> {
    info!(path = path.display().to_string(), "Updating sound config file.");
    let mut serialized = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut serialized, formatter);
    sounds
        .serialize(&mut serializer)
        .map_err(|e| Error::config(path, e))?;
    fs::write(path, serialized)?;
    Ok(())
}
