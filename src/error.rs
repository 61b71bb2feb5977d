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
use std::path::PathBuf;

/// Errors produced by the sound registry and the request handlers that drive it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The sound config file is missing or does not hold a list of sounds.
    #[error("Sound config error ({}): {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// No sound matches the given file or name.
    #[error("Sound '{0}' does not exist")]
    NotFound(String),

    /// The sound file is already registered.
    #[error("Sound file '{0}' is already registered")]
    Duplicate(String),

    /// The uploaded file is not an audio file.
    #[error("'{file}' is not a sound file (type: {mime})")]
    UnsupportedMedia { file: String, mime: String },

    /// The trigger pin is already bound to another sound.
    #[error("GPIO pin {pin} is already bound to '{file}'")]
    PinInUse { pin: u8, file: String },

    /// A form field was missing or malformed.
    #[error("Invalid field '{field}': {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a config error for the given sound config path.
    pub fn config(path: impl Into<PathBuf>, message: impl ToString) -> Error {
        Error::Config {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
