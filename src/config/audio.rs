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
use serde::Deserialize;

/// Plays sounds by running an external command.
pub const COMMAND_DEVICE: &str = "command";

/// Plays sounds in-process through cpal.
pub const CPAL_DEVICE: &str = "cpal";

const DEFAULT_COMMAND: [&str; 2] = ["aplay", "-q"];
const DEFAULT_OUTPUT: &str = "default";

/// A YAML representation of the audio configuration.
#[derive(Deserialize, Clone, Default)]
pub struct Audio {
    /// The playback backend: "command", "cpal", or a name starting with "mock".
    device: Option<String>,

    /// The command used by the command backend. The sound path is appended as the
    /// last argument.
    command: Option<Vec<String>>,

    /// The cpal output device name. "default" uses the host's default output.
    output: Option<String>,
}

impl Audio {
    /// New will create a new Audio configuration.
    pub fn new(device: &str) -> Audio {
        Audio {
            device: Some(device.to_string()),
            command: None,
            output: None,
        }
    }

    /// Returns the playback backend (default: command).
    pub fn device(&self) -> &str {
        self.device.as_deref().unwrap_or(COMMAND_DEVICE)
    }

    /// Returns the playback command (default: aplay -q).
    pub fn command(&self) -> Vec<String> {
        match &self.command {
            Some(command) => command.clone(),
            None => DEFAULT_COMMAND.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// Returns the cpal output device name (default: default).
    pub fn output(&self) -> &str {
        self.output.as_deref().unwrap_or(DEFAULT_OUTPUT)
    }
}
