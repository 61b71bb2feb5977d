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
    path::Path,
    process::{Command, Stdio},
};

use tracing::{debug, span, Level};

/// Plays sounds by handing them to an external player such as aplay.
pub struct Device {
    program: String,
    args: Vec<String>,
}

impl Device {
    /// Creates a device from a command line. The sound path is appended to it.
    pub fn new(command: &[String]) -> Result<Device, Box<dyn Error>> {
        match command.split_first() {
            Some((program, args)) => Ok(Device {
                program: program.clone(),
                args: args.to_vec(),
            }),
            None => Err("the playback command must not be empty".into()),
        }
    }
}

impl super::Device for Device {
    fn play(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let span = span!(Level::INFO, "play sound (command)");
        let _enter = span.enter();

        debug!(
            program = self.program,
            args = self.args.join(" "),
            path = path.display().to_string(),
            "Running playback command."
        );

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| format!("unable to run '{}': {}", self.program, e))?;

        if !status.success() {
            return Err(format!("'{}' exited with {}", self.program, status).into());
        }

        Ok(())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Command)", self.program)
    }
}

#[cfg(all(test, unix))]
mod test {
    use std::{error::Error, path::Path};

    use crate::audio::Device as _;

    use super::Device;

    fn command(args: &[&str]) -> Vec<String> {
        args.iter().map(|arg| arg.to_string()).collect()
    }

    #[test]
    fn test_command_status() -> Result<(), Box<dyn Error>> {
        let path = Path::new("beep.wav");

        assert!(Device::new(&command(&["true"]))?.play(path).is_ok());
        assert!(Device::new(&command(&["false"]))?.play(path).is_err());
        assert!(Device::new(&command(&["this-command-does-not-exist"]))?
            .play(path)
            .is_err());
        Ok(())
    }

    #[test]
    fn test_command_receives_path() -> Result<(), Box<dyn Error>> {
        // test(1) succeeds only when the appended path exists.
        let dir = tempfile::tempdir()?;
        let existing = dir.path().join("beep.wav");
        std::fs::write(&existing, b"")?;

        let device = Device::new(&command(&["test", "-f"]))?;
        assert!(device.play(&existing).is_ok());
        assert!(device.play(&dir.path().join("missing.wav")).is_err());
        Ok(())
    }

    #[test]
    fn test_empty_command() {
        assert!(Device::new(&[]).is_err());
    }
}
