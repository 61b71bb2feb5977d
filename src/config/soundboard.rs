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
    net::{IpAddr, SocketAddr},
    path::{Path, PathBuf},
};

use config::{Config, Environment, File};
use serde::Deserialize;

use super::{audio::Audio, auth::Auth, error::ConfigError, trigger::Trigger};

/// The prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "SOUNDBOARD";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_SOUNDS_DIR: &str = "sounds";
const DEFAULT_SOUNDS_CONFIG: &str = "sounds.json";
const DEFAULT_MAX_UPLOAD_SIZE: usize = 64 * 1024 * 1024;

/// The top level soundboard settings.
#[derive(Deserialize, Clone, Default)]
pub struct Soundboard {
    /// The HTTP port.
    port: Option<u16>,

    /// The address the HTTP server listens on.
    bind_address: Option<String>,

    /// The directory holding the sound files.
    sounds_dir: Option<PathBuf>,

    /// The JSON file listing the registered sounds.
    sounds_config: Option<PathBuf>,

    /// The largest accepted upload in bytes.
    max_upload_size: Option<usize>,

    #[serde(default)]
    audio: Audio,

    #[serde(default)]
    trigger: Trigger,

    #[serde(default)]
    auth: Auth,

    /// Relative paths are resolved against this directory.
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Soundboard {
    /// Parses the settings from a YAML file, applying environment overrides.
    pub fn deserialize(path: &Path) -> Result<Soundboard, ConfigError> {
        let mut soundboard = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<Soundboard>()?;

        soundboard.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        soundboard.validate()?;
        Ok(soundboard)
    }

    /// Returns the HTTP port (default: 8080).
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// Returns the listen address (default: 0.0.0.0).
    pub fn bind_address(&self) -> &str {
        self.bind_address.as_deref().unwrap_or(DEFAULT_BIND_ADDRESS)
    }

    /// Returns the socket address to listen on.
    pub fn socket_address(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.bind_address().parse().map_err(|_| {
            ConfigError::Invalid(format!("bad bind_address '{}'", self.bind_address()))
        })?;
        Ok(SocketAddr::new(ip, self.port()))
    }

    /// Returns the sounds directory (default: sounds).
    pub fn sounds_dir(&self) -> PathBuf {
        self.resolve(self.sounds_dir.as_deref(), DEFAULT_SOUNDS_DIR)
    }

    /// Returns the sound config file (default: sounds.json).
    pub fn sounds_config(&self) -> PathBuf {
        self.resolve(self.sounds_config.as_deref(), DEFAULT_SOUNDS_CONFIG)
    }

    /// Returns the largest accepted upload in bytes (default: 64 MiB).
    pub fn max_upload_size(&self) -> usize {
        self.max_upload_size.unwrap_or(DEFAULT_MAX_UPLOAD_SIZE)
    }

    /// The audio configuration.
    pub fn audio(&self) -> &Audio {
        &self.audio
    }

    /// The trigger configuration.
    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// The auth configuration.
    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    fn resolve(&self, path: Option<&Path>, default: &str) -> PathBuf {
        let path = path.unwrap_or(Path::new(default));
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.port == Some(0) {
            return Err(ConfigError::Invalid("port must not be 0".to_string()));
        }
        if self.max_upload_size == Some(0) {
            return Err(ConfigError::Invalid(
                "max_upload_size must not be 0".to_string(),
            ));
        }
        self.socket_address()?;
        self.trigger
            .debounce()
            .map_err(|e| ConfigError::Invalid(format!("bad trigger.debounce: {}", e)))?;
        self.auth.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::{error::Error, fs, path::Path};

    use serial_test::serial;

    use super::Soundboard;
    use crate::config::error::ConfigError;

    fn write_settings(dir: &Path, contents: &str) -> Result<std::path::PathBuf, Box<dyn Error>> {
        let path = dir.join("settings.yaml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    #[test]
    #[serial]
    fn test_defaults() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_settings(dir.path(), "audio:\n  device: mock-device\n")?;

        let settings = Soundboard::deserialize(&path)?;
        assert_eq!(8080, settings.port());
        assert_eq!("0.0.0.0:8080", settings.socket_address()?.to_string());
        assert_eq!(dir.path().join("sounds"), settings.sounds_dir());
        assert_eq!(dir.path().join("sounds.json"), settings.sounds_config());
        assert_eq!(64 * 1024 * 1024, settings.max_upload_size());
        assert_eq!("mock-device", settings.audio().device());
        assert_eq!("none", settings.trigger().driver());
        assert!(!settings.auth().require_auth());
        assert!(!settings.auth().use_admin_auth());
        Ok(())
    }

    #[test]
    #[serial]
    fn test_full_settings() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_settings(
            dir.path(),
            r#"
port: 9000
bind_address: 127.0.0.1
sounds_dir: /srv/sounds
sounds_config: config/sounds.json
max_upload_size: 1024
audio:
  device: command
  command: [mpg123, -q]
trigger:
  driver: keyboard
auth:
  require_auth: true
  use_admin_auth: true
  user:
    username: user
    password: pass
  admin:
    username: admin
    password: secret
"#,
        )?;

        let settings = Soundboard::deserialize(&path)?;
        assert_eq!("127.0.0.1:9000", settings.socket_address()?.to_string());
        assert_eq!(Path::new("/srv/sounds"), settings.sounds_dir());
        assert_eq!(
            dir.path().join("config").join("sounds.json"),
            settings.sounds_config()
        );
        assert_eq!(1024, settings.max_upload_size());
        assert_eq!(vec!["mpg123", "-q"], settings.audio().command());
        assert_eq!("keyboard", settings.trigger().driver());
        assert!(settings.auth().require_auth());
        assert!(settings
            .auth()
            .admin()
            .is_some_and(|admin| admin.matches("admin", "secret")));
        Ok(())
    }

    #[test]
    #[serial]
    fn test_env_override() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = write_settings(dir.path(), "port: 9000\n")?;

        std::env::set_var("SOUNDBOARD_PORT", "9100");
        std::env::set_var("SOUNDBOARD_AUDIO__DEVICE", "mock-env");
        let settings = Soundboard::deserialize(&path);
        std::env::remove_var("SOUNDBOARD_PORT");
        std::env::remove_var("SOUNDBOARD_AUDIO__DEVICE");

        let settings = settings?;
        assert_eq!(9100, settings.port());
        assert_eq!("mock-env", settings.audio().device());
        Ok(())
    }

    #[test]
    #[serial]
    fn test_invalid_settings() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;

        let path = write_settings(dir.path(), "bind_address: nowhere\n")?;
        assert!(matches!(
            Soundboard::deserialize(&path),
            Err(ConfigError::Invalid(_))
        ));

        let path = write_settings(dir.path(), "auth:\n  use_admin_auth: true\n")?;
        assert!(matches!(
            Soundboard::deserialize(&path),
            Err(ConfigError::Invalid(_))
        ));

        let path = write_settings(dir.path(), "port: [1, 2]\n")?;
        assert!(matches!(
            Soundboard::deserialize(&path),
            Err(ConfigError::Load(_))
        ));

        assert!(matches!(
            Soundboard::deserialize(&dir.path().join("missing.yaml")),
            Err(ConfigError::Load(_))
        ));
        Ok(())
    }
}
