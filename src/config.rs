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
use std::{error::Error, fs, path::Path, sync::Arc};

use tracing::info;

use crate::{player::Player, sounds::Registry, web};

pub mod audio;
pub mod auth;
pub mod error;
pub mod soundboard;
pub mod trigger;

pub use self::soundboard::Soundboard;

/// Loads the soundboard settings from a YAML file.
pub fn load(path: &Path) -> Result<Soundboard, error::ConfigError> {
    Soundboard::deserialize(path)
}

/// Loads the sound registry and builds a player for the configured audio device.
/// The sounds directory is created if it doesn't exist.
pub fn init_player(settings: &Soundboard) -> Result<Arc<Player>, Box<dyn Error>> {
    let sounds_dir = settings.sounds_dir();
    if !sounds_dir.exists() {
        info!(
            path = sounds_dir.display().to_string(),
            "Creating sounds directory."
        );
        fs::create_dir_all(&sounds_dir)?;
    }

    let registry = Arc::new(Registry::load(&settings.sounds_config())?);
    let device = crate::audio::get_device(settings.audio())?;
    Ok(Arc::new(Player::new(registry, device, sounds_dir)))
}

/// Initializes the player, the trigger, and the HTTP server from the given settings
/// file. Must be called from within a tokio runtime.
pub fn init_server(path: &Path) -> Result<web::Server, Box<dyn Error>> {
    let settings = load(path)?;
    let player = init_player(&settings)?;

    let trigger = match crate::trigger::get_driver(settings.trigger())? {
        Some(driver) => {
            let trigger = Arc::new(crate::trigger::Trigger::new(driver, player.clone()));
            trigger.bind(&player.registry().pins())?;
            Some(trigger)
        }
        None => None,
    };

    Ok(web::Server::new(
        settings.socket_address()?,
        web::AppContext {
            player,
            trigger,
            auth: Arc::new(settings.auth().clone()),
        },
        settings.max_upload_size(),
    ))
}
