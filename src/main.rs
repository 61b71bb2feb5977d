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
use std::{error::Error, path::PathBuf};

use clap::{crate_version, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use soundboard::{audio, config};

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=soundboard
After=network-online.target sound.target

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/soundboard
ExecStart=/usr/local/bin/soundboard start "$SOUNDBOARD_SETTINGS"

[Install]
WantedBy=multi-user.target
Alias=soundboard.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "An HTTP and GPIO triggered soundboard."
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start will start the soundboard server.
    Start {
        /// The path to the soundboard settings.
        settings_path: PathBuf,
    },
    /// Lists the registered sounds and flags any that are missing on disk.
    Sounds {
        /// The path to the soundboard settings.
        settings_path: PathBuf,
    },
    /// Plays a sound through the configured audio device and waits for it to finish.
    Play {
        /// The path to the soundboard settings.
        settings_path: PathBuf,
        /// The file name, file name without extension, or alias of the sound.
        name: String,
    },
    /// Lists the available audio output devices.
    Devices {},
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Start { settings_path } => {
            let server = config::init_server(&settings_path)?;
            server.run().await?;
        }
        Commands::Sounds { settings_path } => {
            let settings = config::load(&settings_path)?;
            let player = config::init_player(&settings)?;
            let sounds = player.registry().sounds();

            if sounds.is_empty() {
                println!("No sounds registered in {}.", settings.sounds_config().display());
                return Ok(());
            }

            let mut missing = 0;
            println!("Sounds (count: {}):", sounds.len());
            for sound in sounds.iter() {
                if player.sounds_dir().join(sound.file()).is_file() {
                    println!("- {}", sound);
                } else {
                    missing += 1;
                    println!("- {} [missing]", sound);
                }
            }

            if missing > 0 {
                return Err(format!(
                    "{} sound file(s) missing from {}",
                    missing,
                    player.sounds_dir().display()
                )
                .into());
            }
        }
        Commands::Play {
            settings_path,
            name,
        } => {
            let settings = config::load(&settings_path)?;
            let player = config::init_player(&settings)?;
            tokio::task::spawn_blocking(move || {
                player.play_blocking(&name).map_err(|e| e.to_string())
            })
            .await??;
        }
        Commands::Devices {} => {
            let devices = audio::list_devices()?;

            if devices.is_empty() {
                println!("No devices found.");
                return Ok(());
            }

            println!("Devices:");
            for device in devices {
                println!("- {}", device);
            }
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE);
        }
    }

    Ok(())
}
