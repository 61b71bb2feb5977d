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
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc, Arc,
    },
    time::Duration,
};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{error, info, span, Level};

use super::decode::Decoded;

/// How long to wait past the end of a sound before giving up on the stream.
const COMPLETION_GRACE: Duration = Duration::from_secs(2);

/// Plays sounds in-process through a cpal output device.
pub struct Device {
    /// The name of the device.
    name: String,
    /// The underlying cpal device.
    device: cpal::Device,
}

impl Device {
    /// Lists the names of all cpal output devices.
    pub fn list() -> Result<Vec<String>, Box<dyn Error>> {
        // Suppress noisy output here.
        let _shh_stdout = shh::stdout()?;
        let _shh_stderr = shh::stderr()?;

        let mut names = Vec::new();
        for host_id in cpal::available_hosts() {
            let devices = match cpal::host_from_id(host_id)?.output_devices() {
                Ok(devices) => devices,
                Err(e) => {
                    error!(
                        err = e.to_string(),
                        host = host_id.name(),
                        "Unable to list devices for host"
                    );
                    continue;
                }
            };

            for device in devices {
                if let Ok(name) = device.name() {
                    names.push(name);
                }
            }
        }

        names.sort();
        Ok(names)
    }

    /// Gets the output device with the given name, or the host default for "default".
    pub fn get(name: &str) -> Result<Device, Box<dyn Error>> {
        let host = cpal::default_host();
        let device = if name == "default" {
            host.default_output_device()
                .ok_or("no default output device found")?
        } else {
            host.output_devices()?
                .find(|device| device.name().is_ok_and(|n| n.trim() == name))
                .ok_or_else(|| format!("no device found with name {}", name))?
        };

        Ok(Device {
            name: device.name()?,
            device,
        })
    }
}

/// Copies the next block of samples into the output buffer, zero-filling past the
/// end. Returns true once every sample has been written.
fn fill<T>(data: &mut [T], samples: &[f32], position: &AtomicUsize) -> bool
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let start = position.load(Ordering::Relaxed).min(samples.len());
    let end = (start + data.len()).min(samples.len());
    let available = &samples[start..end];

    for (dst, &src) in data.iter_mut().zip(available.iter()) {
        *dst = T::from_sample(src);
    }
    // Zero-fill any shortfall
    for dst in data[available.len()..].iter_mut() {
        *dst = T::EQUILIBRIUM;
    }

    position.store(end, Ordering::Relaxed);
    end == samples.len()
}

/// Builds an output callback that plays the given samples and signals once they
/// have all been written.
fn create_callback<T>(
    samples: Arc<Vec<f32>>,
    done_tx: mpsc::Sender<()>,
) -> impl FnMut(&mut [T], &cpal::OutputCallbackInfo) + Send + 'static
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let position = AtomicUsize::new(0);
    let finished = AtomicBool::new(false);
    move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
        if fill(data, &samples, &position) && !finished.swap(true, Ordering::Relaxed) {
            let _ = done_tx.send(());
        }
    }
}

impl super::Device for Device {
    fn play(&self, path: &Path) -> Result<(), Box<dyn Error>> {
        let span = span!(Level::INFO, "play sound (cpal)");
        let _enter = span.enter();

        let decoded = Decoded::from_file(path)?;
        let supported = self.device.default_output_config()?;
        let config: cpal::StreamConfig = supported.config();
        let samples = Arc::new(decoded.convert(config.channels, config.sample_rate.0));

        info!(
            device = self.name,
            path = path.display().to_string(),
            duration_ms = decoded.duration().as_millis(),
            channels = config.channels,
            sample_rate = config.sample_rate.0,
            "Playing sound."
        );

        let (done_tx, done_rx) = mpsc::channel::<()>();
        let on_error = |err| error!("CPAL output stream error: {}", err);

        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => self.device.build_output_stream(
                &config,
                create_callback::<f32>(samples, done_tx),
                on_error,
                None,
            )?,
            cpal::SampleFormat::I16 => self.device.build_output_stream(
                &config,
                create_callback::<i16>(samples, done_tx),
                on_error,
                None,
            )?,
            cpal::SampleFormat::U16 => self.device.build_output_stream(
                &config,
                create_callback::<u16>(samples, done_tx),
                on_error,
                None,
            )?,
            cpal::SampleFormat::I32 => self.device.build_output_stream(
                &config,
                create_callback::<i32>(samples, done_tx),
                on_error,
                None,
            )?,
            format => return Err(format!("unsupported sample format {}", format).into()),
        };
        stream.play()?;

        // The stream lives until the last sample has been handed to the device.
        if done_rx
            .recv_timeout(decoded.duration() + COMPLETION_GRACE)
            .is_err()
        {
            return Err("timed out waiting for playback to finish".into());
        }

        Ok(())
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (CPAL)", self.name)
    }
}
