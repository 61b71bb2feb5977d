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

//! Decodes sound files into memory.
//!
//! Sounds are short one-shots, so they are decoded in full before playback and
//! converted to the output format with linear interpolation.

use std::{fs::File, path::Path, time::Duration};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::{get_codecs, get_probe};
use tracing::{debug, warn};

/// Errors raised while decoding a sound file.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("No audio track found in {0}")]
    NoTrack(String),

    #[error("Sample rate not specified in {0}")]
    UnknownSampleRate(String),

    #[error("Audio file error: {0}")]
    AudioError(#[from] SymphoniaError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A fully decoded sound.
pub struct Decoded {
    /// Interleaved samples.
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl Decoded {
    /// Decodes the file at the given path. Supports every format symphonia can probe.
    pub fn from_file(path: &Path) -> Result<Decoded, DecodeError> {
        let file_path = path.display().to_string();
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let meta_opts: MetadataOptions = Default::default();
        let fmt_opts: FormatOptions = Default::default();
        let probed = get_probe().format(&hint, mss, &fmt_opts, &meta_opts)?;
        let mut format_reader = probed.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DecodeError::NoTrack(file_path.clone()))?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .filter(|&rate| rate > 0)
            .ok_or_else(|| DecodeError::UnknownSampleRate(file_path.clone()))?;
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(0);

        let decoder_opts: DecoderOptions = Default::default();
        let mut decoder = get_codecs().make(&track.codec_params, &decoder_opts)?;

        let mut samples = Vec::new();
        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(e.into()),
            };
            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!(path = file_path, err = e, "Skipping undecodable packet.");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let spec = *decoded.spec();
            if channels == 0 {
                channels = spec.channels.count() as u16;
            }
            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);
            samples.extend_from_slice(buffer.samples());
        }

        if channels == 0 {
            return Err(DecodeError::NoTrack(file_path));
        }

        let decoded = Decoded {
            samples,
            channels,
            sample_rate,
        };
        debug!(
            path = file_path,
            channels,
            sample_rate,
            duration_ms = decoded.duration().as_millis(),
            "Decoded sound."
        );
        Ok(decoded)
    }

    /// The length of the sound.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() / self.channels.max(1) as usize;
        Duration::from_secs_f64(frames as f64 / self.sample_rate as f64)
    }

    /// Converts the sound to interleaved samples with the given channel count and
    /// sample rate.
    pub fn convert(&self, channels: u16, sample_rate: u32) -> Vec<f32> {
        let resampled = if self.sample_rate == sample_rate {
            self.samples.clone()
        } else {
            transcode_samples(&self.samples, self.channels, self.sample_rate, sample_rate)
        };

        remix_channels(&resampled, self.channels, channels)
    }
}

/// Transcodes samples from one sample rate to another using linear interpolation.
fn transcode_samples(samples: &[f32], channel_count: u16, source_rate: u32, target_rate: u32) -> Vec<f32> {
    let ratio = target_rate as f64 / source_rate as f64;
    let channels = channel_count as usize;
    let source_frames = samples.len() / channels;
    let target_frames = (source_frames as f64 * ratio).ceil() as usize;

    let mut output = Vec::with_capacity(target_frames * channels);
    for target_frame in 0..target_frames {
        let source_pos = target_frame as f64 / ratio;
        let source_frame = source_pos.floor() as usize;
        let frac = source_pos.fract() as f32;

        for channel in 0..channels {
            let s0 = samples
                .get(source_frame * channels + channel)
                .copied()
                .unwrap_or(0.0);
            let s1 = samples
                .get((source_frame + 1) * channels + channel)
                .copied()
                .unwrap_or(s0);
            output.push(s0 + (s1 - s0) * frac);
        }
    }

    output
}

/// Maps interleaved samples onto a different number of channels. Mono sources are
/// copied to every output channel; otherwise source channels map one to one and
/// extra output channels are silent.
fn remix_channels(samples: &[f32], source_channels: u16, target_channels: u16) -> Vec<f32> {
    if source_channels == target_channels {
        return samples.to_vec();
    }

    let source_channels = source_channels as usize;
    let target_channels = target_channels as usize;
    let frames = samples.len() / source_channels;

    let mut output = Vec::with_capacity(frames * target_channels);
    for frame in samples.chunks_exact(source_channels) {
        for channel in 0..target_channels {
            let sample = if source_channels == 1 {
                frame[0]
            } else {
                frame.get(channel).copied().unwrap_or(0.0)
            };
            output.push(sample);
        }
    }
    output
}
