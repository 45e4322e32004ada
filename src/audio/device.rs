//! Microphone recording and speaker playback.
//!
//! Both operations block the calling thread until the clip has been captured
//! or played. Builds without the `device` feature keep the same API but always
//! report the devices as unavailable.

use std::time::Duration;

use thiserror::Error;

use super::wav::AudioError;

/// Longest recording accepted from the console or the settings file.
pub const MAX_RECORDING_SECS: f32 = 600.0;

/// Errors raised by audio device I/O.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Audio device unavailable: {0}")]
    Unavailable(String),

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("Could not decode audio: {0}")]
    Decode(String),

    #[error("Audio file error: {0}")]
    Audio(#[from] AudioError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub use imp::{play_file, record_wav};

/// Recording length as a [`Duration`], rejecting zero, negative, non-finite
/// and overlong values.
pub fn recording_duration(seconds: f32) -> Result<Duration, DeviceError> {
    if !(seconds > 0.0 && seconds <= MAX_RECORDING_SECS) {
        return Err(DeviceError::Stream(format!(
            "recording length must be within 0..={MAX_RECORDING_SECS} seconds, got {seconds}"
        )));
    }
    Duration::try_from_secs_f32(seconds).map_err(|e| DeviceError::Stream(e.to_string()))
}

/// Average interleaved frames down to a single channel.
#[cfg_attr(not(feature = "device"), allow(dead_code))]
pub(crate) fn downmix(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

#[cfg(feature = "device")]
mod imp {
    use std::fs::File;
    use std::io::BufReader;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    use rodio::cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use rodio::cpal::{self, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
    use rodio::{Decoder, OutputStreamBuilder, Sink};

    use super::{DeviceError, downmix, recording_duration};
    use crate::audio::wav::{AudioInfo, write_pcm16_mono};

    /// Record `seconds` of audio from the default input device into a mono WAV file.
    pub fn record_wav(path: &Path, seconds: f32) -> Result<AudioInfo, DeviceError> {
        let length = recording_duration(seconds)?;
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| DeviceError::Unavailable("no input device available".to_string()))?;

        let supported = device
            .default_input_config()
            .map_err(|e| DeviceError::Unavailable(e.to_string()))?;

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let config: StreamConfig = supported.clone().into();
        let captured = Arc::new(Mutex::new(Vec::<f32>::new()));

        tracing::debug!(
            device = ?device.name(),
            sample_rate,
            channels,
            format = ?supported.sample_format(),
            "recording from default input"
        );

        let stream = match supported.sample_format() {
            SampleFormat::I16 => build_input::<i16>(&device, &config, captured.clone())?,
            SampleFormat::U16 => build_input::<u16>(&device, &config, captured.clone())?,
            SampleFormat::F32 => build_input::<f32>(&device, &config, captured.clone())?,
            format => {
                return Err(DeviceError::Stream(format!(
                    "unsupported sample format: {format:?}"
                )));
            }
        };

        stream
            .play()
            .map_err(|e| DeviceError::Stream(e.to_string()))?;
        std::thread::sleep(length);
        drop(stream);

        let interleaved = match captured.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        let mono = downmix(&interleaved, channels);
        write_pcm16_mono(path, &mono, sample_rate)?;

        Ok(AudioInfo {
            duration_secs: mono.len() as f32 / sample_rate as f32,
            sample_rate,
            channels: 1,
        })
    }

    fn build_input<T>(
        device: &cpal::Device,
        config: &StreamConfig,
        captured: Arc<Mutex<Vec<f32>>>,
    ) -> Result<Stream, DeviceError>
    where
        T: SizedSample + Send + 'static,
        f32: FromSample<T>,
    {
        device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buffer) = captured.lock() {
                        buffer.extend(data.iter().map(|&s| f32::from_sample(s)));
                    }
                },
                |err| tracing::error!(error = %err, "input stream error"),
                None,
            )
            .map_err(|e| DeviceError::Stream(e.to_string()))
    }

    /// Play an audio file on the default output device and wait until it ends.
    pub fn play_file(path: &Path) -> Result<(), DeviceError> {
        let file = File::open(path)?;
        let stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| DeviceError::Unavailable(e.to_string()))?;
        let sink = Sink::connect_new(stream.mixer());
        let source =
            Decoder::new(BufReader::new(file)).map_err(|e| DeviceError::Decode(e.to_string()))?;

        sink.append(source);
        sink.sleep_until_end();

        Ok(())
    }
}

#[cfg(not(feature = "device"))]
mod imp {
    use std::path::Path;

    use super::DeviceError;
    use crate::audio::wav::AudioInfo;

    pub fn record_wav(_path: &Path, _seconds: f32) -> Result<AudioInfo, DeviceError> {
        Err(DeviceError::Unavailable(
            "built without the `device` feature".to_string(),
        ))
    }

    pub fn play_file(_path: &Path) -> Result<(), DeviceError> {
        Err(DeviceError::Unavailable(
            "built without the `device` feature".to_string(),
        ))
    }
}
