//! WAV file helpers.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sample rate of the silent placeholder clip.
pub const SILENCE_SAMPLE_RATE: u32 = 22_050;

/// Errors that can occur while reading or writing WAV files.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Audio file not found: {0}")]
    NotFound(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Header information of an audio file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    pub duration_secs: f32,
    pub sample_rate: u32,
    pub channels: u16,
}

impl std::fmt::Display for AudioInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.1}s, {} Hz", self.duration_secs, self.sample_rate)
    }
}

/// Read duration and format from a WAV header.
pub fn read_info(path: &Path) -> Result<AudioInfo, AudioError> {
    if !path.exists() {
        return Err(AudioError::NotFound(path.display().to_string()));
    }

    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let frames = reader.duration();

    Ok(AudioInfo {
        duration_secs: frames as f32 / spec.sample_rate as f32,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

/// Write a mono 16-bit clip of digital silence.
pub fn write_silence(path: &Path, seconds: f32, sample_rate: u32) -> Result<(), AudioError> {
    let samples = (seconds.max(0.0) * sample_rate as f32) as usize;
    write_pcm16_mono(path, &vec![0.0; samples], sample_rate)
}

/// Write normalized `f32` samples as a mono 16-bit WAV file.
pub fn write_pcm16_mono(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), AudioError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32) as i16)?;
    }
    writer.finalize()?;

    Ok(())
}
