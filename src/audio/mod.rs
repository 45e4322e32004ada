//! Audio file helpers and device I/O.

mod device;
mod wav;

pub use device::{DeviceError, MAX_RECORDING_SECS, play_file, record_wav, recording_duration};
pub use wav::{AudioError, AudioInfo, SILENCE_SAMPLE_RATE, read_info, write_pcm16_mono, write_silence};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_silence_and_read_info() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("silence.wav");

        write_silence(&path, 0.5, SILENCE_SAMPLE_RATE).unwrap();

        let info = read_info(&path).unwrap();
        assert_eq!(info.sample_rate, 22_050);
        assert_eq!(info.channels, 1);
        assert!((info.duration_secs - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_silence_is_all_zero() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("silence.wav");
        write_silence(&path, 0.1, 8_000).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 800);
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_write_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("clip.wav");

        write_pcm16_mono(&path, &[0.0, 0.5, -0.5, 2.0], 16_000).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples[0], 0);
        assert_eq!(samples[3], i16::MAX);
    }

    #[test]
    fn test_read_info_missing_file() {
        let result = read_info(std::path::Path::new("/nonexistent/ref.wav"));
        assert!(matches!(result, Err(AudioError::NotFound(_))));
    }

    #[test]
    fn test_read_info_rejects_non_wav() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("voice.mp3");
        std::fs::write(&path, b"ID3 not a wav").unwrap();

        assert!(matches!(read_info(&path), Err(AudioError::Wav(_))));
    }

    #[test]
    fn test_downmix_stereo() {
        let mono = device::downmix(&[0.2, 0.4, -1.0, 1.0], 2);
        assert_eq!(mono.len(), 2);
        assert!((mono[0] - 0.3).abs() < 1e-6);
        assert_eq!(mono[1], 0.0);
    }

    #[test]
    fn test_recording_duration_bounds() {
        assert_eq!(recording_duration(2.5).unwrap(), std::time::Duration::from_millis(2500));
        assert!(recording_duration(MAX_RECORDING_SECS).is_ok());

        for seconds in [0.0, -1.0, f32::INFINITY, f32::NAN, 1e30, MAX_RECORDING_SECS + 1.0] {
            assert!(
                matches!(recording_duration(seconds), Err(DeviceError::Stream(_))),
                "{seconds}"
            );
        }
    }

    #[test]
    fn test_audio_info_display() {
        let info = AudioInfo {
            duration_secs: 3.24,
            sample_rate: 44_100,
            channels: 1,
        };
        assert_eq!(info.to_string(), "3.2s, 44100 Hz");
    }
}
