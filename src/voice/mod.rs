//! Reference voices and the local voice library.
//!
//! A reference is any audio file the engine conditions on. The library keeps
//! copies of references under a name so they can be reused across sessions.

mod manager;
mod reference;

pub use manager::{VoiceError, VoiceManager, VoiceMetadata};
pub use reference::ReferenceVoice;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn sample(dir: &Path, name: &str, seconds: f32) -> PathBuf {
        let path = dir.join(name);
        audio::write_silence(&path, seconds, 16_000).unwrap();
        path
    }

    // ===========================================
    // ReferenceVoice tests
    // ===========================================

    #[test]
    fn test_reference_open_reads_wav_header() {
        let temp_dir = TempDir::new().unwrap();
        let path = sample(temp_dir.path(), "me.wav", 2.0);

        let reference = ReferenceVoice::open(&path).unwrap();
        let info = reference.info.unwrap();
        assert_eq!(info.sample_rate, 16_000);
        assert!((info.duration_secs - 2.0).abs() < 0.001);
        assert_eq!(reference.to_string(), "me.wav (2.0s, 16000 Hz)");
    }

    #[test]
    fn test_reference_open_tolerates_headerless_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("me.mp3");
        std::fs::write(&path, b"ID3").unwrap();

        let reference = ReferenceVoice::open(&path).unwrap();
        assert!(reference.info.is_none());
        assert_eq!(reference.to_string(), "me.mp3");
    }

    #[test]
    fn test_reference_open_missing() {
        let result = ReferenceVoice::open(Path::new("/nonexistent/me.wav"));
        assert!(matches!(result, Err(VoiceError::AudioNotFound(_))));
    }

    #[test]
    fn test_reference_open_empty_path() {
        let result = ReferenceVoice::open(Path::new(""));
        assert!(matches!(result, Err(VoiceError::NoFile)));
    }

    #[test]
    fn test_reference_open_rejects_directory() {
        let temp_dir = TempDir::new().unwrap();
        let result = ReferenceVoice::open(temp_dir.path());
        assert!(matches!(result, Err(VoiceError::AudioNotFound(_))));
    }

    // ===========================================
    // VoiceManager tests
    // ===========================================

    #[test]
    fn test_voice_manager_custom_directory() {
        let custom_path = PathBuf::from("/tmp/custom-voices");
        let manager = VoiceManager::with_dir(custom_path.clone());
        assert_eq!(manager.voices_dir(), custom_path.as_path());
    }

    #[test]
    fn test_voice_manager_list_empty() {
        let temp_dir = TempDir::new().unwrap();
        let manager = VoiceManager::with_dir(temp_dir.path().join("voices"));

        let voices = manager.list_local().unwrap();
        assert!(voices.is_empty());
    }

    #[test]
    fn test_voice_manager_save_copies_sample() {
        let temp_dir = TempDir::new().unwrap();
        let source = sample(temp_dir.path(), "recording.wav", 1.0);
        let manager = VoiceManager::with_dir(temp_dir.path().join("voices"));

        let metadata = manager.save("anna", &source).unwrap();
        assert_eq!(metadata.file_name, "anna.wav");
        assert_eq!(metadata.sample_rate, Some(16_000));

        let stored = manager.audio_path("anna").unwrap();
        assert_ne!(stored, source);
        assert_eq!(std::fs::read(&stored).unwrap(), std::fs::read(&source).unwrap());

        let loaded = manager.load_metadata("anna").unwrap();
        assert_eq!(loaded, metadata);
    }

    #[test]
    fn test_voice_manager_resave_from_stored_sample_keeps_it() {
        let temp_dir = TempDir::new().unwrap();
        let source = sample(temp_dir.path(), "recording.wav", 1.0);
        let manager = VoiceManager::with_dir(temp_dir.path().join("voices"));

        manager.save("anna", &source).unwrap();
        let stored = manager.audio_path("anna").unwrap();
        let before = std::fs::read(&stored).unwrap();

        let metadata = manager.save("anna", &stored).unwrap();
        assert_eq!(metadata.file_name, "anna.wav");
        assert_eq!(metadata.sample_rate, Some(16_000));

        let after = std::fs::read(&stored).unwrap();
        assert!(!after.is_empty());
        assert_eq!(after, before);
    }

    #[test]
    fn test_voice_manager_resave_with_new_extension_removes_old_sample() {
        let temp_dir = TempDir::new().unwrap();
        let mp3 = temp_dir.path().join("clip.mp3");
        std::fs::write(&mp3, b"ID3 not really mp3").unwrap();
        let wav = sample(temp_dir.path(), "recording.wav", 0.5);
        let manager = VoiceManager::with_dir(temp_dir.path().join("voices"));

        manager.save("anna", &mp3).unwrap();
        let old = manager.audio_path("anna").unwrap();
        assert!(old.ends_with("anna.mp3"));

        let metadata = manager.save("anna", &wav).unwrap();
        assert_eq!(metadata.file_name, "anna.wav");
        assert!(!old.exists());
        assert!(mp3.exists());

        let files: Vec<String> = std::fs::read_dir(manager.voices_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("anna."))
            .collect();
        assert_eq!(files.len(), 2, "{files:?}");
    }

    #[test]
    fn test_voice_manager_save_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let manager = VoiceManager::with_dir(temp_dir.path().join("voices"));

        let result = manager.save("anna", &temp_dir.path().join("missing.wav"));
        assert!(matches!(result, Err(VoiceError::AudioNotFound(_))));
    }

    #[test]
    fn test_voice_manager_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let manager = VoiceManager::with_dir(temp_dir.path().to_path_buf());

        let result = manager.load_metadata("nonexistent");
        assert!(matches!(result, Err(VoiceError::NotFound(_))));
    }

    #[test]
    fn test_voice_manager_delete_voice() {
        let temp_dir = TempDir::new().unwrap();
        let source = sample(temp_dir.path(), "recording.wav", 0.5);
        let manager = VoiceManager::with_dir(temp_dir.path().join("voices"));

        manager.save("to_delete", &source).unwrap();
        let stored = manager.audio_path("to_delete").unwrap();

        manager.delete_local("to_delete").unwrap();
        assert!(manager.load_metadata("to_delete").is_err());
        assert!(!stored.exists());
        assert!(source.exists());
    }

    #[test]
    fn test_voice_manager_list_after_save_is_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let source = sample(temp_dir.path(), "recording.wav", 0.5);
        let manager = VoiceManager::with_dir(temp_dir.path().join("voices"));

        manager.save("voice_b", &source).unwrap();
        manager.save("voice_a", &source).unwrap();

        let voices = manager.list_local().unwrap();
        let names: Vec<&str> = voices.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["voice_a", "voice_b"]);
    }

    #[test]
    fn test_voice_manager_validates_name() {
        let temp_dir = TempDir::new().unwrap();
        let source = sample(temp_dir.path(), "recording.wav", 0.5);
        let manager = VoiceManager::with_dir(temp_dir.path().join("voices"));

        for name in ["../evil", "a/b", "", "  "] {
            let result = manager.save(name, &source);
            assert!(matches!(result, Err(VoiceError::InvalidName(_))), "{name:?}");
        }
    }
}
