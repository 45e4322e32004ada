//! Application settings.
//!
//! Settings come from built-in defaults, then an optional TOML file, then
//! command line flags (applied by the `cli` module).

mod settings;

pub use settings::{
    BackendKind, BackendSettings, ConfigError, DEFAULT_MODEL_NAME, ENV_CONFIG_PATH,
    RecordingSettings, Settings, UiMode, WebSettings,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();

        assert_eq!(settings.ui_mode, UiMode::Desktop);
        assert_eq!(settings.language_default.as_str(), "de");
        assert_eq!(settings.model_name, DEFAULT_MODEL_NAME);
        assert!(settings.fallback_silence);
        assert_eq!(settings.backend.kind, BackendKind::Command);
        assert_eq!(settings.backend.executable, PathBuf::from("tts"));
        assert_eq!(settings.web.bind, "127.0.0.1:7860");
        assert_eq!(settings.recording.seconds, 5.0);
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            ui_mode = "web"
            language_default = "en"

            [backend]
            kind = "gradio"
            url = "http://gpu-box:7860"
            "#,
        )
        .unwrap();

        assert_eq!(settings.ui_mode, UiMode::Web);
        assert_eq!(settings.language_default.as_str(), "en");
        assert_eq!(settings.backend.kind, BackendKind::Gradio);
        assert_eq!(settings.backend.url, "http://gpu-box:7860");
        assert_eq!(settings.backend.executable, PathBuf::from("tts"));
        assert_eq!(settings.model_name, DEFAULT_MODEL_NAME);
    }

    #[test]
    fn test_parse_rejects_unknown_language() {
        let result = Settings::from_toml_str("language_default = \"xx\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_parse_rejects_unknown_ui_mode() {
        let result = Settings::from_toml_str("ui_mode = \"qt\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_parse_rejects_unusable_recording_length() {
        for value in ["inf", "nan", "1e30", "0.0", "-3.0"] {
            let result = Settings::from_toml_str(&format!("[recording]\nseconds = {value}"));
            assert!(
                matches!(
                    result,
                    Err(ConfigError::Invalid {
                        key: "recording.seconds",
                        ..
                    })
                ),
                "{value}"
            );
        }

        let settings = Settings::from_toml_str("[recording]\nseconds = 12.5").unwrap();
        assert_eq!(settings.recording.seconds, 12.5);
    }

    #[test]
    fn test_load_explicit_missing_file() {
        let result = Settings::load(Some(std::path::Path::new("/nonexistent/config.toml")));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "model_name = \"tts_models/de/thorsten/vits\"\n").unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.model_name, "tts_models/de/thorsten/vits");
    }

    #[test]
    fn test_round_trip_through_toml() {
        let mut settings = Settings::default();
        settings.output_dir = Some(PathBuf::from("/tmp/out"));
        settings.backend.model_cache = Some(PathBuf::from("/models"));

        let text = settings.to_toml_string().unwrap();
        let parsed = Settings::from_toml_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_resolved_directories() {
        let mut settings = Settings::default();
        assert!(settings.output_dir().ends_with("voice_cloner"));
        assert!(settings.voices_dir().ends_with("voices"));

        settings.data_dir = Some(PathBuf::from("/srv/cloner"));
        assert_eq!(settings.voices_dir(), PathBuf::from("/srv/cloner/voices"));
        assert_eq!(settings.uploads_dir(), settings.output_dir().join("uploads"));
    }
}
