//! CLI argument parsing.

mod args;

pub use args::Args;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BackendKind, Settings, UiMode};
    use clap::Parser;
    use std::path::PathBuf;

    fn parse(argv: &[&str]) -> Args {
        let mut full = vec!["voice-cloner"];
        full.extend_from_slice(argv);
        Args::try_parse_from(full).unwrap()
    }

    // ===========================================
    // Parsing tests
    // ===========================================

    #[test]
    fn test_defaults() {
        let args = parse(&[]);

        assert_eq!(args.output, PathBuf::from("output.wav"));
        assert_eq!(args.log_level, "info");
        assert!(args.ui.is_none());
        assert!(!args.is_one_shot());
    }

    #[test]
    fn test_language_is_validated() {
        let args = parse(&["-l", "EN"]);
        assert_eq!(args.language.unwrap().as_str(), "en");

        let result = Args::try_parse_from(["voice-cloner", "-l", "xx"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_ui_and_backend_values() {
        let args = parse(&["--ui", "web", "--backend", "gradio"]);
        assert_eq!(args.ui, Some(UiMode::Web));
        assert_eq!(args.backend, Some(BackendKind::Gradio));

        assert!(Args::try_parse_from(["voice-cloner", "--ui", "tk"]).is_err());
    }

    #[test]
    fn test_one_shot_detection() {
        assert!(parse(&["-g", "Hallo"]).is_one_shot());
        assert!(parse(&["-r", "me.wav"]).is_one_shot());
        assert!(parse(&["--list-voices"]).is_one_shot());
        assert!(parse(&["--list-languages"]).is_one_shot());
        assert!(parse(&["--delete-voice", "anna"]).is_one_shot());
        assert!(!parse(&["--ui", "desktop", "-v"]).is_one_shot());
    }

    // ===========================================
    // Settings override tests
    // ===========================================

    #[test]
    fn test_apply_to_overrides_settings() {
        let args = parse(&[
            "--ui",
            "web",
            "-l",
            "fr",
            "-m",
            "custom/model",
            "-b",
            "http",
            "--backend-url",
            "http://gpu-box:8020",
            "--tts-bin",
            "/opt/tts/bin/tts",
            "--model-cache",
            "/data/models",
            "--cuda",
            "--bind",
            "0.0.0.0:8080",
            "--no-fallback",
        ]);

        let mut settings = Settings::default();
        args.apply_to(&mut settings);

        assert_eq!(settings.ui_mode, UiMode::Web);
        assert_eq!(settings.language_default.as_str(), "fr");
        assert_eq!(settings.model_name, "custom/model");
        assert_eq!(settings.backend.kind, BackendKind::Http);
        assert_eq!(settings.backend.url, "http://gpu-box:8020");
        assert_eq!(settings.backend.executable, PathBuf::from("/opt/tts/bin/tts"));
        assert_eq!(settings.backend.model_cache, Some(PathBuf::from("/data/models")));
        assert!(settings.backend.use_cuda);
        assert_eq!(settings.web.bind, "0.0.0.0:8080");
        assert!(!settings.fallback_silence);
    }

    #[test]
    fn test_apply_to_keeps_file_values() {
        let mut settings = Settings::from_toml_str(
            r#"
            ui_mode = "web"
            language_default = "it"

            [backend]
            kind = "gradio"
            "#,
        )
        .unwrap();

        let mut args = parse(&["-v"]);
        // TTS_HOME may be set where the tests run
        args.model_cache = None;

        let expected = settings.clone();
        args.apply_to(&mut settings);

        assert_eq!(settings, expected);
    }
}
