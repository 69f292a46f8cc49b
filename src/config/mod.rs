//! Configuration loading.
//!
//! Settings are read from TOML:
//!
//! ```toml
//! [engine]
//! max-request-len = 4096
//! cancel-stale-requests = true
//!
//! [highlight.name-map]
//! "function.call" = "function"
//! ```

pub mod settings;

pub use settings::{
    DEFAULT_COMMAND_QUEUE_CAPACITY, EngineConfig, HighlightConfig, Settings,
};

use std::path::Path;

use crate::error::{IrodoriError, IrodoriResult};

impl Settings {
    /// Parse and validate settings from a TOML string.
    pub fn from_toml_str(source: &str) -> IrodoriResult<Self> {
        let settings: Settings =
            toml::from_str(source).map_err(|e| IrodoriError::config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a TOML file.
    pub fn load(path: &Path) -> IrodoriResult<Self> {
        let source = std::fs::read_to_string(path)?;
        log::debug!(
            target: "irodori::config",
            "Loaded settings from {}",
            path.display()
        );
        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> IrodoriResult<()> {
        self.engine.validate()
    }
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> IrodoriResult<Self> {
        let config: EngineConfig =
            toml::from_str(source).map_err(|e| IrodoriError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> IrodoriResult<()> {
        if self.max_request_len == Some(0) {
            return Err(IrodoriError::config("max-request-len must be positive"));
        }
        if self.command_queue_capacity == 0 {
            return Err(IrodoriError::config(
                "command-queue-capacity must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_source() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(
            settings.engine.command_queue_capacity,
            DEFAULT_COMMAND_QUEUE_CAPACITY
        );
        assert!(!settings.engine.cancel_stale_requests);
    }

    #[test]
    fn test_parse_full_settings() {
        let source = r#"
            [engine]
            max-request-len = 512
            cancel-stale-requests = true

            [highlight.name-map]
            "function.call" = "function"
            keyword = "kw"
        "#;

        let settings = Settings::from_toml_str(source).unwrap();
        assert_eq!(settings.engine.max_request_len, Some(512));
        assert!(settings.engine.cancel_stale_requests);
        assert_eq!(
            settings.highlight.name_map.get("function.call").map(String::as_str),
            Some("function")
        );
    }

    #[test]
    fn test_rejects_zero_request_len() {
        let result = EngineConfig::from_toml_str("max-request-len = 0");
        assert!(matches!(result, Err(IrodoriError::Config { .. })));
    }

    #[test]
    fn test_rejects_malformed_toml() {
        let result = Settings::from_toml_str("[engine\n");
        assert!(matches!(result, Err(IrodoriError::Config { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine]\ncancel-stale-requests = true").unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert!(settings.engine.cancel_stale_requests);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let result = Settings::load(Path::new("/nonexistent/irodori.toml"));
        assert!(matches!(result, Err(IrodoriError::Io(_))));
    }

    #[test]
    fn test_name_map_dotted_fallback() {
        let config = HighlightConfig {
            name_map: HashMap::from([
                ("function".to_string(), "fn".to_string()),
                ("function.builtin".to_string(), "builtin".to_string()),
            ]),
        };

        assert_eq!(config.resolve("function.builtin"), "builtin");
        assert_eq!(config.resolve("function.method.call"), "fn");
        assert_eq!(config.resolve("keyword"), "keyword");
    }
}
