use thiserror::Error;

/// Top-level error type for the ESG assistant.
///
/// Only loading and serving can fail. The dialogue operations themselves
/// (`classify`, `build_view`, `submit`) are total and never produce one.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EsgError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Duplicate question id in catalog: {0}")]
    DuplicateQuestionId(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for EsgError {
    fn from(err: toml::de::Error) -> Self {
        EsgError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for EsgError {
    fn from(err: toml::ser::Error) -> Self {
        EsgError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for EsgError {
    fn from(err: serde_json::Error) -> Self {
        EsgError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for ESG assistant operations.
pub type Result<T> = std::result::Result<T, EsgError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EsgError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");

        let err = EsgError::DuplicateQuestionId("env-carbon-1".to_string());
        assert_eq!(
            err.to_string(),
            "Duplicate question id in catalog: env-carbon-1"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: EsgError = io_err.into();
        assert!(matches!(err, EsgError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_toml_error_conversion() {
        let parse_err = toml::from_str::<toml::Value>("port = = 1").unwrap_err();
        let err: EsgError = parse_err.into();
        assert!(matches!(err, EsgError::Config(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: EsgError = parse_err.into();
        assert!(matches!(err, EsgError::Serialization(_)));
        assert!(err.to_string().starts_with("Serialization error:"));
    }
}
