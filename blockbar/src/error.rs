//! Configuration errors
//!
//! Every variant names the offending location, either the file or the
//! dotted key path inside it (`volume.click.blocking`).

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{location}: required key is missing")]
    MissingKey { location: String },

    #[error("{location}: value must be {expected}")]
    WrongType {
        location: String,
        expected: &'static str,
    },

    #[error("{location}: unknown key")]
    UnknownKey { location: String },

    #[error("{location}: unknown block type '{kind}'")]
    UnknownKind { location: String, kind: String },

    #[error("order: block '{name}' is not defined")]
    UndefinedBlock { name: String },

    #[error("order: block '{name}' is listed more than once")]
    DuplicateInstance { name: String },

    #[error("{location}: {message}")]
    Invalid { location: String, message: String },
}

impl ConfigError {
    pub fn wrong_type(location: &str, expected: &'static str) -> Self {
        ConfigError::WrongType {
            location: location.to_string(),
            expected,
        }
    }

    pub fn invalid(location: &str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            location: location.to_string(),
            message: message.into(),
        }
    }
}
