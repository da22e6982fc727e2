//! Error types for document loading, reference resolution and rule configuration.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while turning a document source into a [`Document`](crate::Document).
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid document: {message}")]
    InvalidDocument { message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Reasons a reference or node could not be turned into a usable definition.
///
/// The comparison never propagates these; each one becomes a change record
/// and the affected branch is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("reference {reference} does not name an entry in components")]
    DanglingReference { reference: String },

    #[error("reference {reference} does not point into this document's components")]
    ExternalReference { reference: String },

    #[error("reference {reference} is part of an alias cycle that never reaches a definition")]
    CircularReference { reference: String },

    #[error("expected {expected}, found {found}")]
    StructuralMismatch {
        expected: &'static str,
        found: String,
    },
}

/// Errors while loading a rule configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read rules file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rules file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("unknown rule \"{name}\"")]
    UnknownRule { name: String },
}

impl ConfigError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::Read { .. } => 3,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_exit_codes() {
        let err = LoadError::FileNotFound {
            path: PathBuf::from("old.yaml"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = LoadError::InvalidDocument {
            message: "root is not an object".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn config_error_exit_codes() {
        let err = ConfigError::UnknownRule {
            name: "path-renamed".into(),
        };
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "unknown rule \"path-renamed\"");
    }

    #[test]
    fn resolve_error_display() {
        let err = ResolveError::DanglingReference {
            reference: "#/components/schemas/Pet".into(),
        };
        assert_eq!(
            err.to_string(),
            "reference #/components/schemas/Pet does not name an entry in components"
        );
    }
}
