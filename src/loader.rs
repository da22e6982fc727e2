//! Document loading from various sources.
//!
//! Handles loading OpenAPI documents from files, strings, and HTTP URLs, in
//! either JSON or YAML. YAML is converted to the JSON data model first, so the
//! comparison never sees which serialization a document came from.

use std::path::Path;

use serde_json::{Map, Number, Value};

use crate::error::LoadError;
use crate::model::Document;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a document from a file path.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist,
/// `LoadError::ReadError` if it can't be read, or a parse error if the
/// content isn't a JSON or YAML object.
pub fn load_document(path: &Path) -> Result<Document, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::debug!("loaded {} ({} bytes)", path.display(), content.len());
    load_document_str(&content)
}

/// Load a document from a JSON or YAML string.
///
/// Content whose first non-blank character is `{` is parsed as JSON,
/// anything else as YAML.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` or `LoadError::InvalidYaml` if the text
/// doesn't parse, and `LoadError::InvalidDocument` if the root isn't an object.
pub fn load_document_str(content: &str) -> Result<Document, LoadError> {
    Document::from_value(&parse_tree(content)?)
}

/// Parse text into a JSON tree.
fn parse_tree(content: &str) -> Result<Value, LoadError> {
    if content.trim_start().starts_with('{') {
        return serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source });
    }
    let yaml: serde_yaml::Value =
        serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml { source })?;
    yaml_to_json(yaml)
}

/// Convert a YAML tree to the JSON data model.
///
/// Scalar mapping keys are stringified (`200:` is a status code, not a
/// number). Tags are dropped.
fn yaml_to_json(yaml: serde_yaml::Value) -> Result<Value, LoadError> {
    use serde_yaml::Value as Yaml;

    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<_, _>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut object = Map::with_capacity(mapping.len());
            for (key, value) in mapping {
                object.insert(yaml_key(key)?, yaml_to_json(value)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key(key: serde_yaml::Value) -> Result<String, LoadError> {
    use serde_yaml::Value as Yaml;

    match key {
        Yaml::String(s) => Ok(s),
        Yaml::Number(n) => Ok(n.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Null => Ok("null".to_string()),
        Yaml::Tagged(tagged) => yaml_key(tagged.value),
        Yaml::Sequence(_) | Yaml::Mapping(_) => Err(LoadError::InvalidDocument {
            message: "mapping keys must be scalars".to_string(),
        }),
    }
}

/// Load a document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails or the server
/// answers with an error status, or a parse error for unusable content.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Document, LoadError> {
    let network_error = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network_error)?;

    let response = client.get(url).send().map_err(network_error)?;

    // Check for HTTP errors before parsing
    let response = response.error_for_status().map_err(network_error)?;
    let content = response.text().map_err(network_error)?;

    tracing::debug!("fetched {} ({} bytes)", url, content.len());
    load_document_str(&content)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a document from a file path or URL.
///
/// Automatically detects whether the source is a URL or file path.
/// URL loading requires the `remote` feature.
///
/// # Errors
///
/// Returns appropriate errors based on the source type.
pub fn load_document_auto(source: &str) -> Result<Document, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}
