//! OpenAPI Compare
//!
//! Semantic comparison of two versions of an OpenAPI document.
//!
//! This library walks two documents in lock-step, matches corresponding
//! elements by semantic key rather than position, and classifies every
//! difference as `info`, `warning` or `error` (breaking) according to a rule
//! table that can be overridden.
//!
//! # Example
//!
//! ```
//! use oas_compare::{compare, load_document_str, Severity};
//!
//! let old = load_document_str(r#"{
//!     "openapi": "3.0.3",
//!     "paths": { "/pets": { "get": { "responses": { "200": {} } } } }
//! }"#).unwrap();
//! let new = load_document_str(r#"{ "openapi": "3.0.3", "paths": {} }"#).unwrap();
//!
//! let records = compare(&old, &new);
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].rule.name(), "path-removed");
//! assert_eq!(records[0].severity, Severity::Error);
//! ```
//!
//! # Directionality
//!
//! Schema constraints are judged by who sends the value:
//!
//! | Change | Request | Response |
//! |--------|---------|----------|
//! | Constraint tightened | `warning` | `error` |
//! | Constraint loosened | `info` | `warning` |
//! | Enum value added | `info` | `warning` |
//!
//! # Rule overrides
//!
//! ```yaml
//! severity:
//!   path-removed: warning
//!   maximum-tightened: { request: error, response: error }
//! ignore:
//!   - operation-id-changed
//! ```

mod compare;
mod error;
mod loader;
mod matcher;
mod model;
mod parser;
mod record;
mod resolver;
mod rules;
mod types;

pub use compare::{compare, compare_with};
pub use error::{ConfigError, LoadError, ResolveError};
pub use loader::{is_url, load_document, load_document_auto, load_document_str};
pub use matcher::{partition, partition_maps, Pairing, Partition};
pub use model::{
    AdditionalProperties, Bound, Components, Document, Header, Malformed, MediaType, Operation,
    Parameter, ParameterShape, PathItem, RefOr, Reference, RequestBody, Response, Schema,
    SecurityRequirement, SecurityScheme, Server,
};
pub use record::{ChangeRecord, Pointer, Summary};
pub use resolver::{resolve, Component, Resolved};
pub use rules::{
    RuleConfig, RuleContext, RuleDefinition, RuleEntry, RuleId, RuleTable, SeverityPolicy,
};
pub use types::{Direction, HttpMethod, ParameterLocation, Severity};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
