//! Typed in-memory model of an OpenAPI document.
//!
//! Every field the comparison reads is a typed accessor with an explicit
//! absent state. Nodes that may legitimately be a `$ref`, or may turn out to
//! have the wrong shape in malformed input, are wrapped in [`RefOr`]. Build a
//! [`Document`] with [`Document::from_value`](crate::parser) or the
//! [`loader`](crate::loader) functions.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::types::{HttpMethod, ParameterLocation};

/// A node that is either defined inline, referenced, or unusable.
#[derive(Debug, Clone, PartialEq)]
pub enum RefOr<T> {
    Item(T),
    Ref(Reference),
    Malformed(Malformed),
}

impl<T> RefOr<T> {
    pub fn as_item(&self) -> Option<&T> {
        match self {
            RefOr::Item(item) => Some(item),
            _ => None,
        }
    }
}

/// A `$ref` string as written in the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub reference: String,
}

/// A node whose shape doesn't match the expected structural kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Malformed {
    pub expected: &'static str,
    pub found: String,
}

/// Root of a parsed OpenAPI document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Value of the `openapi` field, if present.
    pub openapi: Option<String>,
    pub paths: IndexMap<String, RefOr<PathItem>>,
    pub components: Components,
    pub servers: Vec<Server>,
    pub security: Vec<SecurityRequirement>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathItem {
    pub operations: IndexMap<HttpMethod, RefOr<Operation>>,
    /// Parameters inherited by every operation of this path.
    pub parameters: Vec<RefOr<Parameter>>,
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Operation {
    pub operation_id: Option<String>,
    pub parameters: Vec<RefOr<Parameter>>,
    pub request_body: Option<RefOr<RequestBody>>,
    /// Keyed by status code or `default`.
    pub responses: IndexMap<String, RefOr<Response>>,
    pub deprecated: bool,
    /// `None` inherits the document's security requirements.
    pub security: Option<Vec<SecurityRequirement>>,
    pub servers: Vec<Server>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub deprecated: bool,
    pub style: Option<String>,
    pub explode: Option<bool>,
    pub shape: ParameterShape,
}

impl Parameter {
    /// Style in effect, falling back to the location's default.
    pub fn effective_style(&self) -> &str {
        self.style
            .as_deref()
            .unwrap_or_else(|| self.location.default_style())
    }

    /// Explode in effect: defaults to true for `form` style only.
    pub fn effective_explode(&self) -> bool {
        self.explode
            .unwrap_or_else(|| self.effective_style() == "form")
    }
}

/// How a parameter's value is described.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterShape {
    Schema(RefOr<Schema>),
    Content(IndexMap<String, MediaType>),
    Unspecified,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestBody {
    pub required: bool,
    pub content: IndexMap<String, MediaType>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    pub content: IndexMap<String, MediaType>,
    pub headers: IndexMap<String, RefOr<Header>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub required: bool,
    pub deprecated: bool,
    pub schema: Option<RefOr<Schema>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaType {
    pub schema: Option<RefOr<Schema>>,
}

/// Numeric limit, with the exclusive flag normalised across 3.0 and 3.1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub value: f64,
    pub exclusive: bool,
}

/// What an object schema says about properties it doesn't list.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum AdditionalProperties {
    /// Absent or `true`.
    #[default]
    Allowed,
    /// `false`.
    Forbidden,
    Schema(Box<RefOr<Schema>>),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    /// Non-null types; empty when the schema declares no type.
    pub types: BTreeSet<String>,
    pub format: Option<String>,
    /// 3.0 `nullable: true`, or `"null"` in a 3.1 type list.
    pub nullable: bool,
    pub enumeration: Option<Vec<Value>>,
    pub minimum: Option<Bound>,
    pub maximum: Option<Bound>,
    pub multiple_of: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub pattern: Option<String>,
    pub items: Option<Box<RefOr<Schema>>>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub unique_items: bool,
    pub properties: IndexMap<String, RefOr<Schema>>,
    pub required: IndexSet<String>,
    pub additional_properties: AdditionalProperties,
    pub all_of: Vec<RefOr<Schema>>,
    pub one_of: Vec<RefOr<Schema>>,
    pub any_of: Vec<RefOr<Schema>>,
    /// `discriminator.propertyName`.
    pub discriminator: Option<String>,
    pub default: Option<Value>,
    pub read_only: bool,
    pub write_only: bool,
    pub deprecated: bool,
}

impl Schema {
    /// Human-readable type, e.g. `string` or `integer|string`.
    pub fn type_label(&self) -> String {
        if self.types.is_empty() {
            "any".to_string()
        } else {
            self.types.iter().cloned().collect::<Vec<_>>().join("|")
        }
    }
}

/// Reusable definitions, only reached through references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Components {
    pub schemas: IndexMap<String, RefOr<Schema>>,
    pub parameters: IndexMap<String, RefOr<Parameter>>,
    pub responses: IndexMap<String, RefOr<Response>>,
    pub request_bodies: IndexMap<String, RefOr<RequestBody>>,
    pub headers: IndexMap<String, RefOr<Header>>,
    pub path_items: IndexMap<String, RefOr<PathItem>>,
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SecurityScheme {
    /// `apiKey`, `http`, `oauth2`, `openIdConnect`, ...
    pub kind: String,
    /// HTTP auth scheme such as `bearer`, when `kind` is `http`.
    pub scheme: Option<String>,
}

impl SecurityScheme {
    pub fn label(&self) -> String {
        match &self.scheme {
            Some(scheme) => format!("{}/{}", self.kind, scheme),
            None => self.kind.clone(),
        }
    }
}

/// Scheme name to required scopes. Alternatives are separate requirements.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Server {
    pub url: String,
}
