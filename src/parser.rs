//! Conversion of a generic JSON tree into the typed document model.
//!
//! The conversion is lenient: only a non-object root is rejected. Inner nodes
//! with the wrong shape become [`RefOr::Malformed`] so that the comparison can
//! report them and carry on with the rest of the tree. Unknown keys are
//! ignored. `x-` keys are extensions in `paths` and `responses`; elsewhere in
//! named maps they are ordinary names.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};

use crate::error::LoadError;
use crate::model::{
    AdditionalProperties, Bound, Components, Document, Header, Malformed, MediaType, Operation,
    Parameter, ParameterShape, PathItem, RefOr, Reference, RequestBody, Response, Schema,
    SecurityRequirement, SecurityScheme, Server,
};
use crate::types::{json_type_name, HttpMethod, ParameterLocation};

type Object = Map<String, Value>;

impl Document {
    /// Build a document from a parsed JSON (or YAML converted to JSON) tree.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::InvalidDocument` if the root is not an object.
    pub fn from_value(value: &Value) -> Result<Document, LoadError> {
        let Value::Object(root) = value else {
            return Err(LoadError::InvalidDocument {
                message: format!(
                    "expected an object at the document root, found {}",
                    json_type_name(value)
                ),
            });
        };

        Ok(Document {
            openapi: root
                .get("openapi")
                .and_then(Value::as_str)
                .map(String::from),
            paths: parse_extensible_map(root.get("paths"), |v| {
                parse_ref_or(v, "path item", parse_path_item)
            }),
            components: root
                .get("components")
                .and_then(Value::as_object)
                .map(parse_components)
                .unwrap_or_default(),
            servers: parse_servers(root.get("servers")),
            security: parse_security(root.get("security")),
        })
    }
}

// --- Generic helpers ---

fn entries(value: Option<&Value>) -> impl Iterator<Item = (&String, &Value)> {
    value
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|map| map.iter())
}

/// Parse a map keyed by user-chosen names (components, headers, media types).
/// Every key is kept, including ones that start with `x-`.
fn parse_map<T>(value: Option<&Value>, parse: impl Fn(&Value) -> T) -> IndexMap<String, T> {
    entries(value)
        .map(|(key, v)| (key.clone(), parse(v)))
        .collect()
}

/// Parse an extensible object (`paths`, `responses`): `x-` keys are
/// extensions, not entries.
fn parse_extensible_map<T>(
    value: Option<&Value>,
    parse: impl Fn(&Value) -> T,
) -> IndexMap<String, T> {
    entries(value)
        .filter(|(key, _)| !key.starts_with("x-"))
        .map(|(key, v)| (key.clone(), parse(v)))
        .collect()
}

fn malformed<T>(expected: &'static str, value: &Value) -> RefOr<T> {
    RefOr::Malformed(Malformed {
        expected,
        found: json_type_name(value).to_string(),
    })
}

/// Parse a node that may be a `$ref`.
fn parse_ref_or<T>(
    value: &Value,
    expected: &'static str,
    parse: impl Fn(&Object) -> Result<T, Malformed>,
) -> RefOr<T> {
    match value {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref") {
                return match reference.as_str() {
                    Some(s) => RefOr::Ref(Reference {
                        reference: s.to_string(),
                    }),
                    None => RefOr::Malformed(Malformed {
                        expected: "reference string",
                        found: json_type_name(reference).to_string(),
                    }),
                };
            }
            match parse(map) {
                Ok(item) => RefOr::Item(item),
                Err(m) => RefOr::Malformed(m),
            }
        }
        other => malformed(expected, other),
    }
}

/// Parse a node that can't be a `$ref` (operations).
fn parse_inline<T>(
    value: &Value,
    expected: &'static str,
    parse: impl Fn(&Object) -> Result<T, Malformed>,
) -> RefOr<T> {
    match value {
        Value::Object(map) => match parse(map) {
            Ok(item) => RefOr::Item(item),
            Err(m) => RefOr::Malformed(m),
        },
        other => malformed(expected, other),
    }
}

fn flag(map: &Object, key: &str) -> bool {
    map.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn string(map: &Object, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(String::from)
}

fn unsigned(map: &Object, key: &str) -> Option<u64> {
    map.get(key).and_then(Value::as_u64)
}

fn number(map: &Object, key: &str) -> Option<f64> {
    map.get(key).and_then(Value::as_f64)
}

// --- Structural nodes ---

fn parse_path_item(map: &Object) -> Result<PathItem, Malformed> {
    let mut operations = IndexMap::new();
    for (key, value) in map {
        if let Some(method) = HttpMethod::parse(key) {
            operations.insert(method, parse_inline(value, "operation", parse_operation));
        }
    }

    Ok(PathItem {
        operations,
        parameters: parse_parameters(map.get("parameters")),
        servers: parse_servers(map.get("servers")),
    })
}

fn parse_operation(map: &Object) -> Result<Operation, Malformed> {
    Ok(Operation {
        operation_id: string(map, "operationId"),
        parameters: parse_parameters(map.get("parameters")),
        request_body: map
            .get("requestBody")
            .map(|v| parse_ref_or(v, "request body", parse_request_body)),
        responses: parse_extensible_map(map.get("responses"), |v| {
            parse_ref_or(v, "response", parse_response)
        }),
        deprecated: flag(map, "deprecated"),
        // Present-but-empty means "no security", absent means "inherit".
        security: map.get("security").map(|v| parse_security(Some(v))),
        servers: parse_servers(map.get("servers")),
    })
}

fn parse_parameters(value: Option<&Value>) -> Vec<RefOr<Parameter>> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| parse_ref_or(v, "parameter", parse_parameter))
            .collect(),
        Some(other) => vec![malformed("parameter list", other)],
    }
}

fn parse_parameter(map: &Object) -> Result<Parameter, Malformed> {
    let name = string(map, "name").ok_or_else(|| Malformed {
        expected: "parameter",
        found: "object without a name".to_string(),
    })?;
    let location_str = string(map, "in").unwrap_or_default();
    let location = ParameterLocation::parse(&location_str).ok_or_else(|| Malformed {
        expected: "parameter",
        found: format!("parameter location \"{}\"", location_str),
    })?;

    let shape = if let Some(schema) = map.get("schema") {
        ParameterShape::Schema(parse_schema(schema))
    } else if map.contains_key("content") {
        ParameterShape::Content(parse_content(map.get("content")))
    } else {
        ParameterShape::Unspecified
    };

    Ok(Parameter {
        name,
        location,
        required: flag(map, "required"),
        deprecated: flag(map, "deprecated"),
        style: string(map, "style"),
        explode: map.get("explode").and_then(Value::as_bool),
        shape,
    })
}

fn parse_request_body(map: &Object) -> Result<RequestBody, Malformed> {
    Ok(RequestBody {
        required: flag(map, "required"),
        content: parse_content(map.get("content")),
    })
}

fn parse_response(map: &Object) -> Result<Response, Malformed> {
    Ok(Response {
        content: parse_content(map.get("content")),
        headers: parse_map(map.get("headers"), |v| {
            parse_ref_or(v, "header", parse_header)
        }),
    })
}

fn parse_header(map: &Object) -> Result<Header, Malformed> {
    Ok(Header {
        required: flag(map, "required"),
        deprecated: flag(map, "deprecated"),
        schema: map.get("schema").map(parse_schema),
    })
}

fn parse_content(value: Option<&Value>) -> IndexMap<String, MediaType> {
    parse_map(value, |v| MediaType {
        schema: v.get("schema").map(parse_schema),
    })
}

fn parse_servers(value: Option<&Value>) -> Vec<Server> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|item| Server {
                    url: item
                        .get("url")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_security(value: Option<&Value>) -> Vec<SecurityRequirement> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .map(|requirement| {
                    requirement
                        .iter()
                        .map(|(scheme, scopes)| {
                            let scopes: Vec<String> = scopes
                                .as_array()
                                .map(|s| {
                                    s.iter()
                                        .filter_map(Value::as_str)
                                        .map(String::from)
                                        .collect()
                                })
                                .unwrap_or_default();
                            (scheme.clone(), scopes)
                        })
                        .collect::<SecurityRequirement>()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_components(map: &Object) -> Components {
    Components {
        schemas: parse_map(map.get("schemas"), parse_schema),
        parameters: parse_map(map.get("parameters"), |v| {
            parse_ref_or(v, "parameter", parse_parameter)
        }),
        responses: parse_map(map.get("responses"), |v| {
            parse_ref_or(v, "response", parse_response)
        }),
        request_bodies: parse_map(map.get("requestBodies"), |v| {
            parse_ref_or(v, "request body", parse_request_body)
        }),
        headers: parse_map(map.get("headers"), |v| {
            parse_ref_or(v, "header", parse_header)
        }),
        path_items: parse_map(map.get("pathItems"), |v| {
            parse_ref_or(v, "path item", parse_path_item)
        }),
        security_schemes: parse_map(map.get("securitySchemes"), |v| SecurityScheme {
            kind: v
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            scheme: v.get("scheme").and_then(Value::as_str).map(String::from),
        }),
    }
}

// --- Schemas ---

fn parse_schema(value: &Value) -> RefOr<Schema> {
    match value {
        // 3.1 boolean schema `true` accepts anything.
        Value::Bool(true) => RefOr::Item(Schema::default()),
        _ => parse_ref_or(value, "schema", parse_schema_object),
    }
}

fn parse_schema_list(value: Option<&Value>) -> Vec<RefOr<Schema>> {
    match value {
        None => Vec::new(),
        Some(Value::Array(items)) => items.iter().map(parse_schema).collect(),
        Some(other) => vec![malformed("schema list", other)],
    }
}

fn parse_schema_object(map: &Object) -> Result<Schema, Malformed> {
    let mut types = BTreeSet::new();
    let mut nullable = flag(map, "nullable");
    match map.get("type") {
        Some(Value::String(t)) => {
            types.insert(t.clone());
        }
        Some(Value::Array(list)) => {
            types.extend(list.iter().filter_map(Value::as_str).map(String::from));
        }
        _ => {}
    }
    if types.remove("null") {
        nullable = true;
    }

    let additional_properties = match map.get("additionalProperties") {
        None | Some(Value::Bool(true)) => AdditionalProperties::Allowed,
        Some(Value::Bool(false)) => AdditionalProperties::Forbidden,
        Some(other) => AdditionalProperties::Schema(Box::new(parse_schema(other))),
    };

    Ok(Schema {
        types,
        format: string(map, "format"),
        nullable,
        enumeration: map.get("enum").and_then(Value::as_array).cloned(),
        minimum: parse_bound(map, "minimum", "exclusiveMinimum", false),
        maximum: parse_bound(map, "maximum", "exclusiveMaximum", true),
        multiple_of: number(map, "multipleOf"),
        min_length: unsigned(map, "minLength"),
        max_length: unsigned(map, "maxLength"),
        pattern: string(map, "pattern"),
        items: map.get("items").map(|v| Box::new(parse_schema(v))),
        min_items: unsigned(map, "minItems"),
        max_items: unsigned(map, "maxItems"),
        unique_items: flag(map, "uniqueItems"),
        properties: map
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| {
                props
                    .iter()
                    .map(|(name, v)| (name.clone(), parse_schema(v)))
                    .collect()
            })
            .unwrap_or_default(),
        required: map
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(String::from)
                    .collect::<IndexSet<_>>()
            })
            .unwrap_or_default(),
        additional_properties,
        all_of: parse_schema_list(map.get("allOf")),
        one_of: parse_schema_list(map.get("oneOf")),
        any_of: parse_schema_list(map.get("anyOf")),
        discriminator: map
            .get("discriminator")
            .and_then(|d| d.get("propertyName"))
            .and_then(Value::as_str)
            .map(String::from),
        default: map.get("default").cloned(),
        read_only: flag(map, "readOnly"),
        write_only: flag(map, "writeOnly"),
        deprecated: flag(map, "deprecated"),
    })
}

/// Read a limit in either the 3.0 (`exclusiveMaximum: true`) or the 3.1
/// (`exclusiveMaximum: 10`) form. When both forms are present the stricter
/// one wins.
fn parse_bound(map: &Object, plain: &str, exclusive: &str, upper: bool) -> Option<Bound> {
    let inclusive = number(map, plain).map(|value| Bound {
        value,
        exclusive: flag(map, exclusive),
    });
    let numeric_exclusive = number(map, exclusive).map(|value| Bound {
        value,
        exclusive: true,
    });

    match (inclusive, numeric_exclusive) {
        (Some(a), Some(b)) => {
            let b_stricter = if upper {
                b.value <= a.value
            } else {
                b.value >= a.value
            };
            Some(if b_stricter { b } else { a })
        }
        (a, b) => a.or(b),
    }
}
