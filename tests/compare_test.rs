//! Integration tests for document comparison.

use oas_compare::{
    compare, compare_with, ChangeRecord, Document, Pointer, RuleId, RuleTable, Severity,
    SeverityPolicy,
};
use serde_json::{json, Value};

fn doc(value: Value) -> Document {
    Document::from_value(&value).unwrap()
}

fn diff(old: Value, new: Value) -> Vec<ChangeRecord> {
    compare(&doc(old), &doc(new))
}

fn rules(records: &[ChangeRecord]) -> Vec<&'static str> {
    records.iter().map(|r| r.rule.name()).collect()
}

fn pointer(segments: &[&str]) -> Pointer {
    segments.iter().copied().collect()
}

/// `GET /pets` answering 200 with `schema` as JSON.
fn response_doc(schema: Value) -> Value {
    json!({
        "openapi": "3.0.3",
        "paths": {
            "/pets": {
                "get": {
                    "responses": {
                        "200": {
                            "description": "ok",
                            "content": { "application/json": { "schema": schema } }
                        }
                    }
                }
            }
        }
    })
}

/// `POST /pets` taking `schema` as a JSON request body.
fn request_doc(schema: Value) -> Value {
    json!({
        "openapi": "3.0.3",
        "paths": {
            "/pets": {
                "post": {
                    "requestBody": {
                        "content": { "application/json": { "schema": schema } }
                    },
                    "responses": { "201": { "description": "created" } }
                }
            }
        }
    })
}

fn node_components() -> Value {
    json!({
        "schemas": {
            "Node": {
                "type": "object",
                "properties": {
                    "value": { "type": "string" },
                    "children": {
                        "type": "array",
                        "items": { "$ref": "#/components/schemas/Node" }
                    }
                }
            }
        }
    })
}

fn recursive_doc() -> Value {
    let mut value = response_doc(json!({ "$ref": "#/components/schemas/Node" }));
    value["components"] = node_components();
    value
}

// === Concrete Scenarios ===

mod scenarios {
    use super::*;

    #[test]
    fn required_response_property_added() {
        let old = response_doc(json!({
            "type": "object",
            "properties": { "name": { "type": "string" } }
        }));
        let new = response_doc(json!({
            "type": "object",
            "required": ["age"],
            "properties": {
                "name": { "type": "string" },
                "age": { "type": "integer" }
            }
        }));

        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["required-response-property-added"]);
        assert_eq!(records[0].severity, Severity::Warning);
        assert!(records[0].old_location.is_none());
        assert_eq!(
            records[0].new_location,
            Some(pointer(&[
                "paths",
                "/pets",
                "get",
                "responses",
                "200",
                "content",
                "application/json",
                "schema",
                "properties",
                "age"
            ]))
        );
    }

    #[test]
    fn required_path_parameter_removed() {
        let with_param = json!({
            "paths": {
                "/pets/{id}": {
                    "get": {
                        "parameters": [{
                            "name": "id",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "string" }
                        }],
                        "responses": { "200": { "description": "ok" } }
                    }
                }
            }
        });
        let mut without_param = with_param.clone();
        without_param["paths"]["/pets/{id}"]["get"]["parameters"] = json!([]);

        let records = diff(with_param, without_param);
        assert_eq!(rules(&records), vec!["parameter-removed"]);
        assert_eq!(records[0].severity, Severity::Error);
        assert_eq!(
            records[0].old_location,
            Some(pointer(&["paths", "/pets/{id}", "get", "parameters", "id"]))
        );
        assert!(records[0].new_location.is_none());
    }

    #[test]
    fn request_enum_value_added() {
        let old = request_doc(json!({ "type": "string", "enum": ["a", "b"] }));
        let new = request_doc(json!({ "type": "string", "enum": ["a", "b", "c"] }));

        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["enum-value-added"]);
        assert_eq!(records[0].severity, Severity::Info);
        assert!(records[0].message.contains("\"c\""));
    }

    #[test]
    fn recursive_schema_unchanged() {
        assert!(diff(recursive_doc(), recursive_doc()).is_empty());
    }
}

// === Identity ===

mod identity {
    use super::*;

    fn rich_doc() -> Value {
        json!({
            "openapi": "3.1.0",
            "servers": [{ "url": "https://api.example.com/v1" }],
            "security": [{ "apiKey": [] }, { "oauth": ["read", "write"] }],
            "paths": {
                "/pets": {
                    "parameters": [{ "$ref": "#/components/parameters/Limit" }],
                    "get": {
                        "operationId": "listPets",
                        "parameters": [
                            { "name": "tag", "in": "query", "style": "form", "explode": false,
                              "schema": { "type": "array", "items": { "type": "string" } } }
                        ],
                        "responses": {
                            "200": {
                                "description": "ok",
                                "headers": {
                                    "X-Rate-Limit": { "$ref": "#/components/headers/RateLimit" }
                                },
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "array",
                                            "items": { "$ref": "#/components/schemas/Pet" }
                                        }
                                    }
                                }
                            },
                            "default": { "$ref": "#/components/responses/Error" }
                        }
                    },
                    "post": {
                        "security": [],
                        "requestBody": { "$ref": "#/components/requestBodies/NewPet" },
                        "responses": { "201": { "description": "created" } }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Pet": {
                        "type": "object",
                        "required": ["name"],
                        "discriminator": { "propertyName": "kind" },
                        "properties": {
                            "name": { "type": "string", "minLength": 1, "maxLength": 64,
                                      "pattern": "^[a-z]+$" },
                            "kind": { "type": "string", "enum": ["cat", "dog"] },
                            "weight": { "type": ["number", "null"], "minimum": 0,
                                        "exclusiveMaximum": 500 },
                            "owner": { "$ref": "#/components/schemas/Owner" },
                            "id": { "type": "integer", "readOnly": true }
                        },
                        "additionalProperties": false
                    },
                    "Owner": {
                        "allOf": [
                            { "$ref": "#/components/schemas/Person" },
                            { "type": "object", "properties": {
                                "pets": { "type": "array", "items": { "$ref": "#/components/schemas/Pet" } }
                            } }
                        ]
                    },
                    "Person": {
                        "type": "object",
                        "properties": { "name": { "type": "string" } },
                        "additionalProperties": { "type": "string" }
                    },
                    "Error": {
                        "type": "object",
                        "properties": { "message": { "type": "string", "default": "failed" } }
                    }
                },
                "parameters": {
                    "Limit": { "name": "limit", "in": "query",
                               "schema": { "type": "integer", "maximum": 100 } }
                },
                "headers": {
                    "RateLimit": { "required": true, "schema": { "type": "integer" } }
                },
                "responses": {
                    "Error": {
                        "description": "error",
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/Error" } }
                        }
                    }
                },
                "requestBodies": {
                    "NewPet": {
                        "required": true,
                        "content": {
                            "application/json": { "schema": { "$ref": "#/components/schemas/Pet" } },
                            "application/xml": {}
                        }
                    }
                },
                "securitySchemes": {
                    "apiKey": { "type": "apiKey", "in": "header", "name": "X-Key" },
                    "oauth": { "type": "oauth2" }
                }
            }
        })
    }

    #[test]
    fn document_equals_itself() {
        assert!(diff(rich_doc(), rich_doc()).is_empty());
    }

    #[test]
    fn empty_documents() {
        assert!(diff(json!({}), json!({})).is_empty());
    }

    #[test]
    fn extensions_ignored() {
        let old = response_doc(json!({ "type": "string" }));
        let mut new = response_doc(json!({ "type": "string", "x-internal": true }));
        new["paths"]["/pets"]["x-owner"] = json!("team-a");
        new["x-generated"] = json!(true);
        assert!(diff(old, new).is_empty());
    }

    #[test]
    fn extension_named_component() {
        let mut value = response_doc(json!({ "$ref": "#/components/schemas/x-Pet" }));
        value["components"] = json!({
            "schemas": { "x-Pet": { "type": "object", "properties": { "name": { "type": "string" } } } }
        });
        assert!(diff(value.clone(), value.clone()).is_empty());

        let mut new = value.clone();
        new["components"]["schemas"]["x-Pet"]["required"] = json!(["name"]);
        let records = diff(new, value);
        assert_eq!(rules(&records), vec!["property-became-optional"]);
        assert_eq!(
            records[0].old_location,
            Some(pointer(&["components", "schemas", "x-Pet", "required"]))
        );
    }

    #[test]
    fn unreferenced_components_ignored() {
        let old = response_doc(json!({ "type": "string" }));
        let mut new = old.clone();
        new["components"] = json!({ "schemas": { "Unused": { "type": "integer" } } });
        assert!(diff(old, new).is_empty());
    }
}

// === Symmetry Of Kind ===

mod symmetry {
    use super::*;

    /// Compare both ways; each direction must report exactly one record.
    fn both_ways(a: Value, b: Value) -> (ChangeRecord, ChangeRecord) {
        let forward = diff(a.clone(), b.clone());
        let backward = diff(b, a);
        assert_eq!(forward.len(), 1, "forward: {:?}", forward);
        assert_eq!(backward.len(), 1, "backward: {:?}", backward);
        (forward[0].clone(), backward[0].clone())
    }

    #[test]
    fn paths() {
        let (added, removed) = both_ways(json!({}), json!({ "paths": { "/pets": {} } }));
        assert_eq!((added.rule, added.severity), (RuleId::PathAdded, Severity::Info));
        assert_eq!((removed.rule, removed.severity), (RuleId::PathRemoved, Severity::Error));
    }

    #[test]
    fn operations() {
        let a = json!({ "paths": { "/pets": {} } });
        let b = json!({ "paths": { "/pets": { "delete": { "responses": {} } } } });
        let (added, removed) = both_ways(a, b);
        assert_eq!(added.rule, RuleId::OperationAdded);
        assert_eq!(removed.rule, RuleId::OperationRemoved);
        assert_eq!(removed.severity, Severity::Error);
        assert!(removed.message.contains("DELETE /pets"));
    }

    #[test]
    fn optional_parameters() {
        let a = json!({ "paths": { "/pets": { "get": { "responses": {} } } } });
        let b = json!({ "paths": { "/pets": { "get": {
            "parameters": [{ "name": "tag", "in": "query" }],
            "responses": {}
        } } } });
        let (added, removed) = both_ways(a, b);
        assert_eq!((added.rule, added.severity), (RuleId::OptionalParameterAdded, Severity::Warning));
        assert_eq!((removed.rule, removed.severity), (RuleId::ParameterRemoved, Severity::Warning));
    }

    #[test]
    fn required_parameters() {
        let a = json!({ "paths": { "/pets": { "get": { "responses": {} } } } });
        let b = json!({ "paths": { "/pets": { "get": {
            "parameters": [{ "name": "X-Tenant", "in": "header", "required": true }],
            "responses": {}
        } } } });
        let (added, removed) = both_ways(a, b);
        assert_eq!((added.rule, added.severity), (RuleId::RequiredParameterAdded, Severity::Error));
        assert_eq!((removed.rule, removed.severity), (RuleId::ParameterRemoved, Severity::Error));
    }

    #[test]
    fn responses() {
        let a = json!({ "paths": { "/pets": { "get": { "responses": {} } } } });
        let b = json!({ "paths": { "/pets": { "get": {
            "responses": { "404": { "description": "missing" } }
        } } } });
        let (added, removed) = both_ways(a, b);
        assert_eq!((added.rule, added.severity), (RuleId::ResponseAdded, Severity::Info));
        assert_eq!((removed.rule, removed.severity), (RuleId::ResponseRemoved, Severity::Error));
    }

    #[test]
    fn media_types() {
        let a = request_doc(json!({ "type": "string" }));
        let mut b = a.clone();
        b["paths"]["/pets"]["post"]["requestBody"]["content"]["text/plain"] = json!({});
        let (added, removed) = both_ways(a, b);
        assert_eq!((added.rule, added.severity), (RuleId::MediaTypeAdded, Severity::Info));
        assert_eq!((removed.rule, removed.severity), (RuleId::MediaTypeRemoved, Severity::Error));
    }

    #[test]
    fn request_bodies() {
        let a = json!({ "paths": { "/pets": { "post": { "responses": {} } } } });
        let b = json!({ "paths": { "/pets": { "post": {
            "requestBody": { "content": { "application/json": {} } },
            "responses": {}
        } } } });
        let (added, removed) = both_ways(a, b);
        assert_eq!((added.rule, added.severity), (RuleId::RequestBodyAdded, Severity::Info));
        assert_eq!(removed.rule, RuleId::RequestBodyRemoved);
    }

    #[test]
    fn response_headers() {
        let with_header = |headers: Value| {
            json!({ "paths": { "/pets": { "get": {
                "responses": { "200": { "description": "ok", "headers": headers } }
            } } } })
        };
        let a = with_header(json!({}));
        let b = with_header(json!({ "ETag": { "required": true, "schema": { "type": "string" } } }));
        let (added, removed) = both_ways(a, b);
        assert_eq!((added.rule, added.severity), (RuleId::ResponseHeaderAdded, Severity::Info));
        assert_eq!((removed.rule, removed.severity), (RuleId::ResponseHeaderRemoved, Severity::Error));
    }

    #[test]
    fn extension_named_response_headers() {
        let with_header = |headers: Value| {
            json!({ "paths": { "/pets": { "get": {
                "responses": { "200": { "description": "ok", "headers": headers } }
            } } } })
        };
        let a = with_header(json!({}));
        let b = with_header(json!({ "x-request-id": { "required": true } }));
        let (added, removed) = both_ways(a, b);
        assert_eq!((added.rule, added.severity), (RuleId::ResponseHeaderAdded, Severity::Info));
        assert_eq!((removed.rule, removed.severity), (RuleId::ResponseHeaderRemoved, Severity::Error));
        assert!(removed.message.contains("x-request-id"));
    }

    #[test]
    fn response_properties() {
        let a = response_doc(json!({ "type": "object", "properties": {} }));
        let b = response_doc(json!({
            "type": "object",
            "properties": { "nickname": { "type": "string" } }
        }));
        let (added, removed) = both_ways(a, b);
        assert_eq!((added.rule, added.severity), (RuleId::PropertyAdded, Severity::Info));
        assert_eq!((removed.rule, removed.severity), (RuleId::PropertyRemoved, Severity::Error));
    }

    #[test]
    fn enum_values() {
        let a = response_doc(json!({ "type": "string", "enum": ["a"] }));
        let b = response_doc(json!({ "type": "string", "enum": ["a", "b"] }));
        let (added, removed) = both_ways(a, b);
        assert_eq!((added.rule, added.severity), (RuleId::EnumValueAdded, Severity::Warning));
        assert_eq!((removed.rule, removed.severity), (RuleId::EnumValueRemoved, Severity::Error));
    }

    #[test]
    fn nullable() {
        let a = response_doc(json!({ "type": "string" }));
        let b = response_doc(json!({ "type": "string", "nullable": true }));
        let (added, removed) = both_ways(a, b);
        assert_eq!((added.rule, added.severity), (RuleId::NullableAdded, Severity::Info));
        assert_eq!((removed.rule, removed.severity), (RuleId::NullableRemoved, Severity::Error));
    }

    #[test]
    fn security_requirements() {
        let a = json!({ "security": [] });
        let b = json!({ "security": [{ "apiKey": [] }] });
        let (added, removed) = both_ways(a, b);
        assert_eq!((added.rule, added.severity), (RuleId::SecurityRequirementAdded, Severity::Warning));
        assert_eq!((removed.rule, removed.severity), (RuleId::SecurityRequirementRemoved, Severity::Warning));
        assert_eq!(added.new_location, Some(pointer(&["security", "apiKey"])));
    }

    #[test]
    fn servers() {
        let a = json!({});
        let b = json!({ "servers": [{ "url": "https://api.example.com" }] });
        let (added, removed) = both_ways(a, b);
        assert_eq!(added.rule, RuleId::ServerAdded);
        assert_eq!(removed.rule, RuleId::ServerRemoved);
    }

    #[test]
    fn deprecation() {
        let a = json!({ "paths": { "/pets": { "get": { "responses": {} } } } });
        let b = json!({ "paths": { "/pets": { "get": { "deprecated": true, "responses": {} } } } });
        let (added, removed) = both_ways(a, b);
        assert_eq!((added.rule, added.severity), (RuleId::DeprecatedAdded, Severity::Warning));
        assert_eq!(removed.rule, RuleId::DeprecatedRemoved);
    }
}

// === Key-Based Matching ===

mod reordering {
    use super::*;

    #[test]
    fn paths_and_operations_reordered() {
        let old = json!({ "paths": {
            "/a": { "get": { "responses": {} }, "post": { "responses": {} } },
            "/b": { "put": { "responses": {} } }
        } });
        let new = json!({ "paths": {
            "/b": { "put": { "responses": {} } },
            "/a": { "post": { "responses": {} }, "get": { "responses": {} } }
        } });
        assert!(diff(old, new).is_empty());
    }

    #[test]
    fn parameters_reordered() {
        let params = |list: Value| {
            json!({ "paths": { "/pets": { "get": { "parameters": list, "responses": {} } } } })
        };
        let limit = json!({ "name": "limit", "in": "query" });
        let tag = json!({ "name": "tag", "in": "query" });
        let id = json!({ "name": "id", "in": "header" });
        let old = params(json!([limit.clone(), tag.clone(), id.clone()]));
        let new = params(json!([id, limit, tag]));
        assert!(diff(old, new).is_empty());
    }

    #[test]
    fn properties_and_responses_reordered() {
        let old = json!({ "paths": { "/pets": { "get": { "responses": {
            "200": { "content": { "application/json": { "schema": {
                "type": "object",
                "properties": { "a": { "type": "string" }, "b": { "type": "integer" } }
            } } } },
            "404": {}
        } } } } });
        let new = json!({ "paths": { "/pets": { "get": { "responses": {
            "404": {},
            "200": { "content": { "application/json": { "schema": {
                "type": "object",
                "properties": { "b": { "type": "integer" }, "a": { "type": "string" } }
            } } } }
        } } } } });
        assert!(diff(old, new).is_empty());
    }

    #[test]
    fn renamed_parameter_is_remove_and_add() {
        let params = |name: &str| {
            json!({ "paths": { "/pets": { "get": {
                "parameters": [{ "name": name, "in": "query" }],
                "responses": {}
            } } } })
        };
        let records = diff(params("tag"), params("tags"));
        assert_eq!(rules(&records), vec!["optional-parameter-added", "parameter-removed"]);
    }

    #[test]
    fn output_order_follows_new_document() {
        let old = json!({ "paths": { "/gone": {}, "/kept": {} } });
        let new = json!({ "paths": { "/z": {}, "/kept": {}, "/a": {} } });
        let records = diff(old, new);
        let locations: Vec<String> = records
            .iter()
            .map(|r| r.location().unwrap().to_string())
            .collect();
        assert_eq!(locations, vec!["/paths/~1z", "/paths/~1a", "/paths/~1gone"]);
    }
}

// === Reference Cycles ===

mod cycles {
    use super::*;

    fn mutual_doc(extra_b_property: bool) -> Value {
        let mut b_properties = json!({ "a": { "$ref": "#/components/schemas/A" } });
        if extra_b_property {
            b_properties["note"] = json!({ "type": "string" });
        }
        let mut value = response_doc(json!({ "$ref": "#/components/schemas/A" }));
        value["components"] = json!({
            "schemas": {
                "A": { "type": "object", "properties": { "b": { "$ref": "#/components/schemas/B" } } },
                "B": { "type": "object", "properties": b_properties }
            }
        });
        value
    }

    #[test]
    fn self_reference_terminates() {
        let mut new = recursive_doc();
        new["components"]["schemas"]["Node"]["properties"]["value"]["maxLength"] = json!(10);

        let records = diff(recursive_doc(), new);
        assert_eq!(rules(&records), vec!["max-length-tightened"]);
        // Reported once at the component, not once per recursion level.
        assert_eq!(
            records[0].new_location,
            Some(pointer(&["components", "schemas", "Node", "properties", "value"]))
        );
    }

    #[test]
    fn two_cycle_unchanged() {
        assert!(diff(mutual_doc(false), mutual_doc(false)).is_empty());
    }

    #[test]
    fn two_cycle_change_reported_once() {
        let records = diff(mutual_doc(false), mutual_doc(true));
        assert_eq!(rules(&records), vec!["property-added"]);
        assert_eq!(
            records[0].new_location,
            Some(pointer(&["components", "schemas", "B", "properties", "note"]))
        );
    }

    #[test]
    fn renamed_component_still_compared() {
        let old = recursive_doc();
        let text = serde_json::to_string(&recursive_doc())
            .unwrap()
            .replace("Node", "TreeNode");
        let new: Value = serde_json::from_str(&text).unwrap();
        assert!(diff(old, new).is_empty());
    }

    /// `S0` .. `S{n-1}`, each with a property referencing every later one.
    fn dense_doc(width: usize, leaf: Value) -> Value {
        let mut schemas = serde_json::Map::new();
        for i in 0..width {
            let mut properties = serde_json::Map::new();
            for j in (i + 1)..width {
                properties.insert(format!("p{j}"), json!({ "$ref": format!("#/components/schemas/S{j}") }));
            }
            properties.insert("leaf".into(), leaf.clone());
            schemas.insert(format!("S{i}"), json!({ "type": "object", "properties": properties }));
        }
        let mut value = response_doc(json!({ "$ref": "#/components/schemas/S0" }));
        value["components"] = json!({ "schemas": schemas });
        value
    }

    #[test]
    fn shared_components_compared_once() {
        let old = dense_doc(24, json!({ "type": "string" }));
        assert!(diff(old.clone(), old.clone()).is_empty());

        let new = dense_doc(24, json!({ "type": "string", "maxLength": 5 }));
        let records = diff(old, new);
        assert_eq!(records.len(), 24);
        assert!(records.iter().all(|r| r.rule == RuleId::MaxLengthTightened));
        let locations: std::collections::HashSet<_> =
            records.iter().map(|r| r.new_location.clone()).collect();
        assert_eq!(locations.len(), 24);
        assert!(locations.contains(&Some(pointer(&["components", "schemas", "S0", "properties", "leaf"]))));
    }

    #[test]
    fn shared_component_reported_once_per_direction() {
        let components = |max_length: u64| {
            json!({ "schemas": {
                "Pair": { "type": "object", "properties": {
                    "a": { "$ref": "#/components/schemas/Name" },
                    "b": { "$ref": "#/components/schemas/Name" }
                } },
                "Name": { "type": "string", "maxLength": max_length }
            } })
        };
        let pair = || json!({ "$ref": "#/components/schemas/Pair" });
        let document = |max_length: u64| {
            let mut value = response_doc(pair());
            value["paths"]["/pets"]["post"] = json!({
                "requestBody": { "content": { "application/json": { "schema": pair() } } },
                "responses": { "201": { "description": "created" } }
            });
            value["components"] = components(max_length);
            value
        };

        let records = diff(document(10), document(5));
        assert_eq!(rules(&records), vec!["max-length-tightened"; 2]);
        assert!(records
            .iter()
            .all(|r| r.new_location == Some(pointer(&["components", "schemas", "Name"]))));
        let mut severities: Vec<Severity> = records.iter().map(|r| r.severity).collect();
        severities.sort();
        assert_eq!(severities, vec![Severity::Warning, Severity::Error]);
    }

    #[test]
    fn deep_inline_nesting() {
        let mut schema = json!({ "type": "string" });
        for _ in 0..64 {
            schema = json!({ "type": "object", "properties": { "inner": schema } });
        }
        let doc = response_doc(schema);
        assert!(diff(doc.clone(), doc).is_empty());
    }
}

// === Schema Rules ===

mod schema_rules {
    use super::*;

    #[test]
    fn bound_tightening_depends_on_direction() {
        let old = json!({ "type": "string", "maxLength": 20 });
        let new = json!({ "type": "string", "maxLength": 10 });

        let request = diff(request_doc(old.clone()), request_doc(new.clone()));
        assert_eq!(rules(&request), vec!["max-length-tightened"]);
        assert_eq!(request[0].severity, Severity::Warning);

        let response = diff(response_doc(old), response_doc(new));
        assert_eq!(response[0].severity, Severity::Error);
    }

    #[test]
    fn bound_loosening_depends_on_direction() {
        let old = json!({ "type": "integer", "minimum": 10 });
        let new = json!({ "type": "integer", "minimum": 0 });

        let request = diff(request_doc(old.clone()), request_doc(new.clone()));
        assert_eq!(rules(&request), vec!["minimum-loosened"]);
        assert_eq!(request[0].severity, Severity::Info);

        let response = diff(response_doc(old), response_doc(new));
        assert_eq!(response[0].severity, Severity::Warning);
    }

    #[test]
    fn exclusive_bound_at_same_value_tightens() {
        let old = request_doc(json!({ "type": "number", "maximum": 10 }));
        let new = request_doc(json!({ "type": "number", "maximum": 10, "exclusiveMaximum": true }));
        assert_eq!(rules(&diff(old, new)), vec!["maximum-tightened"]);
    }

    #[test]
    fn type_change_stops_descent() {
        let old = response_doc(json!({ "type": "string", "maxLength": 5, "enum": ["x"] }));
        let new = response_doc(json!({ "type": "integer" }));
        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["type-changed"]);
        assert_eq!(records[0].severity, Severity::Error);
        assert!(records[0].message.contains("'string'"));
    }

    #[test]
    fn nullable_forms_are_equivalent() {
        let old = response_doc(json!({ "type": "string", "nullable": true }));
        let new = response_doc(json!({ "type": ["string", "null"] }));
        assert!(diff(old, new).is_empty());
    }

    #[test]
    fn request_property_became_required() {
        let old = request_doc(json!({
            "type": "object",
            "properties": { "name": { "type": "string" } }
        }));
        let new = request_doc(json!({
            "type": "object",
            "required": ["name"],
            "properties": { "name": { "type": "string" } }
        }));
        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["property-became-required"]);
        assert_eq!(records[0].severity, Severity::Error);
    }

    #[test]
    fn required_request_property_added() {
        let old = request_doc(json!({ "type": "object", "properties": {} }));
        let new = request_doc(json!({
            "type": "object",
            "required": ["owner"],
            "properties": { "owner": { "type": "string" } }
        }));
        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["required-request-property-added"]);
        assert_eq!(records[0].severity, Severity::Error);
    }

    #[test]
    fn additional_properties_closed() {
        let old = request_doc(json!({ "type": "object" }));
        let new = request_doc(json!({ "type": "object", "additionalProperties": false }));
        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["additional-properties-removed"]);
        assert_eq!(records[0].severity, Severity::Warning);
    }

    #[test]
    fn composition_length_change_is_one_record() {
        let old = response_doc(json!({ "oneOf": [{ "type": "string" }, { "type": "integer" }] }));
        let new = response_doc(json!({
            "oneOf": [{ "type": "string" }, { "type": "integer" }, { "type": "boolean" }]
        }));
        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["composition-changed"]);
        assert_eq!(records[0].severity, Severity::Warning);
        assert!(records[0].message.contains("oneOf"));
    }

    #[test]
    fn composition_compared_by_position() {
        let old = response_doc(json!({ "anyOf": [{ "type": "string" }, { "type": "integer" }] }));
        let new = response_doc(json!({ "anyOf": [{ "type": "integer" }, { "type": "string" }] }));
        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["type-changed", "type-changed"]);
        assert_eq!(
            records[0].new_location.as_ref().unwrap().segments().last().map(String::as_str),
            Some("0")
        );
    }

    #[test]
    fn enum_constraint_added_and_removed() {
        let free = request_doc(json!({ "type": "string" }));
        let restricted = request_doc(json!({ "type": "string", "enum": ["a"] }));
        assert_eq!(
            rules(&diff(free.clone(), restricted.clone())),
            vec!["enum-constraint-added"]
        );
        assert_eq!(rules(&diff(restricted, free)), vec!["enum-constraint-removed"]);
    }

    #[test]
    fn absent_schema_accepts_anything() {
        let old = json!({ "paths": { "/pets": { "get": { "responses": {
            "200": { "content": { "application/json": {} } }
        } } } } });
        let new = response_doc(json!({ "type": "object" }));
        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["type-changed"]);
        assert!(records[0].message.contains("'any'"));
    }
}

// === Parameters And Security ===

mod operations {
    use super::*;

    #[test]
    fn operation_override_of_path_parameter() {
        let old = json!({ "paths": { "/pets": {
            "parameters": [{ "name": "limit", "in": "query" }],
            "get": { "responses": {} }
        } } });
        let new = json!({ "paths": { "/pets": {
            "parameters": [{ "name": "limit", "in": "query" }],
            "get": {
                "parameters": [{ "name": "limit", "in": "query", "required": true }],
                "responses": {}
            }
        } } });
        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["parameter-became-required"]);
        assert_eq!(
            records[0].old_location,
            Some(pointer(&["paths", "/pets", "parameters", "limit"]))
        );
        assert_eq!(
            records[0].new_location,
            Some(pointer(&["paths", "/pets", "get", "parameters", "limit"]))
        );
    }

    #[test]
    fn same_name_different_location_is_distinct() {
        let op = |location: &str| {
            json!({ "paths": { "/pets": { "get": {
                "parameters": [{ "name": "id", "in": location }],
                "responses": {}
            } } } })
        };
        let records = diff(op("query"), op("header"));
        assert_eq!(rules(&records), vec!["optional-parameter-added", "parameter-removed"]);
    }

    #[test]
    fn parameter_style_change() {
        let op = |style: &str| {
            json!({ "paths": { "/pets": { "get": {
                "parameters": [{ "name": "ids", "in": "query", "style": style, "explode": false }],
                "responses": {}
            } } } })
        };
        let records = diff(op("form"), op("pipeDelimited"));
        assert_eq!(rules(&records), vec!["parameter-serialization-changed"]);
        assert!(records[0].message.contains("pipeDelimited"));
    }

    #[test]
    fn operation_security_override() {
        let old = json!({
            "security": [{ "apiKey": [] }],
            "paths": { "/health": { "get": { "responses": {} } } }
        });
        let mut new = old.clone();
        new["paths"]["/health"]["get"]["security"] = json!([]);

        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["security-requirement-removed"]);
        assert_eq!(
            records[0].old_location,
            Some(pointer(&["paths", "/health", "get", "security", "apiKey"]))
        );
    }

    #[test]
    fn security_scopes() {
        let old = json!({ "security": [{ "oauth": ["read"] }] });
        let new = json!({ "security": [{ "oauth": ["read", "write"] }] });
        let records = diff(old.clone(), new.clone());
        assert_eq!(rules(&records), vec!["security-scope-added"]);
        assert!(records[0].message.contains("'write'"));
        assert_eq!(rules(&diff(new, old)), vec!["security-scope-removed"]);
    }

    #[test]
    fn security_scheme_type_changed() {
        let scheme = |definition: Value| {
            json!({
                "security": [{ "auth": [] }],
                "components": { "securitySchemes": { "auth": definition } }
            })
        };
        let old = scheme(json!({ "type": "apiKey", "in": "header", "name": "X-Key" }));
        let new = scheme(json!({ "type": "http", "scheme": "bearer" }));
        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["security-scheme-type-changed"]);
        assert!(records[0].message.contains("http/bearer"));
        assert_eq!(
            records[0].new_location,
            Some(pointer(&["components", "securitySchemes", "auth"]))
        );
    }

    #[test]
    fn security_scheme_type_changed_once_per_document() {
        let scheme = |definition: Value| {
            let operation = json!({ "security": [{ "auth": [] }], "responses": {} });
            json!({
                "security": [{ "auth": [] }],
                "paths": {
                    "/pets": { "get": operation.clone(), "post": operation.clone() },
                    "/owners": { "get": operation }
                },
                "components": { "securitySchemes": { "auth": definition } }
            })
        };
        let old = scheme(json!({ "type": "apiKey", "in": "header", "name": "X-Key" }));
        let new = scheme(json!({ "type": "http", "scheme": "bearer" }));
        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["security-scheme-type-changed"]);
        assert_eq!(
            records[0].old_location,
            Some(pointer(&["components", "securitySchemes", "auth"]))
        );
    }

    #[test]
    fn operation_id_changed() {
        let op = |id: &str| {
            json!({ "paths": { "/pets": { "get": { "operationId": id, "responses": {} } } } })
        };
        let records = diff(op("listPets"), op("getPets"));
        assert_eq!(rules(&records), vec!["operation-id-changed"]);
    }

    #[test]
    fn request_body_became_required() {
        let op = |required: bool| {
            json!({ "paths": { "/pets": { "post": {
                "requestBody": { "required": required, "content": {} },
                "responses": {}
            } } } })
        };
        let records = diff(op(false), op(true));
        assert_eq!(rules(&records), vec!["request-body-became-required"]);
        assert_eq!(records[0].severity, Severity::Error);
    }
}

// === Unresolvable Input ===

mod degraded {
    use super::*;

    #[test]
    fn dangling_reference_on_both_sides() {
        let value = response_doc(json!({ "$ref": "#/components/schemas/Missing" }));
        let records = diff(value.clone(), value);
        assert_eq!(rules(&records), vec!["unresolved-reference"]);
        assert_eq!(records[0].severity, Severity::Error);
        assert!(records[0].old_location.is_some());
        assert!(records[0].new_location.is_some());
    }

    #[test]
    fn dangling_reference_does_not_stop_walk() {
        let mut old = response_doc(json!({ "type": "string" }));
        old["paths"]["/legacy"] = json!({});
        let new = response_doc(json!({ "$ref": "#/components/schemas/Missing" }));

        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["unresolved-reference", "path-removed"]);
        assert!(records[0].old_location.is_none());
        assert!(records[0].message.contains("Missing"));
    }

    #[test]
    fn external_reference_reported() {
        let value = response_doc(json!({ "$ref": "common.yaml#/Pet" }));
        let records = diff(value.clone(), value);
        assert_eq!(rules(&records), vec!["unresolved-reference"]);
    }

    #[test]
    fn wrong_section_is_structural_mismatch() {
        let value = json!({
            "paths": { "/pets": { "get": {
                "parameters": [{ "$ref": "#/components/schemas/Pet" }],
                "responses": {}
            } } },
            "components": { "schemas": { "Pet": { "type": "object" } } }
        });
        let records = diff(value.clone(), value);
        assert_eq!(rules(&records), vec!["structural-mismatch"]);
        assert_eq!(
            records[0].old_location,
            Some(pointer(&["paths", "/pets", "get", "parameters", "0"]))
        );
    }

    #[test]
    fn malformed_schema_on_one_side() {
        let old = response_doc(json!({
            "type": "object",
            "properties": { "name": { "type": "string" } }
        }));
        let new = response_doc(json!({
            "type": "object",
            "properties": { "name": 42 }
        }));
        let records = diff(old, new);
        assert_eq!(rules(&records), vec!["structural-mismatch"]);
        assert!(records[0].old_location.is_none());
        assert!(records[0].message.contains("number"));
    }
}

// === Configuration ===

mod configured {
    use super::*;

    #[test]
    fn severity_override() {
        let table = RuleTable::new().with_override(
            RuleId::PathRemoved,
            SeverityPolicy::Fixed(Severity::Warning),
        );
        let records = compare_with(
            &doc(json!({ "paths": { "/pets": {} } })),
            &doc(json!({})),
            &table,
        );
        assert_eq!(records[0].severity, Severity::Warning);
    }

    #[test]
    fn ignored_rule() {
        let table = RuleTable::new().ignore(RuleId::OperationIdChanged);
        let op = |id: &str| {
            doc(json!({ "paths": { "/pets": { "get": { "operationId": id, "responses": {} } } } }))
        };
        assert!(compare_with(&op("a"), &op("b"), &table).is_empty());
    }
}

// === Rendering ===

mod rendering {
    use super::*;

    #[test]
    fn json_round_trip() {
        let old = response_doc(json!({ "type": "string", "enum": ["a", "b"] }));
        let mut new = response_doc(json!({ "type": "string", "enum": ["a", "c"] }));
        new["paths"]["/new"] = json!({});
        let records = diff(old, new);
        assert!(records.len() >= 3);

        let encoded = serde_json::to_string(&records).unwrap();
        let decoded: Vec<ChangeRecord> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, records);
    }

    #[test]
    fn json_shape() {
        let records = diff(json!({ "paths": { "/pets": {} } }), json!({}));
        let value = serde_json::to_value(&records).unwrap();
        assert_eq!(
            value,
            json!([{
                "severity": "error",
                "rule": "path-removed",
                "message": "The path '/pets' was removed.",
                "old_location": ["paths", "/pets"]
            }])
        );
    }

    #[test]
    fn text_line() {
        let records = diff(json!({}), json!({ "paths": { "/pets": {} } }));
        assert_eq!(
            records[0].to_string(),
            "info[path-added]: /paths/~1pets - The path '/pets' was added."
        );
    }
}
