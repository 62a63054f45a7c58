//! OpenAPI 3.1 document generation.
//!
//! Walks the same registry the router is built from, so the document lists
//! exactly the routes that are served. Documentation metadata only adds
//! descriptions; routes without any still appear with a generic `200`.

use serde_json::{Map, Value, json};

use crate::builder::resolve_path;
use crate::controller::ControllerType;
use crate::registry::{DocMetadata, Registry};

const OPENAPI_VERSION: &str = "3.1.0";

/// Document header fields.
#[derive(Clone, Debug)]
pub struct ApiInfo {
    pub title: String,
    pub version: String,
    pub description: Option<String>,
}

/// Builds the document for `controllers`, with every path under `prefix`.
pub fn document(registry: &Registry, controllers: &[ControllerType], prefix: &str, info: &ApiInfo) -> Value {
    let mut paths = Map::new();

    for controller in controllers {
        let id = controller.id();
        let Some(meta) = registry.controller_metadata(id) else {
            continue;
        };
        for route in registry.routes(id) {
            let full = resolve_path(prefix, &resolve_path(&meta.base_path, &route.path));
            let docs = registry.docs(id, &route.handler);
            let item = paths.entry(full).or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(ops) = item {
                ops.insert(route.method.as_lower().to_owned(), operation(docs));
            }
        }
    }

    let mut info_obj = json!({ "title": info.title, "version": info.version });
    if let Some(description) = &info.description {
        info_obj["description"] = json!(description);
    }

    json!({
        "openapi": OPENAPI_VERSION,
        "info": info_obj,
        "paths": paths,
    })
}

fn operation(docs: Option<&DocMetadata>) -> Value {
    let mut op = Map::new();
    if let Some(docs) = docs {
        if let Some(summary) = &docs.summary {
            op.insert("summary".into(), json!(summary));
        }
        if let Some(description) = &docs.description {
            op.insert("description".into(), json!(description));
        }
        if !docs.tags.is_empty() {
            op.insert("tags".into(), json!(docs.tags));
        }
        if let Some(id) = &docs.operation_id {
            op.insert("operationId".into(), json!(id));
        }
        let parameters = build_parameters(docs);
        if !parameters.is_empty() {
            op.insert("parameters".into(), Value::Array(parameters));
        }
        if let Some(body) = build_request_body(docs) {
            op.insert("requestBody".into(), body);
        }
    }
    op.insert("responses".into(), build_responses(docs));
    Value::Object(op)
}

/// Query and path parameters. Path parameters are always required.
pub fn build_parameters(docs: &DocMetadata) -> Vec<Value> {
    let mut out = Vec::new();
    if let Some(query) = &docs.request.query {
        out.extend(schema_to_parameters(query, "query"));
    }
    if let Some(params) = &docs.request.params {
        out.extend(schema_to_parameters(params, "path"));
    }
    out
}

pub fn build_request_body(docs: &DocMetadata) -> Option<Value> {
    let schema = docs.request.body.as_ref().filter(|s| s.is_object())?;
    Some(json!({
        "required": true,
        "content": { "application/json": { "schema": schema } },
    }))
}

/// Declared responses, or a single generic `200` when none are declared.
pub fn build_responses(docs: Option<&DocMetadata>) -> Value {
    let mut out = Map::new();
    match docs.filter(|d| !d.responses.is_empty()) {
        Some(docs) => {
            for (status, response) in &docs.responses {
                let description = if response.description.is_empty() { "Success" } else { &response.description };
                let mut entry = json!({ "description": description });
                if let Some(schema) = response.schema.as_ref().filter(|s| s.is_object()) {
                    entry["content"] = json!({ "application/json": { "schema": schema } });
                }
                out.insert(status.clone(), entry);
            }
        }
        None => {
            out.insert("200".into(), json!({ "description": "Success" }));
        }
    }
    Value::Object(out)
}

/// Expands an object schema into one parameter per property. Anything that
/// is not `{"type": "object", "properties": {...}}` yields nothing.
fn schema_to_parameters(schema: &Value, location: &str) -> Vec<Value> {
    if schema.get("type").and_then(Value::as_str) != Some("object") {
        return Vec::new();
    }
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, definition)| {
            json!({
                "name": name,
                "in": location,
                "required": location == "path" || required.contains(&name.as_str()),
                "schema": definition,
            })
        })
        .collect()
}
