// src/docs/mod.rs

//! OpenAPI description of the record endpoints.
//!
//! Handlers declare an [`EndpointDoc`] next to themselves; this module only
//! turns that table into an OpenAPI 3.1 document and a browsable page. It
//! never influences routing.

use serde_json::{json, Map, Value};

/// Where the browsable renderer is mounted.
pub const DOCS_PATH: &str = "/api-docs";
/// Where the raw OpenAPI document is mounted.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

/// Body schema referenced by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySchema {
    /// A full record (create).
    Record,
    /// A partial record merged over an existing one (update).
    RecordPatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDoc {
    /// Lower-case HTTP method.
    pub method: &'static str,
    /// OpenAPI-style path, e.g. `/{id}`.
    pub path: &'static str,
    pub operation_id: &'static str,
    pub summary: &'static str,
    pub request_body: Option<BodySchema>,
    pub success_status: u16,
    /// Whether the success response carries the collection.
    pub returns_collection: bool,
}

pub fn build_openapi_document(title: &str, version: &str, endpoints: &[EndpointDoc]) -> Value {
    let mut paths = Map::new();

    for endpoint in endpoints {
        let mut operation = Map::new();
        operation.insert("operationId".to_string(), json!(endpoint.operation_id));
        operation.insert("summary".to_string(), json!(endpoint.summary));

        if endpoint.path.contains("{id}") {
            operation.insert(
                "parameters".to_string(),
                json!([{
                    "name": "id",
                    "in": "path",
                    "required": true,
                    "description": "Numeric record id. Non-numeric values match no record.",
                    "schema": {"type": "string"}
                }]),
            );
        }

        if let Some(body) = endpoint.request_body {
            let component = match body {
                BodySchema::Record => "Record",
                BodySchema::RecordPatch => "RecordPatch",
            };
            operation.insert(
                "requestBody".to_string(),
                json!({
                    "required": true,
                    "content": {
                        "application/json": {
                            "schema": {"$ref": format!("#/components/schemas/{component}")}
                        }
                    }
                }),
            );
        }

        let mut responses = Map::new();
        let success = if endpoint.returns_collection {
            json!({
                "description": "The whole collection after the operation",
                "content": {
                    "application/json": {
                        "schema": {"$ref": "#/components/schemas/Collection"}
                    }
                }
            })
        } else {
            json!({"description": "Success, no content"})
        };
        responses.insert(endpoint.success_status.to_string(), success);
        responses.insert(
            "500".to_string(),
            json!({
                "description": "Storage failure",
                "content": {
                    "application/json": {
                        "schema": {"$ref": "#/components/schemas/ErrorResponse"}
                    }
                }
            }),
        );
        operation.insert("responses".to_string(), Value::Object(responses));

        let path_item = paths
            .entry(endpoint.path.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(methods) = path_item {
            methods.insert(endpoint.method.to_ascii_lowercase(), Value::Object(operation));
        }
    }

    json!({
        "openapi": "3.1.0",
        "info": {
            "title": title,
            "version": version
        },
        "paths": Value::Object(paths),
        "components": {
            "schemas": component_schemas()
        }
    })
}

fn component_schemas() -> Value {
    json!({
        "Record": {
            "type": "object",
            "properties": {
                "id": {"type": "number"}
            },
            "additionalProperties": true,
            "example": {"id": 1, "name": "Ada"}
        },
        "RecordPatch": {
            "type": "object",
            "additionalProperties": true,
            "example": {"name": "Ada L."}
        },
        "Collection": {
            "type": "array",
            "items": {"$ref": "#/components/schemas/Record"}
        },
        "ErrorResponse": {
            "type": "object",
            "properties": {
                "success": {"type": "boolean"},
                "error": {"type": "string"}
            },
            "required": ["success", "error"]
        }
    })
}

/// Swagger UI page pointed at `spec_url`.
pub fn render_docs_page(title: &str, spec_url: &str) -> String {
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <title>{title} API</title>
  <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@5/swagger-ui.css" />
</head>
<body>
  <div id="swagger-ui"></div>
  <script src="https://unpkg.com/swagger-ui-dist@5/swagger-ui-bundle.js" crossorigin></script>
  <script>
    window.onload = () => {{
      window.ui = SwaggerUIBundle({{ url: "{spec_url}", dom_id: "#swagger-ui" }});
    }};
  </script>
</body>
</html>
"##,
        title = escape_html(title),
        spec_url = spec_url,
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
