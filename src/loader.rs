//! Schema loading.
//!
//! Handles fetching the top-level API schema and per-object schemas over a
//! `Transport`, and parsing schema documents from strings.

use serde_json::Value;
use tracing::debug;

use crate::error::WapiError;
use crate::schema::SchemaDocument;
use crate::transport::{execute, url_join, Method, Query, Transport};

/// Query sent to fetch one object schema with its documentation.
pub const OBJECT_SCHEMA_PARAMS: &[(&str, &str)] =
    &[("_schema", "1"), ("_schema_version", "2"), ("_get_doc", "1")];

/// Query sent to fetch the top-level schema listing supported objects.
pub const API_SCHEMA_PARAMS: &[(&str, &str)] = &[
    ("_schema", "1"),
    ("_schema_version", "2"),
    ("_schema_searchable", "1"),
];

fn to_query(params: &[(&str, &str)]) -> Query {
    params
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Fetch and parse the schema of one object type.
///
/// # Errors
///
/// Returns `WapiError::Http` unchanged when the server answers >= 400, or
/// `WapiError::InvalidSchema` when the body is not a schema document.
pub fn fetch_object_schema(
    transport: &dyn Transport,
    base_url: &str,
    name: &str,
) -> Result<SchemaDocument, WapiError> {
    let url = url_join(base_url, name);
    let raw = execute(transport, Method::Get, &url, &to_query(OBJECT_SCHEMA_PARAMS), None)?;
    let schema = SchemaDocument::from_value(raw)?;
    debug!(object = name, entries = schema.fields.len(), "loaded object schema");
    Ok(schema)
}

/// Fetch the top-level API schema.
///
/// # Errors
///
/// Returns `WapiError::Http` unchanged when the server answers >= 400.
pub fn fetch_api_schema(
    transport: &dyn Transport,
    base_url: &str,
) -> Result<Value, WapiError> {
    execute(transport, Method::Get, base_url, &to_query(API_SCHEMA_PARAMS), None)
}

/// Parse a schema document from a JSON string.
///
/// # Errors
///
/// Returns `WapiError::InvalidJson` if the string isn't valid JSON, or
/// `WapiError::InvalidSchema` if it isn't a schema document.
pub fn load_schema_str(content: &str) -> Result<SchemaDocument, WapiError> {
    let raw: Value =
        serde_json::from_str(content).map_err(|source| WapiError::InvalidJson { source })?;
    SchemaDocument::from_value(raw)
}
