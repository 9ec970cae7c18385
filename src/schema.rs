//! Typed WAPI object schema.
//!
//! The server describes every object type with a JSON document listing its
//! fields. Each entry carries compact capability strings (`"rwus"`), a
//! `searchable_by` operator string and, for `struct` and `funccall` entries,
//! a nested schema. This module parses that document once into an immutable
//! tree with every capability string already decoded, at every nesting level.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::WapiError;
use crate::types::{decode_searchable_by, decode_supports, Capability, CapabilitySet};

/// One field or function declared by an object schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub is_array: bool,
    /// Declared type tags (`string`, `uint`, `enum`, struct type names...).
    #[serde(rename = "type")]
    pub value_types: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    pub supports: CapabilitySet,
    pub searchable_by: BTreeSet<char>,
    /// Returned by a plain fetch without `_return_fields`.
    pub standard_field: bool,
    /// Mandatory on create.
    pub supports_inline_funccall: bool,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Shape of a schema entry, discriminated by `wapi_primitive`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "wapi_primitive", rename_all = "lowercase")]
pub enum FieldKind {
    Plain,
    Struct {
        fields: Vec<FieldSpec>,
    },
    Funccall {
        input_fields: Vec<FieldSpec>,
        output_fields: Vec<FieldSpec>,
    },
}

impl FieldSpec {
    pub fn is_function(&self) -> bool {
        matches!(self.kind, FieldKind::Funccall { .. })
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.kind, FieldKind::Struct { .. })
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.supports.contains(&capability)
    }

    /// A field whose only capability is `search` can filter but never be returned.
    pub fn is_search_only(&self) -> bool {
        self.supports.len() == 1 && self.supports(Capability::Search)
    }

    /// Children of a struct field. Empty for every other kind.
    pub fn struct_fields(&self) -> &[FieldSpec] {
        match &self.kind {
            FieldKind::Struct { fields } => fields,
            _ => &[],
        }
    }

    /// Declared input of a function. Empty for every other kind.
    pub fn input_fields(&self) -> &[FieldSpec] {
        match &self.kind {
            FieldKind::Funccall { input_fields, .. } => input_fields,
            _ => &[],
        }
    }

    pub fn output_fields(&self) -> &[FieldSpec] {
        match &self.kind {
            FieldKind::Funccall { output_fields, .. } => output_fields,
            _ => &[],
        }
    }

    pub fn input_field(&self, name: &str) -> Option<&FieldSpec> {
        self.input_fields().iter().find(|f| f.name == name)
    }
}

/// Parsed schema of one object type.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDocument {
    pub type_name: String,
    pub version: Option<String>,
    /// Every entry in declaration order, functions included.
    pub fields: Vec<FieldSpec>,
    raw: Value,
}

impl SchemaDocument {
    /// Parse a schema document as returned by the server.
    ///
    /// # Errors
    ///
    /// Returns `WapiError::InvalidSchema` if the document has no usable `fields` list.
    pub fn from_value(raw: Value) -> Result<Self, WapiError> {
        let doc = RawDocument::deserialize(&raw).map_err(|e| WapiError::InvalidSchema {
            message: e.to_string(),
        })?;

        Ok(Self {
            type_name: doc.type_name,
            version: doc.version,
            fields: doc.fields.into_iter().map(FieldSpec::from).collect(),
            raw,
        })
    }

    /// The document exactly as the server sent it.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Look up a data field. Functions are never returned here.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields
            .iter()
            .find(|f| !f.is_function() && f.name == name)
    }

    /// Look up a function entry.
    pub fn function(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.is_function() && f.name == name)
    }

    pub fn index(&self) -> FieldIndex {
        FieldIndex::build(&self.fields)
    }
}

/// Name lists derived from a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldIndex {
    pub fields: Vec<String>,
    pub functions: Vec<String>,
    pub default_get_fields: Vec<String>,
    pub default_post_fields: Vec<String>,
}

impl FieldIndex {
    pub fn build(entries: &[FieldSpec]) -> Self {
        let mut index = FieldIndex::default();
        for entry in entries {
            if entry.is_function() {
                index.functions.push(entry.name.clone());
                continue;
            }
            if entry.standard_field {
                index.default_get_fields.push(entry.name.clone());
            }
            if entry.supports_inline_funccall {
                index.default_post_fields.push(entry.name.clone());
            }
            index.fields.push(entry.name.clone());
        }
        index
    }
}

// --- Raw wire format ---

#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default, rename = "type")]
    type_name: String,
    #[serde(default)]
    version: Option<String>,
    fields: Vec<RawField>,
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(default)]
    doc: Option<String>,
    #[serde(default)]
    is_array: bool,
    #[serde(default, rename = "type")]
    value_types: Vec<String>,
    #[serde(default)]
    enum_values: Vec<Value>,
    #[serde(default)]
    supports: String,
    #[serde(default)]
    searchable_by: String,
    #[serde(default)]
    standard_field: bool,
    #[serde(default)]
    supports_inline_funccall: bool,
    #[serde(default)]
    wapi_primitive: Option<String>,
    #[serde(default)]
    schema: Option<RawNested>,
}

#[derive(Debug, Default, Deserialize)]
struct RawNested {
    #[serde(default)]
    fields: Vec<RawField>,
    #[serde(default)]
    input_fields: Vec<RawField>,
    #[serde(default)]
    output_fields: Vec<RawField>,
}

fn convert_all(raw: Vec<RawField>) -> Vec<FieldSpec> {
    raw.into_iter().map(FieldSpec::from).collect()
}

impl From<RawField> for FieldSpec {
    fn from(raw: RawField) -> Self {
        let nested = raw.schema.unwrap_or_default();
        let kind = match raw.wapi_primitive.as_deref() {
            Some("struct") => FieldKind::Struct {
                fields: convert_all(nested.fields),
            },
            Some("funccall") => FieldKind::Funccall {
                input_fields: convert_all(nested.input_fields),
                output_fields: convert_all(nested.output_fields),
            },
            _ => FieldKind::Plain,
        };

        FieldSpec {
            name: raw.name,
            doc: raw.doc,
            is_array: raw.is_array,
            value_types: raw.value_types,
            enum_values: raw.enum_values,
            supports: decode_supports(&raw.supports),
            searchable_by: decode_searchable_by(&raw.searchable_by),
            standard_field: raw.standard_field,
            supports_inline_funccall: raw.supports_inline_funccall,
            kind,
        }
    }
}
