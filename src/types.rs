//! Core types for WAPI schema capabilities.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Characters that may trail a search key as modifiers (`name~`, `ttl>=`).
pub const SEARCH_MODIFIERS: &[char] = &['~', '=', '<', '>', '!', ':'];

/// Return field token that is never looked up in the schema.
pub const EXTATTRS_FIELD: &str = "extattrs";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Operation a field supports, as declared in its `supports` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Read,
    Search,
    Update,
    Write,
}

impl Capability {
    /// Parse one capability character.
    ///
    /// Returns `None` for characters the client does not know about.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'r' => Some(Self::Read),
            's' => Some(Self::Search),
            'u' => Some(Self::Update),
            'w' => Some(Self::Write),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Search => "search",
            Self::Update => "update",
            Self::Write => "write",
        }
    }
}

/// Decoded set of capabilities.
pub type CapabilitySet = BTreeSet<Capability>;

/// Decode a capability string such as `"rwus"`.
///
/// Unknown characters are dropped so newer servers can add capabilities.
pub fn decode_supports(raw: &str) -> CapabilitySet {
    raw.chars().filter_map(Capability::from_char).collect()
}

/// Decode a `searchable_by` string. Every character is an operator on its own.
pub fn decode_searchable_by(raw: &str) -> BTreeSet<char> {
    raw.chars().collect()
}

/// Render a capability set for error messages, e.g. `[read, search]`.
pub fn describe_capabilities(set: &CapabilitySet) -> String {
    let names: Vec<&str> = set.iter().map(Capability::as_str).collect();
    format!("[{}]", names.join(", "))
}

/// Native JSON type a WAPI type tag maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeType {
    Integer,
    Boolean,
    String,
}

impl NativeType {
    /// Map a declared WAPI type tag. Anything that is not numeric or boolean is a string.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "int" | "uint" | "timestamp" => Self::Integer,
            "bool" => Self::Boolean,
            _ => Self::String,
        }
    }

    /// Whether `value` has this native type. Booleans never pass as integers.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::String => value.is_string(),
        }
    }
}

/// Data format requested with `_return_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReturnType {
    #[default]
    Json,
    JsonPretty,
    Xml,
    XmlPretty,
}

impl ReturnType {
    pub const VALUES: &'static [&'static str] = &["json", "json-pretty", "xml", "xml-pretty"];

    /// Parse a return type. Matching is exact.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "json" => Some(Self::Json),
            "json-pretty" => Some(Self::JsonPretty),
            "xml" => Some(Self::Xml),
            "xml-pretty" => Some(Self::XmlPretty),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::JsonPretty => "json-pretty",
            Self::Xml => "xml",
            Self::XmlPretty => "xml-pretty",
        }
    }
}

/// Where a search is processed: on the grid master or on the local member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxySearch {
    GridMaster,
    Local,
}

impl ProxySearch {
    /// Parse a proxy search value, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "GM" => Some(Self::GridMaster),
            "LOCAL" => Some(Self::Local),
            _ => None,
        }
    }

    /// Wire value, always uppercase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GridMaster => "GM",
            Self::Local => "LOCAL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_supports_empty() {
        assert!(decode_supports("").is_empty());
    }

    #[test]
    fn decode_supports_known_characters() {
        let set = decode_supports("wu");
        assert_eq!(set, BTreeSet::from([Capability::Write, Capability::Update]));

        let set = decode_supports("srwu");
        assert_eq!(
            set,
            BTreeSet::from([
                Capability::Search,
                Capability::Read,
                Capability::Write,
                Capability::Update,
            ])
        );
    }

    #[test]
    fn decode_supports_ignores_unknown_characters() {
        assert_eq!(decode_supports("rf"), BTreeSet::from([Capability::Read]));
    }

    #[test]
    fn decode_searchable_by_keeps_characters_literally() {
        let set = decode_searchable_by(":=~");
        assert_eq!(set, BTreeSet::from([':', '=', '~']));
        assert!(decode_searchable_by("").is_empty());
    }

    #[test]
    fn describe_capabilities_is_ordered() {
        assert_eq!(
            describe_capabilities(&decode_supports("wsr")),
            "[read, search, write]"
        );
    }

    #[test]
    fn native_type_mapping() {
        assert_eq!(NativeType::from_tag("int"), NativeType::Integer);
        assert_eq!(NativeType::from_tag("uint"), NativeType::Integer);
        assert_eq!(NativeType::from_tag("timestamp"), NativeType::Integer);
        assert_eq!(NativeType::from_tag("bool"), NativeType::Boolean);
        assert_eq!(NativeType::from_tag("string"), NativeType::String);
        assert_eq!(NativeType::from_tag("dhcpoption"), NativeType::String);
    }

    #[test]
    fn native_type_rejects_bool_as_integer() {
        assert!(NativeType::Integer.accepts(&json!(4)));
        assert!(NativeType::Integer.accepts(&json!(-1)));
        assert!(!NativeType::Integer.accepts(&json!(true)));
        assert!(!NativeType::Integer.accepts(&json!(1.5)));
        assert!(!NativeType::String.accepts(&json!(false)));
    }

    #[test]
    fn return_type_parse() {
        for value in ReturnType::VALUES {
            assert_eq!(ReturnType::parse(value).unwrap().as_str(), *value);
        }
        assert_eq!(ReturnType::parse("JSON"), None);
        assert_eq!(ReturnType::parse("yaml"), None);
    }

    #[test]
    fn proxy_search_is_case_insensitive() {
        assert_eq!(ProxySearch::parse("gm"), Some(ProxySearch::GridMaster));
        assert_eq!(ProxySearch::parse("Local"), Some(ProxySearch::Local));
        assert_eq!(ProxySearch::parse("master"), None);
        assert_eq!(ProxySearch::Local.as_str(), "LOCAL");
    }
}
