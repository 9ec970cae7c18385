//! Field value and search parameter validation against an object schema.
//!
//! Value checking follows a fixed order:
//!
//! 1. a field declaring `enum_values` accepts exactly one of those literals;
//! 2. a scalar struct field accepts any JSON object (its keys are not checked);
//! 3. a scalar plain field accepts the native types its tags map to;
//! 4. an array field accepts a JSON array whose items each pass 2 or 3.
//!
//! | WAPI tag | accepted JSON |
//! |----------|---------------|
//! | `int`, `uint`, `timestamp` | integer |
//! | `bool` | boolean |
//! | anything else | string |

use serde_json::{Map, Value};

use crate::error::WapiError;
use crate::schema::{FieldSpec, SchemaDocument};
use crate::types::{NativeType, EXTATTRS_FIELD, SEARCH_MODIFIERS};

/// Checks field names and values against one object schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldValidator<'a> {
    object: &'a str,
    schema: &'a SchemaDocument,
}

impl<'a> FieldValidator<'a> {
    /// `object` is the object type name used in error messages.
    pub fn new(object: &'a str, schema: &'a SchemaDocument) -> Self {
        Self { object, schema }
    }

    /// Resolve a data field by name.
    ///
    /// # Errors
    ///
    /// Returns `WapiError::FieldNotFound` for unknown names and for function names.
    pub fn field(&self, name: &str) -> Result<&'a FieldSpec, WapiError> {
        self.schema
            .field(name)
            .ok_or_else(|| WapiError::FieldNotFound {
                object: self.object.to_string(),
                field: name.to_string(),
            })
    }

    /// Check a value for a field, looking the field up when `field_info` is `None`.
    pub fn check_value(
        &self,
        name: &str,
        value: &Value,
        field_info: Option<&FieldSpec>,
    ) -> Result<(), WapiError> {
        let spec = match field_info {
            Some(spec) => spec,
            None => self.field(name)?,
        };
        check_field_value(name, value, spec)
    }

    /// Validate GET filters.
    ///
    /// Keys starting with `*` are extensible attribute searches and pass
    /// through unchecked. Other keys are a field name followed by optional
    /// search modifiers (`comment~`, `lease_scavenge_time>=`), each of which
    /// must be declared in the field's `searchable_by`.
    pub fn validate_search_params(&self, params: &Map<String, Value>) -> Result<(), WapiError> {
        for (key, value) in params {
            if key.starts_with('*') {
                continue;
            }
            let (name, modifiers) = split_search_key(key);
            let spec = self.field(name)?;

            for modifier in modifiers.chars() {
                if !spec.searchable_by.contains(&modifier) {
                    let allowed: String = spec.searchable_by.iter().collect();
                    return Err(WapiError::NotSearchableField(if allowed.is_empty() {
                        format!("{} is not a valid modifier for field {}, this field cannot be searched with modifiers", modifier, name)
                    } else {
                        format!(
                            "{} is not a valid modifier for field {}, valid modifiers are: {}",
                            modifier, name, allowed
                        )
                    }));
                }
            }

            check_field_value(name, value, spec)?;
        }
        Ok(())
    }

    /// Validate names requested through `_return_fields` / `_return_fields+`.
    ///
    /// `extattrs` and sub-object paths (`a.b`) are not looked up. Every other
    /// name must be a known field that is not search-only.
    pub fn validate_return_fields<S: AsRef<str>>(&self, fields: &[S]) -> Result<(), WapiError> {
        for field in fields {
            let field = field.as_ref();
            if field == EXTATTRS_FIELD {
                continue;
            }
            if field.trim_matches('.').contains('.') {
                continue;
            }
            let spec = self.field(field)?;
            if spec.is_search_only() {
                return Err(WapiError::SearchOnlyField(format!(
                    "{} is a search only field. It cannot be returned",
                    field
                )));
            }
        }
        Ok(())
    }
}

/// Split a search key into its field name and trailing modifiers.
///
/// `"ttl>="` gives `("ttl", ">=")`, `"comment"` gives `("comment", "")`.
pub fn split_search_key(key: &str) -> (&str, &str) {
    let name = key.trim_end_matches(SEARCH_MODIFIERS);
    (name, &key[name.len()..])
}

/// Check a value against a field spec without any lookup.
///
/// # Errors
///
/// Returns `WapiError::Field` describing the expected values or types and the
/// offending value.
pub fn check_field_value(name: &str, value: &Value, spec: &FieldSpec) -> Result<(), WapiError> {
    if !spec.enum_values.is_empty() {
        if spec.enum_values.contains(value) {
            return Ok(());
        }
        return Err(WapiError::Field(format!(
            "{} must have one of the following values: {} but you provide {}",
            name,
            describe_list(&spec.enum_values),
            display_value(value)
        )));
    }

    if !spec.is_array {
        return check_single_value(name, value, spec, false);
    }

    let Value::Array(items) = value else {
        return Err(WapiError::Field(format!(
            "{} must be a list of values, but you provide {}",
            name,
            display_value(value)
        )));
    };
    for item in items {
        check_single_value(name, item, spec, true)?;
    }
    Ok(())
}

fn check_single_value(
    name: &str,
    value: &Value,
    spec: &FieldSpec,
    in_list: bool,
) -> Result<(), WapiError> {
    let prefix = if in_list { "each item of " } else { "" };

    if spec.is_struct() {
        // Struct contents are accepted as-is; only the shape is checked.
        if value.is_object() {
            return Ok(());
        }
        return Err(WapiError::Field(format!(
            "{}{} must be an object but you provide {}",
            prefix,
            name,
            display_value(value)
        )));
    }

    let accepted = spec
        .value_types
        .iter()
        .any(|tag| NativeType::from_tag(tag).accepts(value));
    if accepted {
        return Ok(());
    }
    Err(WapiError::Field(format!(
        "{}{} must have one of the following types: [{}] but you provide {}",
        prefix,
        name,
        spec.value_types.join(", "),
        display_value(value)
    )))
}

/// Strings are shown bare, everything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn describe_list(values: &[Value]) -> String {
    let items: Vec<String> = values.iter().map(display_value).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::network_schema;
    use serde_json::json;

    fn schema() -> SchemaDocument {
        SchemaDocument::from_value(network_schema()).unwrap()
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn enum_field_accepts_members_only() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);

        assert!(validator
            .check_value("dhcp_utilization_status", &json!("FULL"), None)
            .is_ok());

        let err = validator
            .check_value("dhcp_utilization_status", &json!("foo"), None)
            .unwrap_err();
        assert!(matches!(err, WapiError::Field(_)));
        assert!(err.to_string().contains("[FULL, HIGH, LOW, NORMAL]"));
        assert!(err.to_string().ends_with("but you provide foo"));
    }

    #[test]
    fn enum_check_is_literal() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);
        assert!(validator
            .check_value("dhcp_utilization_status", &json!("full"), None)
            .is_err());
    }

    #[test]
    fn scalar_types_are_checked() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);

        assert!(validator.check_value("comment", &json!("hello"), None).is_ok());
        assert!(validator.check_value("comment", &json!(4), None).is_err());
        assert!(validator.check_value("authority", &json!(true), None).is_ok());
        assert!(validator.check_value("authority", &json!("true"), None).is_err());
        assert!(validator
            .check_value("lease_scavenge_time", &json!(86400), None)
            .is_ok());
        assert!(validator
            .check_value("lease_scavenge_time", &json!(true), None)
            .is_err());
    }

    #[test]
    fn array_items_are_each_checked() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);

        assert!(validator
            .check_value("email_list", &json!(["a", "b"]), None)
            .is_ok());

        let err = validator
            .check_value("email_list", &json!(["a", 4]), None)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "each item of email_list must have one of the following types: [string] but you provide 4"
        );

        let err = validator
            .check_value("email_list", &json!("a"), None)
            .unwrap_err();
        assert!(err.to_string().contains("must be a list of values"));
    }

    #[test]
    fn struct_fields_accept_any_object() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);

        assert!(validator
            .check_value("options", &json!([{"name": "routers", "value": "10.0.0.1"}]), None)
            .is_ok());
        // Nested keys are not validated.
        assert!(validator
            .check_value("subscribe_settings", &json!({"unknown": 1}), None)
            .is_ok());

        let err = validator
            .check_value("options", &json!(["routers"]), None)
            .unwrap_err();
        assert!(err.to_string().starts_with("each item of options must be an object"));

        let err = validator
            .check_value("subscribe_settings", &json!("x"), None)
            .unwrap_err();
        assert!(err.to_string().starts_with("subscribe_settings must be an object"));
    }

    #[test]
    fn check_value_with_supplied_spec_skips_lookup() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);
        let function = schema.function("next_available_ip").unwrap();
        let num = function.input_field("num").unwrap();

        assert!(validator.check_value("num", &json!(3), Some(num)).is_ok());
        assert!(validator.check_value("num", &json!("3"), Some(num)).is_err());
        // Without the spec, "num" is not a network field.
        assert!(matches!(
            validator.check_value("num", &json!(3), None),
            Err(WapiError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn unknown_field_is_not_found() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);
        let err = validator.check_value("foo", &json!("bar"), None).unwrap_err();
        assert_eq!(err.to_string(), "field foo does not exist for network object");
    }

    #[test]
    fn split_search_key_variants() {
        assert_eq!(split_search_key("comment"), ("comment", ""));
        assert_eq!(split_search_key("comment~"), ("comment", "~"));
        assert_eq!(split_search_key("lease_scavenge_time>="), ("lease_scavenge_time", ">="));
        assert_eq!(split_search_key("comment:="), ("comment", ":="));
        assert_eq!(split_search_key("~"), ("", "~"));
    }

    #[test]
    fn search_params_accept_declared_modifiers() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);
        let result = validator.validate_search_params(&params(json!({
            "comment~": "office",
            "comment:=": "Office",
            "network": "10.0.0.0/8",
            "*Site": "Paris",
        })));
        assert!(result.is_ok());
    }

    #[test]
    fn search_params_reject_undeclared_modifier() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);

        let err = validator
            .validate_search_params(&params(json!({"network<": "10.0.0.0/8"})))
            .unwrap_err();
        assert!(matches!(err, WapiError::NotSearchableField(_)));
        assert!(err.to_string().contains("valid modifiers are: =~"));

        let err = validator
            .validate_search_params(&params(json!({"authority=": true})))
            .unwrap_err();
        assert!(matches!(err, WapiError::NotSearchableField(_)));
    }

    #[test]
    fn search_params_accept_combined_modifiers() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);
        assert!(validator
            .validate_search_params(&params(json!({"ttl>=": 30, "ttl<=": 60})))
            .is_ok());
        assert!(validator
            .validate_search_params(&params(json!({"ttl<": 30, "ttl=": 60})))
            .is_ok());

        let err = validator
            .validate_search_params(&params(json!({"ttl~": 30})))
            .unwrap_err();
        assert!(matches!(err, WapiError::NotSearchableField(_)));
        assert_eq!(
            err.to_string(),
            "~ is not a valid modifier for field ttl, valid modifiers are: <=>"
        );

        let err = validator
            .validate_search_params(&params(json!({"ttl>=": "30"})))
            .unwrap_err();
        assert!(matches!(err, WapiError::Field(_)));
    }

    #[test]
    fn multiple_type_tags_accept_any_mapped_type() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);
        assert!(validator.check_value("vlan", &json!("office"), None).is_ok());
        assert!(validator.check_value("vlan", &json!(12), None).is_ok());

        let err = validator.check_value("vlan", &json!(true), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "vlan must have one of the following types: [string, uint] but you provide true"
        );

        assert!(validator
            .validate_search_params(&params(json!({"vlan=": 12})))
            .is_ok());
        assert!(validator
            .validate_search_params(&params(json!({"vlan": "office"})))
            .is_ok());
    }

    #[test]
    fn search_params_check_values() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);

        let err = validator
            .validate_search_params(&params(json!({"comment~": 4})))
            .unwrap_err();
        assert!(matches!(err, WapiError::Field(_)));

        let err = validator
            .validate_search_params(&params(json!({"foo": "bar"})))
            .unwrap_err();
        assert!(matches!(err, WapiError::FieldNotFound { .. }));
    }

    #[test]
    fn extattr_search_values_are_not_checked() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);
        assert!(validator
            .validate_search_params(&params(json!({"*Site<": 4})))
            .is_ok());
    }

    #[test]
    fn return_fields_reject_search_only() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);

        let err = validator
            .validate_return_fields(&["contains_address"])
            .unwrap_err();
        assert!(matches!(err, WapiError::SearchOnlyField(_)));
        assert_eq!(
            err.to_string(),
            "contains_address is a search only field. It cannot be returned"
        );
    }

    #[test]
    fn return_fields_skip_extattrs_and_sub_objects() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);
        assert!(validator
            .validate_return_fields(&["extattrs", "comment", "options.name", "dhcp_utilization_status"])
            .is_ok());
    }

    #[test]
    fn return_fields_reject_unknown_and_functions() {
        let schema = schema();
        let validator = FieldValidator::new("network", &schema);

        assert!(matches!(
            validator.validate_return_fields(&["foo"]),
            Err(WapiError::FieldNotFound { .. })
        ));
        assert!(matches!(
            validator.validate_return_fields(&["next_available_ip"]),
            Err(WapiError::FieldNotFound { .. })
        ));
        // A trailing dot is not a sub-object path.
        assert!(matches!(
            validator.validate_return_fields(&["foo."]),
            Err(WapiError::FieldNotFound { .. })
        ));
    }
}
