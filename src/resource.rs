//! Schema-validated operations on one WAPI object type.
//!
//! A `Resource` is bound to the schema fetched when it was loaded and never
//! refreshes it. Every operation validates its arguments against that schema
//! before a single request is sent.
//!
//! | operation | method | url | payload |
//! |-----------|--------|-----|---------|
//! | `get` | GET | object type or reference | none |
//! | `get_multiple` / `count` | GET, one per page | object type | none |
//! | `create` | POST | object type | fields |
//! | `update` | PUT | reference | fields |
//! | `delete` | DELETE | reference | none |
//! | `func_call` | POST `_function=<name>` | reference or object type | arguments |

use std::collections::VecDeque;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::WapiError;
use crate::loader::fetch_object_schema;
use crate::params::{push, push_value, GetOptions, ScheduleOptions, WriteOptions};
use crate::schema::{FieldIndex, FieldSpec, SchemaDocument};
use crate::transport::{execute, url_join, Method, Query, Transport};
use crate::types::{describe_capabilities, Capability, ProxySearch, ReturnType};
use crate::validator::{check_field_value, FieldValidator};

/// Page size requested by paginated fetches.
pub const MAX_RESULTS: u32 = 1000;

/// Handle on one object type of the WAPI.
pub struct Resource<'t> {
    transport: &'t dyn Transport,
    base_url: String,
    name: String,
    schema: SchemaDocument,
    index: FieldIndex,
}

impl std::fmt::Debug for Resource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("base_url", &self.base_url)
            .field("name", &self.name)
            .field("index", &self.index)
            .finish()
    }
}

impl<'t> Resource<'t> {
    /// Fetch the schema of `name` and build a handle on it.
    ///
    /// # Errors
    ///
    /// Returns `WapiError::Http` if the schema request fails.
    pub fn load(
        transport: &'t dyn Transport,
        base_url: &str,
        name: &str,
    ) -> Result<Self, WapiError> {
        let schema = fetch_object_schema(transport, base_url, name)?;
        Ok(Self::from_schema(transport, base_url, name, schema))
    }

    /// Build a handle on an already fetched schema.
    pub fn from_schema(
        transport: &'t dyn Transport,
        base_url: &str,
        name: &str,
        schema: SchemaDocument,
    ) -> Self {
        let index = schema.index();
        Self {
            transport,
            base_url: base_url.to_string(),
            name: name.to_string(),
            schema,
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema document as sent by the server.
    pub fn documentation(&self) -> &Value {
        self.schema.raw()
    }

    pub fn schema(&self) -> &SchemaDocument {
        &self.schema
    }

    pub fn fields(&self) -> &[String] {
        &self.index.fields
    }

    pub fn functions(&self) -> &[String] {
        &self.index.functions
    }

    /// Fields returned by a fetch without return field options.
    pub fn default_get_fields(&self) -> &[String] {
        &self.index.default_get_fields
    }

    /// Fields every create must supply.
    pub fn default_post_fields(&self) -> &[String] {
        &self.index.default_post_fields
    }

    pub fn validator(&self) -> FieldValidator<'_> {
        FieldValidator::new(&self.name, &self.schema)
    }

    /// Decoded information about a data field.
    ///
    /// # Errors
    ///
    /// Returns `WapiError::FieldNotFound` for unknown names.
    pub fn field_info(&self, name: &str) -> Result<&FieldSpec, WapiError> {
        self.validator().field(name)
    }

    /// Decoded information about a function, input and output fields included.
    ///
    /// # Errors
    ///
    /// Returns `WapiError::FunctionNotFound` for unknown names.
    pub fn function_info(&self, name: &str) -> Result<&FieldSpec, WapiError> {
        self.schema
            .function(name)
            .ok_or_else(|| WapiError::FunctionNotFound {
                object: self.name.clone(),
                function: name.to_string(),
            })
    }

    /// Fetch one object by reference, or search objects of this type.
    ///
    /// With an `object_ref`, `options.params` is ignored: only return field,
    /// return type and proxy options apply.
    pub fn get(&self, object_ref: Option<&str>, options: &GetOptions) -> Result<Value, WapiError> {
        let url = match object_ref {
            Some(object_ref) => {
                check_object_ref(object_ref)?;
                url_join(&self.base_url, object_ref)
            }
            None => url_join(&self.base_url, &self.name),
        };
        let query = self.get_query(object_ref.is_none(), options)?;
        execute(self.transport, Method::Get, &url, &query, None)
    }

    /// Search objects page by page.
    ///
    /// Arguments are validated now; requests are sent lazily as the returned
    /// iterator is consumed, one page at a time.
    pub fn get_multiple(&self, options: &GetOptions) -> Result<Pages<'t>, WapiError> {
        let mut query = self.get_query(true, options)?;
        push(&mut query, "_return_as_object", "1");
        push(&mut query, "_paging", "1");
        push(&mut query, "_max_results", MAX_RESULTS.to_string());

        Ok(Pages {
            transport: self.transport,
            url: url_join(&self.base_url, &self.name),
            next_query: Some(query),
            buffer: VecDeque::new(),
        })
    }

    /// Count the objects matching `options` by walking every page.
    pub fn count(&self, options: &GetOptions) -> Result<usize, WapiError> {
        let mut total = 0;
        for item in self.get_multiple(options)? {
            item?;
            total += 1;
        }
        Ok(total)
    }

    /// Create an object. Returns its reference, or the object when return
    /// field options are given.
    ///
    /// # Errors
    ///
    /// Returns `WapiError::MandatoryField` when a create-mandatory field is
    /// missing, `WapiError::FieldNotFound` for unknown fields and
    /// `WapiError::Field` for fields that cannot be written or bad values.
    pub fn create(
        &self,
        fields: &Map<String, Value>,
        options: &WriteOptions,
    ) -> Result<Value, WapiError> {
        for mandatory in &self.index.default_post_fields {
            if !fields.contains_key(mandatory) {
                return Err(WapiError::MandatoryField(format!(
                    "{} field is mandatory for {} creation but is missing",
                    mandatory, self.name
                )));
            }
        }
        self.check_payload(fields, Capability::Write)?;

        let query = self.write_query(options)?;
        let url = url_join(&self.base_url, &self.name);
        execute(
            self.transport,
            Method::Post,
            &url,
            &query,
            Some(&Value::Object(fields.clone())),
        )
    }

    /// Update the object behind `object_ref`.
    pub fn update(
        &self,
        object_ref: &str,
        fields: &Map<String, Value>,
        options: &WriteOptions,
    ) -> Result<Value, WapiError> {
        check_object_ref(object_ref)?;
        self.check_payload(fields, Capability::Update)?;

        let query = self.write_query(options)?;
        let url = url_join(&self.base_url, object_ref);
        execute(
            self.transport,
            Method::Put,
            &url,
            &query,
            Some(&Value::Object(fields.clone())),
        )
    }

    /// Delete the object behind `object_ref`.
    pub fn delete(&self, object_ref: &str, options: &ScheduleOptions) -> Result<Value, WapiError> {
        check_object_ref(object_ref)?;
        let query = options.to_query()?;
        let url = url_join(&self.base_url, object_ref);
        execute(self.transport, Method::Delete, &url, &query, None)
    }

    /// Call a function on an object, or on the object type when `object_ref`
    /// is `None`.
    ///
    /// # Errors
    ///
    /// Returns `WapiError::FunctionNotFound` for unknown functions and
    /// `WapiError::BadParameter` for arguments that are not declared inputs.
    pub fn func_call(
        &self,
        object_ref: Option<&str>,
        function_name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<Value, WapiError> {
        if function_name.is_empty() {
            return Err(WapiError::MandatoryField("function_name is missing".into()));
        }
        let function = self.function_info(function_name)?;

        for (key, value) in arguments {
            let input = function.input_field(key).ok_or_else(|| {
                WapiError::BadParameter(format!(
                    "{} is not a valid input field for {} function",
                    key, function_name
                ))
            })?;
            check_field_value(key, value, input)?;
        }

        let url = match object_ref {
            Some(object_ref) => {
                check_object_ref(object_ref)?;
                url_join(&self.base_url, object_ref)
            }
            None => url_join(&self.base_url, &self.name),
        };
        let mut query = Query::new();
        push(&mut query, "_function", function_name);
        execute(
            self.transport,
            Method::Post,
            &url,
            &query,
            Some(&Value::Object(arguments.clone())),
        )
    }

    // --- Internal implementation ---

    fn check_payload(
        &self,
        fields: &Map<String, Value>,
        capability: Capability,
    ) -> Result<(), WapiError> {
        let validator = self.validator();
        for (name, value) in fields {
            let spec = validator.field(name)?;
            if !spec.supports(capability) {
                let verb = match capability {
                    Capability::Update => "updated",
                    _ => "written",
                };
                return Err(WapiError::Field(format!(
                    "{} cannot be {}, operations supported by this field are: {}",
                    name,
                    verb,
                    describe_capabilities(&spec.supports)
                )));
            }
            check_field_value(name, value, spec)?;
        }
        Ok(())
    }

    fn get_query(&self, search: bool, options: &GetOptions) -> Result<Query, WapiError> {
        let requested = options.return_type.as_deref().unwrap_or("json");
        let return_type = ReturnType::parse(requested).ok_or_else(|| {
            WapiError::BadParameter(format!(
                "{} is not a valid return type. Valid values are [{}]",
                requested,
                ReturnType::VALUES.join(", ")
            ))
        })?;

        let mut query = Query::new();
        push(&mut query, "_return_type", return_type.as_str());

        if search {
            if let Some(params) = &options.params {
                self.validator().validate_search_params(params)?;
                for (key, value) in params {
                    push_value(&mut query, key, value);
                }
            }
        }

        query.extend(self.return_field_query(
            options.return_fields.as_deref(),
            options.return_fields_plus.as_deref(),
        )?);

        if let Some(proxy) = &options.proxy_search {
            let proxy = ProxySearch::parse(proxy).ok_or_else(|| {
                WapiError::BadParameter(format!(
                    "proxy_search must be in [GM, LOCAL] but you provide: {}",
                    proxy
                ))
            })?;
            push(&mut query, "_proxy_search", proxy.as_str());
        }

        Ok(query)
    }

    fn write_query(&self, options: &WriteOptions) -> Result<Query, WapiError> {
        let mut query = options.schedule.to_query()?;
        query.extend(self.return_field_query(
            options.return_fields.as_deref(),
            options.return_fields_plus.as_deref(),
        )?);
        Ok(query)
    }

    /// `_return_fields` wins over `_return_fields+`; the latter drops fields
    /// that are returned by default anyway.
    fn return_field_query(
        &self,
        fields: Option<&[String]>,
        plus: Option<&[String]>,
    ) -> Result<Query, WapiError> {
        let mut query = Query::new();
        if let Some(fields) = fields {
            self.validator().validate_return_fields(fields)?;
            push(&mut query, "_return_fields", fields.join(","));
        } else if let Some(plus) = plus {
            self.validator().validate_return_fields(plus)?;
            let extra: Vec<&str> = plus
                .iter()
                .filter(|f| !self.index.default_get_fields.contains(*f))
                .map(String::as_str)
                .collect();
            push(&mut query, "_return_fields+", extra.join(","));
        }
        Ok(query)
    }
}

fn check_object_ref(object_ref: &str) -> Result<(), WapiError> {
    if object_ref.trim().is_empty() {
        return Err(WapiError::MandatoryField("object_ref is missing".into()));
    }
    Ok(())
}

/// Forward-only iterator over the results of a paginated fetch.
///
/// The first request carries the full query; the following ones only carry
/// `_page_id`. Iteration ends when a page has no `next_page_id`, or after the
/// first error.
pub struct Pages<'t> {
    transport: &'t dyn Transport,
    url: String,
    next_query: Option<Query>,
    buffer: VecDeque<Value>,
}

impl Pages<'_> {
    fn fetch(&mut self, query: Query) -> Result<(), WapiError> {
        let page = execute(self.transport, Method::Get, &self.url, &query, None)?;
        let Some(Value::Array(items)) = page.get("result") else {
            return Err(WapiError::UnexpectedResponse(format!(
                "paginated response from {} has no result list",
                self.url
            )));
        };
        self.buffer.extend(items.iter().cloned());

        if let Some(next) = page.get("next_page_id") {
            let next = match next {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            debug!(url = %self.url, page_id = %next, "fetching next page");
            let mut query = Query::new();
            push(&mut query, "_page_id", next);
            self.next_query = Some(query);
        }
        Ok(())
    }
}

impl Iterator for Pages<'_> {
    type Item = Result<Value, WapiError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                return Some(Ok(item));
            }
            let query = self.next_query.take()?;
            if let Err(e) = self.fetch(query) {
                return Some(Err(e));
            }
        }
    }
}
