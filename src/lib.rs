//! Infoblox WAPI client
//!
//! Schema-validated access to the Infoblox WAPI.
//!
//! Every object type exposed by the WAPI publishes a schema describing its
//! fields, the operations each field supports and the functions callable on
//! it. A [`Resource`] loads that schema once and checks every search, read,
//! write and function call against it before the request leaves the process.
//!
//! # Example
//!
//! ```no_run
//! use ib_wapi::{Client, ClientConfig, GetOptions};
//!
//! let config = ClientConfig::new("https://gm.example.com/wapi/v2.9")
//!     .credentials("admin", "infoblox");
//! let client = Client::connect(&config)?;
//! let network = client.get_object("network")?;
//!
//! let options = GetOptions::new()
//!     .param("comment~", "office")
//!     .return_fields_plus(["extattrs"]);
//! for item in network.get_multiple(&options)? {
//!     println!("{}", item?["network"]);
//! }
//! # Ok::<(), ib_wapi::WapiError>(())
//! ```
//!
//! # Field capabilities
//!
//! | Letter | Capability | Checked by |
//! |--------|------------|------------|
//! | `r` | read | return field options |
//! | `w` | write | `create` |
//! | `u` | update | `update` |
//! | `s` | search | search parameters |
//!
//! A field supporting only `s` is search-only: it may filter a search but is
//! never returned.

mod client;
mod error;
mod input;
mod loader;
mod params;
mod resource;
mod schema;
mod transport;
mod types;
mod validator;

#[cfg(test)]
mod testing;

pub use client::{check_api_version, parse_wapi_url, ApiVersion, Client, ClientConfig, DEFAULT_TIMEOUT};
pub use error::{InputError, WapiError};
pub use input::{parse_items, parse_json_object};
pub use loader::{fetch_api_schema, fetch_object_schema, load_schema_str};
pub use params::{GetOptions, ScheduleOptions, WriteOptions};
pub use resource::{Pages, Resource, MAX_RESULTS};
pub use schema::{FieldIndex, FieldKind, FieldSpec, SchemaDocument};
pub use transport::{execute, handle_http_error, url_join, HttpResponse, Method, Query, Transport};
pub use types::{
    decode_searchable_by, decode_supports, describe_capabilities, json_type_name, Capability,
    CapabilitySet, NativeType, ProxySearch, ReturnType,
};
pub use validator::{check_field_value, split_search_key, FieldValidator};

#[cfg(feature = "remote")]
pub use transport::HttpTransport;
