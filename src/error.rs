//! Error types for WAPI schema validation and requests.

use serde_json::Value;
use thiserror::Error;

/// Errors raised by schema validation, request assembly and the transport.
///
/// Validation variants are always raised before any request is sent for the
/// operation at hand. `Http` is only raised after a completed round trip.
#[derive(Debug, Error)]
pub enum WapiError {
    // Local argument errors (exit code 2)
    #[error("{0}")]
    BadParameter(String),

    #[error("{0}")]
    IncompatibleOperation(String),

    #[error("{0}")]
    MandatoryField(String),

    #[error("{0}")]
    Field(String),

    #[error("{0}")]
    SearchOnlyField(String),

    #[error("{0}")]
    NotSearchableField(String),

    #[error("field {field} does not exist for {object} object")]
    FieldNotFound { object: String, field: String },

    #[error("function {function} does not exist for {object} object")]
    FunctionNotFound { object: String, function: String },

    #[error("there is no object {0} in current wapi api")]
    ObjectNotFound(String),

    #[error("{0}")]
    IncompatibleApi(String),

    // Server answered with an error status (exit code 1)
    #[error("http error {status}: {body}")]
    Http { status: u16, body: Value },

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    // Transport failures (exit code 3)
    #[cfg(feature = "remote")]
    #[error("failed to reach {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },
}

impl WapiError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Http { .. } | Self::UnexpectedResponse(_) => 1,
            #[cfg(feature = "remote")]
            Self::Network { .. } => 3,
            Self::Io { .. } => 3,
            _ => 2,
        }
    }

    /// True for every error caused by a malformed caller argument.
    ///
    /// `FieldNotFound` counts both as a bad parameter and as a lookup miss.
    pub fn is_bad_parameter(&self) -> bool {
        matches!(
            self,
            Self::BadParameter(_)
                | Self::IncompatibleOperation(_)
                | Self::MandatoryField(_)
                | Self::Field(_)
                | Self::SearchOnlyField(_)
                | Self::NotSearchableField(_)
                | Self::FieldNotFound { .. }
        )
    }

    /// True when a name is absent from the loaded schema or the object catalog.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::FieldNotFound { .. }
                | Self::FunctionNotFound { .. }
                | Self::ObjectNotFound(_)
        )
    }
}

/// Errors while parsing `key=value` / `key:=json` CLI items.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("{delimiter} must not start or end an item like in {item}")]
    DanglingDelimiter { delimiter: String, item: String },

    #[error("{item} contains more than one occurrence of {delimiter}")]
    RepeatedDelimiter { delimiter: String, item: String },

    #[error("unable to parse json data, this input is not correct: {item}")]
    InvalidJson {
        item: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{item} is neither key=value nor key:=json")]
    MissingDelimiter { item: String },

    #[error("expected a json object but got {actual}")]
    NotAnObject { actual: String },
}
