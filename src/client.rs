//! Client bootstrap: connection settings, API version check and the catalog
//! of supported objects.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::WapiError;
use crate::loader::fetch_api_schema;
use crate::resource::Resource;
use crate::transport::{execute, url_join, Method, Query, Transport};

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a WAPI endpoint.
///
/// ```
/// use ib_wapi::ClientConfig;
///
/// let config = ClientConfig::new("https://gm.example.com/wapi/v2.9")
///     .credentials("admin", "infoblox")
///     .cert("/etc/ssl/gm.pem");
/// assert_eq!(config.username.as_deref(), Some("admin"));
/// ```
#[derive(Clone)]
pub struct ClientConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// PEM certificate trusted as a root. Without one the server certificate
    /// is not verified.
    pub cert: Option<PathBuf>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
            cert: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.cert = Some(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("cert", &self.cert)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// WAPI version taken from the `/wapi/vX.Y` path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl std::fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{}", self.major, self.minor)
    }
}

/// Validate a WAPI base URL and return it without query, fragment or
/// trailing slash, along with the API version it names.
///
/// # Errors
///
/// Returns `WapiError::BadParameter` unless the URL is `http(s)://host/wapi/vX.Y[...]`.
pub fn parse_wapi_url(url: &str) -> Result<(String, ApiVersion), WapiError> {
    let invalid = || WapiError::BadParameter(format!("{} is not a valid http url", url));

    let parsed = Url::parse(url).map_err(|e| {
        debug!(url, error = %e, "url parse failed");
        invalid()
    })?;
    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(invalid());
    }
    let host = parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(invalid)?;

    let path = parsed.path();
    let version = path
        .strip_prefix("/wapi/v")
        .and_then(|tail| tail.split('/').next())
        .and_then(parse_version)
        .ok_or_else(|| {
            WapiError::BadParameter(format!(
                "the url must be in the form http://host/wapi/vX.X, but you supplied: {}",
                url
            ))
        })?;

    let authority = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let normalized = format!("{}://{}{}", scheme, authority, path.trim_end_matches('/'));
    Ok((normalized, version))
}

/// `X.Y` followed by anything; only the leading digits of `Y` count.
fn parse_version(segment: &str) -> Option<ApiVersion> {
    let (major, rest) = segment.split_once('.')?;
    if major.is_empty() || !major.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let minor = &rest[..end];
    if minor.is_empty() {
        return None;
    }
    Some(ApiVersion {
        major: major.parse().ok()?,
        minor: minor.parse().ok()?,
    })
}

/// Reject API versions older than 2 and warn on untested newer majors.
///
/// # Errors
///
/// Returns `WapiError::IncompatibleApi` for major versions 0 and 1.
pub fn check_api_version(version: ApiVersion) -> Result<(), WapiError> {
    if version.major <= 1 {
        return Err(WapiError::IncompatibleApi(format!(
            "the client supports in priority major version 2 of the api, not {}",
            version
        )));
    }
    if version.major >= 3 {
        warn!(%version, "the client targets major version 2 of the api, it may not work correctly");
    }
    Ok(())
}

/// Entry point on a WAPI endpoint.
///
/// Holds the top-level schema fetched at construction; object handles are
/// created on demand with [`Client::get_object`].
pub struct Client {
    url: String,
    version: ApiVersion,
    transport: Box<dyn Transport>,
    schema: Value,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("url", &self.url)
            .field("version", &self.version)
            .finish()
    }
}

impl Client {
    /// Connect over HTTP using `config`.
    ///
    /// # Errors
    ///
    /// Returns `WapiError::BadParameter` for a malformed URL or certificate,
    /// `WapiError::IncompatibleApi` for API versions below 2, and any
    /// transport or HTTP error raised while fetching the top-level schema.
    #[cfg(feature = "remote")]
    pub fn connect(config: &ClientConfig) -> Result<Self, WapiError> {
        let (url, version) = parse_wapi_url(&config.url)?;
        check_api_version(version)?;
        let transport = crate::transport::HttpTransport::new(config)?;
        Self::bootstrap(url, version, Box::new(transport))
    }

    /// Build a client on any transport.
    pub fn with_transport<T>(url: &str, transport: T) -> Result<Self, WapiError>
    where
        T: Transport + 'static,
    {
        let (url, version) = parse_wapi_url(url)?;
        check_api_version(version)?;
        Self::bootstrap(url, version, Box::new(transport))
    }

    fn bootstrap(
        url: String,
        version: ApiVersion,
        transport: Box<dyn Transport>,
    ) -> Result<Self, WapiError> {
        let schema = fetch_api_schema(transport.as_ref(), &url)?;
        debug!(url = %url, %version, "loaded api schema");
        Ok(Self {
            url,
            version,
            transport,
            schema,
        })
    }

    /// Normalized base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn version(&self) -> ApiVersion {
        self.version
    }

    /// Top-level schema as sent by the server.
    pub fn api_schema(&self) -> &Value {
        &self.schema
    }

    /// Object types the server supports.
    pub fn available_objects(&self) -> Vec<&str> {
        self.schema
            .get("supported_objects")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    /// Load the schema of `name` and return a handle on it.
    ///
    /// # Errors
    ///
    /// Returns `WapiError::ObjectNotFound` when the server does not support
    /// `name`, or the error raised while fetching its schema.
    pub fn get_object(&self, name: &str) -> Result<Resource<'_>, WapiError> {
        if !self.available_objects().contains(&name) {
            return Err(WapiError::ObjectNotFound(name.to_string()));
        }
        Resource::load(self.transport.as_ref(), &self.url, name)
    }

    /// POST `payload` to the generic `request` object.
    ///
    /// # Errors
    ///
    /// Returns `WapiError::BadParameter` for a null payload.
    pub fn custom_request(&self, payload: &Value) -> Result<Value, WapiError> {
        if payload.is_null() {
            return Err(WapiError::BadParameter("data must not be empty".into()));
        }
        let url = url_join(&self.url, "request");
        execute(
            self.transport.as_ref(),
            Method::Post,
            &url,
            &Query::new(),
            Some(payload),
        )
    }
}
