//! HTTP transport used by every WAPI request.
//!
//! The request layer only needs "send a method to a url with query parameters
//! and an optional JSON body, give me back status and body". `Transport`
//! captures exactly that so validation and request assembly can be exercised
//! without a network. `HttpTransport` is the reqwest implementation.

use serde_json::Value;
use tracing::debug;

use crate::error::WapiError;

#[cfg(feature = "remote")]
use crate::client::ClientConfig;

/// Ordered query string parameters. Keys may repeat.
pub type Query = Vec<(String, String)>;

/// HTTP verbs used by the WAPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

/// Raw answer of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Decode the body as JSON.
    ///
    /// Bodies that are not JSON (xml return types, plain text errors) come
    /// back as a JSON string holding the raw text. An empty body is `null`.
    pub fn json(&self) -> Value {
        if self.body.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(&self.body).unwrap_or_else(|_| Value::String(self.body.clone()))
    }
}

/// Capability to perform one HTTP round trip.
///
/// Authentication, TLS and timeouts are the implementor's business.
pub trait Transport {
    /// # Errors
    ///
    /// Returns an error only when no status could be obtained. Error statuses
    /// are returned as a normal `HttpResponse`.
    fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<HttpResponse, WapiError>;
}

/// Join a path to a base url with exactly one slash between them.
pub fn url_join(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Turn a status >= 400 into `WapiError::Http`, keeping the body untouched.
pub fn handle_http_error(response: HttpResponse) -> Result<HttpResponse, WapiError> {
    if response.status >= 400 {
        return Err(WapiError::Http {
            status: response.status,
            body: response.json(),
        });
    }
    Ok(response)
}

/// Send one request and decode the successful answer.
pub fn execute(
    transport: &dyn Transport,
    method: Method,
    url: &str,
    query: &[(String, String)],
    body: Option<&Value>,
) -> Result<Value, WapiError> {
    debug!(method = method.as_str(), url, params = query.len(), "wapi request");
    let response = handle_http_error(transport.send(method, url, query, body)?)?;
    Ok(response.json())
}

/// reqwest-backed transport configured from a `ClientConfig`.
#[cfg(feature = "remote")]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    username: Option<String>,
    password: Option<String>,
}

#[cfg(feature = "remote")]
impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("username", &self.username)
            .field("has_password", &self.password.is_some())
            .finish()
    }
}

#[cfg(feature = "remote")]
impl HttpTransport {
    /// Build a transport.
    ///
    /// Without a certificate the server certificate is not verified. With
    /// one, the PEM file is trusted as a root certificate.
    ///
    /// # Errors
    ///
    /// Returns `WapiError::Io` if the certificate cannot be read,
    /// `WapiError::BadParameter` if it is not PEM, or `WapiError::Network`
    /// if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, WapiError> {
        let mut builder = reqwest::blocking::Client::builder().timeout(config.timeout);

        builder = match &config.cert {
            Some(path) => {
                let pem = std::fs::read(path).map_err(|source| WapiError::Io {
                    path: path.display().to_string(),
                    source,
                })?;
                let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                    WapiError::BadParameter(format!(
                        "{} is not a valid PEM certificate: {}",
                        path.display(),
                        e
                    ))
                })?;
                builder.add_root_certificate(cert)
            }
            None => builder.danger_accept_invalid_certs(true),
        };

        let client = builder.build().map_err(|source| WapiError::Network {
            url: config.url.clone(),
            source,
        })?;

        Ok(Self {
            client,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

#[cfg(feature = "remote")]
impl Transport for HttpTransport {
    fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<HttpResponse, WapiError> {
        let verb = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut request = self.client.request(verb, url).query(query);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let network = |source: reqwest::Error| WapiError::Network {
            url: url.to_string(),
            source,
        };
        let response = request.send().map_err(network)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(network)?;
        debug!(status, url, "wapi response");

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_join_single_slash() {
        assert_eq!(url_join("http://foo/wapi/v2.9", "network"), "http://foo/wapi/v2.9/network");
        assert_eq!(url_join("http://foo/wapi/v2.9/", "/network"), "http://foo/wapi/v2.9/network");
        assert_eq!(
            url_join("http://foo/wapi/v2.9", "network/ZG5z:10.0.0.0/8/default"),
            "http://foo/wapi/v2.9/network/ZG5z:10.0.0.0/8/default"
        );
    }

    #[test]
    fn response_json_falls_back_to_text() {
        assert_eq!(HttpResponse::new(200, r#"{"a": 1}"#).json(), json!({"a": 1}));
        assert_eq!(HttpResponse::new(200, "<xml/>").json(), json!("<xml/>"));
        assert_eq!(HttpResponse::new(200, "").json(), Value::Null);
    }

    #[test]
    fn handle_http_error_keeps_status_and_body() {
        let err = handle_http_error(HttpResponse::new(404, r#"{"text": "missing"}"#)).unwrap_err();
        match err {
            WapiError::Http { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, json!({"text": "missing"}));
            }
            other => panic!("expected http error, got {other:?}"),
        }

        let err = handle_http_error(HttpResponse::new(500, "boom")).unwrap_err();
        assert!(matches!(err, WapiError::Http { status: 500, body } if body == json!("boom")));
    }

    #[test]
    fn handle_http_error_passes_success() {
        let response = handle_http_error(HttpResponse::new(201, r#""network/ref""#)).unwrap();
        assert_eq!(response.json(), json!("network/ref"));
    }

    #[cfg(feature = "remote")]
    mod remote {
        use super::*;
        use mockito::Matcher;

        #[test]
        fn http_transport_sends_query_auth_and_body() {
            let mut server = mockito::Server::new();
            let mock = server
                .mock("POST", "/wapi/v2.9/network")
                .match_query(Matcher::UrlEncoded("_return_fields".into(), "comment".into()))
                .match_header("authorization", Matcher::Regex("^Basic ".into()))
                .match_body(Matcher::Json(json!({"network": "10.0.0.0/8"})))
                .with_status(201)
                .with_body(r#""network/ZG5z:10.0.0.0/8/default""#)
                .create();

            let config = ClientConfig::new(format!("{}/wapi/v2.9", server.url()))
                .credentials("admin", "secret");
            let transport = HttpTransport::new(&config).unwrap();
            let response = transport
                .send(
                    Method::Post,
                    &format!("{}/wapi/v2.9/network", server.url()),
                    &[("_return_fields".to_string(), "comment".to_string())],
                    Some(&json!({"network": "10.0.0.0/8"})),
                )
                .unwrap();

            mock.assert();
            assert_eq!(response.status, 201);
            assert_eq!(response.json(), json!("network/ZG5z:10.0.0.0/8/default"));
        }

        #[test]
        fn http_transport_returns_error_status_as_response() {
            let mut server = mockito::Server::new();
            let _mock = server
                .mock("DELETE", "/wapi/v2.9/network/ref")
                .with_status(400)
                .with_body(r#"{"Error": "AdmConProtoError"}"#)
                .create();

            let config = ClientConfig::new(format!("{}/wapi/v2.9", server.url()));
            let transport = HttpTransport::new(&config).unwrap();
            let url = format!("{}/wapi/v2.9/network/ref", server.url());
            let response = transport.send(Method::Delete, &url, &[], None).unwrap();
            assert_eq!(response.status, 400);
        }

        #[test]
        fn http_transport_missing_certificate_is_io_error() {
            let config = ClientConfig::new("https://foo/wapi/v2.9").cert("/nonexistent/cert.pem");
            let result = HttpTransport::new(&config);
            assert!(matches!(result, Err(WapiError::Io { .. })));
        }
    }
}
