//! Tracer configuration surface and request metadata.

use std::sync::Arc;

use http::{HeaderMap, Method};
use serde_json::{Map, Value};

use crate::policy::PolicyConfig;
use crate::rewrite::RewriteHook;

/// Header names consulted by the default client-identity extraction.
const CLIENT_NAME_HEADER: &str = "apollographql-client-name";
const CLIENT_VERSION_HEADER: &str = "apollographql-client-version";
const CLIENT_REFERENCE_ID_HEADER: &str = "apollographql-client-reference-id";

/// Identity of the client that issued a request. Fields default to the
/// empty string — the wire format never carries nulls here.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
    pub reference_id: String,
}

/// Hook producing the client identity for a request. The default extracts
/// it from well-known headers, then a `clientInfo` object in the request
/// extensions, then empty strings.
pub type ClientInfoHook = Arc<dyn Fn(&RequestMetadata) -> ClientInfo + Send + Sync>;

/// What the surrounding pipeline knows about a request when it starts.
#[derive(Clone, Debug, Default)]
pub struct RequestMetadata {
    pub method: Method,
    pub headers: HeaderMap,
    /// Raw query text, when the request carried one.
    pub query: Option<String>,
    /// Operation name explicitly supplied by the client.
    pub operation_name: Option<String>,
    pub variables: Map<String, Value>,
    /// GraphQL request extensions, if any.
    pub extensions: Option<Value>,
}

/// Static tracer configuration, shared across requests.
#[derive(Clone, Default)]
pub struct TracerConfig {
    pub policy: PolicyConfig,
    /// Per-error rewrite applied before an error is recorded in the trace.
    pub rewrite_error: Option<RewriteHook>,
    /// Overrides the default client-identity extraction.
    pub client_info: Option<ClientInfoHook>,
}

impl std::fmt::Debug for TracerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracerConfig")
            .field("policy", &self.policy)
            .field("rewrite_error", &self.rewrite_error.is_some())
            .field("client_info", &self.client_info.is_some())
            .finish()
    }
}

impl TracerConfig {
    pub(crate) fn client_info_for(&self, request: &RequestMetadata) -> ClientInfo {
        match &self.client_info {
            Some(hook) => hook(request),
            None => default_client_info(request),
        }
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

fn extension_value(extensions: Option<&Value>, field: &str) -> Option<String> {
    extensions?
        .get("clientInfo")?
        .get(field)?
        .as_str()
        .map(str::to_string)
}

fn default_client_info(request: &RequestMetadata) -> ClientInfo {
    let extensions = request.extensions.as_ref();
    ClientInfo {
        name: header_value(&request.headers, CLIENT_NAME_HEADER)
            .or_else(|| extension_value(extensions, "name"))
            .unwrap_or_default(),
        version: header_value(&request.headers, CLIENT_VERSION_HEADER)
            .or_else(|| extension_value(extensions, "version"))
            .unwrap_or_default(),
        reference_id: header_value(&request.headers, CLIENT_REFERENCE_ID_HEADER)
            .or_else(|| extension_value(extensions, "referenceId"))
            .unwrap_or_default(),
    }
}
