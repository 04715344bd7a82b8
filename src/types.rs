//! Type definitions for the content gateway

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration of one event, as stored in the gateway's own space
///
/// The well-known fields are modeled explicitly; everything else an editor
/// puts on the entry (title, description, theming, ...) rides along in
/// `extra` and is served verbatim to the landing page.
///
/// `secrets` is deserialized from the backend but never serialized, so any
/// response built from an `EventData` hides credentials by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    /// Unique event name, also the route segment the event is served under
    pub name: String,

    /// Whether this entry is the process-wide default event
    #[serde(rename = "isDefault", default)]
    pub is_default: bool,

    /// Credentials for the event's own content space
    #[serde(default, skip_serializing)]
    pub secrets: Option<EventSecrets>,

    /// Remaining entry fields, passed through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl EventData {
    /// Extract the credentials the schema builder needs
    ///
    /// Fails with [`Error::MissingCredentials`] naming the first absent
    /// field, which is how an incompletely configured event surfaces.
    pub fn credentials(&self) -> Result<SpaceCredentials> {
        let secrets = self
            .secrets
            .as_ref()
            .ok_or(Error::MissingCredentials("secrets"))?;
        if secrets.space_id.is_empty() {
            return Err(Error::MissingCredentials("spaceId"));
        }
        if secrets.cda_token.is_empty() {
            return Err(Error::MissingCredentials("cdaToken"));
        }
        Ok(SpaceCredentials {
            space_id: secrets.space_id.clone(),
            cda_token: secrets.cda_token.clone(),
            cma_token: secrets.cma_token.clone(),
        })
    }
}

/// Secrets nested inside an event entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSecrets {
    #[serde(rename = "spaceId", default)]
    pub space_id: String,
    #[serde(rename = "cdaToken", default)]
    pub cda_token: String,
    #[serde(rename = "cmaToken", default)]
    pub cma_token: Option<String>,
}

/// Credentials handed to the schema builder for one event's space
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceCredentials {
    pub space_id: String,
    pub cda_token: String,
    pub cma_token: Option<String>,
}

/// Options fixed at request-handler construction time
///
/// Mirrors the extension configuration of the original middleware: version
/// and timeline reporting on, verbose error detail off.
#[derive(Debug, Clone, Copy)]
pub struct HandlerOptions {
    /// Report the gateway version in response extensions
    pub version: bool,
    /// Report execution timing in response extensions
    pub timeline: bool,
    /// Include error locations/paths beyond the message
    pub detailed_errors: bool,
}

impl Default for HandlerOptions {
    fn default() -> Self {
        Self {
            version: true,
            timeline: true,
            detailed_errors: false,
        }
    }
}

/// Serializable description of a derived schema's type shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntrospectionDoc(pub serde_json::Value);

impl IntrospectionDoc {
    pub fn as_json(&self) -> &serde_json::Value {
        &self.0
    }
}

/// GraphQL request from a client
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GraphQLRequest {
    #[serde(default)]
    pub query: String,

    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

impl GraphQLRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: None,
        }
    }
}

/// GraphQL response to a client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResponseError>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl GraphQLResponse {
    /// Create a successful response
    pub fn success(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
            extensions: None,
        }
    }

    /// Create a response carrying only errors
    pub fn from_errors(errors: Vec<ResponseError>) -> Self {
        Self {
            data: None,
            errors,
            extensions: None,
        }
    }
}

/// One error inside a GraphQL response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<ErrorLocation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLocation {
    pub line: usize,
    pub column: usize,
}
