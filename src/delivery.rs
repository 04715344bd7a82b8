//! HTTP client for Contentful-style content delivery APIs
//!
//! Both sides of the gateway speak this protocol: the gateway's own space
//! holds the event entries, and every event's space holds the content the
//! derived schema resolves against. The client is a thin wrapper over
//! `reqwest` that knows the `spaces/{space}/...` path layout and the wire
//! shapes the rest of the crate consumes.

use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Public Content Delivery API host
pub const DEFAULT_DELIVERY_BASE_URL: &str = "https://cdn.contentful.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one space of a content delivery backend
#[derive(Debug, Clone)]
pub struct DeliveryClient {
    http: reqwest::Client,
    base_url: String,
    space_id: String,
}

impl DeliveryClient {
    /// Create a client against the public delivery host
    pub fn new(space_id: impl Into<String>, access_token: &str) -> Result<Self> {
        Self::with_base_url(DEFAULT_DELIVERY_BASE_URL, space_id, access_token)
    }

    /// Create a client against a custom host (previews, test doubles)
    pub fn with_base_url(
        base_url: impl Into<String>,
        space_id: impl Into<String>,
        access_token: &str,
    ) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", access_token))
            .map_err(|_| Error::Config("access token contains invalid header characters".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            space_id: space_id.into(),
        })
    }

    /// The space this client reads from
    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    fn url(&self, tail: &str) -> String {
        format!("{}/spaces/{}/{}", self.base_url, self.space_id, tail)
    }

    /// Query entries in the space
    pub async fn entries(&self, query: &[(&str, &str)]) -> Result<EntryPage> {
        let url = self.url("entries");
        debug!(space = %self.space_id, %url, "querying entries");
        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.json().await?)
    }

    /// Fetch a single entry by id, `None` when the backend has no such entry
    pub async fn entry(&self, id: &str) -> Result<Option<Entry>> {
        let url = self.url(&format!("entries/{}", id));
        debug!(space = %self.space_id, %url, "fetching entry");
        let resp = self.http.get(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp.error_for_status()?;
        Ok(Some(resp.json().await?))
    }

    /// List the content types defined in the space
    pub async fn content_types(&self) -> Result<Vec<ContentTypeDescriptor>> {
        let url = self.url("content_types");
        debug!(space = %self.space_id, %url, "fetching content types");
        let resp = self.http.get(&url).send().await?.error_for_status()?;
        let page: ContentTypePage = resp.json().await?;
        Ok(page.items)
    }
}

/// One page of entries
#[derive(Debug, Clone, Deserialize)]
pub struct EntryPage {
    #[serde(default)]
    pub items: Vec<Entry>,
    #[serde(default)]
    pub total: u64,
}

/// A single content entry
#[derive(Debug, Clone, Deserialize)]
pub struct Entry {
    pub sys: EntrySys,
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// System metadata of an entry
#[derive(Debug, Clone, Deserialize)]
pub struct EntrySys {
    pub id: String,
    #[serde(rename = "contentType", default)]
    pub content_type: Option<TypeLink>,
}

impl EntrySys {
    /// Id of the entry's content type, when the backend reported one
    pub fn content_type_id(&self) -> Option<&str> {
        self.content_type.as_ref().map(|l| l.sys.id.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeLink {
    pub sys: LinkTarget,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkTarget {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentTypePage {
    #[serde(default)]
    items: Vec<ContentTypeDescriptor>,
}

/// Description of one content type, as returned by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct ContentTypeDescriptor {
    pub sys: DescriptorSys,
    pub name: String,
    #[serde(rename = "displayField", default)]
    pub display_field: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescriptorSys {
    pub id: String,
}

/// Description of one field on a content type
#[derive(Debug, Clone, Deserialize)]
pub struct FieldDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    /// Element descriptor for `Array` fields
    #[serde(default)]
    pub items: Option<serde_json::Value>,
}

impl FieldDescriptor {
    /// Element type id of an `Array` field, when declared
    pub fn item_kind(&self) -> Option<&str> {
        self.items
            .as_ref()
            .and_then(|v| v.get("type"))
            .and_then(|v| v.as_str())
    }
}
