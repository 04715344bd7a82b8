//! Content source collaborator
//!
//! The resource cache resolves event names to event configuration through
//! this interface. Production uses [`DeliverySource`], which reads `event`
//! entries from the gateway's own space; tests substitute stubs.

use crate::delivery::{DeliveryClient, Entry};
use crate::error::Result;
use crate::types::EventData;
use async_trait::async_trait;
use tracing::debug;

/// Content type id of event entries in the gateway's space
pub const EVENT_CONTENT_TYPE: &str = "event";

/// Selects which event entry a fetch should return
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    /// The entry whose name equals the given string
    Named(String),
    /// The entry flagged as the default event
    Default,
}

/// Resolves event identifiers to event configuration
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch the single event entry matching `filter`
    ///
    /// Returns `Ok(None)` when no entry matches. When the backend returns
    /// more than one match, the first is used.
    async fn fetch_event(&self, filter: &EventFilter) -> Result<Option<EventData>>;

    /// Fetch every event entry, for the landing page listing
    async fn list_events(&self) -> Result<Vec<EventData>>;
}

/// Content source backed by the delivery API of the gateway's space
pub struct DeliverySource {
    client: DeliveryClient,
    content_type: String,
}

impl DeliverySource {
    pub fn new(client: DeliveryClient) -> Self {
        Self {
            client,
            content_type: EVENT_CONTENT_TYPE.to_string(),
        }
    }

    /// Override the content type id event entries are stored under
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    fn parse(entry: Entry) -> Result<EventData> {
        let data = serde_json::from_value(serde_json::Value::Object(entry.fields))?;
        Ok(data)
    }
}

#[async_trait]
impl ContentSource for DeliverySource {
    async fn fetch_event(&self, filter: &EventFilter) -> Result<Option<EventData>> {
        let page = match filter {
            EventFilter::Named(name) => {
                self.client
                    .entries(&[
                        ("content_type", self.content_type.as_str()),
                        ("fields.name", name.as_str()),
                        ("limit", "1"),
                    ])
                    .await?
            }
            EventFilter::Default => {
                self.client
                    .entries(&[
                        ("content_type", self.content_type.as_str()),
                        ("fields.isDefault", "true"),
                        ("limit", "1"),
                    ])
                    .await?
            }
        };

        debug!(?filter, matches = page.items.len(), "event lookup");
        page.items.into_iter().next().map(Self::parse).transpose()
    }

    async fn list_events(&self) -> Result<Vec<EventData>> {
        let page = self
            .client
            .entries(&[("content_type", self.content_type.as_str())])
            .await?;
        page.items.into_iter().map(Self::parse).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entry_fields_parse_into_event_data() {
        let entry: Entry = serde_json::from_value(json!({
            "sys": { "id": "e1" },
            "fields": {
                "name": "summit",
                "isDefault": true,
                "secrets": { "spaceId": "s1", "cdaToken": "t1" }
            }
        }))
        .unwrap();

        let event = DeliverySource::parse(entry).unwrap();
        assert_eq!(event.name, "summit");
        assert!(event.is_default);
        assert_eq!(event.credentials().unwrap().space_id, "s1");
    }

    #[test]
    fn entry_without_name_fails_to_parse() {
        let entry: Entry = serde_json::from_value(json!({
            "sys": { "id": "e1" },
            "fields": { "isDefault": true }
        }))
        .unwrap();

        assert!(DeliverySource::parse(entry).is_err());
    }
}
