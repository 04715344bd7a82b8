//! Gateway builder and main orchestration

use crate::config::{normalize_base_path, Config};
use crate::content_source::{ContentSource, DeliverySource};
use crate::delivery::DeliveryClient;
use crate::error::{Error, Result};
use crate::event_cache::{CacheOptions, EventCache};
use crate::handler::{GraphQLHandlerFactory, HandlerFactory};
use crate::runtime::router;
use crate::schema::{SchemaFactory, SpaceSchemaFactory};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;

/// Main Gateway struct - entry point for the library
///
/// The `Gateway` owns the per-event resource cache and wires it into the
/// HTTP routing layer. It is created via the [`GatewayBuilder`]; the cache
/// lives here, in the composition root, and is injected into the router —
/// there is no process-wide singleton.
///
/// # Example
///
/// ```rust,no_run
/// use content_graphql_gateway::{Config, Gateway};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::from_env()?;
/// let gateway = Gateway::builder().from_config(&config)?.build()?;
///
/// let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
/// axum::serve(listener, gateway.into_router()).await?;
/// # Ok(())
/// # }
/// ```
pub struct Gateway {
    cache: Arc<EventCache>,
    base_path: String,
}

impl Gateway {
    /// Create a new gateway builder
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::new()
    }

    /// Access the per-event resource cache
    pub fn cache(&self) -> Arc<EventCache> {
        Arc::clone(&self.cache)
    }

    /// Convert the gateway into an Axum router
    pub fn into_router(self) -> Router {
        router(self.cache, self.base_path)
    }
}

/// Builder for creating a [`Gateway`]
pub struct GatewayBuilder {
    source: Option<Arc<dyn ContentSource>>,
    schema_factory: Option<Arc<dyn SchemaFactory>>,
    handler_factory: Option<Arc<dyn HandlerFactory>>,
    cache_options: CacheOptions,
    base_path: String,
}

impl GatewayBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            schema_factory: None,
            handler_factory: None,
            cache_options: CacheOptions::default(),
            base_path: "/".to_string(),
        }
    }

    /// Wire the production collaborators from environment configuration
    pub fn from_config(self, config: &Config) -> Result<Self> {
        let client = DeliveryClient::new(config.space_id.clone(), &config.access_token)?;
        Ok(self
            .with_content_source(Arc::new(DeliverySource::new(client)))
            .with_schema_factory(Arc::new(SpaceSchemaFactory::new()))
            .cache_lifetime(config.cache_lifetime)
            .couple_artifact_lifetimes(config.couple_artifact_lifetimes)
            .base_path(config.base_path.clone()))
    }

    /// Set the content source resolving event names to configuration
    pub fn with_content_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Override the schema factory (defaults to [`SpaceSchemaFactory`])
    pub fn with_schema_factory(mut self, factory: Arc<dyn SchemaFactory>) -> Self {
        self.schema_factory = Some(factory);
        self
    }

    /// Override the handler factory (defaults to [`GraphQLHandlerFactory`])
    pub fn with_handler_factory(mut self, factory: Arc<dyn HandlerFactory>) -> Self {
        self.handler_factory = Some(factory);
        self
    }

    /// Lifetime of cached per-event artifacts
    pub fn cache_lifetime(mut self, lifetime: Duration) -> Self {
        self.cache_options.lifetime = lifetime;
        self
    }

    /// Expire a namespace's artifacts on one schedule instead of
    /// independently
    pub fn couple_artifact_lifetimes(mut self, couple: bool) -> Self {
        self.cache_options.couple_artifact_lifetimes = couple;
        self
    }

    /// Base path the per-event routes are mounted under
    pub fn base_path(mut self, base_path: String) -> Self {
        self.base_path = normalize_base_path(base_path);
        self
    }

    /// Build the gateway
    pub fn build(self) -> Result<Gateway> {
        let source = self
            .source
            .ok_or_else(|| Error::Config("a content source is required".into()))?;
        let schemas = self
            .schema_factory
            .unwrap_or_else(|| Arc::new(SpaceSchemaFactory::new()));
        let handlers = self
            .handler_factory
            .unwrap_or_else(|| Arc::new(GraphQLHandlerFactory));

        let cache = Arc::new(EventCache::new(
            source,
            schemas,
            handlers,
            self.cache_options,
        ));

        Ok(Gateway {
            cache,
            base_path: self.base_path,
        })
    }
}

impl Default for GatewayBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_without_a_source_is_a_config_error() {
        let result = Gateway::builder().build();
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
