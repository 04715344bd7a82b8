//! # content-graphql-gateway
//!
//! A multi-tenant content gateway: for each named "event" it lazily derives
//! a GraphQL schema and request handler from externally-fetched content-type
//! metadata, and serves them behind per-event HTTP routes.
//!
//! ## Features
//!
//! - **Per-event schemas**: automatic GraphQL schema synthesis from a
//!   space's content model
//! - **TTL caching**: every derived artifact expires after a bounded
//!   lifetime, so upstream configuration changes propagate without an
//!   invalidation signal
//! - **Single-flight builds**: concurrent requests for a missing artifact
//!   share one build instead of racing the backend
//! - **Copy-on-read event data**: callers can never corrupt the cache
//!   through a returned value
//!
//! ## Main Components
//!
//! - [`Gateway`]: the main entry point, created via [`GatewayBuilder`].
//! - [`EventCache`]: the per-event lazy-resource cache.
//! - [`TtlStore`]: the expiring key-value store underneath it.
//! - [`ContentSource`], [`SchemaFactory`], [`HandlerFactory`]: the external
//!   collaborators the cache orchestrates.
//!
//! ## Example
//!
//! ```rust,no_run
//! use content_graphql_gateway::{Config, Gateway};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let gateway = Gateway::builder().from_config(&config)?.build()?;
//!
//!     let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//!     axum::serve(listener, gateway.into_router()).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod content_source;
pub mod delivery;
pub mod error;
pub mod event_cache;
pub mod gateway;
pub mod handler;
pub mod runtime;
pub mod schema;
pub mod tenant;
pub mod ttl_store;
pub mod types;

pub use config::Config;
pub use content_source::{ContentSource, DeliverySource, EventFilter, EVENT_CONTENT_TYPE};
pub use delivery::{
    ContentTypeDescriptor, DeliveryClient, Entry, EntryPage, FieldDescriptor,
    DEFAULT_DELIVERY_BASE_URL,
};
pub use error::{Error, Result};
pub use event_cache::{Artifact, CacheOptions, EventCache};
pub use gateway::{Gateway, GatewayBuilder};
pub use handler::{GraphQLHandler, GraphQLHandlerFactory, HandlerFactory, RequestHandler};
pub use schema::{
    DynamicSchema, FieldKind, GraphField, GraphType, SchemaFactory, SpaceSchemaFactory, TypeGraph,
    INTROSPECTION_QUERY,
};
pub use tenant::{ArtifactKey, ArtifactKind, TenantKey};
pub use ttl_store::TtlStore;
pub use types::{
    EventData, EventSecrets, GraphQLRequest, GraphQLResponse, HandlerOptions, IntrospectionDoc,
    SpaceCredentials,
};
