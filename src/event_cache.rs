//! Per-event resource cache
//!
//! This is the heart of the gateway: a lazy, memoized derivation pipeline
//! that maps an event name to its namespace of derived artifacts and builds
//! each artifact at most once per TTL window.
//!
//! ## How It Works
//!
//! 1. **Event data**: fetched from the content source on first demand and
//!    cached; callers always receive an independent copy
//! 2. **Schema introspection + request handler**: co-products of a single
//!    schema build (list content types → type graph → schema → fixed
//!    introspection query → handler), cached together from that one build
//! 3. **Expiry**: every artifact lives in a [`TtlStore`] entry, so changed
//!    event configuration propagates once the TTL lapses — there is no
//!    explicit invalidation signal
//! 4. **Single-flight**: concurrent callers for the same missing artifact
//!    share one build instead of racing the collaborators
//!
//! Collaborator failures propagate to the caller unchanged; nothing partial
//! is cached, so the next call re-attempts the build.

use crate::content_source::{ContentSource, EventFilter};
use crate::error::{Error, Result};
use crate::handler::{HandlerFactory, RequestHandler};
use crate::schema::SchemaFactory;
use crate::tenant::{ArtifactKey, ArtifactKind, TenantKey};
use crate::ttl_store::TtlStore;
use crate::types::{EventData, HandlerOptions, IntrospectionDoc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

/// Cache tuning knobs
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Lifetime of every cached artifact
    pub lifetime: Duration,

    /// When set, a completed handler build re-stamps the event-data entry so
    /// all three artifacts of the namespace expire on one schedule. The
    /// default keeps the artifacts on independent clocks: each TTL starts at
    /// its own build time.
    pub couple_artifact_lifetimes: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            lifetime: Duration::from_millis(120_000),
            couple_artifact_lifetimes: false,
        }
    }
}

/// One cached artifact
///
/// Event data is externally mutable and therefore cloned out deeply on every
/// read; handlers are immutable once built and shared by reference. The
/// `Clone` impl realizes exactly that split.
#[derive(Clone)]
pub enum Artifact {
    Event(EventData),
    Introspection(IntrospectionDoc),
    Handler(Arc<dyn RequestHandler>),
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Artifact::Event(data) => f.debug_tuple("Event").field(&data.name).finish(),
            Artifact::Introspection(_) => f.write_str("Introspection"),
            Artifact::Handler(_) => f.write_str("Handler"),
        }
    }
}

/// Lazy, memoized, per-event derivation pipeline over a [`TtlStore`]
///
/// Constructed once by the gateway's composition root and shared with the
/// routing layer; it holds no global state.
pub struct EventCache {
    source: Arc<dyn ContentSource>,
    schemas: Arc<dyn SchemaFactory>,
    handlers: Arc<dyn HandlerFactory>,
    store: TtlStore<ArtifactKey, Artifact>,
    /// One guard per (tenant, build group); the loser of a race re-checks
    /// the store under the guard instead of starting its own build
    in_flight: Mutex<HashMap<ArtifactKey, Arc<AsyncMutex<()>>>>,
    couple_lifetimes: bool,
}

impl EventCache {
    pub fn new(
        source: Arc<dyn ContentSource>,
        schemas: Arc<dyn SchemaFactory>,
        handlers: Arc<dyn HandlerFactory>,
        options: CacheOptions,
    ) -> Self {
        Self {
            source,
            schemas,
            handlers,
            store: TtlStore::new(options.lifetime),
            in_flight: Mutex::new(HashMap::new()),
            couple_lifetimes: options.couple_artifact_lifetimes,
        }
    }

    fn flight_guard(&self, key: &ArtifactKey) -> Arc<AsyncMutex<()>> {
        let mut guards = self.in_flight.lock();
        guards.entry(key.clone()).or_default().clone()
    }

    fn cached_event(&self, key: &ArtifactKey) -> Option<EventData> {
        match self.store.get(key) {
            Some(Artifact::Event(data)) => Some(data),
            _ => None,
        }
    }

    fn cached_handler(&self, key: &ArtifactKey) -> Option<Arc<dyn RequestHandler>> {
        match self.store.get(key) {
            Some(Artifact::Handler(handler)) => Some(handler),
            _ => None,
        }
    }

    fn cached_introspection(&self, key: &ArtifactKey) -> Option<IntrospectionDoc> {
        match self.store.get(key) {
            Some(Artifact::Introspection(doc)) => Some(doc),
            _ => None,
        }
    }

    /// Configuration of the named event (or the default event when no name
    /// is given)
    ///
    /// The returned value is an independent copy: mutating it cannot affect
    /// what later callers receive.
    pub async fn get_event_data(&self, name: Option<&str>) -> Result<EventData> {
        let tenant = TenantKey::resolve(name);
        let key = ArtifactKey::new(tenant.clone(), ArtifactKind::EventData);

        if let Some(data) = self.cached_event(&key) {
            debug!(event = %data.name, "found cached event");
            return Ok(data);
        }

        let guard = self.flight_guard(&key);
        let _held = guard.lock().await;
        if let Some(data) = self.cached_event(&key) {
            debug!(event = %data.name, "found cached event");
            return Ok(data);
        }

        let filter = match &tenant {
            TenantKey::Named(n) => EventFilter::Named(n.clone()),
            TenantKey::Default => EventFilter::Default,
        };
        let data = self
            .source
            .fetch_event(&filter)
            .await?
            .ok_or_else(|| Error::EventNotFound(tenant.to_string()))?;

        debug!(event = %data.name, "fetched event");
        self.store.set(key, Artifact::Event(data.clone()));
        Ok(data)
    }

    /// The request-handling unit for the named event, building it (and its
    /// introspection document) on first demand
    ///
    /// Handlers are immutable and shared: cache hits return the same
    /// underlying handler.
    pub async fn get_request_handler(
        &self,
        name: Option<&str>,
    ) -> Result<Arc<dyn RequestHandler>> {
        let tenant = TenantKey::resolve(name);
        let key = ArtifactKey::new(tenant.clone(), ArtifactKind::RequestHandler);

        if let Some(handler) = self.cached_handler(&key) {
            debug!(event = %tenant, "returning cached handler");
            return Ok(handler);
        }

        let guard = self.flight_guard(&key);
        let _held = guard.lock().await;
        if let Some(handler) = self.cached_handler(&key) {
            debug!(event = %tenant, "returning cached handler");
            return Ok(handler);
        }

        info!(event = %tenant, "creating GraphQL handler");

        let data = self.get_event_data(name).await?;
        let credentials = data.credentials()?;

        let content_types = self.schemas.list_content_types(&credentials).await?;
        let graph = self.schemas.build_type_graph(content_types)?;
        let schema = self.schemas.build_schema(&graph, &credentials)?;
        let introspection = self.schemas.introspect(&schema).await?;
        let handler = self
            .handlers
            .build(schema, &credentials, &HandlerOptions::default())?;

        // Both co-products of the build are cached together
        self.store.set(
            ArtifactKey::new(tenant.clone(), ArtifactKind::SchemaIntrospection),
            Artifact::Introspection(introspection),
        );
        self.store.set(key, Artifact::Handler(handler.clone()));
        if self.couple_lifetimes {
            self.store.set(
                ArtifactKey::new(tenant, ArtifactKind::EventData),
                Artifact::Event(data),
            );
        }

        Ok(handler)
    }

    /// The introspection document describing the named event's schema
    ///
    /// A cache miss pays the full handler build: the document is only ever
    /// produced as a co-product of building the handler.
    pub async fn get_schema_introspection(
        &self,
        name: Option<&str>,
    ) -> Result<IntrospectionDoc> {
        let tenant = TenantKey::resolve(name);
        let key = ArtifactKey::new(tenant, ArtifactKind::SchemaIntrospection);

        if let Some(doc) = self.cached_introspection(&key) {
            return Ok(doc);
        }

        self.get_request_handler(name).await?;
        self.cached_introspection(&key)
            .ok_or_else(|| Error::Internal("introspection missing after schema build".into()))
    }

    /// Every event entry, for the landing page
    ///
    /// A pass-through to the content source: the listing belongs to no event
    /// namespace and is not cached.
    pub async fn list_events(&self) -> Result<Vec<EventData>> {
        self.source.list_events().await
    }
}

impl std::fmt::Debug for EventCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventCache")
            .field("store", &self.store)
            .field("couple_lifetimes", &self.couple_lifetimes)
            .finish()
    }
}
