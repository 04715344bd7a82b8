//! Per-event request handling
//!
//! A request handler is the opaque unit the cache hands to the routing
//! layer: it owns a derived schema and services one inbound GraphQL request
//! at a time. Handlers are immutable once built and shared by reference.

use crate::error::Result;
use crate::schema::DynamicSchema;
use crate::types::{
    ErrorLocation, GraphQLRequest, GraphQLResponse, HandlerOptions, ResponseError,
    SpaceCredentials,
};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;

/// Services inbound GraphQL requests for one event
///
/// Execution failures are reported inside the response envelope, never as a
/// transport error.
#[async_trait]
pub trait RequestHandler: Send + Sync + std::fmt::Debug {
    async fn handle(&self, request: GraphQLRequest) -> GraphQLResponse;
}

/// Builds a [`RequestHandler`] from a derived schema and the event's
/// credentials
pub trait HandlerFactory: Send + Sync {
    fn build(
        &self,
        schema: DynamicSchema,
        credentials: &SpaceCredentials,
        options: &HandlerOptions,
    ) -> Result<Arc<dyn RequestHandler>>;
}

/// The production handler: executes requests against the event's dynamic
/// schema and decorates responses per [`HandlerOptions`]
#[derive(Debug)]
pub struct GraphQLHandler {
    schema: DynamicSchema,
    options: HandlerOptions,
    space_id: String,
}

impl GraphQLHandler {
    pub fn new(schema: DynamicSchema, credentials: &SpaceCredentials, options: HandlerOptions) -> Self {
        Self {
            schema,
            options,
            space_id: credentials.space_id.clone(),
        }
    }

    /// The space this handler resolves against
    pub fn space_id(&self) -> &str {
        &self.space_id
    }

    fn map_error(&self, error: async_graphql::ServerError) -> ResponseError {
        let (locations, path) = if self.options.detailed_errors {
            (
                error
                    .locations
                    .iter()
                    .map(|loc| ErrorLocation {
                        line: loc.line,
                        column: loc.column,
                    })
                    .collect(),
                error
                    .path
                    .iter()
                    .map(|segment| match segment {
                        async_graphql::PathSegment::Field(name) => json!(name),
                        async_graphql::PathSegment::Index(idx) => json!(idx),
                    })
                    .collect(),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        ResponseError {
            message: error.message,
            locations,
            path,
        }
    }
}

#[async_trait]
impl RequestHandler for GraphQLHandler {
    async fn handle(&self, request: GraphQLRequest) -> GraphQLResponse {
        let started = Instant::now();

        let mut gql_request = async_graphql::Request::new(request.query);
        if let Some(operation_name) = request.operation_name {
            gql_request = gql_request.operation_name(operation_name);
        }
        if let Some(variables) = request.variables {
            gql_request = gql_request.variables(async_graphql::Variables::from_json(variables));
        }

        let response = self.schema.execute(gql_request).await;

        let data = match serde_json::to_value(&response.data) {
            Ok(serde_json::Value::Null) if !response.errors.is_empty() => None,
            Ok(value) => Some(value),
            Err(_) => None,
        };
        let errors = response
            .errors
            .into_iter()
            .map(|e| self.map_error(e))
            .collect();

        let mut extensions = serde_json::Map::new();
        if self.options.version {
            extensions.insert("version".into(), json!(env!("CARGO_PKG_VERSION")));
        }
        if self.options.timeline {
            extensions.insert(
                "timeline".into(),
                json!({ "durationMs": started.elapsed().as_millis() as u64 }),
            );
        }

        GraphQLResponse {
            data,
            errors,
            extensions: if extensions.is_empty() {
                None
            } else {
                Some(serde_json::Value::Object(extensions))
            },
        }
    }
}

/// Factory producing [`GraphQLHandler`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct GraphQLHandlerFactory;

impl HandlerFactory for GraphQLHandlerFactory {
    fn build(
        &self,
        schema: DynamicSchema,
        credentials: &SpaceCredentials,
        options: &HandlerOptions,
    ) -> Result<Arc<dyn RequestHandler>> {
        Ok(Arc::new(GraphQLHandler::new(schema, credentials, *options)))
    }
}
