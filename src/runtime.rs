//! Runtime support - HTTP routing over the per-event cache
//!
//! Every route resolves its event through the shared [`EventCache`] and maps
//! cache failures to HTTP responses. Secrets never leave the process: event
//! payloads serialize without their `secrets` field by construction.

use crate::error::Error;
use crate::event_cache::EventCache;
use crate::types::{EventData, GraphQLRequest, GraphQLResponse, IntrospectionDoc};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error};

/// Shared router state, injected by the gateway's composition root
pub struct AppState {
    cache: Arc<EventCache>,
    base_path: String,
}

/// Build the gateway router
pub fn router(cache: Arc<EventCache>, base_path: String) -> Router {
    let state = Arc::new(AppState { cache, base_path });

    Router::new()
        .route("/health", get(health))
        .route("/events", get(list_events))
        .route("/event", get(get_event))
        .route("/schema", get(default_event_schema))
        .route("/graphiql", get(default_event_graphiql))
        .route("/graphql", post(default_event_graphql))
        .route("/:event/schema", get(event_schema))
        .route("/:event/graphiql", get(event_graphiql))
        .route("/:event/graphql", post(event_graphql))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::EventNotFound(_) => StatusCode::NOT_FOUND,
            Error::ContentSource(_) | Error::Http(_) | Error::SchemaBuild(_) => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(code = self.code(), "request failed: {}", self);
        } else {
            debug!(code = self.code(), "request failed: {}", self);
        }
        let body = Json(json!({
            "error": self.public_message(),
            "code": self.code(),
        }));
        (status, body).into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Landing page listing of all events; `EventData` serialization hides
/// secrets
async fn list_events(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<EventData>>, Error> {
    let events = state.cache.list_events().await?;
    Ok(Json(events))
}

#[derive(Debug, Deserialize)]
struct EventQuery {
    name: Option<String>,
}

async fn get_event(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventQuery>,
) -> Result<Json<EventData>, Error> {
    let event = state.cache.get_event_data(query.name.as_deref()).await?;
    Ok(Json(event))
}

async fn event_schema(
    State(state): State<Arc<AppState>>,
    Path(event): Path<String>,
) -> Result<Json<IntrospectionDoc>, Error> {
    let doc = state.cache.get_schema_introspection(Some(&event)).await?;
    Ok(Json(doc))
}

async fn default_event_schema(
    State(state): State<Arc<AppState>>,
) -> Result<Json<IntrospectionDoc>, Error> {
    let doc = state.cache.get_schema_introspection(None).await?;
    Ok(Json(doc))
}

async fn event_graphql(
    State(state): State<Arc<AppState>>,
    Path(event): Path<String>,
    Json(request): Json<GraphQLRequest>,
) -> Result<Json<GraphQLResponse>, Error> {
    let handler = state.cache.get_request_handler(Some(&event)).await?;
    Ok(Json(handler.handle(request).await))
}

async fn default_event_graphql(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GraphQLRequest>,
) -> Result<Json<GraphQLResponse>, Error> {
    let handler = state.cache.get_request_handler(None).await?;
    Ok(Json(handler.handle(request).await))
}

async fn event_graphiql(
    State(state): State<Arc<AppState>>,
    Path(event): Path<String>,
) -> impl IntoResponse {
    Html(playground(&graphql_endpoint(&state.base_path, Some(&event))))
}

async fn default_event_graphiql(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Html(playground(&graphql_endpoint(&state.base_path, None)))
}

fn graphql_endpoint(base_path: &str, event: Option<&str>) -> String {
    match event {
        Some(event) => format!("{}{}/graphql", base_path, event),
        None => format!("{}graphql", base_path),
    }
}

fn playground(endpoint: &str) -> String {
    async_graphql::http::playground_source(async_graphql::http::GraphQLPlaygroundConfig::new(
        endpoint,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graphql_endpoint_joins_cleanly() {
        assert_eq!(graphql_endpoint("/", Some("summit")), "/summit/graphql");
        assert_eq!(graphql_endpoint("/", None), "/graphql");
        assert_eq!(
            graphql_endpoint("/content/", Some("summit")),
            "/content/summit/graphql"
        );
    }

    #[test]
    fn not_found_maps_to_404() {
        let response = Error::EventNotFound("missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn collaborator_failures_map_to_bad_gateway() {
        let response = Error::SchemaBuild("broken".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = Error::ContentSource("down".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn everything_else_is_internal() {
        let response = Error::Internal("boom".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
