//! Per-event schema synthesis
//!
//! Turns a space's content-type metadata into a queryable GraphQL schema:
//! content types are fetched from the event's own space, shaped into a type
//! graph with GraphQL-safe naming, and realized as an
//! [`async_graphql::dynamic::Schema`] whose resolvers read entries from that
//! space. A fixed introspection query run against the finished schema yields
//! the serializable shape document the cache stores next to the handler.

use crate::delivery::{ContentTypeDescriptor, DeliveryClient, Entry, FieldDescriptor};
use crate::error::{Error, Result};
use crate::types::{IntrospectionDoc, SpaceCredentials};
use async_graphql::dynamic::{Field, FieldFuture, FieldValue, InputValue, Object, Scalar, Schema, TypeRef};
use async_graphql::Value as GqlValue;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// The derived schema type; opaque to the cache
pub type DynamicSchema = Schema;

/// Name of the catch-all scalar for structured field values
const JSON_SCALAR: &str = "JSON";

/// The fixed query run against every freshly built schema to produce its
/// introspection document
pub const INTROSPECTION_QUERY: &str = "{
  __schema {
    types {
      kind
      name
      possibleTypes {
        name
      }
    }
  }
}";

/// Builds the schema-side artifacts for one event
#[async_trait]
pub trait SchemaFactory: Send + Sync {
    /// Resolve the content-type metadata of the event's space
    async fn list_content_types(
        &self,
        credentials: &SpaceCredentials,
    ) -> Result<Vec<ContentTypeDescriptor>>;

    /// Shape raw descriptors into a GraphQL-ready type graph
    fn build_type_graph(&self, content_types: Vec<ContentTypeDescriptor>) -> Result<TypeGraph>;

    /// Synthesize an executable schema over the type graph
    fn build_schema(
        &self,
        graph: &TypeGraph,
        credentials: &SpaceCredentials,
    ) -> Result<DynamicSchema>;

    /// Run the fixed introspection query against a built schema
    async fn introspect(&self, schema: &DynamicSchema) -> Result<IntrospectionDoc>;
}

/// GraphQL-ready view of a space's content model
#[derive(Debug, Clone, PartialEq)]
pub struct TypeGraph {
    pub types: Vec<GraphType>,
}

/// One content type mapped to a GraphQL object type
#[derive(Debug, Clone, PartialEq)]
pub struct GraphType {
    /// GraphQL object type name (PascalCase, deduplicated)
    pub type_name: String,
    /// Root query field serving a single entry of this type
    pub query_field: String,
    /// Backend content type id the resolvers filter on
    pub content_type_id: String,
    pub fields: Vec<GraphField>,
}

/// One content-type field mapped to a GraphQL field
#[derive(Debug, Clone, PartialEq)]
pub struct GraphField {
    pub name: String,
    /// Field id in the backend entry payload
    pub source_id: String,
    pub kind: FieldKind,
    pub required: bool,
}

/// GraphQL realization of a backend field type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Str,
    Int,
    Float,
    Bool,
    StrList,
    /// Structured values (links, locations, rich text, mixed arrays) are
    /// served through the catch-all JSON scalar
    Json,
}

impl FieldKind {
    fn from_descriptor(descriptor: &FieldDescriptor) -> Self {
        match descriptor.kind.as_str() {
            "Symbol" | "Text" | "Date" => FieldKind::Str,
            "Integer" => FieldKind::Int,
            "Number" => FieldKind::Float,
            "Boolean" => FieldKind::Bool,
            "Array" if descriptor.item_kind() == Some("Symbol") => FieldKind::StrList,
            _ => FieldKind::Json,
        }
    }

    fn type_ref(&self, required: bool) -> TypeRef {
        match (self, required) {
            (FieldKind::Str, false) => TypeRef::named(TypeRef::STRING),
            (FieldKind::Str, true) => TypeRef::named_nn(TypeRef::STRING),
            (FieldKind::Int, false) => TypeRef::named(TypeRef::INT),
            (FieldKind::Int, true) => TypeRef::named_nn(TypeRef::INT),
            (FieldKind::Float, false) => TypeRef::named(TypeRef::FLOAT),
            (FieldKind::Float, true) => TypeRef::named_nn(TypeRef::FLOAT),
            (FieldKind::Bool, false) => TypeRef::named(TypeRef::BOOLEAN),
            (FieldKind::Bool, true) => TypeRef::named_nn(TypeRef::BOOLEAN),
            (FieldKind::StrList, false) => TypeRef::named_nn_list(TypeRef::STRING),
            (FieldKind::StrList, true) => TypeRef::named_nn_list_nn(TypeRef::STRING),
            (FieldKind::Json, false) => TypeRef::named(JSON_SCALAR),
            (FieldKind::Json, true) => TypeRef::named_nn(JSON_SCALAR),
        }
    }

    fn convert(&self, value: &serde_json::Value) -> async_graphql::Result<GqlValue> {
        Ok(GqlValue::from_json(value.clone())?)
    }
}

impl TypeGraph {
    /// Build a graph from raw descriptors, sanitizing and deduplicating
    /// names
    pub fn prepare(content_types: Vec<ContentTypeDescriptor>) -> Result<Self> {
        if content_types.is_empty() {
            return Err(Error::SchemaBuild("space has no content types".into()));
        }

        let mut seen_types: HashSet<String> = HashSet::new();
        let mut types = Vec::with_capacity(content_types.len());

        for descriptor in content_types {
            let type_name = unique_name(graphql_type_name(&descriptor.name), &mut seen_types);
            let query_field = lower_first(&type_name);

            let mut seen_fields: HashSet<String> = HashSet::new();
            seen_fields.insert("id".to_string()); // reserved for sys.id
            let mut fields = Vec::with_capacity(descriptor.fields.len());
            for field in &descriptor.fields {
                let name = unique_name(graphql_field_name(&field.id), &mut seen_fields);
                fields.push(GraphField {
                    name,
                    source_id: field.id.clone(),
                    kind: FieldKind::from_descriptor(field),
                    required: field.required,
                });
            }

            types.push(GraphType {
                type_name,
                query_field,
                content_type_id: descriptor.sys.id,
                fields,
            });
        }

        Ok(Self { types })
    }

    /// Names of the mapped object types, for logging
    pub fn type_names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.type_name.as_str()).collect()
    }
}

/// Schema factory reading content models over the delivery API
pub struct SpaceSchemaFactory {
    base_url: Option<String>,
}

impl SpaceSchemaFactory {
    pub fn new() -> Self {
        Self { base_url: None }
    }

    /// Point every derived space client at a custom delivery host
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
        }
    }

    fn client_for(&self, credentials: &SpaceCredentials) -> Result<DeliveryClient> {
        match &self.base_url {
            Some(url) => DeliveryClient::with_base_url(
                url.clone(),
                credentials.space_id.clone(),
                &credentials.cda_token,
            ),
            None => DeliveryClient::new(credentials.space_id.clone(), &credentials.cda_token),
        }
    }
}

impl Default for SpaceSchemaFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaFactory for SpaceSchemaFactory {
    async fn list_content_types(
        &self,
        credentials: &SpaceCredentials,
    ) -> Result<Vec<ContentTypeDescriptor>> {
        debug!(space = %credentials.space_id, "fetching content types");
        let client = self.client_for(credentials)?;
        client.content_types().await
    }

    fn build_type_graph(&self, content_types: Vec<ContentTypeDescriptor>) -> Result<TypeGraph> {
        let graph = TypeGraph::prepare(content_types)?;
        debug!(types = %graph.type_names().join(", "), "content types prepared");
        Ok(graph)
    }

    fn build_schema(
        &self,
        graph: &TypeGraph,
        credentials: &SpaceCredentials,
    ) -> Result<DynamicSchema> {
        debug!(space = %credentials.space_id, "creating GraphQL schema");
        let client = self.client_for(credentials)?;
        build_space_schema(graph, client)
    }

    async fn introspect(&self, schema: &DynamicSchema) -> Result<IntrospectionDoc> {
        let response = schema.execute(INTROSPECTION_QUERY).await;
        if !response.errors.is_empty() {
            let messages = response
                .errors
                .iter()
                .map(|e| e.message.clone())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::SchemaBuild(format!(
                "introspection failed: {}",
                messages
            )));
        }
        Ok(IntrospectionDoc(serde_json::to_value(&response.data)?))
    }
}

/// Realize a type graph as an executable schema whose resolvers read from
/// `client`'s space
pub fn build_space_schema(graph: &TypeGraph, client: DeliveryClient) -> Result<DynamicSchema> {
    let client = Arc::new(client);
    let mut query = Object::new("Query");
    let mut objects = Vec::with_capacity(graph.types.len());

    for ty in &graph.types {
        let mut obj = Object::new(&ty.type_name);

        obj = obj.field(Field::new("id", TypeRef::named_nn(TypeRef::ID), |ctx| {
            FieldFuture::new(async move {
                let entry = ctx.parent_value.try_downcast_ref::<Entry>()?;
                Ok(Some(FieldValue::value(GqlValue::from(
                    entry.sys.id.clone(),
                ))))
            })
        }));

        for field in &ty.fields {
            let source = field.source_id.clone();
            let kind = field.kind;
            obj = obj.field(Field::new(
                &field.name,
                kind.type_ref(field.required),
                move |ctx| {
                    let source = source.clone();
                    FieldFuture::new(async move {
                        let entry = ctx.parent_value.try_downcast_ref::<Entry>()?;
                        match entry.fields.get(&source) {
                            Some(value) if !value.is_null() => {
                                Ok(Some(FieldValue::value(kind.convert(value)?)))
                            }
                            _ => Ok(None),
                        }
                    })
                },
            ));
        }
        objects.push(obj);

        let ct_id = ty.content_type_id.clone();
        query = query.field(
            Field::new(&ty.query_field, TypeRef::named(&ty.type_name), move |ctx| {
                let ct_id = ct_id.clone();
                FieldFuture::new(async move {
                    let client = ctx.data::<Arc<DeliveryClient>>()?;
                    let id_arg = ctx.args.try_get("id")?;
                    let id = id_arg.string()?.to_owned();
                    match client.entry(&id).await? {
                        Some(entry)
                            if entry
                                .sys
                                .content_type_id()
                                .map_or(true, |ct| ct == ct_id) =>
                        {
                            Ok(Some(FieldValue::owned_any(entry)))
                        }
                        _ => Ok(None),
                    }
                })
            })
            .argument(InputValue::new("id", TypeRef::named_nn(TypeRef::ID))),
        );

        let ct_id = ty.content_type_id.clone();
        query = query.field(
            Field::new(
                format!("{}Collection", ty.query_field),
                TypeRef::named_nn_list(&ty.type_name),
                move |ctx| {
                    let ct_id = ct_id.clone();
                    FieldFuture::new(async move {
                        let client = ctx.data::<Arc<DeliveryClient>>()?;
                        let limit = ctx
                            .args
                            .get("limit")
                            .and_then(|v| v.u64().ok())
                            .unwrap_or(100)
                            .to_string();
                        let skip = ctx
                            .args
                            .get("skip")
                            .and_then(|v| v.u64().ok())
                            .unwrap_or(0)
                            .to_string();
                        let page = client
                            .entries(&[
                                ("content_type", ct_id.as_str()),
                                ("limit", limit.as_str()),
                                ("skip", skip.as_str()),
                            ])
                            .await?;
                        Ok(Some(FieldValue::list(
                            page.items.into_iter().map(FieldValue::owned_any),
                        )))
                    })
                },
            )
            .argument(InputValue::new("limit", TypeRef::named(TypeRef::INT)))
            .argument(InputValue::new("skip", TypeRef::named(TypeRef::INT))),
        );
    }

    let mut builder = Schema::build("Query", None, None)
        .register(Scalar::new(JSON_SCALAR))
        .data(client);
    builder = builder.register(query);
    for obj in objects {
        builder = builder.register(obj);
    }
    builder
        .finish()
        .map_err(|e| Error::SchemaBuild(e.to_string()))
}

/// PascalCase GraphQL type name from an arbitrary display name
fn graphql_type_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if upper_next {
                out.extend(ch.to_uppercase());
                upper_next = false;
            } else {
                out.push(ch);
            }
        } else {
            upper_next = true;
        }
    }
    if out.is_empty() {
        out.push_str("Entry");
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// GraphQL field name from a backend field id
fn graphql_field_name(id: &str) -> String {
    let mut out: String = id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if out.is_empty() {
        out.push_str("field");
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    lower_first(&out)
}

fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn unique_name(base: String, seen: &mut HashSet<String>) -> String {
    if seen.insert(base.clone()) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}{}", base, n);
        if seen.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(id: &str, name: &str, fields: serde_json::Value) -> ContentTypeDescriptor {
        serde_json::from_value(json!({
            "sys": { "id": id },
            "name": name,
            "fields": fields
        }))
        .unwrap()
    }

    #[test]
    fn type_graph_sanitizes_and_deduplicates_names() {
        let graph = TypeGraph::prepare(vec![
            descriptor(
                "talk",
                "Conference Talk",
                json!([
                    { "id": "title", "type": "Symbol", "required": true },
                    { "id": "durationMinutes", "type": "Integer" },
                    { "id": "tags", "type": "Array", "items": { "type": "Symbol" } },
                    { "id": "venueMap", "type": "Location" }
                ]),
            ),
            descriptor("talk2", "conference talk", json!([])),
        ])
        .unwrap();

        assert_eq!(graph.type_names(), vec!["ConferenceTalk", "ConferenceTalk2"]);
        assert_eq!(graph.types[0].query_field, "conferenceTalk");

        let talk = &graph.types[0];
        assert_eq!(talk.fields[0].kind, FieldKind::Str);
        assert!(talk.fields[0].required);
        assert_eq!(talk.fields[1].kind, FieldKind::Int);
        assert_eq!(talk.fields[2].kind, FieldKind::StrList);
        assert_eq!(talk.fields[3].kind, FieldKind::Json);
    }

    #[test]
    fn field_named_id_yields_to_the_sys_field() {
        let graph = TypeGraph::prepare(vec![descriptor(
            "talk",
            "Talk",
            json!([{ "id": "id", "type": "Symbol" }]),
        )])
        .unwrap();

        // The entry's own "id" field is renamed, sys.id keeps the name
        assert_eq!(graph.types[0].fields[0].name, "id2");
        assert_eq!(graph.types[0].fields[0].source_id, "id");
    }

    #[test]
    fn empty_space_is_a_schema_build_error() {
        assert!(matches!(
            TypeGraph::prepare(Vec::new()),
            Err(Error::SchemaBuild(_))
        ));
    }

    #[test]
    fn digit_prefixed_names_are_escaped() {
        assert_eq!(graphql_type_name("2024 Sessions"), "_2024Sessions");
        assert_eq!(graphql_field_name("3dModel"), "_3dModel");
        assert_eq!(graphql_field_name("__weird--id"), "__weirdid");
    }

    #[tokio::test]
    async fn built_schema_introspects_its_types() {
        let graph = TypeGraph::prepare(vec![descriptor(
            "talk",
            "Talk",
            json!([{ "id": "title", "type": "Symbol" }]),
        )])
        .unwrap();

        let client = DeliveryClient::new("space-1", "token").unwrap();
        let schema = build_space_schema(&graph, client).unwrap();

        let factory = SpaceSchemaFactory::new();
        let doc = factory.introspect(&schema).await.unwrap();
        let rendered = doc.as_json().to_string();
        assert!(rendered.contains("\"Talk\""));
        assert!(rendered.contains("__schema"));
    }
}
