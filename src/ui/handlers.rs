use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::shared::payload::{into_records, Page};
use crate::shared::search::{search, ListingSource, SearchOutcome};
use crate::shared::Resource;
use crate::ui::error::UiResult;
use crate::ui::query::ProxyQuery;
use crate::ui::state::UiState;

fn fetched_at() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn item_path(resource: Resource, id: &str) -> String {
    resource.item_path(id).unwrap_or_default()
}

/// Body of a paged listing under the resource's own key.
fn page_body(key: &str, page: Page) -> Value {
    let first_id = page.first_cursor();
    let last_id = page.next_cursor();
    let total = page.records.len();
    json!({
        key: page.records,
        "total": total,
        "has_more": page.has_more,
        "first_id": first_id,
        "last_id": last_id,
        "fetchedAt": fetched_at(),
    })
}

fn search_body(key: &str, outcome: SearchOutcome) -> Value {
    json!({
        "total": outcome.matched,
        key: outcome.matches,
        "scanned": outcome.scanned,
        "matched": outcome.matched,
        "has_more_scanned": outcome.has_more_scanned,
        "fetchedAt": fetched_at(),
    })
}

fn deleted_body(id: &str) -> Json<Value> {
    Json(json!({ "deleted": true, "id": id }))
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "healthy", "service": "aza-ui" }))
}

pub async fn list_agents(
    State(state): State<UiState>,
    Query(query): Query<ProxyQuery>,
) -> UiResult<Json<Value>> {
    let client = query.client(&state)?;
    let resource = if query.legacy() {
        Resource::Assistants
    } else {
        Resource::Agents
    };
    let params = query.list_params()?;

    let payload = client
        .get(
            resource.surface(),
            resource.collection().unwrap_or_default(),
            &params.to_query(),
        )
        .await?;
    let agents = into_records(payload, resource.list_key());
    debug!(count = agents.len(), legacy = query.legacy(), "listed agents");

    Ok(Json(json!({
        "total": agents.len(),
        "agents": agents,
        "fetchedAt": fetched_at(),
    })))
}

pub async fn delete_agent(
    State(state): State<UiState>,
    Path(id): Path<String>,
    Query(query): Query<ProxyQuery>,
) -> UiResult<Json<Value>> {
    let client = query.client(&state)?;
    let resource = if query.legacy() {
        Resource::Assistants
    } else {
        Resource::Agents
    };
    client
        .delete(resource.surface(), &item_path(resource, &id))
        .await?;
    info!(agent_id = %id, "deleted agent");
    Ok(deleted_body(&id))
}

async fn list_page(state: &UiState, query: &ProxyQuery, resource: Resource) -> UiResult<Json<Value>> {
    let client = query.client(state)?;
    let params = query.list_params()?;
    let payload = client
        .get(
            resource.surface(),
            resource.collection().unwrap_or_default(),
            &params.to_query(),
        )
        .await?;
    let page = Page::from_payload(payload, resource.list_key());
    Ok(Json(page_body(resource.list_key(), page)))
}

async fn search_listing(
    state: &UiState,
    query: &ProxyQuery,
    resource: Resource,
) -> UiResult<Json<Value>> {
    let client = query.client(state)?;
    let search_query = query.search_query()?;
    let source = ListingSource::new(client, resource)?;
    let outcome = search(&source, &search_query, &state.retry).await?;
    Ok(Json(search_body(resource.list_key(), outcome)))
}

pub async fn list_conversations(
    State(state): State<UiState>,
    Query(query): Query<ProxyQuery>,
) -> UiResult<Json<Value>> {
    list_page(&state, &query, Resource::Conversations).await
}

pub async fn search_conversations(
    State(state): State<UiState>,
    Query(query): Query<ProxyQuery>,
) -> UiResult<Json<Value>> {
    search_listing(&state, &query, Resource::Conversations).await
}

/// An empty or unparsable body creates a conversation with defaults.
pub async fn create_conversation(
    State(state): State<UiState>,
    Query(query): Query<ProxyQuery>,
    body: Bytes,
) -> UiResult<(StatusCode, Json<Value>)> {
    let client = query.client(&state)?;
    let body: Value = serde_json::from_slice(&body).unwrap_or_else(|_| json!({}));

    let resource = Resource::Conversations;
    let created = client
        .post(
            resource.surface(),
            resource.collection().unwrap_or_default(),
            &body,
        )
        .await?;
    let conversation_id = created.get("id").and_then(Value::as_str).unwrap_or("");
    info!(conversation_id, "created conversation");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn conversation_items(
    State(state): State<UiState>,
    Path(id): Path<String>,
    Query(query): Query<ProxyQuery>,
) -> UiResult<Json<Value>> {
    let client = query.client(&state)?;
    let params = query.list_params()?;
    let path = format!("{}/items", item_path(Resource::Conversations, &id));
    let payload = client
        .get(
            Resource::ConversationItems.surface(),
            &path,
            &params.to_query(),
        )
        .await?;
    Ok(Json(payload))
}

pub async fn delete_conversation(
    State(state): State<UiState>,
    Path(id): Path<String>,
    Query(query): Query<ProxyQuery>,
) -> UiResult<Json<Value>> {
    let client = query.client(&state)?;
    let resource = Resource::Conversations;
    client
        .delete(resource.surface(), &item_path(resource, &id))
        .await?;
    info!(conversation_id = %id, "deleted conversation");
    Ok(deleted_body(&id))
}

pub async fn list_responses(
    State(state): State<UiState>,
    Query(query): Query<ProxyQuery>,
) -> UiResult<Json<Value>> {
    list_page(&state, &query, Resource::Responses).await
}

pub async fn search_responses(
    State(state): State<UiState>,
    Query(query): Query<ProxyQuery>,
) -> UiResult<Json<Value>> {
    search_listing(&state, &query, Resource::Responses).await
}

pub async fn get_response(
    State(state): State<UiState>,
    Path(id): Path<String>,
    Query(query): Query<ProxyQuery>,
) -> UiResult<Json<Value>> {
    let client = query.client(&state)?;
    let resource = Resource::Responses;
    let payload = client
        .get(resource.surface(), &item_path(resource, &id), &[])
        .await?;
    Ok(Json(payload))
}

pub async fn delete_response(
    State(state): State<UiState>,
    Path(id): Path<String>,
    Query(query): Query<ProxyQuery>,
) -> UiResult<Json<Value>> {
    let client = query.client(&state)?;
    let resource = Resource::Responses;
    client
        .delete(resource.surface(), &item_path(resource, &id))
        .await?;
    info!(response_id = %id, "deleted response");
    Ok(deleted_body(&id))
}
