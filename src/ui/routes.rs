use axum::{
    http::{header, HeaderValue},
    middleware,
    routing::{delete, get},
    Router,
};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::ui::handlers::{
    conversation_items, create_conversation, delete_agent, delete_conversation, delete_response,
    get_response, health, list_agents, list_conversations, list_responses, search_conversations,
    search_responses,
};
use crate::ui::logging_middleware::request_logging_middleware;
use crate::ui::state::UiState;

pub fn create_router(state: UiState) -> Router {
    // Unknown paths serve the single-page app shell.
    let index = state.dist_dir.join("index.html");
    let assets = ServeDir::new(&state.dist_dir).fallback(ServeFile::new(index));

    Router::new()
        .route("/health", get(health))
        .route("/api/agents", get(list_agents))
        .route("/api/agents/{id}", delete(delete_agent))
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route("/api/conversations/search", get(search_conversations))
        .route("/api/conversations/{id}", delete(delete_conversation))
        .route("/api/conversations/{id}/items", get(conversation_items))
        .route("/api/responses", get(list_responses))
        .route("/api/responses/search", get(search_responses))
        .route(
            "/api/responses/{id}",
            get(get_response).delete(delete_response),
        )
        .fallback_service(assets)
        .with_state(state)
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
}
