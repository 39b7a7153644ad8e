use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
    routing::{get, post},
};
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use vitals_knowledge::{ServiceInfo, ServiceKind};

use crate::assistant::{AssistantError, ReplyStream, UserProfile};
use crate::state::AppState;

/// Chat request from HTTP API
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Consultation request carrying the user's health data
#[derive(Debug, Deserialize)]
pub struct HealthChatRequest {
    pub message: String,
    #[serde(default)]
    pub user_data: UserProfile,
}

#[derive(Debug, Deserialize)]
pub struct KnowledgeRequest {
    pub content: String,
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RetrievalTestRequest {
    pub query: String,
    #[serde(default = "default_test_k")]
    pub k: usize,
}

fn default_test_k() -> usize {
    2
}

/// `{code, data: {response}, msg}` envelope for chat replies
#[derive(Debug, Serialize)]
pub struct ChatEnvelope {
    pub code: i32,
    pub data: ChatData,
    pub msg: String,
}

#[derive(Debug, Serialize)]
pub struct ChatData {
    pub response: String,
}

impl ChatEnvelope {
    fn success(response: String) -> Self {
        Self {
            code: 0,
            data: ChatData { response },
            msg: "success".to_string(),
        }
    }
}

/// One server-sent chat event
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct StreamChunk {
    pub content: String,
    pub done: bool,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub gateway: String,
}

#[derive(Debug, Serialize)]
pub struct RetrievalInfoResponse {
    pub status: String,
    pub service_class: String,
    pub performance_info: ServiceInfo,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Run the HTTP server
pub async fn run(state: Arc<AppState>, bind_addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Create the router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let ai = Router::new()
        .route("/chat", post(chat_handler))
        .route("/chat/stream", post(chat_stream_handler))
        .route("/health/chat", post(health_chat_handler))
        .route("/health/chat/stream", post(health_chat_stream_handler))
        .route("/health/knowledge", post(add_knowledge_handler));

    let rag = Router::new()
        .route("/info", get(rag_info_handler))
        .route("/test", post(rag_test_handler))
        .route("/benchmark", post(rag_benchmark_handler))
        .route("/reset", post(rag_reset_handler))
        .route("/cache/stats", get(cache_stats_handler))
        .route("/cache/clear", post(cache_clear_handler));

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1/ai", ai)
        .nest("/api/v1/rag", rag)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        gateway: "running".to_string(),
    })
}

/// Chat handler - POST /api/v1/ai/chat
async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    info!(message_len = request.message.len(), "Received chat request");

    match state.assistant.respond(&request.message).await {
        Ok(reply) => Json(ChatEnvelope::success(reply)).into_response(),
        Err(AssistantError::EmptyMessage) => {
            error_response(StatusCode::BAD_REQUEST, "message must not be empty")
        }
        Err(e) => {
            error!("Chat failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Streaming chat handler - POST /api/v1/ai/chat/stream
async fn chat_stream_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if request.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message must not be empty");
    }
    let stream_id = uuid::Uuid::new_v4();
    info!(%stream_id, "Starting chat stream");

    let replies = state.assistant.respond_stream(&request.message).await;
    sse_response(replies).into_response()
}

/// Consultation handler - POST /api/v1/ai/health/chat
async fn health_chat_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HealthChatRequest>,
) -> Response {
    if request.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message must not be empty");
    }
    info!(message_len = request.message.len(), "Received health consultation");

    let reply = state
        .assistant
        .respond_with_profile(&request.message, &request.user_data)
        .await;
    Json(ChatEnvelope::success(reply)).into_response()
}

/// Streaming consultation handler - POST /api/v1/ai/health/chat/stream
async fn health_chat_stream_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<HealthChatRequest>,
) -> Response {
    if request.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message must not be empty");
    }
    let stream_id = uuid::Uuid::new_v4();
    info!(%stream_id, "Starting health consultation stream");

    let replies = state
        .assistant
        .respond_with_profile_stream(&request.message, &request.user_data)
        .await;
    sse_response(replies).into_response()
}

/// Knowledge ingestion handler - POST /api/v1/ai/health/knowledge
async fn add_knowledge_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<KnowledgeRequest>,
) -> Response {
    let stored = state
        .assistant
        .add_knowledge(&request.content, request.source.as_deref())
        .await;
    if stored {
        Json(json!({ "message": "成功添加新知识" })).into_response()
    } else {
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "添加知识失败")
    }
}

/// Wrap reply pieces as `{"content", "done": false}` events followed by a
/// final `{"content": "", "done": true}`.
fn sse_response(replies: ReplyStream) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = replies
        .map(|content| StreamChunk {
            content,
            done: false,
        })
        .chain(stream::once(async {
            StreamChunk {
                content: String::new(),
                done: true,
            }
        }))
        .map(|chunk| Ok(chunk_event(&chunk)));
    Sse::new(events).keep_alive(KeepAlive::default())
}

fn chunk_event(chunk: &StreamChunk) -> Event {
    match Event::default().json_data(chunk) {
        Ok(event) => event,
        Err(e) => {
            error!("Failed to encode stream chunk: {}", e);
            Event::default().data(r#"{"content":"","done":true}"#)
        }
    }
}

fn service_class(kind: ServiceKind) -> String {
    kind.class_name().to_string()
}

/// GET /api/v1/rag/info
async fn rag_info_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let info = state.retrieval.info().await;
    Json(RetrievalInfoResponse {
        status: "active".to_string(),
        service_class: info.service_class.clone(),
        performance_info: info,
    })
}

/// POST /api/v1/rag/test
async fn rag_test_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RetrievalTestRequest>,
) -> Response {
    if request.k == 0 {
        return error_response(StatusCode::BAD_REQUEST, "k must be at least 1");
    }
    let report = state.retrieval.test_query(&request.query, request.k).await;
    Json(report).into_response()
}

/// POST /api/v1/rag/benchmark
async fn rag_benchmark_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.retrieval.benchmark().await)
}

/// POST /api/v1/rag/reset
async fn rag_reset_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.retrieval.reset().await;
    Json(json!({
        "message": "RAG服务已重置",
        "new_service_type": service_class(state.retrieval.kind()),
    }))
}

/// GET /api/v1/rag/cache/stats
async fn cache_stats_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.retrieval.cache_stats().await {
        Some(stats) => Json(stats).into_response(),
        None => Json(json!({
            "message": "当前RAG服务不支持缓存统计",
            "service_type": service_class(state.retrieval.kind()),
        }))
        .into_response(),
    }
}

/// POST /api/v1/rag/cache/clear
async fn cache_clear_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let message = if state.retrieval.clear_cache().await {
        "RAG缓存已清空"
    } else {
        "当前RAG服务不支持缓存清空"
    };
    Json(json!({
        "message": message,
        "service_type": service_class(state.retrieval.kind()),
    }))
}
