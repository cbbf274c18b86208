use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::{routing::get, routing::post, Json, Router};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info};

use qna_core::{AnswerResult, MatchPolicy, Question};
use qna_engine::{resolve_question, EngineConfig};
use qna_kb::EntryStore;
use qna_llm::LlmClient;

struct AppState {
    store: EntryStore,
    provider: LlmClient,
    policy: MatchPolicy,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();
    let config = EngineConfig::load(None)?;
    let store = EntryStore::new(config.entry_source()?, config.kb_ttl);
    let provider = config.llm_client()?;
    let state = Arc::new(AppState {
        store,
        provider,
        policy: config.policy(),
    });
    let app = Router::new()
        .route("/", get(serve_ui))
        .route("/chat", post(handle_chat))
        .with_state(state);
    let addr: SocketAddr = std::env::var("QNA_BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8000".to_string())
        .parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening" = %addr);
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    question: Option<String>,
}

async fn handle_chat(
    State(state): State<Arc<AppState>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<AnswerResult>, AppError> {
    let Json(body) = body.map_err(AppError::bad_request)?;
    let raw = body
        .question
        .ok_or_else(|| AppError::bad_request("question is required"))?;
    let question = Question::parse(&raw).map_err(AppError::bad_request)?;
    let result = resolve_question(&state.store, &state.provider, &question, &state.policy)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(result))
}

async fn serve_ui() -> Html<&'static str> {
    Html(include_str!("../../../ui/index.html"))
}

#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn bad_request<E: ToString>(msg: E) -> Self {
        Self::BadRequest(msg.to_string())
    }

    fn internal<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::Internal(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": msg })),
            )
                .into_response(),
            AppError::Internal(err) => {
                error!("internal_error" = %err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn bad_request_renders_a_json_error() {
        let response = AppError::bad_request("question is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "question is required");
    }

    #[tokio::test]
    async fn internal_errors_never_leak_details() {
        let response = AppError::internal(anyhow::anyhow!("secret detail")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["error"], "internal error");
    }
}
