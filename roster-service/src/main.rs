// Copyright (C) 2026 StarHuntingGames
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

mod bedrock;
mod config;
mod pipeline;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use lambda_http::run as lambda_run;
use roster_common::{ChatRequest, ErrorKind, PipelineError, RosterResult, USER_MESSAGE_REQUIRED};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{bedrock::BedrockInvoker, config::ServiceConfig, pipeline::RosterPipeline};

const LOG_PAYLOAD_MAX_CHARS: usize = 2000;

#[derive(Clone)]
struct AppState {
    pipeline: Arc<RosterPipeline>,
}

#[derive(Debug, Serialize)]
struct RosterResponse {
    result: RosterResult,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "roster_service=debug,roster_common=info,tower_http=info".to_string()
            }),
        )
        .init();

    let config = ServiceConfig::from_env()?;
    let invoker = BedrockInvoker::from_config(&config).await;
    let state = AppState {
        pipeline: Arc::new(RosterPipeline::new(Arc::new(invoker), config.encoder())),
    };
    info!(model_id = %config.model_id, region = %config.region, "roster pipeline ready");

    let app = build_router(state);

    if std::env::var("AWS_LAMBDA_RUNTIME_API").is_ok() {
        info!("AWS Lambda runtime detected; running roster-service in lambda mode");
        lambda_run(app)
            .await
            .map_err(|e| anyhow::Error::msg(format!("lambda runtime error: {e}")))?;
        return Ok(());
    }

    info!(bind_addr = %config.bind_addr, "roster-service listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/bedrock", post(roster_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"ok": true, "service": "roster-service"}))
}

async fn roster_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<RosterResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected chat request body");
        ApiError::bad_request(USER_MESSAGE_REQUIRED)
    })?;

    let request_id = Uuid::new_v4();
    info!(
        %request_id,
        message_chars = request.user_message.chars().count(),
        "roster request received"
    );

    let result = state
        .pipeline
        .handle(&request)
        .await
        .map_err(|e| ApiError::from_pipeline(request_id, e))?;

    Ok(Json(RosterResponse { result }))
}

fn truncate_log_field(value: &str, max_chars: usize) -> String {
    let mut out = String::new();
    for (idx, ch) in value.trim().chars().enumerate() {
        if idx >= max_chars {
            out.push_str("...[truncated]");
            return out;
        }
        out.push(ch);
    }
    out
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Log the full pipeline failure and keep only a generic message for the client.
    fn from_pipeline(request_id: Uuid, err: PipelineError) -> Self {
        if let Some(raw) = err.raw_payload() {
            error!(
                %request_id,
                error = %err,
                raw = %truncate_log_field(raw, LOG_PAYLOAD_MAX_CHARS),
                "model returned an unusable roster"
            );
        } else if err.kind() != ErrorKind::Validation {
            error!(%request_id, error = %err, "roster pipeline failed");
        }

        match err.kind() {
            ErrorKind::Validation => Self::bad_request(err.to_string()),
            ErrorKind::Configuration => Self::internal("Roster service is not configured"),
            ErrorKind::Invocation | ErrorKind::StreamRead => {
                Self::internal("Failed to get a response from the model")
            }
            ErrorKind::MalformedResponse => Self::internal("Failed to parse model response"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(status = %self.status, message = %self.message, "request failed");
        (
            self.status,
            Json(serde_json::json!({"error": self.message})),
        )
            .into_response()
    }
}
