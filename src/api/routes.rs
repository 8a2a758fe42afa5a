use axum::{
    routing::get,
    Router,
    body::Bytes,
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use tower_http::trace::TraceLayer;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::api::models::{HealthResponse, VerifyQuery};
use crate::inbound::IncomingMessage;
use crate::signature::check_signature;
use crate::AppState;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/wechat", get(verify_handler).post(message_handler))
        .route("/download/:media_id", get(download_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn verify_handler(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    if check_signature(&state.config.wechat_token, &query.signature, &query.timestamp, &query.nonce) {
        info!("Signature handshake accepted");
        (StatusCode::OK, query.echostr).into_response()
    } else {
        warn!("Signature handshake rejected (timestamp={}, nonce={})", query.timestamp, query.nonce);
        (StatusCode::FORBIDDEN, "失败").into_response()
    }
}

/// Always answers `success` so the platform never redelivers; forwarding
/// failures only reach the log.
async fn message_handler(State(state): State<AppState>, body: Bytes) -> &'static str {
    let xml = String::from_utf8_lossy(&body);
    let message = IncomingMessage::parse(&xml);
    info!("Received {} message from {}", message.msg_type, message.openid);

    if let Err(e) = state.dispatcher.dispatch(&message).await {
        error!("{}", e);
    }

    "success"
}

async fn download_handler(
    State(state): State<AppState>,
    Path(media_id): Path<String>,
) -> Response {
    let location = match state.tokens.get_access_token().await {
        Ok(token) => state.wechat.media_download_url(&token, &media_id),
        Err(e) => Err(e),
    };

    match location {
        Ok(url) => (StatusCode::FOUND, [(header::LOCATION, url)]).into_response(),
        Err(e) => {
            error!("Media download for {} failed: {}", media_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
    })
}
