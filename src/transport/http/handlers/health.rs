use crate::transport::http::types::{ApiResponse, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "A wallet is installed", body = ApiResponse),
        (status = 503, description = "No wallet is installed", body = ApiResponse)
    )
)]
pub async fn healthcheck_handler(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.ledger.session();
    if session.wallet().is_none() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                success: false,
                data: Some(serde_json::json!({ "status": "unhealthy" })),
                error: Some("No wallet available".to_string()),
            }),
        )
            .into_response();
    }

    let current = session.current_session().await;
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: Some(serde_json::json!({
                "status": "ok",
                "chainId": session.network().chain_id,
                "connected": current.is_some(),
                "account": current.and_then(|s| s.account),
            })),
            error: None,
        }),
    )
        .into_response()
}
