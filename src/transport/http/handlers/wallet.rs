use crate::transport::http::types::{ApiResponse, AppState};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    post,
    path = "/api/wallet/connect",
    responses(
        (status = 200, description = "Session established", body = ApiResponse),
        (status = 503, description = "Wallet could not be connected", body = ApiResponse)
    )
)]
pub async fn connect_wallet_handler(State(state): State<AppState>) -> impl IntoResponse {
    if !state.ledger.connect_wallet().await {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiResponse {
                success: false,
                data: None,
                error: Some("Wallet not connected".to_string()),
            }),
        );
    }

    let account = state.ledger.get_account_address().await;
    (
        StatusCode::OK,
        Json(ApiResponse {
            success: true,
            data: Some(serde_json::json!({ "account": account })),
            error: None,
        }),
    )
}

#[utoipa::path(
    get,
    path = "/api/wallet/account",
    responses(
        (status = 200, description = "Connected account, or null when no session exists", body = ApiResponse)
    )
)]
pub async fn account_handler(State(state): State<AppState>) -> impl IntoResponse {
    let account = state.ledger.get_account_address().await;
    Json(ApiResponse {
        success: true,
        data: Some(serde_json::json!({ "account": account })),
        error: None,
    })
}
