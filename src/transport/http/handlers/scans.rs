use crate::app::outcome::{LogScanOutcome, ScanLogsOutcome};
use crate::transport::http::handlers::common::{parse_hash_param, status_of};
use crate::transport::http::types::{json_422, ApiResponse, AppState, LogScanRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    get,
    path = "/api/products/{hash}/scans",
    params(("hash" = String, Path, description = "0x-prefixed product hash")),
    responses(
        (status = 200, description = "Scan history in ledger order", body = ScanLogsOutcome),
        (status = 400, description = "Malformed hash", body = ApiResponse),
        (status = 502, description = "Ledger call failed", body = ScanLogsOutcome),
        (status = 503, description = "Wallet not connected", body = ScanLogsOutcome)
    )
)]
pub async fn get_scan_logs_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> impl IntoResponse {
    let hash = match parse_hash_param(&hash) {
        Ok(h) => h,
        Err(resp) => return resp.into_response(),
    };

    let result = state.ledger.get_scan_logs(&hash).await;
    (status_of(&result), Json(ScanLogsOutcome::from(result))).into_response()
}

#[utoipa::path(
    post,
    path = "/api/products/{hash}/scans",
    params(("hash" = String, Path, description = "0x-prefixed product hash")),
    request_body = LogScanRequest,
    responses(
        (status = 200, description = "Scan appended", body = LogScanOutcome),
        (status = 400, description = "Malformed hash", body = ApiResponse),
        (status = 403, description = "Signing request rejected", body = LogScanOutcome),
        (status = 422, description = "Malformed body", body = ApiResponse),
        (status = 502, description = "Ledger call failed", body = LogScanOutcome),
        (status = 503, description = "Wallet not connected", body = LogScanOutcome)
    )
)]
pub async fn log_scan_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    request: Result<Json<LogScanRequest>, JsonRejection>,
) -> impl IntoResponse {
    let hash = match parse_hash_param(&hash) {
        Ok(h) => h,
        Err(resp) => return resp.into_response(),
    };
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{ location, userType: Consumer|Distributor|Retailer }").into_response(),
    };

    let result = state
        .ledger
        .log_scan(&hash, &request.location, request.user_type)
        .await;
    (status_of(&result), Json(LogScanOutcome::from(result))).into_response()
}
