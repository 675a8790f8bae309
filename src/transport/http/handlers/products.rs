use crate::app::outcome::{RegisterOutcome, VerifyOutcome};
use crate::domain::product::ProductAttributes;
use crate::domain::scan_payload::ScanPayload;
use crate::transport::http::handlers::common::{parse_hash_param, status_of};
use crate::transport::http::types::{
    json_422, ApiResponse, AppState, RegisterResponse, ResolveScanRequest, ResolveScanResponse,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = ProductAttributes,
    responses(
        (status = 200, description = "Product registered", body = RegisterResponse),
        (status = 403, description = "Signing request rejected", body = RegisterResponse),
        (status = 422, description = "Malformed body", body = ApiResponse),
        (status = 502, description = "Ledger call failed", body = RegisterResponse),
        (status = 503, description = "Wallet not connected", body = RegisterResponse)
    )
)]
pub async fn register_product_handler(
    State(state): State<AppState>,
    request: Result<Json<ProductAttributes>, JsonRejection>,
) -> impl IntoResponse {
    let Json(attrs) = match request {
        Ok(v) => v,
        Err(e) => {
            return json_422(e, "{ name, manufacturingDate, batchNumber, location, additionalDetails? }")
                .into_response()
        }
    };

    let result = state.ledger.register_product(&attrs).await;
    let status = status_of(&result);
    let qr_payload = result
        .as_ref()
        .ok()
        .map(|hash| ScanPayload::for_product(*hash, &attrs).encode());

    (status, Json(RegisterResponse::new(RegisterOutcome::from(result), qr_payload))).into_response()
}

#[utoipa::path(
    get,
    path = "/api/products/{hash}",
    params(("hash" = String, Path, description = "0x-prefixed product hash")),
    responses(
        (status = 200, description = "Product is registered", body = VerifyOutcome),
        (status = 400, description = "Malformed hash", body = ApiResponse),
        (status = 404, description = "Product not found or not registered", body = VerifyOutcome),
        (status = 502, description = "Ledger call failed", body = VerifyOutcome),
        (status = 503, description = "Wallet not connected", body = VerifyOutcome)
    )
)]
pub async fn verify_product_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> impl IntoResponse {
    let hash = match parse_hash_param(&hash) {
        Ok(h) => h,
        Err(resp) => return resp.into_response(),
    };

    let result = state.ledger.verify_product(&hash).await;
    (status_of(&result), Json(VerifyOutcome::from(result))).into_response()
}

#[utoipa::path(
    post,
    path = "/api/products/resolve-scan",
    request_body = ResolveScanRequest,
    responses(
        (status = 200, description = "Label resolved and product verified", body = ResolveScanResponse),
        (status = 400, description = "Label content not recognised", body = ResolveScanResponse),
        (status = 404, description = "Product not found or not registered", body = ResolveScanResponse),
        (status = 422, description = "Malformed body", body = ApiResponse),
        (status = 502, description = "Ledger call failed", body = ResolveScanResponse),
        (status = 503, description = "Wallet not connected", body = ResolveScanResponse)
    )
)]
pub async fn resolve_scan_handler(
    State(state): State<AppState>,
    request: Result<Json<ResolveScanRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(request) = match request {
        Ok(v) => v,
        Err(e) => return json_422(e, "{ payload }").into_response(),
    };

    let result = state.ledger.verify_scanned_payload(&request.payload).await;
    (status_of(&result), Json(ResolveScanResponse::from(result))).into_response()
}
