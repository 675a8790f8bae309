use crate::app::outcome::{LogScanOutcome, RegisterOutcome, ScanLogsOutcome, VerifyOutcome};
use crate::domain::product::{ProductAttributes, ProductRecord, ScanLogEntry, UserType};
use crate::transport::http::handlers::{health, products, scans, wallet};
use crate::transport::http::types::{
    ApiResponse, AppState, LogScanRequest, RegisterResponse, ResolveScanRequest, ResolveScanResponse,
};
use axum::routing::{get, post};
use axum::Router;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::healthcheck_handler,
        wallet::connect_wallet_handler,
        wallet::account_handler,
        products::register_product_handler,
        products::verify_product_handler,
        products::resolve_scan_handler,
        scans::get_scan_logs_handler,
        scans::log_scan_handler
    ),
    components(schemas(
        ApiResponse,
        ProductAttributes,
        ProductRecord,
        ScanLogEntry,
        UserType,
        LogScanRequest,
        ResolveScanRequest,
        RegisterResponse,
        ResolveScanResponse,
        RegisterOutcome,
        VerifyOutcome,
        LogScanOutcome,
        ScanLogsOutcome
    ))
)]
#[allow(dead_code)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::healthcheck_handler))
        .route("/api/wallet/connect", post(wallet::connect_wallet_handler))
        .route("/api/wallet/account", get(wallet::account_handler))
        .route("/api/products", post(products::register_product_handler))
        .route("/api/products/resolve-scan", post(products::resolve_scan_handler))
        .route("/api/products/:hash", get(products::verify_product_handler))
        .route(
            "/api/products/:hash/scans",
            get(scans::get_scan_logs_handler).post(scans::log_scan_handler),
        )
        .with_state(app_state)
}
