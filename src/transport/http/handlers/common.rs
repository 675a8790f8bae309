use crate::crypto::hashing::ProductHash;
use crate::errors::LedgerError;
use crate::transport::http::types::ApiResponse;
use axum::http::StatusCode;
use axum::Json;

/// HTTP status for a failed ledger operation.
pub fn status_for(err: &LedgerError) -> StatusCode {
    match err {
        LedgerError::WalletNotConnected => StatusCode::SERVICE_UNAVAILABLE,
        LedgerError::UserRejected => StatusCode::FORBIDDEN,
        LedgerError::NotRegistered => StatusCode::NOT_FOUND,
        LedgerError::LedgerCallFailed(_) => StatusCode::BAD_GATEWAY,
        LedgerError::InvalidScanPayload(_) => StatusCode::BAD_REQUEST,
    }
}

pub fn status_of<T>(result: &Result<T, LedgerError>) -> StatusCode {
    match result {
        Ok(_) => StatusCode::OK,
        Err(e) => status_for(e),
    }
}

pub fn parse_hash_param(raw: &str) -> Result<ProductHash, (StatusCode, Json<ApiResponse>)> {
    raw.trim().parse().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse {
                success: false,
                data: None,
                error: Some(format!("Invalid product hash '{}': {}", raw, e)),
            }),
        )
    })
}
