// src/bin/api_server.rs

use product_ledger_client::infra::config::{self, LedgerConfig, WalletMode};
use product_ledger_client::infra::evm::AutoApprove;
use product_ledger_client::transport;
use product_ledger_client::{LedgerClient, TracingNotifier};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // --- Configuration ---
    println!("> Loading ledger configuration...");
    let ledger_config = LedgerConfig::from_env()?;
    println!(
        "> Ledger network: {} (chain {}) via {}",
        ledger_config.network.chain_name,
        ledger_config.network.chain_id,
        ledger_config.network.rpc_url().unwrap_or("<none>")
    );
    println!("> ProductRegistry at {}", ledger_config.contract.address);
    if ledger_config.wallet_mode == WalletMode::None {
        println!("> LEDGER_WALLET=none: every ledger operation will report 'Wallet not connected'.");
    }

    // --- Ledger Client Initialization ---
    // Requests arrive without a human in the loop, so signing is auto-approved.
    let ledger = LedgerClient::from_config(&ledger_config, Arc::new(AutoApprove), Arc::new(TracingNotifier))?;
    let app_state = transport::http::AppState {
        ledger: Arc::new(ledger),
    };
    println!("> LedgerClient initialized (session is negotiated on the first request).");

    // --- API Server Initialization ---
    println!("> Starting API server...");
    let bind_addr = config::api_bind_addr();
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(cors);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    println!("> API server listening on http://{}", bind_addr);
    println!("> Swagger UI available at http://{}/swagger-ui", bind_addr);
    println!("> Press Ctrl+C to shut down");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n> Shutdown signal received (Ctrl+C)...");
            println!("> Graceful shutdown complete.");
        }
    }

    Ok(())
}
