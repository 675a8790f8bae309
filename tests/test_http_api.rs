//! HTTP surface test: serves the router on a local port, backed by the in-memory ledger,
//! and walks a product from registration through scans to label resolution.

mod common;

use common::{harness, walletless, Faults, MockWallet, ACCOUNT_0};
use product_ledger_client::{transport, LedgerClient};
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

async fn serve(ledger: LedgerClient) -> Result<String, Box<dyn std::error::Error>> {
    let state = transport::http::AppState {
        ledger: Arc::new(ledger),
    };
    let router = transport::http::create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Ok(format!("http://{}", addr))
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(10))
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn product_lifecycle_over_http() -> Result<(), Box<dyn std::error::Error>> {
    let h = harness(MockWallet::with_network());
    let wallet = h.wallet.clone();
    let base_url = serve(h.ledger).await?;
    let client = client();

    // Health before any session exists.
    let health = client.get(format!("{}/health", base_url)).send().await?;
    assert_eq!(health.status(), 200);
    let body: JsonValue = health.json().await?;
    assert_eq!(body["data"]["connected"], false);
    assert_eq!(body["data"]["chainId"], 31337);

    // No account until someone connects, and asking does not prompt.
    let body: JsonValue = client
        .get(format!("{}/api/wallet/account", base_url))
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(body["data"]["account"], JsonValue::Null);
    assert_eq!(wallet.calls("eth_requestAccounts"), 0);

    let connect = client.post(format!("{}/api/wallet/connect", base_url)).send().await?;
    assert_eq!(connect.status(), 200);
    let body: JsonValue = connect.json().await?;
    assert_eq!(body["data"]["account"], ACCOUNT_0);

    // Register.
    let register = client
        .post(format!("{}/api/products", base_url))
        .json(&json!({
            "name": "Widget",
            "manufacturingDate": "2024-01-01",
            "batchNumber": "B100",
            "location": "Factory1",
            "additionalDetails": ""
        }))
        .send()
        .await?;
    assert_eq!(register.status(), 200);
    let body: JsonValue = register.json().await?;
    assert_eq!(body["success"], true);
    let hash = body["hash"].as_str().unwrap().to_string();
    assert_eq!(hash, "0xd46ddc3db88bb9b647f5401671e11b3fd8b052df810f106997bf75bcb9314193");
    let label = body["qrPayload"].as_str().unwrap().to_string();
    let label_json: JsonValue = serde_json::from_str(&label)?;
    assert_eq!(label_json["hash"], hash.as_str());
    assert_eq!(label_json["name"], "Widget");

    // Verify.
    let verify = client.get(format!("{}/api/products/{}", base_url, hash)).send().await?;
    assert_eq!(verify.status(), 200);
    let body: JsonValue = verify.json().await?;
    assert_eq!(body["success"], true);
    assert_eq!(body["product"]["batchNumber"], "B100");
    assert_eq!(body["product"]["isRegistered"], true);
    assert_eq!(body["product"]["manufacturer"], ACCOUNT_0);

    // Two scans, read back in order.
    for (location, user_type) in [("Warehouse", "Distributor"), ("Store", "Retailer")] {
        let logged = client
            .post(format!("{}/api/products/{}/scans", base_url, hash))
            .json(&json!({ "location": location, "userType": user_type }))
            .send()
            .await?;
        assert_eq!(logged.status(), 200);
        let body: JsonValue = logged.json().await?;
        assert_eq!(body, json!({ "success": true }));
    }

    let scans: JsonValue = client
        .get(format!("{}/api/products/{}/scans", base_url, hash))
        .send()
        .await?
        .json()
        .await?;
    let logs = scans["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["location"], "Warehouse");
    assert_eq!(logs[0]["userType"], "Distributor");
    assert_eq!(logs[1]["userType"], "Retailer");

    // Resolve the printed label.
    let resolved = client
        .post(format!("{}/api/products/resolve-scan", base_url))
        .json(&json!({ "payload": label }))
        .send()
        .await?;
    assert_eq!(resolved.status(), 200);
    let body: JsonValue = resolved.json().await?;
    assert_eq!(body["hash"], hash.as_str());
    assert_eq!(body["product"]["name"], "Widget");
    assert_eq!(body["logs"].as_array().map(Vec::len), Some(2));

    assert_eq!(wallet.calls("eth_requestAccounts"), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn errors_map_to_status_codes() -> Result<(), Box<dyn std::error::Error>> {
    let h = harness(MockWallet::with_network());
    let wallet = h.wallet.clone();
    let base_url = serve(h.ledger).await?;
    let client = client();
    let unknown = "0x00000000000000000000000000000000000000000000000000000000000000ff";

    let missing = client.get(format!("{}/api/products/{}", base_url, unknown)).send().await?;
    assert_eq!(missing.status(), 404);
    let body: JsonValue = missing.json().await?;
    assert_eq!(
        body,
        json!({ "success": false, "error": "Product not found or not registered" })
    );

    let malformed = client.get(format!("{}/api/products/not-a-hash", base_url)).send().await?;
    assert_eq!(malformed.status(), 400);

    let bad_label = client
        .post(format!("{}/api/products/resolve-scan", base_url))
        .json(&json!({ "payload": "hello" }))
        .send()
        .await?;
    assert_eq!(bad_label.status(), 400);
    let body: JsonValue = bad_label.json().await?;
    assert_eq!(body["error"], "Invalid QR code format");

    let bad_body = client
        .post(format!("{}/api/products", base_url))
        .json(&json!({ "name": "Widget" }))
        .send()
        .await?;
    assert_eq!(bad_body.status(), 422);

    let bad_user_type = client
        .post(format!("{}/api/products/{}/scans", base_url, unknown))
        .json(&json!({ "location": "Dock", "userType": "Wholesaler" }))
        .send()
        .await?;
    assert_eq!(bad_user_type.status(), 422);

    wallet.set_faults(Faults {
        reject_signature: true,
        ..Faults::default()
    });
    let rejected = client
        .post(format!("{}/api/products", base_url))
        .json(&json!({
            "name": "Gadget",
            "manufacturingDate": "2024-02-02",
            "batchNumber": "B200",
            "location": "Factory2"
        }))
        .send()
        .await?;
    assert_eq!(rejected.status(), 403);
    let body: JsonValue = rejected.json().await?;
    assert_eq!(body["error"], "Transaction was rejected by user");
    assert!(body.get("qrPayload").is_none());

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn walletless_server_reports_unavailable() -> Result<(), Box<dyn std::error::Error>> {
    let (_notifier, ledger) = walletless();
    let base_url = serve(ledger).await?;
    let client = client();

    let health = client.get(format!("{}/health", base_url)).send().await?;
    assert_eq!(health.status(), 503);

    let connect = client.post(format!("{}/api/wallet/connect", base_url)).send().await?;
    assert_eq!(connect.status(), 503);

    let scans = client
        .get(format!(
            "{}/api/products/0x00000000000000000000000000000000000000000000000000000000000000ff/scans",
            base_url
        ))
        .send()
        .await?;
    assert_eq!(scans.status(), 503);
    let body: JsonValue = scans.json().await?;
    assert_eq!(body["error"], "Wallet not connected");

    Ok(())
}
