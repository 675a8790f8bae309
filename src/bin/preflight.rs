use product_ledger_client::infra::config::{self, LedgerConfig};
use product_ledger_client::infra::evm::{AutoApprove, HttpWalletProvider, ProductRegistry, WalletProvider};
use serde_json::json;
use std::sync::Arc;

fn usage_and_exit() -> ! {
    eprintln!(
        "Usage: cargo run --bin preflight\n\
         \n\
         Reads (all optional, local-node defaults otherwise):\n\
           LEDGER_RPC_URL, LEDGER_CHAIN_ID, LEDGER_NETWORK_NAME,\n\
           PRODUCT_REGISTRY_ADDRESS, RPC_TIMEOUT_SECS\n"
    );
    std::process::exit(2);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        usage_and_exit();
    }

    // Force-read config (nice error messages if anything is malformed)
    let ledger_config = LedgerConfig::from_env()?;
    let network = ledger_config.network.clone();

    println!("> Preflight:");
    println!("  LEDGER_RPC_URL={}", config::ledger_rpc_url());
    println!("  LEDGER_CHAIN_ID={}", network.chain_id);
    println!("  PRODUCT_REGISTRY_ADDRESS={}", ledger_config.contract.address);

    // The node-managed wallet, pre-seeded with the expected network so no prompt is needed.
    let wallet = Arc::new(HttpWalletProvider::new(ledger_config.rpc_timeout, Arc::new(AutoApprove))?);
    wallet.remember_network(network.clone()).await;

    // Basic RPC connectivity + chain identity
    wallet
        .switch_chain(network.chain_id)
        .await
        .map_err(|e| anyhow::anyhow!("Cannot select chain {}: {}", network.chain_id, e))?;
    println!("  RPC reachable, chain id matches ({}).", network.chain_id);

    let block = wallet.request("eth_blockNumber", json!([])).await?;
    println!("  Latest block: {}", block.as_str().unwrap_or("?"));

    // Signing accounts (AutoApprove authorizes whatever the node has unlocked)
    match wallet.request_accounts().await {
        Ok(accounts) => {
            println!("  Node exposes {} unlocked account(s).", accounts.len());
            if let Some(first) = accounts.first() {
                println!("  Transactions will be sent from {}", first);
            }
        }
        Err(e) => {
            eprintln!("  Warning: no signing account available ({}); registration and scan logging will fail.", e);
        }
    }

    // Contract deployment
    let registry = ProductRegistry::new(wallet.clone(), ledger_config.contract.clone());
    let code = registry.code().await?;
    if code.is_empty() {
        return Err(anyhow::anyhow!(
            "No contract code at {}. Deploy ProductRegistry or set PRODUCT_REGISTRY_ADDRESS",
            registry.address()
        ));
    }
    println!("  ProductRegistry deployed ({} bytes of code).", code.len());

    println!("> Preflight OK.");
    Ok(())
}
