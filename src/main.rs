//! Command-line front end for the product ledger.
//!
//! Signing prompts are answered on the terminal unless `--yes` is given.

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use product_ledger_client::evm::{AutoApprove, NetworkParams, SigningApprover, TransactionRequest};
use product_ledger_client::{
    LedgerClient, LedgerConfig, ProductAttributes, ProductHash, ScanPayload, TracingNotifier, UserType,
};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "product-ledger", about = "Register, verify and trace products on the ledger")]
struct Cli {
    /// Approve every wallet prompt without asking.
    #[arg(long, global = true)]
    yes: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Negotiate a session and print the connected account.
    Connect,
    /// Register a product and print its hash and label payload.
    Register {
        #[arg(long)]
        name: String,
        /// Manufacturing date, e.g. 2024-01-01.
        #[arg(long)]
        date: String,
        #[arg(long)]
        batch: String,
        #[arg(long)]
        location: String,
        #[arg(long)]
        details: Option<String>,
    },
    /// Verify a product from its hash or from scanned label text.
    Verify { input: String },
    /// Append a scan record to a product's history.
    LogScan {
        hash: ProductHash,
        #[arg(long)]
        location: String,
        /// Consumer, Distributor or Retailer.
        #[arg(long)]
        user_type: UserType,
    },
    /// Print a product's scan history.
    Scans { hash: ProductHash },
}

struct ConsoleApprover;

impl ConsoleApprover {
    async fn confirm(question: String) -> bool {
        tokio::task::spawn_blocking(move || {
            print!("? {} [y/N] ", question);
            let _ = std::io::stdout().flush();
            let mut answer = String::new();
            if std::io::stdin().lock().read_line(&mut answer).is_err() {
                return false;
            }
            matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

#[async_trait]
impl SigningApprover for ConsoleApprover {
    async fn approve_network(&self, network: &NetworkParams) -> bool {
        Self::confirm(format!(
            "Add network '{}' (chain {}) at {}?",
            network.chain_name,
            network.chain_id,
            network.rpc_url().unwrap_or("<none>")
        ))
        .await
    }

    async fn approve_connection(&self, chain_id: u64) -> bool {
        Self::confirm(format!("Connect this client to your accounts on chain {}?", chain_id)).await
    }

    async fn approve_transaction(&self, tx: &TransactionRequest) -> bool {
        Self::confirm(format!("Sign a transaction from {} to {}?", tx.from, tx.to)).await
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = LedgerConfig::from_env()?;
    let approver: Arc<dyn SigningApprover> = if cli.yes {
        Arc::new(AutoApprove)
    } else {
        Arc::new(ConsoleApprover)
    };
    let ledger = LedgerClient::from_config(&config, approver, Arc::new(TracingNotifier))?;

    match cli.command {
        Command::Connect => {
            if !ledger.connect_wallet().await {
                anyhow::bail!("Wallet not connected");
            }
            match ledger.get_account_address().await {
                Some(account) => println!("> Connected wallet: {}", account),
                None => println!("> Connected (no account reported)"),
            }
        }
        Command::Register { name, date, batch, location, details } => {
            let attrs = ProductAttributes::new(name, date, batch, location, details);
            let hash = ledger.register_product(&attrs).await?;
            println!("> Product registered");
            println!("  hash: {}", hash);
            println!("  label: {}", ScanPayload::for_product(hash, &attrs).encode());
        }
        Command::Verify { input } => {
            let scan = ledger.verify_scanned_payload(&input).await?;
            let product = &scan.product;
            println!("> Authentic product {}", scan.hash);
            println!("  name:          {}", product.name);
            println!("  manufactured:  {}", product.manufacturing_date);
            println!("  batch:         {}", product.batch_number);
            println!("  location:      {}", product.location);
            if !product.additional_details.is_empty() {
                println!("  details:       {}", product.additional_details);
            }
            println!("  manufacturer:  {}", product.manufacturer);
            if let Some(at) = product.registered_at() {
                println!("  registered at: {}", at.to_rfc3339());
            }
            match scan.logs {
                Some(logs) => print_logs(&logs),
                None => println!("  (scan history unavailable)"),
            }
        }
        Command::LogScan { hash, location, user_type } => {
            ledger.log_scan(&hash, &location, user_type).await?;
            println!("> Scan logged for {} ({} at {})", hash, user_type, location);
        }
        Command::Scans { hash } => {
            let logs = ledger.get_scan_logs(&hash).await?;
            println!("> Scan history for {}", hash);
            print_logs(&logs);
        }
    }

    Ok(())
}

fn print_logs(logs: &[product_ledger_client::ScanLogEntry]) {
    if logs.is_empty() {
        println!("  no scans recorded");
        return;
    }
    for (i, log) in logs.iter().enumerate() {
        let when = log
            .scanned_at()
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| log.timestamp.to_string());
        println!("  #{} {} {} at {} by {}", i, when, log.user_type, log.location, log.scanner);
    }
}
