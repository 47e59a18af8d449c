//! LedgerStream CLI: follow a ledger chain and inspect pipeline values.
//!
//! # Commands
//! ```
//! ledgerstream ingest  --horizon <url> [--from <hex>] [--checkpoint <file>] [--out <file.jsonl>]
//! ledgerstream pointer encode --sequence <N> [--chain-version <2|3|4>]
//! ledgerstream pointer decode <hex>
//! ledgerstream account <G...|hex key>
//! ledgerstream info
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use ledgerstream_core::model::AccountId;
use ledgerstream_core::pointer::LedgerPointer;
use ledgerstream_core::types::ChainVersion;

mod cmd_ingest;
mod config;
mod telemetry;

use config::AppConfig;

#[derive(Parser)]
#[command(
    name = "ledgerstream",
    about = "Ordered ledger ingestion and account notifications: LedgerStream CLI",
    long_about = "
LedgerStream CLI: ingest ledger history from a Horizon server into a
JSON-lines file, resumable through pointers and checkpoints.

ENVIRONMENT VARIABLES:
  LEDGERSTREAM_HORIZON_URL   Horizon base URL (same as --horizon)
  RUST_LOG                   Log filter, overrides the config file
",
    version
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON structured logs
    #[arg(long, global = true)]
    json_logs: bool,

    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest ledgers from Horizon, in order, into a JSON-lines file
    Ingest {
        /// Horizon base URL
        #[arg(long, env = "LEDGERSTREAM_HORIZON_URL")]
        horizon: Option<String>,
        /// Resume after this pointer (hex); overrides the checkpoint
        #[arg(long)]
        from: Option<String>,
        /// Checkpoint file to resume from and save progress to
        #[arg(long)]
        checkpoint: Option<PathBuf>,
        /// Output file; entries are appended
        #[arg(short, long, default_value = "ledgerstream.jsonl")]
        out: PathBuf,
        /// Stop after this many committed ledgers
        #[arg(long)]
        max_ledgers: Option<u64>,
    },

    /// Encode or decode ledger pointers
    Pointer {
        #[command(subcommand)]
        action: PointerAction,
    },

    /// Show an account id as address and raw key
    Account {
        /// `G...` address or 64 hex character public key
        id: String,
    },

    /// Show version and capabilities
    Info,
}

#[derive(Subcommand)]
enum PointerAction {
    /// Build the pointer for an ingested ledger
    Encode {
        /// Last ingested ledger sequence
        #[arg(long)]
        sequence: u32,
        /// Chain version tag
        #[arg(long, default_value_t = 3)]
        chain_version: u8,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show what a hex pointer points at
    Decode {
        /// Pointer hex, as printed by `ingest` or `pointer encode`
        hex: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut app = AppConfig::load(cli.config.as_deref())?;
    if cli.verbose {
        app.log.level = "debug".to_string();
    }
    if cli.json_logs {
        app.log.json = true;
    }
    telemetry::init_tracing(&app.log);

    match cli.command {
        Commands::Ingest { horizon, from, checkpoint, out, max_ledgers } => {
            let args = cmd_ingest::IngestArgs { horizon, from, checkpoint, out, max_ledgers };
            cmd_ingest::run(args, &app).await
        }
        Commands::Pointer { action } => match action {
            PointerAction::Encode { sequence, chain_version, json } => {
                cmd_pointer_encode(sequence, chain_version, json)
            }
            PointerAction::Decode { hex, json } => cmd_pointer_decode(&hex, json),
        },
        Commands::Account { id } => cmd_account(&id),
        Commands::Info => cmd_info(),
    }
}

// ─── Pointer commands ────────────────────────────────────────────────────────

fn pointer_json(pointer: &LedgerPointer) -> serde_json::Value {
    serde_json::json!({
        "hex": pointer.to_hex(),
        "chain_version": pointer.version.as_u8(),
        "sequence": pointer.sequence,
        "cursor": pointer.cursor(),
        "next_sequence": LedgerPointer::next_sequence(Some(pointer)),
    })
}

fn print_pointer(pointer: &LedgerPointer, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&pointer_json(pointer))?);
        return Ok(());
    }
    println!("Pointer:        {}", pointer.to_hex());
    println!("Chain version:  {}", pointer.version);
    println!("Sequence:       {}", pointer.sequence);
    println!("Cursor:         {}", pointer.cursor());
    println!("Resumes at:     ledger {}", LedgerPointer::next_sequence(Some(pointer)));
    Ok(())
}

fn cmd_pointer_encode(sequence: u32, chain_version: u8, json: bool) -> Result<()> {
    let version = ChainVersion::try_from(chain_version)?;
    print_pointer(&LedgerPointer::new(version, sequence), json)
}

fn cmd_pointer_decode(hex: &str, json: bool) -> Result<()> {
    let pointer = LedgerPointer::from_hex(hex.trim()).context("decoding pointer")?;
    print_pointer(&pointer, json)
}

// ─── Account command ─────────────────────────────────────────────────────────

fn parse_account(id: &str) -> Result<AccountId> {
    let id = id.trim();
    if id.starts_with('G') {
        return id.parse::<AccountId>().context("decoding account address");
    }
    let bytes = hex::decode(id.trim_start_matches("0x")).context("decoding hex key")?;
    let key: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow!("public key must be 32 bytes, got {}", b.len()))?;
    Ok(AccountId(key))
}

fn cmd_account(id: &str) -> Result<()> {
    let account = parse_account(id)?;
    println!("Address:  {}", account.address());
    println!("Key:      {}", hex::encode(account.0));
    Ok(())
}

// ─── Info ────────────────────────────────────────────────────────────────────

fn cmd_info() -> Result<()> {
    println!("LedgerStream v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Capabilities:");
    println!("  ✓ Ordered ledger ingestion   (bounded in-flight, hash-chained blocks)");
    println!("  ✓ Resumable pointers         (paging-token encoded, hex on the wire)");
    println!("  ✓ Checkpoints                (JSON file, atomic rename)");
    println!("  ✓ Chain verification         (sequence + parent block)");
    println!("  ✓ Account notifications      (per-account event streams)");
    println!("  ✓ Horizon client             (cursor polling, retry with backoff)");
    println!();
    println!("Chain versions:               v2, v3, v4");
    println!("Writers:                      JSON lines, in-memory");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_ingest() {
        let cli = Cli::try_parse_from([
            "ledgerstream",
            "--verbose",
            "ingest",
            "--horizon",
            "http://localhost:8000",
            "--checkpoint",
            "cp.json",
            "--max-ledgers",
            "5",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Ingest { horizon, checkpoint, out, max_ledgers, from } => {
                assert_eq!(horizon.as_deref(), Some("http://localhost:8000"));
                assert_eq!(checkpoint, Some(PathBuf::from("cp.json")));
                assert_eq!(out, PathBuf::from("ledgerstream.jsonl"));
                assert_eq!(max_ledgers, Some(5));
                assert!(from.is_none());
            }
            _ => panic!("expected ingest"),
        }
    }

    #[test]
    fn pointer_json_fields() {
        let pointer = LedgerPointer::new(ChainVersion::V3, 1024);
        let value = pointer_json(&pointer);
        assert_eq!(value["sequence"], 1024);
        assert_eq!(value["chain_version"], 3);
        assert_eq!(value["cursor"], "4398046511104");
        assert_eq!(value["next_sequence"], 1025);
        assert_eq!(
            LedgerPointer::from_hex(value["hex"].as_str().unwrap()).unwrap(),
            pointer
        );
    }

    #[test]
    fn account_accepts_address_or_hex() {
        let key = [7u8; 32];
        let address = AccountId(key).address();
        assert_eq!(parse_account(&address).unwrap(), AccountId(key));
        assert_eq!(parse_account(&hex::encode(key)).unwrap(), AccountId(key));
        assert!(parse_account("abcd").is_err());
    }
}
