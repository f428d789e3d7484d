//! txflow CLI
//!
//! Interactive front end for the partition-mapping engine. Every choice
//! can be supplied as a flag; whatever is missing is prompted for, so the
//! tool works both as a one-liner and as the guided flow.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use txflow::amount::Amount;
use txflow::bell::estimate_search_space;
use txflow::engine::{run_partition_analysis, EngineConfig, SOFT_SEARCH_SPACE_LIMIT};
use txflow::node_client::{NodeClient, RpcConfig};
use txflow::subsets::run_subset_analysis;
use txflow::transaction::TransactionRecord;

#[derive(Parser)]
#[command(name = "txflow")]
#[command(about = "Enumerate plausible value flows inside a Bitcoin transaction")]
struct Cli {
    /// Transaction id to fetch from the node (skips the mode prompt)
    #[arg(long)]
    txid: Option<String>,
    /// Analysis to run: "subsets" or "partitions" (prompted when omitted)
    #[arg(long)]
    analysis: Option<String>,
    /// Output CSV path (default depends on the analysis)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Worker threads (default: all cores, capped at 16)
    #[arg(long)]
    workers: Option<usize>,
    /// Skip the large-search-space confirmation
    #[arg(long)]
    yes: bool,
}

fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read stdin")?;
    Ok(line.trim().to_string())
}

fn prompt_with_default(message: &str, default: &str) -> Result<String> {
    let line = prompt(&format!("{} [{}]: ", message, default))?;
    Ok(if line.is_empty() {
        default.to_string()
    } else {
        line
    })
}

async fn fetch_record(txid: &str) -> Result<TransactionRecord> {
    let client = NodeClient::new(RpcConfig::from_env())?;
    println!("Fetching transaction {}...", txid);
    client.fetch_transaction_record(txid).await
}

fn read_custom_record() -> Result<TransactionRecord> {
    let n: usize = prompt("Number of inputs: ")?
        .parse()
        .context("invalid input count")?;
    let m: usize = prompt("Number of outputs: ")?
        .parse()
        .context("invalid output count")?;
    let mut record = TransactionRecord::new();
    for i in 0..n {
        let amount = Amount::from_btc_str(&prompt(&format!("Value of input_{} (BTC): ", i))?)?;
        record.add_input(format!("input_{}", i), amount)?;
    }
    for i in 0..m {
        let amount = Amount::from_btc_str(&prompt(&format!("Value of output_{} (BTC): ", i))?)?;
        record.add_output(format!("output_{}", i), amount)?;
    }
    Ok(record)
}

fn print_summary(record: &TransactionRecord) {
    println!();
    println!("Transaction summary:");
    println!(
        "  Inputs:  {} totalling {} BTC",
        record.input_ids().len(),
        record.total_input_value()
    );
    println!(
        "  Outputs: {} totalling {} BTC",
        record.output_ids().len(),
        record.total_output_value()
    );
    println!("  Fee: {} BTC", record.fee());
    if !record.is_valid() {
        println!("  ⚠️  Outputs exceed inputs - transaction does not conserve value");
    }
    println!();
}

/// Soft limit on the estimated search space; over it the user confirms
/// before the run starts.
fn confirm_search_space(record: &TransactionRecord, assume_yes: bool) -> Result<()> {
    let n = record.input_ids().len();
    let m = record.output_ids().len();
    let estimate = estimate_search_space(n, m);
    if estimate <= SOFT_SEARCH_SPACE_LIMIT {
        return Ok(());
    }
    println!(
        "⚠️  Estimated search space is ~{} checks ({} inputs, {} outputs) - this may take a very long time.",
        estimate, n, m
    );
    if assume_yes {
        println!("   Proceeding (--yes).");
        return Ok(());
    }
    let answer = prompt("Proceed anyway? [y/N]: ")?;
    if !matches!(answer.as_str(), "y" | "Y" | "yes") {
        bail!("aborted by user");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let record = if let Some(txid) = &cli.txid {
        fetch_record(txid).await?
    } else {
        match prompt("Mode - (f)etch real transaction or (c)reate custom: ")?.as_str() {
            "f" | "fetch" => {
                let txid = prompt("Transaction hash: ")?;
                fetch_record(&txid).await?
            }
            "c" | "custom" | "create" => read_custom_record()?,
            other => bail!("unknown mode: {}", other),
        }
    };

    print_summary(&record);

    let analysis = match cli.analysis {
        Some(a) => a,
        None => prompt("Analysis - (s)ubset pairs or (p)artition mappings: ")?,
    };

    match analysis.as_str() {
        "s" | "subsets" | "subset-pairs" => {
            let output = match cli.output {
                Some(path) => path,
                None => PathBuf::from(prompt_with_default("Output file", "valid_combinations.csv")?),
            };
            let summary = run_subset_analysis(&record, &output)?;
            println!(
                "✅ {} valid combinations written to {}",
                summary.valid,
                output.display()
            );
        }
        "p" | "partitions" | "partition-mapping" => {
            confirm_search_space(&record, cli.yes)?;
            let output = match cli.output {
                Some(path) => path,
                None => PathBuf::from(prompt_with_default("Output file", "valid_mappings.csv")?),
            };
            let mut config = EngineConfig::default();
            if let Some(workers) = cli.workers {
                config.num_workers = workers.max(1);
            }
            println!(
                "Running partition-mapping analysis with {} workers...",
                config.num_workers
            );
            let summary = run_partition_analysis(&record, &output, &config)?;
            if let Some(reason) = &summary.aborted {
                eprintln!("❌ Run aborted: {}", reason);
                eprintln!(
                    "   {} valid mappings written before the failure (undercount)",
                    summary.valid
                );
                std::process::exit(1);
            }
            println!(
                "✅ {} valid mappings written to {}",
                summary.valid,
                output.display()
            );
        }
        other => bail!("unknown analysis: {}", other),
    }

    Ok(())
}
