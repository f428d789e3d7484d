//! Parallel partition-mapping dispatcher.
//!
//! Owns the outer loop: chunks of input partitions crossed with chunks of
//! output partitions, the matching-block-count pairs of each cross
//! product sliced across a rayon pool. Workers prune, enumerate
//! bijections, and stream valid mappings to the CSV sink. Generator state
//! never crosses a thread boundary - chunks are produced on the
//! dispatcher thread and handed to workers by reference.
//!
//! Peak working memory per outer iteration is two chunks plus the pair
//! list: indices only, single-digit megabytes at the default chunk size.

use crate::amount::Amount;
use crate::checker;
use crate::mapper::ElementMapper;
use crate::partitions::{IndexPartition, PartitionGenerator};
use crate::progress::ProgressReporter;
use crate::pruner;
use crate::sink::MappingWriter;
use crate::transaction::{Side, TransactionRecord};
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::panic::AssertUnwindSafe;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Estimated checks above which the CLI asks for confirmation before a
/// partition-mapping run. Soft limit only.
pub const SOFT_SEARCH_SPACE_LIMIT: u128 = 1_000_000_000;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Worker threads for the pruning/checking pool.
    pub num_workers: usize,
    /// Partitions per generator chunk. Tunable, not a contract.
    pub chunk_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let cpus = num_cpus::get();
        EngineConfig {
            num_workers: if cpus == 0 { 4 } else { cpus.min(16) },
            chunk_size: 500,
        }
    }
}

/// Shared monotonic counters, updated with relaxed fetch-adds. Readers
/// may see slightly stale totals, never inconsistent ones.
#[derive(Debug, Default)]
pub struct EngineCounters {
    pub pairs_processed: AtomicU64,
    pub pruned: AtomicU64,
    pub checked: AtomicU64,
    pub valid: AtomicU64,
}

#[derive(Debug)]
pub struct EngineSummary {
    pub valid: u64,
    pub pairs_processed: u64,
    pub pruned: u64,
    pub checked: u64,
    /// Set when the run stopped early on a sink failure; `valid` is then
    /// an undercount of what a full run would have found.
    pub aborted: Option<String>,
}

/// Block sums of a partition through an index-ordered amount table.
fn block_sums(partition: &IndexPartition, amounts: &[Amount]) -> Vec<Amount> {
    partition
        .iter()
        .map(|block| block.iter().map(|&i| amounts[i as usize]).sum())
        .collect()
}

/// Run the full partition-mapping analysis, streaming valid mappings to
/// `csv_path`. Returns the counter totals; a sink failure aborts the run
/// with the partial CSV flushed and the summary's `aborted` set.
pub fn run_partition_analysis(
    record: &TransactionRecord,
    csv_path: &Path,
    config: &EngineConfig,
) -> Result<EngineSummary> {
    let in_mapper = ElementMapper::new(record.input_ids())?;
    let out_mapper = ElementMapper::new(record.output_ids())?;

    let sink = MappingWriter::create(csv_path)?;

    // Nothing to analyze without inputs; the empty partition of the empty
    // set never matches anything.
    if in_mapper.is_empty() {
        sink.flush()?;
        return Ok(EngineSummary {
            valid: 0,
            pairs_processed: 0,
            pruned: 0,
            checked: 0,
            aborted: None,
        });
    }

    let in_amounts = in_mapper.amounts(record, Side::Inputs);
    let out_amounts = out_mapper.amounts(record, Side::Outputs);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.num_workers)
        .build()
        .context("failed to build worker pool")?;

    let counters = EngineCounters::default();
    let failed = AtomicBool::new(false);
    let first_error: Mutex<Option<anyhow::Error>> = Mutex::new(None);
    let mut reporter = ProgressReporter::new();
    let mut aborted: Option<String> = None;

    let mut input_gen = PartitionGenerator::new(in_mapper.len());
    'outer: while input_gen.has_more() {
        let input_chunk: Vec<(IndexPartition, Vec<Amount>)> = input_gen
            .next_chunk(config.chunk_size)
            .into_iter()
            .map(|p| {
                let sums = block_sums(&p, &in_amounts);
                (p, sums)
            })
            .collect();

        let mut output_gen = PartitionGenerator::new(out_mapper.len());
        while output_gen.has_more() {
            let output_chunk: Vec<(IndexPartition, Vec<Amount>)> = output_gen
                .next_chunk(config.chunk_size)
                .into_iter()
                .map(|p| {
                    let sums = block_sums(&p, &out_amounts);
                    (p, sums)
                })
                .collect();

            // Candidate pairs: matching block counts only.
            let pairs: Vec<(&(IndexPartition, Vec<Amount>), &(IndexPartition, Vec<Amount>))> =
                input_chunk
                    .iter()
                    .flat_map(|ip| {
                        output_chunk
                            .iter()
                            .filter(move |op| ip.0.len() == op.0.len())
                            .map(move |op| (ip, op))
                    })
                    .collect();
            if pairs.is_empty() {
                continue;
            }

            let run = std::panic::catch_unwind(AssertUnwindSafe(|| {
                pool.install(|| {
                    pairs.par_iter().for_each(|((ip, in_sums), (op, out_sums))| {
                        if failed.load(Ordering::Relaxed) {
                            return;
                        }
                        counters.pairs_processed.fetch_add(1, Ordering::Relaxed);
                        if !pruner::may_admit_mapping(in_sums, out_sums) {
                            counters.pruned.fetch_add(1, Ordering::Relaxed);
                            return;
                        }
                        counters.checked.fetch_add(1, Ordering::Relaxed);

                        let input_blocks = in_mapper.partition_to_ids(ip);
                        let output_blocks = out_mapper.partition_to_ids(op);
                        let result =
                            checker::for_each_valid_mapping(in_sums, out_sums, |perm| {
                                sink.write_mapping(
                                    &input_blocks,
                                    in_sums,
                                    &output_blocks,
                                    out_sums,
                                    perm,
                                )?;
                                counters.valid.fetch_add(1, Ordering::Relaxed);
                                Ok(())
                            });
                        if let Err(e) = result {
                            failed.store(true, Ordering::Relaxed);
                            let mut slot =
                                first_error.lock().unwrap_or_else(|p| p.into_inner());
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                        }
                    });
                });
            }));

            if run.is_err() {
                let _ = sink.flush();
                anyhow::bail!(
                    "worker thread panicked; partial results flushed to {}",
                    csv_path.display()
                );
            }
            if failed.load(Ordering::Relaxed) {
                let message = first_error
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .take()
                    .map(|e| format!("{:#}", e))
                    .unwrap_or_else(|| "output sink failure".to_string());
                let _ = sink.flush();
                aborted = Some(message);
                break 'outer;
            }

            reporter.report(
                input_gen.produced(),
                input_gen.total(),
                counters.pairs_processed.load(Ordering::Relaxed),
                counters.pruned.load(Ordering::Relaxed),
                counters.valid.load(Ordering::Relaxed),
            );
        }
    }

    if aborted.is_none() {
        sink.flush()?;
    }

    let summary = EngineSummary {
        valid: counters.valid.load(Ordering::Relaxed),
        pairs_processed: counters.pairs_processed.load(Ordering::Relaxed),
        pruned: counters.pruned.load(Ordering::Relaxed),
        checked: counters.checked.load(Ordering::Relaxed),
        aborted,
    };
    if summary.aborted.is_none() {
        reporter.finish(
            summary.pairs_processed,
            summary.pruned,
            summary.checked,
            summary.valid,
        );
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;

    fn btc(s: &str) -> Amount {
        Amount::from_btc_str(s).unwrap()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("txflow_engine_{}_{}.csv", std::process::id(), name))
    }

    fn single_worker() -> EngineConfig {
        EngineConfig {
            num_workers: 1,
            chunk_size: 500,
        }
    }

    #[test]
    fn test_empty_inputs_yield_zero() -> Result<()> {
        let mut record = TransactionRecord::new();
        record.add_output("output_0", btc("1.0"))?;
        let path = temp_path("empty");
        let summary = run_partition_analysis(&record, &path, &single_worker())?;
        assert_eq!(summary.valid, 0);
        assert!(summary.aborted.is_none());
        std::fs::remove_file(&path).ok();
        Ok(())
    }

    #[test]
    fn test_small_chunk_size_agrees_with_large() -> Result<()> {
        let mut record = TransactionRecord::new();
        record.add_input("in0", btc("1.0"))?;
        record.add_input("in1", btc("2.0"))?;
        record.add_input("in2", btc("4.0"))?;
        record.add_output("out0", btc("3.0"))?;
        record.add_output("out1", btc("4.0"))?;

        let path_a = temp_path("chunk_a");
        let path_b = temp_path("chunk_b");
        let big = run_partition_analysis(&record, &path_a, &single_worker())?;
        let tiny = run_partition_analysis(
            &record,
            &path_b,
            &EngineConfig {
                num_workers: 1,
                chunk_size: 2,
            },
        )?;
        assert_eq!(big.valid, tiny.valid);
        assert_eq!(big.pairs_processed, tiny.pairs_processed);
        std::fs::remove_file(&path_a).ok();
        std::fs::remove_file(&path_b).ok();
        Ok(())
    }
}
