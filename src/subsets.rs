//! Subset-pair analysis (the degenerate two-block mode).
//!
//! Enumerates every non-empty subset of each side by binary counting and
//! accepts pairs whose output sum fits inside the input sum. This is the
//! partition engine restricted to two-block partitions with no bijection
//! applied, implemented as a direct power-set walk over bitmasks. A and B
//! are independent findings; complementary pairs are not deduplicated.

use crate::amount::Amount;
use crate::mapper::ElementMapper;
use crate::transaction::{Side, TransactionRecord};
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Debug)]
pub struct SubsetSummary {
    pub valid: u64,
    pub input_subsets: u64,
    pub output_subsets: u64,
}

/// Sum of the elements selected by `mask` through the amount table.
fn mask_sum(mask: u64, amounts: &[Amount]) -> Amount {
    amounts
        .iter()
        .enumerate()
        .filter(|(j, _)| mask & (1u64 << j) != 0)
        .map(|(_, &a)| a)
        .sum()
}

/// Comma-joined ids selected by `mask`, in insertion order.
fn mask_ids(mask: u64, mapper: &ElementMapper) -> String {
    let mut ids = String::new();
    for j in 0..mapper.len() {
        if mask & (1u64 << j) != 0 {
            if !ids.is_empty() {
                ids.push(',');
            }
            ids.push_str(mapper.id_at(j as u16));
        }
    }
    ids
}

/// Stream every valid (input subset, output subset) pair to a CSV file.
///
/// Sequential: the 4^n search space of this mode is dwarfed by the
/// partition mode's, and a single writer keeps ids deterministic.
pub fn run_subset_analysis(record: &TransactionRecord, csv_path: &Path) -> Result<SubsetSummary> {
    let in_mapper = ElementMapper::new(record.input_ids())?;
    let out_mapper = ElementMapper::new(record.output_ids())?;
    let n = in_mapper.len();
    let m = out_mapper.len();
    if n >= 64 || m >= 64 {
        bail!("subset mode supports at most 63 elements per side (got {} inputs, {} outputs)", n, m);
    }

    let in_amounts = in_mapper.amounts(record, Side::Inputs);
    let out_amounts = out_mapper.amounts(record, Side::Outputs);

    let file = File::create(csv_path)
        .with_context(|| format!("failed to create output file: {}", csv_path.display()))?;
    let mut writer = BufWriter::new(file);
    writeln!(
        writer,
        "Combination_ID,Input_Subset,Input_Value,Output_Subset,Output_Value,Difference"
    )?;

    let input_masks = if n == 0 { 0u64 } else { (1u64 << n) - 1 };
    let output_masks = if m == 0 { 0u64 } else { (1u64 << m) - 1 };

    // Output subsets are revisited for every input subset; materialize
    // their sums and cells once.
    let mut output_cells = Vec::new();
    for b_mask in 1..=output_masks {
        output_cells.push((mask_sum(b_mask, &out_amounts), mask_ids(b_mask, &out_mapper)));
    }

    let mut valid = 0u64;
    for a_mask in 1..=input_masks {
        let input_sum = mask_sum(a_mask, &in_amounts);
        let input_ids = mask_ids(a_mask, &in_mapper);
        for (output_sum, output_ids) in &output_cells {
            if *output_sum <= input_sum {
                valid += 1;
                writeln!(
                    writer,
                    "{},\"{}\",{},\"{}\",{},{}",
                    valid,
                    input_ids,
                    input_sum,
                    output_ids,
                    output_sum,
                    input_sum.sub_signed(*output_sum)
                )?;
            }
        }
    }
    writer.flush()?;

    Ok(SubsetSummary {
        valid,
        input_subsets: input_masks,
        output_subsets: output_masks,
    })
}
