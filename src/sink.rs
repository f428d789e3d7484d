//! CSV sink for valid mappings.
//!
//! One writer, one mutex: a mapping's summary row and its detail rows go
//! out under a single lock so rows from different workers never
//! interleave. Ids come from an atomic counter bumped only for mappings
//! that proved valid, so they are dense from 1 even though the order they
//! land in the file depends on worker scheduling.

use crate::amount::Amount;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

pub struct MappingWriter {
    writer: Mutex<BufWriter<File>>,
    next_id: AtomicU64,
}

impl MappingWriter {
    /// Create the output file and emit the fixed two-row preamble.
    pub fn create(path: &Path) -> Result<MappingWriter> {
        let file = File::create(path)
            .with_context(|| format!("failed to create output file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        writeln!(
            writer,
            "Mapping_ID,Group_Count,Total_Input_Value,Total_Output_Value,Total_Difference"
        )?;
        writeln!(
            writer,
            "Mapping_ID,Group_Number,Input_Group,Input_Value,Output_Group,Output_Value,Difference"
        )?;
        Ok(MappingWriter {
            writer: Mutex::new(writer),
            next_id: AtomicU64::new(0),
        })
    }

    /// A worker panic while holding the lock must not wedge the final
    /// flush; recover the guard from a poisoned mutex.
    fn lock(&self) -> MutexGuard<'_, BufWriter<File>> {
        self.writer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write one valid mapping: a summary row plus one detail row per
    /// matched block pair, all contiguous. `perm[g] = j` pairs input block
    /// g with output block j. Returns the mapping's 1-based id.
    pub fn write_mapping(
        &self,
        input_blocks: &[Vec<String>],
        input_sums: &[Amount],
        output_blocks: &[Vec<String>],
        output_sums: &[Amount],
        perm: &[u16],
    ) -> Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let total_in: Amount = input_sums.iter().sum();
        let total_out: Amount = output_sums.iter().sum();

        let mut w = self.lock();
        writeln!(
            w,
            "{},{},{},{},{}",
            id,
            input_blocks.len(),
            total_in,
            total_out,
            total_in.sub_signed(total_out)
        )?;
        for (g, &j) in perm.iter().enumerate() {
            let in_sum = input_sums[g];
            let out_sum = output_sums[j as usize];
            writeln!(
                w,
                "{},{},\"{}\",{},\"{}\",{},{}",
                id,
                g,
                input_blocks[g].join(","),
                in_sum,
                output_blocks[j as usize].join(","),
                out_sum,
                in_sum.sub_signed(out_sum)
            )?;
        }
        Ok(id)
    }

    /// How many mapping ids have been handed out.
    pub fn mappings_written(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }

    pub fn flush(&self) -> Result<()> {
        self.lock().flush().context("failed to flush output sink")
    }
}
