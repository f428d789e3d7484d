//! CSV contract checks for the mapping sink.
//!
//! The file format is the compatibility surface: a fixed two-row
//! preamble, one summary row plus k detail rows per mapping, ids dense
//! from 1 and grouped contiguously, per-row value conservation. Order
//! across workers is unspecified, so ordering assertions only run
//! single-worker.

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use txflow::amount::Amount;
use txflow::engine::{run_partition_analysis, EngineConfig};
use txflow::transaction::TransactionRecord;

fn btc(s: &str) -> Amount {
    Amount::from_btc_str(s).unwrap()
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("txflow_csv_{}_{}.csv", std::process::id(), name))
}

fn sample_record() -> Result<TransactionRecord> {
    let mut record = TransactionRecord::new();
    record.add_input("in0", btc("1.0"))?;
    record.add_input("in1", btc("2.0"))?;
    record.add_input("in2", btc("4.0"))?;
    record.add_output("out0", btc("3.0"))?;
    record.add_output("out1", btc("4.0"))?;
    Ok(record)
}

/// Split one CSV line, honoring double-quoted cells.
fn split_csv(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Parse a possibly negative decimal BTC cell into signed satoshis.
fn parse_btc_cell(s: &str) -> i64 {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let sat = Amount::from_btc_str(digits).unwrap().to_sat() as i64;
    if negative {
        -sat
    } else {
        sat
    }
}

struct ParsedCsv {
    /// Data rows in file order: (mapping id, fields).
    rows: Vec<(u64, Vec<String>)>,
}

fn parse_mapping_csv(path: &PathBuf) -> Result<ParsedCsv> {
    let content = std::fs::read_to_string(path)?;
    let mut lines = content.lines();
    assert_eq!(
        lines.next().unwrap(),
        "Mapping_ID,Group_Count,Total_Input_Value,Total_Output_Value,Total_Difference"
    );
    assert_eq!(
        lines.next().unwrap(),
        "Mapping_ID,Group_Number,Input_Group,Input_Value,Output_Group,Output_Value,Difference"
    );
    let mut rows = Vec::new();
    for line in lines {
        let fields = split_csv(line);
        let id: u64 = fields[0].parse()?;
        rows.push((id, fields));
    }
    Ok(ParsedCsv { rows })
}

#[test]
fn test_grouping_density_and_conservation() -> Result<()> {
    let record = sample_record()?;
    let path = temp_path("contract");
    let summary = run_partition_analysis(&record, &path, &EngineConfig::default())?;
    assert!(summary.valid > 0);

    let parsed = parse_mapping_csv(&path)?;

    // Rows sharing an id are contiguous.
    let mut last_seen: Option<u64> = None;
    let mut closed: Vec<u64> = Vec::new();
    for (id, _) in &parsed.rows {
        if last_seen != Some(*id) {
            assert!(!closed.contains(id), "mapping {} rows are not contiguous", id);
            if let Some(prev) = last_seen {
                closed.push(prev);
            }
            last_seen = Some(*id);
        }
    }

    // Ids are exactly {1..=valid}.
    let mut ids: Vec<u64> = parsed.rows.iter().map(|(id, _)| *id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids, (1..=summary.valid).collect::<Vec<u64>>());

    // Per mapping: one summary row (5 fields) followed by k detail rows
    // (7 fields); totals conserve; every detail row satisfies the
    // inequality.
    let total_in = record.total_input_value().to_sat() as i64;
    let total_out = record.total_output_value().to_sat() as i64;
    let fee = record.fee().to_sat();

    let mut per_mapping: HashMap<u64, Vec<&Vec<String>>> = HashMap::new();
    for (id, fields) in &parsed.rows {
        per_mapping.entry(*id).or_default().push(fields);
    }
    for (id, rows) in per_mapping {
        let summary_row = rows[0];
        assert_eq!(summary_row.len(), 5, "mapping {} summary row", id);
        let group_count: usize = summary_row[1].parse()?;
        assert_eq!(rows.len(), group_count + 1, "mapping {} row count", id);
        assert_eq!(parse_btc_cell(&summary_row[2]), total_in);
        assert_eq!(parse_btc_cell(&summary_row[3]), total_out);
        assert_eq!(parse_btc_cell(&summary_row[4]), fee);

        let mut sum_in = 0i64;
        let mut sum_out = 0i64;
        let mut sum_diff = 0i64;
        for (g, detail) in rows[1..].iter().enumerate() {
            assert_eq!(detail.len(), 7, "mapping {} detail row {}", id, g);
            assert_eq!(detail[1].parse::<usize>()?, g);
            let input_value = parse_btc_cell(&detail[3]);
            let output_value = parse_btc_cell(&detail[5]);
            let difference = parse_btc_cell(&detail[6]);
            assert!(
                output_value <= input_value,
                "mapping {} row {} violates output <= input",
                id,
                g
            );
            assert_eq!(difference, input_value - output_value);
            sum_in += input_value;
            sum_out += output_value;
            sum_diff += difference;
        }
        assert_eq!(sum_in, total_in, "mapping {} input conservation", id);
        assert_eq!(sum_out, total_out, "mapping {} output conservation", id);
        assert_eq!(sum_diff, fee, "mapping {} difference conservation", id);
    }

    std::fs::remove_file(&path).ok();
    Ok(())
}

#[test]
fn test_single_worker_runs_are_byte_identical() -> Result<()> {
    let record = sample_record()?;
    let config = EngineConfig {
        num_workers: 1,
        chunk_size: 500,
    };
    let path_a = temp_path("det_a");
    let path_b = temp_path("det_b");
    run_partition_analysis(&record, &path_a, &config)?;
    run_partition_analysis(&record, &path_b, &config)?;
    let a = std::fs::read(&path_a)?;
    let b = std::fs::read(&path_b)?;
    assert_eq!(a, b);
    std::fs::remove_file(&path_a).ok();
    std::fs::remove_file(&path_b).ok();
    Ok(())
}

#[test]
fn test_group_cells_are_quoted_id_lists() -> Result<()> {
    let mut record = TransactionRecord::new();
    record.add_input("in0", btc("2.0"))?;
    record.add_output("out0", btc("1.0"))?;
    record.add_output("out1", btc("1.0"))?;

    let path = temp_path("cells");
    let config = EngineConfig {
        num_workers: 1,
        chunk_size: 500,
    };
    run_partition_analysis(&record, &path, &config)?;

    let content = std::fs::read_to_string(&path)?;
    let lines: Vec<&str> = content.lines().collect();
    // One valid mapping: {in0} covers {out0, out1}.
    assert_eq!(lines[2], "1,1,2.0,2.0,0.0");
    assert_eq!(lines[3], "1,0,\"in0\",2.0,\"out0,out1\",2.0,0.0");
    assert_eq!(lines.len(), 4);
    std::fs::remove_file(&path).ok();
    Ok(())
}
