//! Wall-clock progress reporting.
//!
//! Status lines go to stderr at most once per second: percent, counters,
//! elapsed time, ETA. Called from the dispatcher thread only, at chunk
//! boundaries, so workers never wait on it.

use std::time::Instant;

pub struct ProgressReporter {
    start: Instant,
    last: Instant,
}

impl ProgressReporter {
    pub fn new() -> ProgressReporter {
        let now = Instant::now();
        ProgressReporter {
            start: now,
            // Backdated so the first chunk boundary reports immediately.
            last: now
                .checked_sub(std::time::Duration::from_secs(1))
                .unwrap_or(now),
        }
    }

    /// Emit a status line when at least a second has passed since the
    /// previous one. Percent complete tracks input partitions consumed.
    pub fn report(&mut self, produced: u128, total: u128, pairs: u64, pruned: u64, valid: u64) {
        if self.last.elapsed().as_secs() < 1 {
            return;
        }
        self.last = Instant::now();
        let pct = if total == 0 {
            100.0
        } else {
            produced as f64 / total as f64 * 100.0
        };
        let elapsed = self.start.elapsed().as_secs_f64();
        let eta = if pct > 0.0 {
            (elapsed * (100.0 - pct) / pct).max(0.0)
        } else {
            f64::INFINITY
        };
        if eta.is_finite() {
            eprintln!(
                "  {:.1}% - {} pairs ({} pruned) - {} valid - {:.1}s elapsed - ETA: {:.0}s",
                pct, pairs, pruned, valid, elapsed, eta
            );
        } else {
            eprintln!(
                "  {:.1}% - {} pairs ({} pruned) - {} valid - {:.1}s elapsed - ETA: --",
                pct, pairs, pruned, valid, elapsed
            );
        }
    }

    /// Closing summary block.
    pub fn finish(&self, pairs: u64, pruned: u64, checked: u64, valid: u64) {
        let elapsed = self.start.elapsed().as_secs_f64();
        eprintln!("{}", "─".repeat(60));
        eprintln!("  ✅ Analysis complete!");
        eprintln!("  Pairs processed: {} ({} pruned, {} checked)", pairs, pruned, checked);
        eprintln!("  Valid mappings: {}", valid);
        eprintln!("  Time: {:.1}s", elapsed);
        if elapsed > 0.0 {
            eprintln!("  Rate: {:.0} pairs/sec", pairs as f64 / elapsed);
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}
