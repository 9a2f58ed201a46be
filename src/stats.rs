//! Compilation statistics tracking for -c mode
//!
//! Sprint 4: statistics mode implementation
//! Sprint 5: extended percentile statistics via Trueno

use std::collections::HashMap;

use tracing::warn;

use crate::compilation::Compilation;

/// Statistics for one compiler group (e.g. `C2`, `C1`, `C2 OSR`)
#[derive(Debug, Clone, Default)]
pub struct CompilerStats {
    /// Number of compilations attributed to this group
    pub count: u64,
    /// Total measured elapsed compile time (milliseconds)
    pub total_time_ms: u64,
    /// Individual elapsed times, measured compiles only (for percentiles)
    pub durations: Vec<u64>,
    /// Total emitted native code (bytes)
    pub total_native_size: u64,
}

/// Summary totals across all compiler groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatTotals {
    pub total_compilations: u64,
    pub total_time_ms: u64,
    pub total_native_bytes: u64,
}

/// Counters for log facts the core reports but never repairs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataQuality {
    /// Compilations whose stamps yielded a negative elapsed time
    pub negative_compile_times: u64,
    /// task_done records with a missing or unparsable nmsize
    pub invalid_native_sizes: u64,
}

/// Extended statistics for a compiler group (Trueno-backed)
#[derive(Debug, Clone, PartialEq)]
pub struct ExtendedStats {
    pub mean: f32,
    pub stddev: f32,
    pub min: f32,
    pub max: f32,
    pub median: f32, // P50
    pub p75: f32,
    pub p90: f32,
    pub p95: f32,
    pub p99: f32,
}

/// Tracks statistics for all compilations
#[derive(Debug, Default)]
pub struct StatsTracker {
    /// Map from compiler description to statistics
    stats: HashMap<String, CompilerStats>,
    /// Compilations queued but never observed compiled
    incomplete: u64,
    quality: DataQuality,
}

impl StatsTracker {
    /// Create a new statistics tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one compilation.
    ///
    /// Grouping key is the compiler description from the nmethod record;
    /// records without one count as incomplete, records with an empty one
    /// land in the `unknown` bucket. A zero elapsed time means the compile
    /// was never timed and contributes no duration; a negative one is a
    /// stamp inconsistency, counted and logged but never folded into the
    /// totals and never altered on the record itself.
    pub fn record(&mut self, compilation: &Compilation) {
        let description = match compilation.compiler_description() {
            Some(description) => description,
            None => {
                self.incomplete += 1;
                return;
            }
        };
        let group = if description.is_empty() {
            "unknown".to_string()
        } else {
            description
        };

        let entry = self.stats.entry(group).or_default();
        entry.count += 1;

        match compilation.native_size() {
            Ok(size) => entry.total_native_size += size,
            Err(e) => {
                self.quality.invalid_native_sizes += 1;
                warn!(
                    compilation = %compilation.signature(),
                    error = %e,
                    "unreadable native size"
                );
            }
        }

        let elapsed = compilation.compile_time();
        if elapsed < 0 {
            self.quality.negative_compile_times += 1;
            warn!(
                compilation = %compilation.signature(),
                elapsed_ms = elapsed,
                "negative elapsed compile time, stamps are inconsistent"
            );
        } else if elapsed > 0 {
            entry.total_time_ms += elapsed as u64;
            entry.durations.push(elapsed as u64);
        }
    }

    /// Get access to the stats map for export
    pub fn stats_map(&self) -> &HashMap<String, CompilerStats> {
        &self.stats
    }

    /// Compilations that never produced an nmethod record
    pub fn incomplete(&self) -> u64 {
        self.incomplete
    }

    /// Data-quality counters accumulated so far
    pub fn quality(&self) -> DataQuality {
        self.quality
    }

    /// Calculate totals using Trueno for high-performance SIMD operations
    pub fn calculate_totals_with_trueno(&self) -> StatTotals {
        if self.stats.is_empty() {
            return StatTotals {
                total_compilations: 0,
                total_time_ms: 0,
                total_native_bytes: 0,
            };
        }

        // Extract data into vectors for SIMD processing
        let counts: Vec<f32> = self.stats.values().map(|s| s.count as f32).collect();
        let times: Vec<f32> = self
            .stats
            .values()
            .map(|s| s.total_time_ms as f32)
            .collect();
        let sizes: Vec<f32> = self
            .stats
            .values()
            .map(|s| s.total_native_size as f32)
            .collect();

        // Use Trueno for SIMD-accelerated sums
        let total_compilations = trueno::Vector::from_slice(&counts).sum().unwrap_or(0.0) as u64;
        let total_time_ms = trueno::Vector::from_slice(&times).sum().unwrap_or(0.0) as u64;
        let total_native_bytes = trueno::Vector::from_slice(&sizes).sum().unwrap_or(0.0) as u64;

        StatTotals {
            total_compilations,
            total_time_ms,
            total_native_bytes,
        }
    }

    /// Calculate percentile from sorted data
    fn calculate_percentile(sorted_data: &[f32], percentile: f32) -> f32 {
        if sorted_data.is_empty() {
            return 0.0;
        }
        if sorted_data.len() == 1 {
            return sorted_data[0];
        }

        let index = (percentile / 100.0) * (sorted_data.len() - 1) as f32;
        let lower = index.floor() as usize;
        let upper = index.ceil() as usize;

        if lower == upper {
            sorted_data[lower]
        } else {
            let weight = index - lower as f32;
            sorted_data[lower] * (1.0 - weight) + sorted_data[upper] * weight
        }
    }

    /// Calculate extended statistics for a compiler group using Trueno
    pub fn calculate_extended_statistics(&self, group: &str) -> Option<ExtendedStats> {
        let stats = self.stats.get(group)?;

        if stats.durations.is_empty() {
            return None;
        }

        // Convert durations to f32 for Trueno
        let durations: Vec<f32> = stats.durations.iter().map(|&d| d as f32).collect();

        Some(Self::compute_extended_stats_block(&durations))
    }

    /// Internal: compute extended stats over one duration set
    fn compute_extended_stats_block(durations: &[f32]) -> ExtendedStats {
        let v = trueno::Vector::from_slice(durations);

        // Use Trueno for basic statistics
        let mean = v.mean().unwrap_or(0.0);
        let stddev = v.stddev().unwrap_or(0.0);
        let min = v.min().unwrap_or(0.0);
        let max = v.max().unwrap_or(0.0);

        // Calculate percentiles (Trueno doesn't have a built-in percentile)
        let mut sorted = durations.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let median = Self::calculate_percentile(&sorted, 50.0);
        let p75 = Self::calculate_percentile(&sorted, 75.0);
        let p90 = Self::calculate_percentile(&sorted, 90.0);
        let p95 = Self::calculate_percentile(&sorted, 95.0);
        let p99 = Self::calculate_percentile(&sorted, 99.0);

        ExtendedStats {
            mean,
            stddev,
            min,
            max,
            median,
            p75,
            p90,
            p95,
            p99,
        }
    }

    /// Check if an elapsed time is an anomaly (>threshold σ from the
    /// group's mean)
    pub fn is_anomaly(&self, group: &str, duration_ms: u64, threshold: f32) -> bool {
        if let Some(extended) = self.calculate_extended_statistics(group) {
            if extended.stddev > 0.0 {
                let z_score = ((duration_ms as f32 - extended.mean) / extended.stddev).abs();
                return z_score > threshold;
            }
        }
        false
    }

    /// Print extended statistics summary to stdout
    pub fn print_extended_summary(&self, threshold: f32) {
        if self.stats.is_empty() {
            println!("No completed compilations.");
            return;
        }

        println!("\n=== Extended Compile-Time Statistics (SIMD-accelerated via Trueno) ===\n");

        // Sort by compilation count
        let mut sorted: Vec<_> = self.stats.iter().collect();
        sorted.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));

        for (name, stats) in sorted {
            let extended = match self.calculate_extended_statistics(name) {
                Some(extended) => extended,
                None => continue,
            };

            println!("{} ({} compilations, {} timed):", name, stats.count, stats.durations.len());
            println!("  Mean:         {:.2} ms", extended.mean);
            println!("  Std Dev:      {:.2} ms", extended.stddev);
            println!("  Min:          {:.2} ms", extended.min);
            println!("  Max:          {:.2} ms", extended.max);
            println!("  Median (P50): {:.2} ms", extended.median);
            println!("  P75:          {:.2} ms", extended.p75);
            println!("  P90:          {:.2} ms", extended.p90);
            println!("  P95:          {:.2} ms", extended.p95);
            println!("  P99:          {:.2} ms", extended.p99);

            // Check for anomalies in the data
            if extended.stddev > 0.0 {
                let max_z = (extended.max - extended.mean) / extended.stddev;
                if max_z > threshold {
                    println!(
                        "  ⚠️  ANOMALY DETECTED: Max compile time is {:.1}σ above mean",
                        max_z
                    );
                }
            }
            println!();
        }

        self.print_quality_callouts();
    }

    /// Print statistics summary to stdout (strace -c table shape)
    pub fn print_summary(&self) {
        if self.stats.is_empty() && self.incomplete == 0 {
            println!("No compilations found.");
            return;
        }

        if self.stats.is_empty() {
            println!("No completed compilations.");
            self.print_quality_callouts();
            return;
        }

        // Calculate totals using Trueno for SIMD acceleration
        let totals = self.calculate_totals_with_trueno();
        let total_time_ms = totals.total_time_ms;

        // Sort by compilation count (descending), name breaks ties
        let mut sorted: Vec<_> = self.stats.iter().collect();
        sorted.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));

        // Print header
        println!("% time     seconds  ms/compile  compiles  native-b compiler");
        println!("------ ----------- ----------- --------- --------- ----------------");

        // Print each compiler group
        for (name, stats) in sorted {
            let time_percent = if total_time_ms > 0 {
                (stats.total_time_ms as f64 / total_time_ms as f64) * 100.0
            } else {
                0.0
            };
            let seconds = stats.total_time_ms as f64 / 1_000.0;
            let ms_per_compile = if stats.durations.is_empty() {
                0
            } else {
                stats.total_time_ms / stats.durations.len() as u64
            };

            println!(
                "{:6.2} {:>11.6} {:>11} {:>9} {:>9} {}",
                time_percent, seconds, ms_per_compile, stats.count, stats.total_native_size, name
            );
        }

        // Print summary line
        println!("------ ----------- ----------- --------- --------- ----------------");
        let total_seconds = total_time_ms as f64 / 1_000.0;
        let avg_ms = if totals.total_compilations > 0 {
            total_time_ms / totals.total_compilations
        } else {
            0
        };
        println!(
            "100.00 {:>11.6} {:>11} {:>9} {:>9} total",
            total_seconds, avg_ms, totals.total_compilations, totals.total_native_bytes
        );

        self.print_quality_callouts();
    }

    fn print_quality_callouts(&self) {
        if self.incomplete == 0
            && self.quality.negative_compile_times == 0
            && self.quality.invalid_native_sizes == 0
        {
            return;
        }

        println!();
        if self.incomplete > 0 {
            println!(
                "{} compilations queued but never observed compiled",
                self.incomplete
            );
        }
        if self.quality.negative_compile_times > 0 {
            println!(
                "{} compilations with negative elapsed time (inconsistent stamps)",
                self.quality.negative_compile_times
            );
        }
        if self.quality.invalid_native_sizes > 0 {
            println!(
                "{} task_done records with missing or invalid nmsize",
                self.quality.invalid_native_sizes
            );
        }
    }
}
