use std::fmt::Display;
use std::str::FromStr;

use anyhow::bail;
use serde::{
    Deserialize,
    Serialize,
};

use crate::data_structs::typedef::{
    DensityType,
    PosType,
};
use crate::data_structs::MethState;
use crate::utils::resolve_threads;
use crate::with_field_fn;

pub const MAX_WINDOW_SIZE: PosType = 100_000;

/// High/low cut-offs used to discretize methylation probabilities.
///
/// Construction guarantees `0 < low < high <= 1`, so [`classify`] is total
/// over `[0, 1]`.
///
/// [`classify`]: MethylationThresholds::classify
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MethylationThresholds {
    high: DensityType,
    low:  DensityType,
}

impl Default for MethylationThresholds {
    fn default() -> Self {
        Self {
            high: 0.8,
            low:  0.2,
        }
    }
}

impl MethylationThresholds {
    pub fn try_new(
        high: DensityType,
        low: DensityType,
    ) -> anyhow::Result<Self> {
        if !(high > 0.0 && high <= 1.0) {
            bail!("High methylation threshold must be in (0, 1], got {}", high)
        }
        if !(low > 0.0 && low < high) {
            bail!(
                "Low methylation threshold must be in (0, {}), got {}",
                high,
                low
            )
        }
        Ok(Self { high, low })
    }

    pub fn high(&self) -> DensityType {
        self.high
    }

    pub fn low(&self) -> DensityType {
        self.low
    }

    pub fn classify(
        &self,
        probability: DensityType,
    ) -> MethState {
        if probability >= self.high {
            MethState::High
        }
        else if probability <= self.low {
            MethState::Low
        }
        else {
            MethState::Mid
        }
    }
}

/// How variant files are grouped into aggregation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunMode {
    /// One independent analysis (and report directory) per variant file.
    #[default]
    PerFile,
    /// All variant files aggregated together, enabling source comparison.
    Combined,
}

impl Display for RunMode {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            RunMode::PerFile => write!(f, "per-file"),
            RunMode::Combined => write!(f, "combined"),
        }
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "per-file" | "perfile" => Ok(RunMode::PerFile),
            "combined" => Ok(RunMode::Combined),
            other => Err(format!("unknown run mode '{}'", other)),
        }
    }
}

/// Values consumed by extraction, aggregation and the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Maximum distance (bp) between a call and its variant.
    pub window_size:      PosType,
    pub thresholds:       MethylationThresholds,
    /// Per-strand coverage required by the strand filter, `0` disables it.
    pub min_strand_reads: usize,
    /// Minimum AD of an ALT allele, `0` disables the check.
    pub min_alt_support:  u32,
    pub max_read_depth:   usize,
    pub min_mapq:         u8,
    pub threads:          usize,
    pub mode:             RunMode,
    /// Records allocated up front per thread.
    pub pool_prealloc:    usize,
    /// Ceiling on live pooled records. A worker holding no records waits
    /// at the ceiling; one mid-fetch allocates past it.
    pub pool_hard_cap:    Option<usize>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size:      2000,
            thresholds:       MethylationThresholds::default(),
            min_strand_reads: 1,
            min_alt_support:  0,
            max_read_depth:   10_000,
            min_mapq:         10,
            threads:          resolve_threads(0),
            mode:             RunMode::default(),
            pool_prealloc:    100,
            pool_hard_cap:    None,
        }
    }
}

impl AnalysisConfig {
    with_field_fn!(window_size, PosType);

    with_field_fn!(thresholds, MethylationThresholds);

    with_field_fn!(min_strand_reads, usize);

    with_field_fn!(min_alt_support, u32);

    with_field_fn!(max_read_depth, usize);

    with_field_fn!(min_mapq, u8);

    with_field_fn!(mode, RunMode);

    with_field_fn!(pool_prealloc, usize);

    with_field_fn!(pool_hard_cap, Option<usize>);

    /// Sets the worker count, `0` meaning all available cores.
    pub fn with_threads(
        mut self,
        value: usize,
    ) -> Self {
        self.threads = resolve_threads(value);
        self
    }

    /// Rejects configurations that would make extraction or aggregation
    /// meaningless. Called before any input is read.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.window_size == 0 || self.window_size > MAX_WINDOW_SIZE {
            bail!(
                "Window size must be in 1..={}, got {}",
                MAX_WINDOW_SIZE,
                self.window_size
            )
        }
        MethylationThresholds::try_new(
            self.thresholds.high(),
            self.thresholds.low(),
        )?;
        if self.max_read_depth == 0 {
            bail!("Max read depth must be positive")
        }
        if self.threads == 0 {
            bail!("Thread count must be at least 1")
        }
        if let Some(cap) = self.pool_hard_cap {
            if cap < self.threads {
                bail!(
                    "Record pool cap ({}) must be at least the thread count ({})",
                    cap,
                    self.threads
                )
            }
        }
        Ok(())
    }

    /// Core parameters as `(name, value)` pairs for the metrics report.
    pub fn describe(&self) -> Vec<(String, String)> {
        vec![
            ("window_size".into(), self.window_size.to_string()),
            (
                "meth_high_threshold".into(),
                format!("{:.4}", self.thresholds.high()),
            ),
            (
                "meth_low_threshold".into(),
                format!("{:.4}", self.thresholds.low()),
            ),
            ("min_allele".into(), self.min_alt_support.to_string()),
            ("min_strand_reads".into(), self.min_strand_reads.to_string()),
            ("max_read_depth".into(), self.max_read_depth.to_string()),
            ("threads".into(), self.threads.to_string()),
            ("mode".into(), self.mode.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::defaults(0.8, 0.2, true)]
    #[case::high_is_one(1.0, 0.5, true)]
    #[case::equal(0.5, 0.5, false)]
    #[case::inverted(0.2, 0.8, false)]
    #[case::zero_low(0.8, 0.0, false)]
    #[case::high_above_one(1.2, 0.2, false)]
    fn thresholds_validation(
        #[case] high: f64,
        #[case] low: f64,
        #[case] ok: bool,
    ) {
        assert_eq!(MethylationThresholds::try_new(high, low).is_ok(), ok);
    }

    #[rstest]
    #[case(0.0, MethState::Low)]
    #[case(0.2, MethState::Low)]
    #[case(0.21, MethState::Mid)]
    #[case(0.79, MethState::Mid)]
    #[case(0.8, MethState::High)]
    #[case(1.0, MethState::High)]
    fn classification_boundaries(
        #[case] p: f64,
        #[case] expected: MethState,
    ) {
        let t = MethylationThresholds::default();
        assert_eq!(t.classify(p), expected);
    }

    #[test]
    fn classification_is_total() {
        let t = MethylationThresholds::try_new(0.7, 0.3).unwrap();
        for i in 0..=1000 {
            let p = i as f64 / 1000.0;
            let state = t.classify(p);
            match state {
                MethState::High => assert!(p >= 0.7),
                MethState::Low => assert!(p <= 0.3),
                MethState::Mid => assert!(p > 0.3 && p < 0.7),
            }
        }
    }

    #[rstest]
    #[case::zero_window(AnalysisConfig::default().with_window_size(0))]
    #[case::huge_window(AnalysisConfig::default().with_window_size(100_001))]
    #[case::zero_depth(AnalysisConfig::default().with_max_read_depth(0))]
    #[case::bad_thresholds(AnalysisConfig::default().with_thresholds(
        MethylationThresholds { high: 0.3, low: 0.6 }
    ))]
    #[case::cap_below_threads(
        AnalysisConfig::default().with_threads(4).with_pool_hard_cap(Some(2))
    )]
    fn invalid_configs_rejected(#[case] config: AnalysisConfig) {
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_size, 2000);
        assert!(config.threads >= 1);
    }
}
