use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{
    Deserialize,
    Serialize,
};

use super::enums::{
    AlleleSupport,
    Strand,
    VariantClass,
    VariantTypeGroup,
};
use super::site::MethylationSite;
use super::typedef::{
    CountType,
    DensityType,
    PosType,
    SmallId,
};
use crate::getter_fn;

/// Mean value reported for a variant source without data in a group.
pub const NO_DATA_SENTINEL: DensityType = -1.0;

/// Level-2 record: methylation around one variant for one allele/haplotype
/// combination of one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantMethylationSummary {
    pub chrom:            SmallId,
    pub somatic_pos:      PosType,
    pub variant_class:    VariantClass,
    pub vcf_source:       SmallId,
    pub bam_source:       SmallId,
    pub allele_support:   AlleleSupport,
    pub haplotype:        SmallId,
    /// Number of distinct reads contributing sites.
    pub supporting_reads: CountType,
    pub site_count:       CountType,
    pub mean_methylation: DensityType,
    /// Strand holding the strict majority of sites, [`Strand::None`] on ties.
    pub dominant_strand:  Strand,
}

/// Difference between the two compared variant sources of a level-3 group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceComparison {
    /// First-minus-second mean, by first-seen source order.
    pub difference: DensityType,
    pub p_value:    f64,
}

impl SourceComparison {
    /// Reported when either side lacks data or has fewer than two values.
    pub fn no_evidence() -> Self {
        Self {
            difference: 0.0,
            p_value:    1.0,
        }
    }
}

/// Level-3 record: per-source mean methylation for one haplotype, sample
/// and coarse variant type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaplotypeGroupStats {
    pub(crate) haplotype:    SmallId,
    pub(crate) bam_source:   SmallId,
    pub(crate) type_group:   VariantTypeGroup,
    /// One entry per variant source known to the run, `None` without data.
    pub(crate) source_means: IndexMap<SmallId, Option<DensityType>>,
    pub(crate) comparison:   Option<SourceComparison>,
}

impl HaplotypeGroupStats {
    getter_fn!(haplotype, SmallId);

    getter_fn!(bam_source, SmallId);

    getter_fn!(type_group, VariantTypeGroup);

    getter_fn!(source_means, IndexMap<SmallId, Option<DensityType>>);

    getter_fn!(comparison, Option<SourceComparison>);

    /// Mean for `source`, or [`NO_DATA_SENTINEL`] when the source has no
    /// values in this group.
    pub fn mean_or_sentinel(
        &self,
        source: &str,
    ) -> DensityType {
        self.source_means
            .get(source)
            .copied()
            .flatten()
            .unwrap_or(NO_DATA_SENTINEL)
    }
}

/// Variant counts of a single variant source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceVariantCounts {
    /// Distinct variants with at least one extracted site.
    pub total:     CountType,
    /// Distinct variants left after the strand-coverage filter.
    pub processed: CountType,
}

/// Site metrics of a single sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleSiteMetrics {
    /// Sites classified high or mid.
    pub methylated_sites: CountType,
    pub total_sites:      CountType,
    /// Mean probability over methylated sites only.
    pub mean_methylation: DensityType,
}

/// Run parameters and whole-run summary counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalMetrics {
    pub(crate) parameters:     IndexMap<String, String>,
    pub(crate) variant_counts: BTreeMap<SmallId, SourceVariantCounts>,
    pub(crate) sample_metrics: BTreeMap<SmallId, SampleSiteMetrics>,
}

impl GlobalMetrics {
    getter_fn!(parameters, IndexMap<String, String>);

    getter_fn!(variant_counts, BTreeMap<SmallId, SourceVariantCounts>);

    getter_fn!(sample_metrics, BTreeMap<SmallId, SampleSiteMetrics>);

    pub fn set_parameter(
        &mut self,
        name: impl Into<String>,
        value: impl ToString,
    ) {
        self.parameters.insert(name.into(), value.to_string());
    }

    /// Flattened `(metric_name, metric_value)` rows in a stable order.
    pub fn metric_rows(&self) -> Vec<(String, String)> {
        let mut rows = Vec::new();
        for (source, counts) in self.variant_counts.iter() {
            rows.push((
                format!("{}_total_variants", source),
                counts.total.to_string(),
            ));
            rows.push((
                format!("{}_processed_variants", source),
                counts.processed.to_string(),
            ));
        }
        for (sample, metrics) in self.sample_metrics.iter() {
            rows.push((
                format!("{}_methylated_site_count", sample),
                metrics.methylated_sites.to_string(),
            ));
            rows.push((
                format!("{}_total_site_count", sample),
                metrics.total_sites.to_string(),
            ));
            rows.push((
                format!("{}_mean_methylation", sample),
                format!("{:.4}", metrics.mean_methylation),
            ));
        }
        rows
    }
}

/// Terminal output of one aggregation run.
#[derive(Debug, Clone, Default)]
pub struct AnalysisResults {
    /// Label of the run (VCF source id, or `combined`).
    pub(crate) label:               SmallId,
    /// Every extracted site, before the strand filter.
    pub(crate) raw_sites:           Vec<MethylationSite>,
    pub(crate) filtered_site_count: CountType,
    pub(crate) variant_summaries:   Vec<VariantMethylationSummary>,
    pub(crate) haplotype_stats:     Vec<HaplotypeGroupStats>,
    /// Variant sources in first-seen order.
    pub(crate) sources:             Vec<SmallId>,
    pub(crate) metrics:             GlobalMetrics,
}

impl AnalysisResults {
    getter_fn!(label, SmallId);

    getter_fn!(raw_sites, Vec<MethylationSite>);

    getter_fn!(filtered_site_count, CountType);

    getter_fn!(variant_summaries, Vec<VariantMethylationSummary>);

    getter_fn!(haplotype_stats, Vec<HaplotypeGroupStats>);

    getter_fn!(sources, Vec<SmallId>);

    getter_fn!(metrics, GlobalMetrics);

    /// Whether level-3 rows carry a two-source comparison.
    pub fn has_comparison(&self) -> bool {
        self.sources.len() == 2
    }

    pub fn metrics_mut(&mut self) -> &mut GlobalMetrics {
        &mut self.metrics
    }
}
