//! Three-stage rollup of extracted sites.
//!
//! 1. [`filter_by_strand_coverage`]: drop positions lacking coverage on
//!    either strand.
//! 2. [`summarize_variants`]: per variant/allele/haplotype summaries.
//! 3. [`haplotype_group_stats`]: per haplotype/sample/type-group means and
//!    the two-source comparison.
//!
//! Every stage groups by unordered keys and emits rows sorted by key, so
//! results do not depend on the order sites were extracted in.

mod haplotype;
mod metrics;
mod strand_filter;
mod variant_summary;

pub use haplotype::{
    haplotype_group_stats,
    source_order,
};
use log::info;
pub use metrics::collect_metrics;
pub use strand_filter::filter_by_strand_coverage;
pub use variant_summary::summarize_variants;

use crate::config::AnalysisConfig;
use crate::data_structs::typedef::SmallId;
use crate::data_structs::{
    AnalysisResults,
    GlobalMetrics,
    MethylationSite,
};

#[derive(Debug, Clone)]
pub struct AggregationEngine {
    min_strand_reads: usize,
    source_seed:      Vec<SmallId>,
    parameters:       Vec<(String, String)>,
}

impl AggregationEngine {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            min_strand_reads: config.min_strand_reads,
            source_seed:      Vec::new(),
            parameters:       config.describe(),
        }
    }

    /// Orders the observed variant sources (and thus the direction of
    /// reported differences) instead of relying on first appearance.
    /// Sources without summaries are not reported.
    pub fn with_source_order(
        mut self,
        sources: Vec<SmallId>,
    ) -> Self {
        self.source_seed = sources;
        self
    }

    /// Adds run parameters (input files etc.) ahead of the core ones.
    pub fn with_parameters(
        mut self,
        mut parameters: Vec<(String, String)>,
    ) -> Self {
        parameters.append(&mut self.parameters);
        self.parameters = parameters;
        self
    }

    pub fn run(
        &self,
        label: impl Into<SmallId>,
        mut sites: Vec<MethylationSite>,
    ) -> AnalysisResults {
        let label = label.into();
        info!("[{}] Aggregating {} methylation sites", label, sites.len());

        sites.sort_by(|a, b| {
            a.sort_key()
                .cmp(&b.sort_key())
                .then(a.allele_support.cmp(&b.allele_support))
                .then_with(|| a.haplotype.cmp(&b.haplotype))
                .then(a.base_at_variant.cmp(&b.base_at_variant))
                .then(a.probability.total_cmp(&b.probability))
                .then(a.state.cmp(&b.state))
        });

        let filtered = filter_by_strand_coverage(&sites, self.min_strand_reads);
        let filtered_site_count = filtered.len();
        info!(
            "[{}] {} sites left after strand coverage filter (min {} per strand)",
            label, filtered_site_count, self.min_strand_reads
        );

        let variant_summaries = summarize_variants(filtered);
        info!(
            "[{}] {} variant-level summaries",
            label,
            variant_summaries.len()
        );

        let sources = source_order(&self.source_seed, &variant_summaries);
        let haplotype_stats = haplotype_group_stats(&variant_summaries, &sources);
        info!(
            "[{}] {} haplotype-level groups over {} variant source(s)",
            label,
            haplotype_stats.len(),
            sources.len()
        );

        let mut metrics = GlobalMetrics::default();
        for (name, value) in self.parameters.iter() {
            metrics.set_parameter(name.clone(), value);
        }
        collect_metrics(&sites, &variant_summaries, &mut metrics);

        AnalysisResults {
            label,
            raw_sites: sites,
            filtered_site_count,
            variant_summaries,
            haplotype_stats,
            sources,
            metrics,
        }
    }
}
