use std::collections::BTreeMap;

use hashbrown::HashSet;

use crate::data_structs::typedef::{
    DensityType,
    SmallId,
};
use crate::data_structs::{
    GlobalMetrics,
    MethylationSite,
    SampleSiteMetrics,
    SourceVariantCounts,
    VariantMethylationSummary,
};
use crate::utils::order_independent_mean;

/// Variant counts per variant source and site metrics per sample.
///
/// `total` counts distinct variants among the raw sites, `processed` those
/// still present after the strand filter. Sample metrics use raw sites.
pub fn collect_metrics(
    raw_sites: &[MethylationSite],
    summaries: &[VariantMethylationSummary],
    metrics: &mut GlobalMetrics,
) {
    let mut variant_counts: BTreeMap<SmallId, SourceVariantCounts> =
        BTreeMap::new();

    let raw_variants = raw_sites
        .iter()
        .map(|s| (&s.vcf_source, &s.chrom, s.somatic_pos, s.variant_class))
        .collect::<HashSet<_>>();
    for (source, ..) in raw_variants {
        variant_counts.entry(source.clone()).or_default().total += 1;
    }

    let processed_variants = summaries
        .iter()
        .map(|s| (&s.vcf_source, &s.chrom, s.somatic_pos, s.variant_class))
        .collect::<HashSet<_>>();
    for (source, ..) in processed_variants {
        variant_counts.entry(source.clone()).or_default().processed += 1;
    }

    let mut per_sample: BTreeMap<SmallId, (Vec<DensityType>, usize)> =
        BTreeMap::new();
    for site in raw_sites.iter() {
        let entry = per_sample.entry(site.bam_source.clone()).or_default();
        if site.state.is_methylated() {
            entry.0.push(site.probability);
        }
        entry.1 += 1;
    }
    let sample_metrics = per_sample
        .into_iter()
        .map(|(sample, (mut methylated, total_sites))| {
            let metrics = SampleSiteMetrics {
                methylated_sites: methylated.len(),
                total_sites,
                mean_methylation: order_independent_mean(&mut methylated),
            };
            (sample, metrics)
        })
        .collect();

    metrics.variant_counts = variant_counts;
    metrics.sample_metrics = sample_metrics;
}
