use hashbrown::HashMap;
use indexmap::{
    IndexMap,
    IndexSet,
};
use itertools::Itertools;

use crate::data_structs::typedef::{
    DensityType,
    SmallId,
};
use crate::data_structs::{
    HaplotypeGroupStats,
    SourceComparison,
    VariantMethylationSummary,
    VariantTypeGroup,
};
use crate::utils::{
    approx_welch_pvalue,
    order_independent_mean,
};

/// Variant sources observed in `summaries`. Those listed in `seed` come
/// first, in seed order, followed by the rest in order of first appearance.
/// Seed entries without any summary are left out.
pub fn source_order(
    seed: &[SmallId],
    summaries: &[VariantMethylationSummary],
) -> Vec<SmallId> {
    let observed: IndexSet<SmallId> = summaries
        .iter()
        .map(|s| s.vcf_source.clone())
        .collect();
    let mut sources: IndexSet<SmallId> = seed
        .iter()
        .filter(|source| observed.contains(*source))
        .cloned()
        .collect();
    sources.extend(observed);
    sources.into_iter().collect()
}

/// Compares the level-2 means of two sources within one group.
fn compare(
    first: Option<&Vec<DensityType>>,
    second: Option<&Vec<DensityType>>,
) -> SourceComparison {
    match (first, second) {
        (Some(a), Some(b)) if a.len() >= 2 && b.len() >= 2 => {
            let mut a = a.clone();
            let mut b = b.clone();
            SourceComparison {
                difference: order_independent_mean(&mut a)
                    - order_independent_mean(&mut b),
                p_value:    approx_welch_pvalue(&a, &b),
            }
        },
        _ => SourceComparison::no_evidence(),
    }
}

/// Groups level-2 summaries by (haplotype, sample, coarse variant type) and
/// reports per-source means. A two-source comparison is attached when
/// `sources` has exactly two entries.
pub fn haplotype_group_stats(
    summaries: &[VariantMethylationSummary],
    sources: &[SmallId],
) -> Vec<HaplotypeGroupStats> {
    let mut groups: HashMap<
        (SmallId, SmallId, VariantTypeGroup),
        HashMap<SmallId, Vec<DensityType>>,
    > = HashMap::new();

    for summary in summaries.iter() {
        groups
            .entry((
                summary.haplotype.clone(),
                summary.bam_source.clone(),
                summary.variant_class.type_group(),
            ))
            .or_default()
            .entry(summary.vcf_source.clone())
            .or_default()
            .push(summary.mean_methylation);
    }

    groups
        .into_iter()
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .map(|((haplotype, bam_source, type_group), per_source)| {
            let source_means = sources
                .iter()
                .map(|source| {
                    let mean = per_source
                        .get(source)
                        .filter(|values| !values.is_empty())
                        .map(|values| order_independent_mean(&mut values.clone()));
                    (source.clone(), mean)
                })
                .collect::<IndexMap<_, _>>();

            let comparison = (sources.len() == 2)
                .then(|| compare(per_source.get(&sources[0]), per_source.get(&sources[1])));

            HaplotypeGroupStats {
                haplotype,
                bam_source,
                type_group,
                source_means,
                comparison,
            }
        })
        .collect()
}
