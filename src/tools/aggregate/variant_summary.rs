use std::cmp::Ordering;

use hashbrown::{
    HashMap,
    HashSet,
};
use itertools::Itertools;

use crate::data_structs::typedef::{
    PosType,
    SmallId,
};
use crate::data_structs::{
    AlleleSupport,
    MethylationSite,
    Strand,
    VariantClass,
    VariantMethylationSummary,
};
use crate::utils::order_independent_mean;

type SummaryKey = (
    SmallId,
    PosType,
    VariantClass,
    SmallId,
    SmallId,
    AlleleSupport,
    SmallId,
);

#[derive(Default)]
struct SummaryAcc<'a> {
    reads:   HashSet<&'a str>,
    values:  Vec<f64>,
    forward: usize,
    reverse: usize,
}

fn dominant_strand(
    forward: usize,
    reverse: usize,
) -> Strand {
    match forward.cmp(&reverse) {
        Ordering::Greater => Strand::Forward,
        Ordering::Less => Strand::Reverse,
        Ordering::Equal => Strand::None,
    }
}

/// Rolls sites up per (chromosome, variant, class, variant source, sample,
/// allele, haplotype). Output is sorted by that key.
pub fn summarize_variants<'a, I>(sites: I) -> Vec<VariantMethylationSummary>
where
    I: IntoIterator<Item = &'a MethylationSite>, {
    let mut groups: HashMap<SummaryKey, SummaryAcc<'a>> = HashMap::new();

    for site in sites {
        let key = (
            site.chrom.clone(),
            site.somatic_pos,
            site.variant_class,
            site.vcf_source.clone(),
            site.bam_source.clone(),
            site.allele_support,
            site.haplotype.clone(),
        );
        let acc = groups.entry(key).or_default();
        acc.reads.insert(site.read_id.as_str());
        acc.values.push(site.probability);
        match site.strand {
            Strand::Forward => acc.forward += 1,
            Strand::Reverse => acc.reverse += 1,
            Strand::None => {},
        }
    }

    groups
        .into_iter()
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(key, mut acc)| {
            let (chrom, somatic_pos, variant_class, vcf_source, bam_source, allele_support, haplotype) =
                key;
            VariantMethylationSummary {
                chrom,
                somatic_pos,
                variant_class,
                vcf_source,
                bam_source,
                allele_support,
                haplotype,
                supporting_reads: acc.reads.len(),
                site_count: acc.values.len(),
                mean_methylation: order_independent_mean(&mut acc.values),
                dominant_strand: dominant_strand(acc.forward, acc.reverse),
            }
        })
        .collect()
}
