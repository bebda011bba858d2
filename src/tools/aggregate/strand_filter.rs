use hashbrown::HashMap;

use crate::data_structs::typedef::{
    PosType,
    SmallId,
};
use crate::data_structs::{
    MethylationSite,
    Strand,
};

#[derive(Debug, Default, Clone, Copy)]
struct StrandCounts {
    forward: usize,
    reverse: usize,
}

/// Keeps sites whose (chromosome, position, sample) has at least
/// `min_strand_reads` observations on each strand. `0` keeps everything.
pub fn filter_by_strand_coverage(
    sites: &[MethylationSite],
    min_strand_reads: usize,
) -> Vec<&MethylationSite> {
    if min_strand_reads == 0 {
        return sites.iter().collect();
    }

    let mut counts: HashMap<(&SmallId, PosType, &SmallId), StrandCounts> =
        HashMap::new();
    for site in sites.iter() {
        let entry = counts
            .entry((&site.chrom, site.methyl_pos, &site.bam_source))
            .or_default();
        match site.strand {
            Strand::Forward => entry.forward += 1,
            Strand::Reverse => entry.reverse += 1,
            Strand::None => {},
        }
    }

    sites
        .iter()
        .filter(|site| {
            counts
                .get(&(&site.chrom, site.methyl_pos, &site.bam_source))
                .is_some_and(|c| {
                    c.forward >= min_strand_reads && c.reverse >= min_strand_reads
                })
        })
        .collect()
}
