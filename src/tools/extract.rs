use arcstr::ArcStr;
use log::trace;
use rust_htslib::bam;

use crate::config::{
    AnalysisConfig,
    MethylationThresholds,
};
use crate::data_structs::typedef::{
    PosType,
    SmallId,
};
use crate::data_structs::{
    AlleleSupport,
    MethylationSite,
    Strand,
    VariantDescriptor,
};
use crate::tools::allele::{
    classify_allele,
    haplotype_label,
};
use crate::tools::coords::CoordinateMapper;
use crate::tools::modbase::decode_modifications;

/// Turns reads overlapping a variant into windowed methylation sites.
#[derive(Debug, Clone)]
pub struct SiteExtractor {
    window:     PosType,
    thresholds: MethylationThresholds,
}

impl SiteExtractor {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            window:     config.window_size,
            thresholds: config.thresholds,
        }
    }

    pub fn window(&self) -> PosType {
        self.window
    }

    fn is_usable(record: &bam::Record) -> bool {
        !(record.is_unmapped()
            || record.is_secondary()
            || record.is_quality_check_failed()
            || record.is_duplicate())
    }

    /// Sites contributed by `record` for `variant`. Reads that cannot be
    /// classified against the variant, or carry no usable annotation,
    /// contribute nothing.
    pub fn extract(
        &self,
        record: &bam::Record,
        variant: &VariantDescriptor,
        bam_source: &SmallId,
    ) -> Vec<MethylationSite> {
        if !Self::is_usable(record) {
            return Vec::new();
        }
        let mapper = match CoordinateMapper::from_record(record) {
            Ok(mapper) => mapper,
            Err(e) => {
                trace!(
                    "Skipping {}: {}",
                    String::from_utf8_lossy(record.qname()),
                    e
                );
                return Vec::new();
            },
        };

        let haplotype = haplotype_label(record);
        let allele = classify_allele(record, &mapper, variant);
        if allele.support == AlleleSupport::Unknown {
            return Vec::new();
        }

        let calls = decode_modifications(record);
        if calls.is_empty() {
            return Vec::new();
        }

        let table = mapper.read_to_reference_table();
        let strand = Strand::from_reverse_flag(record.is_reverse());
        let read_id = ArcStr::from(String::from_utf8_lossy(record.qname()).as_ref());
        let somatic_pos = *variant.pos();

        calls
            .into_iter()
            .filter_map(|call| {
                let methyl_pos = table.get(call.read_offset).copied().flatten()?;
                if methyl_pos.abs_diff(somatic_pos) > self.window {
                    return None;
                }
                Some(MethylationSite {
                    chrom: variant.chrom().clone(),
                    methyl_pos,
                    somatic_pos,
                    variant_class: *variant.class(),
                    vcf_source: variant.source().clone(),
                    bam_source: bam_source.clone(),
                    allele_support: allele.support,
                    base_at_variant: allele.base,
                    haplotype: haplotype.clone(),
                    probability: call.probability,
                    state: self.thresholds.classify(call.probability),
                    strand,
                    read_id: read_id.clone(),
                })
            })
            .collect()
    }
}
