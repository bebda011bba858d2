use serde::{
    Deserialize,
    Serialize,
};

use super::enums::{
    AlleleSupport,
    MethState,
    Strand,
    VariantClass,
};
use super::typedef::{
    DensityType,
    PosType,
    SmallId,
};

/// One modified-base call from one read, linked to the variant whose
/// window it falls into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethylationSite {
    pub chrom:           SmallId,
    /// 1-based reference position of the modified base.
    pub methyl_pos:      PosType,
    /// 1-based position of the linked variant.
    pub somatic_pos:     PosType,
    pub variant_class:   VariantClass,
    pub vcf_source:      SmallId,
    pub bam_source:      SmallId,
    pub allele_support:  AlleleSupport,
    /// Read base at the variant position, `?` when it is not aligned.
    pub base_at_variant: char,
    pub haplotype:       SmallId,
    pub probability:     DensityType,
    pub state:           MethState,
    pub strand:          Strand,
    pub read_id:         SmallId,
}

impl MethylationSite {
    /// Reference distance between the call and its variant.
    pub fn distance_to_variant(&self) -> PosType {
        self.methyl_pos.abs_diff(self.somatic_pos)
    }

    /// Total ordering used to emit level-1 rows deterministically.
    pub fn sort_key(
        &self
    ) -> (
        &str,
        PosType,
        PosType,
        VariantClass,
        &str,
        &str,
        &str,
        Strand,
    ) {
        (
            self.chrom.as_str(),
            self.somatic_pos,
            self.methyl_pos,
            self.variant_class,
            self.vcf_source.as_str(),
            self.bam_source.as_str(),
            self.read_id.as_str(),
            self.strand,
        )
    }
}
