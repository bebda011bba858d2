//! Allele support and haplotype assignment of a read at a variant.

use arcstr::ArcStr;
use rust_htslib::bam;
use rust_htslib::bam::record::Aux;

use crate::data_structs::typedef::SmallId;
use crate::data_structs::{
    AlleleSupport,
    VariantDescriptor,
};
use crate::tools::coords::CoordinateMapper;

pub const HAPLOTYPE_TAG: &[u8] = b"HP";
pub const UNPHASED: ArcStr = arcstr::literal!("0");
pub const UNALIGNED_BASE: char = '?';

/// What a read shows at a variant position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlleleObservation {
    pub support: AlleleSupport,
    pub base:    char,
}

impl AlleleObservation {
    fn unaligned() -> Self {
        Self {
            support: AlleleSupport::Unknown,
            base:    UNALIGNED_BASE,
        }
    }
}

fn first_base(allele: &str) -> Option<char> {
    allele.chars().next().map(|c| c.to_ascii_uppercase())
}

/// Compares the read base against the first character of REF and ALT.
/// Longer alleles are not compared beyond their first base.
pub fn classify_allele(
    record: &bam::Record,
    mapper: &CoordinateMapper,
    variant: &VariantDescriptor,
) -> AlleleObservation {
    let Some(offset) = mapper.reference_to_read(*variant.pos())
    else {
        return AlleleObservation::unaligned();
    };
    if offset >= record.seq_len() {
        return AlleleObservation::unaligned();
    }
    let base = (record.seq()[offset] as char).to_ascii_uppercase();

    let support = if Some(base) == first_base(variant.ref_allele()) {
        AlleleSupport::Ref
    }
    else if Some(base) == first_base(variant.alt_allele()) {
        AlleleSupport::Alt
    }
    else {
        AlleleSupport::Unknown
    };
    AlleleObservation { support, base }
}

/// Haplotype label from the HP tag, `"0"` when the read is unphased.
pub fn haplotype_label(record: &bam::Record) -> SmallId {
    let value: Option<i64> = match record.aux(HAPLOTYPE_TAG) {
        Ok(Aux::I8(v)) => Some(v as i64),
        Ok(Aux::U8(v)) => Some(v as i64),
        Ok(Aux::I16(v)) => Some(v as i64),
        Ok(Aux::U16(v)) => Some(v as i64),
        Ok(Aux::I32(v)) => Some(v as i64),
        Ok(Aux::U32(v)) => Some(v as i64),
        Ok(Aux::String(s)) => return ArcStr::from(s),
        _ => None,
    };
    match value {
        None => UNPHASED,
        Some(1) => arcstr::literal!("1"),
        Some(2) => arcstr::literal!("2"),
        Some(other) => ArcStr::from(other.to_string()),
    }
}
