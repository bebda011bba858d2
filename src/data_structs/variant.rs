use std::fmt::Display;

use serde::{
    Deserialize,
    Serialize,
};

use super::enums::VariantClass;
use super::typedef::{
    PosType,
    SmallId,
};
use crate::getter_fn;

/// A single REF/ALT pair of a called variant.
///
/// Multi-allelic records are split into one descriptor per ALT allele by
/// the loader, all sharing the same position and [`VariantClass::Multi`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDescriptor {
    chrom:      SmallId,
    /// 1-based position of the first REF base.
    pos:        PosType,
    ref_allele: String,
    alt_allele: String,
    class:      VariantClass,
    source:     SmallId,
    quality:    Option<f32>,
}

impl VariantDescriptor {
    getter_fn!(chrom, SmallId);

    getter_fn!(pos, PosType);

    getter_fn!(ref_allele, String);

    getter_fn!(alt_allele, String);

    getter_fn!(class, VariantClass);

    getter_fn!(source, SmallId);

    getter_fn!(quality, Option<f32>);

    pub fn new(
        chrom: impl Into<SmallId>,
        pos: PosType,
        ref_allele: impl Into<String>,
        alt_allele: impl Into<String>,
        class: VariantClass,
        source: impl Into<SmallId>,
        quality: Option<f32>,
    ) -> Self {
        Self {
            chrom: chrom.into(),
            pos,
            ref_allele: ref_allele.into(),
            alt_allele: alt_allele.into(),
            class,
            source: source.into(),
            quality,
        }
    }

    /// Builds a biallelic descriptor, deriving the class from the alleles.
    pub fn biallelic(
        chrom: impl Into<SmallId>,
        pos: PosType,
        ref_allele: &str,
        alt_allele: &str,
        source: impl Into<SmallId>,
    ) -> Self {
        let class = VariantClass::classify(ref_allele, alt_allele, 2);
        Self::new(chrom, pos, ref_allele, alt_allele, class, source, None)
    }

    /// 0-based position, as used by region queries.
    pub fn pos0(&self) -> PosType {
        self.pos.saturating_sub(1)
    }

    /// Key used to count distinct variants.
    pub fn key(&self) -> (SmallId, PosType, VariantClass) {
        (self.chrom.clone(), self.pos, self.class)
    }
}

impl Display for VariantDescriptor {
    #[cfg_attr(coverage_nightly, coverage(off))]
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(
            f,
            "{}:{} {}>{} ({})",
            self.chrom, self.pos, self.ref_allele, self.alt_allele, self.class
        )
    }
}
