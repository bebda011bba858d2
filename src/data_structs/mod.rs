//! Core data types shared by extraction, aggregation and reporting.
//!
//! - [`VariantDescriptor`]: one REF/ALT pair of a called variant.
//! - [`MethylationSite`]: one per-read modified-base call linked to a
//!   variant (level 1).
//! - [`VariantMethylationSummary`]: per variant/allele/haplotype rollup
//!   (level 2).
//! - [`HaplotypeGroupStats`]: per haplotype/sample/type-group comparison of
//!   variant sources (level 3).
//! - [`GlobalMetrics`] and [`AnalysisResults`], the bundle handed to the
//!   report writer.
//! - Enumerations such as [`Strand`], [`AlleleSupport`], [`MethState`] and
//!   [`VariantClass`].
//! - [`typedef`]: aliases for positions, densities and identifiers.

mod enums;
mod site;
mod summary;
pub mod typedef;
mod variant;


pub use enums::{
    AlleleSupport,
    MethState,
    Strand,
    VariantClass,
    VariantTypeGroup,
};
pub use site::MethylationSite;
pub use summary::{
    AnalysisResults,
    GlobalMetrics,
    HaplotypeGroupStats,
    SampleSiteMetrics,
    SourceComparison,
    SourceVariantCounts,
    VariantMethylationSummary,
    NO_DATA_SENTINEL,
};
pub use variant::VariantDescriptor;
