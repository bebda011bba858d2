//! Analysis steps: coordinate mapping, modification decoding, allele and
//! haplotype attribution, per-read site extraction, the three-level
//! aggregation and the parallel [`pipeline::Pipeline`] driving them.

pub mod aggregate;
pub mod allele;
pub mod coords;
pub mod extract;
pub mod modbase;
pub mod pipeline;

pub use aggregate::AggregationEngine;
pub use coords::{
    CigarOp,
    CoordinateMapper,
    OpKind,
};
pub use extract::SiteExtractor;
pub use pipeline::{
    Pipeline,
    PipelineInputs,
    SampleInput,
    VariantSet,
};
