//! File-facing collaborators of the core: indexed alignment access, variant
//! and region loading, reference contig listing and report output.

pub mod bam;
pub mod bed;
pub mod compression;
pub mod reference;
pub mod report;
pub mod vcf;

pub use bam::{
    validate_tags,
    BamFetcher,
    TagReport,
};
pub use bed::BedFilter;
pub use compression::Compression;
pub use reference::ReferenceIndex;
pub use report::ReportWriter;
pub use vcf::{
    source_id_from_path,
    VariantLoader,
};
