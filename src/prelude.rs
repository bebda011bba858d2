pub use crate::config::{
    AnalysisConfig,
    MethylationThresholds,
    RunMode,
};
pub use crate::data_structs::typedef::{
    CountType,
    DensityType,
    PosType,
    SmallId,
};
pub use crate::data_structs::{
    AlleleSupport,
    AnalysisResults,
    GlobalMetrics,
    HaplotypeGroupStats,
    MethState,
    MethylationSite,
    Strand,
    VariantClass,
    VariantDescriptor,
    VariantMethylationSummary,
    VariantTypeGroup,
};
pub use crate::io::bam::BamFetcher;
pub use crate::io::compression::Compression;
pub use crate::io::report::ReportWriter;
pub use crate::io::{
    BedFilter,
    ReferenceIndex,
    VariantLoader,
};
pub use crate::tools::aggregate::AggregationEngine;
pub use crate::tools::coords::CoordinateMapper;
pub use crate::tools::extract::SiteExtractor;
pub use crate::tools::pipeline::{
    Pipeline,
    PipelineInputs,
    VariantSet,
};
