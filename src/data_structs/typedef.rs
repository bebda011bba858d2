use arcstr::ArcStr;

/// 1-based genomic coordinate.
pub type PosType = u64;
/// Methylation probability or mean methylation level.
pub type DensityType = f64;
/// Read and site counters.
pub type CountType = usize;
/// Shared, cheaply clonable identifier (chromosome, source, read or
/// haplotype label).
pub type SmallId = ArcStr;
