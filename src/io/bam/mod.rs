mod validate;

use std::path::{
    Path,
    PathBuf,
};

use anyhow::Context as _;
use log::{
    debug,
    warn,
};
use rust_htslib::bam;
use rust_htslib::bam::Read;
pub use validate::{
    validate_tags,
    TagReport,
    TAG_SAMPLE_SIZE,
};

use crate::config::AnalysisConfig;
use crate::data_structs::typedef::{
    PosType,
    SmallId,
};
use crate::data_structs::VariantDescriptor;
use crate::utils::WorkerPool;

/// Indexed alignment reader owned by a single worker.
pub struct BamFetcher {
    reader:         bam::IndexedReader,
    path:           PathBuf,
    label:          SmallId,
    max_read_depth: usize,
    min_mapq:       u8,
}

impl BamFetcher {
    pub fn open(
        path: &Path,
        label: impl Into<SmallId>,
        config: &AnalysisConfig,
    ) -> anyhow::Result<Self> {
        let reader = bam::IndexedReader::from_path(path).with_context(|| {
            format!("Failed to open indexed alignment file {}", path.display())
        })?;
        Ok(Self {
            reader,
            path: path.to_path_buf(),
            label: label.into(),
            max_read_depth: config.max_read_depth,
            min_mapq: config.min_mapq,
        })
    }

    pub fn label(&self) -> &SmallId {
        &self.label
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn keep(
        &self,
        record: &bam::Record,
    ) -> bool {
        !(record.is_unmapped()
            || record.is_secondary()
            || record.is_supplementary())
            && record.mapq() >= self.min_mapq
    }

    /// Primary, mapped records with sufficient MAPQ overlapping the
    /// 0-based half-open region, truncated at the configured depth.
    pub fn fetch_region(
        &mut self,
        chrom: &str,
        start: PosType,
        end: PosType,
        pool: &mut WorkerPool<'_, bam::Record>,
    ) -> anyhow::Result<Vec<bam::Record>> {
        let Some(tid) = self.reader.header().tid(chrom.as_bytes())
        else {
            warn!(
                "[{}] Contig {} is absent from {}",
                self.label,
                chrom,
                self.path.display()
            );
            return Ok(Vec::new());
        };
        self.reader
            .fetch((tid, start as i64, end as i64))
            .with_context(|| {
                format!("Failed to query {}:{}-{} in {}", chrom, start, end, self.path.display())
            })?;

        let mut records = Vec::new();
        loop {
            let mut record = pool.acquire();
            match self.reader.read(&mut record) {
                Some(Ok(())) => {
                    if !self.keep(&record) {
                        pool.release(record);
                        continue;
                    }
                    records.push(record);
                    if records.len() >= self.max_read_depth {
                        warn!(
                            "[{}] Region {}:{}-{} truncated at {} reads",
                            self.label, chrom, start, end, self.max_read_depth
                        );
                        break;
                    }
                },
                Some(Err(e)) => {
                    pool.release(record);
                    pool.release_all(records);
                    return Err(e).with_context(|| {
                        format!("Failed to read {}:{}-{} from {}", chrom, start, end, self.path.display())
                    });
                },
                None => {
                    pool.release(record);
                    break;
                },
            }
        }
        debug!(
            "[{}] {} reads in {}:{}-{}",
            self.label,
            records.len(),
            chrom,
            start,
            end
        );
        Ok(records)
    }

    /// Reads within `window` bp of the variant.
    pub fn fetch_variant(
        &mut self,
        variant: &VariantDescriptor,
        window: PosType,
        pool: &mut WorkerPool<'_, bam::Record>,
    ) -> anyhow::Result<Vec<bam::Record>> {
        let (start, end) = variant_region(variant, window);
        self.fetch_region(variant.chrom(), start, end, pool)
    }
}

/// 0-based half-open query region covering `window` bp on both sides.
pub fn variant_region(
    variant: &VariantDescriptor,
    window: PosType,
) -> (PosType, PosType) {
    let pos0 = variant.pos0();
    (pos0.saturating_sub(window), pos0 + window + 1)
}
