use std::path::{
    Path,
    PathBuf,
};

use anyhow::Context as _;
use log::{
    info,
    warn,
};
use rust_htslib::bam;
use rust_htslib::bam::Read;

use crate::tools::modbase::{
    ML_TAGS,
    MM_TAGS,
};

pub const TAG_SAMPLE_SIZE: usize = 100;

/// Tag presence among the first records of an alignment file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagReport {
    pub path:    PathBuf,
    pub sampled: usize,
    pub with_mm: usize,
    pub with_ml: usize,
    pub with_hp: usize,
    pub with_ps: usize,
}

impl TagReport {
    fn observe(
        &mut self,
        record: &bam::Record,
    ) {
        let has_any = |tags: &[&[u8]]| tags.iter().any(|tag| record.aux(tag).is_ok());
        self.sampled += 1;
        self.with_mm += has_any(&MM_TAGS) as usize;
        self.with_ml += has_any(&ML_TAGS) as usize;
        self.with_hp += has_any(&[b"HP".as_slice()]) as usize;
        self.with_ps += has_any(&[b"PS".as_slice()]) as usize;
    }

    pub fn has_modifications(&self) -> bool {
        self.with_mm > 0 && self.with_ml > 0
    }

    pub fn has_phasing(&self) -> bool {
        self.with_hp > 0 && self.with_ps > 0
    }
}

/// Samples up to `sample_size` records and counts modification and
/// phasing tags.
pub fn validate_tags(
    path: &Path,
    sample_size: usize,
) -> anyhow::Result<TagReport> {
    let mut reader = bam::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut report = TagReport {
        path: path.to_path_buf(),
        ..Default::default()
    };

    let mut record = bam::Record::new();
    while report.sampled < sample_size {
        match reader.read(&mut record) {
            Some(Ok(())) => report.observe(&record),
            Some(Err(e)) => {
                return Err(e).with_context(|| {
                    format!("Failed to read records from {}", path.display())
                })
            },
            None => break,
        }
    }

    if !report.has_modifications() {
        warn!(
            "{}: no MM/ML tags in {} sampled reads",
            path.display(),
            report.sampled
        );
    }
    if !report.has_phasing() {
        warn!(
            "{}: no HP/PS tags in {} sampled reads, reads will be unphased",
            path.display(),
            report.sampled
        );
    }
    info!(
        "{}: {}/{} reads with MM, {}/{} with HP",
        path.display(),
        report.with_mm,
        report.sampled,
        report.with_hp,
        report.sampled
    );
    Ok(report)
}
