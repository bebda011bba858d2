use std::io::Read;
use std::path::Path;

use anyhow::Context as _;
use bio::io::bed;
use hashbrown::HashMap;
use log::{
    debug,
    warn,
};
use rust_lapper::{
    Interval,
    Lapper,
};

use crate::data_structs::typedef::PosType;

/// Target regions restricting which variants are analysed.
#[derive(Debug, Clone)]
pub struct BedFilter {
    contigs: HashMap<String, Lapper<PosType, ()>>,
}

impl BedFilter {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let reader = bed::Reader::from_file(path)
            .with_context(|| format!("Failed to open BED file {}", path.display()))?;
        Self::from_bed_reader(reader)
    }

    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        Self::from_bed_reader(bed::Reader::new(reader))
    }

    fn from_bed_reader<R: Read>(mut reader: bed::Reader<R>) -> anyhow::Result<Self> {
        let mut intervals: HashMap<String, Vec<Interval<PosType, ()>>> =
            HashMap::new();
        let mut skipped = 0usize;
        for record in reader.records() {
            let record = record.context("Malformed BED record")?;
            if record.end() <= record.start() {
                skipped += 1;
                continue;
            }
            intervals
                .entry(record.chrom().to_string())
                .or_default()
                .push(Interval {
                    start: record.start(),
                    stop:  record.end(),
                    val:   (),
                });
        }
        if skipped > 0 {
            warn!("Skipped {} empty or inverted BED intervals", skipped);
        }
        debug!("Loaded BED intervals for {} contigs", intervals.len());

        Ok(Self {
            contigs: intervals
                .into_iter()
                .map(|(chrom, ivs)| (chrom, Lapper::new(ivs)))
                .collect(),
        })
    }

    /// Whether the 0-based position lies in any interval of `chrom`.
    pub fn contains(
        &self,
        chrom: &str,
        pos0: PosType,
    ) -> bool {
        self.contigs
            .get(chrom)
            .is_some_and(|lapper| lapper.find(pos0, pos0 + 1).next().is_some())
    }

    pub fn n_contigs(&self) -> usize {
        self.contigs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_open_intervals() {
        let bed = "chr1\t100\t200\nchr2\t0\t10\nchr2\t50\t50\n";
        let filter = BedFilter::from_reader(bed.as_bytes()).unwrap();
        assert_eq!(filter.n_contigs(), 2);
        assert!(filter.contains("chr1", 100));
        assert!(filter.contains("chr1", 199));
        assert!(!filter.contains("chr1", 200));
        assert!(!filter.contains("chr1", 99));
        assert!(filter.contains("chr2", 0));
        assert!(!filter.contains("chr2", 50));
        assert!(!filter.contains("chr3", 5));
    }
}
