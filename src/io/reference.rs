use std::fs::File;
use std::io::{
    BufReader,
    Read,
};
use std::path::{
    Path,
    PathBuf,
};

use anyhow::Context as _;
use hashbrown::HashSet;
use itertools::Itertools;
use log::{
    info,
    warn,
};

use crate::data_structs::VariantDescriptor;

/// Contig names of the reference genome.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    contigs: Vec<String>,
}

pub fn read_chrs_from_fai<R: Read>(reader: R) -> anyhow::Result<Vec<String>> {
    let records: Vec<noodles_fasta::fai::Record> =
        noodles_fasta::fai::io::Reader::new(BufReader::new(reader))
            .read_index()?
            .into();
    Ok(records
        .into_iter()
        .map(|r| String::from_utf8_lossy(r.name()).to_string())
        .collect())
}

impl ReferenceIndex {
    /// Reads `<fasta>.fai`, indexing the FASTA when the index is missing.
    pub fn from_fasta(path: &Path) -> anyhow::Result<Self> {
        let mut fai_path = PathBuf::from(path);
        fai_path.as_mut_os_string().push(".fai");

        let contigs = if fai_path.exists() {
            let handle = File::open(&fai_path)
                .with_context(|| format!("Failed to open {}", fai_path.display()))?;
            read_chrs_from_fai(handle)?
        }
        else {
            info!("No index next to {}, indexing it", path.display());
            let index = noodles_fasta::fs::index(path)
                .with_context(|| format!("Failed to index {}", path.display()))?;
            let records: Vec<noodles_fasta::fai::Record> = index.into();
            records
                .into_iter()
                .map(|r| String::from_utf8_lossy(r.name()).to_string())
                .collect()
        };
        Ok(Self { contigs })
    }

    pub fn from_contigs(contigs: Vec<String>) -> Self {
        Self { contigs }
    }

    pub fn contigs(&self) -> &[String] {
        &self.contigs
    }

    /// Variant contigs missing from the reference, with a warning for each.
    pub fn check_variants(
        &self,
        variants: &[VariantDescriptor],
    ) -> Vec<String> {
        let known = self.contigs.iter().map(String::as_str).collect::<HashSet<_>>();
        let missing = variants
            .iter()
            .map(|v| v.chrom().as_str())
            .filter(|chrom| !known.contains(chrom))
            .unique()
            .map(str::to_string)
            .collect::<Vec<_>>();
        for chrom in missing.iter() {
            warn!("Variants on contig {} which is absent from the reference", chrom);
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fai_contigs() {
        let fai = "chr1\t1000\t6\t60\t61\nchr2\t500\t1029\t60\t61\n";
        let contigs = read_chrs_from_fai(fai.as_bytes()).unwrap();
        assert_eq!(contigs, vec!["chr1".to_string(), "chr2".to_string()]);
    }

    #[test]
    fn missing_contigs_reported_once() {
        let index = ReferenceIndex::from_contigs(vec!["chr1".into()]);
        let variants = vec![
            VariantDescriptor::biallelic("chr1", 10, "A", "C", "v"),
            VariantDescriptor::biallelic("chrX", 10, "A", "C", "v"),
            VariantDescriptor::biallelic("chrX", 20, "A", "C", "v"),
        ];
        assert_eq!(index.check_variants(&variants), vec!["chrX".to_string()]);
    }
}
