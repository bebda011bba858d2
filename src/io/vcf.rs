use std::path::{
    Path,
    PathBuf,
};

use anyhow::Context as _;
use arcstr::ArcStr;
use log::{
    info,
    warn,
};
use rust_htslib::bcf;
use rust_htslib::bcf::Read;

use crate::data_structs::typedef::PosType;
use crate::data_structs::{
    VariantClass,
    VariantDescriptor,
};
use crate::io::bed::BedFilter;

const VCF_SUFFIXES: [&str; 5] = [".vcf.gz", ".vcf.bgz", ".bcf", ".vcf", ".gz"];

/// Source identifier of a variant file: its basename without the VCF/BCF
/// suffix.
pub fn source_id_from_path(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    VCF_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix))
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .unwrap_or(name)
}

#[derive(Debug, Default, Clone, Copy)]
struct LoadCounts {
    records:      usize,
    not_pass:     usize,
    outside_bed:  usize,
    low_support:  usize,
    missing_ad:   usize,
    descriptors:  usize,
}

/// Loads PASS variants, one descriptor per ALT allele.
#[derive(Debug, Clone, Default)]
pub struct VariantLoader<'a> {
    bed:             Option<&'a BedFilter>,
    min_alt_support: u32,
}

impl<'a> VariantLoader<'a> {
    pub fn new(
        bed: Option<&'a BedFilter>,
        min_alt_support: u32,
    ) -> Self {
        Self {
            bed,
            min_alt_support,
        }
    }

    /// Variants of every file, sorted by (chromosome, position, class).
    pub fn load_all(
        &self,
        paths: &[PathBuf],
    ) -> anyhow::Result<Vec<VariantDescriptor>> {
        let mut variants = Vec::new();
        for path in paths.iter() {
            variants.extend(self.load(path)?);
        }
        sort_variants(&mut variants);
        Ok(variants)
    }

    pub fn load(
        &self,
        path: &Path,
    ) -> anyhow::Result<Vec<VariantDescriptor>> {
        let source = ArcStr::from(source_id_from_path(path));
        let mut reader = bcf::Reader::from_path(path)
            .with_context(|| format!("Failed to open variant file {}", path.display()))?;
        let header = reader.header().clone();

        let mut counts = LoadCounts::default();
        let mut variants = Vec::new();

        for record in reader.records() {
            let record = record
                .with_context(|| format!("Malformed record in {}", path.display()))?;
            counts.records += 1;

            let filters = record.filters().collect::<Vec<_>>();
            let is_pass = filters.is_empty()
                || filters
                    .iter()
                    .any(|id| header.id_to_name(*id).as_slice() == b"PASS");
            if !is_pass {
                counts.not_pass += 1;
                continue;
            }

            let Some(rid) = record.rid() else {
                continue;
            };
            let chrom = String::from_utf8_lossy(header.rid2name(rid)?).to_string();
            let pos0 = record.pos().max(0) as PosType;
            if let Some(bed) = self.bed {
                if !bed.contains(&chrom, pos0) {
                    counts.outside_bed += 1;
                    continue;
                }
            }

            let alleles = record
                .alleles()
                .iter()
                .map(|a| String::from_utf8_lossy(a).to_string())
                .collect::<Vec<_>>();
            if alleles.len() < 2 {
                continue;
            }

            let depths = if self.min_alt_support > 0 {
                let depths = allele_depths(&record);
                if depths.is_none() {
                    counts.missing_ad += 1;
                }
                depths
            }
            else {
                None
            };

            let quality = Some(record.qual()).filter(|q| q.is_finite() && *q > 0.0);
            let chrom = ArcStr::from(chrom);
            for (alt_idx, alt) in alleles.iter().enumerate().skip(1) {
                if let Some(ad) = depths.as_ref().and_then(|d| d.get(alt_idx)) {
                    if *ad >= 0 && (*ad as u32) < self.min_alt_support {
                        counts.low_support += 1;
                        continue;
                    }
                }
                let class = VariantClass::classify(&alleles[0], alt, alleles.len());
                variants.push(VariantDescriptor::new(
                    chrom.clone(),
                    pos0 + 1,
                    alleles[0].clone(),
                    alt.clone(),
                    class,
                    source.clone(),
                    quality,
                ));
                counts.descriptors += 1;
            }
        }

        if counts.missing_ad > 0 {
            warn!(
                "[{}] {} records lack AD, kept without the alt-support check",
                source, counts.missing_ad
            );
        }
        info!(
            "[{}] {} records: {} not PASS, {} outside targets, {} ALT alleles below \
             support, {} variants kept",
            source,
            counts.records,
            counts.not_pass,
            counts.outside_bed,
            counts.low_support,
            counts.descriptors
        );

        sort_variants(&mut variants);
        Ok(variants)
    }
}

/// AD values of the first sample, `None` when the field is absent.
fn allele_depths(record: &bcf::Record) -> Option<Vec<i32>> {
    let values = record.format(b"AD").integer().ok()?;
    values.first().map(|sample| sample.to_vec())
}

pub fn sort_variants(variants: &mut [VariantDescriptor]) {
    variants.sort_by(|a, b| {
        (a.chrom(), a.pos(), a.class()).cmp(&(b.chrom(), b.pos(), b.class()))
    });
}
