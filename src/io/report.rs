//! Tab-separated reports of one analysis run.
//!
//! A run writes into `<outdir>/<label>/`:
//!
//! | File | Content |
//! |---|---|
//! | `global_summary_metrics.tsv` | run parameters and summary counts |
//! | `level1_raw_methylation_details.tsv[.gz/.zst]` | every extracted site |
//! | `level2_somatic_variant_methylation_summary.tsv[.gz/.zst]` | per variant/allele/haplotype |
//! | `level3_haplotype_group_statistics.tsv` | per haplotype/sample/type group |

use std::fs::{
    self,
    File,
};
use std::io::{
    BufWriter,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};

use anyhow::{
    anyhow,
    Context as _,
};
use log::info;

use crate::data_structs::{
    AnalysisResults,
    HaplotypeGroupStats,
    MethylationSite,
    VariantMethylationSummary,
};
use crate::io::compression::{
    Compression,
    Encoder,
};

pub const GLOBAL_METRICS_FILE: &str = "global_summary_metrics.tsv";
pub const LEVEL1_FILE: &str = "level1_raw_methylation_details.tsv";
pub const LEVEL2_FILE: &str = "level2_somatic_variant_methylation_summary.tsv";
pub const LEVEL3_FILE: &str = "level3_haplotype_group_statistics.tsv";

const LEVEL1_HEADER: [&str; 13] = [
    "chrom",
    "methyl_pos",
    "somatic_pos",
    "variant_type",
    "vcf_source_id",
    "bam_source_id",
    "somatic_allele_type",
    "somatic_base_at_variant",
    "haplotype_tag",
    "meth_call",
    "meth_state",
    "strand",
    "read_id",
];

const LEVEL2_HEADER: [&str; 11] = [
    "chrom",
    "somatic_pos",
    "variant_type",
    "vcf_source_id",
    "bam_source_id",
    "somatic_allele_type",
    "haplotype_tag",
    "supporting_read_count",
    "methyl_sites_count",
    "mean_methylation",
    "strand",
];

fn tsv_writer<W: Write>(sink: W) -> csv::Writer<W> {
    csv::WriterBuilder::default()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(sink)
}

fn level1_row(site: &MethylationSite) -> [String; 13] {
    [
        site.chrom.to_string(),
        site.methyl_pos.to_string(),
        site.somatic_pos.to_string(),
        site.variant_class.to_string(),
        site.vcf_source.to_string(),
        site.bam_source.to_string(),
        site.allele_support.to_string(),
        site.base_at_variant.to_string(),
        site.haplotype.to_string(),
        format!("{:.4}", site.probability),
        site.state.to_string(),
        site.strand.to_string(),
        site.read_id.to_string(),
    ]
}

fn level2_row(summary: &VariantMethylationSummary) -> [String; 11] {
    [
        summary.chrom.to_string(),
        summary.somatic_pos.to_string(),
        summary.variant_class.to_string(),
        summary.vcf_source.to_string(),
        summary.bam_source.to_string(),
        summary.allele_support.to_string(),
        summary.haplotype.to_string(),
        summary.supporting_reads.to_string(),
        summary.site_count.to_string(),
        format!("{:.4}", summary.mean_methylation),
        summary.dominant_strand.to_string(),
    ]
}

fn level3_header(results: &AnalysisResults) -> Vec<String> {
    let mut header = vec![
        "haplotype_group".to_string(),
        "bam_source".to_string(),
        "variant_type_group".to_string(),
    ];
    header.extend(
        results
            .sources()
            .iter()
            .map(|s| format!("{}_mean_methylation", s)),
    );
    if results.has_comparison() {
        header.push("difference".to_string());
        header.push("p_value".to_string());
    }
    header
}

fn level3_row(
    stats: &HaplotypeGroupStats,
    results: &AnalysisResults,
) -> Vec<String> {
    let mut row = vec![
        stats.haplotype().to_string(),
        stats.bam_source().to_string(),
        stats.type_group().to_string(),
    ];
    row.extend(
        results
            .sources()
            .iter()
            .map(|source| format!("{:.4}", stats.mean_or_sentinel(source))),
    );
    if let Some(comparison) = stats.comparison() {
        row.push(format!("{:.4}", comparison.difference));
        row.push(format!("{:.6}", comparison.p_value));
    }
    row
}

/// Flushes the csv buffer and finalizes the compressed stream.
fn close_encoded(
    writer: csv::Writer<Encoder<BufWriter<File>>>,
    name: &str,
) -> anyhow::Result<()> {
    let encoder = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush {}: {}", name, e.error()))?;
    encoder
        .finish()
        .with_context(|| format!("Failed to finalize {}", name))?;
    Ok(())
}

/// Writes the four report files of an [`AnalysisResults`] bundle.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    outdir:            PathBuf,
    compression:       Compression,
    compression_level: u32,
}

impl ReportWriter {
    pub fn new(
        outdir: impl Into<PathBuf>,
        compression: Compression,
    ) -> Self {
        Self {
            outdir: outdir.into(),
            compression,
            compression_level: 6,
        }
    }

    pub fn with_compression_level(
        mut self,
        level: u32,
    ) -> Self {
        self.compression_level = level;
        self
    }

    pub fn run_dir(
        &self,
        results: &AnalysisResults,
    ) -> PathBuf {
        self.outdir.join(results.label().as_str())
    }

    /// Writes every report and returns the run directory.
    pub fn write(
        &self,
        results: &AnalysisResults,
    ) -> anyhow::Result<PathBuf> {
        let dir = self.run_dir(results);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        self.write_metrics(&dir, results)?;
        self.write_level1(&dir, results)?;
        self.write_level2(&dir, results)?;
        self.write_level3(&dir, results)?;

        info!("[{}] Reports written to {}", results.label(), dir.display());
        Ok(dir)
    }

    fn plain_sink(path: &Path) -> anyhow::Result<BufWriter<File>> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(BufWriter::new(file))
    }

    fn compressed_sink(
        &self,
        dir: &Path,
        name: &str,
    ) -> anyhow::Result<Encoder<BufWriter<File>>> {
        let path = dir.join(format!("{}{}", name, self.compression.extension()));
        let sink = Self::plain_sink(&path)?;
        self.compression
            .get_encoder(sink, self.compression_level)
            .with_context(|| format!("Failed to create encoder for {}", path.display()))
    }

    fn write_metrics(
        &self,
        dir: &Path,
        results: &AnalysisResults,
    ) -> anyhow::Result<()> {
        let mut sink = Self::plain_sink(&dir.join(GLOBAL_METRICS_FILE))?;
        writeln!(sink, "# parameters")?;
        {
            let mut writer = tsv_writer(&mut sink);
            writer.write_record(["parameter_name", "parameter_value"])?;
            for (name, value) in results.metrics().parameters().iter() {
                writer.write_record([name, value])?;
            }
            writer.flush()?;
        }
        writeln!(sink)?;
        writeln!(sink, "# metrics")?;
        {
            let mut writer = tsv_writer(&mut sink);
            writer.write_record(["metric_name", "metric_value"])?;
            for (name, value) in results.metrics().metric_rows() {
                writer.write_record([name, value])?;
            }
            writer.flush()?;
        }
        sink.flush()?;
        Ok(())
    }

    fn write_level1(
        &self,
        dir: &Path,
        results: &AnalysisResults,
    ) -> anyhow::Result<()> {
        let mut writer = tsv_writer(self.compressed_sink(dir, LEVEL1_FILE)?);
        writer.write_record(LEVEL1_HEADER)?;
        for site in results.raw_sites().iter() {
            writer.write_record(level1_row(site))?;
        }
        close_encoded(writer, LEVEL1_FILE)
    }

    fn write_level2(
        &self,
        dir: &Path,
        results: &AnalysisResults,
    ) -> anyhow::Result<()> {
        let mut writer = tsv_writer(self.compressed_sink(dir, LEVEL2_FILE)?);
        writer.write_record(LEVEL2_HEADER)?;
        for summary in results.variant_summaries().iter() {
            writer.write_record(level2_row(summary))?;
        }
        close_encoded(writer, LEVEL2_FILE)
    }

    fn write_level3(
        &self,
        dir: &Path,
        results: &AnalysisResults,
    ) -> anyhow::Result<()> {
        let mut writer = tsv_writer(Self::plain_sink(&dir.join(LEVEL3_FILE))?);
        writer.write_record(level3_header(results))?;
        for stats in results.haplotype_stats().iter() {
            writer.write_record(level3_row(stats, results))?;
        }
        writer.flush()?;
        Ok(())
    }
}
