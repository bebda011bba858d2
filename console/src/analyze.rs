use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use clap::Args;
use console::style;
use indicatif::ProgressBar;
use methylsomatic::config::{
    AnalysisConfig,
    MethylationThresholds,
    RunMode,
};
use methylsomatic::data_structs::typedef::{
    DensityType,
    PosType,
};
use methylsomatic::io::{
    Compression,
    ReportWriter,
};
use methylsomatic::tools::pipeline::{
    Pipeline,
    PipelineInputs,
};

use crate::utils::{
    expand_wildcards,
    init_pbar,
    UtilsArgs,
};

#[derive(Args, Debug, Clone)]
pub(crate) struct AnalyzeArgs {
    #[arg(
        value_parser,
        short = 'v',
        long = "vcf",
        num_args=1..,
        required = true,
        help = "Somatic variant files (VCF/BCF). Wildcards are expanded."
    )]
    vcfs:   Vec<String>,
    #[arg(
        short = 't',
        long,
        help = "Indexed tumor alignment file with MM/ML tags."
    )]
    tumor:  Option<PathBuf>,
    #[arg(
        short = 'n',
        long,
        help = "Indexed normal alignment file with MM/ML tags."
    )]
    normal: Option<PathBuf>,
    #[arg(
        short = 'o',
        long,
        required = true,
        help = "Output directory. One subdirectory is created per run."
    )]
    output: PathBuf,

    #[arg(
        short = 'b',
        long,
        help_heading = "FILTER ARGS",
        help = "BED file with target regions. Variants outside are skipped."
    )]
    bed:              Option<PathBuf>,
    #[arg(
        short = 'r',
        long,
        help_heading = "FILTER ARGS",
        help = "Reference FASTA. Variant contigs absent from it are reported."
    )]
    reference:        Option<PathBuf>,
    #[arg(
        short = 'w',
        long,
        default_value_t = 2000,
        help_heading = "FILTER ARGS",
        help = "Maximum distance (bp) between a methylation call and its variant."
    )]
    window_size:      PosType,
    #[arg(
        long,
        default_value_t = 0,
        help_heading = "FILTER ARGS",
        help = "Minimum AD of an ALT allele. 0 disables the check."
    )]
    min_allele:       u32,
    #[arg(
        long,
        default_value_t = 1,
        help_heading = "FILTER ARGS",
        help = "Reads required on each strand for a variant to be summarized. 0 \
                disables the strand filter."
    )]
    min_strand_reads: usize,
    #[arg(
        long,
        default_value_t = 10_000,
        help_heading = "FILTER ARGS",
        help = "Maximum number of reads fetched per variant and sample."
    )]
    max_read_depth:   usize,
    #[arg(
        long,
        default_value_t = 10,
        help_heading = "FILTER ARGS",
        help = "Minimum mapping quality of a read."
    )]
    min_mapq:         u8,

    #[arg(
        long,
        default_value_t = 0.8,
        help_heading = "METHYLATION ARGS",
        help = "Probability at or above which a call is 'high'."
    )]
    meth_high: DensityType,
    #[arg(
        long,
        default_value_t = 0.2,
        help_heading = "METHYLATION ARGS",
        help = "Probability at or below which a call is 'low'."
    )]
    meth_low:  DensityType,

    #[arg(
        short = 'm',
        long,
        default_value_t = RunMode::PerFile,
        help_heading = "RUN ARGS",
        help = "per-file: one analysis per variant file. combined: all files \
                together, comparing sources when there are two."
    )]
    mode:          RunMode,
    #[arg(
        long,
        default_value_t = Compression::Gz,
        help_heading = "RUN ARGS",
        help = "Compression of level 1 and 2 tables (none, gzip, zstd)."
    )]
    compression:   Compression,
    #[arg(
        long,
        default_value_t = 6,
        help_heading = "RUN ARGS",
        help = "Compression level."
    )]
    compression_level: u32,
    #[arg(
        long,
        default_value_t = 100,
        help_heading = "RUN ARGS",
        help = "Alignment records preallocated per thread."
    )]
    pool_prealloc: usize,
    #[arg(
        long,
        help_heading = "RUN ARGS",
        help = "Upper bound on live alignment records. Workers wait when reached."
    )]
    pool_cap:      Option<usize>,
}

impl AnalyzeArgs {
    fn config(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<AnalysisConfig> {
        let thresholds = MethylationThresholds::try_new(self.meth_high, self.meth_low)?;
        Ok(AnalysisConfig::default()
            .with_window_size(self.window_size)
            .with_thresholds(thresholds)
            .with_min_strand_reads(self.min_strand_reads)
            .with_min_alt_support(self.min_allele)
            .with_max_read_depth(self.max_read_depth)
            .with_min_mapq(self.min_mapq)
            .with_mode(self.mode)
            .with_pool_prealloc(self.pool_prealloc)
            .with_pool_hard_cap(self.pool_cap)
            .with_threads(utils.threads))
    }

    pub fn run(
        &self,
        utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let vcfs = expand_wildcards(&self.vcfs);
        if vcfs.is_empty() {
            bail!("No variant files matched {:?}", self.vcfs)
        }
        if self.tumor.is_none() && self.normal.is_none() {
            bail!("At least one of --tumor or --normal is required")
        }
        for path in vcfs
            .iter()
            .chain(self.tumor.iter())
            .chain(self.normal.iter())
            .chain(self.bed.iter())
            .chain(self.reference.iter())
        {
            if !path.is_file() {
                eprintln!("Path {} is not a file.", style(path.display()).red());
                bail!("Missing input {}", path.display())
            }
        }
        if self.output.is_file() {
            bail!("Output path {} is a file", self.output.display())
        }

        let inputs = PipelineInputs {
            vcfs,
            tumor: self.tumor.clone(),
            normal: self.normal.clone(),
            bed: self.bed.clone(),
            reference: self.reference.clone(),
        };
        let pipeline = Pipeline::new(self.config(utils)?, inputs)?;
        let sets = pipeline.load_variant_sets()?;

        let progress_bar = if utils.progress {
            init_pbar(sets.iter().map(|s| s.variants.len()).sum::<usize>())?
        }
        else {
            ProgressBar::hidden()
        };
        let pipeline = {
            let progress_bar = progress_bar.clone();
            pipeline.with_progress(Arc::new(move || progress_bar.inc(1)))
        };

        let results = pipeline.analyze_sets(&sets)?;
        progress_bar.finish_and_clear();

        let writer = ReportWriter::new(&self.output, self.compression)
            .with_compression_level(self.compression_level);
        for result in results.iter() {
            let dir = writer.write(result)?;
            println!(
                "[{}] {}: {} sites, {} variant summaries -> {}",
                style("V").green(),
                style(result.label()).bold(),
                result.raw_sites().len(),
                result.variant_summaries().len(),
                dir.display()
            );
        }
        Ok(())
    }
}
