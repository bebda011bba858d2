//! Orchestration of loading, extraction and aggregation.
//!
//! Variants are processed in parallel on a dedicated rayon pool. Every
//! rayon job opens its own [`BamFetcher`]s and its own [`WorkerPool`] view
//! of the shared record pool in `map_init`, so no alignment handle is
//! shared between threads.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{
    anyhow,
    bail,
    Context as _,
};
use arcstr::ArcStr;
use itertools::Itertools;
use log::{
    debug,
    info,
    warn,
};
use rayon::prelude::*;
use rayon::{
    ThreadPool,
    ThreadPoolBuilder,
};
use rust_htslib::bam;

use crate::config::{
    AnalysisConfig,
    RunMode,
};
use crate::data_structs::typedef::SmallId;
use crate::data_structs::{
    AnalysisResults,
    MethylationSite,
    VariantDescriptor,
};
use crate::io::bam::{
    validate_tags,
    BamFetcher,
    TAG_SAMPLE_SIZE,
};
use crate::io::{
    source_id_from_path,
    BedFilter,
    ReferenceIndex,
    VariantLoader,
};
use crate::tools::aggregate::AggregationEngine;
use crate::tools::extract::SiteExtractor;
use crate::utils::{
    RecordPool,
    WorkerPool,
};

pub const TUMOR_LABEL: &str = "tumor";
pub const NORMAL_LABEL: &str = "normal";
pub const COMBINED_LABEL: &str = "combined";

/// An alignment file and the sample label its sites are reported under.
#[derive(Debug, Clone)]
pub struct SampleInput {
    pub label: SmallId,
    pub path:  PathBuf,
}

impl SampleInput {
    pub fn new(
        label: impl Into<SmallId>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            path:  path.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineInputs {
    pub vcfs:      Vec<PathBuf>,
    pub tumor:     Option<PathBuf>,
    pub normal:    Option<PathBuf>,
    pub bed:       Option<PathBuf>,
    pub reference: Option<PathBuf>,
}

impl PipelineInputs {
    pub fn samples(&self) -> Vec<SampleInput> {
        [(TUMOR_LABEL, &self.tumor), (NORMAL_LABEL, &self.normal)]
            .into_iter()
            .filter_map(|(label, path)| {
                path.as_ref()
                    .map(|p| SampleInput::new(ArcStr::from(label), p.clone()))
            })
            .collect()
    }

    fn describe(&self) -> Vec<(String, String)> {
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        };
        vec![
            (
                "vcf_files".into(),
                self.vcfs.iter().map(|p| p.display()).join(","),
            ),
            ("tumor_bam".into(), show(&self.tumor)),
            ("normal_bam".into(), show(&self.normal)),
            ("ref_file".into(), show(&self.reference)),
            ("bed_file".into(), show(&self.bed)),
        ]
    }
}

/// Variants aggregated together under one label.
#[derive(Debug, Clone)]
pub struct VariantSet {
    pub label:    SmallId,
    /// Variant sources in input order.
    pub sources:  Vec<SmallId>,
    pub variants: Vec<VariantDescriptor>,
}

pub type ProgressFn = Arc<dyn Fn() + Send + Sync>;

pub struct Pipeline {
    config:      AnalysisConfig,
    inputs:      PipelineInputs,
    samples:     Vec<SampleInput>,
    thread_pool: ThreadPool,
    records:     RecordPool<bam::Record>,
    progress:    Option<ProgressFn>,
}

struct WorkerState<'a> {
    fetchers: anyhow::Result<Vec<BamFetcher>>,
    records:  WorkerPool<'a, bam::Record>,
}

impl Pipeline {
    /// Validates the configuration and the alignment inputs. Samples
    /// without modification tags are dropped with a warning.
    pub fn new(
        config: AnalysisConfig,
        inputs: PipelineInputs,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        if inputs.vcfs.is_empty() {
            bail!("At least one variant file is required")
        }

        let mut samples = Vec::new();
        for sample in inputs.samples() {
            let report = validate_tags(&sample.path, TAG_SAMPLE_SIZE)?;
            if report.has_modifications() {
                samples.push(sample);
            }
            else {
                warn!(
                    "Skipping {} sample {}: no base modification tags",
                    sample.label,
                    sample.path.display()
                );
            }
        }
        if samples.is_empty() {
            bail!("No alignment file with base modification tags was provided")
        }

        let thread_pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build()
            .context("Failed to create thread pool")?;
        let records = RecordPool::new(
            config.pool_prealloc * config.threads,
            config.pool_hard_cap,
        );

        Ok(Self {
            config,
            inputs,
            samples,
            thread_pool,
            records,
            progress: None,
        })
    }

    /// Callback invoked once per processed variant.
    pub fn with_progress(
        mut self,
        progress: ProgressFn,
    ) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn samples(&self) -> &[SampleInput] {
        &self.samples
    }

    /// Loads variants and groups them according to the run mode.
    pub fn load_variant_sets(&self) -> anyhow::Result<Vec<VariantSet>> {
        let bed = self
            .inputs
            .bed
            .as_deref()
            .map(BedFilter::from_path)
            .transpose()?;
        let loader = VariantLoader::new(bed.as_ref(), self.config.min_alt_support);
        let reference = self
            .inputs
            .reference
            .as_deref()
            .map(ReferenceIndex::from_fasta)
            .transpose()?;

        let sources = self
            .inputs
            .vcfs
            .iter()
            .map(|p| ArcStr::from(source_id_from_path(p)))
            .collect::<Vec<_>>();

        let sets = match self.config.mode {
            RunMode::PerFile => {
                self.inputs
                    .vcfs
                    .iter()
                    .zip(sources.iter())
                    .map(|(path, source)| {
                        Ok(VariantSet {
                            label:    source.clone(),
                            sources:  vec![source.clone()],
                            variants: loader.load(path)?,
                        })
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?
            },
            RunMode::Combined => {
                vec![VariantSet {
                    label: ArcStr::from(COMBINED_LABEL),
                    sources,
                    variants: loader.load_all(&self.inputs.vcfs)?,
                }]
            },
        };

        if let Some(reference) = reference {
            for set in sets.iter() {
                reference.check_variants(&set.variants);
            }
        }
        Ok(sets)
    }

    /// Sites of every sample for every variant, extracted in parallel.
    pub fn extract_sites(
        &self,
        variants: &[VariantDescriptor],
    ) -> anyhow::Result<Vec<MethylationSite>> {
        let extractor = SiteExtractor::new(&self.config);
        let window = self.config.window_size;

        let per_variant = self.thread_pool.install(|| {
            variants
                .par_iter()
                .map_init(
                    || {
                        WorkerState {
                            fetchers: self
                                .samples
                                .iter()
                                .map(|s| BamFetcher::open(&s.path, s.label.clone(), &self.config))
                                .collect(),
                            records:  self.records.worker(),
                        }
                    },
                    |state, variant| {
                        let WorkerState { fetchers, records } = state;
                        let fetchers = fetchers
                            .as_mut()
                            .map_err(|e| anyhow!("Alignment reader init failed: {:#}", e))?;

                        let mut sites = Vec::new();
                        for fetcher in fetchers.iter_mut() {
                            let reads = fetcher.fetch_variant(variant, window, records)?;
                            for read in reads.iter() {
                                sites.extend(extractor.extract(read, variant, fetcher.label()));
                            }
                            records.release_all(reads);
                        }
                        if let Some(progress) = self.progress.as_ref() {
                            progress();
                        }
                        Ok(sites)
                    },
                )
                .collect::<anyhow::Result<Vec<Vec<MethylationSite>>>>()
        })?;

        Ok(per_variant.into_iter().flatten().collect())
    }

    pub fn analyze_set(
        &self,
        set: &VariantSet,
    ) -> anyhow::Result<AnalysisResults> {
        info!(
            "[{}] Extracting methylation around {} variants from {} sample(s)",
            set.label,
            set.variants.len(),
            self.samples.len()
        );
        let sites = self.extract_sites(&set.variants)?;
        let engine = AggregationEngine::new(&self.config)
            .with_source_order(set.sources.clone())
            .with_parameters(self.inputs.describe());
        Ok(engine.run(set.label.clone(), sites))
    }

    /// Analyses the given sets, in parallel when there are several.
    pub fn analyze_sets(
        &self,
        sets: &[VariantSet],
    ) -> anyhow::Result<Vec<AnalysisResults>> {
        let results = self.thread_pool.install(|| {
            sets.par_iter()
                .map(|set| self.analyze_set(set))
                .collect::<anyhow::Result<Vec<_>>>()
        })?;
        let stats = self.records.stats();
        debug!(
            "Record pool: {} allocated ({} past cap), {} idle, {} reused",
            stats.allocated, stats.overflow, stats.idle, stats.reused
        );
        Ok(results)
    }

    pub fn run(&self) -> anyhow::Result<Vec<AnalysisResults>> {
        let sets = self.load_variant_sets()?;
        self.analyze_sets(&sets)
    }
}
