//! # methylsomatic
//!
//! `methylsomatic` links somatic variants to the DNA methylation observed on
//! the long reads that cover them. For every variant it fetches the reads of
//! one or two phased alignment files (tumor, normal), decides whether each
//! read supports the reference or the alternate allele, and collects the
//! per-read 5mC/5hmC calls from the `MM`/`ML` base modification tags within
//! a window around the variant.
//!
//! Extracted calls are then rolled up at three levels:
//!
//! * **Level 1**: one row per read and modified cytosine
//!   ([`MethylationSite`]).
//! * **Level 2**: one row per variant, allele and haplotype
//!   ([`VariantMethylationSummary`]) after discarding variants that lack
//!   reads on both strands.
//! * **Level 3**: one row per haplotype, sample and variant type group
//!   ([`HaplotypeGroupStats`]), comparing variant sources with a Welch-style
//!   test when exactly two sources are present.
//!
//! ## Key Features
//!
//! * **Single-pass coordinate mapping**: CIGAR strings are walked once per
//!   read ([`CoordinateMapper`]) and queried in both directions.
//! * **Two modification decoders**: htslib's structured iterator, with a
//!   fallback parser for raw `MM`/`ML` (and legacy `Mm`/`Ml`) tags.
//! * **Parallel extraction**: variants are distributed over a Rayon pool, each
//!   worker owning its indexed readers and a local cache of recycled
//!   alignment records.
//! * **Deterministic output**: aggregation does not depend on the order in
//!   which workers finish.
//! * **Compressed reports**: level 1 and 2 tables can be written as gzip or
//!   zstd (feature `compression`).
//!
//! ## Structure
//!
//! * [`config`]: analysis parameters, their defaults and validation.
//! * [`data_structs`]: variant descriptors, sites, summaries and metrics.
//! * [`io`]: alignment fetching, variant/BED/reference loading and report
//!   writing.
//! * [`tools`]: extraction, aggregation and the [`Pipeline`].
//! * [`utils`]: record pool, statistics and helper macros.
//!
//! ## Usage
//!
//! ```no_run
//! use methylsomatic::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let inputs = PipelineInputs {
//!         vcfs: vec!["somatic.vcf.gz".into()],
//!         tumor: Some("tumor.bam".into()),
//!         ..Default::default()
//!     };
//!     let pipeline = Pipeline::new(AnalysisConfig::default(), inputs)?;
//!     let writer = ReportWriter::new("results", Compression::default());
//!     for results in pipeline.run()? {
//!         writer.write(&results)?;
//!     }
//!     Ok(())
//! }
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod data_structs;
pub mod io;
pub mod prelude;
pub mod tools;
pub mod utils;

#[allow(unused_imports)]
use prelude::*;
