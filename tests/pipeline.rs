mod common;

use std::fs;
use std::path::{
    Path,
    PathBuf,
};

use assert_approx_eq::assert_approx_eq;
use common::*;
use methylsomatic::config::{
    AnalysisConfig,
    RunMode,
};
use methylsomatic::data_structs::{
    AlleleSupport,
    Strand,
    VariantClass,
};
use methylsomatic::io::bam::{
    validate_tags,
    BamFetcher,
};
use methylsomatic::io::{
    BedFilter,
    VariantLoader,
};
use methylsomatic::tools::pipeline::{
    Pipeline,
    PipelineInputs,
};
use methylsomatic::utils::RecordPool;
use rust_htslib::bam;
use tempfile::{
    tempdir,
    TempDir,
};

const VCF: &str = "##fileformat=VCFv4.2
##contig=<ID=chr1,length=10000>
##FILTER=<ID=PASS,Description=\"All filters passed\">
##FILTER=<ID=LowQual,Description=\"Low quality\">
##FORMAT=<ID=AD,Number=R,Type=Integer,Description=\"Allelic depths\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\tFORMAT\tTUMOR
chr1\t103\t.\tG\tT\t50\tPASS\t.\tAD\t10,5
chr1\t200\t.\tA\tC\t50\tLowQual\t.\tAD\t10,5
chr1\t300\t.\tA\tC,G\t50\tPASS\t.\tAD\t10,1,6
";

fn write_vcf(dir: &Path) -> PathBuf {
    let path = dir.join("somatic.vcf");
    fs::write(&path, VCF).unwrap();
    path
}

/// Three reads around chr1:103. `alt` is forward and phased, `ref` is
/// reverse and unphased, `low_mapq` is dropped by the fetcher.
fn write_bam(dir: &Path) -> PathBuf {
    let path = dir.join("tumor.bam");
    let view = bam::HeaderView::from_bytes(b"@SQ\tSN:chr1\tLN:10000\n");
    let header = bam::Header::from_template(&view);
    {
        let mut writer = bam::Writer::from_path(&path, &header, bam::Format::Bam).unwrap();
        let alt = ReadBuilder::new("alt", 100, "ACTTACGTCA")
            .mods("C+m?,0,0;", &[230, 200])
            .haplotype(1)
            .build();
        let reference = ReadBuilder::new("ref", 100, "ACGTACGTCA")
            .reverse()
            .mods("C+m?,1;", &[100])
            .build();
        let mut low_mapq = ReadBuilder::new("low_mapq", 100, "ACTTACGTCA")
            .mods("C+m?,0;", &[255])
            .build();
        low_mapq.set_mapq(0);
        for record in [alt, reference, low_mapq].iter() {
            writer.write(record).unwrap();
        }
    }
    bam::index::build(&path, None, bam::index::Type::Bai, 1).unwrap();
    path
}

struct Inputs {
    _dir: TempDir,
    vcf:  PathBuf,
    bam:  PathBuf,
}

fn inputs() -> Inputs {
    let dir = tempdir().unwrap();
    let vcf = write_vcf(dir.path());
    let bam = write_bam(dir.path());
    Inputs {
        _dir: dir,
        vcf,
        bam,
    }
}

#[test]
fn loader_keeps_pass_records_per_alt() {
    let files = inputs();
    let variants = VariantLoader::new(None, 0).load(&files.vcf).unwrap();

    let summary = variants
        .iter()
        .map(|v| (*v.pos(), v.alt_allele().clone(), *v.class()))
        .collect::<Vec<_>>();
    assert_eq!(summary, vec![
        (103, "T".to_string(), VariantClass::Snv),
        (300, "C".to_string(), VariantClass::Multi),
        (300, "G".to_string(), VariantClass::Multi),
    ]);
    assert!(variants.iter().all(|v| v.source().as_str() == "somatic"));
    assert_eq!(*variants[0].quality(), Some(50.0));
}

#[test]
fn loader_applies_alt_support_and_targets() {
    let files = inputs();

    let variants = VariantLoader::new(None, 3).load(&files.vcf).unwrap();
    let alts = variants
        .iter()
        .map(|v| v.alt_allele().as_str())
        .collect::<Vec<_>>();
    assert_eq!(alts, vec!["T", "G"]);

    let bed = BedFilter::from_reader("chr1\t100\t150\n".as_bytes()).unwrap();
    let variants = VariantLoader::new(Some(&bed), 0)
        .load(&files.vcf)
        .unwrap();
    assert_eq!(variants.len(), 1);
    assert_eq!(*variants[0].pos(), 103);
}

#[test]
fn tag_validation_counts_annotated_reads() {
    let files = inputs();
    let report = validate_tags(&files.bam, 100).unwrap();

    assert_eq!(report.sampled, 3);
    assert_eq!(report.with_mm, 3);
    assert_eq!(report.with_hp, 1);
    assert!(report.has_modifications());
    assert!(!report.has_phasing());
}

#[test]
fn fetcher_filters_mapq_and_recycles_records() {
    let files = inputs();
    let config = AnalysisConfig::default();
    let pool = RecordPool::<bam::Record>::new(2, None);
    let mut worker = pool.worker();
    let mut fetcher = BamFetcher::open(&files.bam, "tumor", &config).unwrap();

    let records = fetcher.fetch_region("chr1", 0, 1000, &mut worker).unwrap();
    let names = records
        .iter()
        .map(|r| String::from_utf8_lossy(r.qname()).to_string())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["alt", "ref"]);
    worker.release_all(records);

    assert!(fetcher
        .fetch_region("chrUn", 0, 1000, &mut worker)
        .unwrap()
        .is_empty());
    assert!(fetcher
        .fetch_region("chr1", 5000, 6000, &mut worker)
        .unwrap()
        .is_empty());
}

#[test]
fn fetcher_truncates_at_max_depth() {
    let files = inputs();
    let config = AnalysisConfig::default().with_max_read_depth(1);
    let pool = RecordPool::<bam::Record>::new(0, None);
    let mut worker = pool.worker();
    let mut fetcher = BamFetcher::open(&files.bam, "tumor", &config).unwrap();

    let records = fetcher.fetch_region("chr1", 0, 1000, &mut worker).unwrap();
    assert_eq!(records.len(), 1);
}

#[test]
fn fetcher_completes_region_under_pool_cap() {
    let files = inputs();
    let config = AnalysisConfig::default();
    let pool = RecordPool::<bam::Record>::new(0, Some(1));
    let mut worker = pool.worker();
    let mut fetcher = BamFetcher::open(&files.bam, "tumor", &config).unwrap();

    let records = fetcher.fetch_region("chr1", 0, 1000, &mut worker).unwrap();
    assert_eq!(records.len(), 2);
    assert!(pool.stats().overflow >= 1);
    worker.release_all(records);
    assert_eq!(worker.held(), 0);
}

#[test]
fn pipeline_runs_with_minimal_pool_cap() {
    let files = inputs();
    let config = AnalysisConfig::default()
        .with_min_strand_reads(0)
        .with_threads(1)
        .with_pool_prealloc(0)
        .with_pool_hard_cap(Some(1));
    let pipeline = Pipeline::new(config, PipelineInputs {
        vcfs: vec![files.vcf.clone()],
        tumor: Some(files.bam.clone()),
        ..Default::default()
    })
    .unwrap();
    let results = pipeline.run().unwrap();

    assert_eq!(results[0].raw_sites().len(), 3);
    assert_eq!(results[0].variant_summaries().len(), 2);
}

#[test]
fn pipeline_runs_per_file() {
    let files = inputs();
    let config = AnalysisConfig::default()
        .with_min_strand_reads(0)
        .with_threads(2);
    let pipeline = Pipeline::new(config, PipelineInputs {
        vcfs: vec![files.vcf.clone()],
        tumor: Some(files.bam.clone()),
        ..Default::default()
    })
    .unwrap();
    let results = pipeline.run().unwrap();

    assert_eq!(results.len(), 1);
    let result = &results[0];
    assert_eq!(result.label().as_str(), "somatic");
    assert_eq!(result.raw_sites().len(), 3);

    let summaries = result.variant_summaries();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].allele_support, AlleleSupport::Ref);
    assert_eq!(summaries[0].haplotype.as_str(), "0");
    assert_eq!(summaries[0].dominant_strand, Strand::Reverse);
    assert_eq!(summaries[1].allele_support, AlleleSupport::Alt);
    assert_eq!(summaries[1].haplotype.as_str(), "1");
    assert_eq!(summaries[1].supporting_reads, 1);
    assert_eq!(summaries[1].site_count, 2);
    assert_approx_eq!(summaries[1].mean_methylation, 215.0 / 255.0);

    let counts = result.metrics().variant_counts()["somatic"];
    assert_eq!(counts.total, 1);
    assert_eq!(counts.processed, 1);
    assert_eq!(result.metrics().parameters()["tumor_bam"], files.bam.display().to_string());
    assert_eq!(result.metrics().parameters()["threads"], "2");
}

#[test]
fn pipeline_strand_filter_drops_single_strand_positions() {
    let files = inputs();
    let pipeline = Pipeline::new(AnalysisConfig::default().with_threads(1), PipelineInputs {
        vcfs: vec![files.vcf.clone()],
        tumor: Some(files.bam.clone()),
        ..Default::default()
    })
    .unwrap();
    let results = pipeline.run().unwrap();

    assert_eq!(results[0].raw_sites().len(), 3);
    assert!(results[0].variant_summaries().is_empty());
    assert_eq!(results[0].metrics().variant_counts()["somatic"].processed, 0);
}

#[test]
fn pipeline_combined_mode_labels_run() {
    let files = inputs();
    let config = AnalysisConfig::default()
        .with_mode(RunMode::Combined)
        .with_min_strand_reads(0)
        .with_threads(2);
    let pipeline = Pipeline::new(config, PipelineInputs {
        vcfs: vec![files.vcf.clone()],
        tumor: Some(files.bam.clone()),
        normal: Some(files.bam.clone()),
        ..Default::default()
    })
    .unwrap();
    let results = pipeline.run().unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].label().as_str(), "combined");
    assert_eq!(results[0].raw_sites().len(), 6);
    let samples = results[0]
        .metrics()
        .sample_metrics()
        .keys()
        .map(|k| k.as_str())
        .collect::<Vec<_>>();
    assert_eq!(samples, vec!["normal", "tumor"]);
}

#[test]
fn pipeline_rejects_invalid_configuration() {
    let files = inputs();
    let config = AnalysisConfig::default().with_window_size(0);
    let result = Pipeline::new(config, PipelineInputs {
        vcfs: vec![files.vcf.clone()],
        tumor: Some(files.bam.clone()),
        ..Default::default()
    });
    assert!(result.is_err());
}
