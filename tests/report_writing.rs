mod common;

use std::fs;
use std::path::Path;

use common::*;
use methylsomatic::config::AnalysisConfig;
use methylsomatic::data_structs::{
    AnalysisResults,
    Strand,
    VariantClass,
};
use methylsomatic::io::report::{
    GLOBAL_METRICS_FILE,
    LEVEL1_FILE,
    LEVEL2_FILE,
    LEVEL3_FILE,
};
use methylsomatic::io::{
    Compression,
    ReportWriter,
};
use methylsomatic::tools::aggregate::AggregationEngine;
use rstest::{
    fixture,
    rstest,
};
use tempfile::tempdir;

#[fixture]
fn results() -> AnalysisResults {
    let sites = vec![
        SiteBuilder::new(1000, 1001).vcf("A").prob(0.2).read("a1").build(),
        SiteBuilder::new(2000, 2001).vcf("A").prob(0.4).read("a2").build(),
        SiteBuilder::new(3000, 3001)
            .vcf("B")
            .prob(0.8)
            .strand(Strand::Reverse)
            .read("b1")
            .build(),
        SiteBuilder::new(4000, 4001).vcf("B").prob(0.9).read("b2").build(),
        SiteBuilder::new(5000, 5001)
            .vcf("A")
            .haplotype("2")
            .class(VariantClass::Insertion)
            .prob(0.6)
            .read("a3")
            .build(),
    ];
    AggregationEngine::new(&AnalysisConfig::default().with_min_strand_reads(0))
        .with_parameters(vec![("vcf_files".into(), "A.vcf,B.vcf".into())])
        .run("combined", sites)
}

fn lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[rstest]
fn writes_plain_reports(results: AnalysisResults) {
    let dir = tempdir().unwrap();
    let run_dir = ReportWriter::new(dir.path(), Compression::None)
        .write(&results)
        .unwrap();
    assert_eq!(run_dir, dir.path().join("combined"));

    let metrics = lines(&run_dir.join(GLOBAL_METRICS_FILE));
    assert_eq!(metrics[0], "# parameters");
    assert_eq!(metrics[1], "parameter_name\tparameter_value");
    assert_eq!(metrics[2], "vcf_files\tA.vcf,B.vcf");
    assert!(metrics.contains(&"window_size\t2000".to_string()));
    assert!(metrics.contains(&"# metrics".to_string()));
    assert!(metrics.contains(&"A_total_variants\t3".to_string()));
    assert!(metrics.contains(&"B_processed_variants\t2".to_string()));
    assert!(metrics.contains(&"tumor_total_site_count\t5".to_string()));

    let level1 = lines(&run_dir.join(LEVEL1_FILE));
    assert_eq!(level1.len(), 6);
    assert!(level1[0].starts_with("chrom\tmethyl_pos\tsomatic_pos"));
    assert_eq!(
        level1[1],
        "chr1\t1001\t1000\tSNV\tA\ttumor\talt\tT\t1\t0.2000\tlow\t+\ta1"
    );

    let level2 = lines(&run_dir.join(LEVEL2_FILE));
    assert_eq!(level2.len(), 6);
    assert_eq!(
        level2[3],
        "chr1\t3000\tSNV\tB\ttumor\talt\t1\t1\t1\t0.8000\t-"
    );

    let level3 = lines(&run_dir.join(LEVEL3_FILE));
    assert_eq!(
        level3[0],
        "haplotype_group\tbam_source\tvariant_type_group\tA_mean_methylation\t\
         B_mean_methylation\tdifference\tp_value"
    );
    assert_eq!(level3.len(), 3);
    assert!(level3[1].starts_with("1\ttumor\tSNV\t0.3000\t0.8500\t-0.5500\t"));
    assert_eq!(level3[2], "2\ttumor\tINDEL\t0.6000\t-1.0000\t0.0000\t1.000000");
}

#[cfg(feature = "compression")]
#[rstest]
fn compresses_site_tables(results: AnalysisResults) {
    use std::io::Read;

    let dir = tempdir().unwrap();
    let run_dir = ReportWriter::new(dir.path(), Compression::Gz)
        .write(&results)
        .unwrap();

    assert!(run_dir.join(GLOBAL_METRICS_FILE).exists());
    assert!(run_dir.join(LEVEL3_FILE).exists());
    assert!(!run_dir.join(LEVEL1_FILE).exists());

    let mut decoded = String::new();
    flate2::read::GzDecoder::new(
        fs::File::open(run_dir.join(format!("{}.gz", LEVEL2_FILE))).unwrap(),
    )
    .read_to_string(&mut decoded)
    .unwrap();
    assert_eq!(decoded.lines().count(), 6);
    assert!(decoded.starts_with("chrom\tsomatic_pos\tvariant_type"));
}
