use std::process::exit;

use clap::Args;
use console::style;
use itertools::Itertools;
use methylsomatic::io::bam::{
    validate_tags,
    TagReport,
};

use crate::utils::{
    expand_wildcards,
    UtilsArgs,
};

fn report_line(report: &TagReport) -> String {
    format!(
        "{}\tsampled={}\tMM={}\tML={}\tHP={}\tPS={}",
        report.path.display(),
        report.sampled,
        report.with_mm,
        report.with_ml,
        report.with_hp,
        report.with_ps
    )
}

#[derive(Args, Debug, Clone)]
pub(crate) struct ValidateArgs {
    #[arg(
        value_parser,
        num_args=1..,
        required = true,
        help = "Paths to alignment files"
    )]
    files:       Vec<String>,
    #[arg(
        short = 's',
        long,
        default_value_t = methylsomatic::io::bam::TAG_SAMPLE_SIZE,
        help = "Number of leading records inspected per file."
    )]
    sample_size: usize,
}

impl ValidateArgs {
    pub fn run(
        &self,
        _utils: &UtilsArgs,
    ) -> anyhow::Result<()> {
        let paths = expand_wildcards(&self.files);

        for path in paths.iter() {
            if !path.is_file() {
                eprintln!("Path {} is not a file.", style(path.display()).red());
                exit(-1);
            }
        }

        let reports = paths
            .iter()
            .map(|path| validate_tags(path, self.sample_size))
            .collect::<anyhow::Result<Vec<_>>>()?;

        for report in reports.iter() {
            println!("{}", report_line(report));
        }

        let (valid, invalid): (Vec<_>, Vec<_>) = reports
            .iter()
            .partition(|report| report.has_modifications());
        if !invalid.is_empty() {
            eprintln!(
                "Detected {}:",
                style("files without base modification tags").red()
            );
            for report in invalid.iter() {
                eprintln!("\t{}", report.path.display());
            }
        }

        let unphased = valid
            .iter()
            .filter(|report| !report.has_phasing())
            .map(|report| report.path.display())
            .join(", ");
        if !unphased.is_empty() {
            println!(
                "[{}] Unphased, haplotype will be '0': {}",
                style("!").yellow(),
                unphased
            );
        }

        if invalid.is_empty() {
            println!("{}", style("Files are valid").green());
            Ok(())
        }
        else {
            exit(-1)
        }
    }
}
