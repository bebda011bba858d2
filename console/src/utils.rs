use std::path::PathBuf;
use std::str::FromStr;

use clap::Args;
use glob::glob;
use indicatif::{
    ProgressBar,
    ProgressStyle,
};
use log::LevelFilter;

#[derive(Args, Debug, Clone)]
pub(crate) struct UtilsArgs {
    #[arg(
        long,
        default_value_t = 0,
        help_heading = "UTILS",
        help = "Number of worker threads, 0 uses all available cores."
    )]
    pub threads:   usize,
    #[arg(
        long,
        default_value = "info",
        help_heading = "UTILS",
        help = "Logging level (off, error, warn, info, debug, trace)."
    )]
    pub log_level: String,
    #[arg(
        long,
        default_value_t = false,
        help_heading = "UTILS",
        help = "Display a progress bar."
    )]
    pub progress:  bool,
}

impl UtilsArgs {
    pub fn setup(&self) -> anyhow::Result<()> {
        let level = LevelFilter::from_str(&self.log_level)
            .map_err(|_| anyhow::anyhow!("Unknown log level '{}'", self.log_level))?;
        pretty_env_logger::formatted_builder()
            .filter_level(level)
            .parse_default_env()
            .try_init()?;
        Ok(())
    }
}

pub fn init_pbar(total: usize) -> anyhow::Result<ProgressBar> {
    let progress_bar = ProgressBar::new(total as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}, ETA: {eta}] [{bar:40.cyan/blue}] {pos:>5.green}/{len:5} {msg}")?
            .progress_chars("#>-"),
    );
    progress_bar.set_message("Processing...");
    Ok(progress_bar)
}

pub(crate) fn expand_wildcards(paths: &[String]) -> Vec<PathBuf> {
    let mut expanded_paths = Vec::new();

    for path in paths {
        if path.contains('*') || path.contains('?') {
            match glob(path) {
                Ok(matches) => {
                    for entry in matches.filter_map(Result::ok) {
                        expanded_paths.push(entry);
                    }
                },
                Err(e) => eprintln!("Error processing wildcard '{}': {}", path, e),
            }
        }
        else {
            expanded_paths.push(PathBuf::from(path));
        }
    }

    expanded_paths
}
