mod analyze;
pub mod utils;
mod validate;

use analyze::AnalyzeArgs;
use clap::{
    Parser,
    Subcommand,
};
use utils::UtilsArgs;
use validate::ValidateArgs;
use wild::ArgsOs;

#[derive(Parser, Debug)]
#[command(
    author = env!("CARGO_PKG_AUTHORS"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
    long_about = None,)]
struct Cli {
    #[command(subcommand)]
    command: MainMenu,
}

#[derive(Subcommand, Debug)]
enum MainMenu {
    /// Extract and aggregate methylation around somatic variants.
    Analyze {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  AnalyzeArgs,
    },

    /// Check alignment files for base modification and phasing tags.
    Validate {
        #[clap(flatten)]
        utils: UtilsArgs,
        #[clap(flatten)]
        args:  ValidateArgs,
    },
}

fn main() -> anyhow::Result<()> {
    let args: ArgsOs = wild::args_os();
    let cli = Cli::parse_from(args);

    match cli.command {
        MainMenu::Analyze { utils, args } => {
            utils.setup()?;
            args.run(&utils)?;
        },
        MainMenu::Validate { utils, args } => {
            utils.setup()?;
            args.run(&utils)?
        },
    }
    Ok(())
}
