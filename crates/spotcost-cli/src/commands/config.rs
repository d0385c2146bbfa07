//! `spotcost config`

use anyhow::Result;
use clap::Args;
use spotcost_optimization::{example_config, OptimizerConfig};

use crate::cli::OutputFormat;
use crate::output;

/// Print configuration
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Show the effective configuration instead of the annotated example
    #[arg(long)]
    pub effective: bool,
}

impl ConfigArgs {
    pub fn execute(self, config: OptimizerConfig, format: OutputFormat) -> Result<()> {
        if !self.effective {
            print!("{}", example_config());
            return Ok(());
        }

        match format {
            OutputFormat::Json => output::print_json(&config),
            OutputFormat::Table | OutputFormat::Plain => {
                println!("# {}", OptimizerConfig::config_path().display());
                print!("{}", toml::to_string_pretty(&config)?);
                Ok(())
            }
        }
    }
}
