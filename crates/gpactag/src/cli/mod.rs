pub mod tag;
pub mod validate;

use clap::{Parser, Subcommand};
use gpactag_lib::{GpacError, Result, TaggingConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gpactag")]
#[command(about = "Classify financial instrument records into the GPAC taxonomy", long_about = None)]
#[command(version)]
pub struct Cli {
    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, short = 'q', global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Tag an input dataset against the configured mapping tables")]
    Tag {
        #[arg(long, help = "Path to tagging configuration")]
        config: Option<PathBuf>,

        #[arg(long, help = "Input CSV, overrides [files].input")]
        input: Option<PathBuf>,

        #[arg(long, short = 'o', help = "Output CSV, overrides [files].output")]
        output: Option<PathBuf>,

        #[arg(long, help = "Write the run summary as JSON to this path")]
        summary: Option<PathBuf>,
    },

    #[command(about = "Validate configuration and mapping tables without tagging")]
    Validate {
        #[arg(long, help = "Path to tagging configuration")]
        config: Option<PathBuf>,
    },
}

pub fn load_config(path: Option<PathBuf>) -> Result<TaggingConfig> {
    let path = path
        .or_else(gpactag_lib::config::default_config_path)
        .ok_or_else(|| {
            GpacError::Config(
                "No configuration file given and none found in the XDG config directory"
                    .to_string(),
            )
        })?;

    let config = TaggingConfig::from_file(&path)?;
    config.validate()?;
    log::info!("Configuration loaded from {}", path.display());
    Ok(config)
}
