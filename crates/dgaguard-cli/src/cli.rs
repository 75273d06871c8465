use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dgaguard")]
#[command(
    author,
    version,
    about = "Classify domain names as benign or malware, and rank likely malware families"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify domains, printing one JSON verdict per line
    Classify(ClassifyArgs),

    /// Print the header of a model artifact
    Inspect {
        /// Artifact file
        artifact: PathBuf,
    },

    /// Print the named feature values extracted from a domain
    Features {
        /// Feature schema version (1 or 2)
        #[arg(long, default_value = "2", value_parser = parse_schema_version)]
        schema_version: u32,

        /// Domain to inspect
        domain: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct ClassifyArgs {
    /// Detector config path
    #[arg(short, long, env = "DGAGUARD_CONFIG", default_value = "./dgaguard.yaml")]
    pub config: PathBuf,

    /// Override the binary model path
    #[arg(long)]
    pub binary_model: Option<PathBuf>,

    /// Override the family model path
    #[arg(long)]
    pub family_model: Option<PathBuf>,

    /// Override the malware threshold
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Override the number of reported families
    #[arg(long)]
    pub top_k: Option<usize>,

    /// Domains to classify; read from stdin when omitted
    pub domains: Vec<String>,
}

fn parse_schema_version(s: &str) -> Result<u32, String> {
    match s.parse::<u32>() {
        Ok(v @ (1 | 2)) => Ok(v),
        _ => Err(format!("unsupported schema version '{}', expected 1 or 2", s)),
    }
}
