use clap::Parser;
use partition::DEFAULT_TENANT;
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    /// Script with one command per line, read from stdin when absent
    pub script: Option<PathBuf>,

    /// Prefix of the generated mount ids
    #[arg(long, short, default_value = DEFAULT_TENANT)]
    pub tenant: String,
}
