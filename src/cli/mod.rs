use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "feedsnap")]
#[command(
    about = "Capture RSS/Atom entries as self-contained static documents",
    long_about = None
)]
pub struct Cli {
    /// Configuration file (default: ~/.config/feedsnap/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
