use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ytpost",
    about = "YouTube transcript cleanup and repurposing service",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Address to listen on (overrides `bind` in the config file)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Config file to load instead of ~/.config/ytpost/config.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write logs to the data directory instead of stderr
    #[arg(long)]
    pub log_file: bool,
}
