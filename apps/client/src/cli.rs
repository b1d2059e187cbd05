use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about = "Search flights and watch the results come in")]
pub struct Cli {
    /// Start this search right away
    pub query: Option<String>,

    /// Socket of the search service (defaults to the one in the runtime directory)
    #[arg(long)]
    pub socket: Option<PathBuf>,

    /// Results per page
    #[arg(long)]
    pub page_size: Option<u32>,

    /// Delay between automatic polls
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// Increase verbosity. Can be used multiple times (e.g., -v, -vv).
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
