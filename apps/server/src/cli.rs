use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about = "Simulated progressive flight search service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase verbosity. Can be used multiple times (e.g., -v, -vv).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve flight searches on the unix socket
    Serve,
}
