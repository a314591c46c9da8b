use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the source and print every record as a JSON line
    Sync {
        #[arg(long, help = "Source settings file (JSON object of string values)")]
        config: PathBuf,

        #[arg(long, help = "Position store directory, defaults to ~/.bqsync/state")]
        state: Option<PathBuf>,
    },
    /// List the tables a sync would read
    Tables {
        #[arg(long, help = "Source settings file")]
        config: PathBuf,
    },
    /// Print the accepted settings keys
    Params,
    /// Show the persisted resume position of a source
    Position {
        #[arg(long, help = "Source settings file")]
        config: PathBuf,

        #[arg(long, help = "Position store directory, defaults to ~/.bqsync/state")]
        state: Option<PathBuf>,
    },
}
