use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ltfsread")]
#[command(about = "Read LTFS volume metadata and data straight from a Linux tape drive")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Specify configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the VOL1 label, LTFS label and latest index
    Info {
        /// Tape device path (e.g. /dev/nst0)
        #[arg(value_name = "DEVICE")]
        device: Option<String>,
    },

    /// List every index generation found on the index partition
    Generations {
        /// Tape device path
        #[arg(value_name = "DEVICE")]
        device: Option<String>,
    },

    /// Print the directory tree of the latest index
    Tree {
        /// Tape device path
        #[arg(value_name = "DEVICE")]
        device: Option<String>,

        /// Only show the subtree below this path
        #[arg(long, value_name = "PATH")]
        path: Option<String>,
    },

    /// Show the current SCSI and MTIO position
    Position {
        /// Tape device path
        #[arg(value_name = "DEVICE")]
        device: Option<String>,
    },

    /// Check readiness, partitioning and capacity
    Check {
        /// Tape device path
        #[arg(value_name = "DEVICE")]
        device: Option<String>,
    },

    /// Copy data from a tape position to a local file
    Dump {
        /// Tape device path
        #[arg(value_name = "DEVICE")]
        device: Option<String>,

        /// SCSI partition number
        #[arg(short, long, default_value = "1")]
        partition: u8,

        /// Logical block to start from
        #[arg(short, long)]
        block: u64,

        /// Local destination file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Hide the progress spinner
        #[arg(short, long)]
        quiet: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
