use crate::context::Context;
use clap::Subcommand;
use std::path::PathBuf;
use std::sync::Arc;
use zpress_core::CompressionLevel;

pub mod batch;
pub mod file;
pub mod query;

#[derive(Subcommand)]
pub enum Commands {
    /// Compress a single file
    Compress {
        input: PathBuf,
        output: PathBuf,
        /// none, fast, balanced, max or a number from 0 to 9
        #[arg(short, long, default_value = "balanced")]
        level: CompressionLevel,
    },

    /// Decompress a file produced by `compress`
    Decompress { input: PathBuf, output: PathBuf },

    /// Compress every file in a directory through the worker pool
    Batch {
        dir: PathBuf,
        /// Force a level instead of letting learned statistics decide
        #[arg(short, long)]
        level: Option<CompressionLevel>,
        /// Seconds to wait for each task
        #[arg(long, default_value = "300")]
        timeout: u64,
    },

    /// Show the stored state of a task
    Status {
        task_id: String,
    },

    /// Look up the latest task for a file id
    FileStatus {
        file_id: String,
    },

    /// Print the statistics snapshot as JSON
    Stats,

    /// Decompress a completed task's artifact into the cache directory
    Materialize {
        task_id: String,
    },
}

impl Commands {
    pub async fn execute(self, context: Arc<Context>) -> eyre::Result<()> {
        match self {
            Commands::Compress {
                input,
                output,
                level,
            } => file::compress(context, input, output, level).await,
            Commands::Decompress { input, output } => file::decompress(context, input, output).await,
            Commands::Batch {
                dir,
                level,
                timeout,
            } => batch::execute(context, dir, level, timeout).await,
            Commands::Status { task_id } => query::status(context, task_id).await,
            Commands::FileStatus { file_id } => query::file_status(context, file_id).await,
            Commands::Stats => query::stats(context).await,
            Commands::Materialize { task_id } => query::materialize(context, task_id).await,
        }
    }
}
