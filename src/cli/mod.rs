//! CLI command handlers

pub mod args;
pub mod wordcount;

pub use args::{Cli, Commands, OutputFormat};

use crate::app::AppConfig;
use anyhow::Result;
use tracing::debug;
use wordcount::{run_word_count, WordCountCommand};

/// Execute a parsed CLI command
pub async fn execute_command(command: Commands, verbose: u8) -> Result<()> {
    match command {
        Commands::WordCount {
            files,
            threads,
            config,
            slab_lines,
            normalize,
            top,
            format,
        } => {
            let mut app_config = AppConfig::new(verbose);
            if let Some(path) = config {
                app_config = app_config.with_config_file(&path)?;
            }
            let app_config = app_config.with_threads(threads);
            debug!(
                config_file = ?app_config.config_file,
                concurrency = app_config.pipeline.concurrency,
                "Resolved pipeline settings"
            );

            let command = WordCountCommand {
                files,
                slab_lines,
                normalize,
                top,
                format,
            };
            let mut stdout = std::io::stdout();
            run_word_count(&command, &app_config, &mut stdout).await
        }
    }
}
