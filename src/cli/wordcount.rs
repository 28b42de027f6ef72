//! `wordcount` command

use crate::app::AppConfig;
use crate::cli::args::OutputFormat;
use crate::collection::KvCollection;
use crate::mapreduce::MapReduce;
use crate::slab::slab_files;
use crate::wordcount::{self, WORD_COUNT_MAP, WORD_COUNT_MAP_NORMALIZED, WORD_COUNT_REDUCE};
use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Options for one `wordcount` run
#[derive(Debug, Clone)]
pub struct WordCountCommand {
    pub files: Vec<PathBuf>,
    pub slab_lines: usize,
    pub normalize: bool,
    pub top: Option<usize>,
    pub format: OutputFormat,
}

/// Count words in the input files and write the report to `out`
pub async fn run_word_count<W: Write>(
    command: &WordCountCommand,
    config: &AppConfig,
    out: &mut W,
) -> Result<()> {
    let data = slab_files(&command.files, command.slab_lines)?;
    info!(
        files = command.files.len(),
        slabs = data.len(),
        threads = config.pipeline.concurrency,
        "Running word count"
    );

    let map_name = if command.normalize {
        WORD_COUNT_MAP_NORMALIZED
    } else {
        WORD_COUNT_MAP
    };
    let counts = MapReduce::new(config.pipeline.clone())
        .run_named(data, &wordcount::registry(), map_name, WORD_COUNT_REDUCE)
        .await?;

    let ranked = rank(counts, command.top);
    match command.format {
        OutputFormat::Text => {
            for (word, count) in &ranked {
                writeln!(out, "{}\t{}", word, count)?;
            }
        }
        OutputFormat::Json => {
            let object: serde_json::Map<String, serde_json::Value> = ranked
                .into_iter()
                .map(|(word, count)| (word, count.into()))
                .collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&object)?)?;
        }
    }
    Ok(())
}

/// Sort by count descending, then word ascending
fn rank(counts: KvCollection<String, Vec<u64>>, top: Option<usize>) -> Vec<(String, u64)> {
    let mut ranked: Vec<(String, u64)> = counts
        .into_iter()
        .map(|(word, totals)| (word, totals.iter().sum()))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if let Some(top) = top {
        ranked.truncate(top);
    }
    ranked
}
