//! Split text input into slabs of lines
//!
//! A slab is the unit of map input: a run of at most `lines_per_slab`
//! consecutive lines, keyed `"{source}:{index}"`.

use crate::collection::KvCollection;
use crate::error::MapReduceError;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Default number of lines per slab used by the CLI
pub const DEFAULT_SLAB_LINES: usize = 1000;

/// Cut `text` into slabs of at most `lines_per_slab` lines
pub fn slab_text(
    source: &str,
    text: &str,
    lines_per_slab: usize,
) -> Result<KvCollection<String, String>, MapReduceError> {
    let mut slabs = KvCollection::new();
    for (index, slab) in slab_lines(text, lines_per_slab)?.into_iter().enumerate() {
        slabs.insert(format!("{}:{}", source, index), slab);
    }
    Ok(slabs)
}

/// Read every file and slab its contents, keyed by path and slab index
pub fn slab_files<P: AsRef<Path>>(
    paths: &[P],
    lines_per_slab: usize,
) -> Result<KvCollection<String, String>> {
    let mut slabs = KvCollection::new();
    for path in paths {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?;
        let file_slabs = slab_text(&path.display().to_string(), &text, lines_per_slab)?;
        debug!(path = %path.display(), slabs = file_slabs.len(), "Slabbed input file");

        for (key, slab) in file_slabs {
            if slabs.contains_key(&key) {
                return Err(MapReduceError::invalid_argument(
                    "files",
                    format!("input file {} given more than once", path.display()),
                )
                .into());
            }
            slabs.insert(key, slab);
        }
    }
    Ok(slabs)
}

fn slab_lines(text: &str, lines_per_slab: usize) -> Result<Vec<String>, MapReduceError> {
    if lines_per_slab == 0 {
        return Err(MapReduceError::invalid_argument(
            "lines_per_slab",
            "must be greater than zero",
        ));
    }

    let lines: Vec<&str> = text.lines().collect();
    Ok(lines
        .chunks(lines_per_slab)
        .map(|chunk| chunk.join("\n"))
        .collect())
}
