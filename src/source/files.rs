use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use super::error::SourceError;

/// One poll worth of records read from disk. Entries are kept as JSON so the
/// pipeline can reject ill-typed ones per record; `malformed` counts text
/// that was not JSON at all.
#[derive(Debug, Default)]
pub struct FileBatch {
    pub samples: Vec<Value>,
    pub files: usize,
    pub malformed: usize,
}

/// Reads producer drops from a directory: `*.json` files holding one object
/// (or an array of objects) and `*.jsonl` files holding one object per line.
///
/// Files are read in name order. Consumed files are either deleted or
/// remembered so the next poll skips them.
pub struct FileSource {
    dir: PathBuf,
    delete_consumed: bool,
    seen: HashSet<PathBuf>,
}

impl FileSource {
    pub fn new(dir: PathBuf, delete_consumed: bool) -> Self {
        Self {
            dir,
            delete_consumed,
            seen: HashSet::new(),
        }
    }

    pub fn poll(&mut self) -> Result<FileBatch, SourceError> {
        if !self.dir.exists() {
            return Err(SourceError::DirectoryNotFound(self.dir.display().to_string()));
        }

        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if !path.is_file() || self.seen.contains(&path) || is_hidden(&path) {
                continue;
            }
            if let Some(ext) = path.extension() {
                if ext == "json" || ext == "jsonl" {
                    paths.push(path);
                }
            }
        }
        paths.sort();

        let mut batch = FileBatch::default();
        for path in paths {
            let content = match fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    log::warn!("Failed to read {}: {}", path.display(), e);
                    continue;
                }
            };

            let before = batch.samples.len();
            batch.malformed += parse_content(&path, &content, &mut batch.samples);
            batch.files += 1;
            log::debug!(
                "Read {} record(s) from {}",
                batch.samples.len() - before,
                path.display()
            );

            if self.delete_consumed {
                if let Err(e) = fs::remove_file(&path) {
                    log::warn!("Failed to delete {}: {}", path.display(), e);
                    self.seen.insert(path);
                }
            } else {
                self.seen.insert(path);
            }
        }

        Ok(batch)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

/// Returns the number of entries that were not valid JSON.
fn parse_content(path: &Path, content: &str, out: &mut Vec<Value>) -> usize {
    let is_lines = path.extension().is_some_and(|e| e == "jsonl");
    let mut malformed = 0;

    if is_lines {
        for (n, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(line) {
                Ok(value) => out.push(value),
                Err(e) => {
                    log::warn!("Malformed record {}:{}: {}", path.display(), n + 1, e);
                    malformed += 1;
                }
            }
        }
        return malformed;
    }

    match serde_json::from_str::<Value>(content) {
        Ok(Value::Array(items)) => out.extend(items),
        Ok(value) => out.push(value),
        Err(e) => {
            log::warn!("Malformed JSON in {}: {}", path.display(), e);
            malformed += 1;
        }
    }
    malformed
}
