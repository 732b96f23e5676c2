//! Mail sources that feed raw messages into the pipeline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, Utc};
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::SourceError;

use super::message::RawMessage;

/// Supplies an ordered batch of messages and learns which ones were
/// durably recorded.
///
/// `mark_processed` is only called after the output sink confirmed the
/// write, so a source may safely hide or move those messages.
pub trait MailSource {
    fn fetch(&mut self) -> Result<Vec<RawMessage>, SourceError>;

    fn mark_processed(&mut self, message_ids: &[String]) -> Result<(), SourceError>;
}

/// Reads `*.eml` files from a directory, in file name order.
///
/// Processed files are moved into a `processed/` subdirectory. Files that
/// cannot be read are skipped with a warning and stay in place.
pub struct EmlDirectorySource {
    directory: PathBuf,
    /// Every file carrying a message id; ids are not unique across files.
    paths_by_id: HashMap<String, Vec<PathBuf>>,
    skipped: Vec<PathBuf>,
}

impl EmlDirectorySource {
    pub const PROCESSED_DIR: &'static str = "processed";

    pub fn new<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            directory: directory.as_ref().to_path_buf(),
            paths_by_id: HashMap::new(),
            skipped: Vec::new(),
        }
    }

    /// Files the last fetch could not read.
    pub fn skipped_files(&self) -> &[PathBuf] {
        &self.skipped
    }

    fn processed_directory(&self) -> PathBuf {
        self.directory.join(Self::PROCESSED_DIR)
    }
}

impl MailSource for EmlDirectorySource {
    fn fetch(&mut self) -> Result<Vec<RawMessage>, SourceError> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.directory).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| SourceError::Scan {
                path: self.directory.clone(),
                source: e,
            })?;
            let path = entry.path();
            let is_eml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("eml"));
            if !entry.file_type().is_dir() && is_eml {
                paths.push(path.to_path_buf());
            }
        }
        paths.sort();

        self.paths_by_id.clear();
        self.skipped.clear();
        let mut messages = Vec::with_capacity(paths.len());
        for path in paths {
            let raw = match std::fs::read(&path) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("Skipping unreadable {}: {}", path.display(), e);
                    self.skipped.push(path);
                    continue;
                }
            };
            let fallback_id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("message")
                .to_string();
            let message = RawMessage::from_rfc822(&fallback_id, &raw, file_time(&path));
            debug!("Loaded message '{}' from {}", message.id, path.display());
            self.paths_by_id
                .entry(message.id.clone())
                .or_default()
                .push(path);
            messages.push(message);
        }

        info!(
            "Found {} message(s) in {}",
            messages.len(),
            self.directory.display()
        );
        Ok(messages)
    }

    fn mark_processed(&mut self, message_ids: &[String]) -> Result<(), SourceError> {
        let target_dir = self.processed_directory();
        if !message_ids.is_empty() {
            std::fs::create_dir_all(&target_dir).map_err(|e| SourceError::CreateDirectory {
                path: target_dir.clone(),
                source: e,
            })?;
        }

        for id in message_ids {
            let Some(paths) = self.paths_by_id.remove(id) else {
                warn!("No file known for processed message '{}'", id);
                continue;
            };
            for path in paths {
                let Some(file_name) = path.file_name() else {
                    continue;
                };
                let target = target_dir.join(file_name);
                move_file(&path, &target)?;
                debug!("Moved {} -> {}", path.display(), target.display());
            }
        }
        Ok(())
    }
}

/// Reads a JSON array of [`RawMessage`] values.
///
/// Marking is a no-op; the dedup history keeps reruns safe.
pub struct JsonBatchSource {
    path: PathBuf,
}

impl JsonBatchSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl MailSource for JsonBatchSource {
    fn fetch(&mut self) -> Result<Vec<RawMessage>, SourceError> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| SourceError::ReadFile {
            path: self.path.clone(),
            source: e,
        })?;
        let messages: Vec<RawMessage> =
            serde_json::from_str(&content).map_err(|e| SourceError::ParseJson {
                path: self.path.clone(),
                source: e,
            })?;
        info!(
            "Loaded {} message(s) from {}",
            messages.len(),
            self.path.display()
        );
        Ok(messages)
    }

    fn mark_processed(&mut self, message_ids: &[String]) -> Result<(), SourceError> {
        debug!("{} message(s) recorded from JSON batch", message_ids.len());
        Ok(())
    }
}

fn file_time(path: &Path) -> DateTime<FixedOffset> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());
    modified.fixed_offset()
}

/// Moves a file, using `rename` first and copy + delete across devices.
fn move_file(src: &Path, dst: &Path) -> Result<(), SourceError> {
    if std::fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    let to_err = |e| SourceError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    };
    std::fs::copy(src, dst).map_err(to_err)?;
    std::fs::remove_file(src).map_err(to_err)?;
    Ok(())
}
