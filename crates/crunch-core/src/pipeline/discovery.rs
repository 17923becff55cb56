//! Candidate discovery for tree mode.

use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::decode::is_supported_extension;
use super::paths::dotted_extension;
use crate::config::MATCH_ALL;
use crate::error::CrunchError;

/// Decides which walked files are conversion candidates.
///
/// A file qualifies when its extension is decodable, is one of the requested
/// extensions (case-insensitive), and its path matches the pattern.
#[derive(Debug, Clone)]
pub struct CandidateFilter {
    extensions: Vec<String>,
    pattern: Regex,
}

impl CandidateFilter {
    /// Build a filter. Extensions may be given with or without a leading dot.
    pub fn new<S: AsRef<str>>(extensions: &[S], pattern: &str) -> Result<Self, CrunchError> {
        let extensions = extensions
            .iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        let pattern = if pattern.is_empty() { MATCH_ALL } else { pattern };
        Ok(Self {
            extensions,
            pattern: Regex::new(pattern)?,
        })
    }

    /// Check whether a file is a candidate.
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(ext) = dotted_extension(path) else {
            return false;
        };
        if !is_supported_extension(ext) {
            return false;
        }
        let ext = ext.to_lowercase();
        if !self.extensions.iter().any(|wanted| *wanted == ext) {
            return false;
        }
        self.pattern.is_match(&path.to_string_lossy())
    }

    /// Requested extensions, normalized to lowercase without a dot.
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

/// Lazily walk every regular file under `root` in file-name order.
///
/// Unreadable entries are logged and skipped. Symlinks are not followed.
pub fn walk_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
}
