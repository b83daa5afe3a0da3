use crate::config::normalize_extension_filter;
use crate::metadata::ResolvedDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub is_hidden: bool,
    pub is_dotfile: bool,
    pub resolved_date: Option<ResolvedDate>,
    pub size_bytes: u64,
}

impl CandidateFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|v| v.to_string_lossy().to_string())
            .filter(|v| !v.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct Enumerator {
    root: PathBuf,
    extension_filter: Option<String>,
}

impl Enumerator {
    pub fn new(root: impl Into<PathBuf>, extension_filter: &str) -> Self {
        Self {
            root: root.into(),
            extension_filter: normalize_extension_filter(extension_filter),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn iter(&self) -> impl Iterator<Item = CandidateFile> + '_ {
        WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden_entry(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!("skipping unreadable entry under {}: {err}", self.root.display());
                    None
                }
            })
            .filter_map(|entry| inspect_entry(&entry))
            .filter(|candidate| !candidate.is_hidden && !candidate.is_dotfile)
            .filter(|candidate| self.matches_extension(&candidate.path))
    }

    fn matches_extension(&self, path: &Path) -> bool {
        let Some(filter) = self.extension_filter.as_deref() else {
            return true;
        };
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase() == filter)
            .unwrap_or(false)
    }
}

fn inspect_entry(entry: &DirEntry) -> Option<CandidateFile> {
    // symlinks report their own type here, so links to anything are dropped
    if !entry.file_type().is_file() {
        return None;
    }

    let metadata = match entry.metadata() {
        Ok(metadata) => metadata,
        Err(err) => {
            warn!("skipping {}: {err}", entry.path().display());
            return None;
        }
    };

    Some(CandidateFile {
        path: entry.path().to_path_buf(),
        is_hidden: has_hidden_attribute(&metadata),
        is_dotfile: is_dotfile(entry.path()),
        resolved_date: None,
        size_bytes: metadata.len(),
    })
}

fn is_hidden_entry(entry: &DirEntry) -> bool {
    if is_dotfile(entry.path()) {
        return true;
    }
    entry
        .metadata()
        .map(|metadata| has_hidden_attribute(&metadata))
        .unwrap_or(false)
}

fn is_dotfile(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

#[cfg(windows)]
fn has_hidden_attribute(metadata: &fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
    metadata.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0
}

#[cfg(target_os = "macos")]
fn has_hidden_attribute(metadata: &fs::Metadata) -> bool {
    use std::os::macos::fs::MetadataExt;
    const UF_HIDDEN: u32 = 0x8000;
    metadata.st_flags() & UF_HIDDEN != 0
}

#[cfg(not(any(windows, target_os = "macos")))]
fn has_hidden_attribute(_metadata: &fs::Metadata) -> bool {
    false
}
