use crate::exif_reader::read_exif_date;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use tracing::debug;

pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "tiff", "heic", "png", "raw", "cr2", "crw", "nef", "arw",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DateSource {
    Exif,
    FileModified,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedDate {
    pub at: DateTime<Local>,
    pub source: DateSource,
}

impl ResolvedDate {
    pub fn is_exif(&self) -> bool {
        self.source == DateSource::Exif
    }

    pub fn display_label(&self) -> String {
        let formatted = self.at.format("%Y-%m-%d %H:%M:%S").to_string();
        if self.is_exif() {
            format!("{formatted} (EXIF)")
        } else {
            formatted
        }
    }
}

pub fn resolve_date(path: &Path) -> Option<ResolvedDate> {
    if is_image(path) {
        match read_exif_date(path) {
            Ok(Some(at)) => {
                return Some(ResolvedDate {
                    at,
                    source: DateSource::Exif,
                })
            }
            Ok(None) => debug!(path = %path.display(), "no EXIF date field"),
            Err(err) => debug!(path = %path.display(), "EXIF unavailable: {err:#}"),
        }
    }

    file_modified_to_local(path).map(|at| ResolvedDate {
        at,
        source: DateSource::FileModified,
    })
}

/// Dated entries ascend, undated entries sort after all of them.
pub fn compare_dates(a: Option<&ResolvedDate>, b: Option<&ResolvedDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.at.cmp(&b.at),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

pub fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn file_modified_to_local(path: &Path) -> Option<DateTime<Local>> {
    let time = fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::from(time))
}
