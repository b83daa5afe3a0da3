use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BasenamePreset {
    Manual,
    TimelapseSequence,
    DateSequence,
    Img,
    Photo,
    Scan,
}

impl BasenamePreset {
    pub const ALL: [BasenamePreset; 6] = [
        BasenamePreset::Manual,
        BasenamePreset::TimelapseSequence,
        BasenamePreset::DateSequence,
        BasenamePreset::Img,
        BasenamePreset::Photo,
        BasenamePreset::Scan,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            BasenamePreset::Manual => "Manual Entry",
            BasenamePreset::TimelapseSequence => "Time Lapse Sequence",
            BasenamePreset::DateSequence => "Date Sequence (YYYYMMDD_)",
            BasenamePreset::Img => "Simple (IMG_)",
            BasenamePreset::Photo => "Photo_",
            BasenamePreset::Scan => "Scan_",
        }
    }

    pub fn is_dated(self) -> bool {
        matches!(
            self,
            BasenamePreset::TimelapseSequence | BasenamePreset::DateSequence
        )
    }

    pub fn basename(self) -> String {
        self.basename_on(Local::now().date_naive())
    }

    pub fn basename_on(self, today: NaiveDate) -> String {
        let stamp = today.format("%Y%m%d");
        match self {
            BasenamePreset::Manual => String::new(),
            BasenamePreset::TimelapseSequence => format!("{stamp}1CO_"),
            BasenamePreset::DateSequence => format!("{stamp}_"),
            BasenamePreset::Img => "IMG_".to_string(),
            BasenamePreset::Photo => "Photo_".to_string(),
            BasenamePreset::Scan => "Scan_".to_string(),
        }
    }
}

pub fn default_basename_for(folder: &Path) -> String {
    let name = folder
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default();
    match name.split_once('_') {
        Some((head, _)) => head.to_string(),
        None => name,
    }
}
