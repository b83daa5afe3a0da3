use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const PADDING_RANGE: std::ops::RangeInclusive<u32> = 1..=10;
pub const RANDOM_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 4..=16;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NonSequentialPattern {
    #[default]
    DateTime,
    Random,
}

impl NonSequentialPattern {
    pub fn display_name(self) -> &'static str {
        match self {
            NonSequentialPattern::DateTime => "Date & Time",
            NonSequentialPattern::Random => "Random",
        }
    }
}

/// Snapshot of everything one build/run needs. A plan keeps its own clone, so
/// editing the caller's copy afterwards never changes an already built plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenameConfiguration {
    pub sequential_mode: bool,
    pub basename: String,
    pub number_padding: u32,
    pub start_number: u64,
    pub non_sequential_pattern: NonSequentialPattern,
    pub random_name_length: usize,
    pub extension_filter: String,
    pub rename_in_place: bool,
    pub source_path: PathBuf,
    pub output_path: Option<PathBuf>,
}

impl Default for RenameConfiguration {
    fn default() -> Self {
        Self {
            sequential_mode: true,
            basename: String::new(),
            number_padding: 4,
            start_number: 1,
            non_sequential_pattern: NonSequentialPattern::DateTime,
            random_name_length: 8,
            extension_filter: String::new(),
            rename_in_place: true,
            source_path: PathBuf::new(),
            output_path: None,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("source folder is not set")]
    MissingSource,
    #[error("source folder does not exist or is not a folder: {0}")]
    SourceNotDirectory(PathBuf),
    #[error("an output folder is required when not renaming in place")]
    MissingOutput,
    #[error("a basename is required in sequential mode")]
    EmptyBasename,
    #[error("number padding must be between 1 and 10: {0}")]
    PaddingOutOfRange(u32),
    #[error("start number must be at least 1")]
    StartNumberOutOfRange,
    #[error("random name length must be between 4 and 16: {0}")]
    RandomLengthOutOfRange(usize),
}

impl RenameConfiguration {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingSource);
        }
        if !self.source_path.is_dir() {
            return Err(ConfigError::SourceNotDirectory(self.source_path.clone()));
        }
        if !self.rename_in_place && self.output_path.is_none() {
            return Err(ConfigError::MissingOutput);
        }

        if self.sequential_mode {
            if self.basename.trim().is_empty() {
                return Err(ConfigError::EmptyBasename);
            }
            if !PADDING_RANGE.contains(&self.number_padding) {
                return Err(ConfigError::PaddingOutOfRange(self.number_padding));
            }
            if self.start_number < 1 {
                return Err(ConfigError::StartNumberOutOfRange);
            }
        } else if self.non_sequential_pattern == NonSequentialPattern::Random
            && !RANDOM_LENGTH_RANGE.contains(&self.random_name_length)
        {
            return Err(ConfigError::RandomLengthOutOfRange(
                self.random_name_length,
            ));
        }

        Ok(())
    }

    pub fn normalized_extension_filter(&self) -> Option<String> {
        normalize_extension_filter(&self.extension_filter)
    }
}

pub(crate) fn normalize_extension_filter(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppDefaults {
    pub number_padding: u32,
    pub start_number: u64,
    pub random_name_length: usize,
    pub non_sequential_pattern: NonSequentialPattern,
    pub rename_in_place: bool,
}

impl Default for AppDefaults {
    fn default() -> Self {
        let base = RenameConfiguration::default();
        Self {
            number_padding: base.number_padding,
            start_number: base.start_number,
            random_name_length: base.random_name_length,
            non_sequential_pattern: base.non_sequential_pattern,
            rename_in_place: base.rename_in_place,
        }
    }
}

impl AppDefaults {
    pub fn to_configuration(&self, source_path: impl Into<PathBuf>) -> RenameConfiguration {
        RenameConfiguration {
            number_padding: self.number_padding,
            start_number: self.start_number,
            random_name_length: self.random_name_length,
            non_sequential_pattern: self.non_sequential_pattern,
            rename_in_place: self.rename_in_place,
            source_path: source_path.into(),
            ..RenameConfiguration::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "renamr", "renamr")
        .context("could not determine the OS config directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("defaults.toml"),
        config_dir,
    })
}

pub fn load_defaults() -> Result<AppDefaults> {
    let paths = app_paths()?;
    load_defaults_from(&paths.config_path)
}

pub fn save_defaults(defaults: &AppDefaults) -> Result<()> {
    let paths = app_paths()?;
    save_defaults_to(defaults, &paths.config_path)
}

pub fn load_defaults_from(path: &Path) -> Result<AppDefaults> {
    if !path.exists() {
        return Ok(AppDefaults::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read defaults file: {}", path.display()))?;
    let defaults = toml::from_str::<AppDefaults>(&raw)
        .with_context(|| format!("could not parse defaults file: {}", path.display()))?;
    Ok(defaults)
}

pub fn save_defaults_to(defaults: &AppDefaults, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("could not create config directory: {}", dir.display()))?;
    }
    let body = toml::to_string_pretty(defaults).context("could not serialize defaults")?;
    fs::write(path, body)
        .with_context(|| format!("could not write defaults file: {}", path.display()))?;
    Ok(())
}
