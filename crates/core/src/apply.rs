use crate::config::RenameConfiguration;
use crate::planner::{PlanEntry, RenamePlan};
use crate::progress::{CancelToken, ProgressEvent, Stage};
use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum ExecutionStatus {
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileFailure {
    pub source_path: PathBuf,
    pub destination: Option<PathBuf>,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub status: ExecutionStatus,
    pub total: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub unchanged: usize,
    pub failures: Vec<FileFailure>,
    pub error: Option<String>,
}

impl ExecutionReport {
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.status == ExecutionStatus::Completed && self.failures.is_empty()
    }
}

enum Outcome {
    Applied,
    Unchanged,
}

pub fn execute<F>(plan: RenamePlan, cancel: &CancelToken, mut on_progress: F) -> ExecutionReport
where
    F: FnMut(ProgressEvent),
{
    let (config, entries) = plan.into_parts();
    let total = entries.len();

    if let Err(err) = prepare_output(&config) {
        warn!("rename run could not start: {err:#}");
        return failed_report(&entries, &config, format!("{err:#}"));
    }

    let stage = if config.rename_in_place {
        Stage::Renaming
    } else {
        Stage::Copying
    };
    let mut report = ExecutionReport {
        status: ExecutionStatus::Completed,
        total,
        processed: 0,
        succeeded: 0,
        unchanged: 0,
        failures: Vec::new(),
        error: None,
    };

    let in_run: HashSet<&Path> = if config.rename_in_place {
        entries.iter().map(|e| e.source_path.as_path()).collect()
    } else {
        HashSet::new()
    };
    let mut staged = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        if cancel.is_cancelled() {
            report.status = ExecutionStatus::Cancelled;
            break;
        }

        let outcome = match held_by_run(entry, &config, &in_run) {
            Some(destination) => match stage_entry(entry, index) {
                Ok(temp_path) => {
                    staged.push(StagedRename {
                        entry,
                        temp_path,
                        destination,
                    });
                    continue;
                }
                Err(err) => Err(err),
            },
            None => apply_entry(entry, &config),
        };
        record(&mut report, entry, &config, stage, outcome, &mut on_progress);
    }

    // staged files already left their old name, so they are finished even after a cancel
    for rename in &staged {
        let outcome = finish_staged(rename);
        record(
            &mut report,
            rename.entry,
            &config,
            stage,
            outcome,
            &mut on_progress,
        );
    }

    info!(
        status = ?report.status,
        processed = report.processed,
        succeeded = report.succeeded,
        failed = report.failures.len(),
        "rename run finished"
    );
    report
}

fn record<F>(
    report: &mut ExecutionReport,
    entry: &PlanEntry,
    config: &RenameConfiguration,
    stage: Stage,
    outcome: Result<Outcome>,
    on_progress: &mut F,
) where
    F: FnMut(ProgressEvent),
{
    match outcome {
        Ok(Outcome::Applied) => report.succeeded += 1,
        Ok(Outcome::Unchanged) => report.unchanged += 1,
        Err(err) => {
            warn!(source = %entry.source_path.display(), "rename failed: {err:#}");
            report.failures.push(FileFailure {
                source_path: entry.source_path.clone(),
                destination: destination_for(entry, config).ok(),
                reason: format!("{err:#}"),
            });
        }
    }

    report.processed += 1;
    on_progress(ProgressEvent {
        processed: report.processed,
        total: report.total,
        stage,
        current: Some(entry.source_path.clone()),
    });
}

fn prepare_output(config: &RenameConfiguration) -> Result<()> {
    if config.rename_in_place {
        return Ok(());
    }
    let output = config
        .output_path
        .as_deref()
        .context("an output folder is required when not renaming in place")?;
    fs::create_dir_all(output)
        .with_context(|| format!("could not create output folder: {}", output.display()))?;
    Ok(())
}

struct StagedRename<'a> {
    entry: &'a PlanEntry,
    temp_path: PathBuf,
    destination: PathBuf,
}

// in place only: the destination is the current name of another file in this run
fn held_by_run(
    entry: &PlanEntry,
    config: &RenameConfiguration,
    in_run: &HashSet<&Path>,
) -> Option<PathBuf> {
    let destination = destination_for(entry, config).ok()?;
    if destination != entry.source_path && in_run.contains(destination.as_path()) {
        Some(destination)
    } else {
        None
    }
}

fn stage_entry(entry: &PlanEntry, index: usize) -> Result<PathBuf> {
    ensure_utf8_extension(&entry.source_path)?;
    let temp_path = temp_path_for(&entry.source_path, index);
    if fs::symlink_metadata(&temp_path).is_ok() {
        bail!("temporary name already exists: {}", temp_path.display());
    }
    fs::rename(&entry.source_path, &temp_path).with_context(|| {
        format!(
            "could not stage {} -> {}",
            entry.source_path.display(),
            temp_path.display()
        )
    })?;
    Ok(temp_path)
}

fn finish_staged(rename: &StagedRename<'_>) -> Result<Outcome> {
    let source = &rename.entry.source_path;
    let result = if fs::symlink_metadata(&rename.destination).is_ok() {
        Err(anyhow!(
            "destination already exists: {}",
            rename.destination.display()
        ))
    } else {
        fs::rename(&rename.temp_path, &rename.destination).with_context(|| {
            format!(
                "could not rename {} -> {}",
                source.display(),
                rename.destination.display()
            )
        })
    };

    match result {
        Ok(()) => Ok(Outcome::Applied),
        Err(err) => match fs::rename(&rename.temp_path, source) {
            Ok(()) => Err(err),
            Err(restore) => Err(err.context(format!(
                "file left at {}: could not restore its name: {restore}",
                rename.temp_path.display()
            ))),
        },
    }
}

fn temp_path_for(source: &Path, index: usize) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let parent = source.parent().unwrap_or_else(|| Path::new("."));
    let file_name = source
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    parent.join(format!(".renamr_tmp_{}_{}_{}", now, index, file_name))
}

// new names are built as UTF-8, so any other extension would not survive verbatim
fn ensure_utf8_extension(source: &Path) -> Result<()> {
    match source.extension() {
        Some(ext) if ext.to_str().is_none() => bail!(
            "extension is not valid UTF-8 and cannot be kept: {}",
            source.display()
        ),
        _ => Ok(()),
    }
}

fn apply_entry(entry: &PlanEntry, config: &RenameConfiguration) -> Result<Outcome> {
    ensure_utf8_extension(&entry.source_path)?;
    let destination = destination_for(entry, config)?;
    if destination == entry.source_path {
        return Ok(Outcome::Unchanged);
    }

    if fs::symlink_metadata(&destination).is_ok()
        && !is_same_file(&entry.source_path, &destination)
    {
        bail!("destination already exists: {}", destination.display());
    }

    if config.rename_in_place {
        fs::rename(&entry.source_path, &destination).with_context(|| {
            format!(
                "could not rename {} -> {}",
                entry.source_path.display(),
                destination.display()
            )
        })?;
    } else {
        fs::copy(&entry.source_path, &destination).with_context(|| {
            format!(
                "could not copy {} -> {}",
                entry.source_path.display(),
                destination.display()
            )
        })?;
    }

    Ok(Outcome::Applied)
}

pub fn destination_for(entry: &PlanEntry, config: &RenameConfiguration) -> Result<PathBuf> {
    let dir = if config.rename_in_place {
        entry.source_path.parent().with_context(|| {
            format!(
                "source has no parent folder: {}",
                entry.source_path.display()
            )
        })?
    } else {
        config
            .output_path
            .as_deref()
            .context("an output folder is required when not renaming in place")?
    };
    Ok(dir.join(&entry.new_name))
}

// case-only renames on case-insensitive volumes resolve to the same file
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn failed_report(
    entries: &[PlanEntry],
    config: &RenameConfiguration,
    reason: String,
) -> ExecutionReport {
    ExecutionReport {
        status: ExecutionStatus::Failed,
        total: entries.len(),
        processed: 0,
        succeeded: 0,
        unchanged: 0,
        failures: entries
            .iter()
            .map(|entry| FileFailure {
                source_path: entry.source_path.clone(),
                destination: destination_for(entry, config).ok(),
                reason: reason.clone(),
            })
            .collect(),
        error: Some(reason),
    }
}
