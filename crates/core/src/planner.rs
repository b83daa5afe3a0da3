use crate::config::RenameConfiguration;
use crate::enumerator::{CandidateFile, Enumerator};
use crate::metadata::{compare_dates, resolve_date, ResolvedDate};
use crate::naming::{compute_name, sequence_number, NamingContext};
use crate::progress::{CancelToken, ProgressEvent, Stage};
use anyhow::{bail, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct PlanEntry {
    pub source_path: PathBuf,
    pub new_name: String,
    pub resolved_date: Option<ResolvedDate>,
    pub size_bytes: u64,
}

impl PlanEntry {
    pub fn current_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn date_label(&self) -> String {
        self.resolved_date
            .as_ref()
            .map(ResolvedDate::display_label)
            .unwrap_or_else(|| "-".to_string())
    }
}

#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub file_count: usize,
    pub total_size_bytes: u64,
    pub average_size_bytes: u64,
    pub first_number: Option<u64>,
    pub last_number: Option<u64>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PreviewRow {
    pub display_index: usize,
    pub current_name: String,
    pub new_name: String,
    pub date_label: String,
    pub size_bytes: u64,
}

// no Clone: a plan is consumed by exactly one run
#[derive(Debug, Serialize)]
pub struct RenamePlan {
    config: RenameConfiguration,
    entries: Vec<PlanEntry>,
    stats: PlanStats,
}

impl RenamePlan {
    pub(crate) fn from_entries(config: RenameConfiguration, entries: Vec<PlanEntry>) -> Self {
        let stats = compute_stats(&config, &entries);
        Self {
            config,
            entries,
            stats,
        }
    }

    pub fn config(&self) -> &RenameConfiguration {
        &self.config
    }

    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn stats(&self) -> &PlanStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn new_names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.new_name.as_str()).collect()
    }

    pub fn preview_rows(&self) -> Vec<PreviewRow> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| PreviewRow {
                display_index: index + 1,
                current_name: entry.current_name(),
                new_name: entry.new_name.clone(),
                date_label: entry.date_label(),
                size_bytes: entry.size_bytes,
            })
            .collect()
    }

    pub(crate) fn into_parts(self) -> (RenameConfiguration, Vec<PlanEntry>) {
        (self.config, self.entries)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("plan build was cancelled")]
pub struct BuildCancelled;

pub fn build_plan(config: &RenameConfiguration) -> Result<RenamePlan> {
    build_plan_with(config, &CancelToken::new(), |_| {})
}

pub fn build_plan_with<F>(
    config: &RenameConfiguration,
    cancel: &CancelToken,
    mut on_progress: F,
) -> Result<RenamePlan>
where
    F: FnMut(ProgressEvent),
{
    config.validate()?;

    let enumerator = Enumerator::new(&config.source_path, &config.extension_filter);
    let mut candidates = Vec::<CandidateFile>::new();
    for candidate in enumerator.iter() {
        if cancel.is_cancelled() {
            bail!(BuildCancelled);
        }
        on_progress(ProgressEvent {
            processed: candidates.len() + 1,
            total: candidates.len() + 1,
            stage: Stage::Scanning,
            current: Some(candidate.path.clone()),
        });
        candidates.push(candidate);
    }

    resolve_dates(&mut candidates, cancel, &mut on_progress)?;
    sort_candidates(&mut candidates);

    let mut ctx = NamingContext::new();
    let entries = candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| PlanEntry {
            new_name: compute_name(&candidate, index, config, &mut ctx),
            source_path: candidate.path,
            resolved_date: candidate.resolved_date,
            size_bytes: candidate.size_bytes,
        })
        .collect::<Vec<_>>();

    info!(
        source = %config.source_path.display(),
        files = entries.len(),
        "rename plan built"
    );
    Ok(RenamePlan::from_entries(config.clone(), entries))
}

fn resolve_dates<F>(
    candidates: &mut [CandidateFile],
    cancel: &CancelToken,
    on_progress: &mut F,
) -> Result<()>
where
    F: FnMut(ProgressEvent),
{
    let total = candidates.len();
    let paths: Vec<PathBuf> = candidates.iter().map(|c| c.path.clone()).collect();
    let worker_cancel = cancel.clone();
    let (tx, rx) = mpsc::channel::<(usize, Option<ResolvedDate>)>();

    let worker = std::thread::spawn(move || {
        paths
            .into_par_iter()
            .enumerate()
            .for_each_with(tx, |sender, (index, path)| {
                if worker_cancel.is_cancelled() {
                    return;
                }
                let _ = sender.send((index, resolve_date(&path)));
            });
    });

    let mut resolved = 0usize;
    for (index, date) in rx {
        candidates[index].resolved_date = date;
        resolved += 1;
        on_progress(ProgressEvent {
            processed: resolved,
            total,
            stage: Stage::ResolvingDates,
            current: Some(candidates[index].path.clone()),
        });
    }

    if worker.join().is_err() {
        bail!("date resolution worker panicked");
    }
    if cancel.is_cancelled() {
        bail!(BuildCancelled);
    }
    Ok(())
}

// oldest first, undated last; name and path ties keep the order traversal-independent
pub(crate) fn sort_candidates(candidates: &mut [CandidateFile]) {
    candidates.sort_by(|a, b| {
        compare_dates(a.resolved_date.as_ref(), b.resolved_date.as_ref())
            .then_with(|| file_name_of(&a.path).cmp(&file_name_of(&b.path)))
            .then_with(|| a.path.cmp(&b.path))
    });
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn compute_stats(config: &RenameConfiguration, entries: &[PlanEntry]) -> PlanStats {
    let file_count = entries.len();
    let total_size_bytes: u64 = entries.iter().map(|e| e.size_bytes).sum();
    let average_size_bytes = if file_count == 0 {
        0
    } else {
        total_size_bytes / file_count as u64
    };
    let (first_number, last_number) = if config.sequential_mode && file_count > 0 {
        (
            Some(sequence_number(config, 0)),
            Some(sequence_number(config, file_count - 1)),
        )
    } else {
        (None, None)
    };

    PlanStats {
        file_count,
        total_size_bytes,
        average_size_bytes,
        first_number,
        last_number,
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["KB", "MB", "GB", "TB"];
    if bytes < 1000 {
        return format!("{bytes} bytes");
    }

    let mut value = bytes as f64 / 1000.0;
    let mut unit = 0usize;
    while value >= 1000.0 && unit + 1 < UNITS.len() {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NonSequentialPattern;
    use crate::exif_reader::fixtures::jpeg_with_exif;
    use crate::metadata::DateSource;
    use chrono::{DateTime, Local};
    use std::fs::{self, File};
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::tempdir;

    fn write_with_mtime(path: &Path, body: &[u8], secs: u64) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dirs must be creatable");
        }
        fs::write(path, body).expect("write");
        File::options()
            .write(true)
            .open(path)
            .expect("open")
            .set_modified(UNIX_EPOCH + Duration::from_secs(secs))
            .expect("set mtime");
    }

    fn sequential_config(source: &Path) -> RenameConfiguration {
        RenameConfiguration {
            basename: "Test".to_string(),
            number_padding: 3,
            start_number: 1,
            source_path: source.to_path_buf(),
            ..RenameConfiguration::default()
        }
    }

    fn candidate(name: &str, secs: Option<i64>) -> CandidateFile {
        CandidateFile {
            path: PathBuf::from("/src").join(name),
            is_hidden: false,
            is_dotfile: false,
            resolved_date: secs.map(|s| ResolvedDate {
                at: DateTime::from_timestamp(s, 0)
                    .expect("valid timestamp")
                    .with_timezone(&Local),
                source: DateSource::FileModified,
            }),
            size_bytes: 0,
        }
    }

    #[test]
    fn sorts_by_date_then_undated_then_name() {
        let mut candidates = vec![
            candidate("z.jpg", None),
            candidate("c.jpg", Some(2_000)),
            candidate("a.jpg", None),
            candidate("b.jpg", Some(2_000)),
            candidate("d.jpg", Some(1_000)),
        ];
        sort_candidates(&mut candidates);
        let order: Vec<String> = candidates.iter().map(|c| c.file_name()).collect();
        assert_eq!(order, vec!["d.jpg", "b.jpg", "c.jpg", "a.jpg", "z.jpg"]);
    }

    #[test]
    fn numbering_follows_modification_time() {
        let temp = tempdir().expect("tempdir");
        write_with_mtime(&temp.path().join("A.jpg"), b"a", 2_000);
        write_with_mtime(&temp.path().join("B.jpg"), b"b", 1_000);

        let plan = build_plan(&sequential_config(temp.path())).expect("plan");
        let pairs: Vec<(String, String)> = plan
            .entries()
            .iter()
            .map(|e| (e.current_name(), e.new_name.clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("B.jpg".to_string(), "Test_001.jpg".to_string()),
                ("A.jpg".to_string(), "Test_002.jpg".to_string()),
            ]
        );
    }

    #[test]
    fn exif_capture_date_orders_ahead_of_modification_time() {
        let temp = tempdir().expect("tempdir");
        let src = temp.path();
        // oldest on disk, but shot in 2015
        write_with_mtime(
            &src.join("a.jpg"),
            &jpeg_with_exif(None, Some("2015:06:01 12:00:00")),
            1_000,
        );
        // no EXIF, modified in 2000
        write_with_mtime(&src.join("b.png"), b"x", 946_684_800);

        let plan = build_plan(&sequential_config(src)).expect("plan");
        let pairs: Vec<(String, &str)> = plan
            .entries()
            .iter()
            .map(|e| (e.current_name(), e.new_name.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("b.png".to_string(), "Test_001.png"),
                ("a.jpg".to_string(), "Test_002.jpg"),
            ]
        );
        assert!(plan.entries()[1].date_label().ends_with("(EXIF)"));
        assert!(!plan.entries()[0].date_label().ends_with("(EXIF)"));
    }

    #[test]
    fn empty_folder_gives_empty_plan() {
        let temp = tempdir().expect("tempdir");
        let plan = build_plan(&sequential_config(temp.path())).expect("plan");
        assert!(plan.is_empty());
        assert_eq!(plan.stats(), &PlanStats::default());
    }

    #[test]
    fn invalid_configuration_is_rejected_before_scanning() {
        let temp = tempdir().expect("tempdir");
        let mut config = sequential_config(temp.path());
        config.basename.clear();
        let err = build_plan(&config).expect_err("must fail");
        assert!(err.downcast_ref::<crate::config::ConfigError>().is_some());
    }

    #[test]
    fn stats_cover_sizes_and_sequence_range() {
        let temp = tempdir().expect("tempdir");
        write_with_mtime(&temp.path().join("a.txt"), &[0u8; 100], 1);
        write_with_mtime(&temp.path().join("b.txt"), &[0u8; 300], 2);

        let mut config = sequential_config(temp.path());
        config.start_number = 10;
        let plan = build_plan(&config).expect("plan");
        assert_eq!(
            plan.stats(),
            &PlanStats {
                file_count: 2,
                total_size_bytes: 400,
                average_size_bytes: 200,
                first_number: Some(10),
                last_number: Some(11),
            }
        );

        config.sequential_mode = false;
        let plan = build_plan(&config).expect("plan");
        assert_eq!(plan.stats().first_number, None);
    }

    #[test]
    fn preview_rows_are_one_based_with_date_labels() {
        let temp = tempdir().expect("tempdir");
        write_with_mtime(&temp.path().join("note.txt"), b"hello", 5);

        let plan = build_plan(&sequential_config(temp.path())).expect("plan");
        let rows = plan.preview_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].display_index, 1);
        assert_eq!(rows[0].current_name, "note.txt");
        assert_eq!(rows[0].new_name, "Test_001.txt");
        assert_eq!(rows[0].size_bytes, 5);
        assert!(!rows[0].date_label.ends_with("(EXIF)"));
        assert_ne!(rows[0].date_label, "-");
    }

    #[test]
    fn progress_reports_scan_and_date_stages() {
        let temp = tempdir().expect("tempdir");
        write_with_mtime(&temp.path().join("a.txt"), b"a", 1);
        write_with_mtime(&temp.path().join("sub/b.txt"), b"b", 2);

        let mut events = Vec::new();
        build_plan_with(&sequential_config(temp.path()), &CancelToken::new(), |e| {
            events.push(e)
        })
        .expect("plan");

        let dates: Vec<usize> = events
            .iter()
            .filter(|e| e.stage == Stage::ResolvingDates)
            .map(|e| e.processed)
            .collect();
        assert_eq!(dates, vec![1, 2]);
        assert_eq!(
            events.iter().filter(|e| e.stage == Stage::Scanning).count(),
            2
        );
    }

    #[test]
    fn cancelled_build_reports_cancellation() {
        let temp = tempdir().expect("tempdir");
        write_with_mtime(&temp.path().join("a.txt"), b"a", 1);

        let cancel = CancelToken::new();
        cancel.cancel();
        let err = build_plan_with(&sequential_config(temp.path()), &cancel, |_| {})
            .expect_err("cancelled");
        assert!(err.downcast_ref::<BuildCancelled>().is_some());
    }

    #[test]
    fn plan_keeps_its_own_configuration() {
        let temp = tempdir().expect("tempdir");
        write_with_mtime(&temp.path().join("a.txt"), b"a", 1);

        let mut config = sequential_config(temp.path());
        let plan = build_plan(&config).expect("plan");
        config.basename = "Changed".to_string();
        assert_eq!(plan.config().basename, "Test");
        assert_eq!(plan.new_names(), vec!["Test_001.txt"]);
    }

    #[test]
    fn date_time_pattern_names_from_modification_time() {
        let temp = tempdir().expect("tempdir");
        write_with_mtime(&temp.path().join("a.txt"), b"a", 86_400 * 365);
        write_with_mtime(&temp.path().join("b.txt"), b"b", 86_400 * 365);

        let config = RenameConfiguration {
            sequential_mode: false,
            non_sequential_pattern: NonSequentialPattern::DateTime,
            source_path: temp.path().to_path_buf(),
            ..RenameConfiguration::default()
        };
        let plan = build_plan(&config).expect("plan");
        let names = plan.new_names();
        assert_eq!(names.len(), 2);
        assert_ne!(names[0], names[1]);
        assert!(names[1].ends_with("_001.txt"));
    }

    #[test]
    fn format_bytes_uses_decimal_units() {
        assert_eq!(format_bytes(0), "0 bytes");
        assert_eq!(format_bytes(999), "999 bytes");
        assert_eq!(format_bytes(1_500), "1.5 KB");
        assert_eq!(format_bytes(2_000_000), "2.0 MB");
        assert_eq!(format_bytes(3_200_000_000_000_000), "3200.0 TB");
    }
}
