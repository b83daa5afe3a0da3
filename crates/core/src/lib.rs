mod apply;
mod config;
mod enumerator;
mod exif_reader;
mod metadata;
mod naming;
mod planner;
mod preset;
mod progress;
mod sanitize;
mod session;

pub use apply::{destination_for, execute, ExecutionReport, ExecutionStatus, FileFailure};
pub use config::{
    app_paths, load_defaults, load_defaults_from, save_defaults, save_defaults_to, AppDefaults,
    AppPaths, ConfigError, NonSequentialPattern, RenameConfiguration,
};
pub use enumerator::{CandidateFile, Enumerator};
pub use metadata::{resolve_date, DateSource, ResolvedDate};
pub use naming::{compute_name, NamingContext};
pub use planner::{
    build_plan, build_plan_with, format_bytes, BuildCancelled, PlanEntry, PlanStats, PreviewRow,
    RenamePlan,
};
pub use preset::{default_basename_for, BasenamePreset};
pub use progress::{CancelToken, ProgressEvent, Stage};
pub use session::{RenameSession, SessionError, SessionState, TaskHandle};
