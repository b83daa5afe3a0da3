use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use renamr_core::{
    app_paths, default_basename_for, format_bytes, load_defaults, save_defaults, BasenamePreset,
    ExecutionReport, ExecutionStatus, NonSequentialPattern, RenamePlan, RenameSession,
};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "renamr-cli")]
#[command(about = "Batch-rename files with sequential numbers, capture dates or random names")]
struct Cli {
    #[arg(long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Rename(RenameArgs),
    Presets,
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    Show,
    Init,
}

#[derive(Debug, Args)]
struct RenameArgs {
    source: PathBuf,
    /// Copy renamed files here instead of renaming in place
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, conflicts_with = "preset")]
    basename: Option<String>,
    #[arg(long, value_enum)]
    preset: Option<PresetArg>,
    #[arg(long)]
    padding: Option<u32>,
    #[arg(long)]
    start: Option<u64>,
    /// Name by date/time or random string instead of sequential numbers
    #[arg(long, value_enum)]
    pattern: Option<PatternArg>,
    #[arg(long)]
    random_length: Option<usize>,
    #[arg(long, default_value = "")]
    ext: String,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    format: OutputFormat,
    #[arg(long, default_value_t = false)]
    apply: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PatternArg {
    DateTime,
    Random,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    Manual,
    TimelapseSequence,
    DateSequence,
    Img,
    Photo,
    Scan,
}

impl From<PresetArg> for BasenamePreset {
    fn from(value: PresetArg) -> Self {
        match value {
            PresetArg::Manual => BasenamePreset::Manual,
            PresetArg::TimelapseSequence => BasenamePreset::TimelapseSequence,
            PresetArg::DateSequence => BasenamePreset::DateSequence,
            PresetArg::Img => BasenamePreset::Img,
            PresetArg::Photo => BasenamePreset::Photo,
            PresetArg::Scan => BasenamePreset::Scan,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Rename(args) => cmd_rename(args),
        Commands::Presets => cmd_presets(),
        Commands::Config(config) => match config.action {
            ConfigAction::Show => cmd_config_show(),
            ConfigAction::Init => cmd_config_init(),
        },
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_rename(args: RenameArgs) -> Result<()> {
    let defaults = load_defaults()?;
    let mut config = defaults.to_configuration(&args.source);

    config.basename = match (&args.basename, args.preset) {
        (Some(basename), _) => basename.clone(),
        (None, Some(preset)) => BasenamePreset::from(preset).basename(),
        (None, None) => default_basename_for(&args.source),
    };
    if let Some(padding) = args.padding {
        config.number_padding = padding;
    }
    if let Some(start) = args.start {
        config.start_number = start;
    }
    if let Some(pattern) = args.pattern {
        config.sequential_mode = false;
        config.non_sequential_pattern = match pattern {
            PatternArg::DateTime => NonSequentialPattern::DateTime,
            PatternArg::Random => NonSequentialPattern::Random,
        };
    }
    if let Some(length) = args.random_length {
        config.random_name_length = length;
    }
    config.extension_filter = args.ext;
    config.rename_in_place = args.output.is_none();
    config.output_path = args.output;

    let session = RenameSession::new();
    let build = session.build_plan(config)?;
    for event in build.events.iter() {
        debug!(stage = event.stage.label(), processed = event.processed, total = event.total);
    }
    let plan = build.wait()??;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Table => print_table(&plan),
    }

    if !args.apply {
        eprintln!("dry run: no files were changed. Pass --apply to rename.");
        return Ok(());
    }
    if plan.is_empty() {
        eprintln!("nothing to rename");
        return Ok(());
    }

    let run = session.execute(plan)?;
    for event in run.events.iter() {
        eprintln!(
            "{} {}/{} ({:.0}%)",
            event.stage.label(),
            event.processed,
            event.total,
            event.fraction() * 100.0
        );
    }
    let report = run.wait()?;
    print_report(&report);

    match report.status {
        ExecutionStatus::Failed => bail!(
            "rename run failed: {}",
            report.error.as_deref().unwrap_or("unknown error")
        ),
        _ if !report.failures.is_empty() => {
            bail!("{} file(s) could not be renamed", report.failed_count())
        }
        _ => Ok(()),
    }
}

fn cmd_presets() -> Result<()> {
    for preset in BasenamePreset::ALL {
        println!("{:<28} {}", preset.display_name(), preset.basename());
    }
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let defaults = load_defaults()?;
    let paths = app_paths()?;
    println!("defaults file: {}", paths.config_path.display());
    println!("{}", toml::to_string_pretty(&defaults)?);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let defaults = load_defaults()?;
    save_defaults(&defaults)?;
    let paths = app_paths()?;
    println!("wrote {}", paths.config_path.display());
    Ok(())
}

fn print_table(plan: &RenamePlan) {
    println!("#    current -> new  [date, size]");
    for row in plan.preview_rows() {
        println!(
            "{:<4} {} -> {}  [{}, {}]",
            row.display_index,
            row.current_name,
            row.new_name,
            row.date_label,
            format_bytes(row.size_bytes)
        );
    }

    let stats = plan.stats();
    let mut summary = format!(
        "\nfiles={} total={} average={}",
        stats.file_count,
        format_bytes(stats.total_size_bytes),
        format_bytes(stats.average_size_bytes)
    );
    if let (Some(first), Some(last)) = (stats.first_number, stats.last_number) {
        summary.push_str(&format!(" first={first} last={last}"));
    }
    println!("{summary}");
}

fn print_report(report: &ExecutionReport) {
    println!(
        "{:?}: processed={}/{} succeeded={} unchanged={} failed={}",
        report.status,
        report.processed,
        report.total,
        report.succeeded,
        report.unchanged,
        report.failed_count()
    );
    for failure in &report.failures {
        println!("  {}: {}", failure.source_path.display(), failure.reason);
    }
}
