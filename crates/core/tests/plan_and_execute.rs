use renamr_core::{
    build_plan, execute, CancelToken, ExecutionStatus, NonSequentialPattern, RenameConfiguration,
};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};
use tempfile::tempdir;

fn create_file(dir: &Path, name: &str, mtime_secs: Option<u64>) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dirs must be creatable");
    }
    let file = File::create(&path).expect("file must be creatable");
    if let Some(secs) = mtime_secs {
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
            .expect("set mtime");
    }
}

fn sequential(source: &Path) -> RenameConfiguration {
    RenameConfiguration {
        sequential_mode: true,
        basename: "Test".to_string(),
        number_padding: 3,
        start_number: 1,
        source_path: source.to_path_buf(),
        ..RenameConfiguration::default()
    }
}

fn file_names(dir: &Path) -> HashSet<String> {
    fs::read_dir(dir)
        .expect("read dir")
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect()
}

#[test]
fn sequential_plan_follows_modification_order() {
    let temp = tempdir().expect("tempdir");
    create_file(temp.path(), "A.jpg", Some(2_000));
    create_file(temp.path(), "B.jpg", Some(1_000));

    let plan = build_plan(&sequential(temp.path())).expect("plan");
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
fn hidden_and_dot_files_are_ignored() {
    let temp = tempdir().expect("tempdir");
    create_file(temp.path(), ".DS_Store", None);
    create_file(temp.path(), "visible.txt", None);

    let plan = build_plan(&sequential(temp.path())).expect("plan");
    assert_eq!(plan.len(), 1);
    assert_eq!(plan.entries()[0].current_name(), "visible.txt");
}

#[test]
fn folder_of_only_dotfiles_gives_empty_plan() {
    let temp = tempdir().expect("tempdir");
    create_file(temp.path(), ".DS_Store", None);
    create_file(temp.path(), ".hidden/photo.jpg", None);
    create_file(temp.path(), ".localized", None);

    let plan = build_plan(&sequential(temp.path())).expect("plan");
    assert!(plan.is_empty());
}

#[test]
fn copy_mode_leaves_the_source_in_place() {
    let temp = tempdir().expect("tempdir");
    let source = temp.path().join("source");
    let output = temp.path().join("output");
    create_file(&source, "A.jpg", Some(1_000));

    let mut config = sequential(&source);
    config.rename_in_place = false;
    config.output_path = Some(output.clone());

    let plan = build_plan(&config).expect("plan");
    let new_name = plan.entries()[0].new_name.clone();
    let report = execute(plan, &CancelToken::new(), |_| {});

    assert_eq!(report.status, ExecutionStatus::Completed);
    assert!(source.join("A.jpg").exists());
    assert!(output.join(&new_name).exists());
}

#[test]
fn extension_filter_keeps_only_matching_files() {
    let temp = tempdir().expect("tempdir");
    create_file(temp.path(), "one.jpg", Some(1));
    create_file(temp.path(), "two.JPG", Some(2));
    create_file(temp.path(), "three.png", Some(3));
    create_file(temp.path(), "four.jpeg", Some(4));
    create_file(temp.path(), "notes.txt", Some(5));

    let mut config = sequential(temp.path());
    config.extension_filter = "jpg".to_string();
    let plan = build_plan(&config).expect("plan");

    let names: Vec<String> = plan.entries().iter().map(|e| e.current_name()).collect();
    assert_eq!(names, vec!["one.jpg", "two.JPG"]);
    assert_eq!(plan.new_names(), vec!["Test_001.jpg", "Test_002.JPG"]);
}

#[test]
fn rebuilding_an_unchanged_tree_is_idempotent() {
    let temp = tempdir().expect("tempdir");
    for (i, name) in ["c.txt", "a.txt", "sub/b.txt", "d.txt"].iter().enumerate() {
        create_file(temp.path(), name, Some(100 + (i as u64 % 2)));
    }

    let config = sequential(temp.path());
    let first = build_plan(&config).expect("plan");
    let second = build_plan(&config).expect("plan");
    assert_eq!(first.new_names(), second.new_names());
    let first_sources: Vec<_> = first.entries().iter().map(|e| &e.source_path).collect();
    let second_sources: Vec<_> = second.entries().iter().map(|e| &e.source_path).collect();
    assert_eq!(first_sources, second_sources);
}

#[test]
fn random_names_are_unique_within_a_plan() {
    let temp = tempdir().expect("tempdir");
    for i in 0..200 {
        create_file(temp.path(), &format!("file{i}.dat"), None);
    }

    let config = RenameConfiguration {
        sequential_mode: false,
        non_sequential_pattern: NonSequentialPattern::Random,
        random_name_length: 4,
        source_path: temp.path().to_path_buf(),
        ..RenameConfiguration::default()
    };
    let plan = build_plan(&config).expect("plan");
    let unique: HashSet<&str> = plan.new_names().into_iter().collect();
    assert_eq!(unique.len(), 200);
}

#[test]
fn in_place_run_leaves_exactly_the_planned_names() {
    let temp = tempdir().expect("tempdir");
    let names = ["zeta.png", "alpha.png", "mid.png"];
    for (i, name) in names.iter().enumerate() {
        create_file(temp.path(), name, Some(10 * (i as u64 + 1)));
    }

    let plan = build_plan(&sequential(temp.path())).expect("plan");
    let planned: HashSet<String> = plan.new_names().into_iter().map(String::from).collect();
    let report = execute(plan, &CancelToken::new(), |_| {});

    assert!(report.is_clean());
    assert_eq!(file_names(temp.path()), planned);
    for old in names {
        assert!(!temp.path().join(old).exists());
    }
}
