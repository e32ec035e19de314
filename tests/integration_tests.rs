use datetidy::cli::{Cli, run_cli};
use datetidy::output::OutputFormatter;
use datetidy::{
    CategorizeError, Categorizer, ChannelObserver, DateBucketer, ErrorClass, Mode,
    ProgressUpdate, RunState, SilentObserver,
};
/// Integration tests for datetidy
///
/// These tests run complete categorizations over temporary directory trees.
///
/// Test categories:
/// 1. Copy and move scenarios
/// 2. Progress reporting
/// 3. Idempotent skipping and the self-reference guard
/// 4. Configuration, dry-run and reports
/// 5. Validation and error scenarios
/// 6. Running the binary with redirected output
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::mpsc;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A test fixture with a source and a destination directory.
struct TestFixture {
    _temp_dir: TempDir,
    source: PathBuf,
    destination: PathBuf,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("source");
        let destination = temp_dir.path().join("destination");
        fs::create_dir(&source).expect("Failed to create source");
        fs::create_dir(&destination).expect("Failed to create destination");
        TestFixture {
            _temp_dir: temp_dir,
            source,
            destination,
        }
    }

    fn src(&self) -> &Path {
        &self.source
    }

    fn dst(&self) -> &Path {
        &self.destination
    }

    /// Create a file with content in the source directory.
    fn create_file(&self, name: &str, content: &str) {
        let mut file = File::create(self.source.join(name)).expect("Failed to create file");
        file.write_all(content.as_bytes())
            .expect("Failed to write file content");
    }

    /// Create a folder with one file inside in the source directory.
    fn create_folder(&self, name: &str) {
        let dir = self.source.join(name);
        fs::create_dir(&dir).expect("Failed to create folder");
        fs::write(dir.join("inner.txt"), name).expect("Failed to write inner file");
    }

    /// The bucket an entry of the source directory lands in.
    fn bucket_of(&self, name: &str) -> String {
        DateBucketer::default()
            .bucket_for(&self.source.join(name))
            .expect("Failed to compute bucket")
            .to_string()
    }

    /// `destination/OUTPUT/<bucket>/<name>`
    fn output_path(&self, bucket: &str, name: &str) -> PathBuf {
        self.destination.join("OUTPUT").join(bucket).join(name)
    }

    fn count_source_entries(&self) -> usize {
        fs::read_dir(&self.source)
            .expect("Failed to read directory")
            .count()
    }

    fn categorizer(&self, mode: Mode) -> Categorizer {
        Categorizer::new(&self.source, &self.destination, mode).expect("Failed to validate paths")
    }

    fn run(&self, mode: Mode) -> (datetidy::RunReport, Vec<ProgressUpdate>) {
        let mut updates = Vec::new();
        let report = self
            .categorizer(mode)
            .run(&mut |update: ProgressUpdate| updates.push(update))
            .expect("Run failed");
        (report, updates)
    }
}

// ============================================================================
// Test Suite 1: Copy and Move
// ============================================================================

#[test]
fn test_copy_file_and_folder() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");
    fixture.create_folder("b");
    let a_bucket = fixture.bucket_of("a.txt");
    let b_bucket = fixture.bucket_of("b");

    let (report, updates) = fixture.run(Mode::Copy);

    assert!(fixture.output_path(&a_bucket, "a.txt").is_file());
    assert!(fixture.output_path(&b_bucket, "b").is_dir());
    assert_eq!(
        fs::read_to_string(fixture.output_path(&b_bucket, "b").join("inner.txt")).unwrap(),
        "b"
    );

    // Source untouched
    assert!(fixture.src().join("a.txt").is_file());
    assert!(fixture.src().join("b").join("inner.txt").is_file());

    assert_eq!(report.total, 2);
    assert_eq!(report.finished, 2);
    let last = updates.last().expect("No progress reported");
    assert!(last.completed);
    assert_eq!(last.progress, 100);
}

#[test]
fn test_move_file_and_folder() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");
    fixture.create_folder("b");
    let a_bucket = fixture.bucket_of("a.txt");
    let b_bucket = fixture.bucket_of("b");

    let (report, _) = fixture.run(Mode::Move);

    assert!(!fixture.src().join("a.txt").exists());
    assert!(!fixture.src().join("b").exists());
    assert_eq!(
        fs::read_to_string(fixture.output_path(&a_bucket, "a.txt")).unwrap(),
        "alpha"
    );
    assert!(fixture.output_path(&b_bucket, "b").join("inner.txt").is_file());
    assert_eq!(fixture.count_source_entries(), 0);
    assert_eq!(report.finished, 2);
}

#[test]
fn test_nested_contents_are_not_rebucketed() {
    let fixture = TestFixture::new();
    fixture.create_folder("album");
    fs::create_dir(fixture.src().join("album").join("2019")).unwrap();
    fs::write(fixture.src().join("album").join("2019").join("pic.jpg"), "jpg").unwrap();
    let bucket = fixture.bucket_of("album");

    let (report, _) = fixture.run(Mode::Copy);

    assert_eq!(report.total, 1);
    let copied = fixture.output_path(&bucket, "album");
    assert!(copied.join("inner.txt").is_file());
    assert!(copied.join("2019").join("pic.jpg").is_file());
}

#[test]
fn test_transfer_records_pair_original_and_new_paths() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");
    fixture.create_folder("b");

    let (report, _) = fixture.run(Mode::Copy);

    assert_eq!(report.transfers.len(), 2);
    // Directories are transferred before files.
    assert_eq!(report.transfers[0].original_path, fixture.src().join("b"));
    assert_eq!(report.transfers[1].original_path, fixture.src().join("a.txt"));
    for record in &report.transfers {
        let name = record.original_path.file_name().unwrap();
        assert_eq!(
            record.new_path,
            fixture.output_path(record.bucket.as_str(), &name.to_string_lossy())
        );
    }
}

#[test]
fn test_many_files_share_buckets() {
    let fixture = TestFixture::new();
    for i in 0..20 {
        fixture.create_file(&format!("file_{:02}.txt", i), "content");
    }

    let (report, _) = fixture.run(Mode::Move);

    assert_eq!(report.finished, 20);
    assert!(report.buckets.len() <= 2, "created within a day of each other");
    assert_eq!(fixture.count_source_entries(), 0);
    let placed: usize = report
        .buckets
        .iter()
        .map(|b| {
            fs::read_dir(fixture.dst().join("OUTPUT").join(b))
                .unwrap()
                .count()
        })
        .sum();
    assert_eq!(placed, 20);
}

// ============================================================================
// Test Suite 2: Progress Reporting
// ============================================================================

#[test]
fn test_progress_sequence_matches_floor_percentages() {
    let fixture = TestFixture::new();
    for name in ["a", "b", "c", "d", "e", "f", "g"] {
        fixture.create_file(name, name);
    }

    let (_, updates) = fixture.run(Mode::Copy);

    // initial + one per transfer + completion
    assert_eq!(updates.len(), 9);
    assert_eq!(updates[0].finished, 0);
    assert_eq!(updates[0].total, 7);
    for (n, update) in updates[1..8].iter().enumerate() {
        let finished = n + 1;
        assert_eq!(update.finished, finished);
        assert_eq!(update.progress as usize, 100 * finished / 7);
        assert!(!update.completed);
    }
    assert!(updates[8].completed);
    assert_eq!(updates[8].finished, 7);
}

#[test]
fn test_progress_with_empty_source() {
    let fixture = TestFixture::new();

    let (report, updates) = fixture.run(Mode::Copy);

    assert_eq!(report.total, 0);
    assert_eq!(updates.len(), 2);
    assert_eq!((updates[0].progress, updates[0].total), (0, 0));
    assert!(updates[1].completed);
    assert_eq!(updates[1].progress, 0);
    assert!(fixture.dst().join("OUTPUT").is_dir());
}

#[test]
fn test_progress_over_channel() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");

    let (tx, rx) = mpsc::channel();
    let mut observer = ChannelObserver::new(tx);
    fixture
        .categorizer(Mode::Copy)
        .run(&mut observer)
        .expect("Run failed");
    drop(observer);

    let updates: Vec<ProgressUpdate> = rx.iter().collect();
    assert_eq!(updates.len(), 3);
    assert!(updates[2].completed);
    assert_eq!(updates[2].progress, 100);
}

// ============================================================================
// Test Suite 3: Idempotence and Self-Reference
// ============================================================================

#[test]
fn test_second_copy_run_transfers_nothing() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");
    fixture.create_folder("b");

    let (first, _) = fixture.run(Mode::Copy);
    assert_eq!(first.finished, 2);

    let (second, updates) = fixture.run(Mode::Copy);
    assert_eq!(second.total, 0);
    assert_eq!(second.finished, 0);
    assert!(second.transfers.is_empty());
    assert_eq!(second.skipped.len(), 2);
    // Only the initial and the completion notification.
    assert_eq!(updates.len(), 2);
}

#[test]
fn test_existing_destination_left_untouched() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "new content");
    fixture.create_file("b.txt", "bravo");
    let bucket = fixture.bucket_of("a.txt");

    let existing = fixture.output_path(&bucket, "a.txt");
    fs::create_dir_all(existing.parent().unwrap()).unwrap();
    fs::write(&existing, "old content").unwrap();

    let (report, _) = fixture.run(Mode::Move);

    assert_eq!(report.total, 1);
    assert_eq!(fs::read_to_string(&existing).unwrap(), "old content");
    // Skipped entries stay in the source even in move mode.
    assert!(fixture.src().join("a.txt").exists());
    assert!(!fixture.src().join("b.txt").exists());
}

#[test]
fn test_output_folder_inside_source_is_never_moved_into_itself() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");
    fixture.create_folder("b");
    fs::create_dir(fixture.src().join("OUTPUT")).unwrap();

    let mut updates = Vec::new();
    let report = Categorizer::new(fixture.src(), fixture.src(), Mode::Move)
        .unwrap()
        .run(&mut |update: ProgressUpdate| updates.push(update))
        .expect("Run failed");

    assert_eq!(report.total, 2);
    let output = fixture.src().join("OUTPUT");
    assert!(output.is_dir());
    for record in &report.transfers {
        assert!(record.new_path.starts_with(&output));
        assert!(!record.new_path.ends_with("OUTPUT"));
    }
    let remaining: Vec<_> = fs::read_dir(fixture.src())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(remaining, vec!["OUTPUT".to_string()]);
}

// ============================================================================
// Test Suite 4: CLI, Configuration, Dry-Run and Reports
// ============================================================================

#[test]
fn test_cli_copy_by_ordinal() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");
    let bucket = fixture.bucket_of("a.txt");

    let mut cli = Cli::new(fixture.src(), fixture.dst());
    cli.mode = Some("0".to_string());
    let report = run_cli(&cli).expect("CLI run failed").expect("No report");

    assert_eq!(report.mode, Mode::Copy);
    assert!(fixture.output_path(&bucket, "a.txt").is_file());
    assert!(fixture.src().join("a.txt").is_file());
}

#[test]
fn test_cli_move_by_name() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");
    let bucket = fixture.bucket_of("a.txt");

    let mut cli = Cli::new(fixture.src(), fixture.dst());
    cli.mode = Some("move".to_string());
    run_cli(&cli).expect("CLI run failed");

    assert!(fixture.output_path(&bucket, "a.txt").is_file());
    assert!(!fixture.src().join("a.txt").exists());
}

#[test]
fn test_cli_dry_run_changes_nothing() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");
    fixture.create_folder("b");

    let mut cli = Cli::new(fixture.src(), fixture.dst());
    cli.mode = Some("1".to_string());
    cli.dry_run = true;
    let result = run_cli(&cli).expect("Dry run failed");

    assert!(result.is_none());
    assert_eq!(fixture.count_source_entries(), 2);
    assert!(!fixture.dst().join("OUTPUT").exists());
}

#[test]
fn test_cli_config_mode_and_folder() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");
    fixture.create_file("skip.tmp", "temp");
    let bucket = fixture.bucket_of("a.txt");

    let config_path = fixture.dst().join("datetidy.toml");
    fs::write(
        &config_path,
        r#"
        [categorizer]
        mode = "move"
        output_folder = "BY_DATE"

        [filters.exclude]
        patterns = ["*.tmp"]
        "#,
    )
    .unwrap();

    let mut cli = Cli::new(fixture.src(), fixture.dst());
    cli.config = Some(config_path);
    let report = run_cli(&cli).expect("CLI run failed").expect("No report");

    assert_eq!(report.mode, Mode::Move);
    assert_eq!(report.total, 1);
    assert!(fixture.dst().join("BY_DATE").join(&bucket).join("a.txt").is_file());
    assert!(fixture.src().join("skip.tmp").exists());
    assert!(!fixture.dst().join("OUTPUT").exists());
}

#[test]
fn test_cli_mode_flag_overrides_config() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");

    let config_path = fixture.dst().join("datetidy.toml");
    fs::write(&config_path, "[categorizer]\nmode = \"move\"\n").unwrap();

    let mut cli = Cli::new(fixture.src(), fixture.dst());
    cli.config = Some(config_path);
    cli.mode = Some("copy".to_string());
    run_cli(&cli).expect("CLI run failed");

    assert!(fixture.src().join("a.txt").exists());
}

#[test]
fn test_cli_writes_json_report() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");
    let report_path = fixture.dst().join("report.json");

    let mut cli = Cli::new(fixture.src(), fixture.dst());
    cli.report = Some(report_path.clone());
    run_cli(&cli).expect("CLI run failed");

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(json["mode"], "copy");
    assert_eq!(json["total"], 1);
    assert_eq!(json["finished"], 1);
    assert_eq!(json["progress"], 100);
    assert_eq!(json["transfers"][0]["kind"], "file");
    assert_eq!(
        json["transfers"][0]["bucket"],
        fixture.bucket_of("a.txt").as_str()
    );
}

// ============================================================================
// Test Suite 5: Validation and Errors
// ============================================================================

#[test]
fn test_invalid_mode_creates_nothing() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");

    let result = Categorizer::from_ordinal(fixture.src(), fixture.dst(), 5);
    let err = result.unwrap_err();
    assert!(matches!(err, CategorizeError::InvalidMode { .. }));
    assert_eq!(err.class(), ErrorClass::Configuration);

    let mut cli = Cli::new(fixture.src(), fixture.dst());
    cli.mode = Some("5".to_string());
    assert!(run_cli(&cli).is_err());

    assert_eq!(fs::read_dir(fixture.dst()).unwrap().count(), 0);
    assert!(fixture.src().join("a.txt").exists());
}

#[test]
fn test_non_integer_mode_rejected() {
    let fixture = TestFixture::new();
    let mut cli = Cli::new(fixture.src(), fixture.dst());
    cli.mode = Some("one".to_string());
    assert!(matches!(
        run_cli(&cli),
        Err(CategorizeError::InvalidMode { .. })
    ));
}

#[test]
fn test_missing_source_and_destination() {
    let fixture = TestFixture::new();

    let err = Categorizer::new(fixture.src().join("missing"), fixture.dst(), Mode::Copy)
        .unwrap_err();
    assert!(matches!(err, CategorizeError::SourceMissing(_)));

    let err = Categorizer::new(fixture.src(), fixture.dst().join("missing"), Mode::Copy)
        .unwrap_err();
    assert!(matches!(err, CategorizeError::DestinationMissing(_)));
}

#[test]
fn test_file_paths_rejected_as_directories() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");
    let file = fixture.src().join("a.txt");

    assert!(matches!(
        Categorizer::new(&file, fixture.dst(), Mode::Copy),
        Err(CategorizeError::SourceNotDirectory(_))
    ));
    assert!(matches!(
        Categorizer::new(fixture.src(), &file, Mode::Copy),
        Err(CategorizeError::DestinationNotDirectory(_))
    ));
}

#[test]
fn test_invalid_config_is_configuration_error() {
    let fixture = TestFixture::new();
    let config_path = fixture.dst().join("bad.toml");
    fs::write(&config_path, "[categorizer]\ndate_format = \"%Y/%m\"\n").unwrap();

    let mut cli = Cli::new(fixture.src(), fixture.dst());
    cli.config = Some(config_path);
    let err = run_cli(&cli).unwrap_err();

    assert_eq!(err.class(), ErrorClass::Configuration);
    assert!(!fixture.dst().join("OUTPUT").exists());
}

#[test]
fn test_failure_before_any_transfer_leaves_source_intact() {
    let fixture = TestFixture::new();
    fixture.create_folder("b");
    fixture.create_file("a.txt", "alpha");
    let b_bucket = fixture.bucket_of("b");

    // A pre-existing file named like the bucket blocks every transfer into it.
    fs::create_dir(fixture.dst().join("OUTPUT")).unwrap();
    fs::write(fixture.dst().join("OUTPUT").join(&b_bucket), "blocker").unwrap();

    let mut categorizer = fixture.categorizer(Mode::Move);
    let err = categorizer.run(&mut SilentObserver).unwrap_err();

    assert_eq!(err.class(), ErrorClass::Filesystem);
    assert_eq!(categorizer.state(), RunState::Failed);
    assert!(fixture.src().join("b").exists());
    assert!(fixture.src().join("a.txt").exists());
}

#[cfg(unix)]
#[test]
fn test_failure_keeps_earlier_transfers_in_place() {
    let fixture = TestFixture::new();
    fixture.create_folder("a_dir");
    fixture.create_folder("b_dir");
    fixture.create_file("c.txt", "charlie");
    let a_bucket = fixture.bucket_of("a_dir");
    let b_bucket = fixture.bucket_of("b_dir");

    // A dangling symlink does not count as present, but a directory cannot be
    // renamed over it.
    let b_bucket_dir = fixture.dst().join("OUTPUT").join(&b_bucket);
    fs::create_dir_all(&b_bucket_dir).unwrap();
    std::os::unix::fs::symlink(b_bucket_dir.join("missing"), b_bucket_dir.join("b_dir"))
        .unwrap();

    let mut updates = Vec::new();
    let mut categorizer = fixture.categorizer(Mode::Move);
    let err = categorizer
        .run(&mut |update: ProgressUpdate| updates.push(update))
        .unwrap_err();

    assert!(matches!(err, CategorizeError::TransferFailed { .. }));
    assert_eq!(categorizer.state(), RunState::Failed);

    // The first directory was moved and stays moved.
    assert!(fixture.output_path(&a_bucket, "a_dir").join("inner.txt").is_file());
    assert!(!fixture.src().join("a_dir").exists());

    // Everything from the failing entry on is still in the source.
    assert!(fixture.src().join("b_dir").join("inner.txt").is_file());
    assert!(fixture.src().join("c.txt").is_file());

    // initial + one transfer, no completion notification
    assert_eq!(updates.len(), 2);
    assert_eq!(updates[1].finished, 1);
    assert!(updates.iter().all(|u| !u.completed));
}

// ============================================================================
// Test Suite 6: Binary
// ============================================================================

#[test]
fn test_binary_prints_transfer_lines_when_piped() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");
    fixture.create_folder("b");
    let a_bucket = fixture.bucket_of("a.txt");
    let b_bucket = fixture.bucket_of("b");

    let output = Command::new(env!("CARGO_BIN_EXE_datetidy"))
        .arg(fixture.src())
        .arg(fixture.dst())
        .current_dir(fixture.dst())
        .env("HOME", fixture.dst())
        .output()
        .expect("Failed to run datetidy");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for (name, bucket) in [("a.txt", &a_bucket), ("b", &b_bucket)] {
        let line = OutputFormatter::transfer_line(
            &fixture.src().join(name).display().to_string(),
            &fixture.output_path(bucket, name).display().to_string(),
        );
        assert!(stdout.contains(&line), "missing line {line:?} in:\n{stdout}");
    }
}

#[test]
fn test_binary_invalid_mode_exits_with_failure() {
    let fixture = TestFixture::new();
    fixture.create_file("a.txt", "alpha");

    let output = Command::new(env!("CARGO_BIN_EXE_datetidy"))
        .arg(fixture.src())
        .arg(fixture.dst())
        .args(["--mode", "5"])
        .current_dir(fixture.dst())
        .env("HOME", fixture.dst())
        .output()
        .expect("Failed to run datetidy");

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid mode '5'"));
    assert!(!stderr.contains("run aborted"));
    assert!(!fixture.dst().join("OUTPUT").exists());
}
