mod common;

use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use common::seed_season;
use fantasy_prep::{
    log_app_start, log_data_source, run_prepare, LoggingConfig, PrepareConfig, PrepareOutcome,
};
use tempfile::tempdir;
use tracing::dispatcher::with_default;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriter;

#[derive(Clone, Default)]
struct SharedWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
    fn output_string(&self) -> String {
        let bytes = self
            .inner
            .lock()
            .expect("writer lock should not be poisoned");
        String::from_utf8_lossy(&bytes).to_string()
    }
}

struct SharedWriterGuard {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for SharedWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = self
            .inner
            .lock()
            .expect("writer lock should not be poisoned");
        out.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs(max_level: Level, f: impl FnOnce()) -> String {
    let writer = SharedWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_max_level(max_level)
        .with_writer(writer.clone())
        .finish();
    let dispatch = tracing::Dispatch::new(subscriber);

    with_default(&dispatch, f);
    writer.output_string()
}

fn config_for(dir: &Path) -> PrepareConfig {
    PrepareConfig {
        data_dir: dir.to_path_buf(),
        output_path: dir.join("training_data.csv"),
        ..PrepareConfig::default()
    }
}

#[test]
fn prepare_run_emits_one_event_per_stage() {
    let tmp = tempdir().expect("temp dir");
    seed_season(tmp.path());
    let cfg = config_for(tmp.path());

    let logs = capture_logs(Level::INFO, || {
        let outcome = run_prepare(&cfg).expect("prepare should succeed");
        assert!(matches!(outcome, PrepareOutcome::Written(_)));
    });

    for event in [
        "prepare.run.start",
        "loader.source.finish",
        "prepare.positions.resolved",
        "prepare.positions.applied",
        "prepare.features.teams",
        "prepare.timeline.built",
        "prepare.features.rolling",
        "prepare.write.finish",
        "prepare.run.finish",
    ] {
        assert!(
            logs.contains(&format!("\"event\":\"{event}\"")),
            "missing {event} in {logs}"
        );
    }
    assert!(!logs.contains("\"event\":\"loader.file.read\""));
}

#[test]
fn per_file_reads_are_logged_at_debug() {
    let tmp = tempdir().expect("temp dir");
    seed_season(tmp.path());
    let cfg = config_for(tmp.path());

    let logs = capture_logs(Level::DEBUG, || {
        run_prepare(&cfg).expect("prepare should succeed");
    });

    assert!(logs.contains("\"event\":\"loader.file.read\""));
    assert!(logs.contains("player_stats_2019_01.csv"));
}

#[test]
fn empty_weekly_source_logs_no_data_warning() {
    let tmp = tempdir().expect("temp dir");
    let cfg = config_for(tmp.path());

    let logs = capture_logs(Level::INFO, || {
        let outcome = run_prepare(&cfg).expect("empty source is not an error");
        assert_eq!(outcome, PrepareOutcome::NoData { weekly_files: 0 });
    });

    assert!(logs.contains("\"event\":\"prepare.no_data\""));
    assert!(logs.contains("\"level\":\"WARN\""));
    assert!(!logs.contains("\"event\":\"prepare.positions.resolved\""));
}

#[test]
fn app_lifecycle_helpers_emit_baseline_events() {
    let logs = capture_logs(Level::INFO, || {
        let cfg = LoggingConfig::for_app("prepare");
        log_app_start(&cfg);
        log_data_source(&cfg, Path::new("data"), Some("FPREP_DATA_DIR"));
    });

    assert!(logs.contains("\"event\":\"app.start\""));
    assert!(logs.contains("\"event\":\"source.selected\""));
    assert!(logs.contains("\"component\":\"prepare\""));
    assert!(logs.contains("\"reason\":\"FPREP_DATA_DIR\""));
}
