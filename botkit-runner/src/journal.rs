//! Per-run log file
//!
//! Every run owns exactly one log file under the configured log directory.
//! Structured [`LogRecord`]s are appended to it directly, and the same file
//! backs the `tracing` file layer through the [`MakeWriter`] impl, so the
//! file holds the whole story of the run. Every write is flushed
//! immediately.

use botkit_core::domain::log::{LogLevel, LogRecord};
use botkit_core::domain::run::RunContext;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// Target used to mirror journal records onto the console.
///
/// The file layer filters this target out; the record itself is already
/// written to the file by [`RunLog::append`].
pub const JOURNAL_TARGET: &str = "botkit_runner::journal";

/// Append-only log file of one run
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
    file: Arc<Mutex<File>>,
}

impl RunLog {
    /// Creates the log file for a run, creating the log directory if needed
    ///
    /// The file is named `<bot id>-<YYYY-MM-DD_HH-MM-SS>.log` after the run's
    /// start time.
    pub fn create(ctx: &RunContext) -> io::Result<Self> {
        fs::create_dir_all(ctx.log_dir())?;

        let file_name = format!(
            "{}-{}.log",
            sanitize_name(ctx.bot_id()),
            ctx.started_at().format("%Y-%m-%d_%H-%M-%S")
        );
        let path = ctx.log_dir().join(file_name);

        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name without the directory, used as artifact name
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Appends a record to the file and mirrors it to the console
    ///
    /// Write failures are reported on stderr; they never interrupt the run.
    pub fn append(&self, record: LogRecord) {
        mirror(&record);

        let line = format!("{}\n", record);
        if let Err(e) = self.write_bytes(line.as_bytes()) {
            eprintln!(
                "Warning: failed to write run log {}: {}",
                self.path.display(),
                e
            );
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.append(LogRecord::info(message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.append(LogRecord::warning(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.append(LogRecord::error(message));
    }

    /// Copies the log file into `dir`, returning the copy's path
    pub fn archive_to(&self, dir: &Path) -> io::Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let destination = dir.join(self.file_name());
        fs::copy(&self.path, &destination)?;
        Ok(destination)
    }

    fn write_bytes(&self, buf: &[u8]) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("run log lock poisoned"))?;
        file.write_all(buf)?;
        file.flush()
    }
}

fn mirror(record: &LogRecord) {
    match record.level {
        LogLevel::Debug => tracing::debug!(target: JOURNAL_TARGET, "{}", record.message),
        LogLevel::Info => tracing::info!(target: JOURNAL_TARGET, "{}", record.message),
        LogLevel::Warning => tracing::warn!(target: JOURNAL_TARGET, "{}", record.message),
        LogLevel::Error => tracing::error!(target: JOURNAL_TARGET, "{}", record.message),
    }
}

/// Writer handed out to the `tracing` file layer
pub struct RunLogWriter {
    log: RunLog,
}

impl<'a> MakeWriter<'a> for RunLog {
    type Writer = RunLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RunLogWriter { log: self.clone() }
    }
}

impl Write for RunLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.log.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use botkit_core::domain::run::ExecutionMode;

    fn run_log(dir: &Path, bot: &str) -> RunLog {
        let ctx = RunContext::new(ExecutionMode::Local, bot, dir.join("logs"));
        RunLog::create(&ctx).unwrap()
    }

    #[test]
    fn test_create_makes_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = run_log(dir.path(), "Invoice Bot");

        assert!(log.path().exists());
        assert!(log.path().starts_with(dir.path().join("logs")));
        assert!(log.file_name().starts_with("Invoice_Bot-"));
        assert!(log.file_name().ends_with(".log"));
    }

    #[test]
    fn test_append_writes_lines_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let log = run_log(dir.path(), "bot");

        log.info("first");
        log.append(LogRecord::error("second").with_trace("boom"));

        let content = fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("INFO first"));
        assert!(lines[1].ends_with("ERROR second"));
        assert_eq!(lines[2], "    boom");
    }

    #[test]
    fn test_make_writer_shares_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = run_log(dir.path(), "bot");

        let mut writer = log.make_writer();
        writer.write_all(b"from tracing\n").unwrap();
        log.info("from journal");

        let content = fs::read_to_string(log.path()).unwrap();
        assert!(content.starts_with("from tracing\n"));
        assert!(content.contains("from journal"));
    }

    #[test]
    fn test_archive_copies_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = run_log(dir.path(), "bot");
        log.info("archived line");

        let copy = log.archive_to(&dir.path().join("archive")).unwrap();
        assert_eq!(copy.file_name().unwrap().to_string_lossy(), log.file_name());
        assert!(fs::read_to_string(copy).unwrap().contains("archived line"));
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("My Bot/1"), "My_Bot_1");
        assert_eq!(sanitize_name("ok-name_2"), "ok-name_2");
    }
}
