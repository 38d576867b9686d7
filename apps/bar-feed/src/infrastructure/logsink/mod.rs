//! Per-Instrument Log Sink
//!
//! Append-only `Log{TICKER}.txt` file per streamed instrument. Every
//! raw line and every state transition lands here, timestamped and
//! flushed per line so a tail survives a crash.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use chrono::Local;
use parking_lot::Mutex;

use crate::application::ports::SessionLog;
use crate::domain::instrument::Ticker;

/// File-backed [`SessionLog`] adapter.
pub struct FileSessionLog {
    ticker: Ticker,
    file: Mutex<File>,
}

impl FileSessionLog {
    /// Open (or create) the append-only log for one instrument.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be opened.
    pub fn create(dir: &Path, ticker: &Ticker) -> std::io::Result<Self> {
        let path = dir.join(format!("Log{}.txt", ticker.as_str()));
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            ticker: ticker.clone(),
            file: Mutex::new(file),
        })
    }
}

impl SessionLog for FileSessionLog {
    fn append(&self, line: &str) {
        let stamped = format!(
            "{} {} {line}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            self.ticker
        );

        let mut file = self.file.lock();
        if let Err(e) = writeln!(file, "{stamped}").and_then(|()| file.flush()) {
            tracing::debug!(ticker = %self.ticker, error = %e, "Session log write failed");
        }
    }
}

impl std::fmt::Debug for FileSessionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSessionLog")
            .field("ticker", &self.ticker)
            .finish_non_exhaustive()
    }
}

/// Sink that drops everything; used when the log file cannot be
/// opened, so a full disk never takes down a session.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSessionLog;

impl SessionLog for NullSessionLog {
    fn append(&self, _line: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_timestamped_lines() {
        let dir = tempfile::tempdir().unwrap();
        let ticker = Ticker::new("ESZ24").unwrap();
        let log = FileSessionLog::create(dir.path(), &ticker).unwrap();

        log.append("first");
        log.append("second");

        let contents =
            std::fs::read_to_string(dir.path().join("LogESZ24.txt")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("ESZ24 first"));
        assert!(lines[1].contains("ESZ24 second"));
    }

    #[test]
    fn reopening_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let ticker = Ticker::new("NQZ24").unwrap();

        FileSessionLog::create(dir.path(), &ticker)
            .unwrap()
            .append("before restart");
        FileSessionLog::create(dir.path(), &ticker)
            .unwrap()
            .append("after restart");

        let contents =
            std::fs::read_to_string(dir.path().join("LogNQZ24.txt")).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
