use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

/// File sink for backend diagnostics.
///
/// The first line written through a `DebugLog` truncates the file; every later line
/// is appended. Clones share the same "started" state, so a device and its backend
/// can both hold one.
#[derive(Debug, Clone)]
pub struct DebugLog {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    path: PathBuf,
    started: Mutex<bool>,
}

impl DebugLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                started: Mutex::new(false),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Writes one line. I/O failures are logged and otherwise ignored; diagnostics
    /// must never take down rendering.
    pub fn write_line(&self, message: &str) {
        let mut started = self.inner.started.lock();

        let mut options = OpenOptions::new();
        options.create(true);
        if *started {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }

        let result = options
            .open(&self.inner.path)
            .and_then(|mut file| writeln!(file, "{message}"));

        match result {
            Ok(()) => *started = true,
            Err(e) => log::warn!("debug log {}: {e}", self.inner.path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── truncation ────────────────────────────────────────────────────────

    #[test]
    fn first_write_truncates_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.log");
        std::fs::write(&path, "stale contents\n").unwrap();

        let log = DebugLog::new(&path);
        log.write_line("first");

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\n");
    }

    #[test]
    fn later_writes_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("debug.log");

        let log = DebugLog::new(&path);
        log.write_line("one");
        log.clone().write_line("two");
        log.write_line("three");

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\nthree\n");
    }

    // ── failures ──────────────────────────────────────────────────────────

    #[test]
    fn unwritable_path_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let log = DebugLog::new(dir.path().join("missing").join("debug.log"));
        log.write_line("dropped");
        assert!(!log.path().exists());
    }
}
