//! Append-only log of user reports and content requests.
//!
//! One line per entry, tagged with its kind. The file is never rotated or
//! truncated.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::info;

/// What the user is submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    /// A problem report (`/reportar`).
    Report,
    /// A content request (`/solicitar`).
    Request,
}

impl NoteKind {
    /// Tag written at the start of the log line.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Report => "REPORTE",
            Self::Request => "SOLICITUD",
        }
    }
}

/// Collapse `text` onto a single line.
///
/// Returns `None` when nothing but whitespace remains.
pub fn single_line(text: &str) -> Option<String> {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then_some(joined)
}

/// Serialized appender for the report file.
#[derive(Debug)]
pub struct ReportLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ReportLog {
    /// Log writing to `path`. The file is created on first append.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the file
    /// cannot be opened or written.
    pub async fn append(&self, kind: NoteKind, text: &str) -> anyhow::Result<()> {
        let Some(line) = single_line(text) else {
            return Ok(());
        };
        let _guard = self.lock.lock().await;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("failed to open report log {}", self.path.display()))?;

        file.write_all(format!("[{}] {line}\n", kind.tag()).as_bytes())
            .await
            .with_context(|| format!("failed to write report log {}", self.path.display()))?;
        file.flush().await?;

        info!(kind = kind.tag(), "user note stored");
        Ok(())
    }
}
