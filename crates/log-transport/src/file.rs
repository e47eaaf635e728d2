use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use log_schema::{Category, LogEntry};

use crate::destination::DestinationTemplate;
use crate::error::SinkWriteError;

/// Open (or create) `path` in append mode, creating parent directories.
pub(crate) fn open_append(path: &Path) -> Result<File, SinkWriteError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SinkWriteError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SinkWriteError::OpenFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Append-only JSON-lines writer whose path follows the entry.
///
/// Each entry is written to the destination template resolved for its
/// level and UTC date, so one sink covers every level of a category and
/// rolls over to a new file at midnight. The last opened file is kept until
/// the resolved path changes.
pub struct DatedFileSink {
    root: PathBuf,
    category: Category,
    template: DestinationTemplate,
    current: Option<(PathBuf, File)>,
}

impl DatedFileSink {
    pub fn new(root: impl Into<PathBuf>, category: Category, template: DestinationTemplate) -> Self {
        Self {
            root: root.into(),
            category,
            template,
            current: None,
        }
    }

    /// Path `entry` will be written to.
    pub fn path_for(&self, entry: &LogEntry) -> PathBuf {
        self.template.resolve(
            &self.root,
            self.category,
            entry.level,
            entry.timestamp.date_naive(),
        )
    }

    /// Serialise `entry` as a single JSON line and append it to its file.
    pub fn write(&mut self, entry: &LogEntry) -> Result<(), SinkWriteError> {
        let line = entry.to_json_line()?;
        let path = self.path_for(entry);

        if self.current.as_ref().map(|(current, _)| current) != Some(&path) {
            let file = open_append(&path)?;
            self.current = Some((path, file));
        }

        if let Some((_, file)) = self.current.as_mut() {
            file.write_all(&line).map_err(SinkWriteError::Write)?;
            file.flush().map_err(SinkWriteError::Write)?;
        }
        Ok(())
    }
}
