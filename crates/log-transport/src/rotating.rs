//! Size- and age-triggered rotation with gzip-compressed, numbered backups.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::{debug, warn};

use crate::error::{SinkWriteError, DIAGNOSTIC_TARGET};
use crate::file::open_append;

/// When to rotate and how many backups to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate once the active file has grown past this many bytes.
    pub max_bytes: u64,
    /// Rotate a non-empty active file older than this. `None` disables
    /// age-based rotation.
    pub max_age: Option<Duration>,
    /// Number of backups retained; older ones are deleted in rotation order.
    pub retention: usize,
    /// Gzip backups (`<stem>.<n>.<ext>.gz`) instead of renaming them.
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
            max_age: Some(Duration::from_secs(24 * 60 * 60)),
            retention: 5,
            compress: true,
        }
    }
}

/// Append-only file that rotates into numbered backups.
///
/// All state lives behind `&mut self`, so a write and a rotation on the same
/// sink can never interleave. Callers sharing a sink wrap it in a mutex.
pub struct RotatingSink {
    path: PathBuf,
    policy: RotationPolicy,
    file: Option<File>,
    bytes_written: u64,
    opened_at: Instant,
    /// Oldest first.
    backups: VecDeque<PathBuf>,
    next_seq: u64,
}

impl RotatingSink {
    /// Open (or create) the active file at `path`.
    ///
    /// Parent directories are created automatically. Existing backups next
    /// to the active file are picked up so numbering and retention carry
    /// over from a previous run. An existing active file is appended to.
    pub fn open(path: impl Into<PathBuf>, policy: RotationPolicy) -> Result<Self, SinkWriteError> {
        let path = path.into();
        let file = open_append(&path)?;
        let bytes_written = file.metadata().map(|meta| meta.len()).unwrap_or(0);

        let existing = discover_backups(&path).map_err(|source| SinkWriteError::OpenFile {
            path: path.clone(),
            source,
        })?;
        let next_seq = existing.last().map(|(seq, _)| seq + 1).unwrap_or(1);

        let mut sink = Self {
            path,
            policy,
            file: Some(file),
            bytes_written,
            opened_at: Instant::now(),
            backups: existing.into_iter().map(|(_, backup)| backup).collect(),
            next_seq,
        };
        sink.enforce_retention();
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Retained backups, oldest first.
    pub fn backups(&self) -> impl Iterator<Item = &Path> {
        self.backups.iter().map(PathBuf::as_path)
    }

    /// Append `payload` to the active file, rotating as the policy demands.
    pub fn write(&mut self, payload: &[u8]) -> Result<(), SinkWriteError> {
        self.write_at(payload, Instant::now())
    }

    /// Only a failed append is an error. A rotation that fails before or
    /// after the append loses nothing: it is reported on the diagnostic
    /// channel and retried on the next write.
    pub(crate) fn write_at(&mut self, payload: &[u8], now: Instant) -> Result<(), SinkWriteError> {
        if self.is_expired(now) {
            self.rotate_or_report(now);
        }

        // A failed rotation leaves no open file; reopen lazily.
        let mut file = match self.file.take() {
            Some(file) => file,
            None => open_append(&self.path)?,
        };
        let written = file.write_all(payload).and_then(|()| file.flush());
        self.file = Some(file);
        written.map_err(SinkWriteError::Write)?;
        self.bytes_written += payload.len() as u64;

        if self.bytes_written > self.policy.max_bytes {
            self.rotate_or_report(now);
        }
        Ok(())
    }

    fn rotate_or_report(&mut self, now: Instant) {
        if let Err(err) = self.rotate_at(now) {
            warn!(
                target: DIAGNOSTIC_TARGET,
                active = %self.path.display(),
                bytes = self.bytes_written,
                %err,
                "log rotation failed; still appending to the active file"
            );
        }
    }

    /// Force a rotation regardless of thresholds.
    pub fn rotate(&mut self) -> Result<(), SinkWriteError> {
        self.rotate_at(Instant::now())
    }

    fn is_expired(&self, now: Instant) -> bool {
        self.bytes_written > 0
            && self
                .policy
                .max_age
                .is_some_and(|max_age| now.saturating_duration_since(self.opened_at) > max_age)
    }

    fn rotate_at(&mut self, now: Instant) -> Result<(), SinkWriteError> {
        // Close the active file before moving it.
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(SinkWriteError::Write)?;
        }

        let backup = backup_path(&self.path, self.next_seq, self.policy.compress);
        let moved = if self.policy.compress {
            compress_into(&self.path, &backup).and_then(|()| std::fs::remove_file(&self.path))
        } else {
            std::fs::rename(&self.path, &backup)
        };
        moved.map_err(|source| SinkWriteError::Rotate {
            path: self.path.clone(),
            source,
        })?;

        debug!(
            active = %self.path.display(),
            backup = %backup.display(),
            bytes = self.bytes_written,
            "rotated log file"
        );

        self.next_seq += 1;
        self.backups.push_back(backup);
        self.enforce_retention();

        self.file = Some(open_append(&self.path)?);
        self.bytes_written = 0;
        self.opened_at = now;
        Ok(())
    }

    fn enforce_retention(&mut self) {
        while self.backups.len() > self.policy.retention {
            let Some(oldest) = self.backups.pop_front() else {
                break;
            };
            match std::fs::remove_file(&oldest) {
                Ok(()) => debug!(backup = %oldest.display(), "evicted log backup"),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => warn!(
                    target: DIAGNOSTIC_TARGET,
                    backup = %oldest.display(),
                    %err,
                    "failed to evict log backup"
                ),
            }
        }
    }
}

fn compress_into(source: &Path, backup: &Path) -> io::Result<()> {
    let mut input = File::open(source)?;
    let mut encoder = GzEncoder::new(File::create(backup)?, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    encoder.finish()?.sync_all()
}

/// Split `app.log` into (`app`, `Some("log")`).
fn name_parts(path: &Path) -> (String, Option<String>) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().into_owned());
    (stem, ext)
}

fn backup_path(active: &Path, seq: u64, compress: bool) -> PathBuf {
    let (stem, ext) = name_parts(active);
    let mut name = match ext {
        Some(ext) => format!("{stem}.{seq}.{ext}"),
        None => format!("{stem}.{seq}"),
    };
    if compress {
        name.push_str(".gz");
    }
    active.with_file_name(name)
}

/// Sequence number encoded in a backup file name, if `name` is a backup of
/// an active file with the given stem and extension.
fn backup_seq(name: &str, stem: &str, ext: Option<&str>) -> Option<u64> {
    let rest = name.strip_prefix(stem)?.strip_prefix('.')?;
    let rest = rest.strip_suffix(".gz").unwrap_or(rest);
    let digits = match ext {
        Some(ext) => rest.strip_suffix(ext)?.strip_suffix('.')?,
        None => rest,
    };
    digits.parse().ok()
}

/// Existing backups of `active`, ordered by sequence number.
fn discover_backups(active: &Path) -> io::Result<Vec<(u64, PathBuf)>> {
    let dir = match active.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let (stem, ext) = name_parts(active);

    let mut found = Vec::new();
    for dir_entry in std::fs::read_dir(dir)? {
        let dir_entry = dir_entry?;
        let name = dir_entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(seq) = backup_seq(name, &stem, ext.as_deref()) {
            found.push((seq, dir_entry.path()));
        }
    }
    found.sort_by_key(|(seq, _)| *seq);
    Ok(found)
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;

    use super::*;

    fn policy(max_bytes: u64, retention: usize, compress: bool) -> RotationPolicy {
        RotationPolicy {
            max_bytes,
            max_age: None,
            retention,
            compress,
        }
    }

    fn gunzip(path: &Path) -> Vec<u8> {
        let mut decoder = GzDecoder::new(File::open(path).unwrap());
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        out
    }

    fn file_len(path: &Path) -> u64 {
        std::fs::metadata(path).unwrap().len()
    }

    #[test]
    fn size_threshold_produces_compressed_backup() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("usage.log");
        let mut sink = RotatingSink::open(&active, policy(100, 5, true)).unwrap();

        let payload = [b'a'; 60];
        sink.write(&payload).unwrap();
        assert!(sink.backups().next().is_none());

        sink.write(&payload).unwrap();
        let backups: Vec<_> = sink.backups().map(Path::to_path_buf).collect();
        assert_eq!(backups, vec![dir.path().join("usage.1.log.gz")]);
        assert!(file_len(&active) < 100);
        assert_eq!(gunzip(&backups[0]), [b'a'; 120]);

        sink.write(&payload).unwrap();
        assert_eq!(file_len(&active), 60);
        assert_eq!(sink.bytes_written(), 60);
    }

    #[test]
    fn retention_evicts_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("audit.log");
        let retention = 3;
        let mut sink = RotatingSink::open(&active, policy(10, retention, true)).unwrap();

        // Each write crosses the threshold, so each one rotates.
        for n in 0..=retention {
            sink.write(format!("payload-{n:03}\n").as_bytes()).unwrap();
        }

        let backups: Vec<_> = sink.backups().map(Path::to_path_buf).collect();
        assert_eq!(
            backups,
            vec![
                dir.path().join("audit.2.log.gz"),
                dir.path().join("audit.3.log.gz"),
                dir.path().join("audit.4.log.gz"),
            ]
        );
        assert!(!dir.path().join("audit.1.log.gz").exists());
        assert_eq!(gunzip(&backups[0]), b"payload-001\n");
    }

    #[test]
    fn uncompressed_backups_are_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("plain.log");
        let mut sink = RotatingSink::open(&active, policy(4, 2, false)).unwrap();

        sink.write(b"hello").unwrap();
        let backup = dir.path().join("plain.1.log");
        assert_eq!(std::fs::read(&backup).unwrap(), b"hello");
        assert_eq!(file_len(&active), 0);
    }

    #[test]
    fn age_threshold_rotates_before_write() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("aged.log");
        let mut sink = RotatingSink::open(
            &active,
            RotationPolicy {
                max_bytes: u64::MAX,
                max_age: Some(Duration::from_secs(60)),
                retention: 5,
                compress: true,
            },
        )
        .unwrap();

        let start = Instant::now();
        sink.write_at(b"first\n", start).unwrap();
        sink.write_at(b"second\n", start + Duration::from_secs(30)).unwrap();
        assert!(sink.backups().next().is_none());

        sink.write_at(b"third\n", start + Duration::from_secs(120)).unwrap();
        let backups: Vec<_> = sink.backups().map(Path::to_path_buf).collect();
        assert_eq!(backups.len(), 1);
        assert_eq!(gunzip(&backups[0]), b"first\nsecond\n");
        assert_eq!(std::fs::read(&active).unwrap(), b"third\n");
    }

    #[test]
    fn blocked_backup_keeps_appending_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("usage.log");
        let mut sink = RotatingSink::open(&active, policy(100, 5, true)).unwrap();

        // A directory squatting on the first backup name makes rotation fail.
        let blocked = dir.path().join("usage.1.log.gz");
        std::fs::create_dir(&blocked).unwrap();

        sink.write(&[b'a'; 95]).unwrap();
        sink.write(&[b'b'; 10]).unwrap();
        sink.write(&[b'c'; 10]).unwrap();

        assert!(sink.backups().next().is_none());
        assert_eq!(file_len(&active), 115);
        assert_eq!(sink.bytes_written(), 115);

        // Once the path clears, the next write rotates everything so far.
        std::fs::remove_dir(&blocked).unwrap();
        sink.write(b"d").unwrap();

        let backups: Vec<_> = sink.backups().map(Path::to_path_buf).collect();
        assert_eq!(backups, vec![blocked]);
        assert_eq!(gunzip(&backups[0]).len(), 116);
        assert_eq!(file_len(&active), 0);
    }

    #[test]
    fn creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("nested/deeper/app.log");
        let mut sink = RotatingSink::open(&active, RotationPolicy::default()).unwrap();
        sink.write(b"x").unwrap();
        assert_eq!(std::fs::read(&active).unwrap(), b"x");
    }

    #[test]
    fn reopening_continues_numbering_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let active = dir.path().join("usage.log");

        {
            let mut sink = RotatingSink::open(&active, policy(10, 5, true)).unwrap();
            sink.write(b"0123456789AB").unwrap();
            sink.write(b"tail").unwrap();
        }

        let mut sink = RotatingSink::open(&active, policy(10, 5, true)).unwrap();
        assert_eq!(sink.bytes_written(), 4);
        sink.write(b"0123456789").unwrap();

        let backups: Vec<_> = sink.backups().map(Path::to_path_buf).collect();
        assert_eq!(
            backups,
            vec![
                dir.path().join("usage.1.log.gz"),
                dir.path().join("usage.2.log.gz"),
            ]
        );
        assert_eq!(gunzip(&backups[1]), b"tail0123456789");
    }

    #[test]
    fn reopening_applies_retention_to_existing_backups() {
        let dir = tempfile::tempdir().unwrap();
        for seq in 1..=4 {
            std::fs::write(dir.path().join(format!("usage.{seq}.log.gz")), b"old").unwrap();
        }
        std::fs::write(dir.path().join("unrelated.1.log.gz"), b"keep").unwrap();

        let sink = RotatingSink::open(dir.path().join("usage.log"), policy(10, 2, true)).unwrap();
        let backups: Vec<_> = sink.backups().map(Path::to_path_buf).collect();
        assert_eq!(
            backups,
            vec![
                dir.path().join("usage.3.log.gz"),
                dir.path().join("usage.4.log.gz"),
            ]
        );
        assert!(!dir.path().join("usage.1.log.gz").exists());
        assert!(dir.path().join("unrelated.1.log.gz").exists());
    }

    #[test]
    fn backup_names_round_trip_through_parser() {
        assert_eq!(backup_seq("usage.7.log.gz", "usage", Some("log")), Some(7));
        assert_eq!(backup_seq("usage.7.log", "usage", Some("log")), Some(7));
        assert_eq!(backup_seq("usage.log", "usage", Some("log")), None);
        assert_eq!(backup_seq("usage.x.log.gz", "usage", Some("log")), None);
        assert_eq!(backup_seq("usagex.1.log.gz", "usage", Some("log")), None);
        assert_eq!(backup_seq("app.3.gz", "app", None), Some(3));
    }
}
