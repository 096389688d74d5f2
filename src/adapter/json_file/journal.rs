// Append-only JSON lines journals for reputation events and appeal records.
// Each record is one ND-JSON line, flushed and synced before the append
// returns. On start-up the file is replayed to rebuild in-memory state.

use crate::domain::{AppealRecord, ReputationEvent};
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

pub type EventJournal = Journal<ReputationEvent>;
pub type AppealJournal = Journal<AppealRecord>;

pub struct Journal<T> {
    path: PathBuf,
    file: Mutex<File>,
    _record: PhantomData<fn() -> T>,
}

/// Records read back from disk, plus the byte length they occupy.
struct Replayed<T> {
    records: Vec<T>,
    valid_len: u64,
    file_len: u64,
    /// Whether the kept bytes end on a line break.
    terminated: bool,
}

impl<T: Serialize + DeserializeOwned> Journal<T> {
    /// Open (or create) the journal and return the records already in it, oldest first.
    ///
    /// A torn final line left by an interrupted write is cut off.
    pub async fn open(path: impl AsRef<Path>) -> Result<(Self, Vec<T>)> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                tokio::fs::create_dir_all(dir)
                    .await
                    .with_context(|| format!("failed to create journal directory {dir:?}"))?;
            }
        }

        let replayed = Self::replay(&path).await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("failed to open journal {path:?}"))?;

        if replayed.valid_len < replayed.file_len {
            warn!(
                path = ?path,
                dropped_bytes = replayed.file_len - replayed.valid_len,
                "truncating torn journal tail"
            );
            file.set_len(replayed.valid_len)
                .await
                .with_context(|| format!("failed to truncate journal {path:?}"))?;
        } else if !replayed.terminated {
            write_line(&mut file, b"\n")
                .await
                .with_context(|| format!("failed to terminate journal {path:?}"))?;
        }

        Ok((
            Self {
                path,
                file: Mutex::new(file),
                _record: PhantomData,
            },
            replayed.records,
        ))
    }

    async fn replay(path: &Path) -> Result<Replayed<T>> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Replayed {
                    records: Vec::new(),
                    valid_len: 0,
                    file_len: 0,
                    terminated: true,
                });
            }
            Err(e) => return Err(e).with_context(|| format!("failed to read journal {path:?}")),
        };

        let mut records = Vec::new();
        let mut offset = 0usize;
        for (lineno, line) in content.split_inclusive('\n').enumerate() {
            let complete = line.ends_with('\n');
            if !line.trim().is_empty() {
                match serde_json::from_str(line.trim_end()) {
                    Ok(record) => records.push(record),
                    // Only the unterminated last line can be a partial write.
                    Err(_) if !complete => break,
                    Err(e) => {
                        return Err(e).with_context(|| {
                            format!("corrupt journal line {} in {path:?}", lineno + 1)
                        });
                    }
                }
            }
            offset += line.len();
        }

        Ok(Replayed {
            records,
            valid_len: offset as u64,
            file_len: content.len() as u64,
            terminated: offset == 0 || content[..offset].ends_with('\n'),
        })
    }

    /// Append one record. A failed write is rolled back so the file never
    /// keeps a partial line.
    pub async fn append(&self, record: &T) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = self.file.lock().await;
        let len = file
            .metadata()
            .await
            .with_context(|| format!("failed to stat journal {:?}", self.path))?
            .len();
        if let Err(e) = write_line(&mut file, line.as_bytes()).await {
            if let Err(rollback) = file.set_len(len).await {
                warn!(path = ?self.path, error = %rollback, "failed to roll back journal write");
            }
            return Err(e).with_context(|| format!("failed to append to journal {:?}", self.path));
        }
        Ok(())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn write_line(file: &mut File, bytes: &[u8]) -> std::io::Result<()> {
    file.write_all(bytes).await?;
    file.flush().await?;
    file.sync_data().await
}
