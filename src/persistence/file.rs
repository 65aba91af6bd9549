//! File checkpointer: one JSON document per thread.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{Checkpoint, Checkpointer, PersistenceError};

/// Thread ids are sanitized for filenames; the displayed id lives inside
/// the payload. A sanitized collision overwrites, which save detects as a
/// normal overwrite.
fn sanitize_thread_id(thread_id: &str) -> String {
    thread_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Checkpointer writing `<dir>/<sanitized-id>.json`. The directory is
/// created on first save; corrupt files load as `None`.
pub struct FileSaver {
    dir: PathBuf,
}

impl FileSaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, thread_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", sanitize_thread_id(thread_id)))
    }

    fn read_checkpoint(path: &Path) -> Option<Checkpoint> {
        let bytes = std::fs::read(path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(cp) => Some(cp),
            Err(e) => {
                log::warn!("corrupt checkpoint at {}: {}", path.display(), e);
                None
            }
        }
    }
}

#[async_trait]
impl Checkpointer for FileSaver {
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistenceError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&checkpoint.thread_id);
        let stamped = checkpoint.stamped(Self::read_checkpoint(&path).as_ref());
        let bytes = serde_json::to_vec_pretty(&stamped)?;
        std::fs::write(&path, bytes)?;
        Ok(())
    }

    async fn load(&self, thread_id: &str) -> Result<Option<Checkpoint>, PersistenceError> {
        let path = self.path_for(thread_id);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Self::read_checkpoint(&path))
    }

    async fn list(&self) -> Result<Vec<String>, PersistenceError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                // The payload carries the display id; corrupt files are skipped.
                if let Some(cp) = Self::read_checkpoint(&path) {
                    ids.push(cp.thread_id);
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, thread_id: &str) -> Result<(), PersistenceError> {
        let path = self.path_for(thread_id);
        if path.is_file() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    async fn exists(&self, thread_id: &str) -> Result<bool, PersistenceError> {
        Ok(self.path_for(thread_id).is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::test_support::{exercise_checkpointer, sample_checkpoint};

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "deepagents-ckpt-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_sanitize_thread_id() {
        assert_eq!(sanitize_thread_id("thread-1_a"), "thread-1_a");
        assert_eq!(sanitize_thread_id("user/session:42"), "user_session_42");
    }

    #[tokio::test]
    async fn test_file_saver_contract() {
        let dir = temp_dir("contract");
        exercise_checkpointer(&FileSaver::new(&dir)).await;
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_display_id_preserved_in_payload() {
        let dir = temp_dir("display");
        let saver = FileSaver::new(&dir);
        saver.save(&sample_checkpoint("user/session:42", 1)).await.unwrap();

        assert!(dir.join("user_session_42.json").is_file());
        let loaded = saver.load("user/session:42").await.unwrap().unwrap();
        assert_eq!(loaded.thread_id, "user/session:42");
        assert_eq!(saver.list().await.unwrap(), vec!["user/session:42"]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_as_none() {
        let dir = temp_dir("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("broken.json"), b"{ not json").unwrap();
        let saver = FileSaver::new(&dir);
        assert!(saver.load("broken").await.unwrap().is_none());
        // A fresh save overwrites the corrupt record.
        saver.save(&sample_checkpoint("broken", 1)).await.unwrap();
        assert!(saver.load("broken").await.unwrap().is_some());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
