//! Per-file reader/writer locks held across blob access

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::model::FileId;

/// Readers of one file share a lock; deleting or replacing content takes it
/// exclusively. A reader therefore sees the full prior content or no file.
///
/// An entry lives only while some caller holds or waits on it.
#[derive(Default)]
pub(crate) struct FileLocks {
    locks: Mutex<HashMap<FileId, Arc<RwLock<()>>>>,
}

pub(crate) type FileReadGuard<'a> = FileGuard<'a, OwnedRwLockReadGuard<()>>;
pub(crate) type FileWriteGuard<'a> = FileGuard<'a, OwnedRwLockWriteGuard<()>>;

/// Held lock on one file. Dropping the last one removes the table entry.
pub(crate) struct FileGuard<'a, G> {
    locks: &'a FileLocks,
    id: FileId,
    lock: Arc<RwLock<()>>,
    guard: Option<G>,
}

impl FileLocks {
    fn table(&self) -> MutexGuard<'_, HashMap<FileId, Arc<RwLock<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn entry(&self, id: FileId) -> Arc<RwLock<()>> {
        self.table().entry(id).or_default().clone()
    }

    pub(crate) async fn read(&self, id: FileId) -> FileReadGuard<'_> {
        let lock = self.entry(id);
        let guard = lock.clone().read_owned().await;
        FileGuard {
            locks: self,
            id,
            lock,
            guard: Some(guard),
        }
    }

    pub(crate) async fn write(&self, id: FileId) -> FileWriteGuard<'_> {
        let lock = self.entry(id);
        let guard = lock.clone().write_owned().await;
        FileGuard {
            locks: self,
            id,
            lock,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.table().len()
    }
}

impl<G> Drop for FileGuard<'_, G> {
    fn drop(&mut self) {
        self.guard.take();

        // Clones are only handed out under the table lock, so a count of
        // two (table plus this guard) means nobody else holds or awaits it
        let mut table = self.locks.table();
        if Arc::strong_count(&self.lock) == 2 {
            table.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_writer_waits_for_reader() {
        let locks = Arc::new(FileLocks::default());
        let id = FileId::new(1);

        let reader = locks.read(id).await;
        let pending = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.write(id).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());

        drop(reader);
        pending.await.unwrap();
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_readers_share() {
        let locks = FileLocks::default();
        let id = FileId::new(1);

        let a = locks.read(id).await;
        let b = locks.read(id).await;
        assert_eq!(locks.len(), 1);

        drop(a);
        assert_eq!(locks.len(), 1);
        drop(b);
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_entry_dropped_after_release() {
        let locks = FileLocks::default();

        for raw in 0..100 {
            let _guard = locks.write(FileId::new(raw)).await;
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_waiter_keeps_entry() {
        let locks = Arc::new(FileLocks::default());
        let id = FileId::new(5);

        let writer = locks.write(id).await;
        let waiting = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.read(id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(writer);
        assert_eq!(locks.len(), 1);

        waiting.await.unwrap();
        assert_eq!(locks.len(), 0);
    }
}
