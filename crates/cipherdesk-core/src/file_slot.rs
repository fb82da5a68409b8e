//! Holder of the single active file.
//!
//! Purely in-memory. Disk state is validated by callers before a record is
//! stored, and re-checked by callers before a record is used.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// One materialised file. `id` is fresh for every import and every engine
/// output, so two records for the same path and size still differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(skip)]
    pub id: Uuid,
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

#[derive(Debug, Default)]
pub struct FileSlot {
    current: Mutex<Option<FileRecord>>,
}

impl FileSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record`, returning the record it replaced.
    pub fn set(&self, record: FileRecord) -> Option<FileRecord> {
        self.current.lock().replace(record)
    }

    pub fn get(&self) -> Option<FileRecord> {
        self.current.lock().clone()
    }

    pub fn clear(&self) -> Option<FileRecord> {
        self.current.lock().take()
    }

    /// Swaps in `next` only while the slot still holds `expected` (same `id`).
    /// When the slot changed in the meantime, `next` is handed back untouched.
    pub fn replace_if_current(
        &self,
        expected: &FileRecord,
        next: FileRecord,
    ) -> Result<(), FileRecord> {
        let mut current = self.current.lock();
        if current.as_ref().is_some_and(|r| r.id == expected.id) {
            *current = Some(next);
            Ok(())
        } else {
            Err(next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, size: u64) -> FileRecord {
        FileRecord {
            id: Uuid::new_v4(),
            path: PathBuf::from("/scratch").join(name),
            name: name.to_string(),
            size,
        }
    }

    #[test]
    fn set_get_clear() {
        let slot = FileSlot::new();
        assert!(slot.get().is_none());
        assert!(slot.set(record("a.txt", 3)).is_none());
        assert_eq!(slot.get().unwrap().name, "a.txt");

        let previous = slot.set(record("b.txt", 4)).unwrap();
        assert_eq!(previous.name, "a.txt");

        assert_eq!(slot.clear().unwrap().name, "b.txt");
        assert!(slot.clear().is_none());
    }

    #[test]
    fn replace_only_when_unchanged() {
        let slot = FileSlot::new();
        let a = record("a.txt", 3);
        slot.set(a.clone());
        assert!(slot.replace_if_current(&a, record("a.txt.enc", 19)).is_ok());
        assert_eq!(slot.get().unwrap().name, "a.txt.enc");

        // `a` is no longer current: the swap is refused and the record returned.
        let refused = slot.replace_if_current(&a, record("late.enc", 1)).unwrap_err();
        assert_eq!(refused.name, "late.enc");
        assert_eq!(slot.get().unwrap().name, "a.txt.enc");

        slot.clear();
        assert!(slot.replace_if_current(&a, record("x", 1)).is_err());
        assert!(slot.get().is_none());
    }

    #[test]
    fn reimport_with_identical_metadata_is_not_current() {
        let slot = FileSlot::new();
        let old = record("a.txt", 4);
        slot.set(old.clone());
        let reimported = FileRecord {
            id: Uuid::new_v4(),
            ..old.clone()
        };
        slot.set(reimported.clone());

        let refused = slot.replace_if_current(&old, record("a.txt.enc", 4)).unwrap_err();
        assert_eq!(refused.name, "a.txt.enc");
        assert_eq!(slot.get().unwrap(), reimported);
    }
}
