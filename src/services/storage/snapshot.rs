use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;

use super::memory::Tables;
use super::{StorageError, StorageResult};

/// JSON snapshot of [`Tables`] on local disk.
///
/// Writes go to a sibling temp file which is then renamed over the target,
/// so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_else(|| "snapshot".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// A missing or blank file is an empty data set.
    pub async fn load(&self) -> StorageResult<Tables> {
        let bytes = match async_fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Tables::default()),
            Err(e) => return Err(e.into()),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Tables::default());
        }

        let mut tables: Tables = serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::Corrupt(format!("{}: {}", self.path.display(), e))
        })?;
        tables.repair();
        Ok(tables)
    }

    pub async fn save(&self, tables: &Tables) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(tables)
            .map_err(|e| StorageError::Backend(format!("Failed to encode snapshot: {}", e)))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            async_fs::create_dir_all(parent).await?;
        }

        let temp = self.temp_path();
        async_fs::write(&temp, &bytes).await?;
        async_fs::rename(&temp, &self.path).await?;

        tracing::debug!("Wrote storage snapshot to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::NewCategory;
    use crate::models::RecordId;
    use chrono::Utc;

    fn pottery() -> NewCategory {
        NewCategory {
            name: "Pottery".to_string(),
            description: None,
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let tables = SnapshotFile::new(dir.path().join("absent.json")).load().await.unwrap();
        assert_eq!(tables.users.len(), 0);
        assert_eq!(tables.categories.len(), 0);
    }

    #[tokio::test]
    async fn test_unreadable_snapshot_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, b"{\"users\": 12}").unwrap();

        let err = SnapshotFile::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt(_)));
    }

    #[tokio::test]
    async fn test_save_then_load_keeps_counters() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = SnapshotFile::new(dir.path().join("store.json"));

        let mut tables = Tables::default();
        tables.categories.insert_with(|id| pottery().into_record(id, Utc::now()));
        tables.categories.insert_with(|id| pottery().into_record(id, Utc::now()));
        snapshot.save(&tables).await.unwrap();
        assert!(!snapshot.temp_path().exists());

        let mut loaded = snapshot.load().await.unwrap();
        assert_eq!(loaded.categories.len(), 2);
        let next = loaded
            .categories
            .insert_with(|id| pottery().into_record(id, Utc::now()));
        assert_eq!(next.id, RecordId::new(3));
    }

    #[tokio::test]
    async fn test_counter_repaired_when_behind_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let now = Utc::now().to_rfc3339();
        let raw = serde_json::json!({
            "categories": {
                "nextId": 1,
                "rows": [
                    { "id": 7, "name": "Textiles", "description": null, "imageUrl": null, "createdAt": now },
                    { "id": 4, "name": "Pottery", "description": null, "imageUrl": null, "createdAt": now }
                ]
            }
        });
        std::fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        let mut tables = SnapshotFile::new(&path).load().await.unwrap();
        assert_eq!(
            tables.categories.list(None).iter().map(|c| c.id.get()).collect::<Vec<_>>(),
            [4, 7]
        );
        assert_eq!(tables.categories.get(RecordId::new(7)).map(|c| c.name), Some("Textiles".into()));

        let next = tables
            .categories
            .insert_with(|id| pottery().into_record(id, Utc::now()));
        assert_eq!(next.id, RecordId::new(8));
    }
}
