// # File Document Store
//
// File-based implementation of DocumentStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good document
// - Recovery: Falls back to backup if corruption detected
// - Preservation: An unreadable file is copied to .corrupt; with no usable
//   backup the load fails instead of starting empty
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "equipment": [ { "id": "1", "name": "Core Router", "type": "Router", "source": "Manual" } ],
//   "addresses": [],
//   "port_mappings": [],
//   "wan_links": [],
//   "providers": {
//     "unifi": { "kind": "unifi", "config": { "endpoint": "https://unifi.local:8443" } }
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::Error;
use crate::traits::document_store::{DOCUMENT_VERSION, DocumentStore, InventoryDocument};

/// File-based document store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use netdoc_core::state::FileDocumentStore;
/// use netdoc_core::traits::DocumentStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileDocumentStore::new("/var/lib/netdoc/inventory.json").await?;
///     let document = store.load().await?.unwrap_or_default();
///     store.save(&document).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileDocumentStore {
    path: PathBuf,
    /// Serializes writers so temp/backup files aren't shared
    write_lock: Mutex<()>,
}

impl FileDocumentStore {
    /// Create a file document store, creating parent directories if needed
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create document directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the main document file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document with automatic recovery
    ///
    /// Recovery strategy:
    /// 1. Try to load main file
    /// 2. If it is corrupt, copy it aside to `.corrupt` so no later save can rotate it away
    /// 3. Load the backup (and restore it) if there is a readable one
    /// 4. Otherwise fail; starting empty would overwrite the user's inventory
    async fn load_with_recovery(&self) -> Result<Option<InventoryDocument>, Error> {
        let parse_err = match Self::load_document(&self.path).await {
            Ok(doc) => return Ok(doc),
            Err(LoadError::Io(e)) => return Err(e),
            Err(LoadError::Corrupt(e)) => e,
        };

        tracing::error!(
            "Document file appears corrupted: {}. Attempting recovery from backup.",
            parse_err
        );

        let corrupt_path = Self::corrupt_path(&self.path);
        fs::copy(&self.path, &corrupt_path).await.map_err(|e| {
            Error::document_store(format!(
                "{}; could not preserve it at {}: {}",
                parse_err,
                corrupt_path.display(),
                e
            ))
        })?;
        tracing::warn!("Preserved unreadable document at {}", corrupt_path.display());

        let backup_path = Self::backup_path(&self.path);
        match Self::load_document(&backup_path).await {
            Ok(Some(doc)) => {
                tracing::warn!(
                    "Recovered document from backup: {} equipment, {} addresses",
                    doc.equipment.len(),
                    doc.addresses.len()
                );
                if let Err(restore_err) =
                    Self::restore_from_backup(&self.path, &backup_path).await
                {
                    tracing::error!(
                        "Failed to restore document file from backup: {}",
                        restore_err
                    );
                }
                Ok(Some(doc))
            }
            Ok(None) => Err(Error::document_store(format!(
                "{}; no backup to recover from, original kept at {}",
                parse_err,
                corrupt_path.display()
            ))),
            Err(backup_err) => Err(Error::document_store(format!(
                "{}; backup also unreadable ({}), original kept at {}",
                parse_err,
                backup_err,
                corrupt_path.display()
            ))),
        }
    }

    /// Load a document file
    async fn load_document(path: &Path) -> Result<Option<InventoryDocument>, LoadError> {
        if !path.exists() {
            tracing::debug!("Document file does not exist: {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            LoadError::Io(Error::document_store(format!(
                "Failed to read document file {}: {}",
                path.display(),
                e
            )))
        })?;

        let document: InventoryDocument = serde_json::from_str(&content).map_err(|e| {
            LoadError::Corrupt(Error::document_store(format!(
                "Failed to parse document file {}: {}",
                path.display(),
                e
            )))
        })?;

        if document.version != DOCUMENT_VERSION {
            tracing::warn!(
                "Document version mismatch: expected {}, got {}. Attempting to load anyway.",
                DOCUMENT_VERSION,
                document.version
            );
        }

        Ok(Some(document))
    }

    /// Write the document atomically
    async fn write_document(&self, document: &InventoryDocument) -> Result<(), Error> {
        let _guard = self.write_lock.lock().await;

        let json = serde_json::to_string_pretty(document)?;

        // Write to temporary file first
        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::document_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await?;
            file.flush().await?;
        }

        // Keep the last good file as backup
        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::document_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Document written to file: {}", self.path.display());
        Ok(())
    }

    /// Restore document file from backup
    async fn restore_from_backup(path: &Path, backup_path: &Path) -> Result<(), Error> {
        fs::copy(backup_path, path).await.map_err(|e| {
            Error::document_store(format!(
                "Failed to restore from backup {} to {}: {}",
                backup_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!("Restored document file from backup");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }

    fn corrupt_path(path: &Path) -> PathBuf {
        let mut corrupt = path.to_path_buf();
        corrupt.set_extension("corrupt");
        corrupt
    }
}

/// Distinguishes a corrupt file (recoverable from backup) from an I/O failure
enum LoadError {
    Corrupt(Error),
    Io(Error),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Corrupt(e) | LoadError::Io(e) => e.fmt(f),
        }
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn load(&self) -> Result<Option<InventoryDocument>, Error> {
        self.load_with_recovery().await
    }

    async fn save(&self, document: &InventoryDocument) -> Result<(), Error> {
        self.write_document(document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AddressEntry, DeviceType, Equipment};

    fn sample_document() -> InventoryDocument {
        let mut doc = InventoryDocument::default();
        doc.equipment.push(Equipment::new("1", "Core Router", DeviceType::Router));
        doc.addresses.push(AddressEntry::new("1", "Core Router", "192.168.1.1"));
        doc
    }

    #[tokio::test]
    async fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::new(dir.path().join("inventory.json")).await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("inventory.json");

        let store = FileDocumentStore::new(&path).await.unwrap();
        store.save(&sample_document()).await.unwrap();

        let reopened = FileDocumentStore::new(&path).await.unwrap();
        let doc = reopened.load().await.unwrap().unwrap();
        assert_eq!(doc.equipment.len(), 1);
        assert_eq!(doc.addresses[0].ip, "192.168.1.1");
    }

    #[tokio::test]
    async fn test_corrupt_file_recovers_from_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        let store = FileDocumentStore::new(&path).await.unwrap();

        // Two saves so the first lands in the backup
        store.save(&sample_document()).await.unwrap();
        store.save(&sample_document()).await.unwrap();

        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let doc = store.load().await.unwrap().unwrap();
        assert_eq!(doc.equipment[0].name, "Core Router");

        // Main file was restored
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(serde_json::from_str::<InventoryDocument>(&content).is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_file_without_backup_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        tokio::fs::write(&path, b"garbage").await.unwrap();

        let store = FileDocumentStore::new(&path).await.unwrap();
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, Error::DocumentStore(_)));
        assert!(err.to_string().contains("inventory.corrupt"));
    }

    #[tokio::test]
    async fn test_one_unknown_record_keeps_inventory_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        let original = r#"{
            "version": "1.0",
            "equipment": [
                { "id": "1", "name": "Core", "type": "Router", "source": "Manual" },
                { "id": "2", "name": "Edge", "type": "Switch", "source": "Manual" },
                { "id": "3", "name": "Lobby", "type": "AP", "source": "Manual" }
            ],
            "addresses": [],
            "providers": {
                "unifi": { "kind": "unifi", "config": { "endpoint": "https://unifi.local" } }
            }
        }"#;
        tokio::fs::write(&path, original).await.unwrap();

        let store = FileDocumentStore::new(&path).await.unwrap();
        assert!(store.load().await.is_err());
        // Loading again after a failed start still refuses
        assert!(store.load().await.is_err());

        let main = tokio::fs::read_to_string(&path).await.unwrap();
        let preserved = tokio::fs::read_to_string(dir.path().join("inventory.corrupt"))
            .await
            .unwrap();
        assert_eq!(main, original);
        assert_eq!(preserved, original);
    }

    #[tokio::test]
    async fn test_recovery_from_backup_preserves_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        let store = FileDocumentStore::new(&path).await.unwrap();
        store.save(&sample_document()).await.unwrap();
        store.save(&sample_document()).await.unwrap();

        tokio::fs::write(&path, b"{ half written").await.unwrap();
        assert!(store.load().await.unwrap().is_some());

        let preserved = tokio::fs::read_to_string(dir.path().join("inventory.corrupt"))
            .await
            .unwrap();
        assert_eq!(preserved, "{ half written");
    }
}
