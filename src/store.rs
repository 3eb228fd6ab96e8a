//! Persistence for the catalogue document.
//!
//! The document lives in a single JSON file and every write replaces the
//! whole file, so the last writer wins. Reads never fail: a missing file
//! means an empty catalogue, and an unreadable or corrupt one is logged and
//! treated the same way rather than taking the API down.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::models::Catalog;

#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn load(&self) -> Catalog {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Catalog::default(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read catalog file, starting empty");
                return Catalog::default();
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(catalog) => catalog,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "catalog file is not valid JSON, starting empty");
                Catalog::default()
            }
        }
    }

    pub async fn save(&self, catalog: &Catalog) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("failed to create catalog directory")?;
        }

        let bytes = serde_json::to_vec_pretty(catalog).context("failed to serialize catalog")?;
        tokio::fs::write(&self.path, bytes)
            .await
            .context("failed to write catalog file")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DesignPatch;

    #[tokio::test]
    async fn missing_file_loads_as_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("catalog.json"));
        let catalog = store.load().await;
        assert!(catalog.designs.is_empty());
        assert!(catalog.brand_logo.is_none());
    }

    #[tokio::test]
    async fn corrupt_file_loads_as_empty_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = CatalogStore::new(&path);
        let catalog = store.load().await;
        assert!(catalog.designs.is_empty());
    }

    #[tokio::test]
    async fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CatalogStore::new(dir.path().join("nested").join("catalog.json"));

        let mut catalog = Catalog::default();
        catalog.seed_branding();
        catalog.upsert(DesignPatch::new("TILE1", "default", "Tile One"), 42);
        store.save(&catalog).await.unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.designs.len(), 1);
        assert_eq!(loaded.designs[0].id, "TILE1");
        assert_eq!(loaded.designs[0].created_at, 42);
        assert_eq!(loaded.brand_logo, catalog.brand_logo);
    }
}
