//! Gallery state and its write-through persistence

use log::{debug, error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::store::{KeyValueStore, StoreError};

/// Errors raised while moving the gallery in or out of the store
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("failed to read gallery: {0}")]
    Read(#[source] StoreError),

    #[error("stored gallery is not a JSON array of strings: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode gallery: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to write gallery: {0}")]
    Write(#[source] StoreError),
}

/// Ordered list of image references (file paths or URIs).
///
/// References are opaque: they are never deduplicated, validated or
/// dereferenced here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Gallery {
    items: Vec<String>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, reference: String) {
        self.items.push(reference);
    }

    /// Split the gallery into grid rows of `columns` cells.
    /// Each cell carries the item's index, which doubles as its key.
    pub fn rows(&self, columns: usize) -> Vec<Vec<(usize, &str)>> {
        let columns = columns.max(1);
        self.items
            .iter()
            .enumerate()
            .map(|(index, reference)| (index, reference.as_str()))
            .collect::<Vec<_>>()
            .chunks(columns)
            .map(|row| row.to_vec())
            .collect()
    }
}

impl From<Vec<String>> for Gallery {
    fn from(items: Vec<String>) -> Self {
        Self { items }
    }
}

/// Owns the in-memory gallery and keeps the durable copy in step with it.
///
/// Appends are serialized: the gallery lock is held until the write has
/// finished, so the stored list always matches the latest append.
pub struct GalleryStore<S> {
    store: S,
    key: String,
    gallery: Mutex<Gallery>,
}

impl<S: KeyValueStore> GalleryStore<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            gallery: Mutex::new(Gallery::new()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Copy of the current in-memory gallery
    pub async fn snapshot(&self) -> Gallery {
        self.gallery.lock().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.gallery.lock().await.len()
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.gallery.lock().await.is_empty()
    }

    /// Restore the gallery from the store.
    ///
    /// A missing (or empty) value leaves the gallery as it is. On any failure
    /// the error is logged, the gallery is left untouched and the error is
    /// handed back so the caller may surface it.
    pub async fn load(&self) -> Result<usize, GalleryError> {
        let raw = match self.store.get_item(&self.key).await {
            Ok(raw) => raw,
            Err(e) => {
                error!("Failed to load images from storage: {}", e);
                return Err(GalleryError::Read(e));
            }
        };

        let mut gallery = self.gallery.lock().await;

        let Some(raw) = raw.filter(|raw| !raw.is_empty()) else {
            info!("No stored gallery under {:?}, starting empty", self.key);
            return Ok(gallery.len());
        };

        match serde_json::from_str::<Gallery>(&raw) {
            Ok(loaded) => {
                *gallery = loaded;
                info!("Loaded {} images from storage", gallery.len());
                Ok(gallery.len())
            }
            Err(e) => {
                error!("Failed to load images from storage: {}", e);
                Err(GalleryError::Decode(e))
            }
        }
    }

    /// Add a reference to the end of the gallery and write the whole list
    /// back to the store.
    ///
    /// The in-memory append is kept even when the write fails.
    pub async fn append(&self, reference: String) -> Result<(), GalleryError> {
        let mut gallery = self.gallery.lock().await;
        debug!("Appending {:?} to gallery", reference);
        gallery.push(reference);
        self.persist(gallery.items()).await
    }

    /// Serialize `items` and overwrite the stored gallery with them.
    pub async fn persist(&self, items: &[String]) -> Result<(), GalleryError> {
        let json = serde_json::to_string(items).map_err(|e| {
            error!("Failed to save images to storage: {}", e);
            GalleryError::Encode(e)
        })?;

        if let Err(e) = self.store.set_item(&self.key, &json).await {
            error!("Failed to save images to storage: {}", e);
            return Err(GalleryError::Write(e));
        }

        debug!("Saved {} images under {:?}", items.len(), self.key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store whose writes always fail
    #[derive(Default)]
    struct BrokenStore {
        stored: Option<String>,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get_item(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(self.stored.clone())
        }

        async fn set_item(&self, key: &str, _value: &str) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Write {
                key: key.to_string(),
                source: std::io::Error::other("disk full"),
            })
        }
    }

    /// Store whose reads always fail
    struct UnreadableStore;

    #[async_trait]
    impl KeyValueStore for UnreadableStore {
        async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Read {
                key: key.to_string(),
                source: std::io::Error::other("permission denied"),
            })
        }

        async fn set_item(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Ok(())
        }
    }

    fn refs(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_load_missing_key_starts_empty() {
        let gallery = GalleryStore::new(MemoryStore::new(), "gallery");
        assert_eq!(gallery.load().await.unwrap(), 0);
        assert!(gallery.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_empty_string_is_absent() {
        let gallery = GalleryStore::new(MemoryStore::with_item("gallery", ""), "gallery");
        assert_eq!(gallery.load().await.unwrap(), 0);
        assert!(gallery.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let store = MemoryStore::with_item("gallery", r#"["img://a.png","img://b.png"]"#);
        let gallery = GalleryStore::new(store, "gallery");

        gallery.load().await.unwrap();
        let first = gallery.snapshot().await;
        gallery.load().await.unwrap();
        let second = gallery.snapshot().await;

        assert_eq!(first, second);
        assert_eq!(first.items(), refs(&["img://a.png", "img://b.png"]));
    }

    #[tokio::test]
    async fn test_append_preserves_order_and_duplicates() {
        let gallery = GalleryStore::new(MemoryStore::new(), "gallery");

        for reference in ["r1", "r2", "r1", "r3"] {
            gallery.append(reference.to_string()).await.unwrap();
        }

        assert_eq!(gallery.snapshot().await.items(), refs(&["r1", "r2", "r1", "r3"]));
    }

    #[tokio::test]
    async fn test_append_writes_through() {
        let store = MemoryStore::with_item("gallery", r#"["img://a.png"]"#);
        let gallery = GalleryStore::new(store, "gallery");
        gallery.load().await.unwrap();

        gallery.append("img://b.png".to_string()).await.unwrap();

        assert_eq!(
            gallery.snapshot().await.items(),
            refs(&["img://a.png", "img://b.png"])
        );
        assert_eq!(
            gallery.store.peek("gallery").as_deref(),
            Some(r#"["img://a.png","img://b.png"]"#)
        );
    }

    #[tokio::test]
    async fn test_persist_then_load_in_fresh_session() {
        let dir = tempfile::tempdir().unwrap();
        let items = refs(&["/photos/one.jpg", "content://media/2", "one more"]);

        let first = GalleryStore::new(crate::store::FileStore::new(dir.path().to_path_buf()), "gallery");
        first.persist(&items).await.unwrap();
        drop(first);

        let second = GalleryStore::new(crate::store::FileStore::new(dir.path().to_path_buf()), "gallery");
        second.load().await.unwrap();
        assert_eq!(second.snapshot().await.items(), items);
    }

    #[tokio::test]
    async fn test_load_malformed_keeps_state() {
        for raw in ["not json", r#"{"items":[]}"#, "null", "[1, 2]", r#""a.png""#] {
            let gallery = GalleryStore::new(MemoryStore::with_item("gallery", raw), "gallery");
            gallery.append("kept.png".to_string()).await.unwrap();

            // append overwrote the stored value; put the bad one back
            gallery.store.set_item("gallery", raw).await.unwrap();

            let err = gallery.load().await.unwrap_err();
            assert!(matches!(err, GalleryError::Decode(_)), "raw: {}", raw);
            assert_eq!(gallery.snapshot().await.items(), refs(&["kept.png"]));
        }
    }

    #[tokio::test]
    async fn test_load_read_failure_keeps_state() {
        let gallery = GalleryStore::new(UnreadableStore, "gallery");
        let err = gallery.load().await.unwrap_err();
        assert!(matches!(err, GalleryError::Read(_)));
        assert!(gallery.is_empty().await);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_in_memory_append() {
        let store = BrokenStore {
            stored: Some(r#"["a.png"]"#.to_string()),
            ..Default::default()
        };
        let gallery = GalleryStore::new(store, "gallery");
        gallery.load().await.unwrap();

        let err = gallery.append("b.png".to_string()).await.unwrap_err();
        assert!(matches!(err, GalleryError::Write(_)));
        assert_eq!(gallery.snapshot().await.items(), refs(&["a.png", "b.png"]));
        assert_eq!(gallery.store.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_appends_lose_nothing() {
        let gallery = Arc::new(GalleryStore::new(MemoryStore::new(), "gallery"));

        let a = {
            let gallery = Arc::clone(&gallery);
            tokio::spawn(async move { gallery.append("a.png".to_string()).await })
        };
        let b = {
            let gallery = Arc::clone(&gallery);
            tokio::spawn(async move { gallery.append("b.png".to_string()).await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        let snapshot = gallery.snapshot().await;
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot.items().contains(&"a.png".to_string()));
        assert!(snapshot.items().contains(&"b.png".to_string()));

        // Stored copy matches the final in-memory order
        let stored: Gallery =
            serde_json::from_str(&gallery.store.peek("gallery").unwrap()).unwrap();
        assert_eq!(stored, snapshot);
    }

    #[test]
    fn test_rows() {
        let gallery = Gallery::from(refs(&["a", "b", "c", "d"]));

        let rows = gallery.rows(3);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec![(0, "a"), (1, "b"), (2, "c")]);
        assert_eq!(rows[1], vec![(3, "d")]);

        // Zero columns falls back to a single column
        assert_eq!(gallery.rows(0).len(), 4);
        assert!(Gallery::new().rows(3).is_empty());
    }

    #[test]
    fn test_gallery_serializes_as_plain_array() {
        let gallery = Gallery::from(refs(&["img://a.png", "img://b.png"]));
        assert_eq!(
            serde_json::to_string(&gallery).unwrap(),
            r#"["img://a.png","img://b.png"]"#
        );
    }
}
