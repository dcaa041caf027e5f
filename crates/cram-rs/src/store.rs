//! Asset store: read-before-generate, write-after-generate.
//!
//! The [`AssetStore`] trait is the persistence seam — production code backs
//! it with whatever session store the host application uses; tests and
//! small deployments use the built-in [`MemoryAssetStore`]. The pipeline's
//! protocol is fixed: look up the fingerprint before doing any work, and on
//! a hit return the cached asset without issuing a model call. This is the
//! system's primary cost-control mechanism.

use crate::asset::LearningAsset;
use crate::fingerprint::Fingerprint;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Boxed future returned by [`AssetStore`] methods.
///
/// Type alias to keep trait signatures and implementations readable.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Keyed persistence for generated assets.
///
/// Implementations must support concurrent read/write without corrupting
/// entries: a read racing a write for the same fingerprint sees either the
/// old value or the new one, never a partial write.
///
/// Uses boxed futures so that the trait is dyn-compatible (object-safe).
pub trait AssetStore: Send + Sync {
    /// Look up a previously generated asset by fingerprint.
    fn lookup<'a>(&'a self, fingerprint: &'a Fingerprint) -> StoreFuture<'a, Option<LearningAsset>>;

    /// Store a freshly generated asset under its fingerprint.
    ///
    /// Assets are immutable after creation: if an entry already exists for
    /// this fingerprint, the existing entry wins and the new one is dropped.
    fn store<'a>(
        &'a self,
        fingerprint: &'a Fingerprint,
        asset: LearningAsset,
    ) -> StoreFuture<'a, ()>;
}

/// In-memory [`AssetStore`] backed by a `Mutex<HashMap>`.
///
/// Tracks hit/miss counters for diagnostics.
#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    entries: Mutex<HashMap<Fingerprint, LearningAsset>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// (hits, misses) since creation.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Number of stored assets.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetStore for MemoryAssetStore {
    fn lookup<'a>(&'a self, fingerprint: &'a Fingerprint) -> StoreFuture<'a, Option<LearningAsset>> {
        Box::pin(async move {
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            match entries.get(fingerprint) {
                Some(asset) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    debug!("asset store hit: {fingerprint}");
                    Some(asset.clone())
                }
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    debug!("asset store miss: {fingerprint}");
                    None
                }
            }
        })
    }

    fn store<'a>(
        &'a self,
        fingerprint: &'a Fingerprint,
        asset: LearningAsset,
    ) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.entry(fingerprint.clone()).or_insert(asset);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::{ContentType, Flashcard, NoteSection, QuizItem};
    use chrono::Utc;

    fn sample_asset(title: &str) -> LearningAsset {
        LearningAsset {
            id: "asset-1".into(),
            title: title.into(),
            notes: vec![NoteSection {
                id: "n1".into(),
                heading: "Forces".into(),
                content: "A force changes motion.".into(),
                bullets: vec![],
                example: None,
                derivation: None,
                explanation: None,
                applications: vec![],
                common_mistakes: vec![],
                summary_table: vec![],
            }],
            quizzes: vec![QuizItem {
                id: "q1".into(),
                question: "F = ?".into(),
                options: vec!["ma".into(), "mv".into()],
                correct_index: 0,
                explanation: "Newton's second law.".into(),
                difficulty: None,
            }],
            flashcards: vec![Flashcard {
                id: "f1".into(),
                front: "Force".into(),
                back: "Mass times acceleration".into(),
                tag: None,
            }],
            summary_for_chat: "Covers Newton's second law.".into(),
            source: ContentType::Document,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn lookup_miss_then_hit() {
        let store = MemoryAssetStore::new();
        let fp = Fingerprint::of("some text");

        assert!(store.lookup(&fp).await.is_none());
        store.store(&fp, sample_asset("Mechanics")).await;
        let found = store.lookup(&fp).await.unwrap();
        assert_eq!(found.title, "Mechanics");
        assert_eq!(store.stats(), (1, 1));
    }

    #[tokio::test]
    async fn store_never_overwrites_existing_entry() {
        let store = MemoryAssetStore::new();
        let fp = Fingerprint::of("some text");

        store.store(&fp, sample_asset("first")).await;
        store.store(&fp, sample_asset("second")).await;

        assert_eq!(store.lookup(&fp).await.unwrap().title, "first");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn distinct_fingerprints_are_independent() {
        let store = MemoryAssetStore::new();
        let a = Fingerprint::of("a");
        let b = Fingerprint::of("b");

        store.store(&a, sample_asset("A")).await;
        assert!(store.lookup(&b).await.is_none());
        assert_eq!(store.len(), 1);
    }
}
