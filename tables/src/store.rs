//! Published graphs, one per course.
//!
//! A graph is immutable once published. Readers get an `Arc<Tables>` and keep
//! it as long as they like; an update builds a brand-new graph next to the old
//! one and swaps the `Arc` in a single write, so nobody ever sees a half-built
//! graph.

use crate::builder::EntityGraphBuilder;
use crate::cache::TableCache;
use crate::error::SourceFetchError;
use crate::fetch::{FetchPool, fetch_raw_tables};
use crate::model::Tables;
use crate::traits::source::TableSource;
use crate::types::CourseId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task;
use tracing::{info, warn};

pub struct TableStore {
    source: Arc<dyn TableSource>,
    pool: FetchPool,
    cache: Option<TableCache>,
    published: RwLock<HashMap<CourseId, Arc<Tables>>>,
    /// Held for the whole of a build, so builds never overlap.
    building: Mutex<()>,
}

impl TableStore {
    pub fn new(source: Arc<dyn TableSource>, pool: FetchPool) -> Self {
        Self {
            source,
            pool,
            cache: None,
            published: RwLock::new(HashMap::new()),
            building: Mutex::new(()),
        }
    }

    /// Persist built graphs to `cache` and reuse them on the next start.
    pub fn with_cache(mut self, cache: TableCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&TableCache> {
        self.cache.as_ref()
    }

    /// The graph currently published for `course`, if any.
    pub async fn published(&self, course: &CourseId) -> Option<Arc<Tables>> {
        self.published.read().await.get(course).cloned()
    }

    /// The graph of `course`: the published one, else the cached one, else a
    /// freshly fetched and built one.
    pub async fn tables(&self, course: &CourseId) -> Result<Arc<Tables>, SourceFetchError> {
        if let Some(tables) = self.published(course).await {
            return Ok(tables);
        }

        let _building = self.building.lock().await;
        // Someone else may have published while we waited.
        if let Some(tables) = self.published(course).await {
            return Ok(tables);
        }

        if let Some(tables) = self.load_cached(course).await {
            info!(course = %course, "loaded tables from cache");
            return Ok(self.publish(tables).await);
        }

        let tables = self.publish(self.build(course).await?).await;
        self.persist(Arc::clone(&tables)).await;
        Ok(tables)
    }

    /// Discard everything known about `course` and rebuild it from the source.
    ///
    /// On failure the previously published graph stays in place.
    pub async fn update(&self, course: &CourseId) -> Result<Arc<Tables>, SourceFetchError> {
        let _building = self.building.lock().await;

        if let Some(cache) = self.cache.clone() {
            let id = course.clone();
            match task::spawn_blocking(move || cache.invalidate(&id)).await {
                Ok(Ok(_)) => {}
                Ok(Err(err)) => warn!(course = %course, "could not invalidate cache: {err}"),
                Err(err) => warn!(course = %course, "cache invalidation task failed: {err}"),
            }
        }

        let tables = self.publish(self.build(course).await?).await;
        self.persist(Arc::clone(&tables)).await;
        info!(course = %course, "tables updated");
        Ok(tables)
    }

    /// Fetch and build. Callers hold `building`.
    async fn build(&self, course: &CourseId) -> Result<Tables, SourceFetchError> {
        let raw = fetch_raw_tables(Arc::clone(&self.source), &self.pool, course).await?;
        Ok(EntityGraphBuilder::new(course.clone()).build(&raw).tables)
    }

    /// Cached graph of `course`, read off the async runtime.
    async fn load_cached(&self, course: &CourseId) -> Option<Tables> {
        let cache = self.cache.clone()?;
        let id = course.clone();
        match task::spawn_blocking(move || cache.fetch(&id)).await {
            Ok(tables) => tables,
            Err(err) => {
                warn!(course = %course, "cache read task failed: {err}");
                None
            }
        }
    }

    /// Write `tables` to the cache. Failures are logged and otherwise ignored.
    async fn persist(&self, tables: Arc<Tables>) {
        let Some(cache) = self.cache.clone() else {
            return;
        };
        let course = tables.course().clone();
        match task::spawn_blocking(move || cache.store(&tables)).await {
            Ok(Ok(_)) => {}
            Ok(Err(err)) => warn!(course = %course, "could not persist tables: {err}"),
            Err(err) => warn!(course = %course, "cache write task failed: {err}"),
        }
    }

    async fn publish(&self, tables: Tables) -> Arc<Tables> {
        let tables = Arc::new(tables);
        self.published
            .write()
            .await
            .insert(tables.course().clone(), Arc::clone(&tables));
        tables
    }
}
