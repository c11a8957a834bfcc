//! Concurrent fetch of the raw tables of one course.
//!
//! The five upstream reads (assignments, groups, all persons, the student
//! roster and the activity log) are spawned as independent tasks, each holding
//! a permit of the shared [`FetchPool`] while it runs, and joined at a single
//! barrier. Nothing is built until all of them have succeeded; the first
//! failure fails the whole fetch.

use crate::error::SourceFetchError;
use crate::raw::{RawTables, RoleFilter, TableKind};
use crate::traits::source::TableSource;
use crate::types::CourseId;
use futures::future::try_join5;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Bounds how many upstream fetches run at once, across every course.
#[derive(Debug, Clone)]
pub struct FetchPool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl FetchPool {
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Pool sized by `AppConfig::fetch_workers`.
    pub fn from_config() -> Self {
        Self::new(util::config::AppConfig::global().fetch_workers)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawn `fut` on the runtime; it starts once a permit is free.
    fn spawn<T, F>(&self, table: TableKind, course: &CourseId, fut: F) -> Pending<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, SourceFetchError>> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let label = course.clone();
        let handle = tokio::spawn(async move {
            let _permit = permits.acquire_owned().await.map_err(|_| SourceFetchError::Aborted {
                table,
                course: label.clone(),
            })?;
            debug!(course = %label, %table, "fetching");
            fut.await
        });
        Pending {
            table,
            course: course.clone(),
            handle,
        }
    }
}

/// A spawned fetch, awaited at the barrier. Dropping it aborts the task, so
/// when one fetch fails the others stop and hand back their permits.
struct Pending<T> {
    table: TableKind,
    course: CourseId,
    handle: JoinHandle<Result<T, SourceFetchError>>,
}

impl<T> Pending<T> {
    async fn join(mut self) -> Result<T, SourceFetchError> {
        match (&mut self.handle).await {
            Ok(result) => result,
            Err(_) => Err(SourceFetchError::Aborted {
                table: self.table,
                course: self.course.clone(),
            }),
        }
    }
}

impl<T> Drop for Pending<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Fetch every raw table of `course` concurrently and join them.
pub async fn fetch_raw_tables(
    source: Arc<dyn TableSource>,
    pool: &FetchPool,
    course: &CourseId,
) -> Result<RawTables, SourceFetchError> {
    let assignments = {
        let (source, id) = (Arc::clone(&source), course.clone());
        pool.spawn(TableKind::Assignments, course, async move {
            source.fetch_assignments(&id).await
        })
    };
    let groups = {
        let (source, id) = (Arc::clone(&source), course.clone());
        pool.spawn(TableKind::Groups, course, async move {
            source.fetch_groups(&id).await
        })
    };
    let persons = {
        let (source, id) = (Arc::clone(&source), course.clone());
        pool.spawn(TableKind::Persons, course, async move {
            source.fetch_persons(&id, RoleFilter::All).await
        })
    };
    let roster = {
        let (source, id) = (Arc::clone(&source), course.clone());
        pool.spawn(TableKind::Roster, course, async move {
            source.fetch_persons(&id, RoleFilter::Students).await
        })
    };
    let log = {
        let (source, id) = (Arc::clone(&source), course.clone());
        pool.spawn(TableKind::ActivityLog, course, async move {
            source.fetch_activity_log(&id).await
        })
    };

    let joined = try_join5(
        assignments.join(),
        groups.join(),
        persons.join(),
        roster.join(),
        log.join(),
    )
    .await;

    match joined {
        Ok((assignments, groups, persons, roster, log)) => Ok(RawTables {
            assignments,
            groups,
            persons,
            roster,
            log,
        }),
        Err(err) => {
            error!(course = %course, table = %err.table(), "fetch failed: {err}");
            Err(err)
        }
    }
}
