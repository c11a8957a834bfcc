use std::sync::Arc;
use tables::cache::TableCache;
use tables::fetch::FetchPool;
use tables::raw::TableKind;
use tables::store::TableStore;
use tables::test_utils::{InMemorySource, RawBuilder, at, large_course};
use tables::types::{AssignmentId, CourseId, GradeState, PersonId};
use tempfile::TempDir;

fn course() -> CourseId {
    CourseId::from("3003023")
}

#[tokio::test]
async fn update_swaps_the_graph_and_keeps_old_readers_consistent() {
    let source = Arc::new(InMemorySource::new().with_course("3003023", large_course()));
    let store = TableStore::new(source.clone(), FetchPool::new(4));

    let before = store.tables(&course()).await.unwrap();
    let pending = before
        .submission_of_student(&PersonId::from("5100"), &AssignmentId::from("901"))
        .unwrap();
    assert_eq!(before.resolve_grade(pending), GradeState::Pending);

    // Upstream grades G50 in the meantime.
    let mut changed = large_course();
    changed.log.grades.extend(
        RawBuilder::new()
            .grade(at(500), "1000", "901", "5100", "Approved")
            .build()
            .log
            .grades,
    );
    source.replace("3003023", changed);

    let after = store.update(&course()).await.unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(Arc::ptr_eq(&after, &store.published(&course()).await.unwrap()));

    let updated = after
        .submission_of_student(&PersonId::from("5100"), &AssignmentId::from("901"))
        .unwrap();
    assert_eq!(after.resolve_grade(updated), GradeState::Approved);
    // The old graph is untouched.
    assert_eq!(before.resolve_grade(pending), GradeState::Pending);
    before.validate().unwrap();
}

#[tokio::test]
async fn failed_update_keeps_the_published_graph() {
    let source = Arc::new(InMemorySource::new().with_course("3003023", large_course()));
    let store = TableStore::new(source.clone(), FetchPool::new(2));
    let published = store.tables(&course()).await.unwrap();

    source.set_failing(Some(TableKind::ActivityLog));
    let err = store.update(&course()).await.unwrap_err();
    assert_eq!(err.table(), TableKind::ActivityLog);

    let still = store.published(&course()).await.unwrap();
    assert!(Arc::ptr_eq(&published, &still));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_readers_share_one_build() {
    let source = Arc::new(
        InMemorySource::new()
            .with_course("3003023", large_course())
            .with_delay(20),
    );
    let store = Arc::new(TableStore::new(source.clone(), FetchPool::new(2)));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.tables(&course()).await })
        })
        .collect();

    let graphs: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("reader panicked").expect("build failed"))
        .collect();

    for graph in &graphs[1..] {
        assert!(Arc::ptr_eq(&graphs[0], graph));
    }
    assert_eq!(source.calls(), 5, "graph should be built exactly once");
    assert!(source.max_concurrent() <= 2);
}

#[tokio::test]
async fn cache_is_reused_by_a_fresh_store() {
    let dir = TempDir::new().unwrap();
    let source = Arc::new(InMemorySource::new().with_course("3003023", large_course()));

    let first = TableStore::new(source.clone(), FetchPool::new(4))
        .with_cache(TableCache::new(dir.path()));
    let built = first.tables(&course()).await.unwrap();
    assert_eq!(source.calls(), 5);

    let second = TableStore::new(source.clone(), FetchPool::new(4))
        .with_cache(TableCache::new(dir.path()));
    let cached = second.tables(&course()).await.unwrap();
    assert_eq!(source.calls(), 5, "cached graph should not refetch");
    assert_eq!(cached.groups(), built.groups());

    second.update(&course()).await.unwrap();
    assert_eq!(source.calls(), 10);
}
