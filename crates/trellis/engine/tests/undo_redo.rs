mod common;

use common::{ex, g, init_tracing, rdf_type, sorted, t};
use std::sync::Arc;
use trellis::{
    ChangeLog, Dataset, EngineConfig, GraphStore, InMemoryChangeLog, InMemoryGraphStore, LogKind,
    RedoOrder, Timestamp, TrellisError, Triple, TriplePattern,
};

fn dataset(config: EngineConfig) -> Dataset {
    init_tracing();
    Dataset::new(
        Arc::new(InMemoryGraphStore::new()),
        Arc::new(InMemoryChangeLog::new()),
        config,
    )
    .unwrap()
}

async fn commit_add(ds: &Dataset, at: i64, triples: Vec<Triple>) {
    let mut cs = ds.new_changeset(g(), Some(Timestamp::logical(at)));
    cs.extend(triples);
    ds.commit(cs).await.unwrap();
}

async fn live(ds: &Dataset) -> Vec<Triple> {
    sorted(ds.latest(g()).triples().await.unwrap())
}

#[tokio::test]
async fn undo_and_redo_restore_pattern_count() {
    let ds = dataset(EngineConfig::default());
    let floors = TriplePattern::any()
        .with_predicate(rdf_type())
        .with_object(ex("Floor"));

    commit_add(&ds, 1, vec![t("bldg", "a", "Building")]).await;
    commit_add(
        &ds,
        2,
        (1..=4).map(|n| t(&format!("floor{n}"), "a", "Floor")).collect(),
    )
    .await;
    assert_eq!(ds.count(Some(&g()), &floors).await.unwrap(), 4);

    let undone = ds.undo().await.unwrap();
    assert_eq!(undone.timestamp, Timestamp::logical(2));
    assert_eq!(ds.count(Some(&g()), &floors).await.unwrap(), 0);
    assert_eq!(ds.len(None).await.unwrap(), 1);

    let redone = ds.redo().await.unwrap();
    assert_eq!(redone, undone);
    assert_eq!(ds.count(Some(&g()), &floors).await.unwrap(), 4);
}

#[tokio::test]
async fn undo_reverts_removals_and_redo_reapplies_them() {
    let ds = dataset(EngineConfig::default());
    commit_add(&ds, 1, vec![t("a", "p", "b"), t("b", "p", "c")]).await;
    let before = live(&ds).await;

    let mut cs = ds.new_changeset(g(), Some(Timestamp::logical(2)));
    cs.remove(t("a", "p", "b"));
    cs.add(t("c", "p", "d"));
    ds.commit(cs).await.unwrap();
    let after = live(&ds).await;

    ds.undo().await.unwrap();
    assert_eq!(live(&ds).await, before);
    ds.redo().await.unwrap();
    assert_eq!(live(&ds).await, after);
}

#[tokio::test]
async fn undo_moves_entries_between_logs() {
    let ds = dataset(EngineConfig::default());
    commit_add(&ds, 1, vec![t("a", "p", "b"), t("b", "p", "c")]).await;
    let log = ds.change_log();

    ds.undo().await.unwrap();
    assert_eq!(log.len(LogKind::Active).await.unwrap(), 0);
    assert_eq!(log.len(LogKind::Redo).await.unwrap(), 2);
    assert!(ds.versions(None).await.unwrap().is_empty());
    assert_eq!(ds.redo_versions().await.unwrap().len(), 1);

    ds.redo().await.unwrap();
    assert_eq!(log.len(LogKind::Active).await.unwrap(), 2);
    assert_eq!(log.len(LogKind::Redo).await.unwrap(), 0);
}

#[tokio::test]
async fn empty_logs_report_nothing_to_do() {
    let ds = dataset(EngineConfig::default());

    let err = ds.undo().await.unwrap_err();
    assert!(matches!(err, TrellisError::EmptyLog(LogKind::Active)));
    assert_eq!(err.to_string(), "nothing to undo: active log is empty");

    let err = ds.redo().await.unwrap_err();
    assert!(matches!(err, TrellisError::EmptyLog(LogKind::Redo)));
    assert!(err.is_empty_log());

    commit_add(&ds, 1, vec![t("a", "p", "b")]).await;
    ds.undo().await.unwrap();
    assert!(ds.undo().await.unwrap_err().is_empty_log());
    assert!(ds.is_empty().await.unwrap());
}

#[tokio::test]
async fn redo_is_a_stack_by_default() {
    let ds = dataset(EngineConfig::default());
    commit_add(&ds, 1, vec![t("a", "p", "x")]).await;
    commit_add(&ds, 2, vec![t("b", "p", "x")]).await;
    commit_add(&ds, 3, vec![t("c", "p", "x")]).await;

    assert_eq!(ds.undo().await.unwrap().timestamp, Timestamp::logical(3));
    assert_eq!(ds.undo().await.unwrap().timestamp, Timestamp::logical(2));

    // Most recently undone comes back first.
    assert_eq!(ds.redo().await.unwrap().timestamp, Timestamp::logical(2));
    assert_eq!(live(&ds).await, vec![t("a", "p", "x"), t("b", "p", "x")]);
    assert_eq!(ds.redo().await.unwrap().timestamp, Timestamp::logical(3));
    assert_eq!(live(&ds).await.len(), 3);
    assert!(ds.redo().await.unwrap_err().is_empty_log());
}

#[tokio::test]
async fn redo_can_be_a_queue() {
    let ds = dataset(EngineConfig {
        redo_order: RedoOrder::Fifo,
        ..EngineConfig::default()
    });
    commit_add(&ds, 1, vec![t("a", "p", "x")]).await;
    commit_add(&ds, 2, vec![t("b", "p", "x")]).await;
    commit_add(&ds, 3, vec![t("c", "p", "x")]).await;

    ds.undo().await.unwrap();
    ds.undo().await.unwrap();

    // First undone comes back first.
    assert_eq!(ds.redo().await.unwrap().timestamp, Timestamp::logical(3));
    assert_eq!(live(&ds).await, vec![t("a", "p", "x"), t("c", "p", "x")]);
    assert_eq!(ds.redo().await.unwrap().timestamp, Timestamp::logical(2));
    assert_eq!(live(&ds).await.len(), 3);
}

#[tokio::test]
async fn commit_after_undo_clears_redo_log() {
    let ds = dataset(EngineConfig::default());
    commit_add(&ds, 1, vec![t("a", "p", "x")]).await;
    commit_add(&ds, 2, vec![t("b", "p", "x")]).await;
    ds.undo().await.unwrap();
    assert_eq!(ds.redo_versions().await.unwrap().len(), 1);

    commit_add(&ds, 3, vec![t("c", "p", "x")]).await;
    assert!(ds.redo_versions().await.unwrap().is_empty());
    assert!(ds.redo().await.unwrap_err().is_empty_log());
    assert_eq!(live(&ds).await, vec![t("a", "p", "x"), t("c", "p", "x")]);
}

#[tokio::test]
async fn redo_log_can_survive_commits() {
    let ds = dataset(EngineConfig {
        clear_redo_on_commit: false,
        ..EngineConfig::default()
    });
    commit_add(&ds, 1, vec![t("a", "p", "x")]).await;
    commit_add(&ds, 2, vec![t("b", "p", "x")]).await;
    ds.undo().await.unwrap();

    commit_add(&ds, 3, vec![t("c", "p", "x")]).await;
    assert_eq!(ds.redo_versions().await.unwrap().len(), 1);

    ds.redo().await.unwrap();
    assert_eq!(live(&ds).await.len(), 3);
    let timestamps: Vec<i64> = ds
        .versions(None)
        .await
        .unwrap()
        .iter()
        .map(|v| v.timestamp.value())
        .collect();
    assert_eq!(timestamps, vec![3, 2, 1]);
}

#[tokio::test]
async fn retained_redo_log_keeps_undo_order() {
    let ds = dataset(EngineConfig {
        clear_redo_on_commit: false,
        ..EngineConfig::default()
    });
    commit_add(&ds, 1, vec![t("a", "p", "x")]).await;
    commit_add(&ds, 2, vec![t("b", "p", "x")]).await;
    assert_eq!(ds.undo().await.unwrap().timestamp, Timestamp::logical(2));
    commit_add(&ds, 3, vec![t("c", "p", "x")]).await;
    assert_eq!(ds.undo().await.unwrap().timestamp, Timestamp::logical(3));

    let pending: Vec<i64> = ds
        .redo_versions()
        .await
        .unwrap()
        .iter()
        .map(|v| v.timestamp.value())
        .collect();
    assert_eq!(pending, vec![3, 2]);

    // The later commit was undone last, so it comes back first.
    assert_eq!(ds.redo().await.unwrap().timestamp, Timestamp::logical(3));
    assert_eq!(live(&ds).await, vec![t("a", "p", "x"), t("c", "p", "x")]);
    assert_eq!(ds.redo().await.unwrap().timestamp, Timestamp::logical(2));
    assert_eq!(live(&ds).await.len(), 3);
}

#[tokio::test]
async fn retained_redo_log_as_a_queue() {
    let ds = dataset(EngineConfig {
        clear_redo_on_commit: false,
        redo_order: RedoOrder::Fifo,
        ..EngineConfig::default()
    });
    commit_add(&ds, 1, vec![t("a", "p", "x")]).await;
    commit_add(&ds, 2, vec![t("b", "p", "x")]).await;
    ds.undo().await.unwrap();
    commit_add(&ds, 3, vec![t("c", "p", "x")]).await;
    ds.undo().await.unwrap();

    assert_eq!(ds.redo().await.unwrap().timestamp, Timestamp::logical(2));
    assert_eq!(ds.redo().await.unwrap().timestamp, Timestamp::logical(3));
}

#[tokio::test]
async fn redo_over_a_diverged_graph_is_refused() {
    let ds = dataset(EngineConfig {
        clear_redo_on_commit: false,
        ..EngineConfig::default()
    });
    let fed = t("vav1", "feeds", "zone1");
    let typed = t("vav1", "a", "VAV");

    commit_add(&ds, 1, vec![typed.clone(), fed.clone()]).await;
    ds.undo().await.unwrap();
    // A later commit re-adds one of the undone triples.
    commit_add(&ds, 2, vec![fed.clone()]).await;

    let err = ds.redo().await.unwrap_err();
    assert!(matches!(err, TrellisError::HistoryDiverged { .. }), "{err}");

    // The first replayed step was reverted and the changeset stays undone.
    assert_eq!(live(&ds).await, vec![fed.clone()]);
    assert_eq!(ds.redo_versions().await.unwrap().len(), 1);
    let committed: Vec<i64> = ds
        .versions(None)
        .await
        .unwrap()
        .iter()
        .map(|v| v.timestamp.value())
        .collect();
    assert_eq!(committed, vec![2]);

    // History stays replayable.
    let before = ds.graph_at(Timestamp::logical(1), Some(&g())).await.unwrap();
    assert!(before.is_empty());
    let now = ds.graph_at(Timestamp::logical(2), Some(&g())).await.unwrap();
    assert_eq!(now.len(), 1);
}

#[tokio::test]
async fn undo_over_a_diverged_graph_is_refused() {
    init_tracing();
    let store = Arc::new(InMemoryGraphStore::new());
    let ds = Dataset::new(
        store.clone(),
        Arc::new(InMemoryChangeLog::new()),
        EngineConfig::default(),
    )
    .unwrap();
    commit_add(&ds, 1, vec![t("a", "p", "x"), t("b", "p", "x")]).await;

    // Mutate the live graph behind the engine's back.
    store.remove(&g(), &t("a", "p", "x")).await.unwrap();

    let err = ds.undo().await.unwrap_err();
    assert!(matches!(err, TrellisError::HistoryDiverged { .. }), "{err}");
    assert_eq!(live(&ds).await, vec![t("b", "p", "x")]);
    assert_eq!(ds.versions(None).await.unwrap().len(), 1);
    assert!(ds.redo_versions().await.unwrap().is_empty());
}

#[tokio::test]
async fn undo_spans_graphs() {
    let ds = dataset(EngineConfig::default());
    commit_add(&ds, 1, vec![t("a", "p", "x")]).await;
    let mut cs = ds.new_changeset("urn:graph:h", Some(Timestamp::logical(2)));
    cs.add(t("z", "p", "x"));
    ds.commit(cs).await.unwrap();

    let undone = ds.undo().await.unwrap();
    assert_eq!(undone.graph.as_str(), "urn:graph:h");
    assert_eq!(ds.graph_names().await.unwrap(), vec![g()]);
}

#[tokio::test]
async fn undo_of_noop_changeset_leaves_store_alone() {
    let ds = dataset(EngineConfig::default());
    commit_add(&ds, 1, vec![t("a", "p", "x")]).await;
    // Adds an existing triple and removes a missing one.
    let mut cs = ds.new_changeset(g(), Some(Timestamp::logical(2)));
    cs.add(t("a", "p", "x"));
    cs.remove(t("q", "p", "x"));
    let receipt = ds.commit(cs).await.unwrap();
    assert_eq!(receipt.entries, 2);
    assert_eq!(receipt.changed, 0);

    ds.undo().await.unwrap();
    assert_eq!(live(&ds).await, vec![t("a", "p", "x")]);
    ds.redo().await.unwrap();
    assert_eq!(live(&ds).await, vec![t("a", "p", "x")]);
}
