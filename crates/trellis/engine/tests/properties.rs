//! Property tests: arbitrary changeset sequences keep undo/redo exact and
//! reconstruct every recorded state.

mod common;

use common::{g, t};
use proptest::prelude::*;
use std::collections::BTreeSet;
use trellis::{ChangeLog, Dataset, LogKind, Timestamp, Triple};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Small vocabulary so additions and removals collide often.
fn arb_triple() -> impl Strategy<Value = Triple> {
    (0u8..4, 0u8..2, 0u8..4).prop_map(|(s, p, o)| {
        t(&format!("s{s}"), &format!("p{p}"), &format!("o{o}"))
    })
}

#[derive(Debug, Clone)]
struct Staged {
    additions: Vec<Triple>,
    removals: Vec<Triple>,
}

/// At least one addition, so every changeset gets a version record.
fn arb_changeset() -> impl Strategy<Value = Staged> {
    (
        prop::collection::vec(arb_triple(), 1..6),
        prop::collection::vec(arb_triple(), 0..4),
    )
        .prop_map(|(additions, removals)| Staged {
            additions,
            removals,
        })
}

async fn commit(ds: &Dataset, at: i64, staged: &Staged) {
    let mut cs = ds.new_changeset(g(), Some(Timestamp::logical(at)));
    cs.extend(staged.additions.iter().cloned());
    cs.remove_all(staged.removals.iter().cloned());
    ds.commit(cs).await.unwrap();
}

async fn live(ds: &Dataset) -> BTreeSet<Triple> {
    ds.latest(g()).triples().await.unwrap().into_iter().collect()
}

/// State after applying one changeset to a plain set: removals, then
/// additions.
fn apply(state: &BTreeSet<Triple>, staged: &Staged) -> BTreeSet<Triple> {
    let mut next = state.clone();
    for triple in &staged.removals {
        next.remove(triple);
    }
    next.extend(staged.additions.iter().cloned());
    next
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Undoing every changeset walks back through each recorded state;
    /// redoing them all walks forward to the final state.
    #[test]
    fn undo_redo_walk_the_history_exactly(
        changesets in prop::collection::vec(arb_changeset(), 1..8),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ds = Dataset::in_memory();
            let mut states = vec![BTreeSet::new()];
            for (i, staged) in changesets.iter().enumerate() {
                commit(&ds, i as i64 + 1, staged).await;
                let next = apply(states.last().unwrap(), staged);
                assert_eq!(live(&ds).await, next);
                states.push(next);
            }

            for expected in states.iter().rev().skip(1) {
                ds.undo().await.unwrap();
                assert_eq!(&live(&ds).await, expected);
            }
            assert!(ds.undo().await.unwrap_err().is_empty_log());

            for expected in states.iter().skip(1) {
                ds.redo().await.unwrap();
                assert_eq!(&live(&ds).await, expected);
            }
            assert!(ds.redo().await.unwrap_err().is_empty_log());
        });
    }

    /// `graph_at(i)` equals the state right after the i-th changeset.
    #[test]
    fn snapshots_match_recorded_states(
        changesets in prop::collection::vec(arb_changeset(), 1..8),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ds = Dataset::in_memory();
            let mut states = vec![BTreeSet::new()];
            for (i, staged) in changesets.iter().enumerate() {
                commit(&ds, i as i64 + 1, staged).await;
                states.push(apply(states.last().unwrap(), staged));
            }

            for (i, expected) in states.iter().enumerate() {
                let snapshot = ds
                    .graph_at(Timestamp::logical(i as i64), Some(&g()))
                    .await
                    .unwrap();
                let got = snapshot.graph(&g()).cloned().unwrap_or_default();
                assert_eq!(&got, expected, "state at t={}", i);
            }
        });
    }

    /// Inverted logging: one entry per staged operation, kinds flipped.
    #[test]
    fn one_inverted_entry_per_staged_operation(staged in arb_changeset()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let ds = Dataset::in_memory();
            let mut cs = ds.new_changeset(g(), Some(Timestamp::logical(1)));
            cs.extend(staged.additions.iter().cloned());
            cs.remove_all(staged.removals.iter().cloned());
            let receipt = ds.commit(cs).await.unwrap();
            assert_eq!(receipt.entries, staged.additions.len() + staged.removals.len());

            let entries = ds
                .change_log()
                .changeset_entries(LogKind::Active, &receipt.version.changeset_id)
                .await
                .unwrap();
            let insertions: Vec<Triple> = entries
                .iter()
                .filter(|e| e.kind.is_insertion())
                .map(|e| e.triple.clone())
                .collect();
            let deletions: Vec<Triple> = entries
                .iter()
                .filter(|e| !e.kind.is_insertion())
                .map(|e| e.triple.clone())
                .collect();
            assert_eq!(insertions, staged.removals);
            assert_eq!(deletions, staged.additions);
        });
    }
}
