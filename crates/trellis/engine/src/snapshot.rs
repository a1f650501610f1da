//! Point-in-time reconstruction.

use crate::error::TrellisResult;
use crate::Dataset;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;
use trellis_types::{DeltaKind, GraphName, LogKind, Timestamp, Triple};

/// Detached copy of the dataset as it was at some instant.
///
/// Snapshots compare by content; the reconstruction instant is ignored.
#[derive(Debug, Clone)]
pub struct Snapshot {
    at: Timestamp,
    graphs: BTreeMap<GraphName, BTreeSet<Triple>>,
}

impl Snapshot {
    /// The instant this snapshot was reconstructed for.
    pub fn at(&self) -> Timestamp {
        self.at
    }

    /// All triples across graphs. A triple present in several graphs
    /// appears once.
    pub fn triples(&self) -> BTreeSet<&Triple> {
        self.graphs.values().flatten().collect()
    }

    pub fn graph(&self, graph: &GraphName) -> Option<&BTreeSet<Triple>> {
        self.graphs.get(graph)
    }

    pub fn graph_names(&self) -> impl Iterator<Item = &GraphName> {
        self.graphs.keys()
    }

    pub fn contains(&self, graph: &GraphName, triple: &Triple) -> bool {
        self.graphs.get(graph).is_some_and(|set| set.contains(triple))
    }

    /// Triple count summed over graphs.
    pub fn len(&self) -> usize {
        self.graphs.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.graphs == other.graphs
    }
}

impl Eq for Snapshot {}

impl Dataset {
    /// Reconstruct the dataset (or one graph) as of `timestamp`.
    ///
    /// Changesets committed exactly at `timestamp` are included. The live
    /// store is never modified. A malformed log entry fails the call rather
    /// than producing a partial snapshot.
    pub async fn graph_at(
        &self,
        timestamp: Timestamp,
        graph: Option<&GraphName>,
    ) -> TrellisResult<Snapshot> {
        let entries = self
            .log
            .entries_after(LogKind::Active, timestamp, graph)
            .await?;

        let names: BTreeSet<GraphName> = match graph {
            Some(graph) => BTreeSet::from([graph.clone()]),
            None => {
                let mut names: BTreeSet<GraphName> =
                    self.store.graph_names().await?.into_iter().collect();
                names.extend(entries.iter().map(|e| e.graph.clone()));
                names
            }
        };

        let mut graphs = BTreeMap::new();
        for name in names {
            let triples: BTreeSet<Triple> = self.store.triples(&name).await?.into_iter().collect();
            graphs.insert(name, triples);
        }

        let mut rewound = 0usize;
        for entry in entries.iter().rev().filter(|e| e.effective) {
            let set = graphs.entry(entry.graph.clone()).or_default();
            match entry.kind {
                DeltaKind::Insertion => set.insert(entry.triple.clone()),
                DeltaKind::Deletion => set.remove(&entry.triple),
            };
            rewound += 1;
        }
        graphs.retain(|_, set| !set.is_empty());

        debug!(
            %timestamp,
            graph = graph.map(GraphName::as_str),
            scanned = entries.len(),
            rewound,
            "reconstructed snapshot"
        );
        Ok(Snapshot {
            at: timestamp,
            graphs,
        })
    }
}
