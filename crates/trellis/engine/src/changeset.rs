//! Staging side of a changeset transaction.

use trellis_types::{ChangeLogEntry, ChangesetId, GraphName, Timestamp, Triple, VersionRecord};

/// In-flight unit of work against one named graph.
///
/// A changeset only records intent. Nothing reaches the graph store or the
/// change log until it is handed to [`crate::Dataset::commit`]; dropping an
/// uncommitted changeset discards it.
///
/// Within one commit removals are applied before additions, so a triple
/// staged for both ends up present.
#[derive(Debug, Clone)]
#[must_use = "a changeset does nothing until it is committed"]
pub struct Changeset {
    id: ChangesetId,
    graph: GraphName,
    timestamp: Option<Timestamp>,
    additions: Vec<Triple>,
    removals: Vec<Triple>,
    namespaces: Vec<(String, String)>,
}

impl Changeset {
    pub(crate) fn new(graph: GraphName, timestamp: Option<Timestamp>) -> Self {
        Self {
            id: ChangesetId::generate(),
            graph,
            timestamp,
            additions: Vec::new(),
            removals: Vec::new(),
            namespaces: Vec::new(),
        }
    }

    pub fn id(&self) -> ChangesetId {
        self.id
    }

    pub fn graph(&self) -> &GraphName {
        &self.graph
    }

    /// Caller-supplied commit time, if any. Wall-clock time is used otherwise.
    pub fn timestamp(&self) -> Option<Timestamp> {
        self.timestamp
    }

    pub fn add(&mut self, triple: impl Into<Triple>) -> &mut Self {
        self.additions.push(triple.into());
        self
    }

    pub fn remove(&mut self, triple: impl Into<Triple>) -> &mut Self {
        self.removals.push(triple.into());
        self
    }

    /// Stage every triple of an iterator for addition, e.g. a parsed file.
    pub fn extend<I, T>(&mut self, triples: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Triple>,
    {
        self.additions.extend(triples.into_iter().map(Into::into));
        self
    }

    pub fn remove_all<I, T>(&mut self, triples: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Triple>,
    {
        self.removals.extend(triples.into_iter().map(Into::into));
        self
    }

    /// Record a prefix binding seen while staging. Bindings are merged into
    /// the dataset's namespace map once the changeset commits.
    pub fn bind_namespace(&mut self, prefix: impl Into<String>, iri: impl Into<String>) -> &mut Self {
        self.namespaces.push((prefix.into(), iri.into()));
        self
    }

    pub fn additions(&self) -> &[Triple] {
        &self.additions
    }

    pub fn removals(&self) -> &[Triple] {
        &self.removals
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.removals.is_empty()
    }

    pub(crate) fn into_parts(self) -> ChangesetParts {
        ChangesetParts {
            id: self.id,
            graph: self.graph,
            timestamp: self.timestamp,
            additions: self.additions,
            removals: self.removals,
            namespaces: self.namespaces,
        }
    }
}

pub(crate) struct ChangesetParts {
    pub id: ChangesetId,
    pub graph: GraphName,
    pub timestamp: Option<Timestamp>,
    pub additions: Vec<Triple>,
    pub removals: Vec<Triple>,
    pub namespaces: Vec<(String, String)>,
}

/// A changeset whose entries have been written, as shown to hooks.
#[derive(Debug, Clone)]
pub struct ChangesetRecord {
    pub id: ChangesetId,
    pub graph: GraphName,
    pub timestamp: Timestamp,
    pub additions: Vec<Triple>,
    pub removals: Vec<Triple>,
    /// Persisted inverse entries, removals first.
    pub entries: Vec<ChangeLogEntry>,
}

impl ChangesetRecord {
    /// Number of staged operations that actually changed the graph.
    pub fn changed(&self) -> usize {
        self.entries.iter().filter(|e| e.effective).count()
    }

    pub fn version(&self) -> VersionRecord {
        VersionRecord {
            changeset_id: self.id,
            graph: self.graph.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitReceipt {
    pub version: VersionRecord,
    /// Log entries written (one per staged operation).
    pub entries: usize,
    /// Entries whose operation changed the graph.
    pub changed: usize,
}
