//! The dataset handle.

use crate::changeset::{Changeset, CommitReceipt};
use crate::config::EngineConfig;
use crate::error::{TrellisError, TrellisResult};
use crate::hooks::{count_matching, CommitHook, HookRegistry};
use crate::namespace::NamespaceMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::debug;
use trellis_store::{ChangeLog, GraphStore, InMemoryChangeLog, InMemoryGraphStore, StorageError};
use trellis_types::{GraphName, Timestamp, Triple, TriplePattern};

/// Versioned dataset: a live graph store plus its change log.
///
/// Writes (commit, undo, redo) are serialised by an internal writer lock.
/// Reads take no engine lock; whether they can observe a write in progress
/// depends on the isolation the underlying stores provide.
pub struct Dataset {
    pub(crate) store: Arc<dyn GraphStore>,
    pub(crate) log: Arc<dyn ChangeLog>,
    pub(crate) config: EngineConfig,
    pub(crate) precommit: HookRegistry,
    pub(crate) postcommit: HookRegistry,
    pub(crate) namespaces: RwLock<NamespaceMap>,
    pub(crate) writer: Mutex<()>,
}

impl Dataset {
    pub fn new(
        store: Arc<dyn GraphStore>,
        log: Arc<dyn ChangeLog>,
        config: EngineConfig,
    ) -> TrellisResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            log,
            config,
            precommit: HookRegistry::new(),
            postcommit: HookRegistry::new(),
            namespaces: RwLock::new(NamespaceMap::new()),
            writer: Mutex::new(()),
        })
    }

    /// Dataset backed by the in-memory adapters with default configuration.
    pub fn in_memory() -> Self {
        Self {
            store: Arc::new(InMemoryGraphStore::new()),
            log: Arc::new(InMemoryChangeLog::new()),
            config: EngineConfig::default(),
            precommit: HookRegistry::new(),
            postcommit: HookRegistry::new(),
            namespaces: RwLock::new(NamespaceMap::new()),
            writer: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn GraphStore> {
        &self.store
    }

    pub fn change_log(&self) -> &Arc<dyn ChangeLog> {
        &self.log
    }

    /// Register a hook run after a changeset's mutations are applied but
    /// before it commits. An error aborts and rolls back the changeset.
    /// Re-using a name replaces the earlier hook.
    pub fn add_precommit_hook(&mut self, name: impl Into<String>, hook: impl CommitHook + 'static) {
        let name = name.into();
        if self.precommit.register(name.clone(), Arc::new(hook)) {
            debug!(hook = %name, "replaced precommit hook");
        }
    }

    /// Register a hook run after a changeset commits. Its error is reported
    /// but never undoes the commit. Re-using a name replaces the earlier hook.
    pub fn add_postcommit_hook(&mut self, name: impl Into<String>, hook: impl CommitHook + 'static) {
        let name = name.into();
        if self.postcommit.register(name.clone(), Arc::new(hook)) {
            debug!(hook = %name, "replaced postcommit hook");
        }
    }

    pub fn remove_precommit_hook(&mut self, name: &str) -> bool {
        self.precommit.unregister(name)
    }

    pub fn remove_postcommit_hook(&mut self, name: &str) -> bool {
        self.postcommit.unregister(name)
    }

    /// Start staging a changeset. `None` commits at wall-clock time.
    pub fn new_changeset(
        &self,
        graph: impl Into<GraphName>,
        timestamp: Option<Timestamp>,
    ) -> Changeset {
        Changeset::new(graph.into(), timestamp)
    }

    /// Stage and commit in one scope. If `stage` fails nothing is applied.
    pub async fn with_changeset<F>(
        &self,
        graph: impl Into<GraphName>,
        timestamp: Option<Timestamp>,
        stage: F,
    ) -> TrellisResult<CommitReceipt>
    where
        F: FnOnce(&mut Changeset) -> anyhow::Result<()>,
    {
        let mut changeset = self.new_changeset(graph, timestamp);
        if let Err(err) = stage(&mut changeset) {
            debug!(changeset = %changeset.id(), error = %err, "staging failed; changeset discarded");
            return Err(TrellisError::Staging {
                changeset: changeset.id(),
                reason: format!("{err:#}"),
            });
        }
        self.commit(changeset).await
    }

    /// Live view of one graph. Not a copy: it reflects later commits.
    pub fn latest(&self, graph: impl Into<GraphName>) -> GraphView {
        GraphView {
            store: Arc::clone(&self.store),
            graph: graph.into(),
        }
    }

    /// Number of triples in one graph or the whole dataset.
    ///
    /// This scans the store on every call; there is no cached counter.
    pub async fn len(&self, graph: Option<&GraphName>) -> TrellisResult<usize> {
        Ok(count_matching(self.store.as_ref(), graph, &TriplePattern::any()).await?)
    }

    pub async fn is_empty(&self) -> TrellisResult<bool> {
        Ok(self.len(None).await? == 0)
    }

    /// Matches of a pattern in one graph or across all graphs (full scan).
    pub async fn count(
        &self,
        graph: Option<&GraphName>,
        pattern: &TriplePattern,
    ) -> TrellisResult<usize> {
        Ok(count_matching(self.store.as_ref(), graph, pattern).await?)
    }

    pub async fn graph_names(&self) -> TrellisResult<Vec<GraphName>> {
        Ok(self.store.graph_names().await?)
    }

    /// Prefix bindings recorded by committed changesets.
    pub fn namespaces(&self) -> TrellisResult<NamespaceMap> {
        self.namespaces
            .read()
            .map(|guard| guard.clone())
            .map_err(|_| StorageError::Backend("namespace lock poisoned".to_string()).into())
    }
}

/// Live, read-only handle on one named graph.
#[derive(Clone)]
pub struct GraphView {
    store: Arc<dyn GraphStore>,
    graph: GraphName,
}

impl GraphView {
    pub fn name(&self) -> &GraphName {
        &self.graph
    }

    pub async fn triples(&self) -> TrellisResult<Vec<Triple>> {
        Ok(self.store.triples(&self.graph).await?)
    }

    pub async fn contains(&self, triple: &Triple) -> TrellisResult<bool> {
        Ok(self.store.contains(&self.graph, triple).await?)
    }

    pub async fn matching(&self, pattern: &TriplePattern) -> TrellisResult<Vec<Triple>> {
        Ok(self.store.matching(&self.graph, pattern).await?)
    }

    /// Full scan of the graph.
    pub async fn len(&self) -> TrellisResult<usize> {
        Ok(self.store.triples(&self.graph).await?.len())
    }

    pub async fn is_empty(&self) -> TrellisResult<bool> {
        Ok(self.len().await? == 0)
    }
}
