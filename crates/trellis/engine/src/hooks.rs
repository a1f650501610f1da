//! Precommit and postcommit hook pipeline.
//!
//! Hooks run sequentially in registration order. A precommit hook sees the
//! changeset's mutations already applied and can veto them by returning an
//! error. A postcommit hook runs after the commit point and can only report.

use crate::changeset::ChangesetRecord;
use async_trait::async_trait;
use std::sync::Arc;
use trellis_store::{GraphStore, StorageResult};
use trellis_types::{GraphName, Triple, TriplePattern};

/// A commit hook.
#[async_trait]
pub trait CommitHook: Send + Sync {
    async fn call(&self, ctx: &HookContext<'_>) -> anyhow::Result<()>;
}

/// Adapter turning a synchronous closure into a [`CommitHook`].
pub struct FnHook<F>(F);

/// Wrap a closure as a hook.
pub fn hook_fn<F>(f: F) -> FnHook<F>
where
    F: Fn(&HookContext<'_>) -> anyhow::Result<()> + Send + Sync,
{
    FnHook(f)
}

#[async_trait]
impl<F> CommitHook for FnHook<F>
where
    F: Fn(&HookContext<'_>) -> anyhow::Result<()> + Send + Sync,
{
    async fn call(&self, ctx: &HookContext<'_>) -> anyhow::Result<()> {
        (self.0)(ctx)
    }
}

/// Read-only view handed to hooks: the dataset as it stands plus the
/// changeset being committed.
pub struct HookContext<'a> {
    store: &'a dyn GraphStore,
    changeset: &'a ChangesetRecord,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(store: &'a dyn GraphStore, changeset: &'a ChangesetRecord) -> Self {
        Self { store, changeset }
    }

    pub fn changeset(&self) -> &ChangesetRecord {
        self.changeset
    }

    pub async fn triples(&self, graph: &GraphName) -> StorageResult<Vec<Triple>> {
        self.store.triples(graph).await
    }

    pub async fn contains(&self, graph: &GraphName, triple: &Triple) -> StorageResult<bool> {
        self.store.contains(graph, triple).await
    }

    pub async fn graph_names(&self) -> StorageResult<Vec<GraphName>> {
        self.store.graph_names().await
    }

    /// Matches of a pattern in one graph, or across the whole dataset.
    pub async fn count(
        &self,
        graph: Option<&GraphName>,
        pattern: &TriplePattern,
    ) -> StorageResult<usize> {
        count_matching(self.store, graph, pattern).await
    }
}

pub(crate) async fn count_matching(
    store: &dyn GraphStore,
    graph: Option<&GraphName>,
    pattern: &TriplePattern,
) -> StorageResult<usize> {
    match graph {
        Some(graph) => Ok(store.matching(graph, pattern).await?.len()),
        None => {
            let mut total = 0;
            for graph in store.graph_names().await? {
                total += store.matching(&graph, pattern).await?.len();
            }
            Ok(total)
        }
    }
}

/// Ordered, name-keyed hook registry. Registering under an existing name
/// replaces that hook in place, keeping its position.
#[derive(Default, Clone)]
pub struct HookRegistry {
    hooks: Vec<(String, Arc<dyn CommitHook>)>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` when an existing hook was replaced.
    pub fn register(&mut self, name: impl Into<String>, hook: Arc<dyn CommitHook>) -> bool {
        let name = name.into();
        if let Some(slot) = self.hooks.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = hook;
            true
        } else {
            self.hooks.push((name, hook));
            false
        }
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.hooks.len();
        self.hooks.retain(|(n, _)| n != name);
        before != self.hooks.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.hooks.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn CommitHook>)> {
        self.hooks.iter().map(|(n, h)| (n.as_str(), h))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<dyn CommitHook> {
        Arc::new(hook_fn(|_ctx| Ok(())))
    }

    #[test]
    fn registration_order_is_kept() {
        let mut registry = HookRegistry::new();
        registry.register("shapes", noop());
        registry.register("audit", noop());
        registry.register("labels", noop());
        assert_eq!(registry.names(), vec!["shapes", "audit", "labels"]);
    }

    #[test]
    fn duplicate_name_replaces_in_place() {
        let mut registry = HookRegistry::new();
        assert!(!registry.register("shapes", noop()));
        registry.register("audit", noop());
        assert!(registry.register("shapes", noop()));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["shapes", "audit"]);
    }

    #[test]
    fn unregister_removes_by_name() {
        let mut registry = HookRegistry::new();
        registry.register("shapes", noop());
        assert!(registry.unregister("shapes"));
        assert!(!registry.unregister("shapes"));
        assert!(registry.is_empty());
    }
}
