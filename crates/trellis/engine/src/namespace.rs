use std::collections::BTreeMap;

/// Prefix to namespace IRI bindings collected from committed changesets.
///
/// Bookkeeping only: the engine never rewrites terms with these bindings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceMap {
    bindings: BTreeMap<String, String>,
}

impl NamespaceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `prefix`, replacing any earlier binding. Returns the old IRI.
    pub fn bind(&mut self, prefix: impl Into<String>, iri: impl Into<String>) -> Option<String> {
        self.bindings.insert(prefix.into(), iri.into())
    }

    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.bindings.get(prefix).map(String::as_str)
    }

    /// Expand a `prefix:local` name.
    pub fn expand(&self, curie: &str) -> Option<String> {
        let (prefix, local) = curie.split_once(':')?;
        self.get(prefix).map(|ns| format!("{ns}{local}"))
    }

    /// Shorten an IRI with the longest matching namespace.
    pub fn compact(&self, iri: &str) -> Option<String> {
        self.bindings
            .iter()
            .filter(|(_, ns)| iri.starts_with(ns.as_str()))
            .max_by_key(|(_, ns)| ns.len())
            .map(|(prefix, ns)| format!("{prefix}:{}", &iri[ns.len()..]))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(p, ns)| (p.as_str(), ns.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
