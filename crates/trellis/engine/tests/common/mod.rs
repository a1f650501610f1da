#![allow(dead_code)]

use trellis::{GraphName, Term, Triple};

pub const EX: &str = "http://example.org/building#";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub fn ex(local: &str) -> Term {
    Term::iri(format!("{EX}{local}"))
}

pub fn rdf_type() -> Term {
    Term::iri(RDF_TYPE)
}

/// `ex:s ex:p ex:o`, or `ex:s rdf:type ex:o` when `p` is `"a"`.
pub fn t(s: &str, p: &str, o: &str) -> Triple {
    let predicate = if p == "a" { rdf_type() } else { ex(p) };
    Triple::new(ex(s), predicate, ex(o))
}

pub fn g() -> GraphName {
    GraphName::new("urn:graph:g")
}

pub fn sorted(mut triples: Vec<Triple>) -> Vec<Triple> {
    triples.sort();
    triples
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
