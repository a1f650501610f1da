use serde::{Deserialize, Serialize};
use std::fmt;

/// A graph element: IRI, blank node or literal.
///
/// Terms are immutable values. The derived ordering (IRIs, then blank nodes,
/// then literals, each compared field by field) gives deterministic iteration
/// for every set of triples built from them.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Term {
    Iri(String),
    BlankNode(String),
    Literal {
        lexical: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        datatype: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
}

impl Term {
    pub fn iri(value: impl Into<String>) -> Self {
        Term::Iri(value.into())
    }

    pub fn blank(id: impl Into<String>) -> Self {
        Term::BlankNode(id.into())
    }

    /// Plain literal with neither datatype nor language tag.
    pub fn literal(lexical: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed_literal(lexical: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn lang_literal(lexical: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal {
            lexical: lexical.into(),
            datatype: None,
            language: Some(language.into()),
        }
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Term::BlankNode(_))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Term::Literal { .. })
    }

    /// IRI string, if this term is an IRI.
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            Term::Iri(iri) => Some(iri),
            _ => None,
        }
    }
}

/// N-Triples style rendering.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri(iri) => write!(f, "<{iri}>"),
            Term::BlankNode(id) => write!(f, "_:{id}"),
            Term::Literal {
                lexical,
                datatype,
                language,
            } => {
                write!(f, "\"{}\"", lexical.replace('\\', "\\\\").replace('"', "\\\""))?;
                if let Some(lang) = language {
                    write!(f, "@{lang}")
                } else if let Some(dt) = datatype {
                    write!(f, "^^<{dt}>")
                } else {
                    Ok(())
                }
            }
        }
    }
}

impl From<&str> for Term {
    fn from(iri: &str) -> Self {
        Term::Iri(iri.to_string())
    }
}

impl From<String> for Term {
    fn from(iri: String) -> Self {
        Term::Iri(iri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_ntriples() {
        assert_eq!(Term::iri("urn:a").to_string(), "<urn:a>");
        assert_eq!(Term::blank("b0").to_string(), "_:b0");
        assert_eq!(Term::literal("x").to_string(), "\"x\"");
        assert_eq!(Term::lang_literal("hi", "en").to_string(), "\"hi\"@en");
        assert_eq!(
            Term::typed_literal("1", "http://www.w3.org/2001/XMLSchema#integer").to_string(),
            "\"1\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
        assert_eq!(Term::literal("say \"x\"").to_string(), "\"say \\\"x\\\"\"");
    }

    #[test]
    fn ordering_groups_by_kind() {
        let mut terms = vec![
            Term::literal("a"),
            Term::blank("z"),
            Term::iri("urn:z"),
            Term::iri("urn:a"),
        ];
        terms.sort();
        assert_eq!(
            terms,
            vec![
                Term::iri("urn:a"),
                Term::iri("urn:z"),
                Term::blank("z"),
                Term::literal("a"),
            ]
        );
    }

    #[test]
    fn literals_differ_by_tag() {
        assert_ne!(Term::literal("a"), Term::lang_literal("a", "en"));
        assert_ne!(Term::lang_literal("a", "en"), Term::typed_literal("a", "urn:dt"));
    }

    #[test]
    fn strings_convert_to_iris() {
        let owned: Term = format!("urn:{}", "zone1").into();
        assert_eq!(owned, Term::from("urn:zone1"));
        assert_eq!(owned.as_iri(), Some("urn:zone1"));
    }

    #[test]
    fn serde_roundtrip_keeps_tags() {
        let term = Term::lang_literal("Gebäude", "de");
        let json = serde_json::to_string(&term).unwrap();
        let back: Term = serde_json::from_str(&json).unwrap();
        assert_eq!(back, term);
    }
}
