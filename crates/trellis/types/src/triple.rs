use crate::term::Term;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A subject-predicate-object fact. Equality is structural.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Triple {
    pub fn new(subject: impl Into<Term>, predicate: impl Into<Term>, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }
}

impl<S, P, O> From<(S, P, O)> for Triple
where
    S: Into<Term>,
    P: Into<Term>,
    O: Into<Term>,
{
    fn from((s, p, o): (S, P, O)) -> Self {
        Triple::new(s, p, o)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// Triple shape with optional positions; `None` matches any term.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TriplePattern {
    pub subject: Option<Term>,
    pub predicate: Option<Term>,
    pub object: Option<Term>,
}

impl TriplePattern {
    /// Pattern matching every triple.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn with_subject(mut self, subject: impl Into<Term>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_predicate(mut self, predicate: impl Into<Term>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn with_object(mut self, object: impl Into<Term>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn matches(&self, triple: &Triple) -> bool {
        fn slot(want: &Option<Term>, have: &Term) -> bool {
            want.as_ref().map_or(true, |t| t == have)
        }
        slot(&self.subject, &triple.subject)
            && slot(&self.predicate, &triple.predicate)
            && slot(&self.object, &triple.object)
    }
}
