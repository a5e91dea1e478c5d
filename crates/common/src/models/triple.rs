//! Triple value type

use serde::{Deserialize, Serialize};
use std::fmt;

/// A (subject, predicate, object) fact.
///
/// Immutable once built; duplicates are allowed and left to storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Triple {
    subject: String,
    predicate: String,
    object: String,
}

impl Triple {
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    /// Borrowed view, handy for set lookups without cloning
    pub fn as_tuple(&self) -> (&str, &str, &str) {
        (&self.subject, &self.predicate, &self.object)
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.subject, self.predicate, self.object)
    }
}

impl From<(&str, &str, &str)> for Triple {
    fn from((s, p, o): (&str, &str, &str)) -> Self {
        Triple::new(s, p, o)
    }
}
