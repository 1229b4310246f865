use std::fmt;

use crate::value::Value;

/// Uniquely identifies a project (a package, library, repository, ...).
///
/// Equality, ordering and hashing delegate to the wrapped caller value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProjectIdentifier<P: Value> {
    value: P,
}

impl<P: Value> ProjectIdentifier<P> {
    pub fn new(value: P) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &P {
        &self.value
    }

    pub fn into_value(self) -> P {
        self.value
    }
}

impl<P: Value> From<P> for ProjectIdentifier<P> {
    fn from(value: P) -> Self {
        Self::new(value)
    }
}

impl<P: Value> fmt::Display for ProjectIdentifier<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.value, f)
    }
}
