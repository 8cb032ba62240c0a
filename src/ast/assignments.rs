//! Stored values: the path -> value payload of an insert or update.

use crate::ast::{ExprRef, PathRef};
use crate::error::{RewriteError, RewriteResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A single `path = value` pair. A missing value stores NULL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub path: PathRef,
    pub value: Option<ExprRef>,
}

impl Assignment {
    /// Build an assignment, checking the value fits the path type.
    pub fn new(path: PathRef, value: Option<ExprRef>) -> RewriteResult<Self> {
        if let Some(v) = &value {
            if !path.ty().is_assignable_from(v.ty()) {
                return Err(RewriteError::mismatch(
                    path.ty(),
                    v.ty(),
                    format!("assignment to {}", path),
                ));
            }
        }
        Ok(Self { path, value })
    }

    /// Identity-equal on both sides.
    pub fn same_as(&self, other: &Assignment) -> bool {
        self.path.ptr_eq(&other.path)
            && match (&self.value, &other.value) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

impl std::fmt::Display for Assignment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{} = {}", self.path, v),
            None => write!(f, "{} = NULL", self.path),
        }
    }
}

/// Ordered, path-unique collection of assignments.
///
/// Inserting a path that is already present replaces its value in place.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AssignmentSet {
    entries: Vec<Assignment>,
}

impl AssignmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, assignment: Assignment) {
        match self.entries.iter_mut().find(|a| a.path == assignment.path) {
            Some(existing) => existing.value = assignment.value,
            None => self.entries.push(assignment),
        }
    }

    /// Checked `insert`.
    pub fn assign(&mut self, path: PathRef, value: Option<ExprRef>) -> RewriteResult<()> {
        self.insert(Assignment::new(path, value)?);
        Ok(())
    }

    /// Builder-style `assign`.
    pub fn with(mut self, path: &PathRef, value: ExprRef) -> RewriteResult<Self> {
        self.assign(path.clone(), Some(value))?;
        Ok(self)
    }

    pub fn with_null(mut self, path: &PathRef) -> RewriteResult<Self> {
        self.assign(path.clone(), None)?;
        Ok(self)
    }

    pub fn get(&self, path: &PathRef) -> Option<&Assignment> {
        self.entries.iter().find(|a| &a.path == path)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Assignment> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_shared(self) -> Arc<AssignmentSet> {
        Arc::new(self)
    }
}

impl FromIterator<Assignment> for AssignmentSet {
    fn from_iter<I: IntoIterator<Item = Assignment>>(iter: I) -> Self {
        let mut set = AssignmentSet::new();
        for assignment in iter {
            set.insert(assignment);
        }
        set
    }
}

impl<'a> IntoIterator for &'a AssignmentSet {
    type Item = &'a Assignment;
    type IntoIter = std::slice::Iter<'a, Assignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl std::fmt::Display for AssignmentSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, a) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", a)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ValueType;
    use crate::ast::builders::*;

    #[test]
    fn test_later_duplicate_overrides_in_place() {
        let person = root("person", ValueType::record("Person"));
        let name = person.property("name", ValueType::String);
        let age = person.property("age", ValueType::Int64);

        let set = AssignmentSet::new()
            .with(&name, constant("a"))
            .and_then(|s| s.with(&age, constant(3)))
            .and_then(|s| s.with(&name, constant("b")))
            .unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.to_string(), "{person.name = 'b', person.age = 3}");
    }

    #[test]
    fn test_rejects_unassignable_value() {
        let person = root("person", ValueType::record("Person"));
        let age = person.property("age", ValueType::Int64);
        let err = Assignment::new(age, Some(constant("old"))).unwrap_err();
        assert!(matches!(err, RewriteError::TypeMismatch { .. }));
    }
}
