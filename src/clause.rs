//! Clause drafts handed to a backend after rewriting.
//!
//! `prepare` runs every part of a draft through the matching
//! [`RewriterChain`] entry point. Any failure fails the whole draft; a partly
//! rewritten clause is never returned.

use crate::ast::{AssignmentSet, ExprRef, OrderSpec};
use crate::error::RewriteResult;
use crate::rewrite::RewriterChain;
use std::sync::Arc;

fn prepare_filter(
    chain: &RewriterChain,
    filter: Option<&ExprRef>,
) -> RewriteResult<Option<ExprRef>> {
    filter.map(|f| chain.apply_predicate(f)).transpose()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectDraft {
    pub projection: Vec<ExprRef>,
    pub filter: Option<ExprRef>,
    pub group_by: Vec<ExprRef>,
    pub having: Option<ExprRef>,
    pub order_by: Vec<OrderSpec>,
}

impl SelectDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepare(&self, chain: &RewriterChain) -> RewriteResult<Self> {
        Ok(Self {
            projection: chain.apply_projections(&self.projection)?,
            filter: prepare_filter(chain, self.filter.as_ref())?,
            group_by: chain.apply_group_by(&self.group_by)?,
            having: prepare_filter(chain, self.having.as_ref())?,
            order_by: chain.apply_order(&self.order_by)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertDraft {
    pub values: Arc<AssignmentSet>,
}

impl InsertDraft {
    pub fn new(values: AssignmentSet) -> Self {
        Self {
            values: values.into_shared(),
        }
    }

    pub fn prepare(&self, chain: &RewriterChain) -> RewriteResult<Self> {
        Ok(Self {
            values: chain.apply_stored_values(&self.values)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateDraft {
    pub values: Arc<AssignmentSet>,
    pub filter: Option<ExprRef>,
}

impl UpdateDraft {
    pub fn new(values: AssignmentSet) -> Self {
        Self {
            values: values.into_shared(),
            filter: None,
        }
    }

    pub fn filter(mut self, condition: ExprRef) -> Self {
        self.filter = Some(condition);
        self
    }

    pub fn prepare(&self, chain: &RewriterChain) -> RewriteResult<Self> {
        Ok(Self {
            values: chain.apply_stored_values(&self.values)?,
            filter: prepare_filter(chain, self.filter.as_ref())?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteDraft {
    pub filter: Option<ExprRef>,
}

impl DeleteDraft {
    pub fn new(filter: Option<ExprRef>) -> Self {
        Self { filter }
    }

    pub fn prepare(&self, chain: &RewriterChain) -> RewriteResult<Self> {
        Ok(Self {
            filter: prepare_filter(chain, self.filter.as_ref())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ValueType;
    use crate::ast::builders::*;
    use crate::error::RewriteError;
    use crate::rewrite::{AliasRewriter, PathRedirect};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_select_prepared_end_to_end() {
        let (p, q) = (
            root("p", ValueType::record("Person")),
            root("q", ValueType::record("Person")),
        );
        let chain =
            RewriterChain::new(vec![Arc::new(AliasRewriter::new(&p, &q).unwrap())]).unwrap();
        let draft = SelectDraft {
            projection: vec![p.property("name", ValueType::String).into_expr()],
            filter: Some(is_not_null(p.property("email", ValueType::String))),
            group_by: vec![],
            having: None,
            order_by: vec![OrderSpec::asc(p.property("age", ValueType::Int32))],
        };

        let out = draft.prepare(&chain).unwrap();
        assert_eq!(out.projection[0].to_string(), "q.name");
        assert_eq!(out.filter.unwrap().to_string(), "q.email IS NOT NULL");
        assert_eq!(out.order_by[0].to_string(), "q.age ASC");
    }

    #[test]
    fn test_update_fails_as_a_whole() {
        let a = root("a", ValueType::record("Account"));
        let name = a.property("name", ValueType::String);
        let redirect = PathRedirect::builder(&name)
            .to_path(&a.property("label", ValueType::String))
            .read_only()
            .build()
            .unwrap();
        let chain = RewriterChain::new(vec![Arc::new(redirect)]).unwrap();

        let draft = UpdateDraft::new(AssignmentSet::new().with(&name, constant("x")).unwrap())
            .filter(eq(&name, constant("y")));
        assert_eq!(
            draft.prepare(&chain).unwrap_err(),
            RewriteError::DisallowedWrite("a.name".to_string())
        );
    }

    #[test]
    fn test_delete_without_filter() {
        let draft = DeleteDraft::new(None);
        assert_eq!(draft.prepare(&RewriterChain::noop()).unwrap(), draft);
    }
}
