//! Re-rooting paths from one query alias onto another.

use super::traits::{RewriteContext, Rewriter};
use super::walk;
use crate::ast::{Assignment, AssignmentSet, ExprRef, OrderSpec, Path, PathRef};
use crate::error::{RewriteError, RewriteResult};
use std::sync::Arc;

/// Moves every path rooted at `source` onto `target`, keeping each step.
///
/// ```ignore
/// let rw = AliasRewriter::new(&person, &p2)?;
/// // person.address.city  ->  p2.address.city
/// ```
#[derive(Debug, Clone)]
pub struct AliasRewriter {
    source: PathRef,
    target: PathRef,
    noop: bool,
}

impl AliasRewriter {
    pub fn new(source: &PathRef, target: &PathRef) -> RewriteResult<Self> {
        for alias in [source, target] {
            if !alias.path().is_root() {
                return Err(RewriteError::invalid(format!(
                    "alias '{}' is not a query root",
                    alias
                )));
            }
        }
        if source.ty() != target.ty() {
            return Err(RewriteError::invalid(format!(
                "cannot re-root {} ({}) onto {} ({})",
                source,
                source.ty(),
                target,
                target.ty()
            )));
        }
        Ok(Self {
            source: source.clone(),
            target: target.clone(),
            noop: source == target,
        })
    }

    /// The rewriter undoing this one.
    pub fn swapped(&self) -> Self {
        Self {
            source: self.target.clone(),
            target: self.source.clone(),
            noop: self.noop,
        }
    }

    pub fn source(&self) -> &PathRef {
        &self.source
    }

    pub fn target(&self) -> &PathRef {
        &self.target
    }
}

impl Rewriter for AliasRewriter {
    fn rewrite(&self, expr: &ExprRef, ctx: &RewriteContext) -> RewriteResult<ExprRef> {
        if self.noop {
            return Ok(expr.clone());
        }
        walk::dispatch(self, expr, ctx)
    }

    fn rewrite_path(
        &self,
        expr: &ExprRef,
        path: &Path,
        ctx: &RewriteContext,
    ) -> RewriteResult<ExprRef> {
        if path.is_root() {
            if self.source.path() == path {
                tracing::trace!("Re-rooting {} onto {}", self.source, self.target);
                return Ok(self.target.expr().clone());
            }
            return Ok(expr.clone());
        }
        walk::walk_path(self, expr, path, ctx)
    }

    fn rewrite_order(
        &self,
        spec: &OrderSpec,
        ctx: &RewriteContext,
    ) -> RewriteResult<Vec<OrderSpec>> {
        if self.noop {
            return Ok(vec![spec.clone()]);
        }
        walk::walk_order(self, spec, ctx)
    }

    fn rewrite_assignment(
        &self,
        assignment: &Assignment,
        ctx: &RewriteContext,
    ) -> RewriteResult<Vec<Assignment>> {
        if self.noop {
            return Ok(vec![assignment.clone()]);
        }
        walk::walk_assignment(self, assignment, ctx)
    }

    fn rewrite_assignments(
        &self,
        set: &Arc<AssignmentSet>,
        ctx: &RewriteContext,
    ) -> RewriteResult<Arc<AssignmentSet>> {
        if self.noop {
            return Ok(set.clone());
        }
        let out = walk::walk_assignments(self, set, ctx)?;
        if !Arc::ptr_eq(&out, set) {
            tracing::debug!("Re-rooted stored values from {} onto {}", self.source, self.target);
        }
        Ok(out)
    }
}
