//! Core traits for the rewrite system

use super::walk;
use crate::ast::{
    Assignment, AssignmentSet, ExprRef, Operator, OrderSpec, Path, SubQuery, Value, ValueType,
};
use crate::config::RewriteConfig;
use crate::error::{RewriteError, RewriteResult};
use std::sync::Arc;

/// Per-call state threaded through a rewrite: the nesting depth, plus the
/// type the outermost node must produce when the caller stated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteContext {
    depth: usize,
    max_depth: usize,
    required: Option<(usize, ValueType)>,
}

impl Default for RewriteContext {
    fn default() -> Self {
        Self::from_config(&RewriteConfig::default())
    }
}

impl RewriteContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &RewriteConfig) -> Self {
        Self::with_max_depth(config.max_depth)
    }

    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
            required: None,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Context whose next node must produce a value of type `ty`.
    pub fn requiring(&self, ty: ValueType) -> Self {
        Self {
            depth: self.depth,
            max_depth: self.max_depth,
            required: Some((self.depth + 1, ty)),
        }
    }

    /// Type the current node must produce. Only set for the node handed to
    /// the context built by [`RewriteContext::requiring`], never its children.
    pub fn required(&self) -> Option<&ValueType> {
        match &self.required {
            Some((depth, ty)) if *depth == self.depth => Some(ty),
            _ => None,
        }
    }

    /// Context for one level further down the tree.
    pub fn descend(&self) -> RewriteResult<Self> {
        if self.depth >= self.max_depth {
            return Err(RewriteError::DepthExceeded(self.max_depth));
        }
        Ok(Self {
            depth: self.depth + 1,
            max_depth: self.max_depth,
            required: self
                .required
                .as_ref()
                .filter(|(depth, _)| *depth > self.depth)
                .cloned(),
        })
    }
}

/// A semantics-preserving rewrite of expression trees.
///
/// Every hook defaults to the matching [`walk`] function, which rewrites the
/// children and rebuilds the node only if one of them changed. Implementations
/// override the hooks for the node kinds they care about.
///
/// Besides plain expressions, two specializations are part of the contract:
/// - ordering clauses, which may expand into zero, one or many clauses
///   ([`Rewriter::rewrite_order`]);
/// - stored values, rewritten per assignment (1-to-N,
///   [`Rewriter::rewrite_assignment`]) or as a whole set
///   ([`Rewriter::rewrite_assignments`]).
///
/// Rewriters hold only construction-time configuration and must return the
/// input `Arc` when nothing changed.
pub trait Rewriter: Send + Sync + std::fmt::Debug {
    /// Entry point for a single expression.
    fn rewrite(&self, expr: &ExprRef, ctx: &RewriteContext) -> RewriteResult<ExprRef> {
        walk::dispatch(self, expr, ctx)
    }

    fn rewrite_constant(&self, expr: &ExprRef, _ctx: &RewriteContext) -> RewriteResult<ExprRef> {
        Ok(expr.clone())
    }

    fn rewrite_param(&self, expr: &ExprRef, _ctx: &RewriteContext) -> RewriteResult<ExprRef> {
        Ok(expr.clone())
    }

    fn rewrite_path(
        &self,
        expr: &ExprRef,
        path: &Path,
        ctx: &RewriteContext,
    ) -> RewriteResult<ExprRef> {
        walk::walk_path(self, expr, path, ctx)
    }

    fn rewrite_operation(
        &self,
        expr: &ExprRef,
        op: Operator,
        args: &[ExprRef],
        ty: &ValueType,
        ctx: &RewriteContext,
    ) -> RewriteResult<ExprRef> {
        walk::walk_operation(self, expr, op, args, ty, ctx)
    }

    fn rewrite_projection(
        &self,
        expr: &ExprRef,
        args: &[ExprRef],
        target: &ValueType,
        ctx: &RewriteContext,
    ) -> RewriteResult<ExprRef> {
        walk::walk_projection(self, expr, args, target, ctx)
    }

    fn rewrite_template(
        &self,
        expr: &ExprRef,
        template: &str,
        args: &[ExprRef],
        ty: &ValueType,
        ctx: &RewriteContext,
    ) -> RewriteResult<ExprRef> {
        walk::walk_template(self, expr, template, args, ty, ctx)
    }

    fn rewrite_subquery(
        &self,
        expr: &ExprRef,
        query: &SubQuery,
        ctx: &RewriteContext,
    ) -> RewriteResult<ExprRef> {
        walk::walk_subquery(self, expr, query, ctx)
    }

    fn rewrite_prefetched(
        &self,
        expr: &ExprRef,
        query: &Arc<SubQuery>,
        values: &[Value],
        ty: &ValueType,
        ctx: &RewriteContext,
    ) -> RewriteResult<ExprRef> {
        walk::walk_prefetched(self, expr, query, values, ty, ctx)
    }

    /// Rewrite one ordering clause into zero, one or many.
    fn rewrite_order(
        &self,
        spec: &OrderSpec,
        ctx: &RewriteContext,
    ) -> RewriteResult<Vec<OrderSpec>> {
        walk::walk_order(self, spec, ctx)
    }

    /// Rewrite one stored value into zero, one or many.
    fn rewrite_assignment(
        &self,
        assignment: &Assignment,
        ctx: &RewriteContext,
    ) -> RewriteResult<Vec<Assignment>> {
        walk::walk_assignment(self, assignment, ctx)
    }

    /// Rewrite a whole stored-value set.
    fn rewrite_assignments(
        &self,
        set: &Arc<AssignmentSet>,
        ctx: &RewriteContext,
    ) -> RewriteResult<Arc<AssignmentSet>> {
        walk::walk_assignments(self, set, ctx)
    }
}

/// Returns every input untouched without walking it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRewriter;

impl Rewriter for NoopRewriter {
    fn rewrite(&self, expr: &ExprRef, _ctx: &RewriteContext) -> RewriteResult<ExprRef> {
        Ok(expr.clone())
    }

    fn rewrite_order(
        &self,
        spec: &OrderSpec,
        _ctx: &RewriteContext,
    ) -> RewriteResult<Vec<OrderSpec>> {
        Ok(vec![spec.clone()])
    }

    fn rewrite_assignment(
        &self,
        assignment: &Assignment,
        _ctx: &RewriteContext,
    ) -> RewriteResult<Vec<Assignment>> {
        Ok(vec![assignment.clone()])
    }

    fn rewrite_assignments(
        &self,
        set: &Arc<AssignmentSet>,
        _ctx: &RewriteContext,
    ) -> RewriteResult<Arc<AssignmentSet>> {
        Ok(set.clone())
    }
}

/// Adapts a closure into a per-assignment rewriter, e.g. to split one stored
/// field into several columns.
pub struct AssignmentFn<F> {
    name: &'static str,
    func: F,
}

impl<F> AssignmentFn<F>
where
    F: Fn(&Assignment) -> RewriteResult<Vec<Assignment>> + Send + Sync,
{
    pub fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> std::fmt::Debug for AssignmentFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentFn").field("name", &self.name).finish()
    }
}

impl<F> Rewriter for AssignmentFn<F>
where
    F: Fn(&Assignment) -> RewriteResult<Vec<Assignment>> + Send + Sync,
{
    fn rewrite_assignment(
        &self,
        assignment: &Assignment,
        _ctx: &RewriteContext,
    ) -> RewriteResult<Vec<Assignment>> {
        (self.func)(assignment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_context_depth_limit() {
        let ctx = RewriteContext::with_max_depth(2);
        let one = ctx.descend().unwrap();
        let two = one.descend().unwrap();
        assert_eq!(two.depth(), 2);
        assert_eq!(two.descend().unwrap_err(), RewriteError::DepthExceeded(2));
    }

    #[test]
    fn test_required_type_reaches_only_the_top_node() {
        let ctx = RewriteContext::new().requiring(ValueType::list_of(ValueType::Int64));
        assert_eq!(ctx.required(), None);
        let top = ctx.descend().unwrap();
        assert_eq!(top.required(), Some(&ValueType::list_of(ValueType::Int64)));
        let child = top.descend().unwrap();
        assert_eq!(child.required(), None);
        assert_eq!(child.descend().unwrap().required(), None);
    }
}
