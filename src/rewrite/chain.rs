//! Ordered composition of rewriters.

use super::traits::{NoopRewriter, RewriteContext, Rewriter};
use crate::ast::{Assignment, AssignmentSet, ExprRef, OrderSpec, ValueType};
use crate::config::RewriteConfig;
use crate::error::{RewriteError, RewriteResult};
use std::sync::Arc;

/// Applies its stages in order; stage `n + 1` sees the output of stage `n`.
///
/// Ordering clauses and stored values fan out: every stage is applied to
/// every clause/assignment the previous stage produced, preserving order.
#[derive(Debug, Clone)]
pub struct RewriterChain {
    stages: Vec<Arc<dyn Rewriter>>,
    ctx: RewriteContext,
}

impl Default for RewriterChain {
    fn default() -> Self {
        Self::noop()
    }
}

impl RewriterChain {
    pub fn new(stages: Vec<Arc<dyn Rewriter>>) -> RewriteResult<Self> {
        if stages.is_empty() {
            return Err(RewriteError::MissingArgument("rewriter stages"));
        }
        Ok(Self {
            stages,
            ctx: RewriteContext::default(),
        })
    }

    /// A chain that hands every input back untouched.
    pub fn noop() -> Self {
        Self {
            stages: vec![Arc::new(NoopRewriter)],
            ctx: RewriteContext::default(),
        }
    }

    pub fn with_config(mut self, config: &RewriteConfig) -> Self {
        self.ctx = RewriteContext::from_config(config);
        self
    }

    /// Append a stage.
    pub fn then(mut self, stage: Arc<dyn Rewriter>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn stages(&self) -> &[Arc<dyn Rewriter>] {
        &self.stages
    }

    fn pipe(&self, expr: &ExprRef, ctx: &RewriteContext) -> RewriteResult<ExprRef> {
        let mut current = expr.clone();
        for (i, stage) in self.stages.iter().enumerate() {
            let next = stage.rewrite(&current, ctx)?;
            if !Arc::ptr_eq(&next, &current) {
                tracing::trace!("Stage {} rewrote {} -> {}", i, current, next);
            }
            current = next;
        }
        Ok(current)
    }

    /// Rewrite `expr` and require the result to fit `required`.
    ///
    /// Every stage sees `required` through [`RewriteContext::required`] while
    /// handling the top node.
    pub fn apply(&self, expr: &ExprRef, required: &ValueType) -> RewriteResult<ExprRef> {
        let ctx = self.ctx.requiring(required.clone());
        let result = self.pipe(expr, &ctx)?;
        if !required.is_assignable_from(result.ty()) {
            return Err(RewriteError::mismatch(
                required,
                result.ty(),
                format!("rewrite of {}", expr),
            ));
        }
        if !Arc::ptr_eq(&result, expr) {
            tracing::debug!("Rewrote {} -> {}", expr, result);
        }
        Ok(result)
    }

    /// A projection must keep a type compatible with its original.
    pub fn apply_projection(&self, expr: &ExprRef) -> RewriteResult<ExprRef> {
        self.apply(expr, expr.ty())
    }

    pub fn apply_projections(&self, exprs: &[ExprRef]) -> RewriteResult<Vec<ExprRef>> {
        exprs.iter().map(|e| self.apply_projection(e)).collect()
    }

    /// A predicate must still be usable as a filter condition.
    pub fn apply_predicate(&self, expr: &ExprRef) -> RewriteResult<ExprRef> {
        self.apply(expr, &ValueType::Predicate)
    }

    pub fn apply_predicates(&self, exprs: &[ExprRef]) -> RewriteResult<Vec<ExprRef>> {
        exprs.iter().map(|e| self.apply_predicate(e)).collect()
    }

    pub fn apply_group_by(&self, exprs: &[ExprRef]) -> RewriteResult<Vec<ExprRef>> {
        self.apply_projections(exprs)
    }

    pub fn apply_order_clause(&self, spec: &OrderSpec) -> RewriteResult<Vec<OrderSpec>> {
        self.rewrite_order(spec, &self.ctx)
    }

    /// Rewrite every clause, concatenating the expansions in order.
    pub fn apply_order(&self, specs: &[OrderSpec]) -> RewriteResult<Vec<OrderSpec>> {
        let mut out = Vec::with_capacity(specs.len());
        for spec in specs {
            out.extend(self.apply_order_clause(spec)?);
        }
        if out.len() != specs.len() {
            tracing::debug!("Ordering expanded from {} to {} clauses", specs.len(), out.len());
        }
        Ok(out)
    }

    pub fn apply_stored_values(
        &self,
        set: &Arc<AssignmentSet>,
    ) -> RewriteResult<Arc<AssignmentSet>> {
        let result = self.rewrite_assignments(set, &self.ctx)?;
        if !Arc::ptr_eq(&result, set) {
            tracing::debug!("Rewrote stored values {} -> {}", set, result);
        }
        Ok(result)
    }
}

impl Rewriter for RewriterChain {
    fn rewrite(&self, expr: &ExprRef, ctx: &RewriteContext) -> RewriteResult<ExprRef> {
        self.pipe(expr, ctx)
    }

    fn rewrite_order(
        &self,
        spec: &OrderSpec,
        ctx: &RewriteContext,
    ) -> RewriteResult<Vec<OrderSpec>> {
        let mut current = vec![spec.clone()];
        for stage in &self.stages {
            let mut next = Vec::with_capacity(current.len());
            for spec in &current {
                next.extend(stage.rewrite_order(spec, ctx)?);
            }
            current = next;
        }
        Ok(current)
    }

    fn rewrite_assignment(
        &self,
        assignment: &Assignment,
        ctx: &RewriteContext,
    ) -> RewriteResult<Vec<Assignment>> {
        let mut current = vec![assignment.clone()];
        for stage in &self.stages {
            let mut next = Vec::with_capacity(current.len());
            for a in &current {
                next.extend(stage.rewrite_assignment(a, ctx)?);
            }
            current = next;
        }
        Ok(current)
    }

    /// Each stage sees the fully flattened set produced by the previous one.
    fn rewrite_assignments(
        &self,
        set: &Arc<AssignmentSet>,
        ctx: &RewriteContext,
    ) -> RewriteResult<Arc<AssignmentSet>> {
        let mut current = set.clone();
        for stage in &self.stages {
            current = stage.rewrite_assignments(&current, ctx)?;
        }
        Ok(current)
    }
}
