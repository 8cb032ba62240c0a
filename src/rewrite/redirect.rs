//! Declarative field redirection.
//!
//! A [`PathRedirect`] replaces reads of one path with another path or an
//! arbitrary expression, and decides what happens to writes of that path:
//! mirror them onto a stored path, hand them to a rule, or refuse them.

use super::convert::{Conversion, ExprConverter, ValueConverter};
use super::traits::{RewriteContext, Rewriter};
use super::walk;
use crate::ast::{Assignment, AssignmentSet, ExprRef, Path, PathRef, ValueType};
use crate::error::{RewriteError, RewriteResult};
use std::sync::Arc;

/// What to do with a stored value written to the redirected path.
#[derive(Debug, Clone)]
pub enum WritePolicy {
    /// Store into `target`, converting on the way.
    Mirror { target: PathRef, conversion: Conversion },
    /// Run the rule over a set holding just that assignment.
    Rule(Arc<dyn Rewriter>),
    Forbid,
}

#[derive(Debug, Clone)]
enum Target {
    Path(PathRef),
    Expr(ExprRef),
}

impl Target {
    fn expr(&self) -> &ExprRef {
        match self {
            Target::Path(path) => path.expr(),
            Target::Expr(expr) => expr,
        }
    }

    fn ty(&self) -> &ValueType {
        self.expr().ty()
    }
}

#[derive(Debug, Clone)]
pub struct PathRedirect {
    source: PathRef,
    read: ExprRef,
    write: WritePolicy,
}

/// Builder for [`PathRedirect`].
#[derive(Debug)]
pub struct PathRedirectBuilder {
    source: PathRef,
    target: Option<Target>,
    conversion: Conversion,
    mirror: Option<PathRef>,
    rule: Option<Arc<dyn Rewriter>>,
    read_only: bool,
}

impl PathRedirect {
    pub fn builder(source: &PathRef) -> PathRedirectBuilder {
        PathRedirectBuilder {
            source: source.clone(),
            target: None,
            conversion: Conversion::Identity,
            mirror: None,
            rule: None,
            read_only: false,
        }
    }

    pub fn source(&self) -> &PathRef {
        &self.source
    }

    /// Expression every read of the source is replaced with.
    pub fn read_target(&self) -> &ExprRef {
        &self.read
    }

    pub fn write_policy(&self) -> &WritePolicy {
        &self.write
    }

    fn is_source(&self, expr: &ExprRef) -> bool {
        Arc::ptr_eq(expr, self.source.expr()) || expr.as_ref() == self.source.expr().as_ref()
    }

    fn store(
        &self,
        assignment: &Assignment,
        ctx: &RewriteContext,
    ) -> RewriteResult<Vec<Assignment>> {
        match &self.write {
            WritePolicy::Forbid => {
                tracing::warn!("Rejected write to redirected path {}", assignment.path);
                Err(RewriteError::DisallowedWrite(assignment.path.to_string()))
            }
            WritePolicy::Mirror { target, conversion } => {
                let value = match &assignment.value {
                    Some(v) => Some(conversion.store(&self.rewrite(v, ctx)?)?),
                    None => None,
                };
                tracing::debug!("Redirected write {} -> {}", assignment.path, target);
                Ok(vec![Assignment::new(target.clone(), value)?])
            }
            WritePolicy::Rule(rule) => {
                let single: AssignmentSet = std::iter::once(assignment.clone()).collect();
                let out = rule.rewrite_assignments(&single.into_shared(), ctx)?;
                Ok(out.iter().cloned().collect())
            }
        }
    }
}

impl PathRedirectBuilder {
    /// Rename: read and (by default) write `target` instead.
    pub fn to_path(mut self, target: &PathRef) -> Self {
        self.target = Some(Target::Path(target.clone()));
        self
    }

    /// Substitute an arbitrary expression on the read side.
    pub fn to_expr(mut self, target: &ExprRef) -> Self {
        self.target = Some(Target::Expr(target.clone()));
        self
    }

    pub fn convert_values(mut self, converter: Arc<dyn ValueConverter>) -> Self {
        self.conversion = Conversion::Value(converter);
        self
    }

    pub fn convert_exprs(mut self, converter: Arc<dyn ExprConverter>) -> Self {
        self.conversion = Conversion::Expr(converter);
        self
    }

    /// Store writes into `path`, converted like reads.
    pub fn mirror_to(mut self, path: &PathRef) -> Self {
        self.mirror = Some(path.clone());
        self
    }

    /// Hand writes to `rule` instead of mirroring them.
    pub fn store_with(mut self, rule: Arc<dyn Rewriter>) -> Self {
        self.rule = Some(rule);
        self
    }

    /// Refuse every write to the source.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn build(self) -> RewriteResult<PathRedirect> {
        let source_ty = self.source.ty().clone();
        let target = self.target.ok_or_else(|| {
            RewriteError::invalid(format!("redirect of {} has no target", self.source))
        })?;

        match (&self.conversion.model_type(), &self.conversion.stored_type()) {
            (Some(model), Some(stored)) => {
                if !model.is_assignable_from(&source_ty) {
                    return Err(RewriteError::invalid(format!(
                        "converter for {} expects {}, source is {}",
                        self.source, model, source_ty
                    )));
                }
                if !target.ty().is_compatible_with(stored) {
                    return Err(RewriteError::invalid(format!(
                        "converter for {} stores {}, target {} is {}",
                        self.source,
                        stored,
                        target.expr(),
                        target.ty()
                    )));
                }
            }
            _ => {
                let ok = match &target {
                    Target::Path(path) => source_ty.is_compatible_with(path.ty()),
                    Target::Expr(expr) => source_ty.is_assignable_from(expr.ty()),
                };
                if !ok {
                    return Err(RewriteError::invalid(format!(
                        "cannot redirect {} ({}) to {} ({}) without a converter",
                        self.source,
                        source_ty,
                        target.expr(),
                        target.ty()
                    )));
                }
            }
        }

        let mirror = match (self.mirror, &target) {
            (Some(path), _) => Some(path),
            (None, Target::Path(path)) => Some(path.clone()),
            (None, Target::Expr(_)) => None,
        };
        if let Some(path) = &mirror {
            let stored = self.conversion.stored_type().unwrap_or_else(|| source_ty.clone());
            if !path.ty().is_assignable_from(&stored) {
                return Err(RewriteError::invalid(format!(
                    "cannot store {} into {} ({})",
                    stored,
                    path,
                    path.ty()
                )));
            }
        }

        let write = match (self.read_only, self.rule, mirror) {
            (true, _, _) => WritePolicy::Forbid,
            (false, Some(rule), _) => WritePolicy::Rule(rule),
            (false, None, Some(target)) => WritePolicy::Mirror {
                target,
                conversion: self.conversion.clone(),
            },
            (false, None, None) => WritePolicy::Forbid,
        };

        let read = self.conversion.load(target.expr(), &source_ty)?;
        Ok(PathRedirect {
            source: self.source,
            read,
            write,
        })
    }
}

impl Rewriter for PathRedirect {
    fn rewrite_path(
        &self,
        expr: &ExprRef,
        path: &Path,
        ctx: &RewriteContext,
    ) -> RewriteResult<ExprRef> {
        if self.is_source(expr) {
            tracing::debug!("Redirected read {} -> {}", self.source, self.read);
            return Ok(self.read.clone());
        }
        walk::walk_path(self, expr, path, ctx)
    }

    fn rewrite_assignment(
        &self,
        assignment: &Assignment,
        ctx: &RewriteContext,
    ) -> RewriteResult<Vec<Assignment>> {
        if self.is_source(assignment.path.expr()) {
            return self.store(assignment, ctx);
        }
        walk::walk_assignment(self, assignment, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::*;
    use crate::rewrite::convert::{BoolFlagConverter, CastConverter, NumericStringConverter};
    use crate::rewrite::traits::AssignmentFn;
    use pretty_assertions::assert_eq;

    fn account() -> PathRef {
        root("a", ValueType::record("Account"))
    }

    fn ctx() -> RewriteContext {
        RewriteContext::new()
    }

    #[test]
    fn test_missing_target() {
        let active = account().property("active", ValueType::Boolean);
        assert!(matches!(
            PathRedirect::builder(&active).build().unwrap_err(),
            RewriteError::InvalidConstruction(_)
        ));
    }

    #[test]
    fn test_only_exact_source_replaced() {
        let a = account();
        let name = a.property("name", ValueType::String);
        let label = a.property("label", ValueType::String);
        let redirect = PathRedirect::builder(&name).to_path(&label).build().unwrap();

        let other = eq(a.property("email", ValueType::String), constant("x"));
        assert!(Arc::ptr_eq(&redirect.rewrite(&other, &ctx()).unwrap(), &other));

        let nested = name.property("first", ValueType::String);
        let out = redirect.rewrite(nested.expr(), &ctx()).unwrap();
        assert_eq!(out.to_string(), "a.label.first");
    }

    #[test]
    fn test_flag_column_read_and_write() {
        let a = account();
        let active = a.property("active", ValueType::Boolean);
        let flag = a.property("active_flag", ValueType::String);
        let redirect = PathRedirect::builder(&active)
            .to_path(&flag)
            .convert_values(Arc::new(BoolFlagConverter::default()))
            .build()
            .unwrap();

        let pred = eq(&active, constant(true));
        let out = redirect.rewrite(&pred, &ctx()).unwrap();
        assert_eq!(out.to_string(), "CAST(a.active_flag AS Boolean) = true");

        let set = AssignmentSet::new()
            .with(&active, constant(false))
            .unwrap()
            .into_shared();
        let stored = redirect.rewrite_assignments(&set, &ctx()).unwrap();
        assert_eq!(stored.to_string(), "{a.active_flag = 'N'}");
    }

    #[test]
    fn test_null_write_stays_null() {
        let a = account();
        let count = a.property("count", ValueType::Int32);
        let text = a.property("count_text", ValueType::String);
        let redirect = PathRedirect::builder(&count)
            .to_path(&text)
            .convert_values(Arc::new(NumericStringConverter::int32()))
            .build()
            .unwrap();

        let set = AssignmentSet::new().with_null(&count).unwrap().into_shared();
        let out = redirect.rewrite_assignments(&set, &ctx()).unwrap();
        assert_eq!(out.to_string(), "{a.count_text = NULL}");
    }

    #[test]
    fn test_expression_target_forbids_writes_by_default() {
        let a = account();
        let full = a.property("full_name", ValueType::String);
        let computed = concat(
            a.property("first", ValueType::String),
            a.property("last", ValueType::String),
        );
        let redirect = PathRedirect::builder(&full).to_expr(&computed).build().unwrap();
        assert!(matches!(redirect.write_policy(), WritePolicy::Forbid));

        let out = redirect.rewrite(&eq(&full, constant("x")), &ctx()).unwrap();
        assert_eq!(out.to_string(), "a.first || a.last = 'x'");

        let set = AssignmentSet::new().with(&full, constant("x")).unwrap().into_shared();
        assert_eq!(
            redirect.rewrite_assignments(&set, &ctx()).unwrap_err(),
            RewriteError::DisallowedWrite("a.full_name".to_string())
        );
    }

    #[test]
    fn test_expression_target_type_checked() {
        let a = account();
        let full = a.property("full_name", ValueType::String);
        let wrong = a.property("age", ValueType::Int32).into_expr();
        assert!(PathRedirect::builder(&full).to_expr(&wrong).build().is_err());
    }

    #[test]
    fn test_rule_splits_write() {
        let a = account();
        let full = a.property("full_name", ValueType::String);
        let first = a.property("first", ValueType::String);
        let last = a.property("last", ValueType::String);
        let computed = concat(&first, &last);

        let (f, l) = (first.clone(), last.clone());
        let rule = AssignmentFn::new("split-full-name", move |asg: &Assignment| {
            Ok(vec![
                Assignment::new(f.clone(), asg.value.clone())?,
                Assignment::new(l.clone(), Some(constant("")))?,
            ])
        });
        let redirect = PathRedirect::builder(&full)
            .to_expr(&computed)
            .store_with(Arc::new(rule))
            .build()
            .unwrap();

        let set = AssignmentSet::new()
            .with(&full, constant("Ada"))
            .unwrap()
            .into_shared();
        let out = redirect.rewrite_assignments(&set, &ctx()).unwrap();
        assert_eq!(out.to_string(), "{a.first = 'Ada', a.last = ''}");
    }

    #[test]
    fn test_expression_converter_on_non_constant_write() {
        let a = account();
        let amount = a.property("amount", ValueType::Decimal);
        let stored = a.property("amount_text", ValueType::String);
        let redirect = PathRedirect::builder(&amount)
            .to_path(&stored)
            .convert_exprs(Arc::new(CastConverter::new(ValueType::Decimal, ValueType::String)))
            .build()
            .unwrap();

        let p = param("amount", ValueType::Decimal);
        let set = AssignmentSet::new().with(&amount, p).unwrap().into_shared();
        let out = redirect.rewrite_assignments(&set, &ctx()).unwrap();
        assert_eq!(out.to_string(), "{a.amount_text = CAST(:amount AS String)}");
    }
}
