//! Folding already-resolved sub-queries into constants.

use super::traits::{RewriteContext, Rewriter};
use super::walk;
use crate::ast::builders::{null_of, operation, typed_constant};
use crate::ast::{Expr, ExprRef, Operator, SubQuery, Value, ValueType};
use crate::error::{RewriteError, RewriteResult};
use std::sync::Arc;

/// Replaces every [`Expr::Prefetched`] node with a constant.
///
/// In a collection slot the node becomes the whole ordered list of resolved
/// values. Collection slots are the right operand of `IN` / `NOT IN`, the
/// arguments of a `LIST` operation (values are spliced in place) and a top
/// node whose required type is a list. Anywhere else the node becomes the
/// first value, or a typed NULL when nothing was resolved.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrefetchFolder;

impl PrefetchFolder {
    pub fn new() -> Self {
        Self
    }

    fn check_values(values: &[Value], ty: &ValueType) -> RewriteResult<()> {
        match values.iter().find(|v| !v.conforms_to(ty)) {
            Some(bad) => Err(RewriteError::mismatch(
                ty,
                &bad.value_type(),
                "pre-fetched sub-query value",
            )),
            None => Ok(()),
        }
    }

    /// Single-value context.
    fn fold_single(values: &[Value], ty: &ValueType) -> RewriteResult<ExprRef> {
        Self::check_values(values, ty)?;
        Ok(match values.first() {
            Some(first) => typed_constant(first.clone(), ty.clone()),
            None => null_of(ty.clone()),
        })
    }

    /// List context: every value, in order, as one `List<ty>` constant.
    fn fold_list(values: &[Value], ty: &ValueType) -> RewriteResult<ExprRef> {
        Self::check_values(values, ty)?;
        Ok(typed_constant(
            Value::List(values.to_vec()),
            ValueType::list_of(ty.clone()),
        ))
    }

    /// Membership context: `left IN (values...)`.
    fn fold_membership(
        left: &ExprRef,
        values: &[Value],
        ty: &ValueType,
    ) -> RewriteResult<ExprRef> {
        if !left.ty().is_assignable_from(ty) {
            return Err(RewriteError::mismatch(
                left.ty(),
                ty,
                format!("membership test on {}", left),
            ));
        }
        Self::fold_list(values, ty)
    }

    /// `LIST(a, <prefetched>, b)` becomes `LIST(a, v1, v2, ..., b)`.
    fn splice_list(
        &self,
        args: &[ExprRef],
        ty: &ValueType,
        ctx: &RewriteContext,
    ) -> RewriteResult<ExprRef> {
        let mut items = Vec::with_capacity(args.len());
        for arg in args {
            match arg.as_ref() {
                Expr::Prefetched {
                    values, ty: elem, ..
                } => {
                    Self::check_values(values, elem)?;
                    if let Some(expected) = ty.element() {
                        if !expected.is_assignable_from(elem) {
                            return Err(RewriteError::mismatch(expected, elem, "list item"));
                        }
                    }
                    items.extend(
                        values
                            .iter()
                            .map(|v| typed_constant(v.clone(), elem.clone())),
                    );
                }
                _ => items.push(self.rewrite(arg, ctx)?),
            }
        }
        Ok(operation(Operator::List, items, ty.clone()))
    }
}

fn is_prefetched(expr: &ExprRef) -> bool {
    matches!(expr.as_ref(), Expr::Prefetched { .. })
}

impl Rewriter for PrefetchFolder {
    fn rewrite_operation(
        &self,
        expr: &ExprRef,
        op: Operator,
        args: &[ExprRef],
        ty: &ValueType,
        ctx: &RewriteContext,
    ) -> RewriteResult<ExprRef> {
        if op == Operator::List && args.iter().any(is_prefetched) {
            let list = self.splice_list(args, ty, ctx)?;
            tracing::debug!("Spliced pre-fetched values into {}", list);
            return Ok(list);
        }
        if let [left, right] = args {
            if let Expr::Prefetched {
                values, ty: elem, ..
            } = right.as_ref()
            {
                if op.is_membership() {
                    let left = self.rewrite(left, ctx)?;
                    let list = Self::fold_membership(&left, values, elem)?;
                    tracing::debug!("Folded {} pre-fetched values into {}", values.len(), op);
                    return Ok(operation(op, [left, list], ty.clone()));
                }
            }
        }
        walk::walk_operation(self, expr, op, args, ty, ctx)
    }

    fn rewrite_prefetched(
        &self,
        _expr: &ExprRef,
        _query: &Arc<SubQuery>,
        values: &[Value],
        ty: &ValueType,
        ctx: &RewriteContext,
    ) -> RewriteResult<ExprRef> {
        let folded = match ctx.required() {
            Some(ValueType::List(elem)) => {
                if !elem.is_assignable_from(ty) {
                    return Err(RewriteError::mismatch(elem, ty, "pre-fetched list"));
                }
                Self::fold_list(values, ty)?
            }
            _ => Self::fold_single(values, ty)?,
        };
        tracing::debug!("Folded pre-fetched sub-query into {}", folded);
        Ok(folded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::*;
    use crate::ast::PathRef;
    use pretty_assertions::assert_eq;

    fn ids(values: Vec<i64>) -> ExprRef {
        let order = root("o", ValueType::record("Order"));
        SubQuery::new()
            .select(order.property("customer_id", ValueType::Int64))
            .from(&order)
            .prefetched(values)
    }

    fn customer_id() -> PathRef {
        root("c", ValueType::record("Customer")).property("id", ValueType::Int64)
    }

    fn fold(expr: &ExprRef) -> RewriteResult<ExprRef> {
        PrefetchFolder.rewrite(expr, &RewriteContext::new())
    }

    #[test]
    fn test_single_context_takes_first() {
        let out = fold(&eq(customer_id(), ids(vec![7, 8, 9]))).unwrap();
        assert_eq!(out.to_string(), "c.id = 7");
    }

    #[test]
    fn test_membership_context_takes_all() {
        let out = fold(&in_(customer_id(), ids(vec![7, 8, 9]))).unwrap();
        assert_eq!(out.to_string(), "c.id IN (7, 8, 9)");
        let Expr::Operation { args, .. } = out.as_ref() else {
            panic!("expected operation");
        };
        assert_eq!(args[1].ty(), &ValueType::list_of(ValueType::Int64));
    }

    #[test]
    fn test_empty_single_context_is_typed_null() {
        let out = fold(&ids(vec![])).unwrap();
        assert_eq!(out.as_ref(), null_of(ValueType::Int64).as_ref());
    }

    #[test]
    fn test_nested_inside_subquery() {
        let c = root("c", ValueType::record("Customer"));
        let query = SubQuery::new()
            .select(c.property("name", ValueType::String))
            .from(&c)
            .filter(not_in(c.property("id", ValueType::Int64), ids(vec![1])))
            .into_expr();
        let out = fold(&query).unwrap();
        assert_eq!(out.to_string(), "(SELECT c.name FROM c WHERE c.id NOT IN (1))");
    }

    #[test]
    fn test_nonconforming_value_rejected() {
        let order = root("o", ValueType::record("Order"));
        let bad = SubQuery::new()
            .select(order.property("code", ValueType::Int8))
            .from(&order)
            .prefetched([1000i64]);
        assert!(matches!(
            fold(&bad).unwrap_err(),
            RewriteError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_membership_type_checked() {
        let name = root("c", ValueType::record("Customer")).property("name", ValueType::String);
        assert!(fold(&in_(name, ids(vec![1]))).is_err());
    }

    #[test]
    fn test_list_operation_splices_all_values() {
        let items = operation(
            Operator::List,
            [ids(vec![1, 2, 3])],
            ValueType::list_of(ValueType::Int64),
        );
        let out = fold(&in_(customer_id(), items)).unwrap();
        assert_eq!(out.to_string(), "c.id IN (1, 2, 3)");
    }

    #[test]
    fn test_list_operation_keeps_surrounding_items() {
        let items = operation(
            Operator::List,
            [typed_constant(0i64, ValueType::Int64), ids(vec![]), ids(vec![5, 6])],
            ValueType::list_of(ValueType::Int64),
        );
        let out = fold(&items).unwrap();
        assert_eq!(out.to_string(), "(0, 5, 6)");
        assert_eq!(out.ty(), &ValueType::list_of(ValueType::Int64));
    }

    #[test]
    fn test_list_operation_item_type_checked() {
        let items = operation(
            Operator::List,
            [ids(vec![1])],
            ValueType::list_of(ValueType::String),
        );
        assert!(matches!(
            fold(&items).unwrap_err(),
            RewriteError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_required_list_folds_every_value() {
        let ctx = RewriteContext::new().requiring(ValueType::list_of(ValueType::Int64));
        let out = PrefetchFolder.rewrite(&ids(vec![4, 5]), &ctx).unwrap();
        assert_eq!(
            out,
            typed_constant(vec![4i64, 5], ValueType::list_of(ValueType::Int64))
        );

        let wrong = RewriteContext::new().requiring(ValueType::list_of(ValueType::String));
        assert!(PrefetchFolder.rewrite(&ids(vec![4]), &wrong).is_err());
    }

    #[test]
    fn test_required_list_does_not_leak_into_children() {
        let ctx = RewriteContext::new().requiring(ValueType::list_of(ValueType::Int64));
        let items = projection(ValueType::list_of(ValueType::Int64), [ids(vec![4, 5])]);
        let out = PrefetchFolder.rewrite(&items, &ctx).unwrap();
        let Expr::Projection { args, .. } = out.as_ref() else {
            panic!("expected projection");
        };
        assert_eq!(args[0], typed_constant(4i64, ValueType::Int64));
    }
}
