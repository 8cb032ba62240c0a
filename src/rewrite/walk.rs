//! Default per-kind rewrite steps.
//!
//! Each function rewrites the children of one node kind through the given
//! rewriter and rebuilds the node only when a child came back as a different
//! `Arc`. Unchanged children are reused as-is, so siblings of a rewritten node
//! stay identity-equal in the rebuilt parent.

use super::traits::{RewriteContext, Rewriter};
use crate::ast::{
    Assignment, AssignmentSet, Expr, ExprRef, Join, Operator, OrderSpec, Path, PathRef, PathStep,
    QueryFlag, SubQuery, Value, ValueType,
};
use crate::error::{RewriteError, RewriteResult};
use std::sync::Arc;

/// Route an expression to the rewriter hook for its kind.
pub fn dispatch<R: Rewriter + ?Sized>(
    rw: &R,
    expr: &ExprRef,
    ctx: &RewriteContext,
) -> RewriteResult<ExprRef> {
    let ctx = ctx.descend()?;
    match expr.as_ref() {
        Expr::Constant { .. } => rw.rewrite_constant(expr, &ctx),
        Expr::Param { .. } => rw.rewrite_param(expr, &ctx),
        Expr::Path(path) => rw.rewrite_path(expr, path, &ctx),
        Expr::Operation { op, args, ty } => rw.rewrite_operation(expr, *op, args, ty, &ctx),
        Expr::Projection { args, target } => rw.rewrite_projection(expr, args, target, &ctx),
        Expr::Template { template, args, ty } => {
            rw.rewrite_template(expr, template, args, ty, &ctx)
        }
        Expr::SubQuery(query) => rw.rewrite_subquery(expr, query, &ctx),
        Expr::Prefetched { query, values, ty } => {
            rw.rewrite_prefetched(expr, query, values, ty, &ctx)
        }
    }
}

/// Rewrite an argument list. `None` means every argument came back unchanged.
pub fn rewrite_args<R: Rewriter + ?Sized>(
    rw: &R,
    args: &[ExprRef],
    ctx: &RewriteContext,
) -> RewriteResult<Option<Vec<ExprRef>>> {
    let mut rewritten: Option<Vec<ExprRef>> = None;
    for (i, arg) in args.iter().enumerate() {
        let new = rw.rewrite(arg, ctx)?;
        match rewritten.as_mut() {
            Some(out) => out.push(new),
            None if !Arc::ptr_eq(&new, arg) => {
                let mut out = Vec::with_capacity(args.len());
                out.extend_from_slice(&args[..i]);
                out.push(new);
                rewritten = Some(out);
            }
            None => {}
        }
    }
    Ok(rewritten)
}

/// Rewrite an optional child. `None` means unchanged.
pub fn rewrite_opt<R: Rewriter + ?Sized>(
    rw: &R,
    expr: Option<&ExprRef>,
    ctx: &RewriteContext,
) -> RewriteResult<Option<Option<ExprRef>>> {
    match expr {
        Some(e) => {
            let new = rw.rewrite(e, ctx)?;
            Ok((!Arc::ptr_eq(&new, e)).then_some(Some(new)))
        }
        None => Ok(None),
    }
}

/// Rewrite a node that must stay a path.
pub fn rewrite_path_ref<R: Rewriter + ?Sized>(
    rw: &R,
    path: &PathRef,
    ctx: &RewriteContext,
) -> RewriteResult<PathRef> {
    let new = rw.rewrite(path.expr(), ctx)?;
    if Arc::ptr_eq(&new, path.expr()) {
        Ok(path.clone())
    } else {
        PathRef::try_from(new)
    }
}

pub fn walk_path<R: Rewriter + ?Sized>(
    rw: &R,
    expr: &ExprRef,
    path: &Path,
    ctx: &RewriteContext,
) -> RewriteResult<ExprRef> {
    match &path.step {
        PathStep::Root { .. } => Ok(expr.clone()),
        PathStep::Property { parent, kind, name } => {
            let new_parent = rewrite_path_ref(rw, parent, ctx)?;
            if new_parent.ptr_eq(parent) {
                return Ok(expr.clone());
            }
            Ok(new_parent
                .derive(*kind, name.clone(), path.ty.clone())
                .into_expr())
        }
        PathStep::Element {
            parent,
            kind,
            element,
        } => {
            let new_parent = rewrite_path_ref(rw, parent, ctx)?;
            let new_element = rw.rewrite(element, ctx)?;
            if new_parent.ptr_eq(parent) && Arc::ptr_eq(&new_element, element) {
                return Ok(expr.clone());
            }
            Ok(new_parent
                .element(*kind, new_element, path.ty.clone())
                .into_expr())
        }
    }
}

pub fn walk_operation<R: Rewriter + ?Sized>(
    rw: &R,
    expr: &ExprRef,
    op: Operator,
    args: &[ExprRef],
    ty: &ValueType,
    ctx: &RewriteContext,
) -> RewriteResult<ExprRef> {
    let Some(args) = rewrite_args(rw, args, ctx)? else {
        return Ok(expr.clone());
    };
    // A predicate operator always yields a predicate, whatever was declared
    let ty = if op.is_predicate() && !ty.is_predicate() {
        ValueType::Predicate
    } else {
        ty.clone()
    };
    Ok(Arc::new(Expr::Operation { op, args, ty }))
}

pub fn walk_projection<R: Rewriter + ?Sized>(
    rw: &R,
    expr: &ExprRef,
    args: &[ExprRef],
    target: &ValueType,
    ctx: &RewriteContext,
) -> RewriteResult<ExprRef> {
    match rewrite_args(rw, args, ctx)? {
        Some(args) => Ok(Arc::new(Expr::Projection {
            args,
            target: target.clone(),
        })),
        None => Ok(expr.clone()),
    }
}

pub fn walk_template<R: Rewriter + ?Sized>(
    rw: &R,
    expr: &ExprRef,
    template: &str,
    args: &[ExprRef],
    ty: &ValueType,
    ctx: &RewriteContext,
) -> RewriteResult<ExprRef> {
    match rewrite_args(rw, args, ctx)? {
        Some(args) => Ok(Arc::new(Expr::Template {
            template: template.to_string(),
            args,
            ty: ty.clone(),
        })),
        None => Ok(expr.clone()),
    }
}

fn rewrite_flags<R: Rewriter + ?Sized>(
    rw: &R,
    flags: &[QueryFlag],
    ctx: &RewriteContext,
) -> RewriteResult<Option<Vec<QueryFlag>>> {
    let exprs: Vec<ExprRef> = flags.iter().map(|f| f.flag.clone()).collect();
    Ok(rewrite_args(rw, &exprs, ctx)?.map(|new| {
        flags
            .iter()
            .zip(new)
            .map(|(f, flag)| QueryFlag {
                position: f.position,
                flag,
            })
            .collect()
    }))
}

fn rewrite_joins<R: Rewriter + ?Sized>(
    rw: &R,
    joins: &[Join],
    ctx: &RewriteContext,
) -> RewriteResult<Option<Vec<Join>>> {
    let mut changed = false;
    let mut out = Vec::with_capacity(joins.len());
    for join in joins {
        let target = rw.rewrite(&join.target, ctx)?;
        let condition = rewrite_opt(rw, join.condition.as_ref(), ctx)?;
        let flags = rewrite_flags(rw, &join.flags, ctx)?;
        if Arc::ptr_eq(&target, &join.target) && condition.is_none() && flags.is_none() {
            out.push(join.clone());
            continue;
        }
        changed = true;
        out.push(Join {
            kind: join.kind,
            target,
            condition: condition.unwrap_or_else(|| join.condition.clone()),
            flags: flags.unwrap_or_else(|| join.flags.clone()),
        });
    }
    Ok(changed.then_some(out))
}

fn rewrite_orders<R: Rewriter + ?Sized>(
    rw: &R,
    specs: &[OrderSpec],
    ctx: &RewriteContext,
) -> RewriteResult<Option<Vec<OrderSpec>>> {
    let mut changed = false;
    let mut out = Vec::with_capacity(specs.len());
    for spec in specs {
        let expanded = rw.rewrite_order(spec, ctx)?;
        if !(expanded.len() == 1 && same_order(&expanded[0], spec)) {
            changed = true;
        }
        out.extend(expanded);
    }
    Ok(changed.then_some(out))
}

fn rewrite_params<R: Rewriter + ?Sized>(
    rw: &R,
    params: &[(ExprRef, Value)],
    ctx: &RewriteContext,
) -> RewriteResult<Option<Vec<(ExprRef, Value)>>> {
    let keys: Vec<ExprRef> = params.iter().map(|(k, _)| k.clone()).collect();
    Ok(rewrite_args(rw, &keys, ctx)?.map(|new| {
        new.into_iter()
            .zip(params.iter().map(|(_, v)| v.clone()))
            .collect()
    }))
}

/// Rewrite every component of a sub-query. `None` means nothing changed.
pub fn rewrite_query_parts<R: Rewriter + ?Sized>(
    rw: &R,
    query: &SubQuery,
    ctx: &RewriteContext,
) -> RewriteResult<Option<SubQuery>> {
    let flags = rewrite_flags(rw, &query.flags, ctx)?;
    let group_by = rewrite_args(rw, &query.group_by, ctx)?;
    let having = rewrite_opt(rw, query.having.as_ref(), ctx)?;
    let joins = rewrite_joins(rw, &query.joins, ctx)?;
    let order_by = rewrite_orders(rw, &query.order_by, ctx)?;
    let params = rewrite_params(rw, &query.params, ctx)?;
    let projection = rewrite_opt(rw, query.projection.as_ref(), ctx)?;
    let filter = rewrite_opt(rw, query.filter.as_ref(), ctx)?;

    if flags.is_none()
        && group_by.is_none()
        && having.is_none()
        && joins.is_none()
        && order_by.is_none()
        && params.is_none()
        && projection.is_none()
        && filter.is_none()
    {
        return Ok(None);
    }

    let projection = projection.unwrap_or_else(|| query.projection.clone());
    let ty = SubQuery::derive_type(projection.as_ref(), &query.ty);
    Ok(Some(SubQuery {
        distinct: query.distinct,
        unique: query.unique,
        flags: flags.unwrap_or_else(|| query.flags.clone()),
        group_by: group_by.unwrap_or_else(|| query.group_by.clone()),
        having: having.unwrap_or_else(|| query.having.clone()),
        joins: joins.unwrap_or_else(|| query.joins.clone()),
        order_by: order_by.unwrap_or_else(|| query.order_by.clone()),
        params: params.unwrap_or_else(|| query.params.clone()),
        limit: query.limit,
        offset: query.offset,
        projection,
        filter: filter.unwrap_or_else(|| query.filter.clone()),
        ty,
    }))
}

pub fn walk_subquery<R: Rewriter + ?Sized>(
    rw: &R,
    expr: &ExprRef,
    query: &SubQuery,
    ctx: &RewriteContext,
) -> RewriteResult<ExprRef> {
    match rewrite_query_parts(rw, query, ctx)? {
        Some(query) => Ok(Arc::new(Expr::SubQuery(query))),
        None => Ok(expr.clone()),
    }
}

/// The embedded query is rewritten for consistency; resolved values are kept
/// and the element type follows the rewritten projection.
pub fn walk_prefetched<R: Rewriter + ?Sized>(
    rw: &R,
    expr: &ExprRef,
    query: &Arc<SubQuery>,
    values: &[Value],
    ty: &ValueType,
    ctx: &RewriteContext,
) -> RewriteResult<ExprRef> {
    match rewrite_query_parts(rw, query, ctx)? {
        Some(query) => Ok(Arc::new(Expr::Prefetched {
            ty: SubQuery::derive_type(query.projection.as_ref(), ty),
            query: Arc::new(query),
            values: values.to_vec(),
        })),
        None => Ok(expr.clone()),
    }
}

fn same_order(a: &OrderSpec, b: &OrderSpec) -> bool {
    a.order == b.order && a.nulls == b.nulls && Arc::ptr_eq(&a.target, &b.target)
}

pub fn walk_order<R: Rewriter + ?Sized>(
    rw: &R,
    spec: &OrderSpec,
    ctx: &RewriteContext,
) -> RewriteResult<Vec<OrderSpec>> {
    let target = rw.rewrite(&spec.target, ctx)?;
    if Arc::ptr_eq(&target, &spec.target) {
        return Ok(vec![spec.clone()]);
    }
    if !target.ty().is_comparable() {
        return Err(RewriteError::mismatch(
            spec.target.ty(),
            target.ty(),
            format!("ordering by {}", target),
        ));
    }
    Ok(vec![spec.with_target(target)])
}

pub fn walk_assignment<R: Rewriter + ?Sized>(
    rw: &R,
    assignment: &Assignment,
    ctx: &RewriteContext,
) -> RewriteResult<Vec<Assignment>> {
    let path = rewrite_path_ref(rw, &assignment.path, ctx)?;
    let value = match &assignment.value {
        Some(v) => Some(rw.rewrite(v, ctx)?),
        None => None,
    };
    let value_same = match (&value, &assignment.value) {
        (Some(new), Some(old)) => Arc::ptr_eq(new, old),
        _ => true,
    };
    if path.ptr_eq(&assignment.path) && value_same {
        return Ok(vec![assignment.clone()]);
    }
    Ok(vec![Assignment::new(path, value)?])
}

/// Flatten every assignment's rewrite, in order, into a new set. Later
/// duplicates override earlier ones.
pub fn walk_assignments<R: Rewriter + ?Sized>(
    rw: &R,
    set: &Arc<AssignmentSet>,
    ctx: &RewriteContext,
) -> RewriteResult<Arc<AssignmentSet>> {
    let mut changed = false;
    let mut out = AssignmentSet::new();
    for assignment in set.iter() {
        let rewritten = rw.rewrite_assignment(assignment, ctx)?;
        if !(rewritten.len() == 1 && rewritten[0].same_as(assignment)) {
            changed = true;
        }
        for a in rewritten {
            out.insert(a);
        }
    }
    if !changed {
        return Ok(set.clone());
    }
    Ok(Arc::new(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::*;
    use crate::ast::{FlagPosition, JoinKind, PathKind};
    use pretty_assertions::assert_eq;

    /// Replaces constant `from` with `to`, everything else via the defaults.
    #[derive(Debug)]
    struct SwapConstant {
        from: Value,
        to: Value,
    }

    impl Rewriter for SwapConstant {
        fn rewrite_constant(
            &self,
            expr: &ExprRef,
            _ctx: &RewriteContext,
        ) -> RewriteResult<ExprRef> {
            match expr.as_ref() {
                Expr::Constant { value, ty } if *value == self.from => {
                    Ok(typed_constant(self.to.clone(), ty.clone()))
                }
                _ => Ok(expr.clone()),
            }
        }
    }

    fn swap(from: impl Into<Value>, to: impl Into<Value>) -> SwapConstant {
        SwapConstant {
            from: from.into(),
            to: to.into(),
        }
    }

    fn person() -> PathRef {
        root("person", ValueType::record("Person"))
    }

    #[test]
    fn test_identity_for_every_kind() {
        let rw = swap("never", "x");
        let ctx = RewriteContext::new();
        let p = person();
        let tags = p.property("tags", ValueType::list_of(ValueType::String));
        let query = SubQuery::new()
            .select(p.property("id", ValueType::Int64))
            .from(&p)
            .join(JoinKind::Left, p.property("pet", ValueType::record("Pet")))
            .on(is_not_null(p.property("pet", ValueType::record("Pet"))))
            .flag(
                FlagPosition::AfterSelect,
                template("/*+ hint */", Vec::<ExprRef>::new(), ValueType::Any),
            )
            .filter(eq(p.property("name", ValueType::String), constant("a")))
            .group_by(p.property("name", ValueType::String))
            .having(gt(constant(1), constant(0)))
            .order_by(OrderSpec::asc(p.property("age", ValueType::Int32)))
            .bind(param("n", ValueType::String), "a");

        let nodes = vec![
            constant(1),
            param("p", ValueType::Int64),
            p.expr().clone(),
            tags.element(PathKind::ListValue, constant(0), ValueType::String).into_expr(),
            eq(p.property("name", ValueType::String), constant("b")),
            projection(ValueType::Tuple, [constant(1), constant(2)]),
            template("{0} + 1", [constant(1)], ValueType::Int64),
            query.clone().into_expr(),
            query.prefetched([1i64, 2]),
        ];
        for node in nodes {
            let out = rw.rewrite(&node, &ctx).unwrap();
            assert!(Arc::ptr_eq(&out, &node), "rebuilt unchanged node {}", node);
        }
    }

    #[test]
    fn test_siblings_stay_identical() {
        let p = person();
        let name = p.property("name", ValueType::String).into_expr();
        let pred = eq(name.clone(), constant("a"));

        let out = swap("a", "b").rewrite(&pred, &RewriteContext::new()).unwrap();
        assert!(!Arc::ptr_eq(&out, &pred));
        let Expr::Operation { args, ty, .. } = out.as_ref() else {
            panic!("expected operation");
        };
        assert!(Arc::ptr_eq(&args[0], &name));
        assert_eq!(args[1].to_string(), "'b'");
        assert_eq!(ty, &ValueType::Predicate);
    }

    #[test]
    fn test_element_path_rebuilds_only_element() {
        let p = person();
        let tags = p.property("tags", ValueType::list_of(ValueType::String));
        let elem = tags.element(PathKind::MapValue, constant("a"), ValueType::String);

        let out = swap("a", "z").rewrite(elem.expr(), &RewriteContext::new()).unwrap();
        let path = out.as_path().unwrap();
        assert_eq!(out.to_string(), "person.tags['z']");
        assert_eq!(path.kind(), PathKind::MapValue);
        assert!(path.parent().unwrap().ptr_eq(&tags));
    }

    #[test]
    fn test_subquery_rebuild_keeps_untouched_parts() {
        let p = person();
        let age = p.property("age", ValueType::Int32);
        let query = SubQuery::new()
            .select(projection(ValueType::Tuple, [constant("a")]))
            .from(&p)
            .filter(gt(&age, constant(1)))
            .order_by(OrderSpec::desc(&age))
            .distinct()
            .limit(3)
            .offset(1);
        let expr = query.clone().into_expr();

        let out = swap("a", "b").rewrite(&expr, &RewriteContext::new()).unwrap();
        let Expr::SubQuery(new) = out.as_ref() else {
            panic!("expected sub-query");
        };
        assert!(new.distinct);
        assert_eq!((new.limit, new.offset), (Some(3), Some(1)));
        assert_eq!(new.ty, ValueType::Tuple);
        assert!(Arc::ptr_eq(
            new.filter.as_ref().unwrap(),
            query.filter.as_ref().unwrap()
        ));
        assert!(Arc::ptr_eq(&new.order_by[0].target, &query.order_by[0].target));
        assert!(Arc::ptr_eq(&new.joins[0].target, &query.joins[0].target));
        assert_eq!(new.projection.as_ref().unwrap().to_string(), "Tuple('b')");
    }

    #[test]
    fn test_assignments_unchanged_returns_same_set() {
        let p = person();
        let set = AssignmentSet::new()
            .with(&p.property("name", ValueType::String), constant("a"))
            .unwrap()
            .into_shared();

        let ctx = RewriteContext::new();
        let same = swap("x", "y").rewrite_assignments(&set, &ctx).unwrap();
        assert!(Arc::ptr_eq(&same, &set));

        let changed = swap("a", "b").rewrite_assignments(&set, &ctx).unwrap();
        assert!(!Arc::ptr_eq(&changed, &set));
        assert_eq!(changed.to_string(), "{person.name = 'b'}");
    }

    #[test]
    fn test_assignment_type_checked_after_rewrite() {
        let p = person();
        let age = p.property("age", ValueType::Int64);
        let set = AssignmentSet::new()
            .with(&age, typed_constant(5, ValueType::Int64))
            .unwrap()
            .into_shared();

        #[derive(Debug)]
        struct Stringify;
        impl Rewriter for Stringify {
            fn rewrite_constant(
                &self,
                _expr: &ExprRef,
                _ctx: &RewriteContext,
            ) -> RewriteResult<ExprRef> {
                Ok(constant("five"))
            }
        }

        let err = Stringify
            .rewrite_assignments(&set, &RewriteContext::new())
            .unwrap_err();
        assert!(matches!(err, RewriteError::TypeMismatch { .. }));
    }

    #[test]
    fn test_path_must_stay_path() {
        #[derive(Debug)]
        struct PathToConstant;
        impl Rewriter for PathToConstant {
            fn rewrite_path(
                &self,
                _expr: &ExprRef,
                _path: &Path,
                _ctx: &RewriteContext,
            ) -> RewriteResult<ExprRef> {
                Ok(null_of(ValueType::String))
            }
        }

        let p = person();
        let set = AssignmentSet::new()
            .with(&p.property("name", ValueType::String), constant("a"))
            .unwrap()
            .into_shared();
        let err = PathToConstant
            .rewrite_assignments(&set, &RewriteContext::new())
            .unwrap_err();
        assert!(matches!(err, RewriteError::NotAPath(_)));
    }

    #[test]
    fn test_order_target_must_stay_comparable() {
        #[derive(Debug)]
        struct ToRecord;
        impl Rewriter for ToRecord {
            fn rewrite_path(
                &self,
                _expr: &ExprRef,
                _path: &Path,
                _ctx: &RewriteContext,
            ) -> RewriteResult<ExprRef> {
                Ok(projection(ValueType::record("Person"), [constant(1)]))
            }
        }

        let spec = OrderSpec::asc(person().property("age", ValueType::Int32));
        let err = ToRecord.rewrite_order(&spec, &RewriteContext::new()).unwrap_err();
        assert!(matches!(err, RewriteError::TypeMismatch { .. }));
    }

    #[test]
    fn test_depth_limit() {
        let mut expr = constant(0);
        for _ in 0..10 {
            expr = not(expr);
        }
        let err = swap(0, 1)
            .rewrite(&expr, &RewriteContext::with_max_depth(5))
            .unwrap_err();
        assert_eq!(err, RewriteError::DepthExceeded(5));
    }

    /// Renames parameter `from` to `to`.
    #[derive(Debug)]
    struct RenameParam {
        from: &'static str,
        to: &'static str,
    }

    impl Rewriter for RenameParam {
        fn rewrite_param(&self, expr: &ExprRef, _ctx: &RewriteContext) -> RewriteResult<ExprRef> {
            match expr.as_ref() {
                Expr::Param { name, ty } if name == self.from => Ok(param(self.to, ty.clone())),
                _ => Ok(expr.clone()),
            }
        }
    }

    /// Every component carries its own marker constant, so a swap touches
    /// exactly one of them.
    fn marked_query() -> SubQuery {
        let p = person();
        let pet = root("pet", ValueType::record("Pet"));
        let city = p.property("city", ValueType::String);
        let mut query = SubQuery::new()
            .select(p.property("id", ValueType::Int64))
            .from(&p)
            .flag(
                FlagPosition::AfterSelect,
                template("/*+ {0} */", [constant("flag")], ValueType::Any),
            )
            .join(JoinKind::Inner, &pet)
            .on(eq(pet.property("owner", ValueType::String), constant("cond")))
            .filter(eq(p.property("name", ValueType::String), constant("filter")))
            .group_by(&city)
            .having(gt(&city, constant("having")))
            .order_by(OrderSpec::asc(p.property("age", ValueType::Int32)))
            .bind(param("n", ValueType::String), "v");
        query.joins[1].flags.push(QueryFlag {
            position: FlagPosition::AfterSelect,
            flag: template("/*+ {0} */", [constant("join-flag")], ValueType::Any),
        });
        query
    }

    fn components(query: &SubQuery) -> Vec<(&'static str, ExprRef)> {
        let mut out = Vec::new();
        out.extend(query.flags.iter().map(|f| ("flag", f.flag.clone())));
        out.extend(query.group_by.iter().map(|e| ("group_by", e.clone())));
        out.extend(query.having.iter().map(|e| ("having", e.clone())));
        for join in &query.joins {
            out.push(("join_target", join.target.clone()));
            out.extend(join.condition.iter().map(|e| ("join_condition", e.clone())));
            out.extend(join.flags.iter().map(|f| ("join_flag", f.flag.clone())));
        }
        out.extend(query.order_by.iter().map(|o| ("order_by", o.target.clone())));
        out.extend(query.params.iter().map(|(k, _)| ("param", k.clone())));
        out.extend(query.projection.iter().map(|e| ("projection", e.clone())));
        out.extend(query.filter.iter().map(|e| ("filter", e.clone())));
        out
    }

    /// Rewrites `query` and checks that only the `changed` component was rebuilt.
    fn rewrite_one_component(rw: &dyn Rewriter, query: &SubQuery, changed: &str) -> SubQuery {
        let out = rw
            .rewrite(&query.clone().into_expr(), &RewriteContext::new())
            .unwrap();
        let Expr::SubQuery(new) = out.as_ref() else {
            panic!("expected sub-query");
        };
        let (before, after) = (components(query), components(new));
        assert_eq!(before.len(), after.len());
        for ((label, old), (_, new)) in before.iter().zip(&after) {
            assert_eq!(Arc::ptr_eq(old, new), *label != changed, "component {}", label);
        }
        new.clone()
    }

    #[test]
    fn test_rewrites_query_flag_only() {
        let new = rewrite_one_component(&swap("flag", "x"), &marked_query(), "flag");
        assert_eq!(new.flags[0].flag.to_string(), "/*+ 'x' */");
        assert_eq!(new.flags[0].position, FlagPosition::AfterSelect);
    }

    #[test]
    fn test_rewrites_join_condition_only() {
        let query = marked_query();
        let new = rewrite_one_component(&swap("cond", "x"), &query, "join_condition");
        let join = &new.joins[1];
        assert_eq!(join.condition.as_ref().unwrap().to_string(), "pet.owner = 'x'");
        assert_eq!(join.kind, JoinKind::Inner);
        assert_eq!(join.flags.len(), 1);
    }

    #[test]
    fn test_rewrites_join_flag_only() {
        let new = rewrite_one_component(&swap("join-flag", "x"), &marked_query(), "join_flag");
        assert_eq!(new.joins[1].flags[0].flag.to_string(), "/*+ 'x' */");
        assert!(new.joins[1].condition.is_some());
    }

    #[test]
    fn test_rewrites_having_only() {
        let new = rewrite_one_component(&swap("having", "x"), &marked_query(), "having");
        assert_eq!(new.having.as_ref().unwrap().to_string(), "person.city > 'x'");
    }

    #[test]
    fn test_rewrites_param_key_only() {
        let rename = RenameParam { from: "n", to: "m" };
        let new = rewrite_one_component(&rename, &marked_query(), "param");
        assert_eq!(new.params.len(), 1);
        assert_eq!(new.params[0].0.to_string(), ":m");
        assert_eq!(new.params[0].1, Value::String("v".into()));
    }

    #[test]
    fn test_prefetched_type_follows_rewritten_projection() {
        #[derive(Debug)]
        struct Widen;
        impl Rewriter for Widen {
            fn rewrite_path(
                &self,
                expr: &ExprRef,
                _path: &Path,
                _ctx: &RewriteContext,
            ) -> RewriteResult<ExprRef> {
                match expr.ty() {
                    ValueType::Int32 => Ok(cast(expr, ValueType::Int64)),
                    _ => Ok(expr.clone()),
                }
            }
        }

        let p = person();
        let node = SubQuery::new()
            .select(p.property("age", ValueType::Int32))
            .from(&p)
            .prefetched([30i64]);
        let out = Widen.rewrite(&node, &RewriteContext::new()).unwrap();
        let Expr::Prefetched { query, values, ty } = out.as_ref() else {
            panic!("expected pre-fetched node");
        };
        assert_eq!(ty, &ValueType::Int64);
        assert_eq!(query.ty, ValueType::Int64);
        assert_eq!(values, &vec![Value::Int(30)]);
    }
}
