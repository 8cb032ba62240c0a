//! Sub-query model and its fluent builder methods.

use crate::ast::builders::IntoExpr;
use crate::ast::{
    Expr, ExprRef, FlagPosition, JoinKind, NullHandling, Operator, SortOrder, Value, ValueType,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A raw flag (hint, modifier) attached to a query or join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFlag {
    pub position: FlagPosition,
    pub flag: ExprRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub kind: JoinKind,
    pub target: ExprRef,
    pub condition: Option<ExprRef>,
    #[serde(default)]
    pub flags: Vec<QueryFlag>,
}

/// A single ORDER BY entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub order: SortOrder,
    pub nulls: NullHandling,
    pub target: ExprRef,
}

impl OrderSpec {
    pub fn asc(target: impl IntoExpr) -> Self {
        Self {
            order: SortOrder::Asc,
            nulls: NullHandling::Default,
            target: target.into_expr(),
        }
    }

    pub fn desc(target: impl IntoExpr) -> Self {
        Self {
            order: SortOrder::Desc,
            nulls: NullHandling::Default,
            target: target.into_expr(),
        }
    }

    pub fn nulls(mut self, nulls: NullHandling) -> Self {
        self.nulls = nulls;
        self
    }

    /// Same direction and null handling, different target.
    pub fn with_target(&self, target: ExprRef) -> Self {
        Self {
            order: self.order,
            nulls: self.nulls,
            target,
        }
    }
}

impl std::fmt::Display for OrderSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.order {
            SortOrder::Asc => write!(f, "{} ASC", self.target)?,
            SortOrder::Desc => write!(f, "{} DESC", self.target)?,
        }
        match self.nulls {
            NullHandling::Default => Ok(()),
            NullHandling::NullsFirst => write!(f, " NULLS FIRST"),
            NullHandling::NullsLast => write!(f, " NULLS LAST"),
        }
    }
}

/// A nested, fully described query usable as a value, filter operand or
/// membership source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubQuery {
    #[serde(default)]
    pub distinct: bool,
    /// Expected to yield at most one row
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub flags: Vec<QueryFlag>,
    #[serde(default)]
    pub group_by: Vec<ExprRef>,
    #[serde(default)]
    pub having: Option<ExprRef>,
    #[serde(default)]
    pub joins: Vec<Join>,
    #[serde(default)]
    pub order_by: Vec<OrderSpec>,
    /// Parameter bindings, in binding order
    #[serde(default)]
    pub params: Vec<(ExprRef, Value)>,
    #[serde(default)]
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub projection: Option<ExprRef>,
    #[serde(default)]
    pub filter: Option<ExprRef>,
    /// Declared type, derived from the projection
    pub ty: ValueType,
}

impl Default for SubQuery {
    fn default() -> Self {
        Self {
            distinct: false,
            unique: false,
            flags: vec![],
            group_by: vec![],
            having: None,
            joins: vec![],
            order_by: vec![],
            params: vec![],
            limit: None,
            offset: None,
            projection: None,
            filter: None,
            ty: ValueType::Any,
        }
    }
}

impl SubQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Type of a query with the given projection, `fallback` when there is none.
    pub fn derive_type(projection: Option<&ExprRef>, fallback: &ValueType) -> ValueType {
        projection
            .map(|p| p.ty().clone())
            .unwrap_or_else(|| fallback.clone())
    }

    /// `SELECT expr`
    pub fn select(mut self, projection: impl IntoExpr) -> Self {
        let projection = projection.into_expr();
        self.ty = projection.ty().clone();
        self.projection = Some(projection);
        self
    }

    /// `FROM target`
    pub fn from(self, target: impl IntoExpr) -> Self {
        self.join(JoinKind::Default, target)
    }

    pub fn join(mut self, kind: JoinKind, target: impl IntoExpr) -> Self {
        self.joins.push(Join {
            kind,
            target: target.into_expr(),
            condition: None,
            flags: vec![],
        });
        self
    }

    /// Attach an ON condition to the most recent join.
    pub fn on(mut self, condition: impl IntoExpr) -> Self {
        if let Some(join) = self.joins.last_mut() {
            join.condition = Some(condition.into_expr());
        }
        self
    }

    /// Add a filter; consecutive filters are AND-ed together.
    pub fn filter(mut self, condition: impl IntoExpr) -> Self {
        let condition = condition.into_expr();
        self.filter = Some(match self.filter.take() {
            Some(existing) => Arc::new(Expr::Operation {
                op: Operator::And,
                args: vec![existing, condition],
                ty: ValueType::Predicate,
            }),
            None => condition,
        });
        self
    }

    pub fn group_by(mut self, expr: impl IntoExpr) -> Self {
        self.group_by.push(expr.into_expr());
        self
    }

    pub fn having(mut self, condition: impl IntoExpr) -> Self {
        self.having = Some(condition.into_expr());
        self
    }

    pub fn order_by(mut self, spec: OrderSpec) -> Self {
        self.order_by.push(spec);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn flag(mut self, position: FlagPosition, flag: impl IntoExpr) -> Self {
        self.flags.push(QueryFlag {
            position,
            flag: flag.into_expr(),
        });
        self
    }

    pub fn bind(mut self, param: impl IntoExpr, value: impl Into<Value>) -> Self {
        self.params.push((param.into_expr(), value.into()));
        self
    }

    pub fn into_expr(self) -> ExprRef {
        Arc::new(Expr::SubQuery(self))
    }

    /// Wrap as a pre-fetched node carrying already resolved values.
    pub fn prefetched<I, V>(self, values: I) -> ExprRef
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let ty = self.ty.clone();
        Arc::new(Expr::Prefetched {
            query: Arc::new(self),
            values: values.into_iter().map(Into::into).collect(),
            ty,
        })
    }
}

impl std::fmt::Display for SubQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SELECT ")?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        match &self.projection {
            Some(p) => write!(f, "{}", p)?,
            None => write!(f, "*")?,
        }
        for (i, join) in self.joins.iter().enumerate() {
            if i == 0 {
                write!(f, " FROM {}", join.target)?;
            } else {
                write!(f, " {:?} JOIN {}", join.kind, join.target)?;
            }
            if let Some(cond) = &join.condition {
                write!(f, " ON {}", cond)?;
            }
        }
        if let Some(filter) = &self.filter {
            write!(f, " WHERE {}", filter)?;
        }
        if !self.group_by.is_empty() {
            let cols: Vec<String> = self.group_by.iter().map(|g| g.to_string()).collect();
            write!(f, " GROUP BY {}", cols.join(", "))?;
        }
        if let Some(having) = &self.having {
            write!(f, " HAVING {}", having)?;
        }
        if !self.order_by.is_empty() {
            let specs: Vec<String> = self.order_by.iter().map(|o| o.to_string()).collect();
            write!(f, " ORDER BY {}", specs.join(", "))?;
        }
        if let Some(n) = self.limit {
            write!(f, " LIMIT {}", n)?;
        }
        if let Some(n) = self.offset {
            write!(f, " OFFSET {}", n)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::*;

    #[test]
    fn test_subquery_display() {
        let person = root("person", ValueType::record("Person"));
        let query = SubQuery::new()
            .select(person.property("id", ValueType::Int64))
            .from(&person)
            .filter(eq(person.property("name", ValueType::String), constant("x")))
            .order_by(OrderSpec::desc(person.property("age", ValueType::Int32)))
            .limit(5);

        assert_eq!(query.ty, ValueType::Int64);
        assert_eq!(
            query.to_string(),
            "SELECT person.id FROM person WHERE person.name = 'x' ORDER BY person.age DESC LIMIT 5"
        );
    }

    #[test]
    fn test_filters_are_anded() {
        let person = root("person", ValueType::record("Person"));
        let query = SubQuery::new()
            .filter(is_not_null(person.property("name", ValueType::String)))
            .filter(is_null(person.property("age", ValueType::Int32)));
        assert_eq!(
            query.filter.map(|f| f.to_string()),
            Some("person.name IS NOT NULL AND person.age IS NULL".to_string())
        );
    }
}
