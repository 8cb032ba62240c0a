use crate::ast::{Operator, SubQuery, Value, ValueType};
use crate::error::{RewriteError, RewriteResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handle to an immutable expression node.
///
/// Rewriters hand back the very same `Arc` when nothing changed, so callers can
/// use [`Arc::ptr_eq`] as a cheap "was anything rewritten" check.
pub type ExprRef = Arc<Expr>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value, opaque to rewriting
    Constant { value: Value, ty: ValueType },
    /// Named placeholder, opaque to rewriting
    Param { name: String, ty: ValueType },
    Path(Path),
    /// Operator applied to an ordered argument list
    Operation {
        op: Operator,
        args: Vec<ExprRef>,
        ty: ValueType,
    },
    /// Build a record or tuple from the given sub-expressions
    Projection { args: Vec<ExprRef>, target: ValueType },
    /// Raw template with `{0}`, `{1}`... placeholders for its arguments
    Template {
        template: String,
        args: Vec<ExprRef>,
        ty: ValueType,
    },
    SubQuery(SubQuery),
    /// A sub-query that has already been resolved to concrete values
    Prefetched {
        query: Arc<SubQuery>,
        values: Vec<Value>,
        ty: ValueType,
    },
}

impl Expr {
    /// Declared type of the node.
    pub fn ty(&self) -> &ValueType {
        match self {
            Expr::Constant { ty, .. } => ty,
            Expr::Param { ty, .. } => ty,
            Expr::Path(path) => &path.ty,
            Expr::Operation { ty, .. } => ty,
            Expr::Projection { target, .. } => target,
            Expr::Template { ty, .. } => ty,
            Expr::SubQuery(query) => &query.ty,
            Expr::Prefetched { ty, .. } => ty,
        }
    }

    pub fn is_path(&self) -> bool {
        matches!(self, Expr::Path(_))
    }

    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Expr::Path(path) => Some(path),
            _ => None,
        }
    }

    /// Whether the node can be used as a filter condition.
    pub fn is_predicate(&self) -> bool {
        self.ty().is_predicate()
    }
}

/// How a derived path reaches its value from the parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathKind {
    Variable,
    Property,
    /// Typed view of the parent (same value, narrower type)
    Delegate,
    CollectionAny,
    ListValue,
    ArrayValue,
    MapValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathStep {
    /// Query root / alias, e.g. `person`
    Root { name: String },
    /// Named step, e.g. `person.name`
    Property {
        parent: PathRef,
        kind: PathKind,
        name: String,
    },
    /// Indexed step, e.g. `person.tags[0]` or `person.attrs['k']`
    Element {
        parent: PathRef,
        kind: PathKind,
        element: ExprRef,
    },
}

/// A field reference, possibly nested under a parent path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub step: PathStep,
    pub ty: ValueType,
}

impl Path {
    pub fn parent(&self) -> Option<&PathRef> {
        match &self.step {
            PathStep::Root { .. } => None,
            PathStep::Property { parent, .. } | PathStep::Element { parent, .. } => Some(parent),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.step, PathStep::Root { .. })
    }

    pub fn kind(&self) -> PathKind {
        match &self.step {
            PathStep::Root { .. } => PathKind::Variable,
            PathStep::Property { kind, .. } | PathStep::Element { kind, .. } => *kind,
        }
    }

    /// Root alias or property name; `None` for indexed steps.
    pub fn name(&self) -> Option<&str> {
        match &self.step {
            PathStep::Root { name } | PathStep::Property { name, .. } => Some(name),
            PathStep::Element { .. } => None,
        }
    }

    /// Number of steps between this path and its root.
    pub fn depth(&self) -> usize {
        match self.parent() {
            Some(parent) => parent.path().depth() + 1,
            None => 0,
        }
    }
}

/// An [`ExprRef`] known to hold an [`Expr::Path`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ExprRef", into = "ExprRef")]
pub struct PathRef(ExprRef);

impl PathRef {
    pub fn path(&self) -> &Path {
        match self.0.as_ref() {
            Expr::Path(path) => path,
            _ => unreachable!("PathRef always wraps a path"),
        }
    }

    pub fn expr(&self) -> &ExprRef {
        &self.0
    }

    pub fn into_expr(self) -> ExprRef {
        self.0
    }

    pub fn ty(&self) -> &ValueType {
        &self.path().ty
    }

    pub fn ptr_eq(&self, other: &PathRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// The ultimate root of this path.
    pub fn root(&self) -> PathRef {
        let mut current = self;
        while let Some(parent) = current.path().parent() {
            current = parent;
        }
        current.clone()
    }

    /// Derive `self.name` with the given type.
    pub fn property(&self, name: impl Into<String>, ty: ValueType) -> PathRef {
        self.derive(PathKind::Property, name, ty)
    }

    /// Derive a named step of any kind.
    pub fn derive(&self, kind: PathKind, name: impl Into<String>, ty: ValueType) -> PathRef {
        PathRef(Arc::new(Expr::Path(Path {
            step: PathStep::Property {
                parent: self.clone(),
                kind,
                name: name.into(),
            },
            ty,
        })))
    }

    /// Derive an indexed step (`self[element]`).
    pub fn element(&self, kind: PathKind, element: ExprRef, ty: ValueType) -> PathRef {
        PathRef(Arc::new(Expr::Path(Path {
            step: PathStep::Element {
                parent: self.clone(),
                kind,
                element,
            },
            ty,
        })))
    }
}

impl TryFrom<ExprRef> for PathRef {
    type Error = RewriteError;

    fn try_from(expr: ExprRef) -> RewriteResult<Self> {
        if expr.is_path() {
            Ok(PathRef(expr))
        } else {
            Err(RewriteError::NotAPath(expr.to_string()))
        }
    }
}

impl From<PathRef> for ExprRef {
    fn from(path: PathRef) -> Self {
        path.0
    }
}

impl std::fmt::Display for PathRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn write_args(f: &mut std::fmt::Formatter<'_>, args: &[ExprRef]) -> std::fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Constant { value, .. } => write!(f, "{}", value),
            Expr::Param { name, .. } => write!(f, ":{}", name),
            Expr::Path(path) => match &path.step {
                PathStep::Root { name } => write!(f, "{}", name),
                PathStep::Property { parent, name, .. } => write!(f, "{}.{}", parent, name),
                PathStep::Element {
                    parent, element, ..
                } => write!(f, "{}[{}]", parent, element),
            },
            Expr::Operation { op, args, ty } => match (op, args.as_slice()) {
                (op, [left, right]) if op.is_infix() => write!(f, "{} {} {}", left, op, right),
                (Operator::IsNull | Operator::IsNotNull, [arg]) => write!(f, "{} {}", arg, op),
                (Operator::Between | Operator::NotBetween, [arg, low, high]) => {
                    write!(f, "{} {} {} AND {}", arg, op, low, high)
                }
                (Operator::Cast, [arg]) => write!(f, "CAST({} AS {})", arg, ty),
                (Operator::List, args) => {
                    write!(f, "(")?;
                    write_args(f, args)?;
                    write!(f, ")")
                }
                (op, args) => {
                    write!(f, "{}(", op)?;
                    write_args(f, args)?;
                    write!(f, ")")
                }
            },
            Expr::Projection { args, target } => {
                write!(f, "{}(", target)?;
                write_args(f, args)?;
                write!(f, ")")
            }
            Expr::Template { template, args, .. } => {
                let mut rendered = template.clone();
                for (i, arg) in args.iter().enumerate() {
                    rendered = rendered.replace(&format!("{{{}}}", i), &arg.to_string());
                }
                write!(f, "{}", rendered)
            }
            Expr::SubQuery(query) => write!(f, "({})", query),
            Expr::Prefetched { values, .. } => write!(f, "(PREFETCHED {} ROWS)", values.len()),
        }
    }
}
