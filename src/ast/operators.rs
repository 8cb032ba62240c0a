use serde::{Deserialize, Serialize};

/// Operator of an [`Expr::Operation`](crate::ast::Expr::Operation) node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Like,
    NotLike,
    ILike,
    Between,
    NotBetween,
    Exists,
    NotExists,
    And,
    Or,
    Not,
    Add,
    Sub,
    Mul,
    Div,
    /// Modulo (%)
    Rem,
    Concat,
    Lower,
    Upper,
    Coalesce,
    /// Conversion of the single argument to the operation's declared type
    Cast,
    Count,
    Sum,
    Avg,
    Min,
    Max,
    /// Collection constructor: (a, b, c)
    List,
}

impl Operator {
    /// For simple operators, returns the symbol directly.
    /// For keyword operators (BETWEEN, EXISTS, functions), returns the keyword.
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::ILike => "ILIKE",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
            Operator::Exists => "EXISTS",
            Operator::NotExists => "NOT EXISTS",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Rem => "%",
            Operator::Concat => "||",
            Operator::Lower => "LOWER",
            Operator::Upper => "UPPER",
            Operator::Coalesce => "COALESCE",
            Operator::Cast => "CAST",
            Operator::Count => "COUNT",
            Operator::Sum => "SUM",
            Operator::Avg => "AVG",
            Operator::Min => "MIN",
            Operator::Max => "MAX",
            Operator::List => "LIST",
        }
    }

    /// Operators whose result is a filter condition.
    pub fn is_predicate(&self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::Ne
                | Operator::Gt
                | Operator::Gte
                | Operator::Lt
                | Operator::Lte
                | Operator::In
                | Operator::NotIn
                | Operator::IsNull
                | Operator::IsNotNull
                | Operator::Like
                | Operator::NotLike
                | Operator::ILike
                | Operator::Between
                | Operator::NotBetween
                | Operator::Exists
                | Operator::NotExists
                | Operator::And
                | Operator::Or
                | Operator::Not
        )
    }

    /// IN / NOT IN: the right operand is a collection.
    pub fn is_membership(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    pub fn is_infix(&self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::Ne
                | Operator::Gt
                | Operator::Gte
                | Operator::Lt
                | Operator::Lte
                | Operator::In
                | Operator::NotIn
                | Operator::Like
                | Operator::NotLike
                | Operator::ILike
                | Operator::And
                | Operator::Or
                | Operator::Add
                | Operator::Sub
                | Operator::Mul
                | Operator::Div
                | Operator::Rem
                | Operator::Concat
        )
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Where NULLs land in an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum NullHandling {
    #[default]
    Default,
    NullsFirst,
    NullsLast,
}

/// Join Type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    /// FROM source
    Default,
    Inner,
    Left,
    Right,
    Full,
    Cross,
    /// Fetch-join of an ORM-managed association
    InnerFetch,
    LeftFetch,
}

/// Position of a raw query flag inside the rendered statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlagPosition {
    Start,
    StartOverride,
    AfterSelect,
    AfterProjection,
    BeforeFilters,
    AfterFilters,
    BeforeGroupBy,
    AfterGroupBy,
    BeforeHaving,
    AfterHaving,
    BeforeOrder,
    AfterOrder,
    End,
}
