use serde::{Deserialize, Serialize};

/// Declared type of an expression node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Accepts and is accepted by every other type
    Any,
    Boolean,
    /// Marker for boolean expressions usable as filter conditions
    Predicate,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    String,
    Uuid,
    Timestamp,
    Bytes,
    /// A named entity/bean type (e.g. `Person`)
    Record(String),
    Tuple,
    List(Box<ValueType>),
}

impl ValueType {
    pub fn record(name: impl Into<String>) -> Self {
        ValueType::Record(name.into())
    }

    pub fn list_of(element: ValueType) -> Self {
        ValueType::List(Box::new(element))
    }

    /// Whether a value of type `other` can be used where `self` is required.
    pub fn is_assignable_from(&self, other: &ValueType) -> bool {
        match (self, other) {
            (ValueType::Any, _) | (_, ValueType::Any) => true,
            (ValueType::Boolean, ValueType::Predicate) => true,
            (ValueType::Predicate, ValueType::Boolean) => true,
            (ValueType::List(a), ValueType::List(b)) => a.is_assignable_from(b),
            (a, b) => a == b,
        }
    }

    /// Assignable in both directions.
    pub fn is_compatible_with(&self, other: &ValueType) -> bool {
        self.is_assignable_from(other) && other.is_assignable_from(self)
    }

    pub fn is_predicate(&self) -> bool {
        matches!(self, ValueType::Boolean | ValueType::Predicate)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ValueType::Int8
                | ValueType::Int16
                | ValueType::Int32
                | ValueType::Int64
                | ValueType::Float32
                | ValueType::Float64
                | ValueType::Decimal
        )
    }

    /// Types an ordering clause may sort by.
    pub fn is_comparable(&self) -> bool {
        !matches!(
            self,
            ValueType::Record(_) | ValueType::Tuple | ValueType::List(_) | ValueType::Bytes
        )
    }

    /// Element type of a list, `None` for scalars.
    pub fn element(&self) -> Option<&ValueType> {
        match self {
            ValueType::List(inner) => Some(inner),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueType::Record(name) => write!(f, "{}", name),
            ValueType::List(inner) => write!(f, "List<{}>", inner),
            other => write!(f, "{:?}", other),
        }
    }
}
