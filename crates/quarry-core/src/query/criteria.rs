use crate::{query::Query, value::Value};
use serde::{Deserialize, Serialize};
use std::{cell::OnceCell, fmt, rc::Rc};

///
/// CriteriaOperator
///
/// Closed operator set for atomic conditions. The numeric tags are part
/// of the wire-facing contract and must stay stable.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CriteriaOperator {
    Equal = 0x01,
    NotEqual = 0x02,
    LessThan = 0x03,
    LessThanOrEqual = 0x04,
    GreaterThan = 0x05,
    GreaterThanOrEqual = 0x06,
    In = 0x07,
    NotIn = 0x08,
    Like = 0x09,
    NotLike = 0x0a,
    BeginLike = 0x0b,
    NotBeginLike = 0x0c,
    EndLike = 0x0d,
    NotEndLike = 0x0e,
    IsNull = 0x0f,
    NotNull = 0x10,
}

impl CriteriaOperator {
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Operators that participate in the equality lookup index.
    #[must_use]
    pub const fn is_equality(self) -> bool {
        matches!(self, Self::Equal | Self::In)
    }
}

///
/// ValueThunk
///
/// Deferred computed value, evaluated at most once per criteria instance
/// and memoized. Construction carries no evaluation cost; there is no
/// thread-safety guarantee. Cloning shares the closure and carries the
/// memo state as-is: an already-forced value stays forced.
///

#[derive(Clone)]
pub struct ValueThunk {
    compute: Rc<dyn Fn() -> Value>,
    memo: OnceCell<Value>,
}

impl ValueThunk {
    pub fn new(compute: impl Fn() -> Value + 'static) -> Self {
        Self {
            compute: Rc::new(compute),
            memo: OnceCell::new(),
        }
    }

    /// Force the thunk, memoizing the result.
    pub fn force(&self) -> &Value {
        self.memo.get_or_init(|| (self.compute)())
    }

    /// The memoized value, if the thunk has already been forced.
    #[must_use]
    pub fn forced(&self) -> Option<&Value> {
        self.memo.get()
    }
}

impl fmt::Debug for ValueThunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.memo.get() {
            Some(value) => write!(f, "ValueThunk(forced {value:?})"),
            None => write!(f, "ValueThunk(deferred)"),
        }
    }
}

///
/// CriteriaValue
///
/// Criteria value discriminated at construction: a literal, a deferred
/// thunk, or a nested query for subquery correlation.
///

#[derive(Clone, Debug)]
pub enum CriteriaValue {
    Literal(Value),
    Thunk(ValueThunk),
    Query(Box<Query>),
}

impl From<Value> for CriteriaValue {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

macro_rules! literal_value {
    ($($ty:ty),* $(,)?) => {$(
        impl From<$ty> for CriteriaValue {
            fn from(value: $ty) -> Self {
                Self::Literal(value.into())
            }
        }
    )*};
}

literal_value!(bool, i32, i64, u32, u64, f64, &str, String);

impl From<ValueThunk> for CriteriaValue {
    fn from(thunk: ValueThunk) -> Self {
        Self::Thunk(thunk)
    }
}

impl From<Query> for CriteriaValue {
    fn from(query: Query) -> Self {
        Self::Query(Box::new(query))
    }
}

///
/// ResolvedValue
///
/// Result of resolving a criteria value. Nested queries resolve to the
/// query reference itself; the compiler and executor decide how to use it.
///

#[derive(Debug)]
pub enum ResolvedValue<'a> {
    Value(&'a Value),
    Query(&'a Query),
}

///
/// Criteria
///
/// Atomic leaf condition: field name, operator, value. Field names are
/// canonical strings; validity against a record model is the executor's
/// concern, not this layer's.
///

#[derive(Clone, Debug)]
pub struct Criteria {
    field: String,
    operator: CriteriaOperator,
    value: CriteriaValue,
}

impl Criteria {
    /// Build a criteria, applying the null operator rewrite.
    ///
    /// An `Equal`/`In` criteria whose resolved value is null becomes
    /// `IsNull`; `NotEqual` with null becomes `NotNull`. The check
    /// resolves the value, which forces (and memoizes) a thunk.
    pub fn new(
        field: impl Into<String>,
        operator: CriteriaOperator,
        value: impl Into<CriteriaValue>,
    ) -> Self {
        let mut criteria = Self {
            field: field.into(),
            operator,
            value: value.into(),
        };
        criteria.rewrite_null_operator();
        criteria
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub const fn operator(&self) -> CriteriaOperator {
        self.operator
    }

    #[must_use]
    pub const fn value(&self) -> &CriteriaValue {
        &self.value
    }

    /// Resolve the criteria value. Literal values return as-is; thunks
    /// are forced once and memoized; nested queries return the query.
    #[must_use]
    pub fn resolve(&self) -> ResolvedValue<'_> {
        match &self.value {
            CriteriaValue::Literal(value) => ResolvedValue::Value(value),
            CriteriaValue::Thunk(thunk) => ResolvedValue::Value(thunk.force()),
            CriteriaValue::Query(query) => ResolvedValue::Query(query),
        }
    }

    /// The nested query carried as this criteria's value, if any.
    #[must_use]
    pub fn subquery(&self) -> Option<&Query> {
        match &self.value {
            CriteriaValue::Query(query) => Some(query),
            _ => None,
        }
    }

    pub(crate) fn subquery_mut(&mut self) -> Option<&mut Query> {
        match &mut self.value {
            CriteriaValue::Query(query) => Some(query),
            _ => None,
        }
    }

    fn rewrite_null_operator(&mut self) {
        let rewritten = match self.operator {
            CriteriaOperator::Equal | CriteriaOperator::In => CriteriaOperator::IsNull,
            CriteriaOperator::NotEqual => CriteriaOperator::NotNull,
            _ => return,
        };

        let resolved_null = match self.resolve() {
            ResolvedValue::Value(value) => value.is_null(),
            ResolvedValue::Query(_) => false,
        };

        if resolved_null {
            self.operator = rewritten;
        }
    }
}
