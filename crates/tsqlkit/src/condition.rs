//! Dialect-neutral condition and expression tree.
//!
//! Conditions are plain data; the builders in [`crate::qb`] turn them into
//! T-SQL text plus [`Params`](crate::qb::Params) without taking ownership.
//!
//! # Example
//! ```
//! use tsqlkit::condition::Condition;
//!
//! let cond = Condition::and(vec![
//!     Condition::eq("status", "active"),
//!     Condition::in_list("id", vec![1, 2, 3]),
//! ]);
//! assert!(!cond.is_empty());
//! ```

use crate::qb::SelectQb;
use crate::value::Value;
use std::collections::HashMap;

/// Comparison operators for [`Condition::Compare`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }
}

/// One side of a comparison or a function argument.
#[derive(Clone, Debug)]
pub enum Operand {
    /// A column reference, quoted on output.
    Column(String),
    /// A value bound as a parameter.
    Value(Value),
    /// A raw SQL expression, emitted verbatim.
    Expr(String),
    /// A multi-operand function.
    Function(Box<Function>),
    /// A scalar subquery, emitted in parentheses.
    Subquery(Box<SelectQb>),
}

impl Operand {
    pub fn column(name: impl Into<String>) -> Self {
        Operand::Column(name.into())
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Operand::Value(value.into())
    }

    pub fn expr(sql: impl Into<String>) -> Self {
        Operand::Expr(sql.into())
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<Function> for Operand {
    fn from(f: Function) -> Self {
        Operand::Function(Box::new(f))
    }
}

impl From<SelectQb> for Operand {
    fn from(q: SelectQb) -> Self {
        Operand::Subquery(Box::new(q))
    }
}

/// Functions that take any number of operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Greatest,
    Least,
    /// The operand with the longest string value.
    Longest,
    /// The operand with the shortest string value.
    Shortest,
    /// Union of several JSON arrays, as a JSON array string.
    ArrayMerge,
}

/// A multi-operand function call.
#[derive(Clone, Debug)]
pub struct Function {
    pub kind: FunctionKind,
    pub operands: Vec<Operand>,
}

impl Function {
    pub fn new(kind: FunctionKind, operands: Vec<Operand>) -> Self {
        Self { kind, operands }
    }

    pub fn greatest(operands: Vec<Operand>) -> Self {
        Self::new(FunctionKind::Greatest, operands)
    }

    pub fn least(operands: Vec<Operand>) -> Self {
        Self::new(FunctionKind::Least, operands)
    }

    pub fn longest(operands: Vec<Operand>) -> Self {
        Self::new(FunctionKind::Longest, operands)
    }

    pub fn shortest(operands: Vec<Operand>) -> Self {
        Self::new(FunctionKind::Shortest, operands)
    }

    pub fn array_merge(operands: Vec<Operand>) -> Self {
        Self::new(FunctionKind::ArrayMerge, operands)
    }
}

/// A candidate row of a composite IN, keyed by column name.
pub type InRow = HashMap<String, Value>;

/// Right-hand side of an IN condition.
#[derive(Clone, Debug)]
pub enum InValues {
    /// Plain values for a single column.
    List(Vec<Value>),
    /// Row values for one or more columns.
    Rows(Vec<InRow>),
    /// A subquery. Only valid with a single column.
    Subquery(Box<SelectQb>),
}

/// How LIKE values are escaped and wrapped with wildcards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LikeMode {
    /// `%value%`
    #[default]
    Contains,
    /// `value%`
    StartsWith,
    /// `%value`
    EndsWith,
    /// Bound as given; wildcards in the value are kept.
    Custom,
}

/// A LIKE condition over one column and one or more patterns.
#[derive(Clone, Debug)]
pub struct Like {
    pub column: String,
    pub values: Vec<Operand>,
    pub negated: bool,
    /// Join several values with OR instead of AND.
    pub disjunctive: bool,
    pub case_sensitive: bool,
    pub mode: LikeMode,
}

impl Like {
    pub fn new(column: impl Into<String>, values: Vec<Operand>) -> Self {
        Self {
            column: column.into(),
            values,
            negated: false,
            disjunctive: false,
            case_sensitive: false,
            mode: LikeMode::Contains,
        }
    }

    pub fn negated(mut self) -> Self {
        self.negated = true;
        self
    }

    pub fn any(mut self) -> Self {
        self.disjunctive = true;
        self
    }

    pub fn case_sensitive(mut self, yes: bool) -> Self {
        self.case_sensitive = yes;
        self
    }

    pub fn mode(mut self, mode: LikeMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Condition node for WHERE/HAVING/ON clauses.
#[derive(Clone, Debug)]
pub enum Condition {
    /// `column op value`
    Compare {
        column: String,
        op: CompareOp,
        value: Operand,
    },
    /// `column [NOT] IN (...)`, single or composite columns.
    In {
        columns: Vec<String>,
        values: InValues,
        negated: bool,
    },
    Like(Like),
    /// `column [NOT] BETWEEN low AND high`
    Between {
        column: String,
        low: Operand,
        high: Operand,
        negated: bool,
    },
    /// `[NOT] EXISTS (subquery)`
    Exists {
        query: Box<SelectQb>,
        negated: bool,
    },
    /// AND group: all conditions must be true.
    And(Vec<Condition>),
    /// OR group: at least one condition must be true.
    Or(Vec<Condition>),
    /// NOT: negate the inner condition.
    Not(Box<Condition>),
    /// Raw SQL with caller-named parameters.
    Raw {
        sql: String,
        params: Vec<(String, Value)>,
    },
    /// A function used as a boolean operand, e.g. a JSON predicate.
    Function(Function),
}

impl Condition {
    fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Condition::Compare {
            column: column.into(),
            op,
            value: Operand::Value(value.into()),
        }
    }

    /// `column = value`; a NULL value renders `IS NULL`.
    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Eq, value)
    }

    /// `column <> value`; a NULL value renders `IS NOT NULL`.
    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Ne, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Gt, value)
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Gte, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Lt, value)
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(column, CompareOp::Lte, value)
    }

    /// Compare a column against any operand.
    pub fn compare_to(column: impl Into<String>, op: CompareOp, value: impl Into<Operand>) -> Self {
        Condition::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Self::eq(column, Value::Null)
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self::ne(column, Value::Null)
    }

    pub fn in_list<T: Into<Value>>(column: impl Into<String>, values: Vec<T>) -> Self {
        Condition::In {
            columns: vec![column.into()],
            values: InValues::List(values.into_iter().map(Into::into).collect()),
            negated: false,
        }
    }

    pub fn not_in<T: Into<Value>>(column: impl Into<String>, values: Vec<T>) -> Self {
        Condition::In {
            columns: vec![column.into()],
            values: InValues::List(values.into_iter().map(Into::into).collect()),
            negated: true,
        }
    }

    /// Composite IN over several columns.
    pub fn in_rows<S: Into<String>>(columns: Vec<S>, rows: Vec<InRow>) -> Self {
        Condition::In {
            columns: columns.into_iter().map(Into::into).collect(),
            values: InValues::Rows(rows),
            negated: false,
        }
    }

    pub fn not_in_rows<S: Into<String>>(columns: Vec<S>, rows: Vec<InRow>) -> Self {
        Condition::In {
            columns: columns.into_iter().map(Into::into).collect(),
            values: InValues::Rows(rows),
            negated: true,
        }
    }

    pub fn in_subquery<S: Into<String>>(columns: Vec<S>, query: SelectQb) -> Self {
        Condition::In {
            columns: columns.into_iter().map(Into::into).collect(),
            values: InValues::Subquery(Box::new(query)),
            negated: false,
        }
    }

    pub fn not_in_subquery<S: Into<String>>(columns: Vec<S>, query: SelectQb) -> Self {
        Condition::In {
            columns: columns.into_iter().map(Into::into).collect(),
            values: InValues::Subquery(Box::new(query)),
            negated: true,
        }
    }

    /// `column LIKE '%value%'` with wildcard characters escaped.
    pub fn like(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Like(Like::new(column, vec![Operand::Value(value.into())]))
    }

    pub fn not_like(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::Like(Like::new(column, vec![Operand::Value(value.into())]).negated())
    }

    pub fn between(
        column: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Condition::Between {
            column: column.into(),
            low: Operand::Value(low.into()),
            high: Operand::Value(high.into()),
            negated: false,
        }
    }

    pub fn not_between(
        column: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        Condition::Between {
            column: column.into(),
            low: Operand::Value(low.into()),
            high: Operand::Value(high.into()),
            negated: true,
        }
    }

    pub fn exists(query: SelectQb) -> Self {
        Condition::Exists {
            query: Box::new(query),
            negated: false,
        }
    }

    pub fn not_exists(query: SelectQb) -> Self {
        Condition::Exists {
            query: Box::new(query),
            negated: true,
        }
    }

    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::And(conditions)
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Or(conditions)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// Raw SQL without parameters.
    pub fn raw(sql: impl Into<String>) -> Self {
        Condition::Raw {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Raw SQL referencing caller-named parameters, e.g. `[a] > :min`.
    pub fn raw_with<N: Into<String>, V: Into<Value>>(
        sql: impl Into<String>,
        params: Vec<(N, V)>,
    ) -> Self {
        Condition::Raw {
            sql: sql.into(),
            params: params
                .into_iter()
                .map(|(n, v)| (n.into(), v.into()))
                .collect(),
        }
    }

    /// Whether this condition is known to render as an empty fragment.
    pub fn is_empty(&self) -> bool {
        match self {
            Condition::And(c) | Condition::Or(c) => c.iter().all(Condition::is_empty),
            Condition::Not(inner) => inner.is_empty(),
            Condition::Raw { sql, .. } => sql.trim().is_empty(),
            _ => false,
        }
    }
}

/// Build an [`InRow`] from `(column, value)` pairs.
pub fn in_row<K: Into<String>, V: Into<Value>>(pairs: Vec<(K, V)>) -> InRow {
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
