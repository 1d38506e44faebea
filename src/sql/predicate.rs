//! Predicate sanitization.
//!
//! Every filter a caller adds goes through [`sanitize_predicate`] before it
//! can reach SQL text. The column must exist in the table's schema, the
//! operator must be one of a fixed set and fit the shape of the value, and
//! the value is coerced to the column's parameter format.
//!
//! Filters that cannot be made safe are not errors. They come back as
//! [`Dropped`], are logged at `warn`, and contribute no clause.

use std::fmt;
use std::sync::Arc;

use super::token::{Token, TokenStream};
use crate::observability::{log_debug, log_warn};
use crate::schema::TableInfo;
use crate::value::{Format, SqlValue, Value};

// ============================================================================
// Operators
// ============================================================================

/// Comparison operators accepted in predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
    In,
    NotIn,
    Between,
    NotBetween,
}

impl Operator {
    /// Parse an operator, ignoring case and extra whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        let op = match normalized.as_str() {
            "=" => Operator::Eq,
            "!=" => Operator::Ne,
            ">" => Operator::Gt,
            ">=" => Operator::Gte,
            "<" => Operator::Lt,
            "<=" => Operator::Lte,
            "LIKE" => Operator::Like,
            "NOT LIKE" => Operator::NotLike,
            "IN" => Operator::In,
            "NOT IN" => Operator::NotIn,
            "BETWEEN" => Operator::Between,
            "NOT BETWEEN" => Operator::NotBetween,
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::NotBetween => "NOT BETWEEN",
        }
    }

    /// `!=` and the `NOT …` forms.
    pub fn is_negated(self) -> bool {
        matches!(
            self,
            Operator::Ne | Operator::NotLike | Operator::NotIn | Operator::NotBetween
        )
    }

    /// Operators whose operand is a list.
    pub fn takes_list(self) -> bool {
        matches!(
            self,
            Operator::In | Operator::NotIn | Operator::Between | Operator::NotBetween
        )
    }

    /// Whether this operator can be applied to `value`.
    ///
    /// A scalar fits every operator (list operators wrap it); a list fits
    /// list operators only.
    pub fn fits(self, value: &Value) -> bool {
        !value.is_list() || self.takes_list()
    }

    /// Default operator for a value: `IN` for lists, `=` otherwise.
    pub fn default_for(value: &Value) -> Self {
        if value.is_list() {
            Operator::In
        } else {
            Operator::Eq
        }
    }

    fn to_tokens(self) -> TokenStream {
        let mut ts = TokenStream::new();
        match self {
            Operator::Eq => ts.push(Token::Eq),
            Operator::Ne => ts.push(Token::Ne),
            Operator::Gt => ts.push(Token::Gt),
            Operator::Gte => ts.push(Token::Gte),
            Operator::Lt => ts.push(Token::Lt),
            Operator::Lte => ts.push(Token::Lte),
            Operator::Like => ts.push(Token::Like),
            Operator::NotLike => ts.push(Token::Not).space().push(Token::Like),
            Operator::In => ts.push(Token::In),
            Operator::NotIn => ts.push(Token::Not).space().push(Token::In),
            Operator::Between => ts.push(Token::Between),
            Operator::NotBetween => ts.push(Token::Not).space().push(Token::Between),
        };
        ts
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a predicate joins the one before it inside a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Relation {
    #[default]
    And,
    Or,
}

impl Relation {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "AND" => Some(Relation::And),
            "OR" => Some(Relation::Or),
            _ => None,
        }
    }

    fn token(self) -> Token {
        match self {
            Relation::And => Token::And,
            Relation::Or => Token::Or,
        }
    }
}

// ============================================================================
// Predicates
// ============================================================================

/// The sanitized right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Scalar(SqlValue),
    List(Vec<SqlValue>),
    Range(SqlValue, SqlValue),
    IsNull,
    IsNotNull,
}

/// A single sanitized filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub operator: Operator,
    pub operand: Operand,
    pub format: Format,
    pub relation: Relation,
}

impl Predicate {
    /// Render as `column OP operand`.
    pub fn to_tokens(&self) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Ident(self.column.clone())).space();

        match &self.operand {
            Operand::IsNull => {
                ts.push(Token::IsNull);
            }
            Operand::IsNotNull => {
                ts.push(Token::IsNotNull);
            }
            Operand::Scalar(v) => {
                ts.append(&self.operator.to_tokens())
                    .space()
                    .push(Token::Param(v.clone()));
            }
            Operand::Range(low, high) => {
                ts.append(&self.operator.to_tokens())
                    .space()
                    .push(Token::Param(low.clone()))
                    .space()
                    .push(Token::And)
                    .space()
                    .push(Token::Param(high.clone()));
            }
            Operand::List(items) => {
                // IN lists are inlined, not bound
                ts.append(&self.operator.to_tokens()).lparen();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        ts.comma();
                    }
                    ts.push(literal_token(item));
                }
                ts.rparen();
            }
        }

        ts
    }
}

fn literal_token(value: &SqlValue) -> Token {
    match value {
        SqlValue::Int(n) => Token::LitInt(*n),
        SqlValue::Float(f) => Token::LitFloat(*f),
        SqlValue::Text(s) => Token::LitString(s.clone()),
    }
}

/// Why a filter contributed no clause.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DropReason {
    #[error("column is not part of the table schema")]
    UnknownColumn,

    #[error("BETWEEN needs exactly two values, got {0}")]
    BetweenArity(usize),

    #[error("IN list is empty")]
    EmptyList,
}

/// A filter that was rejected during sanitization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("filter on '{column}' dropped: {reason}")]
pub struct Dropped {
    pub column: String,
    pub reason: DropReason,
}

/// Validate and coerce one filter against the table schema.
///
/// `operator` falls back to the default for the value's shape when it is
/// missing, unknown, or does not fit the value.
pub fn sanitize_predicate(
    info: &TableInfo,
    column: &str,
    value: &Value,
    operator: Option<&str>,
) -> Result<Predicate, Dropped> {
    let reject = |reason: DropReason| {
        log_warn!(
            component = "predicate",
            event = "predicate_dropped",
            table = %info.name(),
            column = %column,
            reason = %reason,
        );
        Dropped {
            column: column.to_string(),
            reason,
        }
    };

    let Some(descriptor) = info.column(column) else {
        return Err(reject(DropReason::UnknownColumn));
    };
    let format = descriptor.format();
    let operator = resolve_operator(column, value, operator);

    let predicate = |operand| Predicate {
        column: column.to_string(),
        operator,
        operand,
        format,
        relation: Relation::default(),
    };

    if let Some(keyword) = value.as_str().map(str::trim) {
        if keyword.eq_ignore_ascii_case("NULL") {
            return Ok(predicate(null_operand(operator)));
        }
        if keyword.eq_ignore_ascii_case("NOT NULL") {
            return Ok(predicate(Operand::IsNotNull));
        }
    }
    if value.is_null() && descriptor.nullable {
        return Ok(predicate(null_operand(operator)));
    }

    let operand = match operator {
        Operator::In | Operator::NotIn => {
            let items = list_items(value);
            if items.is_empty() {
                return Err(reject(DropReason::EmptyList));
            }
            Operand::List(items.iter().map(|v| format.coerce(v)).collect())
        }
        Operator::Between | Operator::NotBetween => match list_items(value).as_slice() {
            [low, high] => Operand::Range(format.coerce(low), format.coerce(high)),
            other => return Err(reject(DropReason::BetweenArity(other.len()))),
        },
        _ => Operand::Scalar(format.coerce(value)),
    };

    Ok(predicate(operand))
}

fn resolve_operator(column: &str, value: &Value, raw: Option<&str>) -> Operator {
    let default = Operator::default_for(value);
    let Some(raw) = raw else {
        return default;
    };
    match Operator::parse(raw) {
        Some(op) if op.fits(value) => op,
        _ => {
            log_debug!(
                component = "predicate",
                event = "operator_fallback",
                column = %column,
                requested = %raw,
                operator = %default,
            );
            default
        }
    }
}

fn null_operand(operator: Operator) -> Operand {
    if operator.is_negated() {
        Operand::IsNotNull
    } else {
        Operand::IsNull
    }
}

fn list_items(value: &Value) -> Vec<Value> {
    match value {
        Value::List(items) => items.clone(),
        scalar => vec![scalar.clone()],
    }
}

// ============================================================================
// Groups
// ============================================================================

/// A node in a WHERE tree.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateNode {
    Single(Predicate),
    Group {
        relation: Relation,
        items: Vec<PredicateNode>,
    },
}

/// A list of predicates joined by one relation.
///
/// This is the WHERE clause of every builder, and the value handed to the
/// closure of `filter_group`. Filters are sanitized as they are added.
#[derive(Debug, Clone)]
#[must_use]
pub struct PredicateGroup {
    info: Arc<TableInfo>,
    relation: Relation,
    items: Vec<PredicateNode>,
    dropped: Vec<Dropped>,
}

impl PredicateGroup {
    pub fn new(info: Arc<TableInfo>, relation: Relation) -> Self {
        Self {
            info,
            relation,
            items: Vec::new(),
            dropped: Vec::new(),
        }
    }

    /// Add `column = value` (or `column IN (…)` for a list).
    pub fn filter(self, column: &str, value: impl Into<Value>) -> Self {
        self.filter_with(column, value, None, None)
    }

    /// Add a filter with an explicit operator.
    pub fn filter_op(self, column: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.filter_with(column, value, Some(operator), None)
    }

    /// Add a filter with every knob exposed.
    ///
    /// `relation` joins the predicate to the previous item of this group and
    /// defaults to the group's own relation.
    pub fn filter_with(
        mut self,
        column: &str,
        value: impl Into<Value>,
        operator: Option<&str>,
        relation: Option<Relation>,
    ) -> Self {
        let value = value.into();
        match sanitize_predicate(&self.info, column, &value, operator) {
            Ok(mut predicate) => {
                predicate.relation = relation.unwrap_or(self.relation);
                self.items.push(PredicateNode::Single(predicate));
            }
            Err(dropped) => self.dropped.push(dropped),
        }
        self
    }

    /// Add a parenthesized sub-group joined internally by `relation`.
    pub fn filter_group<F>(mut self, relation: Relation, build: F) -> Self
    where
        F: FnOnce(PredicateGroup) -> PredicateGroup,
    {
        let group = build(PredicateGroup::new(Arc::clone(&self.info), relation));
        self.dropped.extend(group.dropped);
        self.items.push(PredicateNode::Group {
            relation: group.relation,
            items: group.items,
        });
        self
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn items(&self) -> &[PredicateNode] {
        &self.items
    }

    pub fn dropped(&self) -> &[Dropped] {
        &self.dropped
    }

    pub(crate) fn record_dropped(&mut self, dropped: Dropped) {
        self.dropped.push(dropped);
    }

    /// True if no clause would be rendered.
    pub fn is_empty(&self) -> bool {
        self.to_tokens(true).is_empty()
    }

    /// Render the group body without surrounding parentheses.
    ///
    /// Top-level items are always joined with AND; a predicate's own
    /// relation only applies inside nested groups.
    pub fn to_tokens(&self, top_level: bool) -> TokenStream {
        render_items(&self.items, self.relation, top_level)
    }
}

fn render_items(items: &[PredicateNode], relation: Relation, top_level: bool) -> TokenStream {
    let mut ts = TokenStream::new();

    for item in items {
        let (joiner, body) = match item {
            PredicateNode::Single(p) => (p.relation, p.to_tokens()),
            PredicateNode::Group {
                relation: inner,
                items,
            } => {
                let inner = render_items(items, *inner, false);
                // empty groups contribute nothing
                if inner.is_empty() {
                    continue;
                }
                let mut wrapped = TokenStream::new();
                wrapped.lparen().append(&inner).rparen();
                (relation, wrapped)
            }
        };

        if !ts.is_empty() {
            let joiner = if top_level { Relation::And } else { joiner };
            ts.space().push(joiner.token()).space();
        }
        ts.append(&body);
    }

    ts
}
