//! Filter expressions for list queries
//!
//! A [`Filter`] is built from comparisons on [`Field`] handles and composed with
//! [`Filter::and`] / [`Filter::or`]. Its wire form is the JSON object sent in the
//! `X-Filter` header:
//!
//! ```ignore
//! let group = Field::new("group");
//! let region = Field::new("region");
//! let filter = group.eq("prod")?.and(region.eq("us-east-1a")?)?;
//! // {"+and": [{"group": "prod"}, {"region": "us-east-1a"}]}
//! ```

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use thiserror::Error;

const AND: &str = "+and";
const OR: &str = "+or";
const ORDER_BY: &str = "+order_by";
const ORDER: &str = "+order";
const LIMIT: &str = "+limit";

/// Local validation failures while building a filter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("field '{0}' is not filterable")]
    NotFilterable(String),
    #[error("filter is already ordered by '{0}'")]
    OrderAlreadySet(String),
    #[error("filter already has a limit of {0}")]
    LimitAlreadySet(u64),
    #[error("limit must be a non-negative integer, got {0}")]
    InvalidLimit(i64),
}

/// Sort direction for `+order`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Ascending,
    Descending,
}

impl Order {
    pub fn as_str(self) -> &'static str {
        match self {
            Order::Ascending => "asc",
            Order::Descending => "desc",
        }
    }
}

/// Handle for one declared field, used to build comparisons
///
/// `eq`/`ne` build filters, so the handle itself is not `PartialEq`.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    filterable: bool,
}

impl Field {
    /// A filterable field
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filterable: true,
        }
    }

    /// A field the API does not accept in filters; every comparison fails
    pub fn non_filterable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filterable: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_filterable(&self) -> bool {
        self.filterable
    }

    fn check(&self) -> Result<(), FilterError> {
        if self.filterable {
            Ok(())
        } else {
            Err(FilterError::NotFilterable(self.name.clone()))
        }
    }

    fn compare(&self, op: Option<&str>, value: Value) -> Result<Filter, FilterError> {
        self.check()?;

        let value = match op {
            Some(op) => {
                let mut inner = Map::new();
                inner.insert(op.to_string(), value);
                Value::Object(inner)
            },
            None => value,
        };

        let mut map = Map::new();
        map.insert(self.name.clone(), value);
        Ok(Filter {
            clause: Some(Clause::Match(map)),
            ..Filter::default()
        })
    }

    /// `{field: value}`
    pub fn eq(&self, value: impl Into<Value>) -> Result<Filter, FilterError> {
        self.compare(None, value.into())
    }

    /// `{field: {"+neq": value}}`
    pub fn ne(&self, value: impl Into<Value>) -> Result<Filter, FilterError> {
        self.compare(Some("+neq"), value.into())
    }

    pub fn lt(&self, value: impl Into<Value>) -> Result<Filter, FilterError> {
        self.compare(Some("+lt"), value.into())
    }

    pub fn le(&self, value: impl Into<Value>) -> Result<Filter, FilterError> {
        self.compare(Some("+lte"), value.into())
    }

    pub fn gt(&self, value: impl Into<Value>) -> Result<Filter, FilterError> {
        self.compare(Some("+gt"), value.into())
    }

    pub fn ge(&self, value: impl Into<Value>) -> Result<Filter, FilterError> {
        self.compare(Some("+gte"), value.into())
    }

    /// Substring match, `{field: {"+contains": value}}`
    pub fn contains(&self, value: impl Into<Value>) -> Result<Filter, FilterError> {
        self.compare(Some("+contains"), value.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Match(Map<String, Value>),
    And(Vec<Clause>),
    Or(Vec<Clause>),
}

impl Clause {
    fn join(kind: Combinator, left: Clause, right: Clause) -> Clause {
        let mut items = Vec::new();
        for clause in [left, right] {
            match (kind, clause) {
                (Combinator::And, Clause::And(inner)) | (Combinator::Or, Clause::Or(inner)) => {
                    items.extend(inner)
                },
                (_, other) => items.push(other),
            }
        }

        match kind {
            Combinator::And => Clause::And(items),
            Combinator::Or => Clause::Or(items),
        }
    }

    fn to_map(&self) -> Map<String, Value> {
        match self {
            Clause::Match(map) => map.clone(),
            Clause::And(items) | Clause::Or(items) => {
                let key = if matches!(self, Clause::And(_)) { AND } else { OR };
                let list = items
                    .iter()
                    .map(|c| Value::Object(c.to_map()))
                    .collect();
                let mut map = Map::new();
                map.insert(key.to_string(), Value::Array(list));
                map
            },
        }
    }
}

/// Composable list-query filter with optional ordering and limit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clause: Option<Clause>,
    order: Option<(String, Order)>,
    limit: Option<u64>,
}

impl Filter {
    /// Empty filter (matches everything)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clause.is_none() && self.order.is_none() && self.limit.is_none()
    }

    /// Both expressions must hold
    pub fn and(self, other: Filter) -> Result<Filter, FilterError> {
        self.combine(other, Combinator::And)
    }

    /// Either expression may hold
    pub fn or(self, other: Filter) -> Result<Filter, FilterError> {
        self.combine(other, Combinator::Or)
    }

    fn combine(self, other: Filter, kind: Combinator) -> Result<Filter, FilterError> {
        let order = match (self.order, other.order) {
            (Some(_), Some((field, _))) => return Err(FilterError::OrderAlreadySet(field)),
            (order, None) | (None, order) => order,
        };
        let limit = match (self.limit, other.limit) {
            (Some(_), Some(n)) => return Err(FilterError::LimitAlreadySet(n)),
            (limit, None) | (None, limit) => limit,
        };
        let clause = match (self.clause, other.clause) {
            (Some(left), Some(right)) => Some(Clause::join(kind, left, right)),
            (clause, None) | (None, clause) => clause,
        };

        Ok(Filter {
            clause,
            order,
            limit,
        })
    }

    /// Sort results by `field`
    pub fn order_by(mut self, field: &Field, descending: bool) -> Result<Filter, FilterError> {
        field.check()?;
        if let Some((existing, _)) = self.order {
            return Err(FilterError::OrderAlreadySet(existing));
        }
        let order = if descending {
            Order::Descending
        } else {
            Order::Ascending
        };
        self.order = Some((field.name.clone(), order));
        Ok(self)
    }

    /// Cap the number of results
    pub fn limit(mut self, n: i64) -> Result<Filter, FilterError> {
        if let Some(existing) = self.limit {
            return Err(FilterError::LimitAlreadySet(existing));
        }
        let n = u64::try_from(n).map_err(|_| FilterError::InvalidLimit(n))?;
        self.limit = Some(n);
        Ok(self)
    }

    /// Wire form of the filter
    pub fn to_json(&self) -> Value {
        let mut map = self
            .clause
            .as_ref()
            .map(Clause::to_map)
            .unwrap_or_default();

        if let Some((field, order)) = &self.order {
            map.insert(ORDER_BY.to_string(), Value::String(field.clone()));
            map.insert(ORDER.to_string(), Value::String(order.as_str().to_string()));
        }
        if let Some(limit) = self.limit {
            map.insert(LIMIT.to_string(), Value::from(limit));
        }

        Value::Object(map)
    }

    /// Value for the `X-Filter` header
    pub fn to_header(&self) -> String {
        self.to_json().to_string()
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
