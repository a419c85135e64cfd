use crate::db::DbError;
use crate::types::{ColumnSchema, Value};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// How a filter condition compares its column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum FilterOperator {
    Equals,
    /// Substring match, `LIKE '%value%'`
    Like,
}

impl FromStr for FilterOperator {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EQUALS" | "EQ" | "=" => Ok(FilterOperator::Equals),
            "LIKE" => Ok(FilterOperator::Like),
            other => Err(DbError::InvalidFilter(format!(
                "unsupported operator '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for FilterOperator {
    type Error = DbError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterOperator::Equals => write!(f, "EQUALS"),
            FilterOperator::Like => write!(f, "LIKE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "String")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = DbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            other => Err(DbError::InvalidFilter(format!(
                "unsupported sort direction '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for SortDirection {
    type Error = DbError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// One `column <op> value` condition
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawCondition")]
pub struct FilterCondition {
    pub column: String,
    pub value: Value,
    pub operator: FilterOperator,
}

impl FilterCondition {
    pub fn new(column: impl Into<String>, value: impl Into<Value>, operator: FilterOperator) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
            operator,
        }
    }

    /// Build a condition from a textual operator such as `EQUALS` or `LIKE`
    pub fn parse(
        column: impl Into<String>,
        value: impl Into<Value>,
        operator: &str,
    ) -> Result<Self, DbError> {
        Ok(Self::new(column, value, operator.parse()?))
    }
}

/// Host wire shape: `{"condition": ["age", 25], "type": "EQUALS"}`
#[derive(Deserialize)]
struct RawCondition {
    condition: (String, serde_json::Value),
    #[serde(rename = "type")]
    operator: String,
}

impl TryFrom<RawCondition> for FilterCondition {
    type Error = DbError;

    fn try_from(raw: RawCondition) -> Result<Self, Self::Error> {
        let (column, value) = raw.condition;
        let value = match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Integer(b as i64),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Real(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Value::Text(s),
            other => {
                return Err(DbError::InvalidFilter(format!(
                    "unsupported value for column '{}': {}",
                    column, other
                )))
            }
        };
        FilterCondition::parse(column, value, &raw.operator)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Sorting {
    pub column: String,
    #[serde(alias = "order", default)]
    pub direction: SortDirection,
}

/// Filter and sort request for a page read.
///
/// Conditions are combined with OR: a row matches when any condition holds,
/// which is how a single search term is applied across several columns.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct QueryFilter {
    pub columns: Vec<FilterCondition>,
    pub sorting: Option<Sorting>,
}

impl QueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_condition(mut self, condition: FilterCondition) -> Self {
        self.columns.push(condition);
        self
    }

    pub fn sorted_by(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.sorting = Some(Sorting {
            column: column.into(),
            direction,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.sorting.is_none()
    }

    /// Build conditions that search `text` across `columns`.
    ///
    /// Text columns get a substring match. Integer and real columns get an
    /// equality match only when the text parses as that kind of number;
    /// other columns are skipped. Empty text yields no conditions.
    pub fn search<'a>(columns: impl IntoIterator<Item = &'a ColumnSchema>, text: &str) -> Self {
        let text = text.trim();
        let mut filter = QueryFilter::new();
        if text.is_empty() {
            return filter;
        }

        for column in columns {
            let condition = match TypeAffinity::of(&column.data_type) {
                TypeAffinity::Text => Some(FilterCondition::new(
                    column.name.clone(),
                    text,
                    FilterOperator::Like,
                )),
                TypeAffinity::Integer => text.parse::<i64>().ok().map(|i| {
                    FilterCondition::new(column.name.clone(), i, FilterOperator::Equals)
                }),
                TypeAffinity::Real => text.parse::<f64>().ok().map(|r| {
                    FilterCondition::new(column.name.clone(), r, FilterOperator::Equals)
                }),
                TypeAffinity::Other => None,
            };
            if let Some(condition) = condition {
                filter.columns.push(condition);
            }
        }

        filter
    }
}

/// SQLite column affinity, derived from the declared type name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeAffinity {
    Integer,
    Text,
    Real,
    Other,
}

impl TypeAffinity {
    fn of(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            TypeAffinity::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            TypeAffinity::Text
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            TypeAffinity::Real
        } else {
            TypeAffinity::Other
        }
    }
}
