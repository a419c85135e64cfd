pub mod filter;
pub mod query;
pub mod table;

pub use filter::{FilterCondition, FilterOperator, QueryFilter, SortDirection, Sorting};
pub use query::{ExecutionResult, PageResult, QueryOutcome, Row, Value};
pub use table::{ColumnSchema, ForeignKeyRef, ViewSchema};
