use crate::db::schema;
use crate::db::DbError;
use crate::types::{
    ExecutionResult, FilterOperator, PageResult, QueryFilter, QueryOutcome, Row, Value,
};
use rusqlite::{params_from_iter, Connection, Statement};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Quote an identifier for interpolation into SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL text and bound parameters for one page read
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PagePlan {
    pub count_sql: String,
    pub page_sql: String,
    /// Parameters of the WHERE clause, shared by both statements
    pub params: Vec<Value>,
}

/// Compose the count and page statements for a table read.
/// Identifiers must already be validated.
pub(crate) fn plan_page(table: &str, filter: &QueryFilter) -> PagePlan {
    let table_ident = quote_ident(table);

    let mut clauses = Vec::with_capacity(filter.columns.len());
    let mut params = Vec::with_capacity(filter.columns.len());
    for condition in &filter.columns {
        let column = quote_ident(&condition.column);
        match condition.operator {
            FilterOperator::Equals => {
                clauses.push(format!("{} = ?", column));
                params.push(condition.value.clone());
            }
            FilterOperator::Like => {
                clauses.push(format!("{} LIKE ? ESCAPE '\\'", column));
                params.push(Value::Text(format!("%{}%", condition.value.as_pattern_text())));
            }
        }
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" OR "))
    };

    let order_sql = match &filter.sorting {
        Some(sorting) => format!(
            " ORDER BY {} {}",
            quote_ident(&sorting.column),
            sorting.direction.as_sql()
        ),
        None => String::new(),
    };

    PagePlan {
        count_sql: format!("SELECT COUNT(*) FROM {}{}", table_ident, where_sql),
        page_sql: format!(
            "SELECT * FROM {}{}{} LIMIT ? OFFSET ?",
            table_ident, where_sql, order_sql
        ),
        params,
    }
}

/// Reject table and column names the catalog does not know. Names match
/// case-insensitively; the returned table name and filter use the catalog's
/// spelling.
pub(crate) fn validate_filter(
    conn: &Connection,
    table: &str,
    filter: &QueryFilter,
) -> Result<(String, QueryFilter), DbError> {
    let table = match schema::resolve_relation(conn, table)? {
        Some((_, name)) => name,
        None => return Err(DbError::UnknownTable(table.to_string())),
    };

    let columns = schema::get_table_schema(conn, &table)?;
    let resolve = |name: &str| {
        columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|c| c.name.clone())
            .ok_or_else(|| DbError::UnknownColumn {
                table: table.clone(),
                column: name.to_string(),
            })
    };

    let mut resolved = filter.clone();
    for condition in &mut resolved.columns {
        condition.column = resolve(&condition.column)?;
    }
    if let Some(sorting) = &mut resolved.sorting {
        sorting.column = resolve(&sorting.column)?;
    }

    Ok((table, resolved))
}

/// Get one page of a table or view, with conditions OR-combined.
/// `total_rows` counts the rows matching the filter.
pub fn read_page(
    conn: &Connection,
    table: &str,
    page: usize,
    page_size: usize,
    filter: &QueryFilter,
) -> Result<PageResult, DbError> {
    if page == 0 || page_size == 0 {
        return Err(DbError::InvalidPage { page, page_size });
    }
    let (table, filter) = validate_filter(conn, table, filter)?;

    let plan = plan_page(&table, &filter);
    debug!(sql = %plan.page_sql, page, page_size, "reading page");

    let total_rows: i64 = conn
        .query_row(&plan.count_sql, params_from_iter(plan.params.iter()), |row| row.get(0))
        .map_err(|e| DbError::query(e, &plan.count_sql))?;
    let total_rows = total_rows.max(0) as u64;

    // An offset SQLite cannot represent is past the last row of any table
    let offset = (page - 1)
        .checked_mul(page_size)
        .and_then(|offset| i64::try_from(offset).ok());
    let Some(offset) = offset else {
        return Ok(PageResult {
            columns: schema::get_table_schema(conn, &table)?
                .into_iter()
                .map(|c| c.name)
                .collect(),
            rows: Vec::new(),
            total_rows,
            page,
            page_size,
            displayed_rows: 0,
        });
    };
    let limit = i64::try_from(page_size).unwrap_or(i64::MAX);

    let mut stmt = conn
        .prepare(&plan.page_sql)
        .map_err(|e| DbError::query(e, &plan.page_sql))?;
    let columns = column_names(&stmt);

    let mut params = plan.params;
    params.push(Value::Integer(limit));
    params.push(Value::Integer(offset));
    let rows = collect_rows(&mut stmt, params_from_iter(params.iter()), None)
        .map_err(|e| DbError::query(e, &plan.page_sql))?;

    Ok(PageResult {
        columns,
        displayed_rows: rows.len(),
        rows,
        total_rows,
        page,
        page_size,
    })
}

/// Execute a SQL statement and normalize its result.
///
/// Result-producing statements are capped at `max_rows` (0 for no cap); one
/// extra row is probed to tell whether the result was cut short. Other
/// statements report how many rows they changed.
pub fn execute_query(conn: &Connection, sql: &str, max_rows: usize) -> Result<ExecutionResult, DbError> {
    execute(conn, sql, max_rows, false)
}

/// Like [`execute_query`], but refuses any statement that could change the
/// database before running it
pub fn execute_read_query(
    conn: &Connection,
    sql: &str,
    max_rows: usize,
) -> Result<ExecutionResult, DbError> {
    execute(conn, sql, max_rows, true)
}

fn execute(
    conn: &Connection,
    sql: &str,
    max_rows: usize,
    read_only: bool,
) -> Result<ExecutionResult, DbError> {
    let execution_timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    let start = Instant::now();
    debug!(sql, max_rows, "executing query");

    let mut stmt = conn.prepare(sql).map_err(|e| DbError::query(e, sql))?;
    if read_only && (!stmt.readonly() || stmt.column_count() == 0) {
        return Err(DbError::NotAQuery(sql.to_string()));
    }

    let outcome = if stmt.column_count() == 0 {
        let changes = stmt.execute([]).map_err(|e| DbError::query(e, sql))?;
        QueryOutcome::Affected {
            rows_affected: changes as u64,
        }
    } else {
        let columns = column_names(&stmt);
        let probe = (max_rows > 0).then(|| max_rows + 1);
        let mut rows = collect_rows(&mut stmt, [], probe).map_err(|e| DbError::query(e, sql))?;

        let truncated = max_rows > 0 && rows.len() > max_rows;
        if truncated {
            rows.truncate(max_rows);
        }
        QueryOutcome::Rows {
            columns,
            rows_fetched: rows.len(),
            rows,
            truncated,
            max_rows,
        }
    };

    Ok(ExecutionResult {
        outcome,
        execution_time: start.elapsed().as_secs_f64(),
        execution_timestamp,
    })
}

fn column_names(stmt: &Statement<'_>) -> Vec<String> {
    stmt.column_names().iter().map(|s| s.to_string()).collect()
}

fn collect_rows<P: rusqlite::Params>(
    stmt: &mut Statement<'_>,
    params: P,
    limit: Option<usize>,
) -> rusqlite::Result<Vec<Row>> {
    let column_count = stmt.column_count();
    let mut rows = Vec::new();
    let mut cursor = stmt.query(params)?;

    while let Some(row) = cursor.next()? {
        if limit.is_some_and(|limit| rows.len() >= limit) {
            break;
        }
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            let value: rusqlite::types::Value = row.get(i)?;
            values.push(Value::from(value));
        }
        rows.push(values);
    }

    Ok(rows)
}
