use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dbview::db::mutate::RowValues;
use dbview::export::{export, ExportFormat};
use dbview::types::{ColumnSchema, FilterCondition, QueryFilter, Row, SortDirection, Value};
use dbview::{DatabaseManager, DbError, ManagerConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dbview")]
#[command(about = "Browse and edit SQLite databases from the command line")]
struct Cli {
    /// Database file path
    #[arg(value_name = "DATABASE")]
    database: PathBuf,

    /// JSON file with manager settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Open the database read-only
    #[arg(long)]
    read_only: bool,

    /// Create the database file if it does not exist
    #[arg(long)]
    create: bool,

    /// Column used to address rows when a table has no single primary key
    #[arg(long)]
    key_column: Option<String>,

    /// Logging level (stderr). Also supports RUST_LOG.
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tables
    Tables,
    /// List views, newest first
    Views,
    /// Show the columns of a table or view
    Schema { table: String },
    /// Show the definition of a view
    View { name: String },
    /// Read one page of a table or view
    Page {
        table: String,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Rows per page
        #[arg(long)]
        page_size: Option<usize>,

        /// Condition as COLUMN:OPERATOR:VALUE, e.g. age:EQUALS:25 (repeatable, OR-combined)
        #[arg(long = "filter", value_name = "COND")]
        filters: Vec<String>,

        /// Search text across the text and numeric columns
        #[arg(long, conflicts_with = "filters")]
        search: Option<String>,

        /// Sort as COLUMN or COLUMN:DESC
        #[arg(long)]
        sort: Option<String>,

        /// Filter as JSON, e.g. {"columns":[{"condition":["age",25],"type":"EQUALS"}]}
        #[arg(long, conflicts_with_all = ["filters", "search", "sort"])]
        filter_json: Option<String>,
    },
    /// Execute SQL
    Query {
        sql: String,

        /// Maximum rows to return, 0 for all
        #[arg(long)]
        max_rows: Option<usize>,
    },
    /// Insert a row, values as COLUMN=VALUE
    Insert {
        table: String,
        #[arg(value_name = "COLUMN=VALUE")]
        values: Vec<String>,
    },
    /// Update the row with the given key, values as COLUMN=VALUE
    Update {
        table: String,
        id: String,
        #[arg(value_name = "COLUMN=VALUE", required = true)]
        values: Vec<String>,
    },
    /// Delete the row with the given key
    Delete { table: String, id: String },
    /// Drop a table
    DropTable { name: String },
    /// Drop a view
    DropView { name: String },
    /// Export a table or query result
    Export {
        /// Table name to export
        #[arg(long, short)]
        table: Option<String>,

        /// SQL query to execute
        #[arg(long, short)]
        query: Option<String>,

        /// Output format
        #[arg(long, short, value_enum)]
        format: ExportFormatArg,

        /// Output file path
        #[arg(long, short)]
        out: PathBuf,
    },
}

#[derive(clap::ValueEnum, Clone, Copy)]
enum ExportFormatArg {
    Csv,
    Json,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(fmt: ExportFormatArg) -> Self {
        match fmt {
            ExportFormatArg::Csv => ExportFormat::Csv,
            ExportFormatArg::Json => ExportFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&cli)?;
    let mut manager = DatabaseManager::with_config(&cli.database, config);

    run(&mut manager, cli.command).map_err(|e| match e.downcast::<DbError>() {
        Ok(db_error) => anyhow::anyhow!("{}", db_error.diagnostic()),
        Err(other) => other,
    })
}

fn load_config(cli: &Cli) -> Result<ManagerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str::<ManagerConfig>(&text)
                .with_context(|| format!("Invalid config file: {}", path.display()))?
        }
        None => ManagerConfig::default(),
    };

    if cli.read_only {
        config.read_only = true;
    }
    if cli.create {
        config.create_if_missing = true;
    }
    if let Some(key_column) = &cli.key_column {
        config.key_column = key_column.clone();
    }
    Ok(config)
}

fn run(manager: &mut DatabaseManager, command: Commands) -> Result<()> {
    match command {
        Commands::Tables => {
            for table in manager.list_tables()? {
                println!("{}", table);
            }
        }
        Commands::Views => {
            for view in manager.list_views()? {
                println!("{}", view);
            }
        }
        Commands::Schema { table } => {
            let columns = manager.get_table_schema(&table)?;
            if columns.is_empty() {
                println!("No columns found for {}", table);
            }
            for column in &columns {
                println!("{}", describe_column(column));
            }
        }
        Commands::View { name } => match manager.get_view_schema(&name)? {
            Some(view) => println!("{}", view.sql),
            None => println!("No view named {}", name),
        },
        Commands::Page {
            table,
            page,
            page_size,
            filters,
            search,
            sort,
            filter_json,
        } => {
            let page_size = page_size.unwrap_or(manager.config().default_page_size);
            let filter = match filter_json {
                Some(json) => serde_json::from_str::<QueryFilter>(&json).context("Invalid --filter-json")?,
                None => {
                    let mut filter = match search {
                        Some(text) => {
                            let columns = manager.get_table_schema(&table)?;
                            QueryFilter::search(&columns, &text)
                        }
                        None => parse_filters(&filters)?,
                    };
                    if let Some(sort) = sort {
                        let (column, direction) = match sort.rsplit_once(':') {
                            Some((column, direction)) => (column, direction.parse::<SortDirection>()?),
                            None => (sort.as_str(), SortDirection::Asc),
                        };
                        filter = filter.sorted_by(column, direction);
                    }
                    filter
                }
            };

            let result = manager.read_page(&table, page, page_size, &filter)?;
            print_rows(&result.columns, &result.rows);
            println!(
                "\nPage {} of {} ({} rows shown, {} matching)",
                result.page,
                result.total_pages(),
                result.displayed_rows,
                result.total_rows
            );
        }
        Commands::Query { sql, max_rows } => {
            let max_rows = max_rows.unwrap_or(manager.config().default_max_rows);
            let result = manager.execute_query(&sql, max_rows)?;
            match result.rows_affected() {
                Some(changes) => println!("{} row(s) affected", changes),
                None => {
                    print_rows(result.columns(), result.rows());
                    if result.truncated() {
                        println!("\n(showing first {} rows)", result.rows_fetched());
                    }
                }
            }
            println!("Executed in {:.3}s", result.execution_time);
        }
        Commands::Insert { table, values } => {
            let changes = manager.insert_row(&table, &parse_assignments(&values)?)?;
            println!("{} row(s) inserted", changes);
        }
        Commands::Update { table, id, values } => {
            let changes =
                manager.update_row(&table, &parse_assignments(&values)?, Value::parse_literal(&id))?;
            println!("{} row(s) updated", changes);
        }
        Commands::Delete { table, id } => {
            let changes = manager.delete_row(&table, Value::parse_literal(&id))?;
            println!("{} row(s) deleted", changes);
        }
        Commands::DropTable { name } => {
            manager.delete_table(&name)?;
            println!("Dropped table {}", name);
        }
        Commands::DropView { name } => {
            manager.delete_view(&name)?;
            println!("Dropped view {}", name);
        }
        Commands::Export {
            table,
            query,
            format,
            out,
        } => {
            let rows = export(manager, format.into(), &out, table.as_deref(), query.as_deref())?;
            println!("Exported {} rows to: {}", rows, out.display());
        }
    }
    Ok(())
}

fn parse_filters(filters: &[String]) -> Result<QueryFilter> {
    let mut filter = QueryFilter::new();
    for raw in filters {
        let mut parts = raw.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(column), Some(operator), Some(value)) => {
                filter = filter.with_condition(FilterCondition::parse(
                    column,
                    Value::parse_literal(value),
                    operator,
                )?);
            }
            _ => anyhow::bail!("Filter must look like COLUMN:OPERATOR:VALUE, got '{}'", raw),
        }
    }
    Ok(filter)
}

fn parse_assignments(values: &[String]) -> Result<RowValues> {
    values
        .iter()
        .map(|raw| {
            raw.split_once('=')
                .map(|(column, value)| (column.trim().to_string(), Value::parse_literal(value)))
                .with_context(|| format!("Value must look like COLUMN=VALUE, got '{}'", raw))
        })
        .collect()
}

fn describe_column(column: &ColumnSchema) -> String {
    let mut flags = Vec::new();
    if column.primary_key {
        flags.push("PRIMARY KEY".to_string());
    }
    if column.auto_increment {
        flags.push("AUTOINCREMENT".to_string());
    }
    if column.not_null {
        flags.push("NOT NULL".to_string());
    }
    if column.unique {
        flags.push("UNIQUE".to_string());
    }
    if let Some(default) = &column.default_value {
        flags.push(format!("DEFAULT {}", default));
    }
    if let Some(check) = &column.check_expression {
        flags.push(format!("CHECK ({})", check));
    }
    if let Some(fk) = &column.foreign_key {
        flags.push(format!(
            "REFERENCES {}({})",
            fk.table,
            fk.column.as_deref().unwrap_or("")
        ));
    }
    format!(
        "{:>3}  {:<20} {:<10} {}",
        column.ordinal_position,
        column.name,
        column.data_type,
        flags.join(" ")
    )
}

fn print_rows(columns: &[String], rows: &[Row]) {
    const MAX_CELL: usize = 40;
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(|v| v.display(MAX_CELL)).collect())
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, name)| {
            cells
                .iter()
                .filter_map(|row| row.get(i))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |values: Vec<&str>| {
        values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!("{:<width$}", v, width = *w))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    println!("{}", line(columns.iter().map(String::as_str).collect()));
    println!(
        "{}",
        widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>().join("-+-")
    );
    for row in &cells {
        println!("{}", line(row.iter().map(String::as_str).collect()));
    }
}
