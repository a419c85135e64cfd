use crate::db::mutate::RowValues;
use crate::db::{DatabaseManager, DbError};
use crate::types::{ColumnSchema, ExecutionResult, PageResult, QueryFilter, Value, ViewSchema};
use anyhow::Result;
use std::sync::mpsc;
use std::thread;
use tracing::debug;

/// Messages sent to the worker thread
#[derive(Debug)]
pub enum WorkerMessage {
    LoadTables,
    LoadViews,
    LoadTableSchema {
        table_name: String,
    },
    LoadViewSchema {
        view_name: String,
    },
    LoadPage {
        table_name: String,
        page: usize,
        page_size: usize,
        filter: QueryFilter,
    },
    ExecuteQuery {
        query: String,
        max_rows: usize,
    },
    InsertRow {
        table_name: String,
        row: RowValues,
    },
    UpdateRow {
        table_name: String,
        row: RowValues,
        id: Value,
    },
    DeleteRow {
        table_name: String,
        id: Value,
    },
    DropTable {
        name: String,
    },
    DropView {
        name: String,
    },
    Shutdown,
}

/// Responses sent back from the worker thread
#[derive(Debug)]
pub enum WorkerResponse {
    TablesLoaded { tables: Vec<String> },
    ViewsLoaded { views: Vec<String> },
    TableSchemaLoaded { table_name: String, columns: Vec<ColumnSchema> },
    ViewSchemaLoaded { view_name: String, schema: Option<ViewSchema> },
    PageLoaded { table_name: String, result: PageResult },
    QueryExecuted { result: ExecutionResult },
    RowsChanged { table_name: String, changes: usize },
    Dropped { name: String },
    Error { error: DbError },
}

/// Worker thread that owns a [`DatabaseManager`] and runs its operations
/// in request order
pub struct Worker {
    sender: mpsc::Sender<WorkerMessage>,
    receiver: mpsc::Receiver<WorkerResponse>,
    handle: thread::JoinHandle<()>,
}

impl Worker {
    pub fn new(manager: DatabaseManager) -> Self {
        let (tx, rx) = mpsc::channel();
        let (response_tx, response_rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            let mut manager = manager;
            while let Ok(message) = rx.recv() {
                if matches!(message, WorkerMessage::Shutdown) {
                    break;
                }
                let response = handle_message(&mut manager, message);
                if response_tx.send(response).is_err() {
                    // Receiver gone, nobody is listening any more
                    break;
                }
            }
            debug!(path = %manager.path().display(), "worker stopped");
        });

        Self {
            sender: tx,
            receiver: response_rx,
            handle,
        }
    }

    /// Send a message to the worker
    pub fn send(&self, message: WorkerMessage) -> Result<()> {
        self.sender.send(message)?;
        Ok(())
    }

    /// Try to receive a response (non-blocking)
    pub fn try_recv(&self) -> Result<Option<WorkerResponse>> {
        match self.receiver.try_recv() {
            Ok(response) => Ok(Some(response)),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => {
                Err(anyhow::anyhow!("Worker thread disconnected"))
            }
        }
    }

    /// Receive a response (blocking)
    pub fn recv(&self) -> Result<WorkerResponse> {
        self.receiver
            .recv()
            .map_err(|e| anyhow::anyhow!("Worker thread disconnected: {}", e))
    }

    /// Shutdown the worker thread
    pub fn shutdown(self) -> Result<()> {
        self.sender.send(WorkerMessage::Shutdown)?;
        self.handle
            .join()
            .map_err(|_| anyhow::anyhow!("Worker thread panicked"))?;
        Ok(())
    }
}

fn handle_message(manager: &mut DatabaseManager, message: WorkerMessage) -> WorkerResponse {
    let result = match message {
        WorkerMessage::LoadTables => manager
            .list_tables()
            .map(|tables| WorkerResponse::TablesLoaded { tables }),
        WorkerMessage::LoadViews => manager
            .list_views()
            .map(|views| WorkerResponse::ViewsLoaded { views }),
        WorkerMessage::LoadTableSchema { table_name } => manager
            .get_table_schema(&table_name)
            .map(|columns| WorkerResponse::TableSchemaLoaded { table_name, columns }),
        WorkerMessage::LoadViewSchema { view_name } => manager
            .get_view_schema(&view_name)
            .map(|schema| WorkerResponse::ViewSchemaLoaded { view_name, schema }),
        WorkerMessage::LoadPage {
            table_name,
            page,
            page_size,
            filter,
        } => manager
            .read_page(&table_name, page, page_size, &filter)
            .map(|result| WorkerResponse::PageLoaded { table_name, result }),
        WorkerMessage::ExecuteQuery { query, max_rows } => manager
            .execute_query(&query, max_rows)
            .map(|result| WorkerResponse::QueryExecuted { result }),
        WorkerMessage::InsertRow { table_name, row } => manager
            .insert_row(&table_name, &row)
            .map(|changes| WorkerResponse::RowsChanged { table_name, changes }),
        WorkerMessage::UpdateRow { table_name, row, id } => manager
            .update_row(&table_name, &row, id)
            .map(|changes| WorkerResponse::RowsChanged { table_name, changes }),
        WorkerMessage::DeleteRow { table_name, id } => manager
            .delete_row(&table_name, id)
            .map(|changes| WorkerResponse::RowsChanged { table_name, changes }),
        WorkerMessage::DropTable { name } => manager
            .delete_table(&name)
            .map(|_| WorkerResponse::Dropped { name }),
        WorkerMessage::DropView { name } => manager
            .delete_view(&name)
            .map(|_| WorkerResponse::Dropped { name }),
        WorkerMessage::Shutdown => unreachable!("shutdown is handled by the worker loop"),
    };

    result.unwrap_or_else(|error| WorkerResponse::Error { error })
}
