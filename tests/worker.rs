mod common;

use common::{row, Fixture};
use dbview::types::{QueryFilter, Value};
use dbview::worker::{Worker, WorkerMessage, WorkerResponse};
use dbview::DbError;

#[test]
fn worker_answers_in_request_order() {
    let fixture = Fixture::populated();
    let worker = Worker::new(fixture.manager());

    worker.send(WorkerMessage::LoadTables).unwrap();
    worker
        .send(WorkerMessage::LoadPage {
            table_name: "users".into(),
            page: 2,
            page_size: 4,
            filter: QueryFilter::new(),
        })
        .unwrap();
    worker
        .send(WorkerMessage::InsertRow {
            table_name: "users".into(),
            row: row(&[("name", Value::from("Worker"))]),
        })
        .unwrap();

    match worker.recv().unwrap() {
        WorkerResponse::TablesLoaded { tables } => assert_eq!(tables, ["users", "posts"]),
        other => panic!("unexpected response: {:?}", other),
    }
    match worker.recv().unwrap() {
        WorkerResponse::PageLoaded { table_name, result } => {
            assert_eq!(table_name, "users");
            assert_eq!(result.displayed_rows, 4);
            assert_eq!(result.total_pages(), 3);
            assert!(result.has_next_page() && result.has_prev_page());
        }
        other => panic!("unexpected response: {:?}", other),
    }
    match worker.recv().unwrap() {
        WorkerResponse::RowsChanged { changes, .. } => assert_eq!(changes, 1),
        other => panic!("unexpected response: {:?}", other),
    }

    worker.shutdown().unwrap();
}

#[test]
fn worker_reports_errors_and_keeps_running() {
    let fixture = Fixture::new();
    let worker = Worker::new(fixture.manager());

    worker
        .send(WorkerMessage::ExecuteQuery {
            query: "SELECT * FROM nowhere".into(),
            max_rows: 10,
        })
        .unwrap();
    match worker.recv().unwrap() {
        WorkerResponse::Error {
            error: DbError::Query { message, .. },
        } => assert!(message.contains("no such table")),
        other => panic!("unexpected response: {:?}", other),
    }

    worker
        .send(WorkerMessage::LoadViewSchema {
            view_name: "users_view".into(),
        })
        .unwrap();
    match worker.recv().unwrap() {
        WorkerResponse::ViewSchemaLoaded { schema, .. } => {
            assert_eq!(schema.map(|s| s.name).as_deref(), Some("users_view"))
        }
        other => panic!("unexpected response: {:?}", other),
    }

    assert!(worker.try_recv().unwrap().is_none());
    worker.shutdown().unwrap();
}
