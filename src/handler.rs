// handler.rs - Maps a decoded request onto collection operations
//
// The caller already holds the collection's serial lock; everything here is
// synchronous. Mutating operations persist the collection before replying;
// a save failure is logged and the operation still reports success, since
// the in-memory state did change.

use crate::collection::Collection;
use crate::protocol::{DatabaseRequest, DatabaseResponse};
use crate::query::Filter;
use crate::scan;
use crate::DatabaseError;

pub fn process_request(request: &DatabaseRequest, collection: &mut Collection) -> DatabaseResponse {
    match request.operation.as_str() {
        "insert" => handle_insert(request, collection),
        "find" => handle_find(request, collection),
        "delete" => handle_delete(request, collection),
        other => DatabaseResponse::error(
            DatabaseError::UnknownOperation {
                operation: other.to_string(),
            }
            .to_string(),
        ),
    }
}

fn handle_insert(request: &DatabaseRequest, collection: &mut Collection) -> DatabaseResponse {
    // older one-field clients sent the documents in "query"
    let payload = if request.data_text().is_empty() {
        request.query_text()
    } else {
        request.data_text()
    };
    let trimmed = scan::trim(payload);

    if trimmed.is_empty() {
        return DatabaseResponse::error(DatabaseError::EmptyInsertPayload.to_string());
    }

    if trimmed.starts_with('{') {
        return match collection.insert(trimmed) {
            Ok(_) => {
                persist(collection);
                DatabaseResponse::success("Document inserted", 1, "[]".to_string())
            }
            Err(e) => DatabaseResponse::error(e.to_string()),
        };
    }

    if trimmed.starts_with('[') {
        let bytes = trimmed.as_bytes();
        let mut inserted = 0usize;
        let mut pos = 0usize;

        while pos < bytes.len() {
            let start = match scan::find_from(bytes, pos, b'{') {
                Some(index) => index,
                None => break,
            };
            // an unterminated trailing object ends the batch; whatever
            // parsed so far is committed
            let end = match scan::find_matching(trimmed, start) {
                Some(index) => index,
                None => break,
            };
            let object = scan::trim(&trimmed[start..=end]);
            if !object.is_empty() {
                if let Err(e) = collection.insert(object) {
                    // no rollback: earlier documents of the batch stay
                    return DatabaseResponse::error(e.to_string());
                }
                inserted += 1;
            }
            pos = end + 1;
        }

        persist(collection);
        return DatabaseResponse::success(
            format!("Inserted {} documents", inserted),
            inserted,
            "[]".to_string(),
        );
    }

    DatabaseResponse::error(DatabaseError::InvalidInsertPayload.to_string())
}

fn handle_find(request: &DatabaseRequest, collection: &Collection) -> DatabaseResponse {
    let filter = Filter::parse(request.query_text());
    let (json_array, count) = collection.find(&filter);
    DatabaseResponse::success(format!("Fetched {} documents", count), count, json_array)
}

fn handle_delete(request: &DatabaseRequest, collection: &mut Collection) -> DatabaseResponse {
    let filter = Filter::parse(request.query_text());
    let removed = collection.delete(&filter);
    persist(collection);
    DatabaseResponse::success(
        format!("Deleted {} documents", removed),
        removed,
        "[]".to_string(),
    )
}

fn persist(collection: &Collection) {
    if let Err(e) = collection.save() {
        log::error!("Failed to persist collection '{}': {}", collection.name(), e);
    }
}
