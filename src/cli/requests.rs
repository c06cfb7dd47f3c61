//! Request dispatch for the serve loop
//!
//! Each input line is one [`Request`], tagged by `op`. The handler maps it
//! onto the [`Database`] API and renders the outcome as a response
//! envelope. A failing request produces an error response; it never stops
//! the loop.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use super::io::{error_response, ok_response};
use crate::aggregation::Pipeline;
use crate::index::{IndexKind, IndexOptions};
use crate::query::{Filter, FindOptions};
use crate::snapshot::SnapshotError;
use crate::store::{BatchResult, Database, StoreError, UpdateOp};
use crate::ttl;
use crate::value::{Document, Value};

const BAD_REQUEST: &str = "AERO_BAD_REQUEST";

fn match_all() -> Filter {
    Filter::All
}

/// One line of the request protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    CreateCollection {
        collection: String,
    },
    DropCollection {
        collection: String,
    },
    ListCollections,
    CreateIndex {
        collection: String,
        fields: Vec<String>,
        #[serde(default)]
        kind: IndexKind,
        #[serde(default)]
        options: IndexOptions,
    },
    DropIndex {
        collection: String,
        name: String,
    },
    ListIndexes {
        collection: String,
    },
    Insert {
        collection: String,
        document: Document,
    },
    InsertMany {
        collection: String,
        documents: Vec<Document>,
    },
    Get {
        collection: String,
        id: Value,
    },
    Update {
        collection: String,
        id: Value,
        ops: Vec<UpdateOp>,
    },
    UpdateMany {
        collection: String,
        #[serde(default = "match_all")]
        filter: Filter,
        ops: Vec<UpdateOp>,
    },
    Delete {
        collection: String,
        id: Value,
    },
    DeleteMany {
        collection: String,
        #[serde(default = "match_all")]
        filter: Filter,
    },
    Find {
        collection: String,
        #[serde(default = "match_all")]
        filter: Filter,
        #[serde(default)]
        options: FindOptions,
    },
    FindOne {
        collection: String,
        #[serde(default = "match_all")]
        filter: Filter,
        #[serde(default)]
        options: FindOptions,
    },
    Count {
        collection: String,
        #[serde(default = "match_all")]
        filter: Filter,
    },
    Aggregate {
        collection: String,
        pipeline: Pipeline,
    },
    /// Run one TTL sweep now
    Sweep,
    SaveSnapshot {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    LoadSnapshot {
        #[serde(default)]
        path: Option<PathBuf>,
    },
    Stats,
}

/// A request that could not be carried out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    code: &'static str,
    message: String,
}

impl RequestFailure {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<StoreError> for RequestFailure {
    fn from(err: StoreError) -> Self {
        Self {
            code: err.code().code(),
            message: err.message().to_string(),
        }
    }
}

impl From<SnapshotError> for RequestFailure {
    fn from(err: SnapshotError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RequestFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::bad_request(err.to_string())
    }
}

type RequestResult = Result<JsonValue, RequestFailure>;

/// Executes requests against one database
pub struct RequestHandler {
    db: Arc<Database>,
    snapshot_path: Option<PathBuf>,
}

impl RequestHandler {
    /// `snapshot_path` is used by snapshot requests that name no path
    pub fn new(db: Arc<Database>, snapshot_path: Option<PathBuf>) -> Self {
        Self { db, snapshot_path }
    }

    /// Parses and executes one request line, returning the response envelope
    pub fn handle_line(&self, line: &str) -> JsonValue {
        let outcome = serde_json::from_str::<Request>(line)
            .map_err(RequestFailure::from)
            .and_then(|request| self.handle(request));
        match outcome {
            Ok(data) => ok_response(data),
            Err(failure) => error_response(failure.code(), failure.message()),
        }
    }

    pub fn handle(&self, request: Request) -> RequestResult {
        let db = &self.db;
        match request {
            Request::CreateCollection { collection } => {
                db.create_collection(&collection)?;
                Ok(json!({ "collection": collection }))
            }
            Request::DropCollection { collection } => {
                db.drop_collection(&collection)?;
                Ok(json!({ "collection": collection }))
            }
            Request::ListCollections => Ok(json!(db.list_collections())),
            Request::CreateIndex {
                collection,
                fields,
                kind,
                options,
            } => {
                let definition = db.create_index(&collection, fields, kind, options)?;
                Ok(serde_json::to_value(definition)?)
            }
            Request::DropIndex { collection, name } => {
                let definition = db.drop_index(&collection, &name)?;
                Ok(serde_json::to_value(definition)?)
            }
            Request::ListIndexes { collection } => {
                Ok(serde_json::to_value(db.list_indexes(&collection)?)?)
            }
            Request::Insert {
                collection,
                document,
            } => {
                let id = db.insert(&collection, document)?;
                Ok(json!({ "id": id.to_json() }))
            }
            Request::InsertMany {
                collection,
                documents,
            } => Ok(batch_json(&db.insert_many(&collection, documents)?)),
            Request::Get { collection, id } => Ok(optional_document(db.get(&collection, &id)?)),
            Request::Update {
                collection,
                id,
                ops,
            } => {
                let applied = db.update(&collection, &id, &ops)?;
                Ok(json!({ "applied": applied }))
            }
            Request::UpdateMany {
                collection,
                filter,
                ops,
            } => Ok(batch_json(&db.update_many(&collection, &filter, &ops)?)),
            Request::Delete { collection, id } => {
                let deleted = db.delete(&collection, &id)?;
                Ok(json!({ "deleted": deleted }))
            }
            Request::DeleteMany { collection, filter } => {
                Ok(batch_json(&db.delete_many(&collection, &filter)?))
            }
            Request::Find {
                collection,
                filter,
                options,
            } => {
                let documents = db.find(&collection, filter, options)?.to_vec()?;
                Ok(JsonValue::Array(
                    documents.iter().map(Document::to_json).collect(),
                ))
            }
            Request::FindOne {
                collection,
                filter,
                options,
            } => Ok(optional_document(db.find_one(&collection, filter, options)?)),
            Request::Count { collection, filter } => {
                Ok(json!({ "count": db.count(&collection, &filter)? }))
            }
            Request::Aggregate {
                collection,
                pipeline,
            } => {
                let documents = db.aggregate(&collection, &pipeline)?;
                Ok(JsonValue::Array(
                    documents.iter().map(Document::to_json).collect(),
                ))
            }
            Request::Sweep => Ok(json!({ "reaped": ttl::sweep_once(db, Utc::now()) })),
            Request::SaveSnapshot { path } => {
                let path = self.snapshot_target(path)?;
                db.save_snapshot(&path)?;
                Ok(json!({ "path": path.display().to_string() }))
            }
            Request::LoadSnapshot { path } => {
                let path = self.snapshot_target(path)?;
                db.load_snapshot(&path)?;
                Ok(json!({ "path": path.display().to_string() }))
            }
            Request::Stats => Ok(serde_json::to_value(db.metrics().snapshot())?),
        }
    }

    fn snapshot_target(&self, requested: Option<PathBuf>) -> Result<PathBuf, RequestFailure> {
        requested
            .or_else(|| self.snapshot_path.clone())
            .ok_or_else(|| RequestFailure::bad_request("no snapshot path given or configured"))
    }
}

fn optional_document(document: Option<Document>) -> JsonValue {
    document.map_or(JsonValue::Null, |d| d.to_json())
}

fn batch_json(result: &BatchResult) -> JsonValue {
    let failures: Vec<JsonValue> = result
        .failures
        .iter()
        .map(|f| {
            json!({
                "index": f.index,
                "id": f.id.as_ref().map_or(JsonValue::Null, Value::to_json),
                "code": f.error.code().code(),
                "message": f.error.message(),
            })
        })
        .collect();
    json!({
        "succeeded": result.succeeded.iter().map(Value::to_json).collect::<Vec<_>>(),
        "failures": failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DatabaseConfig;

    fn handler() -> RequestHandler {
        let db = Arc::new(Database::new(DatabaseConfig::default()).unwrap());
        RequestHandler::new(db, None)
    }

    fn ok(handler: &RequestHandler, request: JsonValue) -> JsonValue {
        let response = handler.handle_line(&request.to_string());
        assert_eq!(response["status"], "ok", "request {} failed: {}", request, response);
        response["data"].clone()
    }

    fn err(handler: &RequestHandler, request: JsonValue) -> String {
        let response = handler.handle_line(&request.to_string());
        assert_eq!(response["status"], "error", "request {} succeeded", request);
        response["code"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_crud_round() {
        let h = handler();
        ok(&h, json!({"op": "create_collection", "collection": "products"}));
        let data = ok(
            &h,
            json!({"op": "insert", "collection": "products", "document": {"_id": "p1", "price": 10}}),
        );
        assert_eq!(data["id"], "p1");

        let data = ok(
            &h,
            json!({"op": "update", "collection": "products", "id": "p1",
                   "ops": [{"increment": {"path": "price", "by": 5}}]}),
        );
        assert_eq!(data["applied"], true);

        let doc = ok(&h, json!({"op": "get", "collection": "products", "id": "p1"}));
        assert_eq!(doc["price"], 15);

        let data = ok(&h, json!({"op": "delete", "collection": "products", "id": "p1"}));
        assert_eq!(data["deleted"], true);
        let data = ok(&h, json!({"op": "delete", "collection": "products", "id": "p1"}));
        assert_eq!(data["deleted"], false);
        assert_eq!(ok(&h, json!({"op": "get", "collection": "products", "id": "p1"})), JsonValue::Null);
    }

    #[test]
    fn test_find_with_filter_and_options() {
        let h = handler();
        ok(&h, json!({"op": "create_collection", "collection": "products"}));
        ok(
            &h,
            json!({"op": "insert_many", "collection": "products", "documents": [
                {"_id": 1, "price": 30}, {"_id": 2, "price": 10}, {"_id": 3, "price": 20}
            ]}),
        );

        let docs = ok(
            &h,
            json!({"op": "find", "collection": "products",
                   "filter": {"gte": {"path": "price", "value": 15}},
                   "options": {"sort": [{"path": "price"}], "projection": ["price"]}}),
        );
        assert_eq!(docs, json!([{"_id": 3, "price": 20}, {"_id": 1, "price": 30}]));

        let data = ok(&h, json!({"op": "count", "collection": "products"}));
        assert_eq!(data["count"], 3);
    }

    #[test]
    fn test_batch_reports_failures() {
        let h = handler();
        ok(&h, json!({"op": "create_collection", "collection": "c"}));
        let data = ok(
            &h,
            json!({"op": "insert_many", "collection": "c", "documents": [{"_id": 1}, {"_id": 1}]}),
        );
        assert_eq!(data["succeeded"], json!([1]));
        assert_eq!(data["failures"][0]["index"], 1);
        assert_eq!(data["failures"][0]["code"], "AERO_DUPLICATE_KEY");
    }

    #[test]
    fn test_errors_become_responses() {
        let h = handler();
        assert_eq!(err(&h, json!({"op": "count", "collection": "nope"})), "AERO_UNKNOWN_COLLECTION");
        assert_eq!(err(&h, json!({"op": "frobnicate"})), BAD_REQUEST);
        assert_eq!(err(&h, json!({"op": "save_snapshot"})), BAD_REQUEST);
        assert_eq!(h.handle_line("not json")["code"], BAD_REQUEST);

        ok(&h, json!({"op": "create_collection", "collection": "c"}));
        assert_eq!(
            err(&h, json!({"op": "update", "collection": "c", "id": 9, "ops": [{"unset": {"path": "x"}}]})),
            "AERO_NOT_FOUND"
        );
    }

    #[test]
    fn test_stats_and_sweep() {
        let h = handler();
        ok(&h, json!({"op": "create_collection", "collection": "c"}));
        ok(&h, json!({"op": "insert", "collection": "c", "document": {"a": 1}}));
        let data = ok(&h, json!({"op": "sweep"}));
        assert_eq!(data["reaped"], 0);

        let stats = ok(&h, json!({"op": "stats"}));
        assert_eq!(stats["inserts"], 1);
        assert_eq!(stats["reaper_sweeps"], 1);
    }
}
