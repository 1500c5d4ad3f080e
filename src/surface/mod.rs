//! Command surface — the RPC boundary a presentation layer talks to.
//!
//! Requests arrive as JSON-RPC 2.0, one per line.  The surface decodes
//! params, calls exactly one `CredentialStore` operation, and encodes the
//! result or error.  It holds no state and makes no decisions of its own;
//! `reveal` is the only method whose result contains a raw secret.

pub mod protocol;

use std::io::{BufRead, Write};
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::{KeycraftError, LogError, Result};
use crate::vault::{CredentialStore, EntryFields};

use protocol::{
    Request, Response, INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    NOT_FOUND, PERSISTENCE_ERROR, UNAVAILABLE, VALIDATION_ERROR,
};

#[derive(Deserialize)]
struct IdParams {
    id: String,
}

#[derive(Deserialize)]
struct UpdateParams {
    id: String,
    #[serde(flatten)]
    fields: EntryFields,
}

pub struct CommandSurface<'a> {
    store: &'a CredentialStore,
    audit_dir: Option<PathBuf>,
}

impl<'a> CommandSurface<'a> {
    pub fn new(store: &'a CredentialStore) -> Self {
        Self {
            store,
            audit_dir: None,
        }
    }

    /// Record mutations and reveals in the audit log under `dir`.
    pub fn with_audit(mut self, dir: PathBuf) -> Self {
        self.audit_dir = Some(dir);
        self
    }

    /// Answer requests from `reader` until EOF, one response line each.
    /// Blank lines are skipped.
    pub fn serve(&self, reader: impl BufRead, mut writer: impl Write) -> Result<()> {
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let response = self.handle_line(&line);
            let mut out = serde_json::to_string(&response)
                .map_err(|e| KeycraftError::CommandFailed(format!("encode response: {e}")))?;
            out.push('\n');
            writer.write_all(out.as_bytes())?;
            writer.flush()?;
        }
        Ok(())
    }

    /// Parse and dispatch a single request line.
    pub fn handle_line(&self, raw: &str) -> Response {
        let request: Request = match serde_json::from_str(raw) {
            Ok(req) => req,
            Err(e) => return Response::parse_error(format!("Parse error: {e}")),
        };
        if let Err(e) = request.validate() {
            return Response::error(request.id, INVALID_REQUEST, e, None);
        }

        tracing::debug!(method = %request.method, "command received");
        let Request {
            method, params, id, ..
        } = request;

        match method.as_str() {
            "list" => self.list(id),
            "add" => self.add(id, params),
            "update" => self.update(id, params),
            "delete" => self.delete(id, params),
            "reveal" => self.reveal(id, params),
            _ => Response::error(
                id,
                METHOD_NOT_FOUND,
                format!("Unknown method: {method}"),
                None,
            ),
        }
    }

    fn list(&self, id: Value) -> Response {
        match self.store.list() {
            Ok(views) => encode(id, &views),
            Err(e) => error_response(id, &e),
        }
    }

    fn add(&self, id: Value, params: Value) -> Response {
        let fields: EntryFields = match decode(params) {
            Ok(f) => f,
            Err(msg) => return Response::error(id, INVALID_PARAMS, msg, None),
        };
        match self.store.add(fields) {
            Ok(view) => {
                self.audit("add", &view.id);
                encode(id, &view)
            }
            Err(e) => error_response(id, &e),
        }
    }

    fn update(&self, id: Value, params: Value) -> Response {
        let UpdateParams { id: entry_id, fields } = match decode(params) {
            Ok(p) => p,
            Err(msg) => return Response::error(id, INVALID_PARAMS, msg, None),
        };
        match self.store.update(&entry_id, fields) {
            Ok(view) => {
                self.audit("update", &entry_id);
                encode(id, &view)
            }
            Err(e) => error_response(id, &e),
        }
    }

    fn delete(&self, id: Value, params: Value) -> Response {
        let IdParams { id: entry_id } = match decode(params) {
            Ok(p) => p,
            Err(msg) => return Response::error(id, INVALID_PARAMS, msg, None),
        };
        match self.store.delete(&entry_id) {
            Ok(()) => {
                self.audit("delete", &entry_id);
                Response::success(id, Value::Null)
            }
            Err(e) => error_response(id, &e),
        }
    }

    fn reveal(&self, id: Value, params: Value) -> Response {
        let IdParams { id: entry_id } = match decode(params) {
            Ok(p) => p,
            Err(msg) => return Response::error(id, INVALID_PARAMS, msg, None),
        };
        match self.store.reveal(&entry_id) {
            Ok(secret) => {
                self.audit("reveal", &entry_id);
                Response::success(id, json!({ "secret_value": secret.as_str() }))
            }
            Err(e) => error_response(id, &e),
        }
    }

    fn audit(&self, operation: &str, entry_id: &str) {
        if let Some(dir) = &self.audit_dir {
            crate::audit::log_audit(dir, operation, Some(entry_id), Some("command surface"));
        }
    }
}

fn decode<T: DeserializeOwned>(params: Value) -> std::result::Result<T, String> {
    serde_json::from_value(params).map_err(|e| format!("Invalid params: {e}"))
}

fn encode<T: serde::Serialize>(id: Value, value: &T) -> Response {
    match serde_json::to_value(value) {
        Ok(v) => Response::success(id, v),
        Err(e) => Response::error(id, INTERNAL_ERROR, format!("encode result: {e}"), None),
    }
}

/// Map an engine error onto a JSON-RPC error object.
fn error_response(id: Value, err: &KeycraftError) -> Response {
    let (code, data) = match err {
        KeycraftError::Validation { field } => (VALIDATION_ERROR, Some(json!({ "field": field }))),
        KeycraftError::NotFound { id: entry_id } => (NOT_FOUND, Some(json!({ "id": entry_id }))),
        KeycraftError::Persistence(LogError::IoFailure(_)) => {
            (PERSISTENCE_ERROR, Some(json!({ "kind": "io_failure" })))
        }
        KeycraftError::Persistence(LogError::CorruptState(_)) => {
            (PERSISTENCE_ERROR, Some(json!({ "kind": "corrupt_state" })))
        }
        KeycraftError::Unavailable => (UNAVAILABLE, None),
        _ => (INTERNAL_ERROR, None),
    };
    Response::error(id, code, err.to_string(), data)
}
