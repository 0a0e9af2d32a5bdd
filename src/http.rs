//! HTTP transport for the inventory service.
//!
//! Deliberately thin: decode the request target, hand off to a store,
//! serialize the outcome. Every domain decision lives in the stores; this
//! module only maps `StoreError` onto status codes and renders JSON.

use std::io::{self, Read};

use may_minihttp::{HttpService, Request, Response};
use serde::Serialize;
use serde_json::json;

use crate::chemicals::{ChemicalChanges, ChemicalStore, NewChemical};
use crate::error::StoreError;
use crate::inventory_logs::{InventoryLogStore, NewInventoryLog};
#[cfg(feature = "metrics")]
use crate::metrics::{self, METRICS};

/// Decoded request target
#[derive(Debug, Clone, Copy, PartialEq)]
enum Route {
    Root,
    Health,
    #[cfg(feature = "metrics")]
    Metrics,
    Chemicals,
    Chemical(i32),
    ChemicalLog(i32),
    ChemicalLogs(i32),
    InventoryLogs,
    InventoryLog(i32),
    /// An id segment that is not an integer
    BadId,
    Unknown,
}

fn id_route(segment: &str, make: impl FnOnce(i32) -> Route) -> Route {
    match segment.parse::<i32>() {
        Ok(id) => make(id),
        Err(_) => Route::BadId,
    }
}

fn parse_route(path: &str) -> Route {
    let path = path.split('?').next().unwrap_or(path);
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Route::Root;
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    match segments.as_slice() {
        ["health"] => Route::Health,
        #[cfg(feature = "metrics")]
        ["metrics"] => Route::Metrics,
        ["chemicals"] => Route::Chemicals,
        ["chemicals", id] => id_route(id, Route::Chemical),
        ["chemicals", id, "log"] => id_route(id, Route::ChemicalLog),
        ["chemicals", id, "logs"] => id_route(id, Route::ChemicalLogs),
        ["inventory-logs"] => Route::InventoryLogs,
        ["inventory-logs", id] => id_route(id, Route::InventoryLog),
        _ => Route::Unknown,
    }
}

struct Reply {
    status: usize,
    reason: &'static str,
    content_type: &'static str,
    body: Vec<u8>,
}

impl Reply {
    fn json<T: Serialize>(status: usize, reason: &'static str, value: &T) -> Reply {
        match serde_json::to_vec(value) {
            Ok(body) => Reply {
                status,
                reason,
                content_type: "Content-Type: application/json",
                body,
            },
            Err(err) => {
                log::error!("response serialization failed: {err}");
                Reply {
                    status: 500,
                    reason: "Internal Server Error",
                    content_type: "Content-Type: application/json",
                    body: br#"{"detail":"Internal server error"}"#.to_vec(),
                }
            }
        }
    }

    fn ok<T: Serialize>(value: &T) -> Reply {
        Reply::json(200, "OK", value)
    }

    fn detail(status: usize, reason: &'static str, detail: &str) -> Reply {
        #[derive(Serialize)]
        struct Detail<'a> {
            detail: &'a str,
        }
        Reply::json(status, reason, &Detail { detail })
    }

    #[cfg(feature = "metrics")]
    fn text(body: &str) -> Reply {
        Reply {
            status: 200,
            reason: "OK",
            content_type: "Content-Type: text/plain; charset=utf-8",
            body: body.as_bytes().to_vec(),
        }
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(payload: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(payload)
        .map_err(|err| StoreError::InvalidInput(format!("Invalid request body: {err}")))
}

fn error_reply(err: &StoreError) -> Reply {
    match err {
        StoreError::NotFound(_) => Reply::detail(404, "Not Found", &err.to_string()),
        StoreError::InvalidInput(_) => Reply::detail(400, "Bad Request", &err.to_string()),
        StoreError::Db(db) => {
            log::error!("backing store failure: {db}");
            Reply::detail(500, "Internal Server Error", "Internal server error")
        }
    }
}

/// The service mounted on the HTTP server, one clone per connection
#[derive(Clone)]
pub struct InventoryService {
    chemicals: ChemicalStore,
    logs: InventoryLogStore,
}

impl InventoryService {
    pub fn new(chemicals: ChemicalStore, logs: InventoryLogStore) -> Self {
        InventoryService { chemicals, logs }
    }

    fn route_request(
        &self,
        method: &str,
        route: Route,
        payload: &[u8],
    ) -> Result<Reply, StoreError> {
        match (method, route) {
            ("GET", Route::Root) => Ok(Reply::ok(&json!({
                "service": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }))),
            ("GET", Route::Health) => Ok(Reply::ok(&json!({"status": "healthy"}))),
            #[cfg(feature = "metrics")]
            ("GET", Route::Metrics) => Ok(Reply::text(&metrics::gather_text())),
            ("POST", Route::Chemicals) => {
                let new: NewChemical = parse_json(payload)?;
                Ok(Reply::ok(&self.chemicals.create(&new)?))
            }
            ("GET", Route::Chemicals) => Ok(Reply::ok(&self.chemicals.all()?)),
            ("GET", Route::Chemical(id)) => Ok(Reply::ok(&self.chemicals.by_id(id)?)),
            ("PUT", Route::Chemical(id)) => {
                let changes: ChemicalChanges = parse_json(payload)?;
                Ok(Reply::ok(&self.chemicals.update(id, &changes)?))
            }
            ("DELETE", Route::Chemical(id)) => {
                self.chemicals.delete(id)?;
                Ok(Reply::ok(&json!({"message": "Chemical deleted successfully"})))
            }
            ("POST", Route::ChemicalLog(id)) => {
                let new: NewInventoryLog = parse_json(payload)?;
                Ok(Reply::ok(&self.logs.append(id, &new)?))
            }
            ("GET", Route::ChemicalLogs(id)) => Ok(Reply::ok(&self.logs.by_chemical(id)?)),
            ("GET", Route::InventoryLogs) => Ok(Reply::ok(&self.logs.all()?)),
            ("GET", Route::InventoryLog(id)) => Ok(Reply::ok(&self.logs.by_id(id)?)),
            (_, Route::BadId) => Err(StoreError::InvalidInput(
                "Invalid id in path".to_string(),
            )),
            (_, Route::Unknown) => Ok(Reply::detail(404, "Not Found", "Not Found")),
            _ => Ok(Reply::detail(405, "Method Not Allowed", "Method Not Allowed")),
        }
    }
}

impl HttpService for InventoryService {
    fn call(&mut self, req: Request, rsp: &mut Response) -> io::Result<()> {
        let method = req.method().to_owned();
        let path = req.path().to_owned();
        let route = parse_route(&path);

        // Drain the body before replying so a keep-alive connection stays
        // in sync with the request framing.
        let mut payload = Vec::new();
        if matches!(method.as_str(), "POST" | "PUT") {
            req.body().read_to_end(&mut payload)?;
        }

        let reply = self
            .route_request(&method, route, &payload)
            .unwrap_or_else(|err| error_reply(&err));

        log::debug!("{} {} -> {}", method, path, reply.status);
        #[cfg(feature = "metrics")]
        METRICS.record_http_response(reply.status as u16);

        rsp.status_code(reply.status, reply.reason);
        rsp.header(reply.content_type);
        rsp.body_mut().extend_from_slice(&reply.body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;

    #[test]
    fn test_parse_route_core_paths() {
        assert_eq!(parse_route("/"), Route::Root);
        assert_eq!(parse_route("/health"), Route::Health);
        assert_eq!(parse_route("/chemicals/"), Route::Chemicals);
        assert_eq!(parse_route("/chemicals/5"), Route::Chemical(5));
        assert_eq!(parse_route("/chemicals/5/log"), Route::ChemicalLog(5));
        assert_eq!(parse_route("/chemicals/5/logs"), Route::ChemicalLogs(5));
        assert_eq!(parse_route("/inventory-logs/"), Route::InventoryLogs);
        assert_eq!(parse_route("/inventory-logs/12"), Route::InventoryLog(12));
    }

    #[test]
    fn test_parse_route_ignores_query_and_trailing_slash() {
        assert_eq!(parse_route("/chemicals?limit=5"), Route::Chemicals);
        assert_eq!(parse_route("/chemicals/5/"), Route::Chemical(5));
        assert_eq!(parse_route("/chemicals/5/logs/"), Route::ChemicalLogs(5));
    }

    #[test]
    fn test_parse_route_rejects_non_integer_ids() {
        assert_eq!(parse_route("/chemicals/abc"), Route::BadId);
        assert_eq!(parse_route("/chemicals/1.5/log"), Route::BadId);
        assert_eq!(parse_route("/inventory-logs/x"), Route::BadId);
    }

    #[test]
    fn test_parse_route_unknown_paths() {
        assert_eq!(parse_route("/nope"), Route::Unknown);
        assert_eq!(parse_route("/chemicals/1/history"), Route::Unknown);
    }

    #[test]
    fn test_error_reply_status_mapping() {
        let reply = error_reply(&StoreError::NotFound("Chemical"));
        assert_eq!(reply.status, 404);
        assert_eq!(reply.body, br#"{"detail":"Chemical not found"}"#.to_vec());

        let reply = error_reply(&StoreError::InvalidInput("bad".to_string()));
        assert_eq!(reply.status, 400);

        let reply = error_reply(&StoreError::Db(DbError::PoolClosed));
        assert_eq!(reply.status, 500);
        // Internal causes never reach the wire.
        assert_eq!(reply.body, br#"{"detail":"Internal server error"}"#.to_vec());
    }

    #[test]
    fn test_parse_json_reports_invalid_input() {
        let err = parse_json::<NewChemical>(b"not json").unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().starts_with("Invalid request body"));
    }
}
