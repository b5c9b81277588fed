//! Request dispatch for a hosting environment
//!
//! The host speaks a small JSON protocol: each request names an operation,
//! a resource and, where relevant, an element. Every request yields exactly
//! one [`Response`], either `ok` with optional data or `error` with a code
//! and message.
//!
//! ```json
//! {"op": "list", "resource": "renderers", "offset": 0, "limit": 10}
//! {"op": "update", "resource": "renderers", "element": "r-1", "payload": {"state": "play"}}
//! ```

use element_store::Page;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ErrorCode, Result, ServiceError};
use crate::service::MediaService;

/// A single host request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Request {
    Get {
        resource: String,
        element: String,
    },
    List {
        resource: String,
        #[serde(default)]
        offset: Option<i64>,
        #[serde(default)]
        limit: Option<i64>,
    },
    Create {
        resource: String,
        #[serde(default)]
        payload: Value,
    },
    Delete {
        resource: String,
        element: String,
    },
    Update {
        resource: String,
        element: String,
        #[serde(default)]
        payload: Value,
    },
}

impl Request {
    fn resource(&self) -> &str {
        match self {
            Request::Get { resource, .. }
            | Request::List { resource, .. }
            | Request::Create { resource, .. }
            | Request::Delete { resource, .. }
            | Request::Update { resource, .. } => resource,
        }
    }

    fn op(&self) -> &'static str {
        match self {
            Request::Get { .. } => "get",
            Request::List { .. } => "list",
            Request::Create { .. } => "create",
            Request::Delete { .. } => "delete",
            Request::Update { .. } => "update",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Outcome of a request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Response {
    /// Success without data
    pub fn ok() -> Self {
        Self {
            status: Status::Ok,
            data: None,
            code: None,
            message: None,
        }
    }

    pub fn ok_with(data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::ok()
        }
    }

    pub fn error(err: &ServiceError) -> Self {
        Self {
            status: Status::Error,
            data: None,
            code: Some(err.code()),
            message: Some(err.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

impl MediaService {
    /// Serve one request
    pub fn handle(&self, request: Request) -> Response {
        let op = request.op();
        let resource = request.resource().to_string();

        match self.dispatch(request) {
            Ok(response) => {
                debug!(op, resource = %resource, "Request served");
                response
            }
            Err(e) => {
                debug!(op, resource = %resource, code = ?e.code(), "Request failed: {}", e);
                Response::error(&e)
            }
        }
    }

    /// Decode and serve a raw JSON request
    pub fn handle_value(&self, request: Value) -> Response {
        match serde_json::from_value::<Request>(request) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!("Malformed request: {}", e);
                Response::error(&ServiceError::Validation(format!("malformed request: {}", e)))
            }
        }
    }

    fn dispatch(&self, request: Request) -> Result<Response> {
        match request {
            Request::Get { resource, element } => {
                let data = self.resource_by_name(&resource)?.get_element(&element)?;
                Ok(Response::ok_with(data))
            }
            Request::List {
                resource,
                offset,
                limit,
            } => {
                let page = Page::from_signed(offset, limit);
                let elements = self.resource_by_name(&resource)?.list_elements(page)?;
                Ok(Response::ok_with(Value::Array(elements)))
            }
            Request::Create { resource, payload } => {
                let created = self.resource_by_name(&resource)?.create_element(payload)?;
                Ok(Response::ok_with(created))
            }
            Request::Delete { resource, element } => {
                self.resource_by_name(&resource)?.delete_element(&element)?;
                Ok(Response::ok())
            }
            Request::Update {
                resource,
                element,
                payload,
            } => {
                self.resource_by_name(&resource)?
                    .update_element(&element, payload)?;
                Ok(Response::ok())
            }
        }
    }
}
