//! In-memory transport.
//!
//! Serves canned responses keyed by request path and records every request
//! it sees. Unrouted paths answer 404. Only built for tests, or for host
//! test suites through the `test-util` feature.

use std::fmt;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use super::{path_of, Method, Request, Response, Transport};
use crate::error::TransportError;

#[derive(Debug, Clone)]
enum Reply {
    Respond { status: u16, body: String },
    Fail { message: String },
}

#[derive(Debug, Clone)]
struct Route {
    method: Option<Method>,
    path: String,
    reply: Reply,
}

#[derive(Default)]
pub struct RecordingTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<Request>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer any request for `path` with `status` and `body`. Later routes
    /// for the same path take precedence.
    pub fn respond(&self, path: &str, status: u16, body: impl Into<String>) -> &Self {
        self.push(None, path, Reply::Respond {
            status,
            body: body.into(),
        })
    }

    /// Like [`respond`](Self::respond) but only for `method`.
    pub fn respond_to(&self, method: Method, path: &str, status: u16, body: impl Into<String>) -> &Self {
        self.push(Some(method), path, Reply::Respond {
            status,
            body: body.into(),
        })
    }

    /// Fail every request for `path` at the transport level.
    pub fn fail(&self, path: &str, message: impl Into<String>) -> &Self {
        self.push(None, path, Reply::Fail {
            message: message.into(),
        })
    }

    fn push(&self, method: Option<Method>, path: &str, reply: Reply) -> &Self {
        self.routes.lock().push(Route {
            method,
            path: path.to_string(),
            reply,
        });
        self
    }

    /// Every request seen so far, oldest first.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Requests whose path is exactly `path`.
    pub fn requests_to(&self, path: &str) -> Vec<Request> {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.path() == path)
            .cloned()
            .collect()
    }

    fn reply_for(&self, request: &Request) -> Option<Reply> {
        let path = path_of(&request.url);
        self.routes
            .lock()
            .iter()
            .rev()
            .find(|route| route.path == path && route.method.map_or(true, |m| m == request.method))
            .map(|route| route.reply.clone())
    }
}

impl Transport for RecordingTransport {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>> {
        Box::pin(async move {
            self.requests.lock().push(request.clone());
            match self.reply_for(&request) {
                Some(Reply::Respond { status, body }) => Ok(Response::new(request.url, status, body)),
                Some(Reply::Fail { message }) => Err(TransportError::Failed {
                    url: request.url,
                    message,
                }),
                None => Ok(Response::new(request.url, 404, "")),
            }
        })
    }
}

impl fmt::Debug for RecordingTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingTransport")
            .field("routes", &self.routes.lock().len())
            .field("requests", &self.requests.lock().len())
            .finish()
    }
}
