//! Per-request context — the request plus the in-progress response.
//!
//! Middleware in this crate receives a [`Context`] and either terminates the
//! request by returning [`Context::into_response`], or delegates by passing
//! the context to the next pipeline stage. The response travels *with* the
//! request so that earlier stages can seed status and validator headers that
//! later stages (e.g. the freshness check) observe and mutate.

use crate::http::{Request, Response, StatusCode};

/// Per-request state threaded through the middleware pipeline.
///
/// Created once per dispatch from a parsed [`Request`]; the response starts
/// as an empty `200 OK` scaffold. Nothing survives across requests.
pub struct Context {
    request: Request,
    response: Response,
}

impl Context {
    /// Creates a context with an empty `200 OK` response scaffold.
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: Response::new(StatusCode::Ok),
        }
    }

    /// Creates a context with a pre-seeded response, for pipelines where an
    /// earlier stage has already set status or validator headers.
    pub fn with_response(request: Request, response: Response) -> Self {
        Self { request, response }
    }

    /// Returns the request.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Returns the in-progress response.
    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Returns the in-progress response for mutation.
    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    /// Consumes the context, yielding the response as it currently stands.
    /// Terminal operation for a middleware that handles the request itself.
    pub fn into_response(self) -> Response {
        self.response
    }

    /// Deserializes the request body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(self.request.body())
    }
}
