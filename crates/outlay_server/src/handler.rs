//! Request routing and the three expense operations.
//!
//! Handlers validate the bearer token and decode the body before any
//! lock is taken; store calls then run on the blocking pool under the
//! configured deadline. Success bodies are JSON, error bodies plain
//! text, and every response carries the CORS header set.

use std::sync::Arc;

use http_body_util::{BodyExt, Full, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use outlay_model::Expense;
use outlay_store::{ExpenseStore, StoreResult};
use tracing::{debug, warn};

use crate::auth;
use crate::config::ServerConfig;
use crate::cors;
use crate::error::{ServerError, ServerResult};

/// Shared state for request handling.
pub struct HandlerContext {
    /// Server configuration.
    pub config: ServerConfig,
    /// The token-scoped expense store.
    pub store: Arc<ExpenseStore>,
}

impl HandlerContext {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, store: Arc<ExpenseStore>) -> Self {
        Self { config, store }
    }
}

/// Routes requests to the expense operations.
pub struct RequestHandler {
    context: Arc<HandlerContext>,
}

impl RequestHandler {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }

    /// Dispatches a request and renders the outcome as a response.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        debug!(method = %req.method(), path = req.uri().path(), "request");

        let mut response = if req.method() == Method::OPTIONS {
            cors::preflight()
        } else {
            match (req.method(), req.uri().path()) {
                (&Method::POST, "/sync") => {
                    self.handle_sync(req).await.unwrap_or_else(render_error)
                }
                (&Method::GET, "/expenses") => {
                    self.handle_expenses(req).await.unwrap_or_else(render_error)
                }
                (&Method::DELETE, "/expenses/delete") => {
                    self.handle_delete(req).await.unwrap_or_else(render_error)
                }
                (_, "/sync" | "/expenses" | "/expenses/delete") => {
                    plain_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
                }
                _ => plain_response(StatusCode::NOT_FOUND, "not found"),
            }
        };
        cors::apply(&mut response);
        response
    }

    /// `POST /sync`: full overwrite of the token's collection.
    async fn handle_sync<B>(&self, req: Request<B>) -> ServerResult<Response<Full<Bytes>>>
    where
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let token = auth::bearer_token(&req)?;
        let expenses = self.decode_body(req).await?;

        let store = Arc::clone(&self.context.store);
        self.run_store(move || store.replace_all(&token, &expenses))
            .await?;
        Ok(status_success())
    }

    /// `GET /expenses`: the token's collection in stored order.
    async fn handle_expenses<B>(&self, req: Request<B>) -> ServerResult<Response<Full<Bytes>>> {
        let token = auth::bearer_token(&req)?;

        let store = Arc::clone(&self.context.store);
        let expenses = self.run_store(move || store.load_all(&token)).await?;

        let body = serde_json::to_vec(&expenses)
            .map_err(|err| ServerError::Internal(format!("failed to encode response: {err}")))?;
        Ok(json_response(StatusCode::OK, Bytes::from(body)))
    }

    /// `DELETE /expenses/delete?id=<int>`: drop the matching entry.
    async fn handle_delete<B>(&self, req: Request<B>) -> ServerResult<Response<Full<Bytes>>> {
        let token = auth::bearer_token(&req)?;
        let id = query_param(req.uri().query(), "id")
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServerError::validation("missing expense id"))?;

        let store = Arc::clone(&self.context.store);
        self.run_store(move || store.delete_by_id(&token, &id))
            .await?;
        Ok(status_success())
    }

    /// Decodes the request body as a replacement collection, enforcing
    /// the configured size cap.
    async fn decode_body<B>(&self, req: Request<B>) -> ServerResult<Vec<Expense>>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let limited = Limited::new(req.into_body(), self.context.config.max_body_bytes);
        let bytes = limited
            .collect()
            .await
            .map_err(|err| ServerError::validation(format!("invalid request body: {err}")))?
            .to_bytes();
        serde_json::from_slice(&bytes)
            .map_err(|err| ServerError::validation(format!("invalid request body: {err}")))
    }

    /// Runs a store call on the blocking pool under the configured
    /// deadline.
    ///
    /// On expiry only the response is abandoned; the call itself runs
    /// to completion in the background, so the token's lock is always
    /// released.
    async fn run_store<T, F>(&self, op: F) -> ServerResult<T>
    where
        T: Send + 'static,
        F: FnOnce() -> StoreResult<T> + Send + 'static,
    {
        let deadline = self.context.config.request_timeout;
        let task = tokio::task::spawn_blocking(op);
        match tokio::time::timeout(deadline, task).await {
            Ok(Ok(result)) => Ok(result?),
            Ok(Err(join)) => Err(ServerError::Internal(format!("store task failed: {join}"))),
            Err(_) => Err(ServerError::Timeout(deadline)),
        }
    }
}

/// Returns the first value for `name` in the query string.
fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Canonical success body for the mutating operations.
fn status_success() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        Bytes::from_static(br#"{"status":"success"}"#),
    )
}

fn json_response(status: StatusCode, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn plain_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message.to_owned())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}

/// Renders an error as its mapped status with a plain-text body.
fn render_error(err: ServerError) -> Response<Full<Bytes>> {
    if err.is_server_error() {
        warn!(error = %err, "request failed");
    } else {
        debug!(error = %err, "request rejected");
    }
    plain_response(err.status(), &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hyper::header::{ACCESS_CONTROL_ALLOW_ORIGIN, AUTHORIZATION};
    use outlay_store::StoreDir;
    use tempfile::{tempdir, TempDir};

    fn handler(temp: &TempDir) -> RequestHandler {
        handler_with_config(temp, ServerConfig::default())
    }

    fn handler_with_config(temp: &TempDir, config: ServerConfig) -> RequestHandler {
        let dir = StoreDir::open(temp.path()).unwrap();
        let store = Arc::new(ExpenseStore::new(dir));
        RequestHandler::new(Arc::new(HandlerContext::new(config, store)))
    }

    fn request(
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: &[u8],
    ) -> Request<Full<Bytes>> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder
            .body(Full::new(Bytes::copy_from_slice(body)))
            .unwrap()
    }

    fn expense_json() -> Vec<u8> {
        let expenses = vec![Expense::new(
            1,
            "Coffee",
            3.5,
            "Food",
            Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap(),
        )];
        serde_json::to_vec(&expenses).unwrap()
    }

    async fn body_bytes(response: Response<Full<Bytes>>) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn sync_then_query_returns_the_collection() {
        let temp = tempdir().unwrap();
        let handler = handler(&temp);

        let response = handler
            .handle(request(
                Method::POST,
                "/sync",
                Some("alice"),
                &expense_json(),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(&body_bytes(response).await[..], br#"{"status":"success"}"#);

        let response = handler
            .handle(request(Method::GET, "/expenses", Some("alice"), b""))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let expenses: Vec<Expense> = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].title, "Coffee");
    }

    #[tokio::test]
    async fn missing_auth_is_rejected_without_side_effects() {
        let temp = tempdir().unwrap();
        let handler = handler(&temp);

        for (method, uri) in [
            (Method::POST, "/sync"),
            (Method::GET, "/expenses"),
            (Method::DELETE, "/expenses/delete?id=1"),
        ] {
            let response = handler
                .handle(request(method, uri, None, &expense_json()))
                .await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn traversal_tokens_are_rejected() {
        let temp = tempdir().unwrap();
        let handler = handler(&temp);

        let response = handler
            .handle(request(
                Method::POST,
                "/sync",
                Some("../escape"),
                &expense_json(),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_rejected_before_any_write() {
        let temp = tempdir().unwrap();
        let handler = handler(&temp);

        let response = handler
            .handle(request(Method::POST, "/sync", Some("alice"), b"not json"))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let temp = tempdir().unwrap();
        let handler = handler_with_config(&temp, ServerConfig::default().with_max_body_bytes(8));

        let response = handler
            .handle(request(
                Method::POST,
                "/sync",
                Some("alice"),
                &expense_json(),
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_requires_an_id() {
        let temp = tempdir().unwrap();
        let handler = handler(&temp);

        for uri in ["/expenses/delete", "/expenses/delete?id="] {
            let response = handler
                .handle(request(Method::DELETE, uri, Some("alice"), b""))
                .await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
        }
    }

    #[tokio::test]
    async fn delete_removes_the_entry() {
        let temp = tempdir().unwrap();
        let handler = handler(&temp);
        handler
            .handle(request(
                Method::POST,
                "/sync",
                Some("alice"),
                &expense_json(),
            ))
            .await;

        let response = handler
            .handle(request(
                Method::DELETE,
                "/expenses/delete?id=1",
                Some("alice"),
                b"",
            ))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = handler
            .handle(request(Method::GET, "/expenses", Some("alice"), b""))
            .await;
        assert_eq!(&body_bytes(response).await[..], b"[]");
    }

    #[tokio::test]
    async fn wrong_method_is_405_unknown_path_404() {
        let temp = tempdir().unwrap();
        let handler = handler(&temp);

        let response = handler
            .handle(request(Method::GET, "/sync", Some("alice"), b""))
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = handler
            .handle(request(Method::POST, "/expenses", Some("alice"), b""))
            .await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = handler
            .handle(request(Method::GET, "/nope", Some("alice"), b""))
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn options_preflight_short_circuits() {
        let temp = tempdir().unwrap();
        let handler = handler(&temp);

        let response = handler
            .handle(request(Method::OPTIONS, "/sync", None, b""))
            .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn every_response_carries_cors_headers() {
        let temp = tempdir().unwrap();
        let handler = handler(&temp);

        for (method, uri, token) in [
            (Method::OPTIONS, "/sync", None),
            (Method::GET, "/expenses", Some("alice")),
            (Method::GET, "/expenses", None),
            (Method::GET, "/nope", None),
        ] {
            let response = handler.handle(request(method, uri, token, b"")).await;
            assert_eq!(
                response.headers().get(ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
                "*"
            );
        }
    }

    #[tokio::test]
    async fn corrupt_file_surfaces_as_server_error() {
        let temp = tempdir().unwrap();
        let handler = handler(&temp);
        std::fs::write(temp.path().join("data_alice.json"), b"{broken").unwrap();

        let response = handler
            .handle(request(Method::GET, "/expenses", Some("alice"), b""))
            .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn query_param_picks_the_named_value() {
        assert_eq!(query_param(Some("id=42"), "id").as_deref(), Some("42"));
        assert_eq!(
            query_param(Some("a=1&id=42&b=2"), "id").as_deref(),
            Some("42")
        );
        assert_eq!(query_param(Some("id=a%20b"), "id").as_deref(), Some("a b"));
        assert_eq!(query_param(Some("other=1"), "id"), None);
        assert_eq!(query_param(None, "id"), None);
    }
}
