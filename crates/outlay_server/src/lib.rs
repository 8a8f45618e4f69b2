//! # Outlay Server
//!
//! HTTP boundary for the outlay expense sync service.
//!
//! Three operations, each scoped to the bearer token it carries:
//!
//! | Operation | Method | Path |
//! |-----------|--------|------|
//! | Sync (replace-all) | `POST` | `/sync` |
//! | Query (read-all) | `GET` | `/expenses` |
//! | Delete by id | `DELETE` | `/expenses/delete?id=<int>` |
//!
//! The server is a thin async shell over the synchronous
//! [`outlay_store`] core: hyper dispatches requests, the bearer token
//! is validated into a storage key, and each store call runs on the
//! blocking pool under a deadline. Auth failures map to 401,
//! validation failures to 400, store and timeout failures to 500.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod auth;
mod config;
mod cors;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::{HandlerContext, RequestHandler};
pub use server::SyncServer;
