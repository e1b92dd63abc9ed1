//! Blocking client core for a remote task-list service.
//!
//! # Overview
//! Issues authenticated calls against the service's list and task resources
//! and keeps an in-memory mirror of them for local queries.
//!
//! # Design
//! - `RequestBuilder` produces inert `HttpRequest` descriptors; it never
//!   touches the network and takes "now" from an injected clock.
//! - `Dispatcher` sends one descriptor, or many as a single sequential batch,
//!   through a `Transport`. A 404 is retried once; batches fail fast.
//! - `LocalStore` mirrors lists and tasks. `TaskClient::update_lists` rebuilds
//!   it from one batched fetch and swaps it in atomically; the mutation
//!   operations change it only after the service acknowledged the change.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod model;
mod ops;
pub mod requests;
pub mod store;
mod sync;
pub mod transport;
pub mod types;

#[cfg(test)]
mod test_support;

pub use client::TaskClient;
pub use config::ClientConfig;
pub use dispatch::{BatchResults, Dispatcher};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use model::{Task, TaskList, INBOX_ID};
pub use requests::RequestBuilder;
pub use store::LocalStore;
pub use transport::{Transport, UreqTransport};
pub use types::NewTask;
