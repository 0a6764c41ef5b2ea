//! JSON REST API for gridfact.
//!
//! Exposes an axum [`Router`] backed by any
//! [`gridfact_core::store::ContractStore`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", gridfact_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod runs;

use std::sync::Arc;

use axum::{
  Router,
  routing::get,
};
use gridfact_core::store::ContractStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: ContractStore + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    .route(
      "/deals/{deal_id}/runs",
      get(runs::list::<S>).post(runs::create::<S>),
    )
    .route("/runs/{id}", get(runs::get_one::<S>))
    .route("/runs/{id}/report", get(runs::report::<S>))
    .with_state(store)
}
