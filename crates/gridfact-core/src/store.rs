//! The `ContractStore` trait and supporting summary types.
//!
//! The trait is implemented by storage backends (e.g.
//! `gridfact-store-sqlite`). Higher layers (`gridfact-api`, `gridfact-cli`)
//! depend on this abstraction, not on any concrete backend.
//!
//! Runs are append-only audit artifacts: FAILED runs are persisted exactly
//! like successful ones and are never dropped silently.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::{DDContract, Decision, RunStatus};

// ─── Summary type ────────────────────────────────────────────────────────────

/// Lightweight listing row; the full contract is fetched separately.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RunSummary {
  pub run_id:           Uuid,
  pub deal_id:          Uuid,
  pub created_at:       DateTime<Utc>,
  pub status:           RunStatus,
  /// Absent on FAILED runs that never reached a decision.
  pub decision:         Option<Decision>,
  pub overall_score:    Option<u8>,
  pub contract_version: String,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a run-persistence backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ContractStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a finished run. Every run is stored, FAILED included.
  fn persist_run(
    &self,
    deal_id: Uuid,
    contract: DDContract,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Fetch a full contract by run id. Returns `None` if not found.
  fn get_run(
    &self,
    run_id: Uuid,
  ) -> impl Future<Output = Result<Option<DDContract>, Self::Error>> + Send + '_;

  /// List run summaries for a deal, newest first.
  fn list_runs(
    &self,
    deal_id: Uuid,
  ) -> impl Future<Output = Result<Vec<RunSummary>, Self::Error>> + Send + '_;
}
