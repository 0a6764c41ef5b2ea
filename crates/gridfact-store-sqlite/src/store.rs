//! [`SqliteStore`] — the SQLite implementation of [`ContractStore`].

use std::path::Path;

use gridfact_core::{
  contract::{DDContract, RunStatus},
  store::{ContractStore, RunSummary},
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{
    RawRunSummary, encode_decision, encode_dt, encode_status, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A gridfact run store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn run_exists(&self, run_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(run_id);
    let exists = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM runs WHERE run_id = ?1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        Ok(exists)
      })
      .await?;
    Ok(exists)
  }
}

// ─── ContractStore impl ──────────────────────────────────────────────────────

impl ContractStore for SqliteStore {
  type Error = Error;

  async fn persist_run(
    &self,
    deal_id: Uuid,
    contract: DDContract,
  ) -> Result<()> {
    if self.run_exists(contract.run.run_id).await? {
      return Err(Error::DuplicateRun(contract.run.run_id));
    }

    // Summary columns for FAILED runs stay NULL: they never reached a
    // decision the listing should advertise.
    let failed = contract.run.status == RunStatus::Failed;
    let run_id = encode_uuid(contract.run.run_id);
    let deal_id = encode_uuid(deal_id);
    let created_at = encode_dt(contract.run.created_at);
    let status = encode_status(contract.run.status);
    let decision = (!failed)
      .then(|| encode_decision(contract.scoring.gate_result.decision));
    let overall_score =
      (!failed).then_some(contract.scoring.overall_score as i64);
    let contract_version = contract.contract_version.clone();
    let error = contract.run.error.clone();
    let contract_json = serde_json::to_string(&contract)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO runs (run_id, deal_id, created_at, status, decision,
                             overall_score, contract_version, error,
                             contract_json)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            run_id,
            deal_id,
            created_at,
            status,
            decision,
            overall_score,
            contract_version,
            error,
            contract_json,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_run(&self, run_id: Uuid) -> Result<Option<DDContract>> {
    let id_str = encode_uuid(run_id);
    let json: Option<String> = self
      .conn
      .call(move |conn| {
        let json = conn
          .query_row(
            "SELECT contract_json FROM runs WHERE run_id = ?1",
            rusqlite::params![id_str],
            |r| r.get(0),
          )
          .optional()?;
        Ok(json)
      })
      .await?;

    json.map(|j| serde_json::from_str(&j)).transpose().map_err(Error::Json)
  }

  async fn list_runs(&self, deal_id: Uuid) -> Result<Vec<RunSummary>> {
    let id_str = encode_uuid(deal_id);
    let raw: Vec<RawRunSummary> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT run_id, deal_id, created_at, status, decision,
                  overall_score, contract_version
           FROM runs
           WHERE deal_id = ?1
           ORDER BY created_at DESC, run_id DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |r| {
            Ok(RawRunSummary {
              run_id:           r.get(0)?,
              deal_id:          r.get(1)?,
              created_at:       r.get(2)?,
              status:           r.get(3)?,
              decision:         r.get(4)?,
              overall_score:    r.get(5)?,
              contract_version: r.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raw.into_iter().map(RawRunSummary::into_summary).collect()
  }
}
