//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, enums as their snake_case wire names, and the contract itself as
//! one JSON blob.

use chrono::{DateTime, Utc};
use gridfact_core::{
  contract::{Decision, RunStatus},
  store::RunSummary,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── RunStatus ───────────────────────────────────────────────────────────────

pub fn encode_status(s: RunStatus) -> &'static str {
  match s {
    RunStatus::Success => "success",
    RunStatus::Partial => "partial",
    RunStatus::Failed => "failed",
  }
}

pub fn decode_status(s: &str) -> Result<RunStatus> {
  match s {
    "success" => Ok(RunStatus::Success),
    "partial" => Ok(RunStatus::Partial),
    "failed" => Ok(RunStatus::Failed),
    other => Err(Error::UnknownEncoding(format!("run status: {other:?}"))),
  }
}

// ─── Decision ────────────────────────────────────────────────────────────────

pub fn encode_decision(d: Decision) -> &'static str {
  match d {
    Decision::Go => "go",
    Decision::Hold => "hold",
    Decision::NoGo => "no_go",
  }
}

pub fn decode_decision(s: &str) -> Result<Decision> {
  match s {
    "go" => Ok(Decision::Go),
    "hold" => Ok(Decision::Hold),
    "no_go" => Ok(Decision::NoGo),
    other => Err(Error::UnknownEncoding(format!("decision: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `runs` row, minus the contract blob.
pub struct RawRunSummary {
  pub run_id:           String,
  pub deal_id:          String,
  pub created_at:       String,
  pub status:           String,
  pub decision:         Option<String>,
  pub overall_score:    Option<i64>,
  pub contract_version: String,
}

impl RawRunSummary {
  pub fn into_summary(self) -> Result<RunSummary> {
    Ok(RunSummary {
      run_id:           decode_uuid(&self.run_id)?,
      deal_id:          decode_uuid(&self.deal_id)?,
      created_at:       decode_dt(&self.created_at)?,
      status:           decode_status(&self.status)?,
      decision:         self
        .decision
        .as_deref()
        .map(decode_decision)
        .transpose()?,
      overall_score:    self.overall_score.map(|s| s as u8),
      contract_version: self.contract_version,
    })
  }
}
