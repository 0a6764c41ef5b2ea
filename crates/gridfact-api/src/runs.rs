//! Handlers for `/runs` and `/deals/{id}/runs` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/deals/:id/runs` | Body: [`CreateRunBody`]; runs the pipeline, persists, returns 201 + contract |
//! | `GET`  | `/deals/:id/runs` | Run summaries, newest first |
//! | `GET`  | `/runs/:id` | Full contract |
//! | `GET`  | `/runs/:id/report` | Flattened [`ReportRow`]s |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Utc;
use gridfact_core::{
  catalog::FactCatalog,
  contract::{DDContract, DealSnapshot},
  policy::FundPolicySnapshot,
  snippet::{EvidenceSnippet, Provenance},
  store::{ContractStore, RunSummary},
};
use gridfact_engine::{
  RunRequest,
  extract::PatternBootstrapExtractor,
  report::{ReportRow, report_rows},
  retrieval::{NoMarketContext, StaticRetriever},
  run_analysis,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ──────────────────────────────────────────────────────────────────

/// One evidence passage submitted with a run.
#[derive(Debug, Deserialize)]
pub struct SnippetBody {
  pub text:        String,
  pub source:      String,
  pub document_id: Option<String>,
  #[serde(default)]
  pub query:       String,
  #[serde(default = "default_relevance")]
  pub relevance:   f64,
}

fn default_relevance() -> f64 { 0.5 }

/// JSON body accepted by `POST /deals/:id/runs`.
#[derive(Debug, Deserialize)]
pub struct CreateRunBody {
  pub name:      String,
  pub deal_type: Option<String>,
  pub country:   Option<String>,
  pub snippets:  Vec<SnippetBody>,
  /// Policy snapshot to gate against; defaults to the fund's standard
  /// policy when omitted.
  pub policy:    Option<FundPolicySnapshot>,
}

/// `POST /deals/:id/runs` — returns 201 + the persisted contract.
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Path(deal_id): Path<Uuid>,
  Json(body): Json<CreateRunBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ContractStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("deal name must not be empty".into()));
  }

  let snippets: Vec<EvidenceSnippet> = body
    .snippets
    .into_iter()
    .map(|s| {
      EvidenceSnippet::new(s.text, Provenance {
        document_id: s.document_id,
        source:      s.source,
        query:       s.query,
        relevance:   s.relevance,
      })
    })
    .collect();

  let deal = DealSnapshot {
    deal_id,
    name: body.name,
    deal_type: body.deal_type,
    country: body.country,
  };
  let policy = body
    .policy
    .unwrap_or_else(|| FundPolicySnapshot::default_policy(Utc::now()));

  let contract = run_analysis(
    &StaticRetriever::new(snippets),
    &PatternBootstrapExtractor,
    None::<&NoMarketContext>,
    &FactCatalog::standard(),
    RunRequest::new(deal, policy),
  )
  .await;

  store
    .persist_run(deal_id, contract.clone())
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;

  Ok((StatusCode::CREATED, Json(contract)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /runs/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DDContract>, ApiError>
where
  S: ContractStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let contract = store
    .get_run(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("run {id} not found")))?;
  Ok(Json(contract))
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /deals/:id/runs`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Path(deal_id): Path<Uuid>,
) -> Result<Json<Vec<RunSummary>>, ApiError>
where
  S: ContractStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let runs = store
    .list_runs(deal_id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(runs))
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// `GET /runs/:id/report`
pub async fn report<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<ReportRow>>, ApiError>
where
  S: ContractStore,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  let contract = store
    .get_run(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("run {id} not found")))?;
  Ok(Json(report_rows(&contract, &FactCatalog::standard())))
}
