//! Contract assembly and final schema validation.
//!
//! The assembler is the only place a [`DDContract`] is constructed. It runs
//! [`DDContract::validate`] before accepting the result; a validation
//! failure downgrades the run to FAILED but the contract is still returned
//! (and persisted) with the error text preserved verbatim.

use chrono::{DateTime, Utc};
use gridfact_core::{
  catalog::ArtifactKind,
  contract::{
    CONTRACT_VERSION, Checklist, DDContract, DealSnapshot, EnergisationCurve,
    EvidenceBundle, HardGateResult, MarketContext, RunMeta, RunStatus,
    Scoring,
  },
  fact::{Contradiction, ContradictionWarning, FactValue},
  policy::FundPolicySnapshot,
  snippet::EvidenceSnippet,
};
use uuid::Uuid;

use crate::scorer::ScoringRollup;

/// Everything the pipeline produced, handed over for assembly.
pub struct AssemblyParts {
  pub deal:                DealSnapshot,
  pub policy:              FundPolicySnapshot,
  pub snippets:            Vec<EvidenceSnippet>,
  pub facts:               std::collections::BTreeMap<String, FactValue>,
  pub contradictions:      Vec<Contradiction>,
  pub warnings:            Vec<ContradictionWarning>,
  pub requested_artifacts: Vec<ArtifactKind>,
  pub gate_result:         HardGateResult,
  pub rollup:              ScoringRollup,
  pub curve:               EnergisationCurve,
  pub checklist:           Checklist,
  pub market:              Option<MarketContext>,
  /// Set when a collaborator failed and the run proceeded on partial
  /// evidence.
  pub degraded:            bool,
}

/// Assemble and validate the run contract.
pub fn assemble(
  run_id: Uuid,
  created_at: DateTime<Utc>,
  parts: AssemblyParts,
) -> DDContract {
  let status = if parts.degraded {
    RunStatus::Partial
  } else {
    RunStatus::Success
  };

  let mut contract = DDContract {
    contract_version: CONTRACT_VERSION.to_owned(),
    run:              RunMeta {
      run_id,
      created_at,
      status,
      error: None,
    },
    deal:             parts.deal,
    policy:           parts.policy,
    evidence:         EvidenceBundle {
      snippets:            parts.snippets,
      facts:               parts.facts,
      contradictions:      parts.contradictions,
      warnings:            parts.warnings,
      requested_artifacts: parts.requested_artifacts,
    },
    scoring:          Scoring {
      gate_result:    parts.gate_result,
      scorecards:     parts.rollup.scorecards,
      overall_score:  parts.rollup.overall_score,
      overall_status: parts.rollup.overall_status,
      curve:          parts.curve,
    },
    checklist:        parts.checklist,
    market:           parts.market,
  };

  if let Err(err) = contract.validate() {
    tracing::error!(%run_id, error = %err, "contract failed schema validation");
    contract.run.status = RunStatus::Failed;
    contract.run.error = Some(err.to_string());
  }

  contract
}

// ─── Tests ───────────────────────────────────────────────────────────────────
