//! The due-diligence contract — the frozen, versioned output of a run.
//!
//! A [`DDContract`] exclusively owns everything nested beneath it and is
//! never mutated after assembly. `contract_version` is a literal
//! compatibility tag bumped on any breaking shape change; consumers must
//! branch on or reject unknown versions rather than assume shape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::{ArtifactKind, Module},
  fact::{Contradiction, ContradictionWarning, FactValue},
  policy::FundPolicySnapshot,
  snippet::{EvidenceSnippet, SnippetId},
};

/// Wire-compatibility tag for the contract shape.
pub const CONTRACT_VERSION: &str = "dd.v1";

// ─── Decision ────────────────────────────────────────────────────────────────

/// The hard-gate decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
  Go,
  Hold,
  NoGo,
}

/// How one gate resolved. `Unknown` means the driving fact had no usable
/// evidence: it never passes the gate, but it feeds the HOLD rule instead
/// of forcing NO_GO outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOutcome {
  Pass,
  Fail,
  Unknown,
}

/// One gate's evaluation, auditable down to source snippets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateEvaluation {
  /// Stable gate identifier, e.g. `"min_grid_title_level"`.
  pub gate:      String,
  pub outcome:   GateOutcome,
  pub reason:    String,
  /// Citations of the fact(s) that drove this gate.
  pub citations: Vec<SnippetId>,
}

/// The policy engine's output: decision plus ordered, cited reasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardGateResult {
  pub decision:    Decision,
  pub evaluations: Vec<GateEvaluation>,
  /// Ordered reasons behind the decision, one line each.
  pub reasons:     Vec<String>,
}

// ─── Scorecards ──────────────────────────────────────────────────────────────

/// Coverage status of a module. Variant order: most conservative last, so
/// `max` picks the most conservative of a set.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ModuleStatus {
  Verified,
  Partial,
  Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleScorecardEntry {
  pub module:    Module,
  pub status:    ModuleStatus,
  /// 0–100.
  pub score:     u8,
  pub rationale: String,
  pub citations: Vec<SnippetId>,
}

// ─── Energization curve ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
  pub horizon_months: u8,
  /// In [0, 1].
  pub probability:    f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLabel {
  High,
  Medium,
  Low,
}

/// Heuristic readiness projection. Deterministic, not statistical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergisationCurve {
  /// Ordered by horizon, ascending.
  pub points:         Vec<CurvePoint>,
  pub drivers:        Vec<String>,
  pub risks:          Vec<String>,
  pub narrative_base: String,
  pub narrative_bear: String,
  pub narrative_bull: String,
  pub confidence:     ConfidenceLabel,
}

// ─── Checklist ───────────────────────────────────────────────────────────────

/// Urgency of the connection-queue timeline.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TimelineRisk {
  Low,
  Medium,
  High,
  Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistItem {
  /// The fact this item asks evidence for, if fact-specific.
  pub fact_code:          Option<String>,
  pub title:              String,
  pub detail:             String,
  pub requested_artifact: Option<ArtifactKind>,
  /// `true` when the item blocks a hard gate.
  pub blocking:           bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checklist {
  pub items:         Vec<ChecklistItem>,
  pub timeline_risk: TimelineRisk,
}

// ─── Run metadata ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Success,
  /// Completed, but with degraded evidence (collaborator failures).
  Partial,
  Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
  pub run_id:     Uuid,
  pub created_at: DateTime<Utc>,
  pub status:     RunStatus,
  /// Original error text, preserved verbatim on FAILED runs.
  pub error:      Option<String>,
}

/// The deal under evaluation, frozen at run start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealSnapshot {
  pub deal_id:   Uuid,
  pub name:      String,
  pub deal_type: Option<String>,
  pub country:   Option<String>,
}

// ─── Evidence and scoring bundles ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBundle {
  pub snippets:       Vec<EvidenceSnippet>,
  /// Keyed 1:1 by catalog code.
  pub facts:          BTreeMap<String, FactValue>,
  pub contradictions: Vec<Contradiction>,
  pub warnings:       Vec<ContradictionWarning>,
  /// Artifact kinds the checklist asks for.
  pub requested_artifacts: Vec<ArtifactKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scoring {
  pub gate_result:    HardGateResult,
  pub scorecards:     Vec<ModuleScorecardEntry>,
  /// 0–100 weighted rollup.
  pub overall_score:  u8,
  pub overall_status: ModuleStatus,
  pub curve:          EnergisationCurve,
}

/// Regional market color, sourced from an optional collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketContext {
  pub region:             String,
  pub spot_price_eur_mwh: Option<f64>,
  pub colo_vacancy_pct:   Option<f64>,
  #[serde(default)]
  pub notes:              Vec<String>,
}

// ─── DDContract ──────────────────────────────────────────────────────────────

/// The aggregate run result. Immutable once assembled and validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DDContract {
  pub contract_version: String,
  pub run:      RunMeta,
  pub deal:     DealSnapshot,
  pub policy:   FundPolicySnapshot,
  pub evidence: EvidenceBundle,
  pub scoring:  Scoring,
  pub checklist: Checklist,
  pub market:   Option<MarketContext>,
}

impl DDContract {
  /// Schema validation run by the assembler before a contract is accepted.
  ///
  /// Checks the version tag, policy weights, score and probability ranges,
  /// contradiction shape, and full citation integrity. The error message is
  /// preserved verbatim on the FAILED run.
  pub fn validate(&self) -> Result<()> {
    if self.contract_version != CONTRACT_VERSION {
      return Err(Error::SchemaValidation(format!(
        "unknown contract_version {:?}, expected {CONTRACT_VERSION:?}",
        self.contract_version
      )));
    }

    self.policy.validate()?;

    let known: std::collections::BTreeSet<SnippetId> =
      self.evidence.snippets.iter().map(|s| s.id.clone()).collect();

    for (code, fact) in &self.evidence.facts {
      if code != &fact.code {
        return Err(Error::SchemaValidation(format!(
          "fact map key {code:?} does not match fact code {:?}",
          fact.code
        )));
      }
      fact
        .check_integrity(&known)
        .map_err(Error::SchemaValidation)?;
    }

    for c in &self.evidence.contradictions {
      if c.candidates.len() < 2 {
        return Err(Error::SchemaValidation(format!(
          "contradiction on {:?} has fewer than two candidates",
          c.fact_code
        )));
      }
    }

    for entry in &self.scoring.scorecards {
      if entry.score > 100 {
        return Err(Error::SchemaValidation(format!(
          "module {:?} score {} out of range",
          entry.module, entry.score
        )));
      }
    }
    if self.scoring.overall_score > 100 {
      return Err(Error::SchemaValidation(format!(
        "overall score {} out of range",
        self.scoring.overall_score
      )));
    }

    for point in &self.scoring.curve.points {
      if !(0.0..=1.0).contains(&point.probability) {
        return Err(Error::SchemaValidation(format!(
          "curve probability {} at {}m out of [0,1]",
          point.probability, point.horizon_months
        )));
      }
    }

    Ok(())
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn module_status_max_is_most_conservative() {
    let statuses = [ModuleStatus::Verified, ModuleStatus::Partial];
    assert_eq!(
      statuses.into_iter().max().unwrap(),
      ModuleStatus::Partial
    );
    let statuses = [ModuleStatus::Unknown, ModuleStatus::Verified];
    assert_eq!(statuses.into_iter().max().unwrap(), ModuleStatus::Unknown);
  }

  #[test]
  fn decision_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&Decision::NoGo).unwrap(), "\"no_go\"");
    assert_eq!(serde_json::to_string(&Decision::Go).unwrap(), "\"go\"");
  }
}
