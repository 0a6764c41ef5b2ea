//! Flattened report export.
//!
//! Turns a contract into per-fact rows ordered by module, then code, plus a
//! markdown rendering for the CLI and the report endpoint. Rows are a pure
//! projection of the contract; nothing here re-evaluates anything.

use gridfact_core::{
  catalog::{FactCatalog, Module},
  contract::DDContract,
  fact::EvidenceTier,
  snippet::SnippetId,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// One fact, flattened for tabular export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
  pub module:       Module,
  pub fact_code:    String,
  /// Display rendering of the value; `None` when the fact is unknown.
  pub value:        Option<String>,
  pub unit:         Option<String>,
  pub tier:         EvidenceTier,
  pub citations:    Vec<SnippetId>,
  pub contradicted: bool,
}

/// Flatten the contract's facts into rows, ordered by module then code.
pub fn report_rows(
  contract: &DDContract,
  catalog: &FactCatalog,
) -> Vec<ReportRow> {
  let contradicted: std::collections::BTreeSet<&str> = contract
    .evidence
    .contradictions
    .iter()
    .map(|c| c.fact_code.as_str())
    .collect();

  let mut rows = Vec::new();
  for module in Module::iter() {
    let mut defs = catalog.by_module(module);
    defs.sort_by_key(|d| d.code);
    for def in defs {
      let Some(fact) = contract.evidence.facts.get(def.code) else {
        continue;
      };
      rows.push(ReportRow {
        module,
        fact_code: def.code.to_owned(),
        value: fact.value.as_ref().map(|v| v.display()),
        unit: fact.unit.clone(),
        tier: fact.tier,
        citations: fact.citations.clone(),
        contradicted: contradicted.contains(def.code),
      });
    }
  }
  rows
}

/// Render the contract as a markdown report.
pub fn render_markdown(contract: &DDContract, catalog: &FactCatalog) -> String {
  use std::fmt::Write;

  let mut out = String::new();
  // Writing to a String cannot fail; ignore the fmt plumbing.
  let _ = writeln!(out, "# Due diligence: {}", contract.deal.name);
  let _ = writeln!(out);
  let _ = writeln!(
    out,
    "- Decision: **{:?}**",
    contract.scoring.gate_result.decision
  );
  let _ = writeln!(out, "- Overall score: {}/100", contract.scoring.overall_score);
  let _ = writeln!(out, "- Run status: {:?}", contract.run.status);
  let _ = writeln!(
    out,
    "- Timeline risk: {:?}",
    contract.checklist.timeline_risk
  );
  let _ = writeln!(out);

  let _ = writeln!(out, "## Decision rationale");
  for reason in &contract.scoring.gate_result.reasons {
    let _ = writeln!(out, "- {reason}");
  }
  let _ = writeln!(out);

  let _ = writeln!(out, "## Module scores");
  for entry in &contract.scoring.scorecards {
    let _ = writeln!(
      out,
      "- {}: {}/100 ({:?}) — {}",
      entry.module.label(),
      entry.score,
      entry.status,
      entry.rationale
    );
  }
  let _ = writeln!(out);

  let _ = writeln!(out, "## Facts");
  let _ = writeln!(out, "| Module | Fact | Value | Tier | Cited |");
  let _ = writeln!(out, "|---|---|---|---|---|");
  for row in report_rows(contract, catalog) {
    let _ = writeln!(
      out,
      "| {} | {} | {} | {:?} | {} |",
      row.module.label(),
      row.fact_code,
      row.value.as_deref().unwrap_or("—"),
      row.tier,
      row.citations.len()
    );
  }
  let _ = writeln!(out);

  if !contract.evidence.contradictions.is_empty() {
    let _ = writeln!(out, "## Contradictions");
    for c in &contract.evidence.contradictions {
      let _ = writeln!(out, "- [{:?}] {}: {}", c.severity, c.fact_code, c.description);
    }
    let _ = writeln!(out);
  }

  let _ = writeln!(out, "## Outstanding checklist");
  for item in &contract.checklist.items {
    let marker = if item.blocking { "(blocking) " } else { "" };
    let _ = writeln!(out, "- {marker}{}: {}", item.title, item.detail);
  }

  out
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use gridfact_core::{
    catalog::codes,
    contract::{
      CONTRACT_VERSION, Checklist, ConfidenceLabel, DealSnapshot, Decision,
      EnergisationCurve, EvidenceBundle, HardGateResult, RunMeta, RunStatus,
      Scoring, TimelineRisk,
    },
    fact::Value,
    policy::FundPolicySnapshot,
  };
  use uuid::Uuid;

  use super::*;
  use crate::extract::empty_facts;

  fn minimal_contract(catalog: &FactCatalog) -> DDContract {
    let mut facts = empty_facts(catalog);
    if let Some(fact) = facts.get_mut(codes::RESERVED_MW) {
      fact.value = Some(Value::Number(24.0));
      fact.citations =
        vec![gridfact_core::snippet::SnippetId("abc123".into())];
    }

    DDContract {
      contract_version: CONTRACT_VERSION.to_owned(),
      run: RunMeta {
        run_id:     Uuid::nil(),
        created_at: Utc::now(),
        status:     RunStatus::Success,
        error:      None,
      },
      deal: DealSnapshot {
        deal_id:   Uuid::nil(),
        name:      "Test Site".into(),
        deal_type: None,
        country:   None,
      },
      policy: FundPolicySnapshot::default_policy(Utc::now()),
      evidence: EvidenceBundle {
        snippets: Vec::new(),
        facts,
        contradictions: Vec::new(),
        warnings: Vec::new(),
        requested_artifacts: Vec::new(),
      },
      scoring: Scoring {
        gate_result:    HardGateResult {
          decision:    Decision::Hold,
          evaluations: Vec::new(),
          reasons:     vec!["insufficient evidence".into()],
        },
        scorecards:     Vec::new(),
        overall_score:  12,
        overall_status: gridfact_core::contract::ModuleStatus::Unknown,
        curve:          EnergisationCurve {
          points:         Vec::new(),
          drivers:        Vec::new(),
          risks:          Vec::new(),
          narrative_base: String::new(),
          narrative_bear: String::new(),
          narrative_bull: String::new(),
          confidence:     ConfidenceLabel::Low,
        },
      },
      checklist: Checklist {
        items:         Vec::new(),
        timeline_risk: TimelineRisk::Low,
      },
      market: None,
    }
  }

  #[test]
  fn rows_cover_every_fact_in_module_then_code_order() {
    let catalog = FactCatalog::standard();
    let rows = report_rows(&minimal_contract(&catalog), &catalog);
    assert_eq!(rows.len(), catalog.len());

    // Module blocks are contiguous and codes sorted within each.
    let mut seen = Vec::new();
    for pair in rows.windows(2) {
      if pair[0].module == pair[1].module {
        assert!(pair[0].fact_code < pair[1].fact_code);
      } else {
        assert!(!seen.contains(&pair[1].module));
        seen.push(pair[0].module);
      }
    }
  }

  #[test]
  fn known_value_renders_and_unknown_stays_none() {
    let catalog = FactCatalog::standard();
    let rows = report_rows(&minimal_contract(&catalog), &catalog);
    let reserved =
      rows.iter().find(|r| r.fact_code == codes::RESERVED_MW).unwrap();
    assert_eq!(reserved.value.as_deref(), Some("24"));
    let firmness =
      rows.iter().find(|r| r.fact_code == codes::FIRMNESS).unwrap();
    assert_eq!(firmness.value, None);
  }

  #[test]
  fn markdown_carries_decision_and_fact_table() {
    let catalog = FactCatalog::standard();
    let md = render_markdown(&minimal_contract(&catalog), &catalog);
    assert!(md.contains("Decision: **Hold**"));
    assert!(md.contains("| Power & Grid | reserved_mw | 24 |"));
    assert!(md.contains("insufficient evidence"));
  }
}
