//! The module scorer — aggregates per-module facts into 0–100 scores and
//! coverage statuses, and rolls up the weighted overall score.
//!
//! Per fact: a cited value earns a base amount, the evidence tier earns a
//! small bonus, and qualitative facts earn a graded amount by tier (firm
//! vs. non-firm, freehold vs. option, ...). Absence earns zero. The module
//! sum is scaled into [0,100].

use std::collections::BTreeMap;

use gridfact_core::{
  catalog::{FactCatalog, FactDefinition, Module, codes},
  contract::{ModuleScorecardEntry, ModuleStatus},
  fact::{
    Contradiction, EvidenceTier, FactValue, Firmness, LandControl, PermitLevel,
    Severity,
  },
  policy::ModuleWeights,
  snippet::SnippetId,
};
use strum::IntoEnumIterator;

// Per-fact contribution: base + tier bonus + qualitative grade.
const BASE_POINTS: f64 = 5.0;
const TIER_POINTS: f64 = 2.0;
const QUAL_POINTS: f64 = 3.0;
const MAX_POINTS: f64 = BASE_POINTS + TIER_POINTS + QUAL_POINTS;

/// Coverage at or above this fraction (with no HIGH contradiction touching
/// the module) makes a module VERIFIED.
const VERIFIED_COVERAGE: f64 = 0.75;

// ─── Rollup output ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringRollup {
  pub scorecards:     Vec<ModuleScorecardEntry>,
  pub overall_score:  u8,
  /// Most conservative status among modules containing hard-gate facts.
  pub overall_status: ModuleStatus,
}

/// Score every module and roll up the weighted overall score.
///
/// The caller guarantees `weights` already validated (sum 100).
pub fn score_modules(
  catalog: &FactCatalog,
  facts: &BTreeMap<String, FactValue>,
  contradictions: &[Contradiction],
  weights: &ModuleWeights,
) -> ScoringRollup {
  let mut scorecards = Vec::new();
  let mut overall = 0.0;
  let mut overall_status = ModuleStatus::Verified;

  for module in Module::iter() {
    let entry = score_module(catalog, module, facts, contradictions);
    overall += weights.weight(module) as f64 / 100.0 * entry.score as f64;

    let gating = catalog.by_module(module).iter().any(|d| d.hard_gate);
    if gating {
      overall_status = overall_status.max(entry.status);
    }
    scorecards.push(entry);
  }

  ScoringRollup {
    scorecards,
    overall_score: overall.round() as u8,
    overall_status,
  }
}

fn score_module(
  catalog: &FactCatalog,
  module: Module,
  facts: &BTreeMap<String, FactValue>,
  contradictions: &[Contradiction],
) -> ModuleScorecardEntry {
  let defs = catalog.by_module(module);

  let mut points = 0.0;
  let mut cited = 0usize;
  let mut covered_weight = 0usize;
  let mut total_weight = 0usize;
  let mut citations: Vec<SnippetId> = Vec::new();

  for def in &defs {
    // Hard-gate facts count double in coverage.
    let weight = if def.hard_gate { 2 } else { 1 };
    total_weight += weight;

    let Some(fact) = facts.get(def.code).filter(|f| f.is_cited()) else {
      continue;
    };
    cited += 1;
    covered_weight += weight;
    points += fact_points(def, fact);
    citations.extend(fact.citations.iter().cloned());
  }

  citations.sort();
  citations.dedup();

  let score = if defs.is_empty() {
    0.0
  } else {
    points / (defs.len() as f64 * MAX_POINTS) * 100.0
  };
  let coverage = if total_weight == 0 {
    0.0
  } else {
    covered_weight as f64 / total_weight as f64
  };

  let module_codes: Vec<&str> = defs.iter().map(|d| d.code).collect();
  let high_contradiction = contradictions.iter().any(|c| {
    c.severity == Severity::High && module_codes.contains(&c.fact_code.as_str())
  });
  let any_contradiction = contradictions
    .iter()
    .any(|c| module_codes.contains(&c.fact_code.as_str()));

  let status = if cited == 0 && !any_contradiction {
    ModuleStatus::Unknown
  } else if coverage >= VERIFIED_COVERAGE && !high_contradiction && !any_contradiction
  {
    ModuleStatus::Verified
  } else {
    ModuleStatus::Partial
  };

  ModuleScorecardEntry {
    module,
    status,
    score: score.round().clamp(0.0, 100.0) as u8,
    rationale: format!(
      "{cited}/{} facts cited, weighted coverage {:.0}%{}",
      defs.len(),
      coverage * 100.0,
      if high_contradiction {
        ", unresolved high-severity contradiction"
      } else if any_contradiction {
        ", open contradiction"
      } else {
        ""
      }
    ),
    citations,
  }
}

/// One fact's contribution, in [0, MAX_POINTS].
fn fact_points(def: &FactDefinition, fact: &FactValue) -> f64 {
  let tier_bonus = if fact.tier >= EvidenceTier::OfficialSigned {
    TIER_POINTS
  } else if fact.tier >= EvidenceTier::ThirdParty {
    TIER_POINTS / 2.0
  } else {
    0.0
  };

  BASE_POINTS + tier_bonus + QUAL_POINTS * qualitative_grade(def, fact)
}

/// Graded fraction for facts with a qualitative ladder; 1.0 for facts
/// without one (their full value is carried by presence).
fn qualitative_grade(def: &FactDefinition, fact: &FactValue) -> f64 {
  let text = fact.value.as_ref().and_then(|v| v.as_text());
  match def.code {
    codes::FIRMNESS => match text.and_then(Firmness::parse) {
      Some(Firmness::Firm) => 1.0,
      Some(Firmness::PartiallyFirm) => 0.5,
      _ => 0.0,
    },
    codes::LAND_CONTROL => match text.and_then(LandControl::parse) {
      Some(LandControl::Freehold) => 1.0,
      Some(LandControl::Leasehold) => 0.75,
      Some(LandControl::Option) => 0.4,
      Some(LandControl::Negotiation) => 0.2,
      _ => 0.0,
    },
    codes::BUILDING_PERMIT => match text.and_then(PermitLevel::parse) {
      Some(PermitLevel::GrantedFinal) => 1.0,
      Some(PermitLevel::Granted) => 0.75,
      Some(PermitLevel::Submitted) => 0.4,
      _ => 0.0,
    },
    codes::GRID_TITLE_LEVEL => {
      let level = fact.value.as_ref().and_then(|v| v.as_number()).unwrap_or(0.0);
      (level / 5.0).clamp(0.0, 1.0)
    }
    _ => 1.0,
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use gridfact_core::fact::{Candidate, Value};

  use super::*;

  fn weights() -> ModuleWeights {
    ModuleWeights { power_grid: 40, permits_land: 30, connectivity: 10, commercial: 20 }
  }

  fn cited(code: &str, value: Value, tier: EvidenceTier) -> FactValue {
    FactValue {
      value: Some(value),
      citations: vec![SnippetId(format!("{code:.>16}"))],
      tier,
      ..FactValue::empty(code)
    }
  }

  fn facts(entries: Vec<FactValue>) -> BTreeMap<String, FactValue> {
    entries.into_iter().map(|f| (f.code.clone(), f)).collect()
  }

  fn entry(rollup: &ScoringRollup, module: Module) -> &ModuleScorecardEntry {
    rollup.scorecards.iter().find(|e| e.module == module).unwrap()
  }

  #[test]
  fn no_evidence_is_unknown_with_zero_scores() {
    let catalog = FactCatalog::standard();
    let rollup =
      score_modules(&catalog, &BTreeMap::new(), &[], &weights());
    assert_eq!(rollup.overall_score, 0);
    assert_eq!(rollup.overall_status, ModuleStatus::Unknown);
    assert!(
      rollup
        .scorecards
        .iter()
        .all(|e| e.status == ModuleStatus::Unknown && e.score == 0)
    );
  }

  #[test]
  fn some_evidence_is_partial() {
    let catalog = FactCatalog::standard();
    let f = facts(vec![cited(
      codes::RESERVED_MW,
      Value::Number(24.0),
      EvidenceTier::OfficialSigned,
    )]);
    let rollup = score_modules(&catalog, &f, &[], &weights());
    let power = entry(&rollup, Module::PowerGrid);
    assert_eq!(power.status, ModuleStatus::Partial);
    assert!(power.score > 0);
    // Other modules untouched.
    assert_eq!(entry(&rollup, Module::Commercial).status, ModuleStatus::Unknown);
  }

  #[test]
  fn gate_grade_facts_alone_do_not_verify_a_module() {
    // A deal can clear every evaluated hard gate on a handful of cited
    // facts; VERIFIED still demands broad coverage of the module catalog.
    let catalog = FactCatalog::standard();
    let f = facts(vec![
      cited(codes::RESERVED_MW, Value::Number(24.0), EvidenceTier::OfficialSigned),
      cited(codes::FIRMNESS, Value::Text("firm".into()), EvidenceTier::OfficialSigned),
      cited(
        codes::BUILDING_PERMIT,
        Value::Text("granted".into()),
        EvidenceTier::OfficialSigned,
      ),
      cited(
        codes::LAND_CONTROL,
        Value::Text("leasehold".into()),
        EvidenceTier::OfficialSigned,
      ),
    ]);
    let rollup = score_modules(&catalog, &f, &[], &weights());
    assert_eq!(entry(&rollup, Module::PowerGrid).status, ModuleStatus::Partial);
    assert_eq!(entry(&rollup, Module::PermitsLand).status, ModuleStatus::Partial);
    assert!(entry(&rollup, Module::PowerGrid).score > 0);
  }

  #[test]
  fn full_coverage_without_contradictions_is_verified() {
    let catalog = FactCatalog::standard();
    let f: BTreeMap<String, FactValue> = catalog
      .by_module(Module::Connectivity)
      .iter()
      .map(|d| {
        (d.code.to_owned(), cited(
          d.code,
          Value::Number(1.0),
          EvidenceTier::ThirdParty,
        ))
      })
      .collect();
    let rollup = score_modules(&catalog, &f, &[], &weights());
    assert_eq!(entry(&rollup, Module::Connectivity).status, ModuleStatus::Verified);
  }

  #[test]
  fn high_contradiction_blocks_verified() {
    let catalog = FactCatalog::standard();
    let f: BTreeMap<String, FactValue> = catalog
      .by_module(Module::PowerGrid)
      .iter()
      .map(|d| {
        (d.code.to_owned(), cited(
          d.code,
          Value::Number(3.0),
          EvidenceTier::OfficialSigned,
        ))
      })
      .collect();

    let contradiction = Contradiction {
      fact_code:   codes::RESERVED_MW.to_owned(),
      severity:    Severity::High,
      description: "conflicting readings".into(),
      candidates:  vec![
        Candidate {
          value:    Value::Number(24.0),
          source:   "a.pdf".into(),
          citation: SnippetId("aa".into()),
        },
        Candidate {
          value:    Value::Number(30.0),
          source:   "b.pdf".into(),
          citation: SnippetId("bb".into()),
        },
      ],
    };

    let clean = score_modules(&catalog, &f, &[], &weights());
    let dirty = score_modules(&catalog, &f, &[contradiction], &weights());
    assert_eq!(entry(&clean, Module::PowerGrid).status, ModuleStatus::Verified);
    assert_eq!(entry(&dirty, Module::PowerGrid).status, ModuleStatus::Partial);
  }

  #[test]
  fn firm_scores_above_non_firm() {
    let catalog = FactCatalog::standard();
    let firm = facts(vec![cited(
      codes::FIRMNESS,
      Value::Text("firm".into()),
      EvidenceTier::OfficialSigned,
    )]);
    let non_firm = facts(vec![cited(
      codes::FIRMNESS,
      Value::Text("non_firm".into()),
      EvidenceTier::OfficialSigned,
    )]);

    let a = score_modules(&catalog, &firm, &[], &weights());
    let b = score_modules(&catalog, &non_firm, &[], &weights());
    assert!(
      entry(&a, Module::PowerGrid).score > entry(&b, Module::PowerGrid).score
    );
  }

  #[test]
  fn raising_grid_title_never_lowers_overall() {
    let catalog = FactCatalog::standard();
    let at = |level: f64| {
      let f = facts(vec![
        cited(codes::GRID_TITLE_LEVEL, Value::Number(level), EvidenceTier::OfficialSigned),
        cited(codes::RESERVED_MW, Value::Number(24.0), EvidenceTier::OfficialSigned),
      ]);
      score_modules(&catalog, &f, &[], &weights()).overall_score
    };
    assert!(at(5.0) >= at(2.0));
  }

  #[test]
  fn overall_status_ignores_modules_without_hard_gates() {
    let catalog = FactCatalog::standard();
    // Fully cover every hard-gating module, leave Connectivity empty.
    let f: BTreeMap<String, FactValue> = catalog
      .definitions()
      .iter()
      .filter(|d| d.module != Module::Connectivity)
      .map(|d| {
        let value = match d.kind {
          gridfact_core::catalog::ValueKind::Number => Value::Number(3.0),
          gridfact_core::catalog::ValueKind::Date => {
            Value::Date(chrono::NaiveDate::from_ymd_opt(2027, 6, 30).unwrap())
          }
          gridfact_core::catalog::ValueKind::Text => Value::Text("firm".into()),
          gridfact_core::catalog::ValueKind::Flag => Value::Flag(true),
        };
        (d.code.to_owned(), cited(d.code, value, EvidenceTier::OfficialSigned))
      })
      .collect();

    let rollup = score_modules(&catalog, &f, &[], &weights());
    assert_eq!(entry(&rollup, Module::Connectivity).status, ModuleStatus::Unknown);
    assert_eq!(rollup.overall_status, ModuleStatus::Verified);
  }
}
