//! The policy engine — hard-gate evaluation against a policy snapshot.
//!
//! Every configured gate resolves to Pass, Fail, or Unknown. Unknown means
//! the driving fact has no usable evidence (null, or below the policy's
//! minimum evidence tier); it never passes a gate. Decision rule: any Fail
//! is NO_GO; no Fail but more unknown gates than the policy allows is
//! HOLD; otherwise GO. Identical (facts, policy) inputs produce
//! byte-identical results.

use std::collections::BTreeMap;

use gridfact_core::{
  catalog::codes,
  contract::{Decision, GateEvaluation, GateOutcome, HardGateResult},
  fact::{FactValue, Firmness, LandControl, PermitLevel},
  policy::FundPolicySnapshot,
  snippet::SnippetId,
};

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// Evaluate every hard gate and derive the GO/HOLD/NO_GO decision.
pub fn evaluate_gates(
  policy: &FundPolicySnapshot,
  facts: &BTreeMap<String, FactValue>,
) -> HardGateResult {
  let gates = &policy.hard_gates;
  let mut evaluations = Vec::new();

  // Gate order is fixed; it is part of the deterministic output.
  evaluations.push(grid_title_gate(policy, facts));
  evaluations.push(land_control_gate(policy, facts));
  evaluations.push(permit_gate(policy, facts));
  evaluations.push(firmness_gate(policy, facts));
  evaluations.push(anchor_gate(policy, facts));
  evaluations.push(ceiling_gate(
    policy,
    facts,
    "max_curtailment_pct",
    codes::CURTAILMENT_PCT,
    gates.max_curtailment_pct,
    "expected curtailment",
  ));
  evaluations.push(ceiling_gate(
    policy,
    facts,
    "max_flex_obligation_pct",
    codes::FLEX_OBLIGATION_PCT,
    gates.max_flex_obligation_pct,
    "flexibility obligation",
  ));

  let failed = evaluations
    .iter()
    .filter(|e| e.outcome == GateOutcome::Fail)
    .count();
  let unknown = evaluations
    .iter()
    .filter(|e| e.outcome == GateOutcome::Unknown)
    .count();

  let decision = if failed > 0 {
    Decision::NoGo
  } else if unknown > policy.max_unknown_critical {
    Decision::Hold
  } else {
    Decision::Go
  };

  let mut reasons: Vec<String> = evaluations
    .iter()
    .filter(|e| e.outcome == GateOutcome::Fail)
    .map(|e| e.reason.clone())
    .collect();
  match decision {
    Decision::NoGo => {}
    Decision::Hold => reasons.push(format!(
      "{unknown} hard-gate inputs unknown, above the policy limit of {}",
      policy.max_unknown_critical
    )),
    Decision::Go => reasons.push("all hard gates passed".to_owned()),
  }

  HardGateResult { decision, evaluations, reasons }
}

// ─── Individual gates ────────────────────────────────────────────────────────

/// A fact's value only counts for gating when its evidence tier reaches the
/// policy minimum; weaker evidence is treated as unknown.
fn usable<'a>(
  policy: &FundPolicySnapshot,
  facts: &'a BTreeMap<String, FactValue>,
  code: &str,
) -> Option<&'a FactValue> {
  facts
    .get(code)
    .filter(|f| f.is_cited() && f.tier >= policy.min_gate_tier)
}

fn citations(fact: Option<&FactValue>) -> Vec<SnippetId> {
  fact.map(|f| f.citations.clone()).unwrap_or_default()
}

fn unknown_eval(gate: &str, code: &str) -> GateEvaluation {
  GateEvaluation {
    gate:      gate.to_owned(),
    outcome:   GateOutcome::Unknown,
    reason:    format!("{code}: no usable evidence"),
    citations: Vec::new(),
  }
}

fn grid_title_gate(
  policy: &FundPolicySnapshot,
  facts: &BTreeMap<String, FactValue>,
) -> GateEvaluation {
  let gate = "min_grid_title_level";
  let minimum = policy.hard_gates.min_grid_title_level;
  let Some(fact) = usable(policy, facts, codes::GRID_TITLE_LEVEL) else {
    return unknown_eval(gate, codes::GRID_TITLE_LEVEL);
  };
  let Some(level) = fact.value.as_ref().and_then(|v| v.as_number()) else {
    return unknown_eval(gate, codes::GRID_TITLE_LEVEL);
  };

  let passed = level >= minimum as f64;
  GateEvaluation {
    gate:      gate.to_owned(),
    outcome:   if passed { GateOutcome::Pass } else { GateOutcome::Fail },
    reason:    format!(
      "grid title level {level} {} policy minimum {minimum}",
      if passed { "meets" } else { "below" }
    ),
    citations: citations(Some(fact)),
  }
}

fn land_control_gate(
  policy: &FundPolicySnapshot,
  facts: &BTreeMap<String, FactValue>,
) -> GateEvaluation {
  let gate = "min_land_control";
  let minimum = policy.hard_gates.min_land_control;
  let Some(fact) = usable(policy, facts, codes::LAND_CONTROL) else {
    return unknown_eval(gate, codes::LAND_CONTROL);
  };
  let Some(control) = fact
    .value
    .as_ref()
    .and_then(|v| v.as_text())
    .and_then(LandControl::parse)
  else {
    return unknown_eval(gate, codes::LAND_CONTROL);
  };

  let passed = control >= minimum;
  GateEvaluation {
    gate:      gate.to_owned(),
    outcome:   if passed { GateOutcome::Pass } else { GateOutcome::Fail },
    reason:    format!(
      "land control {control:?} {} policy minimum {minimum:?}",
      if passed { "meets" } else { "below" }
    ),
    citations: citations(Some(fact)),
  }
}

fn permit_gate(
  policy: &FundPolicySnapshot,
  facts: &BTreeMap<String, FactValue>,
) -> GateEvaluation {
  let gate = "min_permit_level";
  let minimum = policy.hard_gates.min_permit_level;
  let Some(fact) = usable(policy, facts, codes::BUILDING_PERMIT) else {
    return unknown_eval(gate, codes::BUILDING_PERMIT);
  };
  let Some(level) = fact
    .value
    .as_ref()
    .and_then(|v| v.as_text())
    .and_then(PermitLevel::parse)
  else {
    return unknown_eval(gate, codes::BUILDING_PERMIT);
  };

  let passed = level >= minimum;
  GateEvaluation {
    gate:      gate.to_owned(),
    outcome:   if passed { GateOutcome::Pass } else { GateOutcome::Fail },
    reason:    format!(
      "building permit {level:?} {} policy minimum {minimum:?}",
      if passed { "meets" } else { "below" }
    ),
    citations: citations(Some(fact)),
  }
}

fn firmness_gate(
  policy: &FundPolicySnapshot,
  facts: &BTreeMap<String, FactValue>,
) -> GateEvaluation {
  let gate = "accepted_firmness";
  let accepted = &policy.hard_gates.accepted_firmness;
  let Some(fact) = usable(policy, facts, codes::FIRMNESS) else {
    return unknown_eval(gate, codes::FIRMNESS);
  };
  let Some(firmness) = fact
    .value
    .as_ref()
    .and_then(|v| v.as_text())
    .and_then(Firmness::parse)
  else {
    return unknown_eval(gate, codes::FIRMNESS);
  };

  let passed = accepted.contains(&firmness);
  GateEvaluation {
    gate:      gate.to_owned(),
    outcome:   if passed { GateOutcome::Pass } else { GateOutcome::Fail },
    reason:    format!(
      "connection firmness {firmness:?} {} by policy",
      if passed { "accepted" } else { "not accepted" }
    ),
    citations: citations(Some(fact)),
  }
}

fn anchor_gate(
  policy: &FundPolicySnapshot,
  facts: &BTreeMap<String, FactValue>,
) -> GateEvaluation {
  let gate = "require_anchor_customer";
  if !policy.hard_gates.require_anchor_customer {
    return GateEvaluation {
      gate:      gate.to_owned(),
      outcome:   GateOutcome::Pass,
      reason:    "anchor customer not required by policy".to_owned(),
      citations: Vec::new(),
    };
  }

  let Some(fact) = usable(policy, facts, codes::ANCHOR_CUSTOMER) else {
    return unknown_eval(gate, codes::ANCHOR_CUSTOMER);
  };
  let present = fact.value.as_ref().and_then(|v| v.as_flag()) == Some(true);
  GateEvaluation {
    gate:      gate.to_owned(),
    outcome:   if present { GateOutcome::Pass } else { GateOutcome::Fail },
    reason:    if present {
      "anchor customer evidenced".to_owned()
    } else {
      "anchor customer required by policy but not evidenced".to_owned()
    },
    citations: citations(Some(fact)),
  }
}

fn ceiling_gate(
  policy: &FundPolicySnapshot,
  facts: &BTreeMap<String, FactValue>,
  gate: &str,
  code: &str,
  ceiling: f64,
  label: &str,
) -> GateEvaluation {
  let Some(fact) = usable(policy, facts, code) else {
    return unknown_eval(gate, code);
  };
  let Some(pct) = fact.value.as_ref().and_then(|v| v.as_number()) else {
    return unknown_eval(gate, code);
  };

  let passed = pct <= ceiling;
  GateEvaluation {
    gate:      gate.to_owned(),
    outcome:   if passed { GateOutcome::Pass } else { GateOutcome::Fail },
    reason:    format!(
      "{label} {pct}% {} policy ceiling {ceiling}%",
      if passed { "within" } else { "exceeds" }
    ),
    citations: citations(Some(fact)),
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use gridfact_core::fact::{EvidenceTier, Value};

  use super::*;

  fn policy() -> FundPolicySnapshot {
    FundPolicySnapshot::default_policy(Utc::now())
  }

  fn cited(code: &str, value: Value) -> FactValue {
    FactValue {
      value: Some(value),
      citations: vec![SnippetId(format!("{code:.>16}"))],
      tier: EvidenceTier::OfficialSigned,
      ..FactValue::empty(code)
    }
  }

  fn facts(entries: Vec<FactValue>) -> BTreeMap<String, FactValue> {
    entries.into_iter().map(|f| (f.code.clone(), f)).collect()
  }

  fn scenario_a_facts() -> BTreeMap<String, FactValue> {
    facts(vec![
      cited(codes::RESERVED_MW, Value::Number(24.0)),
      cited(codes::FIRMNESS, Value::Text("firm".into())),
      cited(codes::BUILDING_PERMIT, Value::Text("granted".into())),
      cited(codes::LAND_CONTROL, Value::Text("leasehold".into())),
    ])
  }

  #[test]
  fn cited_firm_permitted_leasehold_deal_is_go() {
    let result = evaluate_gates(&policy(), &scenario_a_facts());
    assert_eq!(result.decision, Decision::Go);
    assert!(result.reasons.contains(&"all hard gates passed".to_owned()));
  }

  #[test]
  fn one_failed_gate_forces_no_go_regardless_of_everything_else() {
    let mut f = scenario_a_facts();
    f.insert(
      codes::FIRMNESS.to_owned(),
      cited(codes::FIRMNESS, Value::Text("non_firm".into())),
    );
    // default policy accepts firm and partially_firm only
    let result = evaluate_gates(&policy(), &f);
    assert_eq!(result.decision, Decision::NoGo);
    assert!(result.reasons[0].contains("not accepted"));
  }

  #[test]
  fn curtailment_above_ceiling_fails() {
    let mut f = scenario_a_facts();
    f.insert(
      codes::CURTAILMENT_PCT.to_owned(),
      cited(codes::CURTAILMENT_PCT, Value::Number(15.0)),
    );
    let result = evaluate_gates(&policy(), &f);
    assert_eq!(result.decision, Decision::NoGo);
  }

  #[test]
  fn mostly_unknown_evidence_holds() {
    let f = facts(vec![cited(codes::RESERVED_MW, Value::Number(24.0))]);
    let result = evaluate_gates(&policy(), &f);
    // land, permit, firmness, title, curtailment, flex unknown: 6 > 3.
    assert_eq!(result.decision, Decision::Hold);
    assert!(result.reasons.last().unwrap().contains("unknown"));
  }

  #[test]
  fn evidence_below_minimum_tier_is_unknown() {
    let mut strict = policy();
    strict.min_gate_tier = EvidenceTier::OfficialSigned;
    let mut f = scenario_a_facts();
    for fact in f.values_mut() {
      fact.tier = EvidenceTier::SellerStatement;
    }
    let result = evaluate_gates(&strict, &f);
    assert!(
      result
        .evaluations
        .iter()
        .all(|e| e.outcome != GateOutcome::Fail)
    );
    assert_eq!(result.decision, Decision::Hold);
  }

  #[test]
  fn gate_evaluations_carry_driving_citations() {
    let result = evaluate_gates(&policy(), &scenario_a_facts());
    let firmness = result
      .evaluations
      .iter()
      .find(|e| e.gate == "accepted_firmness")
      .unwrap();
    assert_eq!(firmness.outcome, GateOutcome::Pass);
    assert!(!firmness.citations.is_empty());
  }

  #[test]
  fn identical_inputs_identical_output() {
    let p = FundPolicySnapshot::default_policy(
      chrono::DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
        .unwrap()
        .with_timezone(&Utc),
    );
    let f = scenario_a_facts();
    let a = serde_json::to_vec(&evaluate_gates(&p, &f)).unwrap();
    let b = serde_json::to_vec(&evaluate_gates(&p, &f)).unwrap();
    assert_eq!(a, b);
  }
}
