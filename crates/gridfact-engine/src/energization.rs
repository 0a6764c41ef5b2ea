//! The energization-probability model.
//!
//! A structured, deterministic scoring function — explicitly not a
//! statistically calibrated probability model. It exists so readiness is
//! reproducible and comparable across deals: the same facts always produce
//! the same curve.
//!
//! Base score 30, plus an ordered list of mutually-exclusive-per-factor
//! positive contributors (first matching tier wins), minus fixed
//! deductions, minus 8 per red flag and 5 per contradiction, clamped to
//! [5,95]. Three horizon projections are derived from the base score and
//! the stated energization target.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use gridfact_core::{
  catalog::codes,
  contract::{ConfidenceLabel, CurvePoint, EnergisationCurve},
  fact::{FactValue, Firmness, LandControl, PermitLevel},
};

const BASE_SCORE: f64 = 30.0;
const SCORE_FLOOR: f64 = 5.0;
const SCORE_CEIL: f64 = 95.0;
const RED_FLAG_PENALTY: f64 = 8.0;
const CONTRADICTION_PENALTY: f64 = 5.0;
/// Curtailment above this percentage is treated as a readiness risk.
const CURTAILMENT_RISK_PCT: f64 = 10.0;
/// Queue positions beyond this are treated as a readiness risk.
const QUEUE_POSITION_RISK: f64 = 50.0;

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct EnergizationInputs {
  pub red_flag_count:      usize,
  pub contradiction_count: usize,
  /// Reference date for horizon arithmetic (the run date).
  pub as_of:               NaiveDate,
}

// ─── Model ───────────────────────────────────────────────────────────────────

/// Build the readiness curve from evaluated facts.
pub fn build_curve(
  facts: &BTreeMap<String, FactValue>,
  inputs: EnergizationInputs,
) -> EnergisationCurve {
  let mut drivers: Vec<String> = Vec::new();
  let mut risks: Vec<String> = Vec::new();

  let mut score = BASE_SCORE;

  // Positive contributors; within each factor the first matching tier wins.
  let title_level = number(facts, codes::GRID_TITLE_LEVEL).unwrap_or(0.0);
  let title_points = if title_level >= 5.0 {
    20.0
  } else if title_level >= 4.0 {
    15.0
  } else if title_level >= 3.0 {
    10.0
  } else if title_level >= 2.0 {
    5.0
  } else {
    0.0
  };
  if title_points > 0.0 {
    score += title_points;
    drivers.push(format!("grid title at level {title_level:.0}"));
  }

  match text(facts, codes::FIRMNESS).and_then(|t| Firmness::parse(&t)) {
    Some(Firmness::Firm) => {
      score += 12.0;
      drivers.push("firm grid connection".to_owned());
    }
    Some(Firmness::PartiallyFirm) => {
      score += 6.0;
      drivers.push("partially firm grid connection".to_owned());
    }
    _ => {}
  }

  match text(facts, codes::BUILDING_PERMIT).and_then(|t| PermitLevel::parse(&t))
  {
    Some(PermitLevel::GrantedFinal) => {
      score += 12.0;
      drivers.push("building permit legally final".to_owned());
    }
    Some(PermitLevel::Granted) => {
      score += 8.0;
      drivers.push("building permit granted".to_owned());
    }
    Some(PermitLevel::Submitted) => {
      score += 4.0;
      drivers.push("building permit submitted".to_owned());
    }
    _ => {}
  }

  match text(facts, codes::LAND_CONTROL).and_then(|t| LandControl::parse(&t)) {
    Some(LandControl::Freehold) => {
      score += 8.0;
      drivers.push("land held freehold".to_owned());
    }
    Some(LandControl::Leasehold) => {
      score += 6.0;
      drivers.push("land under lease".to_owned());
    }
    Some(LandControl::Option) => {
      score += 3.0;
      drivers.push("land under option".to_owned());
    }
    _ => {}
  }

  if flag(facts, codes::ANCHOR_CUSTOMER) == Some(true) {
    score += 8.0;
    drivers.push("anchor customer in place".to_owned());
  } else if number(facts, codes::CUSTOMER_PIPELINE_COUNT).unwrap_or(0.0) >= 1.0
  {
    score += 4.0;
    drivers.push("customer pipeline identified".to_owned());
  }

  let target = date(facts, codes::ENERGIZATION_DATE);
  if target.is_some() {
    score += 5.0;
    drivers.push("energization date stated".to_owned());
  }

  // Negative contributors: fixed deductions.
  if flag(facts, codes::DEEP_WORKS_REQUIRED) == Some(true) {
    score -= 8.0;
    risks.push("deep grid reinforcement works required".to_owned());
  }
  if number(facts, codes::QUEUE_POSITION).unwrap_or(0.0) > QUEUE_POSITION_RISK {
    score -= 6.0;
    risks.push("deep position in the connection queue".to_owned());
  }
  if flag(facts, codes::PERMIT_APPEAL_RISK) == Some(true) {
    score -= 7.0;
    risks.push("permit appeal risk open".to_owned());
  }
  if flag(facts, codes::GRID_AGREEMENT) != Some(true) {
    score -= 10.0;
    risks.push("no executed grid connection agreement".to_owned());
  }
  if number(facts, codes::CURTAILMENT_PCT).unwrap_or(0.0) > CURTAILMENT_RISK_PCT
  {
    score -= 6.0;
    risks.push("high expected curtailment".to_owned());
  }

  if inputs.red_flag_count > 0 {
    score -= inputs.red_flag_count as f64 * RED_FLAG_PENALTY;
    risks.push(format!("{} policy red flag(s)", inputs.red_flag_count));
  }
  if inputs.contradiction_count > 0 {
    score -= inputs.contradiction_count as f64 * CONTRADICTION_PENALTY;
    risks.push(format!(
      "{} unresolved evidence contradiction(s)",
      inputs.contradiction_count
    ));
  }

  let base = score.clamp(SCORE_FLOOR, SCORE_CEIL);

  // Horizon projections, each independently clamped and rounded.
  let months_to_target = target
    .map(|t| t.signed_duration_since(inputs.as_of).num_days() as f64 / 30.44);

  let mut p12 = base * 0.7;
  if months_to_target.is_some_and(|m| m > 18.0) {
    p12 *= 0.5;
  }
  let mut p24 = base;
  if months_to_target.is_some_and(|m| m <= 24.0) {
    p24 *= 1.05;
  }
  let mut p36 = base * 1.15;
  if base < 80.0 {
    p36 = p36.min(90.0);
  }

  let points = vec![
    point(12, p12),
    point(24, p24),
    point(36, p36),
  ];

  let non_null = facts.values().filter(|f| f.value.is_some()).count();
  let confidence = if non_null >= 15 {
    ConfidenceLabel::High
  } else if non_null >= 8 {
    ConfidenceLabel::Medium
  } else {
    ConfidenceLabel::Low
  };

  let (narrative_base, narrative_bear, narrative_bull) =
    narratives(&points, &drivers, &risks);

  EnergisationCurve {
    points,
    drivers,
    risks,
    narrative_base,
    narrative_bear,
    narrative_bull,
    confidence,
  }
}

fn point(horizon_months: u8, raw: f64) -> CurvePoint {
  CurvePoint {
    horizon_months,
    probability: raw.clamp(SCORE_FLOOR, SCORE_CEIL).round() / 100.0,
  }
}

/// Narratives are assembled deterministically from the driver and risk
/// lists — never free-form.
fn narratives(
  points: &[CurvePoint],
  drivers: &[String],
  risks: &[String],
) -> (String, String, String) {
  let drivers_text = if drivers.is_empty() {
    "no positive drivers identified".to_owned()
  } else {
    drivers.join("; ")
  };
  let risks_text = if risks.is_empty() {
    "no material risks identified".to_owned()
  } else {
    risks.join("; ")
  };
  let p24 = (points[1].probability * 100.0).round();
  let p36 = (points[2].probability * 100.0).round();

  let base = format!(
    "Central case: {p24}% probability of energization within 24 months. Drivers: {drivers_text}. Risks: {risks_text}."
  );
  let bear = format!(
    "Downside case: risks dominate ({risks_text}); energization slips beyond 36 months."
  );
  let bull = format!(
    "Upside case: drivers hold ({drivers_text}); energization within 24 months approaches {p36}%."
  );
  (base, bear, bull)
}

// ─── Fact access helpers ─────────────────────────────────────────────────────

fn number(facts: &BTreeMap<String, FactValue>, code: &str) -> Option<f64> {
  facts.get(code)?.value.as_ref()?.as_number()
}

fn text(facts: &BTreeMap<String, FactValue>, code: &str) -> Option<String> {
  facts
    .get(code)?
    .value
    .as_ref()?
    .as_text()
    .map(str::to_owned)
}

fn flag(facts: &BTreeMap<String, FactValue>, code: &str) -> Option<bool> {
  facts.get(code)?.value.as_ref()?.as_flag()
}

fn date(facts: &BTreeMap<String, FactValue>, code: &str) -> Option<NaiveDate> {
  facts.get(code)?.value.as_ref()?.as_date()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
