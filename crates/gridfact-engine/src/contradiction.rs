//! The contradiction detector — independent cross-validation of candidate
//! values per fact.
//!
//! Candidates come from the pattern pass plus the capability-extracted
//! value itself. Per fact: normalize, count distinct readings, and apply
//! the fact-specific numeric tolerance. Within tolerance is a non-blocking
//! warning; beyond tolerance (or any non-numeric mismatch) is a
//! [`Contradiction`] with severity from a static per-fact table. This stage
//! never errors and never overrides an extracted value.

use std::collections::BTreeMap;

use gridfact_core::{
  catalog::codes,
  fact::{Candidate, Contradiction, ContradictionWarning, FactValue, Severity, Value},
  policy::Tolerances,
  snippet::EvidenceSnippet,
};

// ─── Severity table ──────────────────────────────────────────────────────────

/// Static severity per fact code: HIGH for capacity, firmness and the
/// energization date; MEDIUM for voltage, IT capacity and land area; LOW
/// for everything else.
pub fn severity_for(code: &str) -> Severity {
  match code {
    codes::RESERVED_MW | codes::FIRMNESS | codes::ENERGIZATION_DATE => {
      Severity::High
    }
    codes::CONNECTION_VOLTAGE_KV
    | codes::IT_CAPACITY_MW
    | codes::LAND_AREA_HA => Severity::Medium,
    _ => Severity::Low,
  }
}

// ─── Detector ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DetectorOutput {
  pub contradictions: Vec<Contradiction>,
  pub warnings:       Vec<ContradictionWarning>,
}

/// Cross-check pattern candidates against the extracted facts.
///
/// The extracted value joins its fact's candidate group (attributed to the
/// source of its first citation) so the two independent passes are compared
/// on equal footing.
pub fn detect(
  pattern_candidates: &BTreeMap<String, Vec<Candidate>>,
  facts: &BTreeMap<String, FactValue>,
  snippets: &[EvidenceSnippet],
  tolerances: &Tolerances,
) -> DetectorOutput {
  let source_of: BTreeMap<_, _> = snippets
    .iter()
    .map(|s| (s.id.clone(), s.provenance.source.clone()))
    .collect();

  let mut output = DetectorOutput::default();

  for (code, candidates) in pattern_candidates {
    let mut group = candidates.clone();

    if let Some(fact) = facts.get(code) {
      if let (Some(value), Some(citation)) =
        (&fact.value, fact.citations.first())
      {
        group.push(Candidate {
          value:    value.clone(),
          source:   source_of
            .get(citation)
            .cloned()
            .unwrap_or_else(|| "extracted".to_owned()),
          citation: citation.clone(),
        });
      }
    }

    check_group(code, &group, tolerances, &mut output);
  }

  output
}

fn check_group(
  code: &str,
  group: &[Candidate],
  tolerances: &Tolerances,
  output: &mut DetectorOutput,
) {
  // One representative candidate per distinct normalized value,
  // first-seen order.
  let mut distinct: Vec<(String, &Candidate)> = Vec::new();
  for candidate in group {
    let key = normalize(&candidate.value);
    if !distinct.iter().any(|(k, _)| k == &key) {
      distinct.push((key, candidate));
    }
  }
  if distinct.len() < 2 {
    return;
  }

  let numbers: Vec<f64> = distinct
    .iter()
    .filter_map(|(_, c)| c.value.as_number())
    .collect();

  if numbers.len() == distinct.len() {
    if let Some(tolerance_pct) = tolerances.for_code(code) {
      let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
      let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
      let spread_pct = if min > 0.0 { (max - min) / min * 100.0 } else { f64::INFINITY };

      if spread_pct <= tolerance_pct {
        output.warnings.push(ContradictionWarning {
          fact_code:   code.to_owned(),
          description: format!(
            "{code}: readings {min} and {max} differ by {spread_pct:.1}%, within the ±{tolerance_pct}% tolerance"
          ),
        });
        return;
      }
    }
  }

  let readings: Vec<String> = distinct
    .iter()
    .map(|(_, c)| format!("{} ({})", c.value.display(), c.source))
    .collect();

  output.contradictions.push(Contradiction {
    fact_code:   code.to_owned(),
    severity:    severity_for(code),
    description: format!("{code}: conflicting readings: {}", readings.join(" vs ")),
    candidates:  distinct.iter().map(|(_, c)| (*c).clone()).collect(),
  });
}

/// Normalize a value for comparison: numbers round to 2 decimals, dates to
/// ISO, strings lowercase and trimmed.
fn normalize(value: &Value) -> String {
  match value {
    Value::Number(n) => format!("{:.2}", n),
    Value::Date(d) => d.format("%Y-%m-%d").to_string(),
    Value::Text(s) => s.trim().to_lowercase(),
    Value::Flag(b) => b.to_string(),
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use gridfact_core::snippet::SnippetId;

  use super::*;

  fn candidate(value: Value, source: &str, citation: &str) -> Candidate {
    Candidate {
      value,
      source: source.into(),
      citation: SnippetId(citation.into()),
    }
  }

  fn tolerances() -> Tolerances {
    Tolerances { mw_pct: 5.0, capex_pct: 10.0, area_pct: 10.0 }
  }

  fn detect_one(code: &str, group: Vec<Candidate>) -> DetectorOutput {
    let mut candidates = BTreeMap::new();
    candidates.insert(code.to_owned(), group);
    detect(&candidates, &BTreeMap::new(), &[], &tolerances())
  }

  #[test]
  fn mw_within_5_percent_warns_only() {
    let output = detect_one(codes::RESERVED_MW, vec![
      candidate(Value::Number(24.0), "a.pdf", "aa"),
      candidate(Value::Number(24.9), "b.pdf", "bb"),
    ]);
    assert!(output.contradictions.is_empty());
    assert_eq!(output.warnings.len(), 1);
  }

  #[test]
  fn mw_beyond_5_percent_contradicts_high() {
    let output = detect_one(codes::RESERVED_MW, vec![
      candidate(Value::Number(24.0), "a.pdf", "aa"),
      candidate(Value::Number(30.0), "b.pdf", "bb"),
    ]);
    assert_eq!(output.contradictions.len(), 1);
    let c = &output.contradictions[0];
    assert_eq!(c.severity, Severity::High);
    assert_eq!(c.candidates.len(), 2);
  }

  #[test]
  fn voltage_mismatch_is_medium() {
    let output = detect_one(codes::CONNECTION_VOLTAGE_KV, vec![
      candidate(Value::Number(110.0), "a.pdf", "aa"),
      candidate(Value::Number(132.0), "b.pdf", "bb"),
    ]);
    assert_eq!(output.contradictions.len(), 1);
    assert_eq!(output.contradictions[0].severity, Severity::Medium);
  }

  #[test]
  fn text_mismatch_ignores_case_and_whitespace() {
    let output = detect_one(codes::FIRMNESS, vec![
      candidate(Value::Text("Firm ".into()), "a.pdf", "aa"),
      candidate(Value::Text("firm".into()), "b.pdf", "bb"),
    ]);
    assert!(output.contradictions.is_empty());
    assert!(output.warnings.is_empty());
  }

  #[test]
  fn firmness_conflict_is_high() {
    let output = detect_one(codes::FIRMNESS, vec![
      candidate(Value::Text("firm".into()), "a.pdf", "aa"),
      candidate(Value::Text("non_firm".into()), "b.pdf", "bb"),
    ]);
    assert_eq!(output.contradictions[0].severity, Severity::High);
  }

  #[test]
  fn extracted_value_joins_the_group() {
    let mut candidates = BTreeMap::new();
    candidates.insert(codes::RESERVED_MW.to_owned(), vec![candidate(
      Value::Number(30.0),
      "teaser.pdf",
      "bb",
    )]);

    let mut facts = BTreeMap::new();
    facts.insert(codes::RESERVED_MW.to_owned(), FactValue {
      value: Some(Value::Number(24.0)),
      citations: vec![SnippetId("aa".into())],
      ..FactValue::empty(codes::RESERVED_MW)
    });

    let output = detect(&candidates, &facts, &[], &tolerances());
    assert_eq!(output.contradictions.len(), 1);
  }

  #[test]
  fn single_reading_is_silent() {
    let output = detect_one(codes::RESERVED_MW, vec![candidate(
      Value::Number(24.0),
      "a.pdf",
      "aa",
    )]);
    assert_eq!(output, DetectorOutput::default());
  }
}
