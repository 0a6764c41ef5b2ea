//! Pattern-based second extraction pass.
//!
//! A lightweight regex sweep over raw snippet text, independent of the
//! capability-based extractor, used exclusively to cross-validate. Its
//! candidates feed the contradiction detector and are never allowed to
//! override a capability-extracted value.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use gridfact_core::{
  catalog::codes,
  fact::{Candidate, Value},
  snippet::EvidenceSnippet,
};
use regex::Regex;

// ─── Compiled patterns ───────────────────────────────────────────────────────

struct Patterns {
  mw:        Regex,
  it_ctx:    Regex,
  voltage:   Regex,
  firmness:  Regex,
  iso_date:  Regex,
  area_ha:   Regex,
  land:      Regex,
  permit:    Regex,
  energ_ctx: Regex,
  expiry_ctx: Regex,
}

impl Patterns {
  fn compile() -> Result<Self, regex::Error> {
    Ok(Self {
      mw:        Regex::new(r"(?i)\b(\d+(?:[.,]\d+)?)\s*MW\b")?,
      it_ctx:    Regex::new(r"(?i)\bIT\s+(?:load|capacity)\b")?,
      voltage:   Regex::new(r"(?i)\b(\d{2,3})\s*kV\b")?,
      firmness:  Regex::new(r"(?i)\b(non[- ]?firm|partially[- ]firm|firm)\b")?,
      iso_date:  Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b")?,
      area_ha:   Regex::new(r"(?i)\b(\d+(?:[.,]\d+)?)\s*(?:ha|hectares?)\b")?,
      land:      Regex::new(r"(?i)\b(freehold|leasehold|lease|option)\b")?,
      permit:    Regex::new(
        r"(?i)\bpermit\b.{0,40}?\b(granted|approved|submitted|pending|refused)\b",
      )?,
      energ_ctx: Regex::new(r"(?i)energi[sz]ation|energi[sz]ed|go[- ]live")?,
      expiry_ctx: Regex::new(r"(?i)expir|deadline|lapse")?,
    })
  }
}

// ─── Candidate extraction ────────────────────────────────────────────────────

/// Run the pattern pass over every snippet, returning candidates grouped by
/// fact code. Empty input yields an empty map; the pass never errors.
pub fn pattern_candidates(
  snippets: &[EvidenceSnippet],
) -> BTreeMap<String, Vec<Candidate>> {
  let Ok(patterns) = Patterns::compile() else {
    return BTreeMap::new();
  };

  let mut out: BTreeMap<String, Vec<Candidate>> = BTreeMap::new();
  let mut push = |code: &str, value: Value, snippet: &EvidenceSnippet| {
    out.entry(code.to_owned()).or_default().push(Candidate {
      value,
      source: snippet.provenance.source.clone(),
      citation: snippet.id.clone(),
    });
  };

  for snippet in snippets {
    let text = &snippet.text;
    let it_context = patterns.it_ctx.is_match(text);

    for cap in patterns.mw.captures_iter(text) {
      if let Some(n) = parse_number(&cap[1]) {
        let code = if it_context {
          codes::IT_CAPACITY_MW
        } else {
          codes::RESERVED_MW
        };
        push(code, Value::Number(n), snippet);
      }
    }

    for cap in patterns.voltage.captures_iter(text) {
      if let Some(n) = parse_number(&cap[1]) {
        push(codes::CONNECTION_VOLTAGE_KV, Value::Number(n), snippet);
      }
    }

    if let Some(cap) = patterns.firmness.captures(text) {
      let normalized = cap[1].to_lowercase().replace([' ', '-'], "_");
      // "non_firm" and "partially_firm" also contain "firm"; the regex
      // alternation is ordered so the longer variant wins.
      push(codes::FIRMNESS, Value::Text(normalized), snippet);
    }

    for cap in patterns.iso_date.captures_iter(text) {
      let Some(date) = parse_iso(&cap[1], &cap[2], &cap[3]) else {
        continue;
      };
      if patterns.energ_ctx.is_match(text) {
        push(codes::ENERGIZATION_DATE, Value::Date(date), snippet);
      } else if patterns.expiry_ctx.is_match(text) {
        push(codes::QUEUE_EXPIRY_DATE, Value::Date(date), snippet);
      }
    }

    for cap in patterns.area_ha.captures_iter(text) {
      if let Some(n) = parse_number(&cap[1]) {
        push(codes::LAND_AREA_HA, Value::Number(n), snippet);
      }
    }

    if let Some(cap) = patterns.land.captures(text) {
      let normalized = match cap[1].to_lowercase().as_str() {
        "lease" => "leasehold".to_owned(),
        other => other.to_owned(),
      };
      push(codes::LAND_CONTROL, Value::Text(normalized), snippet);
    }

    if let Some(cap) = patterns.permit.captures(text) {
      let normalized = match cap[1].to_lowercase().as_str() {
        "approved" => "granted".to_owned(),
        "pending" => "submitted".to_owned(),
        other => other.to_owned(),
      };
      push(codes::BUILDING_PERMIT, Value::Text(normalized), snippet);
    }
  }

  out
}

fn parse_number(raw: &str) -> Option<f64> {
  raw.replace(',', ".").parse().ok()
}

fn parse_iso(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
  NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
