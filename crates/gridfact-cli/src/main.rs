//! `gridfact` — run the due-diligence pipeline locally.
//!
//! # Usage
//!
//! ```
//! gridfact --snippets dataroom.json --name "Borlänge North"
//! gridfact --snippets dataroom.json --policy fund-policy.toml --json
//! gridfact --snippets dataroom.json --store runs.sqlite3
//! ```
//!
//! The snippets file is a JSON array of passages:
//!
//! ```json
//! [{"text": "24 MW reserved ...", "source": "grid-agreement.pdf"}]
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use gridfact_core::{
  catalog::FactCatalog,
  contract::DealSnapshot,
  policy::FundPolicySnapshot,
  snippet::{EvidenceSnippet, Provenance},
  store::ContractStore as _,
};
use gridfact_engine::{
  RunRequest,
  extract::PatternBootstrapExtractor,
  report::render_markdown,
  retrieval::{NoMarketContext, StaticRetriever},
  run_analysis,
};
use gridfact_store_sqlite::SqliteStore;
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "gridfact", about = "Run infrastructure due diligence over a snippets file")]
struct Args {
  /// Path to the JSON snippets file (the retrieved data-room passages).
  #[arg(short, long, value_name = "FILE")]
  snippets: PathBuf,

  /// Policy snapshot file (.toml or .json). Defaults to the standard fund
  /// policy.
  #[arg(short, long, value_name = "FILE")]
  policy: Option<PathBuf>,

  /// Deal name used in the report.
  #[arg(long, default_value = "unnamed deal")]
  name: String,

  /// Deal type, e.g. `powered_land`.
  #[arg(long)]
  deal_type: Option<String>,

  /// ISO country code of the site.
  #[arg(long)]
  country: Option<String>,

  /// Persist the run to this SQLite store.
  #[arg(long, value_name = "FILE")]
  store: Option<PathBuf>,

  /// Print the full contract as JSON instead of the markdown report.
  #[arg(long)]
  json: bool,
}

// ─── Snippet file ────────────────────────────────────────────────────────────

/// One entry in the snippets file.
#[derive(Debug, Deserialize)]
struct SnippetEntry {
  text:        String,
  source:      String,
  document_id: Option<String>,
  #[serde(default)]
  query:       String,
  #[serde(default = "default_relevance")]
  relevance:   f64,
}

fn default_relevance() -> f64 { 0.5 }

fn load_snippets(path: &PathBuf) -> Result<Vec<EvidenceSnippet>> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading snippets file {}", path.display()))?;
  let entries: Vec<SnippetEntry> =
    serde_json::from_str(&raw).context("parsing snippets file")?;
  Ok(
    entries
      .into_iter()
      .map(|e| {
        EvidenceSnippet::new(e.text, Provenance {
          document_id: e.document_id,
          source:      e.source,
          query:       e.query,
          relevance:   e.relevance,
        })
      })
      .collect(),
  )
}

fn load_policy(path: Option<&PathBuf>) -> Result<FundPolicySnapshot> {
  let Some(path) = path else {
    return Ok(FundPolicySnapshot::default_policy(Utc::now()));
  };
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading policy file {}", path.display()))?;
  let policy = if path.extension().is_some_and(|e| e == "toml") {
    toml::from_str(&raw).context("parsing TOML policy file")?
  } else {
    serde_json::from_str(&raw).context("parsing JSON policy file")?
  };
  Ok(policy)
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let snippets = load_snippets(&args.snippets)?;
  let policy = load_policy(args.policy.as_ref())?;
  let catalog = FactCatalog::standard();

  let deal = DealSnapshot {
    deal_id:   Uuid::new_v4(),
    name:      args.name.clone(),
    deal_type: args.deal_type.clone(),
    country:   args.country.clone(),
  };
  let deal_id = deal.deal_id;

  let contract = run_analysis(
    &StaticRetriever::new(snippets),
    &PatternBootstrapExtractor,
    None::<&NoMarketContext>,
    &catalog,
    RunRequest::new(deal, policy),
  )
  .await;

  if let Some(store_path) = &args.store {
    let store = SqliteStore::open(store_path)
      .await
      .with_context(|| format!("opening store {}", store_path.display()))?;
    store
      .persist_run(deal_id, contract.clone())
      .await
      .context("persisting run")?;
  }

  if args.json {
    println!("{}", serde_json::to_string_pretty(&contract)?);
  } else {
    print!("{}", render_markdown(&contract, &catalog));
    println!();
    println!(
      "Decision: {:?} (score {}/100, run {})",
      contract.scoring.gate_result.decision,
      contract.scoring.overall_score,
      contract.run.run_id
    );
  }

  if let Some(error) = &contract.run.error {
    anyhow::bail!("run failed schema validation: {error}");
  }

  Ok(())
}
