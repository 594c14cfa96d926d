//! Financial data ingestion
//!
//! Fetches a company's statement sections from the insight API, flattens
//! them into small text blocks, embeds each block and upserts the points
//! into the vector store the retrieval engine reads from.
//!
//! Usage:
//!   ingest VIC
//!   ingest VIC HPG FPT
//!
//! The first ticker recreates the collection; subsequent tickers append.

use anyhow::{Context, Result};
use arix_llm::{EmbeddingProvider, OpenAiConfig, OpenAiEmbedder, OpenAiProvider};
use arix_retrieval::{FinancialDataPoint, PointRecord, QdrantStore, VectorStore};
use arix_server::config::AppConfig;
use clap::Parser;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Vector dimension of the embedding model deployment
const EMBEDDING_DIMENSIONS: usize = 3072;

/// Statement sections ingested per company
const SECTIONS: &[&str] = &[
    "financial-statement?section=CASH_FLOW",
    "financial-statement?section=INCOME_STATEMENT",
    "financial-statement?section=BALANCE_SHEET",
    "statistics-financial",
];

/// Key statistics fields worth embedding
const STATISTICS_FIELDS: &[&str] = &[
    "marketCap",
    "pe",
    "pb",
    "ps",
    "roe",
    "roa",
    "eps",
    "bvps",
    "grossMargin",
    "ebitMargin",
    "afterTaxProfitMargin",
    "currentRatio",
    "quickRatio",
    "debtPerEquity",
    "debtToEquity",
    "revenue",
    "grossProfit",
    "netProfit",
    "totalAssets",
    "totalEquity",
];

/// Field prefixes kept from statement year rows
const STATEMENT_PREFIXES: &[&str] = &["cfa", "isa", "bsa"];

/// Line cap per statement year block
const STATEMENT_LINE_CAP: usize = 30;

#[derive(Parser, Debug)]
#[command(name = "ingest", about = "Ingest financial data into the vector store")]
struct Args {
    /// Ticker symbols to ingest
    #[arg(required = true)]
    tickers: Vec<String>,

    /// Append to the existing collection instead of recreating it
    #[arg(long)]
    keep_collection: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    arix_server::init_tracing();

    let args = Args::parse();

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(args))
}

async fn run(args: Args) -> Result<()> {
    let config = AppConfig::from_env()?;
    config.validate()?;

    let provider = Arc::new(OpenAiProvider::with_config(
        OpenAiConfig::new(config.openai_api_key.clone())
            .with_completion_url(config.openai_api_url.clone())
            .with_embedding_url(config.openai_embedding_url.clone()),
    )?);
    let embedder = OpenAiEmbedder::new(provider, config.embedding_model.clone());

    let store = QdrantStore::new(
        &config.qdrant_host,
        config.qdrant_port,
        config.qdrant_collection.clone(),
    );
    let client = reqwest::Client::new();

    info!(
        tickers = ?args.tickers,
        collection = %config.qdrant_collection,
        "starting financial data ingestion"
    );

    for (index, ticker) in args.tickers.iter().enumerate() {
        let ticker = ticker.to_uppercase();
        info!(
            ticker = %ticker,
            progress = %format!("{}/{}", index + 1, args.tickers.len()),
            "processing ticker"
        );

        let recreate = index == 0 && !args.keep_collection;
        ingest_ticker(&client, &store, &embedder, &config, &ticker, recreate).await?;
    }

    info!("ingestion finished");
    Ok(())
}

async fn ingest_ticker(
    client: &reqwest::Client,
    store: &QdrantStore,
    embedder: &OpenAiEmbedder,
    config: &AppConfig,
    ticker: &str,
    recreate: bool,
) -> Result<()> {
    if recreate {
        info!(collection = store.collection(), "recreating collection");
        store
            .delete_collection()
            .await
            .context("failed to drop collection")?;
    }
    store
        .ensure_collection(EMBEDDING_DIMENSIONS)
        .await
        .context("failed to create collection")?;

    // Fetch every section; one failing section skips, it does not abort
    let mut blocks = Vec::new();
    for &section in SECTIONS {
        let url = format!("{}/{}/{}", config.iqx_insight_api_url, ticker, section);
        info!(url = %url, "fetching section");

        match fetch_section(client, &url).await {
            Ok(data) => blocks.push((section_name(section), data)),
            Err(e) => warn!(section, error = %e, "section fetch failed, skipping"),
        }
    }

    let mut texts = Vec::new();
    for (section, data) in &blocks {
        texts.extend(flatten_to_texts(section, data));
    }
    info!(count = texts.len(), "flattened data points");

    let offset = if recreate {
        0
    } else {
        store.max_point_id().await?.map_or(0, |id| id + 1)
    };

    let mut points = Vec::with_capacity(texts.len());
    for (i, block) in texts.iter().enumerate() {
        match embedder.embed(&block.text).await {
            Ok(vector) => {
                points.push(PointRecord {
                    id: offset + i as u64,
                    vector,
                    payload: FinancialDataPoint {
                        text: block.text.clone(),
                        section: block.section.clone(),
                        ticker: ticker.to_string(),
                        year: block.year,
                        quarter: block.quarter,
                    },
                });
                if (i + 1) % 10 == 0 {
                    info!(processed = i + 1, total = texts.len(), "embedding progress");
                }
            }
            Err(e) => warn!(index = i, error = %e, "embedding failed, skipping point"),
        }
    }

    info!(count = points.len(), "upserting points");
    store.upsert(points).await.context("failed to upsert points")?;

    info!(ticker, "ticker ingested");
    Ok(())
}

async fn fetch_section(client: &reqwest::Client, url: &str) -> Result<Value> {
    let response = client.get(url).send().await?;
    anyhow::ensure!(
        response.status().is_success(),
        "section returned HTTP {}",
        response.status()
    );
    Ok(response.json().await?)
}

/// Strip the query string so the stored section is the bare name
fn section_name(section: &str) -> String {
    section
        .split_once('?')
        .map_or(section, |(name, _)| name)
        .to_string()
}

/// One flattened text block ready for embedding
#[derive(Debug, Clone, PartialEq)]
struct TextBlock {
    text: String,
    section: String,
    year: Option<u32>,
    quarter: Option<u32>,
}

/// Flatten one section response into embeddable text blocks
///
/// Two upstream shapes: the statistics series is an array of per-period
/// metric rows; statement sections are an object with a `years` array.
fn flatten_to_texts(section: &str, data: &Value) -> Vec<TextBlock> {
    let Some(raw) = data.get("data") else {
        return Vec::new();
    };

    match raw {
        Value::Array(items) => flatten_statistics(section, items),
        Value::Object(_) => flatten_statement_years(section, raw),
        _ => Vec::new(),
    }
}

fn flatten_statistics(section: &str, items: &[Value]) -> Vec<TextBlock> {
    let mut texts = Vec::new();

    for item in items {
        let year = item.get("year").and_then(Value::as_u64).map(|y| y as u32);
        let quarter = item
            .get("quarter")
            .and_then(Value::as_u64)
            .map(|q| q as u32);

        let period = match (year, quarter) {
            (Some(y), Some(q)) => format!("Q{q}/{y}"),
            (Some(y), None) => y.to_string(),
            _ => String::new(),
        };

        let metrics: Vec<String> = STATISTICS_FIELDS
            .iter()
            .filter_map(|key| {
                let value = item.get(*key)?;
                if value.is_null() {
                    return None;
                }
                let rendered = render_value(value);
                if rendered.is_empty() {
                    return None;
                }
                Some(format!("{key}: {rendered}"))
            })
            .collect();

        if !metrics.is_empty() && !period.is_empty() {
            texts.push(TextBlock {
                text: format!("{section} ({period})\n{}", metrics.join("\n")),
                section: section.to_string(),
                year,
                quarter,
            });
        }
    }

    texts
}

fn flatten_statement_years(section: &str, raw: &Value) -> Vec<TextBlock> {
    let Some(years) = raw.get("years").and_then(Value::as_array) else {
        return Vec::new();
    };

    let mut texts = Vec::new();

    // Last 3 reporting years
    let start = years.len().saturating_sub(3);
    for year_row in &years[start..] {
        let Some(year) = year_row.get("yearReport").and_then(Value::as_u64) else {
            continue;
        };

        let Some(fields) = year_row.as_object() else {
            continue;
        };

        let metrics: Vec<String> = fields
            .iter()
            .filter(|(key, value)| {
                let keep_key = STATEMENT_PREFIXES
                    .iter()
                    .any(|prefix| key.to_lowercase().starts_with(prefix));
                let keep_value = !value.is_null()
                    && value.as_str() != Some("")
                    && value.as_u64() != Some(0)
                    && value.as_f64() != Some(0.0);
                keep_key && keep_value
            })
            .map(|(key, value)| format!("{}: {}", key.to_uppercase(), render_value(value)))
            .take(STATEMENT_LINE_CAP)
            .collect();

        if !metrics.is_empty() {
            texts.push(TextBlock {
                text: format!("{section} - Năm {year}\n{}", metrics.join("\n")),
                section: section.to_string(),
                year: Some(year as u32),
                quarter: None,
            });
        }
    }

    texts
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_name_strips_query() {
        assert_eq!(
            section_name("financial-statement?section=CASH_FLOW"),
            "financial-statement"
        );
        assert_eq!(section_name("statistics-financial"), "statistics-financial");
    }

    #[test]
    fn test_flatten_statistics_rows() {
        let data = json!({
            "data": [
                { "year": 2025, "quarter": 2, "pe": 14.2, "roe": 18.5, "ignored": 1 },
                { "year": 2024, "quarter": 5, "revenue": 61000 },
                { "year": 2024, "quarter": 1 },
                { "pe": 10.0 }
            ]
        });

        let texts = flatten_to_texts("statistics-financial", &data);

        // Rows without metrics or without a period are dropped
        assert_eq!(texts.len(), 2);
        assert!(texts[0].text.starts_with("statistics-financial (Q2/2025)\n"));
        assert!(texts[0].text.contains("pe: 14.2"));
        assert!(texts[0].text.contains("roe: 18.5"));
        assert!(!texts[0].text.contains("ignored"));
        assert_eq!(texts[0].quarter, Some(2));

        assert!(texts[1].text.contains("(Q5/2024)"));
        assert_eq!(texts[1].quarter, Some(5));
    }

    #[test]
    fn test_flatten_statement_years() {
        let data = json!({
            "data": {
                "years": [
                    { "yearReport": 2021, "isaRevenue": 100 },
                    { "yearReport": 2022, "isaRevenue": 110 },
                    { "yearReport": 2023, "isaRevenue": 120, "bsaTotalAssets": 900, "other": 5 },
                    { "yearReport": 2024, "cfaOperating": 80, "isaEmpty": null, "isaZero": 0 }
                ]
            }
        });

        let texts = flatten_to_texts("financial-statement", &data);

        // Only the last 3 years are kept
        assert_eq!(texts.len(), 3);
        assert!(texts[0].text.starts_with("financial-statement - Năm 2022\n"));
        assert!(texts[1].text.contains("ISAREVENUE: 120"));
        assert!(texts[1].text.contains("BSATOTALASSETS: 900"));
        assert!(!texts[1].text.contains("OTHER"));

        // Null and zero values are dropped
        assert_eq!(texts[2].text, "financial-statement - Năm 2024\nCFAOPERATING: 80");
    }

    #[test]
    fn test_flatten_tolerates_missing_data() {
        assert!(flatten_to_texts("s", &json!({})).is_empty());
        assert!(flatten_to_texts("s", &json!({ "data": null })).is_empty());
        assert!(flatten_to_texts("s", &json!({ "data": "weird" })).is_empty());
    }
}
