//! OHLC price series source and derived summary
//!
//! Fetches day-granularity bar series from the IQX gap-chart API and turns
//! them into the descriptive text block the analysis prompt leads with:
//! summary figures, a trend label from fixed percent-change thresholds, and
//! a table of the most recent sessions.

use crate::error::{DataError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One symbol's OHLCV series, parallel arrays as delivered by the API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcSeries {
    /// Security symbol
    pub symbol: String,
    /// Open prices
    pub o: Vec<f64>,
    /// High prices
    pub h: Vec<f64>,
    /// Low prices
    pub l: Vec<f64>,
    /// Close prices
    pub c: Vec<f64>,
    /// Traded volumes
    pub v: Vec<f64>,
    /// Bar timestamps, unix seconds as strings
    pub t: Vec<String>,
}

/// Trend label from the fixed percent-change threshold table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    /// Change above +2%
    StrongUp,
    /// Change above +0.5%
    MildUp,
    /// Change within ±0.5%
    Sideways,
    /// Change below -0.5%
    MildDown,
    /// Change below -2%
    StrongDown,
}

impl Trend {
    /// Classify a percent change over the fetched window
    pub fn classify(change_percent: f64) -> Self {
        if change_percent > 2.0 {
            Self::StrongUp
        } else if change_percent > 0.5 {
            Self::MildUp
        } else if change_percent < -2.0 {
            Self::StrongDown
        } else if change_percent < -0.5 {
            Self::MildDown
        } else {
            Self::Sideways
        }
    }

    /// Label used in prompt text
    pub fn label(&self) -> &'static str {
        match self {
            Self::StrongUp => "Tăng mạnh",
            Self::MildUp => "Tăng nhẹ",
            Self::Sideways => "Sideway",
            Self::MildDown => "Giảm nhẹ",
            Self::StrongDown => "Giảm mạnh",
        }
    }
}

/// Derived price summary for one symbol (computed, never stored)
#[derive(Debug, Clone)]
pub struct PriceSummary {
    /// Security symbol
    pub symbol: String,
    /// Latest close
    pub latest_price: f64,
    /// Absolute change vs the oldest bar in the window
    pub price_change: f64,
    /// Percent change vs the oldest bar in the window
    pub price_change_percent: f64,
    /// Highest high in the window
    pub highest_price: f64,
    /// Lowest low in the window
    pub lowest_price: f64,
    /// Total traded volume
    pub total_volume: f64,
    /// Average per-bar volume
    pub average_volume: f64,
    /// Trend classification
    pub trend: Trend,
    /// Number of bars in the window
    pub data_points: usize,
}

/// Capability interface over the market data source
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch day bars for the given symbols, ending at 07:00 today
    ///
    /// `count_back` defaults to `symbols.len() * 60` bars.
    async fn ohlc(
        &self,
        symbols: &[String],
        count_back: Option<usize>,
    ) -> Result<Vec<OhlcSeries>>;
}

/// IQX gap-chart API client
#[derive(Debug, Clone)]
pub struct IqxPriceClient {
    client: Client,
    api_url: String,
}

impl IqxPriceClient {
    /// Create a client for the given chart endpoint URL
    pub fn new(api_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
        })
    }

    /// Fetch and format all symbols under one market overview header
    pub async fn market_overview(&self, symbols: &[String]) -> Result<String> {
        let series_list = self.ohlc(symbols, None).await?;
        format_market_overview(&series_list)
    }
}

#[async_trait]
impl PriceSource for IqxPriceClient {
    async fn ohlc(
        &self,
        symbols: &[String],
        count_back: Option<usize>,
    ) -> Result<Vec<OhlcSeries>> {
        let request = OhlcRequest {
            time_frame: "ONE_DAY".to_string(),
            symbols: symbols.to_vec(),
            to: seven_am_today(),
            count_back: count_back.unwrap_or(symbols.len() * 60),
        };

        debug!(symbols = ?request.symbols, count_back = request.count_back, "fetching price data");

        let response = self
            .client
            .post(&self.api_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DataError::Api(format!(
                "price chart returned HTTP {}",
                response.status()
            )));
        }

        let series: Vec<OhlcSeries> = response.json().await?;
        debug!(count = series.len(), "received price series");
        Ok(series)
    }
}

/// Unix timestamp of today 07:00 local time
fn seven_am_today() -> i64 {
    let now = Local::now();
    now.date_naive()
        .and_hms_opt(7, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).single())
        .map_or_else(|| now.timestamp(), |dt| dt.timestamp())
}

/// Compute the derived summary for one series
pub fn summarize(series: &OhlcSeries) -> Result<PriceSummary> {
    if series.c.is_empty() {
        return Err(DataError::NoPriceData {
            symbol: series.symbol.clone(),
        });
    }

    let latest_price = series.c[series.c.len() - 1];
    let oldest_price = series.c[0];
    let price_change = latest_price - oldest_price;
    let price_change_percent = price_change / oldest_price * 100.0;

    let highest_price = series.h.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let lowest_price = series.l.iter().copied().fold(f64::INFINITY, f64::min);

    let total_volume: f64 = series.v.iter().sum();
    let average_volume = if series.v.is_empty() {
        0.0
    } else {
        total_volume / series.v.len() as f64
    };

    Ok(PriceSummary {
        symbol: series.symbol.clone(),
        latest_price,
        price_change,
        price_change_percent,
        highest_price,
        lowest_price,
        total_volume,
        average_volume,
        trend: Trend::classify(price_change_percent),
        data_points: series.c.len(),
    })
}

/// Render one series as the prompt text block: summary plus recent sessions
pub fn format_for_prompt(series: &OhlcSeries) -> Result<String> {
    let summary = summarize(series)?;

    let mut text = format!("## 📊 DỮ LIỆU GIÁ CỔ PHIẾU {}\n\n", series.symbol);

    text += &format!(
        "### Tóm tắt ({} ngày giao dịch gần nhất)\n",
        summary.data_points
    );
    text += &format!(
        "- **Giá hiện tại:** {} VNĐ\n",
        format_number(summary.latest_price)
    );
    text += &format!(
        "- **Thay đổi:** {} VNĐ ({}%)\n",
        format_signed(summary.price_change),
        format_signed_percent(summary.price_change_percent)
    );
    text += &format!("- **Xu hướng:** {}\n", summary.trend.label());
    text += &format!(
        "- **Biên độ giá:** {} - {} VNĐ\n",
        format_number(summary.lowest_price),
        format_number(summary.highest_price)
    );
    text += &format!(
        "- **Giá cao nhất:** {} VNĐ\n",
        format_number(summary.highest_price)
    );
    text += &format!(
        "- **Giá thấp nhất:** {} VNĐ\n",
        format_number(summary.lowest_price)
    );
    text += &format!(
        "- **Volume trung bình:** {} CP\n",
        format_number(summary.average_volume.round())
    );
    text += &format!(
        "- **Tổng volume:** {} CP\n\n",
        format_number(summary.total_volume.round())
    );

    let recent = series.c.len().min(5);
    text += &format!("### Chi tiết {recent} phiên giao dịch gần nhất\n");
    text += "| Ngày | Mở cửa | Cao nhất | Thấp nhất | Đóng cửa | Thay đổi | Volume |\n";
    text += "|------|--------|----------|-----------|----------|----------|--------|\n";

    for i in (series.c.len() - recent)..series.c.len() {
        let date = series
            .t
            .get(i)
            .and_then(|t| t.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .map_or_else(
                || "N/A".to_string(),
                |dt| dt.with_timezone(&Local).format("%d/%m/%Y").to_string(),
            );

        let (change, change_percent) = if i > 0 {
            let change = series.c[i] - series.c[i - 1];
            (change, change / series.c[i - 1] * 100.0)
        } else {
            (0.0, 0.0)
        };

        text += &format!(
            "| {} | {} | {} | {} | {} | {} ({:.2}%) | {} |\n",
            date,
            format_number(series.o[i]),
            format_number(series.h[i]),
            format_number(series.l[i]),
            format_number(series.c[i]),
            format_signed(change),
            change_percent,
            format_number(series.v[i])
        );
    }

    text += "\n";
    Ok(text)
}

/// Render several series under one market overview header
pub fn format_market_overview(series_list: &[OhlcSeries]) -> Result<String> {
    let mut text = String::from("# 📈 DỮ LIỆU GIÁ THỊ TRƯỜNG\n\n");

    for series in series_list {
        text += &format_for_prompt(series)?;
        text += &format!("{}\n\n", "=".repeat(80));
    }

    Ok(text)
}

/// Group an amount with thousands separators, keeping up to two decimals
fn format_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    let negative = rounded < 0.0;
    let abs = rounded.abs();
    let int_part = abs.trunc() as u64;
    let cents = ((abs - abs.trunc()) * 100.0).round() as u64;

    let digits = int_part.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if cents > 0 {
        if cents % 10 == 0 {
            out.push_str(&format!(".{}", cents / 10));
        } else {
            out.push_str(&format!(".{cents:02}"));
        }
    }
    out
}

fn format_signed(value: f64) -> String {
    if value > 0.0 {
        format!("+{}", format_number(value))
    } else {
        format_number(value)
    }
}

fn format_signed_percent(value: f64) -> String {
    if value > 0.0 {
        format!("+{value:.2}")
    } else {
        format!("{value:.2}")
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OhlcRequest {
    time_frame: String,
    symbols: Vec<String>,
    to: i64,
    count_back: usize,
}
