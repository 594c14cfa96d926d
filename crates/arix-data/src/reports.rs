//! Broker analysis report source
//!
//! Fetches report metadata for a ticker from the Simplize analysis-report
//! API. Reports arrive in the upstream's recency order; the age filter
//! parses the dd/MM/yyyy issue date and drops anything outside the window.

use crate::error::{DataError, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One broker-issued analysis report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    /// Upstream report id
    #[serde(default)]
    pub id: u64,
    /// Security the report covers
    pub ticker: String,
    /// Report title
    pub title: String,
    /// Issuing broker
    #[serde(default)]
    pub source: String,
    /// Issue date as dd/MM/yyyy
    pub issue_date: String,
    /// Free-text recommendation (contains MUA/GIỮ/BÁN tokens)
    #[serde(default)]
    pub recommend: String,
    /// Target price in currency units, when the broker stated one
    #[serde(default)]
    pub target_price: Option<f64>,
    /// URL of the attached document
    #[serde(default)]
    pub attached_link: String,
}

impl ReportMetadata {
    /// Issue date parsed as a calendar date, `None` when unparseable
    pub fn issue_date_parsed(&self) -> Option<NaiveDate> {
        parse_report_date(&self.issue_date)
    }
}

/// Capability interface over the report source
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// The `count` most recent reports, in upstream order
    async fn latest_reports(&self, ticker: &str, count: usize) -> Result<Vec<ReportMetadata>>;

    /// The `count` most recent reports no older than `max_age_days`
    async fn valid_reports(
        &self,
        ticker: &str,
        count: usize,
        max_age_days: i64,
    ) -> Result<Vec<ReportMetadata>>;
}

/// Simplize analysis-report API client
#[derive(Debug, Clone)]
pub struct SimplizeClient {
    client: Client,
    api_url: String,
}

impl SimplizeClient {
    /// Create a client for the given list endpoint URL
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_url: api_url.into(),
        }
    }

    /// Fetch one page of reports in the upstream's default order
    async fn fetch_reports(&self, ticker: &str, limit: usize) -> Result<Vec<ReportMetadata>> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("ticker", ticker.to_uppercase().as_str()),
                ("isWl", "false"),
                ("page", "0"),
                ("size", limit.to_string().as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DataError::Api(format!(
                "report list returned HTTP {}",
                response.status()
            )));
        }

        let wire: ReportListResponse = response.json().await?;
        let reports = wire.data.unwrap_or_default();

        if reports.is_empty() {
            return Err(DataError::NoReports {
                ticker: ticker.to_string(),
            });
        }

        Ok(reports)
    }
}

#[async_trait]
impl ReportSource for SimplizeClient {
    async fn latest_reports(&self, ticker: &str, count: usize) -> Result<Vec<ReportMetadata>> {
        let mut reports = self.fetch_reports(ticker, count.max(20)).await?;
        reports.truncate(count);
        debug!(ticker, count = reports.len(), "fetched latest reports");
        Ok(reports)
    }

    async fn valid_reports(
        &self,
        ticker: &str,
        count: usize,
        max_age_days: i64,
    ) -> Result<Vec<ReportMetadata>> {
        let reports = self.fetch_reports(ticker, (count * 2).max(20)).await?;

        let today = Local::now().date_naive();
        let mut valid = filter_reports_by_age(reports, max_age_days, today);

        if valid.is_empty() {
            return Err(DataError::NoRecentReports {
                ticker: ticker.to_string(),
                max_age_days,
            });
        }

        debug!(
            ticker,
            count = valid.len(),
            max_age_days,
            "reports within age window"
        );

        valid.truncate(count);
        Ok(valid)
    }
}

/// Keep only reports issued at most `max_age_days` before `today`
///
/// Reports whose issue date does not parse are dropped, not errored.
pub fn filter_reports_by_age(
    reports: Vec<ReportMetadata>,
    max_age_days: i64,
    today: NaiveDate,
) -> Vec<ReportMetadata> {
    reports
        .into_iter()
        .filter(|report| {
            let Some(issued) = report.issue_date_parsed() else {
                warn!(date = %report.issue_date, "cannot parse report date, dropping");
                return false;
            };

            let age_days = (today - issued).num_days();
            age_days <= max_age_days
        })
        .collect()
}

/// Parse a dd/MM/yyyy date string
///
/// Anything that does not split into exactly three numeric parts is `None`.
fn parse_report_date(date: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = date.split('/').collect();
    if parts.len() != 3 {
        return None;
    }

    let day: u32 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let year: i32 = parts[2].parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

#[derive(Debug, Deserialize)]
struct ReportListResponse {
    data: Option<Vec<ReportMetadata>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(issue_date: &str) -> ReportMetadata {
        ReportMetadata {
            id: 1,
            ticker: "VNM".to_string(),
            title: "Cập nhật KQKD".to_string(),
            source: "SSI".to_string(),
            issue_date: issue_date.to_string(),
            recommend: "MUA".to_string(),
            target_price: Some(85_000.0),
            attached_link: "https://example.com/report.pdf".to_string(),
        }
    }

    #[test]
    fn test_parse_valid_date() {
        assert_eq!(
            parse_report_date("05/09/2025"),
            NaiveDate::from_ymd_opt(2025, 9, 5)
        );
        // Single-digit day and month are fine
        assert_eq!(
            parse_report_date("5/9/2025"),
            NaiveDate::from_ymd_opt(2025, 9, 5)
        );
    }

    #[test]
    fn test_parse_invalid_date() {
        assert_eq!(parse_report_date("N/A"), None);
        assert_eq!(parse_report_date(""), None);
        assert_eq!(parse_report_date("2025-09-05"), None);
        assert_eq!(parse_report_date("32/13/2025"), None);
    }

    #[test]
    fn test_age_filter_window() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 10).unwrap();
        let reports = vec![
            report("05/09/2025"), // 5 days old, kept
            report("01/06/2025"), // over 60 days old, dropped
            report("N/A"),        // unparseable, dropped without error
        ];

        let kept = filter_reports_by_age(reports, 60, today);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].issue_date, "05/09/2025");
    }

    #[test]
    fn test_age_filter_boundary() {
        let today = NaiveDate::from_ymd_opt(2025, 9, 10).unwrap();
        let kept = filter_reports_by_age(vec![report("12/07/2025")], 60, today);
        // Exactly 60 days old is still inside the window
        assert_eq!(kept.len(), 1);

        let kept = filter_reports_by_age(vec![report("11/07/2025")], 60, today);
        assert_eq!(kept.len(), 0);
    }

    #[test]
    fn test_wire_deserialization_tolerates_extra_fields() {
        let json = r#"{
            "data": [{
                "id": 9,
                "ticker": "VNM",
                "tickerName": "Vinamilk",
                "reportType": 1,
                "source": "HSC",
                "issueDate": "05/09/2025",
                "issueDateTimeAgo": "5 ngày",
                "title": "KQKD Q2",
                "attachedLink": "https://cdn.example.com/r.pdf",
                "fileName": "r.pdf",
                "targetPrice": 90000,
                "recommend": "MUA"
            }]
        }"#;

        let wire: ReportListResponse = serde_json::from_str(json).unwrap();
        let reports = wire.data.unwrap();
        assert_eq!(reports[0].target_price, Some(90_000.0));
        assert_eq!(reports[0].attached_link, "https://cdn.example.com/r.pdf");
    }

    #[test]
    fn test_wire_deserialization_missing_target_price() {
        let json = r#"{
            "data": [{
                "ticker": "VNM",
                "issueDate": "05/09/2025",
                "title": "KQKD Q2"
            }]
        }"#;

        let wire: ReportListResponse = serde_json::from_str(json).unwrap();
        let reports = wire.data.unwrap();
        assert_eq!(reports[0].target_price, None);
        assert!(reports[0].recommend.is_empty());
    }
}
