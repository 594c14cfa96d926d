//! Retrieval intent detection over the user's question
//!
//! Three independent keyword classes, Vietnamese plus English. The flags
//! are non-exclusive: "kết quả theo quý năm nay" is latest, annual and
//! quarterly at once.

use regex::Regex;
use std::sync::LazyLock;

static LATEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"mới nhất|gần đây|hiện tại|năm nay|latest|recent|current").unwrap()
});

static ANNUAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"năm|year|annual|hàng năm|yearly").unwrap()
});

static QUARTERLY_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"quý|quarter|quarterly").unwrap()
});

/// Flags describing what kind of financial data the question asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievalIntent {
    /// Question asks for recent data (or no question was given)
    pub latest: bool,
    /// Question mentions annual figures
    pub annual: bool,
    /// Question mentions quarterly figures
    pub quarterly: bool,
}

impl RetrievalIntent {
    /// Detect intent flags from an optional question
    ///
    /// No question defaults to "latest": callers without a specific
    /// question get the most recent data.
    pub fn detect(question: Option<&str>) -> Self {
        match question {
            Some(q) => {
                let lowered = q.to_lowercase();
                Self {
                    latest: LATEST_RE.is_match(&lowered),
                    annual: ANNUAL_RE.is_match(&lowered),
                    quarterly: QUARTERLY_RE.is_match(&lowered),
                }
            }
            None => Self {
                latest: true,
                annual: false,
                quarterly: false,
            },
        }
    }
}
