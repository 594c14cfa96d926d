//! Context fusion: one bounded prompt body out of heterogeneous data
//!
//! Pure assembly, no I/O. The order is fixed: price summary, then the
//! broker PDF blocks (the primary source), then the financial statement
//! data (reference only), then the question and the instruction footer.
//! The downstream model is instructed to weight primary and reference
//! material unequally, so primary blocks must always come first.

use arix_data::ReportMetadata;
use arix_retrieval::RetrievalOutcome;

/// Separator rule between fused blocks
const SEPARATOR_WIDTH: usize = 80;

/// Inputs to the fusion builder, all fetched by the orchestrator
pub struct FusionInput<'a> {
    /// Ticker under analysis
    pub ticker: &'a str,
    /// Recency bias year for the instruction lines
    pub current_year: u16,
    /// Pre-rendered price block (or a placeholder notice)
    pub price_text: &'a str,
    /// Broker reports, paired with `documents` by index
    pub reports: &'a [ReportMetadata],
    /// Extracted document texts, one per report
    pub documents: &'a [String],
    /// Output of the retrieval engine
    pub retrieval: &'a RetrievalOutcome,
    /// The user's question
    pub question: &'a str,
}

/// Counts of recommendation categories across the report set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecommendationTally {
    /// Reports recommending to buy
    pub buy: usize,
    /// Reports recommending to hold
    pub hold: usize,
    /// Reports recommending to sell
    pub sell: usize,
}

impl RecommendationTally {
    /// Tally recommendation tokens across the reports
    ///
    /// Substring match on the upstream's Vietnamese category tokens; "LẬP"
    /// covers the "TRUNG LẬP" (neutral) wording brokers use for hold.
    pub fn count(reports: &[ReportMetadata]) -> Self {
        let mut tally = Self::default();
        for report in reports {
            if report.recommend.contains("MUA") {
                tally.buy += 1;
            }
            if report.recommend.contains("GIỮ") || report.recommend.contains("LẬP") {
                tally.hold += 1;
            }
            if report.recommend.contains("BÁN") {
                tally.sell += 1;
            }
        }
        tally
    }
}

/// Mean target price over the reports that state one
pub fn average_target_price(reports: &[ReportMetadata]) -> Option<f64> {
    let prices: Vec<f64> = reports.iter().filter_map(|r| r.target_price).collect();
    if prices.is_empty() {
        None
    } else {
        Some(prices.iter().sum::<f64>() / prices.len() as f64)
    }
}

/// Assemble the fused context body
///
/// `report_char_cap` bounds each primary block's document text.
pub fn build_fused_context(input: &FusionInput<'_>, report_char_cap: usize) -> String {
    let separator = "=".repeat(SEPARATOR_WIDTH);
    let mut context = String::new();

    // (a) price data leads
    context += input.price_text;

    context += &format!(
        "# Phân tích cổ phiếu {} ({})\n\n",
        input.ticker, input.current_year
    );

    // (b) primary source header
    context += "## 🎯 NGUỒN DỮ LIỆU CHÍNH: Phân tích từ các công ty chứng khoán (PDF)\n\n";

    // (c) aggregate recommendation view
    context += "## 📊 Tổng quan đánh giá\n";
    let tally = RecommendationTally::count(input.reports);
    context += &format!(
        "- Các đánh giá: Mua ({}), Nắm giữ ({}), Bán ({})\n",
        tally.buy, tally.hold, tally.sell
    );
    if let Some(average) = average_target_price(input.reports) {
        context += &format!("- Giá mục tiêu ước tính: {:.0} VNĐ\n", average.round());
    }
    context += &format!("\n{separator}\n\n");

    // (d) per-report primary blocks
    for (index, report) in input.reports.iter().enumerate() {
        context += &format!("## 📄 Phân tích {} [NGUỒN CHÍNH]\n", index + 1);
        context += &format!("- **Tiêu đề:** {}\n", report.title);
        context += &format!("- **Ngày:** {}\n", report.issue_date);
        context += &format!("- **Đánh giá:** {}\n", report.recommend);
        context += &format!(
            "- **Giá mục tiêu:** {}\n\n",
            report
                .target_price
                .map_or_else(|| "N/A".to_string(), |p| format!("{p:.0} VNĐ"))
        );

        let content = input.documents.get(index).map_or("", String::as_str);
        context += &format!("### Nội dung:\n{}\n\n", truncate_chars(content, report_char_cap));
        context += &format!("{separator}\n\n");
    }

    // (e) reference-only financial data, only when retrieval succeeded
    if input.retrieval.has_context() {
        context += "\n## 📑 Dữ liệu báo cáo tài chính [CHỈ THAM KHẢO]\n\n";
        context += &input.retrieval.context;
        context += &format!("\n\n{separator}\n\n");
    }

    // (f) the question, (g) the restated instructions
    context += &format!("\n**Câu hỏi:** {}\n\n", input.question);
    context += "**LƯU Ý QUAN TRỌNG:**\n";
    context += "- Phân tích BẮT BUỘC dựa vào nội dung PDF từ các công ty chứng khoán\n";
    context += "- Báo cáo tài chính CHỈ để tham khảo thêm\n";
    context += &format!(
        "- Luôn ưu tiên dữ liệu MỚI NHẤT (năm {})\n",
        input.current_year
    );
    context += "- Độ dài: 500-700 từ\n";
    context += "- Không bịa đặt, không nhắc nguồn";

    context
}

fn truncate_chars(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else {
        text.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(recommend: &str, target_price: Option<f64>) -> ReportMetadata {
        ReportMetadata {
            id: 0,
            ticker: "VNM".to_string(),
            title: "Báo cáo cập nhật".to_string(),
            source: "SSI".to_string(),
            issue_date: "05/09/2025".to_string(),
            recommend: recommend.to_string(),
            target_price,
            attached_link: String::new(),
        }
    }

    fn retrieval(success: bool, context: &str) -> RetrievalOutcome {
        RetrievalOutcome {
            success,
            context: context.to_string(),
            data_points: usize::from(!context.is_empty()),
            error: None,
        }
    }

    fn input<'a>(
        reports: &'a [ReportMetadata],
        documents: &'a [String],
        retrieval: &'a RetrievalOutcome,
    ) -> FusionInput<'a> {
        FusionInput {
            ticker: "VNM",
            current_year: 2025,
            price_text: "## 📊 DỮ LIỆU GIÁ CỔ PHIẾU VNM\n\n",
            reports,
            documents,
            retrieval,
            question: "triển vọng thế nào?",
        }
    }

    #[test]
    fn test_recommendation_tally() {
        let reports = vec![
            report("MUA", None),
            report("MUA MẠNH", None),
            report("NẮM GIỮ", None),
            report("TRUNG LẬP", None),
            report("BÁN", None),
        ];

        let tally = RecommendationTally::count(&reports);
        assert_eq!(tally.buy, 2);
        assert_eq!(tally.hold, 2);
        assert_eq!(tally.sell, 1);
    }

    #[test]
    fn test_average_target_price_skips_missing() {
        let reports = vec![
            report("MUA", Some(80_000.0)),
            report("MUA", None),
            report("GIỮ", Some(90_000.0)),
        ];

        assert_eq!(average_target_price(&reports), Some(85_000.0));
        assert_eq!(average_target_price(&[report("MUA", None)]), None);
    }

    #[test]
    fn test_primary_blocks_precede_reference_block() {
        let reports = vec![report("MUA", Some(80_000.0)), report("BÁN", None)];
        let documents = vec!["pdf một".to_string(), "pdf hai".to_string()];
        let rag = retrieval(true, "[Dữ liệu 1 - Q5/2024]\nroe: 15");
        let context = build_fused_context(&input(&reports, &documents, &rag), 8000);

        let last_primary = context.rfind("[NGUỒN CHÍNH]").unwrap();
        let reference = context.find("[CHỈ THAM KHẢO]").unwrap();
        assert!(last_primary < reference);

        // Question and footer close the payload
        let question_at = context.find("**Câu hỏi:**").unwrap();
        assert!(reference < question_at);
        assert!(context.ends_with("- Không bịa đặt, không nhắc nguồn"));
    }

    #[test]
    fn test_price_text_leads() {
        let reports = vec![report("MUA", None)];
        let documents = vec!["pdf".to_string()];
        let rag = retrieval(true, "dữ liệu");
        let context = build_fused_context(&input(&reports, &documents, &rag), 8000);
        assert!(context.starts_with("## 📊 DỮ LIỆU GIÁ CỔ PHIẾU VNM"));
    }

    #[test]
    fn test_failed_retrieval_omits_reference_block() {
        let reports = vec![report("MUA", None)];
        let documents = vec!["pdf".to_string()];
        let rag = retrieval(false, "");
        let context = build_fused_context(&input(&reports, &documents, &rag), 8000);
        assert!(!context.contains("[CHỈ THAM KHẢO]"));
        assert!(context.contains("**Câu hỏi:** triển vọng thế nào?"));
    }

    #[test]
    fn test_empty_retrieval_context_omitted_even_on_success() {
        let reports = vec![report("MUA", None)];
        let documents = vec!["pdf".to_string()];
        let rag = retrieval(true, "");
        let context = build_fused_context(&input(&reports, &documents, &rag), 8000);
        assert!(!context.contains("[CHỈ THAM KHẢO]"));
    }

    #[test]
    fn test_document_text_is_capped() {
        let reports = vec![report("MUA", None)];
        let documents = vec!["x".repeat(10_000)];
        let rag = retrieval(false, "");
        let context = build_fused_context(&input(&reports, &documents, &rag), 8000);

        let longest_run = context
            .split(|c| c != 'x')
            .map(str::len)
            .max()
            .unwrap_or(0);
        assert_eq!(longest_run, 8000);
    }

    #[test]
    fn test_no_average_line_without_target_prices() {
        let reports = vec![report("MUA", None), report("MUA", None), report("GIỮ", None)];
        let documents = vec![String::new(), String::new(), String::new()];
        let rag = retrieval(false, "");
        let context = build_fused_context(&input(&reports, &documents, &rag), 8000);
        assert!(!context.contains("Giá mục tiêu ước tính"));
        assert!(context.contains("Mua (2), Nắm giữ (1), Bán (0)"));
    }
}
