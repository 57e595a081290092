//! Exportación del informe en texto plano y acción de compartir.
//! Ambas requieren que exista un análisis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{AnalysisResult, ChatMessage};

pub const MISSING_ANALYSIS_MESSAGE: &str = "Please upload and analyze a document first.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    #[error("{}", MISSING_ANALYSIS_MESSAGE)]
    MissingAnalysis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub filename: String,
    pub body: String,
}

pub fn export_report(
    result: Option<&AnalysisResult>,
    chat_history: &[ChatMessage],
    generated_at: DateTime<Utc>,
) -> Result<Report, ReportError> {
    let result = result.ok_or(ReportError::MissingAnalysis)?;
    Ok(Report {
        filename: format!("legal-analysis-report-{}.txt", generated_at.timestamp_millis()),
        body: render(result, chat_history, generated_at),
    })
}

fn render(result: &AnalysisResult, chat_history: &[ChatMessage], generated_at: DateTime<Utc>) -> String {
    let clauses: Vec<String> = result
        .clauses
        .iter()
        .map(|c| {
            format!(
                "{} ({})\n{}\n",
                c.title,
                c.category.as_str().to_uppercase(),
                c.explanation
            )
        })
        .collect();
    let risks: Vec<String> = result
        .risks
        .iter()
        .map(|r| {
            format!(
                "{} ({})\n{}\n",
                r.title,
                r.severity.as_str().to_uppercase(),
                r.description
            )
        })
        .collect();
    let key_points: Vec<String> = result.key_points.iter().map(|p| format!("• {p}")).collect();
    let chat: Vec<String> = chat_history
        .iter()
        .map(|m| format!("{}: {}\n", m.author.label().to_uppercase(), m.body))
        .collect();

    format!(
        "LEGAL DOCUMENT ANALYSIS REPORT
Generated by LegalAI
Date: {date}

DOCUMENT SUMMARY
Document Type: {doc_type}
Complexity Level: {complexity}
Risk Level: {risk}

SIMPLIFIED SUMMARY
{summary}

KEY CLAUSES EXPLAINED
{clauses}
RISK ASSESSMENT
{risks}
KEY POINTS
{key_points}

CHAT HISTORY
{chat}
---
This report is for informational purposes only and does not constitute legal advice.
Please consult with a qualified attorney for legal matters.
",
        date = generated_at.format("%Y-%m-%d"),
        doc_type = result.document_type_label,
        complexity = result.complexity,
        risk = result.risk_level,
        summary = result.summary,
        clauses = clauses.join("\n"),
        risks = risks.join("\n"),
        key_points = key_points.join("\n"),
        chat = chat.join("\n"),
    )
}

// ---------------------------------------------------------------------
// COMPARTIR
// ---------------------------------------------------------------------

pub const SHARE_TITLE: &str = "Legal Document Analysis";
pub const SHARE_TEXT: &str = "Check out my legal document analysis results!";

#[derive(Debug, Clone, Deserialize)]
pub struct ShareRequest {
    /// El navegador dispone de la API nativa de compartir.
    #[serde(default)]
    pub native_share: bool,
    pub page_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ShareAction {
    Native { title: String, text: String, url: String },
    Clipboard { text: String },
}

pub fn share(result: Option<&AnalysisResult>, request: &ShareRequest) -> Result<ShareAction, ReportError> {
    result.ok_or(ReportError::MissingAnalysis)?;
    if request.native_share {
        Ok(ShareAction::Native {
            title: SHARE_TITLE.to_string(),
            text: SHARE_TEXT.to_string(),
            url: request.page_url.clone(),
        })
    } else {
        Ok(ShareAction::Clipboard {
            text: format!("Check out my legal document analysis results: {}", request.page_url),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::models::FileHandle;
    use chrono::TimeZone;

    fn loan() -> AnalysisResult {
        analyze(&FileHandle::new("loan.pdf", 1)).unwrap()
    }

    #[test]
    fn export_without_analysis_is_rejected() {
        let err = export_report(None, &[], Utc::now()).unwrap_err();
        assert_eq!(err, ReportError::MissingAnalysis);
        assert_eq!(err.to_string(), MISSING_ANALYSIS_MESSAGE);
    }

    #[test]
    fn report_contains_every_section_and_the_chat() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        let history = vec![
            ChatMessage::assistant("I've analyzed your Loan Contract."),
            ChatMessage::user("What is the default rule?"),
        ];

        let report = export_report(Some(&loan()), &history, at).unwrap();

        assert_eq!(report.filename, format!("legal-analysis-report-{}.txt", at.timestamp_millis()));
        let body = &report.body;
        assert!(body.contains("Date: 2024-03-09"));
        assert!(body.contains("Document Type: Loan Contract"));
        assert!(body.contains("Risk Level: High"));
        assert!(body.contains("Interest Rate (WARNING)"));
        assert!(body.contains("Prepayment Penalty (HIGH)"));
        assert!(body.contains("• Loan amount: $25,000"));
        assert!(body.contains("ASSISTANT: I've analyzed your Loan Contract."));
        assert!(body.contains("USER: What is the default rule?"));
    }

    #[test]
    fn share_prefers_native_and_falls_back_to_clipboard() {
        let result = loan();
        let native = share(
            Some(&result),
            &ShareRequest {
                native_share: true,
                page_url: "https://x.test/".into(),
            },
        )
        .unwrap();
        assert!(matches!(native, ShareAction::Native { ref url, .. } if url == "https://x.test/"));

        let clipboard = share(
            Some(&result),
            &ShareRequest {
                native_share: false,
                page_url: "https://x.test/".into(),
            },
        )
        .unwrap();
        assert_eq!(
            clipboard,
            ShareAction::Clipboard {
                text: "Check out my legal document analysis results: https://x.test/".into()
            }
        );
    }

    #[test]
    fn share_requires_analysis() {
        let request = ShareRequest {
            native_share: true,
            page_url: String::new(),
        };
        assert_eq!(share(None, &request), Err(ReportError::MissingAnalysis));
    }
}
