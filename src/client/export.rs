//! CSV export
//!
//! `GET /expenses/export?format=csv` streams a file; the suggested name comes
//! from `Content-Disposition`.

use super::{ApiClient, Endpoint};
use crate::core::error::TracexResult;
use chrono::NaiveDate;
use regex::Regex;
use reqwest::Method;
use reqwest::header::CONTENT_DISPOSITION;
use std::sync::OnceLock;

/// Name used when the server does not suggest one
pub const DEFAULT_EXPORT_FILENAME: &str = "expenses.csv";

fn filename_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"filename="?([^";\n]+)"?"#).expect("valid filename regex"))
}

/// Optional narrowing of an export
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub category: Option<String>,
}

impl ExportQuery {
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("format", "csv".to_string())];
        if let Some(from) = self.from {
            pairs.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.to {
            pairs.push(("to", to.format("%Y-%m-%d").to_string()));
        }
        if let Some(category) = self
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            pairs.push(("category", category.to_string()));
        }
        pairs
    }
}

/// A downloaded export
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub filename: String,
    pub content: Vec<u8>,
}

impl CsvExport {
    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }
}

/// Extract the file name from a `Content-Disposition` header value
pub fn filename_from_disposition(header: Option<&str>) -> String {
    header
        .and_then(|value| filename_regex().captures(value))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_EXPORT_FILENAME.to_string())
}

impl ApiClient {
    /// Download expenses as CSV
    ///
    /// A failing export reports the server's `{error}` message, or the raw
    /// response text when the body is not JSON.
    pub async fn export_csv(&self, query: &ExportQuery) -> TracexResult<CsvExport> {
        let response = self
            .request(Method::GET, Endpoint::ExpenseExport, true)?
            .query(&query.to_query_pairs())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(self.error_from(response, true).await);
        }

        let filename = filename_from_disposition(
            response
                .headers()
                .get(CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok()),
        );
        let content = response.bytes().await?.to_vec();
        tracing::info!(filename = %filename, bytes = content.len(), "export downloaded");
        Ok(CsvExport { filename, content })
    }
}
