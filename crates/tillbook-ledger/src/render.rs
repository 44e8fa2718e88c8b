//! # Report Rendering
//!
//! The ledger hands finished reports to a [`ReportRenderer`] and replies
//! with whatever file it produced. The default renderer writes
//! pretty-printed JSON into the configured report directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use tillbook_core::report::{CashFlowReport, ReportWindow};
use tillbook_core::BestSeller;

use crate::error::RenderError;

/// A report ready to be exported.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportDocument {
    CashFlow {
        title: String,
        generated_at: DateTime<Utc>,
        report: CashFlowReport,
    },
    BestSellers {
        title: String,
        generated_at: DateTime<Utc>,
        window: ReportWindow,
        products: Vec<BestSeller>,
    },
}

impl ReportDocument {
    pub fn title(&self) -> &str {
        match self {
            ReportDocument::CashFlow { title, .. } | ReportDocument::BestSellers { title, .. } => {
                title
            }
        }
    }

    fn window(&self) -> &ReportWindow {
        match self {
            ReportDocument::CashFlow { report, .. } => &report.window,
            ReportDocument::BestSellers { window, .. } => window,
        }
    }

    fn generated_at(&self) -> DateTime<Utc> {
        match self {
            ReportDocument::CashFlow { generated_at, .. }
            | ReportDocument::BestSellers { generated_at, .. } => *generated_at,
        }
    }

    /// e.g. `cashflow-2026-03-01-20260331T181500.json`
    pub fn file_name(&self) -> String {
        let kind = match self {
            ReportDocument::CashFlow { .. } => "cashflow",
            ReportDocument::BestSellers { .. } => "bestsellers",
        };
        format!(
            "{kind}-{}-{}.json",
            self.window().start.format("%Y-%m-%d"),
            self.generated_at().format("%Y%m%dT%H%M%S")
        )
    }
}

/// Turns a report into a file the transport can send.
#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(&self, document: &ReportDocument) -> Result<PathBuf, RenderError>;
}

/// Writes reports as JSON files.
#[derive(Debug, Clone)]
pub struct JsonReportRenderer {
    dir: PathBuf,
}

impl JsonReportRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonReportRenderer { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ReportRenderer for JsonReportRenderer {
    async fn render(&self, document: &ReportDocument) -> Result<PathBuf, RenderError> {
        let path = self.dir.join(document.file_name());
        debug!(path = %path.display(), "Rendering report");

        let body = serde_json::to_vec_pretty(document)?;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| RenderError::Io {
                path: self.dir.clone(),
                source,
            })?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| RenderError::Io {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), title = document.title(), "Report written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillbook_core::report::LedgerSnapshot;

    #[tokio::test]
    async fn test_json_renderer_writes_document() {
        let dir = std::env::temp_dir().join(format!("tillbook-render-{}", tillbook_core::new_id()));
        let renderer = JsonReportRenderer::new(&dir);

        let window = ReportWindow::today(Utc::now());
        let document = ReportDocument::CashFlow {
            title: "Daily report".to_string(),
            generated_at: Utc::now(),
            report: CashFlowReport::build(window, LedgerSnapshot::default()),
        };

        let path = renderer.render(&document).await.unwrap();
        assert!(path.starts_with(&dir));

        let written: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(written["kind"], "cash_flow");
        assert_eq!(written["title"], "Daily report");

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
