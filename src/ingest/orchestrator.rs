//! Ingestion orchestrator: connectors → merged summary → upsert.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::config::SummaryConfig;
use crate::connectors::{RenderedSection, SourceConnector, SummaryBlocks};
use crate::dates;
use crate::error::{Error, UpsertError};
use crate::ingest::daily_log_title;
use crate::ingest::store::{DailyLogStore, UpsertRequest};
use crate::ingest::summary::{build_summary_html, build_summary_text};

/// Serialized into the record's `data_json`.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredPayload {
    pub sources: Vec<String>,
    pub summary: SummaryBlocks,
    pub raw: Map<String, Value>,
}

/// What a successful ingest wrote.
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub summary_text: String,
    pub summary_html: String,
    pub sources: Vec<String>,
    pub payload: StructuredPayload,
}

/// Fold connector sections, in order, into one payload.
///
/// Later sections win on block-key collisions; raw payloads are keyed by
/// connector id.
pub fn merge_sections<I>(sections: I) -> StructuredPayload
where
    I: IntoIterator<Item = (String, RenderedSection)>,
{
    let mut payload = StructuredPayload {
        sources: Vec::new(),
        summary: SummaryBlocks::new(),
        raw: Map::new(),
    };
    for (id, section) in sections {
        payload.summary.merge(section.blocks);
        payload.raw.insert(id.clone(), section.raw_payload);
        payload.sources.push(id);
    }
    payload
}

/// Runs the registered connectors and writes their merged summary.
pub struct Ingestor {
    connectors: Vec<Box<dyn SourceConnector>>,
    summary: SummaryConfig,
}

impl Ingestor {
    pub fn new(connectors: Vec<Box<dyn SourceConnector>>, summary: SummaryConfig) -> Self {
        Self { connectors, summary }
    }

    pub fn connector_ids(&self) -> Vec<&str> {
        self.connectors.iter().map(|c| c.id()).collect()
    }

    /// Collect every connector in registration order.
    ///
    /// A failing connector with a fallback is replaced by it; any other
    /// failure aborts before anything is written.
    async fn collect_all(&self, target_date: NaiveDate) -> Result<Vec<(String, RenderedSection)>, Error> {
        let mut sections = Vec::with_capacity(self.connectors.len());
        for connector in &self.connectors {
            let section = match connector.collect(target_date).await {
                Ok(section) => section,
                Err(err) => match connector.fallback(target_date) {
                    Some(fallback) => {
                        warn!(
                            connector = connector.id(),
                            error = %err,
                            "Connector failed, continuing with empty result"
                        );
                        fallback
                    }
                    None => return Err(err.into()),
                },
            };
            sections.push((connector.id().to_string(), section));
        }
        Ok(sections)
    }

    pub async fn ingest(
        &self,
        store: &dyn DailyLogStore,
        target_date: NaiveDate,
        record_id: &str,
        run_id: &str,
        source_label: &str,
    ) -> Result<IngestResult, Error> {
        let payload = merge_sections(self.collect_all(target_date).await?);

        let summary_text = build_summary_text(target_date, run_id, &payload.summary, &self.summary);
        let summary_html = build_summary_html(target_date, run_id, &payload.summary, &self.summary);
        let date = dates::format_date(target_date);

        let request = UpsertRequest {
            target_date: date.clone(),
            title: daily_log_title(target_date),
            summary_text: summary_text.clone(),
            summary_html: summary_html.clone(),
            mail_id: run_id.to_string(),
            source: source_label.to_string(),
            page_id: record_id.to_string(),
            data_json: serde_json::to_string(&payload).map_err(UpsertError::from)?,
        };
        store
            .upsert(&request)
            .await
            .map_err(|source| UpsertError::Request {
                target_date: date,
                source,
            })?;

        info!(
            target_date = %target_date,
            record_id,
            sources = ?payload.sources,
            "Daily log upserted"
        );

        Ok(IngestResult {
            summary_text,
            summary_html,
            sources: payload.sources.clone(),
            payload,
        })
    }
}
