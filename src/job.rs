//! Job runner: wires the ingest and publish phases together.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::config::{JobConfig, SummaryConfig};
use crate::connectors::{ActivityConnector, SourceConnector, TasksConnector};
use crate::error::{ConfigError, Error, Result};
use crate::http::WorkerClient;
use crate::ingest::{DailyLogStore, IngestResult, Ingestor, WorkerStore, ensure_page};
use crate::publish::{DeliveryOutcome, MailTransport, Mailer, SmtpMailTransport, render};

/// Which phases a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Phase {
    Ingest,
    Publish,
    All,
}

impl Phase {
    pub fn runs_ingest(self) -> bool {
        matches!(self, Self::Ingest | Self::All)
    }

    pub fn runs_publish(self) -> bool {
        matches!(self, Self::Publish | Self::All)
    }
}

/// How the publish phase ended. None of these fail the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Sent,
    DeliveryFailed,
    /// No record stored for the date.
    Skipped,
}

#[derive(Debug, Default)]
pub struct JobReport {
    pub ingest: Option<IngestResult>,
    pub publish: Option<PublishOutcome>,
}

pub struct DailyLogJob {
    store: Box<dyn DailyLogStore>,
    ingestor: Option<Ingestor>,
    mailer: Option<Mailer>,
    summary: SummaryConfig,
    run_id: String,
    source_label: String,
}

impl DailyLogJob {
    pub fn new(
        store: Box<dyn DailyLogStore>,
        ingestor: Option<Ingestor>,
        mailer: Option<Mailer>,
        config: &JobConfig,
    ) -> Self {
        Self {
            store,
            ingestor,
            mailer,
            summary: config.summary.clone(),
            run_id: config.run_id.clone(),
            source_label: config.source_label.clone(),
        }
    }

    /// Build the job against the Workers API and the configured SMTP relay.
    pub fn from_config(config: &JobConfig) -> Self {
        let transport = config.mail.as_ref().and_then(|mail| {
            match SmtpMailTransport::new(mail, config.http_timeout) {
                Ok(transport) => Some(Arc::new(transport) as Arc<dyn MailTransport>),
                Err(e) => {
                    error!(error = %e, "Failed to set up SMTP transport");
                    None
                }
            }
        });
        Self::with_transport(config, transport)
    }

    /// Build the job with an explicit mail transport.
    pub fn with_transport(config: &JobConfig, transport: Option<Arc<dyn MailTransport>>) -> Self {
        let client = WorkerClient::new(config.bearer_token.clone(), config.http_timeout);
        let endpoints = &config.endpoints;

        let store = WorkerStore::new(
            client.clone(),
            endpoints.ensure_url.clone(),
            endpoints.upsert_url.clone(),
            endpoints.read_url.clone(),
        );

        let ingestor = endpoints.tasks_closed_url.as_ref().map(|closed_url| {
            let mut connectors: Vec<Box<dyn SourceConnector>> = vec![Box::new(TasksConnector::new(
                client.clone(),
                closed_url.clone(),
                config.summary.clone(),
            ))];
            if let (Some(tasks_url), Some(inbox_url)) = (&endpoints.tasks_url, &endpoints.inbox_url) {
                connectors.push(Box::new(ActivityConnector::new(
                    client.clone(),
                    tasks_url.clone(),
                    inbox_url.clone(),
                    config.summary.clone(),
                )));
            }
            Ingestor::new(connectors, config.summary.clone())
        });

        let mailer = match (&config.mail, transport) {
            (Some(mail), Some(transport)) => Some(Mailer::new(mail.from.clone(), mail.to.clone(), transport)),
            _ => None,
        };

        Self::new(Box::new(store), ingestor, mailer, config)
    }

    /// Ensure the record for `target_date`, then ingest into it.
    pub async fn run_ingest(&self, target_date: NaiveDate) -> Result<IngestResult> {
        let Some(ingestor) = &self.ingestor else {
            return Err(ConfigError::MissingEnvVar("TASKS_CLOSED_URL".into()).into());
        };
        info!(
            target_date = %target_date,
            run_id = %self.run_id,
            connectors = ?ingestor.connector_ids(),
            "Starting ingest"
        );

        let record_id = ensure_page(self.store.as_ref(), target_date, &self.source_label, &self.run_id).await?;
        ingestor
            .ingest(
                self.store.as_ref(),
                target_date,
                &record_id,
                &self.run_id,
                &self.source_label,
            )
            .await
    }

    /// Read back the stored record and mail it.
    pub async fn run_publish(&self, target_date: NaiveDate) -> Result<PublishOutcome> {
        let record = self.store.read(target_date).await.map_err(Error::Read)?;
        let Some(record) = record else {
            info!(target_date = %target_date, "No daily log stored, skipping publish");
            return Ok(PublishOutcome::Skipped);
        };

        let rendered = render(&record, &self.summary);
        let Some(mailer) = &self.mailer else {
            warn!(target_date = %target_date, "Mail transport unavailable, not sending");
            return Ok(PublishOutcome::DeliveryFailed);
        };

        match mailer.send(&rendered).await {
            DeliveryOutcome::Delivered { .. } => Ok(PublishOutcome::Sent),
            DeliveryOutcome::Failed(_) => Ok(PublishOutcome::DeliveryFailed),
        }
    }

    pub async fn run(&self, phase: Phase, target_date: NaiveDate) -> Result<JobReport> {
        let mut report = JobReport::default();
        if phase.runs_ingest() {
            report.ingest = Some(self.run_ingest(target_date).await?);
        }
        if phase.runs_publish() {
            report.publish = Some(self.run_publish(target_date).await?);
        }
        Ok(report)
    }
}
