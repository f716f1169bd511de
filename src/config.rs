//! Configuration types.
//!
//! Everything is resolved once at process start from environment variables.
//! A value is only required when the selected phase actually uses it.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use crate::error::ConfigError;
use crate::http::DEFAULT_TIMEOUT;
use crate::job::Phase;

/// Path of the ensure endpoint on the Workers origin.
const ENSURE_PATH: &str = "/execute/api/daily_log/ensure";
/// Path of the read endpoint on the Workers origin.
const READ_PATH: &str = "/api/daily_log";

/// Labels, markers and limits shared by the summary builder and the publish parser.
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    /// Status label of open tasks that are being worked on.
    pub status_do: String,
    /// Status label of parked tasks, listed on Mondays.
    pub status_someday: String,
    /// Prefix of the one-line progress summary.
    pub progress_prefix: String,
    /// Glyph that opens the done block in the summary text.
    pub done_marker: String,
    /// Glyph that opens the drop block in the summary text.
    pub drop_marker: String,
    pub done_heading: String,
    pub drop_heading: String,
    /// Visible entries per block in the rendered mail.
    pub max_visible_items: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            status_do: "Do".to_string(),
            status_someday: "Someday".to_string(),
            progress_prefix: "昨日の前進：".to_string(),
            done_marker: "🎉".to_string(),
            drop_marker: "🧹".to_string(),
            done_heading: "昨日完了したこと".to_string(),
            drop_heading: "昨日手放したこと".to_string(),
            max_visible_items: 30,
        }
    }
}

/// SMTP delivery settings.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub from: String,
    pub to: Vec<String>,
    pub app_password: SecretString,
    pub smtp_host: String,
    pub smtp_port: u16,
}

/// Endpoints of the remote data service.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub tasks_closed_url: Option<String>,
    pub tasks_url: Option<String>,
    pub inbox_url: Option<String>,
    pub upsert_url: String,
    pub ensure_url: String,
    pub read_url: String,
}

/// Full job configuration.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub endpoints: EndpointConfig,
    /// Present whenever the publish phase runs.
    pub mail: Option<MailConfig>,
    pub bearer_token: Option<SecretString>,
    pub run_id: String,
    pub source_label: String,
    pub http_timeout: Duration,
    pub summary: SummaryConfig,
}

impl JobConfig {
    /// Build config from the process environment.
    pub fn from_env(phase: Phase) -> Result<Self, ConfigError> {
        Self::from_lookup(phase, |key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(phase: Phase, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));

        let upsert_url = require("DAILY_LOG_UPSERT_URL")?;
        let ensure_url = match get("DAILY_LOG_ENSURE_URL") {
            Some(url) => url,
            None => worker_url(&upsert_url, ENSURE_PATH)?,
        };
        let read_url = match get("DAILY_LOG_READ_URL") {
            Some(url) => url,
            None => worker_url(&upsert_url, READ_PATH)?,
        };

        let tasks_closed_url = if phase.runs_ingest() {
            Some(require("TASKS_CLOSED_URL")?)
        } else {
            get("TASKS_CLOSED_URL")
        };

        let mail = if phase.runs_publish() {
            let to = parse_recipients(&require("MAIL_TO")?);
            if to.is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "MAIL_TO".into(),
                    message: "no recipients after splitting on ','".into(),
                });
            }
            Some(MailConfig {
                from: require("MAIL_FROM")?,
                to,
                app_password: SecretString::from(require("GMAIL_APP_PASSWORD")?),
                smtp_host: get("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                smtp_port: parse_or("SMTP_PORT", get("SMTP_PORT"), 465)?,
            })
        } else {
            None
        };

        let timeout_secs = parse_or("HTTP_TIMEOUT_SECS", get("HTTP_TIMEOUT_SECS"), DEFAULT_TIMEOUT.as_secs())?;

        let defaults = SummaryConfig::default();
        let summary = SummaryConfig {
            status_do: get("TASK_STATUS_DO").unwrap_or(defaults.status_do.clone()),
            status_someday: get("TASK_STATUS_SOMEDAY").unwrap_or(defaults.status_someday.clone()),
            ..defaults
        };

        Ok(Self {
            endpoints: EndpointConfig {
                tasks_closed_url,
                tasks_url: get("TASKS_JSON_URL"),
                inbox_url: get("INBOX_JSON_URL"),
                upsert_url,
                ensure_url,
                read_url,
            },
            mail,
            bearer_token: get("WORKERS_BEARER_TOKEN").map(SecretString::from),
            run_id: get("GITHUB_RUN_ID").unwrap_or_else(|| "local".to_string()),
            source_label: "automation".to_string(),
            http_timeout: Duration::from_secs(timeout_secs),
            summary,
        })
    }
}

/// Split a comma list of addresses, dropping blanks.
pub fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Replace the path of `base_url` with `path`, keeping scheme and host.
pub fn worker_url(base_url: &str, path: &str) -> Result<String, ConfigError> {
    let mut url = Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
        key: "DAILY_LOG_UPSERT_URL".into(),
        message: e.to_string(),
    })?;
    url.set_path(path);
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}

fn parse_or<T: std::str::FromStr>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn full_env() -> Vec<(&'static str, &'static str)> {
        vec![
            ("DAILY_LOG_UPSERT_URL", "https://worker.example.com/execute/api/daily_log?x=1"),
            ("TASKS_CLOSED_URL", "https://worker.example.com/api/tasks/closed"),
            ("MAIL_FROM", "me@example.com"),
            ("MAIL_TO", "a@example.com, ,b@example.com"),
            ("GMAIL_APP_PASSWORD", "app-pass"),
        ]
    }

    #[test]
    fn derives_ensure_and_read_urls_from_upsert_origin() {
        let config = JobConfig::from_lookup(Phase::All, lookup(&full_env())).unwrap();
        assert_eq!(
            config.endpoints.ensure_url,
            "https://worker.example.com/execute/api/daily_log/ensure"
        );
        assert_eq!(config.endpoints.read_url, "https://worker.example.com/api/daily_log");
    }

    #[test]
    fn explicit_urls_override_derivation() {
        let mut env = full_env();
        env.push(("DAILY_LOG_READ_URL", "https://other.example.com/read"));
        let config = JobConfig::from_lookup(Phase::All, lookup(&env)).unwrap();
        assert_eq!(config.endpoints.read_url, "https://other.example.com/read");
    }

    #[test]
    fn defaults_apply_when_optional_values_absent() {
        let config = JobConfig::from_lookup(Phase::All, lookup(&full_env())).unwrap();
        assert_eq!(config.run_id, "local");
        assert_eq!(config.source_label, "automation");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.bearer_token.is_none());
        assert_eq!(config.summary.status_do, "Do");
        assert_eq!(config.summary.max_visible_items, 30);

        let mail = config.mail.expect("publish needs mail config");
        assert_eq!(mail.to, vec!["a@example.com", "b@example.com"]);
        assert_eq!(mail.smtp_host, "smtp.gmail.com");
        assert_eq!(mail.smtp_port, 465);
        assert_eq!(mail.app_password.expose_secret(), "app-pass");
    }

    #[test]
    fn missing_upsert_url_is_always_fatal() {
        let err = JobConfig::from_lookup(Phase::Publish, lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "DAILY_LOG_UPSERT_URL"));
    }

    #[test]
    fn ingest_phase_does_not_need_mail_settings() {
        let env = [
            ("DAILY_LOG_UPSERT_URL", "https://worker.example.com/execute/api/daily_log"),
            ("TASKS_CLOSED_URL", "https://worker.example.com/api/tasks/closed"),
        ];
        let config = JobConfig::from_lookup(Phase::Ingest, lookup(&env)).unwrap();
        assert!(config.mail.is_none());
    }

    #[test]
    fn publish_phase_does_not_need_tasks_url() {
        let env = [
            ("DAILY_LOG_UPSERT_URL", "https://worker.example.com/execute/api/daily_log"),
            ("MAIL_FROM", "me@example.com"),
            ("MAIL_TO", "a@example.com"),
            ("GMAIL_APP_PASSWORD", "app-pass"),
        ];
        let config = JobConfig::from_lookup(Phase::Publish, lookup(&env)).unwrap();
        assert!(config.endpoints.tasks_closed_url.is_none());
    }

    #[test]
    fn publish_phase_requires_mail_settings() {
        let env = [("DAILY_LOG_UPSERT_URL", "https://worker.example.com/x")];
        let err = JobConfig::from_lookup(Phase::Publish, lookup(&env)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "MAIL_TO"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let mut env = full_env();
        env.retain(|(k, _)| *k != "TASKS_CLOSED_URL");
        env.push(("TASKS_CLOSED_URL", "   "));
        let err = JobConfig::from_lookup(Phase::Ingest, lookup(&env)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "TASKS_CLOSED_URL"));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut env = full_env();
        env.push(("SMTP_PORT", "not-a-port"));
        let err = JobConfig::from_lookup(Phase::All, lookup(&env)).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "SMTP_PORT"));
    }

    #[test]
    fn status_labels_come_from_environment() {
        let mut env = full_env();
        env.push(("TASK_STATUS_DO", "Doing"));
        env.push(("GITHUB_RUN_ID", "12345"));
        env.push(("WORKERS_BEARER_TOKEN", "tok"));
        let config = JobConfig::from_lookup(Phase::All, lookup(&env)).unwrap();
        assert_eq!(config.summary.status_do, "Doing");
        assert_eq!(config.summary.status_someday, "Someday");
        assert_eq!(config.run_id, "12345");
        assert!(config.bearer_token.is_some());
    }

    #[test]
    fn worker_url_rejects_garbage() {
        assert!(worker_url("not a url", READ_PATH).is_err());
    }
}
